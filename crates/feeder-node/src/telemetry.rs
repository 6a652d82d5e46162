//! Periodic sensor sampling

use alloc::boxed::Box;
use alloc::string::ToString;
use alloc::vec::Vec;
use log::{debug, warn};

use crate::domain::{Reading, TelemetrySnapshot};
use crate::ports::SensorSource;

/// Reads every configured channel once per pass
///
/// A channel that fails to read is recorded as [`Reading::Unavailable`]; it
/// never aborts the pass or disappears from the snapshot.
#[derive(Default)]
pub struct TelemetrySampler<'a> {
    sources: Vec<Box<dyn SensorSource + 'a>>,
}

impl<'a> TelemetrySampler<'a> {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: impl SensorSource + 'a) -> Self {
        self.add_source(Box::new(source));
        self
    }

    pub fn add_source(&mut self, source: Box<dyn SensorSource + 'a>) {
        self.sources.push(source);
    }

    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|source| source.channel())
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn sample(&mut self) -> TelemetrySnapshot {
        let mut snapshot = TelemetrySnapshot::with_capacity(self.sources.len());
        for source in &mut self.sources {
            let reading = match source.sample() {
                Ok(value) => Reading::Available(value),
                Err(e) => {
                    warn!("telemetry: channel '{}' unavailable: {}", source.channel(), e);
                    Reading::Unavailable
                }
            };
            snapshot.push(source.channel().to_string(), reading);
        }
        debug!(
            "telemetry: sampled {} channels, {} unavailable",
            snapshot.len(),
            snapshot.unavailable_count()
        );
        snapshot
    }
}
