//! Capability advertisement
//!
//! The node announces itself once per session, either as a manifest on the
//! `discovery` channel, as one Home Assistant registration record per value
//! and output, or both.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use feeder_homeassistant::ha::{self, SensorDiscoveryContext, SwitchDiscoveryContext};
use feeder_homeassistant::{Device, HaError, SensorEntity, SwitchEntity};
use log::{info, warn};

use crate::config::{NodeConfig, Topics};
use crate::domain::DeviceManifest;
use crate::error::SessionError;
use crate::ports::BrokerClient;
use crate::session::SessionManager;

const MAX_TOPIC_LEN: usize = 128;

/// Shape of the startup announcement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryMode {
    /// Full manifest on the discovery channel
    Manifest,
    /// `{id, name}` only on the discovery channel
    ShortManifest,
    /// One Home Assistant record per value and output
    Registration,
    /// Full manifest followed by the Home Assistant records
    ManifestAndRegistration,
}

/// A discovery record ready to publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryRecord {
    pub topic: String,
    pub payload: Vec<u8>,
}

pub struct DiscoveryAdvertiser<'a> {
    manifest: &'a DeviceManifest,
    topics: &'a Topics,
    mode: DiscoveryMode,
    availability: bool,
}

impl<'a> DiscoveryAdvertiser<'a> {
    pub fn new(manifest: &'a DeviceManifest, config: &'a NodeConfig) -> Self {
        Self {
            manifest,
            topics: config.topics(),
            mode: config.discovery,
            availability: config.availability,
        }
    }

    pub fn manifest(&self) -> &'a DeviceManifest {
        self.manifest
    }

    /// Publish the announcement configured for this node
    pub async fn announce<C: BrokerClient>(
        &self,
        session: &mut SessionManager<C>,
    ) -> Result<(), SessionError> {
        match self.mode {
            DiscoveryMode::Manifest => self.announce_manifest(session).await,
            DiscoveryMode::ShortManifest => {
                self.publish_manifest(session, self.short_manifest()).await
            }
            DiscoveryMode::Registration => self.announce_registration(session).await,
            DiscoveryMode::ManifestAndRegistration => {
                self.announce_manifest(session).await?;
                self.announce_registration(session).await
            }
        }
    }

    /// Publish the full manifest regardless of the configured mode
    pub async fn announce_manifest<C: BrokerClient>(
        &self,
        session: &mut SessionManager<C>,
    ) -> Result<(), SessionError> {
        self.publish_manifest(session, self.full_manifest()).await
    }

    async fn publish_manifest<C: BrokerClient>(
        &self,
        session: &mut SessionManager<C>,
        payload: Result<Vec<u8>, serde_json::Error>,
    ) -> Result<(), SessionError> {
        let payload = match payload {
            Ok(payload) => payload,
            Err(e) => {
                warn!("discovery: manifest encoding failed: {}", e);
                return Ok(());
            }
        };
        session.publish(&self.topics.discovery, &payload).await?;
        info!(
            "discovery: announced '{}' on '{}'",
            self.manifest.id, self.topics.discovery
        );
        Ok(())
    }

    async fn announce_registration<C: BrokerClient>(
        &self,
        session: &mut SessionManager<C>,
    ) -> Result<(), SessionError> {
        let records = self.registration_records();
        for record in &records {
            session.publish(&record.topic, &record.payload).await?;
        }
        info!("discovery: registered {} entities", records.len());
        Ok(())
    }

    pub fn full_manifest(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self.manifest)
    }

    pub fn short_manifest(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.manifest.summary())
    }

    /// Home Assistant records for every value and output
    ///
    /// Records that cannot be encoded are logged and left out.
    pub fn registration_records(&self) -> Vec<DiscoveryRecord> {
        let manifest = self.manifest;
        let device = Device {
            id: &manifest.id,
            name: &manifest.name,
            manufacturer: manifest.manufacturer.as_deref(),
            model: manifest.model.as_deref(),
            sw_version: Some(&manifest.version),
        };
        let availability = self.availability.then_some(self.topics.availability.as_str());

        let mut records = Vec::with_capacity(manifest.values.len() + manifest.outputs.len());
        for value in &manifest.values {
            let mut entity = SensorEntity::new(&value.id, &value.name, &device);
            entity.icon = value.icon.as_deref();
            entity.device_class = value.device_class.as_deref();
            entity.unit = (!value.unit.is_empty()).then_some(value.unit.as_str());
            entity.scale = value.scale;
            match self.sensor_record(&entity, availability) {
                Ok(record) => records.push(record),
                Err(e) => warn!("discovery: skipping value '{}': {}", value.id, e),
            }
        }
        for output in &manifest.outputs {
            let mut entity = SwitchEntity::new(&output.id, &output.name, &device);
            entity.icon = output.icon.as_deref();
            match self.switch_record(&entity, availability) {
                Ok(record) => records.push(record),
                Err(e) => warn!("discovery: skipping output '{}': {}", output.id, e),
            }
        }
        records
    }

    fn sensor_record(
        &self,
        entity: &SensorEntity<'_>,
        availability: Option<&str>,
    ) -> Result<DiscoveryRecord, HaError> {
        let ctx: SensorDiscoveryContext<MAX_TOPIC_LEN> =
            SensorDiscoveryContext::new(&self.topics.namespace, entity)?;
        let identifiers = [ctx.identifier.as_str()];
        let config = ha::sensor_to_discovery(
            entity,
            &ctx,
            &identifiers,
            &self.topics.telemetry,
            availability,
        );
        Ok(DiscoveryRecord {
            topic: ctx.config_topic.as_str().to_string(),
            payload: ha::to_payload(&config)?,
        })
    }

    fn switch_record(
        &self,
        entity: &SwitchEntity<'_>,
        availability: Option<&str>,
    ) -> Result<DiscoveryRecord, HaError> {
        let ctx: SwitchDiscoveryContext<MAX_TOPIC_LEN> =
            SwitchDiscoveryContext::new(&self.topics.namespace, entity)?;
        let identifiers = [ctx.identifier.as_str()];
        let config = ha::switch_to_discovery(
            entity,
            &ctx,
            &identifiers,
            &self.topics.outputs,
            availability,
        );
        Ok(DiscoveryRecord {
            topic: ctx.config_topic.as_str().to_string(),
            payload: ha::to_payload(&config)?,
        })
    }
}
