use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use feeder_homeassistant::HaSwitchStates;
use serde::Serialize;
use serde::ser::Serializer;

/// Display key of an output: `relay1` for index 0
pub fn output_key(index: usize) -> String {
    format!("relay{}", index + 1)
}

/// Internal index of a display key: `relay3` maps to 2
pub fn parse_output_key(key: &str) -> Option<usize> {
    let number: usize = key.strip_prefix("relay")?.parse().ok()?;
    number.checked_sub(1)
}

/// Static description of one binary output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputDescriptor {
    #[serde(skip)]
    pub index: usize,
    pub id: String,
    pub name: String,
    #[serde(skip)]
    pub icon: Option<String>,
}

impl OutputDescriptor {
    pub fn new(index: usize, name: impl Into<String>) -> Self {
        Self {
            index,
            id: output_key(index),
            name: name.into(),
            icon: None,
        }
    }

    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

/// Projection of every output taken under a single lock
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputState {
    states: Vec<bool>,
}

impl OutputState {
    pub fn new(states: Vec<bool>) -> Self {
        Self { states }
    }

    pub fn get(&self, index: usize) -> Option<bool> {
        self.states.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl Serialize for OutputState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let keyed: Vec<(String, bool)> = self
            .states
            .iter()
            .enumerate()
            .map(|(index, is_on)| (output_key(index), *is_on))
            .collect();
        HaSwitchStates(&keyed).serialize(serializer)
    }
}
