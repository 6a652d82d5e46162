//! Inbound command model and its JSON decoding
//!
//! A batch payload is a JSON array of commands, or a single command object:
//!
//! ```json
//! [{"name": "relay", "params": [{"id": "r", "value": "2"}, {"s": "on"}]}]
//! ```
//!
//! Parameters are given either as `{"id": ..., "value": ...}` records or as
//! compact `{"<id>": <value>}` objects. Each command decodes independently, so
//! one malformed entry never hides the others.

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use feeder_homeassistant::SwitchCommand;
use serde_json::{Map, Value};

use crate::error::{CommandDecodeError, CommandParamError};

/// Explicitly typed parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Bytes(Vec<u8>),
}

impl ParamValue {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(flag) => Some(ParamValue::Bool(*flag)),
            Value::Number(number) => number
                .as_i64()
                .map(ParamValue::Int)
                .or_else(|| number.as_f64().map(ParamValue::Float)),
            Value::String(text) => Some(ParamValue::Text(text.clone())),
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_u64().and_then(|byte| u8::try_from(byte).ok()))
                .collect::<Option<Vec<u8>>>()
                .map(ParamValue::Bytes),
            Value::Null | Value::Object(_) => None,
        }
    }

    /// Non-negative integer, given as a number or as decimal text
    pub fn as_index(&self) -> Option<usize> {
        match self {
            ParamValue::Int(value) => usize::try_from(*value).ok(),
            ParamValue::Text(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    /// Binary state: `1`/`on`/`true` or `0`/`off`/`false`
    pub fn as_switch(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(flag) => Some(*flag),
            ParamValue::Int(1) => Some(true),
            ParamValue::Int(0) => Some(false),
            ParamValue::Text(text) => SwitchCommand::parse(text.as_bytes()).map(SwitchCommand::is_on),
            _ => None,
        }
    }

    pub fn as_byte(&self) -> Option<u8> {
        self.as_index().and_then(|value| u8::try_from(value).ok())
    }

    /// A byte list, or a single byte promoted to a one-element list
    pub fn as_bytes(&self) -> Option<Vec<u8>> {
        match self {
            ParamValue::Bytes(bytes) => Some(bytes.clone()),
            other => other.as_byte().map(|byte| vec![byte]),
        }
    }
}

/// A decoded remote method invocation
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub name: String,
    pub params: Vec<(String, ParamValue)>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_param(mut self, id: impl Into<String>, value: ParamValue) -> Self {
        self.params.push((id.into(), value));
        self
    }

    pub fn optional_param(&self, id: &str) -> Option<&ParamValue> {
        self.params
            .iter()
            .find(|(param_id, _)| param_id == id)
            .map(|(_, value)| value)
    }

    pub fn param(&self, id: &'static str) -> Result<&ParamValue, CommandParamError> {
        self.optional_param(id).ok_or(CommandParamError::Missing(id))
    }

    /// Extract a parameter and convert it, mapping both failures to [`CommandParamError`]
    pub fn typed_param<T>(
        &self,
        id: &'static str,
        convert: impl FnOnce(&ParamValue) -> Option<T>,
    ) -> Result<T, CommandParamError> {
        convert(self.param(id)?).ok_or(CommandParamError::Invalid(id))
    }
}

/// Decode a batch payload
///
/// The outer error means the whole payload is unusable. Otherwise every entry
/// is decoded on its own.
pub fn decode_batch(
    payload: &[u8],
) -> Result<Vec<Result<Command, CommandDecodeError>>, CommandDecodeError> {
    let root: Value =
        serde_json::from_slice(payload).map_err(|_| CommandDecodeError::Malformed)?;
    match root {
        Value::Array(items) => Ok(items.iter().map(decode_command).collect()),
        Value::Object(_) => Ok(vec![decode_command(&root)]),
        _ => Err(CommandDecodeError::NotACommandList),
    }
}

fn decode_command(value: &Value) -> Result<Command, CommandDecodeError> {
    let object = value.as_object().ok_or(CommandDecodeError::NotACommandList)?;
    let name = object
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .ok_or(CommandDecodeError::MissingName)?;

    let mut command = Command::new(name);
    match object.get("params") {
        None | Some(Value::Null) => {}
        Some(Value::Array(items)) => {
            for item in items {
                let entry = item.as_object().ok_or(CommandDecodeError::InvalidParam)?;
                decode_params(entry, &mut command.params)?;
            }
        }
        Some(Value::Object(entry)) => decode_params(entry, &mut command.params)?,
        Some(_) => return Err(CommandDecodeError::InvalidParam),
    }
    Ok(command)
}

fn decode_params(
    entry: &Map<String, Value>,
    params: &mut Vec<(String, ParamValue)>,
) -> Result<(), CommandDecodeError> {
    if let (Some(Value::String(id)), Some(value)) = (entry.get("id"), entry.get("value")) {
        if entry.len() == 2 {
            let value = ParamValue::from_json(value).ok_or(CommandDecodeError::InvalidParam)?;
            params.push((id.clone(), value));
            return Ok(());
        }
    }
    for (id, value) in entry {
        let value = ParamValue::from_json(value).ok_or(CommandDecodeError::InvalidParam)?;
        params.push((id.clone(), value));
    }
    Ok(())
}
