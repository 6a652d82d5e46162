//! Topic generation utilities for Home Assistant MQTT integration

use core::fmt::Write;
use heapless::String;

use crate::error::HaError;

/// Generate the base topic of an entity, referenced as `~` in discovery payloads
///
/// Format: `{namespace}/{component}/{device_id}_{entity_id}`
pub fn base_topic<const N: usize>(
    namespace: &str,
    component: &str,
    device_id: &str,
    entity_id: &str,
) -> Result<String<N>, HaError> {
    let mut topic = String::new();
    write!(topic, "{}/{}/{}_{}", namespace, component, device_id, entity_id)?;
    Ok(topic)
}

/// Generate a Home Assistant discovery config topic
///
/// Format: `{namespace}/{component}/{device_id}_{entity_id}/config`
pub fn config_topic<const N: usize>(
    namespace: &str,
    component: &str,
    device_id: &str,
    entity_id: &str,
) -> Result<String<N>, HaError> {
    let mut topic: String<N> = base_topic(namespace, component, device_id, entity_id)?;
    topic.push_str("/config").map_err(|()| HaError::TopicTooLong)?;
    Ok(topic)
}

/// Generate the command topic of an entity
///
/// Format: `{namespace}/{component}/{device_id}_{entity_id}/set`
pub fn command_topic<const N: usize>(
    namespace: &str,
    component: &str,
    device_id: &str,
    entity_id: &str,
) -> Result<String<N>, HaError> {
    let mut topic: String<N> = base_topic(namespace, component, device_id, entity_id)?;
    topic.push_str("/set").map_err(|()| HaError::TopicTooLong)?;
    Ok(topic)
}

/// Generate the subscription filter matching every command topic of a component
///
/// Format: `{namespace}/{component}/+/set`
pub fn command_filter<const N: usize>(namespace: &str, component: &str) -> Result<String<N>, HaError> {
    let mut topic = String::new();
    write!(topic, "{}/{}/+/set", namespace, component)?;
    Ok(topic)
}

/// Generate a unique ID for an entity
///
/// Format: `{device_id}_{entity_id}`
pub fn unique_id<const N: usize>(device_id: &str, entity_id: &str) -> Result<String<N>, HaError> {
    let mut id = String::new();
    write!(id, "{}_{}", device_id, entity_id)?;
    Ok(id)
}

/// Extract the object segment of a command topic
///
/// Returns `Some(object)` only for topics shaped exactly
/// `{namespace}/{component}/{object}/set`.
pub fn parse_command_topic<'t>(topic: &'t str, namespace: &str, component: &str) -> Option<&'t str> {
    let rest = topic.strip_prefix(namespace)?.strip_prefix('/')?;
    let rest = rest.strip_prefix(component)?.strip_prefix('/')?;
    let mut segments = rest.split('/');
    let object = segments.next()?;
    match (segments.next(), segments.next()) {
        (Some("set"), None) if !object.is_empty() => Some(object),
        _ => None,
    }
}
