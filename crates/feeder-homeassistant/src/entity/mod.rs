//! Entity domain types
//!
//! This module contains domain DTOs for the Home Assistant entities a node exposes.

pub mod sensor;
pub mod switch;

pub use sensor::SensorEntity;
pub use switch::SwitchEntity;
