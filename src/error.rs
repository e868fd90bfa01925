//! Error types for the simulation and its configuration

use thiserror::Error;

use crate::sim::EntityId;

/// Faults raised inside the simulation tick.
///
/// None of these are fatal to a run: the bounce arbiter catches them at its
/// boundary and force-resets to `Ready`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    #[error("entity {0} is not in the arena")]
    MissingEntity(EntityId),
    #[error("entity {0} has no physics body")]
    MissingBody(EntityId),
    #[error("player body is not registered with physics")]
    MissingPlayerBody,
    #[error("non-finite player {what}: {value}")]
    NonFinite { what: &'static str, value: f32 },
}

/// Errors loading or validating a [`crate::Tuning`] file
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("failed to read tuning file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse tuning JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid tuning value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}
