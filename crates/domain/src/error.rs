//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`TriggerError`] via `#[from]` or an explicit `From` impl.

/// Base error type crossing port boundaries.
#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("not found")]
    NotFound(#[from] NotFoundError),

    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Domain invariant violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("identifier must not be empty")]
    EmptyName,

    #[error("at least one security sensor is required")]
    NoSecuritySensors,

    #[error("at least one light is required")]
    NoLights,

    #[error("dimmer level {0} is out of range 0..=99")]
    DimmerLevelOutOfRange(i64),

    #[error("timeout of {0} seconds is too long")]
    TimeoutOutOfRange(u64),

    #[error("duplicate identifier {0}")]
    DuplicateId(String),

    #[error("device {device} does not accept command {command}")]
    UnsupportedCommand { device: String, command: String },
}

/// A lookup by identifier found nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_not_found_with_entity_and_id() {
        let err = NotFoundError {
            entity: "Device",
            id: "hall.motion".to_string(),
        };
        assert_eq!(err.to_string(), "Device hall.motion not found");
    }

    #[test]
    fn should_convert_validation_error_into_trigger_error() {
        let err: TriggerError = ValidationError::EmptyName.into();
        assert!(matches!(
            err,
            TriggerError::Validation(ValidationError::EmptyName)
        ));
    }

    #[test]
    fn should_display_out_of_range_dimmer_level() {
        let err = ValidationError::DimmerLevelOutOfRange(120);
        assert_eq!(err.to_string(), "dimmer level 120 is out of range 0..=99");
    }
}
