//! Custom error types for gauge rendering.
//!
//! Fatal failures (bad configuration, non-numeric refresh input) are
//! reported as [`GaugeError`]. Option updates that cannot be applied are not
//! fatal: they surface as [`GaugeWarning`] and leave the gauge untouched.

use thiserror::Error;

/// Main error type for gauge operations.
#[derive(Error, Debug)]
pub enum GaugeError {
    /// Neither a container nor a container id was supplied.
    #[error("Either a container or a container id must be provided")]
    MissingContainer,

    /// The container id could not be resolved by the surface.
    #[error("No container with id '{0}' found")]
    ContainerNotFound(String),

    /// The gauge domain is empty or inverted.
    #[error("Invalid range: min ({min}) must be less than max ({max})")]
    InvalidRange { min: f64, max: f64 },

    /// An option document could not be interpreted.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// `refresh` was given something that is not a finite number.
    #[error("refresh() requires a numeric value, got {0}")]
    InvalidValue(String),

    /// The gauge has already been destroyed.
    #[error("Gauge has been destroyed")]
    Destroyed,

    /// Reading a configuration file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing a JSON configuration document failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GaugeError {
    /// Whether this error belongs to the configuration class (construction-time).
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            GaugeError::MissingContainer
                | GaugeError::ContainerNotFound(_)
                | GaugeError::InvalidRange { .. }
                | GaugeError::InvalidConfig(_)
                | GaugeError::Json(_)
        )
    }
}

/// Non-fatal problems raised by `Gauge::update`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GaugeWarning {
    /// The option key is not one that can be changed after construction.
    #[error("\"{0}\" is not a supported update setting")]
    UnsupportedOption(String),

    /// A color-typed option was given a malformed color.
    #[error("{option} must be a valid hex color, got {value}")]
    InvalidColor { option: String, value: String },

    /// The value has the wrong shape for the option.
    #[error("{option} expects {expected}")]
    InvalidOptionValue {
        option: String,
        expected: &'static str,
    },

    /// The gauge was destroyed before the update arrived.
    #[error("update ignored: gauge has been destroyed")]
    Destroyed,
}

/// Result type alias for gauge operations.
pub type Result<T> = std::result::Result<T, GaugeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_class() {
        assert!(GaugeError::MissingContainer.is_configuration());
        assert!(GaugeError::InvalidRange { min: 1.0, max: 0.0 }.is_configuration());
        assert!(!GaugeError::InvalidValue("NaN".into()).is_configuration());
        assert!(!GaugeError::Destroyed.is_configuration());
    }

    #[test]
    fn test_warning_messages() {
        let warning = GaugeWarning::UnsupportedOption("foo".into());
        assert_eq!(warning.to_string(), "\"foo\" is not a supported update setting");

        let warning = GaugeWarning::InvalidColor {
            option: "valueFontColor".into(),
            value: "red".into(),
        };
        assert!(warning.to_string().contains("valueFontColor"));
    }
}
