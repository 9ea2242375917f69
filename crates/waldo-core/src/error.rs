use thiserror::Error;

/// Top-level error type for waldo-core.
///
/// Only construction-time configuration problems are errors. Per-tick
/// anomalies (out-of-range commands, unreachable targets, blocked base
/// motion) degrade into clipping, best-effort actuation, or rollback and are
/// never surfaced through this type.
#[derive(Debug, Error)]
pub enum WaldoError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Configuration errors. Fatal, surfaced at construction, never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Joint mask selects {active} joints but the command has {expected} dimensions")]
    MaskLengthMismatch { active: usize, expected: usize },

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("No action factory registered for '{0}'")]
    UnknownAction(String),
}

impl ConfigError {
    /// Shorthand for [`ConfigError::InvalidValue`].
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}
