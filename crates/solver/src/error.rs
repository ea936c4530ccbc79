use thiserror::Error;

/// Result type for solver operations
pub type Result<T> = std::result::Result<T, SolverError>;

/// Errors that can occur while solving for a per-person rate
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// No recipients were supplied
    #[error("Empty recipient set: at least one center is required")]
    EmptyRecipients,

    /// A funding parameter is out of range
    #[error("Invalid parameter {name}={value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    /// A recipient field is negative or not finite
    #[error("Invalid recipient #{index}: {field}={value} (must be finite and >= 0)")]
    InvalidRecipient {
        index: usize,
        field: &'static str,
        value: f64,
    },

    /// Invalid solver configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SolverError {
    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Stable machine-readable code for this error
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::EmptyRecipients => "empty_input",
            Self::InvalidParameter { .. } => "invalid_parameter",
            Self::InvalidRecipient { .. } => "invalid_input",
            Self::InvalidConfig(_) => "invalid_config",
        }
    }
}
