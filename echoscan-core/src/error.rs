use crate::types::Stage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Operation timeout after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("{stage} is already running")]
    Busy { stage: Stage },

    #[error("Nothing to do: {message}")]
    NothingToDo { message: String },

    #[error("Insufficient data: {message}")]
    InsufficientData { message: String },
}

impl CoreError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn insufficient_data(message: impl Into<String>) -> Self {
        Self::InsufficientData {
            message: message.into(),
        }
    }
}

/// Failures reported by the content-intelligence service itself.
#[derive(Error, Debug, Clone)]
pub enum ServiceError {
    /// The service answered with an explanatory message; shown verbatim.
    #[error("{detail}")]
    Upstream {
        detail: String,
        status_code: Option<u16>,
    },

    #[error("Service returned status {status_code}")]
    Status { status_code: u16 },

    #[error("Invalid service response: {details}")]
    InvalidResponse { details: String },

    #[error("Service unavailable: {endpoint}")]
    Unavailable { endpoint: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Permission denied accessing config: {path}")]
    PermissionDenied { path: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}
