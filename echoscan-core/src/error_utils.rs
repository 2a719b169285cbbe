use crate::error::*;
use std::error::Error as StdError;
use std::fmt::Display;
use tracing::{error, warn};

/// Presentation helpers shared by every error type in the workspace.
pub trait ErrorExt: Display + Sized {
    /// Stable, machine-readable identifier.
    fn error_code(&self) -> &'static str;

    /// Text safe to show the person running the pipeline.
    fn user_friendly_message(&self) -> String;

    /// Unmet preconditions that are reported to the user but are not failures.
    fn is_informational(&self) -> bool {
        false
    }

    fn log_error(&self) -> &Self {
        error!(code = self.error_code(), "{}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!(code = self.error_code(), "{}", self);
        self
    }
}

impl ErrorExt for CoreError {
    fn error_code(&self) -> &'static str {
        match self {
            CoreError::Service(e) => e.error_code(),
            CoreError::Config(e) => e.error_code(),
            CoreError::Io(_) => "IO",
            CoreError::Network(_) => "NETWORK",
            CoreError::InvalidInput { .. } => "INVALID_INPUT",
            CoreError::Timeout { .. } => "TIMEOUT",
            CoreError::NotFound { .. } => "NOT_FOUND",
            CoreError::Busy { .. } => "BUSY",
            CoreError::NothingToDo { .. } => "NOTHING_TO_DO",
            CoreError::InsufficientData { .. } => "INSUFFICIENT_DATA",
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::Service(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Network(_) => {
                "Could not reach the content-intelligence service. Please check your connection."
                    .to_string()
            }
            CoreError::Timeout { seconds } => format!(
                "The content-intelligence service did not answer within {seconds} seconds."
            ),
            CoreError::NotFound { resource } => format!("Could not find: {resource}"),
            CoreError::Busy { stage } => {
                format!("{stage} is already in progress. Please wait for it to finish.")
            }
            CoreError::InvalidInput { message }
            | CoreError::NothingToDo { message }
            | CoreError::InsufficientData { message } => message.clone(),
            CoreError::Io(_) => {
                "An unexpected error occurred. Please try again later.".into()
            }
        }
    }

    fn is_informational(&self) -> bool {
        matches!(
            self,
            CoreError::Busy { .. }
                | CoreError::NothingToDo { .. }
                | CoreError::InsufficientData { .. }
        )
    }

    /// Also logs the chain of underlying causes, one line each.
    fn log_error(&self) -> &Self {
        error!(code = self.error_code(), "{}", self);
        let mut source = self.source();
        while let Some(cause) = source {
            error!("  caused by: {}", cause);
            source = cause.source();
        }
        self
    }
}

impl ErrorExt for ServiceError {
    fn error_code(&self) -> &'static str {
        match self {
            ServiceError::Upstream { .. } => "SERVICE_UPSTREAM",
            ServiceError::Status { .. } => "SERVICE_STATUS",
            ServiceError::InvalidResponse { .. } => "SERVICE_INVALID_RESPONSE",
            ServiceError::Unavailable { .. } => "SERVICE_UNAVAILABLE",
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            // The service's own words are the most useful thing to show.
            ServiceError::Upstream { detail, .. } => detail.clone(),
            ServiceError::Status { status_code } if *status_code >= 500 => format!(
                "The content-intelligence service failed (status {status_code}). Please try again later."
            ),
            ServiceError::Status { status_code } => format!(
                "The content-intelligence service rejected the request (status {status_code})."
            ),
            ServiceError::InvalidResponse { .. } => {
                "The content-intelligence service sent an unexpected response.".into()
            }
            ServiceError::Unavailable { endpoint } => {
                format!("Service endpoint {endpoint} is unavailable.")
            }
        }
    }
}

impl ErrorExt for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND",
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE",
            ConfigError::ValidationFailed { .. } => "CONFIG_VALIDATION_FAILED",
            ConfigError::PermissionDenied { .. } => "CONFIG_PERMISSION_DENIED",
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR",
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::FileNotFound { path } => format!("Configuration file '{path}' not found."),
            ConfigError::InvalidValue { field, value } => {
                format!("Invalid value '{value}' for configuration field '{field}'.")
            }
            ConfigError::ValidationFailed { reason } => format!("Configuration is invalid: {reason}"),
            ConfigError::PermissionDenied { path } => {
                format!("Permission denied reading configuration file '{path}'.")
            }
            ConfigError::Parse(e) => format!("Configuration file could not be parsed: {e}"),
        }
    }
}

/// Routes stage errors to the log at the level their kind calls for.
#[derive(Debug, Clone, Copy)]
pub struct ErrorReporter {
    errors: bool,
    warnings: bool,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self {
            errors: true,
            warnings: true,
        }
    }

    pub fn with_error_reporting(self, enabled: bool) -> Self {
        Self {
            errors: enabled,
            ..self
        }
    }

    pub fn with_warning_reporting(self, enabled: bool) -> Self {
        Self {
            warnings: enabled,
            ..self
        }
    }

    /// Informational errors go out as warnings, everything else as errors.
    pub fn report(&self, error: &CoreError) {
        if error.is_informational() {
            self.report_warning(error);
        } else {
            self.report_error(error);
        }
    }

    pub fn report_error(&self, error: &CoreError) {
        if self.errors {
            error.log_error();
        }
    }

    pub fn report_warning(&self, error: &CoreError) {
        if self.warnings {
            error.log_warn();
        }
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}
