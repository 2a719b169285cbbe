use echoscan_core::{CoreError, ErrorExt, Stage};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeLevel {
    Success,
    /// Unmet precondition or empty result; nothing went wrong.
    Info,
    Error,
}

/// The single user-facing message produced by every stage call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub stage: Stage,
    pub level: NoticeLevel,
    pub message: String,
    pub error_code: Option<String>,
}

impl Notice {
    pub fn success(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            level: NoticeLevel::Success,
            message: message.into(),
            error_code: None,
        }
    }

    pub fn info(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            level: NoticeLevel::Info,
            message: message.into(),
            error_code: None,
        }
    }

    pub fn from_error(stage: Stage, error: &CoreError) -> Self {
        let level = if error.is_informational() {
            NoticeLevel::Info
        } else {
            NoticeLevel::Error
        };
        Self {
            stage,
            level,
            message: error.user_friendly_message(),
            error_code: Some(error.error_code().to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.level {
            NoticeLevel::Success => "ok",
            NoticeLevel::Info => "info",
            NoticeLevel::Error => "error",
        };
        write!(f, "[{}] {}: {}", tag, self.stage, self.message)
    }
}
