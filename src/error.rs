//! Unified error handling for the dashboard core.
//!
//! Every fallible operation in the crate returns [`DashboardError`]. Pages
//! turn an error into a single display string; nothing is retried.

use thiserror::Error;

/// Unified error type for dashboard operations.
#[derive(Debug, Clone, Error)]
pub enum DashboardError {
    /// The API answered with a non-success status
    #[error("HTTP error! status: {}", status_label(.status_code, .message))]
    Http {
        message: String,
        status_code: Option<u16>,
    },
    /// The request never produced a response (DNS, connect, timeout)
    #[error("Request error: {message}")]
    Transport { message: String },
    /// The response body did not match the expected shape
    #[error("Parse error: {message}")]
    Decode { message: String },
    /// A record carried a date that cannot be placed on the timeline
    #[error("Invalid date '{value}'")]
    InvalidDate { value: String },
    /// Participant ID/name/role lists have different lengths
    #[error(
        "Activity on {date} has {ids} participant IDs, {names} names and {roles} roles"
    )]
    ParticipantMismatch {
        date: String,
        ids: usize,
        names: usize,
        roles: usize,
    },
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config { message: String },
    /// Filesystem error while reading configuration
    #[error("I/O error: {message}")]
    Io { message: String },
    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

fn status_label(status_code: &Option<u16>, message: &str) -> String {
    match status_code {
        Some(code) => code.to_string(),
        None => message.to_string(),
    }
}

impl DashboardError {
    /// Status code of an HTTP failure, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            DashboardError::Http { status_code, .. } => *status_code,
            _ => None,
        }
    }
}

impl From<serde_json::Error> for DashboardError {
    fn from(e: serde_json::Error) -> Self {
        DashboardError::Decode {
            message: e.to_string(),
        }
    }
}

impl From<std::io::Error> for DashboardError {
    fn from(e: std::io::Error) -> Self {
        DashboardError::Io {
            message: e.to_string(),
        }
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for DashboardError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            DashboardError::Http {
                message: e.to_string(),
                status_code: Some(status.as_u16()),
            }
        } else if e.is_decode() {
            DashboardError::Decode {
                message: e.to_string(),
            }
        } else {
            DashboardError::Transport {
                message: e.to_string(),
            }
        }
    }
}

/// Result type alias for dashboard operations.
pub type Result<T> = std::result::Result<T, DashboardError>;

/// Extension trait for converting Option to DashboardError.
pub trait OptionExt<T> {
    /// Convert Option to Result with an invalid date error.
    fn ok_or_invalid_date(self, value: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_invalid_date(self, value: &str) -> Result<T> {
        self.ok_or_else(|| DashboardError::InvalidDate {
            value: value.to_string(),
        })
    }
}
