//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Simulation backend client and wire model."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use thiserror::Error;

/// Failure of a single backend call.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{path} answered with HTTP {status}")]
    Status { path: String, status: u16 },
    #[error("malformed payload from {path} at `{location}`: {message}")]
    Decode {
        path: String,
        location: String,
        message: String,
    },
    /// The backend returned an `{"error": ...}` body.
    #[error("backend reported: {0}")]
    Backend(String),
    /// A lifecycle endpoint answered `{"success": false}`.
    #[error("backend rejected {operation}")]
    Rejected { operation: &'static str },
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("invalid backend url: {0}")]
    InvalidBaseUrl(String),
}

impl ClientError {
    /// Short, operator facing description used by status lines.
    pub fn summary(&self) -> String {
        match self {
            ClientError::Transport { path, source } if source.is_timeout() => {
                format!("{path}: timed out")
            }
            ClientError::Transport { path, .. } => format!("{path}: unreachable"),
            ClientError::Status { path, status } => format!("{path}: HTTP {status}"),
            ClientError::Decode { path, location, .. } => {
                format!("{path}: bad payload at {location}")
            }
            other => other.to_string(),
        }
    }
}
