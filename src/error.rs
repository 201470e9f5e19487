use std::path::PathBuf;
use thiserror::Error;

/// Every failure a boundary-facing operation can report.
///
/// Variants are grouped by where they come from: input validation,
/// the network, image/metadata decoding, tag editing and encoding.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Unsupported URL scheme '{0}' (only http and https are allowed)")]
    UnsupportedScheme(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Could not connect to {host}: {reason}")]
    Connect { host: String, reason: String },

    #[error("Download timed out after {0} seconds")]
    Timeout(u64),

    #[error("Server returned HTTP {status}")]
    HttpStatus { status: u16 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Downloaded data is not a recognised image ({0})")]
    NotAnImage(String),

    #[error("Could not decode image: {0}")]
    Decode(String),

    #[error("Unknown tag '{0}'")]
    UnknownTag(String),

    #[error("Invalid value '{value}' for {tag}: {reason}")]
    InvalidValue {
        tag: String,
        value: String,
        reason: String,
    },

    #[error("Could not encode metadata: {0}")]
    Encode(String),

    #[error("Session already finished")]
    SessionClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for mistakes the user can fix by answering a prompt again.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidUrl { .. }
                | Self::UnsupportedScheme(_)
                | Self::InvalidInput(_)
                | Self::NotFound(_)
                | Self::UnknownTag(_)
                | Self::InvalidValue { .. }
        )
    }

    pub(crate) fn invalid_value(tag: &str, value: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            tag: tag.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
