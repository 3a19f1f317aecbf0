//! Error types returned by the network server

use thiserror::Error;

use crate::lorawan::phy::FrameError;

/// Network server error
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed request, structurally invalid prefix or undecodable frame
    #[error("invalid argument {field}: {reason}")]
    InvalidArgument {
        /// Name of the offending argument
        field: &'static str,
        /// Human readable reason
        reason: String,
    },
    /// No device at an identity, or no prefix satisfying the constraints
    #[error("{0} not found")]
    NotFound(String),
    /// Frame could not be encoded
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
    /// Device store failure, passed through untouched
    #[error("device store error: {0}")]
    Store(String),
    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn invalid_argument(field: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            field,
            reason: reason.into(),
        }
    }

    /// Whether this is an `InvalidArgument` error
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument { .. })
    }

    /// Whether this is a `NotFound` error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

/// Result alias used throughout the crate
pub type Result<T, E = Error> = core::result::Result<T, E>;
