//! Error types for decoding and encoding wire messages.

use thiserror::Error;

/// Result type alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while turning bytes into messages and back.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Line is not a JSON object of a known shape.
    ///
    /// Covers invalid JSON, an unknown or missing `type` tag, missing fields
    /// and fields of the wrong type.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Line exceeds [`crate::MAX_MESSAGE_LEN`].
    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge {
        /// Observed size in bytes
        size: usize,
        /// Maximum allowed size
        max: usize,
    },

    /// Reply `msg` text does not name any known reply.
    #[error("unknown reply text: {0:?}")]
    UnknownReply(String),
}
