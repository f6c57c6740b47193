//! Error types for Simple Message operations

use crate::messages::MsgType;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MotoError>;

#[derive(Error, Debug)]
pub enum MotoError {
    #[error("Connection to {addr} failed: {source}")]
    Connection {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Protocol desynchronisation on the wire. The connection that produced one
/// should be treated as suspect.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Unknown message type: {0}")]
    UnknownMessageType(i32),

    #[error("Unknown comm type: {0}")]
    UnknownCommType(i32),

    #[error("Unknown reply type: {0}")]
    UnknownReplyType(i32),

    #[error("Body truncated: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("Invalid prefix length: {0}")]
    InvalidPrefix(i32),

    #[error("{msg_type:?} body must be {expected} bytes, got {actual}")]
    LengthMismatch {
        msg_type: MsgType,
        expected: usize,
        actual: usize,
    },

    #[error("{msg_type:?} declares {count} groups")]
    GroupCount { msg_type: MsgType, count: i32 },

    #[error("Expected {expected:?} reply, got {actual:?}")]
    UnexpectedMessage { expected: MsgType, actual: MsgType },
}

impl MotoError {
    /// True for failures that leave the connection unusable until reconnect.
    pub fn is_connection_failure(&self) -> bool {
        matches!(
            self,
            MotoError::Connection { .. } | MotoError::ConnectionClosed(_) | MotoError::Io(_)
        )
    }
}
