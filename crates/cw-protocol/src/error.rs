use cw_types::ResourceType;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid message type: {0}")]
    InvalidMessageType(u8),

    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("framing error: {0}")]
    FramingError(String),

    #[error("version mismatch: local {local}, remote {remote}")]
    VersionMismatch { local: u32, remote: u32 },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("unknown resource type: {0}")]
    UnknownResource(ResourceType),

    #[error("{0} carries a zero count")]
    ZeroCount(&'static str),

    #[error("unexpected message: {0}")]
    UnexpectedMessage(&'static str),

    #[error("protocol error: code={code}, message={message}")]
    RemoteError { code: u32, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Code sent back to a viewer when its message is rejected.
    pub fn wire_code(&self) -> u32 {
        use crate::message::error_codes;
        match self {
            Self::UnknownResource(_) => error_codes::UNKNOWN_RESOURCE,
            Self::VersionMismatch { .. } => error_codes::VERSION_MISMATCH,
            Self::RemoteError { code, .. } => *code,
            Self::Io(_) => error_codes::UNAVAILABLE,
            _ => error_codes::MALFORMED,
        }
    }
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
