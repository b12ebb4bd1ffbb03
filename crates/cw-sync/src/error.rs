use thiserror::Error;

use crate::types::ViewerId;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("authority for world {0} has stopped")]
    AuthorityClosed(String),

    #[error("viewer {0} is not joined")]
    UnknownViewer(ViewerId),

    #[error("rejected by authority: code={code}, message={message}")]
    Rejected { code: u32, message: String },

    #[error("transport error: {0}")]
    TransportError(String),

    #[error("ledger error: {0}")]
    Ledger(#[from] cw_ledger::LedgerError),

    #[error("protocol error: {0}")]
    Protocol(#[from] cw_protocol::ProtocolError),
}

pub type SyncResult<T> = Result<T, SyncError>;
