/// Errors produced by ledger persistence.
///
/// Operation outcomes such as insufficient stock are not errors; they are
/// reported as [`OperationResult`](cw_types::OperationResult) values.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("store error: {0}")]
    Store(#[from] cw_store::StoreError),
}

pub type LedgerResult<T> = Result<T, LedgerError>;
