use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("ledger error: {0}")]
    Ledger(#[from] cairn_ledger::LedgerError),

    #[error("store error: {0}")]
    Store(#[from] cairn_store::StoreError),

    #[error("config error: {0}")]
    Config(String),

    #[error("metrics error: {0}")]
    Metrics(String),

    /// The caller stopped waiting. The submission may still complete in the
    /// background once the blockchain lock frees up.
    #[error("timed out after {0} ms waiting for the blockchain lock")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
