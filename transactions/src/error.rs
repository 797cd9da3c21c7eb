use cairn_store::StoreError;
use cairn_types::{Signature, TransactionType};
use cairn_work::WorkError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("encoding error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("malformed transaction bytes: {0}")]
    Malformed(String),

    #[error("transaction type {0} has no released implementation")]
    UnsupportedType(TransactionType),

    /// `orphan` reached a transaction whose undo state was never captured.
    #[error("missing undo state for transaction {0}")]
    MissingUndoState(Signature),

    #[error("{0} transactions are never processed")]
    NeverProcessed(TransactionType),

    /// A record that validation guaranteed was gone when it was needed.
    #[error("{what} missing while applying transaction {signature}")]
    MissingRecord {
        signature: Signature,
        what: &'static str,
    },

    #[error("amount overflow in transaction {0}")]
    Overflow(Signature),

    /// Matching produced a fractional amount of an indivisible asset.
    #[error("refusing to trade a fractional indivisible amount for order {0}")]
    IndivisibleTrade(Signature),

    #[error("proof-of-work: {0}")]
    Work(#[from] WorkError),
}
