use cairn_store::StoreError;
use cairn_transactions::TransactionError;
use cairn_types::{Signature, ValidationResult};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("transaction error: {0}")]
    Transaction(#[from] TransactionError),

    /// A block carried a transaction that does not hold against the state
    /// left by its predecessors. Nothing from the block was kept.
    #[error("invalid block: transaction {signature} failed with {}", result.name())]
    InvalidBlock {
        signature: Signature,
        result: ValidationResult,
    },

    #[error("invalid block: transaction {0} has a bad signature")]
    BadSignature(Signature),

    #[error("block height {found} does not follow the tip (expected {expected})")]
    HeightMismatch { expected: u32, found: u32 },

    #[error("block carries {0} transactions, more than a block can index")]
    BlockTooLarge(usize),

    #[error("no block to orphan")]
    EmptyChain,

    #[error("blockchain lock poisoned")]
    LockPoisoned,
}
