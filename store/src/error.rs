use cairn_types::{Address, Amount, AssetId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("database is corrupted: {0}")]
    Corruption(String),

    /// A balance change would leave an account below zero. Validation should
    /// have prevented this, so it is an invariant violation, not user error.
    #[error("balance of asset {asset} for {address} would become negative ({balance} + {delta})")]
    NegativeBalance {
        address: Address,
        asset: AssetId,
        balance: Amount,
        delta: Amount,
    },
}
