//! Chain tip storage.

use crate::StoreError;
use cairn_types::Timestamp;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSummary {
    pub height: u32,
    pub timestamp: Timestamp,
    pub transaction_count: u32,
}

pub trait ChainStore {
    /// Height of the current tip; 0 before the first block.
    fn chain_height(&self) -> Result<u32, StoreError>;

    fn last_block(&self) -> Result<Option<BlockSummary>, StoreError>;

    fn push_block(&self, block: &BlockSummary) -> Result<(), StoreError>;

    /// Remove and return the tip.
    fn pop_block(&self) -> Result<Option<BlockSummary>, StoreError>;
}
