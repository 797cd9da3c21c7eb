use cairn_store::Repository;
use cairn_types::{LedgerParams, Timestamp};

/// Everything a transaction may consult while validating or applying.
#[derive(Clone, Copy)]
pub struct TxContext<'a> {
    pub repo: &'a dyn Repository,
    pub params: &'a LedgerParams,
    /// Wall-clock time during admission, block timestamp during application.
    pub now: Timestamp,
    /// Height of the block being applied, `None` during admission.
    pub block_height: Option<u32>,
}

impl<'a> TxContext<'a> {
    pub fn admission(repo: &'a dyn Repository, params: &'a LedgerParams, now: Timestamp) -> Self {
        Self {
            repo,
            params,
            now,
            block_height: None,
        }
    }

    pub fn block(
        repo: &'a dyn Repository,
        params: &'a LedgerParams,
        timestamp: Timestamp,
        height: u32,
    ) -> Self {
        Self {
            repo,
            params,
            now: timestamp,
            block_height: Some(height),
        }
    }

    /// True only while the very first block is being applied.
    pub fn is_genesis_block(&self) -> bool {
        self.block_height == Some(1)
    }
}
