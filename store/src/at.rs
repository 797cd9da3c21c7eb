//! AT (automated transaction) account storage.
//!
//! Only the metadata the ledger engine consults lives here; execution state is
//! owned by the external AT machine.

use crate::StoreError;
use cairn_types::{Address, Amount, AssetId, PublicKey, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtData {
    pub address: Address,
    pub creator: PublicKey,
    pub creation: Timestamp,
    pub version: u16,
    pub asset_id: AssetId,
    pub code_bytes: Vec<u8>,
    pub code_hash: [u8; 32],
    pub is_sleeping: bool,
    pub sleep_until_height: Option<u32>,
    pub is_finished: bool,
    pub had_fatal_error: bool,
    pub is_frozen: bool,
    pub frozen_balance: Option<Amount>,
}

pub trait AtStore {
    fn get_at(&self, address: &Address) -> Result<Option<AtData>, StoreError>;
    fn save_at(&self, at: &AtData) -> Result<(), StoreError>;
    fn delete_at(&self, address: &Address) -> Result<(), StoreError>;
}
