//! Account, balance and reward-share storage.

use crate::StoreError;
use cairn_types::{Address, Amount, AssetId, GroupId, PublicKey, Signature, NO_GROUP};
use serde::{Deserialize, Serialize};

/// Account flag bit granting minting rights regardless of level.
pub const FOUNDER_FLAG: u32 = 1;

/// Per-account record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountData {
    pub address: Address,
    pub public_key: Option<PublicKey>,
    /// Signature of the most recently applied transaction this account authored.
    pub reference: Option<Signature>,
    pub default_group_id: GroupId,
    pub flags: u32,
    pub level: u8,
    pub blocks_minted: u32,
    pub blocks_minted_adjustment: u32,
}

impl AccountData {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            public_key: None,
            reference: None,
            default_group_id: NO_GROUP,
            flags: 0,
            level: 0,
            blocks_minted: 0,
            blocks_minted_adjustment: 0,
        }
    }

    pub fn is_founder(&self) -> bool {
        self.flags & FOUNDER_FLAG != 0
    }
}

/// An active reward-share between a minter and a recipient.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardShareData {
    pub minter_public_key: PublicKey,
    pub minter: Address,
    pub recipient: Address,
    pub reward_share_public_key: PublicKey,
    /// Hundredths of a percent.
    pub share_percent: i32,
}

pub trait AccountStore {
    fn get_account(&self, address: &Address) -> Result<Option<AccountData>, StoreError>;

    /// Insert or replace the account record.
    fn save_account(&self, account: &AccountData) -> Result<(), StoreError>;

    /// Remove the account record and all of its balances.
    fn delete_account(&self, address: &Address) -> Result<(), StoreError>;

    /// Create the account if missing; record the public key if newly known.
    fn ensure_account(
        &self,
        address: &Address,
        public_key: Option<&PublicKey>,
    ) -> Result<(), StoreError>;

    fn get_last_reference(&self, address: &Address) -> Result<Option<Signature>, StoreError>;

    /// Set (or clear) the last reference, creating the account if needed.
    fn set_last_reference(
        &self,
        address: &Address,
        reference: Option<Signature>,
    ) -> Result<(), StoreError>;

    fn get_balance(&self, address: &Address, asset: AssetId) -> Result<Amount, StoreError>;

    /// Overwrite a balance. Negative values are rejected.
    fn set_balance(
        &self,
        address: &Address,
        asset: AssetId,
        balance: Amount,
    ) -> Result<(), StoreError>;

    /// Atomically add `delta` and return the new balance.
    ///
    /// Fails with [`StoreError::NegativeBalance`] without mutating anything if
    /// the result would be below zero.
    fn modify_balance(
        &self,
        address: &Address,
        asset: AssetId,
        delta: Amount,
    ) -> Result<Amount, StoreError>;

    fn get_reward_share(
        &self,
        minter: &PublicKey,
        recipient: &Address,
    ) -> Result<Option<RewardShareData>, StoreError>;

    fn get_reward_share_by_key(
        &self,
        reward_share_public_key: &PublicKey,
    ) -> Result<Option<RewardShareData>, StoreError>;

    fn save_reward_share(&self, share: &RewardShareData) -> Result<(), StoreError>;

    fn delete_reward_share(&self, minter: &PublicKey, recipient: &Address)
        -> Result<(), StoreError>;

    fn count_reward_shares(&self, minter: &PublicKey) -> Result<usize, StoreError>;
}
