//! Repository contract for the Cairn ledger engine.
//!
//! Every storage backend (SQL, embedded KV, in-memory for testing) implements
//! these traits. The engine depends only on the traits and receives a
//! `&dyn Repository` for each unit of work.

pub mod account;
pub mod asset;
pub mod at;
pub mod chain;
pub mod error;
pub mod group;
pub mod name;
pub mod poll;
pub mod transaction;

pub use account::{AccountData, AccountStore, RewardShareData, FOUNDER_FLAG};
pub use asset::{AssetData, AssetStore, OrderData, TradeData};
pub use at::{AtData, AtStore};
pub use chain::{BlockSummary, ChainStore};
pub use error::StoreError;
pub use group::{
    AdminData, BanData, GroupData, GroupStore, InviteData, JoinRequestData, MemberData,
};
pub use name::{NameData, NameStore};
pub use poll::{PollData, PollStore, VoteData};
pub use transaction::{ApprovalRecord, StoredTransaction, TransactionStore};

/// The full repository as seen by one unit of work.
///
/// Changes accumulate until `save_changes` commits them or `discard_changes`
/// drops everything since the last commit.
pub trait Repository:
    AccountStore
    + AssetStore
    + AtStore
    + ChainStore
    + GroupStore
    + NameStore
    + PollStore
    + TransactionStore
    + Send
    + Sync
{
    fn save_changes(&self) -> Result<(), StoreError>;
    fn discard_changes(&self) -> Result<(), StoreError>;
}
