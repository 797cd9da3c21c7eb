//! Poll and vote storage.

use crate::StoreError;
use cairn_types::{Address, PublicKey, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollData {
    pub creator: PublicKey,
    pub owner: Address,
    pub name: String,
    pub description: String,
    pub options: Vec<String>,
    pub published: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteData {
    pub poll_name: String,
    pub voter: PublicKey,
    pub option_index: u32,
}

pub trait PollStore {
    fn get_poll(&self, name: &str) -> Result<Option<PollData>, StoreError>;
    fn save_poll(&self, poll: &PollData) -> Result<(), StoreError>;
    fn delete_poll(&self, name: &str) -> Result<(), StoreError>;

    fn get_vote(&self, poll_name: &str, voter: &PublicKey) -> Result<Option<VoteData>, StoreError>;
    fn save_vote(&self, vote: &VoteData) -> Result<(), StoreError>;
    fn delete_vote(&self, poll_name: &str, voter: &PublicKey) -> Result<(), StoreError>;
}
