//! Registered-name storage.

use crate::StoreError;
use cairn_types::{Address, Amount, GroupId, Signature, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameData {
    pub name: String,
    pub reduced_name: String,
    pub owner: Address,
    pub data: String,
    pub registered: Timestamp,
    pub updated: Option<Timestamp>,
    pub is_for_sale: bool,
    pub sale_price: Option<Amount>,
    /// Signature of the transaction that last changed this record.
    pub reference: Signature,
    pub creation_group_id: GroupId,
}

pub trait NameStore {
    fn get_name(&self, name: &str) -> Result<Option<NameData>, StoreError>;
    fn get_name_by_reduced(&self, reduced_name: &str) -> Result<Option<NameData>, StoreError>;
    fn save_name(&self, name: &NameData) -> Result<(), StoreError>;
    fn delete_name(&self, name: &str) -> Result<(), StoreError>;
    fn count_names_owned(&self, owner: &Address) -> Result<usize, StoreError>;
}
