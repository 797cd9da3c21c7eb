//! Asset, order and trade storage.

use crate::StoreError;
use cairn_types::{Address, Amount, AssetId, GroupId, PublicKey, Signature, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetData {
    pub asset_id: AssetId,
    pub owner: Address,
    pub name: String,
    pub reduced_name: String,
    pub description: String,
    pub quantity: Amount,
    pub is_divisible: bool,
    pub data: String,
    pub is_unspendable: bool,
    pub creation_group_id: GroupId,
    /// Signature of the transaction that last changed this record.
    pub reference: Signature,
}

/// A standing order on the asset exchange. The order id is the signature of
/// the CREATE_ASSET_ORDER transaction that placed it.
///
/// `amount` and `fulfilled` are denominated in whichever of the two assets has
/// the higher id; `price` is the lower-id asset per unit of the higher-id one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderData {
    pub order_id: Signature,
    pub creator: PublicKey,
    pub have_asset_id: AssetId,
    pub want_asset_id: AssetId,
    pub amount: Amount,
    pub fulfilled: Amount,
    pub price: Amount,
    pub timestamp: Timestamp,
    pub is_closed: bool,
    pub is_fulfilled: bool,
}

impl OrderData {
    pub fn amount_left(&self) -> Amount {
        Amount::new(self.amount.raw() - self.fulfilled.raw())
    }
}

/// One match between an initiating order and a standing target order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeData {
    pub initiator: Signature,
    pub target: Signature,
    /// Amount moved out of the target order.
    pub target_amount: Amount,
    /// Amount moved out of the initiating order.
    pub initiator_amount: Amount,
    /// Have-asset refunded to the initiator due to price improvement.
    pub initiator_saving: Amount,
    pub timestamp: Timestamp,
}

pub trait AssetStore {
    fn get_asset(&self, asset_id: AssetId) -> Result<Option<AssetData>, StoreError>;
    fn get_asset_by_reduced_name(&self, reduced_name: &str)
        -> Result<Option<AssetData>, StoreError>;

    /// Next free asset id (one past the highest issued).
    fn next_asset_id(&self) -> Result<AssetId, StoreError>;

    fn save_asset(&self, asset: &AssetData) -> Result<(), StoreError>;
    fn delete_asset(&self, asset_id: AssetId) -> Result<(), StoreError>;

    fn get_order(&self, order_id: &Signature) -> Result<Option<OrderData>, StoreError>;
    fn save_order(&self, order: &OrderData) -> Result<(), StoreError>;
    fn delete_order(&self, order_id: &Signature) -> Result<(), StoreError>;

    /// Open orders offering `have` in exchange for `want`, in no particular order.
    fn open_orders(&self, have: AssetId, want: AssetId) -> Result<Vec<OrderData>, StoreError>;

    fn save_trade(&self, trade: &TradeData) -> Result<(), StoreError>;
    fn delete_trade(&self, trade: &TradeData) -> Result<(), StoreError>;
    fn trades_for_order(&self, order_id: &Signature) -> Result<Vec<TradeData>, StoreError>;
}
