//! Transaction and approval-decision storage.

use crate::StoreError;
use cairn_types::{ApprovalStatus, GroupId, PublicKey, Signature, Timestamp, TransactionType};
use serde::{Deserialize, Serialize};

/// A stored transaction: indexed header fields plus the encoded record.
///
/// `record` is the full transaction (wire fields, approval status and undo
/// state) as serialized by `cairn-transactions`; the store treats it as opaque.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTransaction {
    pub signature: Signature,
    pub tx_type: TransactionType,
    pub creator: PublicKey,
    pub timestamp: Timestamp,
    pub tx_group_id: GroupId,
    pub approval_status: ApprovalStatus,
    /// Height of the containing block, `None` while unconfirmed.
    pub block_height: Option<u32>,
    /// Position within the containing block.
    pub block_sequence: Option<u32>,
    /// Height at which a group-approval outcome was reached.
    pub approval_height: Option<u32>,
    pub record: Vec<u8>,
}

impl StoredTransaction {
    pub fn is_confirmed(&self) -> bool {
        self.block_height.is_some()
    }

    /// Where the transaction sits in the chain: block height, then sequence
    /// within the block. Unconfirmed transactions sort first.
    pub fn chain_position(&self) -> (Option<u32>, Option<u32>) {
        (self.block_height, self.block_sequence)
    }
}

/// One admin's decision on a pending transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    /// Signature of the GROUP_APPROVAL transaction carrying the decision.
    pub decision_signature: Signature,
    pub pending_signature: Signature,
    pub admin: PublicKey,
    pub approval: bool,
    /// The admin's previous decision on the same pending transaction, if any.
    pub prior_reference: Option<Signature>,
}

pub trait TransactionStore {
    fn transaction_exists(&self, signature: &Signature) -> Result<bool, StoreError>;
    fn get_transaction(&self, signature: &Signature)
        -> Result<Option<StoredTransaction>, StoreError>;

    /// Insert or replace.
    fn save_transaction(&self, tx: &StoredTransaction) -> Result<(), StoreError>;

    /// Remove the transaction and any unconfirmed marker for it.
    fn delete_transaction(&self, signature: &Signature) -> Result<(), StoreError>;

    fn add_unconfirmed(&self, signature: &Signature) -> Result<(), StoreError>;
    fn remove_unconfirmed(&self, signature: &Signature) -> Result<(), StoreError>;
    fn is_unconfirmed(&self, signature: &Signature) -> Result<bool, StoreError>;

    /// All unconfirmed transactions, in no particular order.
    fn unconfirmed_transactions(&self) -> Result<Vec<StoredTransaction>, StoreError>;

    /// Transactions confirmed at `height`, in block order.
    fn transactions_in_block(&self, height: u32) -> Result<Vec<StoredTransaction>, StoreError>;

    /// Confirmed transactions still awaiting a group-approval outcome, in
    /// chain order (see [`StoredTransaction::chain_position`]).
    fn pending_approvals(&self) -> Result<Vec<StoredTransaction>, StoreError>;

    /// Transactions whose approval outcome was reached at `height`, in chain
    /// order. Outcomes at one height are reached in that order, so undoing
    /// them walks it backwards.
    fn approvals_decided_at(&self, height: u32) -> Result<Vec<StoredTransaction>, StoreError>;

    /// Every stored transaction of `tx_type` authored by `creator`.
    fn find_transactions(
        &self,
        creator: &PublicKey,
        tx_type: TransactionType,
    ) -> Result<Vec<StoredTransaction>, StoreError>;

    fn save_approval(&self, record: &ApprovalRecord) -> Result<(), StoreError>;
    fn delete_approval(&self, decision_signature: &Signature) -> Result<(), StoreError>;

    /// The most recent decision by `admin` on `pending`.
    fn latest_approval(
        &self,
        pending: &Signature,
        admin: &PublicKey,
    ) -> Result<Option<ApprovalRecord>, StoreError>;

    /// The most recent decision of every admin who has voted on `pending`.
    fn latest_approvals(&self, pending: &Signature) -> Result<Vec<ApprovalRecord>, StoreError>;
}
