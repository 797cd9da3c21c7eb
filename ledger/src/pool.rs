//! Unconfirmed pool ordering.
//!
//! Every node must order the same unconfirmed set identically when assembling
//! or checking a block, so the order depends only on type, timestamp and
//! signature.

use std::cmp::Ordering;

use cairn_transactions::Transaction;
use cairn_types::{Signature, TransactionType, ValidationResult};

/// A transaction dropped from the pool by a sweep.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Eviction {
    pub signature: Signature,
    pub tx_type: TransactionType,
    pub result: ValidationResult,
}

/// Block order: AT transactions first, then by timestamp, then by signature
/// as a big unsigned integer.
///
/// AT transactions compare equal among themselves so a stable sort keeps
/// their generated order.
pub fn block_order(a: &Transaction, b: &Transaction) -> Ordering {
    let a_is_at = a.tx_type() == TransactionType::At;
    let b_is_at = b.tx_type() == TransactionType::At;
    match (a_is_at, b_is_at) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a
            .timestamp()
            .cmp(&b.timestamp())
            .then_with(|| a.signature.cmp(&b.signature)),
    }
}

/// Sort into block order. Stable, so AT transactions keep their relative order.
pub fn sort_for_block(transactions: &mut [Transaction]) {
    transactions.sort_by(block_order);
}

/// Types that live only in the pool and never enter a block.
pub fn is_pool_only(tx_type: TransactionType) -> bool {
    matches!(tx_type, TransactionType::Chat | TransactionType::Presence)
}
