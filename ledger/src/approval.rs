//! Group-approval workflow.
//!
//! A transaction whose type needs approval and whose creator is not already an
//! admin of its `tx_group_id` is confirmed as PENDING: its fee and reference
//! are applied, but `process` is deferred. At every block the pending set is
//! checked. Once the group's minimum block delay has passed, the latest admin
//! decisions are tallied against the group's threshold, and once the maximum
//! delay has passed without an outcome the transaction expires.

use cairn_crypto::account_address;
use cairn_store::{ApprovalRecord, Repository, StoredTransaction};
use cairn_transactions::{Transaction, TxContext};
use cairn_types::{ApprovalStatus, ApprovalThreshold, ValidationResult, NO_GROUP};
use tracing::{debug, info};

use crate::LedgerError;

/// Approval status a transaction starts with, given the current groups.
pub fn initial_status(tx: &Transaction, repo: &dyn Repository) -> Result<ApprovalStatus, LedgerError> {
    if !tx.tx_type().needs_approval() || tx.header.tx_group_id == NO_GROUP {
        return Ok(ApprovalStatus::NotRequired);
    }
    let group_id = tx.header.tx_group_id;
    // A vanished group keeps the transaction out of blocks until it expires.
    if repo.get_group(group_id)?.is_none() {
        return Ok(ApprovalStatus::Pending);
    }
    if repo.is_admin(group_id, &tx.creator_address())? {
        return Ok(ApprovalStatus::NotRequired);
    }
    Ok(ApprovalStatus::Pending)
}

/// Outcome of tallying decisions: `Some(true)` approved, `Some(false)`
/// rejected, `None` undecided.
pub fn tally(
    threshold: ApprovalThreshold,
    approving: usize,
    rejecting: usize,
    total_admins: usize,
) -> Option<bool> {
    if threshold.meets(approving, total_admins) {
        Some(true)
    } else if threshold.meets(rejecting, total_admins) {
        Some(false)
    } else {
        None
    }
}

/// Current decision on a pending transaction from its group's admins.
///
/// Only each admin's latest decision counts, and only while they are still
/// an admin of the group.
pub fn decision(
    pending: &StoredTransaction,
    repo: &dyn Repository,
) -> Result<Option<bool>, LedgerError> {
    let Some(group) = repo.get_group(pending.tx_group_id)? else {
        return Ok(None);
    };
    let mut approving = 0;
    let mut rejecting = 0;
    for ApprovalRecord { admin, approval, .. } in repo.latest_approvals(&pending.signature)? {
        if !repo.is_admin(group.group_id, &account_address(&admin))? {
            continue;
        }
        if approval {
            approving += 1;
        } else {
            rejecting += 1;
        }
    }
    let total = repo.count_admins(group.group_id)?;
    Ok(tally(group.approval_threshold, approving, rejecting, total))
}

/// Expire, reject, invalidate or approve pending transactions at `ctx`'s height.
///
/// Approved transactions are processed here in chain order, against the
/// state left by the whole block.
pub fn resolve(ctx: &TxContext<'_>) -> Result<(), LedgerError> {
    let Some(height) = ctx.block_height else {
        return Ok(());
    };
    let repo = ctx.repo;

    // every node must process approved transactions in the same order
    let mut pending = repo.pending_approvals()?;
    pending.sort_by_key(StoredTransaction::chain_position);

    for mut stored in pending {
        let Some(confirmed_at) = stored.block_height else {
            continue;
        };
        let Some(group) = repo.get_group(stored.tx_group_id)? else {
            debug!(signature = %stored.signature, "pending transaction's group no longer exists");
            continue;
        };

        if height > confirmed_at.saturating_add(group.max_block_delay) {
            info!(signature = %stored.signature, height, "group approval expired");
            stored.approval_status = ApprovalStatus::Expired;
            stored.approval_height = Some(height);
            repo.save_transaction(&stored)?;
            continue;
        }
        if height < confirmed_at.saturating_add(group.min_block_delay) {
            continue;
        }

        let Some(approved) = decision(&stored, repo)? else {
            continue;
        };
        stored.approval_height = Some(height);

        if !approved {
            info!(signature = %stored.signature, height, "group approval rejected");
            stored.approval_status = ApprovalStatus::Rejected;
            repo.save_transaction(&stored)?;
            continue;
        }

        let mut tx = Transaction::from_stored(&stored)?;
        let processable = tx.is_processable(ctx)?;
        if processable != ValidationResult::Ok {
            info!(
                signature = %stored.signature,
                result = processable.name(),
                "approved transaction is no longer processable"
            );
            stored.approval_status = ApprovalStatus::Invalid;
            repo.save_transaction(&stored)?;
            continue;
        }

        info!(signature = %stored.signature, height, "group approval granted");
        tx.approval_status = ApprovalStatus::Approved;
        tx.process(ctx)?;
        stored.approval_status = ApprovalStatus::Approved;
        stored.record = tx.to_record()?;
        repo.save_transaction(&stored)?;
    }
    Ok(())
}

/// Undo every decision reached at `ctx`'s height, last decided first,
/// returning those transactions to PENDING.
pub fn unresolve(ctx: &TxContext<'_>) -> Result<(), LedgerError> {
    let Some(height) = ctx.block_height else {
        return Ok(());
    };
    let repo = ctx.repo;

    let mut decided = repo.approvals_decided_at(height)?;
    decided.sort_by_key(StoredTransaction::chain_position);

    for mut stored in decided.into_iter().rev() {
        if stored.approval_status == ApprovalStatus::Approved {
            let mut tx = Transaction::from_stored(&stored)?;
            tx.orphan(ctx)?;
            stored.record = tx.to_record()?;
        }
        debug!(signature = %stored.signature, height, "group approval decision reverted");
        stored.approval_status = ApprovalStatus::Pending;
        stored.approval_height = None;
        repo.save_transaction(&stored)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approval_is_checked_before_rejection() {
        // NONE is met by any count, so it always approves
        assert_eq!(tally(ApprovalThreshold::None, 0, 5, 5), Some(true));
        assert_eq!(tally(ApprovalThreshold::One, 0, 1, 3), Some(false));
        assert_eq!(tally(ApprovalThreshold::One, 0, 0, 3), None);
    }

    #[test]
    fn majority_needs_more_than_half() {
        assert_eq!(tally(ApprovalThreshold::Majority, 2, 0, 4), None);
        assert_eq!(tally(ApprovalThreshold::Majority, 3, 1, 4), Some(true));
        assert_eq!(tally(ApprovalThreshold::Majority, 1, 3, 4), Some(false));
    }

    #[test]
    fn percentage_thresholds_need_a_vote() {
        assert_eq!(tally(ApprovalThreshold::Pct20, 0, 0, 0), None);
        assert_eq!(tally(ApprovalThreshold::Pct40, 2, 0, 5), Some(true));
        assert_eq!(tally(ApprovalThreshold::Pct100, 4, 1, 5), None);
    }
}
