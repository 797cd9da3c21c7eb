//! GROUP_APPROVAL: an admin's decision on a pending transaction.
//!
//! Decisions are stored as [`ApprovalRecord`]s. Each one links to the same
//! admin's earlier decision on the same pending transaction, so only the
//! latest counts and orphaning a decision re-exposes the one before it.

use cairn_store::ApprovalRecord;
use cairn_types::{ApprovalStatus, Signature, ValidationResult};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::behaviour::Behaviour;
use crate::checks::{self, ensure};
use crate::{Transaction, TransactionError, TxContext, UndoState};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupApprovalBody {
    pub pending_signature: Signature,
    pub approval: bool,
}

impl Behaviour for GroupApprovalBody {
    fn is_valid(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        let Some(pending) = ctx.repo.get_transaction(&self.pending_signature)? else {
            return Ok(ValidationResult::TransactionUnknown);
        };
        ensure!(
            pending.approval_status != ApprovalStatus::NotRequired,
            ValidationResult::GroupApprovalNotRequired
        );
        ensure!(
            pending.approval_status == ApprovalStatus::Pending,
            ValidationResult::GroupApprovalDecided
        );
        ensure!(
            ctx.repo
                .is_admin(pending.tx_group_id, &tx.creator_address())?,
            ValidationResult::NotGroupAdmin
        );
        ensure!(checks::covers_fee(tx, ctx)?, ValidationResult::NoBalance);
        Ok(ValidationResult::Ok)
    }

    fn process(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<Option<UndoState>, TransactionError> {
        let prior = ctx
            .repo
            .latest_approval(&self.pending_signature, &tx.header.creator)?;
        trace!(
            pending = %self.pending_signature,
            approval = self.approval,
            replaces = prior.is_some(),
            "recording approval decision"
        );
        ctx.repo.save_approval(&ApprovalRecord {
            decision_signature: tx.signature,
            pending_signature: self.pending_signature,
            admin: tx.header.creator,
            approval: self.approval,
            prior_reference: prior.map(|record| record.decision_signature),
        })?;
        Ok(None)
    }

    fn orphan(&self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        ctx.repo.delete_approval(&tx.signature)?;
        Ok(())
    }
}
