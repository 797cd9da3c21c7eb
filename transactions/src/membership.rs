//! Membership changes for a single (group, account) pair: bans, kicks,
//! invites, joins and leaves.
//!
//! Every variant here undoes itself by restoring a [`MembershipSnapshot`] of
//! the affected pair, captured before `process` touches anything.
//!
//! [`MembershipSnapshot`]: crate::MembershipSnapshot

use cairn_store::{BanData, InviteData, JoinRequestData};
use cairn_types::{Address, GroupId, Timestamp, ValidationResult};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::behaviour::Behaviour;
use crate::checks::{self, ensure};
use crate::group::{add_member, remove_member, restore_snapshot, snapshot};
use crate::{Transaction, TransactionError, TxContext, UndoState};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupBanBody {
    pub group_id: GroupId,
    pub offender: Address,
    pub reason: String,
    /// Seconds; zero bans permanently.
    pub time_to_live: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelGroupBanBody {
    pub group_id: GroupId,
    pub member: Address,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupKickBody {
    pub group_id: GroupId,
    pub member: Address,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInviteBody {
    pub group_id: GroupId,
    pub invitee: Address,
    /// Seconds; zero never expires.
    pub time_to_live: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelGroupInviteBody {
    pub group_id: GroupId,
    pub invitee: Address,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinGroupBody {
    pub group_id: GroupId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveGroupBody {
    pub group_id: GroupId,
}

fn expiry(tx: &Transaction, time_to_live: i32) -> Option<Timestamp> {
    (time_to_live > 0).then(|| {
        tx.header
            .timestamp
            .saturating_add_millis(u64::from(time_to_live.unsigned_abs()) * 1000)
    })
}

/// Common admin-side preamble: target address, group existence, creator is an admin.
fn check_admin_action(
    tx: &Transaction,
    ctx: &TxContext<'_>,
    group_id: GroupId,
    target: &Address,
) -> Result<ValidationResult, TransactionError> {
    ensure!(
        checks::is_valid_address(target),
        ValidationResult::InvalidAddress
    );
    ensure!(
        ctx.repo.get_group(group_id)?.is_some(),
        ValidationResult::GroupDoesNotExist
    );
    ensure!(
        ctx.repo.is_admin(group_id, &tx.creator_address())?,
        ValidationResult::NotGroupAdmin
    );
    Ok(ValidationResult::Ok)
}

/// The owner can act on anyone but themselves; other admins only on non-admins.
fn check_outranks(
    tx: &Transaction,
    ctx: &TxContext<'_>,
    group_id: GroupId,
    target: &Address,
) -> Result<ValidationResult, TransactionError> {
    let group = ctx
        .repo
        .get_group(group_id)?
        .ok_or_else(|| tx.missing("group"))?;
    ensure!(*target != group.owner, ValidationResult::InvalidGroupOwner);
    ensure!(
        tx.creator_address() == group.owner || !ctx.repo.is_admin(group_id, target)?,
        ValidationResult::InvalidGroupOwner
    );
    Ok(ValidationResult::Ok)
}

macro_rules! check {
    ($result:expr) => {
        let result = $result;
        if !result.is_ok() {
            return Ok(result);
        }
    };
}

// ── GROUP_BAN / CANCEL_GROUP_BAN ───────────────────────────────────────

impl Behaviour for GroupBanBody {
    fn recipients(&self) -> Vec<Address> {
        vec![self.offender.clone()]
    }

    fn is_valid(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        ensure!(self.time_to_live >= 0, ValidationResult::InvalidLifetime);
        check!(check_admin_action(tx, ctx, self.group_id, &self.offender)?);
        check!(check_outranks(tx, ctx, self.group_id, &self.offender)?);
        ensure!(checks::covers_fee(tx, ctx)?, ValidationResult::NoBalance);
        Ok(ValidationResult::Ok)
    }

    fn process(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<Option<UndoState>, TransactionError> {
        let before = snapshot(ctx, self.group_id, &self.offender)?;
        remove_member(ctx, self.group_id, &self.offender)?;
        ctx.repo.delete_join_request(self.group_id, &self.offender)?;
        ctx.repo.delete_invite(self.group_id, &self.offender)?;
        ctx.repo.save_ban(&BanData {
            group_id: self.group_id,
            offender: self.offender.clone(),
            admin: tx.creator_address(),
            banned: tx.header.timestamp,
            reason: self.reason.clone(),
            expiry: expiry(tx, self.time_to_live),
            reference: tx.signature,
        })?;
        Ok(Some(UndoState::Membership(before)))
    }

    fn orphan(&self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        restore_snapshot(tx, ctx)
    }
}

impl Behaviour for CancelGroupBanBody {
    fn recipients(&self) -> Vec<Address> {
        vec![self.member.clone()]
    }

    fn is_valid(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        check!(check_admin_action(tx, ctx, self.group_id, &self.member)?);
        ensure!(
            ctx.repo.get_ban(self.group_id, &self.member)?.is_some(),
            ValidationResult::BanUnknown
        );
        ensure!(checks::covers_fee(tx, ctx)?, ValidationResult::NoBalance);
        Ok(ValidationResult::Ok)
    }

    fn process(
        &self,
        _tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<Option<UndoState>, TransactionError> {
        let before = snapshot(ctx, self.group_id, &self.member)?;
        ctx.repo.delete_ban(self.group_id, &self.member)?;
        Ok(Some(UndoState::Membership(before)))
    }

    fn orphan(&self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        restore_snapshot(tx, ctx)
    }
}

// ── GROUP_KICK ─────────────────────────────────────────────────────────

impl Behaviour for GroupKickBody {
    fn recipients(&self) -> Vec<Address> {
        vec![self.member.clone()]
    }

    fn is_valid(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        check!(check_admin_action(tx, ctx, self.group_id, &self.member)?);
        ensure!(
            ctx.repo.is_member(self.group_id, &self.member)?
                || ctx
                    .repo
                    .get_join_request(self.group_id, &self.member)?
                    .is_some(),
            ValidationResult::NotGroupMember
        );
        check!(check_outranks(tx, ctx, self.group_id, &self.member)?);
        ensure!(checks::covers_fee(tx, ctx)?, ValidationResult::NoBalance);
        Ok(ValidationResult::Ok)
    }

    fn process(
        &self,
        _tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<Option<UndoState>, TransactionError> {
        let before = snapshot(ctx, self.group_id, &self.member)?;
        if before.join_request.is_some() {
            // a pending request is rejected rather than a membership removed
            ctx.repo.delete_join_request(self.group_id, &self.member)?;
        } else {
            remove_member(ctx, self.group_id, &self.member)?;
        }
        Ok(Some(UndoState::Membership(before)))
    }

    fn orphan(&self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        restore_snapshot(tx, ctx)
    }
}

// ── GROUP_INVITE / CANCEL_GROUP_INVITE ─────────────────────────────────

impl Behaviour for GroupInviteBody {
    fn recipients(&self) -> Vec<Address> {
        vec![self.invitee.clone()]
    }

    fn is_valid(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        ensure!(self.time_to_live >= 0, ValidationResult::InvalidLifetime);
        check!(check_admin_action(tx, ctx, self.group_id, &self.invitee)?);
        ensure!(
            !ctx.repo.is_member(self.group_id, &self.invitee)?,
            ValidationResult::AlreadyGroupMember
        );
        ensure!(
            ctx.repo.get_ban(self.group_id, &self.invitee)?.is_none(),
            ValidationResult::BannedFromGroup
        );
        ensure!(checks::covers_fee(tx, ctx)?, ValidationResult::NoBalance);
        Ok(ValidationResult::Ok)
    }

    fn process(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<Option<UndoState>, TransactionError> {
        let before = snapshot(ctx, self.group_id, &self.invitee)?;
        if before.join_request.is_some() {
            trace!(group = self.group_id, invitee = %self.invitee, "invite accepts pending join request");
            ctx.repo.delete_join_request(self.group_id, &self.invitee)?;
            add_member(tx, ctx, self.group_id, &self.invitee)?;
        } else {
            ctx.repo.save_invite(&InviteData {
                group_id: self.group_id,
                inviter: tx.creator_address(),
                invitee: self.invitee.clone(),
                expiry: expiry(tx, self.time_to_live),
                reference: tx.signature,
            })?;
        }
        Ok(Some(UndoState::Membership(before)))
    }

    fn orphan(&self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        restore_snapshot(tx, ctx)
    }
}

impl Behaviour for CancelGroupInviteBody {
    fn recipients(&self) -> Vec<Address> {
        vec![self.invitee.clone()]
    }

    fn is_valid(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        check!(check_admin_action(tx, ctx, self.group_id, &self.invitee)?);
        ensure!(
            ctx.repo.get_invite(self.group_id, &self.invitee)?.is_some(),
            ValidationResult::InviteUnknown
        );
        ensure!(checks::covers_fee(tx, ctx)?, ValidationResult::NoBalance);
        Ok(ValidationResult::Ok)
    }

    fn process(
        &self,
        _tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<Option<UndoState>, TransactionError> {
        let before = snapshot(ctx, self.group_id, &self.invitee)?;
        ctx.repo.delete_invite(self.group_id, &self.invitee)?;
        Ok(Some(UndoState::Membership(before)))
    }

    fn orphan(&self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        restore_snapshot(tx, ctx)
    }
}

// ── JOIN_GROUP / LEAVE_GROUP ───────────────────────────────────────────

impl Behaviour for JoinGroupBody {
    fn is_valid(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        let joiner = tx.creator_address();
        ensure!(
            ctx.repo.get_group(self.group_id)?.is_some(),
            ValidationResult::GroupDoesNotExist
        );
        ensure!(
            !ctx.repo.is_member(self.group_id, &joiner)?,
            ValidationResult::AlreadyGroupMember
        );
        ensure!(
            ctx.repo.get_ban(self.group_id, &joiner)?.is_none(),
            ValidationResult::BannedFromGroup
        );
        ensure!(
            ctx.repo.get_join_request(self.group_id, &joiner)?.is_none(),
            ValidationResult::JoinRequestExists
        );
        ensure!(checks::covers_fee(tx, ctx)?, ValidationResult::NoBalance);
        Ok(ValidationResult::Ok)
    }

    fn process(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<Option<UndoState>, TransactionError> {
        let joiner = tx.creator_address();
        let group = ctx
            .repo
            .get_group(self.group_id)?
            .ok_or_else(|| tx.missing("group"))?;
        let before = snapshot(ctx, self.group_id, &joiner)?;

        let invited = before
            .invite
            .as_ref()
            .is_some_and(|invite| invite.is_live_at(tx.header.timestamp));
        if invited || group.is_open {
            if invited {
                ctx.repo.delete_invite(self.group_id, &joiner)?;
            }
            add_member(tx, ctx, self.group_id, &joiner)?;
        } else {
            trace!(group = self.group_id, joiner = %joiner, "closed group, recording join request");
            ctx.repo.save_join_request(&JoinRequestData {
                group_id: self.group_id,
                joiner: joiner.clone(),
                reference: tx.signature,
            })?;
        }
        Ok(Some(UndoState::Membership(before)))
    }

    fn orphan(&self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        restore_snapshot(tx, ctx)
    }
}

impl Behaviour for LeaveGroupBody {
    fn is_valid(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        let leaver = tx.creator_address();
        let Some(group) = ctx.repo.get_group(self.group_id)? else {
            return Ok(ValidationResult::GroupDoesNotExist);
        };
        ensure!(leaver != group.owner, ValidationResult::GroupOwnerCannotLeave);
        ensure!(
            ctx.repo.is_member(self.group_id, &leaver)?,
            ValidationResult::NotGroupMember
        );
        ensure!(checks::covers_fee(tx, ctx)?, ValidationResult::NoBalance);
        Ok(ValidationResult::Ok)
    }

    fn process(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<Option<UndoState>, TransactionError> {
        let leaver = tx.creator_address();
        let before = snapshot(ctx, self.group_id, &leaver)?;
        remove_member(ctx, self.group_id, &leaver)?;
        Ok(Some(UndoState::Membership(before)))
    }

    fn orphan(&self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        restore_snapshot(tx, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TxBody, TxHeader};
    use cairn_types::{Amount, PublicKey, NO_GROUP};

    fn invite_at(timestamp: u64, time_to_live: i32) -> Transaction {
        let body = GroupInviteBody {
            group_id: 1,
            invitee: Address::new("Qinvitee"),
            time_to_live,
        };
        Transaction::new(
            TxHeader {
                timestamp: Timestamp::from_millis(timestamp),
                tx_group_id: NO_GROUP,
                reference: None,
                creator: PublicKey([7; 32]),
                fee: Amount::ZERO,
            },
            TxBody::GroupInvite(body),
        )
    }

    #[test]
    fn zero_lifetime_never_expires() {
        assert_eq!(expiry(&invite_at(1_000, 0), 0), None);
    }

    #[test]
    fn lifetime_is_in_seconds() {
        let tx = invite_at(1_000, 60);
        assert_eq!(expiry(&tx, 60), Some(Timestamp::from_millis(61_000)));
    }
}
