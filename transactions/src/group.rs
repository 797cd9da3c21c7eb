//! Group lifecycle: CREATE_GROUP, UPDATE_GROUP, SET_GROUP, ADD_GROUP_ADMIN
//! and REMOVE_GROUP_ADMIN.

use cairn_store::{AccountData, AdminData, GroupData, MemberData};
use cairn_types::{Address, ApprovalThreshold, GroupId, ValidationResult};
use serde::{Deserialize, Serialize};

use crate::behaviour::Behaviour;
use crate::checks::{self, ensure};
use crate::naming::{is_normalized, reduce, utf8_len_within};
use crate::{MembershipSnapshot, Transaction, TransactionError, TxContext, UndoState};

pub const MIN_NAME_SIZE: usize = 3;
pub const MAX_NAME_SIZE: usize = 32;
pub const MAX_DESCRIPTION_SIZE: usize = 128;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateGroupBody {
    pub group_name: String,
    pub description: String,
    pub is_open: bool,
    pub approval_threshold: ApprovalThreshold,
    pub min_block_delay: u32,
    pub max_block_delay: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateGroupBody {
    pub group_id: GroupId,
    pub new_owner: Address,
    pub new_description: String,
    pub new_is_open: bool,
    pub new_approval_threshold: ApprovalThreshold,
    pub new_min_block_delay: u32,
    pub new_max_block_delay: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetGroupBody {
    pub default_group_id: GroupId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddGroupAdminBody {
    pub group_id: GroupId,
    pub member: Address,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveGroupAdminBody {
    pub group_id: GroupId,
    pub admin: Address,
}

fn block_delays_valid(min: u32, max: u32) -> bool {
    max >= 1 && max >= min
}

// ── Membership row helpers ─────────────────────────────────────────────

pub(crate) fn add_member(
    tx: &Transaction,
    ctx: &TxContext<'_>,
    group_id: GroupId,
    member: &Address,
) -> Result<(), TransactionError> {
    ctx.repo.save_member(&MemberData {
        group_id,
        member: member.clone(),
        joined: tx.header.timestamp,
        reference: tx.signature,
    })?;
    Ok(())
}

pub(crate) fn add_admin(
    tx: &Transaction,
    ctx: &TxContext<'_>,
    group_id: GroupId,
    admin: &Address,
) -> Result<(), TransactionError> {
    ctx.repo.save_admin(&AdminData {
        group_id,
        admin: admin.clone(),
        reference: tx.signature,
    })?;
    Ok(())
}

pub(crate) fn remove_member(
    ctx: &TxContext<'_>,
    group_id: GroupId,
    member: &Address,
) -> Result<(), TransactionError> {
    ctx.repo.delete_admin(group_id, member)?;
    ctx.repo.delete_member(group_id, member)?;
    Ok(())
}

/// Capture the (group, address) rows so `orphan` can restore them.
pub(crate) fn snapshot(
    ctx: &TxContext<'_>,
    group_id: GroupId,
    address: &Address,
) -> Result<MembershipSnapshot, TransactionError> {
    Ok(MembershipSnapshot::capture(ctx.repo, group_id, address)?)
}

pub(crate) fn restore_snapshot(
    tx: &Transaction,
    ctx: &TxContext<'_>,
) -> Result<(), TransactionError> {
    let Some(UndoState::Membership(snapshot)) = &tx.undo else {
        return Err(tx.missing_undo());
    };
    snapshot.restore(ctx.repo)?;
    Ok(())
}

// ── CREATE_GROUP ───────────────────────────────────────────────────────

impl Behaviour for CreateGroupBody {
    fn is_valid(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        ensure!(
            block_delays_valid(self.min_block_delay, self.max_block_delay),
            ValidationResult::InvalidGroupBlockDelay
        );
        ensure!(
            utf8_len_within(&self.group_name, MIN_NAME_SIZE, MAX_NAME_SIZE),
            ValidationResult::InvalidNameLength
        );
        ensure!(
            utf8_len_within(&self.description, 1, MAX_DESCRIPTION_SIZE),
            ValidationResult::InvalidDescriptionLength
        );
        ensure!(
            is_normalized(&self.group_name),
            ValidationResult::NameNotNormalized
        );
        ensure!(checks::covers_fee(tx, ctx)?, ValidationResult::NoBalance);
        Ok(ValidationResult::Ok)
    }

    fn is_processable(
        &self,
        _tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        ensure!(
            ctx.repo
                .get_group_by_reduced_name(&reduce(&self.group_name))?
                .is_none(),
            ValidationResult::GroupAlreadyExists
        );
        Ok(ValidationResult::Ok)
    }

    fn process(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<Option<UndoState>, TransactionError> {
        let group_id = ctx.repo.next_group_id()?;
        let owner = tx.creator_address();
        ctx.repo.save_group(&GroupData {
            group_id,
            owner: owner.clone(),
            name: self.group_name.clone(),
            reduced_name: reduce(&self.group_name),
            description: self.description.clone(),
            created: tx.header.timestamp,
            updated: None,
            is_open: self.is_open,
            approval_threshold: self.approval_threshold,
            min_block_delay: self.min_block_delay,
            max_block_delay: self.max_block_delay,
            reference: tx.signature,
            creation_group_id: tx.header.tx_group_id,
        })?;
        add_member(tx, ctx, group_id, &owner)?;
        add_admin(tx, ctx, group_id, &owner)?;
        Ok(Some(UndoState::CreatedGroup(group_id)))
    }

    fn orphan(&self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        let Some(UndoState::CreatedGroup(group_id)) = tx.undo else {
            return Err(tx.missing_undo());
        };
        ctx.repo.delete_group(group_id)?;
        Ok(())
    }
}

// ── UPDATE_GROUP ───────────────────────────────────────────────────────

impl Behaviour for UpdateGroupBody {
    fn recipients(&self) -> Vec<Address> {
        vec![self.new_owner.clone()]
    }

    fn is_valid(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        ensure!(
            checks::is_valid_address(&self.new_owner),
            ValidationResult::InvalidAddress
        );
        ensure!(
            block_delays_valid(self.new_min_block_delay, self.new_max_block_delay),
            ValidationResult::InvalidGroupBlockDelay
        );
        ensure!(
            utf8_len_within(&self.new_description, 1, MAX_DESCRIPTION_SIZE),
            ValidationResult::InvalidDescriptionLength
        );
        let Some(group) = ctx.repo.get_group(self.group_id)? else {
            return Ok(ValidationResult::GroupDoesNotExist);
        };
        ensure!(
            group.creation_group_id == tx.header.tx_group_id,
            ValidationResult::TxGroupIdMismatch
        );
        ensure!(checks::covers_fee(tx, ctx)?, ValidationResult::NoBalance);
        Ok(ValidationResult::Ok)
    }

    fn is_processable(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        let Some(group) = ctx.repo.get_group(self.group_id)? else {
            return Ok(ValidationResult::GroupDoesNotExist);
        };
        ensure!(
            group.owner == tx.creator_address(),
            ValidationResult::InvalidGroupOwner
        );
        ensure!(
            ctx.repo.get_ban(self.group_id, &self.new_owner)?.is_none(),
            ValidationResult::BannedFromGroup
        );
        Ok(ValidationResult::Ok)
    }

    fn process(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<Option<UndoState>, TransactionError> {
        let previous = ctx
            .repo
            .get_group(self.group_id)?
            .ok_or_else(|| tx.missing("group"))?;
        let new_owner = snapshot(ctx, self.group_id, &self.new_owner)?;

        let mut updated = previous.clone();
        updated.owner = self.new_owner.clone();
        updated.description = self.new_description.clone();
        updated.is_open = self.new_is_open;
        updated.approval_threshold = self.new_approval_threshold;
        updated.min_block_delay = self.new_min_block_delay;
        updated.max_block_delay = self.new_max_block_delay;
        updated.updated = Some(tx.header.timestamp);
        updated.reference = tx.signature;
        ctx.repo.save_group(&updated)?;

        if new_owner.member.is_none() {
            add_member(tx, ctx, self.group_id, &self.new_owner)?;
        }
        if new_owner.admin.is_none() {
            add_admin(tx, ctx, self.group_id, &self.new_owner)?;
        }
        Ok(Some(UndoState::GroupUpdate {
            previous,
            new_owner,
        }))
    }

    fn orphan(&self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        let Some(UndoState::GroupUpdate {
            previous,
            new_owner,
        }) = &tx.undo
        else {
            return Err(tx.missing_undo());
        };
        new_owner.restore(ctx.repo)?;
        ctx.repo.save_group(previous)?;
        Ok(())
    }
}

// ── SET_GROUP ──────────────────────────────────────────────────────────

impl Behaviour for SetGroupBody {
    fn is_valid(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        ensure!(
            ctx.repo.get_group(self.default_group_id)?.is_some(),
            ValidationResult::GroupDoesNotExist
        );
        ensure!(
            ctx.repo
                .is_member(self.default_group_id, &tx.creator_address())?,
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
        let creator = tx.creator_address();
        let mut account = ctx
            .repo
            .get_account(&creator)?
            .unwrap_or_else(|| AccountData::new(creator));
        let previous = account.default_group_id;
        account.default_group_id = self.default_group_id;
        ctx.repo.save_account(&account)?;
        Ok(Some(UndoState::DefaultGroup(previous)))
    }

    fn orphan(&self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        let Some(UndoState::DefaultGroup(previous)) = tx.undo else {
            return Err(tx.missing_undo());
        };
        let mut account = ctx
            .repo
            .get_account(&tx.creator_address())?
            .ok_or_else(|| tx.missing("creator account"))?;
        account.default_group_id = previous;
        ctx.repo.save_account(&account)?;
        Ok(())
    }
}

// ── ADD_GROUP_ADMIN / REMOVE_GROUP_ADMIN ───────────────────────────────

impl Behaviour for AddGroupAdminBody {
    fn recipients(&self) -> Vec<Address> {
        vec![self.member.clone()]
    }

    fn is_valid(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        ensure!(
            checks::is_valid_address(&self.member),
            ValidationResult::InvalidAddress
        );
        let Some(group) = ctx.repo.get_group(self.group_id)? else {
            return Ok(ValidationResult::GroupDoesNotExist);
        };
        ensure!(
            group.owner == tx.creator_address(),
            ValidationResult::InvalidGroupOwner
        );
        ensure!(
            ctx.repo.is_member(self.group_id, &self.member)?,
            ValidationResult::NotGroupMember
        );
        ensure!(
            !ctx.repo.is_admin(self.group_id, &self.member)?,
            ValidationResult::AlreadyGroupAdmin
        );
        ensure!(checks::covers_fee(tx, ctx)?, ValidationResult::NoBalance);
        Ok(ValidationResult::Ok)
    }

    fn process(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<Option<UndoState>, TransactionError> {
        let before = snapshot(ctx, self.group_id, &self.member)?;
        add_admin(tx, ctx, self.group_id, &self.member)?;
        Ok(Some(UndoState::Membership(before)))
    }

    fn orphan(&self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        restore_snapshot(tx, ctx)
    }
}

impl Behaviour for RemoveGroupAdminBody {
    fn recipients(&self) -> Vec<Address> {
        vec![self.admin.clone()]
    }

    fn is_valid(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        ensure!(
            checks::is_valid_address(&self.admin),
            ValidationResult::InvalidAddress
        );
        let Some(group) = ctx.repo.get_group(self.group_id)? else {
            return Ok(ValidationResult::GroupDoesNotExist);
        };
        ensure!(
            group.owner == tx.creator_address(),
            ValidationResult::InvalidGroupOwner
        );
        ensure!(
            ctx.repo.is_admin(self.group_id, &self.admin)?,
            ValidationResult::NotGroupAdmin
        );
        // the owner is always an admin
        ensure!(
            self.admin != group.owner,
            ValidationResult::InvalidGroupOwner
        );
        ensure!(checks::covers_fee(tx, ctx)?, ValidationResult::NoBalance);
        Ok(ValidationResult::Ok)
    }

    fn process(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<Option<UndoState>, TransactionError> {
        let before = snapshot(ctx, self.group_id, &self.admin)?;
        ctx.repo.delete_admin(self.group_id, &self.admin)?;
        Ok(Some(UndoState::Membership(before)))
    }

    fn orphan(&self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        restore_snapshot(tx, ctx)
    }
}
