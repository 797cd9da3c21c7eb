//! Types that only the first block may carry: GENESIS credits, ACCOUNT_FLAGS
//! and ACCOUNT_LEVEL.

use cairn_store::AccountData;
use cairn_types::{Address, Amount, AssetId, ValidationResult};
use serde::{Deserialize, Serialize};

use crate::behaviour::Behaviour;
use crate::checks::{self, ensure};
use crate::{FeePolicy, ReferencePolicy, Transaction, TransactionError, TxContext, UndoState};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisBody {
    pub recipient: Address,
    pub asset_id: AssetId,
    pub amount: Amount,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountFlagsBody {
    pub target: Address,
    pub and_mask: u32,
    pub or_mask: u32,
    pub xor_mask: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountLevelBody {
    pub target: Address,
    pub level: u8,
}

fn restore_account(
    ctx: &TxContext<'_>,
    address: &Address,
    previous: &Option<AccountData>,
) -> Result<(), TransactionError> {
    match previous {
        Some(account) => ctx.repo.save_account(account)?,
        None => ctx.repo.delete_account(address)?,
    }
    Ok(())
}

fn take_account_undo(tx: &Transaction) -> Result<&Option<AccountData>, TransactionError> {
    match &tx.undo {
        Some(UndoState::Account(previous)) => Ok(previous),
        _ => Err(tx.missing_undo()),
    }
}

// ── GENESIS ────────────────────────────────────────────────────────────

impl Behaviour for GenesisBody {
    fn recipients(&self) -> Vec<Address> {
        vec![self.recipient.clone()]
    }

    fn fee_policy(&self, _tx: &Transaction) -> FeePolicy {
        FeePolicy::NonNegative
    }

    fn reference_policy(&self) -> ReferencePolicy {
        ReferencePolicy::Waived
    }

    fn is_valid(
        &self,
        _tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        ensure!(ctx.is_genesis_block(), ValidationResult::NoFlagPermission);
        ensure!(!self.amount.is_negative(), ValidationResult::NegativeAmount);
        ensure!(
            checks::is_valid_address(&self.recipient),
            ValidationResult::InvalidAddress
        );
        ensure!(
            ctx.repo.get_asset(self.asset_id)?.is_some(),
            ValidationResult::AssetDoesNotExist
        );
        Ok(ValidationResult::Ok)
    }

    fn process(
        &self,
        _tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<Option<UndoState>, TransactionError> {
        let previous = ctx.repo.get_account(&self.recipient)?;
        let previous_balance = ctx.repo.get_balance(&self.recipient, self.asset_id)?;
        ctx.repo
            .set_balance(&self.recipient, self.asset_id, self.amount)?;
        Ok(Some(UndoState::GenesisCredit {
            previous,
            previous_balance,
        }))
    }

    fn orphan(&self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        let Some(UndoState::GenesisCredit {
            previous,
            previous_balance,
        }) = &tx.undo
        else {
            return Err(tx.missing_undo());
        };
        match previous {
            Some(account) => {
                ctx.repo.save_account(account)?;
                ctx.repo
                    .set_balance(&self.recipient, self.asset_id, *previous_balance)?;
            }
            None => ctx.repo.delete_account(&self.recipient)?,
        }
        Ok(())
    }

    fn process_references_and_fees(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<(), TransactionError> {
        checks::init_reference(tx, ctx, &self.recipient)
    }

    fn orphan_references_and_fees(
        &self,
        _tx: &Transaction,
        _ctx: &TxContext<'_>,
    ) -> Result<(), TransactionError> {
        // orphan restores the whole account record
        Ok(())
    }
}

// ── ACCOUNT_FLAGS ──────────────────────────────────────────────────────

impl AccountFlagsBody {
    pub fn apply(&self, previous_flags: u32) -> u32 {
        (previous_flags & self.and_mask) | (self.or_mask ^ self.xor_mask)
    }
}

impl Behaviour for AccountFlagsBody {
    fn recipients(&self) -> Vec<Address> {
        vec![self.target.clone()]
    }

    fn fee_policy(&self, _tx: &Transaction) -> FeePolicy {
        FeePolicy::NonNegative
    }

    fn reference_policy(&self) -> ReferencePolicy {
        ReferencePolicy::Waived
    }

    fn is_valid(
        &self,
        _tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        ensure!(ctx.is_genesis_block(), ValidationResult::NoFlagPermission);
        ensure!(
            checks::is_valid_address(&self.target),
            ValidationResult::InvalidAddress
        );
        Ok(ValidationResult::Ok)
    }

    fn process(
        &self,
        _tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<Option<UndoState>, TransactionError> {
        let previous = ctx.repo.get_account(&self.target)?;
        let mut account = previous
            .clone()
            .unwrap_or_else(|| AccountData::new(self.target.clone()));
        account.flags = self.apply(account.flags);
        ctx.repo.save_account(&account)?;
        Ok(Some(UndoState::Account(previous)))
    }

    fn orphan(&self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        restore_account(ctx, &self.target, take_account_undo(tx)?)
    }

    fn process_references_and_fees(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<(), TransactionError> {
        checks::init_reference(tx, ctx, &self.target)
    }

    fn orphan_references_and_fees(
        &self,
        _tx: &Transaction,
        _ctx: &TxContext<'_>,
    ) -> Result<(), TransactionError> {
        Ok(())
    }
}

// ── ACCOUNT_LEVEL ──────────────────────────────────────────────────────

impl Behaviour for AccountLevelBody {
    fn recipients(&self) -> Vec<Address> {
        vec![self.target.clone()]
    }

    fn fee_policy(&self, _tx: &Transaction) -> FeePolicy {
        FeePolicy::NonNegative
    }

    fn reference_policy(&self) -> ReferencePolicy {
        ReferencePolicy::Waived
    }

    fn is_valid(
        &self,
        _tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        ensure!(ctx.is_genesis_block(), ValidationResult::NoFlagPermission);
        ensure!(
            checks::is_valid_address(&self.target),
            ValidationResult::InvalidAddress
        );
        Ok(ValidationResult::Ok)
    }

    fn process(
        &self,
        _tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<Option<UndoState>, TransactionError> {
        let previous = ctx.repo.get_account(&self.target)?;
        let mut account = previous
            .clone()
            .unwrap_or_else(|| AccountData::new(self.target.clone()));
        account.level = self.level;
        account.blocks_minted_adjustment = ctx.params.blocks_for_level(self.level);
        ctx.repo.save_account(&account)?;
        Ok(Some(UndoState::Account(previous)))
    }

    fn orphan(&self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        restore_account(ctx, &self.target, take_account_undo(tx)?)
    }

    fn process_references_and_fees(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<(), TransactionError> {
        checks::init_reference(tx, ctx, &self.target)
    }

    fn orphan_references_and_fees(
        &self,
        _tx: &Transaction,
        _ctx: &TxContext<'_>,
    ) -> Result<(), TransactionError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_masks_combine_and_then_or_xor() {
        let body = AccountFlagsBody {
            target: Address::new("cairn_x"),
            and_mask: 0b1100,
            or_mask: 0b0011,
            xor_mask: 0b0001,
        };
        assert_eq!(body.apply(0b1010), 0b1000 | 0b0010);
    }

    #[test]
    fn all_ones_and_mask_keeps_existing_flags() {
        let body = AccountFlagsBody {
            target: Address::new("cairn_x"),
            and_mask: u32::MAX,
            or_mask: 0,
            xor_mask: 0,
        };
        assert_eq!(body.apply(0xdead), 0xdead);
    }
}
