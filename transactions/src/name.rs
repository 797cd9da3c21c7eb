//! Registered names: REGISTER_NAME, UPDATE_NAME, SELL_NAME, CANCEL_SELL_NAME
//! and BUY_NAME.
//!
//! Names are stored as entered but compared by their reduced form, so two
//! names that differ only by case or look-alike characters collide.

use cairn_store::NameData;
use cairn_types::{Address, Amount, ValidationResult, BASE_ASSET};
use serde::{Deserialize, Serialize};

use crate::behaviour::Behaviour;
use crate::checks::{self, ensure};
use crate::naming::{is_normalized, reduce, utf8_len_within};
use crate::{Transaction, TransactionError, TxContext, UndoState};

pub const MIN_NAME_SIZE: usize = 3;
pub const MAX_NAME_SIZE: usize = 40;
pub const MAX_DATA_SIZE: usize = 4000;
/// Exclusive upper bound on a sale price.
pub const MAX_SALE_PRICE: Amount = Amount::whole(10_000_000_000);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterNameBody {
    pub name: String,
    pub data: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateNameBody {
    pub name: String,
    /// Empty to keep the current name.
    pub new_name: String,
    /// Empty to keep the current data.
    pub new_data: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellNameBody {
    pub name: String,
    pub amount: Amount,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelSellNameBody {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyNameBody {
    pub name: String,
    pub amount: Amount,
    pub seller: Address,
}

fn previous_name(tx: &Transaction) -> Result<&NameData, TransactionError> {
    match &tx.undo {
        Some(UndoState::Name(Some(previous))) => Ok(previous),
        _ => Err(tx.missing_undo()),
    }
}

fn load_name(tx: &Transaction, ctx: &TxContext<'_>, name: &str) -> Result<NameData, TransactionError> {
    ctx.repo.get_name(name)?.ok_or_else(|| tx.missing("name"))
}

fn owns_a_name(ctx: &TxContext<'_>, owner: &Address) -> Result<bool, TransactionError> {
    Ok(ctx.params.one_name_per_account && ctx.repo.count_names_owned(owner)? > 0)
}

// ── REGISTER_NAME ──────────────────────────────────────────────────────

impl Behaviour for RegisterNameBody {
    fn is_valid(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        ensure!(
            utf8_len_within(&self.name, MIN_NAME_SIZE, MAX_NAME_SIZE),
            ValidationResult::InvalidNameLength
        );
        ensure!(
            self.data.len() <= MAX_DATA_SIZE,
            ValidationResult::InvalidDataLength
        );
        ensure!(is_normalized(&self.name), ValidationResult::NameNotNormalized);
        ensure!(
            !checks::is_valid_address(&Address::new(self.name.as_str())),
            ValidationResult::InvalidAddress
        );
        ensure!(checks::covers_fee(tx, ctx)?, ValidationResult::NoBalance);
        Ok(ValidationResult::Ok)
    }

    fn is_processable(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        ensure!(
            ctx.repo.get_name_by_reduced(&reduce(&self.name))?.is_none(),
            ValidationResult::NameAlreadyRegistered
        );
        ensure!(
            !owns_a_name(ctx, &tx.creator_address())?,
            ValidationResult::MultipleNamesForbidden
        );
        Ok(ValidationResult::Ok)
    }

    fn process(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<Option<UndoState>, TransactionError> {
        ctx.repo.save_name(&NameData {
            name: self.name.clone(),
            reduced_name: reduce(&self.name),
            owner: tx.creator_address(),
            data: self.data.clone(),
            registered: tx.header.timestamp,
            updated: None,
            is_for_sale: false,
            sale_price: None,
            reference: tx.signature,
            creation_group_id: tx.header.tx_group_id,
        })?;
        Ok(Some(UndoState::Name(None)))
    }

    fn orphan(&self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        match &tx.undo {
            Some(UndoState::Name(None)) => {
                ctx.repo.delete_name(&self.name)?;
                Ok(())
            }
            _ => Err(tx.missing_undo()),
        }
    }
}

// ── UPDATE_NAME ────────────────────────────────────────────────────────

impl Behaviour for UpdateNameBody {
    fn is_valid(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        ensure!(
            utf8_len_within(&self.name, MIN_NAME_SIZE, MAX_NAME_SIZE),
            ValidationResult::InvalidNameLength
        );
        ensure!(is_normalized(&self.name), ValidationResult::NameNotNormalized);

        let Some(current) = ctx.repo.get_name(&self.name)? else {
            return Ok(ValidationResult::NameDoesNotExist);
        };
        ensure!(
            current.creation_group_id == tx.header.tx_group_id,
            ValidationResult::TxGroupIdMismatch
        );

        if !self.new_name.is_empty() {
            ensure!(
                utf8_len_within(&self.new_name, MIN_NAME_SIZE, MAX_NAME_SIZE),
                ValidationResult::InvalidNameLength
            );
            ensure!(
                is_normalized(&self.new_name),
                ValidationResult::NameNotNormalized
            );
            ensure!(
                !checks::is_valid_address(&Address::new(self.new_name.as_str())),
                ValidationResult::InvalidAddress
            );
        }
        ensure!(
            self.new_data.len() <= MAX_DATA_SIZE,
            ValidationResult::InvalidDataLength
        );
        ensure!(checks::covers_fee(tx, ctx)?, ValidationResult::NoBalance);
        Ok(ValidationResult::Ok)
    }

    fn is_processable(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        let Some(current) = ctx.repo.get_name(&self.name)? else {
            return Ok(ValidationResult::NameDoesNotExist);
        };
        ensure!(!current.is_for_sale, ValidationResult::NameAlreadyForSale);
        ensure!(
            current.owner == tx.creator_address(),
            ValidationResult::InvalidNameOwner
        );
        if !self.new_name.is_empty() {
            if let Some(clash) = ctx.repo.get_name_by_reduced(&reduce(&self.new_name))? {
                ensure!(clash.name == current.name, ValidationResult::NameAlreadyRegistered);
            }
        }
        Ok(ValidationResult::Ok)
    }

    fn process(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<Option<UndoState>, TransactionError> {
        let previous = load_name(tx, ctx, &self.name)?;
        let mut updated = previous.clone();
        if !self.new_name.is_empty() {
            ctx.repo.delete_name(&previous.name)?;
            updated.name = self.new_name.clone();
            updated.reduced_name = reduce(&self.new_name);
        }
        if !self.new_data.is_empty() {
            updated.data = self.new_data.clone();
        }
        updated.updated = Some(tx.header.timestamp);
        ctx.repo.save_name(&updated)?;
        Ok(Some(UndoState::Name(Some(previous))))
    }

    fn orphan(&self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        let previous = previous_name(tx)?;
        if !self.new_name.is_empty() {
            ctx.repo.delete_name(&self.new_name)?;
        }
        ctx.repo.save_name(previous)?;
        Ok(())
    }
}

// ── SELL_NAME ──────────────────────────────────────────────────────────

impl Behaviour for SellNameBody {
    fn is_valid(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        ensure!(
            utf8_len_within(&self.name, 1, MAX_NAME_SIZE),
            ValidationResult::InvalidNameLength
        );
        ensure!(is_normalized(&self.name), ValidationResult::NameNotNormalized);
        let Some(current) = ctx.repo.get_name(&self.name)? else {
            return Ok(ValidationResult::NameDoesNotExist);
        };
        ensure!(!current.is_for_sale, ValidationResult::NameAlreadyForSale);
        ensure!(
            current.owner == tx.creator_address(),
            ValidationResult::InvalidNameOwner
        );
        ensure!(self.amount.is_positive(), ValidationResult::NegativeAmount);
        ensure!(self.amount < MAX_SALE_PRICE, ValidationResult::InvalidAmount);
        ensure!(checks::covers_fee(tx, ctx)?, ValidationResult::NoBalance);
        Ok(ValidationResult::Ok)
    }

    fn process(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<Option<UndoState>, TransactionError> {
        let previous = load_name(tx, ctx, &self.name)?;
        let mut listed = previous.clone();
        listed.is_for_sale = true;
        listed.sale_price = Some(self.amount);
        ctx.repo.save_name(&listed)?;
        Ok(Some(UndoState::Name(Some(previous))))
    }

    fn orphan(&self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        ctx.repo.save_name(previous_name(tx)?)?;
        Ok(())
    }
}

// ── CANCEL_SELL_NAME ───────────────────────────────────────────────────

impl Behaviour for CancelSellNameBody {
    fn is_valid(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        ensure!(
            utf8_len_within(&self.name, 1, MAX_NAME_SIZE),
            ValidationResult::InvalidNameLength
        );
        ensure!(is_normalized(&self.name), ValidationResult::NameNotNormalized);
        let Some(current) = ctx.repo.get_name(&self.name)? else {
            return Ok(ValidationResult::NameDoesNotExist);
        };
        ensure!(current.is_for_sale, ValidationResult::NameNotForSale);
        ensure!(
            current.owner == tx.creator_address(),
            ValidationResult::InvalidNameOwner
        );
        ensure!(checks::covers_fee(tx, ctx)?, ValidationResult::NoBalance);
        Ok(ValidationResult::Ok)
    }

    fn process(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<Option<UndoState>, TransactionError> {
        let previous = load_name(tx, ctx, &self.name)?;
        let mut delisted = previous.clone();
        delisted.is_for_sale = false;
        delisted.sale_price = None;
        ctx.repo.save_name(&delisted)?;
        Ok(Some(UndoState::Name(Some(previous))))
    }

    fn orphan(&self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        ctx.repo.save_name(previous_name(tx)?)?;
        Ok(())
    }
}

// ── BUY_NAME ───────────────────────────────────────────────────────────

impl Behaviour for BuyNameBody {
    fn recipients(&self) -> Vec<Address> {
        vec![self.seller.clone()]
    }

    fn is_valid(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        ensure!(
            checks::is_valid_address(&self.seller),
            ValidationResult::InvalidAddress
        );
        ensure!(
            utf8_len_within(&self.name, MIN_NAME_SIZE, MAX_NAME_SIZE),
            ValidationResult::InvalidNameLength
        );
        ensure!(is_normalized(&self.name), ValidationResult::NameNotNormalized);
        let Some(current) = ctx.repo.get_name(&self.name)? else {
            return Ok(ValidationResult::NameDoesNotExist);
        };
        ensure!(current.is_for_sale, ValidationResult::NameNotForSale);

        let buyer = tx.creator_address();
        ensure!(buyer != current.owner, ValidationResult::BuyerAlreadyOwner);
        ensure!(
            !owns_a_name(ctx, &buyer)?,
            ValidationResult::MultipleNamesForbidden
        );
        ensure!(self.seller == current.owner, ValidationResult::InvalidSeller);
        ensure!(
            current.sale_price == Some(self.amount),
            ValidationResult::InvalidAmount
        );

        let Some(total) = self.amount.checked_add(tx.header.fee) else {
            return Ok(ValidationResult::InvalidAmount);
        };
        ensure!(
            checks::holds(ctx, &buyer, BASE_ASSET, total)?,
            ValidationResult::NoBalance
        );
        Ok(ValidationResult::Ok)
    }

    fn process(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<Option<UndoState>, TransactionError> {
        let previous = load_name(tx, ctx, &self.name)?;
        let buyer = tx.creator_address();

        let mut sold = previous.clone();
        sold.owner = buyer.clone();
        sold.is_for_sale = false;
        sold.sale_price = None;
        ctx.repo.save_name(&sold)?;

        checks::debit(ctx, tx, &buyer, BASE_ASSET, self.amount)?;
        checks::credit(ctx, &self.seller, BASE_ASSET, self.amount)?;
        Ok(Some(UndoState::Name(Some(previous))))
    }

    fn orphan(&self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        let previous = previous_name(tx)?;
        checks::debit(ctx, tx, &self.seller, BASE_ASSET, self.amount)?;
        checks::credit(ctx, &tx.creator_address(), BASE_ASSET, self.amount)?;
        ctx.repo.save_name(previous)?;
        Ok(())
    }
}
