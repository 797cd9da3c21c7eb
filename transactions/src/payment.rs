//! Value transfers: PAYMENT, TRANSFER_ASSET and MULTI_PAYMENT, plus the
//! shared payment rules MESSAGE and ARBITRARY reuse for their attached amounts.

use std::collections::BTreeMap;

use cairn_crypto::is_at_address;
use cairn_types::{Address, Amount, AssetId, ValidationResult, BASE_ASSET};
use serde::{Deserialize, Serialize};

use crate::behaviour::Behaviour;
use crate::checks::{self, ensure};
use crate::{Transaction, TransactionError, TxContext, UndoState};

/// Upper bound on the legs of one MULTI_PAYMENT.
pub const MAX_PAYMENTS: usize = 400;

/// One transfer from the creator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentLeg {
    pub recipient: Address,
    pub asset_id: AssetId,
    pub amount: Amount,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentBody {
    pub recipient: Address,
    pub amount: Amount,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferAssetBody {
    pub recipient: Address,
    pub asset_id: AssetId,
    pub amount: Amount,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiPaymentBody {
    pub payments: Vec<PaymentLeg>,
}

// ── Shared payment rules ───────────────────────────────────────────────

/// Validate `legs` sent by the creator, with the fee charged on the base asset.
pub(crate) fn validate_legs(
    tx: &Transaction,
    ctx: &TxContext<'_>,
    legs: &[PaymentLeg],
    zero_ok: bool,
) -> Result<ValidationResult, TransactionError> {
    ensure!(tx.header.fee.is_positive(), ValidationResult::NegativeFee);

    let sender = tx.creator_address();
    let mut totals: BTreeMap<AssetId, Amount> = BTreeMap::new();
    totals.insert(BASE_ASSET, tx.header.fee);

    for leg in legs {
        ensure!(!leg.amount.is_negative(), ValidationResult::NegativeAmount);
        ensure!(zero_ok || leg.amount.is_positive(), ValidationResult::NegativeAmount);
        ensure!(
            checks::is_valid_address(&leg.recipient),
            ValidationResult::InvalidAddress
        );

        let recipient_at = if is_at_address(leg.recipient.as_str()) {
            let Some(at) = ctx.repo.get_at(&leg.recipient)? else {
                return Ok(ValidationResult::AtUnknown);
            };
            ensure!(!at.is_finished, ValidationResult::AtIsFinished);
            Some(at)
        } else {
            None
        };

        let Some(asset) = ctx.repo.get_asset(leg.asset_id)? else {
            return Ok(ValidationResult::AssetDoesNotExist);
        };
        ensure!(
            !asset.is_unspendable || asset.owner == sender,
            ValidationResult::AssetNotSpendable
        );
        if let Some(at) = recipient_at {
            ensure!(at.asset_id == leg.asset_id, ValidationResult::AssetDoesNotMatchAt);
        }
        ensure!(
            asset.is_divisible || leg.amount.is_whole(),
            ValidationResult::InvalidAmount
        );

        let total = totals.entry(leg.asset_id).or_insert(Amount::ZERO);
        let Some(sum) = total.checked_add(leg.amount) else {
            return Ok(ValidationResult::InvalidAmount);
        };
        *total = sum;
    }

    for (asset_id, total) in totals {
        ensure!(
            checks::holds(ctx, &sender, asset_id, total)?,
            ValidationResult::NoBalance
        );
    }
    Ok(ValidationResult::Ok)
}

pub(crate) fn process_legs(
    tx: &Transaction,
    ctx: &TxContext<'_>,
    legs: &[PaymentLeg],
) -> Result<(), TransactionError> {
    let sender = tx.creator_address();
    for leg in legs {
        checks::debit(ctx, tx, &sender, leg.asset_id, leg.amount)?;
        checks::credit(ctx, &leg.recipient, leg.asset_id, leg.amount)?;
    }
    Ok(())
}

pub(crate) fn orphan_legs(
    tx: &Transaction,
    ctx: &TxContext<'_>,
    legs: &[PaymentLeg],
) -> Result<(), TransactionError> {
    let sender = tx.creator_address();
    for leg in legs.iter().rev() {
        checks::debit(ctx, tx, &leg.recipient, leg.asset_id, leg.amount)?;
        checks::credit(ctx, &sender, leg.asset_id, leg.amount)?;
    }
    Ok(())
}

/// Charge the fee, chain the creator, and give new recipients a first reference.
///
/// Recipients are initialised for base-asset legs, or for every leg when
/// `always_init` is set.
pub(crate) fn process_leg_references(
    tx: &Transaction,
    ctx: &TxContext<'_>,
    legs: &[PaymentLeg],
    always_init: bool,
) -> Result<(), TransactionError> {
    checks::charge_fee_and_chain(tx, ctx)?;
    for leg in legs {
        if always_init || leg.asset_id == BASE_ASSET {
            checks::init_reference(tx, ctx, &leg.recipient)?;
        }
    }
    Ok(())
}

pub(crate) fn orphan_leg_references(
    tx: &Transaction,
    ctx: &TxContext<'_>,
    legs: &[PaymentLeg],
    always_init: bool,
) -> Result<(), TransactionError> {
    checks::refund_fee_and_unchain(tx, ctx)?;
    for leg in legs.iter().rev() {
        if always_init || leg.asset_id == BASE_ASSET {
            checks::uninit_reference(tx, ctx, &leg.recipient)?;
        }
    }
    Ok(())
}

// ── PAYMENT ────────────────────────────────────────────────────────────

impl PaymentBody {
    fn legs(&self) -> [PaymentLeg; 1] {
        [PaymentLeg {
            recipient: self.recipient.clone(),
            asset_id: BASE_ASSET,
            amount: self.amount,
        }]
    }
}

impl Behaviour for PaymentBody {
    fn recipients(&self) -> Vec<Address> {
        vec![self.recipient.clone()]
    }

    fn is_valid(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        validate_legs(tx, ctx, &self.legs(), false)
    }

    fn process(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<Option<UndoState>, TransactionError> {
        process_legs(tx, ctx, &self.legs())?;
        Ok(None)
    }

    fn orphan(&self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        orphan_legs(tx, ctx, &self.legs())
    }

    fn process_references_and_fees(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<(), TransactionError> {
        process_leg_references(tx, ctx, &self.legs(), false)
    }

    fn orphan_references_and_fees(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<(), TransactionError> {
        orphan_leg_references(tx, ctx, &self.legs(), false)
    }
}

// ── TRANSFER_ASSET ─────────────────────────────────────────────────────

impl TransferAssetBody {
    fn legs(&self) -> [PaymentLeg; 1] {
        [PaymentLeg {
            recipient: self.recipient.clone(),
            asset_id: self.asset_id,
            amount: self.amount,
        }]
    }
}

impl Behaviour for TransferAssetBody {
    fn recipients(&self) -> Vec<Address> {
        vec![self.recipient.clone()]
    }

    fn is_valid(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        validate_legs(tx, ctx, &self.legs(), false)
    }

    fn process(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<Option<UndoState>, TransactionError> {
        process_legs(tx, ctx, &self.legs())?;
        Ok(None)
    }

    fn orphan(&self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        orphan_legs(tx, ctx, &self.legs())
    }

    fn process_references_and_fees(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<(), TransactionError> {
        process_leg_references(tx, ctx, &self.legs(), false)
    }

    fn orphan_references_and_fees(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<(), TransactionError> {
        orphan_leg_references(tx, ctx, &self.legs(), false)
    }
}

// ── MULTI_PAYMENT ──────────────────────────────────────────────────────

impl Behaviour for MultiPaymentBody {
    fn recipients(&self) -> Vec<Address> {
        self.payments.iter().map(|leg| leg.recipient.clone()).collect()
    }

    fn is_valid(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        ensure!(
            (1..=MAX_PAYMENTS).contains(&self.payments.len()),
            ValidationResult::InvalidPaymentsCount
        );
        ensure!(checks::covers_fee(tx, ctx)?, ValidationResult::NoBalance);
        validate_legs(tx, ctx, &self.payments, false)
    }

    fn process(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<Option<UndoState>, TransactionError> {
        process_legs(tx, ctx, &self.payments)?;
        Ok(None)
    }

    fn orphan(&self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        orphan_legs(tx, ctx, &self.payments)
    }

    fn process_references_and_fees(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<(), TransactionError> {
        process_leg_references(tx, ctx, &self.payments, true)
    }

    fn orphan_references_and_fees(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<(), TransactionError> {
        orphan_leg_references(tx, ctx, &self.payments, true)
    }
}
