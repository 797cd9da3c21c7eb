//! Balance, address and reference helpers shared by the variants.

use cairn_crypto::validate_address;
use cairn_types::{Address, Amount, AssetId, BASE_ASSET};

use crate::{Transaction, TransactionError, TxContext};

pub(crate) fn is_valid_address(address: &Address) -> bool {
    validate_address(address.as_str())
}

pub(crate) fn debit(
    ctx: &TxContext<'_>,
    tx: &Transaction,
    address: &Address,
    asset: AssetId,
    amount: Amount,
) -> Result<(), TransactionError> {
    if amount.is_zero() {
        return Ok(());
    }
    let delta = amount
        .checked_neg()
        .ok_or(TransactionError::Overflow(tx.signature))?;
    ctx.repo.modify_balance(address, asset, delta)?;
    Ok(())
}

pub(crate) fn credit(
    ctx: &TxContext<'_>,
    address: &Address,
    asset: AssetId,
    amount: Amount,
) -> Result<(), TransactionError> {
    if amount.is_zero() {
        return Ok(());
    }
    ctx.repo.modify_balance(address, asset, amount)?;
    Ok(())
}

pub(crate) fn holds(
    ctx: &TxContext<'_>,
    address: &Address,
    asset: AssetId,
    amount: Amount,
) -> Result<bool, TransactionError> {
    Ok(ctx.repo.get_balance(address, asset)? >= amount)
}

/// Whether the creator holds at least the fee in the base asset.
pub(crate) fn covers_fee(tx: &Transaction, ctx: &TxContext<'_>) -> Result<bool, TransactionError> {
    holds(ctx, &tx.creator_address(), BASE_ASSET, tx.header.fee)
}

/// Debit the fee and advance the creator's last reference to this transaction.
pub(crate) fn charge_fee_and_chain(
    tx: &Transaction,
    ctx: &TxContext<'_>,
) -> Result<(), TransactionError> {
    let creator = tx.creator_address();
    debit(ctx, tx, &creator, BASE_ASSET, tx.header.fee)?;
    ctx.repo.set_last_reference(&creator, Some(tx.signature))?;
    Ok(())
}

/// Refund the fee and put back the creator's last reference as it was
/// before this transaction.
pub(crate) fn refund_fee_and_unchain(
    tx: &Transaction,
    ctx: &TxContext<'_>,
) -> Result<(), TransactionError> {
    let creator = tx.creator_address();
    credit(ctx, &creator, BASE_ASSET, tx.header.fee)?;
    ctx.repo
        .set_last_reference(&creator, tx.previous_reference()?)?;
    Ok(())
}

/// Give a recipient with no history this transaction as its first reference.
pub(crate) fn init_reference(
    tx: &Transaction,
    ctx: &TxContext<'_>,
    recipient: &Address,
) -> Result<(), TransactionError> {
    if ctx.repo.get_last_reference(recipient)?.is_none() {
        ctx.repo.set_last_reference(recipient, Some(tx.signature))?;
    }
    Ok(())
}

pub(crate) fn uninit_reference(
    tx: &Transaction,
    ctx: &TxContext<'_>,
    recipient: &Address,
) -> Result<(), TransactionError> {
    if ctx.repo.get_last_reference(recipient)? == Some(tx.signature) {
        ctx.repo.set_last_reference(recipient, None)?;
    }
    Ok(())
}

/// Early-return the first non-OK validation result.
macro_rules! ensure {
    ($cond:expr, $result:expr) => {
        if !$cond {
            return Ok($result);
        }
    };
}

pub(crate) use ensure;
