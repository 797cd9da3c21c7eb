//! CREATE_ASSET_ORDER and CANCEL_ASSET_ORDER, with the order-book matcher.
//!
//! Prices are quoted as units of the lower-id asset per unit of the
//! higher-id asset, and every order's `amount` is expressed in the higher-id
//! asset. An order whose have-asset has the lower id is therefore sized in
//! the asset it wants ("amount in want").

use std::cmp::Ordering;

use cairn_crypto::account_address;
use cairn_store::{AssetData, OrderData, TradeData};
use cairn_types::{Amount, AssetId, Signature, ValidationResult, BASE_ASSET};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::behaviour::Behaviour;
use crate::checks::{self, ensure};
use crate::{Transaction, TransactionError, TxContext, UndoState};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAssetOrderBody {
    pub have_asset_id: AssetId,
    pub want_asset_id: AssetId,
    pub amount: Amount,
    pub price: Amount,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelAssetOrderBody {
    pub order_id: Signature,
}

fn is_amount_in_want(have: AssetId, want: AssetId) -> bool {
    have < want
}

/// Have-asset the creator must lock up for `amount` at `price`.
pub fn have_commitment(have: AssetId, want: AssetId, amount: Amount, price: Amount) -> Option<Amount> {
    if is_amount_in_want(have, want) {
        amount.mul_price_ceil(price)
    } else {
        Some(amount)
    }
}

/// Have-asset returned when the unfilled remainder of `order` is released.
pub fn have_refund(order: &OrderData) -> Option<Amount> {
    have_commitment(
        order.have_asset_id,
        order.want_asset_id,
        order.amount_left(),
        order.price,
    )
}

fn gcd(mut a: i128, mut b: i128) -> i128 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a.abs()
}

/// Smallest tradeable step, in raw units of the amount asset, that yields a
/// whole number of raw return-asset units at `price`.
pub fn amount_granularity(amount_divisible: bool, return_divisible: bool, price: Amount) -> i64 {
    let unit = Amount::UNIT as i128;
    let mut return_amount = unit;
    let mut matched_amount = price.raw() as i128;
    let divisor = gcd(return_amount, matched_amount).max(1);
    return_amount /= divisor;
    matched_amount /= divisor;

    if amount_divisible {
        return_amount *= unit;
    }
    if return_divisible {
        matched_amount *= unit;
    }
    let divisor = gcd(return_amount, matched_amount).max(1);
    let mut granularity = return_amount * unit / divisor;
    if amount_divisible {
        granularity /= unit;
    }
    i64::try_from(granularity).unwrap_or(i64::MAX)
}

/// Best price first from our side of the book, then oldest, then by id.
fn book_order(ours_have: AssetId, ours_want: AssetId, a: &OrderData, b: &OrderData) -> Ordering {
    let by_price = if is_amount_in_want(ours_have, ours_want) {
        a.price.cmp(&b.price)
    } else {
        b.price.cmp(&a.price)
    };
    by_price
        .then_with(|| a.timestamp.cmp(&b.timestamp))
        .then_with(|| a.order_id.cmp(&b.order_id))
}

fn load_order(
    tx: &Transaction,
    ctx: &TxContext<'_>,
    order_id: &Signature,
) -> Result<OrderData, TransactionError> {
    ctx.repo.get_order(order_id)?.ok_or_else(|| tx.missing("order"))
}

fn settle_fill(order: &mut OrderData, delta: Amount, tx: &Transaction) -> Result<(), TransactionError> {
    order.fulfilled = order
        .fulfilled
        .checked_add(delta)
        .ok_or(TransactionError::Overflow(tx.signature))?;
    order.is_fulfilled = !order.amount_left().is_positive();
    order.is_closed = order.is_fulfilled;
    Ok(())
}

/// Apply (`forward`) or reverse one trade between two stored orders.
fn apply_trade(
    tx: &Transaction,
    ctx: &TxContext<'_>,
    trade: &TradeData,
    forward: bool,
) -> Result<(), TransactionError> {
    let mut initiating = load_order(tx, ctx, &trade.initiator)?;
    let mut target = load_order(tx, ctx, &trade.target)?;

    let fulfilled = if is_amount_in_want(initiating.have_asset_id, initiating.want_asset_id) {
        trade.target_amount
    } else {
        trade.initiator_amount
    };
    let delta = if forward {
        fulfilled
    } else {
        fulfilled
            .checked_neg()
            .ok_or(TransactionError::Overflow(tx.signature))?
    };
    settle_fill(&mut initiating, delta, tx)?;
    settle_fill(&mut target, delta, tx)?;
    ctx.repo.save_order(&initiating)?;
    ctx.repo.save_order(&target)?;

    let initiator = account_address(&initiating.creator);
    let counterparty = account_address(&target.creator);
    let transfers = [
        (&initiator, initiating.want_asset_id, trade.target_amount),
        (&counterparty, target.want_asset_id, trade.initiator_amount),
        (&initiator, initiating.have_asset_id, trade.initiator_saving),
    ];
    if forward {
        ctx.repo.save_trade(trade)?;
        for (account, asset, amount) in transfers {
            checks::credit(ctx, account, asset, amount)?;
        }
    } else {
        for (account, asset, amount) in transfers.into_iter().rev() {
            checks::debit(ctx, tx, account, asset, amount)?;
        }
        ctx.repo.delete_trade(trade)?;
    }
    Ok(())
}

// ── CREATE_ASSET_ORDER ─────────────────────────────────────────────────

impl CreateAssetOrderBody {
    fn amount_and_return_assets<'a>(
        &self,
        have: &'a AssetData,
        want: &'a AssetData,
    ) -> (&'a AssetData, &'a AssetData) {
        if self.want_asset_id > self.have_asset_id {
            (want, have)
        } else {
            (have, want)
        }
    }

    fn match_orders(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<Vec<TradeData>, TransactionError> {
        let have = ctx
            .repo
            .get_asset(self.have_asset_id)?
            .ok_or_else(|| tx.missing("have asset"))?;
        let want = ctx
            .repo
            .get_asset(self.want_asset_id)?
            .ok_or_else(|| tx.missing("want asset"))?;
        let (amount_asset, return_asset) = self.amount_and_return_assets(&have, &want);
        let in_want = is_amount_in_want(self.have_asset_id, self.want_asset_id);

        let mut book = ctx.repo.open_orders(self.want_asset_id, self.have_asset_id)?;
        book.sort_by(|a, b| book_order(self.have_asset_id, self.want_asset_id, a, b));

        let mut trades = Vec::new();
        for theirs in book {
            let worse = if in_want {
                theirs.price > self.price
            } else {
                theirs.price < self.price
            };
            if worse {
                break;
            }

            let ours = load_order(tx, ctx, &tx.signature)?;
            let interim = ours.amount_left().min(theirs.amount_left());
            if !interim.is_positive() {
                continue;
            }
            let granularity = amount_granularity(
                amount_asset.is_divisible,
                return_asset.is_divisible,
                theirs.price,
            );
            let matched = interim.round_down_to(granularity);
            if !matched.is_positive() {
                continue;
            }
            if !amount_asset.is_divisible && !matched.is_whole() {
                return Err(TransactionError::IndivisibleTrade(theirs.order_id));
            }
            let returned = matched
                .mul_price_floor(theirs.price)
                .ok_or(TransactionError::Overflow(tx.signature))?;
            if !return_asset.is_divisible && !returned.is_whole() {
                return Err(TransactionError::IndivisibleTrade(tx.signature));
            }

            let (traded_want, traded_have) = if in_want {
                (matched, returned)
            } else {
                (returned, matched)
            };
            let saving = if in_want {
                let spread = Amount::new((self.price.raw() - theirs.price.raw()).abs());
                matched
                    .mul_price_floor(spread)
                    .ok_or(TransactionError::Overflow(tx.signature))?
            } else {
                Amount::ZERO
            };

            trace!(
                target_order = %theirs.order_id,
                have = %traded_have,
                want = %traded_want,
                saving = %saving,
                "matched order"
            );
            let trade = TradeData {
                initiator: tx.signature,
                target: theirs.order_id,
                target_amount: traded_want,
                initiator_amount: traded_have,
                initiator_saving: saving,
                timestamp: tx.header.timestamp,
            };
            apply_trade(tx, ctx, &trade, true)?;
            trades.push(trade);

            if !load_order(tx, ctx, &tx.signature)?.amount_left().is_positive() {
                break;
            }
        }
        Ok(trades)
    }
}

impl Behaviour for CreateAssetOrderBody {
    fn is_valid(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        ensure!(
            self.have_asset_id != self.want_asset_id,
            ValidationResult::HaveEqualsWant
        );
        ensure!(self.amount.is_positive(), ValidationResult::NegativeAmount);
        ensure!(self.price.is_positive(), ValidationResult::NegativePrice);

        let Some(have) = ctx.repo.get_asset(self.have_asset_id)? else {
            return Ok(ValidationResult::AssetDoesNotExist);
        };
        let Some(want) = ctx.repo.get_asset(self.want_asset_id)? else {
            return Ok(ValidationResult::AssetDoesNotExist);
        };
        ensure!(
            !have.is_unspendable && !want.is_unspendable,
            ValidationResult::AssetNotSpendable
        );

        let Some(committed) =
            have_commitment(self.have_asset_id, self.want_asset_id, self.amount, self.price)
        else {
            return Ok(ValidationResult::InvalidAmount);
        };
        let max_other = if is_amount_in_want(self.have_asset_id, self.want_asset_id) {
            Some(self.amount)
        } else {
            self.amount.mul_price_floor(self.price)
        };
        let Some(max_other) = max_other else {
            return Ok(ValidationResult::InvalidAmount);
        };
        ensure!(
            have.is_divisible || committed.is_whole(),
            ValidationResult::InvalidAmount
        );
        ensure!(
            want.is_divisible || max_other.is_whole(),
            ValidationResult::InvalidReturn
        );

        let creator = tx.creator_address();
        if self.have_asset_id == BASE_ASSET {
            let Some(total) = committed.checked_add(tx.header.fee) else {
                return Ok(ValidationResult::InvalidAmount);
            };
            ensure!(
                checks::holds(ctx, &creator, BASE_ASSET, total)?,
                ValidationResult::NoBalance
            );
        } else {
            ensure!(
                checks::holds(ctx, &creator, self.have_asset_id, committed)?,
                ValidationResult::NoBalance
            );
            ensure!(checks::covers_fee(tx, ctx)?, ValidationResult::NoBalance);
        }
        Ok(ValidationResult::Ok)
    }

    fn process(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<Option<UndoState>, TransactionError> {
        let committed =
            have_commitment(self.have_asset_id, self.want_asset_id, self.amount, self.price)
                .ok_or(TransactionError::Overflow(tx.signature))?;
        checks::debit(ctx, tx, &tx.creator_address(), self.have_asset_id, committed)?;

        ctx.repo.save_order(&OrderData {
            order_id: tx.signature,
            creator: tx.header.creator,
            have_asset_id: self.have_asset_id,
            want_asset_id: self.want_asset_id,
            amount: self.amount,
            fulfilled: Amount::ZERO,
            price: self.price,
            timestamp: tx.header.timestamp,
            is_closed: false,
            is_fulfilled: false,
        })?;

        let trades = self.match_orders(tx, ctx)?;
        Ok(Some(UndoState::Trades(trades)))
    }

    fn orphan(&self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        let Some(UndoState::Trades(trades)) = &tx.undo else {
            return Err(tx.missing_undo());
        };
        for trade in trades.iter().rev() {
            apply_trade(tx, ctx, trade, false)?;
        }
        ctx.repo.delete_order(&tx.signature)?;

        let committed =
            have_commitment(self.have_asset_id, self.want_asset_id, self.amount, self.price)
                .ok_or(TransactionError::Overflow(tx.signature))?;
        checks::credit(ctx, &tx.creator_address(), self.have_asset_id, committed)
    }
}

// ── CANCEL_ASSET_ORDER ─────────────────────────────────────────────────

impl Behaviour for CancelAssetOrderBody {
    fn is_valid(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        let Some(order) = ctx.repo.get_order(&self.order_id)? else {
            return Ok(ValidationResult::OrderDoesNotExist);
        };
        ensure!(!order.is_closed, ValidationResult::OrderAlreadyClosed);
        ensure!(
            order.creator == tx.header.creator,
            ValidationResult::InvalidOrderCreator
        );
        ensure!(checks::covers_fee(tx, ctx)?, ValidationResult::NoBalance);
        Ok(ValidationResult::Ok)
    }

    fn process(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<Option<UndoState>, TransactionError> {
        let previous = load_order(tx, ctx, &self.order_id)?;
        let refund = have_refund(&previous).ok_or(TransactionError::Overflow(tx.signature))?;

        let mut closed = previous.clone();
        closed.is_closed = true;
        ctx.repo.save_order(&closed)?;
        checks::credit(ctx, &tx.creator_address(), previous.have_asset_id, refund)?;
        Ok(Some(UndoState::Order(previous)))
    }

    fn orphan(&self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        let Some(UndoState::Order(previous)) = &tx.undo else {
            return Err(tx.missing_undo());
        };
        let refund = have_refund(previous).ok_or(TransactionError::Overflow(tx.signature))?;
        checks::debit(ctx, tx, &tx.creator_address(), previous.have_asset_id, refund)?;
        ctx.repo.save_order(previous)?;
        Ok(())
    }
}
