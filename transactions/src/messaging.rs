//! MESSAGE, CHAT, PUBLICIZE, PRESENCE and ARBITRARY: the data-carrying types.
//!
//! CHAT and PRESENCE live only in the unconfirmed pool and are paid for with
//! proof-of-work. MESSAGE may do the same when it carries no fee. PUBLICIZE
//! announces a public key once per account.

use cairn_crypto::verify_signature;
use cairn_store::StoredTransaction;
use cairn_types::{
    Address, Amount, AssetId, LedgerParams, Signature, Timestamp, TransactionType,
    ValidationResult, BASE_ASSET,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::behaviour::Behaviour;
use crate::checks::{self, ensure};
use crate::payment::{self, PaymentLeg};
use crate::{
    FeePolicy, GroupScope, ReferencePolicy, Transaction, TransactionError, TxContext, UndoState,
};

pub const MAX_MESSAGE_DATA: usize = 4000;
pub const MAX_CHAT_DATA: usize = 256;
pub const MAX_ARBITRARY_DATA: usize = 4000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    pub nonce: u32,
    pub recipient: Option<Address>,
    pub asset_id: AssetId,
    pub amount: Amount,
    pub data: Vec<u8>,
    pub is_text: bool,
    pub is_encrypted: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatBody {
    pub nonce: u32,
    pub recipient: Option<Address>,
    /// Earlier chat message this one replies to or edits.
    pub chat_reference: Option<Signature>,
    pub data: Vec<u8>,
    pub is_text: bool,
    pub is_encrypted: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicizeBody {
    pub nonce: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresenceType {
    RewardShare,
    TradeBot,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceBody {
    pub nonce: u32,
    pub presence_type: PresenceType,
    /// Creator's signature over the big-endian transaction timestamp.
    pub timestamp_signature: Signature,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArbitraryBody {
    pub service: u16,
    pub data: Vec<u8>,
    pub payments: Vec<PaymentLeg>,
}

// ── MESSAGE ────────────────────────────────────────────────────────────

impl MessageBody {
    /// The attached payment, when there is one.
    fn leg(&self) -> Option<[PaymentLeg; 1]> {
        match (&self.recipient, self.amount.is_zero()) {
            (Some(recipient), false) => Some([PaymentLeg {
                recipient: recipient.clone(),
                asset_id: self.asset_id,
                amount: self.amount,
            }]),
            _ => None,
        }
    }

    fn validate_payment(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        match self.leg() {
            Some(leg) => payment::validate_legs(tx, ctx, &leg, true),
            None => Ok(ValidationResult::Ok),
        }
    }
}

impl Behaviour for MessageBody {
    fn recipients(&self) -> Vec<Address> {
        self.recipient.iter().cloned().collect()
    }

    fn fee_policy(&self, _tx: &Transaction) -> FeePolicy {
        FeePolicy::NonNegative
    }

    fn reference_policy(&self) -> ReferencePolicy {
        ReferencePolicy::ChainedWhenFeePaid
    }

    fn group_scope(&self) -> GroupScope {
        GroupScope::Messaging {
            recipient: self.recipient.clone(),
        }
    }

    fn pow_difficulty(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<Option<u32>, TransactionError> {
        Ok(tx
            .header
            .fee
            .is_zero()
            .then_some(ctx.params.pow.message_difficulty))
    }

    fn is_valid(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        ensure!(
            (1..=MAX_MESSAGE_DATA).contains(&self.data.len()),
            ValidationResult::InvalidDataLength
        );
        ensure!(
            self.recipient.is_some() || self.amount.is_zero(),
            ValidationResult::InvalidAmount
        );
        if self.amount.is_zero() {
            ensure!(checks::covers_fee(tx, ctx)?, ValidationResult::NoBalance);
            return Ok(ValidationResult::Ok);
        }
        self.validate_payment(tx, ctx)
    }

    fn is_processable(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        self.validate_payment(tx, ctx)
    }

    fn process(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<Option<UndoState>, TransactionError> {
        if let Some(leg) = self.leg() {
            payment::process_legs(tx, ctx, &leg)?;
        }
        Ok(None)
    }

    fn orphan(&self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        match self.leg() {
            Some(leg) => payment::orphan_legs(tx, ctx, &leg),
            None => Ok(()),
        }
    }

    fn process_references_and_fees(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<(), TransactionError> {
        match self.leg() {
            Some(leg) => payment::process_leg_references(tx, ctx, &leg, false),
            None => checks::charge_fee_and_chain(tx, ctx),
        }
    }

    fn orphan_references_and_fees(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<(), TransactionError> {
        match self.leg() {
            Some(leg) => payment::orphan_leg_references(tx, ctx, &leg, false),
            None => checks::refund_fee_and_unchain(tx, ctx),
        }
    }
}

// ── CHAT ───────────────────────────────────────────────────────────────

impl Behaviour for ChatBody {
    fn recipients(&self) -> Vec<Address> {
        self.recipient.iter().cloned().collect()
    }

    fn fee_policy(&self, _tx: &Transaction) -> FeePolicy {
        FeePolicy::NonNegative
    }

    fn reference_policy(&self) -> ReferencePolicy {
        ReferencePolicy::Waived
    }

    fn group_scope(&self) -> GroupScope {
        GroupScope::Messaging {
            recipient: self.recipient.clone(),
        }
    }

    /// Funded senders get the easier target.
    fn pow_difficulty(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<Option<u32>, TransactionError> {
        let funded = ctx
            .repo
            .get_balance(&tx.creator_address(), BASE_ASSET)?
            .is_positive();
        let pow = &ctx.params.pow;
        Ok(Some(if funded {
            pow.chat_funded_difficulty
        } else {
            pow.chat_unfunded_difficulty
        }))
    }

    fn is_valid(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        ensure!(
            !ctx.repo.transaction_exists(&tx.signature)?,
            ValidationResult::InvalidButOk
        );
        if let Some(recipient) = &self.recipient {
            ensure!(
                checks::is_valid_address(recipient),
                ValidationResult::InvalidAddress
            );
        }
        ensure!(
            (1..=MAX_CHAT_DATA).contains(&self.data.len()),
            ValidationResult::InvalidDataLength
        );
        Ok(ValidationResult::Ok)
    }

    fn process(
        &self,
        _tx: &Transaction,
        _ctx: &TxContext<'_>,
    ) -> Result<Option<UndoState>, TransactionError> {
        Err(TransactionError::NeverProcessed(TransactionType::Chat))
    }

    fn orphan(&self, _tx: &Transaction, _ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        Err(TransactionError::NeverProcessed(TransactionType::Chat))
    }

    fn process_references_and_fees(
        &self,
        _tx: &Transaction,
        _ctx: &TxContext<'_>,
    ) -> Result<(), TransactionError> {
        Err(TransactionError::NeverProcessed(TransactionType::Chat))
    }

    fn orphan_references_and_fees(
        &self,
        _tx: &Transaction,
        _ctx: &TxContext<'_>,
    ) -> Result<(), TransactionError> {
        Err(TransactionError::NeverProcessed(TransactionType::Chat))
    }

    /// Keep a skeleton account so the sender's key stays discoverable after
    /// their messages expire.
    fn on_import(&self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        ctx.repo
            .ensure_account(&tx.creator_address(), Some(&tx.header.creator))?;
        Ok(())
    }
}

// ── PUBLICIZE ──────────────────────────────────────────────────────────

impl Behaviour for PublicizeBody {
    fn fee_policy(&self, _tx: &Transaction) -> FeePolicy {
        FeePolicy::NonNegative
    }

    fn reference_policy(&self) -> ReferencePolicy {
        ReferencePolicy::Waived
    }

    fn is_valid(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        let already_publicized = ctx
            .repo
            .find_transactions(&tx.header.creator, TransactionType::Publicize)?
            .iter()
            .any(StoredTransaction::is_confirmed);
        ensure!(!already_publicized, ValidationResult::TransactionAlreadyExists);

        // Old publicize transactions were mined before the current difficulty.
        if tx.header.timestamp.elapsed_since(ctx.now) < ctx.params.publicize_historic_threshold_ms
        {
            let nonce_ok = cairn_work::verify(
                &tx.pow_bytes()?,
                ctx.params.pow.buffer_bytes,
                ctx.params.pow.publicize_difficulty,
                self.nonce,
            );
            ensure!(nonce_ok, ValidationResult::IncorrectNonce);
        }
        Ok(ValidationResult::Ok)
    }

    fn process(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<Option<UndoState>, TransactionError> {
        let creator = tx.creator_address();
        let previous = ctx.repo.get_account(&creator)?;
        ctx.repo.ensure_account(&creator, Some(&tx.header.creator))?;
        Ok(Some(UndoState::Account(previous)))
    }

    fn orphan(&self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        let Some(UndoState::Account(previous)) = &tx.undo else {
            return Err(tx.missing_undo());
        };
        let creator = tx.creator_address();
        match previous {
            Some(account) => ctx.repo.save_account(account)?,
            None => ctx.repo.delete_account(&creator)?,
        }
        Ok(())
    }
}

// ── PRESENCE ───────────────────────────────────────────────────────────

impl Behaviour for PresenceBody {
    fn fee_policy(&self, _tx: &Transaction) -> FeePolicy {
        FeePolicy::NonNegative
    }

    fn reference_policy(&self) -> ReferencePolicy {
        ReferencePolicy::Waived
    }

    fn group_scope(&self) -> GroupScope {
        GroupScope::NoGroupOnly
    }

    fn pow_difficulty(
        &self,
        _tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<Option<u32>, TransactionError> {
        Ok(Some(ctx.params.pow.presence_difficulty))
    }

    fn deadline(&self, tx: &Transaction, params: &LedgerParams) -> Timestamp {
        tx.header
            .timestamp
            .saturating_add_millis(params.presence_lifetime_ms)
    }

    fn is_valid(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        ensure!(
            !ctx.repo.transaction_exists(&tx.signature)?,
            ValidationResult::InvalidButOk
        );
        ensure!(
            self.presence_type == PresenceType::TradeBot,
            ValidationResult::NotYetReleased
        );
        let timestamp_bytes = tx.header.timestamp.as_millis().to_be_bytes();
        ensure!(
            verify_signature(&timestamp_bytes, &self.timestamp_signature, &tx.header.creator),
            ValidationResult::InvalidTimestampSignature
        );
        Ok(ValidationResult::Ok)
    }

    fn process(
        &self,
        _tx: &Transaction,
        _ctx: &TxContext<'_>,
    ) -> Result<Option<UndoState>, TransactionError> {
        Err(TransactionError::NeverProcessed(TransactionType::Presence))
    }

    fn orphan(&self, _tx: &Transaction, _ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        Err(TransactionError::NeverProcessed(TransactionType::Presence))
    }

    fn process_references_and_fees(
        &self,
        _tx: &Transaction,
        _ctx: &TxContext<'_>,
    ) -> Result<(), TransactionError> {
        Err(TransactionError::NeverProcessed(TransactionType::Presence))
    }

    fn orphan_references_and_fees(
        &self,
        _tx: &Transaction,
        _ctx: &TxContext<'_>,
    ) -> Result<(), TransactionError> {
        Err(TransactionError::NeverProcessed(TransactionType::Presence))
    }

    /// Only the creator's newest presence stays in the pool.
    fn on_import(&self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        let mut pending: Vec<StoredTransaction> = ctx
            .repo
            .find_transactions(&tx.header.creator, TransactionType::Presence)?
            .into_iter()
            .filter(|stored| !stored.is_confirmed())
            .collect();
        pending.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.signature.cmp(&b.signature))
        });
        pending.pop();

        for stale in pending {
            info!(signature = %stale.signature, "deleting older PRESENCE transaction");
            ctx.repo.remove_unconfirmed(&stale.signature)?;
            ctx.repo.delete_transaction(&stale.signature)?;
        }
        Ok(())
    }
}

// ── ARBITRARY ──────────────────────────────────────────────────────────

impl Behaviour for ArbitraryBody {
    fn recipients(&self) -> Vec<Address> {
        self.payments.iter().map(|leg| leg.recipient.clone()).collect()
    }

    fn is_valid(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        ensure!(
            (1..=MAX_ARBITRARY_DATA).contains(&self.data.len()),
            ValidationResult::InvalidDataLength
        );
        payment::validate_legs(tx, ctx, &self.payments, false)
    }

    fn process(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<Option<UndoState>, TransactionError> {
        payment::process_legs(tx, ctx, &self.payments)?;
        Ok(None)
    }

    fn orphan(&self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        payment::orphan_legs(tx, ctx, &self.payments)
    }

    fn process_references_and_fees(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<(), TransactionError> {
        payment::process_leg_references(tx, ctx, &self.payments, true)
    }

    fn orphan_references_and_fees(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<(), TransactionError> {
        payment::orphan_leg_references(tx, ctx, &self.payments, true)
    }
}
