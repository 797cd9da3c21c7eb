//! Every Cairn transaction variant and its state-transition logic.
//!
//! A [`Transaction`] is a common header, a variant body and a signature. Each
//! body knows how to validate itself against the repository, how to apply
//! itself (`process`) and how to reverse that application exactly (`orphan`).
//! Whatever `process` overwrites is captured as an explicit [`UndoState`] that
//! `orphan` requires.
//!
//! Variant families:
//! - **Genesis-only**: genesis credit, account flags, account level
//! - **Payments**: payment, asset transfer, multi-payment
//! - **Messaging**: message, chat, publicize, presence, arbitrary data
//! - **Names**: register, update, sell, cancel sale, buy
//! - **Polls**: create, vote
//! - **Assets**: issue, update, create order, cancel order
//! - **Groups**: create, update, default group, admins, bans, kicks, invites,
//!   join, leave, approval decisions
//! - **Minting**: reward shares
//! - **Automated transactions**: deploy AT, AT-generated transfers and messages

pub mod approval;
pub mod asset;
pub mod at;
mod behaviour;
mod checks;
pub mod codec;
pub mod context;
pub mod error;
pub mod genesis;
pub mod group;
pub mod membership;
pub mod messaging;
pub mod name;
pub mod naming;
pub mod order;
pub mod payment;
pub mod poll;
pub mod reward_share;
pub mod undo;

pub use context::TxContext;
pub use error::TransactionError;
pub use undo::{MembershipSnapshot, ReferenceUndo, UndoState};

use cairn_crypto::{account_address, hashed_signature, sign_message, verify_signature};
use cairn_store::StoredTransaction;
use cairn_types::{
    Address, Amount, ApprovalStatus, GroupId, LedgerParams, PrivateKey, PublicKey, Signature,
    Timestamp, TransactionType, ValidationResult,
};
use serde::{Deserialize, Serialize};

use behaviour::Behaviour;

/// Fields shared by every variant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxHeader {
    pub timestamp: Timestamp,
    pub tx_group_id: GroupId,
    /// Creator's last reference at signing time; `None` for a first transaction.
    pub reference: Option<Signature>,
    pub creator: PublicKey,
    pub fee: Amount,
}

/// How the minimum fee is enforced at admission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeePolicy {
    /// At least the unit fee and at least the size-based recommended fee.
    Standard,
    /// Any fee that is not negative; spam is priced by proof-of-work instead.
    NonNegative,
}

/// How the reference field is checked against the creator's last reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReferencePolicy {
    /// Must equal the creator account's last reference.
    Chained,
    /// Never checked.
    Waived,
    /// Must be present; only checked against the chain when a fee is paid.
    ChainedWhenFeePaid,
}

/// Which `tx_group_id` values a variant accepts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GroupScope {
    /// NO_GROUP unless the type needs approval; otherwise a group the creator belongs to.
    Standard,
    /// NO_GROUP, or a group holding both the creator and the recipient (when present).
    Messaging { recipient: Option<Address> },
    /// NO_GROUP only.
    NoGroupOnly,
}

macro_rules! tx_bodies {
    ($($variant:ident($module:ident :: $body:ident),)+) => {
        /// Variant-specific payload. One arm per released transaction type.
        #[derive(Clone, Debug, PartialEq, Eq)]
        pub enum TxBody {
            $($variant($module::$body),)+
        }

        impl TxBody {
            pub fn tx_type(&self) -> TransactionType {
                match self {
                    $(Self::$variant(_) => TransactionType::$variant,)+
                }
            }

            pub(crate) fn behaviour(&self) -> &dyn Behaviour {
                match self {
                    $(Self::$variant(body) => body,)+
                }
            }

            pub(crate) fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), TransactionError> {
                match self {
                    $(Self::$variant(body) => bincode::serialize_into(&mut *out, body)?,)+
                }
                Ok(())
            }

            pub(crate) fn decode_from(
                tx_type: TransactionType,
                reader: &mut &[u8],
            ) -> Result<Self, TransactionError> {
                match tx_type {
                    $(TransactionType::$variant => Ok(Self::$variant(bincode::deserialize_from(reader)?)),)+
                    #[allow(unreachable_patterns)]
                    other => Err(TransactionError::UnsupportedType(other)),
                }
            }
        }
    };
}

tx_bodies! {
    Genesis(genesis::GenesisBody),
    Payment(payment::PaymentBody),
    RegisterName(name::RegisterNameBody),
    UpdateName(name::UpdateNameBody),
    SellName(name::SellNameBody),
    CancelSellName(name::CancelSellNameBody),
    BuyName(name::BuyNameBody),
    CreatePoll(poll::CreatePollBody),
    VoteOnPoll(poll::VoteOnPollBody),
    Arbitrary(messaging::ArbitraryBody),
    IssueAsset(asset::IssueAssetBody),
    TransferAsset(payment::TransferAssetBody),
    CreateAssetOrder(order::CreateAssetOrderBody),
    CancelAssetOrder(order::CancelAssetOrderBody),
    MultiPayment(payment::MultiPaymentBody),
    DeployAt(at::DeployAtBody),
    Message(messaging::MessageBody),
    Chat(messaging::ChatBody),
    Publicize(messaging::PublicizeBody),
    At(at::AtBody),
    CreateGroup(group::CreateGroupBody),
    UpdateGroup(group::UpdateGroupBody),
    AddGroupAdmin(group::AddGroupAdminBody),
    RemoveGroupAdmin(group::RemoveGroupAdminBody),
    GroupBan(membership::GroupBanBody),
    CancelGroupBan(membership::CancelGroupBanBody),
    GroupKick(membership::GroupKickBody),
    GroupInvite(membership::GroupInviteBody),
    CancelGroupInvite(membership::CancelGroupInviteBody),
    JoinGroup(membership::JoinGroupBody),
    LeaveGroup(membership::LeaveGroupBody),
    GroupApproval(approval::GroupApprovalBody),
    SetGroup(group::SetGroupBody),
    UpdateAsset(asset::UpdateAssetBody),
    AccountFlags(genesis::AccountFlagsBody),
    RewardShare(reward_share::RewardShareBody),
    AccountLevel(genesis::AccountLevelBody),
    Presence(messaging::PresenceBody),
}

impl TxBody {
    /// Proof-of-work nonce, for the variants that carry one.
    pub fn nonce(&self) -> Option<u32> {
        match self {
            Self::Message(body) => Some(body.nonce),
            Self::Chat(body) => Some(body.nonce),
            Self::Publicize(body) => Some(body.nonce),
            Self::Presence(body) => Some(body.nonce),
            _ => None,
        }
    }

    pub fn set_nonce(&mut self, nonce: u32) {
        match self {
            Self::Message(body) => body.nonce = nonce,
            Self::Chat(body) => body.nonce = nonce,
            Self::Publicize(body) => body.nonce = nonce,
            Self::Presence(body) => body.nonce = nonce,
            _ => {}
        }
    }
}

/// A signed transaction plus the lifecycle state the ledger tracks for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub header: TxHeader,
    pub body: TxBody,
    pub signature: Signature,
    pub approval_status: ApprovalStatus,
    /// Captured by `process`, consumed by `orphan`.
    pub undo: Option<UndoState>,
    /// Captured by `process_references_and_fees`, consumed by
    /// `orphan_references_and_fees`.
    pub reference_undo: Option<ReferenceUndo>,
}

impl Transaction {
    /// An unsigned transaction.
    pub fn new(header: TxHeader, body: TxBody) -> Self {
        Self {
            header,
            body,
            signature: Signature::ZERO,
            approval_status: ApprovalStatus::NotRequired,
            undo: None,
            reference_undo: None,
        }
    }

    pub fn tx_type(&self) -> TransactionType {
        self.body.tx_type()
    }

    pub fn timestamp(&self) -> Timestamp {
        self.header.timestamp
    }

    /// The account whose reference chain and fee this transaction uses.
    ///
    /// For AT-generated transactions that is the AT's own account.
    pub fn creator_address(&self) -> Address {
        match &self.body {
            TxBody::At(body) => body.at_address.clone(),
            _ => account_address(&self.header.creator),
        }
    }

    /// Addresses this transaction credits or otherwise names, excluding the creator.
    pub fn recipients(&self) -> Vec<Address> {
        self.body.behaviour().recipients()
    }

    /// Creator followed by every recipient.
    pub fn involved_addresses(&self) -> Vec<Address> {
        let mut addresses = vec![self.creator_address()];
        addresses.extend(self.recipients());
        addresses
    }

    pub fn fee_policy(&self) -> FeePolicy {
        self.body.behaviour().fee_policy(self)
    }

    pub fn reference_policy(&self) -> ReferencePolicy {
        self.body.behaviour().reference_policy()
    }

    pub fn group_scope(&self) -> GroupScope {
        self.body.behaviour().group_scope()
    }

    /// Time after which this transaction can no longer be admitted or included.
    pub fn deadline(&self, params: &LedgerParams) -> Timestamp {
        self.body.behaviour().deadline(self, params)
    }

    // ── Signing ──────────────────────────────────────────────────────────

    pub fn sign(&mut self, private_key: &PrivateKey) -> Result<(), TransactionError> {
        self.signature = sign_message(&self.signing_bytes()?, private_key);
        Ok(())
    }

    /// Deterministic signature used by GENESIS and AT transactions, which no key signs.
    pub fn sign_hashed(&mut self) -> Result<(), TransactionError> {
        self.signature = hashed_signature(&self.signing_bytes()?);
        Ok(())
    }

    /// Search for a nonce meeting `difficulty` and store it in the body.
    ///
    /// Must run before signing, since the signature covers the nonce.
    pub fn compute_nonce(
        &mut self,
        buffer_bytes: usize,
        difficulty: u32,
    ) -> Result<(), TransactionError> {
        let nonce = cairn_work::compute(&self.pow_bytes()?, buffer_bytes, difficulty)?;
        self.body.set_nonce(nonce);
        Ok(())
    }

    /// Signature check, plus the proof-of-work check for nonce-secured variants.
    pub fn is_signature_valid(&self, ctx: &TxContext<'_>) -> Result<bool, TransactionError> {
        Ok(self.has_valid_key_signature()? && self.has_valid_nonce(ctx)?)
    }

    /// The Ed25519 check alone, or the hash-derived check for GENESIS and AT.
    pub fn has_valid_key_signature(&self) -> Result<bool, TransactionError> {
        let bytes = self.signing_bytes()?;
        if matches!(self.tx_type(), TransactionType::Genesis | TransactionType::At) {
            return Ok(self.signature == hashed_signature(&bytes));
        }
        Ok(verify_signature(&bytes, &self.signature, &self.header.creator))
    }

    /// Leading-zero difficulty the nonce must currently meet, if any.
    pub fn required_difficulty(&self, ctx: &TxContext<'_>) -> Result<Option<u32>, TransactionError> {
        self.body.behaviour().pow_difficulty(self, ctx)
    }

    /// True when no proof-of-work is required or the carried nonce meets it.
    pub fn has_valid_nonce(&self, ctx: &TxContext<'_>) -> Result<bool, TransactionError> {
        match (self.required_difficulty(ctx)?, self.body.nonce()) {
            (Some(difficulty), Some(nonce)) => Ok(cairn_work::verify(
                &self.pow_bytes()?,
                ctx.params.pow.buffer_bytes,
                difficulty,
                nonce,
            )),
            _ => Ok(true),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────────

    pub fn is_valid(&self, ctx: &TxContext<'_>) -> Result<ValidationResult, TransactionError> {
        self.body.behaviour().is_valid(self, ctx)
    }

    /// Checks that can only be made at application time, which for approval-gated
    /// transactions may be long after submission.
    pub fn is_processable(
        &self,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        self.body.behaviour().is_processable(self, ctx)
    }

    pub fn process(&mut self, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        let undo = self.body.behaviour().process(self, ctx)?;
        self.undo = undo;
        Ok(())
    }

    pub fn process_references_and_fees(
        &mut self,
        ctx: &TxContext<'_>,
    ) -> Result<(), TransactionError> {
        let previous = ctx.repo.get_last_reference(&self.creator_address())?;
        self.body.behaviour().process_references_and_fees(self, ctx)?;
        self.reference_undo = Some(ReferenceUndo { previous });
        Ok(())
    }

    pub fn orphan_references_and_fees(
        &mut self,
        ctx: &TxContext<'_>,
    ) -> Result<(), TransactionError> {
        self.body.behaviour().orphan_references_and_fees(self, ctx)?;
        self.reference_undo = None;
        Ok(())
    }

    /// The creator's last reference from before this transaction was applied.
    pub(crate) fn previous_reference(&self) -> Result<Option<Signature>, TransactionError> {
        self.reference_undo
            .map(|undo| undo.previous)
            .ok_or_else(|| self.missing_undo())
    }

    pub fn orphan(&mut self, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        self.body.behaviour().orphan(self, ctx)?;
        self.undo = None;
        Ok(())
    }

    /// Per-type bookkeeping run once a transaction has been stored as unconfirmed.
    pub fn on_import(&self, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        self.body.behaviour().on_import(self, ctx)
    }

    pub(crate) fn missing_undo(&self) -> TransactionError {
        TransactionError::MissingUndoState(self.signature)
    }

    pub(crate) fn missing(&self, what: &'static str) -> TransactionError {
        TransactionError::MissingRecord {
            signature: self.signature,
            what,
        }
    }

    // ── Storage ──────────────────────────────────────────────────────────

    /// Repository form, unconfirmed and without block placement.
    pub fn to_stored(&self) -> Result<StoredTransaction, TransactionError> {
        Ok(StoredTransaction {
            signature: self.signature,
            tx_type: self.tx_type(),
            creator: self.header.creator,
            timestamp: self.header.timestamp,
            tx_group_id: self.header.tx_group_id,
            approval_status: self.approval_status,
            block_height: None,
            block_sequence: None,
            approval_height: None,
            record: self.to_record()?,
        })
    }

    pub fn from_stored(stored: &StoredTransaction) -> Result<Self, TransactionError> {
        let mut tx = Self::from_record(&stored.record)?;
        tx.approval_status = stored.approval_status;
        Ok(tx)
    }
}
