//! REWARD_SHARE: create, modify or cancel a minter's reward-share with a recipient.

use cairn_crypto::is_valid_public_key;
use cairn_store::{AccountData, RewardShareData};
use cairn_types::{Address, LedgerParams, PublicKey, ValidationResult};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::behaviour::Behaviour;
use crate::checks::{self, ensure};
use crate::{FeePolicy, Transaction, TransactionError, TxContext, UndoState};

/// 100% in hundredths of a percent.
pub const MAX_SHARE: i32 = 100_00;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardShareBody {
    pub recipient: Address,
    pub reward_share_public_key: PublicKey,
    /// Hundredths of a percent; negative cancels the existing share.
    pub share_percent: i32,
}

fn can_mint(account: Option<&AccountData>, params: &LedgerParams) -> bool {
    account.is_some_and(|a| a.level >= params.min_account_level_to_mint || a.is_founder())
}

fn can_reward_share(account: Option<&AccountData>, params: &LedgerParams) -> bool {
    account
        .is_some_and(|a| a.level >= params.min_account_level_to_reward_share || a.is_founder())
}

impl RewardShareBody {
    fn is_cancelling(&self) -> bool {
        self.share_percent < 0
    }

    fn is_self_share(&self, tx: &Transaction) -> bool {
        tx.creator_address() == self.recipient
    }
}

impl Behaviour for RewardShareBody {
    fn recipients(&self) -> Vec<Address> {
        vec![self.recipient.clone()]
    }

    fn fee_policy(&self, tx: &Transaction) -> FeePolicy {
        if self.is_self_share(tx) {
            FeePolicy::NonNegative
        } else {
            FeePolicy::Standard
        }
    }

    fn is_valid(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        ensure!(
            self.share_percent <= MAX_SHARE,
            ValidationResult::InvalidRewardSharePercent
        );
        ensure!(
            is_valid_public_key(&self.reward_share_public_key),
            ValidationResult::InvalidPublicKey
        );
        ensure!(
            checks::is_valid_address(&self.recipient),
            ValidationResult::InvalidAddress
        );

        let creator = ctx.repo.get_account(&tx.creator_address())?;
        let cancelling = self.is_cancelling();
        let self_share = self.is_self_share(tx);
        ensure!(
            cancelling || can_mint(creator.as_ref(), ctx.params),
            ValidationResult::NotMintingAccount
        );
        ensure!(
            cancelling || self_share || can_reward_share(creator.as_ref(), ctx.params),
            ValidationResult::AccountCannotRewardShare
        );

        let existing = ctx
            .repo
            .get_reward_share_by_key(&self.reward_share_public_key)?;
        match &existing {
            Some(share) => {
                // one key per (minter, recipient) pair
                ensure!(
                    share.minter_public_key == tx.header.creator
                        && share.recipient == self.recipient,
                    ValidationResult::InvalidPublicKey
                );
                ensure!(
                    !self_share || cancelling,
                    ValidationResult::SelfShareExists
                );
            }
            None => {
                ensure!(!cancelling, ValidationResult::RewardShareUnknown);
                ensure!(
                    ctx.repo.count_reward_shares(&tx.header.creator)? < ctx.params.max_reward_shares,
                    ValidationResult::MaximumRewardShares
                );
            }
        }

        if !(self_share && existing.is_none()) {
            ensure!(checks::covers_fee(tx, ctx)?, ValidationResult::NoBalance);
        }
        Ok(ValidationResult::Ok)
    }

    fn process(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<Option<UndoState>, TransactionError> {
        let minter = tx.header.creator;
        let previous = ctx.repo.get_reward_share(&minter, &self.recipient)?;

        if self.is_cancelling() {
            trace!(recipient = %self.recipient, "cancelling reward-share");
            ctx.repo.delete_reward_share(&minter, &self.recipient)?;
        } else {
            if let Some(previous) = &previous {
                trace!(
                    recipient = %self.recipient,
                    from = previous.share_percent,
                    to = self.share_percent,
                    "replacing reward-share"
                );
            }
            ctx.repo.save_reward_share(&RewardShareData {
                minter_public_key: minter,
                minter: tx.creator_address(),
                recipient: self.recipient.clone(),
                reward_share_public_key: self.reward_share_public_key,
                share_percent: self.share_percent,
            })?;
        }
        Ok(Some(UndoState::RewardShare(previous)))
    }

    fn orphan(&self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        let Some(UndoState::RewardShare(previous)) = &tx.undo else {
            return Err(tx.missing_undo());
        };
        match previous {
            Some(share) => ctx.repo.save_reward_share(share)?,
            None => ctx
                .repo
                .delete_reward_share(&tx.header.creator, &self.recipient)?,
        }
        Ok(())
    }

    fn process_references_and_fees(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<(), TransactionError> {
        checks::charge_fee_and_chain(tx, ctx)?;
        // lets the recipient spend minted rewards
        checks::init_reference(tx, ctx, &self.recipient)
    }

    fn orphan_references_and_fees(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<(), TransactionError> {
        checks::refund_fee_and_unchain(tx, ctx)?;
        checks::uninit_reference(tx, ctx, &self.recipient)
    }
}
