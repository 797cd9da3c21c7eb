//! CREATE_POLL and VOTE_ON_POLL.

use cairn_store::{PollData, VoteData};
use cairn_types::{Address, ValidationResult};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::behaviour::Behaviour;
use crate::checks::{self, ensure};
use crate::naming::{is_normalized, utf8_len_within};
use crate::{Transaction, TransactionError, TxContext, UndoState};

pub const MIN_NAME_SIZE: usize = 3;
pub const MAX_NAME_SIZE: usize = 400;
pub const MAX_DESCRIPTION_SIZE: usize = 4000;
pub const MAX_OPTIONS: usize = 100;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePollBody {
    pub owner: Address,
    pub poll_name: String,
    pub description: String,
    pub options: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteOnPollBody {
    pub poll_name: String,
    pub option_index: u32,
}

impl Behaviour for CreatePollBody {
    fn recipients(&self) -> Vec<Address> {
        vec![self.owner.clone()]
    }

    fn is_valid(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        ensure!(
            checks::is_valid_address(&self.owner),
            ValidationResult::InvalidAddress
        );
        ensure!(
            utf8_len_within(&self.poll_name, MIN_NAME_SIZE, MAX_NAME_SIZE),
            ValidationResult::InvalidNameLength
        );
        ensure!(
            utf8_len_within(&self.description, 1, MAX_DESCRIPTION_SIZE),
            ValidationResult::InvalidDescriptionLength
        );
        ensure!(
            is_normalized(&self.poll_name),
            ValidationResult::NameNotNormalized
        );
        ensure!(
            (1..=MAX_OPTIONS).contains(&self.options.len()),
            ValidationResult::InvalidOptionsCount
        );
        for (i, option) in self.options.iter().enumerate() {
            ensure!(
                utf8_len_within(option, 1, MAX_NAME_SIZE),
                ValidationResult::InvalidOptionLength
            );
            ensure!(
                !self.options[..i].contains(option),
                ValidationResult::DuplicateOption
            );
        }
        ensure!(checks::covers_fee(tx, ctx)?, ValidationResult::NoBalance);
        Ok(ValidationResult::Ok)
    }

    fn is_processable(
        &self,
        _tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        ensure!(
            ctx.repo.get_poll(&self.poll_name)?.is_none(),
            ValidationResult::PollAlreadyExists
        );
        Ok(ValidationResult::Ok)
    }

    fn process(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<Option<UndoState>, TransactionError> {
        ctx.repo.save_poll(&PollData {
            creator: tx.header.creator,
            owner: self.owner.clone(),
            name: self.poll_name.clone(),
            description: self.description.clone(),
            options: self.options.clone(),
            published: tx.header.timestamp,
        })?;
        Ok(None)
    }

    fn orphan(&self, _tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        ctx.repo.delete_poll(&self.poll_name)?;
        Ok(())
    }
}

impl Behaviour for VoteOnPollBody {
    fn is_valid(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        ensure!(
            utf8_len_within(&self.poll_name, 1, MAX_NAME_SIZE),
            ValidationResult::InvalidNameLength
        );
        ensure!(
            is_normalized(&self.poll_name),
            ValidationResult::NameNotNormalized
        );
        let Some(poll) = ctx.repo.get_poll(&self.poll_name)? else {
            return Ok(ValidationResult::PollDoesNotExist);
        };
        ensure!(
            (self.option_index as usize) < poll.options.len(),
            ValidationResult::PollOptionDoesNotExist
        );
        if let Some(vote) = ctx.repo.get_vote(&self.poll_name, &tx.header.creator)? {
            ensure!(
                vote.option_index != self.option_index,
                ValidationResult::AlreadyVotedForThatOption
            );
        }
        ensure!(checks::covers_fee(tx, ctx)?, ValidationResult::NoBalance);
        Ok(ValidationResult::Ok)
    }

    fn process(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<Option<UndoState>, TransactionError> {
        let previous = ctx
            .repo
            .get_vote(&self.poll_name, &tx.header.creator)?
            .map(|vote| vote.option_index);
        if let Some(index) = previous {
            trace!(poll = %self.poll_name, previous = index, "replacing earlier vote");
        }
        trace!(poll = %self.poll_name, option = self.option_index, "recording vote");

        ctx.repo.save_vote(&VoteData {
            poll_name: self.poll_name.clone(),
            voter: tx.header.creator,
            option_index: self.option_index,
        })?;
        Ok(Some(UndoState::Vote(previous)))
    }

    fn orphan(&self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        let Some(UndoState::Vote(previous)) = &tx.undo else {
            return Err(tx.missing_undo());
        };
        match previous {
            Some(index) => {
                trace!(poll = %self.poll_name, option = index, "reinstating earlier vote");
                ctx.repo.save_vote(&VoteData {
                    poll_name: self.poll_name.clone(),
                    voter: tx.header.creator,
                    option_index: *index,
                })?;
            }
            None => ctx.repo.delete_vote(&self.poll_name, &tx.header.creator)?,
        }
        Ok(())
    }
}
