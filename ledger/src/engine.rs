//! The transaction lifecycle engine.
//!
//! [`Ledger`] owns the repository and the blockchain lock. Every mutating
//! operation (admission, sweep, block application and rollback) takes the
//! lock for its whole duration, so they never interleave. Read-only queries
//! go straight to the repository.

use std::sync::{Arc, Mutex, MutexGuard};

use cairn_crypto::is_valid_public_key;
use cairn_store::{BlockSummary, Repository};
use cairn_transactions::{Transaction, TxContext};
use cairn_types::{
    ApprovalStatus, LedgerParams, NetworkClock, Timestamp, TransactionType, ValidationResult,
};
use tracing::{debug, info, warn};

use crate::approval;
use crate::policy;
use crate::pool::{self, Eviction};
use crate::LedgerError;

/// Outcome of submitting a transaction for the unconfirmed pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Admission {
    /// Stored and marked unconfirmed.
    Accepted,
    /// The creator's signature does not verify.
    InvalidSignature,
    Rejected(ValidationResult),
}

impl Admission {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// A block to apply: its height, timestamp and transactions in block order.
#[derive(Clone, Debug)]
pub struct Block {
    pub height: u32,
    pub timestamp: Timestamp,
    pub transactions: Vec<Transaction>,
}

/// Transaction count as stored in the block summary and sequence numbers.
fn indexable_len(len: usize) -> Result<u32, LedgerError> {
    u32::try_from(len).map_err(|_| LedgerError::BlockTooLarge(len))
}

pub struct Ledger<R> {
    repo: R,
    params: LedgerParams,
    clock: Arc<dyn NetworkClock>,
    blockchain_lock: Mutex<()>,
}

impl<R: Repository> Ledger<R> {
    pub fn new(repo: R, params: LedgerParams, clock: Arc<dyn NetworkClock>) -> Self {
        Self {
            repo,
            params,
            clock,
            blockchain_lock: Mutex::new(()),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn params(&self) -> &LedgerParams {
        &self.params
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>, LedgerError> {
        self.blockchain_lock
            .lock()
            .map_err(|_| LedgerError::LockPoisoned)
    }

    /// Run `work`, committing nothing if it fails.
    fn atomically<T>(
        &self,
        work: impl FnOnce() -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        match work() {
            Ok(value) => Ok(value),
            Err(e) => {
                self.repo.discard_changes()?;
                Err(e)
            }
        }
    }

    // ── Admission ────────────────────────────────────────────────────────

    /// Validate `tx` against the current tip and, if it passes, store it as
    /// unconfirmed. Rejections leave the repository untouched.
    pub fn import_as_unconfirmed(&self, mut tx: Transaction) -> Result<Admission, LedgerError> {
        let _guard = self.lock()?;
        let repo: &dyn Repository = &self.repo;

        if repo.transaction_exists(&tx.signature)? {
            return Ok(self.reject(&tx, ValidationResult::TransactionAlreadyExists));
        }
        // generated by AT execution during block assembly, never submitted
        if tx.tx_type() == TransactionType::At {
            return Ok(self.reject(&tx, ValidationResult::InvalidAtTransaction));
        }
        let Some(now) = self.clock.now() else {
            return Ok(self.reject(&tx, ValidationResult::ClockNotSynced));
        };
        let ctx = TxContext::admission(repo, &self.params, now);

        if !tx.has_valid_key_signature()? {
            debug!(signature = %tx.signature, "rejected: bad signature");
            return Ok(Admission::InvalidSignature);
        }
        if !tx.has_valid_nonce(&ctx)? {
            return Ok(self.reject(&tx, ValidationResult::IncorrectNonce));
        }

        tx.approval_status = approval::initial_status(&tx, repo)?;

        let result = self.admission_checks(&tx, &ctx)?;
        if result != ValidationResult::Ok {
            return Ok(self.reject(&tx, result));
        }

        // validation only read; drop anything it may have staged
        repo.discard_changes()?;

        self.atomically(|| {
            repo.save_transaction(&tx.to_stored()?)?;
            repo.add_unconfirmed(&tx.signature)?;
            tx.on_import(&ctx)?;
            repo.save_changes()?;
            Ok(())
        })?;

        info!(
            signature = %tx.signature,
            tx_type = tx.tx_type().name(),
            fee = %tx.header.fee,
            "transaction accepted"
        );
        Ok(Admission::Accepted)
    }

    fn reject(&self, tx: &Transaction, result: ValidationResult) -> Admission {
        debug!(
            signature = %tx.signature,
            tx_type = tx.tx_type().name(),
            result = result.name(),
            "transaction rejected"
        );
        Admission::Rejected(result)
    }

    /// The full admission sequence, after signature and nonce.
    fn admission_checks(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, LedgerError> {
        let result = self.timing_checks(tx, ctx.now)?;
        if result != ValidationResult::Ok {
            return Ok(result);
        }

        let result = policy::check_fee(tx, &self.params)?;
        if result != ValidationResult::Ok {
            return Ok(result);
        }

        if tx.tx_type() != TransactionType::Genesis && !is_valid_public_key(&tx.header.creator) {
            return Ok(ValidationResult::MissingCreator);
        }

        if tx.tx_type() != TransactionType::Chat
            && self.unconfirmed_by_creator(tx)? >= self.params.max_unconfirmed_per_account
        {
            return Ok(ValidationResult::TooManyUnconfirmed);
        }

        if !policy::is_valid_tx_group_id(tx, ctx.repo, &self.params)? {
            return Ok(ValidationResult::InvalidTxGroupId);
        }

        self.state_checks(tx, ctx)
    }

    /// Deadline and future-timestamp checks against `now` and the tip.
    fn timing_checks(&self, tx: &Transaction, now: Timestamp) -> Result<ValidationResult, LedgerError> {
        let deadline = tx.deadline(&self.params);
        if now >= deadline {
            return Ok(ValidationResult::TimestampTooOld);
        }
        if let Some(tip) = self.repo.last_block()? {
            if deadline <= tip.timestamp {
                return Ok(ValidationResult::TimestampTooOld);
            }
        }
        if tx.timestamp() > now.saturating_add_millis(self.params.max_future_ms) {
            return Ok(ValidationResult::TimestampTooNew);
        }
        Ok(ValidationResult::Ok)
    }

    /// Reference, variant validity and processability.
    fn state_checks(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, LedgerError> {
        if !policy::has_valid_reference(tx, ctx.repo)? {
            return Ok(ValidationResult::InvalidReference);
        }
        let result = tx.is_valid(ctx)?;
        if result != ValidationResult::Ok {
            return Ok(result);
        }
        Ok(tx.is_processable(ctx)?)
    }

    fn unconfirmed_by_creator(&self, tx: &Transaction) -> Result<usize, LedgerError> {
        Ok(self
            .repo
            .unconfirmed_transactions()?
            .iter()
            .filter(|stored| {
                stored.tx_type != TransactionType::Chat && stored.creator == tx.header.creator
            })
            .count())
    }

    /// Re-check an unconfirmed transaction against the current tip.
    ///
    /// Fee, quota and group scope were settled at admission and are not
    /// repeated.
    fn still_valid(&self, tx: &Transaction, now: Timestamp) -> Result<ValidationResult, LedgerError> {
        let result = self.timing_checks(tx, now)?;
        if result != ValidationResult::Ok {
            return Ok(result);
        }
        let ctx = TxContext::admission(&self.repo, &self.params, now);
        self.state_checks(tx, &ctx)
    }

    // ── Unconfirmed pool ─────────────────────────────────────────────────

    /// Re-validate the whole pool and delete what no longer holds.
    ///
    /// CHAT and PRESENCE report INVALID_BUT_OK once stored; they stay.
    pub fn sweep_unconfirmed(&self) -> Result<Vec<Eviction>, LedgerError> {
        let _guard = self.lock()?;
        let Some(now) = self.clock.now() else {
            warn!("clock not synchronised; skipping unconfirmed sweep");
            return Ok(Vec::new());
        };

        self.atomically(|| {
            let mut evictions = Vec::new();
            for stored in self.repo.unconfirmed_transactions()? {
                let tx = Transaction::from_stored(&stored)?;
                let result = self.still_valid(&tx, now)?;
                if matches!(result, ValidationResult::Ok | ValidationResult::InvalidButOk) {
                    continue;
                }
                warn!(
                    signature = %tx.signature,
                    tx_type = tx.tx_type().name(),
                    result = result.name(),
                    "evicting unconfirmed transaction"
                );
                self.repo.delete_transaction(&tx.signature)?;
                evictions.push(Eviction {
                    signature: tx.signature,
                    tx_type: tx.tx_type(),
                    result,
                });
            }
            self.repo.save_changes()?;
            Ok(evictions)
        })
    }

    /// Every unconfirmed transaction, in block order.
    pub fn sorted_unconfirmed(&self) -> Result<Vec<Transaction>, LedgerError> {
        let mut transactions = self
            .repo
            .unconfirmed_transactions()?
            .iter()
            .map(Transaction::from_stored)
            .collect::<Result<Vec<_>, _>>()?;
        pool::sort_for_block(&mut transactions);
        Ok(transactions)
    }

    /// Unconfirmed transactions eligible for the next block, in block order.
    pub fn block_candidates(&self) -> Result<Vec<Transaction>, LedgerError> {
        let _guard = self.lock()?;
        let Some(now) = self.clock.now() else {
            return Ok(Vec::new());
        };
        let mut candidates = Vec::new();
        for tx in self.sorted_unconfirmed()? {
            if pool::is_pool_only(tx.tx_type()) {
                continue;
            }
            if self.still_valid(&tx, now)? == ValidationResult::Ok {
                candidates.push(tx);
            }
        }
        Ok(candidates)
    }

    // ── Blocks ───────────────────────────────────────────────────────────

    /// Apply `block` on top of the current tip, all or nothing.
    pub fn apply_block(&self, block: &Block) -> Result<(), LedgerError> {
        let _guard = self.lock()?;
        self.atomically(|| self.apply_block_unlocked(block))?;
        info!(
            height = block.height,
            count = block.transactions.len(),
            "block applied"
        );
        Ok(())
    }

    fn apply_block_unlocked(&self, block: &Block) -> Result<(), LedgerError> {
        let repo: &dyn Repository = &self.repo;
        let expected = repo.chain_height()? + 1;
        if block.height != expected {
            return Err(LedgerError::HeightMismatch {
                expected,
                found: block.height,
            });
        }
        let transaction_count = indexable_len(block.transactions.len())?;
        let ctx = TxContext::block(repo, &self.params, block.timestamp, block.height);

        for (sequence, tx) in (0u32..).zip(&block.transactions) {
            let mut tx = tx.clone();
            let signature = tx.signature;
            let invalid = |result| LedgerError::InvalidBlock { signature, result };

            if pool::is_pool_only(tx.tx_type()) {
                return Err(invalid(ValidationResult::InvalidButOk));
            }
            if !tx.is_signature_valid(&ctx)? {
                return Err(LedgerError::BadSignature(signature));
            }
            if repo
                .get_transaction(&tx.signature)?
                .is_some_and(|stored| stored.is_confirmed())
            {
                return Err(invalid(ValidationResult::TransactionAlreadyConfirmed));
            }
            if tx.timestamp() > block.timestamp {
                return Err(invalid(ValidationResult::TimestampTooNew));
            }
            if tx.deadline(&self.params) <= block.timestamp {
                return Err(invalid(ValidationResult::TimestampTooOld));
            }
            if !policy::has_valid_reference(&tx, repo)? {
                return Err(invalid(ValidationResult::InvalidReference));
            }

            tx.approval_status = approval::initial_status(&tx, repo)?;
            let result = tx.is_valid(&ctx)?;
            if result != ValidationResult::Ok {
                return Err(invalid(result));
            }
            if tx.approval_status == ApprovalStatus::NotRequired {
                let result = tx.is_processable(&ctx)?;
                if result != ValidationResult::Ok {
                    return Err(invalid(result));
                }
                tx.process(&ctx)?;
            }
            tx.process_references_and_fees(&ctx)?;

            let mut stored = tx.to_stored()?;
            stored.block_height = Some(block.height);
            stored.block_sequence = Some(sequence);
            repo.save_transaction(&stored)?;
            repo.remove_unconfirmed(&tx.signature)?;
        }

        approval::resolve(&ctx)?;

        repo.push_block(&BlockSummary {
            height: block.height,
            timestamp: block.timestamp,
            transaction_count,
        })?;
        repo.save_changes()?;
        Ok(())
    }

    /// Roll back the tip block, returning its transactions to the pool.
    pub fn orphan_block(&self) -> Result<BlockSummary, LedgerError> {
        let _guard = self.lock()?;
        let tip = self.atomically(|| self.orphan_block_unlocked())?;
        info!(height = tip.height, "block orphaned");
        Ok(tip)
    }

    fn orphan_block_unlocked(&self) -> Result<BlockSummary, LedgerError> {
        let repo: &dyn Repository = &self.repo;
        let Some(tip) = repo.last_block()? else {
            return Err(LedgerError::EmptyChain);
        };
        let ctx = TxContext::block(repo, &self.params, tip.timestamp, tip.height);

        approval::unresolve(&ctx)?;

        for stored in repo.transactions_in_block(tip.height)?.into_iter().rev() {
            let mut tx = Transaction::from_stored(&stored)?;
            tx.orphan_references_and_fees(&ctx)?;
            if stored.approval_status == ApprovalStatus::NotRequired {
                tx.orphan(&ctx)?;
            }

            if tx.tx_type() == TransactionType::At {
                repo.delete_transaction(&tx.signature)?;
            } else {
                repo.save_transaction(&tx.to_stored()?)?;
                repo.add_unconfirmed(&tx.signature)?;
            }
        }

        repo.pop_block()?;
        repo.save_changes()?;
        Ok(tip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_length_must_fit_a_sequence_number() {
        assert_eq!(indexable_len(3).unwrap(), 3);
        assert_eq!(indexable_len(u32::MAX as usize).unwrap(), u32::MAX);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn oversized_block_is_refused() {
        let len = u32::MAX as usize + 1;
        assert!(matches!(indexable_len(len), Err(LedgerError::BlockTooLarge(n)) if n == len));
    }
}
