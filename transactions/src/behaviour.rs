use cairn_types::{Address, LedgerParams, Timestamp, ValidationResult};

use crate::{
    checks, FeePolicy, GroupScope, ReferencePolicy, Transaction, TransactionError, TxContext,
    UndoState,
};

/// Per-variant hooks behind [`Transaction`]'s lifecycle methods.
///
/// Bodies implement the required methods; the defaults describe an ordinary
/// fee-paying, reference-chained, non-group-gated transaction.
pub(crate) trait Behaviour {
    fn recipients(&self) -> Vec<Address> {
        Vec::new()
    }

    fn fee_policy(&self, _tx: &Transaction) -> FeePolicy {
        FeePolicy::Standard
    }

    fn reference_policy(&self) -> ReferencePolicy {
        ReferencePolicy::Chained
    }

    fn group_scope(&self) -> GroupScope {
        GroupScope::Standard
    }

    /// Leading-zero difficulty the nonce must meet, if any.
    fn pow_difficulty(
        &self,
        _tx: &Transaction,
        _ctx: &TxContext<'_>,
    ) -> Result<Option<u32>, TransactionError> {
        Ok(None)
    }

    fn deadline(&self, tx: &Transaction, params: &LedgerParams) -> Timestamp {
        tx.header
            .timestamp
            .saturating_add_millis(params.transaction_expiry_ms)
    }

    fn is_valid(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError>;

    fn is_processable(
        &self,
        _tx: &Transaction,
        _ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        Ok(ValidationResult::Ok)
    }

    fn process(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<Option<UndoState>, TransactionError>;

    fn orphan(&self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), TransactionError>;

    fn process_references_and_fees(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<(), TransactionError> {
        checks::charge_fee_and_chain(tx, ctx)
    }

    fn orphan_references_and_fees(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<(), TransactionError> {
        checks::refund_fee_and_unchain(tx, ctx)
    }

    fn on_import(&self, _tx: &Transaction, _ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        Ok(())
    }
}
