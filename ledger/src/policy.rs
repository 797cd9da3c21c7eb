//! Admission rules shared by every variant: fee, reference chain and
//! transaction-group scope.

use cairn_store::Repository;
use cairn_transactions::{FeePolicy, GroupScope, ReferencePolicy, Transaction};
use cairn_types::{Address, LedgerParams, ValidationResult, NO_GROUP};

use crate::LedgerError;

// ── Fees ───────────────────────────────────────────────────────────────

/// Whether the declared fee satisfies the variant's fee policy.
///
/// Nonce-secured variants accept any non-negative fee here; their
/// proof-of-work is checked alongside the signature.
pub fn check_fee(tx: &Transaction, params: &LedgerParams) -> Result<ValidationResult, LedgerError> {
    let fee = tx.header.fee;
    if fee.is_negative() {
        return Ok(ValidationResult::NegativeFee);
    }
    match tx.fee_policy() {
        FeePolicy::NonNegative => Ok(ValidationResult::Ok),
        FeePolicy::Standard => {
            let recommended = params.recommended_fee(tx.encoded_len()?);
            if fee < params.unit_fee || fee < recommended {
                Ok(ValidationResult::InsufficientFee)
            } else {
                Ok(ValidationResult::Ok)
            }
        }
    }
}

// ── References ─────────────────────────────────────────────────────────

/// Whether the transaction's reference matches its creator's last reference.
pub fn has_valid_reference(tx: &Transaction, repo: &dyn Repository) -> Result<bool, LedgerError> {
    let chained = |tx: &Transaction| -> Result<bool, LedgerError> {
        Ok(tx.header.reference == repo.get_last_reference(&tx.creator_address())?)
    };
    match tx.reference_policy() {
        ReferencePolicy::Chained => chained(tx),
        ReferencePolicy::Waived => Ok(true),
        ReferencePolicy::ChainedWhenFeePaid => {
            if tx.header.reference.is_none() {
                return Ok(false);
            }
            if tx.header.fee.is_zero() {
                return Ok(true);
            }
            chained(tx)
        }
    }
}

// ── Transaction-group scope ────────────────────────────────────────────

/// Whether `tx_group_id` is acceptable for this transaction.
pub fn is_valid_tx_group_id(
    tx: &Transaction,
    repo: &dyn Repository,
    params: &LedgerParams,
) -> Result<bool, LedgerError> {
    let group_id = tx.header.tx_group_id;
    match tx.group_scope() {
        GroupScope::NoGroupOnly => Ok(group_id == NO_GROUP),
        GroupScope::Messaging { recipient } => {
            if group_id == NO_GROUP {
                return Ok(true);
            }
            if !member_of_existing(repo, group_id, &tx.creator_address())? {
                return Ok(false);
            }
            match recipient {
                Some(recipient) => Ok(repo.is_member(group_id, &recipient)?),
                None => Ok(true),
            }
        }
        GroupScope::Standard => {
            if !tx.tx_type().needs_approval() {
                return Ok(group_id == NO_GROUP);
            }
            if group_id == NO_GROUP {
                return Ok(!params.require_group_for_approval);
            }
            member_of_existing(repo, group_id, &tx.creator_address())
        }
    }
}

fn member_of_existing(
    repo: &dyn Repository,
    group_id: u32,
    address: &Address,
) -> Result<bool, LedgerError> {
    if repo.get_group(group_id)?.is_none() {
        return Ok(false);
    }
    Ok(repo.is_member(group_id, address)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_crypto::keypair_from_seed;
    use cairn_nullables::NullRepository;
    use cairn_store::AccountStore;
    use cairn_transactions::payment::PaymentBody;
    use cairn_transactions::{TxBody, TxHeader};
    use cairn_types::{Amount, Signature, Timestamp, BASE_ASSET};

    fn payment(fee: Amount, reference: Option<Signature>) -> Transaction {
        let keys = keypair_from_seed(&[7; 32]);
        let mut tx = Transaction::new(
            TxHeader {
                timestamp: Timestamp::from_millis(1_000),
                tx_group_id: NO_GROUP,
                reference,
                creator: keys.public,
                fee,
            },
            TxBody::Payment(PaymentBody {
                recipient: Address::new("Qrecipient"),
                amount: Amount::whole(1),
            }),
        );
        tx.sign(&keys.private).unwrap();
        tx
    }

    #[test]
    fn standard_fee_must_reach_unit_fee() {
        let params = LedgerParams::default();
        assert_eq!(
            check_fee(&payment(params.unit_fee, None), &params).unwrap(),
            ValidationResult::Ok
        );
        let short = Amount::new(params.unit_fee.raw() - 1);
        assert_eq!(
            check_fee(&payment(short, None), &params).unwrap(),
            ValidationResult::InsufficientFee
        );
        assert_eq!(
            check_fee(&payment(Amount::new(-1), None), &params).unwrap(),
            ValidationResult::NegativeFee
        );
    }

    #[test]
    fn reference_must_match_last_reference() {
        let repo = NullRepository::new();
        let tx = payment(Amount::whole(1), None);
        assert!(has_valid_reference(&tx, &repo).unwrap());

        let previous = Signature([3; 64]);
        repo.seed_balance(&tx.creator_address(), BASE_ASSET, Amount::whole(1));
        repo.set_last_reference(&tx.creator_address(), Some(previous))
            .unwrap();
        assert!(!has_valid_reference(&tx, &repo).unwrap());
        assert!(has_valid_reference(&payment(Amount::whole(1), Some(previous)), &repo).unwrap());
    }

    #[test]
    fn ungated_types_insist_on_no_group() {
        let repo = NullRepository::new();
        let params = LedgerParams::default();
        let mut tx = payment(Amount::whole(1), None);
        assert!(is_valid_tx_group_id(&tx, &repo, &params).unwrap());
        tx.header.tx_group_id = 4;
        assert!(!is_valid_tx_group_id(&tx, &repo, &params).unwrap());
    }
}
