//! End-to-end lifecycle tests: admission into the unconfirmed pool, sweeps,
//! block application, group approval and rollback, all against the
//! in-memory repository and a controllable clock.

use std::sync::Arc;

use cairn_crypto::{account_address, keypair_from_seed};
use cairn_ledger::{Admission, Block, Ledger, LedgerError};
use cairn_nullables::{NullClock, NullRepository};
use cairn_store::{
    AccountStore, AdminData, AssetData, AssetStore, BlockSummary, ChainStore, GroupData,
    GroupStore, MemberData, NameStore, Repository, TransactionStore,
};
use cairn_transactions::approval::GroupApprovalBody;
use cairn_transactions::asset::UpdateAssetBody;
use cairn_transactions::at::AtBody;
use cairn_transactions::messaging::{ChatBody, MessageBody};
use cairn_transactions::name::RegisterNameBody;
use cairn_transactions::payment::PaymentBody;
use cairn_transactions::{Transaction, TxBody, TxContext, TxHeader};
use cairn_types::{
    Address, Amount, ApprovalStatus, ApprovalThreshold, GroupId, KeyPair, LedgerParams,
    Signature, Timestamp, ValidationResult, BASE_ASSET, NO_GROUP,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const GENESIS_TIME: u64 = 1_000;
const NOW: u64 = 1_700_000_000_000;
const GROUP: GroupId = 7;

fn keypair(seed: u8) -> KeyPair {
    keypair_from_seed(&[seed; 32])
}

fn address(keys: &KeyPair) -> Address {
    account_address(&keys.public)
}

fn test_params() -> LedgerParams {
    let mut params = LedgerParams::default();
    params.pow.buffer_bytes = 1024;
    params.pow.chat_funded_difficulty = 4;
    params.pow.chat_unfunded_difficulty = 4;
    params
}

/// A ledger with a genesis block already at height 1.
fn ledger_with(params: LedgerParams) -> (Ledger<NullRepository>, Arc<NullClock>) {
    let repo = NullRepository::new();
    repo.push_block(&BlockSummary {
        height: 1,
        timestamp: Timestamp::from_millis(GENESIS_TIME),
        transaction_count: 0,
    })
    .unwrap();
    repo.save_changes().unwrap();
    let clock = Arc::new(NullClock::new(NOW));
    (Ledger::new(repo, params, clock.clone()), clock)
}

fn ledger() -> (Ledger<NullRepository>, Arc<NullClock>) {
    ledger_with(test_params())
}

fn header(keys: &KeyPair, timestamp: u64, reference: Option<Signature>) -> TxHeader {
    TxHeader {
        timestamp: Timestamp::from_millis(timestamp),
        tx_group_id: NO_GROUP,
        reference,
        creator: keys.public,
        fee: Amount::whole(1),
    }
}

fn payment(from: &KeyPair, to: &KeyPair, amount: i64, timestamp: u64) -> Transaction {
    let mut tx = Transaction::new(
        header(from, timestamp, None),
        TxBody::Payment(PaymentBody {
            recipient: address(to),
            amount: Amount::whole(amount),
        }),
    );
    tx.sign(&from.private).unwrap();
    tx
}

fn chat(from: &KeyPair, text: &str) -> Transaction {
    let mut h = header(from, NOW, None);
    h.fee = Amount::ZERO;
    Transaction::new(
        h,
        TxBody::Chat(ChatBody {
            nonce: 0,
            recipient: None,
            chat_reference: None,
            data: text.as_bytes().to_vec(),
            is_text: true,
            is_encrypted: false,
        }),
    )
}

fn balance(ledger: &Ledger<NullRepository>, who: &KeyPair) -> Amount {
    ledger
        .repository()
        .get_balance(&address(who), BASE_ASSET)
        .unwrap()
}

fn next_block(ledger: &Ledger<NullRepository>, transactions: Vec<Transaction>) -> Block {
    let repo = ledger.repository();
    let tip = repo.last_block().unwrap().unwrap();
    Block {
        height: tip.height + 1,
        timestamp: Timestamp::from_millis(NOW + 1_000 * u64::from(tip.height)),
        transactions,
    }
}

fn mint(ledger: &Ledger<NullRepository>) -> Block {
    let block = next_block(ledger, ledger.block_candidates().unwrap());
    ledger.apply_block(&block).unwrap();
    block
}

fn stored_status(ledger: &Ledger<NullRepository>, signature: &Signature) -> ApprovalStatus {
    ledger
        .repository()
        .get_transaction(signature)
        .unwrap()
        .unwrap()
        .approval_status
}

/// Group GROUP owned by `owner`, who is its only admin; `members` join it.
fn seed_group(ledger: &Ledger<NullRepository>, owner: &KeyPair, members: &[&KeyPair]) {
    let repo = ledger.repository();
    repo.save_group(&GroupData {
        group_id: GROUP,
        owner: address(owner),
        name: "builders".into(),
        reduced_name: "builders".into(),
        description: "approval test group".into(),
        created: Timestamp::from_millis(GENESIS_TIME),
        updated: None,
        is_open: false,
        approval_threshold: ApprovalThreshold::One,
        min_block_delay: 1,
        max_block_delay: 3,
        reference: Signature::ZERO,
        creation_group_id: NO_GROUP,
    })
    .unwrap();
    repo.save_admin(&AdminData {
        group_id: GROUP,
        admin: address(owner),
        reference: Signature::ZERO,
    })
    .unwrap();
    for keys in std::iter::once(owner).chain(members.iter().copied()) {
        repo.save_member(&MemberData {
            group_id: GROUP,
            member: address(keys),
            joined: Timestamp::from_millis(GENESIS_TIME),
            reference: Signature::ZERO,
        })
        .unwrap();
    }
    repo.save_changes().unwrap();
}

// ---------------------------------------------------------------------------
// 1. Admission
// ---------------------------------------------------------------------------

#[test]
fn payment_is_admitted_as_unconfirmed() {
    let (ledger, _clock) = ledger();
    let (alice, bob) = (keypair(1), keypair(2));
    ledger
        .repository()
        .seed_balance(&address(&alice), BASE_ASSET, Amount::whole(100));

    let tx = payment(&alice, &bob, 40, NOW);
    assert_eq!(ledger.import_as_unconfirmed(tx.clone()).unwrap(), Admission::Accepted);

    let repo = ledger.repository();
    assert!(repo.is_unconfirmed(&tx.signature).unwrap());
    // admission moves nothing
    assert_eq!(balance(&ledger, &alice), Amount::whole(100));
    assert_eq!(ledger.sorted_unconfirmed().unwrap(), vec![tx]);
}

#[test]
fn duplicate_is_rejected() {
    let (ledger, _clock) = ledger();
    let (alice, bob) = (keypair(1), keypair(2));
    ledger
        .repository()
        .seed_balance(&address(&alice), BASE_ASSET, Amount::whole(100));

    let tx = payment(&alice, &bob, 1, NOW);
    assert!(ledger.import_as_unconfirmed(tx.clone()).unwrap().is_accepted());
    assert_eq!(
        ledger.import_as_unconfirmed(tx).unwrap(),
        Admission::Rejected(ValidationResult::TransactionAlreadyExists)
    );
}

#[test]
fn unsynchronised_clock_fails_closed() {
    let (ledger, clock) = ledger();
    let (alice, bob) = (keypair(1), keypair(2));
    ledger
        .repository()
        .seed_balance(&address(&alice), BASE_ASSET, Amount::whole(100));
    clock.set_synced(false);

    assert_eq!(
        ledger.import_as_unconfirmed(payment(&alice, &bob, 1, NOW)).unwrap(),
        Admission::Rejected(ValidationResult::ClockNotSynced)
    );
    assert!(ledger.sweep_unconfirmed().unwrap().is_empty());
}

#[test]
fn tampered_transaction_fails_signature() {
    let (ledger, _clock) = ledger();
    let (alice, bob) = (keypair(1), keypair(2));
    ledger
        .repository()
        .seed_balance(&address(&alice), BASE_ASSET, Amount::whole(100));

    let mut tx = payment(&alice, &bob, 1, NOW);
    tx.header.fee = Amount::whole(2);
    assert_eq!(ledger.import_as_unconfirmed(tx).unwrap(), Admission::InvalidSignature);
}

#[test]
fn timestamps_outside_the_window_are_rejected() {
    let (ledger, _clock) = ledger();
    let (alice, bob) = (keypair(1), keypair(2));
    ledger
        .repository()
        .seed_balance(&address(&alice), BASE_ASSET, Amount::whole(100));
    let params = test_params();

    let future = NOW + params.max_future_ms + 1;
    assert_eq!(
        ledger.import_as_unconfirmed(payment(&alice, &bob, 1, future)).unwrap(),
        Admission::Rejected(ValidationResult::TimestampTooNew)
    );

    let stale = NOW - params.transaction_expiry_ms;
    assert_eq!(
        ledger.import_as_unconfirmed(payment(&alice, &bob, 1, stale)).unwrap(),
        Admission::Rejected(ValidationResult::TimestampTooOld)
    );
}

#[test]
fn fee_below_unit_fee_is_rejected() {
    let (ledger, _clock) = ledger();
    let (alice, bob) = (keypair(1), keypair(2));
    ledger
        .repository()
        .seed_balance(&address(&alice), BASE_ASSET, Amount::whole(100));

    let mut tx = Transaction::new(
        TxHeader {
            fee: Amount::new(1),
            ..header(&alice, NOW, None)
        },
        TxBody::Payment(PaymentBody {
            recipient: address(&bob),
            amount: Amount::whole(1),
        }),
    );
    tx.sign(&alice.private).unwrap();
    assert_eq!(
        ledger.import_as_unconfirmed(tx).unwrap(),
        Admission::Rejected(ValidationResult::InsufficientFee)
    );
}

#[test]
fn unconfirmed_quota_per_creator() {
    let mut params = test_params();
    params.max_unconfirmed_per_account = 2;
    let (ledger, _clock) = ledger_with(params);
    let (alice, bob) = (keypair(1), keypair(2));
    ledger
        .repository()
        .seed_balance(&address(&alice), BASE_ASSET, Amount::whole(100));

    assert!(ledger.import_as_unconfirmed(payment(&alice, &bob, 1, NOW)).unwrap().is_accepted());
    assert!(ledger.import_as_unconfirmed(payment(&alice, &bob, 2, NOW)).unwrap().is_accepted());
    assert_eq!(
        ledger.import_as_unconfirmed(payment(&alice, &bob, 3, NOW)).unwrap(),
        Admission::Rejected(ValidationResult::TooManyUnconfirmed)
    );
    // someone else's quota is untouched
    ledger
        .repository()
        .seed_balance(&address(&bob), BASE_ASSET, Amount::whole(10));
    assert!(ledger.import_as_unconfirmed(payment(&bob, &alice, 1, NOW)).unwrap().is_accepted());
}

#[test]
fn chained_payment_waits_for_its_predecessor_to_confirm() {
    let (ledger, _clock) = ledger();
    let (alice, bob) = (keypair(1), keypair(2));
    ledger
        .repository()
        .seed_balance(&address(&alice), BASE_ASSET, Amount::whole(100));

    let first = payment(&alice, &bob, 1, NOW);
    assert!(ledger.import_as_unconfirmed(first.clone()).unwrap().is_accepted());

    let mut second = Transaction::new(
        header(&alice, NOW + 1, Some(first.signature)),
        TxBody::Payment(PaymentBody {
            recipient: address(&bob),
            amount: Amount::whole(1),
        }),
    );
    second.sign(&alice.private).unwrap();
    assert_eq!(
        ledger.import_as_unconfirmed(second.clone()).unwrap(),
        Admission::Rejected(ValidationResult::InvalidReference)
    );

    mint(&ledger);
    assert!(ledger.import_as_unconfirmed(second).unwrap().is_accepted());
}

// ---------------------------------------------------------------------------
// 2. Nonce-secured CHAT
// ---------------------------------------------------------------------------

#[test]
fn chat_with_valid_nonce_stays_in_the_pool() {
    let (ledger, _clock) = ledger();
    let params = test_params();
    let alice = keypair(1);

    let mut tx = chat(&alice, "hello");
    tx.compute_nonce(params.pow.buffer_bytes, params.pow.chat_unfunded_difficulty)
        .unwrap();
    tx.sign(&alice.private).unwrap();

    assert_eq!(ledger.import_as_unconfirmed(tx.clone()).unwrap(), Admission::Accepted);
    // the sender's public key is now known
    let account = ledger
        .repository()
        .get_account(&address(&alice))
        .unwrap()
        .unwrap();
    assert_eq!(account.public_key, Some(alice.public));

    // sweeps keep it even though it now reports INVALID_BUT_OK
    assert!(ledger.sweep_unconfirmed().unwrap().is_empty());
    assert!(ledger.repository().is_unconfirmed(&tx.signature).unwrap());
    assert!(ledger.block_candidates().unwrap().is_empty());

    let block = next_block(&ledger, vec![tx.clone()]);
    assert!(matches!(
        ledger.apply_block(&block),
        Err(LedgerError::InvalidBlock {
            result: ValidationResult::InvalidButOk,
            ..
        })
    ));
    assert_eq!(ledger.repository().chain_height().unwrap(), 1);
}

#[test]
fn chat_with_failing_nonce_is_rejected() {
    let (ledger, _clock) = ledger();
    let params = test_params();
    let alice = keypair(1);

    let mut tx = chat(&alice, "spam");
    let pow_bytes = tx.pow_bytes().unwrap();
    let failing = (0u32..)
        .find(|nonce| {
            !cairn_work::verify(
                &pow_bytes,
                params.pow.buffer_bytes,
                params.pow.chat_unfunded_difficulty,
                *nonce,
            )
        })
        .unwrap();
    if let TxBody::Chat(body) = &mut tx.body {
        body.nonce = failing;
    }
    tx.sign(&alice.private).unwrap();

    assert_eq!(
        ledger.import_as_unconfirmed(tx).unwrap(),
        Admission::Rejected(ValidationResult::IncorrectNonce)
    );
}

// ---------------------------------------------------------------------------
// 3. Sweeps
// ---------------------------------------------------------------------------

#[test]
fn sweep_evicts_expired_transactions() {
    let (ledger, clock) = ledger();
    let (alice, bob) = (keypair(1), keypair(2));
    ledger
        .repository()
        .seed_balance(&address(&alice), BASE_ASSET, Amount::whole(100));

    let tx = payment(&alice, &bob, 1, NOW);
    assert!(ledger.import_as_unconfirmed(tx.clone()).unwrap().is_accepted());
    assert!(ledger.sweep_unconfirmed().unwrap().is_empty());

    clock.advance(test_params().transaction_expiry_ms);
    let evicted = ledger.sweep_unconfirmed().unwrap();
    assert_eq!(evicted.len(), 1);
    assert_eq!(evicted[0].signature, tx.signature);
    assert_eq!(evicted[0].result, ValidationResult::TimestampTooOld);
    assert!(!ledger.repository().transaction_exists(&tx.signature).unwrap());
}

#[test]
fn sweep_evicts_transactions_the_balance_no_longer_covers() {
    let (ledger, _clock) = ledger();
    let (alice, bob, carol) = (keypair(1), keypair(2), keypair(3));
    ledger
        .repository()
        .seed_balance(&address(&alice), BASE_ASSET, Amount::whole(50));

    let to_bob = payment(&alice, &bob, 45, NOW);
    let to_carol = payment(&alice, &carol, 45, NOW + 1);
    assert!(ledger.import_as_unconfirmed(to_bob.clone()).unwrap().is_accepted());
    assert!(ledger.import_as_unconfirmed(to_carol.clone()).unwrap().is_accepted());

    // only the earlier one makes it into the block
    let block = next_block(&ledger, vec![to_bob.clone()]);
    ledger.apply_block(&block).unwrap();

    let evicted = ledger.sweep_unconfirmed().unwrap();
    assert_eq!(evicted.len(), 1);
    assert_eq!(evicted[0].signature, to_carol.signature);
}

// ---------------------------------------------------------------------------
// 4. Blocks
// ---------------------------------------------------------------------------

#[test]
fn block_apply_and_orphan_round_trip() {
    let (ledger, _clock) = ledger();
    let (alice, bob) = (keypair(1), keypair(2));
    ledger
        .repository()
        .seed_balance(&address(&alice), BASE_ASSET, Amount::whole(100));

    let tx = payment(&alice, &bob, 40, NOW);
    assert!(ledger.import_as_unconfirmed(tx.clone()).unwrap().is_accepted());

    let block = mint(&ledger);
    assert_eq!(block.height, 2);
    assert_eq!(block.transactions, vec![tx.clone()]);

    let repo = ledger.repository();
    assert_eq!(balance(&ledger, &alice), Amount::whole(59));
    assert_eq!(balance(&ledger, &bob), Amount::whole(40));
    assert!(!repo.is_unconfirmed(&tx.signature).unwrap());
    let stored = repo.get_transaction(&tx.signature).unwrap().unwrap();
    assert_eq!(stored.block_height, Some(2));
    assert_eq!(stored.block_sequence, Some(0));

    let orphaned = ledger.orphan_block().unwrap();
    assert_eq!(orphaned.height, 2);
    assert_eq!(repo.chain_height().unwrap(), 1);
    assert_eq!(balance(&ledger, &alice), Amount::whole(100));
    assert_eq!(balance(&ledger, &bob), Amount::ZERO);
    assert_eq!(repo.get_last_reference(&address(&alice)).unwrap(), None);
    assert!(repo.is_unconfirmed(&tx.signature).unwrap());
    assert!(!repo.get_transaction(&tx.signature).unwrap().unwrap().is_confirmed());
}

#[test]
fn orphaning_an_unchained_message_restores_the_real_last_reference() {
    let mut params = test_params();
    params.pow.message_difficulty = 4;
    let (ledger, _clock) = ledger_with(params.clone());
    let (alice, bob) = (keypair(1), keypair(2));
    let repo = ledger.repository();
    repo.seed_balance(&address(&alice), BASE_ASSET, Amount::whole(100));

    let paid = payment(&alice, &bob, 10, NOW);
    ledger.apply_block(&next_block(&ledger, vec![paid.clone()])).unwrap();
    assert_eq!(
        repo.get_last_reference(&address(&alice)).unwrap(),
        Some(paid.signature)
    );

    // zero fee, so the stale reference is never held against the chain
    let mut h = header(&alice, NOW + 1, Some(Signature([8; 64])));
    h.fee = Amount::ZERO;
    let mut message = Transaction::new(
        h,
        TxBody::Message(MessageBody {
            nonce: 0,
            recipient: None,
            asset_id: BASE_ASSET,
            amount: Amount::ZERO,
            data: b"no fee, no chain".to_vec(),
            is_text: true,
            is_encrypted: false,
        }),
    );
    message
        .compute_nonce(params.pow.buffer_bytes, params.pow.message_difficulty)
        .unwrap();
    message.sign(&alice.private).unwrap();
    let before = repo.snapshot();

    ledger.apply_block(&next_block(&ledger, vec![message.clone()])).unwrap();
    assert_eq!(
        repo.get_last_reference(&address(&alice)).unwrap(),
        Some(message.signature)
    );

    ledger.orphan_block().unwrap();
    assert_eq!(
        repo.get_last_reference(&address(&alice)).unwrap(),
        Some(paid.signature)
    );
    assert_eq!(repo.snapshot(), before);
}

#[test]
fn failing_block_leaves_no_trace() {
    let (ledger, _clock) = ledger();
    let (alice, bob) = (keypair(1), keypair(2));
    ledger
        .repository()
        .seed_balance(&address(&alice), BASE_ASSET, Amount::whole(50));
    let before = ledger.repository().snapshot();

    // each is fine alone; together they overspend
    let first = payment(&alice, &bob, 45, NOW);
    let second = payment(&alice, &bob, 46, NOW + 1);
    let block = next_block(&ledger, vec![first, second.clone()]);

    match ledger.apply_block(&block) {
        Err(LedgerError::InvalidBlock { signature, .. }) => assert_eq!(signature, second.signature),
        other => panic!("expected an invalid block, got {other:?}"),
    }
    assert_eq!(ledger.repository().snapshot(), before);
}

#[test]
fn block_must_follow_the_tip() {
    let (ledger, _clock) = ledger();
    let block = Block {
        height: 5,
        timestamp: Timestamp::from_millis(NOW),
        transactions: Vec::new(),
    };
    assert!(matches!(
        ledger.apply_block(&block),
        Err(LedgerError::HeightMismatch {
            expected: 2,
            found: 5
        })
    ));
}

#[test]
fn orphaning_an_empty_chain_fails() {
    let ledger = Ledger::new(
        NullRepository::new(),
        test_params(),
        Arc::new(NullClock::new(NOW)),
    );
    assert!(matches!(ledger.orphan_block(), Err(LedgerError::EmptyChain)));
}

#[test]
fn at_transactions_cannot_be_submitted() {
    let (ledger, _clock) = ledger();
    let (alice, bob) = (keypair(1), keypair(2));
    let mut tx = payment(&alice, &bob, 1, NOW);
    tx.body = TxBody::At(AtBody {
        at_address: address(&alice),
        recipient: address(&bob),
        amount: Some(Amount::whole(1)),
        asset_id: Some(BASE_ASSET),
        message: None,
    });
    assert_eq!(
        ledger.import_as_unconfirmed(tx).unwrap(),
        Admission::Rejected(ValidationResult::InvalidAtTransaction)
    );
}

// ---------------------------------------------------------------------------
// 5. Group approval
// ---------------------------------------------------------------------------

fn register_in_group(keys: &KeyPair, name: &str) -> Transaction {
    let mut tx = Transaction::new(
        TxHeader {
            tx_group_id: GROUP,
            ..header(keys, NOW, None)
        },
        TxBody::RegisterName(RegisterNameBody {
            name: name.into(),
            data: "{}".into(),
        }),
    );
    tx.sign(&keys.private).unwrap();
    tx
}

fn approve(admin: &KeyPair, pending: &Signature, approval: bool, timestamp: u64) -> Transaction {
    approve_after(admin, None, pending, approval, timestamp)
}

fn approve_after(
    admin: &KeyPair,
    reference: Option<Signature>,
    pending: &Signature,
    approval: bool,
    timestamp: u64,
) -> Transaction {
    let mut tx = Transaction::new(
        header(admin, timestamp, reference),
        TxBody::GroupApproval(GroupApprovalBody {
            pending_signature: *pending,
            approval,
        }),
    );
    tx.sign(&admin.private).unwrap();
    tx
}

#[test]
fn admin_submissions_need_no_approval() {
    let (ledger, _clock) = ledger();
    let (alice, bob) = (keypair(1), keypair(2));
    seed_group(&ledger, &alice, &[&bob]);
    ledger
        .repository()
        .seed_balance(&address(&alice), BASE_ASSET, Amount::whole(10));

    let tx = register_in_group(&alice, "alice");
    assert!(ledger.import_as_unconfirmed(tx.clone()).unwrap().is_accepted());
    assert_eq!(stored_status(&ledger, &tx.signature), ApprovalStatus::NotRequired);

    mint(&ledger);
    assert!(ledger.repository().get_name("alice").unwrap().is_some());
}

#[test]
fn approved_transaction_takes_effect_and_rolls_back() {
    let (ledger, _clock) = ledger();
    let (alice, bob) = (keypair(1), keypair(2));
    seed_group(&ledger, &alice, &[&bob]);
    let repo = ledger.repository();
    repo.seed_balance(&address(&alice), BASE_ASSET, Amount::whole(10));
    repo.seed_balance(&address(&bob), BASE_ASSET, Amount::whole(10));

    let pending = register_in_group(&bob, "bob");
    assert!(ledger.import_as_unconfirmed(pending.clone()).unwrap().is_accepted());
    assert_eq!(stored_status(&ledger, &pending.signature), ApprovalStatus::Pending);

    // confirmed at height 2 with its fee taken but its effect deferred
    mint(&ledger);
    assert_eq!(balance(&ledger, &bob), Amount::whole(9));
    assert!(repo.get_name("bob").unwrap().is_none());
    assert_eq!(stored_status(&ledger, &pending.signature), ApprovalStatus::Pending);

    let decision = approve(&alice, &pending.signature, true, NOW + 10);
    assert!(ledger.import_as_unconfirmed(decision.clone()).unwrap().is_accepted());
    mint(&ledger);

    assert_eq!(stored_status(&ledger, &pending.signature), ApprovalStatus::Approved);
    let name = repo.get_name("bob").unwrap().unwrap();
    assert_eq!(name.owner, address(&bob));
    assert_eq!(name.creation_group_id, GROUP);

    ledger.orphan_block().unwrap();
    assert_eq!(stored_status(&ledger, &pending.signature), ApprovalStatus::Pending);
    assert!(repo.get_name("bob").unwrap().is_none());
    assert!(repo.latest_approvals(&pending.signature).unwrap().is_empty());
    assert!(repo.is_unconfirmed(&decision.signature).unwrap());
}

#[test]
fn approvals_decided_together_roll_back_in_reverse() {
    let (ledger, _clock) = ledger();
    let (alice, bob) = (keypair(1), keypair(2));
    seed_group(&ledger, &alice, &[&bob]);
    let repo = ledger.repository();
    repo.seed_balance(&address(&alice), BASE_ASSET, Amount::whole(10));
    repo.seed_balance(&address(&bob), BASE_ASSET, Amount::whole(10));
    repo.save_asset(&AssetData {
        asset_id: 1,
        owner: address(&bob),
        name: "gold".into(),
        reduced_name: "gold".into(),
        description: "original".into(),
        quantity: Amount::whole(1_000),
        is_divisible: true,
        data: String::new(),
        is_unspendable: false,
        creation_group_id: GROUP,
        reference: Signature::ZERO,
    })
    .unwrap();
    repo.save_changes().unwrap();

    let update = |timestamp, reference, description: &str| {
        let mut tx = Transaction::new(
            TxHeader {
                tx_group_id: GROUP,
                ..header(&bob, timestamp, reference)
            },
            TxBody::UpdateAsset(UpdateAssetBody {
                asset_id: 1,
                new_owner: address(&bob),
                new_description: description.into(),
                new_data: String::new(),
            }),
        );
        tx.sign(&bob.private).unwrap();
        tx
    };
    let first = update(NOW, None, "first");
    let second = update(NOW + 1, Some(first.signature), "second");
    ledger
        .apply_block(&next_block(&ledger, vec![first.clone(), second.clone()]))
        .unwrap();
    for pending in [&first, &second] {
        assert_eq!(stored_status(&ledger, &pending.signature), ApprovalStatus::Pending);
    }

    let approve_first = approve_after(&alice, None, &first.signature, true, NOW + 10);
    let approve_second = approve_after(
        &alice,
        Some(approve_first.signature),
        &second.signature,
        true,
        NOW + 11,
    );
    ledger
        .apply_block(&next_block(&ledger, vec![approve_first, approve_second]))
        .unwrap();
    for pending in [&first, &second] {
        assert_eq!(stored_status(&ledger, &pending.signature), ApprovalStatus::Approved);
    }
    // applied in chain order, so the later update wins
    assert_eq!(repo.get_asset(1).unwrap().unwrap().description, "second");

    ledger.orphan_block().unwrap();
    assert_eq!(repo.get_asset(1).unwrap().unwrap().description, "original");
    for pending in [&first, &second] {
        assert_eq!(stored_status(&ledger, &pending.signature), ApprovalStatus::Pending);
    }
}

#[test]
fn rejection_leaves_the_transaction_without_effect() {
    let (ledger, _clock) = ledger();
    let (alice, bob) = (keypair(1), keypair(2));
    seed_group(&ledger, &alice, &[&bob]);
    let repo = ledger.repository();
    repo.seed_balance(&address(&alice), BASE_ASSET, Amount::whole(10));
    repo.seed_balance(&address(&bob), BASE_ASSET, Amount::whole(10));

    let pending = register_in_group(&bob, "bob");
    assert!(ledger.import_as_unconfirmed(pending.clone()).unwrap().is_accepted());
    mint(&ledger);

    let decision = approve(&alice, &pending.signature, false, NOW + 10);
    assert!(ledger.import_as_unconfirmed(decision).unwrap().is_accepted());
    mint(&ledger);

    assert_eq!(stored_status(&ledger, &pending.signature), ApprovalStatus::Rejected);
    assert!(repo.get_name("bob").unwrap().is_none());
    // the fee is not refunded
    assert_eq!(balance(&ledger, &bob), Amount::whole(9));
}

#[test]
fn undecided_transaction_expires_after_max_delay() {
    let (ledger, _clock) = ledger();
    let (alice, bob) = (keypair(1), keypair(2));
    seed_group(&ledger, &alice, &[&bob]);
    ledger
        .repository()
        .seed_balance(&address(&bob), BASE_ASSET, Amount::whole(10));

    let pending = register_in_group(&bob, "bob");
    assert!(ledger.import_as_unconfirmed(pending.clone()).unwrap().is_accepted());
    mint(&ledger); // height 2

    // max delay 3: still pending through height 5
    for _ in 0..3 {
        mint(&ledger);
        assert_eq!(stored_status(&ledger, &pending.signature), ApprovalStatus::Pending);
    }
    mint(&ledger); // height 6
    assert_eq!(stored_status(&ledger, &pending.signature), ApprovalStatus::Expired);

    // a late decision is refused
    ledger
        .repository()
        .seed_balance(&address(&alice), BASE_ASSET, Amount::whole(10));
    assert_eq!(
        ledger
            .import_as_unconfirmed(approve(&alice, &pending.signature, true, NOW + 10))
            .unwrap(),
        Admission::Rejected(ValidationResult::GroupApprovalDecided)
    );
}

#[test]
fn outsiders_cannot_use_the_group() {
    let (ledger, _clock) = ledger();
    let (alice, carol) = (keypair(1), keypair(3));
    seed_group(&ledger, &alice, &[]);
    ledger
        .repository()
        .seed_balance(&address(&carol), BASE_ASSET, Amount::whole(10));

    assert_eq!(
        ledger
            .import_as_unconfirmed(register_in_group(&carol, "carol"))
            .unwrap(),
        Admission::Rejected(ValidationResult::InvalidTxGroupId)
    );
}

#[test]
fn block_context_reports_its_height() {
    let repo = NullRepository::new();
    let params = test_params();
    let ctx = TxContext::block(&repo, &params, Timestamp::from_millis(NOW), 1);
    assert!(ctx.is_genesis_block());
}
