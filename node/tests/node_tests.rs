//! Node-level tests: events, metrics, the async submission boundary and the
//! background sweeper, wired to the in-memory repository.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cairn_crypto::{account_address, keypair_from_seed};
use cairn_ledger::{Admission, Block};
use cairn_node::{CairnNode, LedgerEvent, NodeConfig, NodeError, ShutdownController};
use cairn_nullables::{NullClock, NullRepository};
use cairn_store::{BlockSummary, ChainStore, Repository};
use cairn_transactions::messaging::ChatBody;
use cairn_transactions::payment::PaymentBody;
use cairn_transactions::{Transaction, TxBody, TxHeader};
use cairn_types::{
    Amount, KeyPair, Signature, Timestamp, TransactionType, ValidationResult, BASE_ASSET,
    NO_GROUP,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const NOW: u64 = 1_700_000_000_000;

fn keypair(seed: u8) -> KeyPair {
    keypair_from_seed(&[seed; 32])
}

fn node_with(config: NodeConfig) -> (CairnNode<NullRepository>, Arc<NullClock>) {
    let repo = NullRepository::new();
    repo.push_block(&BlockSummary {
        height: 1,
        timestamp: Timestamp::from_millis(1_000),
        transaction_count: 0,
    })
    .unwrap();
    repo.save_changes().unwrap();
    repo.seed_balance(
        &account_address(&keypair(1).public),
        BASE_ASSET,
        Amount::whole(100),
    );
    let clock = Arc::new(NullClock::new(NOW));
    (CairnNode::new(repo, config, clock.clone()), clock)
}

fn node() -> (CairnNode<NullRepository>, Arc<NullClock>) {
    node_with(NodeConfig::default())
}

fn payment(amount: i64) -> Transaction {
    let (alice, bob) = (keypair(1), keypair(2));
    let mut tx = Transaction::new(
        TxHeader {
            timestamp: Timestamp::from_millis(NOW),
            tx_group_id: NO_GROUP,
            reference: None,
            creator: alice.public,
            fee: Amount::whole(1),
        },
        TxBody::Payment(PaymentBody {
            recipient: account_address(&bob.public),
            amount: Amount::whole(amount),
        }),
    );
    tx.sign(&alice.private).unwrap();
    tx
}

fn recorded_events(node: &mut CairnNode<NullRepository>) -> Arc<Mutex<Vec<LedgerEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    node.subscribe(Box::new(move |event| {
        sink.lock().unwrap().push(event.clone());
    }));
    events
}

// ---------------------------------------------------------------------------
// 1. Submission
// ---------------------------------------------------------------------------

#[test]
fn accepted_submission_is_announced_and_counted() {
    let (mut node, _clock) = node();
    let events = recorded_events(&mut node);

    let tx = payment(40);
    assert_eq!(node.submit(tx.clone()).unwrap(), Admission::Accepted);

    assert_eq!(
        events.lock().unwrap().as_slice(),
        &[LedgerEvent::TransactionAccepted {
            signature: tx.signature,
            tx_type: TransactionType::Payment,
            fee: Amount::whole(1),
        }]
    );
    let metrics = node.metrics();
    assert_eq!(metrics.submissions_received.get(), 1);
    assert_eq!(metrics.admissions_accepted.get(), 1);
    assert_eq!(metrics.unconfirmed_pool_size.get(), 1);
}

#[test]
fn rejected_submission_is_silent_but_counted() {
    let (mut node, _clock) = node();
    let events = recorded_events(&mut node);

    let tx = payment(40);
    node.submit(tx.clone()).unwrap();
    assert_eq!(
        node.submit(tx).unwrap(),
        Admission::Rejected(ValidationResult::TransactionAlreadyExists)
    );

    assert_eq!(events.lock().unwrap().len(), 1);
    let metrics = node.metrics();
    assert_eq!(metrics.submissions_received.get(), 2);
    assert_eq!(
        metrics
            .admissions_rejected
            .with_label_values(&["TRANSACTION_ALREADY_EXISTS"])
            .get(),
        1
    );
}

#[test]
fn bad_signature_has_its_own_label() {
    let (node, _clock) = node();
    let mut tx = payment(1);
    tx.signature = Signature([9; 64]);
    assert_eq!(node.submit(tx).unwrap(), Admission::InvalidSignature);
    assert_eq!(
        node.metrics()
            .admissions_rejected
            .with_label_values(&["INVALID_SIGNATURE"])
            .get(),
        1
    );
}

// ---------------------------------------------------------------------------
// 2. Blocks and sweeps
// ---------------------------------------------------------------------------

#[test]
fn blocks_are_announced_after_commit() {
    let (mut node, _clock) = node();
    let events = recorded_events(&mut node);
    node.submit(payment(40)).unwrap();

    let block = Block {
        height: 2,
        timestamp: Timestamp::from_millis(NOW + 1_000),
        transactions: node.block_candidates().unwrap(),
    };
    node.apply_block(&block).unwrap();
    assert_eq!(node.metrics().unconfirmed_pool_size.get(), 0);

    let orphaned = node.orphan_block().unwrap();
    assert_eq!(orphaned.height, 2);
    assert_eq!(node.metrics().unconfirmed_pool_size.get(), 1);
    assert_eq!(node.ledger().repository().chain_height().unwrap(), 1);

    let events = events.lock().unwrap();
    assert!(matches!(events[1], LedgerEvent::BlockApplied { height: 2, count: 1 }));
    assert!(matches!(events[2], LedgerEvent::BlockOrphaned { height: 2 }));
    assert_eq!(node.metrics().blocks_applied.get(), 1);
    assert_eq!(node.metrics().blocks_orphaned.get(), 1);
}

#[test]
fn rejected_block_emits_nothing() {
    let (mut node, _clock) = node();
    let events = recorded_events(&mut node);
    let block = Block {
        height: 9,
        timestamp: Timestamp::from_millis(NOW),
        transactions: Vec::new(),
    };
    assert!(matches!(node.apply_block(&block), Err(NodeError::Ledger(_))));
    assert!(events.lock().unwrap().is_empty());
    assert_eq!(node.metrics().blocks_applied.get(), 0);
}

#[test]
fn sweep_evictions_are_announced() {
    let (mut node, clock) = node();
    let events = recorded_events(&mut node);
    let tx = payment(40);
    node.submit(tx.clone()).unwrap();

    clock.advance(node.config().ledger.transaction_expiry_ms);
    assert_eq!(node.sweep_unconfirmed().unwrap().len(), 1);

    assert_eq!(
        events.lock().unwrap().last(),
        Some(&LedgerEvent::TransactionEvicted {
            signature: tx.signature,
            result: ValidationResult::TimestampTooOld,
        })
    );
    assert_eq!(node.metrics().pool_evictions.get(), 1);
    assert_eq!(node.metrics().unconfirmed_pool_size.get(), 0);
}

// ---------------------------------------------------------------------------
// 3. Async boundary
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submit_with_timeout_returns_the_admission() {
    let (node, _clock) = node();
    let node = Arc::new(node);
    let admission = node
        .submit_with_timeout(payment(1), Duration::from_secs(30))
        .await
        .unwrap();
    assert_eq!(admission, Admission::Accepted);
}

#[tokio::test]
async fn slow_admission_times_out() {
    // a large work buffer makes the nonce check take far longer than the deadline
    let mut config = NodeConfig::default();
    config.ledger.pow.buffer_bytes = 64 * 1024 * 1024;
    let (node, _clock) = node_with(config);
    let node = Arc::new(node);

    let alice = keypair(1);
    let mut chat = Transaction::new(
        TxHeader {
            timestamp: Timestamp::from_millis(NOW),
            tx_group_id: NO_GROUP,
            reference: None,
            creator: alice.public,
            fee: Amount::ZERO,
        },
        TxBody::Chat(ChatBody {
            nonce: 0,
            recipient: None,
            chat_reference: None,
            data: b"hello".to_vec(),
            is_text: true,
            is_encrypted: false,
        }),
    );
    chat.sign(&alice.private).unwrap();

    let result = node
        .submit_with_timeout(chat, Duration::from_millis(1))
        .await;
    assert!(matches!(result, Err(NodeError::Timeout(1))));
}

#[tokio::test]
async fn sweeper_stops_on_shutdown() {
    let (node, _clock) = node();
    let node = Arc::new(node);
    let shutdown = ShutdownController::new();

    let handle = node.spawn_sweeper(Duration::from_millis(5), shutdown.subscribe());
    tokio::time::sleep(Duration::from_millis(20)).await;
    shutdown.trigger();

    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("sweeper should stop")
        .unwrap();
}

// ---------------------------------------------------------------------------
// 4. Configuration file
// ---------------------------------------------------------------------------

#[test]
fn config_loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "submit_timeout_ms = 250\nenable_metrics = true\n\n[ledger]\nmax_future_ms = 60000"
    )
    .unwrap();

    let config = NodeConfig::from_toml_file(file.path()).unwrap();
    assert_eq!(config.submit_timeout(), Duration::from_millis(250));
    assert!(config.enable_metrics);
    assert_eq!(config.ledger.max_future_ms, 60_000);

    let (node, _clock) = node_with(config);
    assert_eq!(node.ledger().params().max_future_ms, 60_000);
}
