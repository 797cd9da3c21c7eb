//! The Cairn node: the ledger plus its event bus, metrics and background
//! sweep, behind a submission boundary that network callers can abandon.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use cairn_ledger::{Admission, Block, Eviction, Ledger};
use cairn_store::{BlockSummary, Repository};
use cairn_transactions::Transaction;
use cairn_types::NetworkClock;

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::ledger_event::{EventBus, LedgerEvent};
use crate::metrics::NodeMetrics;

pub struct CairnNode<R> {
    ledger: Ledger<R>,
    events: EventBus,
    metrics: NodeMetrics,
    config: NodeConfig,
}

impl<R: Repository> CairnNode<R> {
    pub fn new(repo: R, config: NodeConfig, clock: Arc<dyn NetworkClock>) -> Self {
        let ledger = Ledger::new(repo, config.ledger.clone(), clock);
        Self {
            ledger,
            events: EventBus::new(),
            metrics: NodeMetrics::new(),
            config,
        }
    }

    pub fn ledger(&self) -> &Ledger<R> {
        &self.ledger
    }

    pub fn metrics(&self) -> &NodeMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Register a listener. Listeners must be in place before the node is
    /// shared.
    pub fn subscribe(&mut self, listener: Box<dyn Fn(&LedgerEvent) + Send + Sync>) {
        self.events.subscribe(listener);
    }

    /// Offer a transaction for the unconfirmed pool. Blocks while another
    /// ledger operation holds the lock.
    pub fn submit(&self, tx: Transaction) -> Result<Admission, NodeError> {
        self.metrics.submissions_received.inc();
        let signature = tx.signature;
        let tx_type = tx.tx_type();
        let fee = tx.header.fee;

        let admission = self.ledger.import_as_unconfirmed(tx)?;
        match &admission {
            Admission::Accepted => {
                self.metrics.admissions_accepted.inc();
                self.refresh_pool_size()?;
                self.events.emit(&LedgerEvent::TransactionAccepted {
                    signature,
                    tx_type,
                    fee,
                });
            }
            Admission::InvalidSignature => {
                self.metrics
                    .admissions_rejected
                    .with_label_values(&["INVALID_SIGNATURE"])
                    .inc();
            }
            Admission::Rejected(result) => {
                self.metrics
                    .admissions_rejected
                    .with_label_values(&[result.name()])
                    .inc();
            }
        }
        Ok(admission)
    }

    pub fn sweep_unconfirmed(&self) -> Result<Vec<Eviction>, NodeError> {
        let evictions = self.ledger.sweep_unconfirmed()?;
        self.metrics.pool_evictions.inc_by(evictions.len() as u64);
        self.refresh_pool_size()?;
        for eviction in &evictions {
            self.events.emit(&LedgerEvent::TransactionEvicted {
                signature: eviction.signature,
                result: eviction.result,
            });
        }
        Ok(evictions)
    }

    pub fn sorted_unconfirmed(&self) -> Result<Vec<Transaction>, NodeError> {
        Ok(self.ledger.sorted_unconfirmed()?)
    }

    pub fn block_candidates(&self) -> Result<Vec<Transaction>, NodeError> {
        Ok(self.ledger.block_candidates()?)
    }

    /// Apply a block. An error here means this node disagrees with the block
    /// and must not continue on this chain without operator attention.
    pub fn apply_block(&self, block: &Block) -> Result<(), NodeError> {
        let started = Instant::now();
        if let Err(e) = self.ledger.apply_block(block) {
            tracing::warn!(height = block.height, error = %e, "block rejected");
            return Err(e.into());
        }
        self.metrics
            .block_apply_time_ms
            .observe(started.elapsed().as_secs_f64() * 1_000.0);
        self.metrics.blocks_applied.inc();
        self.refresh_pool_size()?;
        self.events.emit(&LedgerEvent::BlockApplied {
            height: block.height,
            count: block.transactions.len(),
        });
        Ok(())
    }

    pub fn orphan_block(&self) -> Result<BlockSummary, NodeError> {
        let orphaned = self.ledger.orphan_block()?;
        self.metrics.blocks_orphaned.inc();
        self.refresh_pool_size()?;
        self.events.emit(&LedgerEvent::BlockOrphaned {
            height: orphaned.height,
        });
        Ok(orphaned)
    }

    fn refresh_pool_size(&self) -> Result<(), NodeError> {
        let size = self.ledger.repository().unconfirmed_transactions()?.len();
        self.metrics.unconfirmed_pool_size.set(size as i64);
        Ok(())
    }
}

impl<R: Repository + 'static> CairnNode<R> {
    /// [`CairnNode::submit`] on the blocking pool, abandoned after `timeout`.
    ///
    /// Abandoning only stops the wait: the engine has no cancellation, so a
    /// submission that already reached the lock still runs to completion.
    pub async fn submit_with_timeout(
        self: &Arc<Self>,
        tx: Transaction,
        timeout: Duration,
    ) -> Result<Admission, NodeError> {
        let node = Arc::clone(self);
        let task = tokio::task::spawn_blocking(move || node.submit(tx));
        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(NodeError::Other(format!("submission task failed: {join}"))),
            Err(_) => Err(NodeError::Timeout(timeout.as_millis() as u64)),
        }
    }

    /// Sweep the unconfirmed pool every `interval` until `shutdown` fires.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let node = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.recv() => {
                        tracing::info!("unconfirmed sweep task shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        let node = Arc::clone(&node);
                        match tokio::task::spawn_blocking(move || node.sweep_unconfirmed()).await {
                            Ok(Ok(evicted)) if !evicted.is_empty() => {
                                tracing::info!(count = evicted.len(), "unconfirmed sweep evicted transactions");
                            }
                            Ok(Ok(_)) => {}
                            Ok(Err(e)) => tracing::error!(error = %e, "unconfirmed sweep failed"),
                            Err(e) => tracing::error!(error = %e, "unconfirmed sweep task panicked"),
                        }
                    }
                }
            }
        })
    }
}
