//! Prometheus metrics for the Cairn node.
//!
//! Counters and gauges covering admission, the unconfirmed pool and block
//! application. [`NodeMetrics`] owns a dedicated [`Registry`] which
//! [`NodeMetrics::render`] encodes in the Prometheus text exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, Histogram,
    HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

use crate::NodeError;

/// Central collection of all node-level Prometheus metrics.
pub struct NodeMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Transactions handed to `submit`, whatever the outcome.
    pub submissions_received: IntCounter,
    pub admissions_accepted: IntCounter,
    /// Rejections, labelled by validation-result name.
    pub admissions_rejected: IntCounterVec,
    pub pool_evictions: IntCounter,
    pub blocks_applied: IntCounter,
    pub blocks_orphaned: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Current number of unconfirmed transactions.
    pub unconfirmed_pool_size: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Time spent applying a block under the lock, in milliseconds.
    pub block_apply_time_ms: Histogram,
}

impl NodeMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        // Counters
        let submissions_received = register_int_counter_with_registry!(
            Opts::new(
                "cairn_submissions_received_total",
                "Total transactions submitted for admission"
            ),
            registry
        )
        .expect("failed to register submissions_received counter");

        let admissions_accepted = register_int_counter_with_registry!(
            Opts::new(
                "cairn_admissions_accepted_total",
                "Total transactions admitted to the unconfirmed pool"
            ),
            registry
        )
        .expect("failed to register admissions_accepted counter");

        let admissions_rejected = register_int_counter_vec_with_registry!(
            Opts::new(
                "cairn_admissions_rejected_total",
                "Total transactions refused admission, by validation result"
            ),
            &["result"],
            registry
        )
        .expect("failed to register admissions_rejected counter");

        let pool_evictions = register_int_counter_with_registry!(
            Opts::new(
                "cairn_pool_evictions_total",
                "Total unconfirmed transactions evicted by sweeps"
            ),
            registry
        )
        .expect("failed to register pool_evictions counter");

        let blocks_applied = register_int_counter_with_registry!(
            Opts::new("cairn_blocks_applied_total", "Total blocks applied"),
            registry
        )
        .expect("failed to register blocks_applied counter");

        let blocks_orphaned = register_int_counter_with_registry!(
            Opts::new("cairn_blocks_orphaned_total", "Total blocks orphaned"),
            registry
        )
        .expect("failed to register blocks_orphaned counter");

        // Gauges
        let unconfirmed_pool_size = register_int_gauge_with_registry!(
            Opts::new(
                "cairn_unconfirmed_pool_size",
                "Current number of unconfirmed transactions"
            ),
            registry
        )
        .expect("failed to register unconfirmed_pool_size gauge");

        // Histograms: exponential buckets covering 0.1 ms to ~1.6 s.
        let block_apply_time_ms = register_histogram_with_registry!(
            HistogramOpts::new(
                "cairn_block_apply_time_ms",
                "Block application time in milliseconds"
            )
            .buckets(
                prometheus::exponential_buckets(0.1, 2.0, 15)
                    .expect("valid exponential bucket parameters")
            ),
            registry
        )
        .expect("failed to register block_apply_time_ms histogram");

        Self {
            registry,
            submissions_received,
            admissions_accepted,
            admissions_rejected,
            pool_evictions,
            blocks_applied,
            blocks_orphaned,
            unconfirmed_pool_size,
            block_apply_time_ms,
        }
    }

    /// Encode every registered metric in the Prometheus text format.
    pub fn render(&self) -> Result<String, NodeError> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| NodeError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| NodeError::Metrics(e.to_string()))
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}
