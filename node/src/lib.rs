//! Cairn node: wraps the lifecycle engine for a running process.
//!
//! - TOML configuration, including the consensus `[ledger]` parameters
//! - Structured logging and Prometheus metrics
//! - An event bus fed after every committed ledger change
//! - A cancellable async submission boundary and the periodic pool sweep

pub mod clock;
pub mod config;
pub mod error;
pub mod ledger_event;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod shutdown;

pub use clock::SyncedClock;
pub use config::NodeConfig;
pub use error::NodeError;
pub use ledger_event::{EventBus, LedgerEvent};
pub use logging::{init_logging, LogFormat};
pub use metrics::NodeMetrics;
pub use node::CairnNode;
pub use shutdown::ShutdownController;
