//! Transaction lifecycle engine.
//!
//! Admission of signed transactions into the unconfirmed pool, periodic
//! re-validation of that pool, deterministic block ordering, the
//! group-approval workflow, and atomic block application and rollback.
//!
//! All state lives behind [`cairn_store::Repository`]; all mutation happens
//! under the ledger's blockchain lock.

pub mod approval;
pub mod engine;
pub mod error;
pub mod policy;
pub mod pool;

pub use engine::{Admission, Block, Ledger};
pub use error::LedgerError;
pub use pool::{block_order, is_pool_only, sort_for_block, Eviction};
