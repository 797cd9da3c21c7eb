//! Nullable infrastructure for deterministic testing.
//!
//! External dependencies of the ledger engine (clock, repository) are
//! abstracted behind traits. This crate provides test-friendly implementations
//! that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod store;

pub use clock::NullClock;
pub use store::{LedgerSnapshot, NullRepository};
