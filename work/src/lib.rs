//! Memory-hard proof-of-work.
//!
//! Not mining: a per-transaction cost that lets MESSAGE, CHAT, PRESENCE and
//! PUBLICIZE go through without a fee. Each attempt fills a work buffer from a
//! xoshiro256+ stream and bounces through it, so throughput is bound by memory
//! rather than raw hashing.

pub mod error;
pub mod generator;
pub mod memory_pow;

pub use error::WorkError;
pub use generator::WorkGenerator;
pub use memory_pow::{compute, verify};
