//! Fundamental types for the Cairn ledger engine.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! addresses, amounts, keys, timestamps, the transaction type registry, the stable
//! validation-result codes, approval enums and the ledger parameters.

pub mod address;
pub mod amount;
pub mod approval;
pub mod error;
pub mod group;
pub mod keys;
pub mod params;
pub mod time;
pub mod tx_type;
pub mod validation;

pub use address::Address;
pub use amount::{Amount, AssetId, BASE_ASSET};
pub use approval::ApprovalStatus;
pub use error::TypesError;
pub use group::{ApprovalThreshold, GroupId, NO_GROUP};
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use params::{LedgerParams, PowSettings};
pub use time::{NetworkClock, Timestamp};
pub use tx_type::TransactionType;
pub use validation::ValidationResult;

// Inline hex encoding to avoid adding the `hex` crate as a dependency of types.
pub(crate) mod hex {
    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}
