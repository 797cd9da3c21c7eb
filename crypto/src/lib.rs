//! Cryptographic primitives for the Cairn ledger engine.
//!
//! - **Ed25519** for transaction signing and verification
//! - **Blake2b** for address payloads and checksums
//! - **SHA-256** for proof-of-work pre-images and derived signatures
//! - Address derivation with `cairn_` prefix and base32 encoding

pub mod address;
pub mod hash;
pub mod keys;
pub mod sign;

pub use address::{
    account_address, at_address, decode_address, is_at_address, validate_address,
    AddressVersion,
};
pub use hash::{blake2b_256, blake2b_256_multi, hashed_signature, sha256};
pub use keys::{is_valid_public_key, keypair_from_private, keypair_from_seed, public_from_private};
pub use sign::{sign_message, verify_signature};
