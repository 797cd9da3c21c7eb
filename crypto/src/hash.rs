//! Blake2b and SHA-256 hashing.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use cairn_types::Signature;
use sha2::Sha256;

type Blake2b256 = Blake2b<U32>;

/// Compute a 256-bit Blake2b hash of arbitrary data.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash multiple byte slices in sequence (avoids concatenation allocation).
pub fn blake2b_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// SHA-256 digest, used as the proof-of-work pre-image hash.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Deterministic stand-in signature for transactions that have no signer
/// (GENESIS and AT): SHA-256 of the bytes, written twice.
pub fn hashed_signature(bytes: &[u8]) -> Signature {
    let digest = sha256(bytes);
    let mut out = [0u8; 64];
    out[..32].copy_from_slice(&digest);
    out[32..].copy_from_slice(&digest);
    Signature(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blake2b_deterministic() {
        assert_eq!(blake2b_256(b"hello cairn"), blake2b_256(b"hello cairn"));
        assert_ne!(blake2b_256(b"hello"), blake2b_256(b"world"));
    }

    #[test]
    fn blake2b_multi_equivalent() {
        let single = blake2b_256(b"helloworld");
        let multi = blake2b_256_multi(&[b"hello", b"world"]);
        assert_eq!(single, multi);
    }

    #[test]
    fn sha256_known_vector() {
        let digest = sha256(b"abc");
        assert_eq!(digest[0], 0xba);
        assert_eq!(digest[1], 0x78);
        assert_eq!(digest[31], 0xad);
    }

    #[test]
    fn hashed_signature_halves_match() {
        let sig = hashed_signature(b"genesis");
        assert_eq!(sig.0[..32], sig.0[32..]);
        assert_ne!(sig, hashed_signature(b"other"));
    }
}
