//! Account address derivation.
//!
//! Address format: `cairn_` + base32(version ‖ account_id, 34 chars) + base32(checksum, 8 chars)
//!
//! - `version` is one byte: key-backed accounts and AT accounts use different values.
//! - `account_id` is the first 20 bytes of Blake2b-256 over the public key, or over
//!   the deployment signature for AT accounts.
//! - The checksum is the first 5 bytes of Blake2b-256 over `version ‖ account_id`.
//!
//! Base32 alphabet: `13456789abcdefghijkmnopqrstuwxyz` (avoids ambiguous chars).

use cairn_types::{Address, PublicKey, Signature};

/// Base32 alphabet (32 chars, avoids visually ambiguous 0/O, 2/Z, l/I, v).
const BASE32_ALPHABET: &[u8; 32] = b"13456789abcdefghijkmnopqrstuwxyz";

/// Reverse lookup table: ASCII byte → 5-bit value (0xFF = invalid).
const BASE32_DECODE: [u8; 128] = {
    let mut table = [0xFFu8; 128];
    let alpha = BASE32_ALPHABET;
    let mut i = 0;
    while i < 32 {
        table[alpha[i] as usize] = i as u8;
        i += 1;
    }
    table
};

const PAYLOAD_LEN: usize = 21;
/// 168 bits → ceil(168/5) = 34 characters.
const PAYLOAD_CHARS: usize = 34;
/// 40 bits → 8 characters.
const CHECKSUM_CHARS: usize = 8;

/// Which kind of account an address belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressVersion {
    Account,
    At,
}

impl AddressVersion {
    fn byte(self) -> u8 {
        match self {
            Self::Account => 0x3A,
            Self::At => 0x17,
        }
    }

    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x3A => Some(Self::Account),
            0x17 => Some(Self::At),
            _ => None,
        }
    }
}

fn encode_base32(bytes: &[u8]) -> String {
    let mut result = String::with_capacity((bytes.len() * 8).div_ceil(5));
    let mut buffer: u64 = 0;
    let mut bits_in_buffer = 0;

    for &byte in bytes {
        buffer = (buffer << 8) | byte as u64;
        bits_in_buffer += 8;
        while bits_in_buffer >= 5 {
            bits_in_buffer -= 5;
            let idx = ((buffer >> bits_in_buffer) & 0x1F) as usize;
            result.push(BASE32_ALPHABET[idx] as char);
        }
    }
    // Remaining bits (padded with zeros on the right).
    if bits_in_buffer > 0 {
        let idx = ((buffer << (5 - bits_in_buffer)) & 0x1F) as usize;
        result.push(BASE32_ALPHABET[idx] as char);
    }

    result
}

/// Decode a base32 string into a fixed-size byte array. Returns `None` on
/// invalid characters or wrong length.
fn decode_base32_fixed<const N: usize>(s: &str) -> Option<[u8; N]> {
    let mut buffer: u64 = 0;
    let mut bits_in_buffer = 0;
    let mut result = [0u8; N];
    let mut pos = 0;

    for c in s.bytes() {
        if c >= 128 {
            return None;
        }
        let val = BASE32_DECODE[c as usize];
        if val == 0xFF {
            return None;
        }
        buffer = (buffer << 5) | val as u64;
        bits_in_buffer += 5;
        if bits_in_buffer >= 8 {
            bits_in_buffer -= 8;
            if pos < N {
                result[pos] = (buffer >> bits_in_buffer) as u8;
                pos += 1;
            }
        }
    }

    if pos < N {
        return None;
    }
    Some(result)
}

fn encode_address(version: AddressVersion, seed: &[u8]) -> Address {
    let digest = crate::blake2b_256(seed);
    let mut payload = [0u8; PAYLOAD_LEN];
    payload[0] = version.byte();
    payload[1..].copy_from_slice(&digest[..PAYLOAD_LEN - 1]);
    let checksum = crate::blake2b_256(&payload);
    Address::new(format!(
        "{}{}{}",
        Address::PREFIX,
        encode_base32(&payload),
        encode_base32(&checksum[..5])
    ))
}

/// Derive the address of a key-backed account.
pub fn account_address(public_key: &PublicKey) -> Address {
    encode_address(AddressVersion::Account, public_key.as_bytes())
}

/// Derive the address of an AT account from its deployment signature.
pub fn at_address(deploy_signature: &Signature) -> Address {
    encode_address(AddressVersion::At, deploy_signature.as_bytes())
}

/// Split a well-formed address into its version and 20-byte account id.
///
/// Returns `None` if the address is malformed or has an invalid checksum.
pub fn decode_address(address: &str) -> Option<(AddressVersion, [u8; 20])> {
    let encoded = address.strip_prefix(Address::PREFIX)?;
    if encoded.len() != PAYLOAD_CHARS + CHECKSUM_CHARS {
        return None;
    }

    let payload: [u8; PAYLOAD_LEN] = decode_base32_fixed(&encoded[..PAYLOAD_CHARS])?;
    let checksum: [u8; 5] = decode_base32_fixed(&encoded[PAYLOAD_CHARS..])?;
    if checksum != crate::blake2b_256(&payload)[..5] {
        return None;
    }

    let version = AddressVersion::from_byte(payload[0])?;
    let mut id = [0u8; 20];
    id.copy_from_slice(&payload[1..]);
    Some((version, id))
}

/// Validate that an address string is well-formed and its checksum is correct.
pub fn validate_address(address: &str) -> bool {
    decode_address(address).is_some()
}

/// True for a well-formed AT account address.
pub fn is_at_address(address: &str) -> bool {
    matches!(decode_address(address), Some((AddressVersion::At, _)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::keypair_from_seed;

    #[test]
    fn derive_and_validate() {
        let kp = keypair_from_seed(&[7u8; 32]);
        let addr = account_address(&kp.public);
        assert!(addr.as_str().starts_with("cairn_"));
        assert_eq!(addr.as_str().len(), 6 + 34 + 8);
        assert!(validate_address(addr.as_str()));
        assert!(!is_at_address(addr.as_str()));
    }

    #[test]
    fn at_addresses_are_distinguished() {
        let addr = at_address(&Signature([3u8; 64]));
        assert!(validate_address(addr.as_str()));
        assert!(is_at_address(addr.as_str()));
    }

    #[test]
    fn invalid_checksum_rejected() {
        let kp = keypair_from_seed(&[8u8; 32]);
        let mut bad = account_address(&kp.public).as_str().to_string();
        let last = bad.pop().unwrap();
        bad.push(if last == '1' { '3' } else { '1' });
        assert!(!validate_address(&bad));
    }

    #[test]
    fn wrong_prefix_or_length_rejected() {
        assert!(!validate_address("cairn_tooshort"));
        assert!(!validate_address("cairn_"));
        let kp = keypair_from_seed(&[8u8; 32]);
        let good = account_address(&kp.public);
        let swapped = good.as_str().replacen("cairn_", "xyz_", 1);
        assert!(!validate_address(&swapped));
    }

    #[test]
    fn base32_encode_decode_roundtrip() {
        let data = [0xDE, 0xAD, 0xBE, 0xEF, 0x42];
        let decoded: [u8; 5] = decode_base32_fixed(&encode_base32(&data)).unwrap();
        assert_eq!(decoded, data);
    }
}
