//! Account address type with `cairn_` prefix.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypesError;

/// A ledger account address, always prefixed with `cairn_`.
///
/// Key-backed accounts derive their address from the public key; AT accounts
/// derive it from the deployment signature. The encoding and checksum live in
/// `cairn_crypto::address`; this type only carries the string.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    /// The standard prefix for all addresses.
    pub const PREFIX: &'static str = "cairn_";

    /// Wrap a raw string without any checks.
    ///
    /// Addresses arriving from the wire are carried as-is and validated by the
    /// transaction that uses them, so an invalid address is representable.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Wrap a raw string, rejecting anything without the prefix.
    pub fn parse(raw: impl Into<String>) -> Result<Self, TypesError> {
        let s = raw.into();
        if !s.starts_with(Self::PREFIX) || s.len() == Self::PREFIX.len() {
            return Err(TypesError::InvalidAddress(s));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Cheap shape check: prefix present and something after it.
    pub fn has_prefix(&self) -> bool {
        self.0.starts_with(Self::PREFIX) && self.0.len() > Self::PREFIX.len()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Address {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_requires_prefix() {
        assert!(Address::parse("cairn_abc").is_ok());
        assert!(Address::parse("xyz_abc").is_err());
        assert!(Address::parse("cairn_").is_err());
    }

    #[test]
    fn new_keeps_malformed_input() {
        let addr = Address::new("garbage");
        assert!(!addr.has_prefix());
        assert_eq!(addr.as_str(), "garbage");
    }
}
