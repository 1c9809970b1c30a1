//! Identity and key types for exchange entities
//!
//! Every party, token contract and fee receiver is identified by a 32-byte
//! [`Address`]. For signing parties the address is the Ed25519 verifying key,
//! so "the signature recovers to the maker" becomes "the signature verifies
//! under the maker's address".

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::errors::ExchangeError;

/// 32-byte identity of an account, token contract or fee receiver.
///
/// `Address::ZERO` is reserved: as an order `taker` it means "anyone", and it
/// is rejected everywhere a real identity is required.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; 32]);

impl Address {
    /// The "anyone" / unset sentinel.
    pub const ZERO: Address = Address([0u8; 32]);

    /// Wrap raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Deterministic address from a short label. Handy for token contracts
    /// and fee receivers that never sign anything.
    pub fn from_label(label: &str) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(b"address:");
        hasher.update(label.as_bytes());
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Full lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form keeps test failure output readable
        let hex = self.to_hex();
        write!(f, "Address(0x{}…{})", &hex[..8], &hex[56..])
    }
}

impl FromStr for Address {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(trimmed).map_err(|_| ExchangeError::InvalidAddress {
            value: s.to_string(),
        })?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| ExchangeError::InvalidAddress {
            value: s.to_string(),
        })?;
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Replay-protection identity of an order (see [`crate::order::order_key`]).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderKey([u8; 32]);

impl OrderKey {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl fmt::Debug for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OrderKey(0x{})", &self.to_hex()[..16])
    }
}
