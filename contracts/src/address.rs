//! Principal identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Failure to parse an address string
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid address {input:?}: {reason}")]
pub struct AddressParseError {
    pub input: String,
    pub reason: String,
}

/// A 20-byte account identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Address([u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Deterministic address derived from a human label (`"alice"`, `"registry"`)
    pub fn from_label(label: &str) -> Self {
        let digest = blake3::hash(label.as_bytes());
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest.as_bytes()[12..]);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason: String| AddressParseError {
            input: s.to_string(),
            reason,
        };
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let decoded = hex::decode(raw).map_err(|e| err(e.to_string()))?;
        let bytes: [u8; 20] = decoded
            .try_into()
            .map_err(|v: Vec<u8>| err(format!("expected 20 bytes, got {}", v.len())))?;
        Ok(Self(bytes))
    }
}
