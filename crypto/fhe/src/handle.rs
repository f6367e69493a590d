//! Ciphertext handles issued by the FHE coprocessor
//!
//! A handle is an opaque 32-byte reference to a ciphertext that lives inside
//! the coprocessor. Byte 30 carries the FHE type id and byte 31 the handle
//! version; the remaining bytes are a digest chosen by the coprocessor.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::FHEError;

/// Current handle layout version
pub const HANDLE_VERSION: u8 = 0;

const TYPE_BYTE: usize = 30;
const VERSION_BYTE: usize = 31;

/// Encrypted value types understood by the coprocessor
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FheType {
    Bool,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
}

impl FheType {
    /// Type id embedded in handles
    pub fn type_id(self) -> u8 {
        match self {
            FheType::Bool => 0,
            FheType::Uint8 => 2,
            FheType::Uint16 => 3,
            FheType::Uint32 => 4,
            FheType::Uint64 => 5,
        }
    }

    /// Resolve a type id taken from a handle
    pub fn from_type_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(FheType::Bool),
            2 => Some(FheType::Uint8),
            3 => Some(FheType::Uint16),
            4 => Some(FheType::Uint32),
            5 => Some(FheType::Uint64),
            _ => None,
        }
    }

    /// Plaintext width in bits
    pub fn bits(self) -> u32 {
        match self {
            FheType::Bool => 1,
            FheType::Uint8 => 8,
            FheType::Uint16 => 16,
            FheType::Uint32 => 32,
            FheType::Uint64 => 64,
        }
    }

    /// Largest plaintext representable by this type
    pub fn max_value(self) -> u64 {
        match self {
            FheType::Uint64 => u64::MAX,
            other => (1u64 << other.bits()) - 1,
        }
    }

    /// Check that a plaintext fits this type
    pub fn fits(self, value: u64) -> bool {
        value <= self.max_value()
    }

    /// Short lowercase name (`bool`, `u8`, ...)
    pub fn name(self) -> &'static str {
        match self {
            FheType::Bool => "bool",
            FheType::Uint8 => "u8",
            FheType::Uint16 => "u16",
            FheType::Uint32 => "u32",
            FheType::Uint64 => "u64",
        }
    }
}

impl fmt::Display for FheType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FheType {
    type Err = FHEError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bool" | "ebool" => Ok(FheType::Bool),
            "u8" | "uint8" | "euint8" => Ok(FheType::Uint8),
            "u16" | "uint16" | "euint16" => Ok(FheType::Uint16),
            "u32" | "uint32" | "euint32" => Ok(FheType::Uint32),
            "u64" | "uint64" | "euint64" => Ok(FheType::Uint64),
            other => Err(FHEError::ConfigError(format!("unknown FHE type: {}", other))),
        }
    }
}

/// Opaque reference to a ciphertext held by the coprocessor
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct CiphertextHandle([u8; 32]);

impl CiphertextHandle {
    /// The uninitialized handle
    pub const ZERO: CiphertextHandle = CiphertextHandle([0u8; 32]);

    /// Wrap raw handle bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive a handle for `fhe_type` from coprocessor-chosen seed material
    pub fn derive(seed: &[u8], fhe_type: FheType) -> Self {
        let mut bytes = *blake3::hash(seed).as_bytes();
        bytes[TYPE_BYTE] = fhe_type.type_id();
        bytes[VERSION_BYTE] = HANDLE_VERSION;
        Self(bytes)
    }

    /// Raw handle bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// False for the all-zero handle, which never references a ciphertext
    pub fn is_initialized(&self) -> bool {
        self.0 != [0u8; 32]
    }

    /// FHE type encoded in the handle, if the tag is known
    pub fn fhe_type(&self) -> Option<FheType> {
        FheType::from_type_id(self.0[TYPE_BYTE])
    }

    /// Handle layout version
    pub fn version(&self) -> u8 {
        self.0[VERSION_BYTE]
    }

    /// Full hex encoding with `0x` prefix
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CiphertextHandle({}..)", &hex::encode(self.0)[..12])
    }
}

impl FromStr for CiphertextHandle {
    type Err = FHEError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let decoded = hex::decode(raw)
            .map_err(|e| FHEError::InvalidCiphertext(format!("bad hex: {}", e)))?;
        let bytes: [u8; 32] = decoded.try_into().map_err(|v: Vec<u8>| {
            FHEError::InvalidCiphertext(format!("expected 32 bytes, got {}", v.len()))
        })?;
        Ok(Self(bytes))
    }
}
