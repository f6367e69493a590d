//! Cleartext encoding for decryption results
//!
//! The oracle returns one 32-byte big-endian word per decrypted handle, in
//! the order the handles were requested.

use serde::{Deserialize, Serialize};

use crate::{FHEError, FHEResult, FheType};

/// Width of one encoded cleartext word
pub const WORD_SIZE: usize = 32;

/// A decrypted value together with the type it was encrypted as
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearValue {
    pub fhe_type: FheType,
    pub value: u64,
}

impl ClearValue {
    pub fn new(fhe_type: FheType, value: u64) -> FHEResult<Self> {
        if !fhe_type.fits(value) {
            return Err(FHEError::Overflow {
                value,
                fhe_type: fhe_type.to_string(),
            });
        }
        Ok(Self { fhe_type, value })
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.fhe_type {
            FheType::Bool => Some(self.value == 1),
            _ => None,
        }
    }
}

/// Encode values as consecutive 32-byte words
pub fn encode_cleartexts(values: &[ClearValue]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * WORD_SIZE);
    for v in values {
        let mut word = [0u8; WORD_SIZE];
        word[WORD_SIZE - 8..].copy_from_slice(&v.value.to_be_bytes());
        out.extend_from_slice(&word);
    }
    out
}

/// Decode cleartext words against the expected types
///
/// Fails if the length is not exactly one word per type, or if any word
/// holds a value outside its type's range.
pub fn decode_cleartexts(bytes: &[u8], types: &[FheType]) -> FHEResult<Vec<ClearValue>> {
    let expected = types.len() * WORD_SIZE;
    if bytes.len() != expected {
        return Err(FHEError::InvalidCleartext(format!(
            "expected {} bytes for {} values, got {}",
            expected,
            types.len(),
            bytes.len()
        )));
    }

    bytes
        .chunks_exact(WORD_SIZE)
        .zip(types)
        .enumerate()
        .map(|(index, (word, fhe_type))| {
            let (high, low) = word.split_at(WORD_SIZE - 8);
            if high.iter().any(|b| *b != 0) {
                return Err(FHEError::InvalidCleartext(format!(
                    "word {} exceeds 64 bits",
                    index
                )));
            }
            let mut buf = [0u8; 8];
            buf.copy_from_slice(low);
            let value = u64::from_be_bytes(buf);
            ClearValue::new(*fhe_type, value).map_err(|_| {
                FHEError::InvalidCleartext(format!(
                    "word {} value {} out of range for {}",
                    index, value, fhe_type
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        let values = [
            ClearValue::new(FheType::Uint32, 0x0102_0304).unwrap(),
            ClearValue::new(FheType::Bool, 1).unwrap(),
        ];
        let bytes = encode_cleartexts(&values);
        assert_eq!(bytes.len(), 64);
        assert_eq!(&bytes[28..32], &[1, 2, 3, 4]);
        assert_eq!(bytes[63], 1);
        assert!(bytes[..28].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_decode_checks_length() {
        let err = decode_cleartexts(&[0u8; 31], &[FheType::Uint8]).unwrap_err();
        assert!(matches!(err, FHEError::InvalidCleartext(_)));

        assert!(decode_cleartexts(&[], &[]).unwrap().is_empty());
    }

    #[test]
    fn test_decode_checks_range() {
        let mut word = [0u8; 32];
        word[31] = 2;
        assert!(decode_cleartexts(&word, &[FheType::Bool]).is_err());
        assert_eq!(
            decode_cleartexts(&word, &[FheType::Uint8]).unwrap()[0].value,
            2
        );

        let mut wide = [0u8; 32];
        wide[0] = 1;
        assert!(decode_cleartexts(&wide, &[FheType::Uint64]).is_err());
    }

    #[test]
    fn test_clear_value_overflow() {
        assert!(ClearValue::new(FheType::Uint8, 256).is_err());
        assert_eq!(ClearValue::new(FheType::Bool, 1).unwrap().as_bool(), Some(true));
    }
}
