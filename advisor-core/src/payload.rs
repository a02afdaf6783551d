//! ABI-style plaintext bundles: one 32-byte big-endian word per value.

use thiserror::Error;

pub const WORD_BYTES: usize = 32;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("plaintext bundle is {actual} bytes, expected {expected}")]
    Length { expected: usize, actual: usize },
    #[error("word {index} does not fit in u32")]
    Overflow { index: usize },
}

pub fn encode_words(values: &[u32]) -> Vec<u8> {
    let mut out = vec![0u8; values.len() * WORD_BYTES];
    for (word, value) in out.chunks_exact_mut(WORD_BYTES).zip(values) {
        word[WORD_BYTES - 4..].copy_from_slice(&value.to_be_bytes());
    }
    out
}

/// Decodes exactly `arity` words.
pub fn decode_words(bytes: &[u8], arity: usize) -> Result<Vec<u32>, PayloadError> {
    let expected = arity.checked_mul(WORD_BYTES).unwrap_or(usize::MAX);
    if bytes.len() != expected {
        return Err(PayloadError::Length {
            expected,
            actual: bytes.len(),
        });
    }
    bytes
        .chunks_exact(WORD_BYTES)
        .enumerate()
        .map(|(index, word)| {
            let (high, low) = word.split_at(WORD_BYTES - 4);
            if high.iter().any(|b| *b != 0) {
                return Err(PayloadError::Overflow { index });
            }
            let mut buf = [0u8; 4];
            buf.copy_from_slice(low);
            Ok(u32::from_be_bytes(buf))
        })
        .collect()
}

/// Fixed-shape decode for callback payloads.
pub fn decode_array<const N: usize>(bytes: &[u8]) -> Result<[u32; N], PayloadError> {
    let words = decode_words(bytes, N)?;
    let mut out = [0u32; N];
    out.copy_from_slice(&words);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_are_right_aligned_big_endian() {
        let bytes = encode_words(&[1, 0x0102_0304]);
        assert_eq!(bytes.len(), 64);
        assert_eq!(bytes[31], 1);
        assert_eq!(&bytes[60..64], &[1, 2, 3, 4]);
        assert_eq!(decode_array::<2>(&bytes).unwrap(), [1, 0x0102_0304]);
    }

    #[test]
    fn rejects_wrong_arity() {
        let bytes = encode_words(&[1, 2]);
        assert_eq!(
            decode_words(&bytes, 4),
            Err(PayloadError::Length {
                expected: 128,
                actual: 64
            })
        );
        assert!(decode_words(&bytes[..63], 2).is_err());
    }

    #[test]
    fn huge_arity_is_a_length_error() {
        assert_eq!(
            decode_words(&[0; 4], usize::MAX / 8),
            Err(PayloadError::Length {
                expected: usize::MAX,
                actual: 4
            })
        );
    }

    #[test]
    fn rejects_values_wider_than_u32() {
        let mut bytes = encode_words(&[7, 9]);
        bytes[WORD_BYTES + 3] = 1;
        assert_eq!(
            decode_words(&bytes, 2),
            Err(PayloadError::Overflow { index: 1 })
        );
    }
}
