//! Fixed-width block codec: the 16-byte (key, value) record that every
//! on-disk structure in this crate is built from.
//!
//! A block is always exactly [`BLOCK_SIZE`] bytes: an 8-byte little-endian
//! key followed by an 8-byte little-endian value. There is no length
//! prefix and no checksum — alignment and position are computed
//! arithmetically by callers (`offset = HEADER_SIZE + i * BLOCK_SIZE`).

use thiserror::Error;

/// Size in bytes of one encoded (key, value) record.
pub const BLOCK_SIZE: usize = 16;

/// Size in bytes of a key or a value.
pub const FIELD_SIZE: usize = 8;

/// Value reserved to mark a deleted key.
pub const TOMBSTONE: u64 = u64::MAX;

/// Errors produced by the block codec.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// The byte slice handed to `decode` was not exactly [`BLOCK_SIZE`] bytes.
    #[error("invalid block size: expected {expected}, got {actual}")]
    InvalidSize { expected: usize, actual: usize },
}

/// Encodes a (key, value) pair into a 16-byte little-endian block.
pub fn encode(key: u64, value: u64) -> [u8; BLOCK_SIZE] {
    let mut buf = [0u8; BLOCK_SIZE];
    buf[..FIELD_SIZE].copy_from_slice(&key.to_le_bytes());
    buf[FIELD_SIZE..].copy_from_slice(&value.to_le_bytes());
    buf
}

/// Decodes a 16-byte little-endian block into a (key, value) pair.
///
/// `bytes` must be exactly [`BLOCK_SIZE`] long.
pub fn decode(bytes: &[u8]) -> Result<(u64, u64), CodecError> {
    if bytes.len() != BLOCK_SIZE {
        return Err(CodecError::InvalidSize {
            expected: BLOCK_SIZE,
            actual: bytes.len(),
        });
    }
    let key = u64::from_le_bytes(bytes[..FIELD_SIZE].try_into().expect("slice is 8 bytes"));
    let value = u64::from_le_bytes(bytes[FIELD_SIZE..].try_into().expect("slice is 8 bytes"));
    Ok((key, value))
}

/// Returns `true` if `value` is the tombstone sentinel.
pub fn is_tombstone(value: u64) -> bool {
    value == TOMBSTONE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let block = encode(42, 1337);
        assert_eq!(block.len(), BLOCK_SIZE);
        assert_eq!(decode(&block).unwrap(), (42, 1337));
    }

    #[test]
    fn tombstone_value_round_trips() {
        let block = encode(7, TOMBSTONE);
        let (k, v) = decode(&block).unwrap();
        assert_eq!(k, 7);
        assert!(is_tombstone(v));
    }

    #[test]
    fn rejects_wrong_size() {
        let err = decode(&[0u8; 8]).unwrap_err();
        assert_eq!(
            err,
            CodecError::InvalidSize {
                expected: 16,
                actual: 8
            }
        );
    }

    #[test]
    fn is_tombstone_is_exact() {
        assert!(!is_tombstone(u64::MAX - 1));
        assert!(is_tombstone(u64::MAX));
    }
}
