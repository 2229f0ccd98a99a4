//! Fixed-width little-endian encoding for the index file's structural records.
//!
//! The index format (see [`crate::index`]) only stores two kinds of
//! structural integers: 4-byte value offsets and 8-byte block locations.
//! Both are written through the [`Encode`] / [`Decode`] traits so that the
//! on-disk representation is owned by this crate and never changes due to a
//! dependency upgrade.
//!
//! # Wire format
//!
//! | Rust type         | Encoding                                      |
//! |-------------------|-----------------------------------------------|
//! | `u32`             | 4 bytes, little-endian                        |
//! | [`BlockLocation`] | `[u32 block_offset][u32 block_length]` (8 B)  |
//!
//! # Zero-panic guarantee
//!
//! No function in this module uses `unwrap()`, `expect()`, or any other
//! panicking path. Short buffers are reported as
//! [`EncodingError::UnexpectedEof`].


use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// Sizes
// ------------------------------------------------------------------------------------------------

/// Encoded size of a `u32` offset.
pub const OFFSET_SIZE: usize = 4;

/// Encoded size of a [`BlockLocation`].
pub const BLOCK_LOCATION_SIZE: usize = 2 * OFFSET_SIZE;

// ------------------------------------------------------------------------------------------------
// Error type
// ------------------------------------------------------------------------------------------------

/// Errors produced during encoding or decoding.
#[derive(Debug, Error)]
pub enum EncodingError {
    /// The buffer ran out of bytes before decoding completed.
    #[error("unexpected end of buffer (need {needed} bytes, have {available})")]
    UnexpectedEof {
        /// Bytes required to continue decoding.
        needed: usize,
        /// Bytes actually remaining.
        available: usize,
    },

    /// A length or offset does not fit into the 32-bit wire representation.
    #[error("length overflow: {0}")]
    LengthOverflow(String),
}

// ------------------------------------------------------------------------------------------------
// Core traits
// ------------------------------------------------------------------------------------------------

/// Serialize `self` into a byte buffer.
///
/// Implementations **must** produce deterministic output: the same
/// logical value always yields the exact same byte sequence.
pub trait Encode {
    /// Append the encoded representation of `self` to `buf`.
    fn encode_to(&self, buf: &mut Vec<u8>) -> Result<(), EncodingError>;
}

/// Deserialize a value from a byte slice.
///
/// Returns `(value, bytes_consumed)` on success.
pub trait Decode: Sized {
    /// Decode one value starting at `buf[0]`.
    fn decode_from(buf: &[u8]) -> Result<(Self, usize), EncodingError>;
}

// ------------------------------------------------------------------------------------------------
// Convenience functions
// ------------------------------------------------------------------------------------------------

/// Encode a value into a freshly-allocated `Vec<u8>`.
pub fn encode_to_vec<T: Encode>(value: &T) -> Result<Vec<u8>, EncodingError> {
    let mut buf = Vec::new();
    value.encode_to(&mut buf)?;
    Ok(buf)
}

/// Decode a value from the beginning of `buf`.
pub fn decode_from_slice<T: Decode>(buf: &[u8]) -> Result<(T, usize), EncodingError> {
    T::decode_from(buf)
}

/// Convert a `u64` file position into a 32-bit offset.
pub fn offset_to_u32(offset: u64) -> Result<u32, EncodingError> {
    u32::try_from(offset)
        .map_err(|_| EncodingError::LengthOverflow(format!("offset {offset} exceeds u32::MAX")))
}

#[inline]
fn require(buf: &[u8], needed: usize) -> Result<(), EncodingError> {
    if buf.len() < needed {
        Err(EncodingError::UnexpectedEof {
            needed,
            available: buf.len(),
        })
    } else {
        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// u32
// ------------------------------------------------------------------------------------------------

impl Encode for u32 {
    #[inline]
    fn encode_to(&self, buf: &mut Vec<u8>) -> Result<(), EncodingError> {
        buf.extend_from_slice(&self.to_le_bytes());
        Ok(())
    }
}

impl Decode for u32 {
    #[inline]
    fn decode_from(buf: &[u8]) -> Result<(Self, usize), EncodingError> {
        require(buf, OFFSET_SIZE)?;
        let bytes = [buf[0], buf[1], buf[2], buf[3]];
        Ok((u32::from_le_bytes(bytes), OFFSET_SIZE))
    }
}

// ------------------------------------------------------------------------------------------------
// BlockLocation
// ------------------------------------------------------------------------------------------------

/// Location (including the size) of a same-length key block within an
/// index file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockLocation {
    /// Absolute file offset of the first entry in the block.
    pub block_offset: u32,

    /// Size of the block in bytes (`entries × (key_len + 4)`).
    pub block_length: u32,
}

impl Encode for BlockLocation {
    fn encode_to(&self, buf: &mut Vec<u8>) -> Result<(), EncodingError> {
        self.block_offset.encode_to(buf)?;
        self.block_length.encode_to(buf)?;
        Ok(())
    }
}

impl Decode for BlockLocation {
    fn decode_from(buf: &[u8]) -> Result<(Self, usize), EncodingError> {
        let mut off = 0;
        let (block_offset, n) = u32::decode_from(&buf[off..])?;
        off += n;
        let (block_length, n) = u32::decode_from(&buf[off..])?;
        off += n;
        Ok((
            Self {
                block_offset,
                block_length,
            },
            off,
        ))
    }
}
