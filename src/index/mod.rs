//! Same-Length Block Index
//!
//! This module implements an **immutable**, **disk-backed** associative file
//! that maps arbitrary non-empty byte-string keys to newline-free string
//! values, and answers exact-key point lookups with a handful of seeks
//! instead of parsing the whole file.
//!
//! # On-disk layout
//!
//! All integers are little-endian `u32`.
//!
//! ```text
//! [VALUE\n][VALUE\n]...                         value region (distinct, sorted)
//! [KEY(len 1)][VALUE_OFFSET]...                 same-length block, len = 1
//! [KEY(len 2)][VALUE_OFFSET]...                 same-length block, len = 2
//! ...
//! [KEY(len N)][VALUE_OFFSET]...                 same-length block, len = N
//! [BLOCK_OFFSET][BLOCK_LENGTH] × N              block index table
//! [TABLE_OFFSET]                                trailer
//! ```
//!
//! - **Value region**: every distinct value once, sorted, newline-terminated.
//! - **Same-length blocks**: keys grouped by byte length, sorted within each
//!   block, each immediately followed by the offset of its value. The
//!   per-entry stride is `key_len + 4`, so entries are addressable by
//!   arithmetic and can be binary-searched.
//! - **Block index table**: one [`BlockLocation`](crate::encoding::BlockLocation)
//!   per length from 1 to the maximum key length, including empty lengths, so
//!   the entry for a key of length `L` lives at `table_offset + (L - 1) × 8`.
//! - **Trailer**: the absolute offset of the block index table.
//!
//! # Sub-modules
//!
//! - [`builder`]: [`IndexWriter`] serializes a mapping.
//! - [`reader`]: [`IndexReader`] performs point lookups on an encoded file.
//!
//! # Guarantees
//!
//! - **Determinism:** the encoded bytes are a pure function of the mapping's
//!   content, independent of insertion order.
//! - **Immutability:** an index file is never modified after it is written;
//!   regeneration writes a new file and renames it over the old one.
//! - **No guessing:** any structural inconsistency detected while reading is
//!   reported as [`IndexError::Corrupt`], never papered over.

// ------------------------------------------------------------------------------------------------
// Sub-modules
// ------------------------------------------------------------------------------------------------

pub mod builder;
pub mod reader;


pub use builder::{EncodeStats, IndexWriter};
pub use reader::IndexReader;

// ------------------------------------------------------------------------------------------------
// Includes
// ------------------------------------------------------------------------------------------------

use std::io;
use std::path::{Path, PathBuf};

use crate::encoding::EncodingError;
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// File names
// ------------------------------------------------------------------------------------------------

/// Index mapping lookup keys to `"source\tversion"`.
pub const SOURCES_INDEX: &str = "sources.index";

/// Index mapping `"source\tversion"` to `"url\tsize"`.
pub const URIS_INDEX: &str = "uris.index";

/// Size of the trailer holding the block index table offset.
pub(crate) const TRAILER_SIZE: u64 = 4;

// ------------------------------------------------------------------------------------------------
// Error Types
// ------------------------------------------------------------------------------------------------

/// Errors returned by index encoding and lookup.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Encoding / decoding error.
    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// The index file does not exist (yet).
    #[error("index {} is unavailable", path.display())]
    Unavailable {
        /// Path that was opened.
        path: PathBuf,
    },

    /// A structural invariant of the file was violated.
    #[error("corrupt index: {0}")]
    Corrupt(String),

    /// An entry cannot be represented in the format.
    #[error("invalid entry: {0}")]
    InvalidEntry(String),
}

// ------------------------------------------------------------------------------------------------
// One-shot lookup
// ------------------------------------------------------------------------------------------------

/// Opens the index at `path` and looks up `key`.
///
/// Returns `Ok(None)` when the key is absent from a well-formed index.
///
/// # Errors
///
/// - [`IndexError::Unavailable`] if the file does not exist.
/// - [`IndexError::Corrupt`] on truncated or inconsistent structure.
pub fn lookup(path: impl AsRef<Path>, key: &[u8]) -> Result<Option<String>, IndexError> {
    IndexReader::open(path)?.get(key)
}
