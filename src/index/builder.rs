//! Index writer. Serializes a string-valued mapping into the same-length
//! block format.
//!
//! # Input Requirements
//!
//! - Keys are non-empty byte strings and unique across the mapping.
//! - Values contain no newline, since each value is stored as one line.
//!
//! # Output Guarantees
//!
//! - Values are deduplicated and written sorted.
//! - Keys are grouped by length and sorted within each group.
//! - A block is written for every length from 1 to the longest key, empty
//!   or not, so the block index table can be addressed directly.
//!
//! The writer itself does not deal with atomicity: callers wrap it with
//! [`write_atomically`](crate::write::write_atomically) so that readers never
//! observe a partially written file.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;

use tracing::debug;

use crate::encoding::{self, BlockLocation, Encode, OFFSET_SIZE, offset_to_u32};

use super::IndexError;

// ------------------------------------------------------------------------------------------------
// EncodeStats
// ------------------------------------------------------------------------------------------------

/// Summary of one encoding run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodeStats {
    /// Number of keys written.
    pub keys: usize,

    /// Number of distinct values in the value region.
    pub distinct_values: usize,

    /// Length of the longest key (= number of block index entries).
    pub max_key_len: usize,

    /// Total bytes written, trailer included.
    pub bytes_written: u64,
}

// ------------------------------------------------------------------------------------------------
// Position tracking
// ------------------------------------------------------------------------------------------------

/// Write adapter tracking the number of bytes written so far, which is the
/// absolute offset in the output file.
struct CountingWriter<W> {
    inner: W,
    position: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, position: 0 }
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), IndexError> {
        self.inner.write_all(bytes)?;
        self.position += bytes.len() as u64;
        Ok(())
    }

    fn offset(&self) -> Result<u32, IndexError> {
        Ok(offset_to_u32(self.position)?)
    }
}

// ------------------------------------------------------------------------------------------------
// IndexWriter
// ------------------------------------------------------------------------------------------------

/// Encodes a mapping into an index file.
///
/// # Example
///
/// ```rust
/// use debsrc_index::index::{IndexReader, IndexWriter};
/// use std::io::Cursor;
///
/// let mut buf = Vec::new();
/// IndexWriter::new(&mut buf)
///     .encode([("bin:hello", "hello\t2.10-3"), ("hello", "hello\t2.10-3")])
///     .unwrap();
///
/// let mut reader = IndexReader::new(Cursor::new(buf)).unwrap();
/// assert_eq!(reader.get(b"hello").unwrap().as_deref(), Some("hello\t2.10-3"));
/// ```
pub struct IndexWriter<W: Write> {
    writer: W,
}

impl<W: Write> IndexWriter<W> {
    /// Create a writer emitting into `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Consume `entries` and write the complete index.
    ///
    /// The entries may arrive in any order; the output only depends on the
    /// set of `(key, value)` pairs.
    ///
    /// # Errors
    ///
    /// - [`IndexError::InvalidEntry`] for an empty key, a duplicate key, or a
    ///   value containing a newline.
    /// - [`EncodingError::LengthOverflow`](crate::encoding::EncodingError::LengthOverflow)
    ///   if an offset no longer fits into 32 bits.
    /// - I/O errors from the underlying writer.
    pub fn encode<I, K, V>(self, entries: I) -> Result<EncodeStats, IndexError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<[u8]>,
        V: AsRef<str>,
    {
        let entries: Vec<(K, V)> = entries.into_iter().collect();
        for (key, value) in &entries {
            if key.as_ref().is_empty() {
                return Err(IndexError::InvalidEntry("key must not be empty".into()));
            }
            if value.as_ref().contains('\n') {
                return Err(IndexError::InvalidEntry(format!(
                    "value {:?} contains a newline",
                    value.as_ref()
                )));
            }
        }

        let mut out = CountingWriter::new(self.writer);

        // 1. Value region
        let value_offsets = write_values(&mut out, entries.iter().map(|(_, v)| v.as_ref()))?;

        // 2. Same-length blocks
        let mut by_length: BTreeMap<usize, Vec<(&[u8], u32)>> = BTreeMap::new();
        for (key, value) in &entries {
            let key = key.as_ref();
            by_length
                .entry(key.len())
                .or_default()
                .push((key, value_offsets[value.as_ref()]));
        }
        let max_key_len = by_length.keys().next_back().copied().unwrap_or(0);

        let mut table = Vec::with_capacity(max_key_len);
        for len in 1..=max_key_len {
            let block = by_length.remove(&len).unwrap_or_default();
            table.push(write_block(&mut out, len, block)?);
        }

        // 3. Block index table
        let table_offset = out.offset()?;
        let mut buf = Vec::with_capacity(table.len() * encoding::BLOCK_LOCATION_SIZE);
        for location in &table {
            location.encode_to(&mut buf)?;
        }
        out.write_bytes(&buf)?;

        // 4. Trailer
        let mut trailer = Vec::with_capacity(OFFSET_SIZE);
        table_offset.encode_to(&mut trailer)?;
        out.write_bytes(&trailer)?;
        out.inner.flush()?;

        let stats = EncodeStats {
            keys: entries.len(),
            distinct_values: value_offsets.len(),
            max_key_len,
            bytes_written: out.position,
        };
        debug!(
            keys = stats.keys,
            distinct_values = stats.distinct_values,
            max_key_len = stats.max_key_len,
            bytes = stats.bytes_written,
            "index encoded"
        );
        Ok(stats)
    }
}

// ------------------------------------------------------------------------------------------------
// Phase helpers
// ------------------------------------------------------------------------------------------------

/// Writes each distinct value once, in sorted order.
///
/// Returns the offset at which each value starts.
fn write_values<'a, W: Write>(
    out: &mut CountingWriter<W>,
    values: impl Iterator<Item = &'a str>,
) -> Result<HashMap<&'a str, u32>, IndexError> {
    let mut values: Vec<&str> = values.collect();
    values.sort_unstable();
    values.dedup();

    let mut offsets = HashMap::with_capacity(values.len());
    for value in values {
        offsets.insert(value, out.offset()?);
        out.write_bytes(value.as_bytes())?;
        out.write_bytes(b"\n")?;
    }
    Ok(offsets)
}

/// Writes one same-length block and returns its location.
fn write_block<W: Write>(
    out: &mut CountingWriter<W>,
    key_len: usize,
    mut block: Vec<(&[u8], u32)>,
) -> Result<BlockLocation, IndexError> {
    let block_offset = out.offset()?;
    block.sort_unstable_by(|a, b| a.0.cmp(b.0));

    if let Some(pair) = block.windows(2).find(|pair| pair[0].0 == pair[1].0) {
        return Err(IndexError::InvalidEntry(format!(
            "duplicate key {:?}",
            String::from_utf8_lossy(pair[0].0)
        )));
    }

    let mut buf = Vec::with_capacity(block.len() * (key_len + OFFSET_SIZE));
    for (key, value_offset) in &block {
        buf.extend_from_slice(key);
        value_offset.encode_to(&mut buf)?;
    }
    out.write_bytes(&buf)?;

    Ok(BlockLocation {
        block_offset,
        block_length: offset_to_u32(buf.len() as u64)?,
    })
}
