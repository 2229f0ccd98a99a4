//! Index reader: exact-key point lookups using seek + read only.
//!
//! A lookup for a key of length `L` performs:
//!
//! 1. one read of the block index entry at `table_offset + (L - 1) × 8`,
//! 2. a binary search over the fixed-stride entries of the length-`L` block
//!    (one seek + read per comparison),
//! 3. one line read from the value region.
//!
//! The trailer is read once in [`IndexReader::new`] and cached, so a reader
//! can serve many lookups against the same open file.

use std::cmp::Ordering;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use tracing::trace;

use crate::encoding::{self, BLOCK_LOCATION_SIZE, BlockLocation, OFFSET_SIZE};

use super::{IndexError, TRAILER_SIZE};

/// Read-only handle on an encoded index.
#[derive(Debug)]
pub struct IndexReader<R> {
    /// Underlying seekable stream.
    inner: R,

    /// Absolute offset of the block index table.
    table_offset: u64,

    /// Longest key length addressable by the block index table.
    max_key_len: usize,
}

impl IndexReader<BufReader<File>> {
    /// Opens the index file at `path`.
    ///
    /// # Errors
    ///
    /// - [`IndexError::Unavailable`] if the file does not exist.
    /// - [`IndexError::Corrupt`] if the trailer or table bounds are invalid.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(IndexError::Unavailable {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        Self::new(BufReader::new(file))
    }
}

impl<R: BufRead + Seek> IndexReader<R> {
    /// Wraps an already-open stream and validates the trailer.
    pub fn new(mut inner: R) -> Result<Self, IndexError> {
        let file_len = inner.seek(SeekFrom::End(0))?;
        if file_len < TRAILER_SIZE {
            return Err(IndexError::Corrupt(format!(
                "file too small ({file_len} bytes)"
            )));
        }
        let table_end = file_len - TRAILER_SIZE;

        let mut trailer = [0u8; OFFSET_SIZE];
        read_exact_at(&mut inner, table_end, &mut trailer)?;
        let (table_offset, _) = encoding::decode_from_slice::<u32>(&trailer)?;
        let table_offset = u64::from(table_offset);

        if table_offset > table_end {
            return Err(IndexError::Corrupt(format!(
                "block index table offset {table_offset} beyond end of data {table_end}"
            )));
        }
        let table_len = table_end - table_offset;
        if table_len % BLOCK_LOCATION_SIZE as u64 != 0 {
            return Err(IndexError::Corrupt(format!(
                "block index table length {table_len} is not a multiple of {BLOCK_LOCATION_SIZE}"
            )));
        }

        Ok(Self {
            inner,
            table_offset,
            max_key_len: (table_len / BLOCK_LOCATION_SIZE as u64) as usize,
        })
    }

    /// Length of the longest key the index can contain.
    pub fn max_key_len(&self) -> usize {
        self.max_key_len
    }

    /// Looks up `key`.
    ///
    /// Returns `Ok(None)` if the key is not present.
    ///
    /// # Errors
    ///
    /// [`IndexError::Corrupt`] for short reads, blocks that overlap the
    /// table, block lengths that are not a multiple of the entry stride,
    /// dangling value offsets, unterminated or non-UTF-8 values.
    pub fn get(&mut self, key: &[u8]) -> Result<Option<String>, IndexError> {
        if key.is_empty() || key.len() > self.max_key_len {
            return Ok(None);
        }

        let location = self.block_location(key.len())?;
        let stride = (key.len() + OFFSET_SIZE) as u64;
        let block_offset = u64::from(location.block_offset);
        let block_length = u64::from(location.block_length);

        if block_offset + block_length > self.table_offset {
            return Err(IndexError::Corrupt(format!(
                "block for length {} at {block_offset}+{block_length} overlaps the table",
                key.len()
            )));
        }
        if block_length % stride != 0 {
            return Err(IndexError::Corrupt(format!(
                "block length {block_length} is not a multiple of stride {stride}"
            )));
        }

        let entries = block_length / stride;
        trace!(key_len = key.len(), entries, "searching same-length block");

        let Some(value_offset) = self.search_block(key, block_offset, entries)? else {
            return Ok(None);
        };
        self.read_value(u64::from(value_offset)).map(Some)
    }

    /// Reads the block index table entry for `key_len`.
    fn block_location(&mut self, key_len: usize) -> Result<BlockLocation, IndexError> {
        let position = self.table_offset + ((key_len - 1) * BLOCK_LOCATION_SIZE) as u64;
        let mut buf = [0u8; BLOCK_LOCATION_SIZE];
        read_exact_at(&mut self.inner, position, &mut buf)?;
        let (location, _) = encoding::decode_from_slice::<BlockLocation>(&buf)?;
        Ok(location)
    }

    /// Binary-searches the sorted, fixed-stride entries of one block.
    ///
    /// Returns the value offset stored next to `key`, if present.
    fn search_block(
        &mut self,
        key: &[u8],
        block_offset: u64,
        entries: u64,
    ) -> Result<Option<u32>, IndexError> {
        let stride = key.len() + OFFSET_SIZE;
        let mut entry = vec![0u8; stride];
        let (mut lo, mut hi) = (0u64, entries);

        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            read_exact_at(&mut self.inner, block_offset + mid * stride as u64, &mut entry)?;
            match entry[..key.len()].cmp(key) {
                Ordering::Equal => {
                    let (value_offset, _) =
                        encoding::decode_from_slice::<u32>(&entry[key.len()..])?;
                    return Ok(Some(value_offset));
                }
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid,
            }
        }
        Ok(None)
    }

    /// Reads the newline-terminated value starting at `offset`.
    fn read_value(&mut self, offset: u64) -> Result<String, IndexError> {
        if offset >= self.table_offset {
            return Err(IndexError::Corrupt(format!(
                "value offset {offset} outside the value region"
            )));
        }
        self.inner.seek(SeekFrom::Start(offset))?;

        let mut line = Vec::new();
        self.inner.read_until(b'\n', &mut line)?;
        if line.pop() != Some(b'\n') {
            return Err(IndexError::Corrupt(format!(
                "value at offset {offset} is not newline-terminated"
            )));
        }
        String::from_utf8(line)
            .map_err(|_| IndexError::Corrupt(format!("value at offset {offset} is not UTF-8")))
    }
}

/// Seeks to `offset` and fills `buf`, reporting a short read as corruption.
fn read_exact_at<R: Read + Seek>(
    inner: &mut R,
    offset: u64,
    buf: &mut [u8],
) -> Result<(), IndexError> {
    inner.seek(SeekFrom::Start(offset))?;
    match inner.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(IndexError::Corrupt(format!(
            "short read of {} bytes at offset {offset}",
            buf.len()
        ))),
        Err(e) => Err(e.into()),
    }
}
