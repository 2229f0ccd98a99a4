//! # Control-file paragraphs
//!
//! Package metadata (`Packages`, `Sources`, the dpkg status database, and
//! `apt-get indextargets` listings) is stored as deb822 paragraphs:
//!
//! ```text
//! Package: xserver-xephyr
//! Source: xorg-server (2:1.19.3-2)
//! Version: 2:1.19.3-2+b1
//! Description: nested X server
//!  continuation lines start with whitespace
//!
//! Package: next-record
//! ...
//! ```
//!
//! [`Paragraphs`] streams paragraphs from any [`BufRead`] without loading
//! the whole listing. Field names are matched case-insensitively. Lines
//! starting with `#` are comments. Continuation lines are joined to the
//! previous field with `\n`.
//!
//! A line that is neither a field, a continuation, a comment, nor blank
//! makes the stream fail with [`ControlError::Malformed`]: such input is not
//! a package listing at all, which is fatal for that source. Paragraphs that
//! parse but lack required fields are handled by the typed projections in
//! [`records`] by skipping the record.

pub mod records;


pub use records::{BinaryRecord, FileEntry, SourceRecord};

use std::io::{self, BufRead};

use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// Error type
// ------------------------------------------------------------------------------------------------

/// Errors raised while reading a control-file stream.
#[derive(Debug, Error)]
pub enum ControlError {
    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A line is not valid deb822 syntax.
    #[error("malformed control data at line {line}: {content:?}")]
    Malformed {
        /// 1-based line number.
        line: usize,
        /// The offending line.
        content: String,
    },
}

// ------------------------------------------------------------------------------------------------
// Paragraph
// ------------------------------------------------------------------------------------------------

/// One deb822 paragraph: an ordered list of `(field, value)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paragraph {
    fields: Vec<(String, String)>,
}

impl Paragraph {
    /// Returns the value of `name`, matched case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns the value of `name` if present and non-empty.
    pub fn get_non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.is_empty())
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the paragraph has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Appends a field.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }
}

// ------------------------------------------------------------------------------------------------
// Paragraph stream
// ------------------------------------------------------------------------------------------------

/// Streaming iterator over the paragraphs of a control file.
///
/// After the first error the iterator is fused and yields `None`.
pub struct Paragraphs<R> {
    reader: R,
    line_no: usize,
    buf: Vec<u8>,
    done: bool,
}

/// Returns a paragraph stream over `reader`.
pub fn paragraphs<R: BufRead>(reader: R) -> Paragraphs<R> {
    Paragraphs {
        reader,
        line_no: 0,
        buf: Vec::new(),
        done: false,
    }
}

impl<R: BufRead> Paragraphs<R> {
    /// Reads the next line without its terminator. `None` at end of input.
    fn next_line(&mut self) -> Result<Option<String>, ControlError> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        self.line_no += 1;
        while matches!(self.buf.last(), Some(b'\n' | b'\r')) {
            self.buf.pop();
        }
        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }

    fn read_paragraph(&mut self) -> Result<Option<Paragraph>, ControlError> {
        let mut paragraph = Paragraph::default();

        while let Some(line) = self.next_line()? {
            if line.starts_with('#') {
                continue;
            }
            if line.trim().is_empty() {
                if paragraph.is_empty() {
                    continue; // leading / repeated separators
                }
                return Ok(Some(paragraph));
            }
            if line.starts_with([' ', '\t']) {
                match paragraph.fields.last_mut() {
                    Some((_, value)) => {
                        value.push('\n');
                        value.push_str(line.trim());
                        continue;
                    }
                    None => {
                        return Err(ControlError::Malformed {
                            line: self.line_no,
                            content: line,
                        });
                    }
                }
            }
            match line.split_once(':') {
                Some((name, value)) if !name.is_empty() && !name.contains(char::is_whitespace) => {
                    paragraph.insert(name, value.trim());
                }
                _ => {
                    return Err(ControlError::Malformed {
                        line: self.line_no,
                        content: line,
                    });
                }
            }
        }

        Ok((!paragraph.is_empty()).then_some(paragraph))
    }
}

impl<R: BufRead> Iterator for Paragraphs<R> {
    type Item = Result<Paragraph, ControlError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_paragraph() {
            Ok(Some(paragraph)) => Some(Ok(paragraph)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
