//! # Source resolution
//!
//! Turns the raw package records of one metadata source into the
//! per-source mappings that are later merged across sources:
//!
//! - **Sources mapping** (`LookupKey → SourceRef`): every binary record
//!   names the source package it was built from. Four alias keys are
//!   emitted per record (bare binary name, bare source name, `src:` +
//!   source name, `bin:` + binary name); for every key the highest source
//!   version seen in this metadata source wins.
//! - **URI mapping** (`SourceRef → DscRef`): every source record yields the
//!   download location of its `.dsc` and the total size of its files.
//!
//! Malformed records are skipped and counted; they never fail the source.
//! Only a stream that is not a package listing at all
//! ([`ControlError`]) aborts the build of that source.

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::io::BufRead;

use thiserror::Error;
use tracing::{debug, trace};

use crate::control::{self, BinaryRecord, ControlError, SourceRecord};
use crate::version::{PackageVersion, VersionError};

/// Separator between the fields of an encoded value (and of URI keys).
pub const FIELD_SEPARATOR: char = '\t';

// ------------------------------------------------------------------------------------------------
// Error type
// ------------------------------------------------------------------------------------------------

/// Why a single package record could not be resolved.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    /// The `Source:` field is not `name` or `name (version)`.
    #[error("malformed Source field {0:?}")]
    MalformedSource(String),

    /// The version embedded in the `Source:` field is invalid.
    #[error("invalid version in Source field {field:?}: {error}")]
    InvalidVersion {
        /// The raw `Source:` field.
        field: String,
        /// The underlying version error.
        error: VersionError,
    },

    /// A name, version or URL is empty or contains whitespace or control
    /// characters, so it cannot be stored as one field of an index entry.
    #[error("invalid {field} {value:?}")]
    InvalidField {
        /// Which field was rejected.
        field: &'static str,
        /// The raw value.
        value: String,
    },
}

/// Rejects values that would break the tab-separated, line-oriented index
/// entries.
fn check_field(field: &'static str, value: &str) -> Result<(), RecordError> {
    if value.is_empty() || value.contains(|c: char| c.is_whitespace() || c.is_control()) {
        return Err(RecordError::InvalidField {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

// ------------------------------------------------------------------------------------------------
// Value types
// ------------------------------------------------------------------------------------------------

/// A buildable source package at a specific version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceRef {
    /// Source package name.
    pub package: String,

    /// Source package version.
    pub version: PackageVersion,
}

impl SourceRef {
    /// Creates a reference to `package` at `version`.
    pub fn new(package: impl Into<String>, version: PackageVersion) -> Self {
        Self {
            package: package.into(),
            version,
        }
    }

    /// Flattens the reference to `package\tversion`.
    ///
    /// This is both the value stored in `sources.index` and the key used in
    /// `uris.index`.
    pub fn to_value(&self) -> String {
        format!("{}{FIELD_SEPARATOR}{}", self.package, self.version)
    }

    /// Parses a `package\tversion` value. Exactly two non-empty fields are
    /// required.
    pub fn from_value(value: &str) -> Option<Self> {
        let (package, version) = split_pair(value)?;
        Some(Self::new(package, PackageVersion::new_unchecked(version)))
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.package, self.version)
    }
}

/// Download location and total byte size of one source package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DscRef {
    /// Absolute URL of the `.dsc` file.
    pub url: String,

    /// Size of the `.dsc` plus every file it references.
    pub size: u64,
}

impl DscRef {
    /// Flattens the reference to `url\tsize`.
    pub fn to_value(&self) -> String {
        format!("{}{FIELD_SEPARATOR}{}", self.url, self.size)
    }

    /// Parses a `url\tsize` value with a decimal size.
    pub fn from_value(value: &str) -> Option<Self> {
        let (url, size) = split_pair(value)?;
        Some(Self {
            url: url.to_string(),
            size: size.parse().ok()?,
        })
    }
}

fn split_pair(value: &str) -> Option<(&str, &str)> {
    let mut fields = value.trim().split(FIELD_SEPARATOR);
    let first = fields.next().filter(|f| !f.is_empty())?;
    let second = fields.next().filter(|f| !f.is_empty())?;
    if fields.next().is_some() {
        return None;
    }
    Some((first, second))
}

// ------------------------------------------------------------------------------------------------
// Lookup key families
// ------------------------------------------------------------------------------------------------

/// The disjoint families lookup keys fall into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyFamily {
    /// `bin:` + binary package name.
    Binary,

    /// `src:` + source package name.
    Source,

    /// Unprefixed binary or source package name.
    Bare,
}

impl KeyFamily {
    /// All families, in listing order.
    pub const ALL: [KeyFamily; 3] = [KeyFamily::Binary, KeyFamily::Source, KeyFamily::Bare];

    /// Key prefix of the family.
    pub fn prefix(self) -> &'static str {
        match self {
            KeyFamily::Binary => "bin:",
            KeyFamily::Source => "src:",
            KeyFamily::Bare => "",
        }
    }

    /// Name of the completion listing holding this family's names.
    pub fn listing_file(self) -> &'static str {
        match self {
            KeyFamily::Binary => "completion.bin.txt",
            KeyFamily::Source => "completion.src.txt",
            KeyFamily::Bare => "completion.both.txt",
        }
    }

    /// Builds the lookup key for `name` in this family.
    pub fn key(self, name: &str) -> String {
        format!("{}{name}", self.prefix())
    }

    /// Splits `key` into its family and the name with the prefix stripped.
    pub fn classify(key: &str) -> (KeyFamily, &str) {
        if let Some(name) = key.strip_prefix(KeyFamily::Binary.prefix()) {
            (KeyFamily::Binary, name)
        } else if let Some(name) = key.strip_prefix(KeyFamily::Source.prefix()) {
            (KeyFamily::Source, name)
        } else {
            (KeyFamily::Bare, key)
        }
    }
}

/// Returns the four lookup keys a binary package built from `source`
/// populates.
pub fn lookup_keys(binary: &str, source: &str) -> [String; 4] {
    [
        source.to_string(),
        binary.to_string(),
        KeyFamily::Source.key(source),
        KeyFamily::Binary.key(binary),
    ]
}

// ------------------------------------------------------------------------------------------------
// Binary record resolution
// ------------------------------------------------------------------------------------------------

/// Derives the source package a binary record was built from.
///
/// - No `Source:` field: the binary's own name and version.
/// - `Source: name`: that name at the binary's version.
/// - `Source: name (version)`: that name at the embedded version.
///
/// # Errors
///
/// [`RecordError`] if the record's own name or version is empty or holds
/// whitespace or control characters, if the `Source:` field has unbalanced
/// parentheses or an unusable name, or if its embedded version is invalid.
pub fn resolve_binary(record: &BinaryRecord) -> Result<SourceRef, RecordError> {
    check_field("Package", &record.package)?;
    check_field("Version", &record.version)?;

    let Some(field) = record.source.as_deref().map(str::trim) else {
        return Ok(SourceRef::new(
            &record.package,
            PackageVersion::new_unchecked(&record.version),
        ));
    };

    let malformed = || RecordError::MalformedSource(field.to_string());

    if !field.contains(['(', ')']) {
        check_field("Source", field).map_err(|_| malformed())?;
        return Ok(SourceRef::new(
            field,
            PackageVersion::new_unchecked(&record.version),
        ));
    }

    let inner = field.strip_suffix(')').ok_or_else(malformed)?;
    let (name, version) = inner.split_once(" (").ok_or_else(malformed)?;
    if check_field("Source", name).is_err() || version.contains(['(', ')']) {
        return Err(malformed());
    }
    let version = PackageVersion::parse(version).map_err(|error| RecordError::InvalidVersion {
        field: field.to_string(),
        error,
    })?;
    Ok(SourceRef::new(name, version))
}

// ------------------------------------------------------------------------------------------------
// Per-source sources mapping
// ------------------------------------------------------------------------------------------------

/// The sources mapping of one metadata source.
#[derive(Debug, Default)]
pub struct SourceIndex {
    /// Lookup key → highest-versioned source reference.
    pub entries: HashMap<String, SourceRef>,

    /// Number of records that contributed to `entries`.
    pub records: usize,

    /// Number of records skipped as malformed.
    pub skipped: usize,
}

/// Folds binary records of one metadata source into a [`SourceIndex`].
#[derive(Debug, Default)]
pub struct SourceIndexBuilder {
    index: SourceIndex,
}

impl SourceIndexBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `record` and inserts all four of its lookup keys. Malformed
    /// records are counted as skipped.
    pub fn add(&mut self, record: &BinaryRecord) {
        match resolve_binary(record) {
            Ok(source) => {
                for key in lookup_keys(&record.package, &source.package) {
                    self.insert(key, source.clone());
                }
                self.index.records += 1;
            }
            Err(e) => {
                debug!(package = %record.package, error = %e, "skipping binary record");
                self.skip();
            }
        }
    }

    /// Inserts `key`, replacing an existing entry only when `source` has a
    /// strictly greater version. Equal versions keep the first seen.
    pub fn insert(&mut self, key: String, source: SourceRef) {
        match self.index.entries.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(source);
            }
            Entry::Occupied(mut slot) => {
                if source.version.compare(&slot.get().version).is_gt() {
                    trace!(
                        key = %slot.key(),
                        from = %slot.get().version,
                        to = %source.version,
                        "newer version"
                    );
                    slot.insert(source);
                }
            }
        }
    }

    /// Counts one record as skipped.
    pub fn skip(&mut self) {
        self.index.skipped += 1;
    }

    /// Returns the finished mapping.
    pub fn finish(self) -> SourceIndex {
        self.index
    }
}

/// Reads a `Packages` listing and builds its sources mapping.
///
/// # Errors
///
/// [`ControlError`] if the stream cannot be read or is not deb822 data.
pub fn build_source_index<R: BufRead>(reader: R) -> Result<SourceIndex, ControlError> {
    let mut builder = SourceIndexBuilder::new();
    for paragraph in control::paragraphs(reader) {
        match BinaryRecord::from_paragraph(&paragraph?) {
            Some(record) => builder.add(&record),
            None => builder.skip(),
        }
    }

    let index = builder.finish();
    debug!(
        keys = index.entries.len(),
        records = index.records,
        skipped = index.skipped,
        "built per-source sources mapping"
    );
    Ok(index)
}

// ------------------------------------------------------------------------------------------------
// Per-source URI mapping
// ------------------------------------------------------------------------------------------------

/// The URI mapping of one metadata source.
#[derive(Debug, Default)]
pub struct UriIndex {
    /// Exact source reference → download location.
    pub entries: HashMap<SourceRef, DscRef>,

    /// Number of records that contributed to `entries`.
    pub records: usize,

    /// Number of records skipped as malformed or lacking a `.dsc`.
    pub skipped: usize,
}

/// Builds the download location of `record` under `repo_uri`.
///
/// Returns `None` if the record references no `.dsc` file.
pub fn dsc_ref(record: &SourceRecord, repo_uri: &str) -> Option<DscRef> {
    let dsc = record.dsc_file()?;
    Some(DscRef {
        url: format!("{repo_uri}{}", join_path(&record.directory, dsc)),
        size: record.total_size(),
    })
}

fn join_path(directory: &str, file: &str) -> String {
    let directory = directory.trim_end_matches('/');
    if directory.is_empty() {
        file.to_string()
    } else {
        format!("{directory}/{file}")
    }
}

/// Reads a `Sources` listing and builds its URI mapping.
///
/// Within one listing the first record for a given source reference wins.
/// Records whose name, version or resulting URL cannot be stored in an
/// index entry are skipped.
///
/// # Errors
///
/// [`ControlError`] if the stream cannot be read or is not deb822 data.
pub fn build_uri_index<R: BufRead>(
    reader: R,
    repo_uri: &str,
) -> Result<UriIndex, ControlError> {
    let mut index = UriIndex::default();

    for paragraph in control::paragraphs(reader) {
        let paragraph = paragraph?;
        let Some((record, dsc)) = SourceRecord::from_paragraph(&paragraph)
            .and_then(|record| dsc_ref(&record, repo_uri).map(|dsc| (record, dsc)))
        else {
            debug!(package = ?paragraph.get("Package"), "skipping source record");
            index.skipped += 1;
            continue;
        };

        if let Err(e) = check_field("Package", &record.package)
            .and_then(|()| check_field("Version", &record.version))
            .and_then(|()| check_field("URL", &dsc.url))
        {
            debug!(package = %record.package, error = %e, "skipping source record");
            index.skipped += 1;
            continue;
        }

        let source = SourceRef::new(record.package, PackageVersion::new_unchecked(record.version));
        index.entries.entry(source).or_insert(dsc);
        index.records += 1;
    }

    debug!(
        keys = index.entries.len(),
        records = index.records,
        skipped = index.skipped,
        "built per-source URI mapping"
    );
    Ok(index)
}
