//! # Index directory queries
//!
//! [`IndexDir`] answers the questions callers ask of a generated index
//! directory:
//!
//! - which source package (and version) does a name resolve to
//!   ([`IndexDir::resolve`], [`IndexDir::lookup_source`]),
//! - where is the `.dsc` of an exact source version
//!   ([`IndexDir::lookup_dsc`]),
//! - which names start with a prefix ([`IndexDir::complete`]).
//!
//! Every call opens the file it needs read-only, so queries are safe to
//! run while a regeneration replaces the files underneath. A missing file
//! is reported as [`IndexError::Unavailable`]; waiting for a regeneration
//! in progress is up to the caller.


use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::index::{self, IndexError, SOURCES_INDEX, URIS_INDEX};
use crate::resolver::{DscRef, KeyFamily, SourceRef};

/// A name to resolve to its source package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// A binary or source package name (bare key).
    Any(String),

    /// A binary package name, optionally qualified with `:arch`.
    Binary(String),

    /// A source package name.
    Source(String),
}

impl Query {
    /// The lookup key this query resolves through.
    pub fn key(&self) -> String {
        match self {
            Query::Any(name) => KeyFamily::Bare.key(name),
            Query::Binary(name) => {
                let name = name.split_once(':').map_or(name.as_str(), |(name, _arch)| name);
                KeyFamily::Binary.key(name)
            }
            Query::Source(name) => KeyFamily::Source.key(name),
        }
    }
}

/// Read-only view of a generated index directory.
#[derive(Debug, Clone)]
pub struct IndexDir {
    dir: PathBuf,
}

impl IndexDir {
    /// Wraps `dir`. Nothing is opened until the first query.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The index directory.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Returns `true` once `sources.index` has been published.
    pub fn is_available(&self) -> bool {
        self.dir.join(SOURCES_INDEX).is_file()
    }

    /// Looks up `key` in `sources.index`.
    ///
    /// # Errors
    ///
    /// - [`IndexError::Unavailable`] if the index has not been generated.
    /// - [`IndexError::Corrupt`] if the file is damaged or the stored value
    ///   is not `package\tversion`.
    pub fn lookup_source(&self, key: &str) -> Result<Option<SourceRef>, IndexError> {
        let Some(value) = index::lookup(self.dir.join(SOURCES_INDEX), key.as_bytes())? else {
            debug!(key, "no source for key");
            return Ok(None);
        };
        SourceRef::from_value(&value).map(Some).ok_or_else(|| {
            IndexError::Corrupt(format!(
                "value {value:?} for key {key:?} is not a source reference"
            ))
        })
    }

    /// Resolves `query` to its source package.
    pub fn resolve(&self, query: &Query) -> Result<Option<SourceRef>, IndexError> {
        self.lookup_source(&query.key())
    }

    /// Looks up the download location of exactly `source` in `uris.index`.
    ///
    /// # Errors
    ///
    /// - [`IndexError::Unavailable`] if the index has not been generated.
    /// - [`IndexError::Corrupt`] if the file is damaged or the stored value
    ///   is not `url\tsize`.
    pub fn lookup_dsc(&self, source: &SourceRef) -> Result<Option<DscRef>, IndexError> {
        let key = source.to_value();
        let Some(value) = index::lookup(self.dir.join(URIS_INDEX), key.as_bytes())? else {
            debug!(source = %source, "no download location");
            return Ok(None);
        };
        DscRef::from_value(&value).map(Some).ok_or_else(|| {
            IndexError::Corrupt(format!("value {value:?} for {source} is not a download location"))
        })
    }

    /// Returns the names of `family` starting with `prefix`, in sorted
    /// order. An empty prefix returns every name.
    ///
    /// # Errors
    ///
    /// [`IndexError::Unavailable`] if the listing has not been generated.
    pub fn complete(&self, family: KeyFamily, prefix: &str) -> Result<Vec<String>, IndexError> {
        let path = self.dir.join(family.listing_file());
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(IndexError::Unavailable { path });
            }
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.starts_with(prefix) {
                names.push(line);
            }
        }
        Ok(names)
    }
}
