//! # Metadata sources
//!
//! An [`IndexTarget`] is one package listing known to the package manager
//! (a `Packages` or `Sources` file of one release of one repository), as
//! reported by `apt-get indextargets`. Each target carries the pin
//! [`Priority`] its mapping is merged with:
//!
//! | Target                          | Priority                       |
//! |---------------------------------|--------------------------------|
//! | release == default release      | [`Priority::DEFAULT_RELEASE`]  |
//! | any other release               | [`Priority::OTHER_RELEASE`]    |
//! | locally installed packages      | [`Priority::LOCAL`]            |
//!
//! Obtaining the raw bytes of a target is delegated to a [`TargetReader`].
//! [`FsTargetReader`] opens targets as plain (uncompressed) files; other
//! implementations may shell out to the package manager's own helpers.

#[cfg(test)]
mod tests;

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::control::{self, ControlError, Paragraph};
use crate::merge::Priority;

/// Codename suffix of debug-symbol archives.
const DEBUG_CODENAME_SUFFIX: &str = "-debug";

// ------------------------------------------------------------------------------------------------
// Error type
// ------------------------------------------------------------------------------------------------

/// A metadata source could not be read. Fatal to the regeneration run.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The target's listing cannot be opened or read.
    #[error("cannot read {}: {source}", path.display())]
    Unavailable {
        /// Listing path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The target's listing is not deb822 data.
    #[error("cannot parse {}: {source}", path.display())]
    Malformed {
        /// Listing path.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: ControlError,
    },
}

impl SourceError {
    /// Attributes a listing parse error to `target`.
    pub fn from_control(target: &IndexTarget, error: ControlError) -> Self {
        match error {
            ControlError::Io(source) => SourceError::Unavailable {
                path: target.filename.clone(),
                source,
            },
            source => SourceError::Malformed {
                path: target.filename.clone(),
                source,
            },
        }
    }
}

// ------------------------------------------------------------------------------------------------
// Index targets
// ------------------------------------------------------------------------------------------------

/// What kind of package listing a target is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetKind {
    /// Binary package listing.
    Packages,

    /// Source package listing.
    Sources,

    /// Anything else (`Contents`, `Translations`, ...). Ignored.
    Other(String),
}

impl TargetKind {
    /// Classifies a `ShortDesc` value.
    pub fn from_short_desc(short_desc: &str) -> Self {
        match short_desc {
            "Packages" => TargetKind::Packages,
            "Sources" => TargetKind::Sources,
            other => TargetKind::Other(other.to_string()),
        }
    }
}

/// One package listing and the priority its contents are merged with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexTarget {
    /// Listing kind.
    pub kind: TargetKind,

    /// Location of the listing.
    pub filename: PathBuf,

    /// Release codename (`bookworm`, `bookworm-debug`, ...).
    pub codename: String,

    /// Release name (`stable`, `testing`, ...).
    pub release: String,

    /// Repository root URI, with trailing slash.
    pub repo_uri: String,

    /// Pin priority.
    pub priority: Priority,
}

impl IndexTarget {
    /// Creates a target with [`Priority::OTHER_RELEASE`].
    pub fn new(kind: TargetKind, filename: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            filename: filename.into(),
            codename: String::new(),
            release: String::new(),
            repo_uri: String::new(),
            priority: Priority::OTHER_RELEASE,
        }
    }

    /// Builds a target from an `apt-get indextargets` paragraph. Requires
    /// `ShortDesc` and `Filename`.
    pub fn from_paragraph(paragraph: &Paragraph) -> Option<Self> {
        let mut target = Self::new(
            TargetKind::from_short_desc(paragraph.get_non_empty("ShortDesc")?),
            paragraph.get_non_empty("Filename")?,
        );
        target.codename = paragraph.get("Codename").unwrap_or_default().to_string();
        target.release = paragraph.get("Release").unwrap_or_default().to_string();
        target.repo_uri = paragraph.get("Repo-URI").unwrap_or_default().to_string();
        Some(target)
    }

    /// Returns `true` for debug-symbol archives.
    pub fn is_debug(&self) -> bool {
        self.codename.ends_with(DEBUG_CODENAME_SUFFIX)
    }
}

/// Parses an `apt-get indextargets` listing.
///
/// Paragraphs lacking `ShortDesc` or `Filename` are skipped.
pub fn parse_index_targets<R: BufRead>(reader: R) -> Result<Vec<IndexTarget>, ControlError> {
    let mut targets = Vec::new();
    for paragraph in control::paragraphs(reader) {
        match IndexTarget::from_paragraph(&paragraph?) {
            Some(target) => targets.push(target),
            None => debug!("skipping index target without ShortDesc or Filename"),
        }
    }
    Ok(targets)
}

/// Assigns pin priorities: [`Priority::DEFAULT_RELEASE`] to targets of
/// `default_release`, [`Priority::OTHER_RELEASE`] to all others.
///
/// With no default release configured every target gets
/// [`Priority::OTHER_RELEASE`].
pub fn assign_priorities(targets: &mut [IndexTarget], default_release: Option<&str>) {
    for target in targets {
        target.priority = match default_release {
            Some(release) if !release.is_empty() && target.release == release => {
                Priority::DEFAULT_RELEASE
            }
            _ => Priority::OTHER_RELEASE,
        };
    }
}

/// The locally installed package database as a `Packages` target with
/// [`Priority::LOCAL`].
pub fn local_status_target(path: impl Into<PathBuf>) -> IndexTarget {
    IndexTarget {
        priority: Priority::LOCAL,
        ..IndexTarget::new(TargetKind::Packages, path)
    }
}

// ------------------------------------------------------------------------------------------------
// Target readers
// ------------------------------------------------------------------------------------------------

/// Yields the raw, uncompressed listing of one target.
///
/// Called concurrently from one worker per target.
pub trait TargetReader: Send + Sync {
    /// Opens the listing of `target` for streaming.
    fn open(&self, target: &IndexTarget) -> Result<Box<dyn BufRead + Send>, SourceError>;
}

/// Reads targets as plain files on the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsTargetReader;

impl FsTargetReader {
    fn open_path(path: &Path) -> Result<Box<dyn BufRead + Send>, SourceError> {
        let file = File::open(path).map_err(|source| SourceError::Unavailable {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Box::new(BufReader::new(file)))
    }
}

impl TargetReader for FsTargetReader {
    fn open(&self, target: &IndexTarget) -> Result<Box<dyn BufRead + Send>, SourceError> {
        Self::open_path(&target.filename)
    }
}
