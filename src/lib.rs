//! # debsrc-index
//!
//! Resolves Debian package names (binary or source) to their owning source
//! package and version, fast enough for interactive shell use, by
//! precomputing the answer into compact, seekable index files.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use debsrc_index::{GeneratorConfig, IndexDir, Query};
//! use debsrc_index::generate::Generator;
//! use debsrc_index::source::{FsTargetReader, IndexTarget, TargetKind};
//!
//! let config = GeneratorConfig {
//!     default_release: Some("stable".into()),
//!     ..GeneratorConfig::default()
//! };
//! let index_dir = config.index_dir.clone();
//!
//! // Regenerate (usually from a background job)
//! let mut target = IndexTarget::new(TargetKind::Packages, "/srv/mirror/Packages");
//! target.release = "stable".into();
//! Generator::new(config, FsTargetReader).unwrap().generate(&[target]).unwrap();
//!
//! // Query (from any number of short-lived processes)
//! let index = IndexDir::new(index_dir);
//! if let Some(source) = index.resolve(&Query::Binary("xserver-xephyr".into())).unwrap() {
//!     println!("{} {}", source.package, source.version);
//! }
//! ```
//!
//! ## Components
//!
//! - [`version`]: packaging-version ordering.
//! - [`control`]: deb822 paragraph reader and typed package records.
//! - [`resolver`]: per-source mappings with lookup-key aliases.
//! - [`merge`]: pin-priority merge across metadata sources.
//! - [`index`]: the on-disk same-length block index format.
//! - [`write`]: atomic file replacement.
//! - [`source`]: metadata sources and their priorities.
//! - [`generate`]: the parallel regeneration pipeline.
//! - [`lookup`]: queries against a generated index directory.

pub mod control;
pub mod encoding;
pub mod generate;
pub mod index;
pub mod lookup;
pub mod merge;
pub mod resolver;
pub mod source;
pub mod version;
pub mod write;

use std::path::PathBuf;

pub use generate::{GenerateError, GenerateReport, Generator};
pub use index::{IndexError, IndexReader};
pub use lookup::{IndexDir, Query};
pub use merge::Priority;
pub use resolver::{DscRef, KeyFamily, SourceRef};
pub use version::PackageVersion;

// ------------------------------------------------------------------------------------------------
// Configuration
// ------------------------------------------------------------------------------------------------

/// Configuration for a [`Generator`].
///
/// All fields have defaults via [`GeneratorConfig::default()`] matching a
/// stock Debian system. The configuration is validated when passed to
/// [`Generator::new`].
///
/// # Example
///
/// ```rust
/// use debsrc_index::GeneratorConfig;
///
/// let config = GeneratorConfig {
///     index_dir: "/tmp/debsrc-index".into(),
///     default_release: Some("bookworm".into()),
///     status_file: None,
///     ..GeneratorConfig::default()
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Directory receiving the index files. Created if missing.
    ///
    /// Default: `/var/cache/debsrc-index`.
    pub index_dir: PathBuf,

    /// Scratch directory for temporary files. Must be on the same
    /// filesystem as `index_dir`.
    ///
    /// Default: `None` (temporary files are created in `index_dir`).
    pub temp_dir: Option<PathBuf>,

    /// Release whose targets receive [`Priority::DEFAULT_RELEASE`].
    ///
    /// Default: `None` (every release gets [`Priority::OTHER_RELEASE`]).
    pub default_release: Option<String>,

    /// Locally installed package database, merged with
    /// [`Priority::LOCAL`].
    ///
    /// Default: `/var/lib/dpkg/status`.
    pub status_file: Option<PathBuf>,

    /// Whether targets of debug-symbol archives (codename ending in
    /// `-debug`) are indexed.
    ///
    /// Default: `false`.
    pub include_debug: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            index_dir: PathBuf::from("/var/cache/debsrc-index"),
            temp_dir: None,
            default_release: None,
            status_file: Some(PathBuf::from("/var/lib/dpkg/status")),
            include_debug: false,
        }
    }
}

impl GeneratorConfig {
    /// Validates all configuration parameters.
    pub fn validate(&self) -> Result<(), GenerateError> {
        if self.index_dir.as_os_str().is_empty() {
            return Err(GenerateError::InvalidConfig(
                "index_dir must not be empty".into(),
            ));
        }
        if self
            .temp_dir
            .as_ref()
            .is_some_and(|dir| dir.as_os_str().is_empty())
        {
            return Err(GenerateError::InvalidConfig(
                "temp_dir must not be empty".into(),
            ));
        }
        if let Some(release) = self
            .default_release
            .as_ref()
            .filter(|release| release.is_empty() || release.contains(char::is_whitespace))
        {
            return Err(GenerateError::InvalidConfig(format!(
                "default_release {release:?} is not a release name"
            )));
        }
        if self
            .status_file
            .as_ref()
            .is_some_and(|file| file.as_os_str().is_empty())
        {
            return Err(GenerateError::InvalidConfig(
                "status_file must not be empty".into(),
            ));
        }
        Ok(())
    }
}
