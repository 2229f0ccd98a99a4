//! # Index regeneration
//!
//! The [`Generator`] rebuilds every artifact of the index directory from
//! the configured metadata sources:
//!
//! ```text
//!  targets ──► one worker per target ──► per-source mapping ─┐
//!              (read, resolve, fold)                         │ barrier
//!                                                            ▼
//!                                                  priority merge
//!                                                            │
//!              ┌───────────────┬──────────────┬──────────────┤
//!              ▼               ▼              ▼              ▼
//!        sources.index  completion.bin  completion.src  completion.both
//!                 (one staged file per artifact, second barrier)
//!                                                            │
//!                                                            ▼
//!                                              rename into place
//! ```
//!
//! `uris.index` is built the same way from the `Sources` targets.
//!
//! Workers share no mutable state: each reads its own target and returns
//! its mapping into a private slot. The first error in enumeration order
//! aborts the run after all workers have joined. Artifacts are renamed into
//! place only after every one of them was staged, so a failed encode leaves
//! the previous index and listings untouched.

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::GeneratorConfig;
use crate::index::{IndexError, IndexWriter, SOURCES_INDEX, URIS_INDEX};
use crate::merge::{self, Prioritized};
use crate::resolver::{self, DscRef, KeyFamily, SourceRef};
use crate::source::{
    FsTargetReader, IndexTarget, SourceError, TargetKind, TargetReader, assign_priorities,
    local_status_target,
};
use crate::write::{StagedFile, stage};

// ------------------------------------------------------------------------------------------------
// Error type
// ------------------------------------------------------------------------------------------------

/// Errors aborting a regeneration run.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// Invalid configuration parameter.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Underlying I/O error (directory creation, atomic writes).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A metadata source could not be read.
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// The merged mapping could not be encoded.
    #[error("index error: {0}")]
    Index(#[from] IndexError),

    /// A worker thread panicked.
    #[error("internal error: {0}")]
    Internal(String),
}

// ------------------------------------------------------------------------------------------------
// Reports
// ------------------------------------------------------------------------------------------------

/// Statistics of one generated index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArtifactReport {
    /// Number of targets read.
    pub targets: usize,

    /// Number of keys in the merged index.
    pub keys: usize,

    /// Number of records that contributed to a per-source mapping.
    pub records: usize,

    /// Number of malformed records skipped.
    pub skipped: usize,

    /// Size of the encoded index in bytes.
    pub bytes: u64,
}

/// Statistics of a full regeneration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GenerateReport {
    /// `sources.index` and its completion listings.
    pub sources: ArtifactReport,

    /// `uris.index`.
    pub uris: ArtifactReport,
}

/// Output files staged concurrently from one merged sources mapping.
#[derive(Debug, Clone, Copy)]
enum SourcesArtifact {
    Index,
    Listing(KeyFamily),
}

// ------------------------------------------------------------------------------------------------
// Generator
// ------------------------------------------------------------------------------------------------

/// Rebuilds the index directory.
///
/// # Example
///
/// ```rust,no_run
/// use debsrc_index::GeneratorConfig;
/// use debsrc_index::generate::Generator;
/// use debsrc_index::source::{FsTargetReader, parse_index_targets};
///
/// let listing = std::process::Command::new("apt-get").arg("indextargets").output().unwrap();
/// let targets = parse_index_targets(&listing.stdout[..]).unwrap();
///
/// let generator = Generator::new(GeneratorConfig::default(), FsTargetReader).unwrap();
/// let report = generator.generate(&targets).unwrap();
/// println!("{} lookup keys", report.sources.keys);
/// ```
pub struct Generator<R = FsTargetReader> {
    config: GeneratorConfig,
    reader: R,
}

impl<R: TargetReader> Generator<R> {
    /// Creates a generator after validating `config`.
    ///
    /// # Errors
    ///
    /// [`GenerateError::InvalidConfig`] if the configuration is invalid.
    pub fn new(config: GeneratorConfig, reader: R) -> Result<Self, GenerateError> {
        config.validate()?;
        Ok(Self { config, reader })
    }

    /// The active configuration.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Regenerates `sources.index`, the completion listings and
    /// `uris.index`.
    pub fn generate(&self, targets: &[IndexTarget]) -> Result<GenerateReport, GenerateError> {
        let sources = self.generate_sources(targets)?;
        let uris = self.generate_uris(targets)?;
        Ok(GenerateReport { sources, uris })
    }

    /// Regenerates `sources.index` and the three completion listings from
    /// the `Packages` targets plus the local status file.
    pub fn generate_sources(
        &self,
        targets: &[IndexTarget],
    ) -> Result<ArtifactReport, GenerateError> {
        let mut targets = self.select(targets, TargetKind::Packages);
        if let Some(status) = &self.config.status_file {
            targets.push(local_status_target(status));
        }

        let indices = run_parallel(&targets, |target| {
            let stream = self.reader.open(target)?;
            resolver::build_source_index(stream)
                .map_err(|e| SourceError::from_control(target, e).into())
        })?;

        let mut report = ArtifactReport {
            targets: targets.len(),
            ..ArtifactReport::default()
        };
        let prioritized: Vec<Prioritized<String, SourceRef>> = targets
            .iter()
            .zip(indices)
            .map(|(target, index)| {
                report.records += index.records;
                report.skipped += index.skipped;
                Prioritized::new(target.priority, index.entries)
            })
            .collect();

        let merged = merge::merge(prioritized);
        let sorted_keys = merge::sorted_keys(&merged);
        report.keys = merged.len();

        self.create_index_dir()?;
        let artifacts = [
            SourcesArtifact::Index,
            SourcesArtifact::Listing(KeyFamily::Binary),
            SourcesArtifact::Listing(KeyFamily::Source),
            SourcesArtifact::Listing(KeyFamily::Bare),
        ];
        let staged = run_parallel(&artifacts, |artifact| match *artifact {
            SourcesArtifact::Index => self.stage_index(
                SOURCES_INDEX,
                merged
                    .iter()
                    .map(|(key, source)| (key.as_str(), source.to_value())),
            ),
            SourcesArtifact::Listing(family) => self.stage_listing(family, &sorted_keys),
        })?;
        report.bytes = staged[0].1;
        for (file, _) in staged {
            file.commit()?;
        }

        info!(
            targets = report.targets,
            keys = report.keys,
            skipped = report.skipped,
            "sources index written"
        );
        Ok(report)
    }

    /// Regenerates `uris.index` from the `Sources` targets.
    pub fn generate_uris(&self, targets: &[IndexTarget]) -> Result<ArtifactReport, GenerateError> {
        let targets = self.select(targets, TargetKind::Sources);

        let indices = run_parallel(&targets, |target| {
            let stream = self.reader.open(target)?;
            resolver::build_uri_index(stream, &target.repo_uri)
                .map_err(|e| SourceError::from_control(target, e).into())
        })?;

        let mut report = ArtifactReport {
            targets: targets.len(),
            ..ArtifactReport::default()
        };
        let prioritized: Vec<Prioritized<SourceRef, DscRef>> = targets
            .iter()
            .zip(indices)
            .map(|(target, index)| {
                report.records += index.records;
                report.skipped += index.skipped;
                Prioritized::new(target.priority, index.entries)
            })
            .collect();

        let merged: HashMap<SourceRef, DscRef> = merge::merge(prioritized);
        report.keys = merged.len();

        self.create_index_dir()?;
        let (file, bytes) = self.stage_index(
            URIS_INDEX,
            merged
                .iter()
                .map(|(source, dsc)| (source.to_value(), dsc.to_value())),
        )?;
        file.commit()?;
        report.bytes = bytes;

        info!(targets = report.targets, keys = report.keys, "uris index written");
        Ok(report)
    }

    /// Copies the targets of `kind`, assigns their priorities and drops
    /// debug archives unless configured otherwise.
    fn select(&self, targets: &[IndexTarget], kind: TargetKind) -> Vec<IndexTarget> {
        let mut selected: Vec<IndexTarget> = targets
            .iter()
            .filter(|target| target.kind == kind)
            .filter(|target| {
                let keep = self.config.include_debug || !target.is_debug();
                if !keep {
                    debug!(
                        codename = %target.codename,
                        filename = %target.filename.display(),
                        "skipping debug target"
                    );
                }
                keep
            })
            .cloned()
            .collect();
        assign_priorities(&mut selected, self.config.default_release.as_deref());
        selected
    }

    fn create_index_dir(&self) -> Result<(), GenerateError> {
        fs::create_dir_all(&self.config.index_dir)?;
        Ok(())
    }

    fn destination(&self, name: &str) -> PathBuf {
        self.config.index_dir.join(name)
    }

    /// Encodes `entries` into a staged `name`. Returns the staged file and
    /// its size.
    fn stage_index<K, V>(
        &self,
        name: &str,
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> Result<(StagedFile, u64), GenerateError>
    where
        K: AsRef<[u8]>,
        V: AsRef<str>,
    {
        let (file, stats) = stage(
            self.destination(name),
            self.config.temp_dir.as_deref(),
            |w| IndexWriter::new(w).encode(entries).map_err(GenerateError::from),
        )?;
        debug!(file = name, keys = stats.keys, bytes = stats.bytes_written, "index encoded");
        Ok((file, stats.bytes_written))
    }

    /// Stages the names of `family` from `sorted_keys`, prefix stripped, one
    /// per line. Returns the staged file and the number of bytes written.
    fn stage_listing(
        &self,
        family: KeyFamily,
        sorted_keys: &[&String],
    ) -> Result<(StagedFile, u64), GenerateError> {
        let name = family.listing_file();
        stage(self.destination(name), self.config.temp_dir.as_deref(), |w| {
            let mut bytes = 0u64;
            for key in sorted_keys {
                let (key_family, stripped) = KeyFamily::classify(key);
                if key_family == family {
                    writeln!(w, "{stripped}")?;
                    bytes += stripped.len() as u64 + 1;
                }
            }
            debug!(file = name, bytes, "completion listing staged");
            Ok::<u64, GenerateError>(bytes)
        })
    }
}

// ------------------------------------------------------------------------------------------------
// Scoped workers
// ------------------------------------------------------------------------------------------------

/// Runs `work` once per item on scoped threads and waits for all of them.
///
/// Results come back in item order. The first error in item order is
/// returned; a panicking worker becomes [`GenerateError::Internal`].
fn run_parallel<T, U, F>(items: &[T], work: F) -> Result<Vec<U>, GenerateError>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> Result<U, GenerateError> + Sync,
{
    let work = &work;
    let joined = crossbeam::scope(|s| {
        let handles: Vec<_> = items
            .iter()
            .map(|item| s.spawn(move |_| work(item)))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join())
            .collect::<Vec<_>>()
    })
    .map_err(|_| GenerateError::Internal("worker scope panicked".into()))?;

    joined
        .into_iter()
        .enumerate()
        .map(|(i, result)| match result {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(worker = i, "worker panicked");
                Err(GenerateError::Internal(format!("worker {i} panicked")))
            }
        })
        .collect()
}
