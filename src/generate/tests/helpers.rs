use std::collections::HashMap;
use std::io::{BufRead, Cursor};
use std::path::{Path, PathBuf};

use tracing_subscriber::EnvFilter;

use crate::GeneratorConfig;
use crate::source::{IndexTarget, SourceError, TargetKind, TargetReader};

/// Initialize tracing subscriber controlled by `RUST_LOG` env var.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Config writing into `dir` without a local status file.
pub fn config_in(dir: &Path) -> GeneratorConfig {
    init_tracing();
    GeneratorConfig {
        index_dir: dir.to_path_buf(),
        status_file: None,
        ..GeneratorConfig::default()
    }
}

/// In-memory listings keyed by target filename.
#[derive(Default)]
pub struct MemoryReader {
    listings: HashMap<PathBuf, String>,
}

impl MemoryReader {
    pub fn with(mut self, filename: &str, listing: &str) -> Self {
        self.listings.insert(PathBuf::from(filename), listing.to_string());
        self
    }
}

impl TargetReader for MemoryReader {
    fn open(&self, target: &IndexTarget) -> Result<Box<dyn BufRead + Send>, SourceError> {
        match self.listings.get(&target.filename) {
            Some(listing) => Ok(Box::new(Cursor::new(listing.clone().into_bytes()))),
            None => Err(SourceError::Unavailable {
                path: target.filename.clone(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }),
        }
    }
}

/// Reader whose workers panic.
pub struct PanickingReader;

impl TargetReader for PanickingReader {
    fn open(&self, target: &IndexTarget) -> Result<Box<dyn BufRead + Send>, SourceError> {
        panic!("cannot open {}", target.filename.display());
    }
}

pub fn target(kind: TargetKind, filename: &str, release: &str) -> IndexTarget {
    let mut target = IndexTarget::new(kind, filename);
    target.release = release.to_string();
    target.codename = format!("{release}-codename");
    target.repo_uri = format!("http://{release}.example.org/debian/");
    target
}

pub fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}
