//! Typed views of binary-package and source-package paragraphs.
//!
//! Each projection returns `None` when a required field is missing or
//! unparseable. Callers count such paragraphs as skipped records.

use super::Paragraph;

/// A binary package as listed in a `Packages` file or the dpkg status
/// database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryRecord {
    /// Binary package name.
    pub package: String,

    /// Binary package version.
    pub version: String,

    /// Raw `Source:` field: `name` or `name (version)`. `None` when the
    /// binary package is built from a source package of the same name and
    /// version.
    pub source: Option<String>,
}

impl BinaryRecord {
    /// Builds a record from a paragraph. Requires `Package` and `Version`.
    pub fn from_paragraph(paragraph: &Paragraph) -> Option<Self> {
        Some(Self {
            package: paragraph.get_non_empty("Package")?.to_string(),
            version: paragraph.get_non_empty("Version")?.to_string(),
            source: paragraph.get_non_empty("Source").map(str::to_string),
        })
    }
}

/// One file referenced by a source package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// File name relative to the package directory.
    pub name: String,

    /// File size in bytes.
    pub size: u64,
}

/// A source package as listed in a `Sources` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    /// Source package name.
    pub package: String,

    /// Source package version.
    pub version: String,

    /// Pool directory relative to the repository root.
    pub directory: String,

    /// Files making up the source package (`.dsc`, tarballs, ...).
    pub files: Vec<FileEntry>,
}

impl SourceRecord {
    /// Builds a record from a paragraph. Requires `Package`, `Version` and
    /// a well-formed `Files` field (`<md5> <size> <name>` per line).
    pub fn from_paragraph(paragraph: &Paragraph) -> Option<Self> {
        let files = paragraph
            .get("Files")?
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(parse_file_line)
            .collect::<Option<Vec<_>>>()?;

        Some(Self {
            package: paragraph.get_non_empty("Package")?.to_string(),
            version: paragraph.get_non_empty("Version")?.to_string(),
            directory: paragraph.get("Directory").unwrap_or_default().to_string(),
            files,
        })
    }

    /// Total size of all referenced files.
    pub fn total_size(&self) -> u64 {
        self.files
            .iter()
            .fold(0u64, |acc, f| acc.saturating_add(f.size))
    }

    /// Name of the first referenced `.dsc` file.
    pub fn dsc_file(&self) -> Option<&str> {
        self.files
            .iter()
            .map(|f| f.name.as_str())
            .find(|name| name.ends_with(".dsc"))
    }
}

fn parse_file_line(line: &str) -> Option<FileEntry> {
    let mut parts = line.split_whitespace();
    let _checksum = parts.next()?;
    let size = parts.next()?.parse().ok()?;
    let name = parts.next()?.to_string();
    if parts.next().is_some() {
        return None;
    }
    Some(FileEntry { name, size })
}
