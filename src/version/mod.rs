//! # Package version ordering
//!
//! Implements the Debian packaging-version policy:
//!
//! ```text
//! [epoch:]upstream_version[-debian_revision]
//! ```
//!
//! Versions are compared segment by segment (epoch, upstream, revision).
//! Within a segment, alternating non-digit and digit runs are compared:
//!
//! - digit runs compare numerically (leading zeros are ignored, no overflow),
//! - non-digit runs compare character by character where `~` sorts before
//!   the end of the run, the end of the run sorts before letters, and
//!   letters sort before every other character.
//!
//! [`compare`] never fails. Malformed strings still yield a deterministic
//! order because the merge that consumes it is best-effort.
//! [`PackageVersion::parse`] is the strict entry point used when a version
//! embedded in a `Source:` field must be validated.


use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// Error type
// ------------------------------------------------------------------------------------------------

/// Reasons a version string is rejected by [`PackageVersion::parse`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionError {
    /// The version string is empty (after trimming).
    #[error("version string is empty")]
    Empty,

    /// The version string contains whitespace.
    #[error("version string has embedded spaces")]
    EmbeddedSpace,

    /// The epoch is not a non-negative decimal number.
    #[error("invalid epoch {0:?}")]
    InvalidEpoch(String),

    /// Nothing follows the epoch separator.
    #[error("nothing after colon in version number")]
    EmptyUpstream,

    /// The upstream version does not start with a digit.
    #[error("version number does not start with digit")]
    UpstreamNotDigit,

    /// The upstream version contains a character outside `[A-Za-z0-9.+~:-]`.
    #[error("invalid character {0:?} in version number")]
    InvalidUpstreamChar(char),

    /// The revision contains a character outside `[A-Za-z0-9.+~]`.
    #[error("invalid character {0:?} in revision number")]
    InvalidRevisionChar(char),
}

// ------------------------------------------------------------------------------------------------
// PackageVersion
// ------------------------------------------------------------------------------------------------

/// An opaque, comparable package version string.
///
/// Equality and hashing are on the exact string value. Ordering is exposed
/// through [`PackageVersion::compare`] rather than `Ord`, because two
/// distinct strings (`1.0` and `1.00`) may compare equal under the
/// packaging policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageVersion(String);

impl PackageVersion {
    /// Validates `input` against the packaging-version syntax.
    ///
    /// Surrounding whitespace is trimmed before validation.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(VersionError::Empty);
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(VersionError::EmbeddedSpace);
        }

        let rest = match trimmed.find(':') {
            Some(colon) => {
                let epoch = &trimmed[..colon];
                if epoch.is_empty() || !epoch.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(VersionError::InvalidEpoch(epoch.to_string()));
                }
                &trimmed[colon + 1..]
            }
            None => trimmed,
        };
        if rest.is_empty() {
            return Err(VersionError::EmptyUpstream);
        }

        let (upstream, revision) = match rest.rfind('-') {
            Some(hyphen) => (&rest[..hyphen], &rest[hyphen + 1..]),
            None => (rest, ""),
        };

        if !upstream.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(VersionError::UpstreamNotDigit);
        }
        if let Some(c) = upstream
            .chars()
            .find(|&c| !c.is_ascii_alphanumeric() && !".-+~:".contains(c))
        {
            return Err(VersionError::InvalidUpstreamChar(c));
        }
        if let Some(c) = revision
            .chars()
            .find(|&c| !c.is_ascii_alphanumeric() && !".+~".contains(c))
        {
            return Err(VersionError::InvalidRevisionChar(c));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Wraps `input` without validation.
    ///
    /// Used for versions read from package records, where a degenerate
    /// value must still take part in the highest-version fold.
    pub fn new_unchecked(input: impl Into<String>) -> Self {
        Self(input.into())
    }

    /// Returns the version string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compares two versions under the packaging-version policy.
    pub fn compare(&self, other: &Self) -> Ordering {
        compare(&self.0, &other.0)
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ------------------------------------------------------------------------------------------------
// Comparison
// ------------------------------------------------------------------------------------------------

/// Split of a version string into its three segments.
///
/// Lenient: an epoch that is not all digits is treated as part of the
/// upstream version and the epoch defaults to `""` (= 0).
struct Segments<'a> {
    epoch: &'a str,
    upstream: &'a str,
    revision: &'a str,
}

impl<'a> Segments<'a> {
    fn split(version: &'a str) -> Self {
        let (epoch, rest) = match version.find(':') {
            Some(colon) if version[..colon].bytes().all(|b| b.is_ascii_digit()) => {
                (&version[..colon], &version[colon + 1..])
            }
            _ => ("", version),
        };
        let (upstream, revision) = match rest.rfind('-') {
            Some(hyphen) => (&rest[..hyphen], &rest[hyphen + 1..]),
            None => (rest, ""),
        };
        Self {
            epoch,
            upstream,
            revision,
        }
    }
}

/// Total order over version strings. Never fails.
///
/// # Examples
///
/// ```rust
/// use std::cmp::Ordering;
/// use debsrc_index::version::compare;
///
/// assert_eq!(compare("2:1.19.3-2", "1.19.3-2"), Ordering::Greater);
/// assert_eq!(compare("1.0~rc1", "1.0"), Ordering::Less);
/// assert_eq!(compare("1.0", "1.0.1"), Ordering::Less);
/// ```
pub fn compare(a: &str, b: &str) -> Ordering {
    let a = Segments::split(a);
    let b = Segments::split(b);
    compare_segment(a.epoch.as_bytes(), b.epoch.as_bytes())
        .then_with(|| compare_segment(a.upstream.as_bytes(), b.upstream.as_bytes()))
        .then_with(|| compare_segment(a.revision.as_bytes(), b.revision.as_bytes()))
}

/// Weight of one character within a non-digit run. `None` is the end of
/// the run (a digit or the end of the string).
fn order(c: Option<u8>) -> i32 {
    match c {
        None => 0,
        Some(c) if c.is_ascii_digit() => 0,
        Some(c) if c.is_ascii_alphabetic() => i32::from(c),
        Some(b'~') => -1,
        Some(c) => i32::from(c) + 256,
    }
}

fn is_digit(c: Option<u8>) -> bool {
    c.is_some_and(|c| c.is_ascii_digit())
}

/// Compares one segment as alternating non-digit / digit runs.
fn compare_segment(a: &[u8], b: &[u8]) -> Ordering {
    let (mut i, mut j) = (0, 0);

    while i < a.len() || j < b.len() {
        // Non-digit run.
        while (i < a.len() && !a[i].is_ascii_digit()) || (j < b.len() && !b[j].is_ascii_digit()) {
            let ac = order(a.get(i).copied());
            let bc = order(b.get(j).copied());
            if ac != bc {
                return ac.cmp(&bc);
            }
            i += 1;
            j += 1;
        }

        // Digit run: skip leading zeros, then the longer run wins, then the
        // first differing digit.
        while a.get(i) == Some(&b'0') {
            i += 1;
        }
        while b.get(j) == Some(&b'0') {
            j += 1;
        }
        let mut first_diff = Ordering::Equal;
        while is_digit(a.get(i).copied()) && is_digit(b.get(j).copied()) {
            if first_diff == Ordering::Equal {
                first_diff = a[i].cmp(&b[j]);
            }
            i += 1;
            j += 1;
        }
        if is_digit(a.get(i).copied()) {
            return Ordering::Greater;
        }
        if is_digit(b.get(j).copied()) {
            return Ordering::Less;
        }
        if first_diff != Ordering::Equal {
            return first_diff;
        }
    }

    Ordering::Equal
}
