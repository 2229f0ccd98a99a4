//! Atomic file replacement.
//!
//! [`write_atomically`] produces a file transactionally:
//!
//! 1. Create a uniquely-named temporary file next to the destination (or in
//!    an explicit scratch directory).
//! 2. Hand a buffered writer to the caller.
//! 3. Flush, set mode `0644`, and sync the file.
//! 4. Rename the temporary file over the destination and sync the directory.
//!
//! If anything fails before the rename, the temporary file is removed and
//! the destination is left untouched, so readers either see the previous
//! file or the complete new one. Concurrent writers of different artifacts
//! never collide because every temporary name is unique.
//!
//! [`stage`] stops before step 4 and hands back a [`StagedFile`], so a set
//! of artifacts can be produced in parallel and renamed into place only
//! once every one of them was written.
//!
//! A scratch directory on a different filesystem than the destination makes
//! the final rename fail; the error is propagated and nothing is replaced.

#[cfg(test)]
mod tests;

use std::fs::{File, Permissions};
use std::io::{self, BufWriter, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::{Builder, NamedTempFile};
use tracing::debug;

/// Prefix of temporary files created next to their destination.
pub const TEMP_PREFIX: &str = ".debsrc-index-";

/// Mode applied to every published file.
const PUBLISHED_MODE: u32 = 0o644;

/// Writes `dest` atomically through `write`.
///
/// `temp_dir` overrides where the temporary file is created; by default it
/// is the destination's own directory.
///
/// The value returned by `write` is passed through on success.
///
/// # Errors
///
/// Any error returned by `write`, and any I/O error creating, flushing,
/// syncing or renaming the temporary file. In every error case the
/// temporary file has been removed.
pub fn write_atomically<T, E, F>(
    dest: impl AsRef<Path>,
    temp_dir: Option<&Path>,
    write: F,
) -> Result<T, E>
where
    F: FnOnce(&mut dyn Write) -> Result<T, E>,
    E: From<io::Error>,
{
    let (staged, value) = stage(dest, temp_dir, write)?;
    staged.commit()?;
    Ok(value)
}

/// Runs the first three steps of [`write_atomically`] and stops before the
/// rename.
///
/// The returned [`StagedFile`] is complete and synced but not yet visible
/// under `dest`. Several artifacts can be staged independently and then
/// published together once all of them were produced.
///
/// # Errors
///
/// Same as [`write_atomically`], minus the rename.
pub fn stage<T, E, F>(
    dest: impl AsRef<Path>,
    temp_dir: Option<&Path>,
    write: F,
) -> Result<(StagedFile, T), E>
where
    F: FnOnce(&mut dyn Write) -> Result<T, E>,
    E: From<io::Error>,
{
    let dest = dest.as_ref().to_path_buf();
    let dest_dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let scratch = temp_dir.unwrap_or(&dest_dir);

    let tmp = Builder::new().prefix(TEMP_PREFIX).tempfile_in(scratch)?;
    let mut writer = BufWriter::new(tmp);

    let value = write(&mut writer)?;

    let tmp = writer.into_inner().map_err(|e| e.into_error())?;
    tmp.as_file()
        .set_permissions(Permissions::from_mode(PUBLISHED_MODE))?;
    tmp.as_file().sync_all()?;

    Ok((StagedFile { tmp, dest, dest_dir }, value))
}

/// A written and synced temporary file waiting to replace its destination.
///
/// Dropping it without calling [`commit`](StagedFile::commit) removes the
/// temporary file and leaves the destination untouched.
#[derive(Debug)]
pub struct StagedFile {
    tmp: NamedTempFile,
    dest: PathBuf,
    dest_dir: PathBuf,
}

impl StagedFile {
    /// Where the file will be published.
    pub fn dest(&self) -> &Path {
        &self.dest
    }

    /// Renames the temporary file over the destination and syncs the
    /// destination directory.
    ///
    /// # Errors
    ///
    /// Any I/O error from the rename or the directory sync. A failed rename
    /// removes the temporary file.
    pub fn commit(self) -> io::Result<()> {
        let tmp_path = self.tmp.path().to_path_buf();
        self.tmp.persist(&self.dest).map_err(|e| e.error)?;
        fsync_dir(&self.dest_dir)?;

        debug!(dest = %self.dest.display(), tmp = %tmp_path.display(), "file replaced atomically");
        Ok(())
    }
}

fn fsync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}
