//! Atomic replacement tests: content visibility, cleanup on failure, and
//! concurrent writers.

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    use tempfile::TempDir;

    use crate::write::{TEMP_PREFIX, stage, write_atomically};

    fn leftover_temp_files(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with(TEMP_PREFIX))
            .collect()
    }

    #[test]
    fn writes_new_file() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("out.txt");

        let written = write_atomically(&dest, None, |w| -> io::Result<usize> {
            w.write_all(b"hello\n")?;
            Ok(6)
        })
        .unwrap();

        assert_eq!(written, 6);
        assert_eq!(fs::read(&dest).unwrap(), b"hello\n");
        assert!(leftover_temp_files(tmp.path()).is_empty());
    }

    #[test]
    fn replaces_existing_file() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("out.txt");
        fs::write(&dest, b"old").unwrap();

        write_atomically(&dest, None, |w| w.write_all(b"new")).unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"new");
    }

    #[test]
    fn published_file_mode_is_0644() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("out.txt");

        write_atomically(&dest, None, |w| w.write_all(b"x")).unwrap();

        let mode = fs::metadata(&dest).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }

    /// # Scenario
    /// The write callback fails after producing partial output.
    ///
    /// # Expected behavior
    /// The error is propagated, the destination keeps its previous content,
    /// and no temporary file is left behind.
    #[test]
    fn failure_leaves_destination_untouched() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("out.txt");
        fs::write(&dest, b"previous").unwrap();

        let err = write_atomically(&dest, None, |w| -> io::Result<()> {
            w.write_all(b"partial")?;
            Err(io::Error::other("boom"))
        })
        .unwrap_err();

        assert_eq!(err.to_string(), "boom");
        assert_eq!(fs::read(&dest).unwrap(), b"previous");
        assert!(leftover_temp_files(tmp.path()).is_empty());
    }

    #[test]
    fn failure_without_previous_file_creates_nothing() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("out.txt");

        let _ = write_atomically(&dest, None, |_| -> io::Result<()> {
            Err(io::Error::other("boom"))
        });

        assert!(!dest.exists());
        assert!(leftover_temp_files(tmp.path()).is_empty());
    }

    #[test]
    fn uses_scratch_directory() {
        let tmp = TempDir::new().unwrap();
        let scratch = tmp.path().join("scratch");
        fs::create_dir(&scratch).unwrap();
        let dest = tmp.path().join("out.txt");

        write_atomically(&dest, Some(&scratch), |w| -> io::Result<()> {
            // The temporary file lives in the scratch directory while writing.
            assert_eq!(leftover_temp_files(&scratch).len(), 1);
            w.write_all(b"data")
        })
        .unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"data");
        assert!(leftover_temp_files(&scratch).is_empty());
    }

    #[test]
    fn missing_destination_directory_fails() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("does-not-exist").join("out.txt");

        let result = write_atomically(&dest, None, |w| w.write_all(b"x"));
        assert!(result.is_err());
    }

    /// # Scenario
    /// Two files are staged; one is committed, the other dropped.
    ///
    /// # Expected behavior
    /// Neither destination changes before its commit. The committed file
    /// appears with its new content, the dropped one keeps its previous
    /// content, and no temporary file remains.
    #[test]
    fn staged_files_publish_only_on_commit() {
        let tmp = TempDir::new().unwrap();
        let kept = tmp.path().join("kept.txt");
        let dropped = tmp.path().join("dropped.txt");
        fs::write(&dropped, b"previous").unwrap();

        let (kept_file, len) = stage(&kept, None, |w| -> io::Result<usize> {
            w.write_all(b"fresh")?;
            Ok(5)
        })
        .unwrap();
        let (dropped_file, ()) = stage(&dropped, None, |w| w.write_all(b"discarded")).unwrap();

        assert_eq!(len, 5);
        assert_eq!(kept_file.dest(), kept.as_path());
        assert!(!kept.exists());
        assert_eq!(leftover_temp_files(tmp.path()).len(), 2);

        kept_file.commit().unwrap();
        drop(dropped_file);

        assert_eq!(fs::read(&kept).unwrap(), b"fresh");
        assert_eq!(fs::read(&dropped).unwrap(), b"previous");
        assert!(leftover_temp_files(tmp.path()).is_empty());
    }

    #[test]
    fn concurrent_writers_to_distinct_files() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();

        crossbeam::scope(|s| {
            for i in 0..8 {
                s.spawn(move |_| {
                    let dest = dir.join(format!("file-{i}.txt"));
                    write_atomically(&dest, None, |w| write!(w, "content {i}")).unwrap();
                });
            }
        })
        .unwrap();

        for i in 0..8 {
            let content = fs::read_to_string(dir.join(format!("file-{i}.txt"))).unwrap();
            assert_eq!(content, format!("content {i}"));
        }
        assert!(leftover_temp_files(dir).is_empty());
    }
}
