//! Index target parsing, priority assignment and the filesystem reader.

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use tempfile::TempDir;

    use crate::merge::Priority;
    use crate::source::{
        FsTargetReader, IndexTarget, SourceError, TargetKind, TargetReader, assign_priorities,
        local_status_target, parse_index_targets,
    };

    const INDEXTARGETS: &str = "\
MetaKey: main/binary-amd64/Packages
ShortDesc: Packages
Description: http://deb.debian.org/debian bookworm/main amd64 Packages
URI: http://deb.debian.org/debian/dists/bookworm/main/binary-amd64/Packages
Filename: /var/lib/apt/lists/deb.debian.org_debian_dists_bookworm_main_binary-amd64_Packages
Optional: no
Codename: bookworm
Release: stable
Repo-URI: http://deb.debian.org/debian/

ShortDesc: Sources
Filename: /var/lib/apt/lists/deb.debian.org_debian_dists_sid_main_source_Sources
Codename: sid
Release: unstable
Repo-URI: http://deb.debian.org/debian/

ShortDesc: Packages
Filename: /var/lib/apt/lists/debug_Packages
Codename: bookworm-debug
Release: stable-debug
Repo-URI: http://deb.debian.org/debian-debug/

ShortDesc: Contents
Filename: /var/lib/apt/lists/contents

Description: no short desc, skipped
";

    #[test]
    fn parses_indextargets_listing() {
        let targets = parse_index_targets(Cursor::new(INDEXTARGETS)).unwrap();
        assert_eq!(targets.len(), 4);

        assert_eq!(targets[0].kind, TargetKind::Packages);
        assert_eq!(
            targets[0].filename.to_str(),
            Some(concat!(
                "/var/lib/apt/lists/",
                "deb.debian.org_debian_dists_bookworm_main_binary-amd64_Packages"
            ))
        );
        assert_eq!(targets[0].codename, "bookworm");
        assert_eq!(targets[0].release, "stable");
        assert_eq!(targets[0].repo_uri, "http://deb.debian.org/debian/");
        assert!(!targets[0].is_debug());

        assert_eq!(targets[1].kind, TargetKind::Sources);
        assert!(targets[2].is_debug());
        assert_eq!(targets[3].kind, TargetKind::Other("Contents".to_string()));
        assert_eq!(targets[3].repo_uri, "");
    }

    #[test]
    fn default_release_gets_990() {
        let mut targets = parse_index_targets(Cursor::new(INDEXTARGETS)).unwrap();
        assign_priorities(&mut targets, Some("stable"));

        assert_eq!(targets[0].priority, Priority::DEFAULT_RELEASE);
        assert_eq!(targets[1].priority, Priority::OTHER_RELEASE);
        assert_eq!(targets[2].priority, Priority::OTHER_RELEASE);
    }

    #[test]
    fn no_default_release_means_all_500() {
        let mut targets = parse_index_targets(Cursor::new(INDEXTARGETS)).unwrap();
        targets[0].priority = Priority::DEFAULT_RELEASE;
        assign_priorities(&mut targets, None);
        assert!(targets.iter().all(|t| t.priority == Priority::OTHER_RELEASE));

        assign_priorities(&mut targets, Some(""));
        assert!(targets.iter().all(|t| t.priority == Priority::OTHER_RELEASE));
    }

    #[test]
    fn local_status_is_highest() {
        let target = local_status_target("/var/lib/dpkg/status");
        assert_eq!(target.kind, TargetKind::Packages);
        assert_eq!(target.priority, Priority::LOCAL);
        assert!(!target.is_debug());
    }

    #[test]
    fn fs_reader_streams_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Packages");
        std::fs::write(&path, "Package: a\nVersion: 1\n").unwrap();

        let mut contents = String::new();
        FsTargetReader
            .open(&IndexTarget::new(TargetKind::Packages, &path))
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "Package: a\nVersion: 1\n");
    }

    #[test]
    fn fs_reader_missing_file_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing");
        let Err(err) = FsTargetReader.open(&IndexTarget::new(TargetKind::Packages, &path)) else {
            panic!("expected an error");
        };
        match err {
            SourceError::Unavailable { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other}"),
        }
    }
}
