//! Per-source sources mapping: alias fan-out and highest-version fold.

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::control::{BinaryRecord, ControlError};
    use crate::resolver::{SourceIndexBuilder, SourceRef, build_source_index};
    use crate::version::PackageVersion;

    fn record(package: &str, version: &str, source: Option<&str>) -> BinaryRecord {
        BinaryRecord {
            package: package.to_string(),
            version: version.to_string(),
            source: source.map(str::to_string),
        }
    }

    fn source_ref(package: &str, version: &str) -> SourceRef {
        SourceRef::new(package, PackageVersion::new_unchecked(version))
    }

    #[test]
    fn alias_fan_out() {
        let mut builder = SourceIndexBuilder::new();
        builder.add(&record(
            "xserver-xephyr",
            "2:1.19.3-2+b1",
            Some("xorg-server (2:1.19.3-2)"),
        ));
        let index = builder.finish();

        let expected = source_ref("xorg-server", "2:1.19.3-2");
        assert_eq!(index.entries.len(), 4);
        for key in ["xserver-xephyr", "xorg-server", "src:xorg-server", "bin:xserver-xephyr"] {
            assert_eq!(index.entries[key], expected, "{key}");
        }
        assert_eq!(index.records, 1);
        assert_eq!(index.skipped, 0);
    }

    #[test]
    fn highest_version_wins() {
        let mut builder = SourceIndexBuilder::new();
        builder.add(&record("xserver-xorg-core", "2:1.19.1-4", Some("xorg-server")));
        builder.add(&record("xserver-xephyr", "2:1.19.3-2", Some("xorg-server")));
        builder.add(&record("xvfb", "2:1.19.1-4", Some("xorg-server")));
        let index = builder.finish();

        assert_eq!(index.entries["src:xorg-server"], source_ref("xorg-server", "2:1.19.3-2"));
        assert_eq!(index.entries["xorg-server"], source_ref("xorg-server", "2:1.19.3-2"));
        assert_eq!(index.entries["bin:xvfb"], source_ref("xorg-server", "2:1.19.1-4"));
    }

    #[test]
    fn lower_version_does_not_replace() {
        let mut builder = SourceIndexBuilder::new();
        builder.add(&record("foo", "2.0", None));
        builder.add(&record("foo", "1.0", None));
        builder.add(&record("foo", "2.0~rc1", None));
        let index = builder.finish();
        assert_eq!(index.entries["foo"], source_ref("foo", "2.0"));
    }

    #[test]
    fn equal_versions_keep_first_seen() {
        let mut builder = SourceIndexBuilder::new();
        builder.insert("k".to_string(), source_ref("first", "1.0"));
        builder.insert("k".to_string(), source_ref("second", "1.00"));
        builder.insert("k".to_string(), source_ref("third", "1.0"));
        assert_eq!(builder.finish().entries["k"], source_ref("first", "1.0"));
    }

    #[test]
    fn malformed_record_is_skipped() {
        let mut builder = SourceIndexBuilder::new();
        builder.add(&record("foo-bin", "1.0", Some("foo (bad version")));
        builder.add(&record("bar", "1.0", None));
        let index = builder.finish();

        assert_eq!(index.skipped, 1);
        assert_eq!(index.records, 1);
        assert!(!index.entries.contains_key("bin:foo-bin"));
        assert!(!index.entries.contains_key("foo-bin"));
        assert_eq!(index.entries["bar"], source_ref("bar", "1.0"));
        assert_eq!(index.entries.len(), 3);
    }

    #[test]
    fn builds_from_packages_listing() {
        let listing = "\
Package: xserver-xephyr
Source: xorg-server (2:1.19.3-2)
Version: 2:1.19.3-2+b1
Architecture: amd64

Package: broken
Source: foo (bad version
Version: 1.0

Package: no-version

Package: hello
Version: 2.10-3
";
        let index = build_source_index(Cursor::new(listing)).unwrap();
        assert_eq!(index.records, 2);
        assert_eq!(index.skipped, 2);
        assert_eq!(index.entries["src:xorg-server"], source_ref("xorg-server", "2:1.19.3-2"));
        assert_eq!(index.entries["bin:hello"], source_ref("hello", "2.10-3"));
        assert_eq!(index.entries.len(), 4 + 3);
    }

    /// # Scenario
    /// A listing holds a record whose version spans a continuation line and
    /// a record whose name contains a tab, next to a valid record.
    ///
    /// # Expected behavior
    /// Both broken records are skipped; only the valid one is indexed.
    #[test]
    fn unstorable_records_are_skipped() {
        let listing = "\
Package: good
Version: 1.0-1

Package: bad
Version: 1.0
 continued

Package: a\tb
Version: 1.0-1
";
        let index = build_source_index(Cursor::new(listing)).unwrap();
        assert_eq!(index.records, 1);
        assert_eq!(index.skipped, 2);
        assert_eq!(index.entries.len(), 3);
        assert_eq!(index.entries["bin:good"], source_ref("good", "1.0-1"));
        assert!(!index.entries.contains_key("bad"));
        assert!(index.entries.keys().all(|key| !key.contains('\t')));
    }

    #[test]
    fn unparseable_listing_fails() {
        let err = build_source_index(Cursor::new("Package: a\nnot a field\n")).unwrap_err();
        assert!(matches!(err, ControlError::Malformed { line: 2, .. }));
    }
}
