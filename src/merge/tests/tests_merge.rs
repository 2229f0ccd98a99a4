//! Priority merge semantics.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::merge::{Prioritized, Priority, merge, sorted_keys};

    fn source(
        priority: i64,
        entries: &[(&'static str, &'static str)],
    ) -> Prioritized<&'static str, &'static str> {
        Prioritized::new(Priority(priority), entries.iter().copied().collect())
    }

    #[test]
    fn higher_priority_wins() {
        let merged = merge([source(990, &[("k", "v1")]), source(500, &[("k", "v2")])]);
        assert_eq!(merged["k"], "v1");
    }

    #[test]
    fn higher_priority_wins_regardless_of_order() {
        let merged = merge([source(500, &[("k", "v2")]), source(990, &[("k", "v1")])]);
        assert_eq!(merged["k"], "v1");
    }

    #[test]
    fn lower_priority_fills_missing_keys() {
        let merged = merge([source(990, &[("a", "1")]), source(500, &[("k", "v2")])]);
        assert_eq!(merged["k"], "v2");
        assert_eq!(merged["a"], "1");
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn local_priority_beats_everything() {
        let merged = merge([
            source(990, &[("k", "repo")]),
            source(i64::MAX, &[("k", "installed")]),
            source(500, &[("k", "other")]),
        ]);
        assert_eq!(merged["k"], "installed");
    }

    /// # Scenario
    /// Several sources share the same priority and define the same key.
    ///
    /// # Expected behavior
    /// The first source in enumeration order wins, every time.
    #[test]
    fn equal_priority_ties_go_to_first_source() {
        for _ in 0..20 {
            let merged = merge([
                source(500, &[("k", "first")]),
                source(500, &[("k", "second")]),
                source(500, &[("k", "third")]),
            ]);
            assert_eq!(merged["k"], "first");
        }

        let merged = merge([
            source(100, &[("k", "low")]),
            source(500, &[("k", "first-500")]),
            source(500, &[("k", "second-500")]),
        ]);
        assert_eq!(merged["k"], "first-500");
    }

    #[test]
    fn negative_priorities_are_ordered() {
        let merged = merge([source(-10, &[("k", "neg")]), source(0, &[("k", "zero")])]);
        assert_eq!(merged["k"], "zero");
    }

    #[test]
    fn empty_inputs() {
        let merged: HashMap<&str, &str> = merge(Vec::new());
        assert!(merged.is_empty());

        let merged = merge([source(990, &[]), source(500, &[])]);
        assert!(merged.is_empty());
    }

    #[test]
    fn keys_are_union_of_all_sources() {
        let merged = merge([
            source(990, &[("a", "1"), ("b", "1")]),
            source(500, &[("b", "2"), ("c", "2")]),
            source(i64::MAX, &[("d", "3")]),
        ]);
        assert_eq!(sorted_keys(&merged), vec![&"a", &"b", &"c", &"d"]);
        assert_eq!(merged["b"], "1");
    }

    #[test]
    fn sorted_keys_are_lexicographic() {
        let mapping: HashMap<String, ()> = ["src:b", "bin:a", "a", "B", "src:a"]
            .iter()
            .map(|k| (k.to_string(), ()))
            .collect();
        let keys: Vec<&str> = sorted_keys(&mapping).into_iter().map(String::as_str).collect();
        assert_eq!(keys, ["B", "a", "bin:a", "src:a", "src:b"]);
    }

    #[test]
    fn priority_constants() {
        assert!(Priority::LOCAL > Priority::DEFAULT_RELEASE);
        assert!(Priority::DEFAULT_RELEASE > Priority::OTHER_RELEASE);
        assert_eq!(Priority::DEFAULT_RELEASE.to_string(), "990");
    }
}
