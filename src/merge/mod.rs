//! # Priority merge
//!
//! Combines the per-source mappings of several metadata sources into one,
//! mirroring package-manager pin semantics:
//!
//! - For every key defined by at least one source, the value of the source
//!   with the **highest priority** wins.
//! - Among sources of equal priority, the source that comes **first in
//!   enumeration order** wins. Ties are therefore deterministic across runs.
//!
//! The merge consumes its inputs, so values move into the result without
//! being cloned. It runs single-threaded over already-collected mappings.

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::hash::Hash;

use tracing::debug;

// ------------------------------------------------------------------------------------------------
// Priority
// ------------------------------------------------------------------------------------------------

/// Pin priority of a metadata source. Higher wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(pub i64);

impl Priority {
    /// The configured default release.
    pub const DEFAULT_RELEASE: Self = Self(990);

    /// Any other release.
    pub const OTHER_RELEASE: Self = Self(500);

    /// Locally installed packages: always win over any repository offering.
    pub const LOCAL: Self = Self(i64::MAX);
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ------------------------------------------------------------------------------------------------
// Prioritized mapping
// ------------------------------------------------------------------------------------------------

/// One metadata source's contribution, tagged with its pin priority.
#[derive(Debug, Clone)]
pub struct Prioritized<K, V> {
    /// Pin priority of the source.
    pub priority: Priority,

    /// Key → value mapping produced from the source.
    pub mapping: HashMap<K, V>,
}

impl<K, V> Prioritized<K, V> {
    /// Tags `mapping` with `priority`.
    pub fn new(priority: Priority, mapping: HashMap<K, V>) -> Self {
        Self { priority, mapping }
    }
}

// ------------------------------------------------------------------------------------------------
// Merge
// ------------------------------------------------------------------------------------------------

/// Merges prioritized mappings into one.
///
/// Sources are visited in enumeration order and a later source only
/// replaces an existing winner when its priority is strictly greater, which
/// is exactly "highest priority first, ties broken by enumeration index".
///
/// # Example
///
/// ```rust
/// use std::collections::HashMap;
/// use debsrc_index::merge::{merge, Prioritized, Priority};
///
/// let a = Prioritized::new(Priority(990), HashMap::from([("k", "v1")]));
/// let b = Prioritized::new(Priority(500), HashMap::from([("k", "v2"), ("j", "v3")]));
///
/// let merged = merge([b, a]);
/// assert_eq!(merged["k"], "v1");
/// assert_eq!(merged["j"], "v3");
/// ```
pub fn merge<K, V>(sources: impl IntoIterator<Item = Prioritized<K, V>>) -> HashMap<K, V>
where
    K: Eq + Hash,
{
    let mut winners: HashMap<K, (Priority, V)> = HashMap::new();
    let mut source_count = 0usize;

    for source in sources {
        source_count += 1;
        let priority = source.priority;
        for (key, value) in source.mapping {
            match winners.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert((priority, value));
                }
                Entry::Occupied(mut slot) => {
                    if priority > slot.get().0 {
                        slot.insert((priority, value));
                    }
                }
            }
        }
    }

    debug!(sources = source_count, keys = winners.len(), "merged prioritized mappings");
    winners
        .into_iter()
        .map(|(key, (_, value))| (key, value))
        .collect()
}

/// Returns the keys of `mapping` in lexicographic order.
///
/// Used for deterministic text output derived from the merged key set.
pub fn sorted_keys<K: Ord, V>(mapping: &HashMap<K, V>) -> Vec<&K> {
    let mut keys: Vec<&K> = mapping.keys().collect();
    keys.sort_unstable();
    keys
}
