//! Hybrid index
//!
//! Maps encoded keys to sorted lists of row ids. The hash map is the only
//! source of truth for liveness; an optional ordered structure serves range
//! scans.
//!
//! Modes:
//! - `Hash`: fresh index, equality and mutation only
//! - `Sorted`: sorted key array, built by the first range scan
//! - `Treap`: built from the sorted array by the first insert of a new key
//!   after a range scan, then maintained incrementally
//!
//! Deletes only touch the hash map. Ordered structures keep stale keys and
//! range scans skip keys the hash map no longer holds. Once stale keys
//! outnumber live ones the ordered structure is rebuilt from the hash map,
//! keeping its mode.

use std::collections::HashMap;
use std::fmt;
use std::ops::Bound;
use std::rc::Rc;

use super::treap::{Treap, TreapRange};
use crate::observability::Logger;

/// Row identifier stored in an index
pub type RowId = u64;

/// Internal representation of a [`HybridIndex`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMode {
    Hash,
    Sorted,
    Treap,
}

impl IndexMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexMode::Hash => "HASH",
            IndexMode::Sorted => "SORTED",
            IndexMode::Treap => "TREAP",
        }
    }
}

impl fmt::Display for IndexMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Default)]
enum Ordered {
    #[default]
    None,
    Sorted(Vec<Rc<[u8]>>),
    Treap(Treap),
}

/// Key to row-id multimap with lazily built ordered access
#[derive(Debug, Default)]
pub struct HybridIndex {
    entries: HashMap<Rc<[u8]>, Vec<RowId>>,
    ordered: Ordered,
    ids: usize,
}

impl HybridIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> IndexMode {
        match self.ordered {
            Ordered::None => IndexMode::Hash,
            Ordered::Sorted(_) => IndexMode::Sorted,
            Ordered::Treap(_) => IndexMode::Treap,
        }
    }

    /// Number of (key, id) pairs
    pub fn len(&self) -> usize {
        self.ids
    }

    pub fn is_empty(&self) -> bool {
        self.ids == 0
    }

    /// Number of live keys
    pub fn key_count(&self) -> usize {
        self.entries.len()
    }

    /// Row ids stored under a key, ascending
    pub fn get(&self, key: &[u8]) -> &[RowId] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.entries.contains_key(key)
    }

    /// Adds a row id under a key. Returns false if the pair already exists.
    pub fn insert(&mut self, key: &[u8], id: RowId) -> bool {
        if let Some(ids) = self.entries.get_mut(key) {
            return match ids.binary_search(&id) {
                Ok(_) => false,
                Err(pos) => {
                    ids.insert(pos, id);
                    self.ids += 1;
                    true
                }
            };
        }

        let key: Rc<[u8]> = Rc::from(key);
        self.entries.insert(Rc::clone(&key), vec![id]);
        self.ids += 1;

        let rebuild = match &mut self.ordered {
            Ordered::None => false,
            // A stale key from a lazy delete is still in place
            Ordered::Sorted(keys) => keys.binary_search_by(|k| k[..].cmp(&key[..])).is_err(),
            Ordered::Treap(treap) => {
                treap.insert(Rc::clone(&key));
                false
            }
        };
        if rebuild {
            let treap = match &self.ordered {
                Ordered::Sorted(keys) => Some(Treap::from_sorted(keys)),
                _ => None,
            };
            if let Some(mut treap) = treap {
                treap.insert(key);
                self.ordered = Ordered::Treap(treap);
                self.log_mode();
            }
        }
        true
    }

    /// Removes a row id from a key. Returns false if the pair was absent.
    pub fn remove(&mut self, key: &[u8], id: RowId) -> bool {
        let Some(ids) = self.entries.get_mut(key) else {
            return false;
        };
        let Ok(pos) = ids.binary_search(&id) else {
            return false;
        };
        ids.remove(pos);
        self.ids -= 1;
        if ids.is_empty() {
            self.entries.remove(key);
            if self.stale_keys() > self.entries.len() {
                self.compact();
            }
        }
        true
    }

    /// Keys held by the ordered structure that the hash map no longer has
    fn stale_keys(&self) -> usize {
        let held = match &self.ordered {
            Ordered::None => return 0,
            Ordered::Sorted(keys) => keys.len(),
            Ordered::Treap(treap) => treap.len(),
        };
        held.saturating_sub(self.entries.len())
    }

    fn compact(&mut self) {
        let stale = self.stale_keys();
        match &mut self.ordered {
            Ordered::None => return,
            Ordered::Sorted(keys) => {
                let entries = &self.entries;
                keys.retain(|k| entries.contains_key(k));
            }
            Ordered::Treap(treap) => {
                let mut keys: Vec<Rc<[u8]>> = self.entries.keys().cloned().collect();
                keys.sort();
                *treap = Treap::from_sorted(&keys);
            }
        }
        Logger::trace(
            "INDEX_COMPACTED",
            &[
                ("keys", &self.entries.len().to_string()),
                ("mode", self.mode().as_str()),
                ("stale", &stale.to_string()),
            ],
        );
    }

    /// Scans row ids for keys within the bounds.
    ///
    /// Keys are visited ascending, or descending when `reverse` is set; ids
    /// under one key are always yielded ascending. The first scan of a fresh
    /// index sorts its keys.
    pub fn range(&mut self, low: Bound<&[u8]>, high: Bound<&[u8]>, reverse: bool) -> IndexRange<'_> {
        if matches!(self.ordered, Ordered::None) {
            let mut keys: Vec<Rc<[u8]>> = self.entries.keys().cloned().collect();
            keys.sort();
            self.ordered = Ordered::Sorted(keys);
            self.log_mode();
        }

        let owned = |b: Bound<&[u8]>| match b {
            Bound::Included(k) => Bound::Included(k.to_vec()),
            Bound::Excluded(k) => Bound::Excluded(k.to_vec()),
            Bound::Unbounded => Bound::Unbounded,
        };

        let keys = match &self.ordered {
            Ordered::Treap(treap) => Keys::Treap(treap.range(owned(low), owned(high), reverse)),
            Ordered::Sorted(keys) => {
                let start = match low {
                    Bound::Included(l) => keys.partition_point(|k| &k[..] < l),
                    Bound::Excluded(l) => keys.partition_point(|k| &k[..] <= l),
                    Bound::Unbounded => 0,
                };
                let end = match high {
                    Bound::Included(h) => keys.partition_point(|k| &k[..] <= h),
                    Bound::Excluded(h) => keys.partition_point(|k| &k[..] < h),
                    Bound::Unbounded => keys.len(),
                };
                let slice = &keys[start..end.max(start)];
                Keys::Sorted { keys: slice, reverse }
            }
            Ordered::None => Keys::Sorted { keys: &[], reverse },
        };

        IndexRange {
            entries: &self.entries,
            keys,
            current: [].iter(),
            current_key: None,
        }
    }

    fn log_mode(&self) {
        Logger::trace(
            "INDEX_MODE",
            &[
                ("keys", &self.entries.len().to_string()),
                ("mode", self.mode().as_str()),
            ],
        );
    }
}

enum Keys<'a> {
    Sorted { keys: &'a [Rc<[u8]>], reverse: bool },
    Treap(TreapRange<'a>),
}

impl<'a> Iterator for Keys<'a> {
    type Item = &'a Rc<[u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Keys::Sorted { keys, reverse } => {
                let slice: &'a [Rc<[u8]>] = *keys;
                let (key, rest) = if *reverse {
                    let (last, rest) = slice.split_last()?;
                    (last, rest)
                } else {
                    slice.split_first()?
                };
                *keys = rest;
                Some(key)
            }
            Keys::Treap(range) => range.next(),
        }
    }
}

/// Row ids produced by [`HybridIndex::range`]
pub struct IndexRange<'a> {
    entries: &'a HashMap<Rc<[u8]>, Vec<RowId>>,
    keys: Keys<'a>,
    current: std::slice::Iter<'a, RowId>,
    current_key: Option<&'a [u8]>,
}

impl<'a> IndexRange<'a> {
    /// Like `next`, but also returns the key the id is stored under.
    pub fn next_entry(&mut self) -> Option<(&'a [u8], RowId)> {
        loop {
            if let Some(id) = self.current.next() {
                return Some((self.current_key?, *id));
            }
            let entries = self.entries;
            let key = self.keys.next()?;
            // Skip keys removed since the ordered structure was built
            if let Some(ids) = entries.get(key) {
                self.current = ids.iter();
                self.current_key = Some(&key[..]);
            }
        }
    }
}

impl<'a> Iterator for IndexRange<'a> {
    type Item = RowId;

    fn next(&mut self) -> Option<RowId> {
        self.next_entry().map(|(_, id)| id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexKey;
    use crate::value::Value;

    fn k(s: &str) -> Vec<u8> {
        IndexKey::from_value(&Value::from(s)).into_bytes()
    }

    #[test]
    fn test_equality_in_hash_mode() {
        let mut index = HybridIndex::new();
        index.insert(&k("a"), 3);
        index.insert(&k("a"), 1);
        index.insert(&k("b"), 2);
        assert_eq!(index.get(&k("a")), &[1, 3]);
        assert_eq!(index.mode(), IndexMode::Hash);
        assert!(!index.insert(&k("a"), 1));
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_range_forward_and_reverse() {
        let mut index = HybridIndex::new();
        index.insert(&k("b"), 1);
        index.insert(&k("a"), 2);
        index.insert(&k("c"), 3);

        let low = k("a");
        let high = k("b");
        let forward: Vec<RowId> = index
            .range(Bound::Included(&low), Bound::Included(&high), false)
            .collect();
        assert_eq!(forward, vec![2, 1]);
        assert_eq!(index.mode(), IndexMode::Sorted);

        let reverse: Vec<RowId> = index.range(Bound::Unbounded, Bound::Unbounded, true).collect();
        assert_eq!(reverse, vec![3, 1, 2]);
    }

    #[test]
    fn test_insert_after_range_switches_to_treap() {
        let mut index = HybridIndex::new();
        index.insert(&k("a"), 1);
        index.insert(&k("c"), 2);
        let _ = index.range(Bound::Unbounded, Bound::Unbounded, false).count();

        // Existing key keeps the sorted array
        index.insert(&k("a"), 5);
        assert_eq!(index.mode(), IndexMode::Sorted);

        index.insert(&k("b"), 3);
        assert_eq!(index.mode(), IndexMode::Treap);
        let all: Vec<RowId> = index.range(Bound::Unbounded, Bound::Unbounded, false).collect();
        assert_eq!(all, vec![1, 5, 3, 2]);
    }

    #[test]
    fn test_lazy_delete_is_skipped() {
        let mut index = HybridIndex::new();
        index.insert(&k("a"), 1);
        index.insert(&k("b"), 2);
        index.insert(&k("c"), 3);
        let _ = index.range(Bound::Unbounded, Bound::Unbounded, false).count();

        assert!(index.remove(&k("b"), 2));
        assert!(!index.remove(&k("b"), 2));
        let all: Vec<RowId> = index.range(Bound::Unbounded, Bound::Unbounded, false).collect();
        assert_eq!(all, vec![1, 3]);

        // Re-inserting a lazily deleted key does not rebuild
        index.insert(&k("b"), 4);
        assert_eq!(index.mode(), IndexMode::Sorted);
        let all: Vec<RowId> = index.range(Bound::Unbounded, Bound::Unbounded, true).collect();
        assert_eq!(all, vec![3, 4, 1]);
    }

    #[test]
    fn test_churn_compacts_ordered_keys() {
        let mut index = HybridIndex::new();
        for i in 0..4u64 {
            index.insert(&k(&format!("k{i}")), i);
        }
        let _ = index.range(Bound::Unbounded, Bound::Unbounded, false).count();
        for i in 4..200u64 {
            index.insert(&k(&format!("k{i}")), i);
            assert!(index.remove(&k(&format!("k{}", i - 4)), i - 4));
            assert!(index.stale_keys() <= index.key_count());
        }
        assert_eq!(index.mode(), IndexMode::Treap);
        let all: Vec<RowId> = index.range(Bound::Unbounded, Bound::Unbounded, false).collect();
        assert_eq!(all, vec![196, 197, 198, 199]);
    }

    #[test]
    fn test_sorted_mode_compacts_in_place() {
        let mut index = HybridIndex::new();
        for (i, name) in ["a", "b", "c", "d"].iter().enumerate() {
            index.insert(&k(name), i as RowId);
        }
        let _ = index.range(Bound::Unbounded, Bound::Unbounded, false).count();
        index.remove(&k("a"), 0);
        index.remove(&k("b"), 1);
        assert_eq!(index.stale_keys(), 2);
        index.remove(&k("c"), 2);
        assert_eq!(index.stale_keys(), 0);
        assert_eq!(index.mode(), IndexMode::Sorted);
        let all: Vec<RowId> = index.range(Bound::Unbounded, Bound::Unbounded, true).collect();
        assert_eq!(all, vec![3]);
    }

    #[test]
    fn test_ids_ascending_within_key_in_reverse() {
        let mut index = HybridIndex::new();
        index.insert(&k("x"), 9);
        index.insert(&k("x"), 4);
        index.insert(&k("y"), 1);
        let ids: Vec<RowId> = index.range(Bound::Unbounded, Bound::Unbounded, true).collect();
        assert_eq!(ids, vec![1, 4, 9]);
    }
}
