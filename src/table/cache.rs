//! Opportunistic per-view result buffering
//!
//! The first full iteration of a view buffers its projected rows up to a
//! threshold. Buffered data is stamped with the backend data version and
//! dropped as soon as the version moves.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::index::IndexKey;
use crate::observability::Logger;
use crate::value::{Row, RowKey};

pub(crate) type CachedRows = Rc<Vec<(RowKey, Row)>>;

#[derive(Debug, Default)]
pub(crate) struct ResultCache {
    version: u64,
    rows: Option<CachedRows>,
    count: Option<usize>,
    /// Set once a full iteration exceeded the threshold; never cleared
    disabled: bool,
    by_record: Option<(Vec<String>, HashSet<IndexKey>)>,
    by_primary: Option<(String, HashMap<IndexKey, Vec<usize>>)>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops buffered data that predates `version`
    pub fn sync(&mut self, version: u64) {
        if self.version == version {
            return;
        }
        if self.rows.is_some() || self.count.is_some() {
            Logger::trace(
                "CACHE_INVALIDATED",
                &[
                    ("old_version", &self.version.to_string()),
                    ("new_version", &version.to_string()),
                ],
            );
        }
        self.version = version;
        self.rows = None;
        self.count = None;
        self.by_record = None;
        self.by_primary = None;
    }

    pub fn rows(&self) -> Option<CachedRows> {
        self.rows.clone()
    }

    pub fn count(&self) -> Option<usize> {
        self.rows.as_ref().map(|r| r.len()).or(self.count)
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn disable(&mut self, threshold: usize) {
        if !self.disabled {
            Logger::trace("CACHE_DISABLED", &[("threshold", &threshold.to_string())]);
        }
        self.disabled = true;
    }

    /// Stores a complete result computed at `version`
    pub fn store_rows(&mut self, version: u64, rows: Vec<(RowKey, Row)>) {
        if version == self.version && !self.disabled {
            self.count = Some(rows.len());
            self.rows = Some(Rc::new(rows));
        }
    }

    pub fn store_count(&mut self, version: u64, count: usize) {
        if version == self.version {
            self.count = Some(count);
        }
    }

    /// True if a buffered row with the record's value in `column` matches
    /// the record. A miss proves nothing.
    pub fn primary_hit(&mut self, column: &str, record: &Row) -> bool {
        let Some(rows) = self.rows.clone() else {
            return false;
        };
        let rebuild = !matches!(&self.by_primary, Some((c, _)) if c == column);
        if rebuild {
            let mut map: HashMap<IndexKey, Vec<usize>> = HashMap::new();
            for (i, (_, row)) in rows.iter().enumerate() {
                map.entry(IndexKey::from_value(row.value(column)))
                    .or_default()
                    .push(i);
            }
            self.by_primary = Some((column.to_string(), map));
        }
        let key = IndexKey::from_value(record.value(column));
        self.by_primary
            .as_ref()
            .and_then(|(_, map)| map.get(&key))
            .is_some_and(|ids| ids.iter().any(|&i| rows[i].1.matches_record(record)))
    }

    /// Membership of a record among buffered rows, comparing only the
    /// record's columns. `None` if nothing is buffered. The key set is
    /// built once per column tuple and reused until invalidation.
    pub fn record_member(&mut self, record: &Row) -> Option<bool> {
        let rows = self.rows.clone()?;
        let columns: Vec<String> = record.columns().map(str::to_string).collect();
        let rebuild = !matches!(&self.by_record, Some((c, _)) if *c == columns);
        if rebuild {
            let keys: HashSet<IndexKey> = rows
                .iter()
                .map(|(_, row)| IndexKey::composite(columns.iter().map(|c| row.value(c))))
                .collect();
            self.by_record = Some((columns.clone(), keys));
        }
        let key = IndexKey::composite(columns.iter().map(|c| record.value(c)));
        self.by_record.as_ref().map(|(_, keys)| keys.contains(&key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn sample() -> Vec<(RowKey, Row)> {
        vec![
            (RowKey::Int(1), Row::new().with("id", 1).with("name", "Bob")),
            (RowKey::Int(2), Row::new().with("id", 2).with("name", "Ann")),
        ]
    }

    #[test]
    fn test_version_change_invalidates() {
        let mut cache = ResultCache::new();
        cache.store_rows(0, sample());
        assert_eq!(cache.count(), Some(2));
        cache.sync(1);
        assert!(cache.rows().is_none());
        assert_eq!(cache.count(), None);
    }

    #[test]
    fn test_stale_store_ignored() {
        let mut cache = ResultCache::new();
        cache.sync(3);
        cache.store_count(2, 10);
        assert_eq!(cache.count(), None);
    }

    #[test]
    fn test_disabled_cache_stores_nothing() {
        let mut cache = ResultCache::new();
        cache.disable(1);
        cache.store_rows(0, sample());
        assert!(cache.rows().is_none());
        cache.sync(5);
        assert!(cache.is_disabled());
    }

    #[test]
    fn test_record_membership() {
        let mut cache = ResultCache::new();
        assert_eq!(cache.record_member(&Row::new().with("id", 1)), None);
        cache.store_rows(0, sample());
        assert_eq!(cache.record_member(&Row::new().with("id", "2")), Some(true));
        assert_eq!(
            cache.record_member(&Row::new().with("id", 2).with("name", "Bob")),
            Some(false)
        );
    }

    #[test]
    fn test_record_keys_reused_per_column_tuple() {
        let mut cache = ResultCache::new();
        cache.store_rows(0, sample());
        assert_eq!(cache.record_member(&Row::new().with("name", "Ann")), Some(true));

        // Plant a key the rows do not hold; a rebuild would drop it
        if let Some((_, keys)) = cache.by_record.as_mut() {
            keys.insert(IndexKey::composite([&Value::from("Cyd")]));
        }
        assert_eq!(cache.record_member(&Row::new().with("name", "Cyd")), Some(true));

        // Another column tuple rebuilds; invalidation drops the set
        assert_eq!(cache.record_member(&Row::new().with("id", 1)), Some(true));
        assert_eq!(cache.by_record.as_ref().map(|(_, k)| k.len()), Some(2));
        cache.sync(1);
        assert!(cache.by_record.is_none());
    }

    #[test]
    fn test_primary_hit() {
        let mut cache = ResultCache::new();
        cache.store_rows(0, sample());
        assert!(cache.primary_hit("id", &Row::new().with("id", 1).with("name", "Bob")));
        assert!(!cache.primary_hit("id", &Row::new().with("id", 7)));
    }
}
