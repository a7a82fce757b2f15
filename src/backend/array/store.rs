//! Shared row storage for array-backed tables
//!
//! Rows live in slots addressed by [`RowId`]; a deleted row leaves an empty
//! slot behind so ids stay stable. Every indexed column owns one
//! [`HybridIndex`] keyed by the composite of its index columns.
//!
//! # Invariants
//!
//! - `keys` maps every live row key to its slot
//! - Each index holds exactly one entry per live row
//! - `version` changes on every successful mutation

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::index::{component_prefix_len, HybridIndex, IndexKey, RowId};
use crate::planner::{AccessPlan, KeyRange, ScanType};
use crate::schema::{ColumnDef, ColumnSet, IndexKind};
use crate::table::{TableError, TableResult};
use crate::value::{Row, RowKey, Value};

#[derive(Debug)]
pub(crate) struct ArrayStore {
    pub(crate) columns: ColumnSet,
    slots: Vec<Option<(RowKey, Row)>>,
    live: usize,
    keys: HashMap<RowKey, usize>,
    /// Indexes by leading column
    indexes: BTreeMap<String, HybridIndex>,
    next_key: i64,
    version: u64,
}

impl ArrayStore {
    pub(crate) fn new(columns: ColumnSet) -> Self {
        let indexes = columns
            .iter()
            .filter(|d| d.index.is_indexed())
            .map(|d| (d.name.clone(), HybridIndex::new()))
            .collect();
        Self {
            columns,
            slots: Vec::new(),
            live: 0,
            keys: HashMap::new(),
            indexes,
            next_key: 1,
            version: 0,
        }
    }

    pub(crate) fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn live(&self) -> usize {
        self.live
    }

    pub(crate) fn slot(&self, id: usize) -> Option<&(RowKey, Row)> {
        self.slots.get(id).and_then(Option::as_ref)
    }

    pub(crate) fn slot_of(&self, key: &RowKey) -> Option<usize> {
        self.keys.get(key).copied()
    }

    /// Slot ids of every live row, ascending
    pub(crate) fn live_ids(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .map(|(i, _)| i)
            .collect()
    }

    /// Slot ids an access plan visits, in scan order.
    ///
    /// Unordered index scans return ids ascending so they match a full scan.
    /// An ordered scan covering fewer components than its index sorts ids
    /// within each group of equal leading components.
    pub(crate) fn plan_ids(&mut self, plan: &AccessPlan, cap: Option<usize>) -> Vec<usize> {
        let column = match (&plan.column, plan.scan) {
            (Some(column), scan) if scan != ScanType::Full => column,
            _ => {
                let mut ids = self.live_ids();
                if let Some(cap) = cap {
                    ids.truncate(cap);
                }
                return ids;
            }
        };
        let Some(index) = self.indexes.get_mut(column) else {
            return self.live_ids();
        };

        let mut range = index.range(plan.range.low(), plan.range.high(), plan.reverse);
        if plan.scan != ScanType::IndexOrder {
            let mut ids = Vec::new();
            while let Some((_, id)) = range.next_entry() {
                ids.push(id as usize);
            }
            ids.sort_unstable();
            if let Some(cap) = cap {
                ids.truncate(cap);
            }
            return ids;
        }

        let grouped = plan.order_components < plan.index_components;
        let mut ids = Vec::new();
        let mut group: Vec<usize> = Vec::new();
        let mut group_key: Option<Vec<u8>> = None;
        while let Some((key, id)) = range.next_entry() {
            if grouped {
                let prefix = component_prefix_len(key, plan.order_components)
                    .map_or(key, |len| &key[..len]);
                if group_key.as_deref() != Some(prefix) {
                    group.sort_unstable();
                    ids.append(&mut group);
                    if cap.is_some_and(|cap| ids.len() >= cap) {
                        break;
                    }
                    group_key = Some(prefix.to_vec());
                }
                group.push(id as usize);
            } else {
                ids.push(id as usize);
                if cap.is_some_and(|cap| ids.len() >= cap) {
                    break;
                }
            }
        }
        group.sort_unstable();
        ids.append(&mut group);
        if let Some(cap) = cap {
            ids.truncate(cap);
        }
        ids
    }

    /// Validates and stores a new row
    pub(crate) fn insert(&mut self, fields: Row) -> TableResult<RowKey> {
        let row = self.conform(fields)?;
        let primary = self.primary_key(&row);
        let key = primary.clone().unwrap_or(RowKey::Int(self.next_key));
        if self.keys.contains_key(&key) {
            return Err(self.duplicate_key(&row, &key));
        }
        let id = self.slots.len();
        for def in self.unique_columns() {
            if self.conflicts(&def, &row, &HashSet::new()) {
                return Err(TableError::UniqueViolation {
                    column: def.name.clone(),
                    value: row.value(&def.name).to_string(),
                });
            }
        }
        self.index_row(id, &row);
        self.keys.insert(key.clone(), id);
        self.slots.push(Some((key.clone(), row)));
        if primary.is_none() {
            self.next_key += 1;
        }
        self.live += 1;
        self.version += 1;
        Ok(key)
    }

    /// Applies `changes` to the rows at `ids`. All-or-nothing: uniqueness
    /// is checked for every updated row before any row changes.
    pub(crate) fn update(&mut self, ids: &[usize], changes: &Row) -> TableResult<usize> {
        if let Some(unknown) = changes.columns().find(|c| !self.columns.contains(c)) {
            return Err(TableError::UnknownColumn(unknown.to_string()));
        }
        let mut coerced = Row::new();
        for (column, value) in changes {
            let def = self.def(column)?;
            let value = def.column_type.coerce(column, value.clone())?;
            if def.index == IndexKind::Primary && value.is_null() {
                return Err(TableError::MissingColumn(column.clone()));
            }
            coerced.set(column.clone(), value);
        }

        let targets: HashSet<usize> = ids.iter().copied().collect();
        let mut updated: Vec<(usize, RowKey, Row)> = Vec::with_capacity(ids.len());
        for &id in ids {
            let Some((old_key, old)) = self.slot(id) else {
                continue;
            };
            let mut row = old.clone();
            for (column, value) in &coerced {
                row.set(column.clone(), value.clone());
            }
            let key = self.primary_key(&row).unwrap_or_else(|| old_key.clone());
            updated.push((id, key, row));
        }

        for def in self.unique_columns() {
            if !coerced.contains(&def.name) {
                continue;
            }
            let mut seen = HashSet::new();
            for (_, _, row) in &updated {
                let value = row.value(&def.name);
                if value.is_null() {
                    continue;
                }
                let fresh = seen.insert(IndexKey::from_value(value));
                if !fresh || self.conflicts(&def, row, &targets) {
                    return Err(TableError::UniqueViolation {
                        column: def.name.clone(),
                        value: value.to_string(),
                    });
                }
            }
        }

        for (_, key, row) in &updated {
            if let Some(other) = self.keys.get(key) {
                if !targets.contains(other) {
                    return Err(self.duplicate_key(row, key));
                }
            }
        }

        let count = updated.len();
        for (id, _, _) in &updated {
            if let Some((old_key, old_row)) = self.slots[*id].take() {
                self.unindex_row(*id, &old_row);
                self.keys.remove(&old_key);
            }
        }
        for (id, key, row) in updated {
            self.index_row(id, &row);
            self.keys.insert(key.clone(), id);
            self.slots[id] = Some((key, row));
        }
        if count > 0 {
            self.version += 1;
        }
        Ok(count)
    }

    pub(crate) fn delete(&mut self, ids: &[usize]) -> usize {
        let mut count = 0;
        for &id in ids {
            let Some((key, row)) = self.slots.get_mut(id).and_then(Option::take) else {
                continue;
            };
            self.unindex_row(id, &row);
            self.keys.remove(&key);
            self.live -= 1;
            count += 1;
        }
        if count > 0 {
            self.version += 1;
        }
        count
    }

    fn def(&self, column: &str) -> TableResult<&ColumnDef> {
        self.columns
            .get(column)
            .ok_or_else(|| TableError::UnknownColumn(column.to_string()))
    }

    fn conform(&self, fields: Row) -> TableResult<Row> {
        let row = crate::backend::rows::conform(&self.columns, fields)?;
        if let Some(primary) = self.columns.primary() {
            if row.value(&primary.name).is_null() {
                return Err(TableError::MissingColumn(primary.name.clone()));
            }
        }
        Ok(row)
    }

    /// Row key taken from the primary column, if the schema has one
    fn primary_key(&self, row: &Row) -> Option<RowKey> {
        let primary = self.columns.primary()?;
        let value = row.value(&primary.name);
        Some(RowKey::from_value(value).unwrap_or_else(|| RowKey::Text(value.to_text())))
    }

    fn duplicate_key(&self, row: &Row, key: &RowKey) -> TableError {
        let column = self
            .columns
            .primary()
            .map(|d| d.name.clone())
            .unwrap_or_default();
        let value = if column.is_empty() {
            key.to_string()
        } else {
            row.value(&column).to_string()
        };
        TableError::UniqueViolation { column, value }
    }

    fn unique_columns(&self) -> Vec<ColumnDef> {
        self.columns
            .iter()
            .filter(|d| d.index.is_unique())
            .cloned()
            .collect()
    }

    /// True if another live row (outside `ignore`) shares the leading value
    /// of a unique index. NULL never conflicts.
    fn conflicts(&mut self, def: &ColumnDef, row: &Row, ignore: &HashSet<usize>) -> bool {
        let value = row.value(&def.name);
        if value.is_null() {
            return false;
        }
        let Some(index) = self.indexes.get_mut(&def.name) else {
            return false;
        };
        let key = IndexKey::from_value(value);
        if def.trailing.is_empty() {
            return index
                .get(key.as_bytes())
                .iter()
                .any(|id| !ignore.contains(&(*id as usize)));
        }
        let prefix = KeyRange::prefix(&key);
        let mut range = index.range(prefix.low(), prefix.high(), false);
        while let Some((_, id)) = range.next_entry() {
            if !ignore.contains(&(id as usize)) {
                return true;
            }
        }
        false
    }

    fn index_key(def: &ColumnDef, row: &Row) -> IndexKey {
        let values: Vec<&Value> = def.index_columns().iter().map(|c| row.value(c)).collect();
        IndexKey::composite(values)
    }

    fn index_row(&mut self, id: usize, row: &Row) {
        for def in self.columns.iter() {
            if let Some(index) = self.indexes.get_mut(&def.name) {
                index.insert(Self::index_key(def, row).as_bytes(), id as RowId);
            }
        }
    }

    fn unindex_row(&mut self, id: usize, row: &Row) {
        for def in self.columns.iter() {
            if let Some(index) = self.indexes.get_mut(&def.name) {
                index.remove(Self::index_key(def, row).as_bytes(), id as RowId);
            }
        }
    }
}
