//! In-memory row sorting
//!
//! Sorting is stable: rows with equal sort keys keep their input order in
//! both directions. Text compares through the installed collator.

use std::cmp::Ordering;

use crate::planner::{OrderSpec, SortDirection};
use crate::value::{Row, RowKey};

/// Sorts materialized rows
pub struct RowSorter;

impl RowSorter {
    /// Sorts keyed rows by an order specification.
    pub fn sort(rows: &mut [(RowKey, Row)], spec: &OrderSpec) {
        if spec.is_empty() {
            return;
        }
        rows.sort_by(|(_, a), (_, b)| Self::compare(a, b, spec));
    }

    /// Compares two rows under an order specification.
    ///
    /// NULL sorts after every value ascending and before every value
    /// descending.
    pub fn compare(a: &Row, b: &Row, spec: &OrderSpec) -> Ordering {
        for key in spec.keys() {
            let ordering = a.value(&key.column).cmp_collated(b.value(&key.column));
            let ordering = match key.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}
