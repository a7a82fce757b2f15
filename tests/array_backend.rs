//! Array Backend Tests
//!
//! Tests for the indexed in-memory backend:
//! - Native index ordering and the documented scenarios
//! - Unique and primary enforcement
//! - Mutations through views, cache invalidation, foreign targets
//! - Membership checks over buffered, paginated and unbuffered views
//! - Composite indexes and collation

use std::cmp::Ordering;

use tabula::value::collation;
use tabula::{
    ArrayTable, ColumnDef, ColumnSet, ColumnType, EngineConfig, MutableTable, Row, RowKey, Table,
    TableError,
};

// =============================================================================
// Helper Functions
// =============================================================================

fn people_columns() -> ColumnSet {
    ColumnSet::new(vec![
        ColumnDef::new("id", ColumnType::Integer).primary(),
        ColumnDef::new("name", ColumnType::Text).indexed(),
        ColumnDef::new("age", ColumnType::Integer),
    ])
    .unwrap()
}

fn person(id: i64, name: &str) -> Row {
    Row::new().with("id", id).with("name", name)
}

fn people() -> ArrayTable {
    let backend = ArrayTable::new(people_columns());
    backend.insert(person(1, "Bob").with("age", 40)).unwrap();
    backend.insert(person(2, "Ann").with("age", 25)).unwrap();
    backend.insert(person(3, "Cid").with("age", 31)).unwrap();
    backend
}

fn ids(table: &Table) -> Vec<i64> {
    table
        .keys()
        .unwrap()
        .iter()
        .map(|k| k.as_int().unwrap())
        .collect()
}

fn names(table: &Table) -> Vec<String> {
    table
        .rows()
        .unwrap()
        .iter()
        .map(|r| r.value("name").to_text())
        .collect()
}

// =============================================================================
// Scenarios
// =============================================================================

/// Ordering by the indexed name column yields Ann(2), Bob(1), Cid(3).
#[test]
fn test_order_by_indexed_name() {
    let table = people().table().order("name ASC").unwrap();
    assert_eq!(ids(&table), vec![2, 1, 3]);
    assert_eq!(names(&table), vec!["Ann", "Bob", "Cid"]);

    let plan = table.explain();
    let scan = plan.find("ArrayScan").unwrap();
    assert_eq!(scan.property("scan"), Some("INDEX_ORDER"));
}

/// Two different equalities on the same column yield nothing.
#[test]
fn test_conflicting_equalities_are_empty() {
    let table = people().table();
    let none = table.eq("id", 2).unwrap().eq("id", 3).unwrap();
    assert_eq!(none.count().unwrap(), 0);
    assert!(!none.exists().unwrap());
    assert!(none.iter().next().is_none());

    let same = table.eq("id", 2).unwrap().eq("id", 2).unwrap();
    assert_eq!(ids(&same), ids(&table.eq("id", 2).unwrap()));
}

#[test]
fn test_like_wildcards() {
    let backend = people();
    backend.insert(person(4, "Bobby")).unwrap();
    backend.insert(person(5, "ob")).unwrap();
    let matched = backend.table().like("name", "B_b").unwrap();
    assert_eq!(names(&matched), vec!["Bob"]);

    let insensitive = backend.table().like("name", "b%").unwrap();
    assert_eq!(ids(&insensitive), vec![1, 4]);
}

#[test]
fn test_descending_order_puts_nulls_first() {
    let backend = people();
    backend.insert(Row::new().with("id", 4)).unwrap();
    let desc = backend.table().order("name DESC").unwrap();
    assert_eq!(ids(&desc), vec![4, 3, 1, 2]);
    let asc = backend.table().order("name").unwrap();
    assert_eq!(ids(&asc), vec![2, 1, 3, 4]);
}

// =============================================================================
// Constraints
// =============================================================================

#[test]
fn test_primary_key_is_required_and_unique() {
    let backend = people();
    let missing = backend.insert(Row::new().with("name", "Dee"));
    assert!(matches!(missing, Err(TableError::MissingColumn(c)) if c == "id"));

    let duplicate = backend.insert(person(2, "Dee"));
    assert!(matches!(duplicate, Err(TableError::UniqueViolation { .. })));
    assert_eq!(backend.len(), 3);
}

#[test]
fn test_insert_rejects_unknown_columns_and_bad_values() {
    let backend = people();
    assert!(matches!(
        backend.insert(person(9, "Eve").with("nickname", "E")),
        Err(TableError::UnknownColumn(_))
    ));
    assert!(backend.insert(person(9, "Eve").with("age", "old")).is_err());
    assert_eq!(backend.len(), 3);
}

#[test]
fn test_unique_column_allows_many_nulls() {
    let columns = ColumnSet::new(vec![
        ColumnDef::new("email", ColumnType::Text).unique(),
        ColumnDef::new("name", ColumnType::Text),
    ])
    .unwrap();
    let backend = ArrayTable::new(columns);
    let first = backend.insert(Row::new().with("name", "a")).unwrap();
    let second = backend.insert(Row::new().with("name", "b")).unwrap();
    assert_ne!(first, second);
    backend
        .insert(Row::new().with("email", "x@example.com"))
        .unwrap();
    assert!(backend
        .insert(Row::new().with("email", "x@example.com"))
        .is_err());
}

// =============================================================================
// Mutation
// =============================================================================

#[test]
fn test_update_and_delete_through_views() {
    let backend = people();
    let all = backend.table();
    let before = all.count().unwrap();

    let changed = backend
        .update(&all.gte("age", 30).unwrap(), &Row::new().with("age", 50))
        .unwrap();
    assert_eq!(changed, 2);
    assert_eq!(ids(&all.eq("age", 50).unwrap()), vec![1, 3]);

    let removed = backend.delete(&all.eq("name", "Ann").unwrap()).unwrap();
    assert_eq!(removed, 1);
    assert_eq!(all.count().unwrap(), before - 1);
    assert_eq!(all.load(&RowKey::Int(2)).unwrap(), None);
}

#[test]
fn test_update_keeps_constraints_all_or_nothing() {
    let backend = people();
    let result = backend.update(&backend.table(), &Row::new().with("id", 7));
    assert!(matches!(result, Err(TableError::UniqueViolation { .. })));
    assert_eq!(ids(&backend.table()), vec![1, 2, 3]);
}

#[test]
fn test_views_from_other_backends_are_rejected() {
    let a = people();
    let b = people();
    let err = a.delete(&b.table()).unwrap_err();
    assert!(matches!(err, TableError::ForeignQuery));
    assert!(err.is_usage_error());
    assert_eq!(a.len(), 3);
}

#[test]
fn test_cached_results_follow_mutations() {
    let backend = people();
    let view = backend.table().order("name").unwrap();
    assert_eq!(view.count().unwrap(), 3);
    assert_eq!(names(&view), vec!["Ann", "Bob", "Cid"]);

    backend.insert(person(4, "Abe")).unwrap();
    assert_eq!(view.count().unwrap(), 4);
    assert_eq!(names(&view), vec!["Abe", "Ann", "Bob", "Cid"]);
    assert!(view.has(&Row::new().with("name", "Abe")).unwrap());
}

// =============================================================================
// Membership
// =============================================================================

#[test]
fn test_has_primary_miss_on_stale_buffer_falls_through() {
    let backend = people();
    let view = backend.table();
    assert_eq!(view.to_vec().unwrap().len(), 3);
    assert!(view.has(&person(2, "Ann")).unwrap());

    backend.insert(person(4, "Dee")).unwrap();
    assert!(view.has(&Row::new().with("id", 4)).unwrap());
    assert!(view.has(&person(4, "Dee")).unwrap());
}

#[test]
fn test_has_primary_hit_requires_every_column() {
    let view = people().table();
    view.to_vec().unwrap();
    assert!(!view.has(&person(1, "wrong")).unwrap());
    assert!(view.has(&person(1, "Bob")).unwrap());
    assert!(!view.has(&Row::new().with("id", 9)).unwrap());
}

#[test]
fn test_has_respects_page() {
    let view = people().table().order("id").unwrap().limit(1);
    assert!(view.has(&Row::new().with("id", 1)).unwrap());
    assert!(!view.has(&Row::new().with("id", 2)).unwrap());

    view.to_vec().unwrap();
    assert!(!view.has(&person(3, "Cid")).unwrap());
}

#[test]
fn test_has_through_unique_column_without_buffer() {
    let columns = ColumnSet::new(vec![
        ColumnDef::new("id", ColumnType::Integer).primary(),
        ColumnDef::new("badge", ColumnType::Integer).unique(),
        ColumnDef::new("name", ColumnType::Text),
    ])
    .unwrap();
    let backend = ArrayTable::with_config(columns, EngineConfig::default().with_buffer_threshold(2));
    for (id, badge, name) in [(1, 70, "Bob"), (2, 71, "Ann"), (3, 72, "Cid")] {
        backend
            .insert(Row::new().with("id", id).with("badge", badge).with("name", name))
            .unwrap();
    }
    let view = backend.table();
    // Three rows exceed the threshold, so nothing stays buffered
    assert_eq!(view.count().unwrap(), 3);
    view.to_vec().unwrap();

    assert!(view.has(&Row::new().with("badge", "71")).unwrap());
    assert!(view.has(&Row::new().with("badge", "72").with("name", "Cid")).unwrap());
    assert!(!view.has(&Row::new().with("badge", "72").with("name", "Ann")).unwrap());
    assert!(!view.has(&Row::new().with("badge", "99")).unwrap());
    assert!(view.has(&Row::new().with("id", "2").with("name", "Ann")).unwrap());
}

// =============================================================================
// Composite Indexes and Collation
// =============================================================================

#[test]
fn test_composite_index_serves_prefix_order() {
    let columns = ColumnSet::new(vec![
        ColumnDef::new("city", ColumnType::Text).with_trailing(["zip"]),
        ColumnDef::new("zip", ColumnType::Integer),
    ])
    .unwrap();
    let backend = ArrayTable::new(columns);
    for (city, zip) in [("Oslo", 150), ("Bergen", 5003), ("Oslo", 101), ("Bergen", 5000)] {
        backend
            .insert(Row::new().with("city", city).with("zip", zip))
            .unwrap();
    }

    let full = backend.table().order("city, zip").unwrap();
    let zips: Vec<i64> = full
        .rows()
        .unwrap()
        .iter()
        .map(|r| r.value("zip").as_int().unwrap())
        .collect();
    assert_eq!(zips, vec![5000, 5003, 101, 150]);
    assert_eq!(
        full.explain().find("ArrayScan").unwrap().property("scan"),
        Some("INDEX_ORDER")
    );

    let in_oslo = backend.table().eq("city", "Oslo").unwrap().order("zip DESC").unwrap();
    let zips: Vec<i64> = in_oslo
        .rows()
        .unwrap()
        .iter()
        .map(|r| r.value("zip").as_int().unwrap())
        .collect();
    assert_eq!(zips, vec![150, 101]);
}

#[test]
fn test_collator_overrides_text_order() {
    let backend = people();
    backend.insert(person(4, "ann")).unwrap();

    let raw = backend.table().order("name").unwrap();
    assert_eq!(names(&raw), vec!["Ann", "Bob", "Cid", "ann"]);

    collation::install(|a: &str, b: &str| -> Ordering {
        a.to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| a.cmp(b))
    });
    let collated = backend.table().order("name").unwrap();
    let result = names(&collated);
    collation::reset();
    assert_eq!(result, vec!["Ann", "ann", "Bob", "Cid"]);
}

#[test]
fn test_pagination_over_index_order() {
    let table = people().table().order("name").unwrap().limit(2).offset(1);
    assert_eq!(names(&table), vec!["Bob", "Cid"]);
    assert_eq!(table.count().unwrap(), 2);
}
