//! Table Algebra Tests
//!
//! Tests for laws every view must satisfy regardless of backend:
//! - Operators never change the receiver
//! - Filter composition, projection narrowing
//! - Union, except and distinct laws by row key
//! - OR predicates, value sets and pagination barriers

use std::collections::BTreeSet;

use tabula::{
    ArrayTable, ColumnDef, ColumnSet, ColumnType, EmptyTable, MutableTable, Predicate, Row,
    RowKey, RowsTable, Table, TableError, ValueSet,
};

// =============================================================================
// Helper Functions
// =============================================================================

fn columns() -> ColumnSet {
    ColumnSet::new(vec![
        ColumnDef::new("id", ColumnType::Integer).primary(),
        ColumnDef::new("status", ColumnType::Text).indexed(),
        ColumnDef::new("score", ColumnType::Integer),
    ])
    .unwrap()
}

fn fixture() -> Table {
    let backend = ArrayTable::new(columns());
    let data = [
        (1, "active", 10),
        (2, "pending", 20),
        (3, "active", 30),
        (4, "deleted", 10),
        (5, "pending", 20),
        (6, "active", 10),
    ];
    for (id, status, score) in data {
        backend
            .insert(
                Row::new()
                    .with("id", id)
                    .with("status", status)
                    .with("score", score),
            )
            .unwrap();
    }
    backend.table()
}

fn key_set(table: &Table) -> BTreeSet<RowKey> {
    table.keys().unwrap().into_iter().collect()
}

// =============================================================================
// Immutability and Composition
// =============================================================================

#[test]
fn test_operators_leave_receiver_unchanged() {
    let t = fixture().gte("score", 20).unwrap();
    let before = t.to_vec().unwrap();

    let _ = t.order("score DESC").unwrap();
    let _ = t.limit(1).offset(1);
    let _ = t.columns(&["id"]).unwrap();
    let _ = t.eq("status", "active").unwrap();
    let _ = t.distinct().unwrap();
    let _ = t.union(&fixture()).unwrap();

    assert_eq!(t.to_vec().unwrap(), before);
    assert_eq!(t.visible_columns(), vec!["id", "status", "score"]);
}

#[test]
fn test_equal_filters_compose() {
    let t = fixture();
    let once = t.eq("status", "active").unwrap();
    let twice = once.eq("status", "active").unwrap();
    assert_eq!(once.keys().unwrap(), twice.keys().unwrap());

    let clash = once.eq("status", "pending").unwrap();
    assert_eq!(clash.count().unwrap(), 0);
}

#[test]
fn test_projection_only_narrows() {
    let t = fixture();
    let narrowed = t.columns(&["status", "id"]).unwrap();
    let again = narrowed.columns(&["status", "id"]).unwrap();
    assert_eq!(narrowed.to_vec().unwrap(), again.to_vec().unwrap());
    assert_eq!(narrowed.visible_columns(), vec!["status", "id"]);

    let widened = narrowed.columns(&["score"]);
    assert!(matches!(widened, Err(TableError::UnknownColumn(c)) if c == "score"));
}

#[test]
fn test_unknown_columns_fail_at_call_site() {
    let t = fixture();
    assert!(matches!(t.eq("nope", 1), Err(TableError::UnknownColumn(_))));
    assert!(matches!(t.order("nope DESC"), Err(TableError::UnknownColumn(_))));
    assert!(t.order("score SIDEWAYS").is_err());
}

#[test]
fn test_null_operand_and_empty_set_are_static() {
    let t = fixture();
    let nothing = t.eq("status", tabula::Value::Null).unwrap();
    assert!(nothing.explain().find("Empty").is_some());
    assert_eq!(nothing.count().unwrap(), 0);

    let empty_in = t.is_in("id", Vec::<i64>::new()).unwrap();
    assert_eq!(empty_in.count().unwrap(), 0);
    assert_eq!(empty_in.visible_columns(), t.visible_columns());
}

// =============================================================================
// Set Operations
// =============================================================================

#[test]
fn test_union_idempotent_and_commutative() {
    let t = fixture();
    let a = t.eq("status", "active").unwrap();
    let b = t.gte("score", 20).unwrap();

    assert_eq!(key_set(&a.union(&a).unwrap()), key_set(&a));
    assert_eq!(a.union(&a).unwrap().count().unwrap(), a.count().unwrap());
    assert_eq!(key_set(&a.union(&b).unwrap()), key_set(&b.union(&a).unwrap()));
}

#[test]
fn test_except_of_except_is_intersection() {
    let t = fixture();
    let a = t.eq("status", "active").unwrap();
    let b = t.lte("score", 10).unwrap();

    let law = a.except(&a.except(&b).unwrap()).unwrap();
    let expected: BTreeSet<RowKey> = key_set(&a).intersection(&key_set(&b)).cloned().collect();
    assert_eq!(key_set(&law), expected);
}

#[test]
fn test_union_requires_same_columns() {
    let t = fixture();
    let err = t
        .columns(&["id", "status"])
        .unwrap()
        .union(&t.columns(&["id", "score"]).unwrap())
        .unwrap_err();
    assert!(matches!(err, TableError::SchemaMismatch(c) if c == "status"));
}

#[test]
fn test_distinct_is_idempotent() {
    let t = fixture().columns(&["status", "score"]).unwrap();
    let once = t.distinct().unwrap();
    let twice = once.distinct().unwrap();
    assert_eq!(once.rows().unwrap(), twice.rows().unwrap());
    assert_eq!(once.count().unwrap(), 4);
}

#[test]
fn test_paginated_union_keeps_its_page() {
    let t = fixture();
    let first_two = t.order("id").unwrap().limit(2);
    let last = t.eq("id", 6).unwrap();
    let merged = first_two.union(&last).unwrap();
    let keys: Vec<i64> = merged
        .keys()
        .unwrap()
        .iter()
        .map(|k| k.as_int().unwrap())
        .collect();
    assert_eq!(keys, vec![1, 2, 6]);
    assert!(merged.explain().find("Barrier").is_some());
}

#[test]
fn test_filter_after_limit_filters_the_page() {
    let t = fixture();
    let page = t.order("id").unwrap().limit(3);
    let active = page.eq("status", "active").unwrap();
    let keys: Vec<i64> = active
        .keys()
        .unwrap()
        .iter()
        .map(|k| k.as_int().unwrap())
        .collect();
    assert_eq!(keys, vec![1, 3]);
}

// =============================================================================
// OR Predicates and Value Sets
// =============================================================================

#[test]
fn test_or_of_predicates() {
    let t = fixture();
    let either = t
        .or(&[
            Predicate::new().eq("status", "deleted"),
            Predicate::new().eq("status", "active").gt("score", 10),
        ])
        .unwrap();
    assert_eq!(
        key_set(&either),
        [RowKey::Int(3), RowKey::Int(4)].into_iter().collect()
    );
    assert_eq!(key_set(&t.or(&[]).unwrap()), key_set(&t));
}

#[test]
fn test_or_rejects_unbound_parameters() {
    let t = fixture();
    let branch = Predicate::new().param("status", tabula::Operator::Eq, "s");
    assert!(matches!(t.or(&[branch.clone()]), Err(TableError::UnboundPredicate(_))));

    let bound = branch
        .bind(&[("s".to_string(), tabula::Value::from("pending"))].into_iter().collect())
        .unwrap();
    assert_eq!(t.or(&[bound]).unwrap().count().unwrap(), 2);
}

#[test]
fn test_value_set_membership() {
    let set = ValueSet::new("status", ["active", "pending"]);
    assert!(set.has_member(&Row::new().with("status", "active")));
    assert!(!set.has_member(&Row::new().with("status", "deleted")));

    let t = fixture();
    assert_eq!(t.is_in_set("status", set).unwrap().count().unwrap(), 5);
}

#[test]
fn test_view_as_in_operand() {
    let t = fixture();
    let pending_scores = t.eq("status", "pending").unwrap().columns(&["score"]).unwrap();
    let matched = t.is_in_set("score", pending_scores).unwrap();
    assert_eq!(
        key_set(&matched),
        [RowKey::Int(2), RowKey::Int(5)].into_iter().collect()
    );

    let two_columns = t.columns(&["id", "score"]).unwrap();
    assert!(t.is_in_set("score", two_columns).is_err());
}

// =============================================================================
// Static Sources
// =============================================================================

#[test]
fn test_rows_table_uses_generic_wrappers() {
    let rows = vec![
        Row::new().with("id", 1).with("status", "a").with("score", 3),
        Row::new().with("id", 2).with("status", "b").with("score", 1),
    ];
    let t = RowsTable::from_rows(columns(), rows).unwrap();
    let sorted = t.order("score").unwrap();
    assert_eq!(sorted.keys().unwrap(), vec![RowKey::Int(1), RowKey::Int(0)]);
    assert!(sorted.explain().find("Sort").is_some());
    assert!(t.eq("status", "b").unwrap().explain().find("Filter").is_some());
}

#[test]
fn test_empty_table_keeps_columns() {
    let empty = Table::new(EmptyTable::new(columns()));
    assert_eq!(empty.visible_columns(), vec!["id", "status", "score"]);
    assert!(!empty.exists().unwrap());
    assert!(empty.order("score").unwrap().to_vec().unwrap().is_empty());
}
