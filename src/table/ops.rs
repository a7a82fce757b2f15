//! Operator construction
//!
//! Each function validates its arguments against the source, offers the
//! operation to the source through its `push_*` hook and otherwise wraps
//! the source in the generic operator. A source that carries a limit or an
//! offset is never asked to absorb a filter, order or set operation.

use std::collections::HashSet;

use super::errors::{TableError, TableResult};
use super::source::SourceRef;
use super::view::ViewState;
use crate::backend::EmptyTable;
use crate::planner::{Condition, Filter, InSet, OrderSpec, Predicate};
use crate::schema::SchemaError;
use crate::wrappers::{
    AliasWrapper, Barrier, DistinctWrapper, ExceptWrapper, FilterWrapper, OrWrapper, SortWrapper,
    UnionWrapper,
};

fn resolve(source: &SourceRef, column: &str) -> TableResult<String> {
    source
        .resolve_column(column)
        .ok_or_else(|| TableError::UnknownColumn(column.to_string()))
}

/// Re-applies the caller's projection to a source returned by a push hook
fn keep_visible(pushed: SourceRef, view: &ViewState) -> SourceRef {
    if pushed.view().visible == view.visible {
        pushed
    } else {
        let next = pushed.view().with_visible(view.visible.clone());
        pushed.with_view(next)
    }
}

pub(crate) fn filter(source: &SourceRef, filter: Filter) -> TableResult<SourceRef> {
    let column = resolve(source, &filter.column)?;
    let filter = if column == filter.column {
        filter
    } else {
        filter.with_column(column)
    };
    if let Condition::In(InSet::Query(table)) = &filter.condition {
        let exposed = table.visible_columns().len();
        if exposed != 1 {
            return Err(TableError::InvalidOperand {
                column: filter.column.clone(),
                reason: format!("IN query must expose one column, found {}", exposed),
            });
        }
    }
    if filter.is_never() {
        return Ok(EmptyTable::of(source.as_ref()));
    }
    if !source.view().is_paginated() {
        if let Some(pushed) = source.push_filter(&filter)? {
            return Ok(keep_visible(pushed, source.view()));
        }
    }
    Ok(FilterWrapper::wrap(source.clone(), filter))
}

pub(crate) fn order(source: &SourceRef, spec: &OrderSpec) -> TableResult<SourceRef> {
    let mut resolved = Vec::with_capacity(spec.len());
    for column in spec.columns() {
        resolved.push(resolve(source, column)?);
    }
    let mut names = resolved.into_iter();
    let spec = spec.map_columns(|c| names.next().unwrap_or_else(|| c.to_string()));

    if source.ordering() == Some(&spec) {
        return Ok(source.clone());
    }
    if source.view().is_paginated() {
        if spec.is_empty() {
            return Ok(source.clone());
        }
        return Ok(SortWrapper::wrap(source.clone(), spec));
    }
    if let Some(pushed) = source.push_order(&spec)? {
        return Ok(keep_visible(pushed, source.view()));
    }
    if spec.is_empty() {
        return Ok(source.clone());
    }
    Ok(SortWrapper::wrap(source.clone(), spec))
}

pub(crate) fn paginate(source: &SourceRef, limit: Option<usize>, offset: usize) -> SourceRef {
    let view = ViewState {
        visible: source.view().visible.clone(),
        limit,
        offset,
    };
    source.with_view(view)
}

pub(crate) fn columns(source: &SourceRef, names: &[&str]) -> TableResult<SourceRef> {
    let visible = source.view().visible_columns(source.columns());
    let mut selected: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let column = resolve(source, name)?;
        if !visible.contains(&column) {
            return Err(TableError::UnknownColumn(name.to_string()));
        }
        if !selected.contains(&column) {
            selected.push(column);
        }
    }
    Ok(source.with_view(source.view().with_visible(Some(selected))))
}

pub(crate) fn union(a: &SourceRef, b: &SourceRef) -> TableResult<SourceRef> {
    let left = a.view().visible_columns(a.columns());
    let right = b.view().visible_columns(b.columns());
    if let Some(missing) = left.iter().find(|c| !right.contains(c)) {
        return Err(TableError::SchemaMismatch(missing.clone()));
    }
    if let Some(extra) = right.iter().find(|c| !left.contains(c)) {
        return Err(TableError::SchemaMismatch(extra.clone()));
    }
    let merged = a
        .columns()
        .project(&left)
        .merge(&b.columns().project(&left))
        .map_err(|e| match e {
            SchemaError::TypeMismatch { column, .. } => TableError::SchemaMismatch(column),
            SchemaError::NameMismatch { left, .. } => TableError::SchemaMismatch(left),
            other => TableError::Schema(other),
        })?;

    if !a.view().is_paginated() && !b.view().is_paginated() {
        if let Some(pushed) = a.push_union(b)? {
            return Ok(pushed);
        }
    }
    let freeze = |side: &SourceRef| {
        if side.view().is_paginated() {
            Barrier::wrap(side.clone())
        } else {
            side.clone()
        }
    };
    Ok(UnionWrapper::wrap(freeze(a), freeze(b), merged))
}

pub(crate) fn except(a: &SourceRef, b: &SourceRef) -> TableResult<SourceRef> {
    let excluded = b.view().visible_columns(b.columns());
    let mut pairs = Vec::with_capacity(excluded.len());
    for column in excluded {
        let own = a
            .resolve_column(&column)
            .ok_or_else(|| TableError::SchemaMismatch(column.clone()))?;
        pairs.push((own, column));
    }
    if !a.view().is_paginated() {
        if let Some(pushed) = a.push_except(b)? {
            return Ok(keep_visible(pushed, a.view()));
        }
    }
    Ok(ExceptWrapper::wrap(a.clone(), b.clone(), pairs))
}

pub(crate) fn distinct(source: &SourceRef) -> TableResult<SourceRef> {
    if !source.view().is_paginated() {
        if let Some(pushed) = source.push_distinct()? {
            return Ok(keep_visible(pushed, source.view()));
        }
    }
    Ok(DistinctWrapper::wrap(source.clone()))
}

pub(crate) fn or(source: &SourceRef, predicates: &[Predicate]) -> TableResult<SourceRef> {
    let mut groups = Vec::with_capacity(predicates.len());
    let mut matches_all = predicates.is_empty();
    for predicate in predicates {
        let filters = predicate.filters()?;
        let mut group = Vec::with_capacity(filters.len());
        for f in filters {
            let column = resolve(source, &f.column)?;
            group.push(f.with_column(column));
        }
        if predicate.is_never() {
            continue;
        }
        if predicate.is_empty() {
            matches_all = true;
        }
        groups.push(group);
    }
    if matches_all {
        return Ok(source.clone());
    }
    if groups.is_empty() {
        return Ok(EmptyTable::of(source.as_ref()));
    }
    if !source.view().is_paginated() {
        if let Some(pushed) = source.push_or(&groups)? {
            return Ok(keep_visible(pushed, source.view()));
        }
    }
    Ok(OrWrapper::wrap(source.clone(), groups))
}

pub(crate) fn alias(source: &SourceRef, prefix: &str) -> TableResult<SourceRef> {
    if prefix.is_empty() || prefix.contains('.') {
        return Err(TableError::InvalidOperand {
            column: prefix.to_string(),
            reason: "alias must be a non-empty name without '.'".into(),
        });
    }
    Ok(AliasWrapper::wrap(source.clone(), Some(prefix.to_string()), Vec::new()))
}

pub(crate) fn rename(source: &SourceRef, from: &str, to: &str) -> TableResult<SourceRef> {
    let column = resolve(source, from)?;
    let taken: HashSet<String> = source.columns().names().into_iter().collect();
    if column != to && taken.contains(to) {
        return Err(SchemaError::DuplicateColumn(to.to_string()).into());
    }
    Ok(AliasWrapper::wrap(
        source.clone(),
        None,
        vec![(column, to.to_string())],
    ))
}
