//! Per-view projection and pagination state

use super::errors::TableResult;
use super::source::RowIter;
use crate::planner::ExplainNode;
use crate::schema::ColumnSet;
use crate::value::{Row, RowKey};

/// Projection and pagination owned by one view
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    /// Visible columns in order; `None` shows every column
    pub visible: Option<Vec<String>>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl ViewState {
    /// True if the view carries a limit or an offset
    pub fn is_paginated(&self) -> bool {
        self.limit.is_some() || self.offset > 0
    }

    /// Same projection without pagination
    pub fn unpaginated(&self) -> ViewState {
        ViewState {
            visible: self.visible.clone(),
            limit: None,
            offset: 0,
        }
    }

    /// Same pagination with another projection
    pub fn with_visible(&self, visible: Option<Vec<String>>) -> ViewState {
        ViewState {
            visible,
            limit: self.limit,
            offset: self.offset,
        }
    }

    /// Names of the visible columns of `columns`
    pub fn visible_columns(&self, columns: &ColumnSet) -> Vec<String> {
        match &self.visible {
            Some(names) => names.clone(),
            None => columns.names(),
        }
    }

    /// Rows a scan may stop after, if bounded
    pub fn scan_cap(&self) -> Option<usize> {
        self.limit.map(|limit| self.offset.saturating_add(limit))
    }

    /// Count after pagination, given the unpaginated count
    pub fn paginated_count(&self, total: usize) -> usize {
        let remaining = total.saturating_sub(self.offset);
        match self.limit {
            Some(limit) => remaining.min(limit),
            None => remaining,
        }
    }

    /// Applies offset and limit to a row stream. Errors are passed through
    /// without counting against either.
    pub fn paginate<'a>(&self, rows: RowIter<'a>) -> RowIter<'a> {
        if !self.is_paginated() {
            return rows;
        }
        Box::new(Paginate {
            inner: rows,
            skip: self.offset,
            remaining: self.limit,
        })
    }

    /// Adds projection and pagination properties to an explain node
    pub fn describe(&self, mut node: ExplainNode) -> ExplainNode {
        if let Some(visible) = &self.visible {
            node = node.with("columns", visible.join(", "));
        }
        if let Some(limit) = self.limit {
            node = node.with("limit", limit);
        }
        if self.offset > 0 {
            node = node.with("offset", self.offset);
        }
        node
    }
}

struct Paginate<'a> {
    inner: RowIter<'a>,
    skip: usize,
    remaining: Option<usize>,
}

impl Iterator for Paginate<'_> {
    type Item = TableResult<(RowKey, Row)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == Some(0) {
            return None;
        }
        loop {
            let item = self.inner.next()?;
            if item.is_err() {
                return Some(item);
            }
            if self.skip > 0 {
                self.skip -= 1;
                continue;
            }
            if let Some(remaining) = self.remaining.as_mut() {
                *remaining -= 1;
            }
            return Some(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(n: usize) -> RowIter<'static> {
        Box::new((0..n).map(|i| Ok((RowKey::from(i), Row::new().with("i", i)))))
    }

    #[test]
    fn test_paginate() {
        let view = ViewState {
            visible: None,
            limit: Some(2),
            offset: 3,
        };
        let keys: Vec<RowKey> = view.paginate(rows(10)).map(|r| r.unwrap().0).collect();
        assert_eq!(keys, vec![RowKey::Int(3), RowKey::Int(4)]);
    }

    #[test]
    fn test_zero_limit() {
        let view = ViewState {
            limit: Some(0),
            ..ViewState::default()
        };
        assert_eq!(view.paginate(rows(5)).count(), 0);
        assert_eq!(view.paginated_count(5), 0);
    }

    #[test]
    fn test_paginated_count() {
        let view = ViewState {
            visible: None,
            limit: Some(10),
            offset: 4,
        };
        assert_eq!(view.paginated_count(6), 2);
        assert_eq!(view.scan_cap(), Some(14));
        assert_eq!(ViewState::default().paginated_count(6), 6);
    }
}
