//! Column descriptors and column sets

use serde::{Deserialize, Serialize};

use super::errors::{SchemaError, SchemaResult};
use super::types::{ColumnType, IndexKind};

/// Static description of one column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(flatten)]
    pub column_type: ColumnType,
    #[serde(default)]
    pub index: IndexKind,
    /// Further columns of a composite index led by this column, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trailing: Vec<String>,
}

impl ColumnDef {
    /// Creates an unindexed column
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            index: IndexKind::None,
            trailing: Vec::new(),
        }
    }

    pub fn primary(mut self) -> Self {
        self.index = IndexKind::Primary;
        self
    }

    pub fn unique(mut self) -> Self {
        self.index = IndexKind::Unique;
        self
    }

    pub fn indexed(mut self) -> Self {
        if self.index == IndexKind::None {
            self.index = IndexKind::Index;
        }
        self
    }

    /// Extends the index on this column into a composite index.
    pub fn with_trailing<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trailing = columns.into_iter().map(Into::into).collect();
        self.indexed()
    }

    /// Columns covered by the index led by this column
    pub fn index_columns(&self) -> Vec<&str> {
        std::iter::once(self.name.as_str())
            .chain(self.trailing.iter().map(String::as_str))
            .collect()
    }

    /// Combines two descriptors of the same column for a merged schema.
    ///
    /// The result carries the weaker index kind and the common prefix of
    /// the two composite indexes.
    pub fn common_denominator(&self, other: &ColumnDef) -> SchemaResult<ColumnDef> {
        if self.name != other.name {
            return Err(SchemaError::NameMismatch {
                left: self.name.clone(),
                right: other.name.clone(),
            });
        }
        let column_type = self.column_type.common(&other.column_type, &self.name)?;
        let index = self.index.min(other.index);
        let trailing = if index.is_indexed() {
            self.trailing
                .iter()
                .zip(&other.trailing)
                .take_while(|(a, b)| a == b)
                .map(|(a, _)| a.clone())
                .collect()
        } else {
            Vec::new()
        };
        Ok(ColumnDef {
            name: self.name.clone(),
            column_type,
            index,
            trailing,
        })
    }
}

/// An ordered set of column descriptors with unique names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnSet {
    columns: Vec<ColumnDef>,
}

impl ColumnSet {
    /// Builds a column set, rejecting duplicate names and composite
    /// indexes over unknown columns.
    pub fn new(columns: Vec<ColumnDef>) -> SchemaResult<Self> {
        for (i, column) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(SchemaError::DuplicateColumn(column.name.clone()));
            }
        }
        for column in &columns {
            if let Some(missing) = column
                .trailing
                .iter()
                .find(|t| !columns.iter().any(|c| &c.name == *t))
            {
                return Err(SchemaError::UnknownTrailingColumn {
                    column: column.name.clone(),
                    trailing: missing.clone(),
                });
            }
        }
        Ok(Self { columns })
    }

    pub fn get(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Column names in declaration order
    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ColumnDef> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// The primary key column, if any
    pub fn primary(&self) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.index == IndexKind::Primary)
    }

    /// Keeps the named columns in the given order. Unknown names are skipped.
    pub fn project(&self, names: &[String]) -> ColumnSet {
        ColumnSet {
            columns: names.iter().filter_map(|n| self.get(n).cloned()).collect(),
        }
    }

    /// Merges two column sets with the same names into their common
    /// denominator, keeping this set's column order.
    pub fn merge(&self, other: &ColumnSet) -> SchemaResult<ColumnSet> {
        let mut columns = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let theirs = other.get(&column.name).ok_or_else(|| SchemaError::NameMismatch {
                left: column.name.clone(),
                right: String::new(),
            })?;
            columns.push(column.common_denominator(theirs)?);
        }
        if let Some(extra) = other.iter().find(|c| !self.contains(&c.name)) {
            return Err(SchemaError::NameMismatch {
                left: String::new(),
                right: extra.name.clone(),
            });
        }
        Ok(ColumnSet { columns })
    }

    /// Renames columns, including references from composite indexes.
    pub fn rename(&self, renames: &[(String, String)]) -> ColumnSet {
        let map = |name: &String| {
            renames
                .iter()
                .find(|(from, _)| from == name)
                .map(|(_, to)| to.clone())
                .unwrap_or_else(|| name.clone())
        };
        ColumnSet {
            columns: self
                .columns
                .iter()
                .map(|c| ColumnDef {
                    name: map(&c.name),
                    column_type: c.column_type,
                    index: c.index,
                    trailing: c.trailing.iter().map(map).collect(),
                })
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ColumnSet {
    type Item = &'a ColumnDef;
    type IntoIter = std::slice::Iter<'a, ColumnDef>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}
