//! Data-only predicates
//!
//! A `Predicate` is an AND-chain of column conditions that is never run on
//! its own. It exists to be handed to `Table::or`. Every builder method
//! returns a new predicate and leaves the receiver untouched.
//!
//! A comparison with NULL or an empty `IN` set marks the predicate as
//! matching nothing, the way SQL treats `x = NULL`.

use std::collections::HashMap;
use std::fmt;

use super::ast::{Condition, Filter, InSet, Operator, ValueSet};
use crate::table::{TableError, TableResult};
use crate::value::{LikePattern, Value};

/// Operand of a predicate term
#[derive(Debug, Clone)]
pub enum Operand {
    Bound(Condition),
    /// Named parameter supplied later through [`Predicate::bind`]
    Param(String),
}

/// One condition of a predicate
#[derive(Debug, Clone)]
pub struct Term {
    pub column: String,
    pub operator: Operator,
    pub operand: Operand,
}

/// AND-chained conditions usable as an OR branch
#[derive(Debug, Clone, Default)]
pub struct Predicate {
    terms: Vec<Term>,
    never: bool,
}

impl Predicate {
    /// The empty predicate, which matches every row
    pub fn new() -> Self {
        Self::default()
    }

    fn with_condition(&self, column: &str, condition: Condition) -> Self {
        let mut next = self.clone();
        next.never |= condition.is_never();
        next.terms.push(Term {
            column: column.to_string(),
            operator: condition.operator(),
            operand: Operand::Bound(condition),
        });
        next
    }

    pub fn eq(&self, column: &str, value: impl Into<Value>) -> Self {
        self.with_condition(column, Condition::Eq(value.into()))
    }

    pub fn lt(&self, column: &str, value: impl Into<Value>) -> Self {
        self.with_condition(column, Condition::Lt(value.into()))
    }

    pub fn lte(&self, column: &str, value: impl Into<Value>) -> Self {
        self.with_condition(column, Condition::Lte(value.into()))
    }

    pub fn gt(&self, column: &str, value: impl Into<Value>) -> Self {
        self.with_condition(column, Condition::Gt(value.into()))
    }

    pub fn gte(&self, column: &str, value: impl Into<Value>) -> Self {
        self.with_condition(column, Condition::Gte(value.into()))
    }

    /// `column IN set`, where the set is a [`ValueSet`] or a one-column view
    pub fn is_in(&self, column: &str, set: impl Into<InSet>) -> Self {
        self.with_condition(column, Condition::In(set.into()))
    }

    pub fn in_values<I, V>(&self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.is_in(column, ValueSet::new(column, values))
    }

    pub fn like(&self, column: &str, pattern: &str) -> TableResult<Self> {
        Ok(self.with_condition(column, Condition::Like(LikePattern::new(pattern)?)))
    }

    /// Adds a condition whose operand is the named parameter.
    pub fn param(&self, column: &str, operator: Operator, name: &str) -> Self {
        let mut next = self.clone();
        next.terms.push(Term {
            column: column.to_string(),
            operator,
            operand: Operand::Param(name.to_string()),
        });
        next
    }

    /// Substitutes parameter values. Parameters not in `params` stay unbound.
    pub fn bind(&self, params: &HashMap<String, Value>) -> TableResult<Self> {
        let mut next = Predicate {
            terms: Vec::with_capacity(self.terms.len()),
            never: self.never,
        };
        for term in &self.terms {
            let operand = match &term.operand {
                Operand::Param(name) => match params.get(name) {
                    Some(value) => {
                        let condition = Condition::new(term.operator, value.clone())?;
                        next.never |= condition.is_never();
                        Operand::Bound(condition)
                    }
                    None => term.operand.clone(),
                },
                bound => bound.clone(),
            };
            next.terms.push(Term {
                column: term.column.clone(),
                operator: term.operator,
                operand,
            });
        }
        Ok(next)
    }

    /// Names of parameters still unbound, sorted and deduplicated
    pub fn unbound_params(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .terms
            .iter()
            .filter_map(|t| match &t.operand {
                Operand::Param(name) => Some(name.clone()),
                Operand::Bound(_) => None,
            })
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// True if the predicate can match no row
    pub fn is_never(&self) -> bool {
        self.never
    }

    /// True if the predicate has no terms and matches every row
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && !self.never
    }

    /// The bound filter chain. Fails while parameters are unbound.
    pub fn filters(&self) -> TableResult<Vec<Filter>> {
        let unbound = self.unbound_params();
        if !unbound.is_empty() {
            return Err(TableError::UnboundPredicate(unbound));
        }
        Ok(self
            .terms
            .iter()
            .filter_map(|t| match &t.operand {
                Operand::Bound(condition) => Some(Filter::new(t.column.clone(), condition.clone())),
                Operand::Param(_) => None,
            })
            .collect())
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.never {
            return write!(f, "(FALSE)");
        }
        if self.terms.is_empty() {
            return write!(f, "(TRUE)");
        }
        write!(f, "(")?;
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                write!(f, " AND ")?;
            }
            match &term.operand {
                Operand::Bound(condition) => write!(f, "{} {}", term.column, condition)?,
                Operand::Param(name) => write!(f, "{} {} :{}", term.column, term.operator, name)?,
            }
        }
        write!(f, ")")
    }
}
