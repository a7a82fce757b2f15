//! Condition narrowing and index key bounds
//!
//! Narrowing decides how a new condition on a column relates to one already
//! in a filter chain. Key bounds translate the conditions on one column into
//! a byte range over encoded index keys.

use std::cmp::Ordering;
use std::ops::Bound;

use super::ast::{Condition, Filter};
use crate::executor::compare;
use crate::index::{IndexKey, NULL_TAG};
use crate::schema::ColumnType;
use crate::value::{Number, Value};

/// Relation between an existing condition and an incoming one on the same
/// column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Narrowing {
    /// The existing condition already implies the incoming one
    Keep,
    /// The incoming condition implies the existing one
    Replace,
    /// No value satisfies both
    Empty,
    /// Both must be kept
    Both,
}

/// Relates two non-NULL conditions on the same column.
pub fn narrow(existing: &Condition, incoming: &Condition) -> Narrowing {
    use Condition::*;
    match (existing, incoming) {
        (Eq(a), Eq(b)) => {
            if a.loosely_eq(b) {
                Narrowing::Keep
            } else {
                Narrowing::Empty
            }
        }
        (Eq(a), range) if range.operator().is_range() => {
            if satisfies(a, range) {
                Narrowing::Keep
            } else {
                Narrowing::Empty
            }
        }
        (range, Eq(b)) if range.operator().is_range() => {
            if satisfies(b, range) {
                Narrowing::Replace
            } else {
                Narrowing::Empty
            }
        }
        (Lt(_) | Lte(_), Lt(_) | Lte(_)) => {
            if upper_within(incoming, existing) {
                Narrowing::Replace
            } else {
                Narrowing::Keep
            }
        }
        (Gt(_) | Gte(_), Gt(_) | Gte(_)) => {
            if lower_within(incoming, existing) {
                Narrowing::Replace
            } else {
                Narrowing::Keep
            }
        }
        (Gt(_) | Gte(_), Lt(_) | Lte(_)) => disjoint(existing, incoming),
        (Lt(_) | Lte(_), Gt(_) | Gte(_)) => disjoint(incoming, existing),
        _ => Narrowing::Both,
    }
}

/// Adds a filter to an AND-chain, narrowing same-column conditions.
///
/// Returns false if the chain can no longer match any row.
pub fn merge_filter(chain: &mut Vec<Filter>, filter: Filter) -> bool {
    if filter.is_never() {
        return false;
    }
    let mut i = 0;
    while i < chain.len() {
        if chain[i].column != filter.column {
            i += 1;
            continue;
        }
        match narrow(&chain[i].condition, &filter.condition) {
            Narrowing::Empty => return false,
            Narrowing::Keep => return true,
            Narrowing::Replace => {
                chain.remove(i);
            }
            Narrowing::Both => i += 1,
        }
    }
    chain.push(filter);
    true
}

fn satisfies(value: &Value, range: &Condition) -> bool {
    range
        .value()
        .is_some_and(|operand| compare(range.operator(), value, operand))
}

/// True if upper bound `a` admits a subset of what upper bound `b` admits
fn upper_within(a: &Condition, b: &Condition) -> bool {
    let (Some(va), Some(vb)) = (a.value(), b.value()) else {
        return false;
    };
    match va.cmp_raw(vb) {
        Ordering::Less => true,
        Ordering::Greater => false,
        Ordering::Equal => matches!(a, Condition::Lt(_)) || matches!(b, Condition::Lte(_)),
    }
}

/// True if lower bound `a` admits a subset of what lower bound `b` admits
fn lower_within(a: &Condition, b: &Condition) -> bool {
    let (Some(va), Some(vb)) = (a.value(), b.value()) else {
        return false;
    };
    match va.cmp_raw(vb) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => matches!(a, Condition::Gt(_)) || matches!(b, Condition::Gte(_)),
    }
}

fn disjoint(lower: &Condition, upper: &Condition) -> Narrowing {
    let (Some(l), Some(u)) = (lower.value(), upper.value()) else {
        return Narrowing::Both;
    };
    match l.cmp_raw(u) {
        Ordering::Greater => Narrowing::Empty,
        Ordering::Equal
            if matches!(lower, Condition::Gt(_)) || matches!(upper, Condition::Lt(_)) =>
        {
            Narrowing::Empty
        }
        _ => Narrowing::Both,
    }
}

/// A byte range over encoded index keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange {
    pub low: Bound<Vec<u8>>,
    pub high: Bound<Vec<u8>>,
}

impl KeyRange {
    /// The unbounded range, NULL keys included
    pub fn full() -> Self {
        Self {
            low: Bound::Unbounded,
            high: Bound::Unbounded,
        }
    }

    /// Every key starting with `prefix`
    pub fn prefix(prefix: &IndexKey) -> Self {
        Self {
            low: Bound::Included(prefix.as_bytes().to_vec()),
            high: match prefix.prefix_successor() {
                Some(upper) => Bound::Excluded(upper),
                None => Bound::Unbounded,
            },
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self.low, Bound::Unbounded) && matches!(self.high, Bound::Unbounded)
    }

    pub fn low(&self) -> Bound<&[u8]> {
        as_ref(&self.low)
    }

    pub fn high(&self) -> Bound<&[u8]> {
        as_ref(&self.high)
    }

    fn tighten_low(&mut self, bound: Bound<Vec<u8>>) {
        let replace = match (&self.low, &bound) {
            (_, Bound::Unbounded) => false,
            (Bound::Unbounded, _) => true,
            (Bound::Included(a) | Bound::Excluded(a), Bound::Included(b) | Bound::Excluded(b)) => {
                b > a || (b == a && matches!(bound, Bound::Excluded(_)))
            }
        };
        if replace {
            self.low = bound;
        }
    }

    fn tighten_high(&mut self, bound: Bound<Vec<u8>>) {
        let replace = match (&self.high, &bound) {
            (_, Bound::Unbounded) => false,
            (Bound::Unbounded, _) => true,
            (Bound::Included(a) | Bound::Excluded(a), Bound::Included(b) | Bound::Excluded(b)) => {
                b < a || (b == a && matches!(bound, Bound::Excluded(_)))
            }
        };
        if replace {
            self.high = bound;
        }
    }

    fn describe_bound(bound: &Bound<Vec<u8>>) -> String {
        match bound {
            Bound::Included(k) => format!("[{}", hex(k)),
            Bound::Excluded(k) => format!("({}", hex(k)),
            Bound::Unbounded => "*".to_string(),
        }
    }

    /// Compact printable form for explain output
    pub fn describe(&self) -> String {
        let high = match &self.high {
            Bound::Included(k) => format!("{}]", hex(k)),
            Bound::Excluded(k) => format!("{})", hex(k)),
            Bound::Unbounded => "*".to_string(),
        };
        format!("{} .. {}", Self::describe_bound(&self.low), high)
    }
}

fn as_ref(bound: &Bound<Vec<u8>>) -> Bound<&[u8]> {
    match bound {
        Bound::Included(k) => Bound::Included(k.as_slice()),
        Bound::Excluded(k) => Bound::Excluded(k.as_slice()),
        Bound::Unbounded => Bound::Unbounded,
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Key range for one column plus the filters the range fully absorbs
#[derive(Debug, Clone)]
pub struct ColumnBounds {
    pub range: KeyRange,
    /// Indexes into the filter list of conditions the range makes redundant
    pub absorbed: Vec<usize>,
}

/// Translates the scalar conditions on `column` into a key range.
///
/// Exclusive bounds on integer columns become inclusive by one step and are
/// absorbed. Other exclusive bounds widen to inclusive and stay as residual
/// filters. A lower bound alone excludes NULL keys.
pub fn column_bounds(column: &str, column_type: ColumnType, filters: &[Filter]) -> Option<ColumnBounds> {
    let mut range = KeyRange::full();
    let mut absorbed = Vec::new();
    let mut used = false;
    let mut has_high = false;

    for (i, filter) in filters.iter().enumerate() {
        if filter.column != column {
            continue;
        }
        let Some(value) = filter.condition.value() else {
            continue;
        };
        let stepped = |delta: i64| -> Option<Value> {
            if column_type != ColumnType::Integer {
                return None;
            }
            match value.as_number()? {
                Number::Int(v) => v.checked_add(delta).map(Value::Int),
                Number::Float(_) => None,
            }
        };
        let key = IndexKey::from_value(value);
        match &filter.condition {
            Condition::Eq(_) => {
                let prefix = KeyRange::prefix(&key);
                range.tighten_low(prefix.low);
                range.tighten_high(prefix.high);
                has_high = true;
                absorbed.push(i);
            }
            Condition::Gte(_) => {
                range.tighten_low(Bound::Included(key.into_bytes()));
                absorbed.push(i);
            }
            Condition::Gt(_) => match stepped(1) {
                Some(v) => {
                    range.tighten_low(Bound::Included(IndexKey::from_value(&v).into_bytes()));
                    absorbed.push(i);
                }
                None => range.tighten_low(Bound::Included(key.into_bytes())),
            },
            Condition::Lte(_) => {
                range.tighten_high(upper_of(&key));
                has_high = true;
                absorbed.push(i);
            }
            Condition::Lt(_) => {
                match stepped(-1) {
                    Some(v) => {
                        range.tighten_high(upper_of(&IndexKey::from_value(&v)));
                        absorbed.push(i);
                    }
                    None => range.tighten_high(upper_of(&key)),
                }
                has_high = true;
            }
            Condition::In(_) | Condition::Like(_) => continue,
        }
        used = true;
    }

    if !used {
        return None;
    }
    if !has_high {
        range.tighten_high(Bound::Excluded(vec![NULL_TAG]));
    }
    Some(ColumnBounds { range, absorbed })
}

/// Exclusive upper bound covering every key that starts with `key`
fn upper_of(key: &IndexKey) -> Bound<Vec<u8>> {
    match key.prefix_successor() {
        Some(upper) => Bound::Excluded(upper),
        None => Bound::Unbounded,
    }
}
