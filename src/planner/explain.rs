//! Explain output
//!
//! Every view describes itself as a tree of operator nodes. Output is
//! deterministic: properties print in insertion order.

use std::fmt;

/// One operator in an explain tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplainNode {
    pub operator: &'static str,
    pub properties: Vec<(String, String)>,
    pub children: Vec<ExplainNode>,
}

impl ExplainNode {
    pub fn new(operator: &'static str) -> Self {
        Self {
            operator,
            properties: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Adds a property
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.properties.push((key.into(), value.to_string()));
        self
    }

    /// Adds a child node
    pub fn child(mut self, node: ExplainNode) -> Self {
        self.children.push(node);
        self
    }

    /// First node (depth-first, self included) with the given operator
    pub fn find(&self, operator: &str) -> Option<&ExplainNode> {
        if self.operator == operator {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(operator))
    }

    /// Value of the first property with the given key
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn write_tree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(f, "{:indent$}{}", "", self.operator, indent = depth * 2)?;
        if !self.properties.is_empty() {
            write!(f, " (")?;
            for (i, (k, v)) in self.properties.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}: {}", k, v)?;
            }
            write!(f, ")")?;
        }
        writeln!(f)?;
        for child in &self.children {
            child.write_tree(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for ExplainNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== EXPLAIN PLAN ===")?;
        self.write_tree(f, 0)
    }
}
