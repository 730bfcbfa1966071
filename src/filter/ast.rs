//! The filter expression tree (C2 output, §4.2, §9 "Filter AST").
//!
//! Built as immutable values; the in-memory evaluator (C3) and the SQL
//! compiler (C4) are two independent visitors over the same tree.

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Co,
    Sw,
    Ew,
    Gt,
    Ge,
    Lt,
    Le,
    Pr,
}

impl CompareOp {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "eq" => Some(Self::Eq),
            "ne" => Some(Self::Ne),
            "co" => Some(Self::Co),
            "sw" => Some(Self::Sw),
            "ew" => Some(Self::Ew),
            "gt" => Some(Self::Gt),
            "ge" => Some(Self::Ge),
            "lt" => Some(Self::Lt),
            "le" => Some(Self::Le),
            "pr" => Some(Self::Pr),
            _ => None,
        }
    }

    pub fn takes_value(self) -> bool {
        !matches!(self, Self::Pr)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// A node in the filter tree. `Compare` carries an optional `namespace`: the
/// outer attribute path of a value sub-filter (`members[value eq "x"]`),
/// which restricts evaluation to elements of the list-typed attribute named
/// by `namespace` (§4.2, §4.3 rule 1).
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    Compare {
        attr: String,
        op: CompareOp,
        value: Option<Value>,
        namespace: Option<String>,
    },
    Logical {
        op: LogicalOp,
        left: Box<FilterNode>,
        right: Box<FilterNode>,
    },
    Negate(Box<FilterNode>),
}

impl FilterNode {
    pub fn compare(attr: impl Into<String>, op: CompareOp, value: Option<Value>) -> Self {
        FilterNode::Compare {
            attr: attr.into(),
            op,
            value,
            namespace: None,
        }
    }

    pub fn and(self, other: FilterNode) -> Self {
        FilterNode::Logical {
            op: LogicalOp::And,
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    pub fn or(self, other: FilterNode) -> Self {
        FilterNode::Logical {
            op: LogicalOp::Or,
            left: Box::new(self),
            right: Box::new(other),
        }
    }
}
