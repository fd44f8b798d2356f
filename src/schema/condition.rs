use serde::{Deserialize, Serialize};
use std::fmt;

use super::value::Value;

/// Comparison operators usable in conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOperator {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "NOT IN")]
    NotIn,
}

impl ComparisonOperator {
    pub const ALL: [ComparisonOperator; 8] = [
        Self::Eq,
        Self::Gt,
        Self::Lt,
        Self::Ge,
        Self::Le,
        Self::Ne,
        Self::In,
        Self::NotIn,
    ];

    /// The surface token, e.g. `">="` or `"NOT IN"`.
    pub fn token(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Ne => "!=",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Boolean connectives of propositional conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BooleanOperator {
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

impl BooleanOperator {
    pub const ALL: [BooleanOperator; 2] = [Self::And, Self::Or];

    pub fn token(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.token() == token)
    }
}

impl fmt::Display for BooleanOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// `lhs operator rhs`, where each side is a literal or a state access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomicCondition {
    pub lhs: Value,
    pub operator: ComparisonOperator,
    pub rhs: Value,
}

/// An ordered list of sub-conditions joined by AND or OR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropositionalCondition {
    pub boolean_operator: BooleanOperator,
    pub conditions: Vec<Condition>,
}

/// A recursive boolean condition tree, tagged by `_type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_type", rename_all = "snake_case")]
pub enum Condition {
    AtomicCondition(AtomicCondition),
    PropositionalCondition(PropositionalCondition),
}

impl Condition {
    pub fn atomic(lhs: Value, operator: ComparisonOperator, rhs: Value) -> Self {
        Self::AtomicCondition(AtomicCondition { lhs, operator, rhs })
    }

    pub fn propositional(boolean_operator: BooleanOperator, conditions: Vec<Condition>) -> Self {
        Self::PropositionalCondition(PropositionalCondition {
            boolean_operator,
            conditions,
        })
    }
}
