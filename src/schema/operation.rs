use serde::{Deserialize, Serialize};
use std::fmt;

use super::value::{StateAccess, Value};

/// Assignment operators usable in operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssignmentOperator {
    #[serde(rename = "=")]
    Assign,
    #[serde(rename = "+=")]
    Add,
    #[serde(rename = "-=")]
    Sub,
    #[serde(rename = "/=")]
    Div,
    #[serde(rename = "%=")]
    Rem,
    #[serde(rename = "*=")]
    Mul,
    #[serde(rename = "APPEND TO")]
    AppendTo,
    #[serde(rename = "REMOVE FROM")]
    RemoveFrom,
}

impl AssignmentOperator {
    pub const ALL: [AssignmentOperator; 8] = [
        Self::Assign,
        Self::Add,
        Self::Sub,
        Self::Div,
        Self::Rem,
        Self::Mul,
        Self::AppendTo,
        Self::RemoveFrom,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            Self::Assign => "=",
            Self::Add => "+=",
            Self::Sub => "-=",
            Self::Div => "/=",
            Self::Rem => "%=",
            Self::Mul => "*=",
            Self::AppendTo => "APPEND TO",
            Self::RemoveFrom => "REMOVE FROM",
        }
    }

    /// Every operator except plain assignment needs an existing value.
    pub fn is_compound(&self) -> bool {
        !matches!(self, Self::Assign)
    }
}

impl fmt::Display for AssignmentOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// A state mutation. The left-hand side is always a state access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub lhs: StateAccess,
    pub operator: AssignmentOperator,
    pub rhs: Value,
}
