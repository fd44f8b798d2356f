use serde::{Deserialize, Serialize};
use std::fmt;

/// Discriminator carried by every serialized state access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
enum StateTag {
    #[default]
    #[serde(rename = "state")]
    State,
}

/// A structured pointer into the state document.
///
/// Serialized as `{"_type": "state", "data": ["global", "foo"]}`. The `_type`
/// tag is required when deserializing, so a plain array of strings is never
/// mistaken for a state access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateAccess {
    #[serde(rename = "_type")]
    tag: StateTag,
    pub data: Vec<String>,
}

impl StateAccess {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tag: StateTag::State,
            data: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Dotted form, e.g. `global.crew.officers`.
    pub fn path(&self) -> String {
        self.data.join(".")
    }
}

impl fmt::Display for StateAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// A typed operand of the expression language: either a literal or a
/// reference into the state document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    State(StateAccess),
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
}

impl Value {
    pub fn is_state_access(&self) -> bool {
        matches!(self, Self::State(_))
    }

    pub fn as_state_access(&self) -> Option<&StateAccess> {
        match self {
            Self::State(access) => Some(access),
            _ => None,
        }
    }

    pub fn state<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::State(StateAccess::new(segments))
    }
}

/// Written back in expression syntax, e.g. `["a", 2, global.gold]`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::State(access) => write!(f, "{}", access),
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) => write!(f, "{}", n),
            Self::String(s) => write!(f, "{:?}", s),
            Self::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

/// Convert a finite float into a JSON number, keeping integral values as
/// integers so `10 - 2` serializes as `8` rather than `8.0`.
pub fn json_number(n: f64) -> Option<serde_json::Value> {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15 {
        Some(serde_json::Value::from(n as i64))
    } else {
        serde_json::Number::from_f64(n).map(serde_json::Value::Number)
    }
}
