/// The mutable state document and state-path resolution.
///
/// The document is a JSON object with three well-known roots: `global`
/// (engine bookkeeping such as `current_turn`), `resources` and
/// `storylines`. Authors may write anywhere else too.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use thiserror::Error;

use crate::schema::story::ResourceDef;
use crate::schema::value::{json_number, StateAccess, Value};

/// Runtime errors raised while reading or writing state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateError {
    #[error("trying to access non-existing path in state: {0}")]
    MissingPath(String),
    #[error("state access has no path segments")]
    EmptyStateAccess,
    #[error("can't apply compound operator on undefined: {path} {operator} ...")]
    CompoundOnUndefined { operator: String, path: String },
    #[error("incompatible operands for {operator} on {path}: {lhs} and {rhs}")]
    IncompatibleOperands {
        operator: String,
        path: String,
        lhs: &'static str,
        rhs: &'static str,
    },
    #[error("{operator} needs an array at {path}, found {found}")]
    NotAnArray {
        operator: String,
        path: String,
        found: &'static str,
    },
    #[error("{path} {operator} produced a non-finite number")]
    NonFiniteResult { operator: String, path: String },
    #[error("right-hand side of {operator} on {path} is undefined")]
    UndefinedRhs { operator: String, path: String },
    #[error("can't write '{key}' into a {found} value")]
    NotAContainer { key: String, found: &'static str },
    #[error("state document must be an object, found {0}")]
    NotAnObject(&'static str),
}

pub(crate) fn kind_of(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

/// The outcome of walking a state access through the document.
///
/// When the walk stops early, `parent` is the deepest existing level and
/// `key` the first missing segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatePath<'a> {
    pub parent: &'a Json,
    pub key: &'a str,
    pub missing: bool,
    /// Only the final segment is missing; `=` may create it.
    pub missing_on_last_level: bool,
}

impl<'a> StatePath<'a> {
    /// The live value, if the path fully resolved.
    pub fn value(&self) -> Option<&'a Json> {
        if self.missing {
            None
        } else {
            child(self.parent, self.key)
        }
    }
}

fn child<'a>(parent: &'a Json, key: &str) -> Option<&'a Json> {
    match parent {
        Json::Object(map) => map.get(key),
        Json::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn child_mut<'a>(parent: &'a mut Json, key: &str) -> Option<&'a mut Json> {
    match parent {
        Json::Object(map) => map.get_mut(key),
        Json::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
        _ => None,
    }
}

/// Write `value` under `key`, creating object keys and appending to arrays
/// when `key` is the next free index.
fn set_child(parent: &mut Json, key: &str, value: Json) -> Result<(), StateError> {
    let not_a_container = |found| StateError::NotAContainer {
        key: key.to_string(),
        found,
    };
    match parent {
        Json::Object(map) => {
            map.insert(key.to_string(), value);
            Ok(())
        }
        Json::Array(items) => match key.parse::<usize>() {
            Ok(i) if i < items.len() => {
                items[i] = value;
                Ok(())
            }
            Ok(i) if i == items.len() => {
                items.push(value);
                Ok(())
            }
            _ => Err(not_a_container("array")),
        },
        other => Err(not_a_container(kind_of(other))),
    }
}

/// The state document owned by a running engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Json", into = "Json")]
pub struct StateDocument {
    root: Json,
}

impl Default for StateDocument {
    fn default() -> Self {
        Self::new(Map::new())
    }
}

impl TryFrom<Json> for StateDocument {
    type Error = StateError;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        match value {
            Json::Object(map) => Ok(Self::new(map)),
            other => Err(StateError::NotAnObject(kind_of(&other))),
        }
    }
}

impl From<StateDocument> for Json {
    fn from(document: StateDocument) -> Self {
        document.root
    }
}

impl StateDocument {
    pub fn new(root: Map<String, Json>) -> Self {
        Self {
            root: Json::Object(root),
        }
    }

    pub fn as_json(&self) -> &Json {
        &self.root
    }

    /// Read a value by its path segments.
    pub fn get(&self, segments: &[&str]) -> Option<&Json> {
        segments
            .iter()
            .try_fold(&self.root, |level, segment| child(level, segment))
    }

    /// Walk `access` through the document.
    ///
    /// A missing intermediate segment is an error when `throw_on_missing`
    /// is set; otherwise the walk stops there. A missing final segment is
    /// never an error.
    pub fn resolve_path<'a>(
        &'a self,
        access: &'a StateAccess,
        throw_on_missing: bool,
    ) -> Result<StatePath<'a>, StateError> {
        let (last, intermediate) = access
            .data
            .split_last()
            .ok_or(StateError::EmptyStateAccess)?;

        let mut level = &self.root;
        for segment in intermediate {
            match child(level, segment) {
                Some(next) => level = next,
                None if throw_on_missing => return Err(StateError::MissingPath(access.path())),
                None => {
                    return Ok(StatePath {
                        parent: level,
                        key: segment,
                        missing: true,
                        missing_on_last_level: false,
                    })
                }
            }
        }

        let missing = child(level, last).is_none();
        Ok(StatePath {
            parent: level,
            key: last,
            missing,
            missing_on_last_level: missing,
        })
    }

    /// Resolve an operand to a JSON value. State accesses are dereferenced
    /// without failing on missing paths; `None` means undefined.
    pub fn resolve_value(&self, value: &Value) -> Result<Option<Json>, StateError> {
        Ok(match value {
            Value::State(access) => self.resolve_path(access, false)?.value().cloned(),
            Value::Null => Some(Json::Null),
            Value::Bool(b) => Some(Json::Bool(*b)),
            Value::Number(n) => json_number(*n),
            Value::String(s) => Some(Json::String(s.clone())),
            Value::Array(items) => {
                let mut resolved = Vec::with_capacity(items.len());
                for item in items {
                    // undefined items serialize as null
                    resolved.push(self.resolve_value(item)?.unwrap_or(Json::Null));
                }
                Some(Json::Array(resolved))
            }
        })
    }

    /// Mutable access to the value at `access`, which must fully resolve.
    pub(crate) fn value_mut(&mut self, access: &StateAccess) -> Option<&mut Json> {
        access
            .data
            .iter()
            .try_fold(&mut self.root, |level, segment| child_mut(level, segment))
    }

    /// Write `value` at `access`. Every segment but the last must exist.
    pub(crate) fn write(&mut self, access: &StateAccess, value: Json) -> Result<(), StateError> {
        let (last, intermediate) = access
            .data
            .split_last()
            .ok_or(StateError::EmptyStateAccess)?;
        let mut level = &mut self.root;
        for segment in intermediate {
            level = child_mut(level, segment).ok_or_else(|| StateError::MissingPath(access.path()))?;
        }
        set_child(level, last, value)
    }

    /// Read a number from `global`.
    pub fn global_number(&self, key: &str) -> Option<f64> {
        self.get(&["global", key]).and_then(Json::as_f64)
    }

    pub fn global_flag(&self, key: &str) -> bool {
        matches!(self.get(&["global", key]), Some(Json::Bool(true)))
    }

    /// Write into `global`, creating it if needed.
    pub fn set_global(&mut self, key: &str, value: Json) -> Result<(), StateError> {
        let root = match &mut self.root {
            Json::Object(map) => map,
            other => return Err(StateError::NotAnObject(kind_of(other))),
        };
        let global = root
            .entry("global")
            .or_insert_with(|| Json::Object(Map::new()));
        set_child(global, key, value)
    }

    /// Current resource values, or an empty map before any are defined.
    pub fn resources(&self) -> Map<String, Json> {
        match self.get(&["resources"]) {
            Some(Json::Object(map)) => map.clone(),
            _ => Map::new(),
        }
    }
}

/// Build the initial state of a story.
pub fn generate_default_state<S: AsRef<str>>(
    resources: &IndexMap<String, ResourceDef>,
    storylines: &[S],
) -> Map<String, Json> {
    let mut global = Map::new();
    global.insert("current_turn".to_string(), Json::from(0));

    let resource_values: Map<String, Json> = resources
        .iter()
        .map(|(slug, def)| (slug.clone(), def.default.clone()))
        .collect();

    let storyline_states: Map<String, Json> = storylines
        .iter()
        .map(|slug| (slug.as_ref().to_string(), Json::Object(Map::new())))
        .collect();

    let mut state = Map::new();
    state.insert("global".to_string(), Json::Object(global));
    state.insert("resources".to_string(), Json::Object(resource_values));
    state.insert("storylines".to_string(), Json::Object(storyline_states));
    state
}
