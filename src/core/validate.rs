/// Static shape validation of decoded config and event records.
///
/// Runs before any expression parsing; the records it produces hold the raw
/// condition and operation sources that the assembler parses next.

use indexmap::IndexMap;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::core::expression::is_slug;
use crate::schema::event::TriggerKind;
use crate::schema::story::ResourceDef;

/// Story format versions this toolkit understands.
pub const SUPPORTED_VERSIONS: &[u64] = &[1];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("'{0}' doesn't exist")]
    MissingKey(String),
    #[error("{key} should be of type '{expected}', not '{found}'")]
    WrongType {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("missing {0}")]
    Missing(String),
    #[error("unsupported version {found}. Version should be one of {supported}")]
    UnsupportedVersion { found: String, supported: String },
    #[error("invalid resource slug '{0}'")]
    InvalidResourceSlug(String),
    #[error("invalid resource format for '{0}'; must contain a %s")]
    InvalidResourceFormat(String),
    #[error("'{0}' is not a slug")]
    InvalidSlug(String),
    #[error("triggers must be either hard or soft, not '{key}': {location}")]
    InvalidTriggerKind { key: String, location: String },
    #[error("{kind} triggers must include a condition: {location}")]
    MissingTriggerCondition { kind: TriggerKind, location: String },
}

/// JSON types a record field can be checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonType {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl JsonType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    fn matches(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Self::String, Value::String(_))
                | (Self::Number, Value::Number(_))
                | (Self::Boolean, Value::Bool(_))
                | (Self::Array, Value::Array(_))
                | (Self::Object, Value::Object(_))
        )
    }
}

pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Check that `record[key]` exists and has the expected type.
pub fn validate_key_type<'a>(
    record: &'a Map<String, Value>,
    key: &str,
    expected: JsonType,
) -> Result<&'a Value, ValidationError> {
    let value = record
        .get(key)
        .ok_or_else(|| ValidationError::MissingKey(key.to_string()))?;
    check_type(value, key, expected)?;
    Ok(value)
}

fn check_type(value: &Value, key: &str, expected: JsonType) -> Result<(), ValidationError> {
    if expected.matches(value) {
        Ok(())
    } else {
        Err(ValidationError::WrongType {
            key: key.to_string(),
            expected: expected.name(),
            found: type_name(value),
        })
    }
}

/// Like `validate_key_type`, but reports absence with a friendlier message.
fn require<'a>(
    record: &'a Map<String, Value>,
    key: &str,
    expected: JsonType,
    missing: impl FnOnce() -> String,
) -> Result<&'a Value, ValidationError> {
    match validate_key_type(record, key, expected) {
        Err(ValidationError::MissingKey(_)) => Err(ValidationError::Missing(missing())),
        other => other,
    }
}

fn optional<'a>(
    record: &'a Map<String, Value>,
    key: &str,
    expected: JsonType,
) -> Result<Option<&'a Value>, ValidationError> {
    match record.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => {
            check_type(value, key, expected)?;
            Ok(Some(value))
        }
    }
}

fn as_object<'a>(value: &'a Value, key: &str) -> Result<&'a Map<String, Value>, ValidationError> {
    value.as_object().ok_or(ValidationError::WrongType {
        key: key.to_string(),
        expected: JsonType::Object.name(),
        found: type_name(value),
    })
}

fn string_list(value: &Value, key: &str) -> Result<Vec<String>, ValidationError> {
    let items = value.as_array().ok_or(ValidationError::WrongType {
        key: key.to_string(),
        expected: JsonType::Array.name(),
        found: type_name(value),
    })?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or(ValidationError::WrongType {
                    key: format!("{} item", key),
                    expected: JsonType::String.name(),
                    found: type_name(item),
                })
        })
        .collect()
}

/// Validated story configuration (the config file's front matter and body).
#[derive(Debug, Clone, PartialEq)]
pub struct StoryConfig {
    pub version: u32,
    pub story_title: String,
    pub story_description: String,
    pub resources: IndexMap<String, ResourceDef>,
}

/// Validate a config header. `body` is the Markdown body of the config file
/// and becomes the story description.
pub fn validate_config(header: &Value, body: &str) -> Result<StoryConfig, ValidationError> {
    let empty = Map::new();
    let record = match header {
        Value::Null => &empty,
        other => as_object(other, "config")?,
    };

    let version = require(record, "version", JsonType::Number, || {
        "version number".to_string()
    })?;
    let supported = SUPPORTED_VERSIONS
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    let version = version
        .as_u64()
        .filter(|v| SUPPORTED_VERSIONS.contains(v))
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| ValidationError::UnsupportedVersion {
            found: version.to_string(),
            supported,
        })?;

    let story_title = require(record, "story_title", JsonType::String, || {
        "story title".to_string()
    })?;

    let body = body.trim();
    let story_description = if body.is_empty() {
        require(record, "story_description", JsonType::String, || {
            "story description".to_string()
        })?
        .as_str()
        .unwrap_or_default()
        .to_string()
    } else {
        body.to_string()
    };

    let resources = require(record, "resources", JsonType::Object, || {
        "resources definition".to_string()
    })?;

    Ok(StoryConfig {
        version,
        story_title: story_title.as_str().unwrap_or_default().to_string(),
        story_description,
        resources: validate_resources(as_object(resources, "resources")?)?,
    })
}

fn validate_resources(
    resources: &Map<String, Value>,
) -> Result<IndexMap<String, ResourceDef>, ValidationError> {
    let mut validated = IndexMap::with_capacity(resources.len());

    for (slug, definition) in resources {
        if !is_slug(slug) {
            return Err(ValidationError::InvalidResourceSlug(slug.clone()));
        }
        let empty = Map::new();
        let definition = match definition {
            Value::Null => &empty,
            other => as_object(other, slug)?,
        };

        let description = require(definition, "description", JsonType::String, || {
            format!("resource description: {}", slug)
        })?;
        let format = require(definition, "format", JsonType::String, || {
            format!("resource format: {}", slug)
        })?;
        let format = format.as_str().unwrap_or_default();
        if !format.contains("%s") {
            return Err(ValidationError::InvalidResourceFormat(slug.clone()));
        }
        let display_name = require(definition, "display_name", JsonType::String, || {
            format!("resource display_name: {}", slug)
        })?;
        let default = definition
            .get("default")
            .ok_or_else(|| ValidationError::Missing(format!("resource default value: {}", slug)))?;

        validated.insert(
            slug.clone(),
            ResourceDef {
                description: description.as_str().unwrap_or_default().to_string(),
                format: format.to_string(),
                display_name: display_name.as_str().unwrap_or_default().to_string(),
                default: default.clone(),
            },
        );
    }

    Ok(validated)
}

/// A trigger whose condition source has not been parsed yet.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerRecord {
    pub condition: Value,
    pub weight: f64,
}

/// An action whose operation and condition sources have not been parsed yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionRecord {
    pub operations: Vec<String>,
    pub condition: Option<Value>,
}

/// A shape-checked event, ready for expression parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub storyline: String,
    pub event: String,
    pub description: String,
    pub repeatable: bool,
    pub on_display: Vec<String>,
    pub triggers: Vec<(TriggerKind, TriggerRecord)>,
    pub actions: IndexMap<String, ActionRecord>,
}

impl EventRecord {
    pub fn location(&self) -> String {
        format!("{}/{}", self.storyline, self.event)
    }
}

/// Validate an event header decoded from `<storyline>/<event>.md`.
pub fn validate_event(
    header: &Value,
    storyline: &str,
    event: &str,
    description: &str,
) -> Result<EventRecord, ValidationError> {
    if storyline.is_empty() {
        return Err(ValidationError::Missing("storyline slug".to_string()));
    }
    if !is_slug(storyline) {
        return Err(ValidationError::InvalidSlug(storyline.to_string()));
    }
    if event.is_empty() {
        return Err(ValidationError::Missing(format!("event slug: {}/", storyline)));
    }
    if !is_slug(event) {
        return Err(ValidationError::InvalidSlug(event.to_string()));
    }
    let location = format!("{}/{}", storyline, event);
    let description = description.trim();
    if description.is_empty() {
        return Err(ValidationError::Missing(format!(
            "event description: {}",
            location
        )));
    }

    let empty = Map::new();
    let record = match header {
        Value::Null => &empty,
        other => as_object(other, &location)?,
    };

    let repeatable = optional(record, "repeatable", JsonType::Boolean)?
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let on_display = match optional(record, "on_display", JsonType::Array)? {
        Some(list) => string_list(list, "on_display")?,
        None => Vec::new(),
    };

    let mut triggers = Vec::new();
    if let Some(raw) = optional(record, "triggers", JsonType::Object)? {
        for (key, trigger) in as_object(raw, "triggers")? {
            let kind = TriggerKind::ALL
                .into_iter()
                .find(|k| k.key() == key)
                .ok_or_else(|| ValidationError::InvalidTriggerKind {
                    key: key.clone(),
                    location: location.clone(),
                })?;
            triggers.push((kind, validate_trigger(trigger, kind, &location)?));
        }
    }

    let mut actions = IndexMap::new();
    if let Some(raw) = optional(record, "actions", JsonType::Object)? {
        for (name, action) in as_object(raw, "actions")? {
            actions.insert(name.clone(), validate_action(action, name)?);
        }
    }

    Ok(EventRecord {
        storyline: storyline.to_string(),
        event: event.to_string(),
        description: description.to_string(),
        repeatable,
        on_display,
        triggers,
        actions,
    })
}

fn validate_trigger(
    trigger: &Value,
    kind: TriggerKind,
    location: &str,
) -> Result<TriggerRecord, ValidationError> {
    let missing = || ValidationError::MissingTriggerCondition {
        kind,
        location: location.to_string(),
    };
    let record = trigger.as_object().ok_or_else(missing)?;
    let condition = match record.get("condition") {
        None | Some(Value::Null) => return Err(missing()),
        Some(condition) => condition.clone(),
    };
    let weight = optional(record, "weight", JsonType::Number)?
        .and_then(Value::as_f64)
        .unwrap_or(1.0);

    Ok(TriggerRecord { condition, weight })
}

fn validate_action(action: &Value, name: &str) -> Result<ActionRecord, ValidationError> {
    let empty = Map::new();
    let record = match action {
        Value::Null => &empty,
        other => as_object(other, name)?,
    };

    let operations = match optional(record, "operations", JsonType::Array)? {
        Some(list) => string_list(list, "operations")?,
        None => Vec::new(),
    };
    let condition = record.get("condition").filter(|c| !c.is_null()).cloned();

    Ok(ActionRecord {
        operations,
        condition,
    })
}
