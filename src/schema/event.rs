use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::condition::Condition;
use super::operation::Operation;

/// Which gate a trigger belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    /// Mandatory: always wins over soft-triggered events.
    Hard,
    /// Competes with other soft-triggered events in a weighted lottery.
    Soft,
}

impl TriggerKind {
    pub const ALL: [TriggerKind; 2] = [Self::Hard, Self::Soft];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Hard => "hard",
            Self::Soft => "soft",
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

fn default_weight() -> f64 {
    1.0
}

/// A gate controlling whether an event may be shown next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub condition: Condition,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Triggers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hard: Option<Trigger>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soft: Option<Trigger>,
}

impl Triggers {
    pub fn get(&self, kind: TriggerKind) -> Option<&Trigger> {
        match kind {
            TriggerKind::Hard => self.hard.as_ref(),
            TriggerKind::Soft => self.soft.as_ref(),
        }
    }

    pub fn set(&mut self, kind: TriggerKind, trigger: Trigger) {
        match kind {
            TriggerKind::Hard => self.hard = Some(trigger),
            TriggerKind::Soft => self.soft = Some(trigger),
        }
    }
}

/// A named player choice: operations to apply, optionally gated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(default)]
    pub operations: Vec<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

/// A single narrative beat of a storyline, fully parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event: String,
    pub storyline: String,
    pub description: String,
    #[serde(default)]
    pub repeatable: bool,
    #[serde(default)]
    pub on_display: Vec<Operation>,
    #[serde(default)]
    pub triggers: Triggers,
    /// Actions in authoring order.
    #[serde(default)]
    pub actions: IndexMap<String, Action>,
}

impl Event {
    /// `"storyline/event"`, the key used to track viewed events.
    pub fn slug(&self) -> String {
        format!("{}/{}", self.storyline, self.event)
    }
}
