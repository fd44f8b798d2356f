use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::event::Event;

/// An author-defined counter tracked in state and shown to the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDef {
    pub description: String,
    /// Display template; `%s` is replaced by the current value.
    pub format: String,
    pub display_name: String,
    pub default: serde_json::Value,
}

impl ResourceDef {
    /// Render a value through the resource's format, e.g. `"%s¥"` → `"100¥"`.
    pub fn render(&self, value: Option<&serde_json::Value>) -> String {
        let shown = match value {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "undefined".to_string(),
        };
        self.format.replacen("%s", &shown, 1)
    }
}

/// The compiled artifact handed from the bundler to the runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryBundle {
    pub version: u32,
    pub story_title: String,
    pub story_description: String,
    pub resources: IndexMap<String, ResourceDef>,
    /// Sorted by storyline slug, then event slug.
    pub events: Vec<Event>,
    pub default_state: serde_json::Map<String, serde_json::Value>,
}

impl StoryBundle {
    pub fn from_json(input: &str) -> Result<StoryBundle, serde_json::Error> {
        serde_json::from_str(input)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn find_event(&self, storyline: &str, event: &str) -> Option<&Event> {
        self.events
            .iter()
            .find(|e| e.storyline == storyline && e.event == event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gold() -> ResourceDef {
        ResourceDef {
            description: "Coins in your purse".to_string(),
            format: "%s¥".to_string(),
            display_name: "Gold".to_string(),
            default: serde_json::json!(100),
        }
    }

    #[test]
    fn render_substitutes_value() {
        assert_eq!(gold().render(Some(&serde_json::json!(42))), "42¥");
        assert_eq!(gold().render(Some(&serde_json::json!("ABC"))), "ABC¥");
        assert_eq!(gold().render(None), "undefined¥");
    }

    #[test]
    fn bundle_round_trips_through_json() {
        let bundle = StoryBundle {
            version: 1,
            story_title: "Title".to_string(),
            story_description: "Description".to_string(),
            resources: IndexMap::from([("gold".to_string(), gold())]),
            events: Vec::new(),
            default_state: serde_json::Map::new(),
        };
        let json = bundle.to_json().unwrap();
        let back = StoryBundle::from_json(&json).unwrap();
        assert_eq!(back, bundle);
        assert!(back.find_event("harbor", "arrival").is_none());
    }
}
