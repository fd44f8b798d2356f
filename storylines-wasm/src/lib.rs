//! WASM bindings for storylines — plays a compiled story in the browser.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use wasm_bindgen::prelude::*;

use storylines::core::engine::{EngineError, Snapshot, StoryDisplay, Storylines};
use storylines::core::state::StateDocument;
use storylines::schema::story::{ResourceDef, StoryBundle};

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------
#[derive(serde::Serialize, Clone, Default)]
struct ResourceInfo {
    slug: String,
    display_name: String,
    value: Value,
    text: String,
}

#[derive(serde::Serialize, Clone, Default)]
struct View {
    description: String,
    actions: Vec<String>,
    resources: Vec<ResourceInfo>,
    turn: f64,
    ended: bool,
}

/// Records what the engine shows so it can be handed to JavaScript.
#[derive(Clone, Default)]
struct Recorder(Rc<RefCell<View>>);

impl StoryDisplay for Recorder {
    fn display_event(&mut self, description: &str, actions: &[String]) {
        let mut view = self.0.borrow_mut();
        view.description = description.to_string();
        view.actions = actions.to_vec();
    }

    fn display_resources(
        &mut self,
        definitions: &IndexMap<String, ResourceDef>,
        values: &Map<String, Value>,
    ) {
        self.0.borrow_mut().resources = definitions
            .iter()
            .map(|(slug, def)| ResourceInfo {
                slug: slug.clone(),
                display_name: def.display_name.clone(),
                value: values.get(slug).cloned().unwrap_or(Value::Null),
                text: def.render(values.get(slug)),
            })
            .collect();
    }
}

fn js_error(e: impl std::fmt::Display) -> JsError {
    JsError::new(&e.to_string())
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------
#[wasm_bindgen]
pub struct StorylinesGame {
    engine: Storylines,
    view: Recorder,
}

#[wasm_bindgen]
impl StorylinesGame {
    /// Create a game from a compiled bundle and a lottery seed.
    #[wasm_bindgen(constructor)]
    pub fn new(bundle_json: &str, seed: u64) -> Result<StorylinesGame, JsError> {
        let story = StoryBundle::from_json(bundle_json)
            .map_err(|e| JsError::new(&format!("Bundle parse error: {e}")))?;
        let view = Recorder::default();
        let engine = Storylines::builder()
            .story(story)
            .display(view.clone())
            .seed(seed)
            .build()
            .map_err(js_error)?;
        Ok(StorylinesGame { engine, view })
    }

    pub fn title(&self) -> String {
        self.engine.story().story_title.clone()
    }

    pub fn description(&self) -> String {
        self.engine.story().story_description.clone()
    }

    /// Show the first event. Returns the view as JSON.
    pub fn start(&mut self) -> Result<String, JsError> {
        let result = self.engine.start();
        self.finish_turn(result)
    }

    /// Answer the current event with `action`. Returns the view as JSON.
    pub fn respond(&mut self, action: &str) -> Result<String, JsError> {
        let result = self.engine.respond_to_event(action);
        self.finish_turn(result)
    }

    /// The last view, as JSON.
    pub fn view(&self) -> Result<String, JsError> {
        let mut view = self.view.0.borrow().clone();
        view.turn = self.engine.current_turn();
        serde_json::to_string(&view).map_err(js_error)
    }

    pub fn state_json(&self) -> Result<String, JsError> {
        serde_json::to_string(self.engine.state()).map_err(js_error)
    }

    /// Replace the state document. The current event stays on screen.
    pub fn load_state(&mut self, state_json: &str) -> Result<(), JsError> {
        let state: StateDocument = serde_json::from_str(state_json).map_err(js_error)?;
        self.engine.set_state(state);
        Ok(())
    }

    pub fn snapshot_json(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.engine.snapshot()).map_err(js_error)
    }

    /// Return to a snapshot and show its event again.
    pub fn restore_json(&mut self, snapshot_json: &str) -> Result<String, JsError> {
        let snapshot: Snapshot = serde_json::from_str(snapshot_json).map_err(js_error)?;
        self.engine.restore(snapshot).map_err(js_error)?;
        self.view.0.borrow_mut().ended = false;
        let result = self.engine.redisplay();
        self.finish_turn(result)
    }
}

impl StorylinesGame {
    fn finish_turn(&mut self, result: Result<(), EngineError>) -> Result<String, JsError> {
        match result {
            Ok(()) => {}
            Err(EngineError::NoEventsAvailable) => {
                let mut view = self.view.0.borrow_mut();
                view.ended = true;
                view.actions.clear();
            }
            Err(e) => return Err(js_error(e)),
        }
        self.view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUNDLE: &str = r#"{
        "version": 1,
        "story_title": "Tiny",
        "story_description": "Two turns.",
        "resources": {
            "gold": {"description": "Coins", "format": "%s gold", "display_name": "Gold", "default": 3}
        },
        "events": [
            {
                "event": "intro",
                "storyline": "main",
                "description": "Hello.",
                "triggers": {"hard": {"condition": {
                    "_type": "atomic_condition",
                    "lhs": {"_type": "state", "data": ["global", "current_turn"]},
                    "operator": "==",
                    "rhs": 1
                }}},
                "actions": {"Pay": {"operations": [{
                    "lhs": {"_type": "state", "data": ["resources", "gold"]},
                    "operator": "-=",
                    "rhs": 1
                }]}}
            }
        ],
        "default_state": {"global": {"current_turn": 0}, "resources": {"gold": 3}, "storylines": {"main": {}}}
    }"#;

    fn view(json: &str) -> Value {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn plays_until_the_end() {
        let mut game = StorylinesGame::new(BUNDLE, 1).unwrap();
        assert_eq!(game.title(), "Tiny");

        let first = view(&game.start().unwrap());
        assert_eq!(first["description"], "Hello.");
        assert_eq!(first["actions"], serde_json::json!(["Pay"]));
        assert_eq!(first["resources"][0]["text"], "3 gold");
        assert_eq!(first["ended"], false);

        let last = view(&game.respond("Pay").unwrap());
        assert_eq!(last["ended"], true);
        assert_eq!(last["resources"][0]["value"], 2);
    }

    #[test]
    fn snapshots_round_trip() {
        let mut game = StorylinesGame::new(BUNDLE, 1).unwrap();
        game.start().unwrap();
        let snapshot = game.snapshot_json().unwrap();
        game.respond("Pay").unwrap();

        let restored = view(&game.restore_json(&snapshot).unwrap());
        assert_eq!(restored["ended"], false);
        assert_eq!(restored["description"], "Hello.");
        assert_eq!(restored["resources"][0]["value"], 3);
    }

    #[test]
    fn load_state_replaces_values() {
        let mut game = StorylinesGame::new(BUNDLE, 1).unwrap();
        game.load_state(r#"{"global": {"current_turn": 4}, "resources": {"gold": 9}}"#)
            .unwrap();
        let state = view(&game.state_json().unwrap());
        assert_eq!(state["resources"]["gold"], 9);
        assert_eq!(view(&game.view().unwrap())["turn"], 4.0);
    }
}
