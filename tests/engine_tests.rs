/// Engine integration tests — playing the compiled fixture story.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use storylines::core::bundle::{bundle_story, BundleOptions};
use storylines::core::engine::{EngineError, Snapshot, StoryDisplay, Storylines};
use storylines::core::expression::ParseContext;
use storylines::core::operation::parse_operation;
use storylines::schema::story::{ResourceDef, StoryBundle};

#[derive(Default)]
struct Screen {
    description: String,
    actions: Vec<String>,
    resources: Vec<String>,
}

#[derive(Clone, Default)]
struct SharedScreen(Rc<RefCell<Screen>>);

impl SharedScreen {
    fn description(&self) -> String {
        self.0.borrow().description.clone()
    }

    fn actions(&self) -> Vec<String> {
        self.0.borrow().actions.clone()
    }

    fn resources(&self) -> Vec<String> {
        self.0.borrow().resources.clone()
    }
}

impl StoryDisplay for SharedScreen {
    fn display_event(&mut self, description: &str, actions: &[String]) {
        let mut screen = self.0.borrow_mut();
        screen.description = description.to_string();
        screen.actions = actions.to_vec();
    }

    fn display_resources(
        &mut self,
        definitions: &IndexMap<String, ResourceDef>,
        values: &Map<String, Value>,
    ) {
        self.0.borrow_mut().resources = definitions
            .iter()
            .map(|(slug, def)| def.render(values.get(slug)))
            .collect();
    }
}

fn harbor() -> StoryBundle {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/harbor");
    bundle_story(&root, &BundleOptions::default()).unwrap()
}

fn play() -> (Storylines, SharedScreen) {
    let screen = SharedScreen::default();
    let engine = Storylines::builder()
        .story(harbor())
        .display(screen.clone())
        .random_source(|| 0.0)
        .build()
        .unwrap();
    (engine, screen)
}

fn current(engine: &Storylines) -> String {
    engine.current_event().map(|e| e.slug()).unwrap_or_default()
}

fn resource(engine: &Storylines, slug: &str) -> Option<Value> {
    engine.state().get(&["resources", slug]).cloned()
}

#[test]
fn market_path_reaches_the_catch_all_ending() {
    let (mut engine, screen) = play();
    assert_eq!(screen.resources(), vec!["20 gold", "100%"]);

    engine.start().unwrap();
    assert_eq!(current(&engine), "arrival/intro");
    assert_eq!(screen.actions(), vec!["Walk to the market", "Head for the docks"]);
    assert_eq!(
        engine.state().get(&["storylines", "arrival", "visited"]),
        Some(&json!(true))
    );

    engine.respond_to_event("Walk to the market").unwrap();
    assert_eq!(current(&engine), "arrival/market");
    assert_eq!(screen.actions(), vec!["Buy a lantern", "Leave"]);

    engine.respond_to_event("Buy a lantern").unwrap();
    assert_eq!(resource(&engine, "gold"), Some(json!(5)));
    assert_eq!(screen.resources()[0], "5 gold");
    assert_eq!(current(&engine), "storm/warning");
    assert_eq!(engine.current_turn(), 3.0);

    engine.respond_to_event("Listen").unwrap();
    assert_eq!(current(&engine), "storm/shelter");
    assert_eq!(resource(&engine, "health"), Some(json!(95)));

    engine.respond_to_event("Wait it out").unwrap();
    assert_eq!(current(&engine), "storm/the_end");
    assert_eq!(engine.current_turn(), 5.0);
    assert_eq!(
        engine.state().get(&["global", "no_events_available"]),
        Some(&json!(true))
    );
    assert!(screen.description().starts_with("The harbor is quiet."));

    // repeatable, so it keeps coming back
    engine.respond_to_event("Rest").unwrap();
    assert_eq!(current(&engine), "storm/the_end");
    assert_eq!(engine.current_turn(), 6.0);
}

#[test]
fn docks_path_gets_warned_early() {
    let (mut engine, _) = play();
    engine.start().unwrap();
    engine.respond_to_event("Head for the docks").unwrap();
    assert_eq!(current(&engine), "storm/warning");
    assert_eq!(engine.current_turn(), 2.0);

    engine.respond_to_event("Listen").unwrap();
    assert_eq!(current(&engine), "storm/shelter");
}

#[test]
fn poor_players_cannot_buy() {
    let (mut engine, screen) = play();
    engine.start().unwrap();
    let broke = parse_operation("r.gold = 5", &ParseContext::default()).unwrap();
    engine.apply_operations(&[broke]).unwrap();
    assert_eq!(screen.resources()[0], "5 gold");

    engine.respond_to_event("Walk to the market").unwrap();
    assert_eq!(screen.actions(), vec!["Leave"]);
    assert_eq!(engine.available_actions().unwrap(), vec!["Leave"]);
}

#[test]
fn unknown_actions_leave_state_alone() {
    let (mut engine, _) = play();
    engine.start().unwrap();
    let before = engine.snapshot();
    let err = engine.respond_to_event("Swim").unwrap_err();
    assert!(matches!(err, EngineError::ActionNotAvailable(ref a) if a == "Swim"));
    assert_eq!(engine.snapshot(), before);
}

#[test]
fn snapshots_allow_branching() {
    let (mut engine, _) = play();
    engine.start().unwrap();
    let fork = engine.snapshot();

    engine.respond_to_event("Walk to the market").unwrap();
    let market_branch = current(&engine);

    engine.restore(fork.clone()).unwrap();
    engine.respond_to_event("Head for the docks").unwrap();
    let docks_branch = current(&engine);

    assert_eq!(market_branch, "arrival/market");
    assert_eq!(docks_branch, "storm/warning");

    let text = ron::to_string(&fork).unwrap();
    let parsed: Snapshot = ron::from_str(&text).unwrap();
    assert_eq!(parsed, fork);
}

#[test]
fn compiled_json_plays_the_same() {
    let json = harbor().to_json().unwrap();
    let screen = SharedScreen::default();
    let mut engine = Storylines::builder()
        .story(StoryBundle::from_json(&json).unwrap())
        .display(screen.clone())
        .seed(3)
        .build()
        .unwrap();
    engine.start().unwrap();
    assert_eq!(current(&engine), "arrival/intro");
    assert_eq!(screen.actions().len(), 2);
}
