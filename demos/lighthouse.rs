/// Lighthouse example: a keeper rationing lamp oil until the supply boat
/// comes, or doesn't.
///
/// Bundles `demos/lighthouse/` straight from its Markdown files and plays it
/// by always taking the first action on offer. Two storylines interleave:
/// `keeper` runs the nightly routine through soft triggers, `supply` cuts in
/// with hard triggers when the oil runs low and once nothing else is left.
///
/// Run with: cargo run --example lighthouse

use std::path::Path;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use storylines::core::bundle::{bundle_story, BundleOptions};
use storylines::core::engine::{EngineError, StoryDisplay, Storylines};
use storylines::schema::story::ResourceDef;

struct Printer;

impl StoryDisplay for Printer {
    fn display_event(&mut self, description: &str, actions: &[String]) {
        println!("{}", description);
        for action in actions {
            println!("  - {}", action);
        }
    }

    fn display_resources(
        &mut self,
        definitions: &IndexMap<String, ResourceDef>,
        values: &Map<String, Value>,
    ) {
        for (slug, def) in definitions {
            println!("  [{}: {}]", def.display_name, def.render(values.get(slug)));
        }
    }
}

fn main() {
    // --- Compile the story directory ---
    let story = bundle_story(Path::new("demos/lighthouse"), &BundleOptions::default())
        .expect("Failed to bundle the lighthouse story");

    println!("=== {} ===", story.story_title);
    println!("{}\n", story.story_description);

    // --- Play it, always picking the first action ---
    let mut engine = Storylines::builder()
        .story(story)
        .display(Printer)
        .seed(1993)
        .build()
        .expect("Failed to build engine");

    let mut result = engine.start();
    for _ in 0..20 {
        match result {
            Ok(()) => {}
            Err(EngineError::NoEventsAvailable) => break,
            Err(e) => panic!("story failed: {}", e),
        }
        let slug = engine.current_event().map(|e| e.slug()).unwrap_or_default();
        let actions = engine.available_actions().expect("Failed to list actions");
        let Some(choice) = actions.first() else {
            break;
        };
        println!("\n> {} (turn {}, {})\n", choice, engine.current_turn(), slug);
        result = engine.respond_to_event(choice);
    }

    println!("\n--- Final state ---");
    println!(
        "{}",
        serde_json::to_string_pretty(engine.state()).expect("Failed to serialize state")
    );
}
