/// Storylines chart — explores every action of a story and charts the event
/// chains it can produce.
///
/// Usage: storylines_chart <bundle.json> [--depth <n>] [--seed <n>]
///                         [--raw <chains.json>] [--dot <graph.dot>]
///
/// Soft-triggered events are drawn from a seeded lottery, so a chart shows
/// one sample of them per branch. The Graphviz output clusters events by
/// storyline: solid edges follow directly, dashed edges follow with other
/// storylines in between.

use std::collections::{BTreeMap, BTreeSet};
use std::process;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use storylines::core::engine::{EngineError, StoryDisplay, Storylines};
use storylines::schema::story::ResourceDef;

struct Silent;

impl StoryDisplay for Silent {
    fn display_event(&mut self, _description: &str, _actions: &[String]) {}

    fn display_resources(&mut self, _: &IndexMap<String, ResourceDef>, _: &Map<String, Value>) {}
}

type Chain = Vec<String>;

fn walk(
    engine: &mut Storylines,
    chain: &Chain,
    depth: usize,
    max_depth: usize,
    chains: &mut BTreeSet<Chain>,
) -> Result<(), EngineError> {
    let snapshot = engine.snapshot();
    let mut chain = chain.clone();
    let slug = match &snapshot.current_event {
        Some(slug) => slug.clone(),
        None => {
            chains.insert(chain);
            return Ok(());
        }
    };
    chain.push(slug.clone());

    let actions = engine.available_actions()?;
    if actions.is_empty() || depth >= max_depth {
        chains.insert(chain);
        return Ok(());
    }

    for action in &actions {
        engine.restore(snapshot.clone())?;
        println!("{}\"{}\" on {}", " ".repeat(depth * 2), action, slug);
        match engine.respond_to_event(action) {
            Ok(()) => walk(engine, &chain, depth + 1, max_depth, chains)?,
            Err(EngineError::NoEventsAvailable) => {
                chains.insert(chain.clone());
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[derive(Default)]
struct Relations {
    direct: BTreeSet<String>,
    indirect: BTreeSet<String>,
}

/// Successor relations between the events of one storyline.
fn relations_within(storyline: &str, chains: &BTreeSet<Chain>) -> BTreeMap<String, Relations> {
    let prefix = format!("{}/", storyline);
    let mut relations: BTreeMap<String, Relations> = BTreeMap::new();

    for chain in chains {
        let mut last_known: Option<&String> = None;
        let mut last_was_here = false;
        for event in chain {
            if !event.starts_with(&prefix) {
                last_was_here = false;
                continue;
            }
            if let Some(from) = last_known {
                let entry = relations.entry(from.clone()).or_default();
                if last_was_here {
                    entry.direct.insert(event.clone());
                } else {
                    entry.indirect.insert(event.clone());
                }
            }
            last_known = Some(event);
            last_was_here = true;
        }
    }
    relations
}

fn build_dot(storylines: &BTreeSet<String>, chains: &BTreeSet<Chain>) -> String {
    let mut graph = String::from("digraph G {\n");
    for storyline in storylines {
        graph.push_str(&format!("  subgraph cluster_{} {{\n", storyline));
        graph.push_str("    style=filled;\n    color=lightgrey;\n");
        graph.push_str("    node [style=filled,color=white];\n");
        graph.push_str(&format!("    label = \"{}\";\n", storyline));
        for (from, relations) in relations_within(storyline, chains) {
            // an edge seen both ways is drawn dashed only
            for to in relations.direct.difference(&relations.indirect) {
                graph.push_str(&format!("    \"{}\" -> \"{}\";\n", from, to));
            }
            for to in &relations.indirect {
                graph.push_str(&format!("    \"{}\" -> \"{}\" [style=\"dashed\"];\n", from, to));
            }
        }
        graph.push_str("  }\n");
    }
    graph.push_str("}\n");
    graph
}

fn print_usage() {
    println!("Usage: storylines_chart <bundle.json> [--depth <n>] [--seed <n>]");
    println!("                        [--raw <chains.json>] [--dot <graph.dot>]");
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let bundle_path = &args[1];
    let mut max_depth = 20;
    let mut seed = 0;
    let mut raw_path = None;
    let mut dot_path = None;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--depth" if i + 1 < args.len() => {
                i += 1;
                max_depth = args[i].parse().unwrap_or(20);
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = args[i].parse().unwrap_or(0);
            }
            "--raw" if i + 1 < args.len() => {
                i += 1;
                raw_path = Some(args[i].clone());
            }
            "--dot" if i + 1 < args.len() => {
                i += 1;
                dot_path = Some(args[i].clone());
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    let mut engine = match Storylines::builder()
        .story_path(bundle_path)
        .display(Silent)
        .seed(seed)
        .build()
    {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("ERROR: Failed to load '{}': {}", bundle_path, e);
            process::exit(1);
        }
    };

    let mut chains = BTreeSet::new();
    let walked = engine
        .start()
        .and_then(|()| walk(&mut engine, &Vec::new(), 0, max_depth, &mut chains));
    if let Err(e) = walked {
        eprintln!("ERROR: {}", e);
        process::exit(1);
    }

    println!("\n{} distinct chains", chains.len());

    if let Some(path) = raw_path {
        let raw = chains.iter().collect::<Vec<_>>();
        let written = serde_json::to_string_pretty(&raw)
            .map_err(|e| e.to_string())
            .and_then(|json| std::fs::write(&path, json).map_err(|e| e.to_string()));
        if let Err(e) = written {
            eprintln!("ERROR: Failed to write '{}': {}", path, e);
            process::exit(1);
        }
    }

    let storylines: BTreeSet<String> = engine
        .story()
        .events
        .iter()
        .map(|e| e.storyline.clone())
        .collect();
    let graph = build_dot(&storylines, &chains);

    match dot_path {
        Some(path) => {
            if let Err(e) = std::fs::write(&path, graph) {
                eprintln!("ERROR: Failed to write '{}': {}", path, e);
                process::exit(1);
            }
        }
        None => println!("{}", graph),
    }
}
