/// Storylines player — plays a compiled story bundle in the terminal.
///
/// Usage: storylines_play <bundle.json> [--seed <n>] [--saves <dir>]
///
/// Commands:
///   <number> | <action name>  respond to the current event
///   state                     print the state document
///   next                      skip to the next event
///   save <name>               write a snapshot to <saves>/<name>.ron
///   load <name>               restore a snapshot
///   help                      list commands
///   quit                      exit

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use storylines::core::engine::{EngineError, Snapshot, StoryDisplay, Storylines};
use storylines::schema::story::ResourceDef;

/// Prints events and resources to stdout.
struct Terminal;

impl StoryDisplay for Terminal {
    fn display_event(&mut self, description: &str, actions: &[String]) {
        println!("\n{}\n", description);
        for (i, action) in actions.iter().enumerate() {
            println!("  {}. {}", i + 1, action);
        }
        println!();
    }

    fn display_resources(
        &mut self,
        definitions: &IndexMap<String, ResourceDef>,
        values: &Map<String, Value>,
    ) {
        if definitions.is_empty() {
            return;
        }
        let shown: Vec<String> = definitions
            .iter()
            .map(|(slug, def)| format!("{}: {}", def.display_name, def.render(values.get(slug))))
            .collect();
        println!("[{}]", shown.join(" | "));
    }
}

fn print_usage() {
    println!("Usage: storylines_play <bundle.json> [--seed <n>] [--saves <dir>]");
}

fn print_help() {
    println!("Commands:");
    println!("  <number> | <action name>  respond to the current event");
    println!("  state                     print the state document");
    println!("  next                      skip to the next event");
    println!("  save <name>               save a snapshot");
    println!("  load <name>               load a snapshot");
    println!("  help                      list commands");
    println!("  quit                      exit");
}

fn save(engine: &Storylines, dir: &Path, name: &str) -> Result<PathBuf, String> {
    std::fs::create_dir_all(dir).map_err(|e| e.to_string())?;
    let path = dir.join(format!("{}.ron", name));
    let text = ron::ser::to_string_pretty(&engine.snapshot(), ron::ser::PrettyConfig::default())
        .map_err(|e| e.to_string())?;
    std::fs::write(&path, text).map_err(|e| e.to_string())?;
    Ok(path)
}

fn load(engine: &mut Storylines, dir: &Path, name: &str) -> Result<(), String> {
    let path = dir.join(format!("{}.ron", name));
    let text = std::fs::read_to_string(&path).map_err(|e| format!("{}: {}", path.display(), e))?;
    let snapshot: Snapshot = ron::from_str(&text).map_err(|e| e.to_string())?;
    engine.restore(snapshot).map_err(|e| e.to_string())?;
    engine.redisplay().map_err(|e| e.to_string())
}

/// Report a turn result. Returns false once the story can't continue.
fn report(result: Result<(), EngineError>) -> bool {
    match result {
        Ok(()) => true,
        Err(EngineError::NoEventsAvailable) => {
            println!("The End.");
            false
        }
        Err(e @ EngineError::ActionNotAvailable(_)) => {
            println!("{}", e);
            true
        }
        Err(e) => {
            eprintln!("ERROR: {}", e);
            false
        }
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let bundle_path = &args[1];
    let mut seed = None;
    let mut saves_dir = PathBuf::from("saves");

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = args[i].parse::<u64>().ok();
            }
            "--saves" if i + 1 < args.len() => {
                i += 1;
                saves_dir = PathBuf::from(&args[i]);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    let mut builder = Storylines::builder().story_path(bundle_path).display(Terminal);
    if let Some(seed) = seed {
        builder = builder.seed(seed);
    }
    let mut engine = match builder.build() {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("ERROR: Failed to load '{}': {}", bundle_path, e);
            process::exit(1);
        }
    };

    println!("{}", engine.story().story_title);
    println!("{}", engine.story().story_description);
    println!("Type 'help' for commands.");

    if !report(engine.start()) {
        return;
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (cmd, rest) = match line.split_once(' ') {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (line, ""),
        };

        match cmd {
            "quit" | "exit" | "q" => break,
            "help" | "h" | "?" => print_help(),
            "state" => match serde_json::to_string_pretty(engine.state()) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("ERROR: {}", e),
            },
            "next" => {
                if !report(engine.next_event()) {
                    break;
                }
            }
            "save" if !rest.is_empty() => match save(&engine, &saves_dir, rest) {
                Ok(path) => println!("Saved {}", path.display()),
                Err(e) => eprintln!("ERROR: {}", e),
            },
            "load" if !rest.is_empty() => {
                if let Err(e) = load(&mut engine, &saves_dir, rest) {
                    eprintln!("ERROR: {}", e);
                }
            }
            _ => {
                let actions = match engine.available_actions() {
                    Ok(actions) => actions,
                    Err(e) => {
                        eprintln!("ERROR: {}", e);
                        break;
                    }
                };
                let chosen = match line.parse::<usize>() {
                    Ok(n) if n >= 1 && n <= actions.len() => actions[n - 1].clone(),
                    Ok(n) => {
                        println!("No action number {}", n);
                        continue;
                    }
                    Err(_) => line.to_string(),
                };
                if !report(engine.respond_to_event(&chosen)) {
                    break;
                }
            }
        }
    }
}
