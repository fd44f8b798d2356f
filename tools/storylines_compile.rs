/// Storylines compiler — bundles a story directory into one JSON file.
///
/// Usage: storylines_compile <story_dir> [output.json] [--pretty]
///                           [--config <file>] [--storylines <folder>]
///
/// Without an output path the bundle is written to stdout.

use std::path::Path;
use std::process;

use storylines::core::bundle::{bundle_story, BundleOptions};

fn print_usage() {
    println!("Usage: storylines_compile <story_dir> [output.json] [--pretty]");
    println!("                          [--config <file>] [--storylines <folder>]");
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        process::exit(0);
    }

    let story_dir = &args[1];
    let mut output = None;
    let mut pretty = false;
    let mut options = BundleOptions::default();

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--pretty" => pretty = true,
            "--config" if i + 1 < args.len() => {
                i += 1;
                options.config_file = args[i].clone();
            }
            "--storylines" if i + 1 < args.len() => {
                i += 1;
                options.storylines_folder = args[i].clone();
            }
            other if !other.starts_with("--") && output.is_none() => {
                output = Some(other.to_string());
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    let bundle = match bundle_story(Path::new(story_dir), &options) {
        Ok(bundle) => bundle,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            process::exit(1);
        }
    };

    let json = if pretty {
        serde_json::to_string_pretty(&bundle)
    } else {
        serde_json::to_string(&bundle)
    };
    let json = match json {
        Ok(json) => json,
        Err(e) => {
            eprintln!("ERROR: Failed to serialize bundle: {}", e);
            process::exit(1);
        }
    };

    match output {
        None => println!("{}", json),
        Some(path) => {
            if let Err(e) = std::fs::write(&path, json) {
                eprintln!("ERROR: Failed to write '{}': {}", path, e);
                process::exit(1);
            }
            let storylines = bundle
                .default_state
                .get("storylines")
                .and_then(|s| s.as_object())
                .map_or(0, |s| s.len());
            println!(
                "Bundled '{}': {} events in {} storylines, {} resources",
                bundle.story_title,
                bundle.events.len(),
                storylines,
                bundle.resources.len()
            );
            println!("Wrote {}", path);
        }
    }
}
