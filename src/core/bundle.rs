/// Story bundler: reads a story directory and compiles it into one
/// `StoryBundle`.
///
/// Layout:
///
/// ```text
/// <story>/storyline.config                   front matter + description
/// <story>/storylines/<storyline>/<event>.md  front matter + event text
/// ```

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::assembler::{build_event, AssembleError};
use crate::core::expression::is_slug;
use crate::core::front_matter::{self, FrontMatterError};
use crate::core::state::generate_default_state;
use crate::core::validate::{validate_config, validate_event, ValidationError};
use crate::schema::event::Event;
use crate::schema::story::StoryBundle;

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("front matter error: {0}")]
    FrontMatter(#[from] FrontMatterError),
    #[error("invalid config: {0}")]
    Config(ValidationError),
    #[error("invalid event {location}: {source}")]
    Event {
        location: String,
        source: ValidationError,
    },
    #[error("expression error in {0}")]
    Assemble(#[from] AssembleError),
    #[error("'{0}' is not a slug")]
    NotASlug(String),
    #[error("'{0}' is not a valid directory")]
    NotADirectory(String),
}

/// File and folder names inside a story directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleOptions {
    pub config_file: String,
    pub storylines_folder: String,
}

impl Default for BundleOptions {
    fn default() -> Self {
        Self {
            config_file: "storyline.config".to_string(),
            storylines_folder: "storylines".to_string(),
        }
    }
}

fn read(path: &Path) -> Result<String, BundleError> {
    fs::read_to_string(path).map_err(|source| BundleError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Sorted names of the entries in `dir` accepted by `keep`.
fn list_dir<F>(dir: &Path, keep: F) -> Result<Vec<String>, BundleError>
where
    F: Fn(&Path) -> bool,
{
    let entries = fs::read_dir(dir).map_err(|source| BundleError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| BundleError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with('.') && keep(&path) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// Storyline slugs under `<root>/<folder>`.
pub fn storyline_slugs(root: &Path, folder: &str) -> Result<Vec<String>, BundleError> {
    let dir = root.join(folder);
    if !dir.is_dir() {
        return Err(BundleError::NotADirectory(dir.display().to_string()));
    }
    let slugs = list_dir(&dir, Path::is_dir)?;
    if let Some(bad) = slugs.iter().find(|s| !is_slug(s)) {
        return Err(BundleError::NotASlug(bad.clone()));
    }
    Ok(slugs)
}

/// Event slugs (file stems of `*.md`) of one storyline.
pub fn event_slugs(root: &Path, folder: &str, storyline: &str) -> Result<Vec<String>, BundleError> {
    if !is_slug(storyline) {
        return Err(BundleError::NotASlug(storyline.to_string()));
    }
    let dir = root.join(folder).join(storyline);
    if !dir.is_dir() {
        return Err(BundleError::NotADirectory(dir.display().to_string()));
    }
    let files = list_dir(&dir, |p| {
        p.is_file() && p.extension().map_or(false, |ext| ext == "md")
    })?;
    Ok(files
        .into_iter()
        .filter_map(|f| f.strip_suffix(".md").map(str::to_string))
        .collect())
}

/// Read, validate and assemble one event file.
pub fn load_event(
    root: &Path,
    folder: &str,
    storyline: &str,
    event: &str,
) -> Result<Event, BundleError> {
    let path = root.join(folder).join(storyline).join(format!("{}.md", event));
    let document = front_matter::split(&path.display().to_string(), &read(&path)?)?;
    let record = validate_event(&document.header, storyline, event, &document.body).map_err(
        |source| BundleError::Event {
            location: format!("{}/{}", storyline, event),
            source,
        },
    )?;
    Ok(build_event(&record)?)
}

/// Compile the story at `root`. Any error aborts the whole bundle.
pub fn bundle_story(root: &Path, options: &BundleOptions) -> Result<StoryBundle, BundleError> {
    let config_path = root.join(&options.config_file);
    let config = front_matter::split(
        &config_path.display().to_string(),
        &read(&config_path)?,
    )?;
    let config = validate_config(&config.header, &config.body).map_err(BundleError::Config)?;

    let storylines = storyline_slugs(root, &options.storylines_folder)?;
    let mut events = Vec::new();
    for storyline in &storylines {
        for event in event_slugs(root, &options.storylines_folder, storyline)? {
            events.push(load_event(
                root,
                &options.storylines_folder,
                storyline,
                &event,
            )?);
        }
    }
    sort_events(&mut events);

    let default_state = generate_default_state(&config.resources, &storylines);

    Ok(StoryBundle {
        version: config.version,
        story_title: config.story_title,
        story_description: config.story_description,
        resources: config.resources,
        events,
        default_state,
    })
}

/// Bundle order: by storyline slug, then event slug, ascending.
pub fn sort_events(events: &mut [Event]) {
    events.sort_by(|a, b| {
        (a.storyline.as_str(), a.event.as_str()).cmp(&(b.storyline.as_str(), b.event.as_str()))
    });
}
