/// The runtime engine: picks events, shows them and applies player choices.
///
/// One turn is `display_event` → `respond_to_event` → `next_event`. Hard
/// triggers always win over soft ones; soft-triggered events compete in a
/// weighted lottery.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use thiserror::Error;

use crate::core::evaluate::{apply_operations, test_condition};
use crate::core::state::{StateDocument, StateError};
use crate::schema::event::{Event, TriggerKind};
use crate::schema::operation::Operation;
use crate::schema::story::{ResourceDef, StoryBundle};
use crate::schema::value::json_number;

pub const CURRENT_TURN: &str = "current_turn";
pub const NO_EVENTS_AVAILABLE: &str = "no_events_available";

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("story is required")]
    MissingStory,
    #[error("callbacks object is required")]
    MissingDisplay,
    #[error("storyline already started")]
    AlreadyStarted,
    #[error("action {0} is not available")]
    ActionNotAvailable(String),
    #[error("no more events available, no listeners on no_events_available")]
    NoEventsAvailable,
    #[error("unknown event: {0}")]
    UnknownEvent(String),
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Host-side presentation of the story.
pub trait StoryDisplay {
    /// Show an event. The host answers later through
    /// [`Storylines::respond_to_event`] with one of `actions`.
    fn display_event(&mut self, description: &str, actions: &[String]);

    /// Show the current resource values.
    fn display_resources(
        &mut self,
        definitions: &IndexMap<String, ResourceDef>,
        values: &Map<String, Json>,
    );
}

/// Uniform draws in `[0, 1)` for the event lottery.
pub trait RandomSource {
    fn next_f64(&mut self) -> f64;
}

/// `StdRng`-backed source, seeded for reproducible runs.
pub struct SeededRandom(StdRng);

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self(StdRng::from_entropy())
    }
}

impl RandomSource for SeededRandom {
    fn next_f64(&mut self) -> f64 {
        self.0.gen::<f64>()
    }
}

impl<F: FnMut() -> f64> RandomSource for F {
    fn next_f64(&mut self) -> f64 {
        self()
    }
}

/// Weighted draw over `weights` with a roll in `[0, 1)`.
///
/// `floor(sum * roll)` is walked down the list, subtracting each weight until
/// the remainder falls below the current one. Rounding leftovers land on the
/// last entry.
pub fn pick_weighted(weights: &[f64], roll: f64) -> Option<usize> {
    let total: f64 = weights.iter().sum();
    let mut number = (total * roll).floor();
    for (i, weight) in weights.iter().enumerate() {
        if number < *weight {
            return Some(i);
        }
        number -= weight;
    }
    weights.len().checked_sub(1)
}

/// A serializable copy of everything that changes while playing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub state: StateDocument,
    /// Sorted `storyline/event` slugs.
    pub viewed_events: Vec<String>,
    /// `storyline/event` slug of the event on screen.
    pub current_event: Option<String>,
}

/// A running story. Built via `Storylines::builder()`.
pub struct Storylines {
    story: StoryBundle,
    state: StateDocument,
    viewed_events: FxHashSet<String>,
    current_event: Option<usize>,
    display: Box<dyn StoryDisplay>,
    random: Box<dyn RandomSource>,
}

/// Builder for constructing a `Storylines` engine.
#[derive(Default)]
pub struct StorylinesBuilder {
    story: Option<StoryBundle>,
    story_path: Option<PathBuf>,
    display: Option<Box<dyn StoryDisplay>>,
    seed: Option<u64>,
    random: Option<Box<dyn RandomSource>>,
}

impl StorylinesBuilder {
    pub fn story(mut self, story: StoryBundle) -> Self {
        self.story = Some(story);
        self
    }

    /// Load the bundle from a JSON file at build time.
    pub fn story_path(mut self, path: impl AsRef<Path>) -> Self {
        self.story_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn display(mut self, display: impl StoryDisplay + 'static) -> Self {
        self.display = Some(Box::new(display));
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Replace the lottery's random source. Takes precedence over `seed`.
    pub fn random_source(mut self, random: impl RandomSource + 'static) -> Self {
        self.random = Some(Box::new(random));
        self
    }

    pub fn build(self) -> Result<Storylines, EngineError> {
        let story = match (self.story, self.story_path) {
            (Some(story), _) => story,
            (None, Some(path)) => StoryBundle::from_json(&std::fs::read_to_string(path)?)?,
            (None, None) => return Err(EngineError::MissingStory),
        };
        let display = self.display.ok_or(EngineError::MissingDisplay)?;
        let random = match (self.random, self.seed) {
            (Some(random), _) => random,
            (None, Some(seed)) => Box::new(SeededRandom::new(seed)),
            (None, None) => Box::new(SeededRandom::from_entropy()),
        };

        let mut engine = Storylines {
            state: StateDocument::new(story.default_state.clone()),
            story,
            viewed_events: FxHashSet::default(),
            current_event: None,
            display,
            random,
        };
        engine.notify_resources();
        Ok(engine)
    }
}

/// Apply a batch, then show the resulting resources.
fn apply_batch(
    state: &mut StateDocument,
    display: &mut dyn StoryDisplay,
    resources: &IndexMap<String, ResourceDef>,
    operations: &[Operation],
) -> Result<(), StateError> {
    apply_operations(state, operations)?;
    display.display_resources(resources, &state.resources());
    Ok(())
}

impl Storylines {
    pub fn builder() -> StorylinesBuilder {
        StorylinesBuilder::default()
    }

    pub fn story(&self) -> &StoryBundle {
        &self.story
    }

    pub fn state(&self) -> &StateDocument {
        &self.state
    }

    /// Replace the state document wholesale, e.g. from a save file.
    pub fn set_state(&mut self, state: StateDocument) {
        self.state = state;
        self.notify_resources();
    }

    pub fn current_event(&self) -> Option<&Event> {
        self.current_event.and_then(|i| self.story.events.get(i))
    }

    pub fn current_turn(&self) -> f64 {
        self.state.global_number(CURRENT_TURN).unwrap_or(0.0)
    }

    pub fn is_viewed(&self, slug: &str) -> bool {
        self.viewed_events.contains(slug)
    }

    fn notify_resources(&mut self) {
        self.display
            .display_resources(&self.story.resources, &self.state.resources());
    }

    /// Show the first event. Fails if the story is already running.
    pub fn start(&mut self) -> Result<(), EngineError> {
        if self.current_event.is_some() {
            return Err(EngineError::AlreadyStarted);
        }
        self.next_event()
    }

    /// Advance one turn and move to the next event.
    pub fn next_event(&mut self) -> Result<(), EngineError> {
        if let Some(event) = self.current_event() {
            if !event.repeatable {
                let slug = event.slug();
                self.viewed_events.insert(slug);
            }
        }

        let turn = self.current_turn() + 1.0;
        self.state
            .set_global(CURRENT_TURN, json_number(turn).unwrap_or(Json::Null))?;

        // The catch-all retry belongs to the same turn, so the counter only
        // moves once.
        loop {
            if let Some(&index) = self.list_available_events(TriggerKind::Hard)?.first() {
                return self.move_to_event(index);
            }

            let soft = self.list_available_events(TriggerKind::Soft)?;
            if let Some(index) = self.do_event_lottery(&soft) {
                return self.move_to_event(index);
            }

            if self.state.global_flag(NO_EVENTS_AVAILABLE) {
                return Err(EngineError::NoEventsAvailable);
            }
            self.state.set_global(NO_EVENTS_AVAILABLE, Json::Bool(true))?;
        }
    }

    /// Indices of events whose `kind` trigger currently holds, in bundle
    /// order. Viewed events are skipped.
    pub fn list_available_events(&self, kind: TriggerKind) -> Result<Vec<usize>, EngineError> {
        let mut available = Vec::new();
        for (index, event) in self.story.events.iter().enumerate() {
            let Some(trigger) = event.triggers.get(kind) else {
                continue;
            };
            if self.viewed_events.contains(&event.slug()) {
                continue;
            }
            if test_condition(&self.state, &trigger.condition)? {
                available.push(index);
            }
        }
        Ok(available)
    }

    /// Draw one of `candidates` (event indices) by soft-trigger weight.
    pub fn do_event_lottery(&mut self, candidates: &[usize]) -> Option<usize> {
        if candidates.is_empty() {
            return None;
        }
        let weights: Vec<f64> = candidates
            .iter()
            .map(|&i| {
                self.story
                    .events
                    .get(i)
                    .and_then(|e| e.triggers.soft.as_ref())
                    .map_or(0.0, |t| t.weight)
            })
            .collect();
        let roll = self.random.next_f64();
        pick_weighted(&weights, roll).map(|i| candidates[i])
    }

    /// Make `index` the current event: run its `on_display` operations and
    /// show it with the actions whose conditions hold.
    pub fn move_to_event(&mut self, index: usize) -> Result<(), EngineError> {
        let story = &self.story;
        let event = story
            .events
            .get(index)
            .ok_or_else(|| EngineError::UnknownEvent(index.to_string()))?;
        self.current_event = Some(index);

        apply_batch(
            &mut self.state,
            self.display.as_mut(),
            &story.resources,
            &event.on_display,
        )?;

        let actions = self.filter_actions(event)?;
        self.display.display_event(&event.description, &actions);
        Ok(())
    }

    fn filter_actions(&self, event: &Event) -> Result<Vec<String>, EngineError> {
        let mut names = Vec::with_capacity(event.actions.len());
        for (name, action) in &event.actions {
            let offered = match &action.condition {
                Some(condition) => test_condition(&self.state, condition)?,
                None => true,
            };
            if offered {
                names.push(name.clone());
            }
        }
        Ok(names)
    }

    /// The actions currently offered to the player.
    pub fn available_actions(&self) -> Result<Vec<String>, EngineError> {
        match self.current_event() {
            Some(event) => self.filter_actions(event),
            None => Ok(Vec::new()),
        }
    }

    /// Apply the chosen action of the current event and move on.
    pub fn respond_to_event(&mut self, action: &str) -> Result<(), EngineError> {
        let story = &self.story;
        let chosen = self
            .current_event
            .and_then(|i| story.events.get(i))
            .and_then(|event| event.actions.get(action))
            .ok_or_else(|| EngineError::ActionNotAvailable(action.to_string()))?;

        apply_batch(
            &mut self.state,
            self.display.as_mut(),
            &story.resources,
            &chosen.operations,
        )?;
        self.next_event()
    }

    /// Apply operations and show the resulting resources.
    pub fn apply_operations(&mut self, operations: &[Operation]) -> Result<(), EngineError> {
        apply_batch(
            &mut self.state,
            self.display.as_mut(),
            &self.story.resources,
            operations,
        )?;
        Ok(())
    }

    /// Show the current event and resources again without applying anything.
    pub fn redisplay(&mut self) -> Result<(), EngineError> {
        self.notify_resources();
        let Some(event) = self.current_event.and_then(|i| self.story.events.get(i)) else {
            return Ok(());
        };
        let actions = self.filter_actions(event)?;
        self.display.display_event(&event.description, &actions);
        Ok(())
    }

    pub fn snapshot(&self) -> Snapshot {
        let mut viewed_events: Vec<String> = self.viewed_events.iter().cloned().collect();
        viewed_events.sort();
        Snapshot {
            state: self.state.clone(),
            viewed_events,
            current_event: self.current_event().map(Event::slug),
        }
    }

    /// Return to a snapshot. Nothing is displayed.
    pub fn restore(&mut self, snapshot: Snapshot) -> Result<(), EngineError> {
        let current_event = match snapshot.current_event {
            Some(slug) => Some(
                self.story
                    .events
                    .iter()
                    .position(|e| e.slug() == slug)
                    .ok_or(EngineError::UnknownEvent(slug))?,
            ),
            None => None,
        };
        self.state = snapshot.state;
        self.viewed_events = snapshot.viewed_events.into_iter().collect();
        self.current_event = current_event;
        Ok(())
    }
}
