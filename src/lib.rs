//! Storylines — branching text adventures written as Markdown files.
//!
//! Authors write one file per event, with a YAML header holding triggers,
//! actions and state operations in a small expression language. The bundler
//! compiles a story directory into a single JSON [`schema::story::StoryBundle`];
//! the [`core::engine::Storylines`] engine plays it back turn by turn.

pub mod core;
pub mod schema;

pub use crate::core::bundle::{bundle_story, BundleError, BundleOptions};
pub use crate::core::engine::{EngineError, RandomSource, Snapshot, StoryDisplay, Storylines};
pub use crate::schema::story::StoryBundle;
