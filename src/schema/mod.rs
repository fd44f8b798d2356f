//! Data types shared by the bundler and the runtime engine.

pub mod condition;
pub mod event;
pub mod operation;
pub mod story;
pub mod value;
