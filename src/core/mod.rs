//! Compile-time pipeline (expression parsing, validation, bundling) and the
//! runtime engine.

pub mod assembler;
pub mod bundle;
pub mod condition;
pub mod engine;
pub mod evaluate;
pub mod expression;
pub mod front_matter;
pub mod operation;
pub mod state;
pub mod validate;
