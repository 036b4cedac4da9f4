//! lessonforge-core: Quiz engine, content model, and collaborator traits.
//!
//! This crate defines the data model, the shuffling and grading engine, and
//! the traits for the content repository, progress store, and text
//! generator that the rest of lessonforge builds on.

pub mod content;
pub mod engine;
pub mod error;
pub mod model;
pub mod progress;
pub mod prompts;
pub mod review;
pub mod traits;

pub use error::QuizError;
