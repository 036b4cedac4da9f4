//! lessonforge-providers: Text generator backends.
//!
//! Implements the `TextGenerator` trait for the OpenAI chat completions API
//! and for an offline mock used when no API key is configured.

pub mod config;
pub mod error;
pub mod mock;
pub mod openai;

pub use config::{create_generator, load_config, LessonforgeConfig, ProviderConfig};
pub use error::ProviderError;
