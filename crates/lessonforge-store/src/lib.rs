//! lessonforge-store: File-backed persistence for users and their progress.
//!
//! Implements the `ProgressStore` trait from `lessonforge-core` on top of a
//! single JSON user database plus one JSON file per saved conversation.

pub mod credentials;
pub mod error;
pub mod store;

pub use error::StoreError;
pub use store::{Conversation, ConversationRef, FileUserStore, NewUser, ProfileUpdate, UserRecord};
