//! Trait definitions for the quiz engine's collaborators.
//!
//! The content repository is implemented here by `ContentLibrary`; the
//! progress store and text generator are implemented by the
//! `lessonforge-store` and `lessonforge-providers` crates respectively.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::QuizError;
use crate::model::{Lesson, Quiz, Response};

// ---------------------------------------------------------------------------
// Content repository
// ---------------------------------------------------------------------------

/// Read-only source of lessons and quizzes, keyed by integer id.
pub trait ContentRepository: Send + Sync {
    fn get_quiz(&self, quiz_id: u32) -> Option<&Quiz>;

    /// `(id, title)` pairs ordered by id.
    fn list_quiz_titles(&self) -> Vec<(u32, String)>;

    fn get_lesson(&self, lesson_id: u32) -> Option<&Lesson>;

    /// `(id, title)` pairs ordered by id.
    fn list_lesson_titles(&self) -> Vec<(u32, String)>;

    fn lesson_count(&self) -> usize;

    /// Like [`get_quiz`](Self::get_quiz) but reports a missing quiz as an error.
    fn require_quiz(&self, quiz_id: u32) -> Result<&Quiz, QuizError> {
        self.get_quiz(quiz_id)
            .ok_or_else(|| QuizError::quiz_not_found(quiz_id))
    }

    fn require_lesson(&self, lesson_id: u32) -> Result<&Lesson, QuizError> {
        self.get_lesson(lesson_id)
            .ok_or_else(|| QuizError::lesson_not_found(lesson_id))
    }
}

// ---------------------------------------------------------------------------
// Progress store
// ---------------------------------------------------------------------------

/// The best recorded result of one quiz for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizScoreRecord {
    /// Percentage score.
    pub score: f64,
    /// When the score was recorded.
    pub timestamp: DateTime<Utc>,
    /// Responses that produced the score, keyed by question index.
    #[serde(default)]
    pub answers: BTreeMap<usize, Response>,
}

/// Per-user progress persistence.
///
/// Both writes are monotonic: lesson progress never decreases and a quiz
/// score is only replaced by one that is greater or equal. Implementations
/// must keep that true under concurrent callers.
pub trait ProgressStore: Send + Sync {
    /// Highest completed lesson id, `0` when none.
    fn get_progress(&self, user: &str) -> anyhow::Result<u32>;

    /// Record `lesson_id` as completed. Returns `true` if progress advanced.
    fn update_progress(&self, user: &str, lesson_id: u32) -> anyhow::Result<bool>;

    /// Best scores keyed by quiz id rendered as a string.
    fn get_quiz_scores(&self, user: &str) -> anyhow::Result<BTreeMap<String, QuizScoreRecord>>;

    /// Store a score. Returns `true` if it replaced (or created) the record.
    fn save_quiz_score(
        &self,
        user: &str,
        quiz_id: u32,
        score: f64,
        answers: BTreeMap<usize, Response>,
    ) -> anyhow::Result<bool>;
}

// ---------------------------------------------------------------------------
// Text generator trait
// ---------------------------------------------------------------------------

/// Trait for language-model backends behind the chat playground.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Human-readable provider name (e.g. "openai").
    fn name(&self) -> &str;

    /// Generate a reply to the prompt, given the prior conversation.
    async fn generate(&self, request: &ChatRequest) -> anyhow::Result<ChatResponse>;

    /// List available models for this provider.
    fn available_models(&self) -> Vec<ModelInfo>;
}

/// Who wrote a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One turn of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Request for a chat completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model identifier (e.g. "gpt-3.5-turbo").
    pub model: String,
    /// The new user prompt.
    pub prompt: String,
    /// Earlier turns, oldest first.
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    /// Optional system prompt.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Maximum tokens to generate.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

fn default_max_tokens() -> u32 {
    250
}

fn default_temperature() -> f64 {
    0.7
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            history: Vec::new(),
            system_prompt: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }

    /// The full message list: system prompt, history, then the prompt.
    pub fn messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        if let Some(system) = &self.system_prompt {
            messages.push(ChatMessage {
                role: Role::System,
                content: system.clone(),
            });
        }
        messages.extend(self.history.iter().cloned());
        messages.push(ChatMessage::user(self.prompt.clone()));
        messages
    }
}

/// Token accounting reported by a provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Response from a chat completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The reply text, trimmed.
    pub content: String,
    /// Model that actually generated the response.
    pub model: String,
    pub token_usage: TokenUsage,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

/// Information about an available model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier.
    pub id: String,
    /// Human-readable model name.
    pub name: String,
    /// Provider name.
    pub provider: String,
    /// Maximum context window size in tokens.
    pub max_context: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_include_system_history_and_prompt() {
        let mut request = ChatRequest::new("gpt-3.5-turbo", "And now?");
        request.system_prompt = Some("Be brief.".into());
        request.history = vec![
            ChatMessage::user("Hello"),
            ChatMessage::assistant("Hi there"),
        ];

        let roles: Vec<Role> = request.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User]
        );
        assert_eq!(request.messages().last().unwrap().content, "And now?");
    }

    #[test]
    fn chat_request_defaults() {
        let request: ChatRequest =
            serde_json::from_str(r#"{"model": "m", "prompt": "p"}"#).unwrap();
        assert_eq!(request.max_tokens, 250);
        assert_eq!(request.temperature, 0.7);
        assert!(request.history.is_empty());
    }

    #[test]
    fn score_record_serde() {
        let record = QuizScoreRecord {
            score: 80.0,
            timestamp: Utc::now(),
            answers: BTreeMap::from([(0, Response::SingleChoice(2))]),
        };
        let json = serde_json::to_string(&record).unwrap();
        let restored: QuizScoreRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, record);
    }
}
