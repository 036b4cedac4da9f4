//! Offline generator used when no API key is configured, and in tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use lessonforge_core::traits::{ChatRequest, ChatResponse, ModelInfo, TextGenerator, TokenUsage};

/// Model id that always routes to the mock generator.
pub const MOCK_MODEL: &str = "mock-response-model";

const SETUP_HINT: &str = "To use a real model, set an OpenAI API key in the lessonforge config.";

/// A mock text generator that answers without any network access.
///
/// Fixed responses registered with [`MockGenerator::new`] win; otherwise the
/// reply is picked from the topic of the prompt.
pub struct MockGenerator {
    /// Map of prompt substring → response text.
    responses: HashMap<String, String>,
    /// Used instead of the topic replies when set.
    default_response: Option<String>,
    call_count: AtomicU32,
    last_request: Mutex<Option<ChatRequest>>,
}

impl MockGenerator {
    pub fn new(responses: HashMap<String, String>) -> Self {
        Self {
            responses,
            default_response: None,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Create a mock that always returns the same response.
    pub fn with_fixed_response(response: &str) -> Self {
        Self {
            default_response: Some(response.to_string()),
            ..Self::new(HashMap::new())
        }
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn last_request(&self) -> Option<ChatRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new(HashMap::new())
    }
}

/// Canned reply keyed on the topic of the prompt.
fn topic_response(prompt: &str) -> String {
    let lower = prompt.to_lowercase();
    let mentions = |words: &[&str]| words.iter().any(|w| lower.contains(w));
    let length = prompt.chars().count();

    if mentions(&["police", "law", "enforcement"]) {
        format!(
            "This is a mock response for law enforcement related questions. \
             A real model would answer about policing, criminal justice, or law enforcement. \
             {SETUP_HINT}\n\nYour prompt was related to law enforcement and was {length} \
             characters long."
        )
    } else if mentions(&["ethics", "bias"]) {
        format!(
            "This is a mock response about AI ethics or bias. \
             A real model would analyse the ethical considerations, potential concerns, \
             and mitigation strategies. {SETUP_HINT}"
        )
    } else if mentions(&["report", "investigation"]) {
        format!(
            "This is a mock response for a report or investigation. \
             A real model would produce a structured summary with incident details, \
             persons involved, evidence collected, and next steps.\n\n{SETUP_HINT}"
        )
    } else {
        let preview: String = prompt.chars().take(50).collect();
        format!(
            "This is a mock response for testing purposes. {SETUP_HINT}\n\n\
             Your prompt was {length} characters long and began: {preview}..."
        )
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: &ChatRequest) -> anyhow::Result<ChatResponse> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_request.lock().unwrap_or_else(|p| p.into_inner()) = Some(request.clone());

        let content = self
            .responses
            .iter()
            .find(|(key, _)| request.prompt.contains(key.as_str()))
            .map(|(_, v)| v.clone())
            .or_else(|| self.default_response.clone())
            .unwrap_or_else(|| topic_response(&request.prompt));

        // Rough estimate
        let prompt_tokens = (request.prompt.len() / 4) as u32;
        let completion_tokens = (content.len() / 4) as u32;

        Ok(ChatResponse {
            content,
            model: request.model.clone(),
            token_usage: TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            },
            latency_ms: 1,
        })
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![ModelInfo {
            id: MOCK_MODEL.into(),
            name: "Mock Responses".into(),
            provider: "mock".into(),
            max_context: 100_000,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixed_response() {
        let generator = MockGenerator::with_fixed_response("Hello!");
        let response = generator
            .generate(&ChatRequest::new(MOCK_MODEL, "anything"))
            .await
            .unwrap();
        assert_eq!(response.content, "Hello!");
        assert_eq!(generator.call_count(), 1);
        assert_eq!(generator.last_request().unwrap().prompt, "anything");
    }

    #[tokio::test]
    async fn prompt_matching_beats_topics() {
        let generator = MockGenerator::new(HashMap::from([(
            "what is ai".to_string(),
            "AI is software that performs tasks needing human intelligence.".to_string(),
        )]));

        let matched = generator
            .generate(&ChatRequest::new(MOCK_MODEL, "so, what is ai and law?"))
            .await
            .unwrap();
        assert!(matched.content.starts_with("AI is software"));

        let fallback = generator
            .generate(&ChatRequest::new(MOCK_MODEL, "Draft an incident report"))
            .await
            .unwrap();
        assert!(fallback.content.contains("report or investigation"));
        assert_eq!(generator.call_count(), 2);
    }

    #[test]
    fn topic_selection() {
        assert!(topic_response("Explain Law Enforcement AI").contains("law enforcement"));
        assert!(topic_response("Is this model biased? bias check").contains("ethics or bias"));
        let generic = topic_response("Tell me a story");
        assert!(generic.contains("15 characters long"));
        assert!(generic.contains("Tell me a story..."));
    }
}
