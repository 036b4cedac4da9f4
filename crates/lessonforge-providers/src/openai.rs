//! OpenAI chat completions backend.

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use lessonforge_core::traits::{ChatRequest, ChatResponse, ModelInfo, TextGenerator, TokenUsage};

use crate::error::ProviderError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// OpenAI-compatible chat completions generator.
pub struct OpenAiGenerator {
    api_key: String,
    base_url: String,
    org_id: Option<String>,
    client: reqwest::Client,
}

impl OpenAiGenerator {
    pub fn new(
        api_key: &str,
        base_url: Option<String>,
        org_id: Option<String>,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProviderError::NetworkError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_key: api_key.trim().to_string(),
            base_url: base_url
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            org_id,
            client,
        })
    }
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    messages: Vec<OpenAiMessage<'a>>,
}

#[derive(Serialize)]
struct OpenAiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: OpenAiUsage,
    model: String,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMessage,
}

#[derive(Deserialize)]
struct OpenAiChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(
        skip(self, request),
        fields(model = %request.model, history = request.history.len())
    )]
    async fn generate(&self, request: &ChatRequest) -> anyhow::Result<ChatResponse> {
        let start = Instant::now();

        let messages = request.messages();
        let body = OpenAiRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: messages
                .iter()
                .map(|m| OpenAiMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
        };

        let mut req = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json");

        if let Some(org) = &self.org_id {
            req = req.header("OpenAI-Organization", org);
        }

        let response = req.json(&body).send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(DEFAULT_TIMEOUT_SECS)
            } else {
                ProviderError::NetworkError(e.to_string())
            }
        })?;

        let response = check_status(response, &request.model).await?;

        let api_response: OpenAiResponse = response.json().await.map_err(|e| {
            ProviderError::ApiError {
                status: 0,
                message: format!("failed to parse response: {e}"),
            }
        })?;

        let latency_ms = start.elapsed().as_millis() as u64;
        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ApiError {
                status: 0,
                message: "response contained no choices".into(),
            })?;
        let content = choice.message.content.unwrap_or_default().trim().to_string();

        tracing::debug!(latency_ms, tokens = api_response.usage.total_tokens, "chat completion");

        Ok(ChatResponse {
            content,
            model: api_response.model,
            token_usage: TokenUsage {
                prompt_tokens: api_response.usage.prompt_tokens,
                completion_tokens: api_response.usage.completion_tokens,
                total_tokens: api_response.usage.total_tokens,
            },
            latency_ms,
        })
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        [
            ("gpt-3.5-turbo", "GPT-3.5 Turbo", 16_385),
            ("gpt-4", "GPT-4", 8_192),
            ("gpt-4-turbo", "GPT-4 Turbo", 128_000),
        ]
        .into_iter()
        .map(|(id, name, max_context)| ModelInfo {
            id: id.into(),
            name: name.into(),
            provider: "openai".into(),
            max_context,
        })
        .collect()
    }
}

/// Map an HTTP error status onto `ProviderError`, passing successes through.
async fn check_status(
    response: reqwest::Response,
    model: &str,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status.as_u16() {
        429 => {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5);
            Err(ProviderError::RateLimited {
                retry_after_ms: retry_after_secs * 1000,
            })
        }
        401 => Err(ProviderError::AuthenticationFailed(
            response.text().await.unwrap_or_default(),
        )),
        404 => Err(ProviderError::ModelNotFound(model.to_string())),
        code => Err(ProviderError::ApiError {
            status: code,
            message: response.text().await.unwrap_or_default(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lessonforge_core::traits::ChatMessage;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completion(content: &str, model: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"message": {"content": content, "role": "assistant"}, "index": 0}],
            "model": model,
            "usage": {"prompt_tokens": 40, "completion_tokens": 15, "total_tokens": 55}
        })
    }

    #[tokio::test]
    async fn successful_generation() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(completion(
                    "  A model predicts the next token.\n",
                    "gpt-3.5-turbo",
                )),
            )
            .mount(&server)
            .await;

        let generator = OpenAiGenerator::new("test-key", Some(server.uri()), None).unwrap();
        let request = ChatRequest::new("gpt-3.5-turbo", "What is an LLM?");

        let response = generator.generate(&request).await.unwrap();
        assert_eq!(response.content, "A model predicts the next token.");
        assert_eq!(response.token_usage.total_tokens, 55);
        assert_eq!(response.model, "gpt-3.5-turbo");
    }

    #[tokio::test]
    async fn sends_history_and_sampling_parameters() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4",
                "max_tokens": 250,
                "temperature": 0.7,
                "messages": [
                    {"role": "user", "content": "Hello"},
                    {"role": "assistant", "content": "Hi"},
                    {"role": "user", "content": "Summarize that"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok", "gpt-4")))
            .expect(1)
            .mount(&server)
            .await;

        let generator = OpenAiGenerator::new("key", Some(server.uri()), None).unwrap();
        let mut request = ChatRequest::new("gpt-4", "Summarize that");
        request.history = vec![ChatMessage::user("Hello"), ChatMessage::assistant("Hi")];

        let response = generator.generate(&request).await.unwrap();
        assert_eq!(response.content, "ok");
    }

    #[tokio::test]
    async fn rate_limit_maps_retry_after() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "3"))
            .mount(&server)
            .await;

        let generator = OpenAiGenerator::new("key", Some(server.uri()), None).unwrap();
        let err = generator
            .generate(&ChatRequest::new("gpt-3.5-turbo", "hi"))
            .await
            .unwrap_err();
        let err = err.downcast::<ProviderError>().unwrap();
        assert!(matches!(err, ProviderError::RateLimited { retry_after_ms: 3000 }));
    }

    #[tokio::test]
    async fn authentication_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let generator = OpenAiGenerator::new("bad", Some(server.uri()), None).unwrap();
        let err = generator
            .generate(&ChatRequest::new("gpt-3.5-turbo", "hi"))
            .await
            .unwrap_err();
        let err = err.downcast::<ProviderError>().unwrap();
        assert!(matches!(err, ProviderError::AuthenticationFailed(_)));
        assert!(err.is_permanent());
    }

    #[tokio::test]
    async fn error_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
            .mount(&server)
            .await;

        let generator = OpenAiGenerator::new("key", Some(server.uri()), None).unwrap();
        let err = generator
            .generate(&ChatRequest::new("gpt-3.5-turbo", "hi"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn malformed_body_is_an_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let generator = OpenAiGenerator::new("key", Some(server.uri()), None).unwrap();
        let err = generator
            .generate(&ChatRequest::new("gpt-3.5-turbo", "hi"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to parse response"));
    }

    #[tokio::test]
    async fn empty_choices_is_an_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [],
                "model": "gpt-3.5-turbo"
            })))
            .mount(&server)
            .await;

        let generator = OpenAiGenerator::new("key", Some(server.uri()), None).unwrap();
        let err = generator
            .generate(&ChatRequest::new("gpt-3.5-turbo", "hi"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no choices"));
    }
}
