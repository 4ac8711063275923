//! HTTP transport to an OpenAI-compatible chat completions endpoint.

use async_trait::async_trait;
use crowdstory_core::error::DomainError;
use serde::{Deserialize, Serialize};

use crate::model::{CompletionClient, CompletionRequest};

/// Provider endpoint used when none is configured.
pub const DEFAULT_BASE_URL: &str = "https://api.dedaluslabs.ai/v1";

/// Models tried in order when none are configured.
pub const DEFAULT_MODELS: [&str; 5] = [
    "anthropic/claude-sonnet-4-20250514",
    "anthropic/claude-opus-4-6",
    "openai/gpt-4o",
    "google/gemini-1.5-pro",
    "xai/grok-2-latest",
];

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

impl<'a> From<&'a CompletionRequest> for ChatBody<'a> {
    fn from(request: &'a CompletionRequest) -> Self {
        Self {
            model: &request.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// [`CompletionClient`] that posts to `{base_url}/chat/completions` with a
/// bearer key.
#[derive(Clone)]
pub struct HttpCompletionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for HttpCompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCompletionClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpCompletionClient {
    /// Creates a client for the provider at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the HTTP client cannot be
    /// built.
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, DomainError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| DomainError::Infrastructure(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_http(http, base_url, api_key))
    }

    /// Creates a client sharing an existing `reqwest::Client`.
    #[must_use]
    pub fn with_http(http: reqwest::Client, base_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key: api_key.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, DomainError> {
        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&ChatBody::from(request))
            .send()
            .await
            .map_err(|e| DomainError::Infrastructure(format!("chat request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DomainError::Infrastructure(format!(
                "chat provider returned {status}"
            )));
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| DomainError::Infrastructure(format!("unreadable chat reply: {e}")))?;
        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| DomainError::Infrastructure("chat reply had no content".to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::Json;
    use axum::Router;
    use axum::http::{HeaderMap, StatusCode, header};
    use axum::routing::post;
    use crowdstory_core::theme::Theme;
    use serde_json::{Value, json};

    use super::*;
    use crate::domain::{ContentSource, StoryContext, StoryGenerator};
    use crate::fallback::FallbackStoryGenerator;
    use crate::model::ModelStoryGenerator;

    type Seen = Arc<Mutex<Vec<(Option<String>, Value)>>>;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/v1/")
    }

    fn replying(seen: &Seen, content: &'static str) -> Router {
        let seen = Arc::clone(seen);
        Router::new().route(
            "/v1/chat/completions",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let seen = Arc::clone(&seen);
                async move {
                    let auth = headers
                        .get(header::AUTHORIZATION)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_owned);
                    seen.lock().unwrap().push((auth, body));
                    Json(json!({
                        "choices": [{ "message": { "role": "assistant", "content": content } }]
                    }))
                }
            }),
        )
    }

    fn local_client(base_url: &str, api_key: &str) -> HttpCompletionClient {
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        HttpCompletionClient::with_http(http, base_url, api_key)
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "openai/gpt-4o".to_owned(),
            system: "Respond with JSON.".to_owned(),
            prompt: "Tell a story.".to_owned(),
            temperature: 0.7,
            max_tokens: 1024,
        }
    }

    #[test]
    fn test_new_trims_trailing_slash_from_base_url() {
        let client = HttpCompletionClient::new("https://provider.test/v1/", "key").unwrap();

        assert_eq!(client.endpoint(), "https://provider.test/v1/chat/completions");
    }

    #[tokio::test]
    async fn test_complete_posts_chat_body_with_bearer_key() {
        // Arrange
        let seen = Seen::default();
        let base_url = serve(replying(&seen, "once upon a time")).await;
        let client = local_client(&base_url, "secret-key");

        // Act
        let text = client.complete(&request()).await.unwrap();

        // Assert
        assert_eq!(text, "once upon a time");
        let seen = seen.lock().unwrap();
        let (auth, body) = &seen[0];
        assert_eq!(auth.as_deref(), Some("Bearer secret-key"));
        assert_eq!(body["model"], "openai/gpt-4o");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Tell a story.");
        assert_eq!(body["max_tokens"], 1024);
    }

    #[tokio::test]
    async fn test_complete_maps_error_status_to_infrastructure() {
        // Arrange
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { StatusCode::TOO_MANY_REQUESTS }),
        );
        let base_url = serve(router).await;
        let client = local_client(&base_url, "key");

        // Act
        let result = client.complete(&request()).await;

        // Assert
        assert!(matches!(result, Err(DomainError::Infrastructure(msg)) if msg.contains("429")));
    }

    #[tokio::test]
    async fn test_complete_rejects_empty_reply() {
        // Arrange
        let seen = Seen::default();
        let base_url = serve(replying(&seen, "  ")).await;
        let client = local_client(&base_url, "key");

        // Act
        let result = client.complete(&request()).await;

        // Assert
        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
    }

    #[tokio::test]
    async fn test_model_generator_writes_scene_over_http() {
        // Arrange
        let seen = Seen::default();
        let base_url = serve(replying(
            &seen,
            r#"{"story": "The hatch opens.", "choices": ["A) Go in", "B) Wait", "C) Run"]}"#,
        ))
        .await;
        let client = local_client(&base_url, "key");
        let generator = ModelStoryGenerator::new(
            Arc::new(client),
            vec!["openai/gpt-4o".to_owned()],
            FallbackStoryGenerator::builtin().unwrap(),
        );

        // Act
        let generated = generator
            .generate(&StoryContext::opening(Theme::Scifi))
            .await;

        // Assert
        assert_eq!(
            generated.source,
            ContentSource::Generated {
                model: "openai/gpt-4o".to_owned()
            }
        );
        assert_eq!(generated.content.text, "The hatch opens.");
        assert_eq!(generated.content.choices.len(), 3);
    }
}
