//! Story generator driven by a hosted language model.
//!
//! The transport to the model provider sits behind [`CompletionClient`]. The
//! generator tries each configured model in order, each under a timeout, and
//! serves the offline table when none of them returns a usable segment.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use crowdstory_core::error::DomainError;
use crowdstory_core::theme::Theme;
use serde::Deserialize;
use tracing::{info, warn};

use crate::domain::{Choice, FallbackReason, GeneratedContent, StoryContent, StoryContext, StoryGenerator};
use crate::fallback::FallbackStoryGenerator;

const SYSTEM_PROMPT: &str = "You are a creative storyteller. Always respond with valid JSON only.";

/// One chat completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Provider model identifier.
    pub model: String,
    /// System instruction.
    pub system: String,
    /// User prompt.
    pub prompt: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Response length cap.
    pub max_tokens: u32,
}

/// Transport to a chat completion provider.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Returns the raw text of the first completion.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` for any transport or provider
    /// failure.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, DomainError>;
}

#[derive(Debug, Deserialize)]
struct ModelReply {
    story: String,
    #[serde(default)]
    choices: Vec<serde_json::Value>,
}

/// Story generator that asks a language model first and the offline table
/// second.
pub struct ModelStoryGenerator {
    client: Arc<dyn CompletionClient>,
    models: Vec<String>,
    fallback: FallbackStoryGenerator,
    request_timeout: Duration,
    max_words: usize,
    choice_count: usize,
}

impl ModelStoryGenerator {
    /// Creates a generator trying `models` in order. Defaults: 15 s per
    /// request, 50-word segments, three choices.
    #[must_use]
    pub fn new(
        client: Arc<dyn CompletionClient>,
        models: Vec<String>,
        fallback: FallbackStoryGenerator,
    ) -> Self {
        let mut unique: Vec<String> = Vec::with_capacity(models.len());
        for model in models {
            if !model.is_empty() && !unique.contains(&model) {
                unique.push(model);
            }
        }
        Self {
            client,
            models: unique,
            fallback,
            request_timeout: Duration::from_secs(15),
            max_words: 50,
            choice_count: 3,
        }
    }

    /// Overrides the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Models in the order they are tried.
    #[must_use]
    pub fn models(&self) -> &[String] {
        &self.models
    }

    async fn try_model(&self, model: &str, context: &StoryContext) -> Option<StoryContent> {
        let request = CompletionRequest {
            model: model.to_owned(),
            system: SYSTEM_PROMPT.to_owned(),
            prompt: build_prompt(context),
            temperature: 0.7,
            max_tokens: 1024,
        };

        let text = match tokio::time::timeout(self.request_timeout, self.client.complete(&request)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!(model, error = %e, "model request failed");
                return None;
            }
            Err(_) => {
                warn!(model, timeout = ?self.request_timeout, "model request timed out");
                return None;
            }
        };

        let Some(reply) = parse_reply(&text) else {
            warn!(model, "model reply was not a story object");
            return None;
        };
        self.to_content(reply, context)
    }

    fn to_content(&self, reply: ModelReply, context: &StoryContext) -> Option<StoryContent> {
        let story = enforce_word_limit(&reply.story, self.max_words);
        if story.is_empty() {
            return None;
        }
        if context.final_round {
            return Some(StoryContent::ending(story));
        }

        let labels: Vec<&str> = reply
            .choices
            .iter()
            .filter_map(serde_json::Value::as_str)
            .take(self.choice_count)
            .collect();
        if labels.len() != self.choice_count {
            warn!(got = labels.len(), expected = self.choice_count, "model returned wrong number of choices");
            return None;
        }
        let choices = labels
            .into_iter()
            .enumerate()
            .map(|(i, raw)| Choice::parse_labelled(i, raw))
            .collect();
        Some(StoryContent::scene(story, choices))
    }
}

#[async_trait]
impl StoryGenerator for ModelStoryGenerator {
    async fn generate(&self, context: &StoryContext) -> GeneratedContent {
        if self.models.is_empty() {
            return GeneratedContent::fallback(
                self.fallback.scene(context),
                FallbackReason::NoModelConfigured,
            );
        }

        for model in &self.models {
            if let Some(content) = self.try_model(model, context).await {
                info!(model = %model, theme = %context.theme, round = context.round_index, "generated story segment");
                return GeneratedContent::generated(content, model.clone());
            }
        }

        warn!(theme = %context.theme, attempts = self.models.len(), "all models failed, serving offline story");
        GeneratedContent::fallback(
            self.fallback.scene(context),
            FallbackReason::AllModelsFailed {
                attempts: self.models.len(),
            },
        )
    }
}

fn cast_and_setting(theme: Theme) -> &'static str {
    match theme {
        Theme::Scifi => "a simple sci-fi story with three characters: an astronaut, an AI, and an alien on a space station",
        Theme::Romance => "a simple romance story about two college students on a big city campus",
        Theme::Mystery => "a simple mystery story with a detective, a suspect, and a witness in a harbor town",
        Theme::Adventure => "a simple adventure story with an explorer, a companion, and a guide in the jungle",
    }
}

/// Builds the user prompt for `context`.
#[must_use]
pub fn build_prompt(context: &StoryContext) -> String {
    let continuity = match context.previous_story() {
        Some(previous) => format!("Previous story: \"{previous}\" Continue directly from it without resetting."),
        None => "This is round 1. Begin the story.".to_owned(),
    };
    let decision = match (&context.previous_choice, &context.previous_choice_label) {
        (Some(id), Some(label)) => format!(
            " The audience chose \"{id}) {label}\" in round {}. Continue from that choice.",
            context.round_index
        ),
        (Some(id), None) => format!(
            " The audience chose \"{id}\" in round {}. Continue from that choice.",
            context.round_index
        ),
        _ => String::new(),
    };
    let shape = if context.final_round {
        "This is the final round. Bring the story to a satisfying ending.\n\
         - Return ONLY this JSON:\n\
         {\"story\": \"[YOUR ENDING]\", \"choices\": []}"
    } else {
        "- Return ONLY this JSON:\n\
         {\"story\": \"[YOUR STORY]\", \"choices\": [\"A) [simple action]\", \"B) [simple action]\", \"C) [simple action]\"]}"
    };

    format!(
        "Write {setting}. {continuity}{decision}\n\
         REQUIREMENTS:\n\
         - 40 to 50 words, never more than 50\n\
         - Simple words a child could understand\n\
         - Short sentences only, at most 10 words each\n\
         {shape}",
        setting = cast_and_setting(context.theme),
    )
}

/// Extracts the `{story, choices}` object from a model reply, tolerating
/// markdown code fences and chatter around the JSON.
fn parse_reply(text: &str) -> Option<ModelReply> {
    let trimmed = text.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let unfenced = unfenced.strip_suffix("```").unwrap_or(unfenced);

    let start = unfenced.find('{')?;
    let end = unfenced.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&unfenced[start..=end]).ok()
}

/// Cuts `story` to at most `max_words` words, preferring to stop at the last
/// full sentence.
#[must_use]
pub fn enforce_word_limit(story: &str, max_words: usize) -> String {
    let words: Vec<&str> = story.split_whitespace().collect();
    if words.len() <= max_words {
        return story.trim().to_owned();
    }

    let trimmed = words[..max_words].join(" ");
    let last_stop = trimmed.rfind(['.', '!', '?']);
    match last_stop {
        Some(stop) if stop > 20 => trimmed[..=stop].to_owned(),
        _ => {
            let bare = trimmed.trim_end_matches(['.', ',', '!', '?']);
            format!("{bare}.")
        }
    }
}
