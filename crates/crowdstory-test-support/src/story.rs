//! Scripted story and image collaborators for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use crowdstory_story::domain::{Choice, FallbackReason, GeneratedContent, StoryContent, StoryContext, StoryGenerator};
use crowdstory_story::image::{ImageGenerator, ImageRequest};

/// A story generator that writes predictable scenes and records every
/// context it was asked for.
///
/// Scene text is `"scene {round_index}"`; choices are `A`, `B`, `C`. An ending
/// is returned when the context asks for one, or once `ending_at` is reached.
#[derive(Debug)]
pub struct ScriptedStoryGenerator {
    ending_at: Option<u32>,
    choice_ids: Vec<&'static str>,
    requests: Mutex<Vec<StoryContext>>,
}

impl ScriptedStoryGenerator {
    /// Generator producing three-choice scenes indefinitely.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ending_at: None,
            choice_ids: vec!["A", "B", "C"],
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Signal an ending once `round_index` reaches `round`.
    #[must_use]
    pub fn ending_at(mut self, round: u32) -> Self {
        self.ending_at = Some(round);
        self
    }

    /// Use the given choice ids instead of `A`, `B`, `C`.
    #[must_use]
    pub fn with_choices(mut self, ids: Vec<&'static str>) -> Self {
        self.choice_ids = ids;
        self
    }

    /// Every context received so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn requests(&self) -> Vec<StoryContext> {
        self.requests.lock().unwrap().clone()
    }

    /// The scene this generator writes for `context`.
    #[must_use]
    pub fn scene_for(&self, context: &StoryContext) -> StoryContent {
        let ends = context.final_round
            || self
                .ending_at
                .is_some_and(|round| context.round_index >= round);
        if ends {
            return StoryContent::ending(format!("ending {}", context.round_index));
        }
        let choices = self
            .choice_ids
            .iter()
            .map(|id| Choice::new(*id, format!("option {id}")))
            .collect();
        StoryContent::scene(format!("scene {}", context.round_index), choices)
    }
}

impl Default for ScriptedStoryGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoryGenerator for ScriptedStoryGenerator {
    async fn generate(&self, context: &StoryContext) -> GeneratedContent {
        self.requests.lock().unwrap().push(context.clone());
        GeneratedContent::fallback(self.scene_for(context), FallbackReason::Offline)
    }
}

/// An image generator that returns a fixed URL and records each request.
#[derive(Debug, Default)]
pub struct RecordingImageGenerator {
    url: Option<String>,
    requests: Mutex<Vec<ImageRequest>>,
}

impl RecordingImageGenerator {
    /// Generator that answers every request with `url`.
    #[must_use]
    pub fn returning(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every request received so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn requests(&self) -> Vec<ImageRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageGenerator for RecordingImageGenerator {
    async fn generate(&self, request: &ImageRequest) -> Option<String> {
        self.requests.lock().unwrap().push(request.clone());
        self.url.clone()
    }
}
