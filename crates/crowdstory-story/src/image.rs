//! Scene illustration seam.
//!
//! Illustrations are advisory: they are requested after a scene is shown,
//! never block the game, and a missing image is not an error.

use async_trait::async_trait;
use crowdstory_core::theme::Theme;
use tracing::debug;

/// What to illustrate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    /// Narrative of the scene.
    pub scene_text: String,
    /// Label of the choice that led here, if any.
    pub choice_label: Option<String>,
    /// Character descriptions kept stable across a story.
    pub visual_profile: String,
}

impl ImageRequest {
    /// Request for a scene of a `theme` story.
    #[must_use]
    pub fn for_scene(theme: Theme, scene_text: impl Into<String>, choice_label: Option<String>) -> Self {
        Self {
            scene_text: scene_text.into(),
            choice_label,
            visual_profile: visual_profile(theme).to_owned(),
        }
    }

    /// Prompt for an image model.
    #[must_use]
    pub fn prompt(&self) -> String {
        let choice = self.choice_label.as_deref().unwrap_or("none yet");
        [
            "Create a single cinematic illustration that matches the story context.".to_owned(),
            "Keep character designs consistent with the profile below.".to_owned(),
            String::new(),
            format!("CHARACTER PROFILE: {}", self.visual_profile),
            String::new(),
            format!("STORY CONTEXT: {}", self.scene_text),
            format!("SELECTED CHOICE: {choice}"),
            String::new(),
            "STYLE: cinematic, clean, soft lighting, high detail, consistent faces.".to_owned(),
        ]
        .join("\n")
    }
}

/// Character sheet used to keep illustrations of one theme consistent.
#[must_use]
pub fn visual_profile(theme: Theme) -> &'static str {
    match theme {
        Theme::Scifi => "astronaut in a white suit with an orange stripe; AI shown as a soft blue hologram; tall green alien with large dark eyes",
        Theme::Romance => "two college students in casual autumn clothes; warm library and campus settings",
        Theme::Mystery => "detective in a grey coat; nervous suspect in a red scarf; elderly witness with round glasses",
        Theme::Adventure => "explorer in a khaki hat; cheerful companion with a backpack; quiet guide with a carved staff",
    }
}

/// Produces an illustration URL for a scene.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Returns the image location, or `None` when no image could be made.
    async fn generate(&self, request: &ImageRequest) -> Option<String>;
}

/// Image generator used when no image backend is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledImageGenerator;

#[async_trait]
impl ImageGenerator for DisabledImageGenerator {
    async fn generate(&self, request: &ImageRequest) -> Option<String> {
        debug!(prompt_len = request.prompt().len(), "image generation disabled");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_includes_profile_scene_and_choice() {
        let request = ImageRequest::for_scene(
            Theme::Mystery,
            "A box sits on the dock.",
            Some("Open the box".to_owned()),
        );

        let prompt = request.prompt();

        assert!(prompt.contains("CHARACTER PROFILE: detective in a grey coat"));
        assert!(prompt.contains("STORY CONTEXT: A box sits on the dock."));
        assert!(prompt.contains("SELECTED CHOICE: Open the box"));
    }

    #[tokio::test]
    async fn test_disabled_generator_returns_nothing() {
        let request = ImageRequest::for_scene(Theme::Scifi, "Stars.", None);

        assert_eq!(DisabledImageGenerator.generate(&request).await, None);
    }
}
