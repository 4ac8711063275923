//! Offline story table.
//!
//! Serves scripted scenes per theme so a game always has content, with or
//! without a language model. The table ships embedded in the binary as YAML.

use std::collections::HashMap;

use async_trait::async_trait;
use crowdstory_core::choice::ChoiceId;
use crowdstory_core::error::DomainError;
use crowdstory_core::theme::Theme;
use serde::Deserialize;

use crate::domain::{Choice, FallbackReason, GeneratedContent, StoryContent, StoryContext, StoryGenerator};

const BUILTIN_STORIES: &str = include_str!("../data/fallback_stories.yaml");

#[derive(Debug, Clone, Deserialize)]
struct ScriptedRound {
    story: String,
    choices: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ThemeScript {
    rounds: Vec<ScriptedRound>,
    #[serde(default)]
    branches: HashMap<String, Vec<String>>,
    continuation: String,
    endings: Vec<String>,
}

impl ThemeScript {
    fn validate(&self, theme: Theme) -> Result<(), DomainError> {
        if self.rounds.is_empty() {
            return Err(DomainError::Validation(format!(
                "story table for {theme} has no rounds"
            )));
        }
        if self.rounds.iter().any(|round| round.choices.is_empty()) {
            return Err(DomainError::Validation(format!(
                "story table for {theme} has a round without choices"
            )));
        }
        if self.endings.is_empty() {
            return Err(DomainError::Validation(format!(
                "story table for {theme} has no endings"
            )));
        }
        Ok(())
    }

    fn branch(&self, previous: &ChoiceId, round_index: usize) -> Option<&str> {
        let lines = self.branches.get(previous.as_str())?;
        if lines.is_empty() {
            return None;
        }
        Some(lines[round_index % lines.len()].as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ScriptBook {
    scifi: ThemeScript,
    romance: ThemeScript,
    mystery: ThemeScript,
    adventure: ThemeScript,
}

impl ScriptBook {
    fn script(&self, theme: Theme) -> &ThemeScript {
        match theme {
            Theme::Scifi => &self.scifi,
            Theme::Romance => &self.romance,
            Theme::Mystery => &self.mystery,
            Theme::Adventure => &self.adventure,
        }
    }
}

/// Story generator backed by the static per-theme table.
#[derive(Debug, Clone)]
pub struct FallbackStoryGenerator {
    book: ScriptBook,
}

impl FallbackStoryGenerator {
    /// Loads the table embedded in the crate.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the embedded table is malformed.
    pub fn builtin() -> Result<Self, DomainError> {
        Self::from_yaml(BUILTIN_STORIES)
    }

    /// Loads a table from YAML with one script per theme.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the YAML does not parse, a theme
    /// is missing, or a script has no rounds, no endings, or a round without
    /// choices.
    pub fn from_yaml(source: &str) -> Result<Self, DomainError> {
        let book: ScriptBook = serde_yaml::from_str(source)
            .map_err(|e| DomainError::Validation(format!("invalid story table: {e}")))?;
        for theme in Theme::ALL {
            book.script(theme).validate(theme)?;
        }
        Ok(Self { book })
    }

    /// Builds the segment for `context` from the table.
    ///
    /// Scripted rounds play in order; once they run out the last one repeats
    /// behind a continuation line. A branch sentence reacting to the previous
    /// winner leads each segment after the first.
    #[must_use]
    pub fn scene(&self, context: &StoryContext) -> StoryContent {
        let script = self.book.script(context.theme);
        let index = context.round_index as usize;
        let branch = context
            .previous_choice
            .as_ref()
            .and_then(|choice| script.branch(choice, index));

        if context.final_round {
            let closing = script.endings[index % script.endings.len()].as_str();
            return StoryContent::ending(join_sentences(&[branch, Some(closing)]));
        }

        let exhausted = index >= script.rounds.len();
        let round = &script.rounds[index.min(script.rounds.len() - 1)];
        let continuation = exhausted.then_some(script.continuation.as_str());
        let text = join_sentences(&[branch, continuation, Some(round.story.as_str())]);

        let choices = round
            .choices
            .iter()
            .enumerate()
            .map(|(i, raw)| Choice::parse_labelled(i, raw))
            .collect();
        StoryContent::scene(text, choices)
    }
}

#[async_trait]
impl StoryGenerator for FallbackStoryGenerator {
    async fn generate(&self, context: &StoryContext) -> GeneratedContent {
        GeneratedContent::fallback(self.scene(context), FallbackReason::Offline)
    }
}

fn join_sentences(parts: &[Option<&str>]) -> String {
    parts
        .iter()
        .flatten()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
