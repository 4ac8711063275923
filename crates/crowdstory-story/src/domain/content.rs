//! Story scenes and the context they are generated from.

use crowdstory_core::choice::ChoiceId;
use crowdstory_core::theme::Theme;
use serde::{Deserialize, Serialize};

/// One option players can vote for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// Identifier votes refer to.
    pub id: ChoiceId,
    /// Text shown to players.
    pub label: String,
}

impl Choice {
    /// Creates a choice.
    #[must_use]
    pub fn new(id: impl Into<ChoiceId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }

    /// Parses a labelled option such as `"B) Ask for proof"`.
    ///
    /// A leading single letter followed by `)`, `.` or `:` becomes the id;
    /// otherwise the id is the letter for `index` (`0 -> "A"`).
    #[must_use]
    pub fn parse_labelled(index: usize, raw: &str) -> Self {
        let raw = raw.trim();
        let mut chars = raw.chars();
        if let (Some(letter), Some(sep)) = (chars.next(), chars.next()) {
            if letter.is_ascii_alphabetic() && matches!(sep, ')' | '.' | ':') {
                let label = chars.as_str().trim();
                if !label.is_empty() {
                    return Self::new(letter.to_ascii_uppercase().to_string(), label);
                }
            }
        }
        Self::new(letter_id(index), raw)
    }
}

/// Id for the option at `index`: `A`..`Z`, then numbers.
#[must_use]
pub fn letter_id(index: usize) -> ChoiceId {
    match u8::try_from(index) {
        Ok(i) if i < 26 => ChoiceId::new(char::from(b'A' + i).to_string()),
        _ => ChoiceId::new((index + 1).to_string()),
    }
}

/// A story segment: narrative plus the options for the next vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryContent {
    /// Narrative text.
    pub text: String,
    /// Options in display order. Empty for an ending.
    pub choices: Vec<Choice>,
    /// Whether this segment concludes the story.
    pub ending: bool,
}

impl StoryContent {
    /// A regular scene that continues into a vote.
    #[must_use]
    pub fn scene(text: impl Into<String>, choices: Vec<Choice>) -> Self {
        Self {
            text: text.into(),
            choices,
            ending: false,
        }
    }

    /// A concluding scene.
    #[must_use]
    pub fn ending(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            choices: Vec::new(),
            ending: true,
        }
    }

    /// Ids of the options, in display order.
    #[must_use]
    pub fn choice_ids(&self) -> Vec<ChoiceId> {
        self.choices.iter().map(|c| c.id.clone()).collect()
    }

    /// Looks up an option by id.
    #[must_use]
    pub fn choice(&self, id: &ChoiceId) -> Option<&Choice> {
        self.choices.iter().find(|c| &c.id == id)
    }
}

/// Everything a generator may use to write the next segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryContext {
    /// Segments already played; 0 asks for the opening scene.
    pub round_index: u32,
    /// Winner of the last ballot.
    pub previous_choice: Option<ChoiceId>,
    /// Label of the last winner, as players saw it.
    pub previous_choice_label: Option<String>,
    /// Genre of the room.
    pub theme: Theme,
    /// Narrative of earlier segments, oldest first.
    pub history: Vec<String>,
    /// Ask for a concluding segment instead of another scene.
    pub final_round: bool,
}

impl StoryContext {
    /// Context for the opening scene of a `theme` story.
    #[must_use]
    pub fn opening(theme: Theme) -> Self {
        Self {
            round_index: 0,
            previous_choice: None,
            previous_choice_label: None,
            theme,
            history: Vec::new(),
            final_round: false,
        }
    }

    /// The most recent segment's narrative.
    #[must_use]
    pub fn previous_story(&self) -> Option<&str> {
        self.history.last().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_labelled_extracts_letter_and_label() {
        let choice = Choice::parse_labelled(2, "B) Ask for proof");

        assert_eq!(choice, Choice::new("B", "Ask for proof"));
    }

    #[test]
    fn test_parse_labelled_without_prefix_uses_position() {
        let choice = Choice::parse_labelled(2, "  Walk away ");

        assert_eq!(choice, Choice::new("C", "Walk away"));
    }

    #[test]
    fn test_parse_labelled_keeps_words_starting_with_a_letter() {
        // "I. " style prefixes are ids, but a plain word is not.
        let choice = Choice::parse_labelled(0, "Run!");

        assert_eq!(choice, Choice::new("A", "Run!"));
    }

    #[test]
    fn test_letter_id_rolls_over_to_numbers() {
        assert_eq!(letter_id(0), ChoiceId::from("A"));
        assert_eq!(letter_id(25), ChoiceId::from("Z"));
        assert_eq!(letter_id(26), ChoiceId::from("27"));
    }

    #[test]
    fn test_ending_has_no_choices() {
        let ending = StoryContent::ending("The end.");

        assert!(ending.ending);
        assert!(ending.choice_ids().is_empty());
    }
}
