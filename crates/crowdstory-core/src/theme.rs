//! Story themes a room can be created with.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Genre of the story a room plays through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Astronaut, AI and alien aboard a space station.
    #[default]
    Scifi,
    /// Two undergrads on a college campus.
    Romance,
    /// Detective, suspect and witness in a coastal town.
    Mystery,
    /// Explorer, companion and guide in the jungle.
    Adventure,
}

impl Theme {
    /// All themes in display order.
    pub const ALL: [Theme; 4] = [
        Theme::Scifi,
        Theme::Romance,
        Theme::Mystery,
        Theme::Adventure,
    ];

    /// Lowercase wire name of the theme.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Scifi => "scifi",
            Theme::Romance => "romance",
            Theme::Mystery => "mystery",
            Theme::Adventure => "adventure",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Theme::ALL
            .into_iter()
            .find(|theme| theme.as_str() == wanted)
            .ok_or_else(|| DomainError::Validation(format!("unknown theme: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_parses_case_insensitively() {
        assert_eq!("Mystery".parse::<Theme>().unwrap(), Theme::Mystery);
        assert_eq!(" scifi ".parse::<Theme>().unwrap(), Theme::Scifi);
    }

    #[test]
    fn test_unknown_theme_is_validation_error() {
        match "western".parse::<Theme>() {
            Err(DomainError::Validation(msg)) => assert!(msg.contains("western")),
            other => panic!("expected Validation, got {other:?}"),
        }
    }
}
