//! Room members.

use chrono::{DateTime, Utc};
use crowdstory_core::error::DomainError;
use serde::Serialize;
use uuid::Uuid;

/// Longest display name accepted, in characters.
pub const MAX_DISPLAY_NAME_CHARS: usize = 24;

/// A member of exactly one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Player {
    /// Unique player identifier.
    pub id: Uuid,
    /// Name shown to the other members.
    pub display_name: String,
    /// Whether the player currently has a live connection.
    pub is_connected: bool,
    /// When the player joined.
    pub joined_at: DateTime<Utc>,
}

impl Player {
    /// Creates a connected player with a fresh id.
    #[must_use]
    pub fn new(display_name: String, joined_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            display_name,
            is_connected: true,
            joined_at,
        }
    }
}

/// Trims and checks a requested display name.
///
/// # Errors
///
/// Returns `DomainError::Validation` for an empty or over-long name.
pub fn normalize_display_name(raw: &str) -> Result<String, DomainError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DomainError::Validation(
            "display name must not be empty".to_owned(),
        ));
    }
    if name.chars().count() > MAX_DISPLAY_NAME_CHARS {
        return Err(DomainError::Validation(format!(
            "display name must be at most {MAX_DISPLAY_NAME_CHARS} characters"
        )));
    }
    Ok(name.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_display_name_trims_whitespace() {
        assert_eq!(normalize_display_name("  Sam ").unwrap(), "Sam");
    }

    #[test]
    fn test_normalize_display_name_rejects_blank() {
        assert!(matches!(
            normalize_display_name("   "),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn test_normalize_display_name_limits_length_in_characters() {
        // Arrange
        let longest = "é".repeat(MAX_DISPLAY_NAME_CHARS);
        let too_long = "x".repeat(MAX_DISPLAY_NAME_CHARS + 1);

        // Act / Assert
        assert_eq!(normalize_display_name(&longest).unwrap(), longest);
        assert!(normalize_display_name(&too_long).is_err());
    }
}
