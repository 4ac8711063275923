//! Room codes.

use std::fmt;

use crowdstory_core::error::DomainError;
use crowdstory_core::rng::DeterministicRng;
use serde::{Deserialize, Serialize};

/// Characters a room code is drawn from.
pub const CODE_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Number of characters in a room code.
pub const CODE_LENGTH: usize = 6;

/// A six-character room code over `A-Z0-9`, always upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Draws a fresh code from `rng`. Uniqueness is the registry's concern.
    pub fn generate(rng: &mut dyn DeterministicRng) -> Self {
        let max = u32::try_from(CODE_ALPHABET.len() - 1).unwrap_or(u32::MAX);
        let code = (0..CODE_LENGTH)
            .map(|_| {
                let index = rng.next_u32_range(0, max) as usize;
                char::from(CODE_ALPHABET[index.min(CODE_ALPHABET.len() - 1)])
            })
            .collect();
        Self(code)
    }

    /// Normalizes user input to a room code. Any casing is accepted.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::RoomNotFound` if `raw` cannot name a room.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let normalized = raw.trim().to_ascii_uppercase();
        let well_formed = normalized.len() == CODE_LENGTH
            && normalized.bytes().all(|b| CODE_ALPHABET.contains(&b));
        if well_formed {
            Ok(Self(normalized))
        } else {
            Err(DomainError::RoomNotFound(raw.to_owned()))
        }
    }

    /// The code as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
