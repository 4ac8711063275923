//! Query handlers for the Party context.
//!
//! Queries return read-only views and never mutate a room.

use std::time::Duration;

use crowdstory_core::error::DomainError;
use crowdstory_session::domain::Phase;
use serde::Serialize;
use tracing::debug;

use crate::domain::code::RoomCode;
use crate::domain::room::{Room, RoomView};
use crate::registry::RoomRegistry;

/// Summary of a live room for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomSummary {
    /// The room code.
    pub code: RoomCode,
    /// Number of members.
    pub player_count: usize,
    /// Member names in join order.
    pub player_names: Vec<String>,
    /// Game phase.
    pub phase: Phase,
}

/// Retrieves the current state of a room.
///
/// # Errors
///
/// Returns `DomainError::RoomNotFound` for a malformed, unknown or closed
/// code.
pub fn get_room_state(raw_code: &str, registry: &RoomRegistry) -> Result<RoomView, DomainError> {
    let code = RoomCode::parse(raw_code)?;
    registry.get_room(&code)?.read(Room::view)
}

/// Lists every live room, ordered by code. Rooms that close during the
/// listing are skipped.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` on a poisoned lock.
pub fn list_rooms(registry: &RoomRegistry) -> Result<Vec<RoomSummary>, DomainError> {
    let mut summaries = Vec::new();
    for (code, handle) in registry.rooms()? {
        let summary = handle.read(|room| RoomSummary {
            code,
            player_count: room.players().len(),
            player_names: room
                .players()
                .iter()
                .map(|p| p.display_name.clone())
                .collect(),
            phase: room.session().phase(),
        });
        match summary {
            Ok(summary) => summaries.push(summary),
            Err(DomainError::RoomNotFound(_)) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(summaries)
}

/// Waits until the room's revision exceeds `after_revision` or `timeout`
/// elapses, then returns the current state.
///
/// # Errors
///
/// Returns `DomainError::RoomNotFound` if the room is unknown or closes
/// while waiting.
pub async fn wait_for_update(
    raw_code: &str,
    after_revision: u64,
    timeout: Duration,
    registry: &RoomRegistry,
) -> Result<RoomView, DomainError> {
    let code = RoomCode::parse(raw_code)?;
    let handle = registry.get_room(&code)?;
    let mut updates = handle.subscribe();

    let changed = async {
        loop {
            let revision = updates.borrow_and_update().revision;
            if revision > after_revision || updates.changed().await.is_err() {
                return;
            }
        }
    };
    if tokio::time::timeout(timeout, changed).await.is_err() {
        debug!(room_code = %code, after_revision, "long poll timed out");
    }

    handle.read(Room::view)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crowdstory_core::config::GameConfig;
    use crowdstory_test_support::{FixedClock, SequenceRng, fixed_now};

    use super::*;

    fn registry_with_room() -> (RoomRegistry, RoomCode) {
        let registry = RoomRegistry::new(GameConfig::default());
        let clock = FixedClock(fixed_now());
        let mut rng = SequenceRng::for_codes(&["ABC123"]);
        let (code, _) = registry.create_room("Host", None, &clock, &mut rng).unwrap();
        (registry, code)
    }

    #[test]
    fn test_get_room_state_accepts_lower_case_code() {
        // Arrange
        let (registry, _) = registry_with_room();

        // Act
        let view = get_room_state("abc123", &registry).unwrap();

        // Assert
        assert_eq!(view.code.as_str(), "ABC123");
        assert_eq!(view.players.len(), 1);
        assert_eq!(view.session.phase, Phase::Lobby);
    }

    #[test]
    fn test_get_room_state_malformed_code_is_room_not_found() {
        // Arrange
        let (registry, _) = registry_with_room();

        // Act
        let result = get_room_state("nope", &registry);

        // Assert
        assert_eq!(result, Err(DomainError::RoomNotFound("nope".to_owned())));
    }

    #[test]
    fn test_list_rooms_summarizes_members() {
        // Arrange
        let (registry, code) = registry_with_room();
        let clock = FixedClock(fixed_now());
        registry.join_room(&code, "Sam", &clock).unwrap();

        // Act
        let rooms = list_rooms(&registry).unwrap();

        // Assert
        assert_eq!(
            rooms,
            vec![RoomSummary {
                code,
                player_count: 2,
                player_names: vec!["Host".to_owned(), "Sam".to_owned()],
                phase: Phase::Lobby,
            }]
        );
    }

    #[tokio::test]
    async fn test_wait_for_update_returns_immediately_when_behind() {
        // Arrange
        let (registry, code) = registry_with_room();
        let clock = FixedClock(fixed_now());
        registry.join_room(&code, "Sam", &clock).unwrap();

        // Act
        let view = wait_for_update("ABC123", 0, Duration::from_secs(30), &registry)
            .await
            .unwrap();

        // Assert
        assert_eq!(view.revision, 1);
    }

    #[tokio::test]
    async fn test_wait_for_update_wakes_on_join() {
        // Arrange
        let (registry, code) = registry_with_room();
        let registry = Arc::new(registry);
        let joiner = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                registry
                    .join_room(&code, "Sam", &FixedClock(fixed_now()))
                    .unwrap();
            })
        };

        // Act
        let view = wait_for_update("ABC123", 0, Duration::from_secs(30), &registry)
            .await
            .unwrap();

        // Assert
        joiner.await.unwrap();
        assert_eq!(view.revision, 1);
        assert_eq!(view.players.len(), 2);
    }

    #[tokio::test]
    async fn test_wait_for_update_times_out_with_current_state() {
        // Arrange
        let (registry, _) = registry_with_room();

        // Act
        let view = wait_for_update("ABC123", 0, Duration::from_millis(20), &registry)
            .await
            .unwrap();

        // Assert
        assert_eq!(view.revision, 0);
    }
}
