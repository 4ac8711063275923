//! Aggregate root abstraction.

use uuid::Uuid;

use crate::event::DomainEvent;

/// Trait for aggregate roots whose state changes are expressed as events.
///
/// Aggregates live in memory for the lifetime of their room. Each accepted
/// command records one or more events; applying an event is the only way an
/// aggregate's state changes, so `version` counts every mutation.
pub trait AggregateRoot: Send + Sync {
    /// The event type this aggregate produces and consumes.
    type Event: DomainEvent;

    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> Uuid;

    /// Returns the current version (number of events applied).
    fn version(&self) -> u64;

    /// Apply an event to mutate internal state.
    fn apply(&mut self, event: &Self::Event);

    /// Returns events recorded since the last drain.
    fn uncommitted_events(&self) -> &[Self::Event];

    /// Removes and returns the events recorded since the last drain.
    fn take_uncommitted_events(&mut self) -> Vec<Self::Event>;
}
