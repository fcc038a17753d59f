//! Aggregate root abstraction.

use uuid::Uuid;

use crate::event::DomainEvent;

/// Trait for aggregates whose state changes are expressed as events.
///
/// Mutating methods only record events; [`AggregateRoot::commit`] folds them
/// into state so that the decision and the mutation stay separate.
pub trait AggregateRoot: Send + Sync {
    /// The event type this aggregate produces and consumes.
    type Event: DomainEvent + Clone;

    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> Uuid;

    /// Returns the current version (number of events applied).
    fn version(&self) -> i64;

    /// Apply an event to mutate internal state.
    fn apply(&mut self, event: &Self::Event);

    /// Returns events recorded but not yet applied.
    fn uncommitted_events(&self) -> &[Self::Event];

    /// Drains the recorded events, leaving none pending.
    fn take_uncommitted_events(&mut self) -> Vec<Self::Event>;

    /// Applies every pending event in order and returns them.
    fn commit(&mut self) -> Vec<Self::Event> {
        let events = self.take_uncommitted_events();
        for event in &events {
            self.apply(event);
        }
        events
    }
}
