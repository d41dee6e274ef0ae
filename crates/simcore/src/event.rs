//! Simulation events.

use std::cmp::Ordering;

use serde::Serialize;

use crate::component::Id;

/// Event identifier.
pub type EventId = u64;

/// Representation of event.
#[derive(Clone, Debug, Serialize)]
pub struct Event<D> {
    /// Unique event identifier.
    ///
    /// Events are numbered sequentially starting from 0.
    pub id: EventId,
    /// Time of event occurrence.
    pub time: f64,
    /// Identifier of event source.
    pub src: Id,
    /// Identifier of event destination.
    pub dst: Id,
    /// Event payload.
    pub data: D,
}

impl<D> Eq for Event<D> {}

impl<D> PartialEq for Event<D> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<D> Ord for Event<D> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.time.total_cmp(&self.time).then_with(|| other.id.cmp(&self.id))
    }
}

impl<D> PartialOrd for Event<D> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
