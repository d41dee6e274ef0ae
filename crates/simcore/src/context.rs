//! Accessing simulation from components.

use serde::Serialize;

use crate::component::Id;
use crate::event::{Event, EventId};
use crate::state::SimulationState;

/// A facade for accessing the simulation state and producing events from simulation components.
///
/// The context borrows the simulation state for the duration of a single event handler call.
pub struct SimulationContext<'a, D> {
    id: Id,
    name: &'a str,
    sim_state: &'a mut SimulationState<D>,
}

impl<'a, D: Serialize> SimulationContext<'a, D> {
    pub(crate) fn new(id: Id, name: &'a str, sim_state: &'a mut SimulationState<D>) -> Self {
        Self { id, name, sim_state }
    }

    /// Returns the identifier of component associated with this context.
    pub fn id(&self) -> Id {
        self.id
    }

    /// Returns the name of component associated with this context.
    pub fn name(&self) -> &str {
        self.name
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.sim_state.time()
    }

    /// Creates new event with specified payload, destination and delay.
    pub fn emit(&mut self, data: D, dst: Id, delay: f64) -> EventId {
        self.sim_state.add_event(data, self.id, dst, delay)
    }

    /// Creates new immediate (zero-delay) event with specified payload and destination.
    pub fn emit_now(&mut self, data: D, dst: Id) -> EventId {
        self.sim_state.add_event(data, self.id, dst, 0.)
    }

    /// Creates new event for itself with specified payload and delay.
    pub fn emit_self(&mut self, data: D, delay: f64) -> EventId {
        self.sim_state.add_event(data, self.id, self.id, delay)
    }

    /// Cancels the specified event.
    pub fn cancel_event(&mut self, id: EventId) {
        self.sim_state.cancel_event(id);
    }

    /// Cancels all pending events matching the predicate, returns the number of canceled events.
    pub fn cancel_events<F>(&mut self, pred: F) -> usize
    where
        F: Fn(&Event<D>) -> bool,
    {
        self.sim_state.cancel_events(pred)
    }
}
