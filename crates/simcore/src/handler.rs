//! Event handling.

use crate::context::SimulationContext;
use crate::event::Event;

/// Trait for consuming events in simulation components.
///
/// Unlike components holding shared references to the simulation, a handler is passed to the kernel on every
/// step, so it may own all component state without interior mutability.
pub trait EventHandler<D> {
    /// Processes event. The context is scoped to the event's destination component.
    fn on(&mut self, event: Event<D>, ctx: &mut SimulationContext<'_, D>);
}
