//! Minimal discrete-event simulation kernel with typed events.
//!
//! Components are plain Rust values owned by the caller. The kernel owns only the clock and the future-event
//! queue, and hands each event to an [`EventHandler`] together with a [`SimulationContext`] scoped to the event's
//! destination component.

#![warn(missing_docs)]

pub mod component;
pub mod context;
pub mod event;
pub mod handler;
pub mod log;
pub mod simulation;
mod state;

pub use colored;
pub use component::Id;
pub use context::SimulationContext;
pub use event::{Event, EventId};
pub use handler::EventHandler;
pub use simulation::Simulation;
pub use state::EPSILON;
