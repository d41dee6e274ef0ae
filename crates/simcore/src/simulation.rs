//! Simulation configuration and execution.

use std::collections::HashMap;

use log::Level::Trace;
use log::{debug, log_enabled, trace};
use serde::Serialize;
use serde_json::json;

use crate::component::Id;
use crate::context::SimulationContext;
use crate::event::{Event, EventId};
use crate::handler::EventHandler;
use crate::log::log_undelivered_event;
use crate::state::SimulationState;

/// Represents a simulation, provides methods for its configuration and execution.
///
/// The simulation is parameterized by the event payload type `D`. It owns the clock and the future-event queue,
/// while component state lives in an [`EventHandler`] passed to the stepping methods.
pub struct Simulation<D> {
    sim_state: SimulationState<D>,
    name_to_id: HashMap<String, Id>,
    names: Vec<String>,
}

impl<D: Serialize> Default for Simulation<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Serialize> Simulation<D> {
    /// Creates a new empty simulation.
    pub fn new() -> Self {
        Self {
            sim_state: SimulationState::new(),
            name_to_id: HashMap::new(),
            names: Vec::new(),
        }
    }

    /// Registers a component with the given name and returns its identifier.
    ///
    /// Registering the same name twice returns the same identifier.
    pub fn register<S>(&mut self, name: S) -> Id
    where
        S: AsRef<str>,
    {
        if let Some(&id) = self.name_to_id.get(name.as_ref()) {
            return id;
        }
        let id = self.names.len() as Id;
        self.name_to_id.insert(name.as_ref().to_owned(), id);
        self.names.push(name.as_ref().to_owned());
        debug!(
            target: "simulation",
            "[{:.3} {} simulation] Registered component: {}",
            self.time(),
            crate::log::get_colored("DEBUG", colored::Color::Blue),
            json!({"name": name.as_ref(), "id": id})
        );
        id
    }

    /// Returns the identifier of component by its name, if registered.
    pub fn lookup_id(&self, name: &str) -> Option<Id> {
        self.name_to_id.get(name).copied()
    }

    /// Returns the name of component by its identifier.
    pub fn lookup_name(&self, id: Id) -> String {
        self.names[id as usize].clone()
    }

    /// Returns a context scoped to the given component.
    ///
    /// Useful for emitting events from outside of event handlers, e.g. when setting up initial state.
    pub fn context(&mut self, id: Id) -> SimulationContext<'_, D> {
        SimulationContext::new(id, &self.names[id as usize], &mut self.sim_state)
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.sim_state.time()
    }

    /// Performs a single step through the simulation.
    ///
    /// Takes the next event from the queue, advances the simulation time to event time and passes the event to
    /// the handler. Returns `true` if some pending event was found (no matter was it properly processed or not)
    /// and `false` otherwise.
    pub fn step<H>(&mut self, handler: &mut H) -> bool
    where
        H: EventHandler<D>,
    {
        let next = self.sim_state.next_event();
        if let Some(event) = next {
            if let Some(name) = self.names.get(event.dst as usize) {
                if log_enabled!(Trace) {
                    let src_name = self.names.get(event.src as usize).map(String::as_str).unwrap_or("?");
                    trace!(
                        target: name,
                        "[{:.3} {} {}] {}",
                        event.time,
                        crate::log::get_colored("EVENT", colored::Color::BrightBlack),
                        name,
                        json!({"data": event.data, "src": src_name})
                    );
                }
                let mut ctx = SimulationContext::new(event.dst, name, &mut self.sim_state);
                handler.on(event, &mut ctx);
            } else {
                log_undelivered_event(&event);
            }
            true
        } else {
            false
        }
    }

    /// Performs steps until there are no pending events left.
    pub fn step_until_no_events<H>(&mut self, handler: &mut H)
    where
        H: EventHandler<D>,
    {
        while self.step(handler) {}
    }

    /// Processes all events with time not later than `current time + duration`.
    ///
    /// If there are still pending events afterwards, the clock is moved to the end of the interval. Otherwise the
    /// clock stays at the time of the last processed event and [`is_running`](Self::is_running) reports `false`.
    /// Negative durations are treated as zero, so the clock never moves backwards. Returns the resulting simulation
    /// time.
    pub fn run_for<H>(&mut self, duration: f64, handler: &mut H) -> f64
    where
        H: EventHandler<D>,
    {
        let end_time = self.sim_state.time() + duration.max(0.);
        loop {
            let next_time = self.sim_state.peek_event().map(|event| event.time);
            match next_time {
                Some(time) if time <= end_time => {
                    self.step(handler);
                }
                Some(_) => {
                    self.sim_state.set_time(end_time);
                    break;
                }
                None => break,
            }
        }
        self.sim_state.time()
    }

    /// Returns `true` if there are pending events.
    pub fn is_running(&mut self) -> bool {
        self.sim_state.peek_event().is_some()
    }

    /// Iterates over pending events in arbitrary order.
    pub fn pending_events(&self) -> impl Iterator<Item = &Event<D>> {
        self.sim_state.pending_events()
    }

    /// Returns the number of pending events.
    pub fn pending_event_count(&self) -> usize {
        self.sim_state.pending_event_count()
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

    /// Returns the total number of created events.
    ///
    /// Canceled events are also counted.
    pub fn event_count(&self) -> u64 {
        self.sim_state.event_count()
    }
}

impl<D: Serialize + Clone> Simulation<D> {
    /// Returns a time-ordered copy of pending events.
    pub fn dump_events(&self) -> Vec<Event<D>> {
        self.sim_state.dump_events()
    }
}
