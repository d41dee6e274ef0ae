use std::collections::{BinaryHeap, HashSet};

use serde::Serialize;

use crate::component::Id;
use crate::event::{Event, EventId};
use crate::log::log_incorrect_event;

/// Epsilon to compare floating point values for equality.
pub const EPSILON: f64 = 1e-12;

pub struct SimulationState<D> {
    clock: f64,
    events: BinaryHeap<Event<D>>,
    canceled_events: HashSet<EventId>,
    event_count: u64,
}

impl<D: Serialize> SimulationState<D> {
    pub fn new() -> Self {
        Self {
            clock: 0.0,
            events: BinaryHeap::new(),
            canceled_events: HashSet::new(),
            event_count: 0,
        }
    }

    pub fn time(&self) -> f64 {
        self.clock
    }

    pub fn set_time(&mut self, time: f64) {
        self.clock = time;
    }

    pub fn add_event(&mut self, data: D, src: Id, dst: Id, delay: f64) -> EventId {
        let event_id = self.event_count;
        let event = Event {
            id: event_id,
            time: self.clock + delay.max(0.),
            src,
            dst,
            data,
        };
        if delay >= -EPSILON {
            self.events.push(event);
            self.event_count += 1;
            event_id
        } else {
            log_incorrect_event(&event, &format!("negative delay {}", delay));
            panic!("Event delay is negative! It is not allowed to add events from the past.");
        }
    }

    pub fn next_event(&mut self) -> Option<Event<D>> {
        while let Some(event) = self.events.pop() {
            if !self.canceled_events.remove(&event.id) {
                self.clock = event.time;
                return Some(event);
            }
        }
        None
    }

    pub fn peek_event(&mut self) -> Option<&Event<D>> {
        while let Some(event) = self.events.peek() {
            if self.canceled_events.contains(&event.id) {
                let id = event.id;
                self.events.pop();
                self.canceled_events.remove(&id);
            } else {
                break;
            }
        }
        self.events.peek()
    }

    pub fn cancel_event(&mut self, id: EventId) {
        self.canceled_events.insert(id);
    }

    pub fn cancel_events<F>(&mut self, pred: F) -> usize
    where
        F: Fn(&Event<D>) -> bool,
    {
        let mut canceled = 0;
        for event in self.events.iter() {
            if pred(event) && self.canceled_events.insert(event.id) {
                canceled += 1;
            }
        }
        canceled
    }

    /// Iterates over pending (not canceled) events in arbitrary order.
    pub fn pending_events(&self) -> impl Iterator<Item = &Event<D>> {
        self.events
            .iter()
            .filter(move |event| !self.canceled_events.contains(&event.id))
    }

    pub fn pending_event_count(&self) -> usize {
        self.pending_events().count()
    }

    pub fn event_count(&self) -> u64 {
        self.event_count
    }
}

impl<D: Serialize + Clone> SimulationState<D> {
    pub fn dump_events(&self) -> Vec<Event<D>> {
        let mut output: Vec<Event<D>> = self.pending_events().cloned().collect();
        output.sort();
        // Because the sorting order of events is inverted to be used with BinaryHeap
        output.reverse();
        output
    }
}
