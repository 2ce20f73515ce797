use std::cell::{Cell, RefCell};

use log::trace;

use crate::events::{StoreEvent, StoreEventKind};
use crate::people::{PersonId, Population};
use crate::HashSet;

/// The services a data manager needs from the simulation that hosts it: the current time, the
/// set of people that exist, and an event dispatcher.
///
/// The host owns time and event delivery. Data managers only read the time, and they publish an
/// event only after `subscribers_exist` reports at least one subscriber for its kind.
pub trait PluginContext {
    fn get_current_time(&self) -> f64;

    fn person_exists(&self, person_id: PersonId) -> bool;

    fn subscribers_exist(&self, kind: StoreEventKind) -> bool;

    /// Hands the event off for delivery. Must not call back into the publishing data manager.
    fn publish(&self, event: StoreEvent);
}

/// A single-threaded, in-process host: the time is set explicitly, people live in a
/// [`Population`], and published events are kept in order until taken.
#[derive(Debug, Default)]
pub struct SimulationContext {
    current_time: Cell<f64>,
    population: Population,
    subscriptions: RefCell<HashSet<StoreEventKind>>,
    published: RefCell<Vec<StoreEvent>>,
}

impl SimulationContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_current_time(&self, time: f64) {
        self.current_time.set(time);
    }

    #[must_use]
    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn add_person(&self) -> PersonId {
        self.population.add_person()
    }

    pub fn subscribe(&self, kind: StoreEventKind) {
        trace!("subscribing to {kind}");
        self.subscriptions.borrow_mut().insert(kind);
    }

    pub fn unsubscribe(&self, kind: StoreEventKind) {
        self.subscriptions.borrow_mut().remove(&kind);
    }

    /// Removes and returns every event published so far, oldest first.
    pub fn take_events(&self) -> Vec<StoreEvent> {
        self.published.take()
    }
}

impl PluginContext for SimulationContext {
    fn get_current_time(&self) -> f64 {
        self.current_time.get()
    }

    fn person_exists(&self, person_id: PersonId) -> bool {
        self.population.person_exists(person_id)
    }

    fn subscribers_exist(&self, kind: StoreEventKind) -> bool {
        self.subscriptions.borrow().contains(&kind)
    }

    fn publish(&self, event: StoreEvent) {
        self.published.borrow_mut().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::GroupAdditionEvent;
    use crate::groups::GroupId;

    #[test]
    fn subscriptions_gate_nothing_by_themselves() {
        let context = SimulationContext::new();
        assert!(!context.subscribers_exist(StoreEventKind::GroupAddition));
        context.subscribe(StoreEventKind::GroupAddition);
        assert!(context.subscribers_exist(StoreEventKind::GroupAddition));
        context.unsubscribe(StoreEventKind::GroupAddition);
        assert!(!context.subscribers_exist(StoreEventKind::GroupAddition));
    }

    #[test]
    fn take_events_drains_in_order() {
        let context = SimulationContext::new();
        for id in 0..3 {
            context.publish(StoreEvent::GroupAddition(GroupAdditionEvent {
                group_id: GroupId(id),
            }));
        }
        let events = context.take_events();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[2],
            StoreEvent::GroupAddition(GroupAdditionEvent {
                group_id: GroupId(2)
            })
        );
        assert!(context.take_events().is_empty());
    }

    #[test]
    fn time_and_people() {
        let context = SimulationContext::new();
        assert_eq!(context.get_current_time(), 0.0);
        context.set_current_time(2.5);
        assert_eq!(context.get_current_time(), 2.5);

        let person = context.add_person();
        assert!(context.person_exists(person));
        assert!(!context.person_exists(PersonId(1)));
    }
}
