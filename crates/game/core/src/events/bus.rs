use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use super::Event;
use crate::error::RulesError;
use crate::script::Formula;
use crate::sim::Simulation;

/// Native listener callback.
pub type NativeHandler = Rc<dyn Fn(&mut Simulation, &Event) -> Result<(), RulesError>>;

/// A listener callback.
#[derive(Clone)]
pub enum Handler {
    /// Engine code, run with mutable access to the simulation.
    Native(NativeHandler),
    /// Content formula, evaluated with the event bindings. Its result is
    /// discarded.
    Script(Formula),
}

impl Handler {
    pub fn native<F>(handler: F) -> Self
    where
        F: Fn(&mut Simulation, &Event) -> Result<(), RulesError> + 'static,
    {
        Self::Native(Rc::new(handler))
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native(_) => f.write_str("Native(..)"),
            Self::Script(formula) => f.debug_tuple("Script").field(formula).finish(),
        }
    }
}

/// Persistent form of a scripted listener.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ListenerSnapshot {
    pub event: String,
    pub subscriber: String,
    pub formula: Formula,
}

/// Named-event listener registry.
///
/// Each (event, subscriber) pair holds at most one handler: watching again
/// replaces it in place, keeping its position in dispatch order.
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: BTreeMap<String, Vec<(String, Handler)>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn watch(&mut self, event: &str, subscriber: &str, handler: Handler) {
        let listeners = self.listeners.entry(event.to_owned()).or_default();
        match listeners.iter_mut().find(|(id, _)| id == subscriber) {
            Some(slot) => slot.1 = handler,
            None => listeners.push((subscriber.to_owned(), handler)),
        }
        trace!(target: "rules::events", event_name = event, subscriber, "watch");
    }

    /// Removes the subscriber's handler; a no-op if it has none.
    pub fn unwatch(&mut self, event: &str, subscriber: &str) -> bool {
        let Some(listeners) = self.listeners.get_mut(event) else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|(id, _)| id != subscriber);
        let removed = listeners.len() != before;
        if listeners.is_empty() {
            self.listeners.remove(event);
        }
        removed
    }

    /// Removes every handler the subscriber holds on any event.
    pub fn unwatch_all(&mut self, subscriber: &str) {
        for listeners in self.listeners.values_mut() {
            listeners.retain(|(id, _)| id != subscriber);
        }
        self.listeners.retain(|_, listeners| !listeners.is_empty());
    }

    /// Handlers registered for `event`, in dispatch order.
    pub fn snapshot(&self, event: &str) -> Vec<Handler> {
        self.listeners
            .get(event)
            .map(|listeners| listeners.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default()
    }

    pub fn is_watching(&self, event: &str, subscriber: &str) -> bool {
        self.listeners
            .get(event)
            .is_some_and(|listeners| listeners.iter().any(|(id, _)| id == subscriber))
    }

    pub fn len(&self) -> usize {
        self.listeners.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Scripted listeners in persistent form. Native handlers are code and
    /// are re-registered by the engine instead.
    pub fn scripted(&self) -> Vec<ListenerSnapshot> {
        self.listeners
            .iter()
            .flat_map(|(event, listeners)| {
                listeners.iter().filter_map(move |(subscriber, handler)| match handler {
                    Handler::Script(formula) => Some(ListenerSnapshot {
                        event: event.clone(),
                        subscriber: subscriber.clone(),
                        formula: formula.clone(),
                    }),
                    Handler::Native(_) => None,
                })
            })
            .collect()
    }

    pub fn restore(snapshots: &[ListenerSnapshot]) -> Self {
        let mut bus = Self::new();
        for listener in snapshots {
            bus.watch(
                &listener.event,
                &listener.subscriber,
                Handler::Script(listener.formula.clone()),
            );
        }
        bus
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (event, listeners) in &self.listeners {
            let subscribers: Vec<&str> = listeners.iter().map(|(id, _)| id.as_str()).collect();
            map.entry(event, &subscribers);
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(name: &str) -> Handler {
        Handler::Script(Formula::new(name))
    }

    fn formulas(handlers: &[Handler]) -> Vec<String> {
        handlers
            .iter()
            .map(|h| match h {
                Handler::Script(f) => f.source().to_owned(),
                Handler::Native(_) => "native".to_owned(),
            })
            .collect()
    }

    #[test]
    fn handlers_dispatch_in_registration_order() {
        let mut bus = EventBus::new();
        bus.watch("attack_hit", "a", script("first"));
        bus.watch("attack_hit", "b", script("second"));

        assert_eq!(formulas(&bus.snapshot("attack_hit")), ["first", "second"]);
        assert!(bus.snapshot("attack_missed").is_empty());
    }

    #[test]
    fn watching_again_replaces_handler_in_place() {
        let mut bus = EventBus::new();
        bus.watch("attack_hit", "a", script("first"));
        bus.watch("attack_hit", "b", script("second"));
        bus.watch("attack_hit", "a", script("replaced"));

        assert_eq!(bus.len(), 2);
        assert_eq!(formulas(&bus.snapshot("attack_hit")), ["replaced", "second"]);
    }

    #[test]
    fn unwatch_is_idempotent() {
        let mut bus = EventBus::new();
        bus.watch("attack_hit", "a", script("first"));

        assert!(bus.unwatch("attack_hit", "a"));
        assert!(!bus.unwatch("attack_hit", "a"));
        assert!(!bus.unwatch("never", "a"));
        assert!(bus.is_empty());
    }

    #[test]
    fn unwatch_all_clears_subscriber_everywhere() {
        let mut bus = EventBus::new();
        bus.watch("attack_hit", "a", script("first"));
        bus.watch("attack_missed", "a", script("second"));
        bus.watch("attack_missed", "b", script("third"));

        bus.unwatch_all("a");
        assert!(!bus.is_watching("attack_hit", "a"));
        assert_eq!(formulas(&bus.snapshot("attack_missed")), ["third"]);
    }

    #[test]
    fn only_scripted_listeners_persist() {
        let mut bus = EventBus::new();
        bus.watch("attack_hit", "content", script("on_hit"));
        bus.watch("attack_hit", "engine", Handler::native(|_, _| Ok(())));

        let saved = bus.scripted();
        assert_eq!(saved.len(), 1);

        let restored = EventBus::restore(&saved);
        assert!(restored.is_watching("attack_hit", "content"));
        assert!(!restored.is_watching("attack_hit", "engine"));
    }
}
