//! # Observable
//!
//! A synchronous publish/subscribe bus.
//!
//! ## Semantics
//!
//! - Listeners subscribe to one or more space-separated event names
//! - Listeners run in descending priority; equal priorities run in
//!   subscription order
//! - A listener returning [`Propagation::Stop`] ends delivery of that event
//! - A listener that fails (returns `Err` or panics) is logged and skipped;
//!   delivery continues with the remaining listeners
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut bus: EventBus<MyEvent> = EventBus::new();
//! let id = bus.add_event_listener("changed resourceStored", |event: &MyEvent| {
//!     println!("{}", event.name());
//!     Ok(Propagation::Continue)
//! });
//! bus.dispatch_event(&event);
//! bus.remove_event_listener("changed resourceStored", id);
//! ```

use crate::result::ListenerResult;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use tracing::{error, trace, warn};

/// Anything that can travel over an [`EventBus`]
pub trait Event {
    /// The name listeners subscribe to
    fn name(&self) -> &str;
}

/// What a listener wants to happen after it has seen an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    Continue,
    Stop,
}

/// Handle returned by [`EventBus::add_event_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Listener<E> = Box<dyn FnMut(&E) -> ListenerResult>;

struct Subscription<E> {
    id: ListenerId,
    events: Vec<String>,
    priority: i32,
    listener: Listener<E>,
}

/// Priority-ordered event dispatcher
pub struct EventBus<E> {
    /// Kept sorted by descending priority
    subscriptions: Vec<Subscription<E>>,
    next_id: u64,
}

impl<E: Event> EventBus<E> {
    pub fn new() -> Self {
        Self {
            subscriptions: Vec::new(),
            next_id: 0,
        }
    }

    /// Subscribe with the default priority (0)
    pub fn add_event_listener<F>(&mut self, events: &str, listener: F) -> ListenerId
    where
        F: FnMut(&E) -> ListenerResult + 'static,
    {
        self.add_event_listener_with_priority(events, 0, listener)
    }

    /// Subscribe to every name in the space-separated `events` list
    pub fn add_event_listener_with_priority<F>(
        &mut self,
        events: &str,
        priority: i32,
        listener: F,
    ) -> ListenerId
    where
        F: FnMut(&E) -> ListenerResult + 'static,
    {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        let position = self
            .subscriptions
            .iter()
            .position(|sub| sub.priority < priority)
            .unwrap_or(self.subscriptions.len());

        self.subscriptions.insert(
            position,
            Subscription {
                id,
                events: split_names(events),
                priority,
                listener: Box::new(listener),
            },
        );
        id
    }

    /// Stop delivering the named events to a listener.
    ///
    /// Returns false if the listener was not subscribed to any of them.
    pub fn remove_event_listener(&mut self, events: &str, id: ListenerId) -> bool {
        let names = split_names(events);
        let mut removed = false;

        for sub in self.subscriptions.iter_mut().filter(|sub| sub.id == id) {
            let before = sub.events.len();
            sub.events.retain(|event| !names.contains(event));
            removed |= sub.events.len() != before;
        }
        self.subscriptions.retain(|sub| !sub.events.is_empty());
        removed
    }

    /// Number of listeners that would receive an event with this name
    pub fn listener_count(&self, event: &str) -> usize {
        self.subscriptions
            .iter()
            .filter(|sub| sub.events.iter().any(|name| name == event))
            .count()
    }

    /// Deliver an event to every matching listener.
    ///
    /// Returns [`Propagation::Stop`] if a listener halted delivery.
    pub fn dispatch_event(&mut self, event: &E) -> Propagation {
        let name = event.name();
        trace!(event = name, "Dispatching event");

        for sub in self
            .subscriptions
            .iter_mut()
            .filter(|sub| sub.events.iter().any(|event| event == name))
        {
            let listener = &mut sub.listener;
            match panic::catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(Ok(Propagation::Continue)) => {}
                Ok(Ok(Propagation::Stop)) => return Propagation::Stop,
                Ok(Err(err)) => {
                    warn!(event = name, listener = sub.id.0, error = %err, "Event listener failed");
                }
                Err(_) => {
                    error!(event = name, listener = sub.id.0, "Event listener panicked");
                }
            }
        }
        Propagation::Continue
    }
}

impl<E: Event> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.subscriptions.len())
            .finish()
    }
}

fn split_names(events: &str) -> Vec<String> {
    events.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct TestEvent(&'static str, &'static str);

    impl Event for TestEvent {
        fn name(&self) -> &str {
            self.0
        }
    }

    fn recorder() -> (Rc<RefCell<Vec<String>>>, impl FnMut(&TestEvent) -> ListenerResult) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |event: &TestEvent| {
            sink.borrow_mut().push(event.1.to_string());
            Ok(Propagation::Continue)
        })
    }

    #[test]
    fn test_listener_observes_event() {
        let mut bus: EventBus<TestEvent> = EventBus::new();
        let (seen, listener) = recorder();
        bus.add_event_listener("TestEvt", listener);

        bus.dispatch_event(&TestEvent("TestEvt", "some"));

        assert_eq!(*seen.borrow(), vec!["some"]);
    }

    #[test]
    fn test_single_subscription_for_multiple_events() {
        let mut bus: EventBus<TestEvent> = EventBus::new();
        let (seen, listener) = recorder();
        bus.add_event_listener("TestEvt TestEvt2", listener);

        bus.dispatch_event(&TestEvent("TestEvt", "some"));
        bus.dispatch_event(&TestEvent("TestEvt2", "more"));
        bus.dispatch_event(&TestEvent("Unrelated", "nope"));

        assert_eq!(*seen.borrow(), vec!["some", "more"]);
    }

    #[test]
    fn test_stop_halts_propagation() {
        let mut bus: EventBus<TestEvent> = EventBus::new();
        let (seen, listener) = recorder();
        bus.add_event_listener("TestEvt", |_: &TestEvent| Ok(Propagation::Stop));
        bus.add_event_listener("TestEvt", listener);

        let result = bus.dispatch_event(&TestEvent("TestEvt", "some"));

        assert_eq!(result, Propagation::Stop);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_failing_listener_does_not_stop_others() {
        let mut bus: EventBus<TestEvent> = EventBus::new();
        let (seen, listener) = recorder();
        bus.add_event_listener_with_priority("TestEvt", 2, |_: &TestEvent| Err("barf".into()));
        bus.add_event_listener_with_priority("TestEvt", 1, |_: &TestEvent| panic!("barf"));
        bus.add_event_listener("TestEvt", listener);

        bus.dispatch_event(&TestEvent("TestEvt", "some"));

        assert_eq!(*seen.borrow(), vec!["some"]);
    }

    #[test]
    fn test_removed_listener_is_not_called() {
        let mut bus: EventBus<TestEvent> = EventBus::new();
        let (seen, listener) = recorder();
        let id = bus.add_event_listener("TestEvt Other", listener);

        assert!(bus.remove_event_listener("TestEvt", id));
        bus.dispatch_event(&TestEvent("TestEvt", "some"));
        bus.dispatch_event(&TestEvent("Other", "still"));

        assert_eq!(*seen.borrow(), vec!["still"]);
        assert!(!bus.remove_event_listener("TestEvt", id));
        assert_eq!(bus.listener_count("Other"), 1);
    }

    #[test]
    fn test_priorities() {
        let mut bus: EventBus<TestEvent> = EventBus::new();
        let order = Rc::new(RefCell::new(String::new()));
        for (priority, label) in [(1, "first"), (3, "second"), (2, "third"), (2, "fourth")] {
            let order = order.clone();
            bus.add_event_listener_with_priority("TestEvt", priority, move |_: &TestEvent| {
                order.borrow_mut().push_str(label);
                Ok(Propagation::Continue)
            });
        }

        bus.dispatch_event(&TestEvent("TestEvt", ""));

        assert_eq!(*order.borrow(), "secondthirdfourthfirst");
    }
}
