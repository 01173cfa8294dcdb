//! Typed channel-based publish/subscribe bus.
//!
//! # Responsibility
//! - Route change notifications to subscribers of one channel.
//! - Queue deferred notifications until the host runs the next turn.
//! - Expose one optional observer hook (audit trail) that sees every
//!   delivered event without being a channel subscriber.
//!
//! # Invariants
//! - Deferred events are delivered in publish order.
//! - Events deferred while a dispatch is running wait for the next dispatch.
//! - Unsubscribing an unknown id is a no-op.

use log::trace;
use std::collections::{HashMap, VecDeque};
use std::fmt::Debug;
use std::hash::Hash;

/// Opaque handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Callback<E> = Box<dyn FnMut(&E)>;
type Observer<C, E> = Box<dyn FnMut(&C, &E)>;

pub struct EventBus<C, E> {
    subscribers: HashMap<C, Vec<(SubscriptionId, Callback<E>)>>,
    channels: HashMap<SubscriptionId, C>,
    pending: VecDeque<(C, E)>,
    observer: Option<Observer<C, E>>,
    next_id: u64,
}

impl<C, E> Default for EventBus<C, E> {
    fn default() -> Self {
        Self {
            subscribers: HashMap::new(),
            channels: HashMap::new(),
            pending: VecDeque::new(),
            observer: None,
            next_id: 1,
        }
    }
}

impl<C, E> EventBus<C, E>
where
    C: Clone + Eq + Hash + Debug,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, channel: C, callback: impl FnMut(&E) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers
            .entry(channel.clone())
            .or_default()
            .push((id, Box::new(callback)));
        self.channels.insert(id, channel);
        id
    }

    /// Removes one subscription. Returns whether it existed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let Some(channel) = self.channels.remove(&id) else {
            return false;
        };
        if let Some(list) = self.subscribers.get_mut(&channel) {
            list.retain(|(entry_id, _)| *entry_id != id);
            if list.is_empty() {
                self.subscribers.remove(&channel);
            }
        }
        true
    }

    pub fn subscriber_count(&self, channel: &C) -> usize {
        self.subscribers.get(channel).map_or(0, Vec::len)
    }

    /// Installs the observer hook, replacing any previous one.
    pub fn set_observer(&mut self, observer: impl FnMut(&C, &E) + 'static) {
        self.observer = Some(Box::new(observer));
    }

    pub fn clear_observer(&mut self) {
        self.observer = None;
    }

    /// Delivers one event synchronously.
    pub fn publish(&mut self, channel: C, event: &E) {
        self.deliver(&channel, event);
    }

    /// Queues one event for the next [`EventBus::dispatch_pending`] call.
    pub fn publish_deferred(&mut self, channel: C, event: E) {
        self.pending.push_back((channel, event));
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Delivers every event queued before this call. Returns the count.
    pub fn dispatch_pending(&mut self) -> usize {
        let batch: Vec<(C, E)> = self.pending.drain(..).collect();
        let delivered = batch.len();
        for (channel, event) in batch {
            self.deliver(&channel, &event);
        }
        delivered
    }

    fn deliver(&mut self, channel: &C, event: &E) {
        if let Some(observer) = self.observer.as_mut() {
            observer(channel, event);
        }
        let Some(list) = self.subscribers.get_mut(channel) else {
            trace!("event=bus_publish module=pubsub status=ok channel={channel:?} subscribers=0");
            return;
        };
        trace!(
            "event=bus_publish module=pubsub status=ok channel={channel:?} subscribers={}",
            list.len()
        );
        for (_, callback) in list.iter_mut() {
            callback(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::EventBus;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn publish_reaches_only_matching_channel() {
        let mut bus = EventBus::<&'static str, u32>::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.subscribe("a", move |value| sink.borrow_mut().push(*value));

        bus.publish("a", &1);
        bus.publish("b", &2);

        assert_eq!(*seen.borrow(), vec![1]);
    }

    #[test]
    fn deferred_events_wait_for_dispatch() {
        let mut bus = EventBus::<&'static str, u32>::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.subscribe("a", move |value| sink.borrow_mut().push(*value));

        bus.publish_deferred("a", 1);
        bus.publish_deferred("a", 2);
        assert!(seen.borrow().is_empty());

        assert_eq!(bus.dispatch_pending(), 2);
        assert_eq!(*seen.borrow(), vec![1, 2]);
        assert_eq!(bus.dispatch_pending(), 0);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let mut bus = EventBus::<&'static str, u32>::new();
        let seen = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&seen);
        let id = bus.subscribe("a", move |_| *sink.borrow_mut() += 1);

        bus.publish("a", &1);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish("a", &1);

        assert_eq!(*seen.borrow(), 1);
        assert_eq!(bus.subscriber_count(&"a"), 0);
    }

    #[test]
    fn observer_sees_every_channel() {
        let mut bus = EventBus::<&'static str, u32>::new();
        let audit = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&audit);
        bus.set_observer(move |channel, value| sink.borrow_mut().push((*channel, *value)));

        bus.publish("a", &1);
        bus.publish_deferred("b", 2);
        bus.dispatch_pending();

        assert_eq!(*audit.borrow(), vec![("a", 1), ("b", 2)]);
    }
}
