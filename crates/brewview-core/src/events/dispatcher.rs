use tracing::{debug, trace};

use super::{Event, EventError};

type Handler<C> = Box<dyn FnMut(&mut C, &Event) + Send>;

/// Named event subscribers, called synchronously in registration order.
///
/// `C` is the state handed to every handler on dispatch, so subscribers never
/// hold their own references to shared state.
pub struct EventDispatcher<C> {
    subscribers: Vec<(String, Handler<C>)>,
}

impl<C> Default for EventDispatcher<C> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }
}

impl<C> EventDispatcher<C> {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.subscribers.iter().position(|(k, _)| k == key)
    }

    /// Register `handler` under `key`. Fails if the key is taken.
    pub fn subscribe<F>(&mut self, key: impl Into<String>, handler: F) -> Result<(), EventError>
    where
        F: FnMut(&mut C, &Event) + Send + 'static,
    {
        let key = key.into();
        if self.position(&key).is_some() {
            return Err(EventError::DuplicateSubscriber(key));
        }
        debug!(subscriber = %key, "Subscribing to events");
        self.subscribers.push((key, Box::new(handler)));
        Ok(())
    }

    /// Swap the handler of an existing subscriber, keeping its place in line.
    pub fn replace<F>(&mut self, key: &str, handler: F) -> Result<(), EventError>
    where
        F: FnMut(&mut C, &Event) + Send + 'static,
    {
        let index = self
            .position(key)
            .ok_or_else(|| EventError::UnknownSubscriber(key.to_string()))?;
        self.subscribers[index].1 = Box::new(handler);
        Ok(())
    }

    /// Returns whether a subscriber was removed.
    pub fn unsubscribe(&mut self, key: &str) -> bool {
        match self.position(key) {
            Some(index) => {
                self.subscribers.remove(index);
                debug!(subscriber = %key, "Unsubscribed from events");
                true
            }
            None => false,
        }
    }

    pub fn is_subscribed(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn dispatch(&mut self, ctx: &mut C, event: &Event) {
        trace!(event = %event.name, subscribers = self.subscribers.len(), "Dispatching event");
        for (_, handler) in self.subscribers.iter_mut() {
            handler(ctx, event);
        }
    }
}
