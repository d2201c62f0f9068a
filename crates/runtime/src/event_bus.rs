use foundation::arena::Arena;
use foundation::handles::Handle;

/// Scoped registration returned by [`EventBus::subscribe`].
///
/// The owner must hand it back to [`EventBus::unsubscribe`] when the
/// listening view goes away; a stale handle is a harmless no-op.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ListenerHandle(Handle);

type Listener<T> = Box<dyn FnMut(&T) + Send>;

/// Explicit "on change" notification: listeners are called in registration
/// slot order for every emitted event.
pub struct EventBus<T> {
    listeners: Arena<Listener<T>>,
    emitted: u64,
}

impl<T> Default for EventBus<T> {
    fn default() -> Self {
        Self {
            listeners: Arena::new(),
            emitted: 0,
        }
    }
}

impl<T> std::fmt::Debug for EventBus<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .field("emitted", &self.emitted)
            .finish()
    }
}

impl<T> EventBus<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&T) + Send + 'static) -> ListenerHandle {
        ListenerHandle(self.listeners.alloc(Box::new(listener)))
    }

    /// Returns `true` if the handle was still registered.
    pub fn unsubscribe(&mut self, handle: ListenerHandle) -> bool {
        self.listeners.remove(handle.0).is_some()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    pub fn emit(&mut self, event: &T) {
        self.emitted += 1;
        for listener in self.listeners.iter_mut() {
            listener(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::EventBus;
    use std::sync::{Arc, Mutex};

    #[test]
    fn delivers_to_every_listener() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();
        for tag in ["a", "b"] {
            let seen = seen.clone();
            bus.subscribe(move |v: &u32| seen.lock().unwrap().push(format!("{tag}{v}")));
        }

        bus.emit(&1);
        bus.emit(&2);
        assert_eq!(*seen.lock().unwrap(), vec!["a1", "b1", "a2", "b2"]);
        assert_eq!(bus.emitted(), 2);
    }

    #[test]
    fn unsubscribed_listener_is_not_called() {
        let count = Arc::new(Mutex::new(0));
        let mut bus = EventBus::new();
        let c = count.clone();
        let handle = bus.subscribe(move |_: &()| *c.lock().unwrap() += 1);

        bus.emit(&());
        assert!(bus.unsubscribe(handle));
        assert!(!bus.unsubscribe(handle));
        bus.emit(&());

        assert_eq!(*count.lock().unwrap(), 1);
        assert_eq!(bus.listener_count(), 0);
    }
}
