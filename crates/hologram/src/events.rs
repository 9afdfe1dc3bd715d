//! Notifications emitted by an effect session

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use holoavatar_ipc::Rgb;

/// Session lifecycle and color changes, for UI state without polling
#[derive(Debug, Clone, PartialEq)]
pub enum EffectEvent {
    /// Materials were patched and the animation loop started
    Activated { color: Rgb },
    /// All patched materials were restored
    Deactivated,
    /// Live color update on an active effect
    ColorChanged { color: Rgb },
}

type Listener = Rc<dyn Fn(&EffectEvent)>;

/// Registered event listeners.
///
/// Listeners may subscribe further listeners while handling an event; those
/// only see later events.
#[derive(Default)]
pub struct EventListeners {
    listeners: RefCell<Vec<Listener>>,
}

impl fmt::Debug for EventListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListeners")
            .field("listener_count", &self.len())
            .finish()
    }
}

impl EventListeners {
    pub fn subscribe(&self, listener: impl Fn(&EffectEvent) + 'static) {
        self.listeners.borrow_mut().push(Rc::new(listener));
    }

    pub fn emit(&self, event: &EffectEvent) {
        let snapshot: Vec<Listener> = self.listeners.borrow().clone();
        for listener in snapshot {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn test_all_listeners_receive_event() {
        let listeners = EventListeners::default();
        let count = Rc::new(Cell::new(0));
        for _ in 0..3 {
            let count = count.clone();
            listeners.subscribe(move |_| count.set(count.get() + 1));
        }
        listeners.emit(&EffectEvent::Deactivated);
        assert_eq!(count.get(), 3);
    }

    #[test]
    fn test_subscribe_during_emit() {
        let listeners = Rc::new(EventListeners::default());
        let inner = Rc::downgrade(&listeners);
        listeners.subscribe(move |_| {
            if let Some(listeners) = inner.upgrade() {
                listeners.subscribe(|_| {});
            }
        });
        listeners.emit(&EffectEvent::Deactivated);
        assert_eq!(listeners.len(), 2);
    }
}
