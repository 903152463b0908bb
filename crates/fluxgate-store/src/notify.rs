use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Identifies an observer subscribed to a [`ChangeNotifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Observer = Rc<dyn Fn(&str)>;

/// Tells observers which property of a store changed.
///
/// Stores embed one and call [`ChangeNotifier::set`] (or
/// [`ChangeNotifier::notify`]) from their handlers, views subscribe to it.
#[derive(Default)]
pub struct ChangeNotifier {
    observers: RefCell<Vec<(ObserverId, Observer)>>,
    next_id: Cell<u64>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, observer: impl Fn(&str) + 'static) -> ObserverId {
        let id = ObserverId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.observers.borrow_mut().push((id, Rc::new(observer)));
        id
    }

    /// Returns `true` if the observer was subscribed.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.borrow_mut();
        let before = observers.len();
        observers.retain(|(observer_id, _)| *observer_id != id);
        observers.len() != before
    }

    /// Calls every observer subscribed at the time of the call.
    pub fn notify(&self, property: &str) {
        let observers: Vec<Observer> = self
            .observers
            .borrow()
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();
        log::trace!("Property {} changed, notifying {} observers", property, observers.len());
        for observer in observers {
            observer(property);
        }
    }

    /// Stores `value` in `slot` and notifies that `property` changed.
    pub fn set<T>(&self, slot: &RefCell<T>, value: T, property: &str) {
        slot.replace(value);
        self.notify(property);
    }

    pub fn observer_count(&self) -> usize {
        self.observers.borrow().len()
    }
}
