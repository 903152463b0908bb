use crate::action::Action;
use crate::error::Result;
use std::fmt;
use std::rc::Rc;

/// A handler registered with the dispatcher.
pub type Callback = Rc<dyn Fn(&Action) -> Result<()>>;

/// Wraps a closure into a [`Callback`].
///
/// Identity is carried by the returned `Rc`: register clones of it to refer
/// to the same handler.
pub fn callback<F>(handler: F) -> Callback
where
    F: Fn(&Action) -> Result<()> + 'static,
{
    Rc::new(handler)
}

/// Identifies a registered handler. The id is the callback itself, so two
/// ids are equal exactly when they share the same allocation.
#[derive(Clone)]
pub struct SubscriptionId(Callback);

impl SubscriptionId {
    pub fn callback(&self) -> &Callback {
        &self.0
    }

    pub(crate) fn is(&self, callback: &Callback) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(callback))
    }
}

impl PartialEq for SubscriptionId {
    fn eq(&self, other: &Self) -> bool {
        self.is(&other.0)
    }
}

impl Eq for SubscriptionId {}

impl fmt::Debug for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriptionId({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

/// Anything the dispatcher can register, unregister or wait for: raw
/// callbacks, ids returned by a previous registration, and stores.
pub trait Subscriber {
    fn subscription_id(&self) -> SubscriptionId;
}

impl Subscriber for SubscriptionId {
    fn subscription_id(&self) -> SubscriptionId {
        self.clone()
    }
}

impl Subscriber for Callback {
    fn subscription_id(&self) -> SubscriptionId {
        SubscriptionId(self.clone())
    }
}

impl<T: Subscriber + ?Sized> Subscriber for &T {
    fn subscription_id(&self) -> SubscriptionId {
        (**self).subscription_id()
    }
}
