/// Stores hold a slice of application state and update it in response to
/// the actions they route to themselves.
use crate::routes::Routes;
use fluxgate_core::{callback, Action, Callback, Result, Subscriber, SubscriptionId};
use std::cell::OnceCell;
use std::fmt;
use std::ops::Deref;
use std::rc::{Rc, Weak};

/// A type whose methods handle dispatched actions.
///
/// `routes` declares which method handles which action type. It is called
/// once per [`StoreRef`], the first time the store handles an action.
pub trait Store: Sized + 'static {
    fn routes(routes: &mut Routes<Self>);
}

struct StoreCell<S> {
    store: S,
    routes: OnceCell<Routes<S>>,
    callback: Callback,
}

impl<S: Store> StoreCell<S> {
    fn handle(&self, action: &Action) -> Result<()> {
        self.routes
            .get_or_init(Routes::build)
            .dispatch(&self.store, action)
    }
}

/// Shared handle to a store that the dispatcher can register.
///
/// Clones share the store, its routes and its subscription id, so
/// registering any clone twice still registers the store once.
pub struct StoreRef<S: Store>(Rc<StoreCell<S>>);

impl<S: Store> StoreRef<S> {
    pub fn new(store: S) -> Self {
        Self(Rc::new_cyclic(|cell: &Weak<StoreCell<S>>| {
            let cell = cell.clone();
            StoreCell {
                store,
                routes: OnceCell::new(),
                callback: callback(move |action| match cell.upgrade() {
                    Some(cell) => cell.handle(action),
                    None => Ok(()),
                }),
            }
        }))
    }

    /// Routes `action` to the best matching handler of the store.
    pub fn handle(&self, action: &Action) -> Result<()> {
        self.0.handle(action)
    }

    pub fn id(&self) -> SubscriptionId {
        self.0.callback.subscription_id()
    }

    pub fn store(&self) -> &S {
        &self.0.store
    }
}

impl<S: Store> Clone for StoreRef<S> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<S: Store> Deref for StoreRef<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.0.store
    }
}

impl<S: Store> Subscriber for StoreRef<S> {
    fn subscription_id(&self) -> SubscriptionId {
        self.id()
    }
}

impl<S: Store + fmt::Debug> fmt::Debug for StoreRef<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StoreRef").field(&self.0.store).finish()
    }
}
