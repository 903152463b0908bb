/// Route tables that map action types to the store methods handling them.
use crate::store::Store;
use fluxgate_core::{lineage, type_of, Action, ActionData, Result};
use std::any::TypeId;
use std::fmt;

/// What a route accepts.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum RouteKey {
    /// Every action, including the absent one
    Root,
    /// Actions of this type and the ones refining it
    Type { id: TypeId, name: &'static str },
}

impl RouteKey {
    pub fn of<A: ActionData>() -> Self {
        RouteKey::Type {
            id: TypeId::of::<A>(),
            name: std::any::type_name::<A>(),
        }
    }

    /// Number of parent hops from the action's type up to this key, `None`
    /// when the key is not one of its ancestors.
    fn distance(&self, chain: &[&dyn ActionData]) -> Option<usize> {
        match self {
            RouteKey::Root => Some(chain.len()),
            RouteKey::Type { id, .. } => chain.iter().position(|item| type_of(*item) == *id),
        }
    }
}

impl fmt::Debug for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteKey::Root => f.write_str("Root"),
            RouteKey::Type { name, .. } => f.write_str(name),
        }
    }
}

type RouteHandler<S> = Box<dyn Fn(&S, &Action, Option<&dyn ActionData>) -> Result<()>>;

struct Route<S> {
    key: RouteKey,
    handler: RouteHandler<S>,
}

/// The handlers a store declares, in declaration order.
pub struct Routes<S> {
    routes: Vec<Route<S>>,
}

impl<S: Store> Routes<S> {
    pub(crate) fn build() -> Self {
        let mut routes = Routes { routes: Vec::new() };
        S::routes(&mut routes);
        log::debug!(
            "Built {} routes for {}: {:?}",
            routes.len(),
            std::any::type_name::<S>(),
            routes.keys()
        );
        routes
    }

    /// Appends the routes of an embedded store after the ones declared so
    /// far. `project` reaches the embedded store from the outer one.
    pub fn inherit<B: Store>(&mut self, project: fn(&S) -> &B) -> &mut Self {
        for route in Routes::<B>::build().routes {
            let base = route.handler;
            self.routes.push(Route {
                key: route.key,
                handler: Box::new(move |store, action, item| base(project(store), action, item)),
            });
        }
        self
    }
}

impl<S: 'static> Routes<S> {
    /// Routes actions of type `A`, or refining `A`, to `handler`.
    pub fn on<A, F>(&mut self, handler: F) -> &mut Self
    where
        A: ActionData,
        F: Fn(&S, &A) -> Result<()> + 'static,
    {
        self.routes.push(Route {
            key: RouteKey::of::<A>(),
            handler: Box::new(move |store, _action, item| {
                match item.and_then(|item| item.as_any().downcast_ref::<A>()) {
                    Some(typed) => handler(store, typed),
                    None => Ok(()),
                }
            }),
        });
        self
    }

    /// Routes every action, including the absent one, to `handler`.
    pub fn on_any<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&S, &Action) -> Result<()> + 'static,
    {
        self.routes.push(Route {
            key: RouteKey::Root,
            handler: Box::new(move |store, action, _item| handler(store, action)),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn keys(&self) -> Vec<RouteKey> {
        self.routes.iter().map(|route| route.key).collect()
    }

    /// Index of the route that should receive `action`, with the hop
    /// distance it matched at.
    ///
    /// A route declared for the action's own type wins outright. Otherwise
    /// the nearest ancestor wins and earlier routes win ties.
    pub fn resolve(&self, action: &Action) -> Option<(usize, usize)> {
        let chain: Vec<&dyn ActionData> = match action.data() {
            Some(data) => lineage(data).collect(),
            None => Vec::new(),
        };
        let mut best: Option<(usize, usize)> = None;
        for (index, route) in self.routes.iter().enumerate() {
            let Some(distance) = route.key.distance(&chain) else {
                continue;
            };
            if distance == 0 {
                return Some((index, 0));
            }
            if best.is_none_or(|(_, nearest)| distance < nearest) {
                best = Some((index, distance));
            }
        }
        best
    }

    /// Sends `action` to the resolved route. No-op when nothing matches.
    pub(crate) fn dispatch(&self, store: &S, action: &Action) -> Result<()> {
        let Some((index, distance)) = self.resolve(action) else {
            log::trace!(
                "{} has no route for {}",
                std::any::type_name::<S>(),
                action.type_name()
            );
            return Ok(());
        };
        let item = action.data().and_then(|data| lineage(data).nth(distance));
        (self.routes[index].handler)(store, action, item)
    }
}
