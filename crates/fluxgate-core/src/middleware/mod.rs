//! Middleware pipelines that run before handlers receive an action.
//!
//! A pipeline is an ordered, append-only chain. Each link sees the action,
//! may replace it, continue with [`Context::next`], skip the rest of the
//! chain with [`Context::dispatch`], or stop the dispatch by not continuing.
//! The blocking flavour ([`Middleware`]) serves `Dispatcher::dispatch`, the
//! async flavour ([`AsyncMiddleware`]) serves `Dispatcher::dispatch_async`.
use crate::action::Action;
use crate::dispatcher::Dispatcher;
use crate::error::{DispatchError, Result};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

mod asynchronous;
mod builtin;
mod typed;

pub use asynchronous::{AsyncContext, AsyncMiddleware};
pub use builtin::{Inspect, LoggingMiddleware, MapAction};
pub use typed::{AsyncTypedContext, AsyncTypedMiddleware, TypedContext, TypedMiddleware};
pub(crate) use typed::{AsyncTypedAdapter, TypedAdapter};

static NEXT_PIPELINE_ID: AtomicU64 = AtomicU64::new(1);

/// Position of a link inside a specific pipeline.
///
/// Returned by `use_*` for reference only, links cannot be removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MiddlewareId {
    pipeline: u64,
    position: usize,
}

impl MiddlewareId {
    pub fn position(&self) -> usize {
        self.position
    }

    #[cfg(test)]
    pub(crate) fn foreign(position: usize) -> Self {
        Self {
            pipeline: 0,
            position,
        }
    }
}

/// Append-only chain of middleware links.
pub(crate) struct Pipeline<M: ?Sized> {
    id: u64,
    links: RefCell<Vec<Rc<M>>>,
}

impl<M: ?Sized> Pipeline<M> {
    pub(crate) fn new() -> Self {
        Self {
            id: NEXT_PIPELINE_ID.fetch_add(1, Ordering::Relaxed),
            links: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn push(&self, link: Rc<M>) -> MiddlewareId {
        let mut links = self.links.borrow_mut();
        links.push(link);
        MiddlewareId {
            pipeline: self.id,
            position: links.len() - 1,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.links.borrow().len()
    }

    pub(crate) fn first(&self) -> Option<(MiddlewareId, Rc<M>)> {
        self.get(0)
    }

    /// The link following `id`, `Ok(None)` when `id` is the last one.
    pub(crate) fn after(&self, id: MiddlewareId) -> Result<Option<(MiddlewareId, Rc<M>)>> {
        if id.pipeline != self.id || id.position >= self.len() {
            return Err(DispatchError::InvalidMiddlewareReference);
        }
        Ok(self.get(id.position + 1))
    }

    fn get(&self, position: usize) -> Option<(MiddlewareId, Rc<M>)> {
        self.links.borrow().get(position).map(|link| {
            (
                MiddlewareId {
                    pipeline: self.id,
                    position,
                },
                link.clone(),
            )
        })
    }
}

/// A blocking pipeline element.
pub trait Middleware {
    fn handle(&self, context: &Context<'_>) -> Result<()>;
}

/// What a blocking middleware link sees of the dispatch in progress.
pub struct Context<'a> {
    dispatcher: &'a Dispatcher,
    id: MiddlewareId,
    action: Action,
}

impl<'a> Context<'a> {
    pub(crate) fn new(dispatcher: &'a Dispatcher, id: MiddlewareId, action: Action) -> Self {
        Self {
            dispatcher,
            id,
            action,
        }
    }

    /// The action as of entering this link
    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn id(&self) -> MiddlewareId {
        self.id
    }

    /// Continues with the next link, or delivers to handlers if this is the
    /// last one.
    pub fn next(&self) -> Result<()> {
        self.dispatcher.dispatch_next(self.id, self.action.clone())
    }

    /// Like [`Context::next`] with a replacement action.
    pub fn next_with(&self, action: impl Into<Action>) -> Result<()> {
        self.dispatcher.dispatch_next(self.id, action.into())
    }

    /// Delivers `action` to all handlers, bypassing the rest of the pipeline.
    pub fn dispatch(&self, action: impl Into<Action>) -> Result<()> {
        self.dispatcher.deliver(action.into())
    }
}

/// Middleware backed by a closure, see [`from_fn`].
pub struct FnMiddleware<F> {
    handler: F,
}

/// Turns a closure into a blocking [`Middleware`].
pub fn from_fn<F>(handler: F) -> FnMiddleware<F>
where
    F: Fn(&Context<'_>) -> Result<()>,
{
    FnMiddleware { handler }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&Context<'_>) -> Result<()>,
{
    fn handle(&self, context: &Context<'_>) -> Result<()> {
        (self.handler)(context)
    }
}
