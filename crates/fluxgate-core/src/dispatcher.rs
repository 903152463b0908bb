/// Central dispatcher for the flux architecture.
/// Receives Actions and forwards them to every registered handler (stores).
use crate::action::{Action, ActionData};
use crate::config::DispatcherConfig;
use crate::error::{DispatchError, Result};
use crate::middleware::{
    AsyncContext, AsyncMiddleware, AsyncTypedAdapter, AsyncTypedMiddleware, Context, Middleware,
    MiddlewareId, Pipeline, TypedAdapter, TypedMiddleware,
};
use crate::queue::PendingQueue;
use crate::subscription::{callback, Callback, Subscriber, SubscriptionId};
use futures::future::{FutureExt, LocalBoxFuture};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DispatchState {
    Idle,
    Dispatching,
}

/// The Dispatcher routes one action at a time to all registered handlers.
///
/// Handlers run in registration order. While running, a handler may call
/// [`Dispatcher::wait_for`] to have another pending handler complete first.
/// Everything happens on the calling thread: the dispatcher is neither
/// `Send` nor `Sync`, share it through an `Rc` when handlers need it.
pub struct Dispatcher {
    config: DispatcherConfig,
    state: Cell<DispatchState>,
    subscribers: RefCell<Vec<Callback>>,
    pipeline: Pipeline<dyn Middleware>,
    async_pipeline: Pipeline<dyn AsyncMiddleware>,
    queue: RefCell<PendingQueue>,
    current_action: RefCell<Action>,
}

/// Puts the dispatcher back to idle however the dispatch ends, including
/// when an async dispatch is dropped before completion.
struct DispatchScope<'a> {
    dispatcher: &'a Dispatcher,
}

impl Drop for DispatchScope<'_> {
    fn drop(&mut self) {
        let dispatcher = self.dispatcher;
        dispatcher.queue.borrow_mut().clear();
        dispatcher.current_action.replace(Action::none());
        dispatcher.state.set(DispatchState::Idle);
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Create a new Dispatcher configured from the environment
    pub fn new() -> Self {
        Self::with_config(DispatcherConfig::from_env())
    }

    pub fn with_config(config: DispatcherConfig) -> Self {
        Self {
            config,
            state: Cell::new(DispatchState::Idle),
            subscribers: RefCell::new(Vec::new()),
            pipeline: Pipeline::new(),
            async_pipeline: Pipeline::new(),
            queue: RefCell::new(PendingQueue::default()),
            current_action: RefCell::new(Action::none()),
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn is_dispatching(&self) -> bool {
        self.state.get() == DispatchState::Dispatching
    }

    // ===== Registry =====

    /// Registers a callback, an id or a store.
    ///
    /// Registering something that is already registered keeps its position
    /// and returns the same id.
    pub fn register<S: Subscriber + ?Sized>(&self, subscriber: &S) -> SubscriptionId {
        let id = subscriber.subscription_id();
        let mut subscribers = self.subscribers.borrow_mut();
        if !subscribers.iter().any(|registered| id.is(registered)) {
            subscribers.push(id.callback().clone());
            log::debug!("Registered handler {:?} ({} total)", id, subscribers.len());
        }
        id
    }

    /// Registers a closure as a new handler.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Action) -> Result<()> + 'static,
    {
        self.register(&callback(handler))
    }

    /// Returns `true` if the subscriber was registered and is now removed.
    pub fn unregister<S: Subscriber + ?Sized>(&self, subscriber: &S) -> bool {
        let id = subscriber.subscription_id();
        let mut subscribers = self.subscribers.borrow_mut();
        match subscribers.iter().position(|registered| id.is(registered)) {
            Some(index) => {
                subscribers.remove(index);
                log::debug!("Unregistered handler {:?}", id);
                true
            }
            None => false,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    // ===== Middleware =====

    /// Appends `middleware` to the blocking pipeline used by [`Dispatcher::dispatch`].
    pub fn use_middleware<M: Middleware + 'static>(&self, middleware: M) -> MiddlewareId {
        self.use_shared_middleware(Rc::new(middleware))
    }

    /// Appends an already shared middleware. The same instance can be added
    /// several times, it then runs once per occurrence.
    pub fn use_shared_middleware<M: Middleware + 'static>(&self, middleware: Rc<M>) -> MiddlewareId {
        let id = self.pipeline.push(middleware);
        log::debug!("Configured middleware at position {}", id.position());
        id
    }

    /// Appends a middleware that only sees actions of type `A`.
    pub fn use_typed<A, M>(&self, middleware: M) -> MiddlewareId
    where
        A: ActionData,
        M: TypedMiddleware<A> + 'static,
    {
        self.use_middleware(TypedAdapter::<A, M>::new(middleware))
    }

    /// Appends `middleware` to the async pipeline used by [`Dispatcher::dispatch_async`].
    pub fn use_async_middleware<M: AsyncMiddleware + 'static>(&self, middleware: M) -> MiddlewareId {
        self.use_shared_async_middleware(Rc::new(middleware))
    }

    pub fn use_shared_async_middleware<M: AsyncMiddleware + 'static>(
        &self,
        middleware: Rc<M>,
    ) -> MiddlewareId {
        let id = self.async_pipeline.push(middleware);
        log::debug!("Configured async middleware at position {}", id.position());
        id
    }

    pub fn use_typed_async<A, M>(&self, middleware: M) -> MiddlewareId
    where
        A: ActionData,
        M: AsyncTypedMiddleware<A> + 'static,
    {
        self.use_async_middleware(AsyncTypedAdapter::<A, M>::new(middleware))
    }

    // ===== Dispatch =====

    /// Dispatches an action through the blocking pipeline to all handlers.
    ///
    /// Fails with [`DispatchError::AlreadyDispatching`] when called from a
    /// running handler or middleware. Errors raised by handlers are returned
    /// once the dispatcher is idle again.
    pub fn dispatch(&self, action: impl Into<Action>) -> Result<()> {
        let _scope = self.enter()?;
        let action = action.into();
        let name = action.type_name();
        log::debug!("Dispatching {}", name);
        let result = match self.pipeline.first() {
            Some((id, link)) => link.handle(&Context::new(self, id, action)),
            None => self.deliver(action),
        };
        log::debug!("Finished dispatching {} (ok: {})", name, result.is_ok());
        result
    }

    /// Dispatches an action through the async pipeline to all handlers.
    pub async fn dispatch_async(&self, action: impl Into<Action>) -> Result<()> {
        self.dispatch_async_with_cancellation(action, CancellationToken::new())
            .await
    }

    /// Like [`Dispatcher::dispatch_async`], threading `cancellation` through
    /// every async middleware link.
    pub async fn dispatch_async_with_cancellation(
        &self,
        action: impl Into<Action>,
        cancellation: CancellationToken,
    ) -> Result<()> {
        let _scope = self.enter()?;
        let action = action.into();
        let name = action.type_name();
        log::debug!("Dispatching {} asynchronously", name);
        let result = match self.async_pipeline.first() {
            Some((id, link)) => {
                let context = AsyncContext::new(self, id, action);
                link.handle(&context, &cancellation).await
            }
            None => self.deliver(action),
        };
        log::debug!("Finished dispatching {} (ok: {})", name, result.is_ok());
        result
    }

    fn enter(&self) -> Result<DispatchScope<'_>> {
        if self.state.replace(DispatchState::Dispatching) != DispatchState::Idle {
            return Err(DispatchError::AlreadyDispatching);
        }
        Ok(DispatchScope { dispatcher: self })
    }

    pub(crate) fn dispatch_next(&self, id: MiddlewareId, action: Action) -> Result<()> {
        match self.pipeline.after(id)? {
            Some((next, link)) => link.handle(&Context::new(self, next, action)),
            None => self.deliver(action),
        }
    }

    pub(crate) fn dispatch_next_async<'a>(
        &'a self,
        id: MiddlewareId,
        action: Action,
        cancellation: CancellationToken,
    ) -> LocalBoxFuture<'a, Result<()>> {
        async move {
            match self.async_pipeline.after(id)? {
                Some((next, link)) => {
                    let context = AsyncContext::new(self, next, action);
                    link.handle(&context, &cancellation).await
                }
                None => self.deliver(action),
            }
        }
        .boxed_local()
    }

    /// Delivers `action` to every registered handler, honouring `wait_for`
    /// promotions. Runs to completion without yielding.
    pub(crate) fn deliver(&self, action: Action) -> Result<()> {
        {
            let mut queue = self.queue.borrow_mut();
            queue.load(self.subscribers.borrow().iter().cloned());
            log::trace!("Delivering {} to {} handlers", action.type_name(), queue.len());
        }
        self.current_action.replace(action.clone());

        let result = self.run_pending(&action);

        self.queue.borrow_mut().clear();
        result
    }

    fn run_pending(&self, action: &Action) -> Result<()> {
        loop {
            let Some(handle) = self.queue.borrow().current() else {
                return Ok(());
            };
            let handler = self.queue.borrow().callback(handle);
            self.invoke(&handler, action)?;

            let mut queue = self.queue.borrow_mut();
            let next = queue.next_of(handle);
            queue.unlink(handle);
            queue.set_current(next);
        }
    }

    fn invoke(&self, handler: &Callback, action: &Action) -> Result<()> {
        if self.config.log_deliveries {
            log::trace!(
                "Invoking handler {:p} with {}",
                Rc::as_ptr(handler) as *const (),
                action.type_name()
            );
        }
        handler(action)
    }

    // ===== Wait for =====

    /// Runs the handler registered under `target` now, if it has not handled
    /// the current action yet.
    ///
    /// Waiting for a handler that already ran, was never registered, or is
    /// the caller itself does nothing. Waiting for a handler that is itself
    /// (directly or indirectly) waiting for the caller fails with
    /// [`DispatchError::Deadlock`].
    pub fn wait_for<S: Subscriber + ?Sized>(&self, target: &S) -> Result<()> {
        if !self.is_dispatching() {
            return Err(DispatchError::NoActiveDispatch);
        }
        let id = target.subscription_id();

        let (handle, waiting) = {
            let queue = self.queue.borrow();
            let Some(waiting) = queue.current() else {
                return Ok(());
            };
            if id.is(&queue.callback(waiting)) {
                return Ok(());
            }
            let Some(handle) = queue.find(&id) else {
                return Ok(());
            };
            if queue.in_active_chain(handle) {
                log::warn!("Deadlock detected while waiting for handler {:?}", id);
                return Err(DispatchError::Deadlock);
            }
            (handle, waiting)
        };

        let handler = {
            let mut queue = self.queue.borrow_mut();
            queue.unlink(handle);
            queue.link_after(handle, waiting);
            queue.set_current(Some(handle));
            queue.callback(handle)
        };
        if self.config.log_deliveries {
            log::trace!("Promoted handler {:?}", id);
        }
        let action = self.current_action.borrow().clone();
        let result = self.invoke(&handler, &action);

        let mut queue = self.queue.borrow_mut();
        queue.unlink(handle);
        queue.set_current(Some(waiting));
        result
    }

    /// Waits for each target in turn, stopping at the first error.
    pub fn wait_for_all<'s, I, S>(&self, targets: I) -> Result<()>
    where
        I: IntoIterator<Item = &'s S>,
        S: Subscriber + ?Sized + 's,
    {
        if !self.is_dispatching() {
            return Err(DispatchError::NoActiveDispatch);
        }
        for target in targets {
            self.wait_for(target)?;
        }
        Ok(())
    }
}
