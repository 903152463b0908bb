use super::{AsyncContext, AsyncMiddleware, Context, Middleware, MiddlewareId};
use crate::action::{Action, ActionData};
use crate::error::Result;
use async_trait::async_trait;
use std::marker::PhantomData;
use tokio_util::sync::CancellationToken;

/// Blocking middleware constrained to actions of type `A`.
///
/// It runs when the action is an `A` or refines one. Absent actions are
/// only routed here when [`TypedMiddleware::accepts_absent`] says so, every
/// other action skips the link as if it had called `next()`.
pub trait TypedMiddleware<A: ActionData> {
    fn handle(&self, context: &TypedContext<'_, A>) -> Result<()>;

    fn accepts_absent(&self) -> bool {
        false
    }
}

/// Async counterpart of [`TypedMiddleware`].
#[async_trait(?Send)]
pub trait AsyncTypedMiddleware<A: ActionData> {
    async fn handle(
        &self,
        context: &AsyncTypedContext<'_, A>,
        cancellation: &CancellationToken,
    ) -> Result<()>;

    fn accepts_absent(&self) -> bool {
        false
    }
}

/// `Some(view)` when a link typed for `A` should run for `action`.
fn project<A: ActionData>(action: &Action, accepts_absent: bool) -> Option<Option<&A>> {
    if action.is_none() {
        return accepts_absent.then_some(None);
    }
    action.downcast_ref::<A>().map(Some)
}

pub struct TypedContext<'c, A> {
    context: &'c Context<'c>,
    action: Option<&'c A>,
}

impl<'c, A: ActionData> TypedContext<'c, A> {
    /// The action viewed as `A`. `None` only for an absent action accepted
    /// through `accepts_absent`.
    pub fn action(&self) -> Option<&'c A> {
        self.action
    }

    pub fn untyped(&self) -> &Action {
        self.context.action()
    }

    pub fn id(&self) -> MiddlewareId {
        self.context.id()
    }

    pub fn next(&self) -> Result<()> {
        self.context.next()
    }

    pub fn next_with(&self, action: impl Into<Action>) -> Result<()> {
        self.context.next_with(action)
    }

    pub fn dispatch(&self, action: impl Into<Action>) -> Result<()> {
        self.context.dispatch(action)
    }
}

pub struct AsyncTypedContext<'c, A> {
    context: &'c AsyncContext<'c>,
    action: Option<&'c A>,
}

impl<'c, A: ActionData> AsyncTypedContext<'c, A> {
    pub fn action(&self) -> Option<&'c A> {
        self.action
    }

    pub fn untyped(&self) -> &Action {
        self.context.action()
    }

    pub fn id(&self) -> MiddlewareId {
        self.context.id()
    }

    pub async fn next(&self, cancellation: &CancellationToken) -> Result<()> {
        self.context.next(cancellation).await
    }

    pub async fn next_with(
        &self,
        action: impl Into<Action>,
        cancellation: &CancellationToken,
    ) -> Result<()> {
        self.context.next_with(action, cancellation).await
    }

    pub fn dispatch(&self, action: impl Into<Action>) -> Result<()> {
        self.context.dispatch(action)
    }
}

/// Untyped link wrapping a [`TypedMiddleware`].
pub(crate) struct TypedAdapter<A, M> {
    middleware: M,
    _action: PhantomData<fn() -> A>,
}

impl<A, M> TypedAdapter<A, M> {
    pub(crate) fn new(middleware: M) -> Self {
        Self {
            middleware,
            _action: PhantomData,
        }
    }
}

impl<A, M> Middleware for TypedAdapter<A, M>
where
    A: ActionData,
    M: TypedMiddleware<A>,
{
    fn handle(&self, context: &Context<'_>) -> Result<()> {
        match project::<A>(context.action(), self.middleware.accepts_absent()) {
            Some(action) => self.middleware.handle(&TypedContext { context, action }),
            None => context.next(),
        }
    }
}

/// Untyped link wrapping an [`AsyncTypedMiddleware`].
pub(crate) struct AsyncTypedAdapter<A, M> {
    middleware: M,
    _action: PhantomData<fn() -> A>,
}

impl<A, M> AsyncTypedAdapter<A, M> {
    pub(crate) fn new(middleware: M) -> Self {
        Self {
            middleware,
            _action: PhantomData,
        }
    }
}

#[async_trait(?Send)]
impl<A, M> AsyncMiddleware for AsyncTypedAdapter<A, M>
where
    A: ActionData,
    M: AsyncTypedMiddleware<A>,
{
    async fn handle(
        &self,
        context: &AsyncContext<'_>,
        cancellation: &CancellationToken,
    ) -> Result<()> {
        match project::<A>(context.action(), self.middleware.accepts_absent()) {
            Some(action) => {
                let typed = AsyncTypedContext { context, action };
                self.middleware.handle(&typed, cancellation).await
            }
            None => context.next(cancellation).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::Dispatcher;
    use crate::subscription::callback;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    struct Tag {
        label: &'static str,
        nullable: bool,
        log: Log,
    }

    impl<A: ActionData> TypedMiddleware<A> for Tag {
        fn handle(&self, context: &TypedContext<'_, A>) -> Result<()> {
            self.log.borrow_mut().push(self.label.to_string());
            context.next()
        }

        fn accepts_absent(&self) -> bool {
            self.nullable
        }
    }

    #[async_trait(?Send)]
    impl<A: ActionData> AsyncTypedMiddleware<A> for Tag {
        async fn handle(
            &self,
            context: &AsyncTypedContext<'_, A>,
            cancellation: &CancellationToken,
        ) -> Result<()> {
            self.log.borrow_mut().push(self.label.to_string());
            context.next(cancellation).await
        }

        fn accepts_absent(&self) -> bool {
            self.nullable
        }
    }

    #[derive(Debug)]
    struct Navigate {
        route: String,
    }

    #[derive(Debug)]
    struct NavigateBack {
        base: Navigate,
    }

    crate::action_data!(Navigate);
    crate::action_data!(NavigateBack => base);

    fn tag(label: &'static str, nullable: bool, log: &Log) -> Tag {
        Tag {
            label,
            nullable,
            log: log.clone(),
        }
    }

    fn recording_dispatcher(log: &Log) -> Dispatcher {
        let dispatcher = Dispatcher::new();
        let sink = log.clone();
        dispatcher.register(&callback(move |_action| {
            sink.borrow_mut().push("dispatch".to_string());
            Ok(())
        }));
        dispatcher
    }

    #[test]
    fn test_typed_middleware_runs_only_when_compatible() {
        let log: Log = Rc::default();
        let dispatcher = recording_dispatcher(&log);
        // i32 that also accepts the absent action, like a nullable integer
        dispatcher.use_typed::<i32, _>(tag("middleware-1", true, &log));
        dispatcher.use_typed::<String, _>(tag("middleware-2", true, &log));
        dispatcher.use_typed::<i32, _>(tag("middleware-3", false, &log));

        dispatcher.dispatch(Action::none()).unwrap();
        dispatcher.dispatch(String::new()).unwrap();
        dispatcher.dispatch(5_i32).unwrap();

        assert_eq!(
            *log.borrow(),
            vec![
                "middleware-1",
                "middleware-2",
                "dispatch",
                "middleware-2",
                "dispatch",
                "middleware-1",
                "middleware-3",
                "dispatch",
            ]
        );
    }

    #[test]
    fn test_typed_middleware_accepts_refined_actions() {
        let log: Log = Rc::default();
        let dispatcher = recording_dispatcher(&log);
        dispatcher.use_typed::<Navigate, _>(tag("navigate", false, &log));
        dispatcher.use_typed::<NavigateBack, _>(tag("back", false, &log));

        dispatcher
            .dispatch(Navigate {
                route: "/home".to_string(),
            })
            .unwrap();
        dispatcher
            .dispatch(NavigateBack {
                base: Navigate {
                    route: "/prev".to_string(),
                },
            })
            .unwrap();

        assert_eq!(
            *log.borrow(),
            vec!["navigate", "dispatch", "navigate", "back", "dispatch"]
        );
    }

    #[test]
    fn test_typed_context_exposes_parent_view() {
        struct RouteCheck {
            seen: Rc<RefCell<Vec<String>>>,
        }

        impl TypedMiddleware<Navigate> for RouteCheck {
            fn handle(&self, context: &TypedContext<'_, Navigate>) -> Result<()> {
                if let Some(action) = context.action() {
                    self.seen.borrow_mut().push(action.route.clone());
                }
                assert!(context.untyped().is::<NavigateBack>());
                context.next()
            }
        }

        let seen = Rc::new(RefCell::new(Vec::new()));
        let dispatcher = Dispatcher::new();
        dispatcher.use_typed::<Navigate, _>(RouteCheck { seen: seen.clone() });

        dispatcher
            .dispatch(NavigateBack {
                base: Navigate {
                    route: "/prev".to_string(),
                },
            })
            .unwrap();

        assert_eq!(*seen.borrow(), vec!["/prev"]);
    }

    /// Rewrites `/old` to `/new` and sends `/direct` straight to handlers.
    struct Redirect {
        positions: Rc<RefCell<Vec<usize>>>,
    }

    fn navigate(route: &str) -> Navigate {
        Navigate {
            route: route.to_string(),
        }
    }

    impl TypedMiddleware<Navigate> for Redirect {
        fn handle(&self, context: &TypedContext<'_, Navigate>) -> Result<()> {
            self.positions.borrow_mut().push(context.id().position());
            match context.action().map(|action| action.route.as_str()) {
                Some("/old") => context.next_with(navigate("/new")),
                Some("/direct") => context.dispatch(navigate("/bypassed")),
                _ => context.next(),
            }
        }
    }

    #[async_trait(?Send)]
    impl AsyncTypedMiddleware<Navigate> for Redirect {
        async fn handle(
            &self,
            context: &AsyncTypedContext<'_, Navigate>,
            cancellation: &CancellationToken,
        ) -> Result<()> {
            self.positions.borrow_mut().push(context.id().position());
            assert!(context.untyped().is::<Navigate>());
            match context.action().map(|action| action.route.as_str()) {
                Some("/old") => context.next_with(navigate("/new"), cancellation).await,
                Some("/direct") => context.dispatch(navigate("/bypassed")),
                _ => context.next(cancellation).await,
            }
        }
    }

    fn routing_dispatcher(log: &Log) -> Dispatcher {
        let dispatcher = Dispatcher::new();
        let sink = log.clone();
        dispatcher.register(&callback(move |action| {
            if let Some(navigate) = action.downcast_ref::<Navigate>() {
                sink.borrow_mut().push(navigate.route.clone());
            }
            Ok(())
        }));
        dispatcher
    }

    #[test]
    fn test_typed_context_replaces_and_bypasses() {
        let log: Log = Rc::default();
        let positions = Rc::new(RefCell::new(Vec::new()));
        let dispatcher = routing_dispatcher(&log);
        dispatcher.use_typed::<i32, _>(tag("before", false, &log));
        dispatcher.use_typed::<Navigate, _>(Redirect {
            positions: positions.clone(),
        });
        dispatcher.use_typed::<Navigate, _>(tag("after", false, &log));

        dispatcher.dispatch(navigate("/old")).unwrap();
        dispatcher.dispatch(navigate("/direct")).unwrap();
        dispatcher.dispatch(navigate("/home")).unwrap();

        assert_eq!(
            *log.borrow(),
            vec!["after", "/new", "/bypassed", "after", "/home"]
        );
        assert_eq!(*positions.borrow(), vec![1, 1, 1]);
    }

    #[tokio::test]
    async fn test_async_typed_context_replaces_and_bypasses() {
        let log: Log = Rc::default();
        let positions = Rc::new(RefCell::new(Vec::new()));
        let dispatcher = routing_dispatcher(&log);
        dispatcher.use_typed_async::<Navigate, _>(Redirect {
            positions: positions.clone(),
        });
        dispatcher.use_typed_async::<Navigate, _>(tag("after", false, &log));

        dispatcher.dispatch_async(navigate("/old")).await.unwrap();
        dispatcher.dispatch_async(navigate("/direct")).await.unwrap();

        assert_eq!(*log.borrow(), vec!["after", "/new", "/bypassed"]);
        assert_eq!(*positions.borrow(), vec![0, 0]);
    }

    #[tokio::test]
    async fn test_async_typed_middleware_runs_only_when_compatible() {
        let log: Log = Rc::default();
        let dispatcher = recording_dispatcher(&log);
        dispatcher.use_typed_async::<i32, _>(tag("middleware-1", true, &log));
        dispatcher.use_typed_async::<String, _>(tag("middleware-2", false, &log));
        dispatcher.use_typed_async::<i32, _>(tag("middleware-3", false, &log));

        dispatcher.dispatch_async(Action::none()).await.unwrap();
        dispatcher.dispatch_async(String::new()).await.unwrap();

        assert_eq!(
            *log.borrow(),
            vec!["middleware-1", "dispatch", "middleware-2", "dispatch"]
        );
    }
}
