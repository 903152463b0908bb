mod macros;

mod action;
pub mod config;
mod dispatcher;
mod error;
pub mod middleware;
mod queue;
mod subscription;

// public api
pub use action::{lineage, type_of, Action, ActionData};
pub use config::DispatcherConfig;
pub use dispatcher::Dispatcher;
pub use error::{DispatchError, Result};
pub use middleware::{
    AsyncContext, AsyncMiddleware, AsyncTypedContext, AsyncTypedMiddleware, Context, Inspect,
    LoggingMiddleware, MapAction, Middleware, MiddlewareId, TypedContext, TypedMiddleware,
};
pub use subscription::{callback, Callback, Subscriber, SubscriptionId};
pub use tokio_util::sync::CancellationToken;
