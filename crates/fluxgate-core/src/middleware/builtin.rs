use super::{AsyncContext, AsyncMiddleware, Context, Middleware};
use crate::action::Action;
use crate::config;
use crate::error::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Looks at every action and continues unchanged. Works in both pipelines.
pub struct Inspect<F> {
    inspector: F,
}

impl<F> Inspect<F>
where
    F: Fn(&Action),
{
    pub fn new(inspector: F) -> Self {
        Self { inspector }
    }
}

impl<F> Middleware for Inspect<F>
where
    F: Fn(&Action),
{
    fn handle(&self, context: &Context<'_>) -> Result<()> {
        (self.inspector)(context.action());
        context.next()
    }
}

#[async_trait(?Send)]
impl<F> AsyncMiddleware for Inspect<F>
where
    F: Fn(&Action),
{
    async fn handle(
        &self,
        context: &AsyncContext<'_>,
        cancellation: &CancellationToken,
    ) -> Result<()> {
        (self.inspector)(context.action());
        context.next(cancellation).await
    }
}

/// Replaces every action before passing it on. Works in both pipelines.
pub struct MapAction<F> {
    mapper: F,
}

impl<F> MapAction<F>
where
    F: Fn(&Action) -> Result<Action>,
{
    pub fn new(mapper: F) -> Self {
        Self { mapper }
    }
}

impl<F> Middleware for MapAction<F>
where
    F: Fn(&Action) -> Result<Action>,
{
    fn handle(&self, context: &Context<'_>) -> Result<()> {
        let action = (self.mapper)(context.action())?;
        context.next_with(action)
    }
}

#[async_trait(?Send)]
impl<F> AsyncMiddleware for MapAction<F>
where
    F: Fn(&Action) -> Result<Action>,
{
    async fn handle(
        &self,
        context: &AsyncContext<'_>,
        cancellation: &CancellationToken,
    ) -> Result<()> {
        let action = (self.mapper)(context.action())?;
        context.next_with(action, cancellation).await
    }
}

/// Logs every action entering the pipeline and how its dispatch ended.
pub struct LoggingMiddleware {
    level: log::Level,
    label: String,
}

impl LoggingMiddleware {
    pub fn new(label: impl Into<String>, level: log::Level) -> Self {
        Self {
            level,
            label: label.into(),
        }
    }

    /// Uses the level configured through `FLUXGATE_MIDDLEWARE_LOG_LEVEL`.
    pub fn from_env(label: impl Into<String>) -> Self {
        Self::new(label, config::middleware_log_level())
    }

    pub fn level(&self) -> log::Level {
        self.level
    }

    fn before(&self, action: &Action) {
        log::log!(self.level, "[{}] dispatching {:?}", self.label, action);
    }

    fn after(&self, action: &Action, result: &Result<()>) {
        match result {
            Ok(()) => log::log!(self.level, "[{}] dispatched {}", self.label, action.type_name()),
            Err(e) => log::warn!(
                "[{}] dispatch of {} failed: {}",
                self.label,
                action.type_name(),
                e
            ),
        }
    }
}

impl Middleware for LoggingMiddleware {
    fn handle(&self, context: &Context<'_>) -> Result<()> {
        self.before(context.action());
        let result = context.next();
        self.after(context.action(), &result);
        result
    }
}

#[async_trait(?Send)]
impl AsyncMiddleware for LoggingMiddleware {
    async fn handle(
        &self,
        context: &AsyncContext<'_>,
        cancellation: &CancellationToken,
    ) -> Result<()> {
        self.before(context.action());
        let result = context.next(cancellation).await;
        self.after(context.action(), &result);
        result
    }
}
