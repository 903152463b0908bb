use super::MiddlewareId;
use crate::action::Action;
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// A pipeline element that may suspend around the rest of the chain.
///
/// Links run on the dispatching task, handler delivery at the end of the
/// chain is always synchronous. Cancellation is cooperative: a link decides
/// whether to look at the token at all.
#[async_trait(?Send)]
pub trait AsyncMiddleware {
    async fn handle(
        &self,
        context: &AsyncContext<'_>,
        cancellation: &CancellationToken,
    ) -> Result<()>;
}

/// What an async middleware link sees of the dispatch in progress.
pub struct AsyncContext<'a> {
    dispatcher: &'a Dispatcher,
    id: MiddlewareId,
    action: Action,
}

impl<'a> AsyncContext<'a> {
    pub(crate) fn new(dispatcher: &'a Dispatcher, id: MiddlewareId, action: Action) -> Self {
        Self {
            dispatcher,
            id,
            action,
        }
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn id(&self) -> MiddlewareId {
        self.id
    }

    /// Continues with the next link, or delivers to handlers if this is the
    /// last one.
    pub async fn next(&self, cancellation: &CancellationToken) -> Result<()> {
        self.dispatcher
            .dispatch_next_async(self.id, self.action.clone(), cancellation.clone())
            .await
    }

    pub async fn next_with(
        &self,
        action: impl Into<Action>,
        cancellation: &CancellationToken,
    ) -> Result<()> {
        self.dispatcher
            .dispatch_next_async(self.id, action.into(), cancellation.clone())
            .await
    }

    /// Delivers `action` to all handlers, bypassing the rest of the pipeline.
    pub fn dispatch(&self, action: impl Into<Action>) -> Result<()> {
        self.dispatcher.deliver(action.into())
    }
}
