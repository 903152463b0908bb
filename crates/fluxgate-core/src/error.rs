use thiserror::Error;

/// Errors raised by the dispatcher and passed through it.
///
/// Errors produced by handlers or middleware travel as
/// [`DispatchError::Handler`] and reach the caller of `dispatch` unchanged,
/// after the dispatcher has returned to idle.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Cannot dispatch an action while there is an action currently dispatching.")]
    AlreadyDispatching,

    #[error("Cannot wait for handlers while there is no action currently dispatching.")]
    NoActiveDispatch,

    #[error(
        "Deadlock detected. Two handlers are waiting on each other (directly or indirectly) to complete."
    )]
    Deadlock,

    #[error("The provided id does not correspond to a configured middleware.")]
    InvalidMiddlewareReference,

    #[error("The dispatch was cancelled.")]
    Cancelled,

    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}

pub type Result<T, E = DispatchError> = std::result::Result<T, E>;
