//! Handler slots and routing outcomes.

use futures::future::BoxFuture;
use lsp_mux_core::ResponseError;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_lsp_server::jsonrpc;

/// Future returned by every feature server handler.
pub type HandlerFuture<T> = BoxFuture<'static, Result<T, ResponseError>>;

/// Request-shaped handler; the token is cancelled when the client gives up.
pub type RequestHandler<P, R> = Arc<dyn Fn(P, CancellationToken) -> HandlerFuture<R> + Send + Sync>;

/// Notification-shaped handler. Failures are logged by the caller.
pub type NotificationHandler<P> = Arc<dyn Fn(P) -> HandlerFuture<()> + Send + Sync>;

/// Outcome of offering a message to a feature server.
///
/// `Unhandled` means nobody owns the message, which is different from an
/// owner answering with an empty value (`Handled(None)`, `Handled(Value::Null)`).
///
/// # Examples
///
/// ```
/// use lsp_mux::handler::Routed;
///
/// let handled: Routed<Option<u32>> = Routed::Handled(None);
/// assert_eq!(handled.into_response("command 'noop'").unwrap(), None);
/// assert!(Routed::<u32>::Unhandled.into_response("command 'noop'").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed<T> {
    Handled(T),
    Unhandled,
}

impl<T> Routed<T> {
    /// Wire form: an unhandled request is reported as `MethodNotFound`.
    pub fn into_response(self, what: impl std::fmt::Display) -> jsonrpc::Result<T> {
        match self {
            Self::Handled(value) => Ok(value),
            Self::Unhandled => Err(jsonrpc::Error {
                code: jsonrpc::ErrorCode::MethodNotFound,
                message: format!("No server handles {what}").into(),
                data: None,
            }),
        }
    }
}

/// A protocol verb's handler, or its absence.
pub enum HandlerSlot<H> {
    Unset,
    Set(H),
}

impl<H> Default for HandlerSlot<H> {
    fn default() -> Self {
        Self::Unset
    }
}

impl<H> HandlerSlot<H> {
    pub fn into_inner(self) -> Option<H> {
        match self {
            Self::Set(handler) => Some(handler),
            Self::Unset => None,
        }
    }
}

impl<H: Clone> HandlerSlot<H> {
    /// Installs `handler`, returning whatever was there before.
    pub fn replace(&mut self, handler: H) -> Self {
        std::mem::replace(self, Self::Set(handler))
    }

    /// Clones the handler out so it can run without holding any lock.
    pub fn get(&self) -> Option<H> {
        match self {
            Self::Set(handler) => Some(handler.clone()),
            Self::Unset => None,
        }
    }
}

impl<H> std::fmt::Debug for HandlerSlot<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unset => f.write_str("Unset"),
            Self::Set(_) => f.write_str("Set(..)"),
        }
    }
}
