//! Listener capabilities and the notification contract.
//!
//! A listener is any application-defined trait extending [`Listener`]. Every
//! operation of that trait becomes one [`Notification`] variant; the
//! [`listener`](crate::listener) attribute generates the variants, the
//! dispatch code and a posting proxy, or they can be written by hand.

use crate::error::{BoxError, ListenerError};

/// Base capability every listener trait extends.
///
/// Listeners are shared with the connector through an `Arc` and invoked only
/// on the dispatch thread, so implementations that mutate state use interior
/// mutability.
pub trait Listener: Send + Sync + 'static {
    /// Optional error-handling capability.
    ///
    /// When this returns `Some`, failures raised while delivering a
    /// notification to this listener are routed to it instead of being logged.
    fn error_handler(&self) -> Option<&dyn ErrorHandler> {
        None
    }
}

/// Error-handling capability a listener may expose.
pub trait ErrorHandler: Send + Sync {
    fn handle_error(&self, error: ListenerError);
}

/// One listener-directed event, produced by a worker and consumed exactly once
/// on the dispatch thread.
pub trait Notification: Send + 'static {
    /// The listener shape this notification is delivered to.
    type Target: ?Sized + Listener;

    /// Name of the listener operation, used in logs and errors.
    fn tag(&self) -> &'static str;

    /// Invoke the matching listener operation with the carried arguments.
    fn dispatch(self, listener: &Self::Target) -> Result<(), ListenerError>;
}

/// Return types a listener operation may declare: `()` or `Result<(), E>`.
pub trait DeliveryOutcome {
    fn into_delivery(self) -> Result<(), BoxError>;
}

impl DeliveryOutcome for () {
    fn into_delivery(self) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<E> DeliveryOutcome for Result<(), E>
where
    E: Into<BoxError>,
{
    fn into_delivery(self) -> Result<(), BoxError> {
        self.map_err(Into::into)
    }
}

/// Convert a listener operation's return value into a delivery result.
pub fn delivered<O: DeliveryOutcome>(tag: &'static str, outcome: O) -> Result<(), ListenerError> {
    outcome
        .into_delivery()
        .map_err(|source| ListenerError::Failed { tag, source })
}

/// The value a posting proxy returns to the worker: the post itself cannot
/// fail, so this is `()` or `Ok(())`.
pub trait ProxyReturn {
    fn posted() -> Self;
}

impl ProxyReturn for () {
    fn posted() -> Self {}
}

impl<E> ProxyReturn for Result<(), E> {
    fn posted() -> Self {
        Ok(())
    }
}
