//! Lifecycle hooks: `on_request`, `on_response`, and `on_error`.
//!
//! Hooks are optional, app-wide callbacks around the request lifecycle.
//! `on_request` fires before any middleware; `on_response` fires after
//! projection and may replace the response; `on_error` fires once per
//! request when projection sees an error and may replace it with a new
//! value (which is then re-projected — the nested projection does not
//! re-enter the hook, so replacement values cannot loop).

#![warn(missing_docs)]

use crate::app::App;
use crate::error::HttpError;
use crate::event::Event;
use crate::response::{Reply, Response};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

type OnRequestFuture = Pin<Box<dyn Future<Output = (Event, Result<(), HttpError>)> + Send>>;

/// Hook run before the middleware chain; failing it skips straight to the
/// error projection.
pub type OnRequestHook = Arc<dyn Fn(Event) -> OnRequestFuture + Send + Sync>;

type OnResponseFuture = Pin<Box<dyn Future<Output = (Event, Response)> + Send>>;

/// Hook run after projection; the response it resolves with is the one the
/// client gets.
pub type OnResponseHook = Arc<dyn Fn(Response, Event) -> OnResponseFuture + Send + Sync>;

type OnErrorFuture = Pin<Box<dyn Future<Output = (Event, Result<Reply, HttpError>)> + Send>>;

/// Hook run once per request when an error reaches the projector.
///
/// Resolving to `Ok(reply)` replaces the error with a value that is then
/// re-projected; resolving to `Err(error)` keeps the error path (hand the
/// received error back unchanged for plain pass-through).
pub type OnErrorHook = Arc<dyn Fn(HttpError, Event) -> OnErrorFuture + Send + Sync>;

impl App {
    /// Installs the `on_request` hook.
    ///
    /// # Example
    /// ```
    /// use trellis::app::App;
    ///
    /// let mut app = App::new();
    /// app.on_request(|event| async move {
    ///     tracing::info!(method = %event.method(), path = event.path(), "request");
    ///     (event, Ok(()))
    /// });
    /// ```
    pub fn on_request<F, Fut>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = (Event, Result<(), HttpError>)> + Send + 'static,
    {
        self.on_request = Some(Arc::new(move |event| Box::pin(hook(event))));
        self
    }

    /// Installs the `on_response` hook.
    pub fn on_response<F, Fut>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(Response, Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = (Event, Response)> + Send + 'static,
    {
        self.on_response = Some(Arc::new(move |response, event| {
            Box::pin(hook(response, event))
        }));
        self
    }

    /// Installs the `on_error` hook.
    ///
    /// # Example
    /// ```
    /// use trellis::app::App;
    /// use trellis::response::Reply;
    ///
    /// let mut app = App::new();
    /// app.on_error(|error, event| async move {
    ///     if error.status == 404 {
    ///         return (event, Ok(Reply::text("nothing here")));
    ///     }
    ///     (event, Err(error))
    /// });
    /// ```
    pub fn on_error<F, Fut>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(HttpError, Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = (Event, Result<Reply, HttpError>)> + Send + 'static,
    {
        self.on_error = Some(Arc::new(move |error, event| Box::pin(hook(error, event))));
        self
    }
}
