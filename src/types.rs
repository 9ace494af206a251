#![warn(missing_docs)]
use crate::error::HttpError;
use crate::event::Event;
use crate::response::Reply;
use crate::router::chain::Next;
use bytes::Bytes;
use futures::Stream;
use hyper::Method;
use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Represents the supported HTTP methods for routing and request handling.
///
/// Routes may also be registered for the *wildcard method* (any method) by
/// passing `None` where an `Option<HttpMethod>` is expected; the wildcard
/// bucket is consulted only after the exact method fails to match.
#[derive(Eq, Hash, PartialEq, Clone, Copy, Debug)]
pub enum HttpMethod {
    /// The HTTP GET method, typically used for retrieving resources.
    GET,
    /// The HTTP POST method, commonly used for creating resources or submitting data.
    POST,
    /// The HTTP PUT method, generally used for updating or replacing resources.
    PUT,
    /// The HTTP HEAD method, used to retrieve headers for a resource without the body.
    HEAD,
    /// The HTTP DELETE method, used to remove resources.
    DELETE,
    /// The HTTP PATCH method, used for making partial updates to resources.
    PATCH,
    /// The HTTP OPTIONS method, used to describe the communication options for the target resource.
    OPTIONS,
}

impl HttpMethod {
    /// Returns the canonical upper-case name of the method.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::DELETE => "DELETE",
            HttpMethod::PATCH => "PATCH",
            HttpMethod::HEAD => "HEAD",
            HttpMethod::OPTIONS => "OPTIONS",
        }
    }
}

impl From<&Method> for HttpMethod {
    fn from(method: &Method) -> Self {
        match method {
            &Method::GET => HttpMethod::GET,
            &Method::POST => HttpMethod::POST,
            &Method::PUT => HttpMethod::PUT,
            &Method::DELETE => HttpMethod::DELETE,
            &Method::PATCH => HttpMethod::PATCH,
            &Method::HEAD => HttpMethod::HEAD,
            &Method::OPTIONS => HttpMethod::OPTIONS,
            _ => HttpMethod::GET,
        }
    }
}

impl Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A boxed byte stream used for streaming request and response bodies.
pub type ByteStream =
    Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send + Sync + 'static>>;

/// The value a handler resolves to: a [`Reply`] on success, an [`HttpError`] otherwise.
///
/// Either outcome is accepted by the response projector; returning an error
/// and throwing one are equivalent.
pub type HandlerResult = Result<Reply, HttpError>;

/// The `(event, result)` pair every step of the request chain resolves to.
///
/// The event travels *through* handlers and middleware by value and is handed
/// back alongside the produced value, so later stages (route middleware, the
/// projector, lifecycle hooks) observe every mutation made to it.
pub type Step = (Event, HandlerResult);

/// The boxed future a [`Handler`] returns.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Step> + Send + 'static>>;

/// A registered terminal handler.
pub type Handler = Arc<dyn Fn(Event) -> HandlerFuture + Send + Sync + 'static>;

/// The boxed future a plain middleware returns.
pub type MiddlewareFuture =
    Pin<Box<dyn Future<Output = (Event, Result<Option<Reply>, HttpError>)> + Send + 'static>>;

/// A plain ("run and continue") middleware.
///
/// Resolving to `Ok(None)` passes control to the next middleware; resolving
/// to `Ok(Some(reply))` short-circuits the chain with that reply.
pub type MiddlewareFn = Arc<dyn Fn(Event) -> MiddlewareFuture + Send + Sync + 'static>;

/// A wrapping middleware with full `next()` semantics.
///
/// The middleware receives the [`Next`] continuation and may run work before
/// and after awaiting it; the value it resolves to becomes the response value
/// for the rest of the chain.
pub type WrapFn = Arc<dyn Fn(Event, Next) -> HandlerFuture + Send + Sync + 'static>;

/// A predicate evaluated against the event to decide whether a middleware runs.
pub type MiddlewarePredicate = Arc<dyn Fn(&Event) -> bool + Send + Sync + 'static>;

pub(crate) fn box_step<F>(future: F) -> HandlerFuture
where
    F: Future<Output = Step> + Send + 'static,
{
    Box::pin(future)
}
