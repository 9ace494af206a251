//! # App Module
//!
//! The core engine: the [`App`] owns the route table, the ordered global
//! middleware list, mounted sub-apps, and the lifecycle hooks, and drives a
//! request from arrival to response.
//!
//! ## Basic Usage
//!
//! ```no_run
//! use trellis::app::App;
//! use trellis::response::Reply;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut app = App::new();
//!
//!     app.get("/", |event| async move {
//!         (event, Ok(Reply::text("Hello, World!")))
//!     })
//!     .unwrap();
//!
//!     app.listen(3000, || {
//!         println!("Server running on http://localhost:3000");
//!     })
//!     .await;
//! }
//! ```
//!
//! ## Per-request flow
//!
//! 1. The transport (or [`App::request`]) builds an [`Event`].
//! 2. The `on_request` hook runs, if configured.
//! 3. Global middleware execute in registration order; the terminal step
//!    resolves the route (consulting mounted sub-apps first), populates
//!    `context.params` / `context.matched_route`, and runs the route's own
//!    middleware in front of its handler.
//! 4. The projector turns the resulting value (or error) into a
//!    [`Response`]; the `on_response` hook may replace it.

#![warn(missing_docs)]

pub(crate) mod hooks;
mod serve;
mod trace;

pub use hooks::{OnErrorHook, OnRequestHook, OnResponseHook};
pub use serve::Http2Config;
pub use trace::tracing_plugin;

use crate::error::HttpError;
use crate::event::Event;
use crate::event::context::MatchedRoute;
use crate::req::RequestHandle;
use crate::req::request_headers::RequestHeaders;
use crate::response::projector;
use crate::response::{Reply, Response};
use crate::router::chain::{MiddlewareEntry, run_chain};
use crate::router::matcher::{RouteMatch, RouteTrie, normalize_path};
use crate::types::{Handler, HandlerFuture, HttpMethod, Step, box_step};
use bytes::Bytes;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A registered route.
pub struct Route {
    /// The route's method; `None` matches any method.
    pub method: Option<HttpMethod>,
    /// The registered path pattern.
    pub pattern: String,
    /// The terminal handler.
    pub handler: Handler,
    /// Route-scoped middleware, run after the global chain.
    pub middlewares: Vec<Arc<MiddlewareEntry>>,
    /// Opaque metadata, surfaced verbatim through `context.matched_route`.
    pub meta: Option<Value>,
    /// Set once the tracing plugin wrapped this route's handler.
    pub traced: bool,
}

/// Options accepted by [`App::on_with`].
#[derive(Default)]
pub struct RouteOptions {
    /// Route-scoped middleware, run in order after the global chain.
    pub middleware: Vec<Arc<MiddlewareEntry>>,
    /// Opaque metadata attached to the route.
    pub meta: Option<Value>,
}

struct Mount {
    base: String,
    app: Arc<App>,
}

/// Anything registrable as a terminal route handler.
///
/// Implemented for async closures `Fn(Event) -> Future<(Event, Result<Reply,
/// HttpError>)>` and for prebuilt [`Handler`] values (such as the ones the
/// JSON-RPC, MCP, and WebSocket layers produce).
pub trait IntoHandler {
    /// Converts into the boxed handler representation.
    fn into_handler(self) -> Handler;
}

impl<F, Fut> IntoHandler for F
where
    F: Fn(Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Step> + Send + 'static,
{
    fn into_handler(self) -> Handler {
        Arc::new(move |event| box_step(self(event)))
    }
}

impl IntoHandler for Handler {
    fn into_handler(self) -> Handler {
        self
    }
}

/// The engine: route table, middleware, hooks, and mounted sub-apps.
///
/// Configure an `App` with `&mut self` registration calls, then hand it to
/// [`App::listen`] (or wrap it in an [`Arc`] and drive [`App::request`] /
/// [`App::handle`] yourself). Request handling takes `&self`, so the borrow
/// checker enforces that the tables are not mutated mid-flight — embedders
/// that need live mutation must arrange their own synchronisation.
pub struct App {
    routes: RouteTrie<Arc<Route>>,
    middlewares: Vec<Arc<MiddlewareEntry>>,
    mounts: Vec<Mount>,
    pub(crate) on_request: Option<OnRequestHook>,
    pub(crate) on_response: Option<OnResponseHook>,
    pub(crate) on_error: Option<OnErrorHook>,
    debug: bool,
    silent: bool,
    pub(crate) host: String,
    pub(crate) http2: bool,
    pub(crate) http2_config: Option<Http2Config>,
    pub(crate) graceful_shutdown: bool,
}

impl App {
    /// Creates a new engine with empty routes and middleware.
    pub fn new() -> Self {
        App {
            routes: RouteTrie::new(),
            middlewares: Vec::new(),
            mounts: Vec::new(),
            on_request: None,
            on_response: None,
            on_error: None,
            debug: false,
            silent: false,
            host: String::from("0.0.0.0"),
            http2: true,
            http2_config: None,
            graceful_shutdown: false,
        }
    }

    /// Enables debug mode: error responses include the cause chain as
    /// `stack`. Never enable in production.
    pub fn debug(&mut self, enabled: bool) -> &mut Self {
        self.debug = enabled;
        self
    }

    /// Enables silent mode: unhandled errors are not logged.
    pub fn silent(&mut self, enabled: bool) -> &mut Self {
        self.silent = enabled;
        self
    }

    /// Sets the host address for [`App::listen`] to bind to.
    ///
    /// Defaults to `"0.0.0.0"` (all interfaces).
    pub fn host(&mut self, host: &str) -> &mut Self {
        self.host = host.to_string();
        self
    }

    /// Enables or disables HTTP/2 support for the server.
    ///
    /// Enabled by default; disabling forces HTTP/1.1 only.
    pub fn enable_http2(&mut self, enabled: bool) -> &mut Self {
        self.http2 = enabled;
        self
    }

    /// Applies advanced HTTP/2 configuration.
    ///
    /// All fields in [`Http2Config`] are optional; `None` values use
    /// Hyper's defaults.
    pub fn http2_config(&mut self, config: Http2Config) -> &mut Self {
        self.http2_config = Some(config);
        self
    }

    /// Enables graceful shutdown: the accept loop stops on Ctrl+C and
    /// in-flight requests finish before the server exits.
    pub fn with_graceful_shutdown(&mut self) -> &mut Self {
        self.graceful_shutdown = true;
        self
    }

    pub(crate) fn is_debug(&self) -> bool {
        self.debug
    }

    pub(crate) fn is_silent(&self) -> bool {
        self.silent
    }

    pub(crate) fn on_error_hook(&self) -> Option<&OnErrorHook> {
        self.on_error.as_ref()
    }

    /// Registers a route for a method (or the wildcard method when `method`
    /// is `None`).
    ///
    /// A later registration of the same `(method, pattern)` replaces the
    /// earlier one. Fails synchronously on an invalid pattern.
    pub fn on<H: IntoHandler>(
        &mut self,
        method: Option<HttpMethod>,
        pattern: &str,
        handler: H,
    ) -> Result<(), HttpError> {
        self.on_with(method, pattern, handler, RouteOptions::default())
    }

    /// Registers a route with route-scoped middleware and metadata.
    pub fn on_with<H: IntoHandler>(
        &mut self,
        method: Option<HttpMethod>,
        pattern: &str,
        handler: H,
        options: RouteOptions,
    ) -> Result<(), HttpError> {
        let route = Arc::new(Route {
            method,
            pattern: pattern.to_string(),
            handler: handler.into_handler(),
            middlewares: options.middleware,
            meta: options.meta,
            traced: false,
        });
        self.routes.insert(method, pattern, route)
    }

    /// Registers a GET route.
    ///
    /// # Example
    /// ```
    /// use trellis::app::App;
    /// use trellis::response::Reply;
    ///
    /// let mut app = App::new();
    /// app.get("/hello", |event| async move {
    ///     (event, Ok(Reply::text("Hello, World!")))
    /// })
    /// .unwrap();
    /// ```
    pub fn get<H: IntoHandler>(&mut self, pattern: &str, handler: H) -> Result<(), HttpError> {
        self.on(Some(HttpMethod::GET), pattern, handler)
    }

    /// Registers a POST route.
    pub fn post<H: IntoHandler>(&mut self, pattern: &str, handler: H) -> Result<(), HttpError> {
        self.on(Some(HttpMethod::POST), pattern, handler)
    }

    /// Registers a PUT route.
    pub fn put<H: IntoHandler>(&mut self, pattern: &str, handler: H) -> Result<(), HttpError> {
        self.on(Some(HttpMethod::PUT), pattern, handler)
    }

    /// Registers a PATCH route.
    pub fn patch<H: IntoHandler>(&mut self, pattern: &str, handler: H) -> Result<(), HttpError> {
        self.on(Some(HttpMethod::PATCH), pattern, handler)
    }

    /// Registers a DELETE route.
    pub fn delete<H: IntoHandler>(&mut self, pattern: &str, handler: H) -> Result<(), HttpError> {
        self.on(Some(HttpMethod::DELETE), pattern, handler)
    }

    /// Registers an OPTIONS route.
    pub fn options<H: IntoHandler>(&mut self, pattern: &str, handler: H) -> Result<(), HttpError> {
        self.on(Some(HttpMethod::OPTIONS), pattern, handler)
    }

    /// Registers a HEAD route.
    pub fn head<H: IntoHandler>(&mut self, pattern: &str, handler: H) -> Result<(), HttpError> {
        self.on(Some(HttpMethod::HEAD), pattern, handler)
    }

    /// Registers a route for every method.
    pub fn all<H: IntoHandler>(&mut self, pattern: &str, handler: H) -> Result<(), HttpError> {
        self.on(None, pattern, handler)
    }

    /// Appends a prebuilt middleware entry to the global chain.
    ///
    /// Entries run in registration order; build them with
    /// [`middleware`](crate::middlewares::middleware),
    /// [`wrap`](crate::middlewares::wrap), or their `_with` variants.
    pub fn use_entry(&mut self, entry: Arc<MiddlewareEntry>) -> &mut Self {
        self.middlewares.push(entry);
        self
    }

    /// Appends a plain ("run and continue") global middleware.
    pub fn use_middleware<F, Fut>(&mut self, middleware: F) -> &mut Self
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = (Event, Result<Option<Reply>, HttpError>)> + Send + 'static,
    {
        self.use_entry(crate::middlewares::middleware(middleware))
    }

    /// Appends a plain global middleware constrained to a route pattern.
    pub fn use_on<F, Fut>(&mut self, route: &str, middleware: F) -> &mut Self
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = (Event, Result<Option<Reply>, HttpError>)> + Send + 'static,
    {
        self.use_entry(crate::middlewares::middleware_with(
            crate::middlewares::MiddlewareOptions {
                route: Some(route.to_string()),
                ..Default::default()
            },
            middleware,
        ))
    }

    /// Appends a wrapping global middleware with full `next()` semantics.
    pub fn use_wrap<F, Fut>(&mut self, middleware: F) -> &mut Self
    where
        F: Fn(Event, crate::router::chain::Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Step> + Send + 'static,
    {
        self.use_entry(crate::middlewares::wrap(middleware))
    }

    /// Mounts a sub-app under a base path.
    ///
    /// Requests whose path equals `base` or starts with `base + "/"` are
    /// forwarded to `sub` with the base stripped from the URL (recorded
    /// under `context.mount_base`). The sub-app's own middleware and hooks
    /// apply; its response is merged back into the parent's projection.
    pub fn mount(&mut self, base: &str, sub: App) -> &mut Self {
        let base = normalize_path(base);
        self.mounts.push(Mount {
            base,
            app: Arc::new(sub),
        });
        self
    }

    /// Runs a one-shot plugin against the engine.
    ///
    /// Plugins mutate the route and middleware tables; see
    /// [`tracing_plugin`] for the bundled example.
    pub fn register<P: FnOnce(&mut App)>(&mut self, plugin: P) -> &mut Self {
        plugin(self);
        self
    }

    pub(crate) fn middlewares_mut(&mut self) -> &mut Vec<Arc<MiddlewareEntry>> {
        &mut self.middlewares
    }

    pub(crate) fn routes_mut(&mut self) -> &mut RouteTrie<Arc<Route>> {
        &mut self.routes
    }

    /// Runs the engine in-process against a synthetic request.
    ///
    /// The workhorse for tests and embedders that bring their own
    /// transport.
    ///
    /// # Example
    /// ```no_run
    /// # use std::sync::Arc;
    /// # use trellis::app::App;
    /// # use trellis::types::HttpMethod;
    /// # async fn example(app: Arc<App>) {
    /// let response = app.request(HttpMethod::GET, "/ping", None).await;
    /// assert_eq!(response.status, 200);
    /// # }
    /// ```
    pub async fn request(
        self: &Arc<Self>,
        method: HttpMethod,
        target: &str,
        init: Option<RequestInit>,
    ) -> Response {
        let init = init.unwrap_or_default();
        let mut headers = RequestHeaders::new();
        for (name, value) in &init.headers {
            headers.append(name, value);
        }
        let req = RequestHandle::new(method, target, headers, init.body);
        self.handle(Event::new(req)).await
    }

    /// Processes one event through hooks, middleware, routing, and
    /// projection, producing the final response.
    pub async fn handle(self: &Arc<Self>, event: Event) -> Response {
        self.handle_inner(event).await.1
    }

    pub(crate) fn handle_inner(
        self: &Arc<Self>,
        event: Event,
    ) -> Pin<Box<dyn Future<Output = (Event, Response)> + Send + 'static>> {
        let app = Arc::clone(self);
        Box::pin(async move {
            let mut event = event;

            if let Some(hook) = &app.on_request {
                let (hook_event, result) = hook(event).await;
                event = hook_event;
                if let Err(error) = result {
                    let projected = projector::project(&app, event, Err(error)).await;
                    return app.post_response(projected).await;
                }
            }

            let terminal: Handler = {
                let app = Arc::clone(&app);
                Arc::new(move |event| App::dispatch(Arc::clone(&app), event))
            };

            let outcome = run_chain(app.middlewares.clone(), terminal, event).await;
            let (event, outcome) = outcome;
            let projected = projector::project(&app, event, outcome).await;
            app.post_response(projected).await
        })
    }

    async fn post_response(&self, projected: (Event, Response)) -> (Event, Response) {
        let (event, response) = projected;
        match &self.on_response {
            Some(hook) => hook(response, event).await,
            None => (event, response),
        }
    }

    /// The terminal step of the global chain: sub-app delegation, route
    /// lookup, and the route-scoped chain.
    fn dispatch(app: Arc<App>, mut event: Event) -> HandlerFuture {
        box_step(async move {
            for mount in &app.mounts {
                let path = event.path();
                let is_exact = path == mount.base;
                let is_under = path.starts_with(&format!("{}/", mount.base));
                if !is_exact && !is_under {
                    continue;
                }

                let stripped = &path[mount.base.len()..];
                let mut target = if stripped.is_empty() {
                    String::from("/")
                } else {
                    stripped.to_string()
                };
                if let Some(query) = event.req.query_string() {
                    target.push('?');
                    target.push_str(query);
                }

                event.set_target(target);
                event.context.mount_base = Some(mount.base.clone());
                let (event, response) = mount.app.handle_inner(event).await;
                return (event, Ok(Reply::Response(response)));
            }

            let method = event.method();
            let path = event.path().to_string();
            match app.routes.lookup(method, &path) {
                RouteMatch::Found { payload, params } => {
                    let route = Arc::clone(payload);
                    for (name, value) in params {
                        event.context.params.insert(name, value);
                    }
                    event.context.matched_route = Some(MatchedRoute {
                        method: route.method,
                        pattern: route.pattern.clone(),
                        meta: route.meta.clone(),
                    });
                    run_chain(route.middlewares.clone(), route.handler.clone(), event).await
                }
                RouteMatch::MethodNotAllowed { allowed } => {
                    let allowed: Vec<&str> = allowed.iter().map(|m| m.as_str()).collect();
                    let error = HttpError::method_not_allowed(
                        format!("Method {} is not allowed for {}", method, path),
                        &allowed,
                    );
                    (event, Err(error))
                }
                RouteMatch::Miss => (event, Ok(Reply::NotFound)),
            }
        })
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

/// Headers and body for a synthetic [`App::request`].
#[derive(Default)]
pub struct RequestInit {
    /// Request headers as `(name, value)` pairs.
    pub headers: Vec<(String, String)>,
    /// Optional request body.
    pub body: Option<Bytes>,
}

impl RequestInit {
    /// An empty init.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Sets the body.
    pub fn body<T: Into<Bytes>>(mut self, body: T) -> Self {
        self.body = Some(body.into());
        self
    }
}
