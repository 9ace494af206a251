//! The bundled tracing plugin.
//!
//! Wraps every registered global middleware and route handler in a
//! `tracing` span so each step of the request chain shows up in span
//! output. Wrapped entries are marked, which makes the plugin idempotent:
//! registering it twice does not double-wrap anything. Register it *after*
//! the routes and middleware it should cover.

use crate::app::{App, Route};
use crate::router::chain::{MiddlewareEntry, MiddlewareKind};
use std::sync::Arc;
use tracing::Instrument;

/// Builds the tracing plugin for [`App::register`].
///
/// # Example
///
/// ```
/// use trellis::app::{App, tracing_plugin};
/// use trellis::response::Reply;
///
/// let mut app = App::new();
/// app.get("/ping", |event| async move { (event, Ok(Reply::text("pong"))) })
///     .unwrap();
/// app.register(tracing_plugin());
/// ```
pub fn tracing_plugin() -> impl FnOnce(&mut App) {
    |app: &mut App| {
        for entry in app.middlewares_mut().iter_mut() {
            if entry.traced {
                continue;
            }
            *entry = trace_entry(entry);
        }

        app.routes_mut().for_each_payload_mut(|route| {
            if route.traced {
                return;
            }
            *route = trace_route(route);
        });
    }
}

fn trace_entry(entry: &Arc<MiddlewareEntry>) -> Arc<MiddlewareEntry> {
    let kind = match &entry.kind {
        MiddlewareKind::Plain(func) => {
            let func = Arc::clone(func);
            MiddlewareKind::Plain(Arc::new(move |event| {
                let span = tracing::info_span!("middleware", path = %event.path());
                Box::pin(func(event).instrument(span))
            }))
        }
        MiddlewareKind::Wrap(func) => {
            let func = Arc::clone(func);
            MiddlewareKind::Wrap(Arc::new(move |event, next| {
                let span = tracing::info_span!("middleware", path = %event.path());
                Box::pin(func(event, next).instrument(span))
            }))
        }
    };

    Arc::new(MiddlewareEntry {
        kind,
        route: entry.route.clone(),
        method: entry.method,
        predicate: entry.predicate.clone(),
        meta: entry.meta.clone(),
        traced: true,
    })
}

fn trace_route(route: &Arc<Route>) -> Arc<Route> {
    let handler = Arc::clone(&route.handler);
    let pattern = route.pattern.clone();

    Arc::new(Route {
        method: route.method,
        pattern: route.pattern.clone(),
        handler: Arc::new(move |event| {
            let span = tracing::info_span!("handler", route = %pattern);
            Box::pin(handler(event).instrument(span))
        }),
        middlewares: route.middlewares.clone(),
        meta: route.meta.clone(),
        traced: true,
    })
}
