#![warn(missing_docs)]

//! # Trellis
//!
//! Trellis is a web-standard HTTP server framework: requests are routed by
//! method and path pattern through a radix trie, flow through an ordered
//! middleware chain with `next()` semantics, and whatever the handler
//! resolves to — text, bytes, JSON, a stream, a full response, an error —
//! is projected into a proper HTTP response. JSON-RPC 2.0 and MCP layers
//! ride on the same engine.
//!
//! ## Modules
//!
//! - [`app`] - The engine: route registration, middleware, hooks, mounting, serving.
//! - [`event`] - The per-request context object handlers and middleware receive.
//! - [`req`] - The incoming request handle with read-once body accessors.
//! - [`res`] - The response scratch staged on every event.
//! - [`response`] - Handler reply values, concrete responses, and the projector.
//! - [`router`] - The radix-trie matcher and the middleware chain runner.
//! - [`middlewares`] - Middleware constructors and the body-size guard.
//! - [`cookies`] - Cookie parsing, distinct-key merging, and chunked cookies.
//! - [`validate`] - The standard-schema validation adapter.
//! - [`rpc`] - The JSON-RPC 2.0 dispatcher and the MCP server.
//! - [`websocket`] - The WebSocket upgrade surface.
//! - [`helpers`] - Redirects, cache headers, MIME lookup, basic auth.
//! - [`error`] - The structured HTTP error model.
//! - [`types`] - Core types and aliases used throughout the framework.

/// The engine: route registration, middleware, hooks, mounting, serving.
///
/// See [`app::App`] for details.
pub mod app;

/// Cookie parsing, distinct-key merging, and chunked cookies.
pub mod cookies;

/// The structured HTTP error model.
pub mod error;

/// The per-request context object handlers and middleware receive.
pub mod event;

/// Redirects, cache headers, MIME lookup, and the basic-auth primitive.
pub mod helpers;

/// Middleware constructors and the built-in body-size guard.
pub mod middlewares;

/// The incoming request handle with read-once body accessors.
pub mod req;

/// The response scratch staged on every event.
pub mod res;

/// Handler reply values, concrete responses, and the projector.
pub mod response;

/// The radix-trie matcher and the middleware chain runner.
pub mod router;

/// The JSON-RPC 2.0 dispatcher and the MCP server.
pub mod rpc;

/// Core types and aliases used throughout the framework.
pub mod types;

/// The standard-schema validation adapter.
pub mod validate;

/// The WebSocket upgrade surface.
pub mod websocket;

#[cfg(test)]
mod tests;
