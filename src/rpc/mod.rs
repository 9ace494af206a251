//! # RPC Module
//!
//! Protocol layers that ride on the engine: the JSON-RPC 2.0 dispatcher
//! ([`jsonrpc`]) and the Model Context Protocol server ([`mcp`]) built on
//! top of it. Both produce ordinary route handlers, so they mount like any
//! other route.

#![warn(missing_docs)]

/// The JSON-RPC 2.0 dispatcher.
pub mod jsonrpc;

/// The Model Context Protocol (MCP) server.
pub mod mcp;
