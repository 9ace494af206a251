//! # WebSocket Upgrade Surface
//!
//! The engine does not speak WebSocket frames. A route registered through
//! [`define_websocket_handler`] resolves to a `426 Upgrade Required`
//! response carrying its [`WebSocketHooks`] table; a transport adapter that
//! recognises the attached hooks performs the actual protocol upgrade and
//! drives the callbacks.
//!
//! ## Example
//!
//! ```no_run
//! use trellis::app::App;
//! use trellis::websocket::{WebSocketHooks, define_websocket_handler};
//!
//! let mut app = App::new();
//! let mut hooks = WebSocketHooks::new();
//! hooks.on_message(|peer, message| {
//!     println!("message from {}: {}", peer, message);
//! });
//! app.get("/ws", define_websocket_handler(hooks)).unwrap();
//! ```

#![warn(missing_docs)]

use crate::response::{Reply, Response};
use crate::types::{Handler, box_step};
use bytes::Bytes;
use std::sync::Arc;

/// Callback invoked when a peer connects.
pub type OpenHook = Arc<dyn Fn(&str) + Send + Sync>;
/// Callback invoked for every text message, with `(peer, message)`.
pub type MessageHook = Arc<dyn Fn(&str, &str) + Send + Sync>;
/// Callback invoked for every binary message, with `(peer, payload)`.
pub type BinaryHook = Arc<dyn Fn(&str, Bytes) + Send + Sync>;
/// Callback invoked when a peer disconnects.
pub type CloseHook = Arc<dyn Fn(&str, Option<u16>) + Send + Sync>;
/// Callback invoked when the transport reports an error for a peer.
pub type ErrorHook = Arc<dyn Fn(&str, &str) + Send + Sync>;
/// Callback consulted before the upgrade; returning `false` rejects it.
pub type UpgradeHook = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Callbacks a transport adapter drives once it upgrades the connection.
///
/// Every hook receives the peer identifier assigned by the adapter.
#[derive(Clone)]
pub struct WebSocketHooks {
    /// Connect callback.
    pub open: Option<OpenHook>,
    /// Text-message callback.
    pub message: Option<MessageHook>,
    /// Binary-message callback.
    pub binary: Option<BinaryHook>,
    /// Disconnect callback.
    pub close: Option<CloseHook>,
    /// Transport-error callback.
    pub error: Option<ErrorHook>,
    /// Pre-upgrade gate.
    pub upgrade: Option<UpgradeHook>,
}

impl WebSocketHooks {
    /// Creates an empty hook table.
    pub fn new() -> Self {
        Self {
            open: None,
            message: None,
            binary: None,
            close: None,
            error: None,
            upgrade: None,
        }
    }

    /// Called when a peer connects.
    pub fn on_open<F: Fn(&str) + Send + Sync + 'static>(&mut self, hook: F) {
        self.open = Some(Arc::new(hook));
    }

    /// Called for every text message, with `(peer, message)`.
    pub fn on_message<F: Fn(&str, &str) + Send + Sync + 'static>(&mut self, hook: F) {
        self.message = Some(Arc::new(hook));
    }

    /// Called for every binary message, with `(peer, payload)`.
    pub fn on_binary<F: Fn(&str, Bytes) + Send + Sync + 'static>(&mut self, hook: F) {
        self.binary = Some(Arc::new(hook));
    }

    /// Called when a peer disconnects, with the close code when known.
    pub fn on_close<F: Fn(&str, Option<u16>) + Send + Sync + 'static>(&mut self, hook: F) {
        self.close = Some(Arc::new(hook));
    }

    /// Called when the transport reports an error for a peer.
    pub fn on_error<F: Fn(&str, &str) + Send + Sync + 'static>(&mut self, hook: F) {
        self.error = Some(Arc::new(hook));
    }

    /// Called before the upgrade is performed; returning `false` rejects it.
    pub fn on_upgrade<F: Fn(&str) -> bool + Send + Sync + 'static>(&mut self, hook: F) {
        self.upgrade = Some(Arc::new(hook));
    }
}

impl Default for WebSocketHooks {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for WebSocketHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketHooks")
            .field("open", &self.open.is_some())
            .field("message", &self.message.is_some())
            .field("binary", &self.binary.is_some())
            .field("close", &self.close.is_some())
            .field("error", &self.error.is_some())
            .field("upgrade", &self.upgrade.is_some())
            .finish()
    }
}

/// Builds a route handler that marks the request for a WebSocket upgrade.
///
/// The handler resolves to a `426 Upgrade Required` response with the hook
/// table attached under [`Response::websocket`]; adapters that do not
/// support WebSockets simply deliver the 426 to the client.
pub fn define_websocket_handler(hooks: WebSocketHooks) -> Handler {
    let hooks = Arc::new(hooks);
    Arc::new(move |event| {
        let hooks = Arc::clone(&hooks);
        box_step(async move {
            let mut response = Response::new(426);
            response.set_header("upgrade", "websocket");
            response.websocket = Some(hooks);
            (event, Ok(Reply::Response(response)))
        })
    })
}
