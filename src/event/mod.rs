//! # Event Module
//!
//! The [`Event`] is the neutral per-request container every handler and
//! middleware receives: the incoming request handle, a lazily parsed
//! absolute URL, the response scratch, and the context bag. Events are
//! created when a request arrives, travel through the middleware chain by
//! value, and are consumed once the response is projected — per-event state
//! is never shared across requests.
//!
//! ## Basic Usage
//!
//! ```no_run
//! use trellis::event::Event;
//!
//! # async fn handler(mut event: Event) {
//! let id = event.context.params.get("id").unwrap_or("0").to_string();
//! event.res.set_status(200);
//! event.res.set_header("x-user", &id);
//! # }
//! ```

#![warn(missing_docs)]

/// The per-request context bag and its reserved keys.
pub mod context;

use crate::error::HttpError;
use crate::req::RequestHandle;
use crate::res::ResponseScratch;
use crate::types::HttpMethod;
use ahash::AHashMap;
use context::EventContext;
use std::sync::OnceLock;
use url::Url;

/// The per-request context object.
pub struct Event {
    /// The incoming HTTP message.
    pub req: RequestHandle,
    /// Response staging (status, headers) for the projector.
    pub res: ResponseScratch,
    /// The context bag shared between middleware and handlers.
    pub context: EventContext,
    url: OnceLock<Url>,
}

impl Event {
    /// Creates an event for an incoming request.
    pub fn new(req: RequestHandle) -> Self {
        Self {
            req,
            res: ResponseScratch::new(),
            context: EventContext::new(),
            url: OnceLock::new(),
        }
    }

    /// The request method.
    pub fn method(&self) -> HttpMethod {
        self.req.method()
    }

    /// The request path, without query string or fragment.
    pub fn path(&self) -> &str {
        self.req.path()
    }

    /// The absolute request URL, parsed on first access and cached.
    ///
    /// Relative targets are made absolute with the `host` header
    /// (`localhost` when absent) so the result is always a full URL.
    pub fn url(&self) -> Result<&Url, HttpError> {
        if let Some(url) = self.url.get() {
            return Ok(url);
        }
        let target = self.req.target();
        let absolute = if target.starts_with("http://") || target.starts_with("https://") {
            target.to_string()
        } else {
            let host = self.req.headers().get("host").unwrap_or("localhost");
            format!("http://{}{}", host, target)
        };
        let parsed = Url::parse(&absolute)?;
        Ok(self.url.get_or_init(|| parsed))
    }

    /// Query parameters decoded from the URL search string.
    ///
    /// Duplicate names resolve to the last value.
    pub fn query_params(&self) -> AHashMap<String, String> {
        match self.req.query_string() {
            Some(query) => url::form_urlencoded::parse(query.as_bytes())
                .map(|(key, value)| (key.into_owned(), value.into_owned()))
                .collect(),
            None => AHashMap::new(),
        }
    }

    /// Rewrites the request target, invalidating the cached URL.
    ///
    /// Used by sub-app mounting to strip the base path before delegation.
    pub(crate) fn set_target(&mut self, target: String) {
        self.req.set_target(target);
        self.url = OnceLock::new();
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("req", &self.req)
            .field("res", &self.res)
            .field("context", &self.context)
            .finish()
    }
}
