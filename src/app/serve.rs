//! The bundled native transport: a TCP accept loop feeding hyper, with
//! HTTP/1.1 + HTTP/2 negotiation and optional graceful shutdown.
//!
//! The engine itself is transport-neutral ([`App::handle`] and
//! [`App::request`] never touch a socket); this module is the adapter most
//! embedders will use.

use crate::app::App;
use crate::event::Event;
use crate::req::RequestHandle;
use crate::req::request_headers::RequestHeaders;
use crate::types::{ByteStream, HttpMethod};
use futures::StreamExt;
use http_body_util::BodyStream;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::{Builder, Http2Builder};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// HTTP/2 tuning knobs for [`App::listen`].
///
/// Every `Option` field maps onto the matching setter of Hyper's HTTP/2
/// connection builder; `None` leaves Hyper's default in place. Most
/// deployments only ever touch `max_concurrent_streams` and the
/// keep-alive timings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Http2Config {
    /// Accept HTTP/2 exclusively on this listener instead of negotiating
    /// the protocol per connection.
    pub http2_only: bool,
    /// Cap on concurrent streams per connection.
    pub max_concurrent_streams: Option<u32>,
    /// Initial per-stream flow-control window, in bytes.
    pub initial_stream_window_size: Option<u32>,
    /// Initial per-connection flow-control window, in bytes.
    pub initial_connection_window_size: Option<u32>,
    /// Let Hyper resize flow-control windows adaptively.
    pub adaptive_window: Option<bool>,
    /// Largest HTTP/2 frame the server will accept, in bytes.
    pub max_frame_size: Option<u32>,
    /// Largest header list the server will accept, in octets.
    pub max_header_list_size: Option<u32>,
    /// How often to send keep-alive PING frames.
    pub keep_alive_interval: Option<Duration>,
    /// How long to wait for a PING ACK before closing the connection.
    pub keep_alive_timeout: Option<Duration>,
}

impl Http2Config {
    /// Copies every set knob onto Hyper's HTTP/2 builder.
    fn apply(&self, h2: &mut Http2Builder<'_, TokioExecutor>) {
        if let Some(value) = self.max_concurrent_streams {
            h2.max_concurrent_streams(value);
        }
        if let Some(value) = self.initial_stream_window_size {
            h2.initial_stream_window_size(value);
        }
        if let Some(value) = self.initial_connection_window_size {
            h2.initial_connection_window_size(value);
        }
        if let Some(value) = self.adaptive_window {
            h2.adaptive_window(value);
        }
        if let Some(value) = self.max_frame_size {
            h2.max_frame_size(value);
        }
        if let Some(value) = self.max_header_list_size {
            h2.max_header_list_size(value);
        }
        if let Some(value) = self.keep_alive_interval {
            h2.keep_alive_interval(value);
        }
        if let Some(value) = self.keep_alive_timeout {
            h2.keep_alive_timeout(value);
        }
    }
}

impl App {
    /// Starts the HTTP server and begins listening for incoming requests.
    ///
    /// The engine is frozen into an [`Arc`] before serving starts, so route
    /// and middleware tables cannot change underneath in-flight requests.
    /// Each accepted connection is served on its own tokio task; requests
    /// on a connection run through [`App::handle`].
    ///
    /// # Arguments
    ///
    /// * `port` - The port number to listen on
    /// * `cb` - Invoked once the listener is bound and accepting
    ///
    /// # Example
    ///
    /// ```no_run
    /// use trellis::app::App;
    /// use trellis::response::Reply;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let mut app = App::new();
    ///     app.get("/health", |event| async move {
    ///         (event, Ok(Reply::json(&serde_json::json!({"status": "healthy"})).unwrap()))
    ///     })
    ///     .unwrap();
    ///
    ///     app.listen(3000, || {
    ///         println!("Server running on http://localhost:3000");
    ///     })
    ///     .await;
    /// }
    /// ```
    pub async fn listen<F: FnOnce()>(self, port: u16, cb: F) {
        let host = self.host.clone();
        let http2_enabled = self.http2;
        let http2_config = self.http2_config.clone();
        let graceful_shutdown = self.graceful_shutdown;
        let app = Arc::new(self);

        let addr = match format!("{}:{}", host, port).parse::<SocketAddr>() {
            Ok(addr) => addr,
            Err(error) => {
                tracing::error!(%host, port, %error, "invalid listen address");
                return;
            }
        };

        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(error) => {
                tracing::error!(%addr, %error, "error binding to address");
                return;
            }
        };

        cb();

        let mut shutdown = if graceful_shutdown {
            Some(Box::pin(tokio::signal::ctrl_c()))
        } else {
            None
        };

        loop {
            let accept_result = if let Some(ref mut signal) = shutdown {
                tokio::select! {
                    result = listener.accept() => Some(result),
                    _ = signal.as_mut() => None,
                }
            } else {
                Some(listener.accept().await)
            };

            match accept_result {
                Some(Ok((stream, remote))) => {
                    let app = Arc::clone(&app);
                    let http2_config = http2_config.clone();

                    tokio::task::spawn(async move {
                        Self::handle_connection(stream, remote, app, http2_enabled, http2_config)
                            .await;
                    });
                }
                Some(Err(error)) => {
                    tracing::error!(%error, "error accepting connection");
                }
                None => {
                    // Shutdown signal received
                    break;
                }
            }
        }
    }

    /// Serves one accepted connection.
    ///
    /// Three shapes, picked from the engine configuration: HTTP/1.1 only,
    /// HTTP/2 only, or both negotiated per connection (the default). The
    /// same request service backs all of them.
    async fn handle_connection(
        stream: tokio::net::TcpStream,
        remote: SocketAddr,
        app: Arc<App>,
        http2_enabled: bool,
        http2_config: Option<Http2Config>,
    ) {
        let service = service_fn(move |req: hyper::Request<Incoming>| {
            let app = Arc::clone(&app);
            async move {
                let event = event_from_hyper(req, remote);
                let response = app.handle(event).await;
                Ok::<_, std::convert::Infallible>(response.into_hyper())
            }
        });

        let io = TokioIo::new(stream);

        if !http2_enabled {
            let mut builder = http1::Builder::new();
            builder.keep_alive(true);
            if let Err(error) = builder.serve_connection(io, service).with_upgrades().await {
                tracing::error!(%error, "error serving connection");
            }
            return;
        }

        let http2_only = http2_config
            .as_ref()
            .is_some_and(|config| config.http2_only);

        let mut builder = Builder::new(TokioExecutor::new());
        builder.http1().keep_alive(true);
        {
            let mut h2 = builder.http2();
            if let Some(config) = &http2_config {
                config.apply(&mut h2);
            }
            h2.enable_connect_protocol();

            if http2_only {
                if let Err(error) = h2.serve_connection(io, service).await {
                    tracing::error!(%error, "error serving connection");
                }
                return;
            }
        }

        if let Err(error) = builder.serve_connection_with_upgrades(io, service).await {
            tracing::error!(%error, "error serving connection");
        }
    }
}

fn event_from_hyper(req: hyper::Request<Incoming>, remote: SocketAddr) -> Event {
    let (parts, body) = req.into_parts();

    let method = HttpMethod::from(&parts.method);
    let target = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| String::from("/"));
    let headers = RequestHeaders::from(parts.headers);

    let stream: ByteStream = Box::pin(BodyStream::new(body).filter_map(|result| async move {
        match result {
            Ok(frame) => frame.into_data().ok().map(Ok),
            Err(error) => Some(Err(std::io::Error::other(error))),
        }
    }));

    let mut event = Event::new(RequestHandle::from_stream(method, target, headers, stream));
    event.context.client_address = Some(remote.to_string());
    event
}
