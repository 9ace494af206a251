//! # Model Context Protocol Server
//!
//! An MCP server surface built on the JSON-RPC dispatcher: `initialize`,
//! `ping`, `notifications/initialized`, and the tools / resources /
//! prompts method families. Collections may be *lazy* — any entry can be a
//! factory producing the entry — and are resolved exactly once, on first
//! use.
//!
//! Only HTTP POST and DELETE are accepted: POST carries JSON-RPC traffic,
//! DELETE acknowledges client-side session teardown with a 200, anything
//! else is a 405 with `Allow: POST, DELETE`. A client-sent
//! `mcp-protocol-version` header is validated against the supported set.
//!
//! ## Basic Usage
//!
//! ```no_run
//! use trellis::app::App;
//! use trellis::rpc::mcp::{McpServerOptions, McpTool, mcp_handler, text_content};
//! use serde_json::json;
//!
//! let mut options = McpServerOptions::new("demo-server", "1.0.0");
//! options.tool(McpTool::new(
//!     "greet",
//!     Some("Greets the caller"),
//!     json!({ "type": "object", "properties": { "name": { "type": "string" } } }),
//!     |arguments| async move {
//!         let name = arguments
//!             .get("name")
//!             .and_then(|v| v.as_str())
//!             .unwrap_or("world")
//!             .to_string();
//!         Ok(text_content(&format!("Hello, {}!", name)))
//!     },
//! ));
//!
//! let mut app = App::new();
//! app.all("/mcp", mcp_handler(options)).unwrap();
//! ```

#![warn(missing_docs)]

use crate::error::HttpError;
use crate::event::Event;
use crate::response::{Reply, Response};
use crate::rpc::jsonrpc::{RpcRouter, dispatch_http};
use crate::types::{Handler, HttpMethod, box_step};
use serde_json::{Value, json};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};

/// Protocol versions this server accepts from clients.
pub const SUPPORTED_PROTOCOL_VERSIONS: [&str; 2] = ["2025-06-18", "2025-03-26"];

/// The version negotiated in the `initialize` response.
pub const LATEST_PROTOCOL_VERSION: &str = "2025-06-18";

type McpFuture = Pin<Box<dyn Future<Output = Result<Value, HttpError>> + Send>>;
type ToolHandler = Arc<dyn Fn(Value) -> McpFuture + Send + Sync>;
type ResourceReader = Arc<dyn Fn() -> McpFuture + Send + Sync>;
type PromptBuilder = Arc<dyn Fn(Value) -> McpFuture + Send + Sync>;

/// An entry that is either ready or produced on demand by a factory.
///
/// Factories run once; the resolved collections are cached for the life of
/// the server.
pub enum McpLazy<T> {
    /// An already-built entry.
    Ready(T),
    /// A factory producing the entry on first resolution.
    Lazy(Box<dyn Fn() -> T + Send + Sync>),
}

impl<T: Clone> McpLazy<T> {
    fn resolve(&self) -> T {
        match self {
            McpLazy::Ready(entry) => entry.clone(),
            McpLazy::Lazy(factory) => factory(),
        }
    }
}

/// A callable tool.
#[derive(Clone)]
pub struct McpTool {
    /// Tool name, unique within the server.
    pub name: String,
    /// Human-readable description.
    pub description: Option<String>,
    /// JSON schema describing the tool's arguments.
    pub input_schema: Value,
    handler: ToolHandler,
}

impl McpTool {
    /// Builds a tool from its metadata and an async handler taking the
    /// call arguments.
    pub fn new<F, Fut>(
        name: &str,
        description: Option<&str>,
        input_schema: Value,
        handler: F,
    ) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, HttpError>> + Send + 'static,
    {
        Self {
            name: name.to_string(),
            description: description.map(|d| d.to_string()),
            input_schema,
            handler: Arc::new(move |arguments| Box::pin(handler(arguments))),
        }
    }
}

/// A readable resource.
#[derive(Clone)]
pub struct McpResource {
    /// Resource URI, unique within the server.
    pub uri: String,
    /// Display name.
    pub name: String,
    /// Human-readable description.
    pub description: Option<String>,
    /// MIME type of the contents.
    pub mime_type: Option<String>,
    reader: ResourceReader,
}

impl McpResource {
    /// Builds a resource from its metadata and an async reader producing
    /// the `contents` payload.
    pub fn new<F, Fut>(
        uri: &str,
        name: &str,
        description: Option<&str>,
        mime_type: Option<&str>,
        reader: F,
    ) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, HttpError>> + Send + 'static,
    {
        Self {
            uri: uri.to_string(),
            name: name.to_string(),
            description: description.map(|d| d.to_string()),
            mime_type: mime_type.map(|m| m.to_string()),
            reader: Arc::new(move || Box::pin(reader())),
        }
    }
}

/// A retrievable prompt template.
#[derive(Clone)]
pub struct McpPrompt {
    /// Prompt name, unique within the server.
    pub name: String,
    /// Human-readable description.
    pub description: Option<String>,
    /// Argument descriptors, advertised verbatim in `prompts/list`.
    pub arguments: Option<Value>,
    builder: PromptBuilder,
}

impl McpPrompt {
    /// Builds a prompt from its metadata and an async builder producing
    /// the `messages` payload for given arguments.
    pub fn new<F, Fut>(
        name: &str,
        description: Option<&str>,
        arguments: Option<Value>,
        builder: F,
    ) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, HttpError>> + Send + 'static,
    {
        Self {
            name: name.to_string(),
            description: description.map(|d| d.to_string()),
            arguments,
            builder: Arc::new(move |args| Box::pin(builder(args))),
        }
    }
}

/// Configuration for [`mcp_handler`].
pub struct McpServerOptions {
    /// Server name, reported by `initialize`.
    pub name: String,
    /// Server version, reported by `initialize`.
    pub version: String,
    /// Optional display title.
    pub title: Option<String>,
    /// Optional usage instructions for clients.
    pub instructions: Option<String>,
    tools: Vec<McpLazy<McpTool>>,
    resources: Vec<McpLazy<McpResource>>,
    prompts: Vec<McpLazy<McpPrompt>>,
}

impl McpServerOptions {
    /// Creates options for a server identified by name and version.
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            title: None,
            instructions: None,
            tools: Vec::new(),
            resources: Vec::new(),
            prompts: Vec::new(),
        }
    }

    /// Sets the display title.
    pub fn title(&mut self, title: &str) -> &mut Self {
        self.title = Some(title.to_string());
        self
    }

    /// Sets the usage instructions.
    pub fn instructions(&mut self, instructions: &str) -> &mut Self {
        self.instructions = Some(instructions.to_string());
        self
    }

    /// Adds a ready tool.
    pub fn tool(&mut self, tool: McpTool) -> &mut Self {
        self.tools.push(McpLazy::Ready(tool));
        self
    }

    /// Adds a lazily produced tool.
    pub fn lazy_tool<F: Fn() -> McpTool + Send + Sync + 'static>(&mut self, factory: F) -> &mut Self {
        self.tools.push(McpLazy::Lazy(Box::new(factory)));
        self
    }

    /// Adds a ready resource.
    pub fn resource(&mut self, resource: McpResource) -> &mut Self {
        self.resources.push(McpLazy::Ready(resource));
        self
    }

    /// Adds a lazily produced resource.
    pub fn lazy_resource<F: Fn() -> McpResource + Send + Sync + 'static>(
        &mut self,
        factory: F,
    ) -> &mut Self {
        self.resources.push(McpLazy::Lazy(Box::new(factory)));
        self
    }

    /// Adds a ready prompt.
    pub fn prompt(&mut self, prompt: McpPrompt) -> &mut Self {
        self.prompts.push(McpLazy::Ready(prompt));
        self
    }

    /// Adds a lazily produced prompt.
    pub fn lazy_prompt<F: Fn() -> McpPrompt + Send + Sync + 'static>(
        &mut self,
        factory: F,
    ) -> &mut Self {
        self.prompts.push(McpLazy::Lazy(Box::new(factory)));
        self
    }
}

struct Resolved {
    tools: Vec<McpTool>,
    resources: Vec<McpResource>,
    prompts: Vec<McpPrompt>,
}

struct McpServer {
    options: McpServerOptions,
    resolved: OnceLock<Resolved>,
}

impl McpServer {
    fn resolved(&self) -> &Resolved {
        self.resolved.get_or_init(|| Resolved {
            tools: self.options.tools.iter().map(McpLazy::resolve).collect(),
            resources: self
                .options
                .resources
                .iter()
                .map(McpLazy::resolve)
                .collect(),
            prompts: self.options.prompts.iter().map(McpLazy::resolve).collect(),
        })
    }

    fn initialize_result(&self) -> Value {
        let resolved = self.resolved();

        let mut server_info = json!({
            "name": self.options.name,
            "version": self.options.version,
        });
        if let Some(title) = &self.options.title {
            server_info["title"] = Value::String(title.clone());
        }

        // Capability flags are present iff the corresponding collection is
        // non-empty.
        let mut capabilities = json!({});
        if !resolved.tools.is_empty() {
            capabilities["tools"] = json!({});
        }
        if !resolved.resources.is_empty() {
            capabilities["resources"] = json!({});
        }
        if !resolved.prompts.is_empty() {
            capabilities["prompts"] = json!({});
        }

        let mut result = json!({
            "protocolVersion": LATEST_PROTOCOL_VERSION,
            "serverInfo": server_info,
            "capabilities": capabilities,
        });
        if let Some(instructions) = &self.options.instructions {
            result["instructions"] = Value::String(instructions.clone());
        }
        result
    }

    fn tools_list(&self) -> Value {
        let tools: Vec<Value> = self
            .resolved()
            .tools
            .iter()
            .map(|tool| {
                let mut entry = json!({
                    "name": tool.name,
                    "inputSchema": tool.input_schema,
                });
                if let Some(description) = &tool.description {
                    entry["description"] = Value::String(description.clone());
                }
                entry
            })
            .collect();
        json!({ "tools": tools })
    }

    fn resources_list(&self) -> Value {
        let resources: Vec<Value> = self
            .resolved()
            .resources
            .iter()
            .map(|resource| {
                let mut entry = json!({
                    "uri": resource.uri,
                    "name": resource.name,
                });
                if let Some(description) = &resource.description {
                    entry["description"] = Value::String(description.clone());
                }
                if let Some(mime_type) = &resource.mime_type {
                    entry["mimeType"] = Value::String(mime_type.clone());
                }
                entry
            })
            .collect();
        json!({ "resources": resources })
    }

    fn prompts_list(&self) -> Value {
        let prompts: Vec<Value> = self
            .resolved()
            .prompts
            .iter()
            .map(|prompt| {
                let mut entry = json!({ "name": prompt.name });
                if let Some(description) = &prompt.description {
                    entry["description"] = Value::String(description.clone());
                }
                if let Some(arguments) = &prompt.arguments {
                    entry["arguments"] = arguments.clone();
                }
                entry
            })
            .collect();
        json!({ "prompts": prompts })
    }
}

/// Builds the HTTP route handler for an MCP server.
pub fn mcp_handler(options: McpServerOptions) -> Handler {
    let server = Arc::new(McpServer {
        options,
        resolved: OnceLock::new(),
    });
    let rpc = Arc::new(build_rpc_router(Arc::clone(&server)));

    Arc::new(move |event: Event| {
        let rpc = Arc::clone(&rpc);
        box_step(async move {
            match event.method() {
                HttpMethod::POST => {
                    if let Some(version) = event.req.headers().get("mcp-protocol-version") {
                        if !SUPPORTED_PROTOCOL_VERSIONS.contains(&version) {
                            let error = HttpError::bad_request(format!(
                                "Unsupported MCP protocol version: {}",
                                version
                            ));
                            return (event, Err(error));
                        }
                    }
                    dispatch_http(&rpc, event).await
                }
                // Client-side session teardown; there is no server session
                // state to discard.
                HttpMethod::DELETE => (event, Ok(Reply::Response(Response::new(200)))),
                _ => {
                    let error = HttpError::method_not_allowed(
                        "MCP endpoints accept POST and DELETE only",
                        &["POST", "DELETE"],
                    );
                    (event, Err(error))
                }
            }
        })
    })
}

fn build_rpc_router(server: Arc<McpServer>) -> RpcRouter {
    let mut rpc = RpcRouter::new();

    {
        let server = Arc::clone(&server);
        rpc.method("initialize", move |_call, event| {
            let server = Arc::clone(&server);
            async move { (event, Ok(server.initialize_result())) }
        });
    }

    rpc.method("ping", |_call, event| async move { (event, Ok(json!({}))) });

    rpc.method("notifications/initialized", |_call, event| async move {
        (event, Ok(Value::Null))
    });

    {
        let server = Arc::clone(&server);
        rpc.method("tools/list", move |_call, event| {
            let server = Arc::clone(&server);
            async move { (event, Ok(server.tools_list())) }
        });
    }

    {
        let server = Arc::clone(&server);
        rpc.method("tools/call", move |call, event| {
            let server = Arc::clone(&server);
            async move {
                let params = call.params.unwrap_or(Value::Null);
                let Some(name) = params.get("name").and_then(Value::as_str) else {
                    return (
                        event,
                        Err(HttpError::bad_request("tools/call requires a tool name")),
                    );
                };
                let arguments = params
                    .get("arguments")
                    .cloned()
                    .unwrap_or_else(|| json!({}));

                let tool = server
                    .resolved()
                    .tools
                    .iter()
                    .find(|tool| tool.name == name)
                    .cloned();
                match tool {
                    Some(tool) => {
                        let outcome = (tool.handler)(arguments).await;
                        (event, outcome)
                    }
                    None => (
                        event,
                        Err(HttpError::not_found(format!("Unknown tool: {}", name))),
                    ),
                }
            }
        });
    }

    {
        let server = Arc::clone(&server);
        rpc.method("resources/list", move |_call, event| {
            let server = Arc::clone(&server);
            async move { (event, Ok(server.resources_list())) }
        });
    }

    {
        let server = Arc::clone(&server);
        rpc.method("resources/read", move |call, event| {
            let server = Arc::clone(&server);
            async move {
                let params = call.params.unwrap_or(Value::Null);
                let Some(uri) = params.get("uri").and_then(Value::as_str) else {
                    return (
                        event,
                        Err(HttpError::bad_request("resources/read requires a uri")),
                    );
                };

                let resource = server
                    .resolved()
                    .resources
                    .iter()
                    .find(|resource| resource.uri == uri)
                    .cloned();
                match resource {
                    Some(resource) => {
                        let outcome = (resource.reader)().await;
                        (event, outcome)
                    }
                    None => (
                        event,
                        Err(HttpError::not_found(format!("Unknown resource: {}", uri))),
                    ),
                }
            }
        });
    }

    {
        let server = Arc::clone(&server);
        rpc.method("prompts/list", move |_call, event| {
            let server = Arc::clone(&server);
            async move { (event, Ok(server.prompts_list())) }
        });
    }

    {
        let server = Arc::clone(&server);
        rpc.method("prompts/get", move |call, event| {
            let server = Arc::clone(&server);
            async move {
                let params = call.params.unwrap_or(Value::Null);
                let Some(name) = params.get("name").and_then(Value::as_str) else {
                    return (
                        event,
                        Err(HttpError::bad_request("prompts/get requires a prompt name")),
                    );
                };
                let arguments = params
                    .get("arguments")
                    .cloned()
                    .unwrap_or_else(|| json!({}));

                let prompt = server
                    .resolved()
                    .prompts
                    .iter()
                    .find(|prompt| prompt.name == name)
                    .cloned();
                match prompt {
                    Some(prompt) => {
                        let outcome = (prompt.builder)(arguments).await;
                        (event, outcome)
                    }
                    None => (
                        event,
                        Err(HttpError::not_found(format!("Unknown prompt: {}", name))),
                    ),
                }
            }
        });
    }

    rpc
}

/// Wraps plain text in the MCP tool-result content shape.
pub fn text_content(text: &str) -> Value {
    json!({
        "content": [
            { "type": "text", "text": text }
        ]
    })
}
