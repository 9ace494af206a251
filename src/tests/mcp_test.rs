#[cfg(test)]
mod mcp_tests {
    use crate::app::{App, RequestInit};
    use crate::rpc::mcp::{
        LATEST_PROTOCOL_VERSION, McpPrompt, McpResource, McpServerOptions, McpTool, mcp_handler,
        text_content,
    };
    use crate::types::HttpMethod;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn mcp_app() -> Arc<App> {
        let mut options = McpServerOptions::new("test-server", "0.1.0");
        options.title("Test Server");
        options.instructions("Call greet to be greeted.");
        options.tool(McpTool::new(
            "greet",
            Some("Greets the caller"),
            json!({
                "type": "object",
                "properties": { "name": { "type": "string" } }
            }),
            |arguments| async move {
                let name = arguments
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("world")
                    .to_string();
                Ok(text_content(&format!("Hello, {}!", name)))
            },
        ));
        options.resource(McpResource::new(
            "file:///readme",
            "readme",
            Some("Project readme"),
            Some("text/plain"),
            || async move {
                Ok(json!({
                    "contents": [
                        { "uri": "file:///readme", "text": "hello" }
                    ]
                }))
            },
        ));
        options.prompt(McpPrompt::new(
            "review",
            Some("Code review prompt"),
            Some(json!([{ "name": "file", "required": true }])),
            |arguments| async move {
                let file = arguments
                    .get("file")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string();
                Ok(json!({
                    "messages": [
                        {
                            "role": "user",
                            "content": { "type": "text", "text": format!("Review {}", file) }
                        }
                    ]
                }))
            },
        ));

        let mut app = App::new();
        app.all("/mcp", mcp_handler(options)).unwrap();
        Arc::new(app)
    }

    async fn call(app: &Arc<App>, body: Value) -> Value {
        let init = RequestInit::new().body(body.to_string());
        let mut response = app.request(HttpMethod::POST, "/mcp", Some(init)).await;
        response.body_json().await.unwrap()
    }

    #[tokio::test]
    async fn test_initialize() {
        let app = mcp_app();
        let body = call(
            &app,
            json!({ "jsonrpc": "2.0", "method": "initialize", "params": {}, "id": 1 }),
        )
        .await;

        let result = &body["result"];
        assert_eq!(result["protocolVersion"], json!(LATEST_PROTOCOL_VERSION));
        assert_eq!(result["serverInfo"]["name"], json!("test-server"));
        assert_eq!(result["serverInfo"]["version"], json!("0.1.0"));
        assert_eq!(result["serverInfo"]["title"], json!("Test Server"));
        assert_eq!(result["instructions"], json!("Call greet to be greeted."));
        // One of each collection is registered, so all flags are present.
        assert!(result["capabilities"].get("tools").is_some());
        assert!(result["capabilities"].get("resources").is_some());
        assert!(result["capabilities"].get("prompts").is_some());
    }

    #[tokio::test]
    async fn test_capability_flags_reflect_empty_collections() {
        let options = McpServerOptions::new("bare", "0.0.1");
        let mut app = App::new();
        app.all("/mcp", mcp_handler(options)).unwrap();
        let app = Arc::new(app);

        let body = call(
            &app,
            json!({ "jsonrpc": "2.0", "method": "initialize", "id": 1 }),
        )
        .await;

        let capabilities = &body["result"]["capabilities"];
        assert!(capabilities.get("tools").is_none());
        assert!(capabilities.get("resources").is_none());
        assert!(capabilities.get("prompts").is_none());
    }

    #[tokio::test]
    async fn test_ping() {
        let app = mcp_app();
        let body = call(&app, json!({ "jsonrpc": "2.0", "method": "ping", "id": 2 })).await;
        assert_eq!(body["result"], json!({}));
    }

    #[tokio::test]
    async fn test_initialized_notification_has_no_response() {
        let app = mcp_app();
        let init = RequestInit::new().body(
            json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }).to_string(),
        );
        let mut response = app.request(HttpMethod::POST, "/mcp", Some(init)).await;

        assert_eq!(response.status, 202);
        assert!(response.body_bytes().await.is_empty());
    }

    #[tokio::test]
    async fn test_tools_list_and_call() {
        let app = mcp_app();

        let listed = call(
            &app,
            json!({ "jsonrpc": "2.0", "method": "tools/list", "id": 3 }),
        )
        .await;
        let tools = listed["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], json!("greet"));
        assert!(tools[0]["inputSchema"].is_object());

        let called = call(
            &app,
            json!({
                "jsonrpc": "2.0",
                "method": "tools/call",
                "params": { "name": "greet", "arguments": { "name": "Ada" } },
                "id": 4
            }),
        )
        .await;
        assert_eq!(
            called["result"]["content"][0]["text"],
            json!("Hello, Ada!")
        );
    }

    #[tokio::test]
    async fn test_unknown_tool_maps_to_not_found_code() {
        let app = mcp_app();
        let body = call(
            &app,
            json!({
                "jsonrpc": "2.0",
                "method": "tools/call",
                "params": { "name": "missing" },
                "id": 5
            }),
        )
        .await;
        assert_eq!(body["error"]["code"], json!(-32004));
    }

    #[tokio::test]
    async fn test_resources_list_and_read() {
        let app = mcp_app();

        let listed = call(
            &app,
            json!({ "jsonrpc": "2.0", "method": "resources/list", "id": 6 }),
        )
        .await;
        let resources = listed["result"]["resources"].as_array().unwrap();
        assert_eq!(resources[0]["uri"], json!("file:///readme"));
        assert_eq!(resources[0]["mimeType"], json!("text/plain"));

        let read = call(
            &app,
            json!({
                "jsonrpc": "2.0",
                "method": "resources/read",
                "params": { "uri": "file:///readme" },
                "id": 7
            }),
        )
        .await;
        assert_eq!(read["result"]["contents"][0]["text"], json!("hello"));
    }

    #[tokio::test]
    async fn test_prompts_list_and_get() {
        let app = mcp_app();

        let listed = call(
            &app,
            json!({ "jsonrpc": "2.0", "method": "prompts/list", "id": 8 }),
        )
        .await;
        assert_eq!(
            listed["result"]["prompts"][0]["name"],
            json!("review")
        );

        let got = call(
            &app,
            json!({
                "jsonrpc": "2.0",
                "method": "prompts/get",
                "params": { "name": "review", "arguments": { "file": "main.rs" } },
                "id": 9
            }),
        )
        .await;
        assert_eq!(
            got["result"]["messages"][0]["content"]["text"],
            json!("Review main.rs")
        );
    }

    #[tokio::test]
    async fn test_lazy_entries_resolve_once() {
        static RESOLUTIONS: AtomicUsize = AtomicUsize::new(0);

        let mut options = McpServerOptions::new("lazy", "0.0.1");
        options.lazy_tool(|| {
            RESOLUTIONS.fetch_add(1, Ordering::SeqCst);
            McpTool::new("late", None, json!({ "type": "object" }), |_| async move {
                Ok(text_content("late"))
            })
        });

        let mut app = App::new();
        app.all("/mcp", mcp_handler(options)).unwrap();
        let app = Arc::new(app);

        for id in 0..3 {
            call(
                &app,
                json!({ "jsonrpc": "2.0", "method": "tools/list", "id": id }),
            )
            .await;
        }

        assert_eq!(RESOLUTIONS.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_supported_protocol_version_header() {
        let app = mcp_app();
        let init = RequestInit::new()
            .header("mcp-protocol-version", "2025-03-26")
            .body(json!({ "jsonrpc": "2.0", "method": "ping", "id": 1 }).to_string());
        let response = app.request(HttpMethod::POST, "/mcp", Some(init)).await;
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_unsupported_protocol_version_is_rejected() {
        let app = mcp_app();
        let init = RequestInit::new()
            .header("mcp-protocol-version", "1999-01-01")
            .body(json!({ "jsonrpc": "2.0", "method": "ping", "id": 1 }).to_string());
        let response = app.request(HttpMethod::POST, "/mcp", Some(init)).await;
        assert_eq!(response.status, 400);
    }

    #[tokio::test]
    async fn test_delete_acknowledges_session_teardown() {
        let app = mcp_app();
        let response = app.request(HttpMethod::DELETE, "/mcp", None).await;
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_other_methods_are_rejected_with_allow_header() {
        let app = mcp_app();
        let response = app.request(HttpMethod::GET, "/mcp", None).await;

        assert_eq!(response.status, 405);
        assert_eq!(response.header("allow"), Some("POST, DELETE"));
    }
}
