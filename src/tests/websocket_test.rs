#[cfg(test)]
mod websocket_tests {
    use crate::app::App;
    use crate::types::HttpMethod;
    use crate::websocket::{WebSocketHooks, define_websocket_handler};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_upgrade_marker_response() {
        let mut hooks = WebSocketHooks::new();
        hooks.on_message(|_peer, _message| {});

        let mut app = App::new();
        app.get("/ws", define_websocket_handler(hooks)).unwrap();

        let app = Arc::new(app);
        let response = app.request(HttpMethod::GET, "/ws", None).await;

        assert_eq!(response.status, 426);
        assert_eq!(response.header("upgrade"), Some("websocket"));

        let hooks = response.websocket.expect("hooks must ride on the response");
        assert!(hooks.message.is_some());
        assert!(hooks.open.is_none());
    }

    #[tokio::test]
    async fn test_hooks_are_callable_by_an_adapter() {
        static MESSAGES: AtomicUsize = AtomicUsize::new(0);

        let mut hooks = WebSocketHooks::new();
        hooks.on_message(|_peer, _message| {
            MESSAGES.fetch_add(1, Ordering::SeqCst);
        });
        hooks.on_upgrade(|peer| peer == "allowed-peer");

        let mut app = App::new();
        app.get("/ws", define_websocket_handler(hooks)).unwrap();

        let app = Arc::new(app);
        let response = app.request(HttpMethod::GET, "/ws", None).await;
        let hooks = response.websocket.unwrap();

        // Simulate what a transport adapter would do after the upgrade.
        let gate = hooks.upgrade.as_ref().unwrap();
        assert!(gate("allowed-peer"));
        assert!(!gate("stranger"));

        let on_message = hooks.message.as_ref().unwrap();
        on_message("allowed-peer", "hello");
        on_message("allowed-peer", "again");
        assert_eq!(MESSAGES.load(Ordering::SeqCst), 2);
    }
}
