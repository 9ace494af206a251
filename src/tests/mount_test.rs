#[cfg(test)]
mod mount_tests {
    use crate::app::App;
    use crate::response::Reply;
    use crate::types::HttpMethod;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_mounted_app_sees_stripped_path() {
        let mut api = App::new();
        api.get("/status", |event: crate::event::Event| async move {
            let path = event.path().to_string();
            (event, Ok(Reply::Json(json!({ "path": path }))))
        })
        .unwrap();

        let mut app = App::new();
        app.mount("/api", api);

        let app = Arc::new(app);
        let mut response = app.request(HttpMethod::GET, "/api/status", None).await;

        assert_eq!(response.status, 200);
        assert_eq!(
            response.body_json().await.unwrap(),
            json!({ "path": "/status" })
        );
    }

    #[tokio::test]
    async fn test_mount_base_is_recorded() {
        let mut sub = App::new();
        sub.get("/whoami", |event: crate::event::Event| async move {
            let base = event.context.mount_base.clone().unwrap_or_default();
            (event, Ok(Reply::Text(base)))
        })
        .unwrap();

        let mut app = App::new();
        app.mount("/nested", sub);

        let app = Arc::new(app);
        let mut response = app.request(HttpMethod::GET, "/nested/whoami", None).await;
        assert_eq!(response.body_text().await, "/nested");
    }

    #[tokio::test]
    async fn test_exact_base_path_maps_to_root() {
        let mut sub = App::new();
        sub.get("/", |event| async move { (event, Ok(Reply::text("sub root"))) })
            .unwrap();

        let mut app = App::new();
        app.mount("/svc", sub);

        let app = Arc::new(app);
        let mut response = app.request(HttpMethod::GET, "/svc", None).await;
        assert_eq!(response.body_text().await, "sub root");
    }

    #[tokio::test]
    async fn test_query_string_survives_mounting() {
        let mut sub = App::new();
        sub.get("/search", |event: crate::event::Event| async move {
            let q = event
                .query_params()
                .get("q")
                .cloned()
                .unwrap_or_default();
            (event, Ok(Reply::Text(q)))
        })
        .unwrap();

        let mut app = App::new();
        app.mount("/v1", sub);

        let app = Arc::new(app);
        let mut response = app
            .request(HttpMethod::GET, "/v1/search?q=needle", None)
            .await;
        assert_eq!(response.body_text().await, "needle");
    }

    #[tokio::test]
    async fn test_sub_app_hooks_apply() {
        let mut sub = App::new();
        sub.get("/hooked", |event| async move { (event, Ok(Reply::text("sub"))) })
            .unwrap();
        sub.on_response(|mut response, event| async move {
            response.set_header("x-sub-hook", "1");
            (event, response)
        });

        let mut app = App::new();
        app.mount("/m", sub);

        let app = Arc::new(app);
        let response = app.request(HttpMethod::GET, "/m/hooked", None).await;
        assert_eq!(response.header("x-sub-hook"), Some("1"));
    }

    #[tokio::test]
    async fn test_miss_inside_sub_app_is_404() {
        let sub = App::new();
        let mut app = App::new();
        app.mount("/empty", sub);

        let app = Arc::new(app);
        let response = app.request(HttpMethod::GET, "/empty/nothing", None).await;
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_paths_outside_base_are_not_delegated() {
        let mut sub = App::new();
        sub.get("/inside", |event| async move { (event, Ok(Reply::text("sub"))) })
            .unwrap();

        let mut app = App::new();
        app.mount("/api", sub);
        app.get("/apiarist", |event| async move {
            (event, Ok(Reply::text("beekeeper")))
        })
        .unwrap();

        let app = Arc::new(app);
        let mut response = app.request(HttpMethod::GET, "/apiarist", None).await;
        assert_eq!(response.body_text().await, "beekeeper");
    }

    #[tokio::test]
    async fn test_parent_middleware_runs_before_delegation() {
        let mut sub = App::new();
        sub.get("/deep", |event: crate::event::Event| async move {
            let tagged = event.context.get("tag").cloned().unwrap_or(json!(null));
            (event, Ok(Reply::Json(tagged)))
        })
        .unwrap();

        let mut app = App::new();
        app.use_middleware(|mut event| async move {
            event.context.set("tag", json!("parent"));
            (event, Ok(None))
        });
        app.mount("/sub", sub);

        let app = Arc::new(app);
        let mut response = app.request(HttpMethod::GET, "/sub/deep", None).await;
        assert_eq!(response.body_json().await.unwrap(), json!("parent"));
    }
}
