#[cfg(test)]
mod middleware_tests {
    use crate::app::{App, RouteOptions};
    use crate::error::HttpError;
    use crate::middlewares::{MiddlewareOptions, middleware, middleware_with};
    use crate::response::Reply;
    use crate::types::HttpMethod;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_middleware_runs_in_registration_order() {
        let mut app = App::new();
        app.use_middleware(|mut event| async move {
            event.context.set("trail", json!("a"));
            (event, Ok(None))
        });
        app.use_middleware(|mut event| async move {
            let trail = event
                .context
                .get("trail")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            event.context.set("trail", json!(format!("{}b", trail)));
            (event, Ok(None))
        });
        app.get("/trail", |event: crate::event::Event| async move {
            let trail = event
                .context
                .get("trail")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            (event, Ok(Reply::Text(trail)))
        })
        .unwrap();

        let app = Arc::new(app);
        let mut response = app.request(HttpMethod::GET, "/trail", None).await;
        assert_eq!(response.body_text().await, "ab");
    }

    #[tokio::test]
    async fn test_middleware_short_circuits_with_value() {
        let mut app = App::new();
        app.use_middleware(|event| async move {
            (event, Ok(Some(Reply::text("intercepted"))))
        });
        app.get("/never", |event| async move {
            (event, Ok(Reply::text("handler")))
        })
        .unwrap();

        let app = Arc::new(app);
        let mut response = app.request(HttpMethod::GET, "/never", None).await;
        assert_eq!(response.body_text().await, "intercepted");
    }

    #[tokio::test]
    async fn test_middleware_error_skips_handler() {
        let mut app = App::new();
        app.use_middleware(|event| async move {
            (event, Err(HttpError::forbidden("no entry")))
        });
        app.get("/guarded", |event| async move {
            (event, Ok(Reply::text("handler")))
        })
        .unwrap();

        let app = Arc::new(app);
        let response = app.request(HttpMethod::GET, "/guarded", None).await;
        assert_eq!(response.status, 403);
    }

    #[tokio::test]
    async fn test_wrap_middleware_observes_downstream_mutations() {
        let mut app = App::new();
        app.use_wrap(|event, next| async move {
            let (mut event, outcome) = next.run(event).await;
            let marker = event
                .context
                .get("marker")
                .and_then(|v| v.as_str())
                .unwrap_or("missing")
                .to_string();
            event.res.set_header("x-marker", &marker);
            (event, outcome)
        });
        app.get("/wrapped", |mut event: crate::event::Event| async move {
            event.context.set("marker", json!("from-handler"));
            (event, Ok(Reply::text("done")))
        })
        .unwrap();

        let app = Arc::new(app);
        let response = app.request(HttpMethod::GET, "/wrapped", None).await;
        assert_eq!(response.header("x-marker"), Some("from-handler"));
    }

    #[tokio::test]
    async fn test_wrap_middleware_can_short_circuit() {
        let mut app = App::new();
        app.use_wrap(|event, _next| async move {
            // Never calls next: the chain ends here.
            (event, Ok(Reply::text("blocked")))
        });
        app.get("/blocked", |event| async move {
            (event, Ok(Reply::text("handler")))
        })
        .unwrap();

        let app = Arc::new(app);
        let mut response = app.request(HttpMethod::GET, "/blocked", None).await;
        assert_eq!(response.body_text().await, "blocked");
    }

    #[tokio::test]
    async fn test_route_scoped_middleware_runs_after_global() {
        let mut app = App::new();
        app.use_middleware(|mut event| async move {
            event.context.set("order", json!("global"));
            (event, Ok(None))
        });
        app.on_with(
            Some(HttpMethod::GET),
            "/scoped",
            |event: crate::event::Event| async move {
                let order = event
                    .context
                    .get("order")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();
                (event, Ok(Reply::Text(order)))
            },
            RouteOptions {
                middleware: vec![middleware(|mut event| async move {
                    let order = event
                        .context
                        .get("order")
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .to_string();
                    event.context.set("order", json!(format!("{},route", order)));
                    (event, Ok(None))
                })],
                ..Default::default()
            },
        )
        .unwrap();

        let app = Arc::new(app);
        let mut response = app.request(HttpMethod::GET, "/scoped", None).await;
        assert_eq!(response.body_text().await, "global,route");
    }

    #[tokio::test]
    async fn test_route_constrained_middleware_is_skipped_silently() {
        let mut app = App::new();
        app.use_on("/api/**", |mut event| async move {
            event.res.set_header("x-api", "1");
            (event, Ok(None))
        });
        app.get("/api/users", |event| async move { (event, Ok(Reply::text("api"))) })
            .unwrap();
        app.get("/web", |event| async move { (event, Ok(Reply::text("web"))) })
            .unwrap();

        let app = Arc::new(app);
        let api_response = app.request(HttpMethod::GET, "/api/users", None).await;
        assert_eq!(api_response.header("x-api"), Some("1"));

        let web_response = app.request(HttpMethod::GET, "/web", None).await;
        assert_eq!(web_response.header("x-api"), None);
    }

    #[tokio::test]
    async fn test_middleware_route_pattern_captures_params() {
        let mut app = App::new();
        app.use_on("/tenants/:tenant/**", |mut event| async move {
            let tenant = event
                .context
                .middleware_params
                .get("tenant")
                .unwrap_or("")
                .to_string();
            event.res.set_header("x-tenant", &tenant);
            (event, Ok(None))
        });
        app.get("/tenants/:tenant/dashboard", |event| async move {
            (event, Ok(Reply::text("dash")))
        })
        .unwrap();

        let app = Arc::new(app);
        let response = app
            .request(HttpMethod::GET, "/tenants/acme/dashboard", None)
            .await;
        assert_eq!(response.header("x-tenant"), Some("acme"));
    }

    #[tokio::test]
    async fn test_method_constrained_middleware() {
        let mut app = App::new();
        app.use_entry(middleware_with(
            MiddlewareOptions {
                method: Some(HttpMethod::POST),
                ..Default::default()
            },
            |mut event| async move {
                event.res.set_header("x-write", "1");
                (event, Ok(None))
            },
        ));
        app.all("/resource", |event| async move { (event, Ok(Reply::text("r"))) })
            .unwrap();

        let app = Arc::new(app);
        let post = app.request(HttpMethod::POST, "/resource", None).await;
        assert_eq!(post.header("x-write"), Some("1"));

        let get = app.request(HttpMethod::GET, "/resource", None).await;
        assert_eq!(get.header("x-write"), None);
    }

    #[tokio::test]
    async fn test_predicate_constrained_middleware() {
        let mut app = App::new();
        app.use_entry(middleware_with(
            MiddlewareOptions {
                predicate: Some(Arc::new(|event| {
                    event.req.headers().has("x-feature")
                })),
                ..Default::default()
            },
            |mut event| async move {
                event.res.set_header("x-flagged", "1");
                (event, Ok(None))
            },
        ));
        app.get("/feature", |event| async move { (event, Ok(Reply::text("f"))) })
            .unwrap();

        let app = Arc::new(app);
        let plain = app.request(HttpMethod::GET, "/feature", None).await;
        assert_eq!(plain.header("x-flagged"), None);

        let init = crate::app::RequestInit::new().header("x-feature", "on");
        let flagged = app.request(HttpMethod::GET, "/feature", Some(init)).await;
        assert_eq!(flagged.header("x-flagged"), Some("1"));
    }

    #[tokio::test]
    async fn test_wrap_middleware_converts_errors_locally() {
        let mut app = App::new();
        app.use_wrap(|event, next| async move {
            let (event, outcome) = next.run(event).await;
            match outcome {
                Err(error) if error.status == 404 => {
                    (event, Ok(Reply::text("custom not found")))
                }
                other => (event, other),
            }
        });
        app.get("/gone", |event| async move {
            let error: HttpError = HttpError::not_found("gone for good");
            (event, Err(error))
        })
        .unwrap();

        let app = Arc::new(app);
        let mut response = app.request(HttpMethod::GET, "/gone", None).await;
        assert_eq!(response.status, 200);
        assert_eq!(response.body_text().await, "custom not found");
    }
}
