#[cfg(test)]
mod projector_tests {
    use crate::app::App;
    use crate::cookies::set_cookie;
    use crate::error::HttpError;
    use crate::response::{Reply, Response};
    use crate::types::HttpMethod;
    use bytes::Bytes;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_none_reply_has_empty_body_and_zero_length() {
        let mut app = App::new();
        app.get("/empty", |event| async move { (event, Ok(Reply::None)) })
            .unwrap();

        let app = Arc::new(app);
        let mut response = app.request(HttpMethod::GET, "/empty", None).await;

        assert_eq!(response.status, 200);
        assert_eq!(response.header("content-length"), Some("0"));
        assert!(response.body_bytes().await.is_empty());
    }

    #[tokio::test]
    async fn test_bytes_reply_sets_content_length() {
        let mut app = App::new();
        app.get("/bytes", |event| async move {
            (event, Ok(Reply::Bytes(Bytes::from_static(b"\x01\x02\x03"))))
        })
        .unwrap();

        let app = Arc::new(app);
        let mut response = app.request(HttpMethod::GET, "/bytes", None).await;

        assert_eq!(response.header("content-length"), Some("3"));
        assert_eq!(response.body_bytes().await, Bytes::from_static(b"\x01\x02\x03"));
    }

    #[tokio::test]
    async fn test_big_int_reply_is_decimal_json() {
        let mut app = App::new();
        app.get("/big", |event| async move {
            (event, Ok(Reply::BigInt(170141183460469231731687303715884105727)))
        })
        .unwrap();

        let app = Arc::new(app);
        let mut response = app.request(HttpMethod::GET, "/big", None).await;

        assert_eq!(
            response.header("content-type"),
            Some("application/json;charset=UTF-8")
        );
        assert_eq!(
            response.body_text().await,
            "170141183460469231731687303715884105727"
        );
    }

    #[tokio::test]
    async fn test_handled_sentinel_emits_scratch() {
        let mut app = App::new();
        app.use_middleware(|mut event| async move {
            event.res.set_status(204);
            event.res.set_header("x-done", "1");
            (event, Ok(Some(Reply::Handled)))
        });

        let app = Arc::new(app);
        let mut response = app.request(HttpMethod::GET, "/whatever", None).await;

        assert_eq!(response.status, 204);
        assert_eq!(response.header("x-done"), Some("1"));
        assert!(response.body_bytes().await.is_empty());
    }

    #[tokio::test]
    async fn test_head_requests_drop_the_body() {
        let mut app = App::new();
        app.head("/doc", |event| async move {
            (event, Ok(Reply::text("this body must not be sent")))
        })
        .unwrap();

        let app = Arc::new(app);
        let mut response = app.request(HttpMethod::HEAD, "/doc", None).await;

        assert_eq!(response.status, 200);
        assert!(response.body_bytes().await.is_empty());
    }

    #[tokio::test]
    async fn test_null_body_statuses_drop_the_body() {
        let mut app = App::new();
        app.get("/reset", |mut event: crate::event::Event| async move {
            event.res.set_status(205);
            (event, Ok(Reply::text("ignored")))
        })
        .unwrap();

        let app = Arc::new(app);
        let mut response = app.request(HttpMethod::GET, "/reset", None).await;

        assert_eq!(response.status, 205);
        assert!(response.body_bytes().await.is_empty());
    }

    #[tokio::test]
    async fn test_response_passthrough_preserves_status_and_body() {
        let mut app = App::new();
        app.get("/direct", |event| async move {
            let response = Response::new(418)
                .with_header("x-teapot", "short and stout")
                .with_body("I'm a teapot");
            (event, Ok(Reply::Response(response)))
        })
        .unwrap();

        let app = Arc::new(app);
        let mut response = app.request(HttpMethod::GET, "/direct", None).await;

        assert_eq!(response.status, 418);
        assert_eq!(response.header("x-teapot"), Some("short and stout"));
        assert_eq!(response.body_text().await, "I'm a teapot");
    }

    #[tokio::test]
    async fn test_scratch_headers_merge_into_returned_response() {
        let mut app = App::new();
        app.get("/merged", |mut event: crate::event::Event| async move {
            event.res.set_header("x-scratch", "staged");
            set_cookie(&mut event, "a", "1", None);
            let response = Response::new(200)
                .with_header("x-scratch", "from-response")
                .with_body("ok");
            (event, Ok(Reply::Response(response)))
        })
        .unwrap();

        let app = Arc::new(app);
        let response = app.request(HttpMethod::GET, "/merged", None).await;

        // Scratch overrides plain headers and appends set-cookie.
        assert_eq!(response.header("x-scratch"), Some("staged"));
        assert_eq!(response.header_all("set-cookie").len(), 1);
    }

    #[tokio::test]
    async fn test_set_cookie_merge_does_not_dedupe_equal_values() {
        let mut app = App::new();
        app.get("/cookies", |mut event| async move {
            set_cookie(&mut event, "a", "1", None);
            let mut response = Response::new(200);
            response.set_header("set-cookie", "b=2");
            (event, Ok(Reply::Response(response)))
        })
        .unwrap();

        let app = Arc::new(app);
        let response = app.request(HttpMethod::GET, "/cookies", None).await;
        assert_eq!(response.header_all("set-cookie").len(), 2);
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let mut app = App::new();
        app.silent(true);
        app.get("/fail", |event| async move {
            let error = HttpError::conflict("already exists")
                .with_status_text("Conflict")
                .with_data(json!({ "resource": "user" }));
            (event, Err(error))
        })
        .unwrap();

        let app = Arc::new(app);
        let mut response = app.request(HttpMethod::GET, "/fail", None).await;

        assert_eq!(response.status, 409);
        let body = response.body_json().await.unwrap();
        assert_eq!(body["status"], json!(409));
        assert_eq!(body["statusText"], json!("Conflict"));
        assert_eq!(body["message"], json!("already exists"));
        assert_eq!(body["data"], json!({ "resource": "user" }));
        assert!(body.get("stack").is_none());
    }

    #[tokio::test]
    async fn test_error_headers_are_emitted() {
        let mut app = App::new();
        app.get("/limited", |event| async move {
            let error = HttpError::rate_limited("slow down").with_header("retry-after", "30");
            (event, Err(error))
        })
        .unwrap();

        let app = Arc::new(app);
        let response = app.request(HttpMethod::GET, "/limited", None).await;

        assert_eq!(response.status, 429);
        assert_eq!(response.header("retry-after"), Some("30"));
    }

    #[tokio::test]
    async fn test_stack_only_in_debug_mode() {
        let failing = |event: crate::event::Event| async move {
            let io_error = std::io::Error::other("disk on fire");
            (event, Err(HttpError::from_unhandled(io_error)))
        };

        let mut plain = App::new();
        plain.silent(true);
        plain.get("/boom", failing).unwrap();
        let plain = Arc::new(plain);
        let mut response = plain.request(HttpMethod::GET, "/boom", None).await;
        let body = response.body_json().await.unwrap();
        assert!(body.get("stack").is_none());

        let mut debug = App::new();
        debug.silent(true);
        debug.debug(true);
        debug.get("/boom", failing).unwrap();
        let debug = Arc::new(debug);
        let mut response = debug.request(HttpMethod::GET, "/boom", None).await;
        let body = response.body_json().await.unwrap();
        assert!(body["stack"].as_array().is_some());
    }

    #[tokio::test]
    async fn test_unhandled_errors_become_500() {
        let mut app = App::new();
        app.silent(true);
        app.get("/io", |event| async move {
            let result: Result<Reply, HttpError> =
                Err(std::io::Error::other("broken pipe").into());
            (event, result)
        })
        .unwrap();

        let app = Arc::new(app);
        let response = app.request(HttpMethod::GET, "/io", None).await;
        assert_eq!(response.status, 500);
    }
}
