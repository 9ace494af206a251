#[cfg(test)]
mod helpers_tests {
    use crate::app::{App, RequestInit};
    use crate::helpers::{
        BasicAuthOptions, CacheOptions, content_type_for_extension, content_type_for_path,
        handle_cache_headers, http_date, redirect, require_basic_auth,
    };
    use crate::event::Event;
    use crate::req::RequestHandle;
    use crate::req::request_headers::RequestHeaders;
    use crate::response::Reply;
    use crate::types::HttpMethod;
    use std::sync::Arc;

    fn event_with_headers(pairs: &[(&str, &str)]) -> Event {
        let mut headers = RequestHeaders::new();
        for (name, value) in pairs {
            headers.insert(name, value);
        }
        Event::new(RequestHandle::new(HttpMethod::GET, "/", headers, None))
    }

    #[tokio::test]
    async fn test_redirect_sets_location_and_meta_refresh() {
        let mut app = App::new();
        app.get("/old", |mut event| async move {
            let reply = redirect(&mut event, "/new", None);
            (event, Ok(reply))
        })
        .unwrap();

        let app = Arc::new(app);
        let mut response = app.request(HttpMethod::GET, "/old", None).await;

        assert_eq!(response.status, 302);
        assert_eq!(response.header("location"), Some("/new"));
        let body = response.body_text().await;
        assert!(body.contains("http-equiv=\"refresh\""));
        assert!(body.contains("url=/new"));
    }

    #[tokio::test]
    async fn test_redirect_escapes_quotes_in_location() {
        let mut app = App::new();
        app.get("/out", |mut event| async move {
            let reply = redirect(&mut event, "/x?q=\"quoted\"", Some(301));
            (event, Ok(reply))
        })
        .unwrap();

        let app = Arc::new(app);
        let mut response = app.request(HttpMethod::GET, "/out", None).await;

        assert_eq!(response.status, 301);
        let body = response.body_text().await;
        assert!(!body.contains("q=\"quoted\""));
        assert!(body.contains("%22quoted%22"));
    }

    #[test]
    fn test_cache_headers_etag_match() {
        let mut event = event_with_headers(&[("if-none-match", "\"v1\"")]);
        let options = CacheOptions {
            etag: Some("\"v1\"".to_string()),
            max_age: Some(60),
            ..Default::default()
        };

        assert!(handle_cache_headers(&mut event, &options));
        assert_eq!(event.res.status(), Some(304));
        assert_eq!(event.res.get_header("etag"), Some("\"v1\""));
        let cache_control = event.res.get_header("cache-control").unwrap();
        assert!(cache_control.contains("public"));
        assert!(cache_control.contains("max-age=60"));
        assert!(cache_control.contains("s-maxage=60"));
    }

    #[test]
    fn test_cache_headers_etag_mismatch() {
        let mut event = event_with_headers(&[("if-none-match", "\"v1\"")]);
        let options = CacheOptions {
            etag: Some("\"v2\"".to_string()),
            ..Default::default()
        };

        assert!(!handle_cache_headers(&mut event, &options));
        assert_eq!(event.res.status(), None);
    }

    #[test]
    fn test_cache_headers_modified_time_match() {
        let timestamp = 1_700_000_000;
        let formatted = http_date(timestamp).unwrap();
        let mut event = event_with_headers(&[("if-modified-since", formatted.as_str())]);
        let options = CacheOptions {
            modified_time: Some(timestamp),
            ..Default::default()
        };

        assert!(handle_cache_headers(&mut event, &options));
        assert_eq!(
            event.res.get_header("last-modified"),
            Some(formatted.as_str())
        );
    }

    #[test]
    fn test_http_date_is_gmt() {
        let formatted = http_date(0).unwrap();
        assert!(formatted.ends_with("GMT"));
        assert!(formatted.contains("1970"));
    }

    #[test]
    fn test_extra_cache_controls_are_appended() {
        let mut event = event_with_headers(&[]);
        let options = CacheOptions {
            cache_controls: vec![String::from("immutable")],
            ..Default::default()
        };

        handle_cache_headers(&mut event, &options);
        let cache_control = event.res.get_header("cache-control").unwrap();
        assert!(cache_control.contains("public"));
        assert!(cache_control.contains("immutable"));
    }

    #[test]
    fn test_mime_lookup() {
        assert_eq!(content_type_for_extension("html"), Some("text/html"));
        assert_eq!(content_type_for_extension("json"), Some("application/json"));
        assert_eq!(content_type_for_extension("png"), Some("image/png"));
        assert_eq!(content_type_for_path("static/site.css"), Some("text/css"));
        assert_eq!(content_type_for_extension("definitely-not-real"), None);
    }

    #[test]
    fn test_basic_auth_accepts_valid_credentials() {
        // "admin:secret"
        let mut event =
            event_with_headers(&[("authorization", "Basic YWRtaW46c2VjcmV0")]);
        let options = BasicAuthOptions {
            username: String::from("admin"),
            password: String::from("secret"),
            realm: Some(String::from("api")),
        };

        assert!(require_basic_auth(&mut event, &options).is_ok());
        let identity = event.context.basic_auth.as_ref().unwrap();
        assert_eq!(identity.username, "admin");
        assert_eq!(identity.realm.as_deref(), Some("api"));
    }

    #[test]
    fn test_basic_auth_rejects_bad_credentials() {
        let mut event =
            event_with_headers(&[("authorization", "Basic YWRtaW46d3Jvbmc=")]);
        let options = BasicAuthOptions {
            username: String::from("admin"),
            password: String::from("secret"),
            realm: None,
        };

        let error = require_basic_auth(&mut event, &options).unwrap_err();
        assert_eq!(error.status, 401);
        let challenge = error
            .headers
            .as_ref()
            .and_then(|headers| headers.get("www-authenticate"))
            .and_then(|value| value.to_str().ok())
            .unwrap();
        assert!(challenge.starts_with("Basic realm="));
    }

    #[test]
    fn test_basic_auth_rejects_missing_header() {
        let mut event = event_with_headers(&[]);
        let options = BasicAuthOptions {
            username: String::from("admin"),
            password: String::from("secret"),
            realm: None,
        };

        assert_eq!(require_basic_auth(&mut event, &options).unwrap_err().status, 401);
    }

    #[tokio::test]
    async fn test_basic_auth_as_guard_middleware() {
        let mut app = App::new();
        app.use_middleware(|mut event| async move {
            let options = BasicAuthOptions {
                username: String::from("admin"),
                password: String::from("secret"),
                realm: Some(String::from("area51")),
            };
            match require_basic_auth(&mut event, &options) {
                Ok(()) => (event, Ok(None)),
                Err(error) => (event, Err(error)),
            }
        });
        app.get("/secure", |event| async move { (event, Ok(Reply::text("in"))) })
            .unwrap();

        let app = Arc::new(app);

        let denied = app.request(HttpMethod::GET, "/secure", None).await;
        assert_eq!(denied.status, 401);
        assert!(denied.header("www-authenticate").is_some());

        let init = RequestInit::new().header("authorization", "Basic YWRtaW46c2VjcmV0");
        let allowed = app.request(HttpMethod::GET, "/secure", Some(init)).await;
        assert_eq!(allowed.status, 200);
    }
}
