#[cfg(test)]
mod errors_tests {
    use crate::error::{HttpError, sanitize_status_code, sanitize_status_text};
    use serde_json::json;

    #[test]
    fn test_status_codes_are_sanitized() {
        assert_eq!(sanitize_status_code(200), 200);
        assert_eq!(sanitize_status_code(599), 599);
        assert_eq!(sanitize_status_code(199), 500);
        assert_eq!(sanitize_status_code(600), 500);
        assert_eq!(sanitize_status_code(0), 500);

        assert_eq!(HttpError::new(9999, "bad").status, 500);
    }

    #[test]
    fn test_status_text_strips_header_injection() {
        assert_eq!(
            sanitize_status_text("Bad\r\nSet-Cookie: pwned=1"),
            "BadSet-Cookie: pwned=1"
        );
        assert_eq!(sanitize_status_text("Caf\u{e9} OK"), "Caf OK");
    }

    #[test]
    fn test_kind_helpers_carry_the_right_status() {
        assert_eq!(HttpError::bad_request("m").status, 400);
        assert_eq!(HttpError::unauthorized("m").status, 401);
        assert_eq!(HttpError::forbidden("m").status, 403);
        assert_eq!(HttpError::not_found("m").status, 404);
        assert_eq!(HttpError::timeout("m").status, 408);
        assert_eq!(HttpError::conflict("m").status, 409);
        assert_eq!(HttpError::payload_too_large("m").status, 413);
        assert_eq!(HttpError::rate_limited("m").status, 429);
        assert_eq!(HttpError::internal("m").status, 500);
    }

    #[test]
    fn test_method_not_allowed_sets_allow_header() {
        let error = HttpError::method_not_allowed("nope", &["POST", "PUT"]);
        let allow = error
            .headers
            .as_ref()
            .and_then(|headers| headers.get("allow"))
            .and_then(|value| value.to_str().ok());
        assert_eq!(allow, Some("POST, PUT"));
    }

    #[test]
    fn test_to_json_never_contains_a_stack() {
        let error = HttpError::from_unhandled(std::io::Error::other("inner failure"));
        let body = error.to_json();

        assert_eq!(body["status"], json!(500));
        assert!(body.get("stack").is_none());
    }

    #[test]
    fn test_validation_error_shape() {
        let error = HttpError::validation(json!([{ "message": "too short" }]));

        assert_eq!(error.status, 400);
        assert_eq!(error.status_text.as_deref(), Some("Validation failed"));
        let issues = &error.data.as_ref().unwrap()["issues"];
        assert_eq!(issues[0]["message"], json!("too short"));
    }

    #[test]
    fn test_unhandled_wrapping_keeps_the_cause_chain() {
        let inner = std::io::Error::other("disk gone");
        let error = HttpError::from_unhandled(inner);

        assert!(error.unhandled);
        assert_eq!(error.status, 500);
        let chain = error.cause_chain();
        assert!(chain.iter().any(|line| line.contains("disk gone")));
    }
}
