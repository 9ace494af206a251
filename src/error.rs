#![warn(missing_docs)]
use hyper::HeaderMap;
use hyper::header::{HeaderName, HeaderValue};
use serde_json::{Value, json};
use std::error::Error as StdError;
use std::fmt::Display;

/// A structured HTTP error carried through handlers, middleware, and the
/// response projector.
///
/// Every failure in the framework is expressed as an `HttpError`: handlers
/// and middleware return it, the projector turns it into a JSON error
/// response, and the JSON-RPC layer maps its status onto protocol error
/// codes.
///
/// # Fields
///
/// - `status`: sanitised to the 200–599 range (invalid values fall back to 500).
/// - `status_text`: optional reason phrase, stripped of CR/LF and non-ASCII
///   so it can never be used for header injection.
/// - `message`: human-readable description, always present in the JSON body.
/// - `headers`: extra headers attached to the error response (e.g. `Allow`
///   on a 405, `WWW-Authenticate` on a 401).
/// - `data`: structured details (e.g. validation issues).
/// - `unhandled`: set when a non-HTTP failure was wrapped into a 500; used
///   to decide whether the error is logged with its cause chain.
///
/// # Examples
///
/// ```rust
/// use trellis::error::HttpError;
///
/// let err = HttpError::not_found("no such user");
/// assert_eq!(err.status, 404);
/// ```
#[derive(Debug)]
pub struct HttpError {
    /// HTTP status code, always within 200–599.
    pub status: u16,
    /// Optional reason phrase, sanitised to printable ASCII.
    pub status_text: Option<String>,
    /// Human-readable error message.
    pub message: String,
    /// Headers to attach to the error response.
    pub headers: Option<HeaderMap>,
    /// Structured error details, serialised under `data` in the JSON body.
    pub data: Option<Value>,
    /// Underlying cause, when the error wraps another failure.
    pub cause: Option<Box<dyn StdError + Send + Sync>>,
    /// True when a non-HTTP failure was caught and wrapped into this error.
    pub unhandled: bool,
}

impl HttpError {
    /// Creates a new error from a status code and message.
    ///
    /// The status code is sanitised to the 200–599 range; anything outside
    /// it becomes 500.
    pub fn new<M: Into<String>>(status: u16, message: M) -> Self {
        Self {
            status: sanitize_status_code(status),
            status_text: None,
            message: message.into(),
            headers: None,
            data: None,
            cause: None,
            unhandled: false,
        }
    }

    /// Sets the reason phrase, sanitised for header safety.
    pub fn with_status_text<T: Into<String>>(mut self, status_text: T) -> Self {
        self.status_text = Some(sanitize_status_text(&status_text.into()));
        self
    }

    /// Attaches structured details to the error.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Attaches a response header to the error.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        let headers = self.headers.get_or_insert_with(HeaderMap::new);
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            headers.insert(name, value);
        }
        self
    }

    /// Records the underlying cause of this error.
    pub fn with_cause<E: StdError + Send + Sync + 'static>(mut self, cause: E) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Wraps a non-HTTP failure into a 500 marked as unhandled.
    ///
    /// Unhandled errors are logged by the projector (unless silent mode is
    /// on) and expose their cause chain as `stack` in debug mode.
    pub fn from_unhandled<E: StdError + Send + Sync + 'static>(cause: E) -> Self {
        let mut err = Self::new(500, cause.to_string());
        err.cause = Some(Box::new(cause));
        err.unhandled = true;
        err
    }

    /// 400 Bad Request.
    pub fn bad_request<M: Into<String>>(message: M) -> Self {
        Self::new(400, message)
    }

    /// 400 with the validation failure shape: statusText `Validation failed`
    /// and the issue list under `data.issues`.
    pub fn validation(issues: Value) -> Self {
        Self::new(400, "Validation failed")
            .with_status_text("Validation failed")
            .with_data(json!({ "issues": issues }))
    }

    /// 401 Unauthorized.
    pub fn unauthorized<M: Into<String>>(message: M) -> Self {
        Self::new(401, message)
    }

    /// 403 Forbidden.
    pub fn forbidden<M: Into<String>>(message: M) -> Self {
        Self::new(403, message)
    }

    /// 404 Not Found.
    pub fn not_found<M: Into<String>>(message: M) -> Self {
        Self::new(404, message)
    }

    /// 405 Method Not Allowed carrying the `Allow` header.
    pub fn method_not_allowed<M: Into<String>>(message: M, allowed: &[&str]) -> Self {
        Self::new(405, message)
            .with_status_text("Method Not Allowed")
            .with_header("allow", &allowed.join(", "))
    }

    /// 408 Request Timeout.
    pub fn timeout<M: Into<String>>(message: M) -> Self {
        Self::new(408, message)
    }

    /// 409 Conflict.
    pub fn conflict<M: Into<String>>(message: M) -> Self {
        Self::new(409, message)
    }

    /// 413 Payload Too Large.
    pub fn payload_too_large<M: Into<String>>(message: M) -> Self {
        Self::new(413, message)
    }

    /// 429 Too Many Requests.
    pub fn rate_limited<M: Into<String>>(message: M) -> Self {
        Self::new(429, message)
    }

    /// 500 Internal Server Error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::new(500, message)
    }

    /// Serialises the error to its JSON wire shape, never including a stack.
    ///
    /// The projector adds `stack` separately, and only in debug mode.
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "status": self.status,
            "message": self.message,
        });
        if let Some(status_text) = &self.status_text {
            body["statusText"] = Value::String(status_text.clone());
        }
        if let Some(data) = &self.data {
            body["data"] = data.clone();
        }
        body
    }

    /// Renders the cause chain, outermost first.
    ///
    /// Used by the projector as the debug-mode `stack` and by loggers.
    pub fn cause_chain(&self) -> Vec<String> {
        let mut chain = vec![self.message.clone()];
        let mut source: Option<&(dyn StdError + 'static)> = match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        };
        while let Some(err) = source {
            chain.push(err.to_string());
            source = err.source();
        }
        chain
    }
}

impl Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.status, self.message)
    }
}

impl StdError for HttpError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

impl From<std::io::Error> for HttpError {
    fn from(err: std::io::Error) -> Self {
        Self::from_unhandled(err)
    }
}

impl From<serde_json::Error> for HttpError {
    fn from(err: serde_json::Error) -> Self {
        Self::from_unhandled(err)
    }
}

impl From<url::ParseError> for HttpError {
    fn from(err: url::ParseError) -> Self {
        Self::bad_request(format!("Invalid URL: {}", err))
    }
}

/// Clamps a status code to the 200–599 range; invalid codes become 500.
pub fn sanitize_status_code(status: u16) -> u16 {
    if (200..=599).contains(&status) {
        status
    } else {
        500
    }
}

/// Strips CR/LF and non-printable-ASCII characters from a reason phrase.
pub fn sanitize_status_text(status_text: &str) -> String {
    status_text
        .chars()
        .filter(|c| c.is_ascii() && !c.is_ascii_control())
        .collect()
}
