//! # Helpers Module
//!
//! Small handler-side utilities: redirects, HTTP cache-header negotiation,
//! MIME lookup by file extension, and the basic-auth primitive.

#![warn(missing_docs)]

use crate::error::HttpError;
use crate::event::Event;
use crate::event::context::BasicAuth;
use crate::response::Reply;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

/// Builds a redirect reply.
///
/// Stages the status (302 unless given) and `Location` header on the
/// event, and returns a minimal HTML body with a `meta refresh` fallback;
/// quotes in the location are percent-escaped so they cannot break out of
/// the attribute.
///
/// # Example
/// ```no_run
/// use trellis::helpers::redirect;
/// # use trellis::event::Event;
///
/// # fn handler(mut event: Event) -> trellis::response::Reply {
/// redirect(&mut event, "/login", None)
/// # }
/// ```
pub fn redirect(event: &mut Event, location: &str, status: Option<u16>) -> Reply {
    let status = status.unwrap_or(302);
    event.res.set_status(status);
    event.res.set_header("location", location);

    let escaped = location.replace('"', "%22");
    Reply::Html(format!(
        "<!DOCTYPE html><html><head><meta http-equiv=\"refresh\" content=\"0; url={}\"></head></html>",
        escaped
    ))
}

/// Options for [`handle_cache_headers`].
#[derive(Debug, Clone, Default)]
pub struct CacheOptions {
    /// Last modification time as a unix timestamp; emitted as
    /// `Last-Modified` and compared against `if-modified-since`.
    pub modified_time: Option<i64>,
    /// Entity tag; emitted as `ETag` and compared against
    /// `if-none-match`.
    pub etag: Option<String>,
    /// Emits `max-age` and `s-maxage` directives with this value.
    pub max_age: Option<u64>,
    /// Extra `Cache-Control` directives appended after `public`.
    pub cache_controls: Vec<String>,
}

/// Emits cache headers and evaluates the request's conditional headers.
///
/// Always stages `Cache-Control` (and `ETag` / `Last-Modified` when
/// configured). Returns `true` when `if-none-match` or
/// `if-modified-since` matches — the status is staged as 304 and the
/// caller should respond with an empty body.
pub fn handle_cache_headers(event: &mut Event, options: &CacheOptions) -> bool {
    let mut cache_matched = false;

    if let Some(etag) = &options.etag {
        event.res.set_header("etag", etag);
        if event.req.headers().get("if-none-match") == Some(etag.as_str()) {
            cache_matched = true;
        }
    }

    if let Some(timestamp) = options.modified_time {
        if let Some(formatted) = http_date(timestamp) {
            event.res.set_header("last-modified", &formatted);
            if event.req.headers().get("if-modified-since") == Some(formatted.as_str()) {
                cache_matched = true;
            }
        }
    }

    let mut directives: Vec<String> = vec![String::from("public")];
    directives.extend(options.cache_controls.iter().cloned());
    if let Some(max_age) = options.max_age {
        directives.push(format!("max-age={}", max_age));
        directives.push(format!("s-maxage={}", max_age));
    }
    event.res.set_header("cache-control", &directives.join(", "));

    if cache_matched {
        event.res.set_status(304);
    }
    cache_matched
}

/// Formats a unix timestamp as an HTTP date (IMF-fixdate).
pub fn http_date(timestamp: i64) -> Option<String> {
    let datetime = cookie::time::OffsetDateTime::from_unix_timestamp(timestamp).ok()?;
    datetime
        .format(&cookie::time::format_description::well_known::Rfc2822)
        .ok()
        .map(|formatted| formatted.replace("+0000", "GMT"))
}

/// Looks up the MIME type for a file extension (`"html"`, `"png"`, ...).
pub fn content_type_for_extension(extension: &str) -> Option<&'static str> {
    mime_guess::from_ext(extension).first_raw()
}

/// Looks up the MIME type for a file path by its extension.
pub fn content_type_for_path(path: &str) -> Option<&'static str> {
    mime_guess::from_path(path).first_raw()
}

/// Credentials for [`require_basic_auth`].
#[derive(Debug, Clone)]
pub struct BasicAuthOptions {
    /// Expected user name.
    pub username: String,
    /// Expected password.
    pub password: String,
    /// Realm advertised in the `WWW-Authenticate` challenge.
    pub realm: Option<String>,
}

/// Enforces HTTP basic authentication for the request.
///
/// On success the identity is recorded under `context.basic_auth`. On
/// failure (missing header, undecodable credentials, or mismatch) the
/// request fails with a 401 carrying the `WWW-Authenticate` challenge.
pub fn require_basic_auth(event: &mut Event, options: &BasicAuthOptions) -> Result<(), HttpError> {
    if let Some(header) = event.req.headers().get("authorization") {
        if let Some(encoded) = header.strip_prefix("Basic ") {
            if let Ok(decoded) = STANDARD.decode(encoded.trim()) {
                if let Ok(credentials) = String::from_utf8(decoded) {
                    if let Some((username, password)) = credentials.split_once(':') {
                        if username == options.username && password == options.password {
                            event.context.basic_auth = Some(BasicAuth {
                                username: username.to_string(),
                                realm: options.realm.clone(),
                            });
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    let realm = options.realm.as_deref().unwrap_or("Restricted");
    Err(HttpError::unauthorized("Authentication required")
        .with_status_text("Unauthorized")
        .with_header("www-authenticate", &format!("Basic realm=\"{}\"", realm)))
}
