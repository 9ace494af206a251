//! # Cookie Module
//!
//! Request-cookie parsing and response-cookie emission for events.
//!
//! Outgoing cookies merge by their *distinct cookie key* — the tuple
//! `(name, domain, path)` — so cookies that share a name but differ in
//! scope coexist, while a rewrite of the same scope replaces the staged
//! `set-cookie` header instead of stacking a duplicate.
//!
//! Values too large for a single cookie can be split across *chunked
//! cookies*: the main cookie holds `chunks.<N>` and companions
//! `{name}.C1..CN` hold the pieces. Reading reassembles them; rewriting
//! with fewer chunks deletes the stale companions.
//!
//! ## Basic Usage
//!
//! ```no_run
//! use trellis::cookies::{get_cookie, set_cookie, delete_cookie};
//! # use trellis::event::Event;
//!
//! # fn example(mut event: Event) {
//! if get_cookie(&event, "session").is_none() {
//!     set_cookie(&mut event, "session", "abc123", None);
//! }
//! delete_cookie(&mut event, "stale", None);
//! # }
//! ```

#![warn(missing_docs)]

use crate::event::Event;
use ahash::AHashMap;
use cookie::Cookie;
use hyper::header::{HeaderValue, SET_COOKIE};

/// Default maximum size of a single cookie chunk, in bytes.
///
/// Chosen to keep each `set-cookie` header safely under the common 4 KB
/// browser limit once attributes are added.
pub const DEFAULT_CHUNK_SIZE: usize = 4050;

/// `SameSite` values accepted by [`SetCookieOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    /// `SameSite=Strict`
    Strict,
    /// `SameSite=Lax`
    Lax,
    /// `SameSite=None`
    None,
}

/// Attributes for an outgoing cookie.
///
/// The defaults are the safe ones: `Path=/`, `HttpOnly`, `Secure`,
/// `SameSite=None`.
#[derive(Debug, Clone)]
pub struct SetCookieOptions {
    /// Cookie `Domain`; unset scopes the cookie to the request host.
    pub domain: Option<String>,
    /// Cookie `Path`; defaults to `/`.
    pub path: Option<String>,
    /// `Max-Age` in seconds.
    pub max_age: Option<i64>,
    /// `Expires` as a unix timestamp.
    pub expires: Option<i64>,
    /// Emit `HttpOnly`.
    pub http_only: bool,
    /// Emit `Secure`.
    pub secure: bool,
    /// The `SameSite` attribute.
    pub same_site: SameSite,
}

impl Default for SetCookieOptions {
    fn default() -> Self {
        Self {
            domain: None,
            path: None,
            max_age: None,
            expires: None,
            http_only: true,
            secure: true,
            same_site: SameSite::None,
        }
    }
}

/// Parses the request's `cookie` header into a name → value map.
///
/// Duplicate names resolve to the first occurrence.
pub fn parse_cookies(event: &Event) -> AHashMap<String, String> {
    let mut cookies = AHashMap::new();

    if let Some(header) = event.req.headers().get("cookie") {
        for part in header.split(';') {
            if let Ok(cookie) = Cookie::parse(part.trim()) {
                cookies
                    .entry(cookie.name().to_string())
                    .or_insert_with(|| cookie.value().to_string());
            }
        }
    }

    cookies
}

/// Returns a single request cookie by name.
pub fn get_cookie(event: &Event, name: &str) -> Option<String> {
    parse_cookies(event).remove(name)
}

/// Stages a `set-cookie` header on the event.
///
/// If a staged cookie shares this cookie's distinct key
/// `(name, domain, path)` it is replaced; otherwise the new cookie is
/// appended, so differently scoped cookies with the same name coexist.
pub fn set_cookie(event: &mut Event, name: &str, value: &str, options: Option<SetCookieOptions>) {
    let options = options.unwrap_or_default();
    let serialized = serialize_cookie(name, value, &options);
    let key = (
        name.to_string(),
        options.domain.clone().unwrap_or_default(),
        options.path.clone().unwrap_or_else(|| String::from("/")),
    );

    let mut staged: Vec<String> = event
        .res
        .headers()
        .map(|headers| {
            headers
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .map(|v| v.to_string())
                .collect()
        })
        .unwrap_or_default();

    let mut replaced = false;
    for existing in staged.iter_mut() {
        if distinct_cookie_key(existing).as_ref() == Some(&key) {
            *existing = serialized.clone();
            replaced = true;
            break;
        }
    }
    if !replaced {
        staged.push(serialized);
    }

    let headers = event.res.headers_mut();
    headers.remove(SET_COOKIE);
    for cookie in staged {
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            headers.append(SET_COOKIE, value);
        }
    }
}

/// Deletes a cookie: an empty value with `Max-Age=0`.
pub fn delete_cookie(event: &mut Event, name: &str, options: Option<SetCookieOptions>) {
    let mut options = options.unwrap_or_default();
    options.max_age = Some(0);
    options.expires = None;
    set_cookie(event, name, "", Some(options));
}

/// Stages a possibly chunked cookie with the default chunk size.
///
/// See [`set_chunked_cookie_with`].
pub fn set_chunked_cookie(
    event: &mut Event,
    name: &str,
    value: &str,
    options: Option<SetCookieOptions>,
) {
    set_chunked_cookie_with(event, name, value, DEFAULT_CHUNK_SIZE, options);
}

/// Stages a possibly chunked cookie with an explicit chunk size.
///
/// A value no longer than `chunk_size` is set as a plain cookie. A longer
/// one is split: the main cookie's value becomes `chunks.<N>` and the
/// pieces go out as `{name}.C1..CN`. Companion cookies left over from a
/// previous, larger write are deleted.
pub fn set_chunked_cookie_with(
    event: &mut Event,
    name: &str,
    value: &str,
    chunk_size: usize,
    options: Option<SetCookieOptions>,
) {
    let options = options.unwrap_or_default();
    let previous_chunks = previous_chunk_count(event, name);

    let new_chunks = if value.len() <= chunk_size || chunk_size == 0 {
        set_cookie(event, name, value, Some(options.clone()));
        0
    } else {
        let chunks = split_value(value, chunk_size);
        let count = chunks.len();
        set_cookie(
            event,
            name,
            &format!("chunks.{}", count),
            Some(options.clone()),
        );
        for (index, chunk) in chunks.into_iter().enumerate() {
            set_cookie(
                event,
                &format!("{}.C{}", name, index + 1),
                chunk,
                Some(options.clone()),
            );
        }
        count
    };

    for stale in (new_chunks + 1)..=previous_chunks {
        delete_cookie(
            event,
            &format!("{}.C{}", name, stale),
            Some(options.clone()),
        );
    }
}

/// Reads a possibly chunked request cookie.
///
/// A plain value is returned as-is. A `chunks.<N>` marker reassembles the
/// `{name}.C1..CN` companions in order. A malformed marker (non-integer,
/// non-positive, or missing companion) yields `None`.
pub fn get_chunked_cookie(event: &Event, name: &str) -> Option<String> {
    let cookies = parse_cookies(event);
    let main = cookies.get(name)?;

    let Some(marker) = main.strip_prefix("chunks.") else {
        return Some(main.clone());
    };

    let count: usize = marker.parse().ok()?;
    if count == 0 {
        return None;
    }

    let mut value = String::new();
    for index in 1..=count {
        let chunk = cookies.get(&format!("{}.C{}", name, index))?;
        value.push_str(chunk);
    }
    Some(value)
}

fn previous_chunk_count(event: &Event, name: &str) -> usize {
    parse_cookies(event)
        .get(name)
        .and_then(|main| main.strip_prefix("chunks."))
        .and_then(|marker| marker.parse().ok())
        .unwrap_or(0)
}

fn serialize_cookie(name: &str, value: &str, options: &SetCookieOptions) -> String {
    let mut builder = Cookie::build((name, value))
        .path(options.path.clone().unwrap_or_else(|| String::from("/")))
        .http_only(options.http_only)
        .secure(options.secure)
        .same_site(match options.same_site {
            SameSite::Strict => cookie::SameSite::Strict,
            SameSite::Lax => cookie::SameSite::Lax,
            SameSite::None => cookie::SameSite::None,
        });

    if let Some(domain) = &options.domain {
        builder = builder.domain(domain.clone());
    }
    if let Some(max_age) = options.max_age {
        builder = builder.max_age(cookie::time::Duration::seconds(max_age));
    }
    if let Some(expires) = options.expires {
        if let Ok(timestamp) = cookie::time::OffsetDateTime::from_unix_timestamp(expires) {
            builder = builder.expires(timestamp);
        }
    }

    builder.build().to_string()
}

/// Derives the distinct cookie key `(name, domain, path)` from a
/// serialised `set-cookie` value.
fn distinct_cookie_key(serialized: &str) -> Option<(String, String, String)> {
    let cookie = Cookie::parse(serialized).ok()?;
    Some((
        cookie.name().to_string(),
        cookie.domain().unwrap_or("").to_string(),
        cookie.path().unwrap_or("/").to_string(),
    ))
}

/// Splits a value into chunks of at most `size` bytes, backing up to char
/// boundaries so every chunk stays valid UTF-8.
fn split_value(value: &str, size: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < value.len() {
        let mut end = usize::min(start + size, value.len());
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        chunks.push(&value[start..end]);
        start = end;
    }
    chunks
}
