//! Per-request context.
//!
//! One [`Context`] is created per incoming request and owned by that
//! request's chain — it is never pooled, cached, or visible to any other
//! request. It carries the request head and body, the path parameters the
//! router extracted, and the typed [`Store`] middleware uses to hand values
//! downstream.
//!
//! Every request-reading accessor comes in up to three shapes:
//!
//! - `x(name)` — `Option`, absence is an expected case
//! - `x_or(name, default)` — absence falls back
//! - `require_x(name)` — `Result`, for handlers that `?` their way through;
//!   an escaping [`Error`] renders as a structured `400`/`500`

use std::collections::HashMap;
use std::sync::OnceLock;

use bytes::Bytes;
use http::HeaderMap;
use http::request::Parts;
use serde::de::DeserializeOwned;

use crate::error::Error;
use crate::store::{Key, Store};

/// Per-request state carrier passed through the handler chain by value.
pub struct Context {
    parts: Parts,
    body: Bytes,
    params: HashMap<String, String>,
    store: Store,
    query_cache: OnceLock<Vec<(String, String)>>,
    form_cache: OnceLock<Vec<(String, String)>>,
}

impl Context {
    pub(crate) fn new(parts: Parts, body: Bytes, params: HashMap<String, String>) -> Self {
        Self {
            parts,
            body,
            params,
            store: Store::new(),
            query_cache: OnceLock::new(),
            form_cache: OnceLock::new(),
        }
    }

    // ── Request head ─────────────────────────────────────────────────────────

    pub fn method(&self) -> &http::Method {
        &self.parts.method
    }

    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    pub fn query_string(&self) -> Option<&str> {
        self.parts.uri.query()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Mutable access to the request headers, for middleware that rewrites
    /// the in-flight request before continuing the chain.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.parts.headers
    }

    pub fn extensions(&self) -> &http::Extensions {
        &self.parts.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut http::Extensions {
        &mut self.parts.extensions
    }

    /// Raw body bytes, already collected before the chain started.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The media type with parameters stripped: `application/json` for a
    /// `Content-Type: application/json; charset=utf-8` request.
    pub fn content_type(&self) -> Option<&str> {
        let raw = self.header("content-type")?;
        let end = raw.find([';', ' ']).unwrap_or(raw.len());
        Some(&raw[..end])
    }

    // ── Headers ──────────────────────────────────────────────────────────────

    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn header_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.header(name).unwrap_or(default)
    }

    pub fn require_header(&self, name: &str) -> Result<&str, Error> {
        self.header(name).ok_or_else(|| Error::MissingHeader(name.to_owned()))
    }

    // ── Cookies ──────────────────────────────────────────────────────────────

    /// The named cookie's value, percent-decoded. `Err(InvalidCookie)` when
    /// the cookie is present but not decodable.
    pub fn cookie(&self, name: &str) -> Result<Option<String>, Error> {
        let Some(raw) = self.header("cookie") else {
            return Ok(None);
        };
        for segment in raw.split(';') {
            let segment = segment.trim();
            match cookie::Cookie::parse_encoded(segment) {
                Ok(c) if c.name() == name => return Ok(Some(c.value().to_owned())),
                Ok(_) => {}
                Err(_) => {
                    if segment.starts_with(name)
                        && segment[name.len()..].starts_with('=')
                    {
                        return Err(Error::InvalidCookie(name.to_owned()));
                    }
                }
            }
        }
        Ok(None)
    }

    pub fn cookie_or(&self, name: &str, default: &str) -> String {
        match self.cookie(name) {
            Ok(Some(v)) => v,
            _ => default.to_owned(),
        }
    }

    pub fn require_cookie(&self, name: &str) -> Result<String, Error> {
        self.cookie(name)?
            .ok_or_else(|| Error::MissingCookie(name.to_owned()))
    }

    // ── Query parameters ─────────────────────────────────────────────────────

    fn queries(&self) -> &[(String, String)] {
        self.query_cache.get_or_init(|| {
            self.query_string()
                .and_then(|q| serde_urlencoded::from_str::<Vec<(String, String)>>(q).ok())
                .unwrap_or_default()
        })
    }

    /// First value for the query key, if any.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.queries()
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Every value for the query key (`?tag=a&tag=b`). Empty when unset.
    pub fn query_all(&self, name: &str) -> Vec<&str> {
        self.queries()
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn query_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.query(name).unwrap_or(default)
    }

    pub fn require_query(&self, name: &str) -> Result<&str, Error> {
        self.query(name)
            .ok_or_else(|| Error::MissingQueryParam(name.to_owned()))
    }

    // ── Form fields ──────────────────────────────────────────────────────────

    fn forms(&self) -> &[(String, String)] {
        self.form_cache.get_or_init(|| {
            if self.content_type() != Some("application/x-www-form-urlencoded") {
                return Vec::new();
            }
            serde_urlencoded::from_bytes::<Vec<(String, String)>>(&self.body)
                .unwrap_or_default()
        })
    }

    /// First value for an urlencoded form field, if any.
    pub fn form(&self, name: &str) -> Option<&str> {
        self.forms()
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Every value for the form field. Empty when unset.
    pub fn form_all(&self, name: &str) -> Vec<&str> {
        self.forms()
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn form_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.form(name).unwrap_or(default)
    }

    pub fn require_form(&self, name: &str) -> Result<&str, Error> {
        self.form(name)
            .ok_or_else(|| Error::MissingFormField(name.to_owned()))
    }

    // ── Path parameters ──────────────────────────────────────────────────────

    /// A named path parameter. For a route `/users/{id}`, `ctx.param("id")`
    /// on `/users/42` returns `Some("42")`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn require_param(&self, name: &str) -> Result<&str, Error> {
        self.param(name)
            .ok_or_else(|| Error::MissingPathParam(name.to_owned()))
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    // ── Typed store ──────────────────────────────────────────────────────────

    /// Writes a value for downstream chain entries. Chainable.
    pub fn set<T: Send + Sync + 'static>(&mut self, key: Key<T>, value: T) -> &mut Self {
        self.store.set(key, value);
        self
    }

    pub fn get<T: 'static>(&self, key: Key<T>) -> Option<&T> {
        self.store.get(key)
    }

    pub fn get_or<T: Clone + 'static>(&self, key: Key<T>, default: T) -> T {
        self.store.get_or(key, default)
    }

    /// Reads a value an earlier chain entry must have set; absence is a
    /// chain-wiring bug and renders as `500`.
    pub fn require<T: 'static>(&self, key: Key<T>) -> Result<&T, Error> {
        self.store.require(key)
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    // ── Binder façade ────────────────────────────────────────────────────────

    /// Decodes the body as JSON into `T`.
    pub fn bind_json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_slice(&self.body).map_err(|e| Error::Bind(e.to_string()))
    }

    /// Decodes an urlencoded body into `T`.
    pub fn bind_form<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_urlencoded::from_bytes(&self.body).map_err(|e| Error::Bind(e.to_string()))
    }

    /// Decodes the query string into `T`.
    pub fn bind_query<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_urlencoded::from_str(self.query_string().unwrap_or(""))
            .map_err(|e| Error::Bind(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(uri: &str, headers: &[(&str, &str)], body: &str) -> Context {
        let mut builder = http::Request::builder().method("GET").uri(uri);
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        let (parts, _) = builder.body(()).unwrap().into_parts();
        Context::new(parts, Bytes::from(body.to_owned()), HashMap::new())
    }

    #[test]
    fn header_triple() {
        let ctx = context("/x", &[("x-token", "abc")], "");
        assert_eq!(ctx.header("X-Token"), Some("abc"));
        assert_eq!(ctx.header_or("x-missing", "fallback"), "fallback");
        assert!(matches!(
            ctx.require_header("x-missing"),
            Err(Error::MissingHeader(_))
        ));
    }

    #[test]
    fn query_first_multi_and_missing() {
        let ctx = context("/x?tag=a&tag=b&page=3", &[], "");
        assert_eq!(ctx.query("tag"), Some("a"));
        assert_eq!(ctx.query_all("tag"), vec!["a", "b"]);
        assert_eq!(ctx.query("page"), Some("3"));
        assert_eq!(ctx.query_or("limit", "10"), "10");
        assert!(ctx.require_query("limit").is_err());
    }

    #[test]
    fn form_requires_urlencoded_content_type() {
        let ctx = context(
            "/x",
            &[("content-type", "application/x-www-form-urlencoded")],
            "name=alice&name=bob&age=30",
        );
        assert_eq!(ctx.form("name"), Some("alice"));
        assert_eq!(ctx.form_all("name"), vec!["alice", "bob"]);
        assert_eq!(ctx.form("age"), Some("30"));

        let plain = context("/x", &[], "name=alice");
        assert_eq!(plain.form("name"), None);
    }

    #[test]
    fn cookie_decoding() {
        let ctx = context("/x", &[("cookie", "sid=a%20b; theme=dark")], "");
        assert_eq!(ctx.cookie("sid").unwrap(), Some("a b".to_owned()));
        assert_eq!(ctx.cookie("theme").unwrap(), Some("dark".to_owned()));
        assert_eq!(ctx.cookie("absent").unwrap(), None);
        assert_eq!(ctx.cookie_or("absent", "light"), "light");
        assert!(matches!(
            ctx.require_cookie("absent"),
            Err(Error::MissingCookie(_))
        ));
    }

    #[test]
    fn content_type_strips_parameters() {
        let ctx = context("/x", &[("content-type", "application/json; charset=utf-8")], "");
        assert_eq!(ctx.content_type(), Some("application/json"));
    }

    #[test]
    fn bind_json_and_query() {
        #[derive(serde::Deserialize)]
        struct Page {
            page: u32,
        }
        let ctx = context("/x?page=4", &[], r#"{"page":9}"#);
        assert_eq!(ctx.bind_query::<Page>().unwrap().page, 4);
        assert_eq!(ctx.bind_json::<Page>().unwrap().page, 9);
        assert!(matches!(
            context("/x", &[], "not json").bind_json::<Page>(),
            Err(Error::Bind(_))
        ));
    }

    #[test]
    fn path_params() {
        let mut params = HashMap::new();
        params.insert("id".to_owned(), "42".to_owned());
        let (parts, _) = http::Request::builder()
            .uri("/users/42")
            .body(())
            .unwrap()
            .into_parts();
        let ctx = Context::new(parts, Bytes::new(), params);
        assert_eq!(ctx.param("id"), Some("42"));
        assert!(matches!(
            ctx.require_param("name"),
            Err(Error::MissingPathParam(_))
        ));
    }
}
