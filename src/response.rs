//! Outgoing HTTP response type and the [`IntoResponse`] conversion trait.
//!
//! Handlers build a [`Response`] and return it — middleware earlier in the
//! chain sees the returned value and may replace or decorate it. Nothing is
//! written to the wire until the whole chain has run.

use bytes::Bytes;
use http_body_util::Full;
use serde::Serialize;

use crate::error::Error;
use crate::status::Status;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`ResponseBuilder::bytes`].
pub enum ContentType {
    Csv,         // text/csv
    EventStream, // text/event-stream  (SSE)
    FormData,    // application/x-www-form-urlencoded
    Html,        // text/html; charset=utf-8
    Json,        // application/json
    OctetStream, // application/octet-stream  (binary / file download)
    Text,        // text/plain; charset=utf-8
    Xml,         // application/xml
}

impl ContentType {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::EventStream => "text/event-stream",
            Self::FormData => "application/x-www-form-urlencoded",
            Self::Html => "text/html; charset=utf-8",
            Self::Json => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Text => "text/plain; charset=utf-8",
            Self::Xml => "application/xml",
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// # Shortcuts (200 OK, no custom headers needed)
///
/// ```rust
/// use trellis::{Response, Status};
///
/// Response::text("hello");
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::status(Status::NoContent);
/// ```
///
/// # Builder (custom status, headers, cookies)
///
/// ```rust
/// use trellis::{Response, Status};
///
/// Response::builder()
///     .status(Status::Created)
///     .header("location", "/users/42")
///     .json(br#"{"id":42}"#.to_vec());
/// ```
pub struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl Response {
    /// `200 OK` — `application/json`, raw pre-serialized bytes.
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self::with_content_type("application/json", body.into())
    }

    /// `200 OK` — `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::with_content_type("text/plain; charset=utf-8", body.into().into())
    }

    /// `200 OK` — `text/html; charset=utf-8`.
    pub fn html(body: impl Into<String>) -> Self {
        Self::with_content_type("text/html; charset=utf-8", body.into().into())
    }

    /// Response with no body.
    pub fn status(code: Status) -> Self {
        Self { status: code.code(), headers: Vec::new(), body: Bytes::new() }
    }

    /// A redirect to `location`. `code` should be a 3xx status; the dispatch
    /// fallbacks use `301`/`308`, handlers usually want [`Status::Found`] or
    /// [`Status::SeeOther`].
    pub fn redirect(code: Status, location: &str) -> Self {
        Self {
            status: code.code(),
            headers: vec![("location".to_owned(), location.to_owned())],
            body: Bytes::new(),
        }
    }

    /// A structured JSON error body: `{"code":<status>,"message":<msg>}`.
    ///
    /// An empty `msg` falls back to the status reason phrase. This is the
    /// uniform short-circuit body used by [`Error`] and the bundled auth
    /// middleware.
    pub fn abort(code: Status, msg: &str) -> Self {
        let msg = if msg.is_empty() { code.reason() } else { msg };
        let body = serde_json::json!({ "code": code.code(), "message": msg });
        let mut resp = Self::json(serde_json::to_vec(&body).unwrap_or_default());
        resp.status = code.code();
        resp
    }

    /// Builder for responses that need a custom status, headers or cookies.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { status: Status::Ok.code(), headers: Vec::new() }
    }

    fn with_content_type(content_type: &str, body: Bytes) -> Self {
        Self {
            status: Status::Ok.code(),
            headers: vec![("content-type".to_owned(), content_type.to_owned())],
            body,
        }
    }

    /// The numeric status code.
    pub fn status_code(&self) -> u16 {
        self.status
    }

    /// Sets a header on an already-built response, replacing existing
    /// values; an empty `value` removes the header.
    pub fn set_header(&mut self, name: &str, value: &str) -> &mut Self {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        if !value.is_empty() {
            self.headers.push((name.to_ascii_lowercase(), value.to_owned()));
        }
        self
    }

    /// First header with the given name, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The response body.
    pub fn body_bytes(&self) -> &Bytes {
        &self.body
    }

    pub(crate) fn into_http(self) -> http::Response<Full<Bytes>> {
        let mut builder = http::Response::builder().status(self.status);
        for (name, value) in &self.headers {
            builder = builder.header(name, value);
        }
        builder
            .body(Full::new(self.body))
            .unwrap_or_else(|_| http::Response::new(Full::new(Bytes::new())))
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `200`. Terminated by a
/// typed body method.
pub struct ResponseBuilder {
    status: u16,
    headers: Vec<(String, String)>,
}

impl ResponseBuilder {
    pub fn status(mut self, code: Status) -> Self {
        self.status = code.code();
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Appends a `Set-Cookie` header.
    pub fn cookie(mut self, cookie: cookie::Cookie<'_>) -> Self {
        self.headers.push(("set-cookie".to_owned(), cookie.to_string()));
        self
    }

    /// Terminate with a JSON body (`application/json`).
    pub fn json(self, body: impl Into<Bytes>) -> Response {
        self.finish("application/json", body.into())
    }

    /// Terminate with a plain-text body (`text/plain; charset=utf-8`).
    pub fn text(self, body: impl Into<String>) -> Response {
        self.finish("text/plain; charset=utf-8", body.into().into())
    }

    /// Terminate with a typed body. Use this for HTML, CSV, binary, etc.
    pub fn bytes(self, content_type: ContentType, body: impl Into<Bytes>) -> Response {
        self.finish(content_type.as_str(), body.into())
    }

    /// Terminate with no body (e.g. `Status::NoContent`).
    pub fn no_body(self) -> Response {
        Response { status: self.status, headers: self.headers, body: Bytes::new() }
    }

    fn finish(self, content_type: &str, body: Bytes) -> Response {
        let mut headers = vec![("content-type".to_owned(), content_type.to_owned())];
        headers.extend(self.headers);
        Response { status: self.status, headers, body }
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
///
/// Implemented for the obvious leaf types, for [`Json`], and for
/// `Result<T, Error>` — which is what lets handlers written with `?` plug
/// into the chain: an `Err` becomes its structured error response right at
/// the handler boundary, before the enclosing middleware sees it.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response {
        Response::text(self)
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response {
        Response::text(self)
    }
}

/// Return a [`Status`] directly from a handler: `return Status::NotFound`.
impl IntoResponse for Status {
    fn into_response(self) -> Response {
        Response::status(self)
    }
}

impl<T: IntoResponse> IntoResponse for Result<T, Error> {
    fn into_response(self) -> Response {
        match self {
            Ok(v) => v.into_response(),
            Err(e) => e.into_response(),
        }
    }
}

/// Typed JSON response: serialize `T` with serde and send it as
/// `application/json`.
///
/// ```rust,no_run
/// use serde::Serialize;
/// use trellis::{Context, Json};
///
/// #[derive(Serialize)]
/// struct User { id: u64, name: String }
///
/// async fn get_user(_ctx: Context) -> Json<User> {
///     Json(User { id: 1, name: "alice".into() })
/// }
/// ```
pub struct Json<T: Serialize>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self.0) {
            Ok(bytes) => Response::json(bytes),
            Err(_) => Response::status(Status::InternalServerError),
        }
    }
}
