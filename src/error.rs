//! Per-request error taxonomy.
//!
//! Two failure classes exist and they never mix:
//!
//! - **Configuration errors** — invalid group/route paths, duplicate route
//!   registrations. These are programmer mistakes caught before any request
//!   is served, and they panic at declaration or bind time.
//! - **Per-request failures** — a missing header, cookie, query or form
//!   value, a body that does not decode, absent keyed state. These are this
//!   type. Every request-reading accessor has a `Result`-returning form, so
//!   a handler written as `async fn(Context) -> Result<Response, Error>`
//!   can use `?` throughout; an `Err` escaping the handler is converted to
//!   a structured JSON error response at the chain boundary instead of
//!   unwinding the task.

use crate::response::{IntoResponse, Response};
use crate::status::Status;

/// A recoverable, request-scoped failure.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("request header not present: {0}")]
    MissingHeader(String),

    #[error("request cookie not present: {0}")]
    MissingCookie(String),

    #[error("request cookie not readable: {0}")]
    InvalidCookie(String),

    #[error("request query parameter not present: {0}")]
    MissingQueryParam(String),

    #[error("request form field not present: {0}")]
    MissingFormField(String),

    #[error("route path parameter not present: {0}")]
    MissingPathParam(String),

    #[error("context key not set: {0}")]
    MissingState(&'static str),

    #[error("request body did not bind: {0}")]
    Bind(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The status the error renders with when it escapes a handler.
    ///
    /// Everything the client could have supplied correctly is `400`; a
    /// missing context key means an earlier chain entry broke its contract,
    /// which is `500`; io errors never reach a response at all (they belong
    /// to the server loop) but map to `500` for completeness.
    pub fn status(&self) -> Status {
        match self {
            Self::MissingHeader(_)
            | Self::MissingCookie(_)
            | Self::InvalidCookie(_)
            | Self::MissingQueryParam(_)
            | Self::MissingFormField(_)
            | Self::MissingPathParam(_)
            | Self::Bind(_) => Status::BadRequest,
            Self::MissingState(_) | Self::Io(_) => Status::InternalServerError,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        Response::abort(self.status(), &self.to_string())
    }
}
