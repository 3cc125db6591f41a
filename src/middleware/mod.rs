//! Bundled middleware.
//!
//! Everything here is built on the public registration surface — the same
//! [`RouteHandler`](crate::RouteHandler) values application middleware uses
//! — and carries no private hooks into the dispatch path:
//!
//! - [`logger`] — per-request latency/status line via `tracing`
//! - [`route_logger`] — bind-time route listing (a configuration-only
//!   factory; it contributes nothing per request)
//! - [`basic_auth`] / [`basic_auth_with`] — HTTP Basic authentication,
//!   storing the authenticated user under [`BASIC_AUTH_USER`]
//! - [`recovery`] — maps a panicking chain to a `500` so one bad request
//!   cannot take the process down

mod basic_auth;
mod logger;
mod recovery;

pub use basic_auth::{BASIC_AUTH_USER, basic_auth, basic_auth_with};
pub use logger::{logger, route_logger};
pub use recovery::recovery;
