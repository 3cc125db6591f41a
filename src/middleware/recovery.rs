//! Panic-recovery middleware.
//!
//! The framework's own error path never unwinds — request failures travel
//! as [`Error`](crate::Error) values. Application code can still panic, and
//! without a boundary that tears down the whole connection task. Installed
//! as the outermost root middleware, this converts an unwinding chain into
//! a `500` for the one request that caused it; concurrent requests are
//! unaffected either way because nothing request-scoped is shared.

use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;

use crate::chain::Next;
use crate::context::Context;
use crate::handler::RouteHandler;
use crate::response::Response;
use crate::status::Status;

/// Catches panics from the rest of the chain and answers `500`.
pub fn recovery() -> RouteHandler {
    RouteHandler::middleware(|ctx: Context, next: Next| async move {
        match AssertUnwindSafe(next.run(ctx)).catch_unwind().await {
            Ok(response) => response,
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .copied()
                    .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
                    .unwrap_or("unknown panic");
                tracing::error!(message, "request handler panicked");
                Response::abort(Status::InternalServerError, "")
            }
        }
    })
}
