//! Request and route logging on `tracing`.

use std::time::Instant;

use crate::chain::Next;
use crate::context::Context;
use crate::handler::RouteHandler;

/// Per-request logging middleware: method, path, response status and
/// latency, emitted at `info` after the rest of the chain ran.
///
/// ```rust,no_run
/// use trellis::{App, middleware};
///
/// let mut app = App::new();
/// app.wrap(middleware::logger());
/// ```
pub fn logger() -> RouteHandler {
    RouteHandler::middleware(|ctx: Context, next: Next| async move {
        let start = Instant::now();
        let method = ctx.method().clone();
        let path = match ctx.query_string() {
            Some(q) => format!("{}?{}", ctx.path(), q),
            None => ctx.path().to_owned(),
        };

        let response = next.run(ctx).await;

        tracing::info!(
            %method,
            path,
            status = response.status_code(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "request"
        );
        response
    })
}

/// Bind-time route listing: logs every endpoint it is attached above, once,
/// as the chains are flattened. Contributes no per-request handler.
pub fn route_logger() -> RouteHandler {
    RouteHandler::factory(|info| {
        tracing::info!(method = %info.method, path = %info.path, "route registered");
        None
    })
}
