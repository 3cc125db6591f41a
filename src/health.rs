//! Built-in Kubernetes health-check handlers.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/readyz` | Can the pod serve traffic? Failure → pulled from load-balancer. |
//!
//! Register them on any group:
//!
//! ```rust,no_run
//! use trellis::{App, health};
//!
//! let mut app = App::new();
//! app.get("/healthz", health::liveness)
//!    .get("/readyz", health::readiness);
//! ```
//!
//! Replace `readiness` with your own handler to gate on dependency
//! availability (database connections, downstream services, etc.).

use crate::{Context, Response};

/// Liveness probe handler.
///
/// Always returns `200 OK` with body `"ok"`. If the process can respond to
/// HTTP at all, it is alive — this handler intentionally has no
/// dependencies.
pub async fn liveness(_ctx: Context) -> Response {
    Response::text("ok")
}

/// Readiness probe handler (default implementation).
///
/// Returns `200 OK` with body `"ready"`. Replace it if your application
/// needs a warm-up period or must verify dependency health first.
pub async fn readiness(_ctx: Context) -> Response {
    Response::text("ready")
}
