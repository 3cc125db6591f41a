//! HTTP server and graceful shutdown.
//!
//! The server owns no routing logic: it binds the [`App`] exactly once
//! before accepting the first connection, then feeds every request through
//! [`Bound::handle`]'s dispatch path. Connection concurrency, HTTP version
//! negotiation and request parsing belong to hyper.
//!
//! Shutdown is graceful: on SIGTERM / Ctrl-C (or a caller-supplied future —
//! see [`Server::serve_with_shutdown`]) the listener stops accepting and
//! every in-flight connection runs to completion before `serve` returns.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::app::{App, Bound};
use crate::error::Error;
use crate::response::Response;
use crate::status::Status;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// # Panics
    ///
    /// Panics if `addr` is not a valid `host:port` string.
    pub fn bind(addr: &str) -> Self {
        let addr: SocketAddr = addr.parse().expect("invalid socket address");
        Self { addr }
    }

    /// Binds the app's routes, starts accepting connections, and returns
    /// only after a full graceful shutdown (SIGTERM or Ctrl-C, followed by
    /// all in-flight requests completing).
    pub async fn serve(self, app: App) -> Result<(), Error> {
        self.serve_with_shutdown(app, shutdown_signal()).await
    }

    /// Like [`serve`](Server::serve), but shuts down when `shutdown`
    /// resolves instead of on a process signal. Useful when the caller owns
    /// a cancellation source.
    pub async fn serve_with_shutdown(
        self,
        app: App,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        // The one-shot bind phase runs here, before the first accept. The
        // chains it produces are the only routing state the loop reads.
        let bound = Arc::new(app.bind());

        let listener = TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, "listening");

        // JoinSet tracks every spawned connection task so we can wait for
        // them all to finish during graceful shutdown.
        let mut tasks = tokio::task::JoinSet::new();

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // `biased` makes select! check arms top-to-bottom. Shutdown
                // is first so it stops new accepts even with a full backlog.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown requested, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let bound = Arc::clone(&bound);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // The closure runs once per request on the
                        // connection, not once per connection.
                        let svc = service_fn(move |req| {
                            let bound = Arc::clone(&bound);
                            async move { dispatch(bound, req).await }
                        });

                        // auto::Builder serves whichever of HTTP/1.1 and
                        // HTTP/2 the client negotiates.
                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the JoinSet does not
                // grow without bound on long-running servers.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        // Drain: wait for every in-flight connection before returning.
        while tasks.join_next().await.is_some() {}

        info!("stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Core hot path: one request in, one response out. All failures are
/// handled internally (404, 405, 400 on an unreadable body), so hyper never
/// sees an error.
async fn dispatch(
    bound: Arc<Bound>,
    req: hyper::Request<hyper::body::Incoming>,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();

    let response = match body.collect().await {
        Ok(collected) => bound.dispatch(parts, collected.to_bytes()).await,
        Err(e) => {
            error!("body read error: {e}");
            Response::status(Status::BadRequest)
        }
    };

    Ok(response.into_http())
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both SIGTERM (sent by orchestrators) and SIGINT
/// (Ctrl-C, for local dev). On Windows only Ctrl-C is available.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    // `pending()` never resolves — on non-Unix platforms the SIGTERM arm is
    // effectively disabled.
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = sigterm => {}
    }
}
