//! # trellis
//!
//! A route-group web framework: declare a tree of nested path prefixes and
//! middleware scopes, then let a one-shot bind phase flatten every endpoint
//! into a linear handler chain on a radix-tree router.
//!
//! ## The model
//!
//! Configuration is a tree; execution is a list. Groups nest, each carrying
//! a path prefix and a middleware list that may keep growing after children
//! exist. Nothing runs at declaration time. [`App::bind`] walks the tree
//! once, and for every endpoint concatenates root-to-leaf middleware with
//! the endpoint's own stack into one immutable [`HandlerChain`] —
//! request-time work is walking that pre-built list, never re-resolving
//! configuration.
//!
//! Continuation is explicit: middleware receives [`Next`] and decides
//! whether the rest of the chain runs. Returning without calling it is the
//! short-circuit used uniformly by auth, validation, and binding layers.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use trellis::{App, Context, Next, Response, Server, Status};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut app = App::new();
//!     app.wrap(require_token);
//!
//!     let api = app.group("/api");
//!     api.get("/users/{id}", get_user);
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn require_token(ctx: Context, next: Next) -> Response {
//!     if ctx.header("x-token").is_none() {
//!         return Response::abort(Status::Unauthorized, "");
//!     }
//!     next.run(ctx).await
//! }
//!
//! async fn get_user(ctx: Context) -> Response {
//!     let id = ctx.param("id").unwrap_or("unknown");
//!     Response::json(format!(r#"{{"id":"{id}"}}"#).into_bytes())
//! }
//! ```

mod app;
mod chain;
mod context;
mod error;
mod handler;
mod method;
mod path_router;
mod response;
mod router;
mod server;
mod status;
mod store;

pub mod health;
pub mod middleware;

pub use app::{App, Bound, Config};
pub use chain::{HandlerChain, Next};
pub use context::Context;
pub use error::Error;
pub use handler::{
    ChainEntry, Handler, HandlerStack, IntoEndpointItem, IntoRouteHandler, Middleware,
    RouteHandler, RouteInfo,
};
#[doc(hidden)]
pub use handler::via;
pub use method::Method;
pub use response::{ContentType, IntoResponse, Json, Response};
pub use router::Router;
pub use server::Server;
pub use status::Status;
pub use store::{Key, Store};
