//! Top-level application instance: configuration, the one-shot bind phase,
//! and request dispatch.
//!
//! An [`App`] is the root of the route-group tree plus the routing policy
//! knobs. Declaration and execution are separate phases with the boundary
//! encoded in types: [`App::bind`] consumes the tree, flattens every
//! endpoint into its handler chain, registers the chains with the path
//! router, and returns a [`Bound`] — at which point the configuration
//! cannot be touched again, by construction. There is no re-bind.
//!
//! [`Bound::handle`] is the complete dispatch path and doubles as the
//! in-process test entry: feed it an `http::Request`, get the [`Response`]
//! back, no sockets involved.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use http::request::Parts;
use http_body_util::{BodyExt, Full};

use crate::chain::HandlerChain;
use crate::context::Context;
use crate::handler::{Handler, HandlerStack, IntoRouteHandler};
use crate::method::Method;
use crate::path_router::{PathRouter, Resolution};
use crate::response::Response;
use crate::router::Router;
use crate::status::Status;

// ── Config ────────────────────────────────────────────────────────────────────

/// Routing policy knobs, all optional.
pub struct Config {
    /// Answer `/users/42/` with a permanent redirect to `/users/42` (and
    /// vice versa) when only one of the two is registered. On by default.
    pub redirect_trailing_slash: bool,
    /// Normalize sloppy paths (`//`, `.`, `..`) and redirect when the
    /// cleaned path matches. Off by default.
    pub redirect_fixed_path: bool,
    /// Surfaced to bind-time logging only; the dispatch path ignores it.
    pub debug: bool,
    method_not_allowed: Option<Arc<HandlerChain>>,
    not_found: Option<Arc<HandlerChain>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redirect_trailing_slash: true,
            redirect_fixed_path: false,
            debug: false,
            method_not_allowed: None,
            not_found: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the built-in `405` fallback.
    pub fn on_method_not_allowed(mut self, handler: impl Handler) -> Self {
        self.method_not_allowed = Some(single_entry_chain(handler));
        self
    }

    /// Replaces the built-in `404` fallback.
    pub fn on_not_found(mut self, handler: impl Handler) -> Self {
        self.not_found = Some(single_entry_chain(handler));
        self
    }
}

fn single_entry_chain(handler: impl Handler) -> Arc<HandlerChain> {
    let mut chain = HandlerChain::new();
    chain.append(Some(handler.into_chain_entry()));
    Arc::new(chain)
}

// ── App ───────────────────────────────────────────────────────────────────────

/// The application under construction: root route group + config.
///
/// All of [`Router`]'s declaration surface is available directly on the
/// root:
///
/// ```rust,no_run
/// use trellis::{App, Context};
///
/// async fn list_users(_ctx: Context) -> &'static str { "[]" }
///
/// let mut app = App::new();
/// let api = app.group("/api");
/// api.get("/users", list_users);
/// let bound = app.bind();
/// ```
pub struct App {
    config: Config,
    root: Router,
    on_bind: Vec<Box<dyn FnOnce(&Bound) + Send>>,
}

impl App {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            root: Router::root(),
            on_bind: Vec::new(),
        }
    }

    /// Declares a child group on the root. See [`Router::group`].
    pub fn group(&mut self, path: &str) -> &mut Router {
        self.root.group(path)
    }

    /// Appends root-level middleware, ahead of every chain. See
    /// [`Router::wrap`].
    pub fn wrap<M>(&mut self, mw: impl IntoRouteHandler<M>) -> &mut Self {
        self.root.wrap(mw);
        self
    }

    pub fn route<M>(
        &mut self,
        method: Method,
        path: &str,
        handlers: impl HandlerStack<M>,
    ) -> &mut Self {
        self.root.route(method, path, handlers);
        self
    }

    pub fn get<M>(&mut self, path: &str, handlers: impl HandlerStack<M>) -> &mut Self {
        self.root.get(path, handlers);
        self
    }

    pub fn head<M>(&mut self, path: &str, handlers: impl HandlerStack<M>) -> &mut Self {
        self.root.head(path, handlers);
        self
    }

    pub fn options<M>(&mut self, path: &str, handlers: impl HandlerStack<M>) -> &mut Self {
        self.root.options(path, handlers);
        self
    }

    pub fn post<M>(&mut self, path: &str, handlers: impl HandlerStack<M>) -> &mut Self {
        self.root.post(path, handlers);
        self
    }

    pub fn put<M>(&mut self, path: &str, handlers: impl HandlerStack<M>) -> &mut Self {
        self.root.put(path, handlers);
        self
    }

    pub fn patch<M>(&mut self, path: &str, handlers: impl HandlerStack<M>) -> &mut Self {
        self.root.patch(path, handlers);
        self
    }

    pub fn delete<M>(&mut self, path: &str, handlers: impl HandlerStack<M>) -> &mut Self {
        self.root.delete(path, handlers);
        self
    }

    /// Registers an observer to run once, right after the bind walk
    /// completes — route listings, cache warm-up, and the like.
    pub fn on_bind(&mut self, f: impl FnOnce(&Bound) + Send + 'static) -> &mut Self {
        self.on_bind.push(Box::new(f));
        self
    }

    /// The one-shot pre-run phase: walks the group tree, flattens every
    /// endpoint into its chain, and registers the chains. Consumes the
    /// tree — there is nothing left to mutate afterwards.
    ///
    /// # Panics
    ///
    /// Panics on conflicting or malformed route patterns.
    pub fn bind(self) -> Bound {
        let mut path_router = PathRouter::new(
            self.config.redirect_trailing_slash,
            self.config.redirect_fixed_path,
        );
        let mut ancestors = Vec::new();
        self.root.bind_into(&mut ancestors, &mut path_router);

        tracing::info!(
            routes = path_router.route_count(),
            debug = self.config.debug,
            "routes bound"
        );

        let bound = Bound {
            path_router,
            method_not_allowed: self.config.method_not_allowed,
            not_found: self.config.not_found,
        };
        for observer in self.on_bind {
            observer(&bound);
        }
        bound
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

// ── Bound ─────────────────────────────────────────────────────────────────────

/// The application after the bind phase: immutable chains, ready to serve.
pub struct Bound {
    path_router: PathRouter,
    method_not_allowed: Option<Arc<HandlerChain>>,
    not_found: Option<Arc<HandlerChain>>,
}

impl Bound {
    /// Dispatches one request through routing, fallbacks and the matched
    /// chain. This is exactly what the server runs per request; tests call
    /// it directly.
    pub async fn handle(&self, req: http::Request<Full<Bytes>>) -> Response {
        let (parts, body) = req.into_parts();
        let body = body
            .collect()
            .await
            .map(|collected| collected.to_bytes())
            .unwrap_or_default();
        self.dispatch(parts, body).await
    }

    pub(crate) async fn dispatch(&self, parts: Parts, body: Bytes) -> Response {
        let path = parts.uri.path().to_owned();

        let method = match Method::try_from(&parts.method) {
            Ok(m) => m,
            Err(()) => {
                // Unroutable method (TRACE, WebDAV, …): 405 if any
                // registered method serves this path, else 404.
                let allow = self.path_router.allowed(&path);
                return if allow.is_empty() {
                    self.not_found(parts, body).await
                } else {
                    self.method_not_allowed(parts, body, &allow).await
                };
            }
        };

        match self.path_router.resolve(method, &path) {
            Resolution::Matched { chain, params } => {
                let ctx = Context::new(parts, body, params);
                chain.run(ctx).await
            }
            Resolution::Redirect { location, status } => {
                Response::redirect(status, &location)
            }
            Resolution::MethodNotAllowed { allow } => {
                self.method_not_allowed(parts, body, &allow).await
            }
            Resolution::NotFound => self.not_found(parts, body).await,
        }
    }

    async fn method_not_allowed(
        &self,
        parts: Parts,
        body: Bytes,
        allow: &[Method],
    ) -> Response {
        match &self.method_not_allowed {
            Some(chain) => {
                Arc::clone(chain)
                    .run(Context::new(parts, body, HashMap::new()))
                    .await
            }
            None => {
                let allow = allow
                    .iter()
                    .map(|m| m.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                Response::builder()
                    .status(Status::MethodNotAllowed)
                    .header("allow", &allow)
                    .text(Status::MethodNotAllowed.reason())
            }
        }
    }

    async fn not_found(&self, parts: Parts, body: Bytes) -> Response {
        match &self.not_found {
            Some(chain) => {
                Arc::clone(chain)
                    .run(Context::new(parts, body, HashMap::new()))
                    .await
            }
            None => Response::builder()
                .status(Status::NotFound)
                .text(Status::NotFound.reason()),
        }
    }
}
