//! The declarative route-group tree.
//!
//! A [`Router`] is a node in a tree of path prefixes and middleware scopes.
//! Declaring routes builds the tree only — nothing touches the matching
//! router until [`App::bind`](crate::App::bind) flattens every endpoint
//! into its handler chain, exactly once, before anything is served.
//!
//! Because flattening reads the tree late, a group's middleware list may
//! keep growing after children were declared; every descendant endpoint
//! bound afterwards sees the final list. Order is root-to-leaf across
//! nesting levels and insertion order within one level.
//!
//! Path validation is strict and fails fast: an invalid group or route path
//! is a programmer mistake, caught with a panic at declaration time, before
//! any request exists to be affected.

use std::sync::Arc;

use crate::chain::HandlerChain;
use crate::handler::{HandlerStack, IntoRouteHandler, RouteHandler, RouteInfo};
use crate::method::Method;
use crate::path_router::PathRouter;

/// A route group: one prefix, one middleware scope, any number of child
/// groups and endpoints.
pub struct Router {
    segment: String,
    absolute_path: String,
    middleware: Vec<RouteHandler>,
    children: Vec<Router>,
    endpoints: Vec<Endpoint>,
}

/// One (method, pattern) registration with its own handler stack.
struct Endpoint {
    method: Method,
    pattern: String,
    handlers: Vec<RouteHandler>,
}

impl Router {
    pub(crate) fn root() -> Self {
        Self {
            segment: String::new(),
            absolute_path: String::new(),
            middleware: Vec::new(),
            children: Vec::new(),
            endpoints: Vec::new(),
        }
    }

    /// The absolute path of this group — every ancestor prefix plus its
    /// own. Empty for the root.
    pub fn path(&self) -> &str {
        &self.absolute_path
    }

    /// Declares a nested child group under `path`.
    ///
    /// The literal `"/"` nests a group at the same prefix (a fresh
    /// middleware scope without extending the path).
    ///
    /// # Panics
    ///
    /// Panics if `path` is empty, does not begin with `/`, or ends with `/`
    /// (unless it is exactly `"/"`).
    pub fn group(&mut self, path: &str) -> &mut Router {
        validate_path(path);
        let segment = if path == "/" { "" } else { path };
        let child = Router {
            segment: segment.to_owned(),
            absolute_path: format!("{}{}", self.absolute_path, segment),
            middleware: Vec::new(),
            children: Vec::new(),
            endpoints: Vec::new(),
        };
        self.children.push(child);
        self.children.last_mut().unwrap()
    }

    /// Appends middleware (or a bind-time factory) to this group's scope.
    ///
    /// May be called any number of times, interleaved with `group` and
    /// route declarations — every endpoint below this group that is bound
    /// later sees the full list.
    pub fn wrap<M>(&mut self, mw: impl IntoRouteHandler<M>) -> &mut Self {
        self.middleware.push(mw.into_route_handler());
        self
    }

    /// Registers one endpoint: `method` + `path` + a handler stack (a
    /// terminal handler, or a tuple of leading middleware ending in one).
    ///
    /// # Panics
    ///
    /// Panics on an invalid `path`, like [`group`](Self::group).
    pub fn route<M>(
        &mut self,
        method: Method,
        path: &str,
        handlers: impl HandlerStack<M>,
    ) -> &mut Self {
        validate_path(path);
        self.endpoints.push(Endpoint {
            method,
            pattern: path.to_owned(),
            handlers: handlers.into_route_handlers(),
        });
        self
    }

    pub fn get<M>(&mut self, path: &str, handlers: impl HandlerStack<M>) -> &mut Self {
        self.route(Method::Get, path, handlers)
    }

    pub fn head<M>(&mut self, path: &str, handlers: impl HandlerStack<M>) -> &mut Self {
        self.route(Method::Head, path, handlers)
    }

    pub fn options<M>(&mut self, path: &str, handlers: impl HandlerStack<M>) -> &mut Self {
        self.route(Method::Options, path, handlers)
    }

    pub fn post<M>(&mut self, path: &str, handlers: impl HandlerStack<M>) -> &mut Self {
        self.route(Method::Post, path, handlers)
    }

    pub fn put<M>(&mut self, path: &str, handlers: impl HandlerStack<M>) -> &mut Self {
        self.route(Method::Put, path, handlers)
    }

    pub fn patch<M>(&mut self, path: &str, handlers: impl HandlerStack<M>) -> &mut Self {
        self.route(Method::Patch, path, handlers)
    }

    pub fn delete<M>(&mut self, path: &str, handlers: impl HandlerStack<M>) -> &mut Self {
        self.route(Method::Delete, path, handlers)
    }

    /// The one-shot flatten walk. `ancestors` carries every enclosing
    /// group's middleware list, root first; each endpoint concatenates
    /// those with its own stack, resolves factories once, and registers the
    /// resulting chain.
    pub(crate) fn bind_into<'a>(
        &'a self,
        ancestors: &mut Vec<&'a [RouteHandler]>,
        path_router: &mut PathRouter,
    ) {
        ancestors.push(&self.middleware);
        for endpoint in &self.endpoints {
            endpoint.bind(self, ancestors, path_router);
        }
        for child in &self.children {
            child.bind_into(ancestors, path_router);
        }
        ancestors.pop();
    }
}

impl Endpoint {
    fn bind(
        &self,
        owner: &Router,
        ancestors: &[&[RouteHandler]],
        path_router: &mut PathRouter,
    ) {
        let info = RouteInfo {
            method: self.method,
            path: format!("{}{}", owner.absolute_path, self.pattern),
            group_path: owner.absolute_path.clone(),
        };

        let mut chain = HandlerChain::new();
        for list in ancestors {
            for handler in *list {
                chain.append(handler.resolve(&info));
            }
        }
        for handler in &self.handlers {
            chain.append(handler.resolve(&info));
        }

        tracing::debug!(
            method = %self.method,
            path = %info.path,
            entries = chain.len(),
            "route bound"
        );
        path_router.register(self.method, &info.path, Arc::new(chain));
    }
}

fn validate_path(path: &str) {
    if path.is_empty() {
        panic!("invalid route path: empty");
    }
    if path == "/" {
        return;
    }
    if !path.starts_with('/') {
        panic!("invalid route path `{path}`: must begin with '/'");
    }
    if path.ends_with('/') {
        panic!("invalid route path `{path}`: must not end with '/'");
    }
}
