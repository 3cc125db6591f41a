//! Radix-tree path router adapter.
//!
//! One tree per HTTP method, O(path-length) lookup via [`matchit`]. The
//! matching algorithm itself is the dependency's business; this adapter
//! owns only registration, parameter extraction, and the resolution policy
//! around a miss: trailing-slash redirect, fixed-path redirect, method-not-
//! allowed detection, not-found.
//!
//! Patterns use matchit's native syntax — `{name}` for one segment,
//! `{*rest}` for a trailing wildcard.

use std::collections::HashMap;
use std::sync::Arc;

use matchit::Router as MatchitRouter;

use crate::chain::HandlerChain;
use crate::method::Method;
use crate::status::Status;

/// What a (method, path) pair resolved to.
pub(crate) enum Resolution {
    /// A registered chain, plus the extracted path parameters.
    Matched {
        chain: Arc<HandlerChain>,
        params: HashMap<String, String>,
    },
    /// The path misses but a sibling form of it matches; the client should
    /// retry there. `301` for GET, `308` for everything else, so non-GET
    /// methods are replayed verbatim.
    Redirect { location: String, status: Status },
    /// The path is registered, under different methods only.
    MethodNotAllowed { allow: Vec<Method> },
    NotFound,
}

pub(crate) struct PathRouter {
    trees: HashMap<Method, MatchitRouter<Arc<HandlerChain>>>,
    redirect_trailing_slash: bool,
    redirect_fixed_path: bool,
    route_count: usize,
}

impl PathRouter {
    pub(crate) fn new(redirect_trailing_slash: bool, redirect_fixed_path: bool) -> Self {
        Self {
            trees: HashMap::new(),
            redirect_trailing_slash,
            redirect_fixed_path,
            route_count: 0,
        }
    }

    pub(crate) fn route_count(&self) -> usize {
        self.route_count
    }

    /// Every method with a route matching `path`, for `Allow` sets.
    pub(crate) fn allowed(&self, path: &str) -> Vec<Method> {
        Method::ALL
            .into_iter()
            .filter(|m| {
                self.trees
                    .get(m)
                    .is_some_and(|tree| tree.at(path).is_ok())
            })
            .collect()
    }

    /// Registers a chain under (method, path).
    ///
    /// # Panics
    ///
    /// Panics on a syntactically invalid or conflicting pattern — a
    /// configuration error surfaced at bind time, before serving begins.
    pub(crate) fn register(&mut self, method: Method, path: &str, chain: Arc<HandlerChain>) {
        self.trees
            .entry(method)
            .or_default()
            .insert(path, chain)
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self.route_count += 1;
    }

    pub(crate) fn resolve(&self, method: Method, path: &str) -> Resolution {
        if let Some(tree) = self.trees.get(&method) {
            if let Ok(matched) = tree.at(path) {
                let params = matched
                    .params
                    .iter()
                    .map(|(k, v)| (k.to_owned(), v.to_owned()))
                    .collect();
                return Resolution::Matched {
                    chain: Arc::clone(matched.value),
                    params,
                };
            }

            if self.redirect_trailing_slash {
                if let Some(location) = self.trailing_slash_candidate(tree, path) {
                    return Resolution::Redirect {
                        location,
                        status: redirect_status(method),
                    };
                }
            }

            if self.redirect_fixed_path {
                let cleaned = clean_path(path);
                if cleaned != path && tree.at(&cleaned).is_ok() {
                    return Resolution::Redirect {
                        location: cleaned,
                        status: redirect_status(method),
                    };
                }
            }
        }

        let allow: Vec<Method> = self
            .allowed(path)
            .into_iter()
            .filter(|m| *m != method)
            .collect();
        if !allow.is_empty() {
            return Resolution::MethodNotAllowed { allow };
        }

        Resolution::NotFound
    }

    fn trailing_slash_candidate(
        &self,
        tree: &MatchitRouter<Arc<HandlerChain>>,
        path: &str,
    ) -> Option<String> {
        let candidate = if path.len() > 1 && path.ends_with('/') {
            path[..path.len() - 1].to_owned()
        } else {
            format!("{path}/")
        };
        tree.at(&candidate).is_ok().then_some(candidate)
    }
}

fn redirect_status(method: Method) -> Status {
    if method == Method::Get {
        Status::MovedPermanently
    } else {
        Status::PermanentRedirect
    }
}

/// Normalizes a sloppy request path: collapses duplicate slashes, drops `.`
/// segments, resolves `..`, keeps a trailing slash.
fn clean_path(path: &str) -> String {
    let trailing = path.len() > 1 && path.ends_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    let mut cleaned = String::from("/");
    cleaned.push_str(&segments.join("/"));
    if trailing && cleaned.len() > 1 {
        cleaned.push('/');
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_chain() -> Arc<HandlerChain> {
        Arc::new(HandlerChain::new())
    }

    fn router() -> PathRouter {
        let mut pr = PathRouter::new(true, true);
        pr.register(Method::Get, "/users/{id}", empty_chain());
        pr.register(Method::Post, "/users", empty_chain());
        pr.register(Method::Get, "/files/{*rest}", empty_chain());
        pr
    }

    #[test]
    fn matches_and_extracts_params() {
        match router().resolve(Method::Get, "/users/42") {
            Resolution::Matched { params, .. } => {
                assert_eq!(params.get("id").map(String::as_str), Some("42"));
            }
            _ => panic!("expected match"),
        }
    }

    #[test]
    fn wildcard_captures_the_tail() {
        match router().resolve(Method::Get, "/files/a/b/c.txt") {
            Resolution::Matched { params, .. } => {
                assert_eq!(params.get("rest").map(String::as_str), Some("a/b/c.txt"));
            }
            _ => panic!("expected match"),
        }
    }

    #[test]
    fn different_method_same_path_is_405() {
        match router().resolve(Method::Get, "/users") {
            Resolution::MethodNotAllowed { allow } => {
                assert_eq!(allow, vec![Method::Post]);
            }
            _ => panic!("expected 405"),
        }
    }

    #[test]
    fn unregistered_path_is_404() {
        assert!(matches!(
            router().resolve(Method::Get, "/nothing"),
            Resolution::NotFound
        ));
    }

    #[test]
    fn trailing_slash_redirects() {
        match router().resolve(Method::Get, "/users/42/") {
            Resolution::Redirect { location, status } => {
                assert_eq!(location, "/users/42");
                assert_eq!(status, Status::MovedPermanently);
            }
            _ => panic!("expected redirect"),
        }
        match router().resolve(Method::Post, "/users/") {
            Resolution::Redirect { status, .. } => {
                assert_eq!(status, Status::PermanentRedirect);
            }
            _ => panic!("expected redirect"),
        }
    }

    #[test]
    fn fixed_path_redirects_when_enabled() {
        match router().resolve(Method::Get, "/users//42") {
            Resolution::Redirect { location, .. } => assert_eq!(location, "/users/42"),
            _ => panic!("expected redirect"),
        }

        let mut strict = PathRouter::new(false, false);
        strict.register(Method::Get, "/users/{id}", empty_chain());
        assert!(matches!(
            strict.resolve(Method::Get, "/users//42"),
            Resolution::NotFound
        ));
    }

    #[test]
    #[should_panic(expected = "invalid route")]
    fn conflicting_pattern_panics() {
        let mut pr = PathRouter::new(true, false);
        pr.register(Method::Get, "/users/{id}", empty_chain());
        pr.register(Method::Get, "/users/{name}", empty_chain());
    }

    #[test]
    fn clean_path_rules() {
        assert_eq!(clean_path("/a//b"), "/a/b");
        assert_eq!(clean_path("/a/./b"), "/a/b");
        assert_eq!(clean_path("/a/c/../b"), "/a/b");
        assert_eq!(clean_path("/a/b/"), "/a/b/");
        assert_eq!(clean_path("/"), "/");
    }
}
