//! Handler traits, type erasure, and the registration sum type.
//!
//! # The two handler shapes
//!
//! The chain stores entries of *different* concrete types in one sequence,
//! so registration erases them behind a common interface. Two shapes erase
//! to the same entry type:
//!
//! ```text
//! async fn handler(ctx: Context) -> impl IntoResponse            ← terminal
//! async fn mw(ctx: Context, next: Next) -> impl IntoResponse     ← middleware
//! ```
//!
//! A terminal handler never sees the continuation; a middleware decides
//! whether to call `next.run(ctx).await`. Skipping the call short-circuits
//! the rest of the chain; `Next::run` takes `self`, so calling it twice from
//! one invocation does not compile.
//!
//! # Factories
//!
//! A [`RouteHandler::factory`] runs once per endpoint at bind time, against
//! the endpoint's [`RouteInfo`]. It does per-route setup (compile a
//! template, start a per-route span, log the registration) and returns the
//! per-request entry — or `None`, meaning "configuration only, nothing to
//! run per request". Everything a registration call accepts normalizes into
//! the closed [`RouteHandler`] enum immediately, so there is no runtime
//! handler-shape sniffing anywhere in the dispatch path.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::chain::Next;
use crate::context::Context;
use crate::method::Method;
use crate::response::{IntoResponse, Response};

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future that resolves to a [`Response`].
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Internal dispatch interface for one chain entry.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// public [`ChainEntry`] alias. External crates cannot usefully implement it.
#[doc(hidden)]
pub trait ErasedEntry {
    fn call(&self, ctx: Context, next: Next) -> BoxFuture;
}

/// A type-erased chain entry, shared across every concurrent request that
/// hits its route. One atomic reference-count bump per request.
pub type ChainEntry = Arc<dyn ErasedEntry + Send + Sync + 'static>;

// ── Public traits ─────────────────────────────────────────────────────────────

/// Implemented for every valid terminal handler.
///
/// You never implement this yourself; it is automatically satisfied for any
/// `async fn(Context) -> impl IntoResponse`. Sealed so the blanket impl below
/// is the only one.
pub trait Handler: private::SealedHandler + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_chain_entry(self) -> ChainEntry;
}

/// Implemented for every valid middleware.
///
/// Automatically satisfied for any
/// `async fn(Context, Next) -> impl IntoResponse`. Sealed like [`Handler`].
pub trait Middleware: private::SealedMiddleware + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_chain_entry(self) -> ChainEntry;
}

mod private {
    pub trait SealedHandler {}
    pub trait SealedMiddleware {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, Fut, R> private::SealedHandler for F
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_chain_entry(self) -> ChainEntry {
        Arc::new(FnHandler(self))
    }
}

impl<F, Fut, R> private::SealedMiddleware for F
where
    F: Fn(Context, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Middleware for F
where
    F: Fn(Context, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_chain_entry(self) -> ChainEntry {
        Arc::new(FnMiddleware(self))
    }
}

// ── Concrete wrappers ─────────────────────────────────────────────────────────

/// Bridges a terminal handler into the entry interface. The continuation is
/// dropped: entries appended after a terminal handler only run if nothing
/// earlier produced a response, and a terminal handler always does.
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedEntry for FnHandler<F>
where
    F: Fn(Context) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, ctx: Context, _next: Next) -> BoxFuture {
        let fut = (self.0)(ctx);
        Box::pin(async move { fut.await.into_response() })
    }
}

struct FnMiddleware<F>(F);

impl<F, Fut, R> ErasedEntry for FnMiddleware<F>
where
    F: Fn(Context, Next) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, ctx: Context, next: Next) -> BoxFuture {
        let fut = (self.0)(ctx, next);
        Box::pin(async move { fut.await.into_response() })
    }
}

// ── RouteInfo ─────────────────────────────────────────────────────────────────

/// Static per-route data handed to factories at bind time.
#[derive(Clone, Debug)]
pub struct RouteInfo {
    /// The endpoint's HTTP method.
    pub method: Method,
    /// The resolved absolute route path, ancestor prefixes included.
    pub path: String,
    /// The absolute path of the group the endpoint was declared on, for
    /// building relative redirect targets.
    pub group_path: String,
}

// ── RouteHandler ──────────────────────────────────────────────────────────────

type FactoryFn = Box<dyn Fn(&RouteInfo) -> Option<RouteHandler> + Send + Sync + 'static>;

/// A registered handler in one of its two resolved forms.
///
/// Every argument to `wrap`/`get`/`route` becomes one of these at the call
/// site; the bind phase only ever deals with this closed type.
pub enum RouteHandler {
    /// A per-request chain entry, ready to append.
    Ready(ChainEntry),
    /// A bind-time factory, invoked once per endpoint.
    Factory(FactoryFn),
}

impl RouteHandler {
    /// A terminal handler as a registrable value, for use inside factories.
    pub fn plain(handler: impl Handler) -> Self {
        Self::Ready(handler.into_chain_entry())
    }

    /// A middleware as a registrable value, for use inside factories.
    pub fn middleware(mw: impl Middleware) -> Self {
        Self::Ready(mw.into_chain_entry())
    }

    /// A bind-time factory. Returning `None` contributes nothing to the
    /// chain.
    pub fn factory(
        f: impl Fn(&RouteInfo) -> Option<RouteHandler> + Send + Sync + 'static,
    ) -> Self {
        Self::Factory(Box::new(f))
    }

    /// Resolves to a per-request entry for one endpoint. Factories may
    /// return factories; resolution recurses until a `Ready` or `None`.
    pub(crate) fn resolve(&self, info: &RouteInfo) -> Option<ChainEntry> {
        match self {
            Self::Ready(entry) => Some(Arc::clone(entry)),
            Self::Factory(f) => f(info).and_then(|rh| rh.resolve(info)),
        }
    }
}

// ── Registration conversion traits ────────────────────────────────────────────

/// Marker types steering the [`IntoRouteHandler`] / [`IntoEndpointItem`]
/// blanket impls. Callers never name these; type inference picks them.
#[doc(hidden)]
pub mod via {
    pub struct AsIs;
    pub struct Mw;
    pub struct Factory;
    pub struct Plain;
    pub struct Item<M>(std::marker::PhantomData<M>);
}

/// Anything `wrap` accepts: a middleware, a factory, or an explicit
/// [`RouteHandler`]. Terminal handlers are deliberately *not* accepted as
/// group middleware — a terminal entry in a group list would silently end
/// every descendant chain.
pub trait IntoRouteHandler<M>: Send + Sync + 'static {
    fn into_route_handler(self) -> RouteHandler;
}

impl IntoRouteHandler<via::AsIs> for RouteHandler {
    fn into_route_handler(self) -> RouteHandler {
        self
    }
}

impl<F, Fut, R> IntoRouteHandler<via::Mw> for F
where
    F: Fn(Context, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_route_handler(self) -> RouteHandler {
        RouteHandler::middleware(self)
    }
}

impl<F> IntoRouteHandler<via::Factory> for F
where
    F: Fn(&RouteInfo) -> Option<RouteHandler> + Send + Sync + 'static,
{
    fn into_route_handler(self) -> RouteHandler {
        RouteHandler::factory(self)
    }
}

/// Anything usable inside an endpoint's own handler stack: everything
/// `wrap` accepts, plus terminal handlers.
pub trait IntoEndpointItem<M>: Send + Sync + 'static {
    fn into_endpoint_item(self) -> RouteHandler;
}

impl<T, M> IntoEndpointItem<via::Item<M>> for T
where
    T: IntoRouteHandler<M> + Send + Sync + 'static,
{
    fn into_endpoint_item(self) -> RouteHandler {
        self.into_route_handler()
    }
}

impl<F, Fut, R> IntoEndpointItem<via::Plain> for F
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_endpoint_item(self) -> RouteHandler {
        RouteHandler::plain(self)
    }
}

/// The handler stack of one endpoint: a single item, or a tuple of leading
/// middleware/factories ending in the terminal handler.
pub trait HandlerStack<M> {
    fn into_route_handlers(self) -> Vec<RouteHandler>;
}

impl<T, M> HandlerStack<(M,)> for T
where
    T: IntoEndpointItem<M>,
{
    fn into_route_handlers(self) -> Vec<RouteHandler> {
        vec![self.into_endpoint_item()]
    }
}

macro_rules! impl_handler_stack {
    ( $( ($($name:ident : $marker:ident),+) ; )+ ) => {
        $(
            impl<$($name, $marker),+> HandlerStack<($($marker,)+ ())> for ($($name,)+)
            where
                $( $name: IntoEndpointItem<$marker>, )+
            {
                fn into_route_handlers(self) -> Vec<RouteHandler> {
                    #[allow(non_snake_case)]
                    let ($($name,)+) = self;
                    vec![ $( $name.into_endpoint_item(), )+ ]
                }
            }
        )+
    };
}

impl_handler_stack! {
    (A: MA, B: MB);
    (A: MA, B: MB, C: MC);
    (A: MA, B: MB, C: MC, D: MD);
    (A: MA, B: MB, C: MC, D: MD, E: ME);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> RouteInfo {
        RouteInfo {
            method: Method::Get,
            path: "/api/users".to_owned(),
            group_path: "/api".to_owned(),
        }
    }

    #[test]
    fn ready_resolves_to_itself() {
        let rh = RouteHandler::plain(|_ctx: Context| async { "ok" });
        assert!(rh.resolve(&info()).is_some());
    }

    #[test]
    fn none_factory_contributes_nothing() {
        let rh = RouteHandler::factory(|_info| None);
        assert!(rh.resolve(&info()).is_none());
    }

    #[test]
    fn factory_sees_route_info() {
        let rh = RouteHandler::factory(|info| {
            assert_eq!(info.path, "/api/users");
            assert_eq!(info.group_path, "/api");
            Some(RouteHandler::plain(|_ctx: Context| async { "ok" }))
        });
        assert!(rh.resolve(&info()).is_some());
    }

    #[test]
    fn nested_factories_resolve() {
        let rh = RouteHandler::factory(|_| {
            Some(RouteHandler::factory(|_| {
                Some(RouteHandler::plain(|_ctx: Context| async { "deep" }))
            }))
        });
        assert!(rh.resolve(&info()).is_some());
    }
}
