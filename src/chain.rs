//! The flattened handler chain and its continuation cursor.
//!
//! A [`HandlerChain`] is built exactly once per endpoint during the bind
//! phase and is immutable afterwards — many concurrent requests walk the
//! same chain with nothing but an `Arc` clone. All per-request state,
//! including the position in the chain, lives in values owned by the
//! request: the [`Context`] and the [`Next`] cursor.
//!
//! Control transfer is explicit. Each middleware entry receives the cursor
//! for the *rest* of the chain and chooses whether to run it:
//!
//! ```text
//! entry 0 ── next{1} ──▶ entry 1 ── next{2} ──▶ entry 2 ── next{3} ──▶ (empty 200)
//!               │
//!               └─ not called → entries 1.. never run for this request
//! ```

use std::sync::Arc;

use crate::context::Context;
use crate::handler::{BoxFuture, ChainEntry};
use crate::response::Response;
use crate::status::Status;

/// An ordered, immutable-after-bind sequence of chain entries.
pub struct HandlerChain {
    entries: Vec<ChainEntry>,
}

impl HandlerChain {
    pub(crate) fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Tail append. `None` — a factory that produced no per-request handler
    /// — contributes nothing, without error.
    pub(crate) fn append(&mut self, entry: Option<ChainEntry>) -> &mut Self {
        if let Some(entry) = entry {
            self.entries.push(entry);
        }
        self
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Runs the chain for one request. An empty chain produces the empty
    /// response without executing anything.
    pub(crate) async fn run(self: Arc<Self>, ctx: Context) -> Response {
        Next { chain: self, index: 0 }.run(ctx).await
    }
}

/// The continuation cursor a middleware uses to execute the rest of its
/// chain.
///
/// `run` consumes `self`: a middleware continues at most once, checked at
/// compile time. Not calling it short-circuits — every entry after the
/// current one is skipped for this request and the middleware's own return
/// value is the response.
///
/// Past the last entry `run` resolves to an empty `200`, so a terminal
/// middleware may call it unconditionally for symmetry.
pub struct Next {
    chain: Arc<HandlerChain>,
    index: usize,
}

impl Next {
    /// Transfers control to the next chain entry.
    pub fn run(self, ctx: Context) -> BoxFuture {
        match self.chain.entries.get(self.index) {
            Some(entry) => {
                let next = Next { chain: Arc::clone(&self.chain), index: self.index + 1 };
                entry.call(ctx, next)
            }
            None => Box::pin(async { Response::status(Status::Ok) }),
        }
    }
}
