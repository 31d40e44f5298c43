//! Per-request context and the handler-chain cursor.
//!
//! The cursor walks the resolved chain strictly forward:
//!
//! ```text
//! BeforeStart ──next()──▶ At(0) ──next()──▶ At(1) … At(n-1) ──next()──▶ PastEnd
//! ```
//!
//! Every [`Context::next`] call advances by one and invokes the handler it
//! lands on. Past the end, `next()` returns `None` without invoking anything.
//! [`Context::run`] keeps stepping until some handler answers.
//!
//! A middleware that post-processes the response calls `run()` and edits
//! what comes back, so silent handlers further down are stepped over rather
//! than ending its turn early. A handler that answers simply returns.

use std::sync::{Arc, Mutex};

use http::Extensions;

use crate::handler::BoxedHandler;
use crate::pattern::Params;
use crate::request::Request;
use crate::response::Response;
use crate::route::RouteInfo;

/// Where the cursor stands in the chain.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Cursor {
    BeforeStart,
    At(usize),
    PastEnd,
}

/// State shared by every handler processing one request.
pub struct Context {
    request: Request,
    route: Option<RouteInfo>,
    chain: Arc<[BoxedHandler]>,
    params: Params,
    // 0 is before the first handler; k + 1 is "at handler k".
    position: usize,
    metadata: Extensions,
}

impl Context {
    pub fn new(request: Request) -> Self {
        Self {
            request,
            route: None,
            chain: Arc::from(Vec::new()),
            params: Params::new(),
            position: 0,
            metadata: Extensions::new(),
        }
    }

    pub fn request(&self) -> &Request { &self.request }

    /// A named path parameter from the matched route.
    ///
    /// For a route `/users/{id}`, `ctx.param("id")` on `/users/42` returns
    /// `Some("42")`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn params(&self) -> &Params { &self.params }

    /// The matched route, or `None` while root middleware runs for a
    /// request that matched nothing.
    pub fn route_info(&self) -> Option<&RouteInfo> { self.route.as_ref() }

    /// Typed values handlers leave for each other during this request.
    pub fn metadata(&self) -> &Extensions { &self.metadata }
    pub fn metadata_mut(&mut self) -> &mut Extensions { &mut self.metadata }

    pub fn cursor(&self) -> Cursor {
        match self.position {
            0 => Cursor::BeforeStart,
            p if p <= self.chain.len() => Cursor::At(p - 1),
            _ => Cursor::PastEnd,
        }
    }

    /// Advances to the next handler and invokes it.
    ///
    /// Returns `None` once the chain is exhausted, or when the invoked
    /// handler declined to answer. Middleware wrapping the rest of the chain
    /// should call [`run`](Context::run) instead: a `None` from `next()` may
    /// only mean the following handler stayed silent.
    pub fn next(&mut self) -> Option<Response> {
        if self.position > self.chain.len() {
            return None;
        }
        self.position += 1;
        let handler = Arc::clone(self.chain.get(self.position - 1)?);
        handler.call(self)
    }

    /// Drives the chain from the current position until a handler answers
    /// or the cursor runs past the end.
    ///
    /// Handlers that return nothing without calling `next()` themselves
    /// hand over to the following handler.
    pub fn run(&mut self) -> Option<Response> {
        while self.cursor() != Cursor::PastEnd {
            if let Some(res) = self.next() {
                return Some(res);
            }
        }
        None
    }

    /// Binds the context to a resolved chain and rewinds the cursor.
    pub(crate) fn bind(&mut self, chain: Arc<[BoxedHandler]>, route: Option<RouteInfo>, params: Params) {
        self.chain = chain;
        self.route = route;
        self.params = params;
        self.position = 0;
    }

    pub(crate) fn take_request(&mut self) -> Request {
        std::mem::take(&mut self.request)
    }

    /// Clears everything a request left behind.
    pub(crate) fn reset(&mut self) {
        self.request = Request::default();
        self.route = None;
        self.chain = Arc::from(Vec::new());
        self.params.clear();
        self.position = 0;
        self.metadata.clear();
    }
}

/// A free list of contexts reused across requests.
///
/// Contexts are reset on the way out and again on the way in, so nothing a
/// previous request stored is visible to the next one. A poisoned lock
/// degrades to plain allocation.
pub(crate) struct ContextPool {
    free: Mutex<Vec<Context>>,
    capacity: usize,
}

impl ContextPool {
    pub(crate) fn new(capacity: usize) -> Self {
        Self { free: Mutex::new(Vec::with_capacity(capacity)), capacity }
    }

    pub(crate) fn acquire(&self, request: Request) -> Context {
        let recycled = self.free.lock().ok().and_then(|mut free| free.pop());
        match recycled {
            Some(mut ctx) => {
                ctx.reset();
                ctx.request = request;
                ctx
            }
            None => Context::new(request),
        }
    }

    pub(crate) fn release(&self, mut ctx: Context) {
        ctx.reset();
        if let Ok(mut free) = self.free.lock() {
            if free.len() < self.capacity {
                free.push(ctx);
            }
        }
    }

    #[cfg(test)]
    fn idle(&self) -> usize {
        self.free.lock().map(|free| free.len()).unwrap_or(0)
    }
}
