//! Handler trait and type erasure.
//!
//! # How handlers are stored
//!
//! A route's chain mixes handlers of *different* types: closures, plain
//! functions, built-in middleware. Rust collections can only hold one
//! concrete type, so every handler is hidden behind a trait object
//! (`dyn ErasedHandler`) and stored uniformly:
//!
//! ```text
//! fn hello(ctx: &mut Context) -> Response { … }   ← user writes this
//!        ↓ router.get("/", hello)
//! hello.into_boxed_handler()                      ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(hello))                      ← heap-allocated wrapper
//!        ↓  stored as BoxedHandler = Arc<dyn ErasedHandler>
//! handler.call(ctx)  at request time              ← one vtable dispatch
//! ```
//!
//! Handlers are synchronous. Routing and dispatch are in-memory work; I/O
//! that a response needs (file contents, streamed bodies) happens in the
//! server after the chain has returned.

use std::sync::Arc;

use crate::context::Context;
use crate::response::{IntoResponse, Response};

// ── Internal types ────────────────────────────────────────────────────────────

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, ctx: &mut Context) -> Option<Response>;
}

/// A type-erased handler shared by every route and request that uses it.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Outcome conversion ────────────────────────────────────────────────────────

/// What a handler hands back to the chain.
///
/// `None` means "not answered here, continue with the next handler".
/// Anything that converts into a [`Response`] answers the request.
pub trait IntoOutcome {
    fn into_outcome(self) -> Option<Response>;
}

impl IntoOutcome for Option<Response> {
    fn into_outcome(self) -> Option<Response> { self }
}

impl IntoOutcome for Response {
    fn into_outcome(self) -> Option<Response> { Some(self) }
}

impl IntoOutcome for http::StatusCode {
    fn into_outcome(self) -> Option<Response> { Some(self.into_response()) }
}

impl IntoOutcome for &'static str {
    fn into_outcome(self) -> Option<Response> { Some(self.into_response()) }
}

impl IntoOutcome for String {
    fn into_outcome(self) -> Option<Response> { Some(self.into_response()) }
}

/// `()` never answers: the handler only inspects or decorates the context.
impl IntoOutcome for () {
    fn into_outcome(self) -> Option<Response> { None }
}

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler or middleware.
///
/// You never implement this yourself. It is automatically satisfied for any
/// function or closure with the signature:
///
/// ```text
/// fn name(ctx: &mut Context) -> impl IntoOutcome
/// ```
///
/// The trait is **sealed**: only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, R> private::Sealed for F
where
    F: Fn(&mut Context) -> R + Send + Sync + 'static,
    R: IntoOutcome,
{
}

impl<F, R> Handler for F
where
    F: Fn(&mut Context) -> R + Send + Sync + 'static,
    R: IntoOutcome,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

/// Newtype wrapper that holds a concrete handler `F` and implements
/// [`ErasedHandler`], bridging the typed world to the trait-object world.
struct FnHandler<F>(F);

impl<F, R> ErasedHandler for FnHandler<F>
where
    F: Fn(&mut Context) -> R + Send + Sync,
    R: IntoOutcome,
{
    fn call(&self, ctx: &mut Context) -> Option<Response> {
        (self.0)(ctx).into_outcome()
    }
}

// ── Chains ────────────────────────────────────────────────────────────────────

/// An ordered list of handlers registered together on one route.
///
/// A single handler converts into a one-element chain, so most routes never
/// name this type:
///
/// ```rust
/// use junction::{Chain, Context, Response, Router};
///
/// fn auth(ctx: &mut Context) -> Option<Response> { ctx.next() }
/// fn show(_ctx: &mut Context) -> Response { Response::text("ok") }
///
/// let router = Router::new()
///     .get("/plain", show)
///     .get("/guarded", Chain::new().then(auth).then(show));
/// ```
#[derive(Clone, Default)]
pub struct Chain {
    handlers: Vec<BoxedHandler>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `handler` to the end of the chain.
    pub fn then(mut self, handler: impl Handler) -> Self {
        self.handlers.push(handler.into_boxed_handler());
        self
    }

    pub fn len(&self) -> usize { self.handlers.len() }
    pub fn is_empty(&self) -> bool { self.handlers.is_empty() }

    pub(crate) fn into_handlers(self) -> Vec<BoxedHandler> {
        self.handlers
    }
}

/// Conversion into the handler list a route is registered with.
pub trait IntoChain {
    fn into_chain(self) -> Chain;
}

impl IntoChain for Chain {
    fn into_chain(self) -> Chain { self }
}

impl<H: Handler> IntoChain for H {
    fn into_chain(self) -> Chain {
        Chain::new().then(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Request;

    fn ctx() -> Context {
        Context::new(Request::get("/"))
    }

    #[test]
    fn unit_return_continues() {
        let h = (|_: &mut Context| ()).into_boxed_handler();
        assert!(h.call(&mut ctx()).is_none());
    }

    #[test]
    fn status_return_answers() {
        let h = (|_: &mut Context| http::StatusCode::ACCEPTED).into_boxed_handler();
        assert_eq!(h.call(&mut ctx()).unwrap().status_code(), http::StatusCode::ACCEPTED);
    }

    #[test]
    fn chain_keeps_order() {
        let chain = Chain::new()
            .then(|_: &mut Context| "first")
            .then(|_: &mut Context| "second");
        assert_eq!(chain.len(), 2);
        let handlers = chain.into_handlers();
        assert_eq!(handlers[0].call(&mut ctx()).unwrap().body(), b"first");
        assert_eq!(handlers[1].call(&mut ctx()).unwrap().body(), b"second");
    }

    #[test]
    fn single_handler_is_a_one_element_chain() {
        fn show(_: &mut Context) -> Response { Response::text("ok") }
        assert_eq!(show.into_chain().len(), 1);
        assert!(Chain::new().into_chain().is_empty());
    }
}
