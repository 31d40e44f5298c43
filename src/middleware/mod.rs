//! Built-in middleware.
//!
//! Middleware is an ordinary handler that calls [`Context::next`] to run the
//! rest of the chain and then inspects or decorates what comes back:
//!
//! ```rust
//! use junction::{middleware, Context, Router};
//!
//! let app = Router::new()
//!     .middleware(middleware::trace)
//!     .get("/health", |_: &mut Context| "ok");
//! ```

use std::time::Instant;

use tracing::{info, info_span};

use crate::context::Context;
use crate::response::Response;

/// Per-request span with method and path; logs status and latency once the
/// downstream chain returns.
pub fn trace(ctx: &mut Context) -> Option<Response> {
    let started = Instant::now();
    let span = info_span!(
        "request",
        method = %ctx.request().method(),
        path = ctx.request().path(),
    );
    let _entered = span.enter();

    let response = ctx.run();
    let latency_us = started.elapsed().as_micros() as u64;
    match &response {
        Some(res) => info!(status = res.status_code().as_u16(), latency_us, "request handled"),
        None => info!(latency_us, "no handler answered"),
    }
    response
}
