//! Request profiling hooks.
//!
//! A [`Profiler`] observes requests as the [`App`](crate::App) processes
//! them. Every method has an empty default, so implementations only
//! override what they care about.

use http::StatusCode;

use crate::request::Request;
use crate::route::RouteInfo;

pub trait Profiler: Send + Sync {
    /// A request arrived and is about to be routed.
    fn on_start_request(&self, _req: &Request) {}

    /// Routing finished. `route` is `None` when nothing matched.
    fn on_select_route(&self, _req: &Request, _route: Option<&RouteInfo>) {}

    /// The wire response is ready.
    fn on_write_response(&self, _status: StatusCode, _body_len: usize) {}

    /// Something went wrong while handling a request.
    fn error(&self, _message: &str) {}

    fn warning(&self, _message: &str) {}
}
