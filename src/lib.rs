//! # junction
//!
//! An HTTP routing core: path templates compiled to matchers, a tree of
//! route groups with middleware, and a forward-only cursor that walks the
//! resolved handler chain for each request.
//!
//! ## The pieces
//!
//! - **Templates**: `/users/{id:integer}`, `/files/{rest:path}`,
//!   `/{kind:enum(a,b)}`. Literal templates compare as plain strings; the
//!   rest compile to one anchored [`regex`] each. See [`Modifier`].
//! - **Tree**: a [`Router`] holds routes per method in registration order
//!   and child groups keyed by prefix. The first registered match wins.
//! - **Chain**: middleware visible when a route is registered, then the
//!   route's own handlers. [`Context::next`] moves one step forward.
//! - **App**: dispatch with 404 / 405 / 501 fallbacks and a single panic
//!   guard. [`Server`] runs it on hyper with graceful shutdown.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use junction::{middleware, Context, Response, Router, Server, StatusCode};
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Router::new()
//!         .middleware(middleware::trace)
//!         .get("/users/{id:integer}", get_user)
//!         .group("/admin", |admin| admin.middleware(require_token).get("/stats", stats));
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! fn get_user(ctx: &mut Context) -> Response {
//!     let id = ctx.param("id").unwrap_or_default();
//!     Response::json(format!(r#"{{"id":{id}}}"#).into_bytes())
//! }
//!
//! fn require_token(ctx: &mut Context) -> Option<Response> {
//!     match ctx.request().header("authorization") {
//!         Some(_) => ctx.next(),
//!         None => Some(Response::status(StatusCode::UNAUTHORIZED)),
//!     }
//! }
//!
//! fn stats(_: &mut Context) -> &'static str {
//!     "{}"
//! }
//! ```

mod app;
mod config;
mod context;
mod error;
mod files;
mod handler;
mod path;
mod pattern;
mod profiler;
mod request;
mod response;
mod route;
mod router;
mod server;

pub mod middleware;

pub use app::{AllowedMethods, App};
pub use config::{Config, DEBUG_ENV};
pub use context::{Context, Cursor};
pub use error::Error;
pub use handler::{Chain, Handler, IntoChain, IntoOutcome};
pub use http::{Method, StatusCode};
pub use pattern::{CompiledPattern, Modifier, Params};
pub use profiler::Profiler;
pub use request::Request;
pub use response::{
    ContentType, FILE_PATH_HEADER, HttpResponse, IntoResponse, REDIRECT_HEADER, Response,
    ResponseBuilder, StreamHandler,
};
pub use route::{CompiledRoute, RouteInfo};
pub use router::{Resolution, Router};
pub use server::Server;
