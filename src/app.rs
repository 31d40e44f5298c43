//! The application: a finished route tree plus everything dispatch needs.
//!
//! [`App`] is what the server runs. It owns the root [`Router`], the
//! [`Config`], a pool of request contexts and the fallback handlers that
//! answer when routing does not produce a response:
//!
//! | outcome                                   | answered by                  |
//! |-------------------------------------------|------------------------------|
//! | route matched, a handler answered         | that handler                 |
//! | route matched, chain exhausted            | [`App::not_implemented`] 501 |
//! | path matched only for other methods       | [`App::method_not_allowed`] 405 |
//! | nothing matched                           | [`App::not_found`] 404       |
//!
//! Before a 404 or 405 fallback runs, the root middleware chain gets a pass
//! at the request, so root middleware (a CORS preflight answer, say) can
//! respond to paths no route covers.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{ALLOW, LOCATION};
use http::{HeaderName, HeaderValue, Method, StatusCode};
use http_body_util::Full;
use hyper::body::Body;
use serde::Serialize;
use tracing::{error, warn};

use crate::config::Config;
use crate::context::{Context, ContextPool};
use crate::files;
use crate::handler::{BoxedHandler, Handler};
use crate::pattern::Params;
use crate::profiler::Profiler;
use crate::request::Request;
use crate::response::{HttpResponse, Response, FILE_PATH_HEADER, REDIRECT_HEADER};
use crate::router::{Resolution, Router};

/// Methods a path would have accepted, left in the context metadata for the
/// 405 handler.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AllowedMethods(pub Vec<Method>);

impl AllowedMethods {
    /// The list as an `Allow` header value: `GET, POST`.
    pub fn header_value(&self) -> String {
        self.0.iter().map(Method::as_str).collect::<Vec<_>>().join(", ")
    }
}

#[derive(Clone, Copy)]
enum Fallback {
    NotFound,
    NotImplemented,
    MethodNotAllowed,
}

pub struct App {
    router: Router,
    root_chain: Arc<[BoxedHandler]>,
    config: Config,
    pool: ContextPool,
    profiler: Option<Arc<dyn Profiler>>,
    not_found: Option<BoxedHandler>,
    not_implemented: Option<BoxedHandler>,
    method_not_allowed: Option<BoxedHandler>,
}

impl App {
    pub fn new(router: Router) -> Self {
        Self::with_config(router, Config::default())
    }

    pub fn with_config(router: Router, config: Config) -> Self {
        Self {
            root_chain: router.middleware_chain(),
            pool: ContextPool::new(config.context_pool_capacity()),
            router,
            config,
            profiler: None,
            not_found: None,
            not_implemented: None,
            method_not_allowed: None,
        }
    }

    pub fn router(&self) -> &Router { &self.router }
    pub fn config(&self) -> &Config { &self.config }

    pub fn profiler(mut self, profiler: impl Profiler + 'static) -> Self {
        self.profiler = Some(Arc::new(profiler));
        self
    }

    /// Replaces the 404 handler. Returning nothing falls back to the
    /// built-in JSON answer.
    pub fn not_found(mut self, handler: impl Handler) -> Self {
        self.not_found = Some(handler.into_boxed_handler());
        self
    }

    /// Replaces the 501 handler used when a matched route's chain ends
    /// without an answer.
    pub fn not_implemented(mut self, handler: impl Handler) -> Self {
        self.not_implemented = Some(handler.into_boxed_handler());
        self
    }

    /// Replaces the 405 handler. The allowed methods are in the context
    /// metadata as [`AllowedMethods`].
    pub fn method_not_allowed(mut self, handler: impl Handler) -> Self {
        self.method_not_allowed = Some(handler.into_boxed_handler());
        self
    }

    /// Runs `request` through the route tree only: no fallbacks, no root
    /// middleware pass for unmatched paths. `None` when nothing answered or
    /// a handler panicked.
    pub fn local_do(&self, request: Request) -> Option<Response> {
        let mut ctx = self.pool.acquire(request);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let resolution = {
                let req = ctx.request();
                self.router.resolve(req.method(), req.path())
            };
            match resolution {
                Resolution::Matched { route, params } => {
                    ctx.bind(Arc::clone(route.chain()), Some(route.info().clone()), params);
                    ctx.run()
                }
                _ => None,
            }
        }));
        let response = match outcome {
            Ok(response) => response,
            Err(panic) => {
                self.report_panic(ctx.request(), panic.as_ref());
                None
            }
        };
        self.pool.release(ctx);
        response
    }

    /// Dispatches `request` and always produces a response, falling back to
    /// 404, 405, 501 or 500 as needed.
    pub fn handle(&self, request: Request) -> Response {
        self.dispatch(request).0
    }

    /// Dispatches `request` and turns the result into the wire response:
    /// streams run, reserved headers are acted on, HEAD loses its body.
    pub async fn respond(&self, request: Request) -> HttpResponse {
        let (response, request) = self.dispatch(request);
        let res = write_response(response, request).await;
        if let Some(profiler) = &self.profiler {
            let len = res.body().size_hint().exact().unwrap_or(0);
            profiler.on_write_response(res.status(), len as usize);
        }
        res
    }

    pub(crate) fn dispatch(&self, request: Request) -> (Response, Request) {
        if let Some(profiler) = &self.profiler {
            profiler.on_start_request(&request);
        }
        let mut ctx = self.pool.acquire(request);

        let response = match panic::catch_unwind(AssertUnwindSafe(|| self.route(&mut ctx))) {
            Ok(response) => response,
            Err(panic) => {
                self.report_panic(ctx.request(), panic.as_ref());
                Response::builder()
                    .status(StatusCode::INTERNAL_SERVER_ERROR)
                    .text("Internal Server Error")
            }
        };

        if let Some(profiler) = &self.profiler {
            profiler.on_select_route(ctx.request(), ctx.route_info());
        }
        let request = ctx.take_request();
        self.pool.release(ctx);
        (response, request)
    }

    fn route(&self, ctx: &mut Context) -> Response {
        let resolution = {
            let req = ctx.request();
            self.router.resolve(req.method(), req.path())
        };
        match resolution {
            Resolution::Matched { route, params } => {
                ctx.bind(Arc::clone(route.chain()), Some(route.info().clone()), params);
                match ctx.run() {
                    Some(res) => res,
                    None => self.fallback(Fallback::NotImplemented, ctx),
                }
            }
            Resolution::MethodNotAllowed { allowed } => {
                if let Some(res) = self.root_pass(ctx) {
                    return res;
                }
                ctx.metadata_mut().insert(AllowedMethods(allowed));
                self.fallback(Fallback::MethodNotAllowed, ctx)
            }
            Resolution::NotFound => match self.root_pass(ctx) {
                Some(res) => res,
                None => self.fallback(Fallback::NotFound, ctx),
            },
        }
    }

    fn root_pass(&self, ctx: &mut Context) -> Option<Response> {
        if self.root_chain.is_empty() {
            return None;
        }
        ctx.bind(Arc::clone(&self.root_chain), None, Params::new());
        ctx.run()
    }

    fn fallback(&self, kind: Fallback, ctx: &mut Context) -> Response {
        let custom = match kind {
            Fallback::NotFound => &self.not_found,
            Fallback::NotImplemented => &self.not_implemented,
            Fallback::MethodNotAllowed => &self.method_not_allowed,
        };
        if let Some(res) = custom.as_ref().and_then(|handler| handler.call(ctx)) {
            return res;
        }

        let pretty = self.config.is_debug();
        match kind {
            Fallback::NotFound => error_response(StatusCode::NOT_FOUND, "Route not found", ctx, pretty),
            Fallback::NotImplemented => error_response(
                StatusCode::NOT_IMPLEMENTED,
                "Response not implemented for current Route",
                ctx,
                pretty,
            ),
            Fallback::MethodNotAllowed => {
                let mut res = error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed", ctx, pretty);
                if let Some(allowed) = ctx.metadata().get::<AllowedMethods>() {
                    res.set_header(ALLOW.as_str(), &allowed.header_value());
                }
                res
            }
        }
    }

    fn report_panic(&self, req: &Request, panic: &(dyn Any + Send)) {
        let message = panic_message(panic);
        error!(method = %req.method(), path = req.path(), "handler panicked: {message}");
        if let Some(profiler) = &self.profiler {
            profiler.error(&format!("handler panicked: {message}"));
        }
    }
}

impl From<Router> for App {
    fn from(router: Router) -> Self {
        Self::new(router)
    }
}

// ── Built-in error bodies ─────────────────────────────────────────────────────

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    msg: &'a str,
    metadata: ErrorMetadata<'a>,
}

#[derive(Serialize)]
struct ErrorMetadata<'a> {
    method: &'a str,
    path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    route: Option<&'a str>,
}

fn error_response(status: StatusCode, msg: &str, ctx: &Context, pretty: bool) -> Response {
    let body = ErrorBody {
        code: status.as_str(),
        msg,
        metadata: ErrorMetadata {
            method: ctx.request().method().as_str(),
            path: ctx.request().path(),
            route: ctx.route_info().map(|info| info.base_path()),
        },
    };
    Response::json_value(status, &body, pretty)
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "unknown panic payload"
    }
}

// ── Wire conversion ───────────────────────────────────────────────────────────

/// Builds the wire response, acting on the reserved headers.
async fn write_response(mut response: Response, request: Request) -> HttpResponse {
    if let Some(stream) = response.stream.take() {
        return stream(request).await;
    }

    if let Some(location) = response.header(REDIRECT_HEADER) {
        let mut res = HttpResponse::new(Full::new(Bytes::new()));
        *res.status_mut() = response.status;
        match HeaderValue::from_str(location) {
            Ok(value) => {
                res.headers_mut().insert(LOCATION, value);
            }
            Err(_) => warn!(location, "redirect target is not a valid header value"),
        }
        return res;
    }

    if let Some(file) = response.header(FILE_PATH_HEADER) {
        return files::serve_file(Path::new(file), request.method()).await;
    }

    let head_only = *request.method() == Method::HEAD;
    let body = if head_only { Bytes::new() } else { Bytes::from(response.body) };
    let mut res = HttpResponse::new(Full::new(body));
    *res.status_mut() = response.status;
    for (name, value) in &response.headers {
        let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value))
        else {
            warn!(header = %name, "dropping response header that is not valid HTTP");
            continue;
        };
        res.headers_mut().append(name, value);
    }
    res
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use http_body_util::BodyExt;

    use super::*;

    async fn body_of(res: HttpResponse) -> Bytes {
        res.into_body().collect().await.unwrap().to_bytes()
    }

    #[test]
    fn allowed_methods_header_value() {
        let allowed = AllowedMethods(vec![Method::GET, Method::POST]);
        assert_eq!(allowed.header_value(), "GET, POST");
    }

    #[test]
    fn default_not_found_body() {
        let app = App::new(Router::new());
        let res = app.handle(Request::get("/missing"));
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
        let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "code": "404",
                "msg": "Route not found",
                "metadata": { "method": "GET", "path": "/missing" }
            })
        );
    }

    #[test]
    fn not_implemented_names_the_route() {
        let app = App::new(Router::new().get("/users/{id}", |_: &mut Context| ()));
        let res = app.handle(Request::get("/users/7"));
        assert_eq!(res.status_code(), StatusCode::NOT_IMPLEMENTED);
        let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["metadata"]["route"], "/users/{id}");
    }

    #[test]
    fn debug_config_pretty_prints_error_bodies() {
        let app = App::with_config(Router::new(), Config::default().debug(true));
        let res = app.handle(Request::get("/missing"));
        assert!(res.body().starts_with(b"{\n"));
    }

    #[test]
    fn custom_fallback_can_decline() {
        let app = App::new(Router::new()).not_found(|ctx: &mut Context| {
            (ctx.request().path() == "/teapot").then(|| Response::status(StatusCode::IM_A_TEAPOT))
        });
        assert_eq!(app.handle(Request::get("/teapot")).status_code(), StatusCode::IM_A_TEAPOT);
        assert_eq!(app.handle(Request::get("/other")).status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn method_not_allowed_lists_methods() {
        let app = App::new(Router::new().get("/items", |_: &mut Context| "list"));
        let res = app.handle(Request::new(Method::DELETE, "/items"));
        assert_eq!(res.status_code(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(res.header("allow"), Some("GET"));
    }

    #[test]
    fn panic_becomes_internal_error_and_reaches_profiler() {
        #[derive(Clone, Default)]
        struct Errors(Arc<Mutex<Vec<String>>>);
        impl Profiler for Errors {
            fn error(&self, message: &str) {
                self.0.lock().unwrap().push(message.to_owned());
            }
        }

        let errors = Errors::default();
        let app = App::new(Router::new().get("/boom", |_: &mut Context| -> Response { panic!("kaboom") }))
            .profiler(errors.clone());

        let res = app.handle(Request::get("/boom"));
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(errors.0.lock().unwrap().as_slice(), ["handler panicked: kaboom"]);
    }

    #[tokio::test]
    async fn redirect_sets_location_without_body() {
        let app = App::new(Router::new().get("/old", |_: &mut Context| {
            Response::redirect(StatusCode::FOUND, "/new")
        }));
        let res = app.respond(Request::get("/old")).await;
        assert_eq!(res.status(), StatusCode::FOUND);
        assert_eq!(res.headers()[LOCATION], "/new");
        assert!(res.headers().get(REDIRECT_HEADER).is_none());
        assert!(body_of(res).await.is_empty());
    }

    #[tokio::test]
    async fn head_response_has_no_body() {
        let app = App::new(Router::new().head("/ping", |_: &mut Context| "pong"));
        let res = app.respond(Request::new(Method::HEAD, "/ping")).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(body_of(res).await.is_empty());
    }

    #[tokio::test]
    async fn stream_response_receives_the_request() {
        let app = App::new(Router::new().get("/echo", |_: &mut Context| {
            Response::stream(|req: Request| async move {
                HttpResponse::new(Full::new(Bytes::from(req.path().to_owned())))
            })
        }));
        let res = app.respond(Request::get("/echo")).await;
        assert_eq!(body_of(res).await, "/echo");
    }
}
