//! Route tree: registration and resolution.
//!
//! A [`Router`] node owns its routes (per method, in registration order),
//! its local middleware and its child groups. Resolution descends from the
//! root only; no node needs to know its parent.
//!
//! # Middleware visibility
//!
//! Middleware attached to a node applies to every route registered under
//! that node *afterwards*, directly or through any nested group, and to no
//! route registered before it. Each route snapshots its full chain when it
//! is registered, so resolution never has to re-assemble it.
//!
//! # Matching order
//!
//! Within a node, routes for the request's method are tried in registration
//! order and the first match wins. There is no specificity ranking:
//! `/{id:integer}` registered before `/{slug}` takes `/42` because it is
//! checked first. When no route at a node matches, resolution descends into
//! the first child group whose prefix accepts the path and does not come
//! back.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use http::Method;
use tracing::debug;

use crate::context::Context;
use crate::error::Error;
use crate::files;
use crate::handler::{BoxedHandler, Chain, Handler, IntoChain};
use crate::path;
use crate::pattern::{Anchor, CompiledPattern, Params};
use crate::response::Response;
use crate::route::CompiledRoute;

/// Methods covered by [`Router::any`].
const ANY_METHODS: [Method; 5] = [Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE];

/// Outcome of resolving a method and path against the tree.
#[derive(Debug)]
pub enum Resolution<'a> {
    /// A route matched both path and method.
    Matched { route: &'a CompiledRoute, params: Params },
    /// Routes matched the path, but only for other methods.
    MethodNotAllowed { allowed: Vec<Method> },
    /// Nothing matched the path.
    NotFound,
}

/// A node of the route tree: the application root or a nested group.
///
/// Build it once at startup; every registration returns `self` so calls
/// chain naturally:
///
/// ```rust
/// use junction::{Context, Response, Router};
///
/// fn list(_: &mut Context) -> Response { Response::text("[]") }
/// fn show(ctx: &mut Context) -> Response {
///     Response::text(ctx.param("id").unwrap_or_default().to_owned())
/// }
///
/// let router = Router::new()
///     .get("/users", list)
///     .group("/v1", |v1| v1.get("/users/{id:integer}", show));
/// ```
pub struct Router {
    base_path: String,
    prefix: Option<CompiledPattern>,
    inherited: Vec<BoxedHandler>,
    middleware: Vec<BoxedHandler>,
    routes: HashMap<Method, Vec<CompiledRoute>>,
    groups: Vec<(String, Router)>,
}

impl Router {
    pub fn new() -> Self {
        Self::nested("/".to_owned())
    }

    fn nested(base_path: String) -> Self {
        let prefix = base_path
            .contains('{')
            .then(|| {
                CompiledPattern::compile_anchored(&base_path, Anchor::Prefix)
                    .unwrap_or_else(|e| panic!("{e}"))
            })
            .filter(|p| !p.is_literal());
        Self {
            base_path,
            prefix,
            inherited: Vec::new(),
            middleware: Vec::new(),
            routes: HashMap::new(),
            groups: Vec::new(),
        }
    }

    /// The full path this node is mounted at.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    // ── Registration ─────────────────────────────────────────────────────────

    /// Register a handler chain for a method + path pair.
    ///
    /// # Panics
    ///
    /// Panics if the template does not compile (a malformed `regexp(…)`).
    pub fn on(mut self, method: Method, path: &str, chain: impl IntoChain) -> Self {
        let template = path::join(&self.base_path, path);
        let pattern = CompiledPattern::compile(&template).unwrap_or_else(|e| panic!("{e}"));

        let own = chain.into_chain().into_handlers();
        let mut handlers = Vec::with_capacity(self.inherited.len() + self.middleware.len() + own.len());
        handlers.extend(self.inherited.iter().cloned());
        handlers.extend(self.middleware.iter().cloned());
        handlers.extend(own);

        debug!(
            method = %method,
            route = %template,
            regex = pattern.regex_source().unwrap_or("<literal>"),
            params = ?pattern.names(),
            handlers = handlers.len(),
            "route registered"
        );

        self.routes
            .entry(method)
            .or_default()
            .push(CompiledRoute::new(pattern, handlers));
        self
    }

    /// Like [`on`](Router::on), with the method given as a string.
    ///
    /// # Panics
    ///
    /// Panics unless `method` is one or more ASCII uppercase letters.
    pub fn handle(self, method: &str, path: &str, chain: impl IntoChain) -> Self {
        let method = parse_method(method).unwrap_or_else(|e| panic!("{e}"));
        self.on(method, path, chain)
    }

    pub fn get(self, path: &str, chain: impl IntoChain) -> Self { self.on(Method::GET, path, chain) }
    pub fn post(self, path: &str, chain: impl IntoChain) -> Self { self.on(Method::POST, path, chain) }
    pub fn put(self, path: &str, chain: impl IntoChain) -> Self { self.on(Method::PUT, path, chain) }
    pub fn patch(self, path: &str, chain: impl IntoChain) -> Self { self.on(Method::PATCH, path, chain) }
    pub fn delete(self, path: &str, chain: impl IntoChain) -> Self { self.on(Method::DELETE, path, chain) }
    pub fn options(self, path: &str, chain: impl IntoChain) -> Self { self.on(Method::OPTIONS, path, chain) }
    pub fn head(self, path: &str, chain: impl IntoChain) -> Self { self.on(Method::HEAD, path, chain) }

    /// Registers the same chain under GET, POST, PUT, PATCH and DELETE.
    /// Other methods are not covered.
    pub fn any(self, path: &str, chain: impl IntoChain) -> Self {
        let chain = chain.into_chain();
        ANY_METHODS
            .iter()
            .fold(self, |router, method| router.on(method.clone(), path, chain.clone()))
    }

    /// Attaches middleware to this node. It runs before the handlers of
    /// every route registered under this node from now on.
    pub fn middleware(mut self, handler: impl Handler) -> Self {
        self.middleware.push(handler.into_boxed_handler());
        self
    }

    /// Creates the group at `path` (or re-opens it if it already exists)
    /// and lets `build` register into it.
    ///
    /// The group inherits every middleware visible at this node right now.
    /// Its base path may contain placeholders; they are matched as a prefix
    /// and extracted by the routes registered inside.
    pub fn group(mut self, path: &str, build: impl FnOnce(Router) -> Router) -> Self {
        let base = path::join(&self.base_path, path);
        let index = match self.groups.iter().position(|(key, _)| *key == base) {
            Some(index) => index,
            None => {
                self.groups.push((base.clone(), Router::nested(base)));
                self.groups.len() - 1
            }
        };

        let mut inherited = self.inherited.clone();
        inherited.extend(self.middleware.iter().cloned());

        let slot = &mut self.groups[index].1;
        let mut group = std::mem::take(slot);
        group.inherited = inherited;
        *slot = build(group);
        self
    }

    /// Serves one file at `path` for GET and HEAD.
    pub fn static_file(self, path: &str, file: &str) -> Self {
        let file = file.to_owned();
        let chain = Chain::new().then(move |_: &mut Context| Response::file(file.clone()));
        self.get(path, chain.clone()).head(path, chain)
    }

    /// Serves the directory tree under `root` at `path/…` for GET and HEAD.
    ///
    /// The file is read after the chain returns, through a stream response.
    /// Paths that climb out of `root` are answered with `404`.
    pub fn static_dir(self, path: &str, root: impl Into<PathBuf>) -> Self {
        let root: Arc<Path> = Arc::from(root.into());
        let chain = Chain::new().then(move |ctx: &mut Context| {
            let relative = ctx.param("filepath").unwrap_or_default().to_owned();
            let root = Arc::clone(&root);
            Response::stream(move |req| files::serve_dir_entry(root, relative, req))
        });
        let template = path::join(path, "{filepath:path}");
        self.get(&template, chain.clone()).head(&template, chain)
    }

    // ── Resolution ───────────────────────────────────────────────────────────

    /// Finds the route for `method` and `path`.
    pub fn resolve(&self, method: &Method, path: &str) -> Resolution<'_> {
        let mut allowed = Vec::new();
        match self.descend(method, path, &mut allowed) {
            Some((route, params)) => Resolution::Matched { route, params },
            None if allowed.is_empty() => Resolution::NotFound,
            None => {
                allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
                allowed.dedup();
                Resolution::MethodNotAllowed { allowed }
            }
        }
    }

    fn descend<'a>(
        &'a self,
        method: &Method,
        path: &str,
        allowed: &mut Vec<Method>,
    ) -> Option<(&'a CompiledRoute, Params)> {
        if let Some(routes) = self.routes.get(method) {
            for route in routes {
                if let Some(params) = route.check_path(path) {
                    return Some((route, params));
                }
            }
        }

        for (other, routes) in &self.routes {
            if other != method && routes.iter().any(|r| r.check_path(path).is_some()) {
                allowed.push(other.clone());
            }
        }

        let (_, group) = self.groups.iter().find(|(_, group)| group.accepts(path))?;
        group.descend(method, path, allowed)
    }

    /// `true` when `path` lies under this node.
    fn accepts(&self, path: &str) -> bool {
        match &self.prefix {
            Some(prefix) => prefix.is_match(path),
            None => {
                let base = self.base_path.trim_end_matches('/');
                base.is_empty()
                    || path
                        .strip_prefix(base)
                        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
            }
        }
    }

    /// The middleware of this node, as run for requests that match no
    /// route.
    pub(crate) fn middleware_chain(&self) -> Arc<[BoxedHandler]> {
        self.inherited.iter().chain(&self.middleware).cloned().collect()
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

fn parse_method(raw: &str) -> Result<Method, Error> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(Error::InvalidMethod(raw.to_owned()));
    }
    Method::from_bytes(raw.as_bytes()).map_err(|_| Error::InvalidMethod(raw.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(text: &'static str) -> impl Fn(&mut Context) -> Response + Send + Sync + 'static {
        move |_: &mut Context| Response::text(text)
    }

    fn matched<'a>(router: &'a Router, method: Method, path: &str) -> (&'a CompiledRoute, Params) {
        match router.resolve(&method, path) {
            Resolution::Matched { route, params } => (route, params),
            other => panic!("{method} {path}: expected a match, got {other:?}"),
        }
    }

    fn run(route: &CompiledRoute, params: Params) -> Option<Response> {
        let mut ctx = Context::new(crate::Request::get("/"));
        ctx.bind(Arc::clone(route.chain()), Some(route.info().clone()), params);
        ctx.next()
    }

    #[test]
    fn registration_order_breaks_ties() {
        let router = Router::new()
            .get("/{id:integer}", reply("integer"))
            .get("/{slug}", reply("slug"));

        let (route, params) = matched(&router, Method::GET, "/42");
        assert_eq!(route.base_path(), "/{id:integer}");
        assert_eq!(params["id"], "42");

        let (route, _) = matched(&router, Method::GET, "/hello");
        assert_eq!(route.base_path(), "/{slug}");
    }

    #[test]
    fn later_general_route_shadows_nothing_registered_earlier() {
        let router = Router::new()
            .get("/{slug}", reply("slug"))
            .get("/{id:integer}", reply("integer"));
        let (route, _) = matched(&router, Method::GET, "/42");
        assert_eq!(route.base_path(), "/{slug}");
    }

    #[test]
    fn group_prefix_matching() {
        let router = Router::new().group("/v1", |v1| v1.get("/{name}", reply("v1")));

        let (route, params) = matched(&router, Method::GET, "/v1/alice");
        assert_eq!(route.base_path(), "/v1/{name}");
        assert_eq!(params["name"], "alice");

        assert!(matches!(router.resolve(&Method::GET, "/v2/alice"), Resolution::NotFound));
        assert!(matches!(router.resolve(&Method::GET, "/v10/alice"), Resolution::NotFound));
    }

    #[test]
    fn group_with_placeholder_prefix() {
        let router = Router::new().group("/{id:integer}", |g| {
            g.middleware(|ctx: &mut Context| ctx.next()).get("", reply("ok"))
        });
        let (route, params) = matched(&router, Method::GET, "/12");
        assert_eq!(params["id"], "12");
        assert_eq!(route.info().handler_count(), 2);
        assert!(matches!(router.resolve(&Method::GET, "/abc"), Resolution::NotFound));
    }

    #[test]
    fn nested_groups_join_paths() {
        let router = Router::new().group("/api", |api| {
            api.group("/v2/", |v2| v2.get("users/{id:integer}", reply("user")))
        });
        let (route, params) = matched(&router, Method::GET, "/api/v2/users/3");
        assert_eq!(route.base_path(), "/api/v2/users/{id:integer}");
        assert_eq!(params["id"], "3");
    }

    #[test]
    fn descends_into_first_accepting_group_only() {
        let router = Router::new()
            .group("/api", |api| api.get("/a", reply("a")))
            .group("/api/b", |b| b.get("", reply("b")));
        assert!(matches!(router.resolve(&Method::GET, "/api/b"), Resolution::NotFound));
    }

    #[test]
    fn root_routes_are_tried_before_groups() {
        let router = Router::new()
            .group("/users", |g| g.get("/{id}", reply("group")))
            .get("/users/{id}", reply("root"));
        let (route, _) = matched(&router, Method::GET, "/users/1");
        assert_eq!(run(route, Params::new()).unwrap().body(), b"root");
    }

    #[test]
    fn other_methods_are_reported() {
        let router = Router::new()
            .post("/items/{id}", reply("post"))
            .delete("/items/{id}", reply("delete"))
            .get("/other", reply("other"));

        match router.resolve(&Method::GET, "/items/9") {
            Resolution::MethodNotAllowed { allowed } => {
                assert_eq!(allowed, [Method::DELETE, Method::POST]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(router.resolve(&Method::GET, "/nothing"), Resolution::NotFound));
    }

    #[test]
    fn other_methods_are_collected_across_groups() {
        let router = Router::new()
            .put("/v1/{x}", reply("root put"))
            .group("/v1", |g| g.patch("/{x}", reply("group patch")));
        match router.resolve(&Method::GET, "/v1/x") {
            Resolution::MethodNotAllowed { allowed } => {
                assert_eq!(allowed, [Method::PATCH, Method::PUT]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn any_covers_five_methods_only() {
        let router = Router::new().any("/hook", reply("any"));
        for method in ANY_METHODS {
            matched(&router, method, "/hook");
        }
        assert!(matches!(
            router.resolve(&Method::OPTIONS, "/hook"),
            Resolution::MethodNotAllowed { .. }
        ));
        assert!(matches!(
            router.resolve(&Method::HEAD, "/hook"),
            Resolution::MethodNotAllowed { .. }
        ));
    }

    #[test]
    fn handle_accepts_custom_uppercase_methods() {
        let router = Router::new().handle("PURGE", "/cache", reply("purged"));
        let purge = Method::from_bytes(b"PURGE").unwrap();
        matched(&router, purge, "/cache");
    }

    #[test]
    #[should_panic(expected = "HTTP method [get] not valid")]
    fn handle_rejects_lowercase_method() {
        let _ = Router::new().handle("get", "/", reply("x"));
    }

    #[test]
    #[should_panic(expected = "invalid route template")]
    fn malformed_regexp_panics_at_registration() {
        let _ = Router::new().get("/{x:regexp((unclosed)}", reply("x"));
    }

    #[test]
    fn middleware_sees_only_later_routes() {
        let router = Router::new()
            .get("/before", reply("before"))
            .middleware(|_: &mut Context| ())
            .get("/after", reply("after"));

        assert_eq!(matched(&router, Method::GET, "/before").0.info().handler_count(), 1);
        assert_eq!(matched(&router, Method::GET, "/after").0.info().handler_count(), 2);
    }

    #[test]
    fn reopened_group_sees_middleware_added_since() {
        let router = Router::new()
            .group("/g", |g| g.get("/early", reply("early")))
            .middleware(|_: &mut Context| ())
            .group("/g", |g| g.get("/late", reply("late")));

        assert_eq!(router.groups.len(), 1);
        assert_eq!(matched(&router, Method::GET, "/g/early").0.info().handler_count(), 1);
        assert_eq!(matched(&router, Method::GET, "/g/late").0.info().handler_count(), 2);
    }

    #[test]
    fn middleware_runs_in_registration_order() {
        let router = Router::new()
            .middleware(|ctx: &mut Context| {
                let mut res = ctx.next()?;
                res.set_header("x-order", "outer");
                Some(res)
            })
            .group("/g", |g| {
                g.middleware(|ctx: &mut Context| {
                    let mut res = ctx.next()?;
                    res.set_header("x-order", "inner");
                    Some(res)
                })
                .get("/r", reply("route"))
            });

        let (route, params) = matched(&router, Method::GET, "/g/r");
        let res = run(route, params).unwrap();
        let order: Vec<&str> = res
            .headers()
            .iter()
            .filter(|(k, _)| k == "x-order")
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(order, ["inner", "outer"]);
    }

    #[test]
    fn static_file_answers_get_and_head() {
        let router = Router::new().static_file("/favicon.ico", "./public/favicon.ico");
        for method in [Method::GET, Method::HEAD] {
            let (route, params) = matched(&router, method, "/favicon.ico");
            let res = run(route, params).unwrap();
            assert_eq!(res.header(crate::FILE_PATH_HEADER), Some("./public/favicon.ico"));
        }
    }

    #[test]
    fn static_dir_captures_trailing_path() {
        let router = Router::new().group("/assets", |g| g.static_dir("/static", "./public"));
        let (route, params) = matched(&router, Method::HEAD, "/assets/static/css/site.css");
        assert_eq!(params["filepath"], "css/site.css");
        assert!(run(route, params).unwrap().is_stream());
    }

    #[test]
    fn parse_method_validates_shape() {
        assert_eq!(parse_method("GET").unwrap(), Method::GET);
        assert!(matches!(parse_method(""), Err(Error::InvalidMethod(_))));
        assert!(matches!(parse_method("G3T"), Err(Error::InvalidMethod(_))));
    }
}
