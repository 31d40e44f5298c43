//! Minimal junction example: JSON endpoints, a guarded group and static files.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl http://localhost:3000/users/abc          # 404, id must be an integer
//!   curl -X POST http://localhost:3000/users -d '{"name":"alice"}'
//!   curl -X PUT http://localhost:3000/users/42    # 405, Allow: DELETE, GET
//!   curl -H 'x-token: s3cret' http://localhost:3000/admin/stats
//!   curl -i http://localhost:3000/old-users/42

use junction::{
    App, Config, Context, Method, Response, Router, Server, StatusCode, middleware,
};
use serde::Serialize;

#[derive(Serialize)]
struct User<'a> {
    id: u64,
    name: &'a str,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let router = Router::new()
        .middleware(middleware::trace)
        .get("/users/{id:integer}", get_user)
        .post("/users", create_user)
        .delete("/users/{id:integer}", |_: &mut Context| StatusCode::NO_CONTENT)
        .get("/old-users/{id}", |ctx: &mut Context| {
            let id = ctx.param("id").unwrap_or_default();
            Response::redirect(StatusCode::PERMANENT_REDIRECT, &format!("/users/{id}"))
        })
        .group("/admin", |admin| {
            admin
                .middleware(require_token)
                .get("/stats", |_: &mut Context| r#"{"users":1}"#)
        })
        .static_dir("/assets", "./public");

    let app = App::with_config(router, Config::from_env()).method_not_allowed(|ctx: &mut Context| {
        (*ctx.request().method() == Method::OPTIONS).then(|| Response::status(StatusCode::NO_CONTENT))
    });

    Server::bind("0.0.0.0:3000")
        .serve(app)
        .await
        .expect("server error");
}

// GET /users/{id:integer}
fn get_user(ctx: &mut Context) -> Response {
    let id = ctx.param("id").and_then(|id| id.parse().ok()).unwrap_or_default();
    Response::json_value(StatusCode::OK, &User { id, name: "alice" }, false)
}

// POST /users
fn create_user(ctx: &mut Context) -> Response {
    if ctx.request().body().is_empty() {
        return Response::status(StatusCode::BAD_REQUEST);
    }
    Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/users/99")
        .json(br#"{"id":99,"name":"new_user"}"#.to_vec())
}

fn require_token(ctx: &mut Context) -> Option<Response> {
    match ctx.request().header("x-token") {
        Some("s3cret") => ctx.next(),
        _ => Some(Response::status(StatusCode::UNAUTHORIZED)),
    }
}
