use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use http_body_util::BodyExt;
use junction::{App, Context, HttpResponse, Method, Request, Response, Router, StatusCode};

async fn body_of(res: HttpResponse) -> Bytes {
    res.into_body().collect().await.unwrap().to_bytes()
}

#[tokio::test]
async fn static_file_serves_get_and_head() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("robots.txt");
    std::fs::write(&file, "User-agent: *").unwrap();

    let app = App::new(Router::new().static_file("/robots.txt", file.to_str().unwrap()));

    let res = app.respond(Request::get("/robots.txt")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[CONTENT_TYPE], "text/plain");
    assert_eq!(body_of(res).await, "User-agent: *");

    let res = app.respond(Request::new(Method::HEAD, "/robots.txt")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[CONTENT_LENGTH], "13");
    assert!(body_of(res).await.is_empty());
}

#[tokio::test]
async fn static_file_missing_on_disk_is_404() {
    let app = App::new(Router::new().static_file("/gone", "/definitely/not/here.txt"));
    let res = app.respond(Request::get("/gone")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn static_dir_serves_nested_files_and_refuses_escapes() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("css")).unwrap();
    std::fs::write(dir.path().join("css/site.css"), "body{}").unwrap();
    std::fs::write(dir.path().join("index.html"), "<p>home</p>").unwrap();

    let app = App::new(Router::new().group("/assets", |g| g.static_dir("/", dir.path())));

    let res = app.respond(Request::get("/assets/css/site.css")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[CONTENT_TYPE], "text/css");
    assert_eq!(body_of(res).await, "body{}");

    let res = app.respond(Request::get("/assets/")).await;
    assert_eq!(body_of(res).await, "<p>home</p>");

    let res = app.respond(Request::get("/assets/../secret")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn redirect_becomes_location_header() {
    let app = App::new(Router::new().get("/old/{id}", |ctx: &mut Context| {
        let target = format!("/new/{}", ctx.param("id").unwrap_or_default());
        Response::redirect(StatusCode::OK, &target)
    }));
    let res = app.respond(Request::get("/old/5")).await;
    assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(res.headers()[LOCATION], "/new/5");
}

#[tokio::test]
async fn plain_response_keeps_status_and_headers() {
    let app = App::new(Router::new().post("/things", |_: &mut Context| {
        Response::builder()
            .status(StatusCode::CREATED)
            .header("location", "/things/1")
            .json(br#"{"id":1}"#.to_vec())
    }));
    let res = app.respond(Request::new(Method::POST, "/things").with_body("{}")).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(res.headers()[LOCATION], "/things/1");
    assert_eq!(res.headers()[CONTENT_TYPE], "application/json; charset=utf-8");
    assert_eq!(body_of(res).await, r#"{"id":1}"#);
}

#[tokio::test]
async fn not_found_is_json_on_the_wire() {
    let app = App::new(Router::new());
    let res = app.respond(Request::get("/nowhere")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = serde_json::from_slice(&body_of(res).await).unwrap();
    assert_eq!(body["metadata"]["path"], "/nowhere");
}
