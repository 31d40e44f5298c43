//! Local file delivery for [`Response::file`](crate::Response::file) and
//! [`Router::static_dir`](crate::Router::static_dir).

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderValue, Method, StatusCode};
use http_body_util::Full;
use tracing::warn;

use crate::request::Request;
use crate::response::HttpResponse;

/// Reads `path` and answers with its contents. HEAD gets the headers only.
pub(crate) async fn serve_file(path: &Path, method: &Method) -> HttpResponse {
    let contents = match tokio::fs::read(path).await {
        Ok(contents) => contents,
        Err(e) => {
            let status = match e.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
                _ => {
                    warn!(path = %path.display(), "file read failed: {e}");
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            return plain(status);
        }
    };

    let mime = mime_guess::from_path(path).first_or_octet_stream();
    let length = contents.len();
    let body = if *method == Method::HEAD { Bytes::new() } else { Bytes::from(contents) };

    let mut res = HttpResponse::new(Full::new(body));
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        res.headers_mut().insert(CONTENT_TYPE, value);
    }
    res.headers_mut().insert(CONTENT_LENGTH, HeaderValue::from(length));
    res
}

/// Serves `relative` from under `root`. A directory serves its
/// `index.html`; any `..` segment is refused.
pub(crate) async fn serve_dir_entry(root: Arc<Path>, relative: String, req: Request) -> HttpResponse {
    let Some(mut target) = confine(&root, &relative) else {
        return plain(StatusCode::NOT_FOUND);
    };
    if tokio::fs::metadata(&target).await.is_ok_and(|meta| meta.is_dir()) {
        target.push("index.html");
    }
    serve_file(&target, req.method()).await
}

fn confine(root: &Path, relative: &str) -> Option<PathBuf> {
    let mut target = root.to_path_buf();
    for segment in relative.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => return None,
            s => target.push(s),
        }
    }
    Some(target)
}

/// Status plus its reason phrase as a text body.
pub(crate) fn plain(status: StatusCode) -> HttpResponse {
    let reason = status.canonical_reason().unwrap_or_default();
    let mut res = HttpResponse::new(Full::new(Bytes::from(reason)));
    *res.status_mut() = status;
    res.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    res
}
