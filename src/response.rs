//! Outgoing HTTP response type and the [`IntoResponse`] conversion trait.
//!
//! A [`Response`] carries a status, body bytes and a header list, or a
//! stream callback that produces the wire response itself. Two header keys
//! are reserved as instructions for the server layer and never reach the
//! client: [`REDIRECT_HEADER`] and [`FILE_PATH_HEADER`]. The router passes
//! them through untouched.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;
use serde::Serialize;

use crate::request::Request;

/// Header key asking the server to redirect to its value.
pub const REDIRECT_HEADER: &str = "_StrongRedirect";

/// Header key asking the server to send the local file named by its value.
pub const FILE_PATH_HEADER: &str = "_FilePath";

/// The response type hyper writes to the connection.
pub type HttpResponse = http::Response<Full<Bytes>>;

/// A deferred response producer. It runs in the server after the handler
/// chain has returned, so it may do I/O.
pub type StreamHandler =
    Box<dyn FnOnce(Request) -> Pin<Box<dyn Future<Output = HttpResponse> + Send>> + Send>;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`ResponseBuilder::bytes`].
pub enum ContentType {
    Csv,
    Html,
    Json,
    OctetStream,
    Text,
    Xml,
}

impl ContentType {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Csv         => "text/csv",
            Self::Html        => "text/html; charset=utf-8",
            Self::Json        => "application/json; charset=utf-8",
            Self::OctetStream => "application/octet-stream",
            Self::Text        => "text/plain; charset=utf-8",
            Self::Xml         => "application/xml; charset=utf-8",
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// ```rust
/// use junction::Response;
/// use http::StatusCode;
///
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::text("hello");
/// Response::status(StatusCode::NO_CONTENT);
///
/// Response::builder()
///     .status(StatusCode::CREATED)
///     .header("location", "/users/42")
///     .json(br#"{"id":42}"#.to_vec());
/// ```
pub struct Response {
    pub(crate) status: StatusCode,
    pub(crate) body: Vec<u8>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) stream: Option<StreamHandler>,
}

impl Response {
    /// `200 OK` with `application/json`.
    pub fn json(body: Vec<u8>) -> Self {
        Self::builder().bytes(ContentType::Json, body)
    }

    /// `200 OK` with `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self { status: code, body: Vec::new(), headers: Vec::new(), stream: None }
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: Vec::new(), status: StatusCode::OK }
    }

    /// Serializes `value` with serde_json. `pretty` selects indented output.
    ///
    /// A serialization failure yields `500` with the error text.
    pub fn json_value<T: Serialize + ?Sized>(status: StatusCode, value: &T, pretty: bool) -> Self {
        let encoded = if pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        };
        match encoded {
            Ok(body) => Self::builder().status(status).bytes(ContentType::Json, body),
            Err(e) => Self::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .text(e.to_string()),
        }
    }

    /// Redirect to `location`. Statuses outside `300..=308` (other than
    /// `201 Created`) become `301 Moved Permanently`.
    pub fn redirect(status: StatusCode, location: &str) -> Self {
        let status = if (300..=308).contains(&status.as_u16()) || status == StatusCode::CREATED {
            status
        } else {
            StatusCode::MOVED_PERMANENTLY
        };
        Self::builder().status(status).header(REDIRECT_HEADER, location).no_body()
    }

    /// Send the local file at `path`.
    pub fn file(path: impl Into<String>) -> Self {
        Self::builder().header(FILE_PATH_HEADER, &path.into()).no_body()
    }

    /// Hand response production to `handler`, which runs after dispatch.
    pub fn stream<F, Fut>(handler: F) -> Self
    where
        F: FnOnce(Request) -> Fut + Send + 'static,
        Fut: Future<Output = HttpResponse> + Send + 'static,
    {
        Self {
            status: StatusCode::OK,
            body: Vec::new(),
            headers: Vec::new(),
            stream: Some(Box::new(move |req| Box::pin(handler(req)))),
        }
    }

    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }

    /// First header with `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Appends a header. Middleware uses this to decorate a downstream
    /// response.
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_owned(), value.to_owned()));
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// `true` when a stream callback will produce the output. The stream
    /// wins over any body bytes.
    pub fn is_stream(&self) -> bool {
        self.stream.is_some()
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .field("stream", &self.stream.is_some())
            .finish()
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `200 OK`.
/// Terminated by a typed body method.
pub struct ResponseBuilder {
    headers: Vec<(String, String)>,
    status: StatusCode,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn json(self, body: Vec<u8>) -> Response {
        self.bytes(ContentType::Json, body)
    }

    pub fn text(self, body: impl Into<String>) -> Response {
        self.bytes(ContentType::Text, body.into().into_bytes())
    }

    /// Terminate with a typed body.
    pub fn bytes(self, content_type: ContentType, body: Vec<u8>) -> Response {
        let mut headers = vec![("content-type".to_owned(), content_type.as_str().to_owned())];
        headers.extend(self.headers);
        Response { status: self.status, body, headers, stream: None }
    }

    pub fn no_body(self) -> Response {
        Response { status: self.status, body: Vec::new(), headers: self.headers, stream: None }
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::status(self) }
}
