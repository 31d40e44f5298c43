//! Unified error type.

/// The error type returned by junction's fallible operations.
///
/// Application-level errors (404, 501, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// infrastructure failures (binding to a port) and registration mistakes
/// (a template that does not compile, a malformed method name).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid route template `{template}`: {source}")]
    Pattern {
        template: String,
        #[source]
        source: regex::Error,
    },

    #[error("HTTP method [{0}] not valid")]
    InvalidMethod(String),
}
