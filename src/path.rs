//! Path joining with clean-path semantics.

/// Joins a base path and a relative path.
///
/// The result is lexically cleaned (`.`/`..` resolved, duplicate slashes
/// collapsed). A trailing slash on `relative` survives the cleaning, so a
/// group at `/files/` keeps its trailing slash.
pub(crate) fn join(base: &str, relative: &str) -> String {
    if relative.is_empty() {
        return base.to_owned();
    }
    let mut joined = clean(&format!("{base}/{relative}"));
    if relative.ends_with('/') && !joined.ends_with('/') {
        joined.push('/');
    }
    joined
}

/// Lexically cleans a slash-separated path. Always returns an absolute path.
pub(crate) fn clean(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    format!("/{}", parts.join("/"))
}
