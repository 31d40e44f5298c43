//! Application configuration.
//!
//! There is no process-wide state: an [`App`](crate::App) is handed its
//! `Config` when it is built, and everything that depends on the debug flag
//! reads it from there.

/// Environment variable read by [`Config::from_env`].
pub const DEBUG_ENV: &str = "JUNCTION_DEBUG";

const DEFAULT_POOL_CAPACITY: usize = 1024;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    debug: bool,
    pool_capacity: usize,
}

impl Config {
    /// Defaults, with `debug` taken from `JUNCTION_DEBUG` when it holds a
    /// boolean (`1`, `t`, `true`, `0`, `f`, `false`, any case).
    pub fn from_env() -> Self {
        let debug = std::env::var(DEBUG_ENV).ok().and_then(|v| parse_bool(&v));
        Self { debug: debug.unwrap_or(false), ..Self::default() }
    }

    /// Debug mode pretty-prints the built-in JSON error bodies.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// How many idle request contexts are kept for reuse.
    pub fn pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = capacity;
        self
    }

    pub fn is_debug(&self) -> bool { self.debug }
    pub fn context_pool_capacity(&self) -> usize { self.pool_capacity }
}

impl Default for Config {
    fn default() -> Self {
        Self { debug: false, pool_capacity: DEFAULT_POOL_CAPACITY }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" => Some(true),
        "0" | "f" | "false" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_accepts_short_forms() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" t "), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("yes"), None);
    }

    #[test]
    fn builder_setters() {
        let config = Config::default().debug(true).pool_capacity(8);
        assert!(config.is_debug());
        assert_eq!(config.context_pool_capacity(), 8);
    }
}
