//! A single registered route.

use std::fmt;
use std::sync::Arc;

use crate::handler::BoxedHandler;
use crate::pattern::{CompiledPattern, Params};

/// What a handler can learn about the route that matched its request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RouteInfo {
    base_path: Arc<str>,
    handler_count: usize,
}

impl RouteInfo {
    /// The full template the route was registered with, group prefixes
    /// included.
    pub fn base_path(&self) -> &str { &self.base_path }

    /// Length of the resolved chain: inherited middleware plus the route's
    /// own handlers.
    pub fn handler_count(&self) -> usize { self.handler_count }
}

/// A compiled path template bound to its handler chain.
///
/// The chain is fixed at registration: the middleware visible to the route
/// at that moment, followed by the handlers passed to the registration call.
pub struct CompiledRoute {
    pattern: CompiledPattern,
    chain: Arc<[BoxedHandler]>,
    info: RouteInfo,
}

impl CompiledRoute {
    pub(crate) fn new(pattern: CompiledPattern, chain: Vec<BoxedHandler>) -> Self {
        let info = RouteInfo {
            base_path: Arc::from(pattern.template()),
            handler_count: chain.len(),
        };
        Self { pattern, chain: Arc::from(chain), info }
    }

    pub fn base_path(&self) -> &str { self.info.base_path() }
    pub fn pattern(&self) -> &CompiledPattern { &self.pattern }
    pub fn info(&self) -> &RouteInfo { &self.info }

    /// Matches `path` against this route, literally or by regex.
    pub fn check_path(&self, path: &str) -> Option<Params> {
        self.pattern.captures(path)
    }

    pub(crate) fn chain(&self) -> &Arc<[BoxedHandler]> {
        &self.chain
    }
}

impl fmt::Debug for CompiledRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledRoute")
            .field("pattern", &self.pattern)
            .field("handlers", &self.chain.len())
            .finish()
    }
}
