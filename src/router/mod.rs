//! Method- and path-based routing over the flow combinators.
//!
//! A [`Router`] is an ordered table of `(method, pattern, handler)`
//! entries plus shared "before" handlers. It compiles to
//! `or(and(matcher, before..., handlers...))`: matchers decline without
//! side effects, alternation tries entries in registration order, and an
//! entry whose downstream handlers leave the response empty falls through
//! to later ones.
//!
//! Pattern syntax: literal segments match exactly, `:name` captures one
//! segment into the route's parameters, and a trailing `/*` captures the
//! remainder for subrouting. Trailing slashes never matter.

mod pattern;

use std::sync::Arc;

use async_trait::async_trait;
use http::Method;
use tracing::trace;

use crate::Result;
use crate::context::Context;
use crate::flow::{self, DynHandler, Handler, IntoHandler, Next};
use crate::route::Route;
use crate::router::pattern::Pattern;

struct Matcher {
    method: Option<Method>,
    pattern: Pattern,
    source: String,
}

#[async_trait]
impl Handler for Matcher {
    async fn handle(&self, ctx: Context, next: Next) -> Result<()> {
        if let Some(method) = &self.method
            && ctx.req().method() != method
        {
            return Ok(());
        }
        let route = match ctx.route() {
            Some(route) => route.clone(),
            // Standalone use outside a dispatcher prologue.
            None => Route::from_url(ctx.req().url()),
        };
        match self.pattern.match_route(&route) {
            Some(advanced) => {
                trace!(pattern = %self.source, path = %route.full_path(), "route matched");
                next.proceed_with(ctx.with_route(advanced)).await
            }
            None => {
                trace!(pattern = %self.source, path = %route.path(), "route declined");
                Ok(())
            }
        }
    }
}

/// A standalone exact matcher for `pattern`, any method.
///
/// Proceeds with the advanced route on a match and declines otherwise;
/// compose it with [`and`](crate::flow::and) to guard an arbitrary chain.
#[must_use]
pub fn route(pattern: &str) -> DynHandler {
    Arc::new(Matcher {
        method: None,
        pattern: Pattern::parse(pattern),
        source: pattern.to_string(),
    })
}

/// A prefix matcher with subroute capture semantics, any method.
pub(crate) fn subroute(pattern: &str) -> DynHandler {
    Arc::new(Matcher {
        method: None,
        pattern: Pattern::subroute(pattern),
        source: pattern.to_string(),
    })
}

struct Entry {
    matcher: Arc<Matcher>,
    handlers: Vec<DynHandler>,
}

/// An ordered routing table compiled onto the flow combinators.
#[derive(Default)]
pub struct Router {
    entries: Vec<Entry>,
    before: Vec<DynHandler>,
}

impl Router {
    /// An empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure a router in a closure and compile it in one step.
    pub fn build(configure: impl FnOnce(&mut Router)) -> DynHandler {
        let mut router = Router::new();
        configure(&mut router);
        router.get_handler()
    }

    /// Register a handler to run on every entry that matched its pattern,
    /// before the entry's own handlers. Never runs unconditionally.
    pub fn before(&mut self, handler: impl IntoHandler) -> &mut Self {
        self.before.push(handler.into_handler());
        self
    }

    fn entry(&mut self, method: Option<Method>, pattern: &str, handler: DynHandler) -> &mut Self {
        self.entries.push(Entry {
            matcher: Arc::new(Matcher {
                method,
                pattern: Pattern::parse(pattern),
                source: pattern.to_string(),
            }),
            handlers: vec![handler],
        });
        self
    }

    /// Register a handler for one method and an exact pattern.
    pub fn method(
        &mut self,
        method: Method,
        pattern: &str,
        handler: impl IntoHandler,
    ) -> &mut Self {
        self.entry(Some(method), pattern, handler.into_handler())
    }

    /// Register the same handler under several methods.
    pub fn methods(
        &mut self,
        methods: &[Method],
        pattern: &str,
        handler: impl IntoHandler,
    ) -> &mut Self {
        let handler = handler.into_handler();
        for method in methods {
            self.entry(Some(method.clone()), pattern, handler.clone());
        }
        self
    }

    /// Register a handler for every method.
    pub fn all(&mut self, pattern: &str, handler: impl IntoHandler) -> &mut Self {
        self.entry(None, pattern, handler.into_handler())
    }

    /// Register a `GET` handler.
    pub fn get(&mut self, pattern: &str, handler: impl IntoHandler) -> &mut Self {
        self.method(Method::GET, pattern, handler)
    }

    /// Register a `HEAD` handler.
    pub fn head(&mut self, pattern: &str, handler: impl IntoHandler) -> &mut Self {
        self.method(Method::HEAD, pattern, handler)
    }

    /// Register a `POST` handler.
    pub fn post(&mut self, pattern: &str, handler: impl IntoHandler) -> &mut Self {
        self.method(Method::POST, pattern, handler)
    }

    /// Register a `PUT` handler.
    pub fn put(&mut self, pattern: &str, handler: impl IntoHandler) -> &mut Self {
        self.method(Method::PUT, pattern, handler)
    }

    /// Register a `PATCH` handler.
    pub fn patch(&mut self, pattern: &str, handler: impl IntoHandler) -> &mut Self {
        self.method(Method::PATCH, pattern, handler)
    }

    /// Register a `DELETE` handler.
    pub fn delete(&mut self, pattern: &str, handler: impl IntoHandler) -> &mut Self {
        self.method(Method::DELETE, pattern, handler)
    }

    /// Register an `OPTIONS` handler.
    pub fn options(&mut self, pattern: &str, handler: impl IntoHandler) -> &mut Self {
        self.method(Method::OPTIONS, pattern, handler)
    }

    /// Mount a handler under a prefix, any method.
    ///
    /// The pattern is compiled with a trailing wildcard; the matched
    /// prefix moves into the route's base path and only the remainder is
    /// visible to the mounted handler, so routers nest to arbitrary depth.
    pub fn route(&mut self, pattern: &str, handler: impl IntoHandler) -> &mut Self {
        self.entries.push(Entry {
            matcher: Arc::new(Matcher {
                method: None,
                pattern: Pattern::subroute(pattern),
                source: pattern.to_string(),
            }),
            handlers: vec![handler.into_handler()],
        });
        self
    }

    /// Compile the table into a single handler.
    #[must_use]
    pub fn get_handler(&self) -> DynHandler {
        let branches: Vec<DynHandler> = self
            .entries
            .iter()
            .map(|entry| {
                let mut chain: Vec<DynHandler> =
                    Vec::with_capacity(1 + self.before.len() + entry.handlers.len());
                let matcher: DynHandler = entry.matcher.clone();
                chain.push(matcher);
                chain.extend(self.before.iter().cloned());
                chain.extend(entry.handlers.iter().cloned());
                flow::and(chain)
            })
            .collect();
        flow::or(branches)
    }
}

impl IntoHandler for &Router {
    fn into_handler(self) -> DynHandler {
        self.get_handler()
    }
}

impl IntoHandler for Router {
    fn into_handler(self) -> DynHandler {
        self.get_handler()
    }
}
