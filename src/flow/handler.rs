//! The handler shape and its continuation.

use std::sync::Arc;

use async_trait::async_trait;

use crate::Result;
use crate::context::Context;

/// A unit of request processing.
///
/// A handler decides whether to answer the request itself, whether to call
/// its continuation at all, and whether to do work before and/or after
/// awaiting it. Errors propagate to the caller unmodified through every
/// enclosing combinator.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Process `ctx`, optionally continuing with `next`.
    async fn handle(&self, ctx: Context, next: Next) -> Result<()>;
}

/// A shared, type-erased handler.
pub type DynHandler = Arc<dyn Handler>;

/// Normalization into the uniform handler shape.
///
/// Applied once at composition time: routers and servers compile their
/// pipeline when they are registered, not per invocation. Closures are
/// wrapped with [`handle_fn`] first.
pub trait IntoHandler {
    /// Produce the callable form.
    fn into_handler(self) -> DynHandler;
}

impl IntoHandler for DynHandler {
    fn into_handler(self) -> DynHandler {
        self
    }
}

struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Context, Next) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send,
{
    async fn handle(&self, ctx: Context, next: Next) -> Result<()> {
        (self.0)(ctx, next).await
    }
}

/// Wrap a plain async closure as a [`DynHandler`].
pub fn handle_fn<F, Fut>(f: F) -> DynHandler
where
    F: Fn(Context, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

/// The continuation a handler may invoke to run the rest of its chain.
///
/// Holds the remaining handlers of the current chain as a shared slice
/// plus a cursor, and the enclosing chain's continuation — advancement is
/// iterative, so arbitrarily long chains do not deepen the call stack per
/// handler.
pub struct Next {
    chain: Arc<[DynHandler]>,
    index: usize,
    ctx: Context,
    parent: Option<Box<Next>>,
}

impl Next {
    /// A terminal continuation: calling it resolves immediately.
    ///
    /// This is what the last handler of a top-level chain receives, and
    /// what alternation branches receive so they cannot run further than
    /// one step.
    #[must_use]
    pub fn noop(ctx: Context) -> Self {
        Self {
            chain: Arc::from(Vec::<DynHandler>::new()),
            index: 0,
            ctx,
            parent: None,
        }
    }

    pub(crate) fn chained(chain: Arc<[DynHandler]>, ctx: Context, parent: Option<Box<Next>>) -> Self {
        Self {
            chain,
            index: 0,
            ctx,
            parent,
        }
    }

    /// Continue with the context this continuation was created with.
    pub async fn proceed(self) -> Result<()> {
        let ctx = self.ctx.clone();
        self.run(ctx).await
    }

    /// Continue with a replacement context, visible only downstream.
    pub async fn proceed_with(self, ctx: Context) -> Result<()> {
        self.run(ctx).await
    }

    pub(crate) async fn run(mut self, ctx: Context) -> Result<()> {
        loop {
            if self.index < self.chain.len() {
                let handler = self.chain[self.index].clone();
                let next = Next {
                    chain: self.chain,
                    index: self.index + 1,
                    ctx: ctx.clone(),
                    parent: self.parent,
                };
                return handler.handle(ctx, next).await;
            }
            match self.parent {
                // The chain is exhausted; thread into the enclosing one.
                Some(parent) => self = *parent,
                None => return Ok(()),
            }
        }
    }
}
