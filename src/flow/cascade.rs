//! The sequential ("and") combinator.

use std::sync::Arc;

use async_trait::async_trait;

use crate::Result;
use crate::context::Context;
use crate::flow::handler::{DynHandler, Handler, Next};

struct Cascade {
    chain: Arc<[DynHandler]>,
}

#[async_trait]
impl Handler for Cascade {
    async fn handle(&self, ctx: Context, next: Next) -> Result<()> {
        // The inner chain's terminal continuation threads into this
        // cascade's own `next`, which is what makes composition
        // associative.
        Next::chained(self.chain.clone(), ctx.clone(), Some(Box::new(next)))
            .run(ctx)
            .await
    }
}

/// Compose handlers into one depth-first chain.
///
/// Handler `i` wraps everything after it: its code before awaiting
/// [`Next`] runs before handler `i + 1` starts, and its code after runs
/// once the whole downstream subtree has resolved. A handler that never
/// calls its continuation ends the chain early. The composed handler
/// resolves only after every continuation call that was made has resolved.
pub fn and<I>(handlers: I) -> DynHandler
where
    I: IntoIterator<Item = DynHandler>,
{
    Arc::new(Cascade {
        chain: handlers.into_iter().collect(),
    })
}
