//! The first-match ("or") combinator.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::trace;

use crate::Result;
use crate::context::Context;
use crate::flow::handler::{DynHandler, Handler, Next};
use crate::socket::Socket;

type Predicate = Arc<dyn Fn(&Context) -> bool + Send + Sync>;

struct Alternate {
    predicate: Predicate,
    branches: Arc<[DynHandler]>,
}

#[async_trait]
impl Handler for Alternate {
    async fn handle(&self, ctx: Context, next: Next) -> Result<()> {
        for (index, branch) in self.branches.iter().enumerate() {
            // Each branch sees a copy of the original context and a no-op
            // continuation, never a sibling's replacements.
            branch.handle(ctx.clone(), Next::noop(ctx.clone())).await?;
            if (self.predicate)(&ctx) {
                trace!(branch = index, "alternation finished");
                return Ok(());
            }
        }
        next.proceed().await
    }
}

/// The default termination predicate: the response has a body or the
/// socket has been ended.
#[must_use]
pub fn finished(ctx: &Context) -> bool {
    ctx.res().has_body() || ctx.socket().is_some_and(Socket::is_ended)
}

/// Try handlers in order until one produces a response or ends the
/// connection.
///
/// When a branch satisfies the predicate, the composed handler returns
/// without invoking its own continuation; when every branch declines, the
/// outer continuation runs.
pub fn or<I>(handlers: I) -> DynHandler
where
    I: IntoIterator<Item = DynHandler>,
{
    or_until(finished, handlers)
}

/// [`or`] with a custom termination predicate (`true` means finished).
pub fn or_until<P, I>(predicate: P, handlers: I) -> DynHandler
where
    P: Fn(&Context) -> bool + Send + Sync + 'static,
    I: IntoIterator<Item = DynHandler>,
{
    Arc::new(Alternate {
        predicate: Arc::new(predicate),
        branches: handlers.into_iter().collect(),
    })
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use url::Url;

    use super::*;
    use crate::flow::handler::handle_fn;
    use crate::request::Request;
    use crate::response::Response;

    fn ctx() -> Context {
        let url = Url::parse("http://localhost/").unwrap();
        Context::new(Request::builder(url).build(), Response::new())
    }

    fn decliner(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> DynHandler {
        let log = log.clone();
        handle_fn(move |_ctx, _next| {
            let log = log.clone();
            async move {
                log.lock().push(name);
                Ok(())
            }
        })
    }

    fn responder(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> DynHandler {
        let log = log.clone();
        handle_fn(move |ctx: Context, _next| {
            let log = log.clone();
            async move {
                log.lock().push(name);
                ctx.res().text(name);
                Ok(())
            }
        })
    }

    async fn invoke(handler: &DynHandler, ctx: Context) -> Result<()> {
        handler.handle(ctx.clone(), Next::noop(ctx)).await
    }

    #[tokio::test]
    async fn first_responder_wins() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let alt = or([
            decliner(&log, "h1"),
            decliner(&log, "h2"),
            responder(&log, "h3"),
            responder(&log, "h4"),
        ]);
        let context = ctx();
        invoke(&alt, context.clone()).await.unwrap();
        assert_eq!(*log.lock(), ["h1", "h2", "h3"]);
        assert_eq!(context.res().body().unwrap().as_text(), Some("h3"));
    }

    #[tokio::test]
    async fn exhausted_branches_fall_through() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let fell_through = Arc::new(Mutex::new(false));
        let flag = fell_through.clone();
        let outer = handle_fn(move |_ctx, _next| {
            let flag = flag.clone();
            async move {
                *flag.lock() = true;
                Ok(())
            }
        });
        let chain = crate::flow::and([
            or([decliner(&log, "h1"), decliner(&log, "h2")]),
            outer,
        ]);
        invoke(&chain, ctx()).await.unwrap();
        assert!(*fell_through.lock());
    }

    #[tokio::test]
    async fn responding_branch_skips_the_outer_next() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let reached = Arc::new(Mutex::new(false));
        let flag = reached.clone();
        let outer = handle_fn(move |_ctx, _next| {
            let flag = flag.clone();
            async move {
                *flag.lock() = true;
                Ok(())
            }
        });
        let chain = crate::flow::and([or([responder(&log, "h1")]), outer]);
        invoke(&chain, ctx()).await.unwrap();
        assert!(!*reached.lock());
    }

    #[tokio::test]
    async fn branches_do_not_see_each_others_context() {
        #[derive(Clone)]
        struct Marker;

        let saw_marker = Arc::new(Mutex::new(false));
        let first = handle_fn(|ctx: Context, next: Next| async move {
            // A replacement forwarded by a branch stays inside the branch.
            next.proceed_with(ctx.with_extension(Marker)).await
        });
        let saw = saw_marker.clone();
        let second = handle_fn(move |ctx: Context, _next| {
            let saw = saw.clone();
            async move {
                *saw.lock() = ctx.get::<Marker>().is_some();
                Ok(())
            }
        });
        invoke(&or([first, second]), ctx()).await.unwrap();
        assert!(!*saw_marker.lock());
    }

    #[tokio::test]
    async fn ended_socket_finishes() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let ender = handle_fn(|ctx: Context, _next| async move {
            if let Some(socket) = ctx.socket() {
                socket.end();
            }
            Ok(())
        });
        let alt = or([ender, decliner(&log, "h2")]);
        let context = ctx().with_socket(Socket::local());
        invoke(&alt, context).await.unwrap();
        assert!(log.lock().is_empty());
    }

    #[tokio::test]
    async fn custom_predicate() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let alt = or_until(
            |ctx| ctx.res().headers().has("x-done"),
            [
                decliner(&log, "h1"),
                handle_fn(|ctx: Context, _next| async move {
                    ctx.res().headers().set("x-done", "1")?;
                    Ok(())
                }),
                decliner(&log, "h3"),
            ],
        );
        invoke(&alt, ctx()).await.unwrap();
        assert_eq!(*log.lock(), ["h1"]);
    }

    #[tokio::test]
    async fn branch_errors_propagate() {
        let alt = or([handle_fn(|_ctx, _next| async {
            Err(crate::Error::other("branch failed"))
        })]);
        assert!(invoke(&alt, ctx()).await.is_err());
    }
}
