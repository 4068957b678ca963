//! The top-level assembly: server registration, the compiled dispatcher,
//! and recursive self-dispatch.
//!
//! A [`Server`] collects handlers; [`Server::get_handler`] compiles them
//! into a [`Dispatcher`] whose prologue fills in a default socket and
//! route, installs the [`Fetcher`] self-dispatch capability, and — after
//! the chain resolves — attaches the security-policy header and drains the
//! response's push queue.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::try_join_all;
use http::Extensions;
use tracing::{debug, trace};
use url::Url;

use crate::context::Context;
use crate::flow::{self, DynHandler, Handler, IntoHandler, Next};
use crate::request::Request;
use crate::response::{Push, Response};
use crate::route::Route;
use crate::router::{self, Router};
use crate::security::CspPolicy;
use crate::socket::{Socket, SocketError};
use crate::{Error, Result, mime};

/// Anything a fetch can resolve into a request.
#[derive(Debug)]
pub enum FetchTarget {
    /// A path resolved against the issuing request's URL.
    Path(String),
    /// An absolute URL.
    Url(Url),
    /// An explicit request, used as-is.
    Request(Request),
}

impl From<&str> for FetchTarget {
    fn from(value: &str) -> Self {
        FetchTarget::Path(value.to_string())
    }
}

impl From<String> for FetchTarget {
    fn from(value: String) -> Self {
        FetchTarget::Path(value)
    }
}

impl From<Url> for FetchTarget {
    fn from(value: Url) -> Self {
        FetchTarget::Url(value)
    }
}

impl From<Request> for FetchTarget {
    fn from(value: Request) -> Self {
        FetchTarget::Request(value)
    }
}

/// Collects handlers and per-server options, then compiles them into a
/// [`Dispatcher`].
#[derive(Default)]
pub struct Server {
    handlers: Vec<DynHandler>,
    base: Extensions,
    csp: CspPolicy,
}

impl Server {
    /// An empty server with the default security policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler to the main chain.
    pub fn use_handler(&mut self, handler: impl IntoHandler) -> &mut Self {
        self.handlers.push(handler.into_handler());
        self
    }

    /// Mount a handler under a path prefix.
    ///
    /// The prefix is matched with subroute capture semantics, so the
    /// mounted handler sees only the remaining path. When the mounted
    /// chain declines to respond, dispatch falls through to the handlers
    /// registered after it.
    pub fn mount(&mut self, prefix: &str, handler: impl IntoHandler) -> &mut Self {
        let guarded = flow::and([router::subroute(prefix), handler.into_handler()]);
        // A single-branch alternation: stop the chain when the mounted
        // handler finished the response, continue past it otherwise.
        self.handlers.push(flow::or([guarded]));
        self
    }

    /// Configure and register a [`Router`] in one step.
    pub fn router(&mut self, configure: impl FnOnce(&mut Router)) -> &mut Self {
        self.use_handler(Router::build(configure))
    }

    /// Inject a typed value into the base context of every dispatch.
    ///
    /// Values injected per-dispatch by the transport take precedence over
    /// the server's base values.
    pub fn context<T>(&mut self, value: T) -> &mut Self
    where
        T: Clone + Send + Sync + 'static,
    {
        self.base.insert(value);
        self
    }

    /// Set the security policy attached to HTML responses.
    pub fn csp(&mut self, policy: CspPolicy) -> &mut Self {
        self.csp = policy;
        self
    }

    /// Compile the registered handlers into a dispatcher.
    #[must_use]
    pub fn get_handler(&self) -> Dispatcher {
        Dispatcher {
            inner: Arc::new(DispatcherInner {
                chain: flow::and(self.handlers.iter().cloned()),
                base: self.base.clone(),
                csp: self.csp.clone(),
            }),
        }
    }
}

impl IntoHandler for &Server {
    fn into_handler(self) -> DynHandler {
        self.get_handler().into_handler()
    }
}

struct DispatcherInner {
    chain: DynHandler,
    base: Extensions,
    csp: CspPolicy,
}

/// A compiled pipeline entry point.
///
/// Cheap to clone; every clone dispatches through the same compiled chain.
/// Also a [`Handler`], so one pipeline can be mounted inside another — the
/// inner prologue keeps the outer routing state instead of restarting it.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

impl Dispatcher {
    /// Run one dispatch to completion.
    ///
    /// Resolves with the prologue-merged context once the chain, the
    /// security header step, and the push drain have all finished. Errors
    /// raised anywhere in the chain propagate here unmodified.
    pub async fn dispatch(&self, ctx: Context) -> Result<Context> {
        let ctx = self.prologue(ctx);
        debug!(method = %ctx.req().method(), url = %ctx.req().url(), "dispatch");
        self.inner
            .chain
            .handle(ctx.clone(), Next::noop(ctx.clone()))
            .await?;
        self.apply_security_header(&ctx)?;
        self.drain_pushes(&ctx).await?;
        Ok(ctx)
    }

    fn prologue(&self, mut ctx: Context) -> Context {
        if ctx.socket().is_none() {
            ctx = ctx.with_socket(Socket::local());
        }
        if ctx.route().is_none() {
            let route = Route::from_url(ctx.req().url());
            ctx = ctx.with_route(route);
        }
        let mut extensions = self.inner.base.clone();
        extensions.extend(ctx.extensions().clone());
        ctx = ctx.with_extensions(extensions);
        // The fetcher's seed deliberately lacks a fetcher of its own;
        // sub-dispatches install a fresh one in their own prologue.
        let fetcher = Fetcher {
            inner: Arc::new(FetcherInner {
                dispatcher: self.clone(),
                seed: ctx.clone(),
            }),
        };
        ctx.with_fetcher(fetcher)
    }

    fn apply_security_header(&self, ctx: &Context) -> Result<()> {
        let policy = {
            let headers = ctx.res().headers();
            if headers.has("content-security-policy") {
                return Ok(());
            }
            let html_typed = match headers.get("content-type") {
                Some(content_type) => mime::matches("text/html", &content_type),
                None => true,
            };
            if !html_typed {
                return Ok(());
            }
            self.inner.csp.policy_for(ctx.req().url())
        };
        if let Some(policy) = policy {
            ctx.res().headers().set("content-security-policy", policy)?;
        }
        Ok(())
    }

    async fn drain_pushes(&self, ctx: &Context) -> Result<()> {
        let pushes = ctx.res().take_pushes();
        if pushes.is_empty() {
            return Ok(());
        }
        let socket = match ctx.socket() {
            Some(socket) if socket.can_push() => socket.clone(),
            // Best-effort side channel: without the capability the queue
            // is discarded.
            _ => {
                debug!(discarded = pushes.len(), "push queue discarded");
                return Ok(());
            }
        };
        debug!(count = pushes.len(), "draining pushes");
        let fetcher = ctx.fetcher().ok_or(Error::Detached)?;
        try_join_all(pushes.into_iter().map(|push| {
            let socket = socket.clone();
            async move {
                let response = match push {
                    Push::Ready(response) => response,
                    Push::Pending {
                        request,
                        extensions,
                    } => fetcher.run(request, extensions).await?,
                };
                socket.push(response).await
            }
        }))
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Handler for Dispatcher {
    async fn handle(&self, ctx: Context, next: Next) -> Result<()> {
        let ctx = self.dispatch(ctx).await?;
        next.proceed_with(ctx).await
    }
}

impl IntoHandler for Dispatcher {
    fn into_handler(self) -> DynHandler {
        Arc::new(self)
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Dispatcher")
    }
}

struct FetcherInner {
    dispatcher: Dispatcher,
    seed: Context,
}

/// The self-dispatch capability installed by the dispatcher prologue.
///
/// Bound to the pipeline it came from and to the context it was installed
/// into: sub-requests inherit that context's socket and extensions, carry
/// the issuing request as their parent, and run through the identical
/// compiled chain with a fresh response.
#[derive(Clone)]
pub struct Fetcher {
    inner: Arc<FetcherInner>,
}

impl Fetcher {
    /// Resolve `target` and run it through the pipeline, returning the
    /// sub-request's response.
    pub async fn fetch(&self, target: impl Into<FetchTarget>) -> Result<Response> {
        let request = self.resolve(target.into())?;
        self.run(request, None).await
    }

    /// Resolve `target` into a [`SubRequest`] without dispatching yet.
    pub fn sub_request(&self, target: impl Into<FetchTarget>) -> Result<SubRequest> {
        Ok(SubRequest {
            fetcher: self.clone(),
            request: self.resolve(target.into())?,
        })
    }

    fn resolve(&self, target: FetchTarget) -> Result<Request> {
        match target {
            FetchTarget::Request(request) => Ok(request),
            FetchTarget::Url(url) => Ok(self.derive(url)),
            FetchTarget::Path(path) => {
                let url = self.inner.seed.req().url().join(&path)?;
                Ok(self.derive(url))
            }
        }
    }

    fn derive(&self, url: Url) -> Request {
        let issuing = self.inner.seed.req();
        Request::builder(url)
            .sender(issuing.sender())
            .parent(issuing.clone())
            .build()
    }

    pub(crate) async fn run(
        &self,
        request: Request,
        extensions: Option<Extensions>,
    ) -> Result<Response> {
        trace!(url = %request.url(), "sub-request");
        let response = Response::for_url(request.url().clone());
        let mut ctx = Context::new(request, response.clone());
        if let Some(socket) = self.inner.seed.socket() {
            ctx = ctx.with_socket(socket.clone());
        }
        let mut merged = self.inner.seed.extensions().clone();
        if let Some(extensions) = extensions {
            merged.extend(extensions);
        }
        ctx = ctx.with_extensions(merged);
        // Dispatch can reach back here through the push drain; boxing the
        // recursive call keeps the future finitely sized.
        Box::pin(self.inner.dispatcher.dispatch(ctx)).await?;
        Ok(response)
    }
}

impl fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fetcher")
            .field("origin", &self.inner.seed.req().url().as_str())
            .finish()
    }
}

/// A resolved sub-request, ready to dispatch.
#[derive(Debug)]
#[must_use]
pub struct SubRequest {
    fetcher: Fetcher,
    request: Request,
}

impl SubRequest {
    /// The request that will be dispatched.
    #[must_use]
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Dispatch and return the response.
    pub async fn send(self) -> Result<Response> {
        self.fetcher.run(self.request, None).await
    }

    /// Dispatch, transmit the response over the issuing context's socket
    /// as a push, and return it.
    ///
    /// Fails up front when the socket lacks the push capability.
    pub async fn push(self) -> Result<Response> {
        let socket = match self.fetcher.inner.seed.socket() {
            Some(socket) if socket.can_push() => socket.clone(),
            _ => return Err(SocketError::PushUnsupported.into()),
        };
        let response = self.fetcher.run(self.request, None).await?;
        socket.push(response.clone()).await?;
        Ok(response)
    }
}
