//! The immutable value threaded through every handler invocation.
//!
//! Handlers receive a [`Context`] by value and may hand a replacement copy
//! to their continuation; nothing a handler does to its own copy is visible
//! to siblings or ancestors. The request, response, and socket fields are
//! shared handles, so every copy still observes the same underlying
//! response state — replacement is about the route, the extensions, and
//! which request/response a subtree runs against.

use http::Extensions;

use crate::Result;
use crate::request::Request;
use crate::response::Response;
use crate::route::Route;
use crate::server::{FetchTarget, Fetcher, SubRequest};
use crate::socket::Socket;

/// Per-dispatch state handed to every handler.
///
/// The dispatcher prologue guarantees `route`, `socket`, and the
/// self-dispatch capability are present inside a pipeline; contexts built
/// by hand (or by transport adapters) may leave them unset.
#[derive(Debug, Clone)]
pub struct Context {
    req: Request,
    res: Response,
    route: Option<Route>,
    socket: Option<Socket>,
    fetcher: Option<Fetcher>,
    extensions: Extensions,
}

impl Context {
    /// A minimal context for `req` answered by `res`.
    #[must_use]
    pub fn new(req: Request, res: Response) -> Self {
        Self {
            req,
            res,
            route: None,
            socket: None,
            fetcher: None,
            extensions: Extensions::new(),
        }
    }

    /// The request being dispatched.
    #[must_use]
    pub fn req(&self) -> &Request {
        &self.req
    }

    /// The shared response handle.
    #[must_use]
    pub fn res(&self) -> &Response {
        &self.res
    }

    /// The routing state, once the prologue or a matcher installed one.
    #[must_use]
    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    /// The connection, once the transport or the prologue installed one.
    #[must_use]
    pub fn socket(&self) -> Option<&Socket> {
        self.socket.as_ref()
    }

    /// The self-dispatch capability, once a dispatcher installed one.
    #[must_use]
    pub fn fetcher(&self) -> Option<&Fetcher> {
        self.fetcher.as_ref()
    }

    /// The typed extension map.
    #[must_use]
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// A copy with the request replaced.
    #[must_use]
    pub fn with_req(mut self, req: Request) -> Self {
        self.req = req;
        self
    }

    /// A copy with the response replaced.
    #[must_use]
    pub fn with_res(mut self, res: Response) -> Self {
        self.res = res;
        self
    }

    /// A copy with the routing state replaced.
    #[must_use]
    pub fn with_route(mut self, route: Route) -> Self {
        self.route = Some(route);
        self
    }

    /// A copy with the socket replaced.
    #[must_use]
    pub fn with_socket(mut self, socket: Socket) -> Self {
        self.socket = Some(socket);
        self
    }

    /// A copy with the self-dispatch capability replaced.
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: Fetcher) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// A copy with the whole extension map replaced.
    #[must_use]
    pub fn with_extensions(mut self, extensions: Extensions) -> Self {
        self.extensions = extensions;
        self
    }

    /// A copy with one typed extension value inserted.
    #[must_use]
    pub fn with_extension<T>(mut self, value: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        self.extensions.insert(value);
        self
    }

    /// A typed extension value, if one was injected.
    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }

    /// Run `target` through the same pipeline this context came from and
    /// return its response.
    ///
    /// Fails with [`Error::Detached`](crate::Error::Detached) outside a
    /// dispatcher.
    pub async fn fetch(&self, target: impl Into<FetchTarget>) -> Result<Response> {
        self.fetcher
            .as_ref()
            .ok_or(crate::Error::Detached)?
            .fetch(target)
            .await
    }

    /// Start a sub-request against the same pipeline, to be
    /// [`send`](SubRequest::send)-ed or [`push`](SubRequest::push)-ed.
    pub fn sub_request(&self, target: impl Into<FetchTarget>) -> Result<SubRequest> {
        self.fetcher
            .as_ref()
            .ok_or(crate::Error::Detached)?
            .sub_request(target)
    }
}
