//! # trellis
//!
//! A composable request-dispatch core for HTTP-style server toolkits.
//!
//! Many independent handling units compose into one pipeline that processes
//! an inbound request and produces a response, with conditional branching,
//! path-based routing, and internally-issued sub-requests (including server
//! push). Transport bindings, sessions, and static file serving live outside
//! this crate; a [`Context`] carrying the request/response/socket triple is
//! handed in already negotiated.
//!
//! ## Building blocks
//!
//! - [`flow::and`] runs handlers depth-first, each wrapping the rest of the
//!   chain through its [`Next`] continuation (onion ordering).
//! - [`flow::or`] tries handlers in order until one produces a response or
//!   ends the connection, then stops.
//! - [`Router`] compiles method/pattern entries onto the two combinators and
//!   threads captured parameters through a [`Route`] value.
//! - [`Server`] assembles the registered handlers into a [`Dispatcher`]
//!   whose prologue fills in defaults, installs the self-dispatch
//!   capability, and drains queued pushes after the chain resolves.
//!
//! ## Quick start
//!
//! ```
//! use trellis::{handle_fn, Server};
//!
//! let mut server = Server::new();
//! server.router(|r| {
//!     r.get(
//!         "/users/:id",
//!         handle_fn(|ctx, _next| async move {
//!             let id = ctx.route().and_then(|route| route.param("id")).unwrap_or("?").to_string();
//!             ctx.res().text(format!("user {id}"));
//!             Ok(())
//!         }),
//!     );
//! });
//! let dispatcher = server.get_handler();
//! // A transport adapter builds a Context per connection and calls
//! // `dispatcher.dispatch(ctx).await`.
//! # let _ = dispatcher;
//! ```

pub mod body;
pub mod context;
pub mod error;
pub mod flow;
pub mod headers;
pub mod mime;
pub mod request;
pub mod response;
pub mod route;
pub mod router;
pub mod security;
pub mod server;
pub mod socket;

pub use body::{Body, BodyStream};
pub use context::Context;
pub use error::{Error, Result};
pub use flow::{DynHandler, Handler, IntoHandler, Next, and, handle_fn, or, or_until};
pub use headers::Headers;
pub use request::{Request, RequestBuilder};
pub use response::{PushTarget, Response};
pub use route::{Captured, Params, Route};
pub use router::Router;
pub use security::CspPolicy;
pub use server::{Dispatcher, FetchTarget, Fetcher, Server, SubRequest};
pub use socket::{Peer, Socket, SocketConfig};
