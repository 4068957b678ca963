//! Handler composition: the cascade and alternation combinators.
//!
//! Everything that processes a request implements [`Handler`], a callable
//! taking a [`Context`](crate::Context) and a [`Next`] continuation.
//! [`and`] chains handlers depth-first so each one wraps the rest of the
//! chain; [`or`] tries handlers in order until one finishes the response.
//! Routers and dispatchers compile down to these two shapes.

mod alternate;
mod cascade;
mod handler;

pub use alternate::{finished, or, or_until};
pub use cascade::and;
pub use handler::{DynHandler, Handler, IntoHandler, Next, handle_fn};
