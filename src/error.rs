//! Crate-level error type.
//!
//! Each module raises its own `thiserror` enum at the call site; this type
//! aggregates them for the pipeline surface. Application handlers carry
//! their own failures through the combinators opaquely via
//! [`Error::other`] — no combinator swallows or rewraps an error on the
//! way up.

use thiserror::Error;

use crate::body::BodyError;
use crate::headers::HeaderError;
use crate::route::RouteError;
use crate::socket::SocketError;

/// Any failure the dispatch pipeline can surface.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Invalid header name or value.
    #[error(transparent)]
    Header(#[from] HeaderError),

    /// Body or stream contract violation.
    #[error(transparent)]
    Body(#[from] BodyError),

    /// Route capture contract violation.
    #[error(transparent)]
    Route(#[from] RouteError),

    /// Socket misuse, e.g. pushing without the capability.
    #[error(transparent)]
    Socket(#[from] SocketError),

    /// A URL failed to parse or resolve.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    /// A method string failed to parse.
    #[error("invalid method: {0}")]
    Method(#[from] http::method::InvalidMethod),

    /// JSON body serialization or deserialization failed.
    #[error("json body: {0}")]
    Json(#[from] serde_json::Error),

    /// A relative fetch/push target with no URL to resolve against.
    #[error("no base url to resolve {target:?} against")]
    NoBaseUrl {
        /// The relative target that could not be resolved.
        target: String,
    },

    /// `fetch`/`sub_request` called on a context that never went through a
    /// dispatcher prologue.
    #[error("context is not attached to a dispatch pipeline")]
    Detached,

    /// An opaque application error raised by a handler.
    #[error("handler failed: {0}")]
    Other(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wrap an application error so it propagates through the pipeline
    /// intact.
    pub fn other(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Other(err.into())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
