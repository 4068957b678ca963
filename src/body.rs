//! Response and request body values.
//!
//! A body is absent, a string, a fixed-length byte buffer, or a single-use
//! [`BodyStream`]. Streams carry a "disturbed" flag: once a stream has been
//! read, cancelled, or attached as a body, it may not be attached again.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, BoxStream, Stream, StreamExt};
use parking_lot::Mutex;
use thiserror::Error;

/// Errors raised by body and stream operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BodyError {
    /// The stream was already read, cancelled, or attached as a body.
    #[error("body stream is disturbed")]
    Disturbed,

    /// The underlying stream yielded an I/O error.
    #[error("body stream failed: {0}")]
    Io(#[from] io::Error),
}

type ByteStream = BoxStream<'static, io::Result<Bytes>>;

struct StreamState {
    stream: Mutex<Option<ByteStream>>,
    attached: AtomicBool,
}

/// A single-use readable byte stream, shared by handle.
///
/// Clones observe the same underlying state: whichever handle reads first
/// consumes the stream for all of them.
#[derive(Clone)]
pub struct BodyStream {
    inner: Arc<StreamState>,
}

impl BodyStream {
    /// Wrap a stream of byte chunks.
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self {
            inner: Arc::new(StreamState {
                stream: Mutex::new(Some(stream.boxed())),
                attached: AtomicBool::new(false),
            }),
        }
    }

    /// A stream yielding a single chunk.
    pub fn once(chunk: impl Into<Bytes>) -> Self {
        Self::new(stream::iter([Ok(chunk.into())]))
    }

    /// Whether the stream has been read, cancelled, or attached as a body.
    #[must_use]
    pub fn is_disturbed(&self) -> bool {
        self.inner.attached.load(Ordering::Acquire) || self.inner.stream.lock().is_none()
    }

    /// Mark the stream as attached to a body.
    ///
    /// Fails if it was already attached or consumed; a later
    /// [`take`](Self::take) by the transport still works exactly once.
    pub(crate) fn attach(&self) -> Result<(), BodyError> {
        let guard = self.inner.stream.lock();
        if guard.is_none() || self.inner.attached.swap(true, Ordering::AcqRel) {
            return Err(BodyError::Disturbed);
        }
        Ok(())
    }

    /// Take the underlying chunk stream, consuming it for every handle.
    pub fn take(&self) -> Result<BoxStream<'static, io::Result<Bytes>>, BodyError> {
        self.inner.stream.lock().take().ok_or(BodyError::Disturbed)
    }

    /// Read the whole stream into one buffer, consuming it.
    pub async fn read_to_end(&self) -> Result<Bytes, BodyError> {
        let mut stream = self.take()?;
        let mut buf = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }

    /// Drop the underlying stream without reading it.
    pub fn cancel(&self) {
        drop(self.inner.stream.lock().take());
    }
}

impl fmt::Debug for BodyStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyStream")
            .field("disturbed", &self.is_disturbed())
            .finish()
    }
}

/// A present response or request body.
#[derive(Debug, Clone)]
pub enum Body {
    /// UTF-8 text, sent verbatim.
    Text(String),
    /// A fixed-length byte buffer.
    Bytes(Bytes),
    /// A single-use chunk stream of unknown length.
    Stream(BodyStream),
}

impl Body {
    /// The text content, if this is a text body.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Body::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The byte length when it is known up front.
    ///
    /// Text length is the UTF-8 byte count, not the character count.
    #[must_use]
    pub fn content_length(&self) -> Option<usize> {
        match self {
            Body::Text(s) => Some(s.len()),
            Body::Bytes(b) => Some(b.len()),
            Body::Stream(_) => None,
        }
    }
}

impl From<String> for Body {
    fn from(value: String) -> Self {
        Body::Text(value)
    }
}

impl From<&str> for Body {
    fn from(value: &str) -> Self {
        Body::Text(value.to_string())
    }
}

impl From<Bytes> for Body {
    fn from(value: Bytes) -> Self {
        Body::Bytes(value)
    }
}

impl From<Vec<u8>> for Body {
    fn from(value: Vec<u8>) -> Self {
        Body::Bytes(Bytes::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_consumes_for_all_handles() {
        let body = BodyStream::once("hello");
        let copy = body.clone();
        assert!(!body.is_disturbed());

        let buf = body.read_to_end().await.unwrap();
        assert_eq!(&buf[..], b"hello");
        assert!(copy.is_disturbed());
        assert!(matches!(
            copy.read_to_end().await,
            Err(BodyError::Disturbed)
        ));
    }

    #[tokio::test]
    async fn chunks_concatenate() {
        let body = BodyStream::new(stream::iter([
            Ok(Bytes::from_static(b"a")),
            Ok(Bytes::from_static(b"bc")),
        ]));
        assert_eq!(&body.read_to_end().await.unwrap()[..], b"abc");
    }

    #[test]
    fn cancel_disturbs() {
        let body = BodyStream::once("x");
        body.cancel();
        assert!(body.is_disturbed());
        assert!(body.take().is_err());
    }

    #[test]
    fn attach_once() {
        let body = BodyStream::once("x");
        body.attach().unwrap();
        assert!(body.is_disturbed());
        assert!(matches!(body.attach(), Err(BodyError::Disturbed)));
        // The transport read still works after attachment.
        assert!(body.take().is_ok());
    }

    #[test]
    fn content_length_counts_bytes() {
        assert_eq!(Body::from("ZСЋ").content_length(), Some(5));
        assert_eq!(Body::from(vec![1u8, 2, 3]).content_length(), Some(3));
        assert_eq!(
            Body::Stream(BodyStream::once("x")).content_length(),
            None
        );
    }
}
