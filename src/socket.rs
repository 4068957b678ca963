//! The connection boundary: peer identity, teardown, and server push.
//!
//! A [`Socket`] wraps whatever sits on the other side of the negotiated
//! connection. The core never talks to a wire itself; the transport adapter
//! supplies the end-of-connection callback and, when the protocol supports
//! it, an async push capability.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::Notify;
use url::Url;

use crate::Result;
use crate::response::Response;

/// Errors raised by socket operations.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum SocketError {
    /// The transport did not supply a push capability.
    #[error("socket has no push capability")]
    PushUnsupported,
}

/// The identity of the other side of the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    url: Url,
}

impl Peer {
    /// A peer identified by a URL.
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    /// The process-scoped identity used by the default socket when a
    /// dispatch arrives without one.
    #[must_use]
    pub fn local() -> Self {
        let url = Url::parse(&format!("process://{}", std::process::id()))
            .expect("process id forms a valid url");
        Self { url }
    }

    /// The peer's URL.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }
}

type PushFn = Arc<dyn Fn(Response) -> BoxFuture<'static, Result<()>> + Send + Sync>;
type EndFn = Box<dyn FnOnce() + Send>;

/// Builder-style configuration for a [`Socket`].
#[must_use]
pub struct SocketConfig {
    peer: Peer,
    on_end: Option<EndFn>,
    on_push: Option<PushFn>,
}

impl SocketConfig {
    /// Start configuring a socket for `peer`.
    pub fn new(peer: Peer) -> Self {
        Self {
            peer,
            on_end: None,
            on_push: None,
        }
    }

    /// Run `callback` when the socket is ended. Called at most once.
    pub fn on_end(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_end = Some(Box::new(callback));
        self
    }

    /// Supply the push capability. `can_push` reports whether this was set.
    pub fn on_push<F, Fut>(mut self, push: F) -> Self
    where
        F: Fn(Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.on_push = Some(Arc::new(move |response| push(response).boxed()));
        self
    }

    /// Finish building.
    pub fn build(self) -> Socket {
        Socket {
            inner: Arc::new(State {
                peer: self.peer,
                on_end: Mutex::new(self.on_end),
                push: self.on_push,
                ended: AtomicBool::new(false),
                destroyed: Notify::new(),
            }),
        }
    }
}

struct State {
    peer: Peer,
    on_end: Mutex<Option<EndFn>>,
    push: Option<PushFn>,
    ended: AtomicBool,
    destroyed: Notify,
}

/// One side of a negotiated connection, shared by handle.
///
/// Ending is idempotent: the end callback runs and waiters wake exactly
/// once, no matter how many handles call [`end`](Socket::end) or
/// [`destroy`](Socket::destroy).
#[derive(Clone)]
pub struct Socket {
    inner: Arc<State>,
}

impl Socket {
    /// The default socket installed by the dispatcher prologue: local peer,
    /// no push capability.
    #[must_use]
    pub fn local() -> Self {
        SocketConfig::new(Peer::local()).build()
    }

    /// The peer identity.
    #[must_use]
    pub fn peer(&self) -> &Peer {
        &self.inner.peer
    }

    /// Whether the transport supplied a push capability.
    #[must_use]
    pub fn can_push(&self) -> bool {
        self.inner.push.is_some()
    }

    /// Transmit a completed response to the peer as a push.
    pub async fn push(&self, response: Response) -> Result<()> {
        let push = self
            .inner
            .push
            .as_ref()
            .ok_or(SocketError::PushUnsupported)?;
        push(response).await
    }

    /// Whether the socket has been ended.
    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.inner.ended.load(Ordering::Acquire)
    }

    /// End the connection. A second call is a no-op.
    pub fn end(&self) {
        if self.inner.ended.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(callback) = self.inner.on_end.lock().take() {
            callback();
        }
        self.inner.destroyed.notify_waiters();
    }

    /// Tear the connection down. Same observable effect as
    /// [`end`](Socket::end).
    pub fn destroy(&self) {
        self.end();
    }

    /// Wait until the socket has been ended, returning immediately if it
    /// already was.
    pub async fn destroyed(&self) {
        let notified = self.inner.destroyed.notified();
        tokio::pin!(notified);
        // Register before the flag check so an end() in between still wakes
        // this waiter.
        notified.as_mut().enable();
        if self.is_ended() {
            return;
        }
        notified.await;
    }
}

impl fmt::Debug for Socket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Socket")
            .field("peer", &self.inner.peer.url.as_str())
            .field("can_push", &self.can_push())
            .field("ended", &self.is_ended())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[test]
    fn local_peer_is_process_scoped() {
        let socket = Socket::local();
        assert_eq!(socket.peer().url().scheme(), "process");
        assert!(!socket.can_push());
        assert!(!socket.is_ended());
    }

    #[test]
    fn end_is_idempotent() {
        let ends = Arc::new(AtomicUsize::new(0));
        let counter = ends.clone();
        let socket = SocketConfig::new(Peer::local())
            .on_end(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .build();

        socket.end();
        socket.end();
        socket.destroy();
        assert!(socket.is_ended());
        assert_eq!(ends.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn destroyed_wakes_on_end() {
        let socket = Socket::local();
        let waiter = socket.clone();
        let handle = tokio::spawn(async move { waiter.destroyed().await });
        tokio::task::yield_now().await;
        socket.end();
        handle.await.unwrap();

        // Already-ended sockets resolve immediately.
        socket.destroyed().await;
    }

    #[tokio::test]
    async fn push_requires_capability() {
        let socket = Socket::local();
        let err = socket.push(Response::new()).await.unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Socket(SocketError::PushUnsupported)
        ));

        let pushed = Arc::new(AtomicUsize::new(0));
        let counter = pushed.clone();
        let socket = SocketConfig::new(Peer::local())
            .on_push(move |_response| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .build();
        assert!(socket.can_push());
        socket.push(Response::new()).await.unwrap();
        assert_eq!(pushed.load(Ordering::SeqCst), 1);
    }
}
