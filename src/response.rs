//! Outbound responses and their push queues.

use std::sync::Arc;

use http::{Extensions, StatusCode};
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use serde::Serialize;
use url::Url;

use crate::body::{Body, BodyStream};
use crate::headers::Headers;
use crate::request::Request;
use crate::{Error, Result};

/// A queued server push.
#[derive(Debug)]
pub(crate) enum Push {
    /// An already-completed response, ready for the socket.
    Ready(Response),
    /// A request still to be resolved through the pipeline.
    Pending {
        request: Request,
        extensions: Option<Extensions>,
    },
}

/// Anything a push can be queued from.
#[derive(Debug)]
pub enum PushTarget {
    /// A path resolved against the response's URL.
    Path(String),
    /// An absolute URL.
    Url(Url),
    /// An explicit request.
    Request(Request),
    /// A completed response.
    Response(Response),
}

impl From<&str> for PushTarget {
    fn from(value: &str) -> Self {
        PushTarget::Path(value.to_string())
    }
}

impl From<String> for PushTarget {
    fn from(value: String) -> Self {
        PushTarget::Path(value)
    }
}

impl From<Url> for PushTarget {
    fn from(value: Url) -> Self {
        PushTarget::Url(value)
    }
}

impl From<Request> for PushTarget {
    fn from(value: Request) -> Self {
        PushTarget::Request(value)
    }
}

impl From<Response> for PushTarget {
    fn from(value: Response) -> Self {
        PushTarget::Response(value)
    }
}

#[derive(Debug)]
struct Inner {
    status: StatusCode,
    headers: Headers,
    body: Option<Body>,
    pushes: Vec<Push>,
    url: Option<Url>,
}

/// A mutable response, shared by handle.
///
/// Every context copy made by the combinators aliases the same response
/// state, so a body set deep in a chain is visible to the wrapping
/// handlers and to the dispatcher.
#[derive(Debug, Clone)]
pub struct Response {
    inner: Arc<Mutex<Inner>>,
}

fn apply_body(inner: &mut Inner, body: Option<Body>) {
    match &body {
        None => {
            inner.headers.delete("content-length");
            inner.headers.delete("content-type");
        }
        Some(body) => match body.content_length() {
            Some(len) => inner.headers.set_known("content-length", len.to_string()),
            None => {
                inner.headers.delete("content-length");
            }
        },
    }
    inner.body = body;
}

impl Response {
    /// An empty `200 OK` response with no URL binding.
    #[must_use]
    pub fn new() -> Self {
        Self::with_url(None)
    }

    /// An empty response bound to the URL it answers, which is what
    /// relative push targets resolve against.
    #[must_use]
    pub fn for_url(url: Url) -> Self {
        Self::with_url(Some(url))
    }

    fn with_url(url: Option<Url>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                status: StatusCode::OK,
                headers: Headers::new(),
                body: None,
                pushes: Vec::new(),
                url,
            })),
        }
    }

    /// The URL this response is bound to, if any.
    #[must_use]
    pub fn url(&self) -> Option<Url> {
        self.inner.lock().url.clone()
    }

    /// The status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.inner.lock().status
    }

    /// Set the status code.
    pub fn set_status(&self, status: StatusCode) -> &Self {
        self.inner.lock().status = status;
        self
    }

    /// The canonical reason phrase for the current status, when one
    /// exists.
    #[must_use]
    pub fn status_text(&self) -> Option<&'static str> {
        self.status().canonical_reason()
    }

    /// Whether the status is in the 2xx range.
    #[must_use]
    pub fn ok(&self) -> bool {
        self.status().is_success()
    }

    /// Whether the status is in the 3xx range.
    #[must_use]
    pub fn redirected(&self) -> bool {
        self.status().is_redirection()
    }

    /// The mutable header table.
    ///
    /// The guard must not be held across an `await`.
    pub fn headers(&self) -> MappedMutexGuard<'_, Headers> {
        MutexGuard::map(self.inner.lock(), |inner| &mut inner.headers)
    }

    /// Whether a body has been set.
    #[must_use]
    pub fn has_body(&self) -> bool {
        self.inner.lock().body.is_some()
    }

    /// A handle to the current body, if any.
    #[must_use]
    pub fn body(&self) -> Option<Body> {
        self.inner.lock().body.clone()
    }

    /// Set the body, updating `content-length` when the length is known.
    pub fn set_body(&self, body: impl Into<Body>) -> &Self {
        apply_body(&mut self.inner.lock(), Some(body.into()));
        self
    }

    /// Clear the body and its bookkeeping headers.
    pub fn clear_body(&self) -> &Self {
        apply_body(&mut self.inner.lock(), None);
        self
    }

    /// Set a single-use stream body.
    ///
    /// Fails if the stream was already read, cancelled, or attached to a
    /// body before.
    pub fn set_stream(&self, stream: BodyStream) -> Result<&Self> {
        stream.attach()?;
        apply_body(&mut self.inner.lock(), Some(Body::Stream(stream)));
        Ok(self)
    }

    /// Set a `text/plain` body.
    pub fn text(&self, body: impl Into<String>) -> &Self {
        let mut inner = self.inner.lock();
        inner.headers.set_known("content-type", "text/plain");
        apply_body(&mut inner, Some(Body::Text(body.into())));
        self
    }

    /// Set a `text/html` body.
    pub fn html(&self, body: impl Into<String>) -> &Self {
        let mut inner = self.inner.lock();
        inner.headers.set_known("content-type", "text/html");
        apply_body(&mut inner, Some(Body::Text(body.into())));
        self
    }

    /// Serialize `value` as an `application/json` body.
    pub fn json<T: Serialize>(&self, value: &T) -> Result<&Self> {
        let body = serde_json::to_string(value)?;
        let mut inner = self.inner.lock();
        inner.headers.set_known("content-type", "application/json");
        apply_body(&mut inner, Some(Body::Text(body)));
        Ok(self)
    }

    /// Finish with an empty body, marking the response as answered.
    pub fn end(&self) -> &Self {
        self.set_body("")
    }

    /// Answer with a `302 Found` redirect to `location` and no body.
    pub fn redirect(&self, location: impl Into<String>) -> Result<&Self> {
        let mut inner = self.inner.lock();
        inner.headers.set("location", location)?;
        inner.status = StatusCode::FOUND;
        apply_body(&mut inner, None);
        Ok(self)
    }

    /// Queue a push of `target`, to be drained by the dispatcher after
    /// the main chain completes.
    ///
    /// Relative paths resolve against the response URL and fail without
    /// one.
    pub fn push(&self, target: impl Into<PushTarget>) -> Result<&Self> {
        let push = match target.into() {
            PushTarget::Response(response) => Push::Ready(response),
            PushTarget::Request(request) => Push::Pending {
                request,
                extensions: None,
            },
            PushTarget::Url(url) => Push::Pending {
                request: Request::builder(url).build(),
                extensions: None,
            },
            PushTarget::Path(path) => {
                let base = self.url().ok_or_else(|| Error::NoBaseUrl {
                    target: path.clone(),
                })?;
                let url = base.join(&path)?;
                Push::Pending {
                    request: Request::builder(url).build(),
                    extensions: None,
                }
            }
        };
        self.inner.lock().pushes.push(push);
        Ok(self)
    }

    /// Queue a push of `request` with extra context entries layered over
    /// the dispatching context during resolution.
    pub fn push_with_context(&self, request: Request, extensions: Extensions) -> &Self {
        self.inner.lock().pushes.push(Push::Pending {
            request,
            extensions: Some(extensions),
        });
        self
    }

    /// Number of queued pushes.
    #[must_use]
    pub fn push_count(&self) -> usize {
        self.inner.lock().pushes.len()
    }

    /// Drain the push queue. Called once per dispatch.
    pub(crate) fn take_pushes(&self) -> Vec<Push> {
        std::mem::take(&mut self.inner.lock().pushes)
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}
