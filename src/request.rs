//! Inbound and internally-issued requests.

use std::sync::Arc;

use bytes::Bytes;
use http::Method;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use url::{Host, Url};

use crate::Result;
use crate::body::{BodyError, BodyStream};
use crate::headers::Headers;
use crate::mime;

#[derive(Debug)]
enum BodyState {
    None,
    Stream(BodyStream),
    Taken,
    Buffered(Bytes),
}

#[derive(Debug)]
struct Inner {
    method: Method,
    url: Url,
    headers: Headers,
    sender: String,
    parent: Option<Request>,
    domains: Vec<String>,
    body: Mutex<BodyState>,
}

/// An immutable request, shared by handle.
///
/// Everything but the body is fixed at construction. The body stream is
/// readable exactly once; [`bytes`](Request::bytes) caches the buffer so
/// later reads observe the same content.
#[derive(Debug, Clone)]
pub struct Request {
    inner: Arc<Inner>,
}

impl Request {
    /// Start building a request for `url`. Method defaults to `GET`.
    #[must_use]
    pub fn builder(url: Url) -> RequestBuilder {
        RequestBuilder {
            method: Method::GET,
            url,
            headers: Headers::new(),
            body: None,
            sender: String::new(),
            parent: None,
        }
    }

    /// The request method, always in its canonical upper-case form.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.inner.method
    }

    /// The request URL.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.inner.url
    }

    /// The immutable header table.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.inner.headers
    }

    /// The transport-reported sender identity; empty when unknown.
    #[must_use]
    pub fn sender(&self) -> &str {
        &self.inner.sender
    }

    /// The request this one was derived from, for internal sub-requests.
    #[must_use]
    pub fn parent(&self) -> Option<&Request> {
        self.inner.parent.as_ref()
    }

    /// Hostname labels in reverse order: `sub.example.com` yields
    /// `["com", "example", "sub"]`. Empty for IP hosts.
    #[must_use]
    pub fn domains(&self) -> &[String] {
        &self.inner.domains
    }

    /// Whether a body was supplied (or already buffered).
    #[must_use]
    pub fn has_body(&self) -> bool {
        !matches!(*self.inner.body.lock(), BodyState::None)
    }

    /// Read the body to completion, caching the buffer.
    ///
    /// A request without a body yields an empty buffer. Fails with a
    /// disturbed-stream error when a previous read is still in flight or
    /// ended in an error.
    pub async fn bytes(&self) -> Result<Bytes> {
        let stream = {
            let mut state = self.inner.body.lock();
            match &*state {
                BodyState::None => return Ok(Bytes::new()),
                BodyState::Buffered(buf) => return Ok(buf.clone()),
                BodyState::Taken => return Err(BodyError::Disturbed.into()),
                BodyState::Stream(stream) => {
                    let stream = stream.clone();
                    *state = BodyState::Taken;
                    stream
                }
            }
        };
        let buf = stream.read_to_end().await?;
        *self.inner.body.lock() = BodyState::Buffered(buf.clone());
        Ok(buf)
    }

    /// Read the body as text, honoring the `charset` parameter of the
    /// `content-type` header (UTF-8 when absent or unknown).
    pub async fn text(&self) -> Result<String> {
        let buf = self.bytes().await?;
        let content_type = self.headers().get("content-type");
        let encoding = content_type
            .as_deref()
            .and_then(mime::charset)
            .and_then(|label| encoding::Encoding::for_label(label.as_bytes()))
            .unwrap_or(encoding::UTF_8);
        let (text, _, _) = encoding.decode(&buf);
        Ok(text.into_owned())
    }

    /// Read and deserialize a JSON body.
    pub async fn json<T: DeserializeOwned>(&self) -> Result<T> {
        let text = self.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// The `content-type` essence (value before any `;`), lower-cased.
    #[must_use]
    pub fn content_type(&self) -> Option<String> {
        self.headers().get("content-type").map(|ct| mime::essence(&ct))
    }

    /// Whether the request's `content-type` matches `pattern`
    /// (`text/*`-style wildcards allowed).
    #[must_use]
    pub fn is(&self, pattern: &str) -> bool {
        match self.headers().get("content-type") {
            Some(ct) => mime::matches(pattern, &ct),
            None => false,
        }
    }

    /// The first of `patterns` matching the request's `content-type`.
    #[must_use]
    pub fn select_type<'a>(&self, patterns: &[&'a str]) -> Option<&'a str> {
        let content_type = self.headers().get("content-type")?;
        patterns
            .iter()
            .find(|pattern| mime::matches(pattern, &content_type))
            .copied()
    }

    /// The first of `offered` acceptable to the request's `accept` header.
    /// A missing header accepts anything.
    #[must_use]
    pub fn accept<'a>(&self, offered: &[&'a str]) -> Option<&'a str> {
        mime::accept(self.headers().get("accept").as_deref(), offered)
    }
}

fn derive_domains(url: &Url) -> Vec<String> {
    match url.host() {
        Some(Host::Domain(domain)) => {
            domain.split('.').rev().map(str::to_string).collect()
        }
        _ => Vec::new(),
    }
}

/// Builder for [`Request`].
#[derive(Debug)]
#[must_use]
pub struct RequestBuilder {
    method: Method,
    url: Url,
    headers: Headers,
    body: Option<BodyStream>,
    sender: String,
    parent: Option<Request>,
}

impl RequestBuilder {
    /// Set the method.
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set the method from a string, normalizing case (`"get"` becomes
    /// `GET`).
    pub fn method_str(self, method: &str) -> Result<Self> {
        let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())?;
        Ok(self.method(method))
    }

    /// Replace the header table.
    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Attach a body stream.
    pub fn body(mut self, body: BodyStream) -> Self {
        self.body = Some(body);
        self
    }

    /// Set the sender identity.
    pub fn sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = sender.into();
        self
    }

    /// Record the request this one derives from.
    pub fn parent(mut self, parent: Request) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> Request {
        let domains = derive_domains(&self.url);
        Request {
            inner: Arc::new(Inner {
                method: self.method,
                url: self.url,
                headers: self.headers,
                sender: self.sender,
                parent: self.parent,
                domains,
                body: Mutex::new(match self.body {
                    Some(stream) => BodyState::Stream(stream),
                    None => BodyState::None,
                }),
            }),
        }
    }
}
