//! Shared builders for the integration suites.

#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use trellis::{
    Context, DynHandler, Peer, Request, Response, Socket, SocketConfig, handle_fn,
};
use tracing_subscriber::EnvFilter;
use url::Url;

/// Install the env-filtered diagnostics subscriber, once per test binary.
/// Run with `RUST_LOG=trellis=trace` to see combinator decisions.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_test_writer()
        .try_init();
}

/// Parse a URL that the test knows is valid.
pub fn url(s: &str) -> Url {
    Url::parse(s).expect("test url")
}

/// A GET request against `http://localhost{path}`.
pub fn request(path: &str) -> Request {
    init_tracing();
    Request::builder(url(&format!("http://localhost{path}"))).build()
}

/// A bare context for `path`, response bound to the request URL.
pub fn context(path: &str) -> Context {
    let req = request(path);
    let res = Response::for_url(req.url().clone());
    Context::new(req, res)
}

/// An execution trace shared between handlers and assertions.
pub type Trace = Arc<Mutex<Vec<String>>>;

/// An empty trace.
pub fn trace() -> Trace {
    Arc::new(Mutex::new(Vec::new()))
}

/// A handler recording `name:before` / `name:after` around its
/// continuation.
pub fn tracer(log: &Trace, name: &'static str) -> DynHandler {
    let log = log.clone();
    handle_fn(move |_ctx, next| {
        let log = log.clone();
        async move {
            log.lock().push(format!("{name}:before"));
            next.proceed().await?;
            log.lock().push(format!("{name}:after"));
            Ok(())
        }
    })
}

/// A handler that records its name and declines (never calls `next`).
pub fn decliner(log: &Trace, name: &'static str) -> DynHandler {
    let log = log.clone();
    handle_fn(move |_ctx, _next| {
        let log = log.clone();
        async move {
            log.lock().push(name.to_string());
            Ok(())
        }
    })
}

/// A handler that records its name and answers with a text body.
pub fn responder(log: &Trace, name: &'static str) -> DynHandler {
    let log = log.clone();
    handle_fn(move |ctx: Context, _next| {
        let log = log.clone();
        async move {
            log.lock().push(name.to_string());
            ctx.res().text(name);
            Ok(())
        }
    })
}

/// A push-capable socket whose transmitted responses land in the returned
/// buffer.
pub fn push_socket() -> (Socket, Arc<Mutex<Vec<Response>>>) {
    let pushed = Arc::new(Mutex::new(Vec::new()));
    let sink = pushed.clone();
    let socket = SocketConfig::new(Peer::local())
        .on_push(move |response| {
            let sink = sink.clone();
            async move {
                sink.lock().push(response);
                Ok(())
            }
        })
        .build();
    (socket, pushed)
}
