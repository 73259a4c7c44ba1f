use std::any::Any;
use std::backtrace::Backtrace;
use std::time::{Duration, Instant};

use axum::extract::Request;
use axum::http::header::{CONTENT_LENGTH, REFERER, USER_AGENT};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use http_body::Body as _;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::compression::CompressionLayer;
use tower_http::timeout::{RequestBodyTimeoutLayer, TimeoutLayer};
use tower_http::CompressionLevel;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::error::error_response;
use crate::proxy::ClientAddr;

/// Initialise the global `tracing` subscriber with a standard `fmt` layer.
///
/// Respects the `RUST_LOG` environment variable. Falls back to
/// `info,tower_http=info`, or `debug` when `debug` is set.
///
/// Call this once, at the very start of `main`, before any tracing macro.
pub fn init_tracing(debug: bool) {
    let fallback = if debug { "debug" } else { "info,tower_http=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(debug)
        .with_line_number(debug)
        .init();
    install_panic_hook();
}

/// Route panic reports through `tracing`, with the backtrace of the
/// panicking thread.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let backtrace = Backtrace::force_capture();
        error!(panic = %info, %backtrace, "panic");
    }));
}

/// Fixed server timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerTimeouts {
    /// Maximum time to receive a request body.
    pub read: Duration,
    /// Maximum time to produce a response.
    pub write: Duration,
    /// Keep-alive idle limit.
    pub idle: Duration,
}

impl Default for ServerTimeouts {
    fn default() -> Self {
        Self {
            read: Duration::from_secs(15),
            write: Duration::from_secs(15),
            idle: Duration::from_secs(60),
        }
    }
}

/// Layer enforcing the read timeout on request bodies.
pub fn read_timeout_layer(timeouts: &ServerTimeouts) -> RequestBodyTimeoutLayer {
    RequestBodyTimeoutLayer::new(timeouts.read)
}

/// Layer answering `408` when a handler exceeds the write timeout.
pub fn write_timeout_layer(timeouts: &ServerTimeouts) -> TimeoutLayer {
    TimeoutLayer::new(timeouts.write)
}

/// Response compression at the best level, negotiated from `Accept-Encoding`.
pub fn compression_layer() -> CompressionLayer {
    CompressionLayer::new().quality(CompressionLevel::Best)
}

/// Returns a `CatchPanicLayer` that converts panics into JSON 500 responses.
pub fn catch_panic_layer() -> CatchPanicLayer<fn(Box<dyn Any + Send>) -> Response> {
    CatchPanicLayer::custom(panic_handler as fn(_) -> _)
}

fn panic_handler(err: Box<dyn Any + Send>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    };
    error!(%detail, "recovered from panic");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
}

/// Access log middleware: one line per request with client, method, URI,
/// protocol, status, size, latency, referer and user agent.
pub async fn access_log(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();
    let version = req.version();
    let client = req
        .extensions()
        .get::<ClientAddr>()
        .map(|c| c.host().to_string())
        .unwrap_or_else(|| "-".to_string());
    let referer = header_str(&req, REFERER);
    let user_agent = header_str(&req, USER_AGENT);

    let response = next.run(req).await;

    let size = response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .or_else(|| response.body().size_hint().exact())
        .map(|n| n.to_string())
        .unwrap_or_else(|| "-".to_string());

    info!(
        target: "spa::access",
        host = %client,
        %method,
        %uri,
        proto = ?version,
        status = response.status().as_u16(),
        size = %size,
        latency_ms = start.elapsed().as_millis() as u64,
        referer = %referer,
        user_agent = %user_agent,
        "http request"
    );

    response
}

fn header_str(req: &Request, name: axum::http::HeaderName) -> String {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string()
}
