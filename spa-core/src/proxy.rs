//! Proxy header normalization.
//!
//! Trusts `X-Forwarded-For`, `X-Real-IP` and `Forwarded` for the client
//! address, `X-Forwarded-Proto`/`X-Forwarded-Scheme`/`Forwarded: proto=` for
//! the scheme, and `X-Forwarded-Host` for the `Host` header. Only deploy
//! behind a proxy that overwrites these headers.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request};
use axum::http::header::HOST;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
const X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");
const FORWARDED: HeaderName = HeaderName::from_static("forwarded");
const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");
const X_FORWARDED_SCHEME: HeaderName = HeaderName::from_static("x-forwarded-scheme");
const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");

/// Effective client of a request after proxy headers were applied.
///
/// Inserted as a request extension by [`proxy_headers`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAddr {
    host: String,
    scheme: Option<String>,
}

impl ClientAddr {
    /// Client IP (or whatever the proxy reported).
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Scheme reported by the proxy, if any.
    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }
}

/// Middleware rewriting the request according to trusted proxy headers.
pub async fn proxy_headers(mut req: Request, next: Next) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());

    let headers = req.headers();
    let host = forwarded_client(headers)
        .or(peer)
        .unwrap_or_else(|| "-".to_string());
    let scheme = forwarded_scheme(headers);
    let forwarded_host = first_value(headers, &X_FORWARDED_HOST)
        .and_then(|h| HeaderValue::from_str(&h).ok());

    if let Some(value) = forwarded_host {
        req.headers_mut().insert(HOST, value);
    }
    req.extensions_mut().insert(ClientAddr { host, scheme });

    next.run(req).await
}

/// Client address from, in order, `X-Forwarded-For` (first hop),
/// `X-Real-IP`, then `Forwarded: for=`.
pub fn forwarded_client(headers: &HeaderMap) -> Option<String> {
    first_value(headers, &X_FORWARDED_FOR)
        .or_else(|| first_value(headers, &X_REAL_IP))
        .or_else(|| forwarded_param(headers, "for"))
}

/// Scheme from `X-Forwarded-Proto`, `X-Forwarded-Scheme`, then
/// `Forwarded: proto=`; lowercased.
pub fn forwarded_scheme(headers: &HeaderMap) -> Option<String> {
    first_value(headers, &X_FORWARDED_PROTO)
        .or_else(|| first_value(headers, &X_FORWARDED_SCHEME))
        .or_else(|| forwarded_param(headers, "proto"))
        .map(|s| s.to_lowercase())
}

fn first_value(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)?
        .to_str()
        .ok()?
        .split(',')
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Value of `param` in the first element of an RFC 7239 `Forwarded` header.
fn forwarded_param(headers: &HeaderMap, param: &str) -> Option<String> {
    let value = headers.get(FORWARDED)?.to_str().ok()?;
    let first = value.split(',').next()?;
    first.split(';').find_map(|pair| {
        let (k, v) = pair.trim().split_once('=')?;
        if !k.trim().eq_ignore_ascii_case(param) {
            return None;
        }
        let v = v.trim().trim_matches('"');
        // `for="[2001:db8::1]:4711"` -> `2001:db8::1`
        let v = match v.strip_prefix('[') {
            Some(rest) => rest.split(']').next().unwrap_or(rest),
            None => v,
        };
        (!v.is_empty()).then(|| v.to_string())
    })
}
