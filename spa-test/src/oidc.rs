use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use axum::extract::State;
use axum::http::header::ACCEPT;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

struct ProviderState {
    issuer: String,
    jwks: RwLock<Value>,
    discovery_status: AtomicU16,
    jwks_status: AtomicU16,
    discovery_hits: AtomicUsize,
    jwks_hits: AtomicUsize,
    accept: RwLock<Vec<(&'static str, Option<String>)>>,
}

/// OIDC provider on an ephemeral local port serving discovery and JWKS.
///
/// The issuer is `http://127.0.0.1:<port>`; the key set lives at
/// `<issuer>/protocol/openid-connect/certs`. The server stops on drop.
pub struct MockOidcProvider {
    addr: SocketAddr,
    state: Arc<ProviderState>,
    handle: JoinHandle<()>,
}

impl MockOidcProvider {
    pub async fn start(jwks: Value) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock OIDC provider");
        let addr = listener.local_addr().expect("mock OIDC provider address");

        let state = Arc::new(ProviderState {
            issuer: format!("http://{addr}"),
            jwks: RwLock::new(jwks),
            discovery_status: AtomicU16::new(200),
            jwks_status: AtomicU16::new(200),
            discovery_hits: AtomicUsize::new(0),
            jwks_hits: AtomicUsize::new(0),
            accept: RwLock::new(Vec::new()),
        });

        let router = Router::new()
            .route("/.well-known/openid-configuration", get(discovery))
            .route("/protocol/openid-connect/certs", get(certs))
            .with_state(state.clone());

        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    pub fn issuer(&self) -> &str {
        &self.state.issuer
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Replace the published key set.
    pub fn set_jwks(&self, jwks: Value) {
        *self.state.jwks.write().expect("jwks lock poisoned") = jwks;
    }

    /// Answer discovery requests with `status` and an error body.
    pub fn fail_discovery(&self, status: StatusCode) {
        self.state
            .discovery_status
            .store(status.as_u16(), Ordering::SeqCst);
    }

    /// Answer key set requests with `status` and an error body.
    pub fn fail_jwks(&self, status: StatusCode) {
        self.state.jwks_status.store(status.as_u16(), Ordering::SeqCst);
    }

    pub fn discovery_hits(&self) -> usize {
        self.state.discovery_hits.load(Ordering::SeqCst)
    }

    pub fn jwks_hits(&self) -> usize {
        self.state.jwks_hits.load(Ordering::SeqCst)
    }

    /// `Accept` header of every request so far, tagged `"discovery"` or
    /// `"jwks"`, in arrival order.
    pub fn accept_headers(&self) -> Vec<(&'static str, Option<String>)> {
        self.state.accept.read().expect("accept lock poisoned").clone()
    }
}

impl Drop for MockOidcProvider {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn status_of(code: &AtomicU16) -> StatusCode {
    StatusCode::from_u16(code.load(Ordering::SeqCst)).unwrap_or(StatusCode::OK)
}

fn record_accept(state: &ProviderState, endpoint: &'static str, headers: &HeaderMap) {
    let accept = headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state
        .accept
        .write()
        .expect("accept lock poisoned")
        .push((endpoint, accept));
}

async fn discovery(State(state): State<Arc<ProviderState>>, headers: HeaderMap) -> Response {
    state.discovery_hits.fetch_add(1, Ordering::SeqCst);
    record_accept(&state, "discovery", &headers);
    let status = status_of(&state.discovery_status);
    if !status.is_success() {
        return (status, Json(json!({ "error": "unavailable" }))).into_response();
    }
    Json(json!({
        "issuer": state.issuer,
        "jwks_uri": format!("{}/protocol/openid-connect/certs", state.issuer),
        "token_endpoint": format!("{}/protocol/openid-connect/token", state.issuer),
        "userinfo_endpoint": format!("{}/protocol/openid-connect/userinfo", state.issuer),
    }))
    .into_response()
}

async fn certs(State(state): State<Arc<ProviderState>>, headers: HeaderMap) -> Response {
    state.jwks_hits.fetch_add(1, Ordering::SeqCst);
    record_accept(&state, "jwks", &headers);
    let status = status_of(&state.jwks_status);
    if !status.is_success() {
        return (status, Json(json!({ "error": "unavailable" }))).into_response();
    }
    let jwks = state.jwks.read().expect("jwks lock poisoned").clone();
    Json(jwks).into_response()
}
