use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::header::{
    CACHE_CONTROL, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, VARY, X_FRAME_OPTIONS,
};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use spa_core::{error_response, not_found};
use tracing::{debug, error};

use crate::provider::ContentProvider;

pub const STATIC_PREFIX: &str = "/static/";
pub const ENTRY_DOCUMENT: &str = "/index.html";
pub const SERVICE_WORKER: &str = "/service-worker.js";
pub const COMPRESSED_SUFFIX: &str = ".gz";

const SERVICE_WORKER_ALLOWED: HeaderName = HeaderName::from_static("service-worker-allowed");
const LONG_CACHE: &str = "max-age=86400, public";
const NO_STORE: &str = "no-cache, no-store, must-revalidate";

/// Extensions of root-level files served as themselves instead of the entry
/// document (`/app.js`, `/manifest.json`, `/service-worker.js`).
const ROOT_ASSET_EXTENSIONS: [&str; 4] = [".js", ".css", ".json", ".map"];

/// Content type from the fixed extension table.
pub fn content_type_for(path: &str) -> Option<&'static str> {
    let ext = path.rsplit_once('.').map(|(_, ext)| ext)?;
    if ext.contains('/') {
        return None;
    }
    match ext {
        "html" => Some("text/html"),
        "css" => Some("text/css"),
        "js" => Some("application/javascript"),
        "json" => Some("application/json"),
        "ico" => Some("image/x-icon"),
        "map" => Some("application/json"),
        _ => None,
    }
}

fn is_root_asset(path: &str) -> bool {
    let name = path.trim_start_matches('/');
    !name.is_empty()
        && !name.contains('/')
        && ROOT_ASSET_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

/// Client-side routes fall back to the entry document.
pub fn rewrite_path(path: &str) -> &str {
    if path.ends_with(".ico") || path.starts_with(STATIC_PREFIX) || is_root_asset(path) {
        path
    } else {
        ENTRY_DOCUMENT
    }
}

pub fn cache_control_for(path: &str) -> &'static str {
    if path.starts_with(STATIC_PREFIX) {
        LONG_CACHE
    } else {
        NO_STORE
    }
}

/// Provider path of the pre-compressed variant.
pub fn compressed_path(path: &str) -> String {
    format!("{}{COMPRESSED_SUFFIX}", path.trim_end_matches('/'))
}

/// How one asset request is answered: the provider path to read and the
/// headers to send with it.
#[derive(Debug, Clone)]
pub struct AssetPlan {
    /// Path after the SPA rewrite.
    pub path: String,
    /// Path handed to the content provider.
    pub provider_path: String,
    pub headers: HeaderMap,
}

pub fn plan(request_path: &str) -> AssetPlan {
    let path = rewrite_path(request_path);
    let mut headers = HeaderMap::new();

    if path.ends_with(SERVICE_WORKER) {
        headers.insert(SERVICE_WORKER_ALLOWED, HeaderValue::from_static("/"));
    }
    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static(cache_control_for(path)));

    let content_type = content_type_for(path)
        .map(str::to_string)
        .or_else(|| mime_guess::from_path(path).first().map(|m| m.essence_str().to_string()));
    if let Some(value) = content_type.and_then(|ct| HeaderValue::from_str(&ct).ok()) {
        headers.insert(CONTENT_TYPE, value);
    }

    headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
    headers.insert(VARY, HeaderValue::from_static("Accept-Encoding"));

    AssetPlan {
        path: path.to_string(),
        provider_path: compressed_path(path),
        headers,
    }
}

#[derive(Clone)]
pub struct StaticState {
    provider: Arc<dyn ContentProvider>,
}

impl StaticState {
    pub fn new(provider: Arc<dyn ContentProvider>) -> Self {
        Self { provider }
    }
}

/// Router answering every path with [`serve_asset`].
pub fn routes(provider: Arc<dyn ContentProvider>) -> Router {
    Router::new()
        .fallback(serve_asset)
        .with_state(StaticState::new(provider))
}

/// Serve the pre-compressed asset for the request path.
pub async fn serve_asset(State(state): State<StaticState>, method: Method, uri: Uri) -> Response {
    if method != Method::GET && method != Method::HEAD {
        return error_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
    }

    let plan = plan(uri.path());
    match state.provider.load(&plan.provider_path).await {
        Ok(Some(data)) if method == Method::HEAD => {
            let mut headers = plan.headers;
            headers.insert(CONTENT_LENGTH, HeaderValue::from(data.len()));
            (headers, Body::empty()).into_response()
        }
        Ok(Some(data)) => (plan.headers, Body::from(data)).into_response(),
        Ok(None) => {
            debug!(
                path = %uri.path(),
                provider_path = %plan.provider_path,
                provider = state.provider.kind(),
                "asset not found"
            );
            not_found().await
        }
        Err(err) => {
            error!(
                path = %uri.path(),
                provider_path = %plan.provider_path,
                provider = state.provider.kind(),
                error = %err,
                "failed to load asset"
            );
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_route_rewritten() {
        assert_eq!(rewrite_path("/some/client/route"), "/index.html");
        assert_eq!(rewrite_path("/"), "/index.html");
        assert_eq!(rewrite_path("/index.html"), "/index.html");
    }

    #[test]
    fn static_and_icons_kept() {
        assert_eq!(rewrite_path("/static/js/main.js"), "/static/js/main.js");
        assert_eq!(rewrite_path("/favicon.ico"), "/favicon.ico");
        assert_eq!(rewrite_path("/deep/icon.ico"), "/deep/icon.ico");
    }

    #[test]
    fn root_assets_kept() {
        assert_eq!(rewrite_path("/app.js"), "/app.js");
        assert_eq!(rewrite_path("/manifest.json"), "/manifest.json");
        assert_eq!(rewrite_path("/nested/app.js"), "/index.html");
        assert_eq!(rewrite_path("/logo.png"), "/index.html");
    }

    #[test]
    fn extension_table() {
        assert_eq!(content_type_for("/index.html"), Some("text/html"));
        assert_eq!(content_type_for("/a.css"), Some("text/css"));
        assert_eq!(content_type_for("/a.js"), Some("application/javascript"));
        assert_eq!(content_type_for("/a.json"), Some("application/json"));
        assert_eq!(content_type_for("/favicon.ico"), Some("image/x-icon"));
        assert_eq!(content_type_for("/a.js.map"), Some("application/json"));
        assert_eq!(content_type_for("/a.png"), None);
        assert_eq!(content_type_for("/v1.2/readme"), None);
    }

    #[test]
    fn cache_policy() {
        assert_eq!(cache_control_for("/static/js/a.js"), "max-age=86400, public");
        assert_eq!(cache_control_for("/index.html"), "no-cache, no-store, must-revalidate");
    }

    #[test]
    fn compressed_suffix_after_trailing_slash_trim() {
        assert_eq!(compressed_path("/static/"), "/static.gz");
        assert_eq!(compressed_path("/app.js"), "/app.js.gz");
    }

    #[test]
    fn plan_for_root_script() {
        let plan = plan("/app.js");
        assert_eq!(plan.provider_path, "/app.js.gz");
        assert_eq!(plan.headers[CONTENT_TYPE], "application/javascript");
        assert_eq!(plan.headers[CONTENT_ENCODING], "gzip");
        assert_eq!(plan.headers[VARY], "Accept-Encoding");
        assert_eq!(plan.headers[X_FRAME_OPTIONS], "SAMEORIGIN");
    }

    #[test]
    fn plan_for_service_worker() {
        let root = plan("/service-worker.js");
        assert_eq!(root.headers["service-worker-allowed"], "/");
        assert_eq!(root.headers[CACHE_CONTROL], "no-cache, no-store, must-revalidate");
        let nested = plan("/static/service-worker.js");
        assert_eq!(nested.headers["service-worker-allowed"], "/");
        assert_eq!(nested.headers[CACHE_CONTROL], "max-age=86400, public");
    }

    #[test]
    fn plan_guesses_unknown_types() {
        let plan = plan("/static/media/logo.svg");
        assert_eq!(plan.provider_path, "/static/media/logo.svg.gz");
        assert_eq!(plan.headers[CONTENT_TYPE], "image/svg+xml");
    }
}
