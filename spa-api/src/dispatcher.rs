use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use bytes::Bytes;
use serde_json::Value;
use spa_core::{error_response, not_found, BuildInfo, HttpError};
use spa_security::{authorize, TokenValidator};
use tracing::{debug, error};

use crate::action::ActionContext;
use crate::params::{extract, source_for, ParamSource};
use crate::registry::ActionRegistry;

pub const ACTION_MISSING: &str = "action parameter is missing";
pub const ACTION_INVALID: &str = "action parameter is invalid";

/// Request bodies larger than this are rejected with 400.
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

const NO_CACHE: HeaderValue = HeaderValue::from_static("no-cache, no-store, must-revalidate");
const APPLICATION_JSON: HeaderValue = HeaderValue::from_static("application/json");

/// Shared state of the `/api` endpoint.
#[derive(Clone)]
pub struct ApiState {
    registry: Arc<ActionRegistry>,
    validator: Arc<TokenValidator>,
    build_info: Arc<BuildInfo>,
    body_limit: usize,
}

impl ApiState {
    pub fn new(
        registry: ActionRegistry,
        validator: TokenValidator,
        build_info: BuildInfo,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            validator: Arc::new(validator),
            build_info: Arc::new(build_info),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }
}

/// `/api` answered by [`dispatch`] for every method, `/api/*` by the shared
/// 404 responder.
pub fn routes(state: ApiState) -> Router {
    Router::new()
        .route("/api", any(dispatch))
        .route("/api/", any(not_found))
        .route("/api/{*rest}", any(not_found))
        .with_state(state)
}

/// Dispatch one request to a registered action.
pub async fn dispatch(State(state): State<ApiState>, req: Request) -> Response {
    let (parts, body) = req.into_parts();

    let params = match source_for(&parts.method, &parts.uri, &parts.headers) {
        Ok(source) => match read_body(source, body, state.body_limit).await {
            Ok(bytes) => extract(source, &parts.uri, &bytes),
            Err(err) => Err(err),
        },
        Err(err) => Err(err),
    };
    let params = match params {
        Ok(params) => params,
        Err(err) => return err.into_response(),
    };

    let Some(name) = params.get("action").and_then(Value::as_str).map(str::to_string) else {
        return HttpError::BadRequest(ACTION_MISSING.into()).into_response();
    };

    let ctx = ActionContext {
        params,
        headers: parts.headers,
        claims: None,
        build_info: state.build_info.clone(),
    };
    let mut response = match run(&state, &name, ctx).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    };
    response.headers_mut().entry(CACHE_CONTROL).or_insert(NO_CACHE);
    response
}

async fn read_body(source: ParamSource, body: Body, limit: usize) -> Result<Bytes, HttpError> {
    if source == ParamSource::Query {
        return Ok(Bytes::new());
    }
    to_bytes(body, limit)
        .await
        .map_err(|e| HttpError::BadRequest(e.to_string()))
}

async fn run(state: &ApiState, name: &str, mut ctx: ActionContext) -> Result<Response, HttpError> {
    let action = state
        .registry
        .get(name)
        .ok_or_else(|| HttpError::BadRequest(ACTION_INVALID.into()))?;

    if action.needs_auth() {
        let claims = authorize(&ctx.headers, &state.validator).await?;
        ctx.claims = Some(claims);
    }

    debug!(action = %name, "dispatching action");
    let (status, mut headers, produce) = action.invoke(ctx).await?.into_parts();
    if !headers.contains_key(CONTENT_TYPE) {
        headers.insert(CONTENT_TYPE, APPLICATION_JSON);
    }

    match produce() {
        Ok(bytes) => Ok((status, headers, Body::from(bytes)).into_response()),
        Err(err) => {
            error!(action = %name, error = %err, "action failed to produce its response");
            Ok(error_response(
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                err.message(),
            ))
        }
    }
}
