use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::http::header::{HeaderName, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use bytes::Bytes;
use serde::Serialize;
use spa_core::{BuildInfo, HttpError};
use spa_security::TokenClaims;

/// Request parameters of one dispatch, keyed by name.
pub type Params = serde_json::Map<String, serde_json::Value>;

/// Emits the response body after headers are final.
pub type BodyProducer = Box<dyn FnOnce() -> Result<Bytes, HttpError> + Send>;

pub type ActionFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ActionResponse, HttpError>> + Send + 'a>>;

/// Everything an action sees of its request.
pub struct ActionContext {
    pub params: Params,
    pub headers: HeaderMap,
    /// Present when the action requires authentication.
    pub claims: Option<TokenClaims>,
    pub build_info: Arc<BuildInfo>,
}

impl ActionContext {
    /// String parameter `name`, if present and a string.
    pub fn param_str(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(|v| v.as_str())
    }
}

/// Result description returned by an action: status, headers and a deferred
/// body. The dispatcher adds its default headers, then runs the producer.
pub struct ActionResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: BodyProducer,
}

impl ActionResponse {
    pub fn new<F>(body: F) -> Self
    where
        F: FnOnce() -> Result<Bytes, HttpError> + Send + 'static,
    {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Box::new(body),
        }
    }

    /// Serialize `value` as the body when the response is emitted.
    pub fn json<T>(value: T) -> Self
    where
        T: Serialize + Send + 'static,
    {
        Self::new(move || Ok(Bytes::from(serde_json::to_vec(&value)?)))
    }

    /// Fixed body with an explicit content type.
    pub fn raw(content_type: &'static str, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        Self::new(move || Ok(body)).with_header(CONTENT_TYPE, HeaderValue::from_static(content_type))
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub(crate) fn into_parts(self) -> (StatusCode, HeaderMap, BodyProducer) {
        (self.status, self.headers, self.body)
    }
}

/// A named operation reachable through the dispatcher.
pub trait Action: Send + Sync + 'static {
    /// Unique name matched against the `action` parameter.
    fn name(&self) -> &str;

    /// Whether a validated bearer token is required.
    fn needs_auth(&self) -> bool {
        false
    }

    fn invoke(&self, ctx: ActionContext) -> ActionFuture<'_>;
}

/// Action backed by an async closure.
pub struct FnAction<F> {
    name: String,
    needs_auth: bool,
    handler: F,
}

/// Build an [`Action`] from a closure.
///
/// ```ignore
/// let whoami = action_fn("whoami", true, |ctx| async move {
///     let user = ctx.claims.map(|c| c.username).unwrap_or_default();
///     Ok(ActionResponse::json(serde_json::json!({ "username": user })))
/// });
/// ```
pub fn action_fn<F, Fut>(name: impl Into<String>, needs_auth: bool, handler: F) -> FnAction<F>
where
    F: Fn(ActionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ActionResponse, HttpError>> + Send + 'static,
{
    FnAction {
        name: name.into(),
        needs_auth,
        handler,
    }
}

impl<F, Fut> Action for FnAction<F>
where
    F: Fn(ActionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ActionResponse, HttpError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn needs_auth(&self) -> bool {
        self.needs_auth
    }

    fn invoke(&self, ctx: ActionContext) -> ActionFuture<'_> {
        Box::pin((self.handler)(ctx))
    }
}
