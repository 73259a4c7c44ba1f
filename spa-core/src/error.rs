use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Helper to create a JSON error response with a standard `{ "error": message }` body.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = serde_json::json!({ "error": message.into() });
    (status, Json(body)).into_response()
}

/// Client-visible failure classes, each rendered as the JSON error envelope.
pub enum HttpError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    MethodNotAllowed(String),
    Internal(String),
}

impl HttpError {
    pub fn status(&self) -> StatusCode {
        match self {
            HttpError::BadRequest(_) => StatusCode::BAD_REQUEST,
            HttpError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            HttpError::NotFound(_) => StatusCode::NOT_FOUND,
            HttpError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            HttpError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            HttpError::BadRequest(msg)
            | HttpError::Unauthorized(msg)
            | HttpError::NotFound(msg)
            | HttpError::MethodNotAllowed(msg)
            | HttpError::Internal(msg) => msg,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            HttpError::BadRequest(msg)
            | HttpError::Unauthorized(msg)
            | HttpError::NotFound(msg)
            | HttpError::MethodNotAllowed(msg)
            | HttpError::Internal(msg) => error_response(status, msg),
        }
    }
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpError::BadRequest(msg) => write!(f, "Bad Request: {msg}"),
            HttpError::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            HttpError::NotFound(msg) => write!(f, "Not Found: {msg}"),
            HttpError::MethodNotAllowed(msg) => write!(f, "Method Not Allowed: {msg}"),
            HttpError::Internal(msg) => write!(f, "Internal Error: {msg}"),
        }
    }
}

impl std::fmt::Debug for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Self as std::fmt::Display>::fmt(self, f)
    }
}

impl std::error::Error for HttpError {}

impl From<std::io::Error> for HttpError {
    fn from(err: std::io::Error) -> Self {
        HttpError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for HttpError {
    fn from(err: serde_json::Error) -> Self {
        HttpError::Internal(err.to_string())
    }
}

/// Shared responder for unmatched routes.
pub async fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not Found")
}
