use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use spa_core::{error_response, HttpError};

/// Failures of the authorization protocol.
///
/// The variant carries the detailed reason for the server log; clients only
/// see [`SecurityError::public_message`].
#[derive(Debug)]
pub enum SecurityError {
    /// The Authorization header is missing or empty.
    MissingAuthHeader,

    /// The header is not exactly `Bearer <token>`.
    InvalidAuthHeader,

    /// Issuer or audience is not configured.
    Config(String),

    /// The discovery document could not be fetched or parsed.
    DiscoveryFetch(String),

    /// The key set could not be fetched or parsed.
    JwksFetch(String),

    /// The token is malformed, uses a disallowed algorithm, or its signature
    /// does not verify.
    InvalidToken(String),

    /// The token header has no `kid`.
    MissingKid,

    /// No key in the set matches the token's `kid`.
    UnknownKeyId(String),

    /// The matching JWK could not be turned into an RSA public key.
    KeyConversion(String),

    /// A claim check failed.
    Claim(String),
}

impl std::fmt::Display for SecurityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecurityError::MissingAuthHeader => write!(f, "Authorization header is missing"),
            SecurityError::InvalidAuthHeader => write!(f, "Authorization header is invalid"),
            SecurityError::Config(msg) => write!(f, "Configuration error: {msg}"),
            SecurityError::DiscoveryFetch(msg) => write!(f, "OIDC discovery error: {msg}"),
            SecurityError::JwksFetch(msg) => write!(f, "JWKS fetch error: {msg}"),
            SecurityError::InvalidToken(msg) => write!(f, "Invalid token: {msg}"),
            SecurityError::MissingKid => write!(f, "kid not found in token header"),
            SecurityError::UnknownKeyId(kid) => write!(f, "key not found for kid: {kid}"),
            SecurityError::KeyConversion(msg) => write!(f, "Invalid JWK: {msg}"),
            SecurityError::Claim(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for SecurityError {}

impl SecurityError {
    /// Message safe to return to the client.
    pub fn public_message(&self) -> &'static str {
        match self {
            SecurityError::MissingAuthHeader => "Authorization header is missing",
            SecurityError::InvalidAuthHeader => "Authorization header is invalid",
            _ => "Token validation failed",
        }
    }
}

impl IntoResponse for SecurityError {
    fn into_response(self) -> Response {
        error_response(StatusCode::UNAUTHORIZED, self.public_message())
    }
}

impl From<SecurityError> for HttpError {
    fn from(err: SecurityError) -> Self {
        HttpError::Unauthorized(err.public_message().to_string())
    }
}
