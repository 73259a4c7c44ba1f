use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use tracing::warn;

use crate::claims::TokenClaims;
use crate::error::SecurityError;
use crate::jwt::TokenValidator;

/// Split an Authorization value at the first space into the `Bearer`
/// scheme and the credential.
pub fn parse_bearer(value: &str) -> Result<&str, SecurityError> {
    let parts: Vec<&str> = value.splitn(2, ' ').collect();
    if parts.len() != 2 || parts[0] != "Bearer" {
        return Err(SecurityError::InvalidAuthHeader);
    }
    Ok(parts[1])
}

/// Bearer credential from request headers, without validation.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, SecurityError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(SecurityError::MissingAuthHeader)?;
    if value.is_empty() {
        return Err(SecurityError::MissingAuthHeader);
    }
    let value = value.to_str().map_err(|_| SecurityError::InvalidAuthHeader)?;
    parse_bearer(value)
}

/// Run the authorization protocol for a request.
///
/// Failures are logged with their detailed reason; callers should answer
/// with [`SecurityError::public_message`].
pub async fn authorize(
    headers: &HeaderMap,
    validator: &TokenValidator,
) -> Result<TokenClaims, SecurityError> {
    let token = bearer_token(headers).inspect_err(|err| {
        warn!(error = %err, "rejected authorization header");
    })?;
    validator.validate(token).await.inspect_err(|err| {
        warn!(error = %err, "token validation failed");
    })
}
