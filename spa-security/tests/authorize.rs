use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use http_body_util::BodyExt;
use spa_core::HttpError;
use spa_security::{authorize, OidcSettings, SecurityError, TokenValidator};
use spa_test::TestJwt;

fn static_validator(jwt: &TestJwt) -> TokenValidator {
    TokenValidator::new_with_static_key(
        jwt.decoding_key(),
        OidcSettings::new(jwt.issuer(), jwt.audience()),
    )
}

fn auth_headers(value: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    headers
}

#[tokio::test]
async fn bearer_token_authorized() {
    let jwt = TestJwt::new();
    let headers = auth_headers(&format!("Bearer {}", jwt.token()));
    let claims = authorize(&headers, &static_validator(&jwt)).await.unwrap();
    assert_eq!(claims.username, "test-user");
}

#[tokio::test]
async fn missing_header_message() {
    let jwt = TestJwt::new();
    let err = authorize(&HeaderMap::new(), &static_validator(&jwt))
        .await
        .unwrap_err();
    assert_eq!(err.public_message(), "Authorization header is missing");
}

#[tokio::test]
async fn basic_scheme_message() {
    let jwt = TestJwt::new();
    let err = authorize(&auth_headers("Basic dXNlcjpwYXNz"), &static_validator(&jwt))
        .await
        .unwrap_err();
    assert_eq!(err.public_message(), "Authorization header is invalid");
}

#[tokio::test]
async fn garbage_token_message() {
    let jwt = TestJwt::new();
    let err = authorize(&auth_headers("Bearer not-a-jwt"), &static_validator(&jwt))
        .await
        .unwrap_err();
    assert_eq!(err.public_message(), "Token validation failed");
}

#[tokio::test]
async fn security_error_renders_401_envelope() {
    let resp = SecurityError::UnknownKeyId("k".into()).into_response();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], br#"{"error":"Token validation failed"}"#);
}

#[test]
fn security_error_converts_to_unauthorized() {
    let err: HttpError = SecurityError::InvalidAuthHeader.into();
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(err.message(), "Authorization header is invalid");
}
