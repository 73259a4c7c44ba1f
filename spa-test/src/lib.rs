mod app;
mod jwt;
mod oidc;

pub use app::{PathToken, TestApp, TestRequest, TestResponse, resolve_path, tokenize_path};
pub use jwt::{TestJwt, TokenBuilder, DEFAULT_AUDIENCE, DEFAULT_ISSUER, DEFAULT_KID};
pub use oidc::MockOidcProvider;
