pub mod claims;
pub mod config;
pub mod discovery;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod jwt;
pub mod keys;

pub use claims::{check_claims, TokenClaims};
pub use config::OidcSettings;
pub use discovery::{fetch_discovery, OidcDiscovery};
pub use error::SecurityError;
pub use extractor::{authorize, bearer_token};
pub use jwks::{fetch_jwks, Jwk, JwkSet, OidcKeyStore};
pub use jwt::TokenValidator;
