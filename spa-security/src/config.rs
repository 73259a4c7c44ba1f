use std::time::Duration;

use jsonwebtoken::Algorithm;
use spa_core::AppConfig;

use crate::error::SecurityError;

/// OIDC settings used to validate bearer tokens.
#[derive(Clone, Debug)]
pub struct OidcSettings {
    /// Expected `iss` claim; discovery is fetched from
    /// `<issuer>/.well-known/openid-configuration`.
    pub issuer: String,

    /// Audience that must appear in the `aud` claim.
    pub audience: String,

    /// How long a fetched discovery document and key set stay usable.
    /// Zero disables caching: every validation fetches both again.
    pub jwks_cache_ttl: Duration,

    /// Accepted header algorithms. Tokens using other algorithms are rejected.
    /// Default: the RSA families (RS256/384/512, PS256/384/512).
    pub allowed_algorithms: Vec<Algorithm>,
}

impl OidcSettings {
    /// Settings with caching disabled and the default RSA algorithms.
    pub fn new(issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            jwks_cache_ttl: Duration::ZERO,
            allowed_algorithms: vec![
                Algorithm::RS256,
                Algorithm::RS384,
                Algorithm::RS512,
                Algorithm::PS256,
                Algorithm::PS384,
                Algorithm::PS512,
            ],
        }
    }

    /// Build from the application configuration.
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self::new(config.oidc_issuer(), config.oidc_audience())
            .with_cache_ttl(config.jwks_cache_ttl())
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.jwks_cache_ttl = ttl;
        self
    }

    /// Set the allowed JWT algorithms. An empty list rejects every token.
    pub fn with_allowed_algorithms(
        mut self,
        algorithms: impl IntoIterator<Item = Algorithm>,
    ) -> Self {
        self.allowed_algorithms = algorithms.into_iter().collect();
        self
    }

    /// Fails when the issuer or audience is empty.
    pub fn ensure_complete(&self) -> Result<(), SecurityError> {
        if self.issuer.is_empty() {
            return Err(SecurityError::Config("OIDC issuer not set".into()));
        }
        if self.audience.is_empty() {
            return Err(SecurityError::Config("OIDC audience not set".into()));
        }
        Ok(())
    }
}
