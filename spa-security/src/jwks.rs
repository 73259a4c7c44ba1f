use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::DecodingKey;
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::discovery::{fetch_discovery, OidcDiscovery};
use crate::error::SecurityError;
use crate::keys::rsa_decoding_key;

/// One JSON Web Key. Only the RSA public components are used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    #[serde(default)]
    pub kid: Option<String>,
    #[serde(default)]
    pub kty: Option<String>,
    #[serde(default)]
    pub alg: Option<String>,
    #[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    /// RSA modulus, base64url.
    #[serde(default)]
    pub n: Option<String>,
    /// RSA exponent, base64url.
    #[serde(default)]
    pub e: Option<String>,
}

/// JWKS envelope, keys in document order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    /// First key whose `kid` equals `kid`.
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.kid.as_deref() == Some(kid))
    }
}

/// Fetch a key set from `uri`.
pub async fn fetch_jwks(client: &reqwest::Client, uri: &str) -> Result<JwkSet, SecurityError> {
    let response = client
        .get(uri)
        .header(ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| {
            debug!(%uri, error = %e, "JWKS request failed");
            SecurityError::JwksFetch(format!("failed to get JWKS: {e}"))
        })?;

    let response = response.error_for_status().map_err(|e| {
        debug!(%uri, error = %e, "JWKS returned an error status");
        SecurityError::JwksFetch(format!("failed to get JWKS: {e}"))
    })?;

    response
        .json::<JwkSet>()
        .await
        .map_err(|e| SecurityError::JwksFetch(format!("failed to decode JWKS: {e}")))
}

struct Cached<T> {
    value: Arc<T>,
    fetched_at: Instant,
}

impl<T> Cached<T> {
    fn new(value: T) -> Self {
        Self {
            value: Arc::new(value),
            fetched_at: Instant::now(),
        }
    }

    fn fresh(&self, ttl: Duration) -> Option<Arc<T>> {
        (!is_stale(Some(self.fetched_at), ttl)).then(|| self.value.clone())
    }
}

/// Source of signing keys for one OIDC issuer.
///
/// With a zero TTL every call fetches the discovery document and key set
/// again. With a positive TTL both are reused until they expire; a `kid`
/// missing from a cached set forces one refetch. Fetch failures are never
/// masked by stale entries.
pub struct OidcKeyStore {
    client: reqwest::Client,
    issuer: String,
    ttl: Duration,
    discovery: RwLock<Option<Cached<OidcDiscovery>>>,
    jwks: RwLock<Option<Cached<JwkSet>>>,
    refresh_lock: Mutex<()>,
}

impl OidcKeyStore {
    pub fn new(issuer: impl Into<String>, ttl: Duration) -> Self {
        Self::with_client(reqwest::Client::new(), issuer, ttl)
    }

    pub fn with_client(client: reqwest::Client, issuer: impl Into<String>, ttl: Duration) -> Self {
        Self {
            client,
            issuer: issuer.into(),
            ttl,
            discovery: RwLock::new(None),
            jwks: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    fn caching(&self) -> bool {
        !self.ttl.is_zero()
    }

    /// Discovery document of the issuer.
    pub async fn discovery(&self) -> Result<Arc<OidcDiscovery>, SecurityError> {
        if self.caching() {
            if let Some(doc) = self.discovery.read().await.as_ref().and_then(|c| c.fresh(self.ttl)) {
                return Ok(doc);
            }
        }

        let doc = fetch_discovery(&self.client, &self.issuer).await?;
        if !self.caching() {
            return Ok(Arc::new(doc));
        }
        let cached = Cached::new(doc);
        let value = cached.value.clone();
        *self.discovery.write().await = Some(cached);
        Ok(value)
    }

    /// Decoding key for `kid` from the key set named by `discovery`.
    pub async fn key_for(
        &self,
        discovery: &OidcDiscovery,
        kid: &str,
    ) -> Result<DecodingKey, SecurityError> {
        if !self.caching() {
            let set = fetch_jwks(&self.client, &discovery.jwks_uri).await?;
            return lookup(&set, kid);
        }

        if let Some(set) = self.jwks.read().await.as_ref().and_then(|c| c.fresh(self.ttl)) {
            if let Some(jwk) = set.find(kid) {
                return rsa_decoding_key(jwk);
            }
            debug!(%kid, "kid not in cached key set, refetching");
        }

        let _guard = self.refresh_lock.lock().await;
        let set = fetch_jwks(&self.client, &discovery.jwks_uri).await?;
        let result = lookup(&set, kid);
        *self.jwks.write().await = Some(Cached::new(set));
        result
    }
}

fn lookup(set: &JwkSet, kid: &str) -> Result<DecodingKey, SecurityError> {
    let jwk = set
        .find(kid)
        .ok_or_else(|| SecurityError::UnknownKeyId(kid.to_string()))?;
    rsa_decoding_key(jwk)
}

fn is_stale(last_refresh: Option<Instant>, ttl: Duration) -> bool {
    match last_refresh {
        None => true,
        Some(ts) => ts.elapsed() >= ttl,
    }
}
