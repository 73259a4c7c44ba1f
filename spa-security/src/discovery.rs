use reqwest::header::ACCEPT;
use serde::Deserialize;
use tracing::debug;

use crate::error::SecurityError;

const WELL_KNOWN_PATH: &str = "/.well-known/openid-configuration";

/// The parts of an OpenID Provider configuration document this server reads.
#[derive(Debug, Clone, Deserialize)]
pub struct OidcDiscovery {
    #[serde(default)]
    pub issuer: Option<String>,
    pub jwks_uri: String,
    #[serde(default)]
    pub token_endpoint: Option<String>,
    #[serde(default)]
    pub userinfo_endpoint: Option<String>,
}

/// `<issuer>/.well-known/openid-configuration`, without doubling a trailing
/// slash on the issuer.
pub fn discovery_url(issuer: &str) -> String {
    format!("{}{WELL_KNOWN_PATH}", issuer.trim_end_matches('/'))
}

/// Fetch the discovery document of `issuer`. A transport failure, non-2xx
/// status, or unparsable body is an error.
pub async fn fetch_discovery(
    client: &reqwest::Client,
    issuer: &str,
) -> Result<OidcDiscovery, SecurityError> {
    let url = discovery_url(issuer);
    let response = client
        .get(&url)
        .header(ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| {
            debug!(%url, error = %e, "discovery request failed");
            SecurityError::DiscoveryFetch(format!("failed to get openid configuration: {e}"))
        })?;

    let response = response.error_for_status().map_err(|e| {
        debug!(%url, error = %e, "discovery returned an error status");
        SecurityError::DiscoveryFetch(format!("failed to get openid configuration: {e}"))
    })?;

    response.json::<OidcDiscovery>().await.map_err(|e| {
        SecurityError::DiscoveryFetch(format!("failed to decode openid configuration: {e}"))
    })
}
