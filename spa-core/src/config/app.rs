use std::time::Duration;

use super::{ConfigError, SpaConfig};

/// Metadata about a single configuration property.
#[derive(Debug, Clone, Copy)]
pub struct PropertyMeta {
    /// Dot-separated key (e.g., `"server.port"`).
    pub key: &'static str,
    /// Default value as displayed in help output.
    pub default_value: &'static str,
    pub description: &'static str,
}

const PROPERTIES: &[PropertyMeta] = &[
    PropertyMeta {
        key: "server.port",
        default_value: "8080",
        description: "Port to listen on",
    },
    PropertyMeta {
        key: "debug",
        default_value: "false",
        description: "Enable debug mode",
    },
    PropertyMeta {
        key: "server.wait",
        default_value: "15s",
        description: "Time to wait for in-flight requests before shutting down",
    },
    PropertyMeta {
        key: "oidc.issuer",
        default_value: "",
        description: "OIDC issuer",
    },
    PropertyMeta {
        key: "oidc.audience",
        default_value: "",
        description: "OIDC audience",
    },
    PropertyMeta {
        key: "oidc.jwks_cache_ttl",
        default_value: "0s",
        description: "How long discovery and JWKS documents are reused (0 disables caching)",
    },
    PropertyMeta {
        key: "static.local_path",
        default_value: "",
        description: "Local path to static files",
    },
    PropertyMeta {
        key: "kube.ca_file",
        default_value: "",
        description: "Kubernetes CA file",
    },
    PropertyMeta {
        key: "kube.api_server",
        default_value: "",
        description: "Kubernetes API server",
    },
];

/// Typed application settings, built once at startup and passed by
/// reference into the pipeline.
#[derive(Debug, Clone)]
pub struct AppConfig {
    server_port: u16,
    debug: bool,
    wait: Duration,
    oidc_issuer: String,
    oidc_audience: String,
    jwks_cache_ttl: Duration,
    local_static_path: String,
    kube_ca_file: String,
    kube_api_server: String,
}

impl AppConfig {
    /// Every key the application reads, with defaults and descriptions.
    pub fn properties() -> &'static [PropertyMeta] {
        PROPERTIES
    }

    /// Construct from raw values, applying defaults for absent keys.
    pub fn from_config(config: &SpaConfig) -> Result<Self, ConfigError> {
        let server_port: u16 = config.get_or("server.port", 8080)?;
        if server_port == 0 {
            return Err(ConfigError::Invalid {
                key: "server.port".into(),
                message: "port must be between 1 and 65535".into(),
            });
        }

        Ok(Self {
            server_port,
            debug: config.get_or("debug", false)?,
            wait: config.get_or("server.wait", Duration::from_secs(15))?,
            oidc_issuer: config.get_or("oidc.issuer", String::new())?,
            oidc_audience: config.get_or("oidc.audience", String::new())?,
            jwks_cache_ttl: config.get_or("oidc.jwks_cache_ttl", Duration::ZERO)?,
            local_static_path: config.get_or("static.local_path", String::new())?,
            kube_ca_file: config.get_or("kube.ca_file", String::new())?,
            kube_api_server: config.get_or("kube.api_server", String::new())?,
        })
    }

    pub fn server_port(&self) -> u16 {
        self.server_port
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Grace period for in-flight requests on shutdown.
    pub fn wait(&self) -> Duration {
        self.wait
    }

    pub fn oidc_issuer(&self) -> &str {
        &self.oidc_issuer
    }

    pub fn oidc_audience(&self) -> &str {
        &self.oidc_audience
    }

    pub fn jwks_cache_ttl(&self) -> Duration {
        self.jwks_cache_ttl
    }

    pub fn local_static_path(&self) -> &str {
        &self.local_static_path
    }

    pub fn kube_ca_file(&self) -> &str {
        &self.kube_ca_file
    }

    pub fn kube_api_server(&self) -> &str {
        &self.kube_api_server
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        // An empty config only produces defaults, which are all valid.
        match Self::from_config(&SpaConfig::empty()) {
            Ok(config) => config,
            Err(e) => unreachable!("default config is invalid: {e}"),
        }
    }
}
