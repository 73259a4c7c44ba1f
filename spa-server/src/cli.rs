use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use spa_core::SpaConfig;

#[derive(Parser, Debug)]
#[command(name = "spa-server", version, about = "spa-server is a simple app server")]
pub struct Cli {
    /// Config file (default: application.yaml in the working directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug mode
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the app server
    Server(ServerArgs),
    /// Print the version number of application
    Version,
}

/// Flags overriding configuration keys.
#[derive(Args, Debug, Default)]
pub struct ServerArgs {
    /// Port to listen on [server.port]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Time to wait for in-flight requests on shutdown, e.g. 15s [server.wait]
    #[arg(short, long)]
    pub wait: Option<String>,

    /// OIDC issuer [oidc.issuer]
    #[arg(long)]
    pub oidc_issuer: Option<String>,

    /// OIDC audience [oidc.audience]
    #[arg(long)]
    pub oidc_audience: Option<String>,

    /// How long discovery and JWKS documents are reused, 0 disables [oidc.jwks_cache_ttl]
    #[arg(long)]
    pub jwks_cache_ttl: Option<String>,

    /// Local path to static files [static.local_path]
    #[arg(long)]
    pub local_static_path: Option<String>,

    /// Kubernetes CA file [kube.ca_file]
    #[arg(long)]
    pub kube_ca_file: Option<String>,

    /// Kubernetes API server [kube.api_server]
    #[arg(long)]
    pub kube_api_server: Option<String>,
}

impl Cli {
    /// Apply the flags given on the command line on top of `config`.
    pub fn apply(&self, config: &mut SpaConfig) {
        if self.debug {
            config.set("debug", true);
        }
        if let Commands::Server(args) = &self.command {
            args.apply(config);
        }
    }
}

impl ServerArgs {
    pub fn apply(&self, config: &mut SpaConfig) {
        if let Some(port) = self.port {
            config.set("server.port", i64::from(port));
        }
        let strings = [
            ("server.wait", &self.wait),
            ("oidc.issuer", &self.oidc_issuer),
            ("oidc.audience", &self.oidc_audience),
            ("oidc.jwks_cache_ttl", &self.jwks_cache_ttl),
            ("static.local_path", &self.local_static_path),
            ("kube.ca_file", &self.kube_ca_file),
            ("kube.api_server", &self.kube_api_server),
        ];
        for (key, value) in strings {
            if let Some(value) = value {
                config.set(key, value.as_str());
            }
        }
    }
}
