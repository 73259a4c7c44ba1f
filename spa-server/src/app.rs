use std::sync::Arc;

use axum::middleware::from_fn;
use axum::Router;
use spa_api::{default_registry, ActionRegistry, ApiState, RegistryError};
use spa_core::layers::{
    access_log, catch_panic_layer, compression_layer, read_timeout_layer, write_timeout_layer,
};
use spa_core::proxy::proxy_headers;
use spa_core::{bind, serve_with_shutdown, shutdown_signal, AppConfig, BuildInfo, ServerTimeouts};
use spa_security::{OidcSettings, TokenValidator};
use spa_static::{select_provider, ContentProvider};
use tracing::info;

/// Build metadata baked in by the build script.
pub fn build_info() -> BuildInfo {
    BuildInfo::new(
        env!("CARGO_PKG_VERSION"),
        env!("SPA_BUILD_TIME"),
        env!("SPA_RUSTC_VERSION"),
    )
}

/// Assemble the full pipeline from configuration.
pub fn build_app(config: &AppConfig, build_info: BuildInfo) -> Result<Router, RegistryError> {
    let registry = default_registry()?;
    let validator = TokenValidator::new(OidcSettings::from_app_config(config));
    let provider = select_provider(config.local_static_path(), config.debug());
    Ok(assemble(
        registry,
        validator,
        build_info,
        provider,
        &ServerTimeouts::default(),
    ))
}

/// Compose the API and static branches under the shared middleware stack.
///
/// Outermost first: proxy headers, access log, panic recovery, timeouts.
/// Compression applies to the API branch only; static assets are already
/// gzip-encoded.
pub fn assemble(
    registry: ActionRegistry,
    validator: TokenValidator,
    build_info: BuildInfo,
    provider: Arc<dyn ContentProvider>,
    timeouts: &ServerTimeouts,
) -> Router {
    let api = spa_api::routes(ApiState::new(registry, validator, build_info))
        .layer(compression_layer());
    let assets = spa_static::routes(provider);

    Router::new()
        .merge(api)
        .merge(assets)
        .layer(write_timeout_layer(timeouts))
        .layer(read_timeout_layer(timeouts))
        .layer(catch_panic_layer())
        .layer(from_fn(access_log))
        .layer(from_fn(proxy_headers))
}

/// Start the server and block until shutdown completes.
pub async fn run(config: &AppConfig, build_info: BuildInfo) -> Result<(), Box<dyn std::error::Error>> {
    info!(server_port = config.server_port(), "config");
    info!(debug = config.debug(), "config");

    let timeouts = ServerTimeouts::default();
    info!(
        read = ?timeouts.read,
        write = ?timeouts.write,
        idle = ?timeouts.idle,
        "server timeouts"
    );
    if config.oidc_issuer().is_empty() {
        info!("OIDC issuer not configured, authenticated actions will be rejected");
    }

    let app = build_app(config, build_info)?;
    let listener = bind(config.server_port()).await?;
    serve_with_shutdown(listener, app, config.wait(), shutdown_signal()).await?;

    info!("Shutting down");
    Ok(())
}
