pub mod build_info;
pub mod config;
pub mod error;
pub mod layers;
pub mod proxy;
pub mod server;

pub use build_info::BuildInfo;
pub use config::{AppConfig, ConfigError, ConfigValue, SpaConfig};
pub use error::{error_response, not_found, HttpError};
pub use layers::{init_tracing, ServerTimeouts};
pub use proxy::ClientAddr;
pub use server::{bind, serve_with_shutdown, shutdown_signal};
