use std::path::{Path, PathBuf};

use clap::Parser;
use spa_core::{init_tracing, AppConfig, SpaConfig};
use spa_server::app;
use spa_server::cli::{Cli, Commands};
use tracing::{error, info};

fn load_config(cli: &Cli) -> Result<(AppConfig, Option<PathBuf>), spa_core::ConfigError> {
    let mut raw = SpaConfig::load(cli.config.as_deref())?;
    cli.apply(&mut raw);
    let source = raw.source().map(Path::to_path_buf);
    Ok((AppConfig::from_config(&raw)?, source))
}

fn main() {
    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        let info = app::build_info();
        println!("app version: {}", info.version);
        println!("build time: {}", info.build_time);
        println!("compiler version: {}", info.compiler_version);
        return;
    }

    let (config, source) = match load_config(&cli) {
        Ok(loaded) => loaded,
        Err(e) => {
            init_tracing(cli.debug);
            error!(error = %e, "Error loading configuration");
            std::process::exit(1);
        }
    };
    init_tracing(config.debug());
    if let Some(path) = source {
        info!(path = %path.display(), "Using config file");
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "Error starting runtime");
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(app::run(&config, app::build_info())) {
        error!(error = %e, "Error starting server");
        std::process::exit(1);
    }
}
