mod cli;
mod repl;

use std::path::Path;
use std::process::ExitCode;

use askbox_config::AskboxConfig;
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::EnvFilter;

fn init_logging(directive: &str) {
    let directive: Directive = directive
        .parse()
        .unwrap_or_else(|_| Directive::from(LevelFilter::INFO));
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    // Parse CLI arguments
    let args = cli::parse();

    // Load config before logging so its level can apply; report errors after.
    let loaded = match args.config.as_deref() {
        Some(path) => askbox_config::load_config_from(Path::new(path)),
        None => askbox_config::load_config(),
    };
    let config_level = loaded
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| AskboxConfig::default().logging.level);

    init_logging(args.log_level.as_deref().unwrap_or(&config_level));
    tracing::info!("askbox v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Some(ref path) = args.config {
        tracing::info!("Using config override: {path}");
    }
    let config = loaded.unwrap_or_else(|e| {
        tracing::warn!("Config load failed, using defaults: {e}");
        AskboxConfig::default()
    });
    tracing::info!(answer_url = %config.api.answer_url, "Config loaded");

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(repl::run(config, args)) {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("askbox failed: {e}");
            eprintln!("askbox: {e}");
            ExitCode::FAILURE
        }
    }
}
