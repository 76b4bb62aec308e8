//! `relief`: ingest elevation tiles and query the resulting terrain.

mod commands;

use clap::Parser;
use relief_config::{CliArgs, Command, Config, default_config_dir};

fn main() {
    let args = CliArgs::parse();

    let config_dir = match args.config.clone().map(Ok).unwrap_or_else(default_config_dir) {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Failed to resolve config directory: {e}");
            std::process::exit(1);
        }
    };

    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config
        .debug
        .log_dir
        .clone()
        .unwrap_or_else(|| config_dir.join("logs"));
    relief_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    let result = match &args.command {
        Command::Ingest(_) => commands::ingest(&config),
        Command::Areas => commands::areas(&config),
        Command::Sample(sample) => commands::sample(&config, sample),
    };

    match result {
        Ok(output) => print!("{output}"),
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
