//! Calorie Log - food photo calorie tracking from the command line
//!
//! Photographs are analyzed by a multimodal AI provider, logged as entries,
//! and totalled against a daily target that resets at a configurable hour.

mod cli;
mod commands;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use calorie_app::Config;
use calorie_types::Error;
use cli::Cli;

fn init_logging(verbose: bool, default_filter: &str) {
    let env_filter = if verbose {
        EnvFilter::new("calorie=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
    };

    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }
}

fn report(err: &Error) {
    eprintln!("Error: {}", err);
    if let Error::Vision(vision) = err {
        eprintln!("Hint: {}", vision.user_hint());
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            report(&e);
            std::process::exit(1);
        }
    };
    init_logging(cli.verbose, config.log_filter());

    if let Err(e) = commands::execute(cli, config).await {
        report(&e);
        std::process::exit(1);
    }
}
