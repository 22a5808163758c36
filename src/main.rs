use std::process;

use clap::Parser;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use pvectl::cli::{resolve_config, run_command, Cli};
use pvectl::PveClient;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    // Load .env file if specified
    if let Some(ref env_file) = cli.env_file {
        if let Err(e) = dotenvy::from_path(env_file) {
            error!("Failed to load env file {}: {}", env_file.display(), e);
            process::exit(1);
        }
    }

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(cli.config.as_deref())?;
    debug!("Using PVE host {}", config.host);

    let client = PveClient::new(config)?;
    let output = run_command(&client, cli.command).await?;
    print!("{}", output);
    Ok(())
}
