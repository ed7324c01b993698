//! lensserve binary entry point

use anyhow::Context;
use clap::Parser;
use lensserve::{CodeLensServer, ServerConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// CodeLens source code analysis service
#[derive(Parser, Debug)]
#[command(name = "lensserve")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Clone, upload, and analyze source code with an LLM", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long = "config", short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the listen host
    #[arg(long = "host")]
    host: Option<String>,

    /// Override the listen port
    #[arg(long = "port")]
    port: Option<u16>,

    /// Log at debug level
    #[arg(long = "verbose", short = 'v')]
    verbose: bool,
}

/// Install the stderr subscriber. `RUST_LOG` wins over the configured level.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config =
        ServerConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if cli.verbose {
        config.log_level = "debug".to_string();
    }
    config.validate().context("Invalid configuration")?;

    init_logging(&config.log_level);
    info!("Data directory: {}", config.data_dir.display());
    info!("LLM provider: {}", config.llm.provider);

    let server = CodeLensServer::new(config)?;
    info!("Server starting on: {}", server.server_url());

    server.start().await?;
    info!("Server stopped");
    Ok(())
}
