//! Minerva server entry point.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use minerva::{config, server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line overrides on top of config file and environment.
#[derive(Debug, Parser)]
#[command(name = "minerva", version, about = "Campus assistant service")]
struct Cli {
    /// Listen port override
    #[arg(long)]
    port: Option<u16>,

    /// SQLite database path override
    #[arg(long)]
    database: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "minerva=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut settings = config::Settings::load()?;
    if let Some(port) = cli.port {
        settings.server.port = port;
    }
    if let Some(database) = cli.database {
        settings.database.path = database;
    }

    server::serve(settings).await
}
