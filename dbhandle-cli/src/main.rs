//! dbhandle CLI - bootstrap and inspect the application's database handle
//!
//! - `config`: show where NEXT_DATABASE_URL points (no network)
//! - `connect`: open the connection the way application startup does

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

#[derive(Parser, Debug)]
#[command(
    name = "dbhandle",
    author,
    version,
    about = "Open and inspect the application's PostgreSQL handle"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the resolved connection target without connecting
    Config(commands::ShowConfigArgs),

    /// Connect once and report the server
    Connect(commands::ConnectArgs),
}

fn init_tracing() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|err| anyhow!(err))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Before tracing, so RUST_LOG from a .env file takes effect
    let dotenv_files = config::load_dotenv();
    init_tracing().ok();
    config::log_dotenv(&dotenv_files);

    let cli = Cli::parse();

    match cli.command {
        Commands::Config(args) => commands::run_show_config(args),
        Commands::Connect(args) => commands::run_connect(args).await,
    }
}
