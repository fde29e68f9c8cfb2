//! Run the startup initializer once and report the result
//!
//! Exercises exactly what an application does at boot: resolve configuration,
//! open the connection, bind the schema. No statements are issued.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use dbhandle_core::{Database, DatabaseConfig, Schema};

/// The CLI has no tables of its own.
static CLI_SCHEMA: Schema = Schema::new("dbhandle-cli", &[]);

#[derive(Parser, Debug)]
pub struct ConnectArgs {
    /// Database URL (overrides NEXT_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Give up connecting after this many seconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,
}

pub async fn run_connect(args: ConnectArgs) -> Result<()> {
    let mut config = match args.database_url {
        Some(url) => DatabaseConfig::from_url(&url).context("Invalid --database-url")?,
        None => DatabaseConfig::from_env().context("Failed to read database configuration")?,
    };
    if let Some(secs) = args.timeout {
        config = config.with_connect_timeout(Duration::from_secs(secs));
    }

    let db = Database::connect(&config, &CLI_SCHEMA)
        .await
        .context("Failed to connect to database")?;

    println!("connected: {}", db.target());
    match db.server_version() {
        Some(num) => println!("server:    PostgreSQL {}", format_server_version(num)),
        None => println!("server:    unknown version"),
    }
    Ok(())
}

/// Render `server_version_num` (e.g. 160002) as a release string.
fn format_server_version(num: u32) -> String {
    let major = num / 10_000;
    if major >= 10 {
        format!("{}.{}", major, num % 10_000)
    } else {
        format!("{}.{}.{}", major, (num / 100) % 100, num % 100)
    }
}
