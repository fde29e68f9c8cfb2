//! Print the resolved connection target without touching the network

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use dbhandle_core::{ConnectionTarget, DatabaseConfig, DATABASE_URL_VAR};

#[derive(Parser, Debug)]
pub struct ShowConfigArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct ConfigReport {
    source: &'static str,
    target: ConnectionTarget,
    connect_timeout_secs: Option<u64>,
}

pub fn run_show_config(args: ShowConfigArgs) -> Result<()> {
    let config = DatabaseConfig::from_env().context("Failed to read database configuration")?;
    let target = config
        .target()
        .with_context(|| format!("{DATABASE_URL_VAR} is not a usable connection URI"))?;

    let report = ConfigReport {
        source: DATABASE_URL_VAR,
        target,
        connect_timeout_secs: config.connect_timeout().map(|t| t.as_secs()),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("source:   {}", report.source);
    println!("host:     {}", report.target.host);
    println!("port:     {}", report.target.port);
    println!(
        "database: {}",
        report.target.database.as_deref().unwrap_or("(default)")
    );
    println!("user:     {}", report.target.username);
    match report.connect_timeout_secs {
        Some(secs) => println!("timeout:  {secs}s"),
        None => println!("timeout:  none"),
    }
    Ok(())
}
