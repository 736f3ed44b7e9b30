//! immutest binary
//!
//! Populates a database with `N` generated key/value pairs.

use anyhow::Context;
use clap::Parser;
use immucli::client::remote_client_factory;
use immucli::config::ConfigLoader;
use immucli::logging::init_logging;
use immucli::seed::{self, SeedContext};
use std::path::PathBuf;
use std::process;

const APP: &str = "immutest";

/// immutest - populate immudb with generated data
#[derive(Parser, Debug)]
#[command(name = "immutest")]
#[command(about = "Populate an immudb database with generated key/value pairs", version)]
struct ImmutestCli {
    /// Number of entries to write (default 100)
    count: Option<String>,

    /// Configuration file path (merged over the global config file)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Server address
    #[arg(short = 'a', long)]
    address: Option<String>,

    /// Server port
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Database to populate
    #[arg(short = 'd', long)]
    database: Option<String>,

    /// User to log in as
    #[arg(short = 'u', long)]
    user: Option<String>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = ImmutestCli::parse();

    let ctx = match setup(&cli) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error initializing immutest: {:#}", e);
            process::exit(1);
        }
    };

    let args: Vec<String> = cli.count.iter().cloned().collect();
    let mut stdout = std::io::stdout();
    if let Err(e) = seed::execute(&ctx, &args, &mut stdout).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn setup(cli: &ImmutestCli) -> anyhow::Result<SeedContext> {
    let mut config = ConfigLoader::load(APP, cli.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(address) = &cli.address {
        config.client.address = address.clone();
    }
    if let Some(port) = cli.port {
        config.client.port = port;
    }
    if let Some(database) = &cli.database {
        config.client.database = database.clone();
    }
    if let Some(user) = &cli.user {
        config.client.username = user.clone();
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    init_logging(Some(&config.logging), APP).context("failed to initialize logging")?;

    Ok(SeedContext::new(config.client, remote_client_factory()))
}
