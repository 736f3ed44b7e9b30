//! immuadmin binary
//!
//! Server status, statistics and session management for immudb.

use anyhow::Context;
use clap::Parser;
use immucli::admin::{stored_token, AdminCli, CommandLine};
use immucli::client::RemoteClient;
use immucli::config::ConfigLoader;
use immucli::homedir::FsHomedirService;
use immucli::logging::init_logging;
use std::io::IsTerminal;
use std::process;
use std::sync::Arc;

const APP: &str = "immuadmin";

#[tokio::main]
async fn main() {
    let cli = AdminCli::parse();

    let command_line = match setup(&cli) {
        Ok(cl) => cl,
        Err(e) => {
            eprintln!("Error initializing immuadmin: {:#}", e);
            process::exit(1);
        }
    };

    match command_line.execute(&cli.command).await {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn setup(cli: &AdminCli) -> anyhow::Result<CommandLine> {
    let mut config = ConfigLoader::load(APP, cli.config.as_deref())
        .context("failed to load configuration")?;
    cli.apply_overrides(&mut config);
    init_logging(Some(&config.logging), APP).context("failed to initialize logging")?;

    let homedir = Arc::new(FsHomedirService::new());
    let mut client = RemoteClient::new(config.client.clone());
    if let Some(token) = stored_token(homedir.as_ref(), &config.client)? {
        client = client.with_token(token);
    }

    let color = config.logging.color
        && std::env::var_os("NO_COLOR").is_none()
        && std::io::stdout().is_terminal();
    Ok(CommandLine::new(config.client, Arc::new(client))
        .with_homedir(homedir)
        .with_color(color))
}
