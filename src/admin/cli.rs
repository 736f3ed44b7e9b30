//! Command tree for `immuadmin`.

use crate::config::AppConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// immuadmin - administration CLI for immudb
#[derive(Parser, Debug)]
#[command(name = "immuadmin")]
#[command(about = "Administration CLI for the immudb tamper-evident database", version)]
pub struct AdminCli {
    #[command(subcommand)]
    pub command: AdminCommands,

    /// Configuration file path (merged over the global config file)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Server address
    #[arg(short = 'a', long, global = true)]
    pub address: Option<String>,

    /// Server port
    #[arg(short = 'p', long, global = true)]
    pub port: Option<u16>,

    /// Port of the server's metrics endpoint
    #[arg(long, global = true)]
    pub metrics_port: Option<u16>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, both)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

impl AdminCli {
    /// Apply command-line flags on top of the loaded configuration.
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(address) = &self.address {
            config.client.address = address.clone();
        }
        if let Some(port) = self.port {
            config.client.port = port;
        }
        if let Some(port) = self.metrics_port {
            config.client.metrics_port = port;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.logging.format = format.clone();
        }
        if let Some(output) = &self.log_output {
            config.logging.output = output.clone();
        }
        if let Some(file) = &self.log_file {
            config.logging.file = Some(file.clone());
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum AdminCommands {
    /// Check that the server is reachable and responding to queries
    Status,
    /// Show statistics scraped from the server's metrics endpoint
    Stats {
        /// Human-readable report (default)
        #[arg(long, conflicts_with = "raw")]
        text: bool,
        /// Print the metrics document exactly as served
        #[arg(long)]
        raw: bool,
    },
    /// Log in and store the session token in the home directory
    Login {
        /// User name
        username: String,
    },
    /// Log out and remove the stored session token
    Logout,
}

/// Subcommand and flags only, without the program name. Used to drive a
/// `CommandLine` from an argument list such as `["stats", "--raw"]`.
#[derive(Parser, Debug)]
#[command(name = "immuadmin", no_binary_name = true)]
pub struct AdminArgs {
    #[command(subcommand)]
    pub command: AdminCommands,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_tree_is_valid() {
        AdminCli::command().debug_assert();
        AdminArgs::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = AdminCli::try_parse_from(["immuadmin", "stats", "--raw", "--metrics-port", "9000"])
            .unwrap();
        assert_eq!(cli.command, AdminCommands::Stats { text: false, raw: true });
        assert_eq!(cli.metrics_port, Some(9000));
    }

    #[test]
    fn test_text_and_raw_conflict() {
        assert!(AdminArgs::try_parse_from(["stats", "--text", "--raw"]).is_err());
    }

    #[test]
    fn test_overrides_replace_config_values() {
        let cli = AdminCli::try_parse_from([
            "immuadmin",
            "--address",
            "10.1.1.1",
            "--log-level",
            "debug",
            "status",
        ])
        .unwrap();
        let mut config = AppConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.client.address, "10.1.1.1");
        assert_eq!(config.client.port, 3322);
        assert_eq!(config.logging.level, "debug");
    }
}
