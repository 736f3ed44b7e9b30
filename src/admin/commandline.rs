//! Command harness: a client plus injected I/O collaborators.

use super::cli::{AdminArgs, AdminCommands};
use crate::client::{ImmuClient, Options};
use crate::error::{ClientError, CliError};
use crate::homedir::{FsHomedirService, HomedirService};
use crate::metrics::{parse, MetricsScraper, StatsReport};
use crate::terminal::{PasswordReader, StdinPasswordReader, StdinTerminalReader, TerminalReader};
use clap::error::ErrorKind;
use clap::Parser;
use std::ffi::OsString;
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, info};

pub const STATUS_OK: &str = "OK - server is reachable and responding to queries";

/// Everything an `immuadmin` command needs. All network, filesystem and
/// terminal access goes through the injected collaborators.
pub struct CommandLine {
    options: Options,
    client: Arc<dyn ImmuClient>,
    password_reader: Arc<dyn PasswordReader>,
    terminal_reader: Arc<dyn TerminalReader>,
    homedir: Arc<dyn HomedirService>,
    color: bool,
}

impl CommandLine {
    /// Interactive readers and the real home directory by default; no color.
    pub fn new(options: Options, client: Arc<dyn ImmuClient>) -> Self {
        Self {
            options,
            client,
            password_reader: Arc::new(StdinPasswordReader),
            terminal_reader: Arc::new(StdinTerminalReader),
            homedir: Arc::new(FsHomedirService::new()),
            color: false,
        }
    }

    pub fn with_password_reader(mut self, reader: Arc<dyn PasswordReader>) -> Self {
        self.password_reader = reader;
        self
    }

    pub fn with_terminal_reader(mut self, reader: Arc<dyn TerminalReader>) -> Self {
        self.terminal_reader = reader;
        self
    }

    pub fn with_homedir(mut self, homedir: Arc<dyn HomedirService>) -> Self {
        self.homedir = homedir;
        self
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Parse `args` (subcommand first, no program name), execute, and write
    /// the output to `out`. Help and version requests are written to `out` too.
    pub async fn run<I, T, W>(&self, args: I, out: &mut W) -> Result<(), CliError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
        W: Write,
    {
        let parsed = match AdminArgs::try_parse_from(args) {
            Ok(parsed) => parsed,
            Err(e) => match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    write!(out, "{}", e.render()).map_err(CliError::Output)?;
                    return Ok(());
                }
                _ => return Err(CliError::Usage(e.render().to_string())),
            },
        };
        let output = self.execute(&parsed.command).await?;
        writeln!(out, "{}", output).map_err(CliError::Output)
    }

    /// Execute a parsed command and return its output.
    pub async fn execute(&self, command: &AdminCommands) -> Result<String, CliError> {
        debug!(?command, "Executing admin command");
        match command {
            AdminCommands::Status => self.status().await,
            AdminCommands::Stats { raw, .. } => self.stats(*raw).await,
            AdminCommands::Login { username } => self.login(username).await,
            AdminCommands::Logout => self.logout().await,
        }
    }

    async fn status(&self) -> Result<String, CliError> {
        let health = self.client.health_check().await?;
        if !health.status {
            return Err(CliError::Client(ClientError::Other(format!(
                "server {} reported unhealthy",
                self.options.bind_address()
            ))));
        }
        Ok(STATUS_OK.to_string())
    }

    async fn stats(&self, raw: bool) -> Result<String, CliError> {
        let scraper = MetricsScraper::from_options(&self.options)?;
        let body = scraper.fetch().await?;
        if raw {
            return Ok(body);
        }
        let report = StatsReport::from_samples(&parse(&body));
        Ok(report.render(self.color))
    }

    async fn login(&self, username: &str) -> Result<String, CliError> {
        let password = self
            .password_reader
            .read(&format!("{}'s password:", username))
            .map_err(|e| CliError::Input(e.to_string()))?;
        let response = self.client.login(username.as_bytes(), &password).await?;
        self.homedir
            .write(response.token.as_bytes(), &self.options.token_file)
            .map_err(|e| CliError::Homedir(e.to_string()))?;
        info!(user = username, "Logged in");

        let mut out = format!("logged in as {}", username);
        if let Some(warning) = response.warning {
            out.push_str(&format!("\nSECURITY WARNING: {}", warning));
        }
        Ok(out)
    }

    async fn logout(&self) -> Result<String, CliError> {
        if !self.confirm("Y")? {
            debug!("Logout declined");
            return Ok("Canceled".to_string());
        }
        self.client.logout().await?;
        let token_file = &self.options.token_file;
        let exists = self
            .homedir
            .exists(token_file)
            .map_err(|e| CliError::Homedir(e.to_string()))?;
        if exists {
            self.homedir
                .delete(token_file)
                .map_err(|e| CliError::Homedir(e.to_string()))?;
        }
        info!("Logged out");
        Ok("logged out".to_string())
    }

    /// Anything but an explicit yes counts as no.
    fn confirm(&self, default: &str) -> Result<bool, CliError> {
        let answer = self
            .terminal_reader
            .read_yn(default)
            .map_err(|e| CliError::Input(e.to_string()))?;
        Ok(crate::terminal::parse_yn(&answer).unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{HealthResponse, LoginResponse};
    use crate::testing::{
        HomedirServiceMock, ImmuClientMock, PasswordReaderMock, TerminalReaderMock,
    };

    fn harness(client: ImmuClientMock) -> (CommandLine, HomedirServiceMock, PasswordReaderMock) {
        let homedir = HomedirServiceMock::new();
        let password_reader = PasswordReaderMock::new("immudb");
        let cl = CommandLine::new(Options::default(), Arc::new(client))
            .with_password_reader(Arc::new(password_reader.clone()))
            .with_terminal_reader(Arc::new(TerminalReaderMock::new("Y")))
            .with_homedir(Arc::new(homedir.clone()));
        (cl, homedir, password_reader)
    }

    #[tokio::test]
    async fn test_status_ok() {
        let (cl, _, _) = harness(ImmuClientMock::new());
        let mut out = Vec::new();
        cl.run(["status"], &mut out).await.unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), format!("{}\n", STATUS_OK));
    }

    #[tokio::test]
    async fn test_status_unhealthy_and_unreachable() {
        let (cl, _, _) = harness(ImmuClientMock::new().on_health_check(|| {
            Ok(HealthResponse {
                status: false,
                version: "mock".to_string(),
            })
        }));
        assert!(cl.execute(&AdminCommands::Status).await.is_err());

        let (cl, _, _) = harness(
            ImmuClientMock::new()
                .on_health_check(|| Err(ClientError::Other("connection refused".to_string()))),
        );
        let err = cl.execute(&AdminCommands::Status).await.unwrap_err();
        assert_eq!(err.to_string(), "connection refused");
    }

    #[tokio::test]
    async fn test_login_prompts_and_stores_token() {
        let (cl, homedir, password_reader) = harness(ImmuClientMock::new().on_login(|user, pw| {
            assert_eq!(user, b"immudb");
            assert_eq!(pw, b"immudb");
            Ok(LoginResponse {
                token: "session-token".to_string(),
                warning: Some("change the default password".to_string()),
            })
        }));

        let output = cl
            .execute(&AdminCommands::Login {
                username: "immudb".to_string(),
            })
            .await
            .unwrap();
        assert!(output.contains("SECURITY WARNING"));
        assert_eq!(password_reader.prompts(), vec!["immudb's password:".to_string()]);
        assert_eq!(
            homedir.content(".immuadmin_token"),
            Some(b"session-token".to_vec())
        );
    }

    #[tokio::test]
    async fn test_login_failure_stores_nothing() {
        let (cl, homedir, _) = harness(
            ImmuClientMock::new()
                .on_login(|_, _| Err(ClientError::Other("invalid credentials".to_string()))),
        );
        let result = cl
            .execute(&AdminCommands::Login {
                username: "immudb".to_string(),
            })
            .await;
        assert!(result.is_err());
        assert!(homedir.file_names().is_empty());
    }

    #[tokio::test]
    async fn test_logout_removes_token() {
        let (cl, homedir, _) = harness(ImmuClientMock::new());
        homedir.write(b"session-token", ".immuadmin_token").unwrap();
        assert_eq!(cl.execute(&AdminCommands::Logout).await.unwrap(), "logged out");
        assert!(!homedir.exists(".immuadmin_token").unwrap());

        // No token file is fine.
        cl.execute(&AdminCommands::Logout).await.unwrap();
    }

    #[tokio::test]
    async fn test_help_is_written_to_output() {
        let (cl, _, _) = harness(ImmuClientMock::new());
        let mut out = Vec::new();
        cl.run(["--help"], &mut out).await.unwrap();
        let help = String::from_utf8(out).unwrap();
        assert!(help.contains("status"));
        assert!(help.contains("stats"));
    }

    #[tokio::test]
    async fn test_unknown_subcommand_is_usage_error() {
        let (cl, _, _) = harness(ImmuClientMock::new());
        let mut out = Vec::new();
        let err = cl.run(["frobnicate"], &mut out).await.unwrap_err();
        assert!(matches!(err, CliError::Usage(_)));
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_declined_logout_keeps_session() {
        let client = ImmuClientMock::new();
        let terminal_reader = TerminalReaderMock::new("n");
        let (cl, homedir, _) = harness(client.clone());
        let cl = cl.with_terminal_reader(Arc::new(terminal_reader.clone()));
        homedir.write(b"session-token", ".immuadmin_token").unwrap();

        assert_eq!(cl.execute(&AdminCommands::Logout).await.unwrap(), "Canceled");
        assert_eq!(terminal_reader.defaults_seen(), vec!["Y".to_string()]);
        assert_eq!(client.call_count("logout"), 0);
        assert!(homedir.exists(".immuadmin_token").unwrap());
    }
}
