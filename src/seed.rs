//! `immutest`: populate a database with generated key/value pairs.

use crate::client::{ClientFactory, ImmuClient, Options};
use crate::error::CliError;
use crate::homedir::{FsHomedirService, HomedirService};
use crate::protocol::Database;
use crate::terminal::{parse_yn, PasswordReader, StdinPasswordReader, StdinTerminalReader, TerminalReader};
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const DEFAULT_COUNT: usize = 100;

/// Collaborators for one seeding run.
#[derive(Clone)]
pub struct SeedContext {
    pub options: Options,
    pub new_client: ClientFactory,
    pub password_reader: Arc<dyn PasswordReader>,
    pub terminal_reader: Arc<dyn TerminalReader>,
    pub homedir: Arc<dyn HomedirService>,
}

impl SeedContext {
    /// Interactive readers and the real home directory.
    pub fn new(options: Options, new_client: ClientFactory) -> Self {
        Self {
            options,
            new_client,
            password_reader: Arc::new(StdinPasswordReader),
            terminal_reader: Arc::new(StdinTerminalReader),
            homedir: Arc::new(FsHomedirService::new()),
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
}

/// Outcome of a run that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedSummary {
    pub database: String,
    pub requested: usize,
    pub written: usize,
    /// Index returned by the last write
    pub last_index: Option<u64>,
    /// The user declined the confirmation prompt
    pub cancelled: bool,
    pub elapsed: Duration,
}

/// Record count from the first positional argument.
pub fn parse_count(args: &[String]) -> Result<usize, CliError> {
    match args {
        [] => Ok(DEFAULT_COUNT),
        [raw] => match raw.trim().parse::<i64>() {
            Ok(n) if n > 0 => usize::try_from(n)
                .map_err(|_| CliError::InvalidArgument(format!("count too large: {}", raw))),
            Ok(_) => Err(CliError::InvalidArgument(format!(
                "count must be a positive integer, got {}",
                raw
            ))),
            Err(_) => Err(CliError::InvalidArgument(format!(
                "invalid count {:?}: expected a positive integer",
                raw
            ))),
        },
        _ => Err(CliError::Usage(format!(
            "expected at most one argument, got {}",
            args.len()
        ))),
    }
}

/// Log in, select the database, confirm, and write `count` entries
/// `key{i}` = `value{i}`.
///
/// A client construction error is returned unchanged before anything else
/// happens. The first failing write stops the run; the error reports how
/// many entries were written before it.
pub async fn execute<W: Write>(
    ctx: &SeedContext,
    args: &[String],
    out: &mut W,
) -> Result<SeedSummary, CliError> {
    let count = parse_count(args)?;
    let client = (ctx.new_client)(&ctx.options)?;

    let result = run(ctx, client.as_ref(), count, out).await;
    if let Err(e) = client.disconnect().await {
        warn!(error = %e, "Disconnect after seeding failed");
    }
    result
}

async fn run<W: Write>(
    ctx: &SeedContext,
    client: &dyn ImmuClient,
    count: usize,
    out: &mut W,
) -> Result<SeedSummary, CliError> {
    let options = &ctx.options;
    let user = options.username.as_str();

    let password = ctx
        .password_reader
        .read(&format!("{}'s password:", user))
        .map_err(|e| CliError::Input(e.to_string()))?;
    let login = client.login(user.as_bytes(), &password).await?;
    store_token(ctx, &login.token)?;
    if let Some(warning) = &login.warning {
        writeln!(out, "SECURITY WARNING: {}", warning).map_err(CliError::Output)?;
    }

    let reply = client.use_database(&Database::new(&options.database)).await?;
    store_token(ctx, &reply.token)?;
    debug!(database = %options.database, "Database selected");

    let mut summary = SeedSummary {
        database: options.database.clone(),
        requested: count,
        written: 0,
        last_index: None,
        cancelled: false,
        elapsed: Duration::ZERO,
    };

    writeln!(
        out,
        "Database {} will be populated with {} entries.",
        options.database, count
    )
    .map_err(CliError::Output)?;
    let answer = ctx
        .terminal_reader
        .read_yn("Y")
        .map_err(|e| CliError::Input(e.to_string()))?;
    if parse_yn(&answer) != Some(true) {
        writeln!(out, "Canceled").map_err(CliError::Output)?;
        summary.cancelled = true;
        return Ok(summary);
    }

    let started = Instant::now();
    for i in 0..count {
        let key = format!("key{}", i);
        let value = format!("value{}", i);
        match client.set(key.as_bytes(), value.as_bytes()).await {
            Ok(index) => {
                summary.written += 1;
                summary.last_index = Some(index.index);
            }
            Err(source) => {
                warn!(written = summary.written, error = %source, "Write failed, stopping");
                return Err(CliError::SeedInterrupted {
                    written: summary.written,
                    source,
                });
            }
        }
    }
    summary.elapsed = started.elapsed();

    info!(
        database = %summary.database,
        written = summary.written,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "Seeding finished"
    );
    writeln!(
        out,
        "OK: {} entries were written in {:.3}s",
        summary.written,
        summary.elapsed.as_secs_f64()
    )
    .map_err(CliError::Output)?;
    Ok(summary)
}

fn store_token(ctx: &SeedContext, token: &str) -> Result<(), CliError> {
    ctx.homedir
        .write(token.as_bytes(), &ctx.options.token_file)
        .map_err(|e| CliError::Homedir(e.to_string()))
}
