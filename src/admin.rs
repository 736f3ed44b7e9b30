//! `immuadmin`: server administration commands.

pub mod cli;
pub mod commandline;

use crate::client::Options;
use crate::error::CliError;
use crate::homedir::HomedirService;

pub use cli::{AdminArgs, AdminCli, AdminCommands};
pub use commandline::{CommandLine, STATUS_OK};

/// Token saved by a previous `immuadmin login`, if any.
pub fn stored_token(
    homedir: &dyn HomedirService,
    options: &Options,
) -> Result<Option<String>, CliError> {
    let exists = homedir
        .exists(&options.token_file)
        .map_err(|e| CliError::Homedir(e.to_string()))?;
    if !exists {
        return Ok(None);
    }
    let token = homedir
        .read(&options.token_file)
        .map_err(|e| CliError::Homedir(e.to_string()))?;
    let token = token.trim();
    Ok((!token.is_empty()).then(|| token.to_string()))
}
