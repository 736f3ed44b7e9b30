//! Interactive terminal input.

use dialoguer::{Confirm, Password};
use std::io;

/// Reads a secret without echoing it.
pub trait PasswordReader: Send + Sync {
    fn read(&self, prompt: &str) -> io::Result<Vec<u8>>;
}

/// Asks a yes/no question.
pub trait TerminalReader: Send + Sync {
    /// Returns `"Y"` or `"N"`. `default` (`"Y"` or `"N"`) is used when the
    /// user just presses enter.
    fn read_yn(&self, default: &str) -> io::Result<String>;
}

/// `PasswordReader` over dialoguer's hidden input.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinPasswordReader;

impl PasswordReader for StdinPasswordReader {
    fn read(&self, prompt: &str) -> io::Result<Vec<u8>> {
        let password = Password::new()
            .with_prompt(prompt.trim_end_matches(':'))
            .allow_empty_password(true)
            .interact()
            .map_err(dialoguer_to_io)?;
        Ok(password.into_bytes())
    }
}

/// `TerminalReader` over dialoguer's confirmation prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinTerminalReader;

impl TerminalReader for StdinTerminalReader {
    fn read_yn(&self, default: &str) -> io::Result<String> {
        let answer = Confirm::new()
            .with_prompt("Continue?")
            .default(parse_yn(default).unwrap_or(false))
            .interact()
            .map_err(dialoguer_to_io)?;
        Ok(if answer { "Y" } else { "N" }.to_string())
    }
}

/// `Some(true)` for y/yes, `Some(false)` for n/no, case-insensitive.
pub fn parse_yn(answer: &str) -> Option<bool> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

fn dialoguer_to_io(err: dialoguer::Error) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err.to_string())
}
