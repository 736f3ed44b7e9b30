use crate::terminal::{PasswordReader, TerminalReader};
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;

/// Returns a fixed password and records the prompts it was shown.
#[derive(Debug, Clone)]
pub struct PasswordReaderMock {
    password: Option<Vec<u8>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl Default for PasswordReaderMock {
    fn default() -> Self {
        Self::new("password")
    }
}

impl PasswordReaderMock {
    pub fn new(password: impl AsRef<[u8]>) -> Self {
        Self {
            password: Some(password.as_ref().to_vec()),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A reader whose input stream is closed.
    pub fn failing() -> Self {
        Self {
            password: None,
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

impl PasswordReader for PasswordReaderMock {
    fn read(&self, prompt: &str) -> io::Result<Vec<u8>> {
        self.prompts.lock().push(prompt.to_string());
        self.password
            .clone()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no password available"))
    }
}

/// Answers every yes/no question with a fixed string.
#[derive(Debug, Clone)]
pub struct TerminalReaderMock {
    answer: String,
    asked: Arc<Mutex<Vec<String>>>,
}

impl Default for TerminalReaderMock {
    fn default() -> Self {
        Self::new("Y")
    }
}

impl TerminalReaderMock {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            asked: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Defaults passed to `read_yn`, one per question.
    pub fn defaults_seen(&self) -> Vec<String> {
        self.asked.lock().clone()
    }
}

impl TerminalReader for TerminalReaderMock {
    fn read_yn(&self, default: &str) -> io::Result<String> {
        self.asked.lock().push(default.to_string());
        Ok(self.answer.clone())
    }
}
