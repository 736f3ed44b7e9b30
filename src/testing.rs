//! Test doubles for the injected collaborators.
//!
//! Each mock owns its state; nothing is shared between instances, so tests
//! never depend on the order they run in.

pub mod client_mock;
pub mod homedir_mock;
pub mod terminal_mock;

pub use client_mock::ImmuClientMock;
pub use homedir_mock::HomedirServiceMock;
pub use terminal_mock::{PasswordReaderMock, TerminalReaderMock};
