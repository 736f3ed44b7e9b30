//! immucli: administration and data-seeding tools for immudb
//!
//! Commands talk to the database only through the `ImmuClient` trait and
//! reach the terminal and the home directory only through injected
//! collaborators, so every command can run against in-process fakes.

pub mod admin;
pub mod client;
pub mod config;
pub mod error;
pub mod homedir;
pub mod logging;
pub mod metrics;
pub mod protocol;
pub mod seed;
pub mod server;
pub mod terminal;
pub mod testing;
