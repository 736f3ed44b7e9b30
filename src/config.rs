//! Configuration
//!
//! Layered with the `config` crate. Precedence, lowest first: built-in
//! defaults, the global file `<config dir>/immudb/<app>.toml`, an explicit
//! `--config` file, then `<APP>__SECTION__KEY` environment variables.
//! Command-line flags are applied on top by the binaries.

use crate::client::Options;
use crate::logging::LoggingConfig;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Everything a command-line tool reads from configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub client: Options,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Loads `AppConfig` for one tool (`immuadmin`, `immutest`).
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load with the global file, an optional explicit file and the environment.
    pub fn load(app: &str, explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
        Self::load_with_global(app, global_config_path(app).as_deref(), explicit)
    }

    /// Same as [`ConfigLoader::load`] with the global file location supplied
    /// by the caller. A missing global file is skipped; a missing explicit
    /// file is an error.
    pub fn load_with_global(
        app: &str,
        global: Option<&Path>,
        explicit: Option<&Path>,
    ) -> Result<AppConfig, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = global {
            debug!(path = %path.display(), "Global config file");
            builder = builder.add_source(File::from(path).required(false));
        }
        if let Some(path) = explicit {
            debug!(path = %path.display(), "Explicit config file");
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(&env_prefix(app))
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

/// `<config dir>/immudb/<app>.toml`, if the platform has a config dir.
pub fn global_config_path(app: &str) -> Option<PathBuf> {
    directories::BaseDirs::new()
        .map(|dirs| dirs.config_dir().join("immudb").join(format!("{}.toml", app)))
}

fn env_prefix(app: &str) -> String {
    app.to_uppercase().replace('-', "_")
}
