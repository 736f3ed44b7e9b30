//! Home-directory file access, used to persist the session token between
//! `immuadmin` invocations.

use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::debug;

/// Small named files in the user's home directory.
pub trait HomedirService: Send + Sync {
    /// Create or replace `name` with `content`.
    fn write(&self, content: &[u8], name: &str) -> io::Result<()>;

    fn exists(&self, name: &str) -> io::Result<bool>;

    fn read(&self, name: &str) -> io::Result<String>;

    fn delete(&self, name: &str) -> io::Result<()>;
}

/// Filesystem-backed implementation rooted at the user's home directory.
#[derive(Debug, Clone, Default)]
pub struct FsHomedirService {
    home: Option<PathBuf>,
}

impl FsHomedirService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Root files at `home` instead of the detected home directory.
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self {
            home: Some(home.into()),
        }
    }

    fn path(&self, name: &str) -> io::Result<PathBuf> {
        let home = match &self.home {
            Some(home) => home.clone(),
            None => directories::BaseDirs::new()
                .map(|dirs| dirs.home_dir().to_path_buf())
                .ok_or_else(|| {
                    io::Error::new(io::ErrorKind::NotFound, "could not determine home directory")
                })?,
        };
        Ok(home.join(name))
    }
}

impl HomedirService for FsHomedirService {
    fn write(&self, content: &[u8], name: &str) -> io::Result<()> {
        let path = self.path(name)?;
        debug!(path = %path.display(), "Writing home file");
        fs::write(&path, content)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    fn exists(&self, name: &str) -> io::Result<bool> {
        self.path(name)?.try_exists()
    }

    fn read(&self, name: &str) -> io::Result<String> {
        fs::read_to_string(self.path(name)?)
    }

    fn delete(&self, name: &str) -> io::Result<()> {
        let path = self.path(name)?;
        debug!(path = %path.display(), "Deleting home file");
        fs::remove_file(path)
    }
}
