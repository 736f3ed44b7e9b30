use crate::homedir::HomedirService;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::sync::Arc;

/// In-memory `HomedirService`. Clones share the same files.
#[derive(Debug, Clone, Default)]
pub struct HomedirServiceMock {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    fail_writes: bool,
}

impl HomedirServiceMock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `write` fail with `PermissionDenied`.
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Raw bytes of `name`, if present.
    pub fn content(&self, name: &str) -> Option<Vec<u8>> {
        self.files.lock().get(name).cloned()
    }

    pub fn file_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.files.lock().keys().cloned().collect();
        names.sort();
        names
    }
}

impl HomedirService for HomedirServiceMock {
    fn write(&self, content: &[u8], name: &str) -> io::Result<()> {
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "write refused by mock"));
        }
        self.files.lock().insert(name.to_string(), content.to_vec());
        Ok(())
    }

    fn exists(&self, name: &str) -> io::Result<bool> {
        Ok(self.files.lock().contains_key(name))
    }

    fn read(&self, name: &str) -> io::Result<String> {
        let files = self.files.lock();
        let content = files
            .get(name)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{} not found", name)))?;
        String::from_utf8(content.clone()).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn delete(&self, name: &str) -> io::Result<()> {
        self.files
            .lock()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{} not found", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_read_exists_delete() {
        let hds = HomedirServiceMock::new();
        assert!(!hds.exists(".token").unwrap());
        hds.write(b"abc", ".token").unwrap();
        assert!(hds.exists(".token").unwrap());
        assert_eq!(hds.read(".token").unwrap(), "abc");
        hds.delete(".token").unwrap();
        assert!(!hds.exists(".token").unwrap());
        assert_eq!(hds.delete(".token").unwrap_err().kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_instances_are_isolated() {
        let first = HomedirServiceMock::new();
        let second = HomedirServiceMock::new();
        first.write(b"abc", ".token").unwrap();
        assert!(!second.exists(".token").unwrap());
        assert_eq!(first.clone().content(".token"), Some(b"abc".to_vec()));
    }

    #[test]
    fn test_failing_writes() {
        let hds = HomedirServiceMock::new().failing_writes();
        assert!(hds.write(b"abc", ".token").is_err());
        assert!(hds.file_names().is_empty());
    }
}
