//! Byte-oriented persistence media backing the journal.
//!
//! A medium may become unavailable at any call (flash worn out, card
//! removed, filesystem full). The journal treats every error from a medium
//! as a soft failure and falls back to memory-only operation.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::error::{Error, Result};

/// Append/read/truncate access to a single named resource.
pub trait PersistenceMedium: Send {
    /// Append raw bytes at the end of the resource.
    fn append(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Read the whole resource. A resource that does not exist yet reads
    /// as empty.
    fn read_all(&mut self) -> io::Result<Vec<u8>>;

    /// Remove every byte from the resource.
    fn truncate(&mut self) -> io::Result<()>;

    /// Short description used in log messages.
    fn describe(&self) -> String;
}

/// A journal file on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileMedium {
    path: PathBuf,
}

impl FileMedium {
    /// Use the file at `path`, creating parent directories if needed.
    ///
    /// The file itself is created lazily on the first append.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        debug!("Using journal file {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Path of the journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PersistenceMedium for FileMedium {
    fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(bytes)?;
        file.flush()
    }

    fn read_all(&mut self) -> io::Result<Vec<u8>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    fn truncate(&mut self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    bytes: Vec<u8>,
    unavailable: bool,
}

/// In-memory medium with failure injection.
///
/// Clones share the same buffer, so a test can hand one clone to the
/// journal and inspect or sabotage it through another.
///
/// # Example
///
/// ```
/// use vitals_store::{MemoryMedium, PersistenceMedium};
///
/// let mut medium = MemoryMedium::new();
/// let observer = medium.clone();
///
/// medium.append(b"line\n").unwrap();
/// assert_eq!(observer.contents(), "line\n");
///
/// observer.set_unavailable(true);
/// assert!(medium.append(b"more\n").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryMedium {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryMedium {
    /// Create an empty, available medium.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a medium pre-filled with `contents`.
    pub fn with_contents(contents: &str) -> Self {
        let medium = Self::new();
        medium.lock().bytes = contents.as_bytes().to_vec();
        medium
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Current contents as text.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.lock().bytes).into_owned()
    }

    /// Number of non-empty lines currently stored.
    pub fn line_count(&self) -> usize {
        self.contents()
            .lines()
            .filter(|l| !l.trim().is_empty())
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check(state: &MemoryState) -> io::Result<()> {
        if state.unavailable {
            Err(io::Error::other("memory medium marked unavailable"))
        } else {
            Ok(())
        }
    }
}

impl PersistenceMedium for MemoryMedium {
    fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut state = self.lock();
        Self::check(&state)?;
        state.bytes.extend_from_slice(bytes);
        Ok(())
    }

    fn read_all(&mut self) -> io::Result<Vec<u8>> {
        let state = self.lock();
        Self::check(&state)?;
        Ok(state.bytes.clone())
    }

    fn truncate(&mut self) -> io::Result<()> {
        let mut state = self.lock();
        Self::check(&state)?;
        state.bytes.clear();
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_medium_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut medium = FileMedium::open(dir.path().join("journal.jsonl")).unwrap();
        assert!(medium.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_file_medium_append_and_truncate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");
        let mut medium = FileMedium::open(&path).unwrap();

        medium.append(b"a\n").unwrap();
        medium.append(b"b\n").unwrap();
        assert_eq!(medium.read_all().unwrap(), b"a\nb\n");

        medium.truncate().unwrap();
        assert!(!path.exists());
        // Truncating twice is fine.
        medium.truncate().unwrap();
    }

    #[test]
    fn test_file_medium_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("j.jsonl");
        let mut medium = FileMedium::open(&path).unwrap();
        medium.append(b"x\n").unwrap();
        assert!(path.exists());
        assert_eq!(medium.path(), path.as_path());
    }

    #[test]
    fn test_file_medium_reports_unusable_parent() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, b"").unwrap();

        let err = FileMedium::open(blocker.join("sub").join("j.jsonl")).unwrap_err();
        match err {
            Error::CreateDirectory { path, .. } => assert_eq!(path, blocker.join("sub")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_memory_medium_failure_injection() {
        let mut medium = MemoryMedium::with_contents("seed\n");
        medium.set_unavailable(true);
        assert!(medium.read_all().is_err());
        assert!(medium.truncate().is_err());

        medium.set_unavailable(false);
        assert_eq!(medium.line_count(), 1);
        medium.truncate().unwrap();
        assert_eq!(medium.line_count(), 0);
    }
}
