//! Where diskstats text comes from.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Default location of the kernel disk statistics table.
pub const PROC_DISKSTATS: &str = "/proc/diskstats";

/// A line-oriented stats table, read from the beginning on every call.
pub trait StatsSource {
    /// Read the whole table.
    fn read(&self) -> io::Result<String>;

    /// Human-readable location, for logs and errors.
    fn location(&self) -> String;
}

/// Reads a file (normally `/proc/diskstats`) fresh on every call.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileSource {
    fn default() -> Self {
        Self::new(PROC_DISKSTATS)
    }
}

impl StatsSource for FileSource {
    fn read(&self) -> io::Result<String> {
        std::fs::read_to_string(&self.path)
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory table whose contents can be swapped between reads.
///
/// Clones share contents and the read counter.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    contents: Arc<Mutex<String>>,
    reads: Arc<AtomicUsize>,
}

impl MemorySource {
    pub fn new(contents: impl Into<String>) -> Self {
        Self {
            contents: Arc::new(Mutex::new(contents.into())),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Replace the table returned by subsequent reads.
    pub fn set(&self, contents: impl Into<String>) {
        *self.contents.lock().unwrap_or_else(PoisonError::into_inner) = contents.into();
    }

    /// Number of reads performed so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }
}

impl StatsSource for MemorySource {
    fn read(&self) -> io::Result<String> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .contents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
