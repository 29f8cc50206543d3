//! Abstractions for filesystem access to enable testing and mocking.
//!
//! The `FileSystem` trait lets the collector read the real `/proc` filesystem
//! on Linux or an in-memory mock in tests on any platform.

use std::io;
use std::path::{Path, PathBuf};

/// Abstraction for filesystem operations.
///
/// Every collection call goes through this trait, so implementations must be
/// safe to share between concurrent callers.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a string.
    ///
    /// # Arguments
    /// * `path` - Path to the file to read
    ///
    /// # Returns
    /// The file contents as a string, or an I/O error if the file cannot be read
    /// or is not valid UTF-8.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Reads the entire contents of a file as raw bytes.
    ///
    /// Used for reports that may embed arbitrary bytes, such as the command
    /// name in `/proc/[pid]/stat`.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Lists entries in a directory.
    ///
    /// # Arguments
    /// * `path` - Path to the directory
    ///
    /// # Returns
    /// A vector of paths to entries in the directory, or an I/O error.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
}

/// Real filesystem implementation that delegates to `std::fs`.
///
/// Use this in production to read from the actual `/proc` filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    /// Creates a new `RealFs` instance.
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        // std::fs::ReadDir pulls entries from the kernel in bounded batches.
        let entries = std::fs::read_dir(path)?;
        let mut paths = Vec::new();
        for entry in entries {
            paths.push(entry?.path());
        }
        Ok(paths)
    }
}
