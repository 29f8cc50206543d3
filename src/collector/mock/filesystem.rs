//! In-memory mock filesystem for testing collectors without real `/proc`.
//!
//! This module provides `MockFs` which simulates a filesystem in memory,
//! allowing tests to run on macOS and in CI environments without Linux.

use crate::collector::traits::FileSystem;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

/// In-memory filesystem for testing.
///
/// Stores files and directories in memory, allowing tests to simulate
/// various `/proc/self` states without needing actual Linux access.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    /// Map from path to file contents.
    files: HashMap<PathBuf, Vec<u8>>,
    /// Set of directories (for read_dir support).
    directories: HashSet<PathBuf>,
}

impl MockFs {
    /// Creates a new empty mock filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file with the given content.
    ///
    /// Parent directories are automatically created.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.files.insert(path, content.into());
    }

    /// Adds an empty directory.
    pub fn add_dir(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.directories.insert(path);
    }

    /// Removes a file, simulating a report the kernel does not expose.
    pub fn remove_file(&mut self, path: impl AsRef<Path>) {
        self.files.remove(path.as_ref());
    }

    fn add_parents(&mut self, path: &Path) {
        let mut parent = path.parent();
        while let Some(p) = parent {
            if !p.as_os_str().is_empty() {
                self.directories.insert(p.to_path_buf());
            }
            parent = p.parent();
        }
    }

    /// Adds the reports of the current process under `/proc/self/`.
    ///
    /// # Arguments
    /// * `stat` - Content of `/proc/self/stat`
    /// * `smaps` - Content of `/proc/self/smaps`
    /// * `io` - Content of `/proc/self/io` (skipped if empty, as without I/O accounting)
    /// * `limits` - Content of `/proc/self/limits`
    /// * `open_fds` - Number of entries to create under `/proc/self/fd`
    pub fn add_self(&mut self, stat: &str, smaps: &str, io: &str, limits: &str, open_fds: u32) {
        let base = PathBuf::from("/proc/self");
        self.add_dir(&base);
        self.add_file(base.join("stat"), stat);
        self.add_file(base.join("smaps"), smaps);
        if !io.is_empty() {
            self.add_file(base.join("io"), io);
        }
        self.add_file(base.join("limits"), limits);

        let fd_dir = base.join("fd");
        self.add_dir(&fd_dir);
        for fd in 0..open_fds {
            self.add_file(fd_dir.join(fd.to_string()), "");
        }
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {:?}", path),
            )
        })
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        if !self.directories.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("directory not found: {:?}", path),
            ));
        }

        let mut entries = HashSet::new();

        // Find all files and directories that are direct children
        for file_path in self.files.keys() {
            if file_path.parent().is_some_and(|parent| parent == path) {
                entries.insert(file_path.clone());
            }
        }

        for dir_path in &self.directories {
            if dir_path.parent().is_some_and(|parent| parent == path) && dir_path != path {
                entries.insert(dir_path.clone());
            }
        }

        Ok(entries.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_fs_add_file() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/self/io", "rchar: 1\n");

        assert_eq!(
            fs.read_dir(Path::new("/proc")).unwrap(),
            vec![PathBuf::from("/proc/self")]
        );
        assert!(fs.read_dir(Path::new("/proc/self")).is_ok());

        let content = fs.read_to_string(Path::new("/proc/self/io")).unwrap();
        assert_eq!(content, "rchar: 1\n");
    }

    #[test]
    fn test_mock_fs_read_dir() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/self/fd/0", "");
        fs.add_file("/proc/self/fd/1", "");
        fs.add_file("/proc/self/stat", "stat content");

        let self_entries = fs.read_dir(Path::new("/proc/self")).unwrap();
        assert_eq!(self_entries.len(), 2); // fd and stat

        let fd_entries = fs.read_dir(Path::new("/proc/self/fd")).unwrap();
        assert_eq!(fd_entries.len(), 2);
    }

    #[test]
    fn test_mock_fs_add_self() {
        let mut fs = MockFs::new();
        fs.add_self("stat", "smaps", "", "limits", 3);

        assert!(fs.read(Path::new("/proc/self/stat")).is_ok());
        assert!(fs.read(Path::new("/proc/self/smaps")).is_ok());
        assert!(fs.read(Path::new("/proc/self/io")).is_err());
        assert!(fs.read(Path::new("/proc/self/limits")).is_ok());
        assert_eq!(fs.read_dir(Path::new("/proc/self/fd")).unwrap().len(), 3);
    }

    #[test]
    fn test_mock_fs_non_utf8() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/self/stat", b"1 (\xff) S".to_vec());

        let err = fs.read_to_string(Path::new("/proc/self/stat")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert_eq!(fs.read(Path::new("/proc/self/stat")).unwrap().len(), 7);
    }

    #[test]
    fn test_mock_fs_not_found() {
        let fs = MockFs::new();
        let result = fs.read_to_string(Path::new("/nonexistent"));
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }
}
