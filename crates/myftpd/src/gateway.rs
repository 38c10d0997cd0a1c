//! Filesystem capability used by command handlers.
//!
//! Handlers resolve every argument against the session's working directory
//! and pass absolute paths to the gateway. The gateway performs no access
//! control and imposes no locking between sessions.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// One directory entry as reported by [`FilesystemGateway::list_entries`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// File name, lossily converted to UTF-8.
    pub name: String,
    /// Whether the entry is a directory (symlinks are followed).
    pub is_dir: bool,
}

impl DirEntry {
    /// Builds an entry.
    pub fn new(name: impl Into<String>, is_dir: bool) -> Self {
        Self {
            name: name.into(),
            is_dir,
        }
    }
}

/// Operations the session engine performs on the served filesystem.
pub trait FilesystemGateway: Send + Sync {
    /// Returns `true` when something exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Creates a single directory.
    ///
    /// # Errors
    ///
    /// Propagates the OS error.
    fn mkdir(&self, path: &Path) -> io::Result<()>;

    /// Removes a file. Directories are refused with
    /// [`io::ErrorKind::IsADirectory`].
    ///
    /// # Errors
    ///
    /// Propagates the OS error.
    fn remove(&self, path: &Path) -> io::Result<()>;

    /// Validates `path` as a directory and returns its canonical form.
    ///
    /// # Errors
    ///
    /// Fails with [`io::ErrorKind::NotADirectory`] when the path names a file.
    fn chdir(&self, path: &Path) -> io::Result<PathBuf>;

    /// Lists the entries of a directory, sorted by name.
    ///
    /// # Errors
    ///
    /// Propagates the OS error.
    fn list_entries(&self, path: &Path) -> io::Result<Vec<DirEntry>>;

    /// Directory new sessions start in.
    fn cwd(&self) -> PathBuf;

    /// Opens a file for streaming to the client.
    ///
    /// # Errors
    ///
    /// Fails with [`io::ErrorKind::IsADirectory`] for directories.
    fn open_read_stream(&self, path: &Path) -> io::Result<Box<dyn Read + Send>>;

    /// Creates or truncates a file for an upload.
    ///
    /// # Errors
    ///
    /// Propagates the OS error.
    fn create_write_stream(&self, path: &Path) -> io::Result<Box<dyn Write + Send>>;
}

/// Gateway backed by the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalFilesystem {
    root: PathBuf,
}

impl LocalFilesystem {
    /// Serves `root`, which should already be canonical.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FilesystemGateway for LocalFilesystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn mkdir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir(path)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        if fs::metadata(path)?.is_dir() {
            return Err(io::Error::from(io::ErrorKind::IsADirectory));
        }
        fs::remove_file(path)
    }

    fn chdir(&self, path: &Path) -> io::Result<PathBuf> {
        let canonical = fs::canonicalize(path)?;
        if !canonical.is_dir() {
            return Err(io::Error::from(io::ErrorKind::NotADirectory));
        }
        Ok(canonical)
    }

    fn list_entries(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = fs::read_dir(path)?
            .map(|entry| {
                entry.map(|entry| {
                    DirEntry::new(
                        entry.file_name().to_string_lossy(),
                        entry.path().is_dir(),
                    )
                })
            })
            .collect::<io::Result<Vec<_>>>()?;
        entries.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(entries)
    }

    fn cwd(&self) -> PathBuf {
        self.root.clone()
    }

    fn open_read_stream(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        if fs::metadata(path)?.is_dir() {
            return Err(io::Error::from(io::ErrorKind::IsADirectory));
        }
        Ok(Box::new(File::open(path)?))
    }

    fn create_write_stream(&self, path: &Path) -> io::Result<Box<dyn Write + Send>> {
        Ok(Box::new(File::create(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn served() -> (TempDir, LocalFilesystem) {
        let dir = TempDir::new().expect("temp dir");
        let root = fs::canonicalize(dir.path()).expect("canonical root");
        (dir, LocalFilesystem::new(root))
    }

    #[rstest]
    fn remove_refuses_directories(served: (TempDir, LocalFilesystem)) {
        let (dir, gateway) = served;
        let target = dir.path().join("nested");
        fs::create_dir(&target).expect("create dir");
        let error = gateway.remove(&target).expect_err("directory removal refused");
        assert_eq!(error.kind(), io::ErrorKind::IsADirectory);
        assert!(target.is_dir());
    }

    #[rstest]
    fn chdir_rejects_files(served: (TempDir, LocalFilesystem)) {
        let (dir, gateway) = served;
        let file = dir.path().join("notes.txt");
        fs::write(&file, b"hello").expect("write file");
        let error = gateway.chdir(&file).expect_err("file is not a directory");
        assert_eq!(error.kind(), io::ErrorKind::NotADirectory);
    }

    #[rstest]
    fn chdir_canonicalises_relative_components(served: (TempDir, LocalFilesystem)) {
        let (dir, gateway) = served;
        fs::create_dir(dir.path().join("a")).expect("create dir");
        let resolved = gateway
            .chdir(&gateway.cwd().join("a").join(".."))
            .expect("resolve parent");
        assert_eq!(resolved, gateway.cwd());
    }

    #[rstest]
    fn lists_entries_sorted_with_kinds(served: (TempDir, LocalFilesystem)) {
        let (dir, gateway) = served;
        fs::write(dir.path().join("b.txt"), b"").expect("write file");
        fs::create_dir(dir.path().join("a")).expect("create dir");
        let entries = gateway.list_entries(&gateway.cwd()).expect("list entries");
        assert_eq!(
            entries,
            vec![DirEntry::new("a", true), DirEntry::new("b.txt", false)]
        );
    }

    #[rstest]
    fn open_read_stream_refuses_directories(served: (TempDir, LocalFilesystem)) {
        let (_dir, gateway) = served;
        let error = gateway
            .open_read_stream(&gateway.cwd())
            .err()
            .expect("directory cannot be streamed");
        assert_eq!(error.kind(), io::ErrorKind::IsADirectory);
    }

    #[rstest]
    fn write_stream_round_trips_through_read_stream(served: (TempDir, LocalFilesystem)) {
        let (_dir, gateway) = served;
        let path = gateway.cwd().join("data.bin");
        {
            let mut sink = gateway.create_write_stream(&path).expect("create file");
            sink.write_all(&[0, 1, 2, 255]).expect("write bytes");
        }
        let mut content = Vec::new();
        gateway
            .open_read_stream(&path)
            .expect("open file")
            .read_to_end(&mut content)
            .expect("read bytes");
        assert_eq!(content, [0, 1, 2, 255]);
    }
}
