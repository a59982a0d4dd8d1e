use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Filesystem access used by discovery, conversion and manifest handling.
///
/// Everything that touches the disk goes through this trait so the whole
/// pipeline can run against [`MemoryFileSystem`] in tests.
pub trait FileSystem: Send + Sync {
    /// List the direct children of a directory, files and subdirectories alike.
    fn list_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;
    fn remove_file(&self, path: &Path) -> io::Result<()>;
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
}

/// Production implementation backed by `std::fs`.
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn list_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            entries.push(entry?.path());
        }
        Ok(entries)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        std::fs::write(path, bytes)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }
}

/// Deterministic in-memory filesystem for tests.
///
/// Directories must exist before files can be written into them, listing
/// order is sorted, and individual paths can be primed to fail removal or
/// writing to simulate permission errors.
#[derive(Default)]
pub struct MemoryFileSystem {
    inner: Mutex<MemInner>,
}

#[derive(Default)]
struct MemInner {
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
    deny_remove: BTreeSet<PathBuf>,
    deny_write: BTreeSet<PathBuf>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory along with all its ancestors.
    pub fn add_dir(&self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        let mut inner = self.inner.lock().unwrap();
        let mut current = dir.as_path();
        loop {
            inner.dirs.insert(current.to_path_buf());
            match current.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => current = parent,
                _ => break,
            }
        }
    }

    /// Create a file, implicitly creating its parent directories.
    pub fn add_file(&self, path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                self.add_dir(parent);
            }
        }
        self.inner.lock().unwrap().files.insert(path, bytes.into());
    }

    /// Make subsequent `remove_file` calls on `path` fail with PermissionDenied.
    pub fn deny_remove(&self, path: impl Into<PathBuf>) {
        self.inner.lock().unwrap().deny_remove.insert(path.into());
    }

    /// Make subsequent `write` calls on `path` fail with PermissionDenied.
    pub fn deny_write(&self, path: impl Into<PathBuf>) {
        self.inner.lock().unwrap().deny_write.insert(path.into());
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.inner
            .lock()
            .unwrap()
            .files
            .contains_key(path.as_ref())
    }

    pub fn file(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.inner.lock().unwrap().files.get(path.as_ref()).cloned()
    }
}

impl FileSystem for MemoryFileSystem {
    fn list_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let inner = self.inner.lock().unwrap();
        if !inner.dirs.contains(dir) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such directory: {}", dir.display()),
            ));
        }
        let mut entries: Vec<PathBuf> = inner
            .files
            .keys()
            .chain(inner.dirs.iter())
            .filter(|path| path.parent() == Some(dir))
            .cloned()
            .collect();
        entries.sort();
        entries.dedup();
        Ok(entries)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.inner
            .lock()
            .unwrap()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no such file: {}", path.display()),
                )
            })
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.deny_write.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("write denied: {}", path.display()),
            ));
        }
        match path.parent() {
            Some(parent) if inner.dirs.contains(parent) => {
                inner.files.insert(path.to_path_buf(), bytes.to_vec());
                Ok(())
            }
            _ => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no parent directory for: {}", path.display()),
            )),
        }
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.deny_remove.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("remove denied: {}", path.display()),
            ));
        }
        if inner.files.remove(path).is_some() {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", path.display()),
            ))
        }
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        match inner.files.remove(from) {
            Some(bytes) => {
                inner.files.insert(to.to_path_buf(), bytes);
                Ok(())
            }
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", from.display()),
            )),
        }
    }
}
