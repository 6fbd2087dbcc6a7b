// Byte-level file store.
// Synchronous read, write, delete, and listing primitives with structured errors.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{CacheError, Result};

/// Read the full contents of a file.
///
/// A missing file is reported as [`CacheError::NotFound`], every other failure as
/// [`CacheError::Io`].
pub fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => CacheError::NotFound(path.to_path_buf()),
        _ => CacheError::io(path, e),
    })
}

/// Write `bytes` to `path`, creating parent directories as needed.
///
/// The data goes to a uniquely named temp file in the same directory which is then
/// renamed over `path`, so readers never observe a partial file and concurrent
/// writers never share a temp file.
pub fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = ensure_parent(path)?;

    let mut file = NamedTempFile::new_in(&parent).map_err(|e| CacheError::io(&parent, e))?;
    file.write_all(bytes).map_err(|e| CacheError::io(file.path(), e))?;
    file.as_file()
        .sync_all()
        .map_err(|e| CacheError::io(file.path(), e))?;
    file.persist(path).map_err(|e| CacheError::io(path, e.error))?;

    Ok(())
}

/// Create the parent directory of `path` if it does not exist yet.
///
/// A directory created concurrently by another writer counts as success.
pub fn ensure_parent(path: &Path) -> Result<PathBuf> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    ensure_dir(&parent)?;
    Ok(parent)
}

/// Create `dir` and any missing ancestors.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    match fs::create_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        Err(e) => Err(CacheError::io(dir, e)),
    }
}

/// Atomically move `from` over `to`, replacing any existing file.
pub fn replace(from: &Path, to: &Path) -> Result<()> {
    ensure_parent(to)?;
    fs::rename(from, to).map_err(|e| CacheError::io(to, e))
}

/// Check if a file exists.
pub fn exists(path: &Path) -> bool {
    path.is_file()
}

/// Delete a file. Deleting a missing file is not an error.
pub fn delete(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CacheError::io(path, e)),
    }
}

/// Delete a directory and all contents. Deleting a missing directory is not an error.
pub fn delete_dir(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CacheError::io(path, e)),
    }
}

/// Lazily list the entries of a directory.
///
/// A missing directory yields nothing. Entries that cannot be read are logged and
/// skipped. Each call re-reads the directory, so the listing reflects its contents at
/// the time it is consumed.
pub fn list_entries(dir: &Path) -> impl Iterator<Item = fs::DirEntry> + use<> {
    let read_dir = match fs::read_dir(dir) {
        Ok(read_dir) => Some(read_dir),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => {
            tracing::warn!(path = %dir.display(), error = %e, "Failed to list cache directory");
            None
        }
    };
    let dir = dir.to_path_buf();

    read_dir.into_iter().flatten().filter_map(move |entry| match entry {
        Ok(entry) => Some(entry),
        Err(e) => {
            tracing::warn!(path = %dir.display(), error = %e, "Skipping unreadable directory entry");
            None
        }
    })
}
