//! Storage adapter for the content root.
//!
//! Everything the site reads or writes goes through the [`Storage`] trait:
//! listing markdown files, reading `categories.json`, reading original images
//! and persisting derived thumbnails. The repository and cache never touch
//! `std::fs` directly, so the backing store can be swapped (object storage,
//! an in-memory tree for tests) without touching their logic.
//!
//! ## Paths
//!
//! Paths are relative to the storage root and `/`-separated (`images/a.png`).
//! Absolute paths and `..` components are rejected with
//! [`StorageError::InvalidPath`] before any I/O happens. Request input such as
//! image names flows into these paths, so the check lives here rather than in
//! every caller.
//!
//! ## Implementations
//!
//! | Type | Backing store |
//! |---|---|
//! | [`LocalStorage`] | A directory on the local filesystem |
//! | [`MemoryStorage`] | A `BTreeMap` behind a mutex |

use std::collections::BTreeMap;
use std::io::{self, Cursor, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid storage path: {0}")]
    InvalidPath(String),
}

/// Narrow file-store interface used by the content repository and the
/// thumbnail cache.
pub trait Storage: Send + Sync {
    /// Storage-relative paths of the regular files directly inside `dir`,
    /// sorted. An empty `dir` means the storage root.
    fn list(&self, dir: &str) -> Result<Vec<String>, StorageError>;

    /// Open a file for reading.
    fn open_read(&self, path: &str) -> Result<Box<dyn Read + Send>, StorageError>;

    /// Persist a whole file, replacing any previous content.
    fn write(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Whether a regular file exists at `path`. Invalid paths never exist.
    fn exists(&self, path: &str) -> bool;

    /// Read a whole file into memory.
    fn read_bytes(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.open_read(path)?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Read a whole file as UTF-8.
    fn read_string(&self, path: &str) -> Result<String, StorageError> {
        let bytes = self.read_bytes(path)?;
        String::from_utf8(bytes)
            .map_err(|e| StorageError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
    }
}

/// Validate a storage-relative path and return its normalized `/`-joined form.
///
/// Empty segments and `.` are dropped; `..`, roots and drive prefixes are
/// rejected.
pub fn normalize_path(path: &str) -> Result<String, StorageError> {
    let mut parts = Vec::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => {
                let part = part
                    .to_str()
                    .ok_or_else(|| StorageError::InvalidPath(path.to_string()))?;
                parts.push(part);
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(StorageError::InvalidPath(path.to_string()));
            }
        }
    }
    Ok(parts.join("/"))
}

/// Join a directory and a file name into a storage path.
pub fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir.trim_end_matches('/'), name)
    }
}

// ============================================================================
// LocalStorage
// ============================================================================

/// Storage rooted at a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

/// Distinguishes temp files of concurrent writers within one process.
static WRITE_COUNTER: AtomicU64 = AtomicU64::new(0);

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let normalized = normalize_path(path)?;
        if normalized.is_empty() {
            return Ok(self.root.clone());
        }
        Ok(self.root.join(normalized))
    }
}

fn not_found_or_io(err: io::Error, path: &str) -> StorageError {
    if err.kind() == io::ErrorKind::NotFound {
        StorageError::NotFound(path.to_string())
    } else {
        StorageError::Io(err)
    }
}

impl Storage for LocalStorage {
    fn list(&self, dir: &str) -> Result<Vec<String>, StorageError> {
        let full = self.resolve(dir)?;
        if !full.is_dir() {
            return Err(StorageError::NotFound(dir.to_string()));
        }
        let prefix = normalize_path(dir)?;
        let mut files = Vec::new();
        for entry in WalkDir::new(&full).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| StorageError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                files.push(join(&prefix, name));
            }
        }
        files.sort();
        Ok(files)
    }

    fn open_read(&self, path: &str) -> Result<Box<dyn Read + Send>, StorageError> {
        let full = self.resolve(path)?;
        if full.is_dir() {
            return Err(StorageError::NotFound(path.to_string()));
        }
        let file = std::fs::File::open(&full).map_err(|e| not_found_or_io(e, path))?;
        Ok(Box::new(io::BufReader::new(file)))
    }

    /// Writes to a temporary sibling and renames it into place, so readers
    /// never observe a partial file and racing writers of identical bytes
    /// leave the same result behind.
    fn write(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let full = self.resolve(path)?;
        let file_name = full
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StorageError::InvalidPath(path.to_string()))?;
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = full.with_file_name(format!(
            ".{}.{}.{}.tmp",
            file_name,
            std::process::id(),
            WRITE_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::write(&tmp, bytes)?;
        if let Err(e) = std::fs::rename(&tmp, &full) {
            let _ = std::fs::remove_file(&tmp);
            return Err(StorageError::Io(e));
        }
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).map(|p| p.is_file()).unwrap_or(false)
    }
}

// ============================================================================
// MemoryStorage
// ============================================================================

/// In-process storage keyed by normalized path.
///
/// Directories are implicit: a file `images/a.png` makes `images` listable.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, convenient for seeding fixtures.
    pub fn with_file(self, path: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(path, bytes);
        self
    }

    /// Insert or replace a file. Invalid paths are ignored.
    pub fn insert(&self, path: &str, bytes: impl Into<Vec<u8>>) {
        if let Ok(key) = normalize_path(path) {
            self.lock().insert(key, bytes.into());
        }
    }

    /// Remove a file, returning whether it existed.
    pub fn remove(&self, path: &str) -> bool {
        match normalize_path(path) {
            Ok(key) => self.lock().remove(&key).is_some(),
            Err(_) => false,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        // A panicking writer cannot leave a half-inserted entry behind, so a
        // poisoned map is still consistent.
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Storage for MemoryStorage {
    fn list(&self, dir: &str) -> Result<Vec<String>, StorageError> {
        let prefix = normalize_path(dir)?;
        let files = self.lock();
        let mut found_dir = prefix.is_empty();
        let mut out = Vec::new();
        for key in files.keys() {
            let rest = if prefix.is_empty() {
                Some(key.as_str())
            } else {
                key.strip_prefix(&prefix).and_then(|r| r.strip_prefix('/'))
            };
            if let Some(rest) = rest {
                found_dir = true;
                if !rest.contains('/') {
                    out.push(key.clone());
                }
            }
        }
        if !found_dir {
            return Err(StorageError::NotFound(dir.to_string()));
        }
        Ok(out)
    }

    fn open_read(&self, path: &str) -> Result<Box<dyn Read + Send>, StorageError> {
        let key = normalize_path(path)?;
        let bytes = self
            .lock()
            .get(&key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_string()))?;
        Ok(Box::new(Cursor::new(bytes)))
    }

    fn write(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let key = normalize_path(path)?;
        if key.is_empty() {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        self.lock().insert(key, bytes.to_vec());
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        match normalize_path(path) {
            Ok(key) => self.lock().contains_key(&key),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    // =========================================================================
    // Path handling
    // =========================================================================

    #[test]
    fn normalize_keeps_relative_paths() {
        assert_eq!(normalize_path("images/a.png").unwrap(), "images/a.png");
        assert_eq!(normalize_path("./images//a.png").unwrap(), "images/a.png");
        assert_eq!(normalize_path("").unwrap(), "");
    }

    #[test]
    fn normalize_rejects_parent_components() {
        assert!(matches!(
            normalize_path("../secret"),
            Err(StorageError::InvalidPath(_))
        ));
        assert!(matches!(
            normalize_path("images/../../etc/passwd"),
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[test]
    fn normalize_rejects_absolute_paths() {
        assert!(matches!(
            normalize_path("/etc/passwd"),
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[test]
    fn join_handles_root() {
        assert_eq!(join("", "a.md"), "a.md");
        assert_eq!(join("images", "a.png"), "images/a.png");
        assert_eq!(join("images/", "a.png"), "images/a.png");
    }

    // =========================================================================
    // LocalStorage
    // =========================================================================

    #[test]
    fn local_list_returns_sorted_files_only() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("b.md"), "b").unwrap();
        fs::write(tmp.path().join("a.md"), "a").unwrap();
        fs::create_dir_all(tmp.path().join("images")).unwrap();
        fs::write(tmp.path().join("images/x.png"), "x").unwrap();

        let storage = LocalStorage::new(tmp.path());
        assert_eq!(storage.list("").unwrap(), vec!["a.md", "b.md"]);
        assert_eq!(storage.list("images").unwrap(), vec!["images/x.png"]);
    }

    #[test]
    fn local_list_missing_dir_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        assert!(matches!(
            storage.list("nope"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn local_read_missing_file_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        assert!(matches!(
            storage.read_bytes("missing.md"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn local_write_creates_parents_and_replaces() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        storage.write("images/100-0-a.png", b"first").unwrap();
        storage.write("images/100-0-a.png", b"second").unwrap();

        assert_eq!(storage.read_bytes("images/100-0-a.png").unwrap(), b"second");
        // No temp files left behind
        assert_eq!(storage.list("images").unwrap(), vec!["images/100-0-a.png"]);
    }

    #[test]
    fn local_exists_rejects_escapes() {
        let tmp = TempDir::new().unwrap();
        let inner = tmp.path().join("content");
        fs::create_dir_all(&inner).unwrap();
        fs::write(tmp.path().join("outside.txt"), "secret").unwrap();

        let storage = LocalStorage::new(&inner);
        assert!(!storage.exists("../outside.txt"));
        assert!(matches!(
            storage.read_bytes("../outside.txt"),
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[test]
    fn local_exists_false_for_directories() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("images")).unwrap();
        let storage = LocalStorage::new(tmp.path());
        assert!(!storage.exists("images"));
    }

    // =========================================================================
    // MemoryStorage
    // =========================================================================

    #[test]
    fn memory_list_is_non_recursive() {
        let storage = MemoryStorage::new()
            .with_file("a.md", "a")
            .with_file("images/x.png", "x")
            .with_file("images/thumbs/y.png", "y");

        assert_eq!(storage.list("").unwrap(), vec!["a.md"]);
        assert_eq!(storage.list("images").unwrap(), vec!["images/x.png"]);
    }

    #[test]
    fn memory_list_unknown_dir_is_not_found() {
        let storage = MemoryStorage::new().with_file("a.md", "a");
        assert!(matches!(
            storage.list("images"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn memory_roundtrip_and_remove() {
        let storage = MemoryStorage::new();
        storage.write("categories.json", b"{}").unwrap();
        assert!(storage.exists("categories.json"));
        assert_eq!(storage.read_string("categories.json").unwrap(), "{}");

        assert!(storage.remove("categories.json"));
        assert!(!storage.exists("categories.json"));
    }

    #[test]
    fn read_string_rejects_invalid_utf8() {
        let storage = MemoryStorage::new().with_file("bad.md", vec![0xff, 0xfe]);
        assert!(matches!(
            storage.read_string("bad.md"),
            Err(StorageError::Io(_))
        ));
    }
}
