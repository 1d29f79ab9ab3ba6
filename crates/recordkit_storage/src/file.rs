//! File-based storage backend for persistent storage.
//!
//! Layout of a storage directory:
//!
//! ```text
//! <dir>/
//! ├─ LOCK              # Advisory lock for single-writer
//! ├─ <key>.rec         # One file per record
//! └─ <key>.rec.tmp     # Transient, during atomic writes
//! ```

use crate::backend::{validate_key, StorageBackend};
use crate::error::{StorageError, StorageResult};
use fs2::FileExt;
use parking_lot::RwLock;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const RECORD_EXT: &str = "rec";
const TEMP_SUFFIX: &str = ".tmp";

/// A file-based storage backend.
///
/// Each key is stored in its own file inside a directory. The directory is
/// held with an exclusive advisory lock for the lifetime of the backend, so
/// only one process writes to it at a time.
///
/// # Durability
///
/// Writes go to a temporary file that is synced and then renamed over the
/// record file, so a crash leaves either the old or the new bytes.
///
/// # Thread Safety
///
/// This backend is thread-safe and can be shared across threads.
/// Internal locking serializes writers.
///
/// # Example
///
/// ```no_run
/// use recordkit_storage::{StorageBackend, FileBackend};
/// use std::path::Path;
///
/// let backend = FileBackend::open(Path::new("records")).unwrap();
/// backend.insert("alice", b"persistent data").unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    /// Serializes writers within this process.
    guard: RwLock<()>,
    /// Lock file handle (held for exclusive access).
    _lock_file: File,
}

impl FileBackend {
    /// Opens or creates a storage directory.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The path exists and is not a directory
    /// - Another process holds the lock (returns `Locked`)
    /// - I/O errors occur
    pub fn open(path: &Path) -> StorageResult<Self> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }

        if !path.is_dir() {
            return Err(StorageError::Io(std::io::Error::new(
                ErrorKind::InvalidInput,
                format!("path is not a directory: {}", path.display()),
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked);
        }

        Ok(Self {
            path: path.to_path_buf(),
            guard: RwLock::new(()),
            _lock_file: lock_file,
        })
    }

    /// Returns the path to the storage directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn record_path(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        Ok(self.path.join(format!("{key}.{RECORD_EXT}")))
    }

    /// Write-then-rename so readers never observe a partial record.
    fn write_atomic(&self, target: &Path, data: &[u8]) -> StorageResult<()> {
        let mut temp = target.as_os_str().to_owned();
        temp.push(TEMP_SUFFIX);
        let temp = PathBuf::from(temp);

        let mut file = File::create(&temp)?;
        file.write_all(data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp, target)?;
        Ok(())
    }
}

impl StorageBackend for FileBackend {
    fn insert(&self, key: &str, data: &[u8]) -> StorageResult<()> {
        let target = self.record_path(key)?;
        let _guard = self.guard.write();
        if target.exists() {
            return Err(StorageError::already_exists(key));
        }
        self.write_atomic(&target, data)
    }

    fn update(&self, key: &str, data: &[u8]) -> StorageResult<()> {
        let target = self.record_path(key)?;
        let _guard = self.guard.write();
        if !target.exists() {
            return Err(StorageError::not_found(key));
        }
        self.write_atomic(&target, data)
    }

    fn read(&self, key: &str) -> StorageResult<Vec<u8>> {
        let target = self.record_path(key)?;
        let _guard = self.guard.read();
        match fs::read(&target) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::not_found(key)),
            Err(e) => Err(e.into()),
        }
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let target = self.record_path(key)?;
        let _guard = self.guard.write();
        match fs::remove_file(&target) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::not_found(key)),
            Err(e) => Err(e.into()),
        }
    }

    fn contains(&self, key: &str) -> StorageResult<bool> {
        let target = self.record_path(key)?;
        let _guard = self.guard.read();
        Ok(target.is_file())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let _guard = self.guard.read();
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if validate_key(stem).is_ok() {
                    keys.push(stem.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}
