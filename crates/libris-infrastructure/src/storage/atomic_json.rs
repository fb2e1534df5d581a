//! Atomic JSON file operations.
//!
//! A thin layer for safe access to single-document JSON files. Writes go
//! through a temp file plus atomic rename with an explicit fsync, under an
//! exclusive file lock, so readers never observe a partially written
//! document and two processes never interleave a replace.

use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use libris_core::error::{LibrisError, Result};

/// A handle to one JSON document on disk.
pub struct AtomicJsonFile<T> {
    path: PathBuf,
    _phantom: PhantomData<T>,
}

impl<T> AtomicJsonFile<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Creates a handle for the document at `path`.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _phantom: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the document and deserializes it.
    ///
    /// A missing or empty file reads as `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(&self) -> Result<Option<T>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(None);
        }

        let data: T = serde_json::from_str(&content)?;
        Ok(Some(data))
    }

    /// Replaces the document atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be acquired or if
    /// serialization or any write step fails.
    pub fn save(&self, data: &T) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
        }

        let _lock = FileLock::acquire(&self.path)?;

        let json = serde_json::to_string_pretty(data)?;

        // Write to a temporary file in the same directory
        let tmp_path = self.temp_path()?;
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(json.as_bytes())?;

        // Ensure data reaches disk before the rename makes it visible
        tmp_file.sync_all()?;
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path)?;

        Ok(())
    }

    /// Removes the document if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be acquired or the file cannot
    /// be deleted.
    pub fn remove(&self) -> Result<()> {
        let _lock = FileLock::acquire(&self.path)?;

        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    /// The temporary file path used for atomic replaces.
    fn temp_path(&self) -> Result<PathBuf> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| LibrisError::storage("path has no parent directory"))?;
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| LibrisError::storage("path has no file name"))?;

        let tmp_name = format!(".{}.tmp", file_name.to_string_lossy());
        Ok(parent.join(tmp_name))
    }
}

/// A file lock guard that releases the lock when dropped.
struct FileLock {
    #[allow(dead_code)]
    file: File,
    lock_path: PathBuf,
}

impl FileLock {
    /// Acquires an exclusive lock next to the given path.
    fn acquire(path: &Path) -> Result<Self> {
        let lock_path = path.with_extension("lock");

        if let Some(parent) = lock_path.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        #[cfg(unix)]
        {
            use fs2::FileExt;
            file.lock_exclusive()
                .map_err(|e| LibrisError::storage(format!("failed to acquire lock: {}", e)))?;
        }

        #[cfg(not(unix))]
        {
            // No file locking on non-Unix; acceptable for a single-user client
        }

        Ok(FileLock { file, lock_path })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // Unlock is automatic when the file handle closes; removing the
        // lock file is best effort
        let _ = fs::remove_file(&self.lock_path);
    }
}
