// Key/value cache stores and the token/credential caches built on them.
// A missing entry is never an error: `get` returns `Ok(None)`.

mod credentials;
mod token;

pub use credentials::CredentialCache;
pub use token::TokenCache;

use crate::error::{Result, SsoError};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Byte-oriented cache backend.
pub trait Cache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    fn put(&self, key: &str, data: &[u8]) -> Result<()>;

    /// Remove an entry. Removing a missing entry succeeds.
    fn delete(&self, key: &str) -> Result<()>;
}

/// Process-local cache, used for role credentials when no durable store is given.
#[derive(Debug, Default)]
pub struct MemoryCache {
    data: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.data
            .lock()
            .map_err(|_| SsoError::CacheError("memory cache lock poisoned".to_string()))
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        self.entries()?.insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries()?.remove(key);
        Ok(())
    }
}

/// Filesystem cache: one `<sha256(key)>.json` file per entry under `directory`.
#[derive(Debug, Clone)]
pub struct FileCache {
    directory: PathBuf,
}

impl FileCache {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    fn cache_file_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.directory.join(format!("{:x}.json", digest))
    }
}

impl Cache for FileCache {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        read_optional(&self.cache_file_path(key))
    }

    fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        write_private_file(&self.cache_file_path(key), data)
    }

    fn delete(&self, key: &str) -> Result<()> {
        remove_optional(&self.cache_file_path(key))
    }
}

/// Read a whole file, mapping "not found" to `None`.
pub(crate) fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SsoError::CacheError(format!(
            "Failed to read cache file {}: {}",
            path.display(),
            e
        ))),
    }
}

pub(crate) fn remove_optional(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SsoError::CacheError(format!(
            "Failed to remove cache file {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Create `dir` (and parents) readable only by the owner.
pub(crate) fn create_private_dir(dir: &Path) -> Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir).map_err(|e| {
        SsoError::CacheError(format!(
            "Failed to create cache directory {}: {}",
            dir.display(),
            e
        ))
    })
}

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Replace `path` with `data`, owner read/write only.
///
/// The bytes go to a sibling temp file first and are renamed into place, so
/// readers never see a partially written cache file. Each call gets its own
/// temp file; concurrent writers of one key race only on the rename.
pub(crate) fn write_private_file(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| SsoError::CacheError(format!("Invalid cache path: {}", path.display())))?;
    create_private_dir(dir)?;

    let file_name = path
        .file_name()
        .ok_or_else(|| SsoError::CacheError(format!("Invalid cache path: {}", path.display())))?;
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let tmp_path = dir.join(format!(
        ".{}.{}.{}.{}.tmp",
        file_name.to_string_lossy(),
        std::process::id(),
        nanos,
        TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    let write_err = |e: std::io::Error| {
        SsoError::CacheError(format!(
            "Failed to write cache file {}: {}",
            path.display(),
            e
        ))
    };

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(&tmp_path).map_err(write_err)?;
    file.write_all(data).map_err(write_err)?;
    file.sync_all().map_err(write_err)?;
    drop(file);

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        write_err(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn exercise(cache: &dyn Cache) {
        assert_eq!(cache.get("test-key").unwrap(), None);

        cache.put("test-key", b"test-data").unwrap();
        assert_eq!(cache.get("test-key").unwrap().as_deref(), Some(&b"test-data"[..]));

        cache.put("test-key", b"replaced").unwrap();
        assert_eq!(cache.get("test-key").unwrap().as_deref(), Some(&b"replaced"[..]));

        cache.delete("test-key").unwrap();
        assert_eq!(cache.get("test-key").unwrap(), None);

        // deleting again is not an error
        cache.delete("test-key").unwrap();
    }

    #[test]
    fn test_memory_cache() {
        exercise(&MemoryCache::new());
    }

    #[test]
    fn test_file_cache() {
        let dir = TempDir::new().unwrap();
        exercise(&FileCache::new(dir.path().join("nested").join("cache")));
    }

    #[test]
    fn test_file_cache_names_files_by_key_hash() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path());
        cache.put("https://x.awsapps.com/start|123|Admin", b"{}").unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names.len(), 1);
        let name = &names[0];
        assert!(name.ends_with(".json"));
        assert_eq!(name.len(), 64 + ".json".len());
        assert!(name[..64].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_cache_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let cache_dir = dir.path().join("cache");
        let cache = FileCache::new(&cache_dir);
        cache.put("key", b"secret").unwrap();

        let dir_mode = fs::metadata(&cache_dir).unwrap().permissions().mode();
        assert_eq!(dir_mode & 0o077, 0, "directory must be owner-only");

        let file = fs::read_dir(&cache_dir).unwrap().next().unwrap().unwrap();
        let file_mode = file.metadata().unwrap().permissions().mode();
        assert_eq!(file_mode & 0o777, 0o600);
    }

    #[test]
    fn test_concurrent_puts_to_one_key_never_corrupt_the_entry() {
        let dir = TempDir::new().unwrap();
        let cache = std::sync::Arc::new(FileCache::new(dir.path()));

        let writers: Vec<_> = (0..4)
            .map(|n| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    let payload = serde_json::json!({ "writer": n, "pad": "x".repeat(n * 500) });
                    let bytes = serde_json::to_vec(&payload).unwrap();
                    for _ in 0..100 {
                        cache.put("k", &bytes).unwrap();
                        let read = cache.get("k").unwrap().unwrap();
                        serde_json::from_slice::<serde_json::Value>(&read).unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        // only the committed entry remains, no stray temp files
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_read_error_is_not_a_miss() {
        let dir = TempDir::new().unwrap();
        // a directory where a file is expected cannot be read
        let path = dir.path().join("entry.json");
        fs::create_dir(&path).unwrap();

        assert!(read_optional(&path).is_err());
    }
}
