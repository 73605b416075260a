//! Cache backings: a directory of JSON files, or an in-process map.
//!
//! Both expose the same key/value capability set so the cache never needs to
//! know which one it was given. [`probe_backend`] picks one at startup.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::WeatherError;

/// Characters escaped in cache file names. Keeps `forecast_3171031001` readable.
const KEY_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'_').remove(b'-');

const ENTRY_EXTENSION: &str = "json";
const PROBE_KEY: &str = "__probe__";

/// Distinguishes temp files of concurrent writes within this process.
static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short name for logs and stats ("file" or "memory").
    fn kind(&self) -> &'static str;

    async fn read(&self, key: &str) -> Result<Option<String>, WeatherError>;

    async fn write(&self, key: &str, contents: &str) -> Result<(), WeatherError>;

    async fn exists(&self, key: &str) -> bool;

    /// Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), WeatherError>;

    async fn keys(&self) -> Result<Vec<String>, WeatherError>;
}

/// One `{key}.json` file per entry inside a single directory.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Open the backing directory, creating it if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, WeatherError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            WeatherError::Cache(format!("create {}: {}", dir.display(), e))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let name = utf8_percent_encode(key, KEY_ESCAPE).to_string();
        self.dir.join(format!("{}.{}", name, ENTRY_EXTENSION))
    }
}

fn io_error(action: &str, path: &Path, e: std::io::Error) -> WeatherError {
    WeatherError::Cache(format!("{} {}: {}", action, path.display(), e))
}

#[async_trait]
impl CacheBackend for FileBackend {
    fn kind(&self) -> &'static str {
        "file"
    }

    async fn read(&self, key: &str) -> Result<Option<String>, WeatherError> {
        let path = self.entry_path(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error("read", &path, e)),
        }
    }

    async fn write(&self, key: &str, contents: &str) -> Result<(), WeatherError> {
        let path = self.entry_path(key);
        // Write-then-rename so a reader never sees a half-written entry.
        let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("{}.{}.tmp", std::process::id(), seq));
        tokio::fs::write(&tmp, contents)
            .await
            .map_err(|e| io_error("write", &tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| io_error("rename", &path, e))
    }

    async fn exists(&self, key: &str) -> bool {
        tokio::fs::try_exists(self.entry_path(key))
            .await
            .unwrap_or(false)
    }

    async fn delete(&self, key: &str) -> Result<(), WeatherError> {
        let path = self.entry_path(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("delete", &path, e)),
        }
    }

    async fn keys(&self) -> Result<Vec<String>, WeatherError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| io_error("list", &self.dir, e))?;

        let mut keys = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error("list", &self.dir, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match percent_decode_str(stem).decode_utf8() {
                Ok(key) => keys.push(key.into_owned()),
                Err(_) => tracing::debug!("Skipping cache file with undecodable name: {}", stem),
            }
        }
        Ok(keys)
    }
}

/// Process-local map with the same contract as [`FileBackend`].
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn read(&self, key: &str) -> Result<Option<String>, WeatherError> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn write(&self, key: &str, contents: &str) -> Result<(), WeatherError> {
        self.entries
            .write()
            .insert(key.to_string(), contents.to_string());
        Ok(())
    }

    async fn exists(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    async fn delete(&self, key: &str) -> Result<(), WeatherError> {
        self.entries.write().remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, WeatherError> {
        Ok(self.entries.read().keys().cloned().collect())
    }
}

/// Pick the cache backing for this environment.
///
/// With a directory, tries to create it and round-trip a probe entry. Any
/// failure (read-only or sandboxed filesystem, no directory given) falls back
/// to [`MemoryBackend`].
pub async fn probe_backend(dir: Option<&Path>) -> Arc<dyn CacheBackend> {
    let Some(dir) = dir else {
        tracing::info!("No cache directory configured, using in-memory weather cache");
        return Arc::new(MemoryBackend::new());
    };

    match probe_file_backend(dir).await {
        Ok(backend) => {
            tracing::info!("Using file weather cache at {}", dir.display());
            Arc::new(backend)
        }
        Err(e) => {
            tracing::warn!(
                "Durable cache unavailable ({}), falling back to in-memory cache",
                e
            );
            Arc::new(MemoryBackend::new())
        }
    }
}

async fn probe_file_backend(dir: &Path) -> Result<FileBackend, WeatherError> {
    let backend = FileBackend::open(dir).await?;
    backend.write(PROBE_KEY, "{}").await?;
    backend.delete(PROBE_KEY).await?;
    Ok(backend)
}
