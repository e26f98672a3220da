//! Content-addressed keys and the memoization cache.
//!
//! Decoding a source to produce a base64 or traced placeholder is the slow
//! part of planning. The pipeline memoizes those results through an injected
//! [`Cache`] so repeated builds (or repeated calls for the same image in one
//! build) skip the decode.
//!
//! # Keys
//!
//! Everything is keyed by content, never by path:
//!
//! - **content digest**: SHA-256 of the source file's bytes. Content-based
//!   rather than mtime-based so it survives `git checkout`, which resets
//!   modification times.
//!
//! - **args digest**: the last five hex characters of the SHA-256 of the
//!   stable JSON of a variant's [`TransformArgs`]. Short on purpose: it only
//!   has to tell apart the variants of a single source, and it ends up in
//!   every public URL.
//!
//! - **cache key**: `{content digest}{stable JSON(args)}`.
//!
//! "Stable JSON" means object keys sorted at every level, so two equal
//! argument sets always produce the same string regardless of field order.
//!
//! # Storage
//!
//! [`MemoryCache`] lives for one process. [`DiskCache`] persists entries as a
//! versioned JSON file (`.srcset-cache.json`) next to the public output, so it
//! travels with the output directory when cached in CI. A missing, corrupt or
//! version-mismatched file loads as an empty cache.

use crate::imaging::TransformArgs;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::RwLock;

/// Name of the persisted cache file within the public directory.
const CACHE_FILENAME: &str = ".srcset-cache.json";

/// Version of the cache file format. Bump this to invalidate all existing
/// caches when the format or key computation changes.
const CACHE_VERSION: u32 = 1;

/// Number of trailing hex characters kept for an args digest.
const ARGS_DIGEST_LEN: usize = 5;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Cache serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Asynchronous key → JSON value store.
///
/// Implementations must be safe to share between concurrent planning calls.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;
    async fn set(&self, key: &str, value: Value) -> Result<(), CacheError>;
}

// ============================================================================
// Keys
// ============================================================================

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(hash_bytes(&bytes))
}

/// SHA-256 hash of a byte slice, returned as a hex string.
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Serialize `value` to JSON with object keys sorted at every level.
pub fn stable_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let value = sort_keys(serde_json::to_value(value)?);
    serde_json::to_string(&value)
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_keys(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Short digest of a variant's arguments, used to namespace output paths.
pub fn args_digest(args: &TransformArgs) -> Result<String, serde_json::Error> {
    let hex = hash_bytes(stable_json(args)?.as_bytes());
    Ok(hex[hex.len() - ARGS_DIGEST_LEN..].to_string())
}

/// Memoization key for a render of `args` from the source with `content_digest`.
pub fn cache_key(content_digest: &str, args: &TransformArgs) -> Result<String, serde_json::Error> {
    Ok(format!("{}{}", content_digest, stable_json(args)?))
}

// ============================================================================
// In-memory cache
// ============================================================================

/// Process-local cache backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), CacheError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

// ============================================================================
// Disk cache
// ============================================================================

/// On-disk form of a [`DiskCache`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct CacheFile {
    version: u32,
    entries: HashMap<String, Value>,
}

/// Cache persisted as a single JSON file.
///
/// Entries are held in memory and written back by [`DiskCache::save`]; `set`
/// never touches the disk so concurrent planning calls do not race on the
/// file.
#[derive(Debug)]
pub struct DiskCache {
    path: PathBuf,
    entries: RwLock<HashMap<String, Value>>,
    stats: std::sync::Mutex<CacheStats>,
}

impl DiskCache {
    /// Load from `dir`. Returns an empty cache if the file doesn't exist or
    /// can't be parsed (version mismatch, corruption).
    pub fn load(dir: &Path) -> Self {
        let path = cache_path(dir);
        let entries = std::fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str::<CacheFile>(&content).ok())
            .filter(|file| file.version == CACHE_VERSION)
            .map(|file| file.entries)
            .unwrap_or_default();
        Self {
            path,
            entries: RwLock::new(entries),
            stats: std::sync::Mutex::new(CacheStats::default()),
        }
    }

    /// An empty cache that will save to `dir` (used for `--no-cache`).
    pub fn empty(dir: &Path) -> Self {
        Self {
            path: cache_path(dir),
            entries: RwLock::new(HashMap::new()),
            stats: std::sync::Mutex::new(CacheStats::default()),
        }
    }

    /// Write every entry back to the cache file.
    pub async fn save(&self) -> Result<(), CacheError> {
        let file = CacheFile {
            version: CACHE_VERSION,
            entries: self.entries.read().await.clone(),
        };
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(&file)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Hit/miss counts since load.
    pub fn stats(&self) -> CacheStats {
        self.stats
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Cache for DiskCache {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let value = self.entries.read().await.get(key).cloned();
        if let Ok(mut stats) = self.stats.lock() {
            match value {
                Some(_) => stats.hit(),
                None => stats.miss(),
            }
        }
        Ok(value)
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), CacheError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

/// Resolve the cache file path for a public directory.
pub fn cache_path(dir: &Path) -> PathBuf {
    dir.join(CACHE_FILENAME)
}

/// Summary of cache performance for a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} computed ({} total)",
                self.hits,
                self.misses,
                self.total()
            )
        } else {
            write!(f, "{} computed", self.misses)
        }
    }
}
