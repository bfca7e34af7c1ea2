//! Content-addressed result cache.
//!
//! Keys fingerprint everything that can change a tool's outcome: the
//! prepared argv, environment overrides, input file identity, and the
//! tool-relevant configuration subset. Entries are JSON files sharded by
//! key prefix. Cache trouble is never fatal: read errors degrade to
//! misses and write errors are dropped.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::outcome::ToolOutcome;

/// Identity of one input file as seen by the fingerprint.
#[derive(Debug, Clone, Serialize)]
pub struct FileStamp {
    pub path: String,
    pub size: u64,
    pub mtime_ns: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

/// Stamp the input files, hashing contents instead of stat data in
/// strict mode. Missing files stamp as zeroes so deletion still changes
/// the key.
pub fn stamp_files(paths: &[PathBuf], strict: bool) -> Vec<FileStamp> {
    paths
        .iter()
        .map(|path| {
            let display = path.to_string_lossy().into_owned();
            if strict {
                let content_hash = std::fs::read(path)
                    .map(|bytes| format!("{:x}", Sha256::digest(&bytes)))
                    .ok();
                return FileStamp {
                    path: display,
                    size: 0,
                    mtime_ns: 0,
                    content_hash,
                };
            }
            let metadata = std::fs::metadata(path).ok();
            let size = metadata.as_ref().map(|m| m.len()).unwrap_or(0);
            let mtime_ns = metadata
                .and_then(|m| m.modified().ok())
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_nanos())
                .unwrap_or(0);
            FileStamp {
                path: display,
                size,
                mtime_ns,
                content_hash: None,
            }
        })
        .collect()
}

#[derive(Serialize)]
struct FingerprintInput<'a> {
    tool: &'a str,
    action: &'a str,
    argv: &'a [String],
    env: &'a BTreeMap<String, String>,
    files: &'a [FileStamp],
    settings: &'a serde_json::Value,
}

/// Stable hex fingerprint over a tool action's effective inputs. Map
/// entries are sorted by construction (`BTreeMap`, sorted JSON).
pub fn fingerprint(
    tool: &str,
    action: &str,
    argv: &[String],
    env: &BTreeMap<String, String>,
    files: &[FileStamp],
    settings: &serde_json::Value,
) -> String {
    let input = FingerprintInput {
        tool,
        action,
        argv,
        env,
        files,
        settings,
    };
    let payload = serde_json::to_vec(&input).unwrap_or_default();
    format!("{:x}", Sha256::digest(&payload))
}

/// Disk-backed outcome cache with at most one concurrent producer per
/// key.
pub struct ResultCache {
    dir: PathBuf,
    /// In-flight single-flight locks; entries are pruned once the last
    /// requester for a key releases its guard, so the map stays bounded
    /// by concurrent requests rather than distinct keys ever seen.
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache").field("dir", &self.dir).finish()
    }
}

impl ResultCache {
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            dir: cache_dir.join("results"),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached outcome for `key`, or run `build` and store its
    /// result. Concurrent callers with the same key block on the
    /// in-flight build and observe its result.
    pub async fn get_or_build<F, Fut>(&self, key: &str, build: F) -> ToolOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ToolOutcome>,
    {
        let lock = self.key_lock(key).await;
        let outcome = {
            let _guard = lock.lock().await;
            match self.read(key) {
                Some(mut outcome) => {
                    outcome.cached = true;
                    outcome
                }
                None => {
                    let outcome = build().await;
                    self.write(key, &outcome);
                    outcome
                }
            }
        };
        self.release_key_lock(key, &lock).await;
        outcome
    }

    async fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the key's lock entry when nobody else holds it. Waiting
    /// requesters cloned the `Arc` under the map lock before blocking,
    /// so a strong count above two means the entry must stay.
    async fn release_key_lock(&self, key: &str, lock: &Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        if Arc::strong_count(lock) <= 2 {
            let _ = locks.remove(key);
        }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let shard = key.get(..2).unwrap_or("00");
        self.dir.join(shard).join(format!("{key}.json"))
    }

    fn read(&self, key: &str) -> Option<ToolOutcome> {
        let path = self.entry_path(key);
        let text = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&text) {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                debug!("discarding unreadable cache entry {}: {err}", path.display());
                None
            }
        }
    }

    fn write(&self, key: &str, outcome: &ToolOutcome) {
        let path = self.entry_path(key);
        let result = (|| -> std::io::Result<()> {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let payload = serde_json::to_string(outcome)
                .map_err(|err| std::io::Error::other(err.to_string()))?;
            std::fs::write(&path, payload)
        })();
        if let Err(err) = result {
            warn!("dropping cache write for {}: {err}", path.display());
        }
    }
}
