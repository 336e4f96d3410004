//! Time-bounded result cache keyed by (stage, document fingerprint).
//!
//! Expiry is evaluated lazily at read time: a stale entry answers as a
//! miss but is left in place, so no eviction thread or extra
//! synchronization is needed. A single mutex guards the backing map;
//! get/put are called from request-handling and background threads alike.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Default entry lifetime, matching the pipeline's recomputation budget.
pub const DEFAULT_TTL_SECS: i64 = 3600;

/// Source of "now" in unix seconds. Injected so tests can pin expiry
/// behavior at exact offsets around the TTL.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

/// Wall-clock time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

struct Entry<T> {
    payload: T,
    stored_at: i64,
}

/// Mutex-guarded TTL cache. `T` is the per-stage payload type.
pub struct ResultCache<T> {
    entries: Mutex<HashMap<(String, String), Entry<T>>>,
    ttl_secs: i64,
    clock: Arc<dyn Clock>,
}

impl<T: Clone> ResultCache<T> {
    pub fn new(ttl_secs: i64) -> Self {
        Self::with_clock(ttl_secs, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl_secs: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl_secs,
            clock,
        }
    }

    /// Returns the cached payload, or `None` on a miss or once the
    /// entry's age meets or exceeds the TTL. Stale entries are not
    /// removed here.
    pub fn get(&self, stage: &str, fingerprint: &str) -> Option<T> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let entry = entries.get(&(stage.to_string(), fingerprint.to_string()))?;
        if self.clock.now() - entry.stored_at < self.ttl_secs {
            Some(entry.payload.clone())
        } else {
            None
        }
    }

    /// Stores a payload, unconditionally overwriting any existing entry
    /// for the key and resetting its timestamp.
    pub fn put(&self, stage: &str, fingerprint: &str, payload: T) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            (stage.to_string(), fingerprint.to_string()),
            Entry {
                payload,
                stored_at: self.clock.now(),
            },
        );
    }

    /// Number of entries, live or stale. Display-only.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fingerprint of the document's absolute path. Identical files at
/// different paths hash differently; changed content under a stable path
/// hashes the same. Does not touch the filesystem, so the digest is
/// independent of whether the file currently exists.
pub fn path_fingerprint(path: &Path) -> String {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    let mut hasher = Sha256::new();
    hasher.update(absolute.to_string_lossy().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Streaming digest of the file bytes, for when byte-exact cache
/// correctness matters more than the extra read.
pub fn content_fingerprint(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}
