// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory config store fake for testing without filesystem I/O.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use ripple_app_core::config::{ConfigError, ConfigStore};

/// In-memory [`ConfigStore`] with call counters and failure injection.
///
/// Clones share state, so a test can hand one clone to a
/// [`ConfigService`](ripple_app_core::config::ConfigService) and inspect the
/// other.
///
/// # Example
///
/// ```
/// use ripple_app_core::config::ConfigService;
/// use ripple_dry_tests::InMemoryConfigStore;
///
/// let store = InMemoryConfigStore::new();
/// let service = ConfigService::new(store.clone());
///
/// service.save("feed", &serde_json::json!({"mode": "merge"})).unwrap();
/// assert_eq!(store.saves(), 1);
/// assert!(store.contains("feed"));
/// ```
#[derive(Clone, Default)]
pub struct InMemoryConfigStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    blobs: BTreeMap<String, Vec<u8>>,
    loads: usize,
    saves: usize,
    failing_loads: bool,
    failing_saves: bool,
}

impl InMemoryConfigStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `(key, blob)` pairs.
    pub fn with_blobs<I, K>(blobs: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<u8>)>,
        K: Into<String>,
    {
        let store = Self::new();
        store.lock().blobs = blobs.into_iter().map(|(k, v)| (k.into(), v)).collect();
        store
    }

    /// Makes every subsequent load fail (or succeed again).
    pub fn fail_loads(&self, fail: bool) {
        self.lock().failing_loads = fail;
    }

    /// Makes every subsequent save fail (or succeed again).
    pub fn fail_saves(&self, fail: bool) {
        self.lock().failing_saves = fail;
    }

    /// Load attempts so far, failed ones included.
    pub fn loads(&self) -> usize {
        self.lock().loads
    }

    /// Save attempts so far, failed ones included.
    pub fn saves(&self) -> usize {
        self.lock().saves
    }

    /// True if `key` holds a blob.
    pub fn contains(&self, key: &str) -> bool {
        self.lock().blobs.contains_key(key)
    }

    /// Raw blob stored under `key`, bypassing the counters.
    pub fn peek(&self, key: &str) -> Option<Vec<u8>> {
        self.lock().blobs.get(key).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ConfigStore for InMemoryConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        let mut inner = self.lock();
        inner.loads += 1;
        if inner.failing_loads {
            return Err(ConfigError::Other("simulated load failure".into()));
        }
        inner.blobs.get(key).cloned().ok_or(ConfigError::NotFound)
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        let mut inner = self.lock();
        inner.saves += 1;
        if inner.failing_saves {
            return Err(ConfigError::Other("simulated save failure".into()));
        }
        inner.blobs.insert(key.to_owned(), data.to_vec());
        Ok(())
    }
}
