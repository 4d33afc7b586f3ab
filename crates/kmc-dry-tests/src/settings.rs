// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory settings store fake for testing without filesystem I/O.

use kmc_config::{SettingsError, SettingsStore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory implementation of [`SettingsStore`] for testing.
///
/// Clones share state. Call counts are tracked so tests can assert on
/// store traffic, and failures can be injected per direction.
///
/// # Example
///
/// ```
/// use kmc_dry_tests::InMemorySettingsStore;
/// use kmc_config::SettingsService;
/// use kmc_core::MatcherConfig;
///
/// let store = InMemorySettingsStore::new();
/// let service = SettingsService::new(store.clone());
///
/// service.save_matcher_config(&MatcherConfig::default()).unwrap();
/// assert_eq!(store.load_count(), 0);
/// assert_eq!(store.save_count(), 1);
/// ```
#[derive(Clone, Default)]
pub struct InMemorySettingsStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    data: HashMap<String, Vec<u8>>,
    load_count: usize,
    save_count: usize,
    fail_on_load: bool,
    fail_on_save: bool,
}

impl InMemorySettingsStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `data` under `key`.
    pub fn with_entry(key: &str, data: &[u8]) -> Self {
        let store = Self::default();
        store.lock().data.insert(key.to_owned(), data.to_vec());
        store
    }

    /// Configure the store to fail on load operations.
    pub fn set_fail_on_load(&self, fail: bool) {
        self.lock().fail_on_load = fail;
    }

    /// Configure the store to fail on save operations.
    pub fn set_fail_on_save(&self, fail: bool) {
        self.lock().fail_on_save = fail;
    }

    /// Number of `read` attempts, failed ones included.
    pub fn load_count(&self) -> usize {
        self.lock().load_count
    }

    /// Number of `write` attempts, failed ones included.
    pub fn save_count(&self) -> usize {
        self.lock().save_count
    }

    /// Raw bytes stored under `key`, if any.
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.lock().data.get(key).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SettingsStore for InMemorySettingsStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, SettingsError> {
        let mut inner = self.lock();
        inner.load_count += 1;
        if inner.fail_on_load {
            return Err(SettingsError::Backend(format!("injected read failure for {key}")));
        }
        Ok(inner.data.get(key).cloned())
    }

    fn write(&self, key: &str, document: &[u8]) -> Result<(), SettingsError> {
        let mut inner = self.lock();
        inner.save_count += 1;
        if inner.fail_on_save {
            return Err(SettingsError::Backend(format!("injected write failure for {key}")));
        }
        inner.data.insert(key.to_owned(), document.to_vec());
        Ok(())
    }
}
