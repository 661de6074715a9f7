//! Per-connection comparator cache with single-flight construction.
//!
//! Comparator construction loads linguistic tables and is comparatively
//! slow, so each [`CollatorKey`] is built at most once. The map holds either
//! a `Loading` marker or the finished comparator. Construction runs outside
//! the lock; callers that find `Loading` wait on the condvar and pick up the
//! winner's instance.
//!
//! The cache owns the only strong references to its comparators. Collation
//! slots hold weak references, so [`CollatorCache::release_all`] is what
//! actually frees them.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Condvar, Mutex};
use sqlicu_error::Result;
use sqlicu_func::LocaleComparator;
use tracing::{debug, info, warn};

use crate::collator::{CollatorKey, LocaleRules};

enum CacheEntry {
    Loading,
    Ready(Arc<dyn LocaleComparator>),
}

/// Lazily populated map from collator key to comparator.
pub struct CollatorCache {
    rules: Arc<dyn LocaleRules>,
    entries: Mutex<HashMap<CollatorKey, CacheEntry>>,
    loaded: Condvar,
    constructed: AtomicU64,
}

impl CollatorCache {
    #[must_use]
    pub fn new(rules: Arc<dyn LocaleRules>) -> Self {
        Self {
            rules,
            entries: Mutex::new(HashMap::new()),
            loaded: Condvar::new(),
            constructed: AtomicU64::new(0),
        }
    }

    /// Return the comparator for `key`, constructing it on first use.
    ///
    /// Repeated calls for the same key return the same `Arc`.
    ///
    /// # Errors
    ///
    /// Returns the rules' construction error (normally
    /// [`sqlicu_error::IcuError::LocaleUnavailable`]). Failures are not
    /// cached; a later call tries again.
    pub fn get_or_create(&self, key: &CollatorKey) -> Result<Arc<dyn LocaleComparator>> {
        let mut entries = self.entries.lock();
        loop {
            match entries.get(key) {
                Some(CacheEntry::Ready(comparator)) => {
                    debug!(key = %key, "collator cache hit");
                    return Ok(Arc::clone(comparator));
                }
                Some(CacheEntry::Loading) => {
                    debug!(key = %key, "collator cache waiting on in-flight load");
                    self.loaded.wait(&mut entries);
                }
                None => break,
            }
        }
        entries.insert(key.clone(), CacheEntry::Loading);
        drop(entries);

        let mut flight = InFlight {
            cache: self,
            key,
            armed: true,
        };
        let comparator = match self.rules.create(key) {
            Ok(comparator) => comparator,
            Err(error) => {
                warn!(key = %key, %error, "collator construction failed");
                return Err(error);
            }
        };

        let mut entries = self.entries.lock();
        entries.insert(key.clone(), CacheEntry::Ready(Arc::clone(&comparator)));
        flight.armed = false;
        drop(entries);
        self.loaded.notify_all();

        let total = self.constructed.fetch_add(1, Ordering::Relaxed) + 1;
        info!(key = %key, constructed = total, "collator constructed");
        Ok(comparator)
    }

    /// Whether a finished comparator exists for `key`.
    #[must_use]
    pub fn contains(&self, key: &CollatorKey) -> bool {
        matches!(self.entries.lock().get(key), Some(CacheEntry::Ready(_)))
    }

    /// Number of finished comparators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|entry| matches!(entry, CacheEntry::Ready(_)))
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Successful constructions over the cache's lifetime.
    #[must_use]
    pub fn constructed(&self) -> u64 {
        self.constructed.load(Ordering::Relaxed)
    }

    /// Drop every finished comparator. Returns how many were released.
    ///
    /// In-flight loads are left alone and complete normally.
    pub fn release_all(&self) -> usize {
        let released: Vec<Arc<dyn LocaleComparator>> = {
            let mut entries = self.entries.lock();
            let ready: Vec<CollatorKey> = entries
                .iter()
                .filter(|(_, entry)| matches!(entry, CacheEntry::Ready(_)))
                .map(|(key, _)| key.clone())
                .collect();
            ready
                .iter()
                .filter_map(|key| match entries.remove(key) {
                    Some(CacheEntry::Ready(comparator)) => Some(comparator),
                    _ => None,
                })
                .collect()
        };
        if !released.is_empty() {
            info!(released = released.len(), "collator cache released");
        }
        released.len()
    }
}

impl fmt::Debug for CollatorCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollatorCache")
            .field("len", &self.len())
            .field("constructed", &self.constructed())
            .finish_non_exhaustive()
    }
}

/// Removes the `Loading` marker if construction fails or panics.
struct InFlight<'a> {
    cache: &'a CollatorCache,
    key: &'a CollatorKey,
    armed: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.cache.entries.lock().remove(self.key);
            self.cache.loaded.notify_all();
        }
    }
}
