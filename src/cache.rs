//! Process-lifetime memo of resolved codecs.
//!
//! ## Concurrency
//!
//! Lookups read an immutable snapshot of the map through [`ArcSwap`] and never lock.
//! A miss takes the cache's build mutex, re-checks the snapshot (another thread may have
//! inserted the entry while this one waited), and only then builds the codec and
//! publishes a new snapshot. Each direction (encode, decode) owns its own cache and
//! therefore its own mutex.
//!
//! Entries are never replaced or evicted. The first inserted codec for a key is the one
//! every caller sees for the rest of the process.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

/// A build-once map from full type name to a shared codec handle.
pub struct CodecCache<C: ?Sized> {
    label: &'static str,
    entries: ArcSwap<HashMap<String, Arc<C>>>,
    build_lock: Mutex<()>,
}

impl<C: ?Sized> CodecCache<C> {
    /// Creates an empty cache. `label` only appears in log lines.
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            entries: ArcSwap::from_pointee(HashMap::new()),
            build_lock: Mutex::new(()),
        }
    }

    /// Lock-free lookup.
    pub fn get(&self, key: &str) -> Option<Arc<C>> {
        let hit = self.entries.load().get(key).cloned();
        if hit.is_some() {
            log::trace!("[CodecCache::{}] hit '{key}'", self.label);
        }
        hit
    }

    /// Returns the cached codec for `key`, building it with `build` if absent.
    ///
    /// `build` runs at most once per key per cache, under the build mutex. It must not
    /// call back into the same cache.
    pub fn get_or_create<F>(&self, key: &str, build: F) -> Arc<C>
    where
        F: FnOnce() -> Arc<C>,
    {
        if let Some(hit) = self.get(key) {
            return hit;
        }

        let _guard = self.build_lock.lock();
        // Re-check: another thread may have built it while we waited for the lock.
        if let Some(raced) = self.entries.load().get(key) {
            log::trace!("[CodecCache::{}] '{key}' built concurrently", self.label);
            return raced.clone();
        }

        let codec = build();
        let current = self.entries.load_full();
        let mut next = HashMap::with_capacity(current.len() + 1);
        next.extend(current.iter().map(|(k, v)| (k.clone(), v.clone())));
        next.insert(key.to_owned(), codec.clone());
        self.entries.store(Arc::new(next));
        log::debug!(
            "[CodecCache::{}] inserted '{key}' ({} entries)",
            self.label,
            current.len() + 1
        );
        codec
    }

    /// Returns true if `key` is cached.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.load().contains_key(key)
    }

    /// Number of cached codecs.
    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<C: ?Sized> std::fmt::Debug for CodecCache<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecCache")
            .field("label", &self.label)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn builds_once_under_contention() {
        let cache: CodecCache<str> = CodecCache::new("test");
        let builds = AtomicUsize::new(0);
        let barrier = Barrier::new(8);

        let handles: Vec<Arc<str>> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        cache.get_or_create("app.Order", || {
                            builds.fetch_add(1, Ordering::SeqCst);
                            Arc::from("codec")
                        })
                    })
                })
                .collect();
            workers
                .into_iter()
                .map(|w| w.join().expect("worker panicked"))
                .collect()
        });

        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert!(handles.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn first_insert_wins() {
        let cache: CodecCache<str> = CodecCache::new("test");
        let first = cache.get_or_create("k", || Arc::from("first"));
        let second = cache.get_or_create("k", || Arc::from("second"));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(&*second, "first");
        assert!(cache.contains("k"));
        assert!(cache.get("other").is_none());
    }
}
