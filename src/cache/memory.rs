//! In-process [`CacheStore`] used by default.

// self
use crate::{
	_prelude::*,
	cache::{CacheEntry, CacheFuture, CacheKey, CacheStore},
};

/// Thread-safe map of cached responses.
///
/// Every write sweeps entries that have already expired.
#[derive(Clone, Debug, Default)]
pub struct MemoryCache(Arc<RwLock<HashMap<CacheKey, CacheEntry>>>);
impl MemoryCache {
	/// Number of stored entries, expired ones included.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	/// Drops entries that expired before `instant`, returning how many were removed.
	pub fn purge_expired(&self, instant: OffsetDateTime) -> usize {
		let mut map = self.0.write();
		let before = map.len();

		map.retain(|_, entry| entry.is_live_at(instant));

		before - map.len()
	}
}
impl CacheStore for MemoryCache {
	fn read<'a>(&'a self, key: &'a CacheKey) -> CacheFuture<'a, Option<CacheEntry>> {
		let entry = self.0.read().get(key).cloned();

		Box::pin(async move { Ok(entry) })
	}

	fn write(&self, entry: CacheEntry) -> CacheFuture<'_, ()> {
		let now = OffsetDateTime::now_utc();
		let mut map = self.0.write();

		map.retain(|_, stored| stored.is_live_at(now));
		map.insert(entry.key.clone(), entry);
		drop(map);

		Box::pin(async { Ok(()) })
	}

	fn invalidate<'a>(&'a self, key: &'a CacheKey) -> CacheFuture<'a, bool> {
		let removed = self.0.write().remove(key).is_some();

		Box::pin(async move { Ok(removed) })
	}

	fn clear(&self) -> CacheFuture<'_, ()> {
		self.0.write().clear();

		Box::pin(async { Ok(()) })
	}
}
