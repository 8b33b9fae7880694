//! Response cache keyed by call fingerprints.
//!
//! [`Cache::fetch`] returns a live entry when one exists and otherwise runs the supplied
//! computation, storing the result only when it succeeds. Computations for the same key are
//! single-flight: concurrent callers wait for the first one and then read its entry.

pub mod file;
pub mod memory;

pub use file::FileCache;
pub use memory::MemoryCache;

// std
use std::sync::{
	OnceLock,
	atomic::{AtomicU64, Ordering},
};
// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD};
use sha2::{Digest, Sha256};
use time::PrimitiveDateTime;
// self
use crate::{
	_prelude::*,
	call::HttpMethod,
	error::CacheError,
	obs::{self, CacheOutcome},
	response::Response,
};

/// Boxed future returned by [`CacheStore`] operations.
pub type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CacheError>> + 'a + Send>>;

/// Storage backend contract for cached responses.
pub trait CacheStore
where
	Self: Send + Sync,
{
	/// Returns the stored entry for `key`, live or not.
	fn read<'a>(&'a self, key: &'a CacheKey) -> CacheFuture<'a, Option<CacheEntry>>;

	/// Stores or replaces an entry.
	fn write(&self, entry: CacheEntry) -> CacheFuture<'_, ()>;

	/// Removes the entry for `key`, reporting whether one existed.
	fn invalidate<'a>(&'a self, key: &'a CacheKey) -> CacheFuture<'a, bool>;

	/// Removes every entry.
	fn clear(&self) -> CacheFuture<'_, ()>;
}

/// Deterministic identifier for one logical request.
///
/// Rendered as `{METHOD}:{fingerprint}`, where the fingerprint is the unpadded base64
/// SHA-256 digest of the method, the absolute URL (datasource and query included, page
/// excluded), and the JSON body.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);
impl CacheKey {
	/// Fingerprints a request.
	pub fn new(method: HttpMethod, url: &Url, body: Option<&Value>) -> Self {
		let mut hasher = Sha256::new();

		hasher.update(method.as_str().as_bytes());
		hasher.update(b" ");
		hasher.update(url.as_str().as_bytes());

		if let Some(body) = body {
			hasher.update(b"\n");
			hasher.update(body.to_string().as_bytes());
		}

		Self(format!("{method}:{}", STANDARD_NO_PAD.encode(hasher.finalize())))
	}

	/// Borrows the rendered key.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Display for CacheKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Cached response with its expiry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
	/// Key the entry is stored under.
	pub key: CacheKey,
	/// Cached response.
	pub response: Response,
	/// Instant after which the entry must be recomputed.
	pub expires_at: OffsetDateTime,
}
impl CacheEntry {
	/// Returns `true` while `instant` precedes the expiry.
	pub fn is_live_at(&self, instant: OffsetDateTime) -> bool {
		instant < self.expires_at
	}
}

/// In-process counters for cache lookups.
#[derive(Debug, Default)]
pub struct CacheMetrics {
	hits: AtomicU64,
	misses: AtomicU64,
	stores: AtomicU64,
}
impl CacheMetrics {
	/// Lookups answered by a live entry.
	pub fn hits(&self) -> u64 {
		self.hits.load(Ordering::Relaxed)
	}

	/// Lookups that ran the computation.
	pub fn misses(&self) -> u64 {
		self.misses.load(Ordering::Relaxed)
	}

	/// Entries written.
	pub fn stores(&self) -> u64 {
		self.stores.load(Ordering::Relaxed)
	}

	fn record(&self, key: &CacheKey, outcome: CacheOutcome) {
		let counter = match outcome {
			CacheOutcome::Hit => &self.hits,
			CacheOutcome::Miss => &self.misses,
		};

		counter.fetch_add(1, Ordering::Relaxed);
		obs::record_cache_outcome(outcome);
		obs::log_cache_lookup(key.as_str(), outcome);
	}
}

/// Memoizing wrapper around a [`CacheStore`].
pub struct Cache {
	store: Arc<dyn CacheStore>,
	guards: Mutex<HashMap<CacheKey, Arc<AsyncMutex<()>>>>,
	metrics: CacheMetrics,
}
impl Cache {
	/// Wraps `store`.
	pub fn new(store: Arc<dyn CacheStore>) -> Self {
		Self { store, guards: Default::default(), metrics: Default::default() }
	}

	/// Creates a cache backed by a fresh [`MemoryCache`].
	pub fn in_memory() -> Self {
		Self::new(Arc::new(MemoryCache::default()))
	}

	/// Process-wide in-memory cache shared by clients that do not configure their own.
	pub fn global() -> Arc<Cache> {
		static GLOBAL: OnceLock<Arc<Cache>> = OnceLock::new();

		GLOBAL.get_or_init(|| Arc::new(Cache::in_memory())).clone()
	}

	/// Lookup counters.
	pub fn metrics(&self) -> &CacheMetrics {
		&self.metrics
	}

	/// Returns the live entry for `key`, or runs `compute` and caches its success for `ttl`.
	///
	/// Failures propagate without touching the store; a non-positive `ttl` disables storing.
	/// Expiries past the largest representable instant are clamped to it.
	pub async fn fetch<F, Fut>(&self, key: &CacheKey, ttl: Duration, compute: F) -> Result<Response>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<Response>>,
	{
		if let Some(response) = self.live(key).await? {
			return Ok(response);
		}

		let guard = self.guard(key);
		let result = {
			let _singleflight = guard.lock().await;

			self.fetch_locked(key, ttl, compute).await
		};

		self.release(key, guard);

		result
	}

	/// Drops the entry for `key`, reporting whether one existed.
	pub async fn invalidate(&self, key: &CacheKey) -> Result<bool> {
		Ok(self.store.invalidate(key).await?)
	}

	/// Drops every entry.
	pub async fn clear(&self) -> Result<()> {
		Ok(self.store.clear().await?)
	}

	async fn fetch_locked<F, Fut>(
		&self,
		key: &CacheKey,
		ttl: Duration,
		compute: F,
	) -> Result<Response>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<Response>>,
	{
		if let Some(response) = self.live(key).await? {
			return Ok(response);
		}

		self.metrics.record(key, CacheOutcome::Miss);

		let response = compute().await?;

		if ttl.is_positive() {
			let expires_at = OffsetDateTime::now_utc()
				.checked_add(ttl)
				.unwrap_or_else(|| PrimitiveDateTime::MAX.assume_utc());
			let entry = CacheEntry { key: key.clone(), response: response.clone(), expires_at };

			self.store.write(entry).await?;
			self.metrics.stores.fetch_add(1, Ordering::Relaxed);
		}

		Ok(response)
	}

	async fn live(&self, key: &CacheKey) -> Result<Option<Response>> {
		let entry = self.store.read(key).await?;

		match entry.filter(|entry| entry.is_live_at(OffsetDateTime::now_utc())) {
			Some(entry) => {
				self.metrics.record(key, CacheOutcome::Hit);

				Ok(Some(entry.response))
			},
			None => Ok(None),
		}
	}

	fn guard(&self, key: &CacheKey) -> Arc<AsyncMutex<()>> {
		self.guards.lock().entry(key.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}

	fn release(&self, key: &CacheKey, guard: Arc<AsyncMutex<()>>) {
		let mut guards = self.guards.lock();

		// Map plus this caller.
		if Arc::strong_count(&guard) <= 2 {
			guards.remove(key);
		}
	}
}
impl Debug for Cache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Cache")
			.field("in_flight", &self.guards.lock().len())
			.field("metrics", &self.metrics)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::AtomicUsize;
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::{
		call::CallDescriptor,
		classify::ErrorKind,
		error::ApiError,
	};

	fn key(path: &str) -> CacheKey {
		let url = Url::parse(&format!("https://esi.evetech.net/latest{path}?datasource=tranquility"))
			.expect("URL fixture.");

		CacheKey::new(HttpMethod::Get, &url, None)
	}

	fn response(data: Value) -> Response {
		Response {
			status: 200,
			headers: Default::default(),
			data,
			call: CallDescriptor::new("Status", HttpMethod::Get, "/status/"),
		}
	}

	#[test]
	fn keys_are_deterministic_and_body_sensitive() {
		let url = Url::parse("https://esi.evetech.net/latest/universe/names/?datasource=tranquility")
			.expect("URL fixture.");
		let lhs = CacheKey::new(HttpMethod::Post, &url, Some(&json!([30000142])));
		let rhs = CacheKey::new(HttpMethod::Post, &url, Some(&json!([30000142])));
		let other = CacheKey::new(HttpMethod::Post, &url, Some(&json!([30002187])));

		assert_eq!(lhs, rhs);
		assert_ne!(lhs, other);
		assert!(lhs.as_str().starts_with("POST:"));
		assert_ne!(key("/status/"), key("/alliances/"));
	}

	#[tokio::test]
	async fn successful_results_are_memoized_until_expiry() {
		let cache = Cache::in_memory();
		let counter = AtomicUsize::new(0);
		let runs = &counter;
		let compute = move || async move {
			runs.fetch_add(1, Ordering::SeqCst);

			Ok(response(json!({ "players": 1 })))
		};
		let first = cache.fetch(&key("/status/"), Duration::minutes(1), compute).await.expect("First fetch.");
		let second =
			cache.fetch(&key("/status/"), Duration::minutes(1), compute).await.expect("Second fetch.");

		assert_eq!(first, second);
		assert_eq!(runs.load(Ordering::SeqCst), 1);
		assert_eq!((cache.metrics().hits(), cache.metrics().misses()), (1, 1));

		assert!(cache.invalidate(&key("/status/")).await.expect("Invalidate."));
		cache.fetch(&key("/status/"), Duration::minutes(1), compute).await.expect("Refetch.");

		assert_eq!(runs.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn expired_entries_are_recomputed() {
		let cache = Cache::in_memory();
		let runs = AtomicUsize::new(0);
		let compute = || async {
			runs.fetch_add(1, Ordering::SeqCst);

			Ok(response(json!([])))
		};

		cache.fetch(&key("/status/"), Duration::milliseconds(20), compute).await.expect("Fetch.");
		tokio::time::sleep(std::time::Duration::from_millis(40)).await;
		cache.fetch(&key("/status/"), Duration::milliseconds(20), compute).await.expect("Fetch.");
		cache.fetch(&key("/status/"), Duration::ZERO, compute).await.expect("Uncached fetch.");
		cache.fetch(&key("/status/"), Duration::ZERO, compute).await.expect("Uncached fetch.");

		assert_eq!(runs.load(Ordering::SeqCst), 4);
	}

	#[tokio::test]
	async fn failures_are_not_cached() {
		let cache = Cache::in_memory();
		let err = cache
			.fetch(&key("/status/"), Duration::minutes(1), || async {
				Err(ApiError::new(ErrorKind::TemporaryServer, "Bad gateway.").into())
			})
			.await
			.expect_err("Failures propagate.");

		assert_eq!(err.kind(), Some(ErrorKind::TemporaryServer));

		let ok = cache
			.fetch(&key("/status/"), Duration::minutes(1), || async { Ok(response(json!(1))) })
			.await
			.expect("The next computation runs.");

		assert_eq!(ok.data, json!(1));
	}

	#[tokio::test]
	async fn concurrent_fetches_share_one_computation() {
		let cache = Arc::new(Cache::in_memory());
		let runs = Arc::new(AtomicUsize::new(0));
		let tasks = (0..8)
			.map(|_| {
				let cache = cache.clone();
				let runs = runs.clone();

				tokio::spawn(async move {
					cache
						.fetch(&key("/markets/prices/"), Duration::minutes(5), || async {
							runs.fetch_add(1, Ordering::SeqCst);
							tokio::time::sleep(std::time::Duration::from_millis(20)).await;

							Ok(response(json!([1, 2, 3])))
						})
						.await
				})
			})
			.collect::<Vec<_>>();

		for task in tasks {
			task.await.expect("Task should join.").expect("Fetch should succeed.");
		}

		assert_eq!(runs.load(Ordering::SeqCst), 1);
		assert!(cache.guards.lock().is_empty());
	}

	#[tokio::test]
	async fn unbounded_ttls_clamp_instead_of_overflowing() {
		let store = Arc::new(MemoryCache::default());
		let cache = Cache::new(store.clone());
		let counter = AtomicUsize::new(0);
		let runs = &counter;
		let compute = move || async move {
			runs.fetch_add(1, Ordering::SeqCst);

			Ok(response(json!({ "players": 1 })))
		};

		cache.fetch(&key("/status/"), Duration::MAX, compute).await.expect("First fetch.");
		cache.fetch(&key("/status/"), Duration::MAX, compute).await.expect("Cached fetch.");

		let entry = store.read(&key("/status/")).await.expect("Read.").expect("Entry is stored.");

		assert_eq!(counter.load(Ordering::SeqCst), 1);
		assert_eq!(entry.expires_at, PrimitiveDateTime::MAX.assume_utc());
	}

	#[tokio::test]
	async fn expired_entries_are_swept_on_write() {
		let store = Arc::new(MemoryCache::default());
		let cache = Cache::new(store.clone());

		for id in 0..32 {
			cache
				.fetch(&key(&format!("/characters/{id}/")), Duration::milliseconds(10), || async {
					Ok(response(json!({ "name": "pilot" })))
				})
				.await
				.expect("Short-lived fetch.");
		}

		assert_eq!(store.len(), 32);

		tokio::time::sleep(std::time::Duration::from_millis(30)).await;
		cache
			.fetch(&key("/status/"), Duration::minutes(1), || async { Ok(response(json!(1))) })
			.await
			.expect("Long-lived fetch.");

		assert_eq!(store.len(), 1);
	}
}
