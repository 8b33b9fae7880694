//! File-backed [`CacheStore`] that survives restarts.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	cache::{CacheEntry, CacheFuture, CacheKey, CacheStore},
	error::CacheError,
};

/// Persists cached responses to a JSON snapshot after each mutation.
///
/// Entries already expired when the snapshot is loaded are skipped, and every write sweeps
/// expired entries. A mutation whose snapshot cannot be written leaves the cache unchanged.
#[derive(Clone, Debug)]
pub struct FileCache {
	path: PathBuf,
	inner: Arc<RwLock<HashMap<CacheKey, CacheEntry>>>,
}
impl FileCache {
	/// Opens (or creates) a cache at `path`, eagerly loading live entries.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
		let path = path.into();

		ensure_parent_exists(&path)?;

		let now = OffsetDateTime::now_utc();
		let entries = load_snapshot(&path)?
			.into_iter()
			.filter(|entry| entry.is_live_at(now))
			.map(|entry| (entry.key.clone(), entry))
			.collect();

		Ok(Self { path, inner: Arc::new(RwLock::new(entries)) })
	}

	/// Snapshot location.
	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Applies `mutate` to a copy of the entries and swaps it in only once the snapshot is on disk.
	fn commit<T>(
		&self,
		mutate: impl FnOnce(&mut HashMap<CacheKey, CacheEntry>) -> T,
	) -> Result<T, CacheError> {
		let mut guard = self.inner.write();
		let mut next = guard.clone();
		let output = mutate(&mut next);

		self.persist(&next)?;
		*guard = next;

		Ok(output)
	}

	fn persist(&self, entries: &HashMap<CacheKey, CacheEntry>) -> Result<(), CacheError> {
		ensure_parent_exists(&self.path)?;

		let snapshot: Vec<_> = entries.values().collect();
		let serialized = serde_json::to_vec(&snapshot).map_err(|e| CacheError::Serialization {
			message: format!("Failed to serialize cache snapshot: {e}"),
		})?;
		let tmp_path = self.path.with_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| backend("create", &tmp_path, e))?;

			file.write_all(&serialized).map_err(|e| backend("write", &tmp_path, e))?;
			file.sync_all().map_err(|e| backend("sync", &tmp_path, e))?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| backend("replace", &self.path, e))
	}
}
impl CacheStore for FileCache {
	fn read<'a>(&'a self, key: &'a CacheKey) -> CacheFuture<'a, Option<CacheEntry>> {
		Box::pin(async move { Ok(self.inner.read().get(key).cloned()) })
	}

	fn write(&self, entry: CacheEntry) -> CacheFuture<'_, ()> {
		Box::pin(async move {
			self.commit(|entries| {
				let now = OffsetDateTime::now_utc();

				entries.retain(|_, stored| stored.is_live_at(now));
				entries.insert(entry.key.clone(), entry);
			})
		})
	}

	fn invalidate<'a>(&'a self, key: &'a CacheKey) -> CacheFuture<'a, bool> {
		Box::pin(async move {
			if !self.inner.read().contains_key(key) {
				return Ok(false);
			}

			self.commit(|entries| entries.remove(key).is_some())
		})
	}

	fn clear(&self) -> CacheFuture<'_, ()> {
		Box::pin(async move { self.commit(HashMap::clear) })
	}
}

fn load_snapshot(path: &Path) -> Result<Vec<CacheEntry>, CacheError> {
	if !path.exists() {
		return Ok(Vec::new());
	}

	let bytes = fs::read(path).map_err(|e| backend("read", path, e))?;

	if bytes.iter().all(u8::is_ascii_whitespace) {
		return Ok(Vec::new());
	}

	let mut de = serde_json::Deserializer::from_slice(&bytes);

	serde_path_to_error::deserialize(&mut de).map_err(|e| CacheError::Serialization {
		message: format!("Failed to parse {} at `{}`: {}", path.display(), e.path(), e.inner()),
	})
}

fn ensure_parent_exists(path: &Path) -> Result<(), CacheError> {
	if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
		fs::create_dir_all(parent).map_err(|e| backend("create directory", parent, e))?;
	}

	Ok(())
}

fn backend(action: &str, path: &Path, e: std::io::Error) -> CacheError {
	CacheError::Backend { message: format!("Failed to {action} {}: {e}", path.display()) }
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// self
	use super::*;
	use crate::{
		call::{CallDescriptor, HttpMethod},
		response::Response,
	};

	fn temp_path(label: &str) -> PathBuf {
		env::temp_dir().join(format!(
			"esi_client_file_cache_{label}_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		))
	}

	fn entry(path: &str, expires_at: OffsetDateTime) -> CacheEntry {
		let url = Url::parse(&format!("https://esi.evetech.net/latest{path}")).expect("URL fixture.");

		CacheEntry {
			key: CacheKey::new(HttpMethod::Get, &url, None),
			response: Response {
				status: 200,
				headers: [("x-pages".to_owned(), "1".to_owned())].into_iter().collect(),
				data: serde_json::json!([{ "alliance_id": 99000006 }]),
				call: CallDescriptor::new("Alliances", HttpMethod::Get, path),
			},
			expires_at,
		}
	}

	#[tokio::test]
	async fn entries_survive_reopen_and_expired_ones_are_dropped() {
		let path = temp_path("reopen");
		let store = FileCache::open(&path).expect("Failed to open file cache.");
		let now = OffsetDateTime::now_utc();
		let live = entry("/alliances/", now + Duration::hours(1));
		let stale = entry("/status/", now - Duration::seconds(1));

		store.write(live.clone()).await.expect("Write live entry.");
		store.write(stale.clone()).await.expect("Write stale entry.");
		drop(store);

		let reopened = FileCache::open(&path).expect("Failed to reopen file cache.");

		assert_eq!(reopened.read(&live.key).await.expect("Read live."), Some(live.clone()));
		assert_eq!(reopened.read(&stale.key).await.expect("Read stale."), None);
		assert!(reopened.invalidate(&live.key).await.expect("Invalidate."));
		assert!(FileCache::open(&path).expect("Reopen after invalidate.").inner.read().is_empty());

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary cache snapshot {}: {e}", path.display())
		});
	}

	#[tokio::test]
	async fn failed_persists_leave_entries_untouched() {
		let path = temp_path("rollback");
		let store = FileCache::open(&path).expect("Failed to open file cache.");
		let now = OffsetDateTime::now_utc();
		let kept = entry("/alliances/", now + Duration::hours(1));
		let rejected = entry("/status/", now + Duration::hours(1));

		store.write(kept.clone()).await.expect("Write kept entry.");

		// A directory at the temporary snapshot path makes every persist fail.
		let blocker = path.with_extension("tmp");

		fs::create_dir_all(&blocker).expect("Failed to create blocking directory.");

		assert!(matches!(store.write(rejected.clone()).await, Err(CacheError::Backend { .. })));
		assert!(store.invalidate(&kept.key).await.is_err());
		assert!(store.clear().await.is_err());
		assert_eq!(store.read(&rejected.key).await.expect("Read rejected."), None);
		assert_eq!(store.read(&kept.key).await.expect("Read kept."), Some(kept));

		fs::remove_dir(&blocker).expect("Failed to remove blocking directory.");
		fs::remove_file(&path).expect("Failed to remove temporary cache snapshot.");
	}

	#[test]
	fn corrupt_snapshots_report_serialization_errors() {
		let path = temp_path("corrupt");

		fs::write(&path, b"[{\"key\": 7}]").expect("Failed to write corrupt snapshot.");

		let err = FileCache::open(&path).expect_err("Corrupt snapshots must not load.");

		assert!(matches!(err, CacheError::Serialization { ref message } if message.contains("key")));

		fs::remove_file(&path).expect("Failed to remove corrupt snapshot.");
	}
}
