// std
use std::sync::atomic::{AtomicU64, Ordering};

/// In-process counters for token endpoint exchanges.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	attempts: AtomicU64,
	successes: AtomicU64,
	failures: AtomicU64,
}
impl RefreshMetrics {
	/// Exchanges sent to the token endpoint.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Exchanges that produced a new token state.
	pub fn successes(&self) -> u64 {
		self.successes.load(Ordering::Relaxed)
	}

	/// Exchanges that failed.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_result<T, E>(&self, result: &Result<T, E>) {
		let counter = if result.is_ok() { &self.successes } else { &self.failures };

		counter.fetch_add(1, Ordering::Relaxed);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn results_split_into_successes_and_failures() {
		let metrics = RefreshMetrics::default();

		metrics.record_attempt();
		metrics.record_result::<(), ()>(&Ok(()));
		metrics.record_attempt();
		metrics.record_result::<(), ()>(&Err(()));

		assert_eq!((metrics.attempts(), metrics.successes(), metrics.failures()), (2, 1, 1));
	}
}
