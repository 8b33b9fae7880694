// self
use crate::obs::{CacheOutcome, CallKind, CallOutcome};

/// Records a call outcome via the global metrics recorder (when enabled).
pub fn record_call_outcome(kind: CallKind, outcome: CallOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"esi_client_call_total",
			"kind" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records a cache lookup outcome via the global metrics recorder (when enabled).
pub fn record_cache_outcome(outcome: CacheOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("esi_client_cache_total", "outcome" => outcome.as_str()).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = outcome;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recorders_accept_every_label() {
		for kind in [CallKind::Single, CallKind::Paginated, CallKind::TokenRefresh] {
			for outcome in [CallOutcome::Attempt, CallOutcome::Success, CallOutcome::Failure] {
				record_call_outcome(kind, outcome);
			}
		}

		record_cache_outcome(CacheOutcome::Hit);
		record_cache_outcome(CacheOutcome::Miss);
	}
}
