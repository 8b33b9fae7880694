// self
use crate::{
	_prelude::*,
	obs::{CacheOutcome, CallKind},
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedCall<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedCall<F> = F;

/// Span wrapping one client call.
#[derive(Clone, Debug)]
pub struct CallSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl CallSpan {
	/// Creates a span tagged with the operation and call kind.
	pub fn new(kind: CallKind, operation: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("esi_client.call", operation, kind = kind.as_str());

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, operation);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedCall<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a `debug` event describing one HTTP exchange; `status` is `None` on transport failure.
pub fn log_exchange(method: &str, url: &Url, status: Option<u16>) {
	#[cfg(feature = "tracing")]
	{
		match status {
			Some(status) => tracing::debug!(method, url = %url, status, "HTTP exchange completed."),
			None => tracing::debug!(method, url = %url, "HTTP exchange failed in transport."),
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (method, url, status);
	}
}

/// Emits a `trace` event for a cache lookup.
pub fn log_cache_lookup(key: &str, outcome: CacheOutcome) {
	#[cfg(feature = "tracing")]
	{
		tracing::trace!(key, outcome = outcome.as_str(), "Cache lookup.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (key, outcome);
	}
}

/// Emits a `warn` event for a catalog template that failed validation.
pub fn log_rejected_template(error: &impl Display) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(error = %error, "Catalog template rejected.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = error;
	}
}

/// Emits a `debug` event when an operation needs a scope the configured set lacks.
pub fn log_missing_scope(operation: &str, scope: &str) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(operation, scope, "Configured scopes do not include the required scope.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (operation, scope);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = CallSpan::new(CallKind::Paginated, "MarketOrders");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}

	#[test]
	fn log_helpers_accept_both_outcomes() {
		let url = Url::parse("https://esi.evetech.net/latest/status/").expect("URL fixture.");

		log_exchange("GET", &url, Some(200));
		log_exchange("GET", &url, None);
		log_cache_lookup("GET:abc", CacheOutcome::Hit);
		log_rejected_template(&"Template path must start with `/`.");
		log_missing_scope("CharacterWallet", "esi-wallet.read_character_wallet.v1");
	}
}
