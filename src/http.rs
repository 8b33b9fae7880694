//! HTTP transport seam shared by API calls and token refreshes.
//!
//! [`ApiHttpClient`] is the client's only dependency on an HTTP stack. API requests go
//! through it directly; token refreshes reach it through [`OAuthHttpHandle`], an
//! [`AsyncHttpClient`] adapter that records the response status in a
//! [`ResponseMetadataSlot`] so refresh failures can be classified by status.

// std
use std::time::Duration as StdDuration;
// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
// self
use crate::{_prelude::*, error::TransportError};

/// Boxed future returned by [`ApiHttpClient::send`].
pub type HttpFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Executes one HTTP exchange.
///
/// Implementations return every HTTP status (including 4xx/5xx) as a normal response and
/// reserve [`TransportError`] for failures where no response was received.
pub trait ApiHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Sends `request`, giving up after `timeout`.
	fn send(&self, request: HttpRequest, timeout: StdDuration) -> HttpFuture<'_>;
}

/// Metadata captured from the most recent token endpoint response.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code, if a response was received.
	pub status: Option<u16>,
}

/// Thread-safe slot sharing [`ResponseMetadata`] between the transport adapter and error
/// mapping.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// [`AsyncHttpClient`] adapter that routes `oauth2` requests through an [`ApiHttpClient`].
pub(crate) struct OAuthHttpHandle {
	transport: Arc<dyn ApiHttpClient>,
	timeout: StdDuration,
	slot: ResponseMetadataSlot,
}
impl OAuthHttpHandle {
	pub(crate) fn new(
		transport: Arc<dyn ApiHttpClient>,
		timeout: StdDuration,
		slot: ResponseMetadataSlot,
	) -> Self {
		Self { transport, timeout, slot }
	}
}
impl<'c> AsyncHttpClient<'c> for OAuthHttpHandle {
	type Error = HttpClientError<TransportError>;
	type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			self.slot.take();

			let response = self
				.transport
				.send(request, self.timeout)
				.await
				.map_err(|e| HttpClientError::Reqwest(Box::new(e)))?;

			self.slot.store(ResponseMetadata { status: Some(response.status().as_u16()) });

			Ok(response)
		})
	}
}

/// [`ApiHttpClient`] backed by a shared [`ReqwestClient`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client, optionally sending `user_agent` on every request.
	pub fn build(user_agent: Option<&str>) -> Result<Self, crate::error::ConfigError> {
		let mut builder = ReqwestClient::builder();

		if let Some(user_agent) = user_agent {
			builder = builder.user_agent(user_agent);
		}

		Ok(Self(builder.build()?))
	}
}
#[cfg(feature = "reqwest")]
impl ApiHttpClient for ReqwestHttpClient {
	fn send(&self, request: HttpRequest, timeout: StdDuration) -> HttpFuture<'_> {
		Box::pin(async move {
			let mut request = reqwest::Request::try_from(request)?;

			*request.timeout_mut() = Some(timeout);

			let response = self.0.execute(request).await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut raw = HttpResponse::new(response.bytes().await?.to_vec());

			*raw.status_mut() = status;
			*raw.headers_mut() = headers;

			Ok(raw)
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;

	struct Teapot(AtomicUsize);
	impl ApiHttpClient for Teapot {
		fn send(&self, _: HttpRequest, _: StdDuration) -> HttpFuture<'_> {
			Box::pin(async move {
				self.0.fetch_add(1, Ordering::SeqCst);

				let mut response = HttpResponse::new(b"{}".to_vec());

				*response.status_mut() = oauth2::http::StatusCode::IM_A_TEAPOT;

				Ok(response)
			})
		}
	}

	struct Unreachable;
	impl ApiHttpClient for Unreachable {
		fn send(&self, _: HttpRequest, _: StdDuration) -> HttpFuture<'_> {
			Box::pin(async {
				Err(TransportError::from(std::io::Error::new(
					std::io::ErrorKind::ConnectionRefused,
					"refused",
				)))
			})
		}
	}

	fn request() -> HttpRequest {
		oauth2::http::Request::builder()
			.uri("http://127.0.0.1/token")
			.body(Vec::new())
			.expect("Request fixture should build.")
	}

	#[tokio::test]
	async fn oauth_handle_records_status() {
		let transport = Arc::new(Teapot(AtomicUsize::new(0)));
		let slot = ResponseMetadataSlot::default();
		let handle = OAuthHttpHandle::new(transport.clone(), StdDuration::from_secs(1), slot.clone());
		let response = handle.call(request()).await.expect("Teapot replies are responses.");

		assert_eq!(response.status().as_u16(), 418);
		assert_eq!(slot.take().and_then(|meta| meta.status), Some(418));
		assert!(slot.take().is_none(), "Metadata is consumed on take.");
		assert_eq!(transport.0.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn oauth_handle_wraps_transport_failures() {
		let slot = ResponseMetadataSlot::default();
		let handle =
			OAuthHttpHandle::new(Arc::new(Unreachable), StdDuration::from_secs(1), slot.clone());
		let err = handle.call(request()).await.expect_err("Transport failures must surface.");

		assert!(matches!(err, HttpClientError::Reqwest(ref inner) if matches!(**inner, TransportError::Io(_))));
		assert!(slot.take().is_none());
	}
}
