//! EVE Swagger Interface client: invoke operations by name, with transparent OAuth refresh,
//! response caching, page walking, and one classified error taxonomy.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
pub mod call;
pub mod classify;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod pagination;
pub mod response;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for tests; enabled via `cfg(test)` or the `test`
	//! crate feature.

	pub use crate::_prelude::*;

	// std
	use std::{collections::VecDeque, io, time::Duration as StdDuration};
	// crates.io
	use oauth2::{
		HttpRequest, HttpResponse,
		http::{HeaderMap, Method, Uri},
	};
	// self
	use crate::{
		error::TransportError,
		http::{ApiHttpClient, HttpFuture},
	};

	/// Request captured by [`ScriptedTransport`].
	#[derive(Clone, Debug)]
	pub struct RecordedRequest {
		/// HTTP method.
		pub method: Method,
		/// Full request URI.
		pub uri: Uri,
		/// Request headers.
		pub headers: HeaderMap,
		/// Raw body.
		pub body: Vec<u8>,
	}
	impl RecordedRequest {
		/// Returns the header value for `name` when it is valid UTF-8.
		pub fn header(&self, name: &str) -> Option<&str> {
			self.headers.get(name).and_then(|value| value.to_str().ok())
		}
	}

	/// [`ApiHttpClient`] replaying canned responses in order and recording every request.
	///
	/// Once the script runs out, requests fail with a connection-refused transport error.
	#[derive(Debug, Default)]
	pub struct ScriptedTransport {
		responses: Mutex<VecDeque<HttpResponse>>,
		requests: Mutex<Vec<RecordedRequest>>,
	}
	impl ScriptedTransport {
		/// Creates a transport replaying `responses`.
		pub fn new(responses: impl IntoIterator<Item = HttpResponse>) -> Arc<Self> {
			Arc::new(Self {
				responses: Mutex::new(responses.into_iter().collect()),
				requests: Default::default(),
			})
		}

		/// Creates a transport whose every request fails in transport.
		pub fn empty() -> Arc<Self> {
			Arc::new(Self::default())
		}

		/// Requests received so far, in order.
		pub fn requests(&self) -> Vec<RecordedRequest> {
			self.requests.lock().clone()
		}
	}
	impl ApiHttpClient for ScriptedTransport {
		fn send(&self, request: HttpRequest, _: StdDuration) -> HttpFuture<'_> {
			let (parts, body) = request.into_parts();

			self.requests.lock().push(RecordedRequest {
				method: parts.method,
				uri: parts.uri,
				headers: parts.headers,
				body,
			});

			let next = self.responses.lock().pop_front();

			Box::pin(async move {
				next.ok_or_else(|| {
					TransportError::from(io::Error::new(
						io::ErrorKind::ConnectionRefused,
						"Scripted transport has no responses left.",
					))
				})
			})
		}
	}

	/// Builds a JSON response with `status` and a raw `body`.
	pub fn json_response(status: u16, body: &str) -> HttpResponse {
		oauth2::http::Response::builder()
			.status(status)
			.header("content-type", "application/json")
			.body(body.as_bytes().to_vec())
			.expect("Scripted response should build.")
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use oauth2;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
