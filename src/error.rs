//! Client-level error types shared across calls, sessions, and caches.

// self
use crate::{_prelude::*, classify::ErrorKind, response::Response};

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Classified failure of a remote call (or an unresolved operation name).
	#[error(transparent)]
	Api(#[from] ApiError),
	/// Local configuration or argument problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Cache backend failure.
	#[error(transparent)]
	Cache(#[from] CacheError),

	/// Paginated call did not terminate within the configured page ceiling.
	#[error("Pagination for `{operation}` exceeded the {limit} page ceiling.")]
	PageLimitExceeded {
		/// Canonical operation identifier.
		operation: String,
		/// Configured ceiling.
		limit: u32,
	},
}
impl Error {
	/// Returns the classified kind for API failures.
	pub fn kind(&self) -> Option<ErrorKind> {
		match self {
			Self::Api(err) => Some(err.kind),
			_ => None,
		}
	}

	/// Returns the response that triggered the failure, when one was received.
	pub fn response(&self) -> Option<&Response> {
		match self {
			Self::Api(err) => err.response.as_deref(),
			_ => None,
		}
	}
}

/// Classified API failure carrying the offending response and original cause.
#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct ApiError {
	/// Taxonomy entry assigned by the classifier.
	pub kind: ErrorKind,
	/// Human-readable summary.
	pub message: String,
	/// Decoded response, when the failure came from an HTTP status.
	pub response: Option<Box<Response>>,
	/// Underlying cause (transport failure, parse failure).
	#[source]
	pub source: Option<BoxError>,
}
impl ApiError {
	/// Creates an error of the provided kind without response or cause.
	pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
		Self { kind, message: message.into(), response: None, source: None }
	}

	/// Attaches the response that triggered the failure.
	pub fn with_response(mut self, response: Response) -> Self {
		self.response = Some(Box::new(response));

		self
	}

	/// Attaches the original cause.
	pub fn with_source(mut self, source: impl 'static + Send + Sync + std::error::Error) -> Self {
		self.source = Some(Box::new(source));

		self
	}

	/// HTTP status of the attached response, if any.
	pub fn status(&self) -> Option<u16> {
		self.response.as_ref().map(|response| response.status)
	}
}

/// Configuration, argument, and request-construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// A configured URL cannot be parsed.
	#[error("The {field} URL is invalid.")]
	InvalidUrl {
		/// Configuration field holding the URL.
		field: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// API host cannot carry path segments (e.g. `data:` URLs).
	#[error("The API host `{host}` cannot be used as a base URL.")]
	CannotBeABase {
		/// Offending host value.
		host: String,
	},
	/// A configuration value is out of range.
	#[error("Configuration field `{field}` is invalid: {reason}.")]
	InvalidValue {
		/// Offending field.
		field: &'static str,
		/// Explanation of the constraint.
		reason: &'static str,
	},
	/// Call template failed validation.
	#[error(transparent)]
	InvalidTemplate(#[from] crate::call::CallTemplateError),

	/// Path placeholder has no matching argument.
	#[error("Operation `{operation}` requires the `{argument}` argument.")]
	MissingArgument {
		/// Canonical operation identifier.
		operation: String,
		/// Missing placeholder name.
		argument: String,
	},
	/// Path argument cannot be substituted safely.
	#[error("Argument `{argument}` of `{operation}` is not a valid path segment.")]
	InvalidArgument {
		/// Canonical operation identifier.
		operation: String,
		/// Offending argument name.
		argument: String,
	},
	/// Request body cannot be serialized.
	#[error("Request body cannot be serialized.")]
	BodySerialization(#[source] serde_json::Error),
	/// Token needs a refresh but no refresh token is held.
	#[error("Access token expired and no refresh token is available.")]
	MissingRefreshToken,
	/// Token needs a refresh but no client identifier is configured.
	#[error("Access token expired and no client credentials are configured.")]
	MissingClientCredentials,
	/// Token endpoint response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token endpoint returned an excessively large or non-positive `expires_in`.
	#[error("The expires_in value is out of the supported range.")]
	ExpiresInOutOfRange,
	/// No client is bound to the current context and none can be created.
	#[error("No client is bound to the current context.")]
	NoCurrentClient,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Cache backend failures.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum CacheError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Transport-level failures (network, TLS, timeouts).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// The request exceeded its deadline.
	#[error("Request timed out.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Connection (DNS, TCP, TLS handshake) could not be established.
	#[error("Connection to the remote host failed.")]
	Connect {
		/// Transport-specific connection error.
		#[source]
		source: BoxError,
	},
	/// Any other network failure reported by the HTTP client.
	#[error("Network error occurred while calling the remote host.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the remote host.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific timeout.
	pub fn timeout(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Timeout { source: Box::new(src) }
	}

	/// Wraps a transport-specific connection failure.
	pub fn connect(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Connect { source: Box::new(src) }
	}

	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() {
			Self::timeout(e)
		} else if e.is_connect() {
			Self::connect(e)
		} else {
			Self::network(e)
		}
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;

	#[test]
	fn cache_error_converts_into_client_error_with_message() {
		let cache_error = CacheError::Backend { message: "disk unreachable".into() };
		let error: Error = cache_error.into();

		assert!(matches!(error, Error::Cache(_)));
		assert!(error.to_string().contains("disk unreachable"));
		assert_eq!(error.kind(), None);
	}

	#[test]
	fn api_error_exposes_kind_and_cause() {
		let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
		let error: Error = ApiError::new(ErrorKind::Timeout, "Call timed out.")
			.with_source(TransportError::from(io))
			.into();

		assert_eq!(error.kind(), Some(ErrorKind::Timeout));
		assert_eq!(error.to_string(), "Call timed out.");
		assert!(error.response().is_none());

		let source = StdError::source(&error).expect("API error should expose its cause.");

		assert!(source.to_string().contains("I/O error"));
	}
}
