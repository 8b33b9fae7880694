//! Maps HTTP statuses, OAuth error payloads, and transport failures into [`ErrorKind`].
//!
//! Classification is deterministic: transport failures always become
//! [`ErrorKind::Timeout`]; otherwise the status code selects the kind, and a 400 is refined by
//! the `error` (or `message`) field of the decoded payload.

// self
use crate::{
	_prelude::*,
	error::{ApiError, TransportError},
	response::Response,
};

/// Error taxonomy surfaced by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
	/// Operation name unresolved, or the API answered 404.
	NotFound,
	/// API answered 400 without a more specific payload.
	BadRequest,
	/// Refresh token rejected as `invalid_token`.
	RefreshTokenExpired,
	/// Application credentials rejected as `invalid_client`.
	InvalidAppClientKeys,
	/// API answered 401.
	Unauthorized,
	/// API answered 403.
	Forbidden,
	/// API answered 502.
	TemporaryServer,
	/// API answered 503.
	RateLimit,
	/// Any unmapped status.
	Unknown,
	/// Transport failure (timeout, connection, TLS).
	Timeout,
}
impl ErrorKind {
	/// Returns a stable label suitable for logs and metrics.
	pub const fn as_str(self) -> &'static str {
		match self {
			ErrorKind::NotFound => "not_found",
			ErrorKind::BadRequest => "bad_request",
			ErrorKind::RefreshTokenExpired => "refresh_token_expired",
			ErrorKind::InvalidAppClientKeys => "invalid_app_client_keys",
			ErrorKind::Unauthorized => "unauthorized",
			ErrorKind::Forbidden => "forbidden",
			ErrorKind::TemporaryServer => "temporary_server",
			ErrorKind::RateLimit => "rate_limit",
			ErrorKind::Unknown => "unknown",
			ErrorKind::Timeout => "timeout",
		}
	}
}
impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Primitive facts about a failed exchange, fed to [`classify`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorContext {
	/// HTTP status code, when a response was received.
	pub http_status: Option<u16>,
	/// `error` (or `message`) field of the decoded payload.
	pub error_code: Option<String>,
	/// Indicates the failure originated in the transport layer.
	pub transport_failure: bool,
}
impl ErrorContext {
	/// Creates an empty context.
	pub fn new() -> Self {
		Self::default()
	}

	/// Convenience constructor for transport-level failures.
	pub fn transport() -> Self {
		Self { transport_failure: true, ..Self::default() }
	}

	/// Adds an HTTP status code.
	pub fn with_http_status(mut self, status: u16) -> Self {
		self.http_status = Some(status);

		self
	}

	/// Adds the payload error code.
	pub fn with_error_code(mut self, code: impl Into<String>) -> Self {
		self.error_code = Some(code.into());

		self
	}
}

/// Maps the context onto the error taxonomy.
pub fn classify(ctx: &ErrorContext) -> ErrorKind {
	if ctx.transport_failure {
		return ErrorKind::Timeout;
	}

	match ctx.http_status {
		Some(400) => refine_bad_request(ctx.error_code.as_deref()),
		Some(401) => ErrorKind::Unauthorized,
		Some(403) => ErrorKind::Forbidden,
		Some(404) => ErrorKind::NotFound,
		Some(502) => ErrorKind::TemporaryServer,
		Some(503) => ErrorKind::RateLimit,
		_ => ErrorKind::Unknown,
	}
}

/// Classifies a non-success response, keeping it attached to the error.
pub fn response_error(response: Response) -> ApiError {
	let code = payload_code(&response.data);
	let mut ctx = ErrorContext::new().with_http_status(response.status);

	if let Some(code) = &code {
		ctx = ctx.with_error_code(code.clone());
	}

	let kind = classify(&ctx);
	let message = match code {
		Some(detail) => format!(
			"`{}` failed with HTTP {} ({kind}): {detail}.",
			response.call.operation, response.status
		),
		None => format!("`{}` failed with HTTP {} ({kind}).", response.call.operation, response.status),
	};

	ApiError::new(kind, message).with_response(response)
}

/// Classifies a transport failure; always [`ErrorKind::Timeout`].
pub fn transport_error(err: TransportError) -> ApiError {
	let kind = classify(&ErrorContext::transport());

	ApiError::new(kind, format!("Transport failure: {err}")).with_source(err)
}

/// Extracts the `error` field, falling back to `message`, from an error payload.
pub(crate) fn payload_code(data: &Value) -> Option<String> {
	let object = data.as_object()?;

	object
		.get("error")
		.or_else(|| object.get("message"))
		.and_then(Value::as_str)
		.map(str::to_owned)
}

fn refine_bad_request(code: Option<&str>) -> ErrorKind {
	match code {
		Some(code) if code.eq_ignore_ascii_case("invalid_token") => ErrorKind::RefreshTokenExpired,
		Some(code) if code.eq_ignore_ascii_case("invalid_client") =>
			ErrorKind::InvalidAppClientKeys,
		_ => ErrorKind::BadRequest,
	}
}
