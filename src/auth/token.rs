//! Bearer token state and the redacting secret wrapper.

// self
use crate::_prelude::*;

/// Redacted secret wrapper keeping tokens out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Access token, optional refresh token, and access-token expiry owned by a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenState {
	/// Bearer token presented on each request.
	pub access_token: TokenSecret,
	/// Long-lived token used to mint new access tokens.
	pub refresh_token: Option<TokenSecret>,
	/// Instant the access token stops being accepted.
	pub expires_at: OffsetDateTime,
}
impl TokenState {
	/// Creates a state without a refresh token.
	pub fn new(access_token: impl Into<String>, expires_at: OffsetDateTime) -> Self {
		Self { access_token: TokenSecret::new(access_token), refresh_token: None, expires_at }
	}

	/// Attaches a refresh token.
	pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(refresh_token));

		self
	}

	/// Returns `true` once `instant` reaches the expiry.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Returns `true` when the token is expired or expires within `window` of `instant`.
	pub fn expires_within(&self, instant: OffsetDateTime, window: Duration) -> bool {
		self.expires_at - instant <= window
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn secrets_are_redacted() {
		let state = TokenState::new("access-secret", OffsetDateTime::UNIX_EPOCH)
			.with_refresh_token("refresh-secret");
		let rendered = format!("{state:?}");

		assert!(!rendered.contains("access-secret"));
		assert!(!rendered.contains("refresh-secret"));
		assert_eq!(state.access_token.to_string(), "<redacted>");
		assert_eq!(state.access_token.expose(), "access-secret");
	}

	#[test]
	fn expiry_window_is_inclusive() {
		let now = OffsetDateTime::now_utc();
		let state = TokenState::new("token", now + Duration::seconds(60));

		assert!(!state.is_expired_at(now));
		assert!(state.is_expired_at(now + Duration::seconds(60)));
		assert!(state.expires_within(now, Duration::seconds(60)));
		assert!(!state.expires_within(now, Duration::seconds(59)));
		assert!(state.expires_within(now + Duration::minutes(5), Duration::ZERO));
	}

	#[test]
	fn secrets_serialize_transparently() {
		let json = serde_json::to_value(TokenSecret::new("abc")).expect("Secret should serialize.");

		assert_eq!(json, serde_json::json!("abc"));
	}
}
