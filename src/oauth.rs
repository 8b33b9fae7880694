//! Bearer-authenticated execution with transparent, single-flight token refresh.
//!
//! [`OAuthSession`] owns the current [`TokenState`]. Before each request it checks whether
//! the access token expires within the configured window and, if so, exchanges the refresh
//! token through the `oauth2` crate (HTTP Basic client authentication) over the same
//! [`ApiHttpClient`] transport. Refreshes are serialized by an async mutex and the state is
//! re-checked after the lock is acquired, so concurrent callers never spend the same refresh
//! token twice. Every successful refresh is handed to the registered [`RefreshCallback`].

mod metrics;

pub use metrics::RefreshMetrics;

// std
use std::time::Duration as StdDuration;
// crates.io
use oauth2::{
	ClientId, ClientSecret, HttpClientError, HttpRequest, HttpResponse, RefreshToken,
	RequestTokenError, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicRequestTokenError},
	http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT},
};
// self
use crate::{
	_prelude::*,
	auth::{TokenSecret, TokenState},
	call::HttpMethod,
	classify::{self, ErrorContext, ErrorKind},
	config::ClientConfig,
	error::{ApiError, ConfigError, TransportError},
	http::{ApiHttpClient, OAuthHttpHandle, ResponseMetadata, ResponseMetadataSlot},
	obs::{self, CallKind, CallOutcome, CallSpan},
};

/// Callback receiving every refreshed token state.
pub type RefreshCallback = Arc<dyn Fn(&TokenState) + Send + Sync>;

/// Token-owning executor for authenticated requests.
pub struct OAuthSession {
	transport: Arc<dyn ApiHttpClient>,
	token_url: Url,
	client_id: Option<String>,
	client_secret: Option<TokenSecret>,
	user_agent: Option<String>,
	refresh_window: Duration,
	timeout: StdDuration,
	state: RwLock<Option<TokenState>>,
	refresh_guard: AsyncMutex<()>,
	on_refresh: RwLock<Option<RefreshCallback>>,
	metrics: RefreshMetrics,
}
impl OAuthSession {
	/// Creates a session without a token; requests are sent unauthenticated until one is set.
	pub fn new(config: &ClientConfig, transport: Arc<dyn ApiHttpClient>) -> Result<Self, ConfigError> {
		Ok(Self {
			transport,
			token_url: config.token_url()?,
			client_id: config.client_id.clone(),
			client_secret: config.client_secret.clone(),
			user_agent: config.user_agent.clone(),
			refresh_window: config.refresh_window,
			timeout: config.request_timeout(),
			state: RwLock::new(None),
			refresh_guard: AsyncMutex::new(()),
			on_refresh: RwLock::new(None),
			metrics: RefreshMetrics::default(),
		})
	}

	/// Current token state, if any.
	pub fn token(&self) -> Option<TokenState> {
		self.state.read().clone()
	}

	/// Replaces the token state.
	pub fn set_token(&self, token: Option<TokenState>) {
		*self.state.write() = token;
	}

	/// Registers the callback invoked after every successful refresh.
	pub fn set_on_refresh(&self, callback: RefreshCallback) {
		*self.on_refresh.write() = Some(callback);
	}

	/// Refresh counters.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Forces a refresh-token exchange regardless of the current expiry.
	pub async fn refresh(&self) -> Result<TokenState> {
		self.refresh_with(true).await
	}

	/// Sends one request, refreshing the token first when it is expired or about to expire.
	///
	/// HTTP error statuses come back as ordinary responses; transport failures are classified
	/// as [`ErrorKind::Timeout`].
	pub async fn execute(
		&self,
		method: HttpMethod,
		url: &Url,
		body: Option<&Value>,
	) -> Result<HttpResponse> {
		let access_token = self.access_token().await?;
		let request = self.build_request(method, url, body, access_token.as_ref())?;
		let response = self.transport.send(request, self.timeout).await;

		obs::log_exchange(
			method.as_str(),
			url,
			response.as_ref().ok().map(|response| response.status().as_u16()),
		);

		response.map_err(|err| classify::transport_error(err).into())
	}

	async fn access_token(&self) -> Result<Option<TokenSecret>> {
		let Some(current) = self.token() else { return Ok(None) };

		if !current.expires_within(OffsetDateTime::now_utc(), self.refresh_window) {
			return Ok(Some(current.access_token));
		}

		Ok(Some(self.refresh_with(false).await?.access_token))
	}

	async fn refresh_with(&self, force: bool) -> Result<TokenState> {
		const KIND: CallKind = CallKind::TokenRefresh;

		let span = CallSpan::new(KIND, "refresh_token");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span
			.instrument(async move {
				let _singleflight = self.refresh_guard.lock().await;
				let current = self.token().ok_or(ConfigError::MissingRefreshToken)?;

				if !force && !current.expires_within(OffsetDateTime::now_utc(), self.refresh_window)
				{
					return Ok(current);
				}

				self.metrics.record_attempt();

				let exchanged = self.exchange(&current).await;

				self.metrics.record_result(&exchanged);

				let refreshed = exchanged?;

				*self.state.write() = Some(refreshed.clone());

				let callback = self.on_refresh.read().clone();

				if let Some(callback) = callback {
					callback(&refreshed);
				}

				Ok(refreshed)
			})
			.await;

		match &result {
			Ok(_) => obs::record_call_outcome(KIND, CallOutcome::Success),
			Err(_) => obs::record_call_outcome(KIND, CallOutcome::Failure),
		}

		result
	}

	async fn exchange(&self, current: &TokenState) -> Result<TokenState> {
		let refresh_token = current.refresh_token.as_ref().ok_or(ConfigError::MissingRefreshToken)?;
		let client_id = self.client_id.as_ref().ok_or(ConfigError::MissingClientCredentials)?;
		let mut oauth_client = BasicClient::new(ClientId::new(client_id.clone()))
			.set_token_uri(TokenUrl::from_url(self.token_url.clone()));

		if let Some(secret) = &self.client_secret {
			oauth_client = oauth_client.set_client_secret(ClientSecret::new(secret.expose().to_owned()));
		}

		let slot = ResponseMetadataSlot::default();
		let handle = OAuthHttpHandle::new(self.transport.clone(), self.timeout, slot.clone());
		let secret = RefreshToken::new(refresh_token.expose().to_owned());
		let response = oauth_client
			.exchange_refresh_token(&secret)
			.request_async(&handle)
			.await
			.map_err(|err| map_refresh_error(slot.take(), err))?;
		let expires_in = response.expires_in().ok_or(ConfigError::MissingExpiresIn)?;
		let expires_at = i64::try_from(expires_in.as_secs())
			.ok()
			.filter(|secs| *secs > 0)
			.and_then(|secs| OffsetDateTime::now_utc().checked_add(Duration::seconds(secs)))
			.ok_or(ConfigError::ExpiresInOutOfRange)?;
		let rotated = response.refresh_token().map(|token| TokenSecret::new(token.secret().to_owned()));

		Ok(TokenState {
			access_token: TokenSecret::new(response.access_token().secret().to_owned()),
			refresh_token: rotated.or_else(|| Some(refresh_token.clone())),
			expires_at,
		})
	}

	fn build_request(
		&self,
		method: HttpMethod,
		url: &Url,
		body: Option<&Value>,
		access_token: Option<&TokenSecret>,
	) -> Result<HttpRequest, ConfigError> {
		let mut builder = oauth2::http::Request::builder()
			.method(method.to_http())
			.uri(url.as_str())
			.header(ACCEPT, "application/json");

		if let Some(token) = access_token {
			builder = builder.header(AUTHORIZATION, format!("Bearer {}", token.expose()));
		}
		if let Some(user_agent) = &self.user_agent {
			builder = builder.header(USER_AGENT, user_agent.as_str());
		}

		let request = match body {
			Some(body) => builder
				.header(CONTENT_TYPE, "application/json")
				.body(serde_json::to_vec(body).map_err(ConfigError::BodySerialization)?)?,
			None => builder.body(Vec::new())?,
		};

		Ok(request)
	}
}
impl Debug for OAuthSession {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuthSession")
			.field("token_url", &self.token_url.as_str())
			.field("client_id", &self.client_id)
			.field("state", &*self.state.read())
			.field("refresh_window", &self.refresh_window)
			.finish_non_exhaustive()
	}
}

fn map_refresh_error(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<TransportError>>,
) -> Error {
	let status = meta.and_then(|meta| meta.status);
	let status_kind = || match status {
		Some(status) => classify::classify(&ErrorContext::new().with_http_status(status)),
		None => ErrorKind::Unknown,
	};

	match err {
		RequestTokenError::ServerResponse(response) => {
			let code = response.error().as_ref().to_owned();
			let mut ctx = ErrorContext::new().with_error_code(code.clone());

			if let Some(status) = status {
				ctx = ctx.with_http_status(status);
			}

			let kind = classify::classify(&ctx);
			let detail = response.error_description().cloned().unwrap_or(code);

			ApiError::new(kind, format!("Token refresh failed ({kind}): {detail}.")).into()
		},
		RequestTokenError::Request(HttpClientError::Reqwest(inner)) =>
			classify::transport_error(*inner).into(),
		RequestTokenError::Request(HttpClientError::Http(inner)) => ConfigError::from(inner).into(),
		RequestTokenError::Request(HttpClientError::Io(inner)) =>
			classify::transport_error(TransportError::Io(inner)).into(),
		RequestTokenError::Request(other) =>
			ApiError::new(ErrorKind::Unknown, format!("Token refresh failed: {other}.")).into(),
		RequestTokenError::Parse(source, _body) =>
			ApiError::new(status_kind(), "Token endpoint returned an unparsable response.")
				.with_source(source)
				.into(),
		RequestTokenError::Other(message) => ApiError::new(
			status_kind(),
			format!("Token endpoint returned an unexpected response: {message}."),
		)
		.into(),
	}
}
