//! Client configuration and API URL construction.

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenSecret},
	error::ConfigError,
};

/// Read-only settings supplied when building a [`Client`](crate::client::Client).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
	/// Scheme and host (optionally with a base path) of the API.
	pub api_host: String,
	/// Version path segment inserted before every operation path.
	pub api_version: String,
	/// Value of the `datasource` query parameter.
	pub datasource: String,
	/// OAuth token endpoint used for refreshes.
	pub token_endpoint: String,
	/// Application client identifier, required to refresh tokens.
	pub client_id: Option<String>,
	/// Application client secret.
	pub client_secret: Option<TokenSecret>,
	/// Deadline for each HTTP round trip.
	pub timeout: Duration,
	/// Tokens expiring within this window are refreshed before use.
	pub refresh_window: Duration,
	/// Page ceiling for paginated calls; unbounded when `None`.
	pub max_pages: Option<u32>,
	/// `User-Agent` header sent with every request.
	pub user_agent: Option<String>,
	/// Scopes the hosting application requested for its tokens.
	pub scopes: ScopeSet,
}
impl ClientConfig {
	/// Default API host.
	pub const DEFAULT_API_HOST: &str = "https://esi.evetech.net";
	/// Default API version segment.
	pub const DEFAULT_API_VERSION: &str = "latest";
	/// Default datasource.
	pub const DEFAULT_DATASOURCE: &str = "tranquility";
	/// Default per-request timeout.
	pub const DEFAULT_TIMEOUT: Duration = Duration::seconds(60);
	/// Default refresh window.
	pub const DEFAULT_REFRESH_WINDOW: Duration = Duration::seconds(60);
	/// Default SSO token endpoint.
	pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://login.eveonline.com/v2/oauth/token";

	/// Overrides the API host.
	pub fn with_api_host(mut self, host: impl Into<String>) -> Self {
		self.api_host = host.into();

		self
	}

	/// Overrides the API version segment.
	pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
		self.api_version = version.into();

		self
	}

	/// Overrides the datasource.
	pub fn with_datasource(mut self, datasource: impl Into<String>) -> Self {
		self.datasource = datasource.into();

		self
	}

	/// Overrides the token endpoint.
	pub fn with_token_endpoint(mut self, endpoint: impl Into<String>) -> Self {
		self.token_endpoint = endpoint.into();

		self
	}

	/// Sets the application credentials used for refreshes.
	pub fn with_client_credentials(
		mut self,
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
	) -> Self {
		self.client_id = Some(client_id.into());
		self.client_secret = Some(TokenSecret::new(client_secret));

		self
	}

	/// Overrides the per-request timeout.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Overrides the refresh window.
	pub fn with_refresh_window(mut self, window: Duration) -> Self {
		self.refresh_window = window;

		self
	}

	/// Bounds paginated calls to `limit` pages.
	pub fn with_max_pages(mut self, limit: u32) -> Self {
		self.max_pages = Some(limit);

		self
	}

	/// Sets the `User-Agent` header.
	pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = Some(user_agent.into());

		self
	}

	/// Records the scopes requested by the hosting application.
	pub fn with_scopes(mut self, scopes: ScopeSet) -> Self {
		self.scopes = scopes;

		self
	}

	/// Checks every field, returning the first violation.
	pub fn validate(&self) -> Result<(), ConfigError> {
		ApiEndpoint::from_config(self)?;
		self.token_url()?;

		if !self.timeout.is_positive() {
			return Err(ConfigError::InvalidValue { field: "timeout", reason: "must be positive" });
		}
		if self.refresh_window.is_negative() {
			return Err(ConfigError::InvalidValue {
				field: "refresh_window",
				reason: "must not be negative",
			});
		}
		if self.max_pages == Some(0) {
			return Err(ConfigError::InvalidValue {
				field: "max_pages",
				reason: "must allow at least one page",
			});
		}

		Ok(())
	}

	/// Parses the token endpoint.
	pub fn token_url(&self) -> Result<Url, ConfigError> {
		Url::parse(&self.token_endpoint)
			.map_err(|source| ConfigError::InvalidUrl { field: "token_endpoint", source })
	}

	/// Per-request timeout as a standard duration; non-positive values collapse to zero.
	pub(crate) fn request_timeout(&self) -> std::time::Duration {
		if self.timeout.is_positive() { self.timeout.unsigned_abs() } else { Default::default() }
	}
}
impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			api_host: Self::DEFAULT_API_HOST.into(),
			api_version: Self::DEFAULT_API_VERSION.into(),
			datasource: Self::DEFAULT_DATASOURCE.into(),
			token_endpoint: Self::DEFAULT_TOKEN_ENDPOINT.into(),
			client_id: None,
			client_secret: None,
			timeout: Self::DEFAULT_TIMEOUT,
			refresh_window: Self::DEFAULT_REFRESH_WINDOW,
			max_pages: None,
			user_agent: None,
			scopes: ScopeSet::default(),
		}
	}
}

/// Versioned API root that turns operation paths into absolute URLs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiEndpoint {
	base: Url,
	version: String,
	datasource: String,
}
impl ApiEndpoint {
	/// Parses the host, version, and datasource from `config`.
	pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
		let base = Url::parse(&config.api_host)
			.map_err(|source| ConfigError::InvalidUrl { field: "api_host", source })?;

		if base.cannot_be_a_base() {
			return Err(ConfigError::CannotBeABase { host: config.api_host.clone() });
		}

		let version = config.api_version.trim_matches('/');

		if version.is_empty() {
			return Err(ConfigError::InvalidValue { field: "api_version", reason: "must not be empty" });
		}
		if config.datasource.is_empty() {
			return Err(ConfigError::InvalidValue { field: "datasource", reason: "must not be empty" });
		}

		Ok(Self { base, version: version.to_owned(), datasource: config.datasource.clone() })
	}

	/// Builds `{host}/{version}{path}?datasource={datasource}&{params}`.
	///
	/// Path segments are percent-encoded and a trailing `/` on `path` is kept. `params` are
	/// appended in the order given.
	pub fn build_url(&self, path: &str, params: &[(String, String)]) -> Result<Url, ConfigError> {
		let mut url = self.base.clone();

		{
			let mut segments = url
				.path_segments_mut()
				.map_err(|_| ConfigError::CannotBeABase { host: self.base.to_string() })?;

			segments.pop_if_empty();
			segments.extend(self.version.split('/'));
			segments.extend(path.split('/').filter(|segment| !segment.is_empty()));

			if path.ends_with('/') {
				segments.push("");
			}
		}

		url.query_pairs_mut()
			.clear()
			.append_pair("datasource", &self.datasource)
			.extend_pairs(params);

		Ok(url)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn endpoint(host: &str) -> ApiEndpoint {
		ApiEndpoint::from_config(&ClientConfig::default().with_api_host(host))
			.expect("Endpoint fixture should be valid.")
	}

	#[test]
	fn build_url_inserts_version_and_datasource() {
		let url = endpoint("https://esi.evetech.net")
			.build_url(
				"/markets/10000002/orders/",
				&[("order_type".into(), "sell".into()), ("page".into(), "2".into())],
			)
			.expect("URL should build.");

		assert_eq!(
			url.as_str(),
			"https://esi.evetech.net/latest/markets/10000002/orders/?datasource=tranquility&order_type=sell&page=2"
		);
	}

	#[test]
	fn build_url_keeps_host_base_path_and_encodes_segments() {
		let url = endpoint("http://127.0.0.1:8080/esi/")
			.build_url("/universe/types/a b", &[])
			.expect("URL should build.");

		assert_eq!(url.as_str(), "http://127.0.0.1:8080/esi/latest/universe/types/a%20b?datasource=tranquility");
	}

	#[test]
	fn validate_rejects_bad_values() {
		assert!(ClientConfig::default().validate().is_ok());
		assert!(matches!(
			ClientConfig::default().with_api_host("not a url").validate(),
			Err(ConfigError::InvalidUrl { field: "api_host", .. })
		));
		assert!(matches!(
			ClientConfig::default().with_api_host("data:text/plain,esi").validate(),
			Err(ConfigError::CannotBeABase { .. })
		));
		assert!(matches!(
			ClientConfig::default().with_token_endpoint("::").validate(),
			Err(ConfigError::InvalidUrl { field: "token_endpoint", .. })
		));
		assert!(matches!(
			ClientConfig::default().with_timeout(Duration::ZERO).validate(),
			Err(ConfigError::InvalidValue { field: "timeout", .. })
		));
		assert!(matches!(
			ClientConfig::default().with_refresh_window(Duration::seconds(-1)).validate(),
			Err(ConfigError::InvalidValue { field: "refresh_window", .. })
		));
		assert!(matches!(
			ClientConfig::default().with_max_pages(0).validate(),
			Err(ConfigError::InvalidValue { field: "max_pages", .. })
		));
		assert!(matches!(
			ClientConfig::default().with_datasource("").validate(),
			Err(ConfigError::InvalidValue { field: "datasource", .. })
		));
	}

	#[test]
	fn debug_redacts_client_secret() {
		let config = ClientConfig::default().with_client_credentials("app-id", "app-secret");
		let rendered = format!("{config:?}");

		assert!(rendered.contains("app-id"));
		assert!(!rendered.contains("app-secret"));
	}

	#[test]
	fn deserializes_partial_documents_with_defaults() {
		let config: ClientConfig =
			serde_json::from_str(r#"{ "datasource": "singularity", "max_pages": 50 }"#)
				.expect("Partial config should deserialize.");

		assert_eq!(config.datasource, "singularity");
		assert_eq!(config.max_pages, Some(50));
		assert_eq!(config.api_host, ClientConfig::DEFAULT_API_HOST);
		assert_eq!(config.timeout, ClientConfig::DEFAULT_TIMEOUT);
	}
}
