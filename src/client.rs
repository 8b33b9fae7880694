//! Orchestrator tying the registry, session, cache, pagination, and classifier together.

// self
use crate::{
	_prelude::*,
	auth::TokenState,
	cache::{Cache, CacheKey},
	call::{CallArgs, CallDescriptor, CallRegistry},
	classify,
	config::{ApiEndpoint, ClientConfig},
	http::ApiHttpClient,
	oauth::OAuthSession,
	obs::{self, CallKind, CallOutcome, CallSpan},
	pagination,
	response::Response,
};

/// Cheaply cloneable handle for invoking API operations by name.
///
/// Clones share the same session (and therefore the same token state), cache, and registry.
#[derive(Clone, Debug)]
pub struct Client {
	config: Arc<ClientConfig>,
	endpoint: Arc<ApiEndpoint>,
	session: Arc<OAuthSession>,
	cache: Arc<Cache>,
	registry: Arc<CallRegistry>,
}
impl Client {
	/// Builds a client backed by the reqwest transport.
	#[cfg(feature = "reqwest")]
	pub fn new(config: ClientConfig) -> Result<Self> {
		let transport = crate::http::ReqwestHttpClient::build(config.user_agent.as_deref())?;

		Self::with_http_client(config, Arc::new(transport))
	}

	/// Builds a client over a custom transport.
	///
	/// The client starts without a token, uses [`Cache::global`] and [`CallRegistry::global`].
	pub fn with_http_client(config: ClientConfig, transport: Arc<dyn ApiHttpClient>) -> Result<Self> {
		config.validate()?;

		let endpoint = ApiEndpoint::from_config(&config)?;
		let session = OAuthSession::new(&config, transport)?;

		Ok(Self {
			config: Arc::new(config),
			endpoint: Arc::new(endpoint),
			session: Arc::new(session),
			cache: Cache::global(),
			registry: CallRegistry::global(),
		})
	}

	/// Installs the token state requests are authenticated with.
	pub fn with_token(self, token: TokenState) -> Self {
		self.session.set_token(Some(token));

		self
	}

	/// Registers a callback receiving every refreshed token state.
	pub fn on_token_refresh<F>(self, callback: F) -> Self
	where
		F: 'static + Fn(&TokenState) + Send + Sync,
	{
		self.session.set_on_refresh(Arc::new(callback));

		self
	}

	/// Replaces the response cache.
	pub fn with_cache(mut self, cache: Arc<Cache>) -> Self {
		self.cache = cache;

		self
	}

	/// Replaces the operation registry.
	pub fn with_registry(mut self, registry: Arc<CallRegistry>) -> Self {
		self.registry = registry;

		self
	}

	/// Configuration the client was built with.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Operation registry.
	pub fn registry(&self) -> &CallRegistry {
		&self.registry
	}

	/// Response cache.
	pub fn cache(&self) -> &Cache {
		&self.cache
	}

	/// OAuth session owning the token state.
	pub fn session(&self) -> &OAuthSession {
		&self.session
	}

	/// Current token state, reflecting refreshes as soon as they complete.
	pub fn token_state(&self) -> Option<TokenState> {
		self.session.token()
	}

	/// Forces a token refresh.
	pub async fn refresh_token(&self) -> Result<TokenState> {
		self.session.refresh().await
	}

	/// Returns `true` when `operation` resolves in the registry.
	pub fn exists(&self, operation: &str) -> bool {
		self.registry.exists(operation)
	}

	/// Returns `true` when the configured scopes include every scope the registry requires.
	pub fn scopes_cover_registry(&self) -> bool {
		self.config.scopes.covers(&self.registry.scopes())
	}

	/// Scope `descriptor` requires that the configured set lacks.
	///
	/// An empty configured set means the application did not declare its scopes, so nothing is
	/// reported.
	pub fn missing_scope<'a>(&self, descriptor: &'a CallDescriptor) -> Option<&'a str> {
		let scope = descriptor.required_scope.as_deref()?;

		(!self.config.scopes.is_empty() && !self.config.scopes.contains(scope)).then_some(scope)
	}

	/// Returns `true` when both handles share the same underlying client.
	pub fn ptr_eq(&self, other: &Client) -> bool {
		Arc::ptr_eq(&self.session, &other.session)
	}

	/// Invokes `operation` (snake_case or PascalCase) with `args`.
	pub async fn invoke(&self, operation: &str, args: CallArgs) -> Result<Response> {
		self.invoke_with(operation, args, |_| {}).await
	}

	/// Invokes `operation`, passing each item of a non-paginated result to `on_item`.
	///
	/// The hook runs when the result is computed, not when it is served from the cache.
	pub async fn invoke_with<F>(&self, operation: &str, args: CallArgs, on_item: F) -> Result<Response>
	where
		F: FnMut(&Value),
	{
		let descriptor = self.registry.construct(operation, &args)?;

		self.execute_with(descriptor, on_item).await
	}

	/// Executes an already constructed descriptor through the cache.
	pub async fn execute(&self, descriptor: CallDescriptor) -> Result<Response> {
		self.execute_with(descriptor, |_| {}).await
	}

	/// Cache key of `descriptor`; the page cursor is not part of it.
	pub fn cache_key(&self, descriptor: &CallDescriptor) -> Result<CacheKey> {
		let query: Vec<_> =
			descriptor.query.iter().map(|(name, value)| (name.clone(), value.clone())).collect();
		let url = self.endpoint.build_url(&descriptor.path, &query)?;

		Ok(CacheKey::new(descriptor.method, &url, descriptor.body.as_ref()))
	}

	async fn execute_with<F>(&self, mut descriptor: CallDescriptor, mut on_item: F) -> Result<Response>
	where
		F: FnMut(&Value),
	{
		let kind = if descriptor.paginated { CallKind::Paginated } else { CallKind::Single };
		let span = CallSpan::new(kind, &descriptor.operation);

		obs::record_call_outcome(kind, CallOutcome::Attempt);

		if let Some(scope) = self.missing_scope(&descriptor) {
			obs::log_missing_scope(&descriptor.operation, scope);
		}

		let result = span
			.instrument(async move {
				let key = self.cache_key(&descriptor)?;
				let ttl = descriptor.cache_duration;

				self.cache
					.fetch(&key, ttl, move || async move {
						if descriptor.paginated {
							pagination::paginate(&mut descriptor, self.config.max_pages, |page| {
								self.execute_page(page)
							})
							.await
						} else {
							let response = self.execute_page(descriptor).await?;

							response.for_each_item(&mut on_item);

							Ok(response)
						}
					})
					.await
			})
			.await;

		match &result {
			Ok(_) => obs::record_call_outcome(kind, CallOutcome::Success),
			Err(_) => obs::record_call_outcome(kind, CallOutcome::Failure),
		}

		result
	}

	async fn execute_page(&self, call: CallDescriptor) -> Result<Response> {
		let url = self.endpoint.build_url(&call.path, &call.query_pairs())?;
		let raw = self.session.execute(call.method, &url, call.body.as_ref()).await?;
		let response = Response::from_http(raw, call)?;

		if response.is_success() {
			Ok(response)
		} else {
			Err(classify::response_error(response).into())
		}
	}
}
