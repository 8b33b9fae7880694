//! Endpoint templates and the factory contract used by the registry.

// self
use crate::{
	_prelude::*,
	call::{CallArgs, CallDescriptor, HttpMethod},
	error::ConfigError,
};

/// Builds a [`CallDescriptor`] from caller arguments.
///
/// [`CallTemplate`] covers every catalog endpoint; closures with the matching signature
/// are factories too, for endpoints whose arguments need custom handling.
pub trait CallFactory: Send + Sync {
	/// Constructs the descriptor for one invocation.
	fn construct(&self, args: &CallArgs) -> Result<CallDescriptor, ConfigError>;
}
impl<F> CallFactory for F
where
	F: Fn(&CallArgs) -> Result<CallDescriptor, ConfigError> + Send + Sync,
{
	fn construct(&self, args: &CallArgs) -> Result<CallDescriptor, ConfigError> {
		self(args)
	}
}

/// Errors raised while validating templates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum CallTemplateError {
	/// Operation names must canonicalize to non-empty ASCII alphanumerics.
	#[error("Operation name `{name}` is invalid.")]
	InvalidName {
		/// Offending name.
		name: String,
	},
	/// Path templates must be absolute.
	#[error("Path template `{path}` must start with `/`.")]
	RelativePath {
		/// Offending template.
		path: String,
	},
	/// Braces must pair up around non-empty placeholder names.
	#[error("Path template `{path}` has malformed placeholders.")]
	MalformedPlaceholder {
		/// Offending template.
		path: String,
	},
	/// Scopes cannot contain whitespace.
	#[error("Scope `{scope}` is invalid.")]
	InvalidScope {
		/// Offending scope.
		scope: String,
	},
	/// Cache durations cannot be negative.
	#[error("Cache duration must not be negative.")]
	NegativeCacheDuration,
	/// Only `GET` endpoints can be walked page by page.
	#[error("Only GET endpoints can be paginated.")]
	PaginatedNonGet,
}

/// Static metadata for one remote operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallTemplate {
	/// Canonical operation identifier.
	pub name: String,
	/// HTTP method.
	pub method: HttpMethod,
	/// Path with `{placeholder}` segments.
	pub path: String,
	/// Scope the access token must carry.
	pub required_scope: Option<String>,
	/// Cache duration for successful results.
	pub cache_duration: Duration,
	/// Whether the endpoint is paginated.
	pub paginated: bool,
}
impl CallTemplate {
	/// Creates a builder for a `GET` endpoint.
	pub fn get(name: impl AsRef<str>, path: impl Into<String>) -> CallTemplateBuilder {
		CallTemplateBuilder::new(name, HttpMethod::Get, path)
	}

	/// Creates a builder for a `POST` endpoint.
	pub fn post(name: impl AsRef<str>, path: impl Into<String>) -> CallTemplateBuilder {
		CallTemplateBuilder::new(name, HttpMethod::Post, path)
	}

	/// Placeholder names in declaration order.
	pub fn placeholders(&self) -> Vec<&str> {
		let mut names = Vec::new();
		let mut rest = self.path.as_str();

		while let Some(start) = rest.find('{') {
			let Some(len) = rest[start..].find('}') else { break };

			names.push(&rest[start + 1..start + len]);
			rest = &rest[start + len + 1..];
		}

		names
	}

	fn validate(&self) -> Result<(), CallTemplateError> {
		if self.name.is_empty() || !self.name.chars().all(|c| c.is_ascii_alphanumeric()) {
			return Err(CallTemplateError::InvalidName { name: self.name.clone() });
		}
		if !self.path.starts_with('/') {
			return Err(CallTemplateError::RelativePath { path: self.path.clone() });
		}

		validate_placeholders(&self.path)?;

		if let Some(scope) = self
			.required_scope
			.as_ref()
			.filter(|scope| scope.is_empty() || scope.chars().any(char::is_whitespace))
		{
			return Err(CallTemplateError::InvalidScope { scope: scope.clone() });
		}
		if self.cache_duration.is_negative() {
			return Err(CallTemplateError::NegativeCacheDuration);
		}
		if self.paginated && self.method != HttpMethod::Get {
			return Err(CallTemplateError::PaginatedNonGet);
		}

		Ok(())
	}
}
impl CallFactory for CallTemplate {
	fn construct(&self, args: &CallArgs) -> Result<CallDescriptor, ConfigError> {
		let placeholders = self.placeholders();
		let mut path = self.path.clone();

		for name in &placeholders {
			let value = args.params.get(*name).ok_or_else(|| ConfigError::MissingArgument {
				operation: self.name.clone(),
				argument: (*name).to_owned(),
			})?;

			if matches!(value.as_str(), "" | "." | "..") || value.contains(['/', '?', '#']) {
				return Err(ConfigError::InvalidArgument {
					operation: self.name.clone(),
					argument: (*name).to_owned(),
				});
			}

			path = path.replace(&format!("{{{name}}}"), value);
		}

		let query = args
			.params
			.iter()
			.filter(|(name, _)| !placeholders.contains(&name.as_str()))
			.map(|(name, value)| (name.clone(), value.clone()))
			.collect();

		Ok(CallDescriptor {
			operation: self.name.clone(),
			method: self.method,
			path,
			query,
			body: args.body.clone(),
			required_scope: self.required_scope.clone(),
			cache_duration: self.cache_duration,
			paginated: self.paginated,
			current_page: 1,
		})
	}
}

/// Builder for [`CallTemplate`] values.
#[derive(Debug)]
pub struct CallTemplateBuilder {
	template: CallTemplate,
}
impl CallTemplateBuilder {
	/// Creates a builder; `name` is canonicalized to PascalCase.
	pub fn new(name: impl AsRef<str>, method: HttpMethod, path: impl Into<String>) -> Self {
		Self {
			template: CallTemplate {
				name: crate::call::canonical_name(name.as_ref()),
				method,
				path: path.into(),
				required_scope: None,
				cache_duration: Duration::ZERO,
				paginated: false,
			},
		}
	}

	/// Declares the scope the access token must carry.
	pub fn scope(mut self, scope: impl Into<String>) -> Self {
		self.template.required_scope = Some(scope.into());

		self
	}

	/// Sets how long successful results stay cached.
	pub fn cache_for(mut self, duration: Duration) -> Self {
		self.template.cache_duration = duration;

		self
	}

	/// Marks the endpoint as paginated.
	pub fn paginated(mut self) -> Self {
		self.template.paginated = true;

		self
	}

	/// Consumes the builder and validates the template.
	pub fn build(self) -> Result<CallTemplate, CallTemplateError> {
		self.template.validate()?;

		Ok(self.template)
	}
}

fn validate_placeholders(path: &str) -> Result<(), CallTemplateError> {
	let mut open = None;

	for (idx, ch) in path.char_indices() {
		match (ch, open) {
			('{', None) => open = Some(idx),
			('}', Some(start)) if idx > start + 1 => open = None,
			('{', Some(_)) | ('}', _) =>
				return Err(CallTemplateError::MalformedPlaceholder { path: path.to_owned() }),
			_ => {},
		}
	}

	match open {
		Some(_) => Err(CallTemplateError::MalformedPlaceholder { path: path.to_owned() }),
		None => Ok(()),
	}
}
