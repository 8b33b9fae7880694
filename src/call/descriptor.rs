//! Resolved call descriptors and caller-supplied arguments.

// self
use crate::_prelude::*;

/// HTTP methods used by API operations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
	#[default]
	/// `GET`
	Get,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `DELETE`
	Delete,
}
impl HttpMethod {
	/// Returns the wire name of the method.
	pub const fn as_str(self) -> &'static str {
		match self {
			HttpMethod::Get => "GET",
			HttpMethod::Post => "POST",
			HttpMethod::Put => "PUT",
			HttpMethod::Delete => "DELETE",
		}
	}

	pub(crate) fn to_http(self) -> oauth2::http::Method {
		match self {
			HttpMethod::Get => oauth2::http::Method::GET,
			HttpMethod::Post => oauth2::http::Method::POST,
			HttpMethod::Put => oauth2::http::Method::PUT,
			HttpMethod::Delete => oauth2::http::Method::DELETE,
		}
	}
}
impl Display for HttpMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Named arguments (path placeholders and query parameters) plus an optional JSON body.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CallArgs {
	/// Argument values keyed by name.
	pub params: BTreeMap<String, String>,
	/// Optional request body.
	pub body: Option<Value>,
}
impl CallArgs {
	/// Creates an empty argument set.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds (or replaces) a named argument.
	pub fn arg(mut self, name: impl Into<String>, value: impl ToString) -> Self {
		self.params.insert(name.into(), value.to_string());

		self
	}

	/// Serializes `body` as the JSON request body.
	pub fn body(mut self, body: impl Serialize) -> Result<Self, crate::error::ConfigError> {
		self.body = Some(
			serde_json::to_value(body).map_err(crate::error::ConfigError::BodySerialization)?,
		);

		Ok(self)
	}
}
impl<K, V> FromIterator<(K, V)> for CallArgs
where
	K: Into<String>,
	V: ToString,
{
	fn from_iter<I>(iter: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
	{
		iter.into_iter().fold(Self::new(), |args, (name, value)| args.arg(name, value))
	}
}

/// Fully resolved request for one operation invocation.
///
/// Everything except `current_page` is fixed at construction; the pagination engine
/// advances `current_page` while walking pages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallDescriptor {
	/// Canonical (PascalCase) operation identifier.
	pub operation: String,
	/// HTTP method.
	pub method: HttpMethod,
	/// Path with every placeholder substituted, relative to the API version root.
	pub path: String,
	/// Query parameters (excluding `datasource` and `page`).
	pub query: BTreeMap<String, String>,
	/// Optional JSON body.
	pub body: Option<Value>,
	/// Scope the access token must carry.
	pub required_scope: Option<String>,
	/// How long a successful result stays cached.
	pub cache_duration: Duration,
	/// Whether the endpoint returns its data in pages.
	pub paginated: bool,
	/// Page cursor, starting at 1.
	pub current_page: u32,
}
impl CallDescriptor {
	/// Creates an uncached, non-paginated descriptor for an already resolved path.
	pub fn new(operation: impl Into<String>, method: HttpMethod, path: impl Into<String>) -> Self {
		Self {
			operation: operation.into(),
			method,
			path: path.into(),
			query: BTreeMap::new(),
			body: None,
			required_scope: None,
			cache_duration: Duration::ZERO,
			paginated: false,
			current_page: 1,
		}
	}

	/// Query parameters for the next request, including `page` for paginated calls.
	pub fn query_pairs(&self) -> Vec<(String, String)> {
		let mut pairs: Vec<_> =
			self.query.iter().map(|(name, value)| (name.clone(), value.clone())).collect();

		if self.paginated {
			pairs.push(("page".into(), self.current_page.to_string()));
		}

		pairs
	}
}
