//! Operation-name lookup table.

// std
use std::sync::OnceLock;
// self
use crate::{
	_prelude::*,
	auth::ScopeSet,
	call::{CallArgs, CallDescriptor, CallFactory, CallTemplate},
	classify::ErrorKind,
	error::ApiError,
};

/// Maps canonical operation identifiers onto descriptor factories.
///
/// Registration happens while building the registry; afterwards it is an immutable
/// lookup table that can be shared freely.
#[derive(Clone, Default)]
pub struct CallRegistry {
	entries: HashMap<String, Arc<dyn CallFactory>>,
	scopes: BTreeMap<String, String>,
}
impl CallRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Process-wide registry holding the standard catalog, built on first use.
	pub fn global() -> Arc<CallRegistry> {
		static GLOBAL: OnceLock<Arc<CallRegistry>> = OnceLock::new();

		GLOBAL.get_or_init(|| Arc::new(crate::call::catalog::standard())).clone()
	}

	/// Registers a template under its canonical name, replacing any previous entry.
	pub fn register(mut self, template: CallTemplate) -> Self {
		let name = template.name.clone();

		match &template.required_scope {
			Some(scope) => self.scopes.insert(name.clone(), scope.clone()),
			None => self.scopes.remove(&name),
		};

		self.entries.insert(name, Arc::new(template));

		self
	}

	/// Registers a custom factory under the canonical form of `operation`.
	pub fn register_factory(
		mut self,
		operation: impl AsRef<str>,
		factory: impl 'static + CallFactory,
	) -> Self {
		let name = canonical_name(operation.as_ref());

		self.scopes.remove(&name);
		self.entries.insert(name, Arc::new(factory));

		self
	}

	/// Resolves `operation` (snake_case or PascalCase) to its factory.
	pub fn resolve(&self, operation: &str) -> Result<Arc<dyn CallFactory>> {
		self.entries.get(&canonical_name(operation)).cloned().ok_or_else(|| {
			ApiError::new(
				ErrorKind::NotFound,
				format!("Operation `{operation}` is not registered."),
			)
			.into()
		})
	}

	/// Returns `true` when `operation` resolves.
	pub fn exists(&self, operation: &str) -> bool {
		self.entries.contains_key(&canonical_name(operation))
	}

	/// Resolves `operation` and builds its descriptor from `args`.
	pub fn construct(&self, operation: &str, args: &CallArgs) -> Result<CallDescriptor> {
		let mut descriptor = self.resolve(operation)?.construct(args)?;

		descriptor.operation = canonical_name(operation);

		Ok(descriptor)
	}

	/// Canonical identifiers of every registered operation, sorted.
	pub fn names(&self) -> Vec<&str> {
		let mut names: Vec<_> = self.entries.keys().map(String::as_str).collect();

		names.sort_unstable();

		names
	}

	/// Union of the scopes declared by registered templates.
	pub fn scopes(&self) -> ScopeSet {
		ScopeSet::new(self.scopes.values().cloned()).unwrap_or_default()
	}

	/// Number of registered operations.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns `true` when nothing is registered.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}
impl Debug for CallRegistry {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CallRegistry").field("operations", &self.names()).finish()
	}
}

/// Converts `snake_case` operation names to `PascalCase`; PascalCase input is unchanged.
pub fn canonical_name(operation: &str) -> String {
	let mut name = String::with_capacity(operation.len());

	for segment in operation.split('_').filter(|segment| !segment.is_empty()) {
		let mut chars = segment.chars();

		if let Some(first) = chars.next() {
			name.extend(first.to_uppercase());
			name.push_str(chars.as_str());
		}
	}

	name
}
