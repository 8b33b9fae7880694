//! Decoded API responses and page merging.

// crates.io
use oauth2::HttpResponse;
// self
use crate::{
	_prelude::*,
	call::CallDescriptor,
	classify::ErrorKind,
	error::ApiError,
};

/// Decoded response for one call (or the concatenation of its pages).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
	/// HTTP status of the latest page.
	pub status: u16,
	/// Lower-cased response headers of the latest page.
	pub headers: BTreeMap<String, String>,
	/// Decoded JSON payload; `null` for empty bodies.
	pub data: Value,
	/// Descriptor of the call that produced the response.
	pub call: CallDescriptor,
}
impl Response {
	/// Decodes a raw HTTP response produced for `call`.
	///
	/// Success bodies must be JSON; failure bodies that are not JSON are kept as a string
	/// payload so classification can still run.
	pub fn from_http(raw: HttpResponse, call: CallDescriptor) -> Result<Self, ApiError> {
		let status = raw.status();
		let mut headers = BTreeMap::new();

		for (name, value) in raw.headers() {
			let Ok(value) = value.to_str() else { continue };

			headers
				.entry(name.as_str().to_owned())
				.and_modify(|existing: &mut String| {
					existing.push_str(", ");
					existing.push_str(value);
				})
				.or_insert_with(|| value.to_owned());
		}

		let body = raw.body();
		let data = if body.iter().all(u8::is_ascii_whitespace) {
			Value::Null
		} else {
			let mut de = serde_json::Deserializer::from_slice(body);
			let decoded: Result<Value, _> = serde_path_to_error::deserialize(&mut de);

			match decoded {
				Ok(value) => value,
				Err(_) if !status.is_success() =>
					Value::String(String::from_utf8_lossy(body).into_owned()),
				Err(err) =>
					return Err(ApiError::new(
						ErrorKind::Unknown,
						format!("`{}` returned a body that is not valid JSON.", call.operation),
					)
					.with_source(err)),
			}
		};

		Ok(Self { status: status.as_u16(), headers, data, call })
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Returns `true` when the payload carries no data (`null`, `[]`, `{}`).
	pub fn is_empty(&self) -> bool {
		match &self.data {
			Value::Null => true,
			Value::Array(items) => items.is_empty(),
			Value::Object(fields) => fields.is_empty(),
			_ => false,
		}
	}

	/// Number of items in a sequence payload; `1` for any other non-empty payload.
	pub fn len(&self) -> usize {
		match &self.data {
			Value::Array(items) => items.len(),
			_ if self.is_empty() => 0,
			_ => 1,
		}
	}

	/// Case-insensitive header lookup.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
	}

	/// Appends `next`'s data to this response and adopts its status and headers.
	///
	/// Sequence payloads are concatenated in order without deduplication; for any other
	/// payload shape the later data replaces the earlier one.
	pub fn merge(&mut self, next: Response) {
		match (&mut self.data, next.data) {
			(Value::Array(items), Value::Array(more)) => items.extend(more),
			(data, other) => *data = other,
		}

		self.status = next.status;
		self.headers = next.headers;
	}

	/// Invokes `f` once per item of a sequence payload, or once for any other non-empty
	/// payload.
	pub fn for_each_item<F>(&self, mut f: F)
	where
		F: FnMut(&Value),
	{
		match &self.data {
			Value::Array(items) => items.iter().for_each(f),
			_ if self.is_empty() => {},
			data => f(data),
		}
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::call::HttpMethod;

	fn call() -> CallDescriptor {
		CallDescriptor::new("MarketOrders", HttpMethod::Get, "/markets/10000002/orders/")
	}

	fn page(status: u16, data: Value, marker: &str) -> Response {
		let headers = BTreeMap::from([("x-page-marker".to_owned(), marker.to_owned())]);

		Response { status, headers, data, call: call() }
	}

	fn raw(status: u16, body: &str) -> HttpResponse {
		let mut response = HttpResponse::new(body.as_bytes().to_vec());

		*response.status_mut() =
			oauth2::http::StatusCode::from_u16(status).expect("Status fixture should be valid.");
		response
			.headers_mut()
			.insert("x-pages", oauth2::http::HeaderValue::from_static("3"));

		response
	}

	#[test]
	fn merge_concatenates_in_order_and_keeps_latest_headers() {
		let mut merged = page(200, json!([1, 2]), "first");

		merged.merge(page(200, json!([2, 3]), "second"));

		assert_eq!(merged.data, json!([1, 2, 2, 3]));
		assert_eq!(merged.header("X-Page-Marker"), Some("second"));
		assert_eq!(merged.len(), 4);
	}

	#[test]
	fn emptiness_covers_null_and_empty_collections() {
		assert!(page(200, Value::Null, "").is_empty());
		assert!(page(200, json!([]), "").is_empty());
		assert!(page(200, json!({}), "").is_empty());
		assert!(!page(200, json!(0), "").is_empty());
		assert!(!page(200, json!([{}]), "").is_empty());
	}

	#[test]
	fn decodes_json_bodies_and_headers() {
		let response = Response::from_http(raw(200, "[{\"order_id\":1}]"), call())
			.expect("JSON body should decode.");

		assert_eq!(response.data, json!([{ "order_id": 1 }]));
		assert_eq!(response.header("x-pages"), Some("3"));
		assert!(response.is_success());

		let empty = Response::from_http(raw(204, ""), call()).expect("Empty body should decode.");

		assert_eq!(empty.data, Value::Null);
	}

	#[test]
	fn non_json_bodies_only_fail_on_success() {
		let failure = Response::from_http(raw(502, "<html>Bad Gateway</html>"), call())
			.expect("Failure bodies should never fail decoding.");

		assert_eq!(failure.data, json!("<html>Bad Gateway</html>"));

		let err = Response::from_http(raw(200, "not json"), call())
			.expect_err("Success bodies must be JSON.");

		assert_eq!(err.kind, ErrorKind::Unknown);
		assert!(err.source.is_some());
	}

	#[test]
	fn for_each_item_visits_sequence_items_or_single_payload() {
		let mut seen = Vec::new();

		page(200, json!(["a", "b"]), "").for_each_item(|item| seen.push(item.clone()));
		page(200, json!({ "id": 7 }), "").for_each_item(|item| seen.push(item.clone()));
		page(200, Value::Null, "").for_each_item(|item| seen.push(item.clone()));

		assert_eq!(seen, vec![json!("a"), json!("b"), json!({ "id": 7 })]);
	}
}
