//! Page-by-page aggregation for paginated operations.

// self
use crate::{_prelude::*, call::CallDescriptor, response::Response};

/// Walks pages starting at 1 until a page carries no data, merging pages in order.
///
/// `execute_one` receives the descriptor with `current_page` set for the request. The first
/// page becomes the accumulator verbatim; when it is already empty it is returned as is.
/// Any failure aborts the walk and discards the pages merged so far. With `max_pages` set,
/// a non-empty page beyond the ceiling fails with [`Error::PageLimitExceeded`].
pub async fn paginate<F, Fut>(
	descriptor: &mut CallDescriptor,
	max_pages: Option<u32>,
	mut execute_one: F,
) -> Result<Response>
where
	F: FnMut(CallDescriptor) -> Fut,
	Fut: Future<Output = Result<Response>>,
{
	descriptor.current_page = 1;

	let mut merged: Option<Response> = None;

	loop {
		let page = execute_one(descriptor.clone()).await?;

		if page.is_empty() {
			return Ok(merged.unwrap_or(page));
		}
		if let Some(limit) = max_pages.filter(|limit| descriptor.current_page > *limit) {
			return Err(Error::PageLimitExceeded { operation: descriptor.operation.clone(), limit });
		}

		if let Some(acc) = merged.as_mut() {
			acc.merge(page);
		} else {
			merged = Some(page);
		}

		descriptor.current_page += 1;
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::collections::VecDeque;
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::{
		call::HttpMethod,
		classify::ErrorKind,
		error::ApiError,
	};

	fn descriptor() -> CallDescriptor {
		let mut call = CallDescriptor::new("MarketOrders", HttpMethod::Get, "/markets/10000002/orders/");

		call.paginated = true;
		call.current_page = 7;

		call
	}

	async fn walk(pages: Vec<Result<Value>>, max_pages: Option<u32>) -> (Result<Response>, Vec<u32>) {
		let mut script = VecDeque::from(pages);
		let mut seen = Vec::new();
		let mut call = descriptor();
		let result = paginate(&mut call, max_pages, |page| {
			seen.push(page.current_page);

			let next = script.pop_front().unwrap_or_else(|| Ok(json!([])));

			async move {
				next.map(|data| Response {
					status: 200,
					headers: [("x-page".to_owned(), page.current_page.to_string())].into_iter().collect(),
					data,
					call: page,
				})
			}
		})
		.await;

		(result, seen)
	}

	#[tokio::test]
	async fn pages_concatenate_until_an_empty_page() {
		let (result, seen) =
			walk(vec![Ok(json!(["a", "b"])), Ok(json!(["c"])), Ok(json!([]))], None).await;
		let merged = result.expect("Walk should succeed.");

		assert_eq!(merged.data, json!(["a", "b", "c"]));
		assert_eq!(seen, vec![1, 2, 3]);
		assert_eq!(merged.header("x-page"), Some("2"));
	}

	#[tokio::test]
	async fn empty_first_page_is_returned_verbatim() {
		let (result, seen) = walk(vec![Ok(Value::Null)], None).await;

		assert_eq!(result.expect("Empty walk should succeed.").data, Value::Null);
		assert_eq!(seen, vec![1]);
	}

	#[tokio::test]
	async fn failures_discard_partial_pages() {
		let (result, seen) = walk(
			vec![
				Ok(json!([1])),
				Err(ApiError::new(ErrorKind::TemporaryServer, "Bad gateway.").into()),
				Ok(json!([3])),
			],
			None,
		)
		.await;

		assert_eq!(result.expect_err("Failure must abort.").kind(), Some(ErrorKind::TemporaryServer));
		assert_eq!(seen, vec![1, 2]);
	}

	#[tokio::test]
	async fn ceiling_bounds_non_empty_pages() {
		let pages = || vec![Ok(json!([1])), Ok(json!([2])), Ok(json!([3])), Ok(json!([]))];
		let (result, seen) = walk(pages(), Some(2)).await;

		assert!(matches!(
			result,
			Err(Error::PageLimitExceeded { ref operation, limit: 2 }) if operation == "MarketOrders"
		));
		assert_eq!(seen, vec![1, 2, 3]);

		let (result, _) = walk(pages(), Some(3)).await;

		assert_eq!(result.expect("Three data pages fit.").data, json!([1, 2, 3]));
	}
}
