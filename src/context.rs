//! Thread-local "current client" binding.
//!
//! [`with_client`] and [`scoped`] restore the previous binding on every exit path; prefer them
//! over [`switch_to`], which rebinds the slot until the next switch.

// std
use std::{
	cell::RefCell,
	task::{Context, Poll},
};
// self
use crate::{_prelude::*, client::Client};

thread_local! {
	static CURRENT: RefCell<Option<Client>> = const { RefCell::new(None) };
}

/// Returns the client bound to this thread, creating a default one on first use.
///
/// The default client uses [`ClientConfig::default`](crate::config::ClientConfig) over the
/// reqwest transport; without the `reqwest` feature an unbound thread yields
/// [`ConfigError::NoCurrentClient`](crate::error::ConfigError::NoCurrentClient).
pub fn current() -> Result<Client> {
	if let Some(client) = CURRENT.with(|slot| slot.borrow().clone()) {
		return Ok(client);
	}

	let client = default_client()?;

	Ok(CURRENT.with(|slot| slot.borrow_mut().get_or_insert(client).clone()))
}

/// Binds `client` to this thread, returning the previous binding.
pub fn switch_to(client: Client) -> Option<Client> {
	CURRENT.with(|slot| slot.borrow_mut().replace(client))
}

/// Runs `body` with `client` bound, restoring the previous binding afterwards (including on
/// unwind).
pub fn with_client<T>(client: Client, body: impl FnOnce() -> T) -> T {
	let _restore = Restore(Some(CURRENT.with(|slot| slot.borrow_mut().replace(client))));

	body()
}

/// Wraps `future` so `client` is bound only while it is being polled.
pub fn scoped<F>(client: Client, future: F) -> Scoped<F>
where
	F: Future,
{
	Scoped { client, future: Box::pin(future) }
}

/// Future returned by [`scoped`].
#[derive(Debug)]
pub struct Scoped<F> {
	client: Client,
	future: Pin<Box<F>>,
}
impl<F> Future for Scoped<F>
where
	F: Future,
{
	type Output = F::Output;

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		let this = self.get_mut();
		let future = &mut this.future;

		with_client(this.client.clone(), || future.as_mut().poll(cx))
	}
}

struct Restore(Option<Option<Client>>);
impl Drop for Restore {
	fn drop(&mut self) {
		if let Some(previous) = self.0.take() {
			// The slot may already be gone during thread teardown.
			let _ = CURRENT.try_with(|slot| *slot.borrow_mut() = previous);
		}
	}
}

#[cfg(feature = "reqwest")]
fn default_client() -> Result<Client> {
	Client::new(Default::default())
}

#[cfg(not(feature = "reqwest"))]
fn default_client() -> Result<Client> {
	Err(crate::error::ConfigError::NoCurrentClient.into())
}
