//! Token source contract: the asynchronous collaborator that mints token batches and serves the
//! proxy list.
//!
//! Implementations bring their own transport. The cache only needs two calls, each resolving to
//! data or to a failure the cache can absorb: a decline carrying a [`RetryDirective`] (applied as
//! backoff) or a [`SourceError`] (the stale proxy list keeps serving).

// self
use crate::{_prelude::*, auth::BlindSignedAuthToken};

/// Boxed future returned by [`TokenSource`] calls.
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a + Send>>;

/// Outcome of [`TokenSource::try_get_auth_tokens`].
pub type TokenBatchResult = Result<Vec<BlindSignedAuthToken>, RetryDirective>;

/// Outcome of [`TokenSource::get_proxy_list`].
pub type ProxyListResult = Result<Vec<String>, SourceError>;

/// Asynchronous provider of blind-signed tokens and proxy addresses.
pub trait TokenSource
where
	Self: Send + Sync,
{
	/// Requests up to `batch_size` tokens.
	///
	/// Sources may return fewer tokens than requested and in any order. A decline must carry the
	/// instant before which the cache should not ask again.
	fn try_get_auth_tokens(&self, batch_size: u32) -> SourceFuture<'_, TokenBatchResult>;

	/// Fetches the current proxy address list.
	fn get_proxy_list(&self) -> SourceFuture<'_, ProxyListResult>;
}

/// Advises the cache when it may retry after a token source declines.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryDirective {
	/// Instant when it is safe to retry.
	pub earliest_retry_at: OffsetDateTime,
	/// Optional descriptive string.
	pub reason: Option<String>,
}
impl RetryDirective {
	/// Creates a new directive for the provided retry instant.
	pub fn new(earliest_retry_at: OffsetDateTime) -> Self {
		Self { earliest_retry_at, reason: None }
	}

	/// Adds a human-readable reason.
	pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
		self.reason = Some(reason.into());

		self
	}
}

/// Failure payload returned by token sources for proxy list fetches.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum SourceError {
	/// The upstream issuer could not be reached.
	#[error("Token source is unavailable: {message}.")]
	Unavailable {
		/// Human-readable error payload.
		message: String,
	},
	/// The source reached its backend but the call failed.
	#[error("Token source backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn retry_directive_carries_reason() {
		let at = macros::datetime!(2025-01-01 00:01 UTC);
		let directive = RetryDirective::new(at).with_reason("issuer rate limited");

		assert_eq!(directive.earliest_retry_at, at);
		assert_eq!(directive.reason.as_deref(), Some("issuer rate limited"));
	}

	#[test]
	fn source_error_messages_include_payload() {
		let err = SourceError::Backend { message: "HTTP 503".into() };

		assert_eq!(err.to_string(), "Token source backend failure: HTTP 503.");
	}
}
