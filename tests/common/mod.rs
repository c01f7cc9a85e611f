//! Shared fixtures: a scripted token source and paused-clock manager builders.

#![allow(dead_code)]

// std
use std::time::Duration as StdDuration;
// crates.io
use time::macros;
use tokio::sync::{mpsc, oneshot};
// self
use ip_protection_cache::{
	BlindSignedAuthToken, CacheConfig, TokenCacheManager, TokenSource, TokioClock,
	source::{ProxyListResult, SourceFuture, TokenBatchResult},
};

pub use std::sync::Arc;

pub use ip_protection_cache::Clock;

pub use time::{Duration, OffsetDateTime};

/// Wall-clock instant the paused Tokio clock is anchored at.
pub const ANCHOR: OffsetDateTime = macros::datetime!(2025-11-10 12:00 UTC);

/// Upper bound on how long (in paused time) a test waits for the manager to act.
const WAIT_LIMIT: StdDuration = StdDuration::from_secs(24 * 60 * 60);

/// A token request captured by [`MockTokenSource`]; the test decides the response.
pub struct TokenRequest {
	pub batch_size: u32,
	pub requested_at: OffsetDateTime,
	responder: oneshot::Sender<TokenBatchResult>,
}
impl TokenRequest {
	pub fn respond(self, result: TokenBatchResult) {
		self.responder.send(result).unwrap_or_else(|_| panic!("Manager dropped the token request."));
	}
}

/// A proxy list request captured by [`MockTokenSource`].
pub struct ProxyRequest {
	pub requested_at: OffsetDateTime,
	responder: oneshot::Sender<ProxyListResult>,
}
impl ProxyRequest {
	pub fn respond(self, result: ProxyListResult) {
		self.responder.send(result).unwrap_or_else(|_| panic!("Manager dropped the proxy request."));
	}
}

/// Token source that forwards every call to the test through channels.
///
/// Calls whose request is dropped by the test never resolve.
pub struct MockTokenSource {
	clock: TokioClock,
	token_requests: mpsc::UnboundedSender<TokenRequest>,
	proxy_requests: mpsc::UnboundedSender<ProxyRequest>,
}
impl TokenSource for MockTokenSource {
	fn try_get_auth_tokens(&self, batch_size: u32) -> SourceFuture<'_, TokenBatchResult> {
		let (responder, rx) = oneshot::channel();
		let request = TokenRequest { batch_size, requested_at: self.clock.now(), responder };
		let _ = self.token_requests.send(request);

		Box::pin(async move {
			match rx.await {
				Ok(result) => result,
				Err(_) => std::future::pending().await,
			}
		})
	}

	fn get_proxy_list(&self) -> SourceFuture<'_, ProxyListResult> {
		let (responder, rx) = oneshot::channel();
		let request = ProxyRequest { requested_at: self.clock.now(), responder };
		let _ = self.proxy_requests.send(request);

		Box::pin(async move {
			match rx.await {
				Ok(result) => result,
				Err(_) => std::future::pending().await,
			}
		})
	}
}

/// Test-side ends of the [`MockTokenSource`] channels.
pub struct SourceHandle {
	token_requests: mpsc::UnboundedReceiver<TokenRequest>,
	proxy_requests: mpsc::UnboundedReceiver<ProxyRequest>,
}
impl SourceHandle {
	/// Waits (advancing paused time as needed) for the next token request.
	pub async fn next_token_request(&mut self) -> TokenRequest {
		tokio::time::timeout(WAIT_LIMIT, self.token_requests.recv())
			.await
			.expect("Manager should request tokens before the wait limit.")
			.expect("Token source channel should stay open.")
	}

	/// Waits (advancing paused time as needed) for the next proxy list request.
	pub async fn next_proxy_request(&mut self) -> ProxyRequest {
		tokio::time::timeout(WAIT_LIMIT, self.proxy_requests.recv())
			.await
			.expect("Manager should request the proxy list before the wait limit.")
			.expect("Proxy request channel should stay open.")
	}

	/// Lets spawned tasks run, then reports whether a token request is queued.
	pub async fn has_token_request(&mut self) -> bool {
		settle().await;

		!self.token_requests.is_empty()
	}

	/// Lets spawned tasks run, then reports whether a proxy request is queued.
	pub async fn has_proxy_request(&mut self) -> bool {
		settle().await;

		!self.proxy_requests.is_empty()
	}
}

/// Creates a mock source reading the paused clock, plus the handle that answers it.
pub fn mock_source(clock: TokioClock) -> (Arc<MockTokenSource>, SourceHandle) {
	let (token_tx, token_rx) = mpsc::unbounded_channel();
	let (proxy_tx, proxy_rx) = mpsc::unbounded_channel();
	let source =
		Arc::new(MockTokenSource { clock, token_requests: token_tx, proxy_requests: proxy_tx });

	(source, SourceHandle { token_requests: token_rx, proxy_requests: proxy_rx })
}

/// Builds a validated configuration with the given batch size and low-water mark.
pub fn config(batch_size: u32, low_water_mark: usize) -> CacheConfig {
	CacheConfig::builder()
		.batch_size(batch_size)
		.low_water_mark(low_water_mark)
		.build()
		.expect("Test configuration should validate.")
}

/// Token expiring `offset` after the current paused-clock instant.
pub fn token_in(clock: &TokioClock, offset: Duration) -> BlindSignedAuthToken {
	let expiration = clock.now() + offset;

	BlindSignedAuthToken::new(format!("token-{}", expiration.unix_timestamp()), expiration)
}

/// Registers a one-shot refill hook and returns a receiver resolved when it fires.
pub fn cache_refilled(manager: &TokenCacheManager) -> oneshot::Receiver<()> {
	let (tx, rx) = oneshot::channel();

	manager.set_on_cache_refilled_for_testing(move || {
		let _ = tx.send(());
	});

	rx
}

/// Registers a one-shot proxy hook and returns a receiver resolved when it fires.
pub fn proxy_list_refreshed(manager: &TokenCacheManager) -> oneshot::Receiver<()> {
	let (tx, rx) = oneshot::channel();

	manager.set_on_proxy_list_refreshed_for_testing(move || {
		let _ = tx.send(());
	});

	rx
}

/// Asserts a paused-clock interval matches `expected` up to timer-wheel rounding.
pub fn assert_elapsed(actual: Duration, expected: Duration) {
	assert!(
		actual >= expected && actual <= expected + Duration::milliseconds(5),
		"Expected {expected} to elapse, observed {actual}."
	);
}

/// Yields enough times for freshly spawned tasks to run to their next suspension point.
pub async fn settle() {
	for _ in 0..16 {
		tokio::task::yield_now().await;
	}
}
