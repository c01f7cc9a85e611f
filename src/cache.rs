//! In-memory auth token cache with backoff-aware batched refills.
//!
//! [`TokenCacheManager`] keeps blind-signed tokens sorted by expiration and hands them out one at a
//! time. Whenever the queue drops below the configured low-water mark it asks its
//! [`TokenSource`] for another batch, at most one request at a time, and honors the
//! "try again after" instant the source returns when it declines. A re-armable timer wakes the
//! manager exactly when the next token would need eviction or the backoff expires. The same
//! manager refreshes the proxy list on its own cadence (see the `proxy` module) and measures
//! token spend/expiration rates every five minutes.
//!
//! All state sits behind one mutex whose critical sections never await, so transitions are
//! serialized as if they ran on a single sequence. Source calls and timers run as Tokio tasks
//! holding only a weak reference; dropping the manager cancels its timers and discards late
//! responses.

mod proxy;
mod queue;
mod rates;
mod timer;

pub use rates::TokenRates;

// std
use std::{ops::ControlFlow, time::Duration as StdDuration};
// crates.io
use tokio::{runtime::Handle, sync::oneshot};
// self
use crate::{
	_prelude::*,
	auth::BlindSignedAuthToken,
	cache::{proxy::ProxyListState, queue::TokenQueue, rates::RateCounters, timer::Timer},
	clock::{Clock, SystemClock},
	config::{CacheConfig, FRESHNESS_CONSTANT, TOKEN_RATE_MEASUREMENT_INTERVAL},
	obs::{self, CacheTask, FetchOutcome, TaskSpan, trace_event},
	source::{TokenBatchResult, TokenSource},
};

type Hook = Box<dyn FnOnce() + Send>;

/// Point-in-time view of the manager's bookkeeping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheStatus {
	/// Number of cached, unexpired tokens.
	pub cached_tokens: usize,
	/// Backoff deadline set by the last declined fetch.
	pub try_get_auth_tokens_after: Option<OffsetDateTime>,
	/// Whether a token batch request is in flight.
	pub fetching_auth_tokens: bool,
	/// Whether the refill timer is armed.
	pub refill_scheduled: bool,
	/// Whether a proxy list request is in flight.
	pub fetching_proxy_list: bool,
	/// Whether any proxy list fetch has succeeded.
	pub have_fetched_proxy_list: bool,
	/// Instant of the last proxy list request.
	pub last_proxy_list_refresh: Option<OffsetDateTime>,
}

/// Owns the token queue, the proxy list, and the timers that keep both fresh.
///
/// Construct it inside a Tokio runtime; the runtime drives every background task.
pub struct TokenCacheManager {
	inner: Arc<Inner>,
}
impl TokenCacheManager {
	/// Creates a manager with the system clock and all background work enabled.
	///
	/// A missing `source` yields a manager whose operations are no-ops.
	pub fn new(source: Option<Arc<dyn TokenSource>>, config: CacheConfig) -> Result<Self> {
		Self::builder(source, config).build()
	}

	/// Returns a builder for customizing the clock or disabling background work in tests.
	pub fn builder(
		source: Option<Arc<dyn TokenSource>>,
		config: CacheConfig,
	) -> TokenCacheManagerBuilder {
		TokenCacheManagerBuilder::new(source, config)
	}

	/// Purges expired tokens and reports whether one can be served.
	pub fn is_auth_token_available(&self) -> bool {
		let mut state = self.inner.state.lock();

		state.remove_expired_tokens(self.inner.clock.now());

		!state.queue.is_empty()
	}

	/// Moves the earliest-expiring fresh token out of the cache, then checks whether to refill.
	///
	/// `None` means no token is currently available, not an error.
	pub fn get_auth_token(&self) -> Option<BlindSignedAuthToken> {
		let token = {
			let mut state = self.inner.state.lock();

			state.remove_expired_tokens(self.inner.clock.now());

			let token = state.queue.pop_front();

			if token.is_some() {
				state.rates.record_spent();
			}

			token
		};

		#[cfg(feature = "tracing")]
		if let Some(token) = &token {
			tracing::debug!(fingerprint = %token.fingerprint(), "auth token spent");
		}

		self.inner.maybe_refill_cache();

		token
	}

	/// Purges expired tokens and requests a batch if the queue is below the low-water mark and
	/// no backoff applies. Idempotent.
	pub fn maybe_refill_cache(&self) {
		self.inner.maybe_refill_cache();
	}

	/// Re-arms the refill timer for the next eviction, backoff expiry, or immediate refill.
	/// Idempotent.
	pub fn schedule_maybe_refill_cache(&self) {
		self.inner.schedule_maybe_refill_cache();
	}

	/// Clears the backoff deadline and checks whether to refill right away.
	///
	/// Use this when the reason for the decline no longer holds, e.g. the signed-in account
	/// changed.
	pub fn invalidate_try_again_after_time(&self) {
		self.inner.state.lock().try_get_auth_tokens_after = None;
		self.inner.maybe_refill_cache();
	}

	/// Returns `true` once any proxy list fetch has succeeded.
	pub fn is_proxy_list_available(&self) -> bool {
		self.inner.state.lock().proxy.have_fetched()
	}

	/// Returns the last successfully fetched proxy list (empty if none yet).
	pub fn proxy_list(&self) -> Vec<String> {
		self.inner.state.lock().proxy.list().to_vec()
	}

	/// Requests the proxy list now, unless one was requested within the minimum interval.
	pub fn request_refresh_proxy_list(&self) {
		self.inner.request_refresh_proxy_list();
	}

	/// Requests the proxy list now, unless a request is already in flight.
	pub fn refresh_proxy_list(&self) {
		self.inner.refresh_proxy_list();
	}

	/// Closes the current rate window, emitting and returning its per-hour rates.
	pub fn measure_token_rates(&self) -> Option<TokenRates> {
		self.inner.measure_token_rates()
	}

	/// Snapshot of the manager's bookkeeping.
	pub fn status(&self) -> CacheStatus {
		let state = self.inner.state.lock();

		CacheStatus {
			cached_tokens: state.queue.len(),
			try_get_auth_tokens_after: state.try_get_auth_tokens_after,
			fetching_auth_tokens: state.fetching_auth_tokens,
			refill_scheduled: self.inner.refill_timer.is_running(),
			fetching_proxy_list: state.proxy.fetching(),
			have_fetched_proxy_list: state.proxy.have_fetched(),
			last_proxy_list_refresh: state.proxy.last_refresh(),
		}
	}

	/// Registers a hook fired once, after the next token batch response is applied.
	pub fn set_on_cache_refilled_for_testing(&self, hook: impl 'static + Send + FnOnce()) {
		self.inner.state.lock().on_cache_refilled = Some(Box::new(hook));
	}

	/// Registers a hook fired once, after the next proxy list response is applied.
	pub fn set_on_proxy_list_refreshed_for_testing(&self, hook: impl 'static + Send + FnOnce()) {
		self.inner.state.lock().on_proxy_list_refreshed = Some(Box::new(hook));
	}

	/// Forces a token batch request (bypassing the low-water mark, backoff, and the
	/// cache-management switch) and resolves once its response is applied.
	///
	/// Joins the in-flight request instead when one exists. Returns `false` without a source.
	pub async fn fill_cache_for_testing(&self) -> bool {
		let Some(source) = self.inner.source.clone() else {
			return false;
		};
		let (tx, rx) = oneshot::channel();
		let start_fetch = {
			let mut state = self.inner.state.lock();

			state.on_cache_refilled = Some(Box::new(move || {
				let _ = tx.send(());
			}));

			if state.fetching_auth_tokens {
				false
			} else {
				state.fetching_auth_tokens = true;

				true
			}
		};

		if start_fetch {
			self.inner.refill_timer.stop();
			self.inner.spawn_token_fetch(source);
		}

		rx.await.is_ok()
	}
}
impl Debug for TokenCacheManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenCacheManager")
			.field("config", &self.inner.config)
			.field("source_set", &self.inner.source.is_some())
			.field("status", &self.status())
			.finish()
	}
}

/// Builder for [`TokenCacheManager`] values.
pub struct TokenCacheManagerBuilder {
	source: Option<Arc<dyn TokenSource>>,
	config: CacheConfig,
	clock: Arc<dyn Clock>,
	cache_management_disabled: bool,
	proxy_list_refresh_disabled: bool,
}
impl TokenCacheManagerBuilder {
	fn new(source: Option<Arc<dyn TokenSource>>, config: CacheConfig) -> Self {
		Self {
			source,
			config,
			clock: Arc::new(SystemClock),
			cache_management_disabled: false,
			proxy_list_refresh_disabled: false,
		}
	}

	/// Overrides the clock used for expirations, backoff, and rate windows.
	pub fn clock(mut self, clock: impl 'static + Clock) -> Self {
		self.clock = Arc::new(clock);

		self
	}

	/// Stops the manager from scheduling or issuing refills on its own.
	pub fn disable_cache_management_for_testing(mut self) -> Self {
		self.cache_management_disabled = true;

		self
	}

	/// Stops the manager from fetching the proxy list at startup and on its timer.
	pub fn disable_proxy_list_refresh_for_testing(mut self) -> Self {
		self.proxy_list_refresh_disabled = true;

		self
	}

	/// Validates the configuration, starts the rate timer, and kicks off the initial refill check
	/// and proxy list refresh.
	pub fn build(self) -> Result<TokenCacheManager> {
		self.config.validate()?;

		let runtime = Handle::try_current()?;

		obs::describe_metrics();

		let now = self.clock.now();
		let inner = Arc::new(Inner {
			source: self.source,
			clock: self.clock,
			config: self.config,
			runtime,
			cache_management_disabled: self.cache_management_disabled,
			proxy_list_refresh_disabled: self.proxy_list_refresh_disabled,
			state: Mutex::new(CacheState::new(now)),
			refill_timer: Timer::default(),
			proxy_list_timer: Timer::default(),
			rate_timer: Timer::default(),
		});

		inner.start_rate_measurement();

		if !inner.cache_management_disabled {
			inner.schedule_maybe_refill_cache();
		}
		if !inner.proxy_list_refresh_disabled {
			inner.refresh_proxy_list();
		}

		Ok(TokenCacheManager { inner })
	}
}
impl Debug for TokenCacheManagerBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenCacheManagerBuilder")
			.field("config", &self.config)
			.field("source_set", &self.source.is_some())
			.field("cache_management_disabled", &self.cache_management_disabled)
			.field("proxy_list_refresh_disabled", &self.proxy_list_refresh_disabled)
			.finish()
	}
}

struct CacheState {
	queue: TokenQueue,
	try_get_auth_tokens_after: Option<OffsetDateTime>,
	fetching_auth_tokens: bool,
	proxy: ProxyListState,
	rates: RateCounters,
	on_cache_refilled: Option<Hook>,
	on_proxy_list_refreshed: Option<Hook>,
}
impl CacheState {
	fn new(now: OffsetDateTime) -> Self {
		Self {
			queue: TokenQueue::default(),
			try_get_auth_tokens_after: None,
			fetching_auth_tokens: false,
			proxy: ProxyListState::default(),
			rates: RateCounters::new(now),
			on_cache_refilled: None,
			on_proxy_list_refreshed: None,
		}
	}

	fn remove_expired_tokens(&mut self, now: OffsetDateTime) {
		let removed = self.queue.remove_expired(now, FRESHNESS_CONSTANT);

		if removed > 0 {
			trace_event!(debug, removed, "expired auth tokens evicted");

			self.rates.record_expired(removed);
		}
	}
}

struct Inner {
	source: Option<Arc<dyn TokenSource>>,
	clock: Arc<dyn Clock>,
	config: CacheConfig,
	runtime: Handle,
	cache_management_disabled: bool,
	proxy_list_refresh_disabled: bool,
	state: Mutex<CacheState>,
	refill_timer: Timer,
	proxy_list_timer: Timer,
	rate_timer: Timer,
}
impl Inner {
	fn maybe_refill_cache(self: &Arc<Self>) {
		let fetch = {
			let mut state = self.state.lock();
			let now = self.clock.now();

			state.remove_expired_tokens(now);

			let Some(source) = self.source.as_ref() else {
				return;
			};

			// The in-flight response reschedules on completion.
			if state.fetching_auth_tokens || self.cache_management_disabled {
				return;
			}

			if state.try_get_auth_tokens_after.is_some_and(|after| after > now) {
				None
			} else if state.queue.len() < self.config.low_water_mark {
				state.fetching_auth_tokens = true;

				Some(source.clone())
			} else {
				None
			}
		};

		if let Some(source) = fetch {
			self.spawn_token_fetch(source);
		}

		self.schedule_maybe_refill_cache();
	}

	fn schedule_maybe_refill_cache(self: &Arc<Self>) {
		let delay = {
			let state = self.state.lock();

			let idle = self.source.is_none() || self.cache_management_disabled;

			if idle || state.fetching_auth_tokens {
				None
			} else {
				let now = self.clock.now();

				if state.queue.len() < self.config.low_water_mark {
					Some(state.try_get_auth_tokens_after.map_or(Duration::ZERO, |after| after - now))
				} else {
					state.queue.front().map(|token| token.expiration - FRESHNESS_CONSTANT - now)
				}
			}
		};
		let Some(delay) = delay else {
			self.refill_timer.stop();

			return;
		};
		// Negative delays fail the conversion and clamp to zero.
		let delay = StdDuration::try_from(delay).unwrap_or(StdDuration::ZERO);
		let weak = Arc::downgrade(self);

		trace_event!(debug, delay_ms = delay.as_millis() as u64, "refill check scheduled");

		self.refill_timer.start(&self.runtime, delay, move || {
			if let Some(inner) = weak.upgrade() {
				inner.maybe_refill_cache();
			}
		});
	}

	fn spawn_token_fetch(self: &Arc<Self>, source: Arc<dyn TokenSource>) {
		let batch_size = self.config.batch_size;
		let clock = self.clock.clone();
		let weak = Arc::downgrade(self);
		let span = TaskSpan::new(CacheTask::Refill, "try_get_auth_tokens");

		trace_event!(debug, batch_size, "requesting auth tokens");

		self.runtime.spawn(span.instrument(async move {
			let started_at = clock.now();
			let result = source.try_get_auth_tokens(batch_size).await;

			if let Some(inner) = weak.upgrade() {
				inner.on_got_auth_tokens(result, clock.now() - started_at);
			}
		}));
	}

	fn on_got_auth_tokens(self: &Arc<Self>, result: TokenBatchResult, elapsed: Duration) {
		let hook = {
			let mut state = self.state.lock();

			state.fetching_auth_tokens = false;

			match result {
				Ok(tokens) => {
					trace_event!(info, issued = tokens.len(), "auth tokens issued");
					obs::record_fetch_outcome(CacheTask::Refill, FetchOutcome::Success, elapsed);

					state.try_get_auth_tokens_after = None;
					state.queue.extend_sorted(tokens);
				},
				Err(directive) => {
					trace_event!(
						warn,
						retry_at = %directive.earliest_retry_at,
						reason = directive.reason.as_deref().unwrap_or("unspecified"),
						"auth token request declined"
					);
					obs::record_fetch_outcome(CacheTask::Refill, FetchOutcome::Failure, elapsed);

					state.try_get_auth_tokens_after = Some(directive.earliest_retry_at);
				},
			}

			state.on_cache_refilled.take()
		};

		if let Some(hook) = hook {
			hook();
		}

		self.schedule_maybe_refill_cache();
	}

	fn start_rate_measurement(self: &Arc<Self>) {
		let period = StdDuration::try_from(TOKEN_RATE_MEASUREMENT_INTERVAL)
			.unwrap_or(StdDuration::from_secs(300));
		let weak = Arc::downgrade(self);

		self.rate_timer.start_repeating(&self.runtime, period, move || match weak.upgrade() {
			Some(inner) => {
				inner.measure_token_rates();

				ControlFlow::Continue(())
			},
			None => ControlFlow::Break(()),
		});
	}

	fn measure_token_rates(&self) -> Option<TokenRates> {
		let _span = TaskSpan::new(CacheTask::RateMeasurement, "measure_token_rates").entered();
		let rates = self.state.lock().rates.measure(self.clock.now());

		if let Some(rates) = &rates {
			trace_event!(
				info,
				spend_rate = rates.spend_rate,
				expiration_rate = rates.expiration_rate,
				"token rates measured"
			);
			obs::record_token_rates(rates);
		}

		rates
	}
}
