//! Proxy list bookkeeping and refresh cadence.
//!
//! The list is replaced wholesale on every successful fetch and kept as-is when a fetch fails, so
//! callers keep routing through the last known-good proxies. Background refreshes run on their
//! own timer; caller-requested refreshes are rate limited by the configured minimum interval.

// std
use std::time::Duration as StdDuration;
// crates.io
use rand::Rng;
// self
use crate::{
	_prelude::*,
	cache::Inner,
	obs::{self, CacheTask, FetchOutcome, TaskSpan, trace_event},
	source::ProxyListResult,
};

/// Last known-good proxy list plus its fetch state.
#[derive(Debug, Default)]
pub struct ProxyListState {
	list: Vec<String>,
	have_fetched: bool,
	fetching: bool,
	last_refresh: Option<OffsetDateTime>,
}
impl ProxyListState {
	/// Last successfully fetched list.
	pub fn list(&self) -> &[String] {
		&self.list
	}

	/// Whether any fetch has succeeded.
	pub fn have_fetched(&self) -> bool {
		self.have_fetched
	}

	/// Whether a fetch is in flight.
	pub fn fetching(&self) -> bool {
		self.fetching
	}

	/// Instant of the last fetch request.
	pub fn last_refresh(&self) -> Option<OffsetDateTime> {
		self.last_refresh
	}

	/// Marks a fetch as started; returns `false` if one is already in flight.
	pub fn begin_refresh(&mut self, now: OffsetDateTime) -> bool {
		if self.fetching {
			return false;
		}

		self.fetching = true;
		self.last_refresh = Some(now);

		true
	}

	/// Applies a fetch result, keeping the previous list on failure.
	pub fn complete_refresh(&mut self, result: ProxyListResult) -> FetchOutcome {
		self.fetching = false;

		match result {
			Ok(list) => {
				trace_event!(info, proxies = list.len(), "proxy list refreshed");

				self.list = list;
				self.have_fetched = true;

				FetchOutcome::Success
			},
			Err(e) => {
				trace_event!(warn, error = %e, "proxy list refresh failed; keeping the previous list");

				let _ = e;

				FetchOutcome::Failure
			},
		}
	}

	/// Whether a caller-requested refresh is allowed at `now`.
	pub fn refresh_due(&self, now: OffsetDateTime, min_interval: Duration) -> bool {
		self.last_refresh.is_none_or(|last| now - last >= min_interval)
	}
}

impl Inner {
	pub(super) fn refresh_proxy_list(self: &Arc<Self>) {
		let Some(source) = self.source.clone() else {
			return;
		};

		if !self.state.lock().proxy.begin_refresh(self.clock.now()) {
			return;
		}

		let clock = self.clock.clone();
		let weak = Arc::downgrade(self);
		let span = TaskSpan::new(CacheTask::ProxyListRefresh, "get_proxy_list");

		self.runtime.spawn(span.instrument(async move {
			let started_at = clock.now();
			let result = source.get_proxy_list().await;

			if let Some(inner) = weak.upgrade() {
				inner.on_got_proxy_list(result, clock.now() - started_at);
			}
		}));
	}

	pub(super) fn request_refresh_proxy_list(self: &Arc<Self>) {
		let due = self
			.state
			.lock()
			.proxy
			.refresh_due(self.clock.now(), self.config.proxy_list_min_refresh_interval);

		if due {
			self.refresh_proxy_list();
		} else {
			trace_event!(debug, "proxy list refresh requested too soon; ignoring");
		}
	}

	fn on_got_proxy_list(self: &Arc<Self>, result: ProxyListResult, elapsed: Duration) {
		let (outcome, hook) = {
			let mut state = self.state.lock();
			let outcome = state.proxy.complete_refresh(result);

			(outcome, state.on_proxy_list_refreshed.take())
		};

		obs::record_fetch_outcome(CacheTask::ProxyListRefresh, outcome, elapsed);

		if !self.proxy_list_refresh_disabled {
			let weak = Arc::downgrade(self);

			self.proxy_list_timer.start(&self.runtime, self.next_proxy_list_refresh_delay(), move || {
				if let Some(inner) = weak.upgrade() {
					inner.refresh_proxy_list();
				}
			});
		}

		if let Some(hook) = hook {
			hook();
		}
	}

	fn next_proxy_list_refresh_delay(&self) -> StdDuration {
		let interval = StdDuration::try_from(self.config.proxy_list_refresh_interval)
			.unwrap_or(StdDuration::ZERO);
		let jitter = StdDuration::try_from(self.config.proxy_list_refresh_jitter)
			.unwrap_or(StdDuration::ZERO);

		if jitter.is_zero() {
			return interval;
		}

		interval + rand::rng().random_range(StdDuration::ZERO..=jitter)
	}
}
