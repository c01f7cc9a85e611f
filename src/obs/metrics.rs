// self
use crate::{
	_prelude::*,
	cache::TokenRates,
	obs::{CacheTask, FetchOutcome},
};

/// Histogram of tokens spent per hour, displayed up to this bound.
pub const TOKEN_SPEND_RATE_DISPLAY_MAX: u64 = 1_000;
/// Histogram of tokens expired per hour, displayed up to this bound.
pub const TOKEN_EXPIRATION_RATE_DISPLAY_MAX: u64 = 100_000;

/// Registers metric descriptions with the global recorder (when enabled).
pub fn describe_metrics() {
	#[cfg(feature = "metrics")]
	{
		metrics::describe_histogram!(
			"ip_protection_token_spend_rate",
			metrics::Unit::Count,
			format!(
				"Auth tokens spent per hour (display range 0..={TOKEN_SPEND_RATE_DISPLAY_MAX}; values are not clamped)."
			)
		);
		metrics::describe_histogram!(
			"ip_protection_token_expiration_rate",
			metrics::Unit::Count,
			format!(
				"Auth tokens expired unused per hour (display range 0..={TOKEN_EXPIRATION_RATE_DISPLAY_MAX}; values are not clamped)."
			)
		);
		metrics::describe_histogram!(
			"ip_protection_proxy_list_refresh_seconds",
			metrics::Unit::Seconds,
			"Latency of proxy list fetches."
		);
		metrics::describe_counter!(
			"ip_protection_token_fetch_total",
			"Token batch requests completed, labeled by outcome."
		);
	}
}

/// Records one rate measurement via the global metrics recorder (when enabled).
pub fn record_token_rates(rates: &TokenRates) {
	#[cfg(feature = "metrics")]
	{
		metrics::histogram!("ip_protection_token_spend_rate").record(rates.spend_rate as f64);
		metrics::histogram!("ip_protection_token_expiration_rate")
			.record(rates.expiration_rate as f64);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = rates;
	}
}

/// Records a completed token source call via the global metrics recorder (when enabled).
pub fn record_fetch_outcome(task: CacheTask, outcome: FetchOutcome, elapsed: Duration) {
	#[cfg(feature = "metrics")]
	{
		match task {
			CacheTask::Refill => metrics::counter!(
				"ip_protection_token_fetch_total",
				"outcome" => outcome.as_str()
			)
			.increment(1),
			CacheTask::ProxyListRefresh => metrics::histogram!(
				"ip_protection_proxy_list_refresh_seconds",
				"outcome" => outcome.as_str()
			)
			.record(elapsed.as_seconds_f64()),
			CacheTask::RateMeasurement => {},
		}
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (task, outcome, elapsed);
	}
}
