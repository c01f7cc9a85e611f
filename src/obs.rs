//! Optional observability helpers for cache tasks.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `ip_protection_cache.task` with the `task`
//!   field, plus debug/info/warn events for scheduling decisions and source outcomes.
//! - Enable `metrics` to record the token spend/expiration rate histograms, the proxy list refresh
//!   latency histogram, and the `ip_protection_token_fetch_total` counter labeled by `outcome`.

mod metrics;
mod tracing;

pub use self::{metrics::*, tracing::*};

// self
use crate::_prelude::*;

/// Background tasks run by the cache manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheTask {
	/// Token refill checks and fetches.
	Refill,
	/// Proxy list refreshes.
	ProxyListRefresh,
	/// Periodic spend/expiration rate measurement.
	RateMeasurement,
}
impl CacheTask {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CacheTask::Refill => "refill",
			CacheTask::ProxyListRefresh => "proxy_list_refresh",
			CacheTask::RateMeasurement => "rate_measurement",
		}
	}
}
impl Display for CacheTask {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each source call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FetchOutcome {
	/// The source returned data.
	Success,
	/// The source declined or failed.
	Failure,
}
impl FetchOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FetchOutcome::Success => "success",
			FetchOutcome::Failure => "failure",
		}
	}
}
impl Display for FetchOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Forwards to the matching `tracing` event macro when the feature is enabled.
macro_rules! trace_event {
	($level:ident, $($arg:tt)+) => {
		#[cfg(feature = "tracing")]
		{
			::tracing::$level!($($arg)+);
		}
	};
}
pub(crate) use trace_event;
