//! Cache tuning knobs, their defaults, and validation.
//!
//! Batch size and low-water mark come from the embedder; the manager never derives them.
//! Documents deserialize with every field optional and durations expressed in whole seconds:
//!
//! ```json
//! { "batch_size": 64, "low_water_mark": 16, "proxy_list_refresh_interval": 3600 }
//! ```

// crates.io
use serde::{Deserializer, Serializer};
// self
use crate::{_prelude::*, error::ConfigError};

/// Tokens expiring within this window of "now" are evicted instead of served.
pub const FRESHNESS_CONSTANT: Duration = Duration::seconds(5);
/// Period of the spend/expiration rate measurement timer.
pub const TOKEN_RATE_MEASUREMENT_INTERVAL: Duration = Duration::minutes(5);

/// Validated configuration for a [`TokenCacheManager`](crate::cache::TokenCacheManager).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
	/// Number of tokens requested per refill.
	pub batch_size: u32,
	/// Queue size below which a refill is requested.
	pub low_water_mark: usize,
	/// Delay between background proxy list refreshes.
	#[serde(with = "duration_secs")]
	pub proxy_list_refresh_interval: Duration,
	/// Minimum spacing enforced on caller-requested proxy list refreshes.
	#[serde(with = "duration_secs")]
	pub proxy_list_min_refresh_interval: Duration,
	/// Upper bound of the random delay added to each background proxy list refresh.
	#[serde(with = "duration_secs")]
	pub proxy_list_refresh_jitter: Duration,
}
impl CacheConfig {
	const DEFAULT_BATCH_SIZE: u32 = 64;
	const DEFAULT_LOW_WATER_MARK: usize = 16;
	const DEFAULT_PROXY_LIST_MIN_REFRESH_INTERVAL: Duration = Duration::minutes(1);
	const DEFAULT_PROXY_LIST_REFRESH_INTERVAL: Duration = Duration::hours(1);

	/// Returns a builder seeded with the defaults.
	pub fn builder() -> CacheConfigBuilder {
		CacheConfigBuilder::default()
	}

	/// Parses and validates a JSON document, reporting the failing path on error.
	pub fn from_json_str(document: &str) -> Result<Self, ConfigError> {
		let mut de = serde_json::Deserializer::from_str(document);
		let config: Self = serde_path_to_error::deserialize(&mut de)?;

		config.validate()?;

		Ok(config)
	}

	/// Checks the invariants the manager relies on.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.batch_size == 0 {
			return Err(ConfigError::ZeroBatchSize);
		}
		if self.low_water_mark == 0 {
			return Err(ConfigError::ZeroLowWaterMark);
		}
		if !self.proxy_list_refresh_interval.is_positive() {
			return Err(ConfigError::NonPositiveInterval { field: "proxy_list_refresh_interval" });
		}
		if self.proxy_list_min_refresh_interval.is_negative() {
			return Err(ConfigError::NegativeDuration { field: "proxy_list_min_refresh_interval" });
		}
		if self.proxy_list_refresh_jitter.is_negative() {
			return Err(ConfigError::NegativeDuration { field: "proxy_list_refresh_jitter" });
		}

		Ok(())
	}
}
impl Default for CacheConfig {
	fn default() -> Self {
		Self {
			batch_size: Self::DEFAULT_BATCH_SIZE,
			low_water_mark: Self::DEFAULT_LOW_WATER_MARK,
			proxy_list_refresh_interval: Self::DEFAULT_PROXY_LIST_REFRESH_INTERVAL,
			proxy_list_min_refresh_interval: Self::DEFAULT_PROXY_LIST_MIN_REFRESH_INTERVAL,
			proxy_list_refresh_jitter: Duration::ZERO,
		}
	}
}

/// Builder for [`CacheConfig`] values.
#[derive(Clone, Debug, Default)]
pub struct CacheConfigBuilder {
	config: CacheConfig,
}
impl CacheConfigBuilder {
	/// Sets the number of tokens requested per refill.
	pub fn batch_size(mut self, batch_size: u32) -> Self {
		self.config.batch_size = batch_size;

		self
	}

	/// Sets the queue size below which a refill is requested.
	pub fn low_water_mark(mut self, low_water_mark: usize) -> Self {
		self.config.low_water_mark = low_water_mark;

		self
	}

	/// Sets the delay between background proxy list refreshes.
	pub fn proxy_list_refresh_interval(mut self, interval: Duration) -> Self {
		self.config.proxy_list_refresh_interval = interval;

		self
	}

	/// Sets the minimum spacing for caller-requested proxy list refreshes.
	pub fn proxy_list_min_refresh_interval(mut self, interval: Duration) -> Self {
		self.config.proxy_list_min_refresh_interval = interval;

		self
	}

	/// Sets the upper bound of the random delay added to background proxy list refreshes.
	pub fn proxy_list_refresh_jitter(mut self, jitter: Duration) -> Self {
		self.config.proxy_list_refresh_jitter = jitter;

		self
	}

	/// Validates and returns the configuration.
	pub fn build(self) -> Result<CacheConfig, ConfigError> {
		self.config.validate()?;

		Ok(self.config)
	}
}

mod duration_secs {
	// self
	use super::*;

	pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_i64(value.whole_seconds())
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		i64::deserialize(deserializer).map(Duration::seconds)
	}
}
