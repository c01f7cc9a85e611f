//! Token spend/expiration counters and per-hour rate computation.

// self
use crate::_prelude::*;

const MILLIS_PER_HOUR: u128 = 60 * 60 * 1_000;

/// Rates computed by one measurement, in tokens per hour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenRates {
	/// Tokens handed to callers per hour.
	pub spend_rate: u64,
	/// Tokens evicted unused per hour.
	pub expiration_rate: u64,
}

/// Counters accumulated between measurements.
#[derive(Debug)]
pub struct RateCounters {
	tokens_spent: u64,
	tokens_expired: u64,
	last_measurement: OffsetDateTime,
}
impl RateCounters {
	/// Starts a measurement window at `now`.
	pub fn new(now: OffsetDateTime) -> Self {
		Self { tokens_spent: 0, tokens_expired: 0, last_measurement: now }
	}

	/// Records one token handed to a caller.
	pub fn record_spent(&mut self) {
		self.tokens_spent = self.tokens_spent.saturating_add(1);
	}

	/// Records tokens evicted before use.
	pub fn record_expired(&mut self, count: usize) {
		self.tokens_expired = self.tokens_expired.saturating_add(count as u64);
	}

	/// Tokens spent in the current window.
	pub fn tokens_spent(&self) -> u64 {
		self.tokens_spent
	}

	/// Tokens expired in the current window.
	pub fn tokens_expired(&self) -> u64 {
		self.tokens_expired
	}

	/// Closes the window at `now`, returning its rates, and starts a new one.
	///
	/// Windows shorter than one millisecond (or a clock that went backwards) yield no rates;
	/// the counters reset regardless.
	pub fn measure(&mut self, now: OffsetDateTime) -> Option<TokenRates> {
		let elapsed_ms = u128::try_from((now - self.last_measurement).whole_milliseconds())
			.ok()
			.filter(|ms| *ms > 0);
		let rates = elapsed_ms.map(|ms| TokenRates {
			spend_rate: per_hour(self.tokens_spent, ms),
			expiration_rate: per_hour(self.tokens_expired, ms),
		});

		self.last_measurement = now;
		self.tokens_spent = 0;
		self.tokens_expired = 0;

		rates
	}
}

fn per_hour(count: u64, elapsed_ms: u128) -> u64 {
	u64::try_from(u128::from(count) * MILLIS_PER_HOUR / elapsed_ms).unwrap_or(u64::MAX)
}
