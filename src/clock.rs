//! Wall-clock sources used for token expiry, backoff deadlines, and rate measurement.

// self
use crate::_prelude::*;

/// Supplies the instant the cache treats as "now".
pub trait Clock
where
	Self: Send + Sync,
{
	/// Returns the current UTC instant.
	fn now(&self) -> OffsetDateTime;
}

/// Clock backed by the operating system's UTC time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}
}

/// Clock that advances with Tokio's time driver.
///
/// The wall-clock value is `anchor + (tokio::time::Instant::now() - start)`, so with a paused
/// runtime (`tokio::time::pause`/`advance`) token expirations and cache timers move in lockstep.
/// Must be created and read inside a Tokio runtime.
#[derive(Clone, Copy, Debug)]
pub struct TokioClock {
	anchor: OffsetDateTime,
	start: tokio::time::Instant,
}
impl TokioClock {
	/// Anchors the clock at the provided wall-clock instant.
	pub fn anchored_at(anchor: OffsetDateTime) -> Self {
		Self { anchor, start: tokio::time::Instant::now() }
	}

	/// Anchors the clock at the current system time.
	pub fn new() -> Self {
		Self::anchored_at(OffsetDateTime::now_utc())
	}
}
impl Default for TokioClock {
	fn default() -> Self {
		Self::new()
	}
}
impl Clock for TokioClock {
	fn now(&self) -> OffsetDateTime {
		let elapsed = tokio::time::Instant::now().saturating_duration_since(self.start);

		self.anchor + elapsed
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[tokio::test(start_paused = true)]
	async fn tokio_clock_follows_paused_time() {
		let anchor = macros::datetime!(2025-01-01 00:00 UTC);
		let clock = TokioClock::anchored_at(anchor);

		assert_eq!(clock.now(), anchor);

		tokio::time::advance(std::time::Duration::from_secs(90)).await;

		assert_eq!(clock.now(), anchor + Duration::seconds(90));
	}

	#[test]
	fn system_clock_is_utc() {
		assert!(SystemClock.now().offset().is_utc());
	}
}
