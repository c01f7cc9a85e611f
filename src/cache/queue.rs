//! Expiry-ordered token queue.

// self
use crate::{_prelude::*, auth::BlindSignedAuthToken};

/// Tokens sorted ascending by expiration; the earliest-expiring token is always at the front.
#[derive(Debug, Default)]
pub struct TokenQueue {
	tokens: VecDeque<BlindSignedAuthToken>,
}
impl TokenQueue {
	/// Number of cached tokens.
	pub fn len(&self) -> usize {
		self.tokens.len()
	}

	/// Returns true when no tokens are cached.
	pub fn is_empty(&self) -> bool {
		self.tokens.is_empty()
	}

	/// Earliest-expiring token, if any.
	pub fn front(&self) -> Option<&BlindSignedAuthToken> {
		self.tokens.front()
	}

	/// Moves the earliest-expiring token out of the queue.
	pub fn pop_front(&mut self) -> Option<BlindSignedAuthToken> {
		self.tokens.pop_front()
	}

	/// Merges a batch in arbitrary order, restoring the expiry ordering.
	pub fn extend_sorted(&mut self, batch: Vec<BlindSignedAuthToken>) {
		if batch.is_empty() {
			return;
		}

		self.tokens.extend(batch);
		self.tokens.make_contiguous().sort_by_key(|token| token.expiration);
	}

	/// Drops front tokens expiring within `window` of `now`, returning how many were dropped.
	pub fn remove_expired(&mut self, now: OffsetDateTime, window: Duration) -> usize {
		let mut removed = 0;

		while self.tokens.front().is_some_and(|token| token.expires_within(now, window)) {
			self.tokens.pop_front();

			removed += 1;
		}

		removed
	}

	#[cfg(test)]
	pub fn is_sorted(&self) -> bool {
		self.tokens.iter().zip(self.tokens.iter().skip(1)).all(|(a, b)| a.expiration <= b.expiration)
	}
}
