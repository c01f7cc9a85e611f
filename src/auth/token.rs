//! Blind-signed auth tokens issued by a [`TokenSource`](crate::source::TokenSource).

pub mod secret;

// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Opaque blind-signed credential paired with its expiry instant.
///
/// Only token sources mint these; the cache moves them out one at a time when callers
/// spend them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlindSignedAuthToken {
	/// Token body; callers must avoid logging it.
	pub token: TokenSecret,
	/// Instant after which the issuer rejects the token.
	pub expiration: OffsetDateTime,
}
impl BlindSignedAuthToken {
	/// Wraps a token body together with its expiry instant.
	pub fn new(token: impl Into<String>, expiration: OffsetDateTime) -> Self {
		Self { token: TokenSecret::new(token), expiration }
	}

	/// Returns `true` if the token expires at or before `instant + window`.
	pub fn expires_within(&self, instant: OffsetDateTime, window: Duration) -> bool {
		self.expiration <= instant + window
	}

	/// Log-safe fingerprint of the token body.
	pub fn fingerprint(&self) -> String {
		self.token.fingerprint()
	}
}
