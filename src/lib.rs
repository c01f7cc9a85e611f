//! Backoff-aware in-memory cache for blind-signed IP Protection auth tokens: batched async
//! refills, spend/expiry rate measurement, and a cooperating proxy-list refresher in one crate.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod obs;
pub mod source;

mod _prelude {
	pub use std::{
		collections::VecDeque,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::{Arc, Weak},
	};

	pub use parking_lot::Mutex;
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};

	pub use crate::error::{Error, Result};
}

pub use crate::{
	auth::BlindSignedAuthToken,
	cache::{CacheStatus, TokenCacheManager, TokenCacheManagerBuilder, TokenRates},
	clock::{Clock, SystemClock, TokioClock},
	config::CacheConfig,
	error::{ConfigError, Error, Result},
	source::{RetryDirective, SourceError, TokenSource},
};
#[cfg(test)] use color_eyre as _;
