//! Crate-level error types shared by configuration, token sources, and the cache manager.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Token source failure surfaced outside the cache (the cache itself absorbs these).
	#[error(transparent)]
	Source(#[from] crate::source::SourceError),
	/// The cache manager was constructed outside a Tokio runtime.
	#[error("A Tokio runtime is required to drive cache timers.")]
	Runtime(
		#[from]
		#[source]
		tokio::runtime::TryCurrentError,
	),
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Batch size must request at least one token.
	#[error("Batch size must be greater than zero.")]
	ZeroBatchSize,
	/// Low-water mark must be at least one token or the cache never refills.
	#[error("Low-water mark must be greater than zero.")]
	ZeroLowWaterMark,
	/// A duration that drives a timer must be positive.
	#[error("The {field} interval must be positive.")]
	NonPositiveInterval {
		/// Configuration field that failed validation.
		field: &'static str,
	},
	/// A duration that offsets a timer cannot be negative.
	#[error("The {field} duration cannot be negative.")]
	NegativeDuration {
		/// Configuration field that failed validation.
		field: &'static str,
	},
	/// Configuration document could not be parsed.
	#[error("Cache configuration is malformed at `{path}`.")]
	Parse {
		/// Path inside the document where parsing failed.
		path: String,
		/// Structured parsing failure.
		#[source]
		source: serde_json::Error,
	},
}
impl From<serde_path_to_error::Error<serde_json::Error>> for ConfigError {
	fn from(e: serde_path_to_error::Error<serde_json::Error>) -> Self {
		let path = e.path().to_string();

		Self::Parse { path, source: e.into_inner() }
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;
	use crate::source::SourceError;

	#[test]
	fn source_error_converts_into_crate_error() {
		let source_error = SourceError::Unavailable { message: "issuer offline".into() };
		let error: Error = source_error.clone().into();

		assert!(matches!(error, Error::Source(_)));
		assert!(error.to_string().contains("issuer offline"));
	}

	#[test]
	fn parse_error_keeps_path_and_source() {
		let mut de = serde_json::Deserializer::from_str(r#"{"batch_size":"many"}"#);
		let err = serde_path_to_error::deserialize::<_, crate::config::CacheConfig>(&mut de)
			.expect_err("String batch size should fail to parse.");
		let config_error = ConfigError::from(err);

		assert!(config_error.to_string().contains("batch_size"));
		assert!(StdError::source(&config_error).is_some());
	}

	#[test]
	fn runtime_error_outside_tokio() {
		let err = tokio::runtime::Handle::try_current()
			.expect_err("Unit tests without #[tokio::test] run outside a runtime.");
		let error = Error::from(err);

		assert!(matches!(error, Error::Runtime(_)));
	}
}
