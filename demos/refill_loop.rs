//! Runs a cache against an in-process issuer that mints short-lived tokens and declines every
//! third batch, printing what the cache serves.

// std
use std::sync::atomic::{AtomicU32, Ordering};
// crates.io
use color_eyre::Result;
use time::{Duration, OffsetDateTime};
// self
use ip_protection_cache::{
	BlindSignedAuthToken, CacheConfig, RetryDirective, TokenCacheManager, TokenSource,
	source::{ProxyListResult, SourceFuture, TokenBatchResult},
};

#[derive(Default)]
struct LocalIssuer {
	batches: AtomicU32,
}
impl TokenSource for LocalIssuer {
	fn try_get_auth_tokens(&self, batch_size: u32) -> SourceFuture<'_, TokenBatchResult> {
		let batch = self.batches.fetch_add(1, Ordering::SeqCst) + 1;

		Box::pin(async move {
			let now = OffsetDateTime::now_utc();

			if batch % 3 == 0 {
				return Err(RetryDirective::new(now + Duration::seconds(2))
					.with_reason("demo issuer is cooling down"));
			}

			Ok((0..batch_size)
				.map(|i| {
					BlindSignedAuthToken::new(
						format!("batch-{batch}-token-{i}"),
						now + Duration::seconds(30 + i64::from(i)),
					)
				})
				.collect())
		})
	}

	fn get_proxy_list(&self) -> SourceFuture<'_, ProxyListResult> {
		Box::pin(async { Ok(vec!["proxy-a.example:443".into(), "proxy-b.example:443".into()]) })
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let config = CacheConfig::builder().batch_size(4).low_water_mark(2).build()?;
	let manager = TokenCacheManager::new(Some(std::sync::Arc::new(LocalIssuer::default())), config)?;

	for round in 0..12 {
		tokio::time::sleep(std::time::Duration::from_millis(500)).await;

		match manager.get_auth_token() {
			Some(token) => println!(
				"round {round}: served {} (expires {})",
				token.fingerprint(),
				token.expiration
			),
			None => println!("round {round}: no token available ({:?})", manager.status()),
		}
	}

	println!("proxies: {:?}", manager.proxy_list());
	println!("rates: {:?}", manager.measure_token_rates());

	Ok(())
}
