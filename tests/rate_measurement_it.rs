mod common;

// self
use common::*;
use ip_protection_cache::{BlindSignedAuthToken, TokenCacheManager, TokenRates, TokioClock};

async fn filled_manager(
	clock: TokioClock,
	handle: &mut SourceHandle,
	source: Arc<MockTokenSource>,
	batch: Vec<BlindSignedAuthToken>,
) -> TokenCacheManager {
	let manager = TokenCacheManager::builder(Some(source), config(8, 2))
		.clock(clock)
		.disable_cache_management_for_testing()
		.disable_proxy_list_refresh_for_testing()
		.build()
		.expect("Manager should build inside a runtime.");
	let (filled, _) = tokio::join!(manager.fill_cache_for_testing(), async {
		handle.next_token_request().await.respond(Ok(batch));
	});

	assert!(filled);

	manager
}

#[tokio::test(start_paused = true)]
async fn spend_rate_scales_to_tokens_per_hour() {
	let clock = TokioClock::anchored_at(ANCHOR);
	let (source, mut handle) = mock_source(clock);
	let batch = (1..=4).map(|hours| token_in(&clock, Duration::hours(hours))).collect();
	let manager = filled_manager(clock, &mut handle, source, batch).await;

	for _ in 0..3 {
		assert!(manager.get_auth_token().is_some());
	}

	tokio::time::advance(std::time::Duration::from_secs(60)).await;

	assert_eq!(
		manager.measure_token_rates(),
		Some(TokenRates { spend_rate: 180, expiration_rate: 0 })
	);
	// Zero-length windows emit nothing but still reset.
	assert_eq!(manager.measure_token_rates(), None);

	tokio::time::advance(std::time::Duration::from_secs(60)).await;

	assert_eq!(manager.measure_token_rates(), Some(TokenRates { spend_rate: 0, expiration_rate: 0 }));
}

#[tokio::test(start_paused = true)]
async fn evicted_tokens_count_toward_expiration_rate() {
	let clock = TokioClock::anchored_at(ANCHOR);
	let (source, mut handle) = mock_source(clock);
	let batch = vec![
		token_in(&clock, Duration::seconds(10)),
		token_in(&clock, Duration::seconds(20)),
		token_in(&clock, Duration::hours(1)),
	];
	let manager = filled_manager(clock, &mut handle, source, batch).await;

	tokio::time::advance(std::time::Duration::from_secs(30)).await;

	assert!(manager.is_auth_token_available());
	assert_eq!(manager.status().cached_tokens, 1);
	assert_eq!(
		manager.measure_token_rates(),
		Some(TokenRates { spend_rate: 0, expiration_rate: 240 })
	);
}

#[tokio::test(start_paused = true)]
async fn periodic_measurement_resets_counters_every_five_minutes() {
	let clock = TokioClock::anchored_at(ANCHOR);
	let (source, mut handle) = mock_source(clock);
	let batch = (1..=4).map(|hours| token_in(&clock, Duration::hours(hours))).collect();
	let manager = filled_manager(clock, &mut handle, source, batch).await;

	assert!(manager.get_auth_token().is_some());
	assert!(manager.get_auth_token().is_some());

	tokio::time::sleep(std::time::Duration::from_secs(5 * 60 + 1)).await;

	// The timer closed the window at five minutes, so one second of idle time remains.
	assert_eq!(manager.measure_token_rates(), Some(TokenRates { spend_rate: 0, expiration_rate: 0 }));
}
