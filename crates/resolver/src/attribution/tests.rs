use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::state::PrefsState;
use crate::store::MemoryStore;

struct ScriptedProvider {
	calls: AtomicUsize,
	disconnects: AtomicUsize,
	delay: Duration,
	answer: fn() -> Result<ReferrerDetails, ProviderError>,
}

impl ScriptedProvider {
	fn new(delay: Duration, answer: fn() -> Result<ReferrerDetails, ProviderError>) -> Arc<Self> {
		Arc::new(Self {
			calls: AtomicUsize::new(0),
			disconnects: AtomicUsize::new(0),
			delay,
			answer,
		})
	}
}

#[async_trait]
impl ReferrerProvider for ScriptedProvider {
	async fn fetch(&self) -> Result<ReferrerDetails, ProviderError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		tokio::time::sleep(self.delay).await;
		(self.answer)()
	}

	async fn disconnect(&self) {
		self.disconnects.fetch_add(1, Ordering::SeqCst);
	}
}

fn campaign() -> Result<ReferrerDetails, ProviderError> {
	Ok(ReferrerDetails {
		referrer: "utm_source=google&utm_campaign=spring&utm_source=other".into(),
		click_ts_sec: 1_700_000_000,
		install_begin_ts_sec: 1_700_000_050,
	})
}

fn blank() -> Result<ReferrerDetails, ProviderError> {
	Ok(ReferrerDetails {
		referrer: "   ".into(),
		click_ts_sec: 1,
		install_begin_ts_sec: 2,
	})
}

fn unavailable() -> Result<ReferrerDetails, ProviderError> {
	Err(ProviderError::Unavailable)
}

fn explode() -> Result<ReferrerDetails, ProviderError> {
	panic!("provider fault")
}

/// Provider whose service never answers and never lets go of the connection.
struct HangingProvider;

#[async_trait]
impl ReferrerProvider for HangingProvider {
	async fn fetch(&self) -> Result<ReferrerDetails, ProviderError> {
		std::future::pending().await
	}

	async fn disconnect(&self) {
		std::future::pending::<()>().await;
	}
}

fn cache_with(provider: Arc<ScriptedProvider>) -> (Arc<PrefsState>, Arc<AttributionCache>) {
	let state = Arc::new(PrefsState::new(Arc::new(MemoryStore::new())));
	let cache = Arc::new(AttributionCache::new(state.clone(), provider, Duration::from_millis(2500)));
	(state, cache)
}

#[tokio::test(start_paused = true)]
async fn successful_handshake_is_cached() {
	let provider = ScriptedProvider::new(Duration::from_millis(10), campaign);
	let (state, cache) = cache_with(provider.clone());

	let record = cache.fetch_once().await.expect("record");
	assert_eq!(record.param("utm_source"), Some("google"));
	assert_eq!(record.param("utm_campaign"), Some("spring"));
	assert_eq!(record.click_ts_sec(), 1_700_000_000);
	assert_eq!(provider.disconnects.load(Ordering::SeqCst), 1);

	assert_eq!(state.attribution(), Some(record.clone()));
	assert_eq!(cache.fetch_once().await, Some(record));
	assert_eq!(provider.calls.load(Ordering::SeqCst), 1, "cache hit must not contact the provider");
}

#[tokio::test(start_paused = true)]
async fn provider_that_never_answers_times_out() {
	let provider = ScriptedProvider::new(Duration::from_secs(3600), campaign);
	let (state, cache) = cache_with(provider.clone());

	let start = tokio::time::Instant::now();
	assert!(cache.fetch_once().await.is_none());
	assert!(start.elapsed() >= Duration::from_millis(2500));
	assert!(start.elapsed() < Duration::from_secs(10));
	assert!(state.attribution().is_none());
}

#[tokio::test(start_paused = true)]
async fn hanging_disconnect_shares_the_handshake_deadline() {
	let state = Arc::new(PrefsState::new(Arc::new(MemoryStore::new())));
	let cache = AttributionCache::new(state, Arc::new(HangingProvider), Duration::from_millis(2500));

	let start = tokio::time::Instant::now();
	assert!(cache.fetch_once().await.is_none());
	assert!(start.elapsed() <= Duration::from_millis(2500));
}

#[tokio::test(start_paused = true)]
async fn panicking_provider_does_not_wedge_prefetch() {
	let provider = ScriptedProvider::new(Duration::ZERO, explode);
	let (_, cache) = cache_with(provider.clone());

	cache.prefetch();
	tokio::time::sleep(Duration::from_secs(10)).await;
	assert!(!cache.is_fetching());

	let start = tokio::time::Instant::now();
	cache.await_inflight(Duration::from_secs(60)).await;
	assert!(start.elapsed() < Duration::from_secs(1));

	cache.prefetch();
	tokio::time::sleep(Duration::from_secs(10)).await;
	assert_eq!(provider.calls.load(Ordering::SeqCst), 2, "a later prefetch retries the provider");
	assert!(!cache.is_fetching());
}

#[tokio::test(start_paused = true)]
async fn negative_results_are_not_cached() {
	for answer in [blank as fn() -> _, unavailable] {
		let provider = ScriptedProvider::new(Duration::ZERO, answer);
		let (state, cache) = cache_with(provider.clone());
		assert!(cache.fetch_once().await.is_none());
		assert!(state.attribution().is_none());
		assert!(cache.fetch_once().await.is_none());
		assert_eq!(provider.calls.load(Ordering::SeqCst), 2, "a later attempt retries the provider");
	}
}

#[tokio::test(start_paused = true)]
async fn prefetch_is_single_flight() {
	let provider = ScriptedProvider::new(Duration::from_millis(100), campaign);
	let (_, cache) = cache_with(provider.clone());

	cache.prefetch();
	cache.prefetch();
	assert!(cache.is_fetching());

	cache.await_inflight(Duration::from_secs(1)).await;
	assert!(cache.read_cached().is_some());
	assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

	cache.prefetch();
	assert!(!cache.is_fetching(), "cached record makes prefetch a no-op");
}

#[tokio::test(start_paused = true)]
async fn await_inflight_is_bounded() {
	let provider = ScriptedProvider::new(Duration::from_secs(2), campaign);
	let (_, cache) = cache_with(provider);

	cache.prefetch();
	let start = tokio::time::Instant::now();
	cache.await_inflight(Duration::from_millis(350)).await;
	assert!(start.elapsed() < Duration::from_secs(1));
	assert!(cache.read_cached().is_none());
}

#[tokio::test]
async fn await_without_inflight_returns_immediately() {
	let (_, cache) = cache_with(ScriptedProvider::new(Duration::ZERO, campaign));
	tokio::time::timeout(Duration::from_millis(50), cache.await_inflight(Duration::from_secs(60)))
		.await
		.expect("nothing in flight");
}

#[test]
fn sent_flag_is_persisted() {
	let (state, cache) = cache_with(ScriptedProvider::new(Duration::ZERO, campaign));
	assert!(!cache.is_sent());
	cache.mark_sent();
	assert!(cache.is_sent());
	assert!(state.attribution_sent());
}
