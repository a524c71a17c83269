//! Install attribution: a one-shot provider handshake whose result is cached
//! for the lifetime of the install.
//!
//! Attribution only enriches request headers. Every provider failure is
//! swallowed here and reads as "no attribution available".

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use sddl_primitives::{QueryParams, parse_query};
use sddl_worker::TaskClass;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::state::LocalState;

/// Install referrer data for this install.
///
/// `params` is always decoded from `raw_referrer`; the constructor is the only
/// way to build one, so the two never disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributionRecord {
	raw_referrer: String,
	click_ts_sec: i64,
	install_begin_ts_sec: i64,
	params: QueryParams,
}

impl AttributionRecord {
	pub fn new(raw_referrer: String, click_ts_sec: i64, install_begin_ts_sec: i64) -> Self {
		let params = parse_query(Some(&raw_referrer));
		Self {
			raw_referrer,
			click_ts_sec,
			install_begin_ts_sec,
			params,
		}
	}

	pub fn raw_referrer(&self) -> &str {
		&self.raw_referrer
	}

	pub fn click_ts_sec(&self) -> i64 {
		self.click_ts_sec
	}

	pub fn install_begin_ts_sec(&self) -> i64 {
		self.install_begin_ts_sec
	}

	pub fn params(&self) -> &QueryParams {
		&self.params
	}

	pub fn param(&self, name: &str) -> Option<&str> {
		self.params.get(name).map(String::as_str)
	}
}

/// What the platform attribution service reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferrerDetails {
	pub referrer: String,
	pub click_ts_sec: i64,
	pub install_begin_ts_sec: i64,
}

/// Failure reported by a [`ReferrerProvider`].
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
	#[error("install referrer service unavailable")]
	Unavailable,
	#[error("install referrer not supported on this platform")]
	NotSupported,
	#[error("install referrer provider failed: {0}")]
	Failed(String),
}

/// Platform install-attribution service.
///
/// `fetch` may never complete; callers always bound it with a timeout.
#[async_trait]
pub trait ReferrerProvider: Send + Sync {
	async fn fetch(&self) -> Result<ReferrerDetails, ProviderError>;

	/// Releases the provider connection after a handshake.
	async fn disconnect(&self) {}
}

/// Provider for platforms without install attribution.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoReferrer;

#[async_trait]
impl ReferrerProvider for NoReferrer {
	async fn fetch(&self) -> Result<ReferrerDetails, ProviderError> {
		Err(ProviderError::NotSupported)
	}
}

/// Caches the install attribution record and runs the handshake at most once
/// at a time.
pub struct AttributionCache {
	state: Arc<dyn LocalState>,
	provider: Arc<dyn ReferrerProvider>,
	timeout: Duration,
	inflight: Mutex<Option<watch::Receiver<bool>>>,
}

impl AttributionCache {
	pub fn new(state: Arc<dyn LocalState>, provider: Arc<dyn ReferrerProvider>, timeout: Duration) -> Self {
		Self {
			state,
			provider,
			timeout,
			inflight: Mutex::new(None),
		}
	}

	/// Returns the cached record without touching the provider.
	pub fn read_cached(&self) -> Option<AttributionRecord> {
		self.state.attribution()
	}

	/// Returns the cached record, or performs one bounded handshake.
	///
	/// Only a non-blank referrer is cached. Timeouts, provider errors and blank
	/// referrers return `None` and leave storage untouched so a later launch can
	/// retry.
	pub async fn fetch_once(&self) -> Option<AttributionRecord> {
		if let Some(record) = self.read_cached() {
			return Some(record);
		}

		// Fetch and disconnect share one deadline.
		let deadline = Instant::now() + self.timeout;
		let result = tokio::time::timeout_at(deadline, self.provider.fetch()).await;
		if tokio::time::timeout_at(deadline, self.provider.disconnect()).await.is_err() {
			tracing::debug!("install referrer disconnect timed out");
		}

		let details = match result {
			Ok(Ok(details)) => details,
			Ok(Err(error)) => {
				tracing::debug!(%error, "install referrer unavailable");
				return None;
			}
			Err(_) => {
				tracing::debug!(timeout_ms = self.timeout.as_millis() as u64, "install referrer handshake timed out");
				return None;
			}
		};

		if details.referrer.trim().is_empty() {
			tracing::debug!("install referrer is blank; not caching");
			return None;
		}

		let record = AttributionRecord::new(details.referrer, details.click_ts_sec, details.install_begin_ts_sec);
		self.state.store_attribution(&record);
		tracing::debug!(params = record.params().len(), "cached install referrer");
		Some(record)
	}

	/// Starts [`fetch_once`](Self::fetch_once) in the background unless a record
	/// is cached or a handshake is already running.
	pub fn prefetch(self: &Arc<Self>) {
		if self.read_cached().is_some() {
			return;
		}
		let tx = {
			let mut inflight = self.inflight.lock();
			if inflight.is_some() {
				return;
			}
			let (tx, rx) = watch::channel(false);
			*inflight = Some(rx);
			tx
		};

		let latch = InflightLatch {
			cache: Arc::clone(self),
			tx,
		};
		drop(sddl_worker::spawn(TaskClass::Background, async move {
			let _ = latch.cache.fetch_once().await;
			drop(latch);
		}));
	}

	/// Returns true while a background handshake is running.
	pub fn is_fetching(&self) -> bool {
		self.inflight.lock().is_some()
	}

	/// Waits at most `bound` for a running background handshake.
	///
	/// Returns at once when nothing is running.
	pub async fn await_inflight(&self, bound: Duration) {
		let Some(mut rx) = self.inflight.lock().clone() else {
			return;
		};
		if tokio::time::timeout(bound, rx.wait_for(|done| *done)).await.is_err() {
			tracing::debug!(bound_ms = bound.as_millis() as u64, "stopped waiting for install referrer");
		}
	}

	/// Whether the attribution was already reported downstream.
	pub fn is_sent(&self) -> bool {
		self.state.attribution_sent()
	}

	pub fn mark_sent(&self) {
		self.state.mark_attribution_sent();
	}
}

/// Clears the in-flight marker and wakes waiters when the handshake task
/// ends, including when the provider panics.
struct InflightLatch {
	cache: Arc<AttributionCache>,
	tx: watch::Sender<bool>,
}

impl Drop for InflightLatch {
	fn drop(&mut self) {
		*self.cache.inflight.lock() = None;
		let _ = self.tx.send(true);
	}
}

#[cfg(test)]
mod tests;
