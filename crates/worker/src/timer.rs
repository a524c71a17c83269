use std::time::Duration;

use async_trait::async_trait;

/// Schedules delayed continuation of async work.
///
/// Retry loops take a timer instead of calling `tokio::time::sleep`
/// directly so tests can observe and shortcut the waits.
#[async_trait]
pub trait Timer: Send + Sync {
	/// Completes after `duration` has elapsed.
	async fn sleep(&self, duration: Duration);
}

/// [`Timer`] backed by the tokio time driver.
///
/// Honors `tokio::time::pause`, so paused-clock tests advance it
/// deterministically.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioTimer;

#[async_trait]
impl Timer for TokioTimer {
	async fn sleep(&self, duration: Duration) {
		tokio::time::sleep(duration).await;
	}
}
