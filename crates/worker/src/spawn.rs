//! Classified spawning onto the host runtime.
//!
//! Every task runs inside a `worker` span carrying its [`TaskClass`], so log
//! lines from a resolution, its attribution handshake and its delivery can be
//! told apart. Hosts without a tokio runtime get a small fallback runtime.

use std::future::Future;
use std::sync::OnceLock;

use tokio::runtime::{Handle, Runtime};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::TaskClass;

/// One resolution and one handshake at a time need very little.
const FALLBACK_WORKER_THREADS: usize = 1;
/// Preference writes are the only blocking work.
const FALLBACK_BLOCKING_THREADS: usize = 2;

fn fallback_runtime() -> &'static Runtime {
	static FALLBACK: OnceLock<Runtime> = OnceLock::new();
	FALLBACK.get_or_init(|| {
		tracing::debug!(workers = FALLBACK_WORKER_THREADS, "starting fallback runtime");
		tokio::runtime::Builder::new_multi_thread()
			.enable_time()
			.worker_threads(FALLBACK_WORKER_THREADS)
			.max_blocking_threads(FALLBACK_BLOCKING_THREADS)
			.thread_name("sddl-resolver")
			.build()
			.expect("sddl fallback runtime must start")
	})
}

/// The runtime the caller is on, or the fallback one.
fn host_handle() -> Handle {
	Handle::try_current().unwrap_or_else(|_| fallback_runtime().handle().clone())
}

fn class_span(class: TaskClass) -> tracing::Span {
	tracing::trace_span!("worker", class = class.as_str())
}

/// Spawns `fut` as a task of `class`.
pub fn spawn<F>(class: TaskClass, fut: F) -> JoinHandle<F::Output>
where
	F: Future + Send + 'static,
	F::Output: Send + 'static,
{
	host_handle().spawn(fut.instrument(class_span(class)))
}

/// Runs blocking `work` of `class` on the host's blocking pool.
pub fn spawn_blocking<F, R>(class: TaskClass, work: F) -> JoinHandle<R>
where
	F: FnOnce() -> R + Send + 'static,
	R: Send + 'static,
{
	let span = class_span(class);
	host_handle().spawn_blocking(move || span.in_scope(work))
}
