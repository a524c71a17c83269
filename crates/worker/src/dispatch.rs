//! Execution contexts that results are delivered on.
//!
//! A resolution runs on background tasks, but callers usually want their
//! callback to run on one designated context (a UI loop, a single consumer
//! task). [`Dispatcher`] is that seam.

use tokio::sync::mpsc;

use crate::{TaskClass, spawn};

/// A unit of work handed to a dispatcher.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs jobs on a designated execution context.
pub trait Dispatcher: Send + Sync {
	/// Schedules `job`. Must not block the calling task.
	fn dispatch(&self, job: Job);
}

/// Runs jobs immediately on whichever task dispatches them.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineDispatcher;

impl Dispatcher for InlineDispatcher {
	fn dispatch(&self, job: Job) {
		job();
	}
}

/// Runs every job on a fresh runtime task.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpawnDispatcher;

impl Dispatcher for SpawnDispatcher {
	fn dispatch(&self, job: Job) {
		drop(spawn(TaskClass::Delivery, async move { job() }));
	}
}

/// Host-drained job queue emulating a main-thread looper.
///
/// Jobs posted through a [`MainQueueHandle`] run only when the owner calls
/// [`MainQueue::run_pending`] or [`MainQueue::run_next`], in posting order.
#[derive(Debug)]
pub struct MainQueue {
	tx: mpsc::UnboundedSender<Job>,
	rx: mpsc::UnboundedReceiver<Job>,
}

/// Cloneable posting side of a [`MainQueue`].
#[derive(Debug, Clone)]
pub struct MainQueueHandle {
	tx: mpsc::UnboundedSender<Job>,
}

impl Default for MainQueue {
	fn default() -> Self {
		Self::new()
	}
}

impl MainQueue {
	pub fn new() -> Self {
		let (tx, rx) = mpsc::unbounded_channel();
		Self { tx, rx }
	}

	/// Returns a dispatcher that posts onto this queue.
	pub fn handle(&self) -> MainQueueHandle {
		MainQueueHandle { tx: self.tx.clone() }
	}

	/// Runs every job that is already queued. Returns how many ran.
	pub fn run_pending(&mut self) -> usize {
		let mut ran = 0;
		while let Ok(job) = self.rx.try_recv() {
			job();
			ran += 1;
		}
		ran
	}

	/// Waits for the next job and runs it.
	///
	/// Never returns `false` while the queue itself holds a sender, so callers
	/// should bound this with a timeout or a known number of jobs.
	pub async fn run_next(&mut self) -> bool {
		match self.rx.recv().await {
			Some(job) => {
				job();
				true
			}
			None => false,
		}
	}
}

impl Dispatcher for MainQueueHandle {
	fn dispatch(&self, job: Job) {
		if self.tx.send(job).is_err() {
			tracing::debug!("main queue dropped; job discarded");
		}
	}
}
