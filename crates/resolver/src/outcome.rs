//! Single-shot delivery of a resolution outcome.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use sddl_worker::Dispatcher;
use tokio::sync::oneshot;

use crate::error::ResolveError;

/// Details payload returned by the resolution service.
pub type Details = serde_json::Map<String, serde_json::Value>;

/// Result of one accepted resolution.
pub type ResolutionOutcome = Result<Details, ResolveError>;

/// Caller-facing completion callback.
///
/// Both methods consume the callback, so at most one of them can ever run.
pub trait ResolveCallback: Send + 'static {
	fn on_success(self: Box<Self>, details: Details);
	fn on_error(self: Box<Self>, message: String);
}

/// [`ResolveCallback`] built from two closures.
pub struct FnCallback<S, E> {
	on_success: S,
	on_error: E,
}

/// Wraps a success and an error closure into a [`ResolveCallback`].
pub fn callback<S, E>(on_success: S, on_error: E) -> FnCallback<S, E>
where
	S: FnOnce(Details) + Send + 'static,
	E: FnOnce(String) + Send + 'static,
{
	FnCallback { on_success, on_error }
}

impl<S, E> ResolveCallback for FnCallback<S, E>
where
	S: FnOnce(Details) + Send + 'static,
	E: FnOnce(String) + Send + 'static,
{
	fn on_success(self: Box<Self>, details: Details) {
		let this = *self;
		(this.on_success)(details);
	}

	fn on_error(self: Box<Self>, message: String) {
		let this = *self;
		(this.on_error)(message);
	}
}

enum Target {
	Channel(oneshot::Sender<ResolutionOutcome>),
	Callback {
		callback: Box<dyn ResolveCallback>,
		dispatcher: Arc<dyn Dispatcher>,
	},
}

/// Write side of a single-shot outcome.
///
/// Dropping an undelivered responder delivers [`ResolveError::Interrupted`],
/// so an accepted resolution always completes exactly once.
pub(crate) struct Responder {
	target: Option<Target>,
}

impl Responder {
	pub(crate) fn channel() -> (Self, ResolutionHandle) {
		let (tx, rx) = oneshot::channel();
		(
			Self {
				target: Some(Target::Channel(tx)),
			},
			ResolutionHandle { rx },
		)
	}

	pub(crate) fn callback(callback: Box<dyn ResolveCallback>, dispatcher: Arc<dyn Dispatcher>) -> Self {
		Self {
			target: Some(Target::Callback { callback, dispatcher }),
		}
	}

	pub(crate) fn deliver(mut self, outcome: ResolutionOutcome) {
		if let Some(target) = self.target.take() {
			send(target, outcome);
		}
	}
}

impl Drop for Responder {
	fn drop(&mut self) {
		if let Some(target) = self.target.take() {
			tracing::warn!("resolution ended without an outcome");
			send(target, Err(ResolveError::Interrupted));
		}
	}
}

fn send(target: Target, outcome: ResolutionOutcome) {
	match target {
		Target::Channel(tx) => {
			if tx.send(outcome).is_err() {
				tracing::debug!("resolution handle dropped before delivery");
			}
		}
		Target::Callback { callback, dispatcher } => dispatcher.dispatch(Box::new(move || match outcome {
			Ok(details) => callback.on_success(details),
			Err(error) => callback.on_error(error.to_string()),
		})),
	}
}

/// Future resolving to the outcome of an accepted resolution.
#[derive(Debug)]
pub struct ResolutionHandle {
	rx: oneshot::Receiver<ResolutionOutcome>,
}

impl Future for ResolutionHandle {
	type Output = ResolutionOutcome;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		Pin::new(&mut self.rx).poll(cx).map(|res| res.unwrap_or(Err(ResolveError::Interrupted)))
	}
}
