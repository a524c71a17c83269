//! Picks the identifier for a resolution: inbound link first, then a bounded
//! clipboard poll.

use std::sync::Arc;
use std::time::Duration;

use sddl_primitives::{Identifier, decode_component};
use sddl_worker::Timer;
use url::Url;

use crate::request::ResolutionRequest;

/// Failure reading the platform clipboard.
#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
	#[error("clipboard unavailable")]
	Unavailable,
	#[error("clipboard access denied")]
	Denied,
	#[error("clipboard read failed: {0}")]
	Other(String),
}

/// Platform clipboard, read as text.
pub trait Clipboard: Send + Sync {
	/// Text of the primary clip's first item, or `None` when the clipboard is
	/// empty or holds nothing text-like.
	fn primary_text(&self) -> Result<Option<String>, ClipboardError>;
}

/// Clipboard that is always empty.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoClipboard;

impl Clipboard for NoClipboard {
	fn primary_text(&self) -> Result<Option<String>, ClipboardError> {
		Ok(None)
	}
}

/// Retry budget for clipboard polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
	/// Total reads, including the first.
	pub attempts: u32,
	/// Delay between consecutive reads.
	pub interval: Duration,
}

impl Default for PollPolicy {
	fn default() -> Self {
		Self {
			attempts: 3,
			interval: Duration::from_millis(150),
		}
	}
}

/// Resolves the candidate identifier for one request.
pub struct IdentifierSource {
	clipboard: Arc<dyn Clipboard>,
	timer: Arc<dyn Timer>,
	poll: PollPolicy,
}

impl IdentifierSource {
	pub fn new(clipboard: Arc<dyn Clipboard>, timer: Arc<dyn Timer>, poll: PollPolicy) -> Self {
		Self { clipboard, timer, poll }
	}

	/// First match wins: the link's first path segment, then the clipboard
	/// (only when the request allows it). No merging across sources.
	pub async fn resolve(&self, request: &ResolutionRequest) -> Option<Identifier> {
		if let Some(id) = request.inbound.as_ref().and_then(identifier_from_link) {
			tracing::debug!(%id, "identifier from inbound link");
			return Some(id);
		}
		if !request.wants_clipboard_fallback {
			return None;
		}
		self.poll_clipboard().await
	}

	/// Reads the clipboard up to `attempts` times, sleeping `interval` between
	/// reads. The clipboard is re-read every time since it may be filled after
	/// launch.
	async fn poll_clipboard(&self) -> Option<Identifier> {
		for attempt in 1..=self.poll.attempts {
			if attempt > 1 {
				self.timer.sleep(self.poll.interval).await;
			}
			if let Some(id) = self.read_clipboard() {
				tracing::debug!(%id, attempt, "identifier from clipboard");
				return Some(id);
			}
		}
		tracing::debug!(attempts = self.poll.attempts, "no identifier on clipboard");
		None
	}

	fn read_clipboard(&self) -> Option<Identifier> {
		match self.clipboard.primary_text() {
			Ok(text) => Identifier::parse(text?.trim()),
			Err(error) => {
				tracing::debug!(%error, "clipboard read failed");
				None
			}
		}
	}
}

/// The link's first path segment, if it is a valid identifier.
pub fn identifier_from_link(link: &Url) -> Option<Identifier> {
	let segment = link.path_segments()?.next()?;
	Identifier::parse(&decode_component(segment))
}
