//! Process-wide single-flight gate for resolutions.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

/// Where the orchestrator currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResolvePhase {
	Idle = 0,
	Gating = 1,
	Resolving = 2,
	Fetching = 3,
	Delivering = 4,
}

impl ResolvePhase {
	fn from_u8(raw: u8) -> Self {
		match raw {
			1 => Self::Gating,
			2 => Self::Resolving,
			3 => Self::Fetching,
			4 => Self::Delivering,
			_ => Self::Idle,
		}
	}
}

/// Compare-and-set gate admitting one resolution at a time.
///
/// Each acquisition gets its own owner token; only the guard holding the
/// current token can move the phase or release the gate.
#[derive(Debug)]
pub struct ResolveGate {
	/// Token of the current holder, `0` when free.
	owner: AtomicU64,
	next_token: AtomicU64,
	phase: AtomicU8,
}

impl Default for ResolveGate {
	fn default() -> Self {
		Self {
			owner: AtomicU64::new(0),
			next_token: AtomicU64::new(1),
			phase: AtomicU8::new(ResolvePhase::Idle as u8),
		}
	}
}

impl ResolveGate {
	pub fn new() -> Self {
		Self::default()
	}

	/// Claims the gate, or returns `None` if a resolution is in flight.
	///
	/// The returned guard releases the gate when dropped.
	pub fn try_acquire(self: &Arc<Self>) -> Option<GateGuard> {
		if self.is_held() {
			return None;
		}
		let token = self.next_token.fetch_add(1, Ordering::Relaxed);
		self.owner
			.compare_exchange(0, token, Ordering::AcqRel, Ordering::Acquire)
			.ok()?;
		self.phase.store(ResolvePhase::Gating as u8, Ordering::Release);
		Some(GateGuard {
			gate: Arc::clone(self),
			token,
		})
	}

	/// Frees the gate if `token` still owns it.
	fn release(&self, token: u64) {
		if self.owner.load(Ordering::Acquire) != token {
			tracing::debug!(token, "stale gate guard dropped");
			return;
		}
		self.phase.store(ResolvePhase::Idle as u8, Ordering::Release);
		if self
			.owner
			.compare_exchange(token, 0, Ordering::AcqRel, Ordering::Acquire)
			.is_err()
		{
			tracing::debug!(token, "gate changed hands during release");
		}
	}

	pub fn is_held(&self) -> bool {
		self.owner.load(Ordering::Acquire) != 0
	}

	pub fn phase(&self) -> ResolvePhase {
		ResolvePhase::from_u8(self.phase.load(Ordering::Acquire))
	}
}

/// Proof of holding the [`ResolveGate`]; releases it on drop, including
/// during unwinding.
#[derive(Debug)]
#[must_use = "dropping the guard releases the gate immediately"]
pub struct GateGuard {
	gate: Arc<ResolveGate>,
	token: u64,
}

impl GateGuard {
	pub fn set_phase(&self, phase: ResolvePhase) {
		if self.gate.owner.load(Ordering::Acquire) == self.token {
			self.gate.phase.store(phase as u8, Ordering::Release);
		}
	}
}

impl Drop for GateGuard {
	fn drop(&mut self) {
		self.gate.release(self.token);
	}
}
