//! Top-level resolution state machine.
//!
//! `Idle → Gating → Resolving → Fetching → Delivering → Idle`. Entry is
//! synchronous (gate and cold-start checks, then a spawn); everything that
//! waits runs on a worker task.

use std::sync::Arc;

use sddl_worker::{Dispatcher, SpawnDispatcher, TaskClass, Timer, TokioTimer};
use tracing::Instrument;

use crate::attribution::{AttributionCache, NoReferrer, ReferrerProvider};
use crate::config::ResolverConfig;
use crate::error::BuildError;
use crate::fetch::FetchChain;
use crate::gate::{GateGuard, ResolveGate, ResolvePhase};
use crate::outcome::{ResolutionHandle, ResolutionOutcome, ResolveCallback, Responder};
use crate::request::ResolutionRequest;
use crate::source::{Clipboard, IdentifierSource, NoClipboard};
use crate::state::{LocalState, PrefsState};
use crate::store::MemoryStore;
use crate::transport::{HttpTransport, ReqwestTransport};

/// Deferred deep link resolver.
///
/// Cheap to clone; clones share the gate and state.
#[derive(Clone)]
pub struct Resolver {
	inner: Arc<Inner>,
}

struct Inner {
	config: ResolverConfig,
	gate: Arc<ResolveGate>,
	state: Arc<dyn LocalState>,
	attribution: Arc<AttributionCache>,
	source: IdentifierSource,
	chain: FetchChain,
	dispatcher: Arc<dyn Dispatcher>,
}

impl Resolver {
	pub fn builder(config: ResolverConfig) -> ResolverBuilder {
		ResolverBuilder::new(config)
	}

	/// Starts a resolution and returns a handle to its outcome.
	///
	/// Returns `None` when the request is dropped: another resolution is in
	/// flight, or this is a link-less launch after the organic cold start was
	/// already handled. A dropped request never produces an outcome.
	pub fn resolve(&self, request: ResolutionRequest) -> Option<ResolutionHandle> {
		let guard = self.admit(&request)?;
		let (responder, handle) = Responder::channel();
		self.start(request, guard, responder);
		Some(handle)
	}

	/// Like [`resolve`](Self::resolve), but reports through `callback` on the
	/// configured dispatcher. Returns whether the request was accepted; a
	/// dropped request never invokes the callback.
	pub fn resolve_with(&self, request: ResolutionRequest, callback: impl ResolveCallback) -> bool {
		let Some(guard) = self.admit(&request) else {
			return false;
		};
		let responder = Responder::callback(Box::new(callback), Arc::clone(&self.inner.dispatcher));
		self.start(request, guard, responder);
		true
	}

	/// Request for `link` using the configured clipboard preference.
	pub fn request(&self, link: Option<url::Url>) -> ResolutionRequest {
		ResolutionRequest {
			inbound: link,
			wants_clipboard_fallback: self.inner.config.read_clipboard,
		}
	}

	/// Starts the install attribution handshake ahead of the first resolution.
	pub fn warm_up(&self) {
		self.inner.attribution.prefetch();
	}

	pub fn phase(&self) -> ResolvePhase {
		self.inner.gate.phase()
	}

	pub fn is_resolving(&self) -> bool {
		self.inner.gate.is_held()
	}

	pub fn attribution(&self) -> &Arc<AttributionCache> {
		&self.inner.attribution
	}

	pub fn local_state(&self) -> &Arc<dyn LocalState> {
		&self.inner.state
	}

	pub fn config(&self) -> &ResolverConfig {
		&self.inner.config
	}

	/// Gate first, then the cold-start flag. Dropping the guard on the
	/// cold-start path releases the gate again.
	fn admit(&self, request: &ResolutionRequest) -> Option<GateGuard> {
		let Some(guard) = self.inner.gate.try_acquire() else {
			tracing::debug!("resolution already in flight; dropping request");
			return None;
		};

		if !request.has_inbound() {
			if self.inner.state.cold_start_handled() {
				tracing::debug!("organic cold start already handled; dropping request");
				return None;
			}
			self.inner.state.mark_cold_start_handled();
		}

		Some(guard)
	}

	fn start(&self, request: ResolutionRequest, guard: GateGuard, responder: Responder) {
		let inner = Arc::clone(&self.inner);
		inner.attribution.prefetch();

		let span = tracing::debug_span!("resolve", inbound = request.has_inbound(), clipboard = request.wants_clipboard_fallback);
		drop(sddl_worker::spawn(
			TaskClass::Resolution,
			async move {
				let outcome = inner.run(&request, &guard).await;
				match &outcome {
					Ok(details) => tracing::debug!(keys = details.len(), "resolution succeeded"),
					Err(error) => tracing::debug!(%error, kind = ?error.kind(), "resolution failed"),
				}
				guard.set_phase(ResolvePhase::Delivering);
				// Release before delivery so the receiver can start the next resolution.
				drop(guard);
				responder.deliver(outcome);
			}
			.instrument(span),
		));
	}
}

impl Inner {
	async fn run(&self, request: &ResolutionRequest, guard: &GateGuard) -> ResolutionOutcome {
		guard.set_phase(ResolvePhase::Resolving);
		let id = self.source.resolve(request).await;

		guard.set_phase(ResolvePhase::Fetching);
		match id {
			Some(id) => self.chain.fetch_by_id(&id).await,
			None => {
				if self.attribution.read_cached().is_none() {
					self.attribution.await_inflight(self.config.attribution_wait_duration()).await;
				}
				self.chain.fetch_try().await
			}
		}
	}
}

/// Assembles a [`Resolver`] from its platform seams.
///
/// Unset seams default to: in-memory state, `reqwest` transport, no
/// clipboard, no attribution provider, tokio timer, spawn dispatcher.
pub struct ResolverBuilder {
	config: ResolverConfig,
	state: Option<Arc<dyn LocalState>>,
	transport: Option<Arc<dyn HttpTransport>>,
	clipboard: Arc<dyn Clipboard>,
	provider: Arc<dyn ReferrerProvider>,
	timer: Arc<dyn Timer>,
	dispatcher: Arc<dyn Dispatcher>,
}

impl ResolverBuilder {
	pub fn new(config: ResolverConfig) -> Self {
		Self {
			config,
			state: None,
			transport: None,
			clipboard: Arc::new(NoClipboard),
			provider: Arc::new(NoReferrer),
			timer: Arc::new(TokioTimer),
			dispatcher: Arc::new(SpawnDispatcher),
		}
	}

	pub fn state(mut self, state: Arc<dyn LocalState>) -> Self {
		self.state = Some(state);
		self
	}

	pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
		self.transport = Some(transport);
		self
	}

	pub fn clipboard(mut self, clipboard: Arc<dyn Clipboard>) -> Self {
		self.clipboard = clipboard;
		self
	}

	pub fn referrer_provider(mut self, provider: Arc<dyn ReferrerProvider>) -> Self {
		self.provider = provider;
		self
	}

	pub fn timer(mut self, timer: Arc<dyn Timer>) -> Self {
		self.timer = timer;
		self
	}

	pub fn dispatcher(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
		self.dispatcher = dispatcher;
		self
	}

	pub fn build(self) -> Result<Resolver, BuildError> {
		let config = self.config;
		config.validate()?;

		let state = self.state.unwrap_or_else(|| Arc::new(PrefsState::new(Arc::new(MemoryStore::new()))));
		let transport: Arc<dyn HttpTransport> = match self.transport {
			Some(transport) => transport,
			None => Arc::new(ReqwestTransport::new(config.timeouts())?),
		};

		let attribution = Arc::new(AttributionCache::new(
			Arc::clone(&state),
			self.provider,
			config.referrer_timeout_duration(),
		));
		let source = IdentifierSource::new(self.clipboard, self.timer, config.poll_policy());
		let chain = FetchChain::new(transport, Arc::clone(&state), &config.base_url, config.user_agent.clone())
			.device(config.device.clone())
			.strict_json(config.strict_json);

		Ok(Resolver {
			inner: Arc::new(Inner {
				config,
				gate: Arc::new(ResolveGate::new()),
				state,
				attribution,
				source,
				chain,
				dispatcher: self.dispatcher,
			}),
		})
	}
}
