//! In-memory platform fakes for orchestrator tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use sddl_resolver::{
	Clipboard, ClipboardError, Details, HttpResponse, HttpTransport, LocalState, MemoryStore, NoReferrer, PrefsState,
	ProviderError, ReferrerDetails, ReferrerProvider, ResolveCallback, Resolver, ResolverConfig, TransportError,
};
use sddl_worker::{Dispatcher, InlineDispatcher, Timer};

pub const BASE: &str = "https://sddl.test";

pub fn by_id_url(id: &str) -> String {
	format!("{BASE}/api/{id}/details")
}

pub fn try_url() -> String {
	format!("{BASE}/api/try/details")
}

/// Scripted reply for one request.
#[derive(Debug, Clone)]
pub enum Reply {
	Status(u16, &'static str),
	Fail(&'static str),
	Panic,
}

#[derive(Debug, Clone)]
pub struct Recorded {
	pub url: String,
	pub headers: Vec<(&'static str, String)>,
}

impl Recorded {
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.iter().find(|(n, _)| *n == name).map(|(_, v)| v.as_str())
	}
}

/// Transport answering from per-URL reply queues. Unscripted URLs get 599.
#[derive(Default)]
pub struct FakeTransport {
	routes: Mutex<HashMap<String, VecDeque<Reply>>>,
	requests: Mutex<Vec<Recorded>>,
	delay: Mutex<Duration>,
}

impl FakeTransport {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn on(self: &Arc<Self>, url: impl Into<String>, reply: Reply) -> Arc<Self> {
		self.routes.lock().entry(url.into()).or_default().push_back(reply);
		Arc::clone(self)
	}

	/// Delay applied before every reply.
	pub fn delay(self: &Arc<Self>, delay: Duration) -> Arc<Self> {
		*self.delay.lock() = delay;
		Arc::clone(self)
	}

	pub fn requests(&self) -> Vec<Recorded> {
		self.requests.lock().clone()
	}

	pub fn urls(&self) -> Vec<String> {
		self.requests.lock().iter().map(|r| r.url.clone()).collect()
	}
}

#[async_trait]
impl HttpTransport for FakeTransport {
	async fn get(&self, url: &str, headers: &[(&'static str, String)]) -> Result<HttpResponse, TransportError> {
		self.requests.lock().push(Recorded {
			url: url.to_owned(),
			headers: headers.to_vec(),
		});
		let delay = *self.delay.lock();
		if !delay.is_zero() {
			tokio::time::sleep(delay).await;
		}
		let reply = self.routes.lock().get_mut(url).and_then(VecDeque::pop_front);
		match reply {
			Some(Reply::Status(status, body)) => Ok(HttpResponse::new(status, body)),
			Some(Reply::Fail(message)) => Err(TransportError::Io(message.into())),
			Some(Reply::Panic) => panic!("transport exploded"),
			None => Ok(HttpResponse::new(599, "unscripted")),
		}
	}
}

/// Clipboard replaying scripted reads, then empty.
#[derive(Default)]
pub struct ScriptedClipboard {
	reads: AtomicUsize,
	script: Mutex<VecDeque<Result<Option<String>, ClipboardError>>>,
}

impl ScriptedClipboard {
	pub fn new(script: impl IntoIterator<Item = Option<&'static str>>) -> Arc<Self> {
		Arc::new(Self {
			reads: AtomicUsize::new(0),
			script: Mutex::new(script.into_iter().map(|s| Ok(s.map(str::to_owned))).collect()),
		})
	}

	pub fn failing(times: usize, then: &'static str) -> Arc<Self> {
		let mut script: VecDeque<_> = (0..times).map(|_| Err(ClipboardError::Denied)).collect();
		script.push_back(Ok(Some(then.to_owned())));
		Arc::new(Self {
			reads: AtomicUsize::new(0),
			script: Mutex::new(script),
		})
	}

	pub fn reads(&self) -> usize {
		self.reads.load(Ordering::SeqCst)
	}
}

impl Clipboard for ScriptedClipboard {
	fn primary_text(&self) -> Result<Option<String>, ClipboardError> {
		self.reads.fetch_add(1, Ordering::SeqCst);
		self.script.lock().pop_front().unwrap_or(Ok(None))
	}
}

/// Timer that records every requested delay and then sleeps on the tokio clock.
#[derive(Default)]
pub struct RecordingTimer {
	sleeps: Mutex<Vec<Duration>>,
}

impl RecordingTimer {
	pub fn sleeps(&self) -> Vec<Duration> {
		self.sleeps.lock().clone()
	}
}

#[async_trait]
impl Timer for RecordingTimer {
	async fn sleep(&self, duration: Duration) {
		self.sleeps.lock().push(duration);
		tokio::time::sleep(duration).await;
	}
}

/// Provider answering with `referrer` after `delay`.
pub struct DelayedReferrer {
	pub delay: Duration,
	pub referrer: &'static str,
}

#[async_trait]
impl ReferrerProvider for DelayedReferrer {
	async fn fetch(&self) -> Result<ReferrerDetails, ProviderError> {
		tokio::time::sleep(self.delay).await;
		Ok(ReferrerDetails {
			referrer: self.referrer.to_owned(),
			click_ts_sec: 1_700_000_000,
			install_begin_ts_sec: 1_700_000_042,
		})
	}
}

/// Callback counting deliveries across every invocation that shares it.
#[derive(Clone, Default)]
pub struct Deliveries {
	pub successes: Arc<AtomicUsize>,
	pub errors: Arc<Mutex<Vec<String>>>,
}

impl Deliveries {
	pub fn total(&self) -> usize {
		self.successes.load(Ordering::SeqCst) + self.errors.lock().len()
	}

	pub fn callback(&self) -> CountingCallback {
		CountingCallback(self.clone())
	}
}

pub struct CountingCallback(Deliveries);

impl ResolveCallback for CountingCallback {
	fn on_success(self: Box<Self>, _details: Details) {
		self.0.successes.fetch_add(1, Ordering::SeqCst);
	}

	fn on_error(self: Box<Self>, message: String) {
		self.0.errors.lock().push(message);
	}
}

pub struct Harness {
	pub transport: Arc<FakeTransport>,
	pub clipboard: Arc<ScriptedClipboard>,
	pub timer: Arc<RecordingTimer>,
	pub state: Arc<PrefsState>,
	pub resolver: Resolver,
}

pub struct HarnessBuilder {
	config: ResolverConfig,
	transport: Arc<FakeTransport>,
	clipboard: Arc<ScriptedClipboard>,
	provider: Arc<dyn ReferrerProvider>,
	dispatcher: Arc<dyn Dispatcher>,
}

impl HarnessBuilder {
	pub fn new(transport: Arc<FakeTransport>) -> Self {
		Self {
			config: ResolverConfig::new().base_url(BASE),
			transport,
			clipboard: ScriptedClipboard::new([]),
			provider: Arc::new(NoReferrer),
			dispatcher: Arc::new(InlineDispatcher),
		}
	}

	pub fn clipboard(mut self, clipboard: Arc<ScriptedClipboard>) -> Self {
		self.clipboard = clipboard;
		self
	}

	pub fn provider(mut self, provider: Arc<dyn ReferrerProvider>) -> Self {
		self.provider = provider;
		self
	}

	pub fn dispatcher(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
		self.dispatcher = dispatcher;
		self
	}

	pub fn config(mut self, edit: impl FnOnce(ResolverConfig) -> ResolverConfig) -> Self {
		self.config = edit(self.config);
		self
	}

	pub fn build(self) -> Harness {
		let state = Arc::new(PrefsState::new(Arc::new(MemoryStore::new())));
		let timer = Arc::new(RecordingTimer::default());
		let resolver = Resolver::builder(self.config)
			.state(state.clone() as Arc<dyn LocalState>)
			.transport(self.transport.clone())
			.clipboard(self.clipboard.clone())
			.referrer_provider(self.provider)
			.timer(timer.clone())
			.dispatcher(self.dispatcher)
			.build()
			.expect("valid test resolver");
		Harness {
			transport: self.transport,
			clipboard: self.clipboard,
			timer,
			state,
			resolver,
		}
	}
}

/// Waits on the (usually paused) tokio clock until `cond` holds.
pub async fn eventually(mut cond: impl FnMut() -> bool) {
	for _ in 0..1000 {
		if cond() {
			return;
		}
		tokio::time::sleep(Duration::from_millis(10)).await;
	}
	panic!("condition not reached within 10s");
}
