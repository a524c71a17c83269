//! Deferred deep link resolution.
//!
//! A [`Resolver`] decides which link identifier (if any) brought the user to
//! the app (inbound link, then a short clipboard poll), exchanges it for a
//! details payload, and falls back to the service's heuristic "try" endpoint
//! when there is no usable identifier. At most one resolution runs at a time
//! and a link-less cold start is resolved at most once per install.
//!
//! Platform services are traits: [`HttpTransport`], [`Clipboard`],
//! [`ReferrerProvider`], [`KeyValueStore`] / [`LocalState`], plus the
//! [`Timer`](sddl_worker::Timer) and [`Dispatcher`](sddl_worker::Dispatcher)
//! from `sddl-worker`.

pub mod attribution;
pub mod config;
pub mod error;
pub mod fetch;
pub mod gate;
pub mod headers;
pub mod orchestrator;
pub mod outcome;
pub mod request;
pub mod source;
pub mod state;
pub mod store;
pub mod transport;

pub use attribution::{AttributionCache, AttributionRecord, NoReferrer, ProviderError, ReferrerDetails, ReferrerProvider};
pub use config::{DEFAULT_BASE_URL, ResolverConfig};
pub use error::{BuildError, ConfigError, ErrorKind, ResolveError, StoreError};
pub use fetch::{Endpoint, FetchChain};
pub use gate::{GateGuard, ResolveGate, ResolvePhase};
pub use headers::DeviceInfo;
pub use orchestrator::{Resolver, ResolverBuilder};
pub use outcome::{Details, FnCallback, ResolutionHandle, ResolutionOutcome, ResolveCallback, callback};
pub use request::ResolutionRequest;
pub use sddl_primitives::{Identifier, is_valid_identifier};
pub use source::{Clipboard, ClipboardError, IdentifierSource, NoClipboard, PollPolicy};
pub use state::{LocalState, PrefsState};
pub use store::{FileStore, KeyValueStore, MemoryStore, PREFS_NAMESPACE, PrefValue};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport, Timeouts, TransportError};
