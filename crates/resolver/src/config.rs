//! Resolver configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;
use crate::headers::DeviceInfo;
use crate::source::PollPolicy;
use crate::transport::Timeouts;

/// Default resolution service.
pub const DEFAULT_BASE_URL: &str = "https://sddl.me";

/// Tunables for one [`Resolver`](crate::Resolver).
///
/// Every field has a default, so a TOML file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
	/// Service root; endpoints live under `{base_url}/api/`.
	pub base_url: String,
	/// Default for [`ResolutionRequest::wants_clipboard_fallback`](crate::ResolutionRequest).
	pub read_clipboard: bool,
	/// Clipboard reads per resolution, including the first.
	pub clipboard_attempts: u32,
	pub clipboard_interval_ms: u64,
	/// Bound on the install referrer handshake.
	pub referrer_timeout_ms: u64,
	/// How long a link-less resolution waits for a running attribution fetch.
	pub attribution_wait_ms: u64,
	pub call_timeout_secs: u64,
	pub connect_timeout_secs: u64,
	pub read_timeout_secs: u64,
	/// Fail instead of substituting `{}` when a success body is not JSON.
	pub strict_json: bool,
	pub user_agent: String,
	pub device: DeviceInfo,
}

impl Default for ResolverConfig {
	fn default() -> Self {
		Self {
			base_url: DEFAULT_BASE_URL.to_owned(),
			read_clipboard: true,
			clipboard_attempts: 3,
			clipboard_interval_ms: 150,
			referrer_timeout_ms: 2500,
			attribution_wait_ms: 350,
			call_timeout_secs: 5,
			connect_timeout_secs: 5,
			read_timeout_secs: 5,
			strict_json: false,
			user_agent: format!("SDDLSDK-Rust/{}", env!("CARGO_PKG_VERSION")),
			device: DeviceInfo::default(),
		}
	}
}

impl ResolverConfig {
	pub fn new() -> Self {
		Self::default()
	}

	/// Parses a TOML document and validates it.
	pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(s)?;
		config.validate()?;
		Ok(config)
	}

	/// Reads and parses a TOML file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&text)
	}

	/// Checks that `base_url` is an absolute http(s) URL and that the
	/// clipboard budget and HTTP timeouts are non-zero.
	pub fn validate(&self) -> Result<(), ConfigError> {
		match Url::parse(&self.base_url) {
			Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
			_ => return Err(ConfigError::InvalidBaseUrl(self.base_url.clone())),
		}
		if self.clipboard_attempts == 0 {
			return Err(ConfigError::InvalidValue {
				field: "clipboard_attempts",
				reason: "must be at least 1; set read_clipboard = false to skip the clipboard",
			});
		}
		for (field, secs) in [
			("call_timeout_secs", self.call_timeout_secs),
			("connect_timeout_secs", self.connect_timeout_secs),
			("read_timeout_secs", self.read_timeout_secs),
		] {
			if secs == 0 {
				return Err(ConfigError::InvalidValue {
					field,
					reason: "must be at least 1 second",
				});
			}
		}
		Ok(())
	}

	pub fn base_url(mut self, url: impl Into<String>) -> Self {
		self.base_url = url.into();
		self
	}

	pub fn read_clipboard(mut self, enabled: bool) -> Self {
		self.read_clipboard = enabled;
		self
	}

	pub fn clipboard_poll(mut self, attempts: u32, interval: Duration) -> Self {
		self.clipboard_attempts = attempts;
		self.clipboard_interval_ms = interval.as_millis() as u64;
		self
	}

	pub fn referrer_timeout(mut self, timeout: Duration) -> Self {
		self.referrer_timeout_ms = timeout.as_millis() as u64;
		self
	}

	pub fn attribution_wait(mut self, wait: Duration) -> Self {
		self.attribution_wait_ms = wait.as_millis() as u64;
		self
	}

	pub fn strict_json(mut self, strict: bool) -> Self {
		self.strict_json = strict;
		self
	}

	pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = user_agent.into();
		self
	}

	pub fn device(mut self, device: DeviceInfo) -> Self {
		self.device = device;
		self
	}

	pub fn poll_policy(&self) -> PollPolicy {
		PollPolicy {
			attempts: self.clipboard_attempts,
			interval: Duration::from_millis(self.clipboard_interval_ms),
		}
	}

	pub fn timeouts(&self) -> Timeouts {
		Timeouts {
			call: Duration::from_secs(self.call_timeout_secs),
			connect: Duration::from_secs(self.connect_timeout_secs),
			read: Duration::from_secs(self.read_timeout_secs),
		}
	}

	pub fn referrer_timeout_duration(&self) -> Duration {
		Duration::from_millis(self.referrer_timeout_ms)
	}

	pub fn attribution_wait_duration(&self) -> Duration {
		Duration::from_millis(self.attribution_wait_ms)
	}
}
