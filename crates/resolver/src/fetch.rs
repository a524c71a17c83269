//! The by-id request and its heuristic "try" fallback.

use std::sync::Arc;

use sddl_primitives::Identifier;
use serde_json::Value;

use crate::error::{ResolveError, Result};
use crate::headers::{DeviceInfo, build_headers};
use crate::outcome::Details;
use crate::state::LocalState;
use crate::transport::HttpTransport;

/// Which resolution endpoint a request targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
	/// `GET {base}/api/{id}/details`
	ById,
	/// `GET {base}/api/try/details`
	Try,
}

impl Endpoint {
	pub(crate) const fn status_label(self) -> &'static str {
		match self {
			Self::ById => "HTTP",
			Self::Try => "TRY",
		}
	}
}

/// Issues resolution requests against one service.
pub struct FetchChain {
	transport: Arc<dyn HttpTransport>,
	state: Arc<dyn LocalState>,
	base_url: String,
	user_agent: String,
	device: DeviceInfo,
	strict_json: bool,
}

impl FetchChain {
	pub fn new(transport: Arc<dyn HttpTransport>, state: Arc<dyn LocalState>, base_url: &str, user_agent: impl Into<String>) -> Self {
		Self {
			transport,
			state,
			base_url: base_url.trim_end_matches('/').to_owned(),
			user_agent: user_agent.into(),
			device: DeviceInfo::default(),
			strict_json: false,
		}
	}

	pub fn device(mut self, device: DeviceInfo) -> Self {
		self.device = device;
		self
	}

	/// Fail on non-JSON success bodies instead of substituting `{}`.
	pub fn strict_json(mut self, strict: bool) -> Self {
		self.strict_json = strict;
		self
	}

	pub fn by_id_url(&self, id: &Identifier) -> String {
		format!("{}/api/{id}/details", self.base_url)
	}

	pub fn try_url(&self) -> String {
		format!("{}/api/try/details", self.base_url)
	}

	/// Fetches details for `id`.
	///
	/// 404 and 410 mean the identifier is unknown or expired and fall through
	/// to [`fetch_try`](Self::fetch_try). Any other failure is final.
	pub async fn fetch_by_id(&self, id: &Identifier) -> Result<Details> {
		let response = self.transport.get(&self.by_id_url(id), &self.headers()).await?;
		match response.status {
			_ if response.is_success() => self.parse_details(&response.body),
			404 | 410 => {
				tracing::debug!(%id, status = response.status, "identifier not resolvable; falling back to try");
				self.fetch_try().await
			}
			status => Err(ResolveError::Http {
				endpoint: Endpoint::ById,
				status,
			}),
		}
	}

	/// Asks the service to match this device heuristically.
	pub async fn fetch_try(&self) -> Result<Details> {
		let response = self.transport.get(&self.try_url(), &self.headers()).await?;
		if response.is_success() {
			self.parse_details(&response.body)
		} else {
			Err(ResolveError::Http {
				endpoint: Endpoint::Try,
				status: response.status,
			})
		}
	}

	/// Attribution is read at send time so a record cached mid-resolution is
	/// still included.
	fn headers(&self) -> Vec<(&'static str, String)> {
		build_headers(&self.user_agent, &self.device, self.state.attribution().as_ref())
	}

	/// Any JSON object is accepted as is; other JSON values become `{}`.
	/// Unparseable bodies become `{}` too unless strict parsing is on.
	fn parse_details(&self, body: &str) -> Result<Details> {
		match serde_json::from_str::<Value>(body) {
			Ok(Value::Object(details)) => Ok(details),
			Ok(_) => Ok(Details::new()),
			Err(error) if self.strict_json => Err(ResolveError::Parse(error.to_string())),
			Err(error) => {
				tracing::debug!(%error, "response body is not JSON; using empty details");
				Ok(Details::new())
			}
		}
	}
}
