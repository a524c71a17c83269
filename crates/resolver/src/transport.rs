//! HTTP seam for the fetch chain.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

/// Status and body of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
	pub status: u16,
	pub body: String,
}

impl HttpResponse {
	pub fn new(status: u16, body: impl Into<String>) -> Self {
		Self { status, body: body.into() }
	}

	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Transport-level failure: no usable response was received.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
	#[error("request timed out: {0}")]
	Timeout(String),
	#[error("{0}")]
	Io(String),
	#[error("failed to build HTTP client: {0}")]
	Build(String),
}

/// Time bounds applied to each request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
	/// Whole exchange, including writing the request and reading the body.
	pub call: Duration,
	pub connect: Duration,
	pub read: Duration,
}

impl Default for Timeouts {
	fn default() -> Self {
		Self {
			call: Duration::from_secs(5),
			connect: Duration::from_secs(5),
			read: Duration::from_secs(5),
		}
	}
}

/// Issues GET requests for the fetch chain.
#[async_trait]
pub trait HttpTransport: Send + Sync {
	async fn get(&self, url: &str, headers: &[(&'static str, String)]) -> Result<HttpResponse, TransportError>;
}

/// [`HttpTransport`] over a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
	client: Client,
}

impl ReqwestTransport {
	pub fn new(timeouts: Timeouts) -> Result<Self, TransportError> {
		let client = Client::builder()
			.timeout(timeouts.call)
			.connect_timeout(timeouts.connect)
			.read_timeout(timeouts.read)
			.build()
			.map_err(|e| TransportError::Build(e.to_string()))?;
		Ok(Self { client })
	}
}

fn header_map(headers: &[(&'static str, String)]) -> HeaderMap {
	let mut map = HeaderMap::with_capacity(headers.len());
	for (name, value) in headers {
		match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
			(Ok(name), Ok(value)) => {
				map.insert(name, value);
			}
			_ => tracing::debug!(header = *name, "dropping header with unrepresentable value"),
		}
	}
	map
}

fn classify(err: reqwest::Error) -> TransportError {
	if err.is_timeout() {
		TransportError::Timeout(err.to_string())
	} else {
		TransportError::Io(err.to_string())
	}
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
	async fn get(&self, url: &str, headers: &[(&'static str, String)]) -> Result<HttpResponse, TransportError> {
		let response = self.client.get(url).headers(header_map(headers)).send().await.map_err(classify)?;
		let status = response.status().as_u16();
		let body = response.text().await.map_err(classify)?;
		Ok(HttpResponse { status, body })
	}
}
