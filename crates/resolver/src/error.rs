//! Error types surfaced by the resolver.

use std::path::PathBuf;

use thiserror::Error;

use crate::fetch::Endpoint;
use crate::transport::TransportError;

/// Coarse classification of a failed resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	/// Connection failure, timeout, or a status the fallback chain does not cover.
	NetworkOrHttp,
	/// The response body was not valid JSON (strict mode only).
	Parse,
	/// The pipeline ended without producing an outcome.
	Interrupted,
}

/// Terminal failure of one resolution.
///
/// The `Display` form is the human-readable message handed to
/// [`ResolveCallback::on_error`](crate::ResolveCallback::on_error).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ResolveError {
	/// A non-2xx status that does not trigger a fallback.
	#[error("{} {status}", .endpoint.status_label())]
	Http { endpoint: Endpoint, status: u16 },
	/// Connection, timeout, or body transfer failure.
	#[error("Network error: {0}")]
	Network(String),
	/// The success body was not JSON and strict parsing is enabled.
	#[error("Parse error: {0}")]
	Parse(String),
	/// The pipeline task stopped before delivering an outcome.
	#[error("resolution interrupted before an outcome was produced")]
	Interrupted,
}

impl ResolveError {
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::Http { .. } | Self::Network(_) => ErrorKind::NetworkOrHttp,
			Self::Parse(_) => ErrorKind::Parse,
			Self::Interrupted => ErrorKind::Interrupted,
		}
	}
}

impl From<TransportError> for ResolveError {
	fn from(err: TransportError) -> Self {
		Self::Network(err.to_string())
	}
}

/// Errors from loading or validating [`ResolverConfig`](crate::ResolverConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// The file is not valid TOML for this schema.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	/// `base_url` is not an absolute http(s) URL.
	#[error("invalid base URL {0:?}: expected an absolute http or https URL")]
	InvalidBaseUrl(String),

	/// A numeric setting is out of range.
	#[error("invalid {field}: {reason}")]
	InvalidValue {
		field: &'static str,
		reason: &'static str,
	},
}

/// Errors from persistent key-value storage.
#[derive(Debug, Error)]
pub enum StoreError {
	#[error("I/O error on {path}: {error}")]
	Io { path: PathBuf, error: std::io::Error },

	#[error("corrupt preferences file {path}: {error}")]
	Decode { path: PathBuf, error: serde_json::Error },

	#[error("failed to encode preferences: {0}")]
	Encode(#[from] serde_json::Error),
}

/// Errors from [`ResolverBuilder::build`](crate::ResolverBuilder::build).
#[derive(Debug, Error)]
pub enum BuildError {
	#[error(transparent)]
	Config(#[from] ConfigError),

	#[error(transparent)]
	Transport(#[from] TransportError),
}

/// Result type for resolution outcomes.
pub type Result<T, E = ResolveError> = std::result::Result<T, E>;
