use url::Url;

/// One invocation of the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRequest {
	/// App-link URI that opened the app, if any.
	pub inbound: Option<Url>,
	/// Whether the clipboard may be polled when the URI yields no identifier.
	pub wants_clipboard_fallback: bool,
}

impl ResolutionRequest {
	/// A request for an app opened through `link`, with clipboard fallback.
	pub fn from_link(link: Url) -> Self {
		Self {
			inbound: Some(link),
			wants_clipboard_fallback: true,
		}
	}

	/// A request for an app opened without a link, with clipboard fallback.
	pub fn organic() -> Self {
		Self {
			inbound: None,
			wants_clipboard_fallback: true,
		}
	}

	/// Parses `link` leniently: an unparseable string counts as no link.
	pub fn from_link_str(link: Option<&str>) -> Self {
		match link.map(Url::parse) {
			Some(Ok(url)) => Self::from_link(url),
			Some(Err(error)) => {
				tracing::debug!(%error, "ignoring unparseable inbound link");
				Self::organic()
			}
			None => Self::organic(),
		}
	}

	pub fn clipboard_fallback(mut self, enabled: bool) -> Self {
		self.wants_clipboard_fallback = enabled;
		self
	}

	pub fn has_inbound(&self) -> bool {
		self.inbound.is_some()
	}
}
