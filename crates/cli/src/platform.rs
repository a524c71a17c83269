//! Platform services backed by command line arguments.

use async_trait::async_trait;
use sddl_resolver::{Clipboard, ClipboardError, ProviderError, ReferrerDetails, ReferrerProvider};

/// Clipboard whose primary clip is fixed for the whole run.
#[derive(Debug, Clone, Default)]
pub struct StaticClipboard {
	text: Option<String>,
}

impl StaticClipboard {
	pub fn new(text: Option<String>) -> Self {
		Self { text }
	}
}

impl Clipboard for StaticClipboard {
	fn primary_text(&self) -> Result<Option<String>, ClipboardError> {
		Ok(self.text.clone())
	}
}

/// Install referrer supplied on the command line.
///
/// Without a referrer string the provider reports itself unavailable, the
/// same way a device without an install referrer service does.
#[derive(Debug, Clone, Default)]
pub struct StaticReferrer {
	referrer: Option<String>,
	click_ts_sec: i64,
	install_begin_ts_sec: i64,
}

impl StaticReferrer {
	pub fn new(referrer: Option<String>, click_ts_sec: i64, install_begin_ts_sec: i64) -> Self {
		Self {
			referrer,
			click_ts_sec,
			install_begin_ts_sec,
		}
	}
}

#[async_trait]
impl ReferrerProvider for StaticReferrer {
	async fn fetch(&self) -> Result<ReferrerDetails, ProviderError> {
		let Some(referrer) = &self.referrer else {
			return Err(ProviderError::Unavailable);
		};
		Ok(ReferrerDetails {
			referrer: referrer.clone(),
			click_ts_sec: self.click_ts_sec,
			install_begin_ts_sec: self.install_begin_ts_sec,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn clipboard_returns_fixed_text() {
		assert_eq!(StaticClipboard::new(Some("AbC123".into())).primary_text().unwrap().as_deref(), Some("AbC123"));
		assert_eq!(StaticClipboard::default().primary_text().unwrap(), None);
	}

	#[tokio::test]
	async fn referrer_without_value_is_unavailable() {
		assert!(matches!(StaticReferrer::default().fetch().await, Err(ProviderError::Unavailable)));

		let details = StaticReferrer::new(Some("utm_source=cli".into()), 5, 6).fetch().await.unwrap();
		assert_eq!(details.referrer, "utm_source=cli");
		assert_eq!((details.click_ts_sec, details.install_begin_ts_sec), (5, 6));
	}
}
