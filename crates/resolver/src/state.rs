//! Persisted resolver state: cold-start flag, attribution record, reported flag.

use std::sync::Arc;

use crate::attribution::AttributionRecord;
use crate::store::{KeyValueStore, PrefValue};

const KEY_RAW: &str = "sddl.referrer.raw";
const KEY_CLICK: &str = "sddl.referrer.click";
const KEY_INSTALL: &str = "sddl.referrer.install";
const KEY_SENT: &str = "sddl.referrer.sent.v1";
const KEY_COLD_START: &str = "sddl.coldstart.handled.v1";

/// State the orchestrator keeps across launches.
///
/// Implementations never fail: storage problems read as absent values and
/// writes are best-effort.
pub trait LocalState: Send + Sync {
	/// Whether an organic (link-less) launch was already resolved.
	fn cold_start_handled(&self) -> bool;

	/// Sets the cold-start flag. The flag is never unset except by [`clear`](Self::clear).
	fn mark_cold_start_handled(&self);

	/// Reconstructs the cached attribution record, if any.
	fn attribution(&self) -> Option<AttributionRecord>;

	fn store_attribution(&self, record: &AttributionRecord);

	/// Whether a downstream consumer already reported the attribution.
	fn attribution_sent(&self) -> bool;

	fn mark_attribution_sent(&self);

	/// Explicit data clear; resets every key.
	fn clear(&self);
}

/// [`LocalState`] over any [`KeyValueStore`].
#[derive(Clone)]
pub struct PrefsState {
	store: Arc<dyn KeyValueStore>,
}

impl PrefsState {
	pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
		Self { store }
	}

	fn read(&self, key: &str) -> Option<PrefValue> {
		match self.store.get(key) {
			Ok(value) => value,
			Err(error) => {
				tracing::warn!(key, %error, "preference read failed; treating as absent");
				None
			}
		}
	}

	fn write(&self, entries: Vec<(String, PrefValue)>) {
		if let Err(error) = self.store.put_all(entries) {
			tracing::warn!(%error, "preference write failed");
		}
	}

	fn flag(&self, key: &str) -> bool {
		self.read(key).and_then(|v| v.as_bool()).unwrap_or(false)
	}
}

impl LocalState for PrefsState {
	fn cold_start_handled(&self) -> bool {
		self.flag(KEY_COLD_START)
	}

	fn mark_cold_start_handled(&self) {
		self.write(vec![(KEY_COLD_START.into(), PrefValue::Bool(true))]);
	}

	fn attribution(&self) -> Option<AttributionRecord> {
		let raw = match self.read(KEY_RAW)? {
			PrefValue::Str(raw) => raw,
			_ => return None,
		};
		let click = self.read(KEY_CLICK).and_then(|v| v.as_int()).unwrap_or(0);
		let install = self.read(KEY_INSTALL).and_then(|v| v.as_int()).unwrap_or(0);
		Some(AttributionRecord::new(raw, click, install))
	}

	fn store_attribution(&self, record: &AttributionRecord) {
		self.write(vec![
			(KEY_RAW.into(), PrefValue::Str(record.raw_referrer().to_owned())),
			(KEY_CLICK.into(), PrefValue::Int(record.click_ts_sec())),
			(KEY_INSTALL.into(), PrefValue::Int(record.install_begin_ts_sec())),
		]);
	}

	fn attribution_sent(&self) -> bool {
		self.flag(KEY_SENT)
	}

	fn mark_attribution_sent(&self) {
		self.write(vec![(KEY_SENT.into(), PrefValue::Bool(true))]);
	}

	fn clear(&self) {
		if let Err(error) = self.store.clear() {
			tracing::warn!(%error, "preference clear failed");
		}
	}
}
