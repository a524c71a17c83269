//! Device and attribution headers attached to every resolution request.
//!
//! Every field is optional. Missing, empty, or non-header-safe values are
//! dropped; building headers never fails.

use serde::{Deserialize, Serialize};

use crate::attribution::AttributionRecord;

pub const USER_AGENT: &str = "User-Agent";
pub const DEVICE_PLATFORM: &str = "X-Device-Platform";
pub const APP_IDENTIFIER: &str = "X-App-Identifier";
pub const SCREEN_WIDTH: &str = "X-Client-Screen-Width";
pub const SCREEN_HEIGHT: &str = "X-Client-Screen-Height";
pub const DPR: &str = "X-Client-DPR";
pub const OS_VERSION: &str = "X-Client-OS-Version";
pub const LANGUAGE: &str = "X-Client-Language";
pub const TIMEZONE: &str = "X-Client-Timezone";
pub const INSTALL_REFERRER: &str = "X-Install-Referrer";
pub const REFERRER_CLICK_TS: &str = "X-Referrer-Click-Ts";
pub const INSTALL_BEGIN_TS: &str = "X-Install-Begin-Ts";
pub const GCLID: &str = "X-GCLID";
pub const SDDL_ID: &str = "X-SDDL-ID";

/// Referrer parameters forwarded as headers, `(param, header)`.
const PARAM_HEADERS: &[(&str, &str)] = &[
	("utm_source", "X-UTM-Source"),
	("utm_medium", "X-UTM-Medium"),
	("utm_campaign", "X-UTM-Campaign"),
	("utm_term", "X-UTM-Term"),
	("utm_content", "X-UTM-Content"),
	("gclid", GCLID),
	("sddl_id", SDDL_ID),
];

/// Host device description sent with each request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceInfo {
	pub platform: Option<String>,
	pub app_identifier: Option<String>,
	pub screen_width: Option<u32>,
	pub screen_height: Option<u32>,
	pub dpr: Option<f32>,
	pub os_version: Option<String>,
	pub language: Option<String>,
	pub timezone: Option<String>,
}

impl DeviceInfo {
	/// Best-effort description of the current host from the environment.
	pub fn detect() -> Self {
		let language = ["LC_ALL", "LC_MESSAGES", "LANG"]
			.iter()
			.filter_map(|var| std::env::var(var).ok())
			.find(|v| !v.is_empty() && v != "C" && v != "POSIX")
			.map(|v| v.split('.').next().unwrap_or(&v).replace('_', "-"));
		Self {
			platform: Some(std::env::consts::OS.to_owned()),
			language,
			timezone: std::env::var("TZ").ok().filter(|tz| !tz.is_empty()),
			..Self::default()
		}
	}

	/// Keeps every configured field and fills the unset ones from
	/// [`detect`](Self::detect).
	pub fn or_detected(self) -> Self {
		let detected = Self::detect();
		Self {
			platform: self.platform.or(detected.platform),
			app_identifier: self.app_identifier.or(detected.app_identifier),
			screen_width: self.screen_width.or(detected.screen_width),
			screen_height: self.screen_height.or(detected.screen_height),
			dpr: self.dpr.or(detected.dpr),
			os_version: self.os_version.or(detected.os_version),
			language: self.language.or(detected.language),
			timezone: self.timezone.or(detected.timezone),
		}
	}
}

/// Ordered `(name, value)` header list.
pub type HeaderList = Vec<(&'static str, String)>;

/// Builds the header list for one request.
pub fn build_headers(user_agent: &str, device: &DeviceInfo, attribution: Option<&AttributionRecord>) -> HeaderList {
	let mut headers = HeaderList::new();
	let mut push = |name: &'static str, value: Option<String>| {
		if let Some(value) = value.map(|v| v.trim().to_owned()).filter(|v| is_header_safe(v)) {
			headers.push((name, value));
		}
	};

	push(USER_AGENT, Some(user_agent.to_owned()));
	push(DEVICE_PLATFORM, device.platform.clone());
	push(APP_IDENTIFIER, device.app_identifier.clone());
	push(SCREEN_WIDTH, device.screen_width.map(|w| w.to_string()));
	push(SCREEN_HEIGHT, device.screen_height.map(|h| h.to_string()));
	push(DPR, device.dpr.filter(|d| d.is_finite() && *d > 0.0).map(|d| d.to_string()));
	push(OS_VERSION, device.os_version.clone());
	push(LANGUAGE, device.language.clone());
	push(TIMEZONE, device.timezone.clone());

	if let Some(record) = attribution {
		push(INSTALL_REFERRER, Some(record.raw_referrer().to_owned()));
		push(REFERRER_CLICK_TS, positive(record.click_ts_sec()));
		push(INSTALL_BEGIN_TS, positive(record.install_begin_ts_sec()));
		for &(param, header) in PARAM_HEADERS {
			push(header, record.param(param).map(str::to_owned));
		}
	}

	headers
}

fn positive(ts: i64) -> Option<String> {
	(ts > 0).then(|| ts.to_string())
}

/// Non-empty and made only of visible ASCII, space, or tab.
fn is_header_safe(value: &str) -> bool {
	!value.is_empty() && value.bytes().all(|b| b == b'\t' || (b' '..=b'~').contains(&b))
}
