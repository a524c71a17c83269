//! Subcommand implementations.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use sddl_primitives::{Identifier, MAX_IDENTIFIER_LEN, MIN_IDENTIFIER_LEN, parse_query};
use sddl_resolver::{
	AttributionRecord, FileStore, KeyValueStore, LocalState, PrefsState, ResolutionRequest, Resolver, ResolverConfig,
};
use serde_json::{Value, json};

use crate::platform::{StaticClipboard, StaticReferrer};

/// Inputs for one `sddl resolve` run.
#[derive(Debug, Default)]
pub struct ResolveOptions {
	pub link: Option<String>,
	pub clipboard_text: Option<String>,
	pub referrer: Option<String>,
	pub click_ts: i64,
	pub install_begin_ts: i64,
	pub base_url: Option<String>,
	pub no_clipboard: bool,
	pub strict_json: bool,
}

/// Reads the TOML config at `path`, or the defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<ResolverConfig> {
	match path {
		Some(path) => ResolverConfig::load(path).with_context(|| format!("loading config {}", path.display())),
		None => Ok(ResolverConfig::default()),
	}
}

fn open_state(dir: &Path) -> Result<(Arc<FileStore>, Arc<PrefsState>)> {
	let store = Arc::new(FileStore::open(dir).with_context(|| format!("opening state in {}", dir.display()))?);
	let state = Arc::new(PrefsState::new(store.clone()));
	Ok((store, state))
}

/// Applies command line overrides and fills device fields the config leaves
/// unset from the host.
fn prepare_config(mut config: ResolverConfig, opts: &ResolveOptions) -> ResolverConfig {
	if let Some(base_url) = &opts.base_url {
		config = config.base_url(base_url.clone());
	}
	if opts.no_clipboard {
		config = config.read_clipboard(false);
	}
	if opts.strict_json {
		config = config.strict_json(true);
	}
	let device = config.device.clone().or_detected();
	config.device(device)
}

pub async fn resolve(config: ResolverConfig, state_dir: &Path, opts: ResolveOptions) -> Result<ExitCode> {
	let config = prepare_config(config, &opts);
	let (store, state) = open_state(state_dir)?;
	let resolver = Resolver::builder(config)
		.state(state.clone())
		.clipboard(Arc::new(StaticClipboard::new(opts.clipboard_text)))
		.referrer_provider(Arc::new(StaticReferrer::new(opts.referrer, opts.click_ts, opts.install_begin_ts)))
		.build()
		.context("building resolver")?;
	resolver.warm_up();

	let request = ResolutionRequest::from_link_str(opts.link.as_deref()).clipboard_fallback(resolver.config().read_clipboard);
	let Some(handle) = resolver.resolve(request) else {
		eprintln!("nothing to resolve: organic launch already handled (see `sddl state clear`)");
		store.flush().context("saving state")?;
		return Ok(ExitCode::SUCCESS);
	};

	let code = match handle.await {
		Ok(details) => {
			println!("{}", serde_json::to_string_pretty(&Value::Object(details))?);
			report_attribution(resolver.attribution().read_cached().as_ref(), state.as_ref());
			ExitCode::SUCCESS
		}
		Err(error) => {
			tracing::debug!(kind = ?error.kind(), "resolution failed");
			eprintln!("error: {error}");
			ExitCode::FAILURE
		}
	};
	store.flush().context("saving state")?;
	Ok(code)
}

/// Reports a freshly cached attribution once, then flags it as sent.
fn report_attribution(record: Option<&AttributionRecord>, state: &dyn LocalState) {
	let Some(record) = record else {
		return;
	};
	if state.attribution_sent() {
		return;
	}
	eprintln!("install attribution: {}", attribution_json(record));
	state.mark_attribution_sent();
}

fn attribution_json(record: &AttributionRecord) -> Value {
	json!({
		"raw": record.raw_referrer(),
		"click_ts_sec": record.click_ts_sec(),
		"install_begin_ts_sec": record.install_begin_ts_sec(),
		"params": record.params(),
	})
}

pub fn validate(id: &str) -> ExitCode {
	match Identifier::parse(id) {
		Some(id) => {
			println!("{id}: valid");
			ExitCode::SUCCESS
		}
		None => {
			println!("{id:?}: invalid ({MIN_IDENTIFIER_LEN}..={MAX_IDENTIFIER_LEN} characters of A-Z a-z 0-9 _ -)");
			ExitCode::FAILURE
		}
	}
}

pub fn referrer(raw: &str) -> Result<()> {
	let params = parse_query(Some(raw));
	println!("{}", serde_json::to_string_pretty(&params)?);
	Ok(())
}

pub fn state_show(state_dir: &Path) -> Result<()> {
	let (store, state) = open_state(state_dir)?;
	let entries = store.snapshot().context("reading state")?;
	let summary = json!({
		"path": store.path().display().to_string(),
		"cold_start_handled": state.cold_start_handled(),
		"attribution": state.attribution().as_ref().map(attribution_json),
		"attribution_sent": state.attribution_sent(),
		"entries": entries,
	});
	println!("{}", serde_json::to_string_pretty(&summary)?);
	Ok(())
}

pub fn state_clear(state_dir: &Path) -> Result<()> {
	let (store, _) = open_state(state_dir)?;
	store.clear().context("clearing state")?;
	store.flush().context("clearing state")?;
	tracing::info!(path = %store.path().display(), "state cleared");
	Ok(())
}

/// `$XDG_STATE_HOME/sddl`, `~/.local/state/sddl`, or a temp directory.
pub fn default_state_dir() -> PathBuf {
	if let Some(dir) = std::env::var_os("XDG_STATE_HOME").filter(|d| !d.is_empty()) {
		return PathBuf::from(dir).join("sddl");
	}
	if let Some(home) = std::env::var_os("HOME").filter(|d| !d.is_empty()) {
		return PathBuf::from(home).join(".local/state/sddl");
	}
	std::env::temp_dir().join("sddl")
}
