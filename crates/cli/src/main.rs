//! `sddl` command line tool.
//!
//! Runs one deferred deep link resolution against a resolution service with
//! state persisted under a local directory, and inspects that state.

mod commands;
mod platform;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing::info;

use crate::commands::ResolveOptions;

#[derive(Parser, Debug)]
#[command(name = "sddl")]
#[command(about = "Deferred deep link resolution", version)]
struct Cli {
	/// TOML resolver configuration
	#[arg(short, long, global = true, value_name = "PATH")]
	config: Option<PathBuf>,

	/// Directory holding persisted resolver state
	#[arg(long, global = true, value_name = "DIR")]
	state_dir: Option<PathBuf>,

	/// Verbose logging
	#[arg(short, long, global = true)]
	verbose: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Resolve the link (or organic launch) and print the details payload
	Resolve(ResolveArgs),
	/// Check whether a string is a well-formed link identifier
	Validate { id: String },
	/// Decode an install referrer query string
	Referrer { raw: String },
	/// Inspect or reset persisted state
	State {
		#[command(subcommand)]
		action: StateAction,
	},
}

#[derive(Args, Debug)]
struct ResolveArgs {
	/// App link that opened the app; omit for an organic launch
	link: Option<String>,

	/// Text the clipboard holds during the run
	#[arg(long, value_name = "TEXT")]
	clipboard_text: Option<String>,

	/// Never read the clipboard
	#[arg(long)]
	no_clipboard: bool,

	/// Install referrer reported by the attribution provider
	#[arg(long, value_name = "QUERY")]
	referrer: Option<String>,

	#[arg(long, default_value_t = 0, value_name = "SECS")]
	click_ts: i64,

	#[arg(long, default_value_t = 0, value_name = "SECS")]
	install_begin_ts: i64,

	/// Override the configured service root
	#[arg(long, value_name = "URL")]
	base_url: Option<String>,

	/// Fail when a success body is not JSON
	#[arg(long)]
	strict_json: bool,
}

#[derive(Subcommand, Debug)]
enum StateAction {
	Show,
	Clear,
}

impl From<ResolveArgs> for ResolveOptions {
	fn from(args: ResolveArgs) -> Self {
		Self {
			link: args.link,
			clipboard_text: args.clipboard_text,
			referrer: args.referrer,
			click_ts: args.click_ts,
			install_begin_ts: args.install_begin_ts,
			base_url: args.base_url,
			no_clipboard: args.no_clipboard,
			strict_json: args.strict_json,
		}
	}
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
	let cli = Cli::parse();
	setup_tracing(cli.verbose);

	let state_dir = cli.state_dir.unwrap_or_else(commands::default_state_dir);

	match cli.command {
		Command::Resolve(args) => {
			let config = commands::load_config(cli.config.as_deref())?;
			info!(base_url = %config.base_url, state_dir = %state_dir.display(), "resolving");
			commands::resolve(config, &state_dir, args.into()).await
		}
		Command::Validate { id } => Ok(commands::validate(&id)),
		Command::Referrer { raw } => commands::referrer(&raw).map(|()| ExitCode::SUCCESS),
		Command::State { action: StateAction::Show } => commands::state_show(&state_dir).map(|()| ExitCode::SUCCESS),
		Command::State { action: StateAction::Clear } => commands::state_clear(&state_dir).map(|()| ExitCode::SUCCESS),
	}
}

/// Logs to stderr, filtered by `SDDL_LOG` or `RUST_LOG`.
fn setup_tracing(verbose: bool) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_env("SDDL_LOG")
		.or_else(|_| EnvFilter::try_from_default_env())
		.unwrap_or_else(|_| {
			if verbose {
				EnvFilter::new("sddl=debug,sddl_resolver=debug,sddl_worker=trace,info")
			} else {
				EnvFilter::new("warn")
			}
		});

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_target(verbose)
		.init();
}

#[cfg(test)]
mod tests {
	use clap::CommandFactory;

	use super::*;

	#[test]
	fn cli_definition_is_consistent() {
		Cli::command().debug_assert();
	}

	#[test]
	fn resolve_flags_parse() {
		let cli = Cli::try_parse_from([
			"sddl",
			"--state-dir",
			"/tmp/s",
			"resolve",
			"https://sddl.me/AbC123",
			"--referrer",
			"utm_source=x",
			"--click-ts",
			"7",
			"--no-clipboard",
		])
		.unwrap();
		assert_eq!(cli.state_dir.as_deref(), Some(std::path::Path::new("/tmp/s")));
		let Command::Resolve(args) = cli.command else {
			panic!("expected resolve");
		};
		let opts = ResolveOptions::from(args);
		assert_eq!(opts.link.as_deref(), Some("https://sddl.me/AbC123"));
		assert_eq!(opts.referrer.as_deref(), Some("utm_source=x"));
		assert_eq!(opts.click_ts, 7);
		assert!(opts.no_clipboard);
	}

	#[test]
	fn state_subcommands_parse() {
		let cli = Cli::try_parse_from(["sddl", "state", "clear"]).unwrap();
		assert!(matches!(cli.command, Command::State { action: StateAction::Clear }));
	}
}
