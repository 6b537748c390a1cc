use clap::{Parser, ValueEnum};
use playback_engine::playback_events::Authority;
use playback_engine::PlaybackSettings;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Clone, Debug)]
#[command(name = "playback-driver")]
#[command(about = "Drives authored scenarios on a timer for a presenter and remote peers", long_about = None)]
pub struct Config {
	/// Scenario catalog (JSON document with a `scenarios` array)
	#[arg(long, env = "SCENARIO_CATALOG", default_value = "apps/playback-driver/scenarios/demo.json")]
	pub catalog: PathBuf,

	/// Start the next scenario once one completes
	#[arg(long, env = "AUTO_ADVANCE", default_value = "false")]
	pub auto_advance: bool,

	/// Pause before the next scenario starts, in milliseconds
	#[arg(long, env = "INTER_SCENARIO_DELAY_MS", default_value = "3000")]
	pub inter_scenario_delay_ms: u64,

	/// Wrap around to the first scenario after the last one
	#[arg(long, env = "LOOP_CATALOG", default_value = "false")]
	pub loop_catalog: bool,

	/// Initial playback speed
	#[arg(long, env = "PLAYBACK_SPEED", default_value = "1.0")]
	pub speed: f64,

	/// Speed change per faster/slower key press
	#[arg(long, env = "SPEED_STEP", default_value = "0.25")]
	pub speed_step: f64,

	/// Accept remote drivers on this address
	#[arg(long, env = "REMOTE_LISTEN")]
	pub remote_listen: Option<SocketAddr>,

	/// Who owns step timing for sessions started by a remote driver
	#[arg(long, env = "REMOTE_MODE", value_enum, default_value_t = RemoteMode::Local)]
	pub remote_mode: RemoteMode,

	/// Scenario to start as soon as the engine is up
	#[arg(long, env = "AUTOSTART")]
	pub autostart: Option<String>,

	/// Use JSON formatting for tracing
	#[arg(long, env = "LOG_JSON", default_value = "false")]
	pub log_json: bool,

	/// Log level
	#[arg(long, env = "RUST_LOG")]
	pub rust_log: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoteMode {
	/// Local timers pace remote-started sessions
	Local,
	/// The remote driver paces its sessions with explicit jumps
	Remote,
}

impl From<RemoteMode> for Authority {
	fn from(mode: RemoteMode) -> Self {
		match mode {
			RemoteMode::Local => Self::Local,
			RemoteMode::Remote => Self::Remote,
		}
	}
}

impl Config {
	pub fn settings(&self) -> PlaybackSettings {
		PlaybackSettings::new()
			.with_auto_advance(self.auto_advance)
			.with_inter_scenario_delay(self.inter_scenario_delay_ms)
			.with_loop_catalog(self.loop_catalog)
			.with_initial_speed(self.speed)
			.with_speed_step(self.speed_step)
	}
}
