mod config;
mod console;
mod listener;

use crate::config::Config;
use anyhow::{Context, Result};
use clap::Parser;
use playback_engine::playback_events::PlaybackEvent;
use playback_engine::{MetricsBoard, PlaybackEngine, ScenarioCatalog};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::fmt::format::JsonFields;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

fn init_tracing(config: &Config) {
	use tracing_subscriber::layer::SubscriberExt;

	let filter = EnvFilter::try_new(config.rust_log.as_deref().unwrap_or("info")).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::registry()
		.with(if config.log_json {
			Box::new(
				tracing_subscriber::fmt::layer()
					.fmt_fields(JsonFields::default())
					.event_format(tracing_subscriber::fmt::format().json().flatten_event(true).with_span_list(false))
					.with_filter(filter),
			) as Box<dyn Layer<_> + Send + Sync>
		} else {
			Box::new(tracing_subscriber::fmt::layer().event_format(tracing_subscriber::fmt::format().pretty()).with_filter(filter))
		})
		.init();
}

/// Step narrative for whoever is watching the logs
fn narrate(event: &PlaybackEvent) {
	match event {
		PlaybackEvent::ScenarioStarted { scenario_id, authority, session } => info!(scenario_id = %scenario_id, ?authority, session, "Scenario started"),
		PlaybackEvent::StepChanged { scenario_id, step_index, step } => info!(
			scenario_id = %scenario_id,
			step_index,
			step = %step.id,
			severity = ?step.severity,
			target = %step.visualization_target,
			"{}",
			if step.narrative.is_empty() { &step.title } else { &step.narrative }
		),
		PlaybackEvent::Paused { elapsed_secs } => info!(elapsed_secs, "Paused"),
		PlaybackEvent::Resumed { elapsed_secs } => info!(elapsed_secs, "Resumed"),
		PlaybackEvent::SpeedChanged { speed } => info!(%speed, "Speed changed"),
		PlaybackEvent::ScenarioCompleted { scenario_id } => info!(scenario_id = %scenario_id, "Scenario completed"),
		PlaybackEvent::ScenarioStopped { scenario_id } => info!(scenario_id = %scenario_id, "Scenario stopped"),
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	dotenv::dotenv().ok();
	let config = Config::parse();
	init_tracing(&config);

	let catalog = ScenarioCatalog::from_path(&config.catalog).with_context(|| format!("Failed to load scenario catalog from {}", config.catalog.display()))?;
	info!(scenarios = ?catalog.ids(), "Catalog loaded");

	let engine = PlaybackEngine::new(Arc::new(catalog), config.settings());
	let _narration = engine.subscribe(narrate);
	let (board, _board_subscription) = MetricsBoard::observe(engine.bus());
	let _board_log = engine.subscribe({
		let board = Arc::clone(&board);
		move |event| {
			if matches!(event, PlaybackEvent::StepChanged { .. }) {
				if let Ok(board) = board.try_lock() {
					info!(metrics = ?board.metrics(), "Metrics");
				}
			}
		}
	});

	let cancel = CancellationToken::new();
	let mut tasks = Vec::new();

	if let Some(addr) = config.remote_listen {
		let listener = TcpListener::bind(addr).await.with_context(|| format!("Failed to bind remote listener on {addr}"))?;
		info!("Accepting remote drivers on {}", listener.local_addr()?);
		tasks.push(tokio::spawn(listener::serve(listener, engine.handle(), config.remote_mode.into(), cancel.clone())));
	}

	tasks.push(tokio::spawn(console::run(engine.handle(), config.speed_step, cancel.clone())));

	if let Some(scenario_id) = &config.autostart {
		if let Err(e) = engine.start(scenario_id.as_str()).await {
			warn!(scenario_id = %scenario_id, error = %e, "Autostart failed");
		}
	}

	tokio::signal::ctrl_c().await.context("Failed to listen for ctrl-c")?;
	info!("Shutting down");

	cancel.cancel();
	for task in tasks {
		let _ = task.await;
	}
	engine.shutdown().await;
	Ok(())
}
