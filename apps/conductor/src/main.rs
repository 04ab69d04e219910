use anyhow::{Context, Result};
use clap::Parser;
use conductor::{Conductor, ConductorConfig};
use playout_clock::{Clock, SystemClock};
use playout_device_caspar::{CasparDevice, CommandReceiver, Dispatch};
use playout_events::EventBus;
use playout_timeline::{Resolver, StaticResolver};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "conductor", about = "Broadcast playout orchestrator control plane")]
struct Args {
	/// Path to a JSON `ConductorConfig` document.
	#[arg(long, env = "CONDUCTOR_CONFIG")]
	config: PathBuf,

	/// `tracing_subscriber::EnvFilter` directive, e.g. `info` or `conductor=debug`.
	#[arg(long, env = "CONDUCTOR_LOG", default_value = "info")]
	log_level: String,

	/// How often to drive the tick loop.
	#[arg(long, default_value_t = 250)]
	tick_interval_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();
	tracing_subscriber::fmt().with_env_filter(EnvFilter::new(&args.log_level)).init();

	let raw = std::fs::read_to_string(&args.config).with_context(|| format!("reading config at {}", args.config.display()))?;
	let config: ConductorConfig = serde_json::from_str(&raw).context("parsing conductor config")?;

	let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
	let resolver: Arc<dyn Resolver> = Arc::new(StaticResolver::new());
	let events = EventBus::new();

	let mut conductor = Conductor::<CasparDevice>::new(Arc::clone(&clock), Arc::clone(&resolver), events.clone(), config.initialize_as_clear);
	if let Some(horizon) = config.horizon_ms {
		conductor = conductor.with_horizon(horizon);
	}
	conductor.set_mapping(config.mapping.clone()).await.context("applying initial mapping")?;

	for (device_id, options) in &config.devices {
		let receiver: CommandReceiver = Arc::new(|dispatch: Dispatch| {
			Box::pin(async move {
				tracing::info!(?dispatch, "dispatching playout command");
				Ok(())
			})
		});
		let device = CasparDevice::new(device_id.clone(), Arc::clone(&clock), events.clone(), receiver);
		conductor.add_device(device_id.clone(), device, options.clone()).await.with_context(|| format!("initializing device {device_id}"))?;
	}

	let shutdown = CancellationToken::new();
	let shutdown_signal = shutdown.clone();
	tokio::spawn(async move {
		if tokio::signal::ctrl_c().await.is_ok() {
			shutdown_signal.cancel();
		}
	});

	let mut ticker = tokio::time::interval(Duration::from_millis(args.tick_interval_ms));
	loop {
		tokio::select! {
			() = shutdown.cancelled() => break,
			_ = ticker.tick() => {
				if let Err(err) = conductor.tick().await {
					tracing::error!(error = %err, "tick failed");
				}
			}
		}
	}

	tracing::info!("shutting down");
	Ok(())
}
