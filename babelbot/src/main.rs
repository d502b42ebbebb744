//! babelbot: a reactive automation agent for Tower of Babel: Survivors.
//!
//! Captures a configured screen region, classifies pixel blobs into game
//! entities, and steers the character away from trouble while picking
//! upgrades informed by how past picks performed.

mod capture;
mod config;
mod input;
mod policy;
mod runner;

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::Config;
use crate::policy::{BaselinePolicy, EnhancedPolicy, Policy, PolicyKind};
use crate::runner::{Runner, RunnerConfig, StopSignal};

fn main() -> Result<()> {
    // Structured logging. Use `RUST_LOG=info` etc.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::load_or_default();

    let mut detector = vision::Detector::new(config.detector.clone());
    match &config.template_path {
        Some(path) => detector
            .load_template(path)
            .with_context(|| format!("load level-up template {:?}", path))?,
        None => warn!("no level-up template configured; the dark-overlay fallback is less reliable"),
    }

    let store_path = config.store_path_or_default()?;
    let store = stats::UpgradeStore::load(&store_path)
        .with_context(|| format!("load upgrade stats {:?}", store_path))?;
    info!(path = %store_path.display(), upgrades = store.len(), "upgrade stats loaded");

    let policy: Box<dyn Policy> = match config.policy_kind {
        PolicyKind::Baseline => Box::new(BaselinePolicy),
        PolicyKind::Enhanced => Box::new(EnhancedPolicy::new(config.policy)),
    };

    let stop = StopSignal::new();
    spawn_stop_listener(stop.clone());

    let source = capture::MonitorRegionSource::new(config.region, config.max_capture_height);
    let sink = input::TracingSink::default();

    let runner_config = RunnerConfig {
        tick: Duration::from_millis(config.tick_ms),
        backoff: Duration::from_millis(config.backoff_ms),
        collect_radius: config.policy.collection_distance,
        ..RunnerConfig::default()
    };

    // The upgrade-label recognizer is an external collaborator; none is
    // wired in by default, so the selector sees positional placeholders.
    Runner::new(
        runner_config,
        detector,
        policy,
        store,
        None,
        source,
        sink,
        stop,
    )
    .run()
}

/// The global-hotkey trigger is an external collaborator; until one is wired
/// up, a `q` line on stdin requests an orderly stop.
fn spawn_stop_listener(stop: StopSignal) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut line = String::new();
        loop {
            line.clear();
            match stdin.read_line(&mut line) {
                Ok(0) | Err(_) => return,
                Ok(_) => {
                    if line.trim().eq_ignore_ascii_case("q") {
                        info!("stop requested");
                        stop.request_stop();
                        return;
                    }
                }
            }
        }
    });
}
