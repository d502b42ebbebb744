//! The capture → detect → decide → act loop.
//!
//! One logical thread: every tick captures a frame, classifies it, and emits
//! exactly one command. A cycle either completes or is abandoned whole; the
//! loop itself only exits on an explicit stop request or when the screen
//! region never becomes capturable at startup. Shutdown always releases held
//! keys so the character is never left running into a wall.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use tracing::{info, warn};

use stats::{CombatSession, PRIMARY_CHOICES, UpgradeStore, select_best};
use vision::{DetectionResult, Detector, Entity, Frame, LevelUpStatus};

use crate::capture::FrameSource;
use crate::input::{CommandSink, MovementIntent};
use crate::policy::{Policy, distance};

/// A shard that reappears within this radius of its previous center is the
/// same shard; one that vanishes while the player is on top of it was
/// collected.
const SHARD_TRACK_RADIUS: f32 = 15.0;

/// Cooperative stop flag, set by an external trigger (hotkey collaborator,
/// signal handler, test harness) and observed between cycles.
#[derive(Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn request_stop(&self) {
		self.0.store(true, Ordering::Relaxed);
	}

	pub fn is_stopped(&self) -> bool {
		self.0.load(Ordering::Relaxed)
	}
}

/// Optional external text-recognition collaborator for the level-up screen.
pub trait LabelReader {
	fn read_labels(&mut self, frame: &Frame) -> Vec<String>;
}

/// Fixed-interval cadence. Factored out of the loop so a single cycle can be
/// unit-tested without real timing.
pub struct Ticker {
	interval: Duration,
	next: Instant,
}

impl Ticker {
	pub fn new(interval: Duration) -> Self {
		Self {
			interval,
			next: Instant::now() + interval,
		}
	}

	pub fn wait(&mut self) {
		let now = Instant::now();
		if self.next > now {
			std::thread::sleep(self.next - now);
		}
		self.next = Instant::now() + self.interval;
	}
}

#[derive(Debug, Clone, Copy)]
pub struct RunnerConfig {
	pub tick: Duration,
	pub backoff: Duration,
	/// Capture attempts before startup is declared failed.
	pub startup_attempts: u32,
	/// How close the player must be to a vanished shard to count it as
	/// collected.
	pub collect_radius: f32,
}

impl Default for RunnerConfig {
	fn default() -> Self {
		Self {
			tick: Duration::from_millis(100),
			backoff: Duration::from_millis(500),
			startup_attempts: 10,
			collect_radius: 100.0,
		}
	}
}

/// What one cycle did. Mostly interesting to tests and logs.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
	CaptureFailed,
	LevelUp { label: String, index: usize },
	MenuOpen,
	Moved(MovementIntent),
}

pub struct Runner<S, K> {
	config: RunnerConfig,
	detector: Detector,
	policy: Box<dyn Policy>,
	session: CombatSession,
	store: UpgradeStore,
	recognizer: Option<Box<dyn LabelReader>>,
	source: S,
	sink: K,
	stop: StopSignal,

	menu_open: bool,
	/// Upgrade chosen at the previous level-up, awaiting its score.
	pending_choice: Option<String>,
	prev_shards: Vec<(f32, f32)>,
}

impl<S: FrameSource, K: CommandSink> Runner<S, K> {
	#[allow(clippy::too_many_arguments)]
	pub fn new(
		config: RunnerConfig,
		detector: Detector,
		policy: Box<dyn Policy>,
		store: UpgradeStore,
		recognizer: Option<Box<dyn LabelReader>>,
		source: S,
		sink: K,
		stop: StopSignal,
	) -> Self {
		Self {
			config,
			detector,
			policy,
			session: CombatSession::new(),
			store,
			recognizer,
			source,
			sink,
			stop,
			menu_open: false,
			pending_choice: None,
			prev_shards: Vec::new(),
		}
	}

	pub fn store(&self) -> &UpgradeStore {
		&self.store
	}

	/// Run until the stop signal fires. Every cycle error is caught here,
	/// logged, and followed by a back-off pause.
	pub fn run(&mut self) -> Result<()> {
		self.wait_for_first_frame()?;

		if !self.detector.has_template() {
			warn!("no level-up template loaded; relying on the dark-overlay fallback");
		}

		info!("entering control loop");
		let mut ticker = Ticker::new(self.config.tick);
		while !self.stop.is_stopped() {
			match self.cycle() {
				Ok(CycleOutcome::CaptureFailed) => {
					warn!("capture failed; backing off");
					std::thread::sleep(self.config.backoff);
				}
				Ok(_) => {}
				Err(err) => {
					warn!(error = %err, "cycle failed; backing off");
					std::thread::sleep(self.config.backoff);
				}
			}
			ticker.wait();
		}

		self.sink.release_all();
		info!(levels = self.session.level_count(), "stopped; all keys released");
		info!("upgrade stats:\n{}", self.store.summary());
		Ok(())
	}

	/// The screen region must be capturable at least once before the loop
	/// starts; anything after that is a transient failure.
	fn wait_for_first_frame(&mut self) -> Result<()> {
		for attempt in 1..=self.config.startup_attempts {
			if self.stop.is_stopped() {
				bail!("stop requested before the first frame was captured");
			}
			if self.source.capture().is_some() {
				return Ok(());
			}
			warn!(attempt, "initial capture failed");
			std::thread::sleep(self.config.backoff);
		}
		bail!("screen region never became capturable; check the configured region")
	}

	/// One full decision cycle. Public so tests can inject a frame and
	/// observe the resulting command without running the loop.
	pub fn cycle(&mut self) -> Result<CycleOutcome> {
		let Some(frame) = self.source.capture() else {
			return Ok(CycleOutcome::CaptureFailed);
		};

		let detection = self.detector.detect(&frame);

		if detection.level_up.visible() {
			if self.menu_open {
				self.sink.apply(MovementIntent::Stop);
				return Ok(CycleOutcome::MenuOpen);
			}
			self.menu_open = true;
			return self.handle_level_up(&frame, detection.level_up);
		}
		self.menu_open = false;

		self.track_shards(&detection);

		let intent = self.policy.decide(&detection);
		self.sink.apply(intent);
		Ok(CycleOutcome::Moved(intent))
	}

	fn handle_level_up(&mut self, frame: &Frame, status: LevelUpStatus) -> Result<CycleOutcome> {
		// Let go of the movement keys before touching the menu.
		self.sink.apply(MovementIntent::Stop);
		self.prev_shards.clear();

		if let LevelUpStatus::DarkFallback { dark_fraction } = status {
			warn!(
				dark_fraction,
				"level-up inferred from the dark-overlay fallback; less reliable than template matching"
			);
		}

		let score = self.session.on_level_up();
		info!(level = self.session.level_count(), score, "level up detected");

		if let Some(previous) = self.pending_choice.take() {
			if let Err(err) = self.store.update(&previous, score) {
				warn!(
					error = %err,
					label = %previous,
					score,
					"failed to persist upgrade stats; record these values manually"
				);
			}
		}

		let mut labels = match self.recognizer.as_mut() {
			Some(reader) => reader.read_labels(frame),
			None => Vec::new(),
		};
		if labels.is_empty() {
			labels = placeholder_labels();
		}

		let choice = select_best(&labels, &self.store);
		info!(label = %choice.label, index = choice.index, "selecting upgrade");
		self.sink.select_option(choice.index);
		self.pending_choice = Some(choice.label.clone());

		Ok(CycleOutcome::LevelUp {
			label: choice.label,
			index: choice.index,
		})
	}

	/// Credit xp for shards that vanished under the player since last cycle.
	fn track_shards(&mut self, detection: &DetectionResult) {
		let current: Vec<(f32, f32)> = detection.shards.iter().map(Entity::center).collect();

		if let Some(player) = &detection.player {
			let player = player.center();
			for old in &self.prev_shards {
				let still_there = current
					.iter()
					.any(|center| distance(*center, *old) < SHARD_TRACK_RADIUS);
				if !still_there && distance(player, *old) <= self.config.collect_radius {
					self.session.record_experience(1);
				}
			}
		}

		self.prev_shards = current;
	}
}

fn placeholder_labels() -> Vec<String> {
	(1..=PRIMARY_CHOICES).map(|i| format!("Option {i}")).collect()
}
