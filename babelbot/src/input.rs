//! Symbolic command output.
//!
//! The agent never touches platform key codes: it emits `MovementIntent` and
//! selection indices through a `CommandSink`, and an external input-injection
//! collaborator turns those into key presses. The built-in `TracingSink`
//! stands in for that collaborator by logging every command.

/// One movement command per decision cycle.
///
/// `HoldPattern` is continuous low-priority motion (circling) for when
/// nothing on screen demands attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementIntent {
	Up,
	Down,
	Left,
	Right,
	Stop,
	HoldPattern,
}

pub trait CommandSink {
	fn apply(&mut self, intent: MovementIntent);

	/// Pick the upgrade at `index` (0-based, left to right) on the level-up
	/// screen.
	fn select_option(&mut self, index: usize);

	/// Release every held virtual key. Must be called on shutdown so the
	/// character is never left moving indefinitely.
	fn release_all(&mut self);
}

/// Turns `HoldPattern` into concrete cardinal pressure by walking a circle.
///
/// Lives on the sink side of the seam so policies stay symbolic: each tick
/// advances the angle a little and reports which horizontal/vertical
/// directions should currently be held.
#[derive(Debug, Default)]
pub struct PatternDriver {
	angle: f32,
}

impl PatternDriver {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn step(&mut self) -> (Option<MovementIntent>, Option<MovementIntent>) {
		let x = self.angle.cos();
		let y = self.angle.sin();

		let horizontal = if x > 0.5 {
			Some(MovementIntent::Right)
		} else if x < -0.5 {
			Some(MovementIntent::Left)
		} else {
			None
		};
		// Screen y grows downward.
		let vertical = if y > 0.5 {
			Some(MovementIntent::Down)
		} else if y < -0.5 {
			Some(MovementIntent::Up)
		} else {
			None
		};

		self.angle += 0.1;
		if self.angle >= std::f32::consts::TAU {
			self.angle = 0.0;
		}

		(horizontal, vertical)
	}
}

/// Logs every command instead of injecting it.
#[derive(Debug, Default)]
pub struct TracingSink {
	driver: PatternDriver,
}

impl CommandSink for TracingSink {
	fn apply(&mut self, intent: MovementIntent) {
		match intent {
			MovementIntent::HoldPattern => {
				let (horizontal, vertical) = self.driver.step();
				tracing::debug!(?horizontal, ?vertical, "hold pattern");
			}
			other => tracing::debug!(intent = ?other, "movement"),
		}
	}

	fn select_option(&mut self, index: usize) {
		tracing::info!(index, "select upgrade option");
	}

	fn release_all(&mut self) {
		tracing::debug!("release all keys");
	}
}
