//! Per-session combat tracking and effectiveness scoring.
//!
//! The effectiveness score summarizes how one level interval went (survival
//! time, pickup rate, kills, damage) and is what the upgrade store
//! accumulates per label. It always lands at or above the 0.1 floor, so
//! every choice contributes positively to its own average and a single bad
//! level can't zero out an upgrade's history.

use std::time::Instant;

const SCORE_FLOOR: f64 = 0.1;

/// Scalar effectiveness of one level interval.
///
/// `min(t/60, 5) + min(xp_rate/10, 2) + min(kills/10, 1) - min(damage/100, 1)`,
/// floored at 0.1 for all non-negative inputs.
pub fn effectiveness(secs_since_level: f64, xp_collected: f64, kills: u32, damage: f64) -> f64 {
	if secs_since_level <= 0.0 {
		return SCORE_FLOOR;
	}

	let survival = (secs_since_level / 60.0).min(5.0);
	let xp_rate = xp_collected / secs_since_level;
	let xp_bonus = (xp_rate / 10.0).min(2.0);
	let kill_bonus = (kills as f64 / 10.0).min(1.0);
	let damage_penalty = (damage / 100.0).min(1.0);

	(survival + xp_bonus + kill_bonus - damage_penalty).max(SCORE_FLOOR)
}

/// Session-wide snapshot for operator logs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionStats {
	pub total_secs: f64,
	pub levels_gained: u32,
	pub avg_secs_per_level: f64,
	pub total_xp: u32,
	pub total_kills: u32,
}

/// Combat counters for the lifetime of one process.
///
/// Per-level counters (kills, xp) reset on every level-up; session counters
/// persist until the process exits.
#[derive(Debug)]
pub struct CombatSession {
	started_at: Instant,
	last_level_up_at: Instant,
	kills_this_level: u32,
	xp_this_level: u32,
	total_kills: u32,
	total_xp: u32,
	damage_taken: f64,
	level_count: u32,
}

impl CombatSession {
	pub fn new() -> Self {
		let now = Instant::now();
		Self {
			started_at: now,
			last_level_up_at: now,
			kills_this_level: 0,
			xp_this_level: 0,
			total_kills: 0,
			total_xp: 0,
			damage_taken: 0.0,
			level_count: 0,
		}
	}

	pub fn record_kill(&mut self) {
		self.kills_this_level += 1;
		self.total_kills += 1;
	}

	pub fn record_experience(&mut self, amount: u32) {
		self.xp_this_level += amount;
		self.total_xp += amount;
	}

	pub fn record_damage(&mut self, amount: f64) {
		self.damage_taken += amount;
	}

	/// Score the interval since the previous level-up, then reset the
	/// per-level counters. Call once per detected level-up transition.
	pub fn on_level_up(&mut self) -> f64 {
		let now = Instant::now();
		let secs = now.duration_since(self.last_level_up_at).as_secs_f64();

		self.level_count += 1;
		let score = effectiveness(
			secs,
			self.xp_this_level as f64,
			self.kills_this_level,
			self.damage_taken,
		);

		self.last_level_up_at = now;
		self.kills_this_level = 0;
		self.xp_this_level = 0;

		score
	}

	pub fn level_count(&self) -> u32 {
		self.level_count
	}

	pub fn stats(&self) -> SessionStats {
		let total_secs = self.started_at.elapsed().as_secs_f64();
		SessionStats {
			total_secs,
			levels_gained: self.level_count,
			avg_secs_per_level: total_secs / self.level_count.max(1) as f64,
			total_xp: self.total_xp,
			total_kills: self.total_kills,
		}
	}
}

impl Default for CombatSession {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn score_never_drops_below_the_floor() {
		assert_eq!(effectiveness(0.0, 0.0, 0, 0.0), 0.1);
		assert_eq!(effectiveness(1.0, 0.0, 0, 10_000.0), 0.1);
		assert_eq!(effectiveness(-5.0, 100.0, 10, 0.0), 0.1);
	}

	#[test]
	fn score_components_are_capped() {
		// An hour of survival still caps the survival term at 5.
		let capped = effectiveness(3600.0, 0.0, 0, 0.0);
		assert!((capped - 5.0).abs() < 1e-9);

		// Huge xp rate caps its bonus at 2, huge kill count at 1.
		let maxed = effectiveness(3600.0, 1_000_000.0, 500, 0.0);
		assert!((maxed - 8.0).abs() < 1e-9);
	}

	#[test]
	fn score_is_monotonic_in_each_input() {
		assert!(effectiveness(120.0, 0.0, 0, 0.0) > effectiveness(60.0, 0.0, 0, 0.0));
		assert!(effectiveness(60.0, 120.0, 0, 0.0) > effectiveness(60.0, 60.0, 0, 0.0));
		assert!(effectiveness(60.0, 0.0, 5, 0.0) > effectiveness(60.0, 0.0, 1, 0.0));
		assert!(effectiveness(60.0, 0.0, 0, 50.0) <= effectiveness(60.0, 0.0, 0, 10.0));
	}

	#[test]
	fn level_up_resets_per_level_counters_only() {
		let mut session = CombatSession::new();

		// Empty interval: nothing collected, so only the floor remains.
		let score = session.on_level_up();
		assert!((score - 0.1).abs() < 1e-9);
		assert_eq!(session.level_count(), 1);

		// Any xp over a near-zero interval maxes out the rate bonus, which
		// makes the per-level counters observable in the score.
		session.record_kill();
		session.record_experience(3);
		session.record_damage(25.0);
		let score = session.on_level_up();
		assert!(score > 1.0);

		// Counters were reset by the previous call: the xp bonus is gone and
		// the persistent damage penalty can't drag the score below the floor.
		let score = session.on_level_up();
		assert!((score - 0.1).abs() < 1e-9);
		assert_eq!(session.level_count(), 3);

		let stats = session.stats();
		assert_eq!(stats.total_kills, 1);
		assert_eq!(stats.total_xp, 3);
		assert_eq!(stats.levels_gained, 3);
	}
}
