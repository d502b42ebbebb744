//! Movement decision policies.
//!
//! Both policies are reactive: decisions are re-evaluated every cycle at
//! ~10 Hz, so nothing here plans further than one step ahead. The enhanced
//! policy keeps just enough state to notice when the character has stopped
//! making progress.

use rand::{Rng, SeedableRng, rngs::SmallRng};
use vision::{DetectionResult, Entity};

use crate::input::MovementIntent;

/// Candidate directions, in tie-break order.
pub const CARDINALS: [MovementIntent; 4] = [
	MovementIntent::Up,
	MovementIntent::Down,
	MovementIntent::Left,
	MovementIntent::Right,
];

/// Distance a one-step escape probe looks ahead.
const ESCAPE_PROBE_PX: f32 = 50.0;
/// Interpolation points checked along a shard path (plus both endpoints).
const PATH_SAMPLES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
	Baseline,
	#[default]
	Enhanced,
}

#[derive(Debug, Clone, Copy, serde::Deserialize, serde::Serialize)]
pub struct PolicyConfig {
	/// Minimum tolerable gap to any enemy before evasive action triggers.
	pub safe_distance: f32,
	/// Shards further than twice this are not worth detouring for.
	pub collection_distance: f32,
	/// Center movement below this counts as "not moving".
	pub stuck_epsilon: f32,
	/// Consecutive motionless cycles before the stuck breaker fires.
	pub stuck_cycles: u32,
}

impl Default for PolicyConfig {
	fn default() -> Self {
		Self {
			safe_distance: 150.0,
			collection_distance: 100.0,
			stuck_epsilon: 10.0,
			stuck_cycles: 20,
		}
	}
}

pub trait Policy {
	fn decide(&mut self, detection: &DetectionResult) -> MovementIntent;
}

pub(crate) fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
	let dx = b.0 - a.0;
	let dy = b.1 - a.1;
	(dx * dx + dy * dy).sqrt()
}

fn centers(entities: &[Entity]) -> Vec<(f32, f32)> {
	entities.iter().map(Entity::center).collect()
}

/// Per-enemy contribution to each cardinal half-plane. Every enemy lands in
/// exactly one horizontal and one vertical plane; `weight` decides what it
/// contributes there.
fn half_plane_totals(
	player: (f32, f32),
	enemies: &[(f32, f32)],
	weight: impl Fn((f32, f32)) -> f32,
) -> [f32; 4] {
	// Indexed like CARDINALS: up, down, left, right.
	let mut totals = [0.0f32; 4];
	for enemy in enemies {
		let w = weight(*enemy);
		if enemy.1 < player.1 {
			totals[0] += w;
		} else {
			totals[1] += w;
		}
		if enemy.0 < player.0 {
			totals[2] += w;
		} else {
			totals[3] += w;
		}
	}
	totals
}

fn least_dangerous(totals: &[f32; 4]) -> usize {
	let mut best = 0;
	for i in 1..totals.len() {
		if totals[i] < totals[best] {
			best = i;
		}
	}
	best
}

/// Count-based half-plane avoidance. Stateless, and kept around as the
/// simple fallback when the enhanced policy misbehaves on a new arena.
#[derive(Debug, Default)]
pub struct BaselinePolicy;

impl Policy for BaselinePolicy {
	fn decide(&mut self, detection: &DetectionResult) -> MovementIntent {
		let Some(player) = &detection.player else {
			return MovementIntent::Stop;
		};

		let totals = half_plane_totals(player.center(), &centers(&detection.enemies), |_| 1.0);
		CARDINALS[least_dangerous(&totals)]
	}
}

/// The primary policy. Escaping immediate danger outranks shard collection,
/// which outranks general survival drift.
pub struct EnhancedPolicy {
	config: PolicyConfig,
	rng: SmallRng,
	last_position: Option<(f32, f32)>,
	stuck_counter: u32,
}

impl EnhancedPolicy {
	pub fn new(config: PolicyConfig) -> Self {
		Self::with_rng(config, SmallRng::from_entropy())
	}

	/// Deterministic variant for tests.
	pub fn with_rng(config: PolicyConfig, rng: SmallRng) -> Self {
		Self {
			config,
			rng,
			last_position: None,
			stuck_counter: 0,
		}
	}

	fn in_immediate_danger(&self, player: (f32, f32), enemies: &[(f32, f32)]) -> bool {
		let danger_distance = self.config.safe_distance / 2.0;
		enemies.iter().any(|e| distance(player, *e) < danger_distance)
	}

	/// 1-ply greedy maximin: probe one step in each direction and take the
	/// one that ends up furthest from the nearest enemy.
	fn escape_direction(&self, player: (f32, f32), enemies: &[(f32, f32)]) -> MovementIntent {
		let probes = [
			(0.0, -ESCAPE_PROBE_PX),
			(0.0, ESCAPE_PROBE_PX),
			(-ESCAPE_PROBE_PX, 0.0),
			(ESCAPE_PROBE_PX, 0.0),
		];

		let mut best = 0;
		let mut best_clearance = f32::MIN;
		for (i, (dx, dy)) in probes.iter().enumerate() {
			let position = (player.0 + dx, player.1 + dy);
			let clearance = enemies
				.iter()
				.map(|e| distance(position, *e))
				.fold(f32::INFINITY, f32::min);
			if clearance > best_clearance {
				best_clearance = clearance;
				best = i;
			}
		}
		CARDINALS[best]
	}

	/// Closest shard whose straight-line path keeps every sampled point at
	/// least `safe_distance` from every enemy.
	fn safe_shard(
		&self,
		player: (f32, f32),
		shards: &[Entity],
		enemies: &[(f32, f32)],
	) -> Option<(f32, f32)> {
		let mut best: Option<((f32, f32), f32)> = None;
		for shard in shards {
			let center = shard.center();
			let dist = distance(player, center);
			if dist > self.config.collection_distance * 2.0 {
				continue;
			}
			if !self.path_is_safe(player, center, enemies) {
				continue;
			}
			if best.is_none_or(|(_, best_dist)| dist < best_dist) {
				best = Some((center, dist));
			}
		}
		best.map(|(center, _)| center)
	}

	fn path_is_safe(&self, start: (f32, f32), target: (f32, f32), enemies: &[(f32, f32)]) -> bool {
		if enemies.is_empty() {
			return true;
		}
		for i in 0..=PATH_SAMPLES {
			let t = i as f32 / PATH_SAMPLES as f32;
			let point = (
				start.0 + t * (target.0 - start.0),
				start.1 + t * (target.1 - start.1),
			);
			if enemies
				.iter()
				.any(|e| distance(point, *e) < self.config.safe_distance)
			{
				return false;
			}
		}
		true
	}

	fn survival_direction(&mut self, player: (f32, f32), enemies: &[(f32, f32)]) -> MovementIntent {
		if enemies.is_empty() {
			return MovementIntent::HoldPattern;
		}

		// Closer enemies dominate their half-plane's danger weight.
		let safe = self.config.safe_distance;
		let totals = half_plane_totals(player, enemies, |e| (safe - distance(player, e)).max(0.0));

		let best = least_dangerous(&totals);
		if totals[best] == 0.0 {
			// Several equally safe directions: vary the pick so the movement
			// pattern stays unpredictable.
			let open: Vec<usize> = (0..4).filter(|&i| totals[i] == 0.0).collect();
			if open.len() > 1 {
				return CARDINALS[open[self.rng.gen_range(0..open.len())]];
			}
		}
		CARDINALS[best]
	}
}

/// Move along the axis with the greater positional delta toward the target.
fn direction_toward(from: (f32, f32), to: (f32, f32)) -> MovementIntent {
	let dx = to.0 - from.0;
	let dy = to.1 - from.1;
	if dx.abs() > dy.abs() {
		if dx > 0.0 {
			MovementIntent::Right
		} else {
			MovementIntent::Left
		}
	} else if dy > 0.0 {
		MovementIntent::Down
	} else {
		MovementIntent::Up
	}
}

impl Policy for EnhancedPolicy {
	fn decide(&mut self, detection: &DetectionResult) -> MovementIntent {
		let Some(player) = &detection.player else {
			return MovementIntent::Stop;
		};
		let player = player.center();
		let enemies = centers(&detection.enemies);

		// Stuck breaker first: oscillating against a wall would otherwise
		// satisfy the avoidance rules forever.
		if let Some(last) = self.last_position {
			if distance(player, last) < self.config.stuck_epsilon {
				self.stuck_counter += 1;
			} else {
				self.stuck_counter = 0;
			}
		}
		self.last_position = Some(player);
		if self.stuck_counter > self.config.stuck_cycles {
			self.stuck_counter = 0;
			return CARDINALS[self.rng.gen_range(0..CARDINALS.len())];
		}

		if self.in_immediate_danger(player, &enemies) {
			return self.escape_direction(player, &enemies);
		}

		if let Some(target) = self.safe_shard(player, &detection.shards, &enemies) {
			return direction_toward(player, target);
		}

		self.survival_direction(player, &enemies)
	}
}
