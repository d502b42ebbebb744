mod frame;
pub use frame::*;

pub mod screen;

/// Semantic class of a detected blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
	Player,
	Enemy,
	ExperienceShard,
}

/// A bounding box tagged with the semantic class it was segmented as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entity {
	pub kind: EntityKind,
	pub rect: Rect,
}

impl Entity {
	pub fn center(&self) -> (f32, f32) {
		self.rect.center()
	}
}

/// How (and whether) the level-up overlay was detected this cycle.
///
/// The dark-overlay fallback is strictly less reliable than template matching;
/// carrying the evidence lets callers log that fact instead of silently
/// trusting both paths equally.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LevelUpStatus {
	Hidden,
	Template { confidence: f32 },
	DarkFallback { dark_fraction: f32 },
}

impl LevelUpStatus {
	pub fn visible(&self) -> bool {
		!matches!(self, LevelUpStatus::Hidden)
	}
}

/// Everything one detection pass extracts from a frame. Not persisted.
#[derive(Debug, Clone)]
pub struct DetectionResult {
	pub player: Option<Entity>,
	pub enemies: Vec<Entity>,
	pub shards: Vec<Entity>,
	pub level_up: LevelUpStatus,
}

impl DetectionResult {
	/// The result a degenerate or unreadable frame yields. A missing player is
	/// "player not found", never an error.
	pub fn empty() -> Self {
		Self {
			player: None,
			enemies: Vec::new(),
			shards: Vec::new(),
			level_up: LevelUpStatus::Hidden,
		}
	}
}

/// Thresholds and color ranges driving one `Detector`.
///
/// Hue bounds are degrees `[0, 360)`; saturation/value keep the byte scale.
/// Defaults are tuned to the Tower of Babel palette: a blue-cloaked player,
/// red and green enemy families, yellow experience shards.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct DetectorConfig {
	pub player: HsvRange,
	/// Enemy palettes, processed in order. Earlier ranges win duplicate ties.
	pub enemies: Vec<HsvRange>,
	pub shards: HsvRange,

	/// Minimum connected-region pixel count for player/enemy blobs.
	pub min_area: u32,
	/// Per-range box merge threshold (IoU above this suppresses the smaller box).
	pub nms_overlap: f32,
	/// Boxes from different palettes whose top-left corners are closer than
	/// this are treated as one entity.
	pub duplicate_radius: f32,

	/// Normalized template-match confidence required to flag the overlay.
	pub match_threshold: f32,
	/// Luma below this counts as "dark" for the overlay fallback.
	pub dark_luma: u8,
	/// Fraction of dark pixels above which the fallback flags a level-up.
	pub dark_fraction: f32,
}

impl Default for DetectorConfig {
	fn default() -> Self {
		Self {
			player: HsvRange::new(
				Hsv { h: 200.0, s: 150.0, v: 0.0 },
				Hsv { h: 260.0, s: 255.0, v: 255.0 },
			),
			enemies: vec![
				// Red family.
				HsvRange::new(
					Hsv { h: 0.0, s: 120.0, v: 70.0 },
					Hsv { h: 20.0, s: 255.0, v: 255.0 },
				),
				// Green family.
				HsvRange::new(
					Hsv { h: 80.0, s: 50.0, v: 50.0 },
					Hsv { h: 160.0, s: 255.0, v: 255.0 },
				),
			],
			shards: HsvRange::new(
				Hsv { h: 40.0, s: 100.0, v: 100.0 },
				Hsv { h: 60.0, s: 255.0, v: 255.0 },
			),
			min_area: 100,
			nms_overlap: 0.3,
			duplicate_radius: 20.0,
			match_threshold: 0.7,
			dark_luma: 50,
			dark_fraction: 0.4,
		}
	}
}

impl DetectorConfig {
	/// Shards are visually smaller than characters, so they get a looser
	/// area threshold.
	pub fn shard_min_area(&self) -> u32 {
		self.min_area / 4
	}
}

/// Classifies frame pixels into game entities.
pub struct Detector {
	config: DetectorConfig,
	template: Option<image::GrayImage>,
}

impl Detector {
	pub fn new(config: DetectorConfig) -> Self {
		Self {
			config,
			template: None,
		}
	}

	/// Install a reference image of the level-up overlay. Without one the
	/// detector falls back to the dark-overlay heuristic.
	pub fn set_template(&mut self, template: image::GrayImage) {
		self.template = Some(template);
	}

	/// Load the overlay reference image from disk (any format `image` reads).
	pub fn load_template(&mut self, path: impl AsRef<std::path::Path>) -> anyhow::Result<()> {
		use anyhow::Context;
		let img = image::open(path.as_ref())
			.with_context(|| format!("open template {:?}", path.as_ref()))?;
		self.template = Some(img.to_luma8());
		Ok(())
	}

	pub fn has_template(&self) -> bool {
		self.template.is_some()
	}

	pub fn config(&self) -> &DetectorConfig {
		&self.config
	}

	/// One full detection pass. Degenerate frames yield an empty result.
	pub fn detect(&self, frame: &Frame) -> DetectionResult {
		if frame.width() == 0 || frame.height() == 0 {
			return DetectionResult::empty();
		}

		DetectionResult {
			player: screen::arena::detect_player(frame, &self.config),
			enemies: screen::arena::detect_enemies(frame, &self.config),
			shards: screen::arena::detect_shards(frame, &self.config),
			level_up: screen::levelup::status(frame, self.template.as_ref(), &self.config),
		}
	}
}

#[cfg(test)]
pub(crate) mod testutil {
	use super::*;

	pub const PLAYER_BLUE: Color = Color::new(0, 0, 255);
	pub const ENEMY_RED: Color = Color::new(255, 0, 0);
	pub const ENEMY_GREEN: Color = Color::new(0, 255, 0);
	pub const SHARD_YELLOW: Color = Color::new(255, 255, 0);
	/// Neutral background: zero saturation, luma well above the dark cutoff.
	pub const BACKGROUND: Color = Color::new(128, 128, 128);

	pub fn arena_frame(width: u32, height: u32, blobs: &[(Rect, Color)]) -> Frame {
		let mut frame = Frame::solid(width, height, BACKGROUND);
		for (rect, color) in blobs {
			frame.fill_rect(*rect, *color);
		}
		frame
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use super::testutil::*;

	#[test]
	fn detect_on_empty_frame_is_empty() {
		let detector = Detector::new(DetectorConfig::default());
		let result = detector.detect(&Frame::solid(0, 0, Color::BLACK));
		assert!(result.player.is_none());
		assert!(result.enemies.is_empty());
		assert!(result.shards.is_empty());
		assert!(!result.level_up.visible());
	}

	#[test]
	fn detect_classifies_all_entity_kinds() {
		let frame = arena_frame(
			320,
			240,
			&[
				(Rect::new(100, 100, 12, 12), PLAYER_BLUE),
				(Rect::new(30, 40, 15, 15), ENEMY_RED),
				(Rect::new(250, 180, 14, 14), ENEMY_GREEN),
				(Rect::new(200, 50, 6, 6), SHARD_YELLOW),
			],
		);

		let detector = Detector::new(DetectorConfig::default());
		let result = detector.detect(&frame);

		let player = result.player.expect("player blob should be found");
		assert_eq!(player.kind, EntityKind::Player);
		assert_eq!(player.rect, Rect::new(100, 100, 12, 12));

		assert_eq!(result.enemies.len(), 2);
		assert!(result.enemies.iter().all(|e| e.kind == EntityKind::Enemy));

		assert_eq!(result.shards.len(), 1);
		assert_eq!(result.shards[0].rect, Rect::new(200, 50, 6, 6));

		assert!(!result.level_up.visible());
	}
}
