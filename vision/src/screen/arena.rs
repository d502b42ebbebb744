//! Gameplay-screen entity extraction.
//!
//! Each semantic class is segmented by thresholding the frame in HSV space,
//! labelling connected regions in the resulting mask, and keeping the bounding
//! rectangles of regions above a minimum pixel count (single-pixel noise and
//! particle effects never register as entities).
//!
//! Enemy palettes are processed independently and then merged: per palette,
//! heavily overlapping boxes collapse via non-max suppression; across
//! palettes, a box whose top-left corner lands within a small radius of an
//! already-accepted box is a duplicate. Palettes are walked in configuration
//! order and candidates by descending area, so the surviving box is
//! deterministic rather than an accident of iteration order.

use image::{GrayImage, Luma};
use imageproc::region_labelling::{Connectivity, connected_components};

use crate::{DetectorConfig, Entity, EntityKind, Frame, HsvRange, Rect};

/// The first player-colored region above the area threshold, in raster
/// discovery order. At most one player per frame.
pub fn detect_player(frame: &Frame, config: &DetectorConfig) -> Option<Entity> {
    let mask = class_mask(frame, std::slice::from_ref(&config.player));
    regions(&mask, config.min_area)
        .into_iter()
        .next()
        .map(|rect| Entity {
            kind: EntityKind::Player,
            rect,
        })
}

pub fn detect_enemies(frame: &Frame, config: &DetectorConfig) -> Vec<Entity> {
    let mut accepted: Vec<Rect> = Vec::new();

    for range in &config.enemies {
        let mask = class_mask(frame, std::slice::from_ref(range));
        let boxes = suppress_overlaps(regions(&mask, config.min_area), config.nms_overlap);

        for rect in boxes {
            let duplicate = accepted
                .iter()
                .any(|kept| kept.corner_distance(&rect) < config.duplicate_radius);
            if !duplicate {
                accepted.push(rect);
            }
        }
    }

    accepted
        .into_iter()
        .map(|rect| Entity {
            kind: EntityKind::Enemy,
            rect,
        })
        .collect()
}

pub fn detect_shards(frame: &Frame, config: &DetectorConfig) -> Vec<Entity> {
    let mask = class_mask(frame, std::slice::from_ref(&config.shards));
    regions(&mask, config.shard_min_area())
        .into_iter()
        .map(|rect| Entity {
            kind: EntityKind::ExperienceShard,
            rect,
        })
        .collect()
}

/// Binary mask of pixels falling inside any of the given HSV ranges.
fn class_mask(frame: &Frame, ranges: &[HsvRange]) -> GrayImage {
    let mut mask = GrayImage::new(frame.width(), frame.height());
    for y in 0..frame.height() {
        for x in 0..frame.width() {
            let hsv = frame.pixel(x, y).to_hsv();
            if ranges.iter().any(|range| range.contains(hsv)) {
                mask.put_pixel(x, y, Luma([255u8]));
            }
        }
    }
    mask
}

/// Bounding rectangles of 8-connected mask regions with at least `min_area`
/// pixels, in raster discovery order.
fn regions(mask: &GrayImage, min_area: u32) -> Vec<Rect> {
    use std::collections::HashMap;

    struct Acc {
        min_x: u32,
        min_y: u32,
        max_x: u32,
        max_y: u32,
        count: u32,
    }

    let labelled = connected_components(mask, Connectivity::Eight, Luma([0u8]));

    let mut accs: HashMap<u32, Acc> = HashMap::new();
    let mut order: Vec<u32> = Vec::new();

    for (x, y, px) in labelled.enumerate_pixels() {
        let label = px.0[0];
        if label == 0 {
            continue;
        }
        match accs.get_mut(&label) {
            Some(acc) => {
                acc.min_x = acc.min_x.min(x);
                acc.min_y = acc.min_y.min(y);
                acc.max_x = acc.max_x.max(x);
                acc.max_y = acc.max_y.max(y);
                acc.count += 1;
            }
            None => {
                order.push(label);
                accs.insert(
                    label,
                    Acc {
                        min_x: x,
                        min_y: y,
                        max_x: x,
                        max_y: y,
                        count: 1,
                    },
                );
            }
        }
    }

    order
        .into_iter()
        .filter_map(|label| {
            let acc = &accs[&label];
            (acc.count >= min_area).then(|| {
                Rect::new(
                    acc.min_x,
                    acc.min_y,
                    acc.max_x - acc.min_x + 1,
                    acc.max_y - acc.min_y + 1,
                )
            })
        })
        .collect()
}

/// Greedy non-max suppression: larger boxes win, anything overlapping a kept
/// box by more than `overlap` IoU is dropped.
fn suppress_overlaps(mut boxes: Vec<Rect>, overlap: f32) -> Vec<Rect> {
    boxes.sort_by(|a, b| b.area().cmp(&a.area()));

    let mut kept: Vec<Rect> = Vec::with_capacity(boxes.len());
    for rect in boxes {
        if kept.iter().all(|k| k.iou(&rect) <= overlap) {
            kept.push(rect);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::*;
    use crate::DetectorConfig;

    #[test]
    fn regions_below_min_area_are_noise() {
        let frame = arena_frame(
            200,
            200,
            &[
                (Rect::new(10, 10, 5, 5), ENEMY_RED),
                (Rect::new(100, 100, 15, 15), ENEMY_RED),
            ],
        );
        let enemies = detect_enemies(&frame, &DetectorConfig::default());
        assert_eq!(enemies.len(), 1);
        assert_eq!(enemies[0].rect, Rect::new(100, 100, 15, 15));
    }

    #[test]
    fn first_player_region_in_raster_order_wins() {
        let frame = arena_frame(
            200,
            200,
            &[
                (Rect::new(50, 120, 12, 12), PLAYER_BLUE),
                (Rect::new(80, 20, 12, 12), PLAYER_BLUE),
            ],
        );
        let player = detect_player(&frame, &DetectorConfig::default()).unwrap();
        // The blob whose first pixel appears earliest in raster order.
        assert_eq!(player.rect, Rect::new(80, 20, 12, 12));
    }

    #[test]
    fn cross_palette_duplicates_collapse_to_the_first_accepted_box() {
        // A red and a green detection of the same on-screen creature: corners
        // ~11 px apart, well inside the 20 px duplicate radius.
        let frame = arena_frame(
            200,
            200,
            &[
                (Rect::new(40, 40, 16, 16), ENEMY_RED),
                (Rect::new(48, 48, 16, 16), ENEMY_GREEN),
            ],
        );
        let enemies = detect_enemies(&frame, &DetectorConfig::default());
        assert_eq!(enemies.len(), 1);
        // Red is the earlier configured palette, so its box survives.
        assert_eq!(enemies[0].rect, Rect::new(40, 40, 16, 16));
    }

    #[test]
    fn distant_enemies_of_different_palettes_both_survive() {
        let frame = arena_frame(
            200,
            200,
            &[
                (Rect::new(20, 20, 15, 15), ENEMY_RED),
                (Rect::new(150, 150, 15, 15), ENEMY_GREEN),
            ],
        );
        let enemies = detect_enemies(&frame, &DetectorConfig::default());
        assert_eq!(enemies.len(), 2);
    }

    #[test]
    fn shards_use_the_looser_area_threshold() {
        let config = DetectorConfig::default();
        assert_eq!(config.shard_min_area(), 25);

        let frame = arena_frame(
            200,
            200,
            &[
                (Rect::new(10, 10, 6, 6), SHARD_YELLOW),
                (Rect::new(100, 100, 4, 4), SHARD_YELLOW),
            ],
        );
        let shards = detect_shards(&frame, &config);
        assert_eq!(shards.len(), 1);
        assert_eq!(shards[0].rect, Rect::new(10, 10, 6, 6));
    }

    #[test]
    fn overlap_suppression_keeps_the_larger_box() {
        let kept = suppress_overlaps(
            vec![Rect::new(2, 2, 10, 10), Rect::new(0, 0, 12, 12)],
            0.3,
        );
        assert_eq!(kept, vec![Rect::new(0, 0, 12, 12)]);

        // Barely touching boxes stay separate.
        let kept = suppress_overlaps(
            vec![Rect::new(0, 0, 10, 10), Rect::new(8, 8, 10, 10)],
            0.3,
        );
        assert_eq!(kept.len(), 2);
    }
}
