//! Level-up overlay detection.
//!
//! Primary path: normalized cross-correlation of a previously captured banner
//! image against the top-center of the frame (the banner always renders
//! there, so matching a padded region instead of the whole frame keeps the
//! naive correlation affordable at ~10 Hz).
//!
//! Fallback path, used only when no reference image is available: the overlay
//! dims the playfield, so a frame where most pixels fall below a darkness
//! threshold is treated as a level-up. Strictly less reliable; the returned
//! status says which path fired so callers can log accordingly.

use image::GrayImage;
use imageproc::template_matching::{MatchTemplateMethod, find_extremes, match_template};

use crate::{DetectorConfig, Frame, LevelUpStatus, Rect};

/// Vertical offset of the banner area from the top of the capture region.
const BANNER_TOP_OFFSET: u32 = 50;
/// Slack around the expected banner position when matching.
const SEARCH_MARGIN: u32 = 60;

pub fn status(frame: &Frame, template: Option<&GrayImage>, config: &DetectorConfig) -> LevelUpStatus {
    if let Some(template) = template {
        if let Some(confidence) = banner_confidence(frame, template) {
            if confidence >= config.match_threshold {
                return LevelUpStatus::Template { confidence };
            }
            return LevelUpStatus::Hidden;
        }
        // Template unusable against this frame size; fall through.
    }

    let dark_fraction = frame.dark_fraction(config.dark_luma);
    if dark_fraction > config.dark_fraction {
        LevelUpStatus::DarkFallback { dark_fraction }
    } else {
        LevelUpStatus::Hidden
    }
}

/// Peak match confidence of the banner template inside its expected region,
/// or `None` when the template cannot fit in the frame.
fn banner_confidence(frame: &Frame, template: &GrayImage) -> Option<f32> {
    let (tw, th) = template.dimensions();
    if tw == 0 || th == 0 || tw > frame.width() || th > frame.height() {
        return None;
    }

    let x = ((frame.width() - tw) / 2).saturating_sub(SEARCH_MARGIN);
    let roi_w = (tw + SEARCH_MARGIN * 2).min(frame.width() - x);
    let roi_h = (th + BANNER_TOP_OFFSET + SEARCH_MARGIN).min(frame.height());
    let roi = frame.crop(Rect::new(x, 0, roi_w, roi_h)).to_gray_image();
    if roi.width() < tw || roi.height() < th {
        return None;
    }

    let scores = match_template(&roi, template, MatchTemplateMethod::CrossCorrelationNormalized);
    let peak = find_extremes(&scores).max_value;
    peak.is_finite().then_some(peak)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{BACKGROUND, arena_frame};
    use crate::{Color, DetectorConfig, Frame};

    /// Paint the "LEVEL UP" banner stand-in: a dark plate with light tick
    /// marks, centered horizontally at the expected vertical offset.
    fn paint_banner(frame: &mut Frame, width: u32, height: u32) -> Rect {
        let x = (frame.width() - width) / 2;
        let rect = Rect::new(x, BANNER_TOP_OFFSET, width, height);
        frame.fill_rect(rect, Color::BLACK);
        let mut tick = rect.x;
        while tick + 4 <= rect.right() {
            frame.fill_rect(Rect::new(tick, rect.y, 4, height), Color::WHITE);
            tick += 16;
        }
        rect
    }

    #[test]
    fn banner_template_match_flags_level_up() {
        let mut frame = arena_frame(400, 300, &[]);
        let rect = paint_banner(&mut frame, 96, 40);
        let template = frame.crop(rect).to_gray_image();

        let status = status(&frame, Some(&template), &DetectorConfig::default());
        match status {
            LevelUpStatus::Template { confidence } => assert!(confidence > 0.99),
            other => panic!("expected template match, got {other:?}"),
        }
    }

    #[test]
    fn no_banner_means_hidden_even_with_template() {
        let mut reference = arena_frame(400, 300, &[]);
        let rect = paint_banner(&mut reference, 96, 40);
        let template = reference.crop(rect).to_gray_image();

        let frame = arena_frame(400, 300, &[]);
        let status = status(&frame, Some(&template), &DetectorConfig::default());
        assert_eq!(status, LevelUpStatus::Hidden);
    }

    #[test]
    fn dark_frame_triggers_fallback_without_template() {
        let frame = Frame::solid(100, 100, Color::new(20, 20, 20));
        let status = status(&frame, None, &DetectorConfig::default());
        match status {
            LevelUpStatus::DarkFallback { dark_fraction } => assert!(dark_fraction > 0.9),
            other => panic!("expected dark fallback, got {other:?}"),
        }
    }

    #[test]
    fn bright_frame_without_template_is_hidden() {
        let frame = Frame::solid(100, 100, BACKGROUND);
        assert_eq!(
            status(&frame, None, &DetectorConfig::default()),
            LevelUpStatus::Hidden
        );
    }

    #[test]
    fn oversized_template_falls_back_to_the_heuristic() {
        let template = GrayImage::new(500, 400);
        let frame = Frame::solid(100, 100, Color::new(20, 20, 20));
        let status = status(&frame, Some(&template), &DetectorConfig::default());
        assert!(matches!(status, LevelUpStatus::DarkFallback { .. }));
    }
}
