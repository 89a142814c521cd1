// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Word geometry — carry an OCR box from its reference image onto the page.
//
// The chain is: scale by the transform descriptor, turn by its quarter turn,
// clip to the placed image, size the font, find the baseline, flip to a
// bottom-left origin, then apply the page placement.

use searchpress_core::{Rect, TransformDescriptor};

use crate::layout::PagePlacement;

/// Smallest effective font size on the page, in points, so tiny boxes stay
/// selectable.
pub const MIN_FONT_PT: f32 = 1.0;

/// Font size as a share of the box height.
pub const TEXT_SIZE_RATIO: f32 = 0.7;

/// Distance of the baseline below the box bottom, as a share of box height,
/// when font metrics are not used.
pub const BASELINE_DESCENT_FACTOR: f32 = 0.25;

/// `max(MIN_FONT_PT, box_height * TEXT_SIZE_RATIO)`. Never below the floor,
/// even for zero or non-finite heights.
pub fn font_size_for(box_height: f32) -> f32 {
    let size = box_height * TEXT_SIZE_RATIO;
    if size.is_finite() {
        size.max(MIN_FONT_PT)
    } else {
        MIN_FONT_PT
    }
}

/// Baseline in top-origin image pixels from the fixed heuristic.
pub fn heuristic_baseline(bottom: f32, box_height: f32) -> f32 {
    bottom + box_height * BASELINE_DESCENT_FACTOR
}

/// Baseline from font metrics: the box is split in the ratio of the font's
/// ascent to its descent.
pub fn metric_baseline(bottom: f32, box_height: f32, descent_fraction: f32) -> f32 {
    bottom + box_height * descent_fraction
}

/// Top-origin `y` to bottom-origin, clamped to `[0, image_height]`.
pub fn flip_to_bottom_origin(y: f32, image_height: f32) -> f32 {
    (image_height - y).clamp(0.0, image_height)
}

/// Where one word lands on the page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WordPlacement {
    /// Text-space font size, in placed-image pixels.
    pub font_size: f32,
    /// Baseline start of the run in page points.
    pub page_x: f32,
    pub page_y: f32,
    /// Length of the box along the reading direction, in placed-image pixels.
    pub run_length: f32,
    /// Clockwise quarter turns of the reading direction.
    pub turns: u8,
}

impl WordPlacement {
    /// Text matrix `[a b c d e f]` for this placement. `placement_scale` maps
    /// image pixels to points; `stretch` widens the run along the reading
    /// direction.
    pub fn text_matrix(&self, placement_scale: f32, stretch: f32) -> [f32; 6] {
        // Clockwise image turns are counter-clockwise negative on the page.
        let (cos, sin) = match self.turns % 4 {
            0 => (1.0, 0.0),
            1 => (0.0, -1.0),
            2 => (-1.0, 0.0),
            _ => (0.0, 1.0),
        };
        let s = placement_scale;
        [
            s * stretch * cos,
            s * stretch * sin,
            -s * sin,
            s * cos,
            self.page_x,
            self.page_y,
        ]
    }
}

/// Scale a reference-image box and turn it into the placed image's frame.
///
/// Returns `None` when the descriptor's rotation is not a quarter turn.
pub fn map_box(bbox: &Rect, td: &TransformDescriptor) -> Option<Rect> {
    let turns = td.quarter_turns()?;
    let b = bbox.scaled(td.scale_x, td.scale_y);
    let (ws, hs) = td.scaled_extent();
    let turned = match turns {
        0 => b,
        // (x, y) -> (hs - y, x)
        1 => Rect::new(hs - b.bottom, b.left, hs - b.top, b.right),
        // (x, y) -> (ws - x, hs - y)
        2 => Rect::new(ws - b.right, hs - b.bottom, ws - b.left, hs - b.top),
        // (x, y) -> (y, ws - x)
        _ => Rect::new(b.top, ws - b.right, b.bottom, ws - b.left),
    };
    Some(turned)
}

/// Full chain for one word box. `descent_fraction` selects the metric
/// baseline; `None` uses the heuristic.
///
/// Returns `None` when the mapped box does not overlap the placed image.
pub fn place_word(
    bbox: &Rect,
    td: &TransformDescriptor,
    image_w: f32,
    image_h: f32,
    placement: &PagePlacement,
    descent_fraction: Option<f32>,
) -> Option<WordPlacement> {
    let turns = td.quarter_turns()?;
    let mapped = map_box(bbox, td)?;
    let clipped = mapped.intersect(&Rect::new(0.0, 0.0, image_w, image_h))?;

    // Height across the reading direction and length along it.
    let (height, run_length) = if turns % 2 == 0 {
        (clipped.height(), clipped.width())
    } else {
        (clipped.width(), clipped.height())
    };
    // The text matrix scales by the placement, so the floor is divided by it.
    let font_size = if placement.scale.is_finite() && placement.scale > 0.0 {
        font_size_for(height).max(MIN_FONT_PT / placement.scale)
    } else {
        font_size_for(height)
    };
    let below = match descent_fraction {
        Some(fraction) => metric_baseline(0.0, height, fraction),
        None => heuristic_baseline(0.0, height),
    };

    // Baseline start in top-origin image pixels; "below" points away from
    // the glyph tops, which turn with the text.
    let (x, y) = match turns {
        0 => (clipped.left, clipped.bottom + below),
        1 => (clipped.left - below, clipped.top),
        2 => (clipped.right, clipped.top - below),
        _ => (clipped.right + below, clipped.bottom),
    };

    let x_img = x.clamp(0.0, image_w);
    let y_img = flip_to_bottom_origin(y, image_h);
    let (page_x, page_y) = placement.to_page(x_img, y_img);

    Some(WordPlacement {
        font_size,
        page_x,
        page_y,
        run_length,
        turns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::plan_placement;

    fn unit_placement() -> PagePlacement {
        PagePlacement {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            draw_w: 1000.0,
            draw_h: 1000.0,
        }
    }

    #[test]
    fn font_size_never_below_floor() {
        for h in [0.0, 0.1, 1.0, 1.42, 10.0, 500.0, f32::NAN, f32::INFINITY] {
            assert!(font_size_for(h) >= MIN_FONT_PT, "height {h}");
        }
        assert_eq!(font_size_for(50.0), 35.0);
    }

    #[test]
    fn font_floor_holds_in_page_points() {
        // A 2480x3508 scan on A4 shrinks by roughly a quarter.
        let placement = plan_placement(2480.0, 3508.0, 595.2756, 841.8898).unwrap();
        let td = TransformDescriptor::identity(2480, 3508);
        let tiny = Rect::new(100.0, 100.0, 130.0, 101.0);
        let placed = place_word(&tiny, &td, 2480.0, 3508.0, &placement, None).unwrap();
        let matrix = placed.text_matrix(placement.scale, 1.0);
        assert!(placed.font_size * matrix[3] >= MIN_FONT_PT - 1e-4);

        let tall = Rect::new(100.0, 100.0, 300.0, 200.0);
        let placed = place_word(&tall, &td, 2480.0, 3508.0, &placement, None).unwrap();
        assert_eq!(placed.font_size, 70.0);
    }

    #[test]
    fn baseline_inversion_round_trip() {
        let baseline = heuristic_baseline(150.0, 50.0);
        assert_eq!(baseline, 162.5);
        assert_eq!(flip_to_bottom_origin(baseline, 1000.0), 837.5);
    }

    #[test]
    fn page_transform_composition() {
        let placement = PagePlacement {
            scale: 0.5,
            offset_x: 0.0,
            offset_y: 50.0,
            draw_w: 500.0,
            draw_h: 750.0,
        };
        let td = TransformDescriptor::identity(1000, 1500);
        let word = Rect::new(100.0, 700.0, 300.0, 760.0);
        let placed = place_word(&word, &td, 1000.0, 1500.0, &placement, None).unwrap();
        assert_eq!(placed.page_y, 412.5);
        assert_eq!(placed.page_x, 50.0);
    }

    #[test]
    fn flip_clamps_into_image() {
        assert_eq!(flip_to_bottom_origin(-20.0, 100.0), 100.0);
        assert_eq!(flip_to_bottom_origin(130.0, 100.0), 0.0);
    }

    #[test]
    fn metric_baseline_tracks_heuristic() {
        // Helvetica and a Noto-like sans.
        for (ascent, descent) in [(718.0f32, -207.0f32), (1069.0, -293.0)] {
            let fraction = descent.abs() / (ascent + descent.abs());
            for h in (10..=80).map(|h| h as f32) {
                let diff = (metric_baseline(200.0, h, fraction) - heuristic_baseline(200.0, h)).abs();
                assert!(diff <= 3.0, "{ascent}/{descent} at {h}px: {diff}");
            }
        }
    }

    #[test]
    fn descriptor_scale_is_applied_before_placement() {
        let td = TransformDescriptor::between(2000, 2000, 1000, 1000, 0.0);
        let word = Rect::new(200.0, 200.0, 400.0, 300.0);
        let placed = place_word(&word, &td, 1000.0, 1000.0, &unit_placement(), None).unwrap();
        // Scaled box is 100..200 x 100..150; baseline 162.5 → 837.5.
        assert_eq!(placed.page_x, 100.0);
        assert_eq!(placed.page_y, 837.5);
        assert_eq!(placed.font_size, 35.0);
        assert_eq!(placed.run_length, 100.0);
    }

    #[test]
    fn quarter_turns_stay_inside_image() {
        let word = Rect::new(100.0, 200.0, 220.0, 240.0);
        for turn in [0.0, 90.0, 180.0, 270.0] {
            let (dst_w, dst_h) = if turn == 90.0 || turn == 270.0 {
                (1200, 800)
            } else {
                (800, 1200)
            };
            let td = TransformDescriptor::between(800, 1200, dst_w, dst_h, turn);
            let mapped = map_box(&word, &td).unwrap();
            assert!(mapped.left >= 0.0 && mapped.right <= dst_w as f32, "turn {turn}");
            assert!(mapped.top >= 0.0 && mapped.bottom <= dst_h as f32, "turn {turn}");
            assert!((mapped.width() * mapped.height() - 120.0 * 40.0).abs() < 1e-3);

            let placement = plan_placement(dst_w as f32, dst_h as f32, 595.0, 842.0).unwrap();
            let placed = place_word(&word, &td, dst_w as f32, dst_h as f32, &placement, None).unwrap();
            let [x0, y0, x1, y1] = placement.image_rect();
            assert!(placed.page_x >= x0 && placed.page_x <= x1, "turn {turn}");
            assert!(placed.page_y >= y0 && placed.page_y <= y1, "turn {turn}");
        }
    }

    #[test]
    fn ninety_degree_turn_maps_corners() {
        let td = TransformDescriptor::between(800, 1200, 1200, 800, 90.0);
        let mapped = map_box(&Rect::new(0.0, 0.0, 10.0, 20.0), &td).unwrap();
        // Top-left corner of the source lands at the top-right of the result.
        assert_eq!(mapped, Rect::new(1180.0, 0.0, 1200.0, 10.0));
    }

    #[test]
    fn text_matrix_follows_turns() {
        let placed = WordPlacement {
            font_size: 10.0,
            page_x: 5.0,
            page_y: 6.0,
            run_length: 40.0,
            turns: 1,
        };
        assert_eq!(placed.text_matrix(0.5, 2.0), [0.0, -1.0, 0.5, 0.0, 5.0, 6.0]);
        let upright = WordPlacement { turns: 0, ..placed };
        assert_eq!(upright.text_matrix(0.5, 1.0), [0.5, 0.0, 0.0, 0.5, 5.0, 6.0]);
    }

    #[test]
    fn box_outside_image_is_dropped_and_partial_is_clipped() {
        let td = TransformDescriptor::identity(1000, 1000);
        let outside = Rect::new(1100.0, 10.0, 1200.0, 40.0);
        assert!(place_word(&outside, &td, 1000.0, 1000.0, &unit_placement(), None).is_none());

        let partial = Rect::new(950.0, 10.0, 1050.0, 40.0);
        let placed = place_word(&partial, &td, 1000.0, 1000.0, &unit_placement(), None).unwrap();
        assert_eq!(placed.page_x, 950.0);
        assert_eq!(placed.run_length, 50.0);
    }

    #[test]
    fn non_quarter_rotation_is_rejected() {
        let mut td = TransformDescriptor::identity(100, 100);
        td.rotation_deg = 30.0;
        assert!(map_box(&Rect::new(1.0, 1.0, 2.0, 2.0), &td).is_none());
    }
}
