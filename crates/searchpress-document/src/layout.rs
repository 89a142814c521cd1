// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page layout planner — fit an image onto a page with a uniform scale and
// centre it.

use searchpress_core::error::{DocumentError, Result};

/// Where a page image lands on its page, in PDF points (bottom-left origin).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PagePlacement {
    /// Page points per image pixel, identical on both axes.
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub draw_w: f32,
    pub draw_h: f32,
}

impl PagePlacement {
    /// Placed image rectangle as `[x0, y0, x1, y1]` in page points.
    pub fn image_rect(&self) -> [f32; 4] {
        [
            self.offset_x,
            self.offset_y,
            self.offset_x + self.draw_w,
            self.offset_y + self.draw_h,
        ]
    }

    /// Map a point in bottom-origin image pixels onto the page.
    pub fn to_page(&self, x_img: f32, y_img: f32) -> (f32, f32) {
        (
            self.offset_x + x_img * self.scale,
            self.offset_y + y_img * self.scale,
        )
    }
}

/// Largest uniform scale at which an `image_w` x `image_h` image fits inside
/// the page, centred.
///
/// Pure and deterministic: identical inputs yield bit-identical placements.
pub fn plan_placement(image_w: f32, image_h: f32, page_w: f32, page_h: f32) -> Result<PagePlacement> {
    for (name, value) in [
        ("image width", image_w),
        ("image height", image_h),
        ("page width", page_w),
        ("page height", page_h),
    ] {
        if !value.is_finite() || value <= 0.0 {
            return Err(DocumentError::InvalidGeometry(format!("{name} is {value}")));
        }
    }

    let scale = (page_w / image_w).min(page_h / image_h);
    let draw_w = image_w * scale;
    let draw_h = image_h * scale;

    Ok(PagePlacement {
        scale,
        offset_x: (page_w - draw_w) / 2.0,
        offset_y: (page_h - draw_h) / 2.0,
        draw_w,
        draw_h,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-3;

    #[test]
    fn portrait_image_on_a4_is_height_bound() {
        let p = plan_placement(800.0, 1200.0, 595.2756, 841.8898).unwrap();
        assert!((p.scale - 841.8898 / 1200.0).abs() < 1e-6);
        assert!((p.draw_h - 841.8898).abs() < EPS);
        assert!(p.offset_y.abs() < EPS);
        assert!(p.offset_x > 0.0);
    }

    #[test]
    fn centering_and_scale_hold_across_shapes() {
        let cases = [
            (800.0, 1200.0, 595.0, 842.0),
            (3000.0, 1000.0, 595.0, 842.0),
            (1.0, 1.0, 612.0, 792.0),
            (4961.0, 7016.0, 595.2756, 841.8898),
            (10.0, 5000.0, 300.0, 300.0),
        ];
        for (iw, ih, pw, ph) in cases {
            let p = plan_placement(iw, ih, pw, ph).unwrap();
            assert_eq!(p.scale, (pw / iw).min(ph / ih));
            assert!((p.offset_x - (pw - iw * p.scale) / 2.0).abs() < EPS);
            assert!((p.offset_y - (ph - ih * p.scale) / 2.0).abs() < EPS);
            assert!(p.draw_w <= pw + EPS, "{iw}x{ih} overflows width");
            assert!(p.draw_h <= ph + EPS, "{iw}x{ih} overflows height");
        }
    }

    #[test]
    fn layout_is_idempotent() {
        let a = plan_placement(1234.0, 987.0, 595.2756, 841.8898).unwrap();
        let b = plan_placement(1234.0, 987.0, 595.2756, 841.8898).unwrap();
        assert_eq!(a.scale.to_bits(), b.scale.to_bits());
        assert_eq!(a.offset_x.to_bits(), b.offset_x.to_bits());
        assert_eq!(a.offset_y.to_bits(), b.offset_y.to_bits());
    }

    #[test]
    fn degenerate_inputs_fail() {
        assert!(matches!(
            plan_placement(0.0, 100.0, 595.0, 842.0),
            Err(DocumentError::InvalidGeometry(_))
        ));
        assert!(plan_placement(100.0, -1.0, 595.0, 842.0).is_err());
        assert!(plan_placement(100.0, 100.0, 0.0, 842.0).is_err());
        assert!(plan_placement(100.0, 100.0, 595.0, f32::NAN).is_err());
    }

    #[test]
    fn image_rect_spans_draw_size() {
        let p = plan_placement(100.0, 100.0, 200.0, 400.0).unwrap();
        assert_eq!(p.image_rect(), [0.0, 100.0, 200.0, 300.0]);
        assert_eq!(p.to_page(50.0, 50.0), (100.0, 200.0));
    }
}
