// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text module — invisible, pixel-aligned OCR text over the page image.

pub mod geometry;
pub mod layer;

pub use geometry::{
    BASELINE_DESCENT_FACTOR, MIN_FONT_PT, TEXT_SIZE_RATIO, WordPlacement, flip_to_bottom_origin,
    font_size_for, heuristic_baseline, metric_baseline, place_word,
};
pub use layer::{Compositor, DocumentGlyphs, TextLayer};
