// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — flatten, downscale, and compress page images for embedding.

pub mod encoder;

pub use encoder::{EncodedImage, ImageEncoder, ImageFilter};
