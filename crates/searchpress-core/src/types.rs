// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types: page images, OCR words, transform descriptors, and page
// geometry.

use std::sync::Arc;

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DocumentError, PageIssue};

/// Points per millimetre (72 pt per inch, 25.4 mm per inch).
const PT_PER_MM: f32 = 72.0 / 25.4;

/// Unique identifier for one assembled document, written to the trailer `/ID`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Raw 16 bytes of the identifier.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Page geometry
// ---------------------------------------------------------------------------

/// Target page sizes. Every page of a document uses the same size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSize {
    A4,
    A3,
    A5,
    Letter,
    Legal,
    /// Explicit size in PDF points (1/72 inch).
    Custom { width_pt: f32, height_pt: f32 },
}

impl PageSize {
    /// Custom size from millimetres.
    pub fn from_mm(width_mm: f32, height_mm: f32) -> Self {
        Self::Custom {
            width_pt: width_mm * PT_PER_MM,
            height_pt: height_mm * PT_PER_MM,
        }
    }

    /// Dimensions in PDF points (width, height).
    pub fn dimensions_pt(&self) -> (f32, f32) {
        match self {
            Self::A4 => (210.0 * PT_PER_MM, 297.0 * PT_PER_MM),
            Self::A3 => (297.0 * PT_PER_MM, 420.0 * PT_PER_MM),
            Self::A5 => (148.0 * PT_PER_MM, 210.0 * PT_PER_MM),
            Self::Letter => (612.0, 792.0),
            Self::Legal => (612.0, 1008.0),
            Self::Custom {
                width_pt,
                height_pt,
            } => (*width_pt, *height_pt),
        }
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::A4
    }
}

// ---------------------------------------------------------------------------
// Raster pages
// ---------------------------------------------------------------------------

/// Layout of the pixel buffer in a [`RasterPage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// One byte per pixel, 0 = black, 255 = white.
    Gray8,
    /// One byte per pixel; values below 128 are black, the rest white.
    BlackWhite,
    /// Three bytes per pixel, R G B.
    Rgb8,
    /// Four bytes per pixel, R G B A (non-premultiplied).
    Rgba8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            Self::Gray8 | Self::BlackWhite => 1,
            Self::Rgb8 => 3,
            Self::Rgba8 => 4,
        }
    }
}

/// One physical page's source image: already rectified, colour-converted, and
/// rotated by the enhancement stage.
///
/// The pixel buffer is shared, never copied or mutated by the engine; clones
/// are cheap.
#[derive(Debug, Clone)]
pub struct RasterPage {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pixels: Arc<[u8]>,
    /// Compression-quality hint (1-100). `Some(100)` requests lossless.
    pub quality: Option<u8>,
}

impl RasterPage {
    /// Wrap a raw pixel buffer. The buffer is checked later by
    /// [`validate`](Self::validate), not here.
    pub fn new(width: u32, height: u32, format: PixelFormat, pixels: impl Into<Arc<[u8]>>) -> Self {
        Self {
            width,
            height,
            format,
            pixels: pixels.into(),
            quality: None,
        }
    }

    /// Builder-style quality hint.
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality.clamp(1, 100));
        self
    }

    /// Take pixels from a decoded image, keeping grayscale images grayscale.
    pub fn from_dynamic(image: &DynamicImage) -> Self {
        let (width, height) = (image.width(), image.height());
        match image {
            DynamicImage::ImageLuma8(gray) => {
                Self::new(width, height, PixelFormat::Gray8, gray.as_raw().as_slice())
            }
            DynamicImage::ImageRgb8(rgb) => {
                Self::new(width, height, PixelFormat::Rgb8, rgb.as_raw().as_slice())
            }
            other if !other.color().has_color() && !other.color().has_alpha() => {
                Self::new(width, height, PixelFormat::Gray8, other.to_luma8().into_raw())
            }
            other if other.color().has_alpha() => {
                Self::new(width, height, PixelFormat::Rgba8, other.to_rgba8().into_raw())
            }
            other => Self::new(width, height, PixelFormat::Rgb8, other.to_rgb8().into_raw()),
        }
    }

    /// Decode an encoded image (PNG, JPEG, TIFF, …).
    pub fn decode(data: &[u8]) -> Result<Self, DocumentError> {
        let image = image::load_from_memory(data).map_err(|err| DocumentError::UnreadableImage {
            page: 0,
            reason: format!("failed to decode image: {err}"),
        })?;
        Ok(Self::from_dynamic(&image))
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Expected buffer length for the declared geometry and format.
    pub fn expected_len(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(self.format.bytes_per_pixel())
    }

    /// Check that the buffer matches the declared geometry.
    ///
    /// `page` is the zero-based page index reported in the error.
    pub fn validate(&self, page: usize) -> Result<(), DocumentError> {
        if self.width == 0 || self.height == 0 {
            return Err(DocumentError::InvalidGeometry(format!(
                "page {page}: image is {}x{} pixels",
                self.width, self.height
            )));
        }
        match self.expected_len() {
            Some(expected) if expected == self.pixels.len() => Ok(()),
            Some(expected) => Err(DocumentError::UnreadableImage {
                page,
                reason: format!(
                    "buffer holds {} bytes, {}x{} {:?} needs {}",
                    self.pixels.len(),
                    self.width,
                    self.height,
                    self.format,
                    expected
                ),
            }),
            None => Err(DocumentError::UnreadableImage {
                page,
                reason: "image dimensions overflow".into(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// OCR words
// ---------------------------------------------------------------------------

/// Axis-aligned rectangle in image pixels, top-left origin, y growing down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Rectangle from origin and size.
    pub fn from_xywh(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn is_finite(&self) -> bool {
        self.left.is_finite() && self.top.is_finite() && self.right.is_finite() && self.bottom.is_finite()
    }

    /// True when the rectangle has no positive area.
    pub fn is_degenerate(&self) -> bool {
        !(self.right > self.left && self.bottom > self.top)
    }

    /// Component-wise scale of all four edges.
    pub fn scaled(&self, sx: f32, sy: f32) -> Self {
        Self::new(self.left * sx, self.top * sy, self.right * sx, self.bottom * sy)
    }

    /// Overlapping part of two rectangles, or `None` if they do not overlap.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let clipped = Rect::new(
            self.left.max(other.left),
            self.top.max(other.top),
            self.right.min(other.right),
            self.bottom.min(other.bottom),
        );
        (!clipped.is_degenerate()).then_some(clipped)
    }
}

/// A word produced by the OCR engine, in the pixel space of its reference
/// image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedWord {
    pub text: String,
    pub bbox: Rect,
    /// Recognition confidence in `[0, 1]`.
    pub confidence: f32,
}

impl RecognizedWord {
    /// Create a word. Confidence above 1 is read as a percentage and the
    /// result is clamped to `[0, 1]`; non-finite confidence becomes 0.
    pub fn new(text: impl Into<String>, bbox: Rect, confidence: f32) -> Self {
        Self {
            text: text.into(),
            bbox,
            confidence: normalize_confidence(confidence),
        }
    }

    /// Check the box invariants (`right > left`, `bottom > top`, finite).
    ///
    /// `index` is the word's position in its page list, echoed in the issue.
    pub fn check(&self, index: usize) -> Result<(), PageIssue> {
        let reason = if !self.bbox.is_finite() {
            "non-finite coordinates"
        } else if self.bbox.right <= self.bbox.left {
            "right <= left"
        } else if self.bbox.bottom <= self.bbox.top {
            "bottom <= top"
        } else {
            return Ok(());
        };
        Err(PageIssue::MalformedWord {
            index,
            reason: reason.to_string(),
        })
    }
}

/// Map a 0..1 or 0..100 confidence into `[0, 1]`.
pub fn normalize_confidence(value: f32) -> f32 {
    if !value.is_finite() {
        return 0.0;
    }
    let value = if value > 1.0 { value / 100.0 } else { value };
    value.clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// Transform descriptor
// ---------------------------------------------------------------------------

/// How coordinates in the OCR reference image map onto the placed image.
///
/// Boxes are first scaled by `scale_x`/`scale_y`; the scaled space
/// (`src_w * scale_x` by `src_h * scale_y`) is then turned clockwise by
/// `rotation_deg`, which must be a multiple of 90.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformDescriptor {
    pub src_w: f32,
    pub src_h: f32,
    pub dst_w: f32,
    pub dst_h: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub rotation_deg: f32,
}

impl TransformDescriptor {
    /// OCR ran on the placed image itself.
    pub fn identity(width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        Self {
            src_w: w,
            src_h: h,
            dst_w: w,
            dst_h: h,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation_deg: 0.0,
        }
    }

    /// Derive the scales from the two image sizes. For quarter turns the
    /// destination axes are swapped before dividing.
    pub fn between(src_w: u32, src_h: u32, dst_w: u32, dst_h: u32, rotation_deg: f32) -> Self {
        let (sw, sh, dw, dh) = (src_w as f32, src_h as f32, dst_w as f32, dst_h as f32);
        let swapped = matches!(quarter_turns(rotation_deg), Some(1) | Some(3));
        let (scale_x, scale_y) = if swapped {
            (dh / sw, dw / sh)
        } else {
            (dw / sw, dh / sh)
        };
        Self {
            src_w: sw,
            src_h: sh,
            dst_w: dw,
            dst_h: dh,
            scale_x,
            scale_y,
            rotation_deg,
        }
    }

    /// Size of the reference image after scaling, before rotation.
    pub fn scaled_extent(&self) -> (f32, f32) {
        (self.src_w * self.scale_x, self.src_h * self.scale_y)
    }

    /// Clockwise quarter turns (0..=3), or `None` for other angles.
    pub fn quarter_turns(&self) -> Option<u8> {
        quarter_turns(self.rotation_deg)
    }

    /// Check that the descriptor can be applied.
    pub fn validate(&self) -> Result<(), String> {
        let values = [
            self.src_w,
            self.src_h,
            self.dst_w,
            self.dst_h,
            self.scale_x,
            self.scale_y,
        ];
        if values.iter().any(|v| !v.is_finite() || *v <= 0.0) {
            return Err(format!("non-positive or non-finite transform: {self:?}"));
        }
        if self.quarter_turns().is_none() {
            return Err(format!(
                "rotation of {} degrees is not a quarter turn",
                self.rotation_deg
            ));
        }
        Ok(())
    }
}

fn quarter_turns(degrees: f32) -> Option<u8> {
    if !degrees.is_finite() {
        return None;
    }
    let normalised = degrees.rem_euclid(360.0);
    let turns = (normalised / 90.0).round();
    if (normalised - turns * 90.0).abs() < 0.01 {
        Some((turns as u8) % 4)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Quality presets
// ---------------------------------------------------------------------------

/// Output size/quality trade-offs for embedded page images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityPreset {
    #[default]
    High,
    Standard,
    Small,
    VerySmall,
}

impl QualityPreset {
    /// Maximum embedded pixel density.
    pub fn target_dpi(&self) -> u32 {
        match self {
            Self::High => 300,
            Self::Standard => 200,
            Self::Small => 150,
            Self::VerySmall => 110,
        }
    }

    /// JPEG quality (1-100) for colour and grayscale pages.
    pub fn jpeg_quality(&self) -> u8 {
        match self {
            Self::High => 85,
            Self::Standard => 72,
            Self::Small => 62,
            Self::VerySmall => 52,
        }
    }

    pub fn force_grayscale(&self) -> bool {
        !matches!(self, Self::High)
    }

    /// Case-insensitive lookup by name (`"high"`, `"very_small"`, …),
    /// returning `default` for unknown or empty names.
    pub fn from_name(name: &str, default: QualityPreset) -> QualityPreset {
        match name.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "HIGH" => Self::High,
            "STANDARD" => Self::Standard,
            "SMALL" => Self::Small,
            "VERY_SMALL" => Self::VerySmall,
            _ => default,
        }
    }
}
