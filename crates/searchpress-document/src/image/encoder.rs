// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image encoder — turn a raster page into a PDF image XObject at the
// density and compression the quality preset asks for.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ExtendedColorType, GrayImage, RgbImage};
use lopdf::{Object, Stream, dictionary};
use searchpress_core::error::{DocumentError, Result};
use searchpress_core::{PixelFormat, QualityPreset, RasterPage};
use tracing::{debug, instrument};

/// Quality value that selects lossless output.
const LOSSLESS_QUALITY: u8 = 100;

/// How the image data of an XObject is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFilter {
    /// Baseline JPEG.
    Dct,
    /// Raw samples, deflated when the document is written.
    Flate,
}

/// An image ready to add to the document.
#[derive(Debug)]
pub struct EncodedImage {
    pub stream: Stream,
    /// Embedded pixel size; may be smaller than the source after downscaling.
    pub width: u32,
    pub height: u32,
    pub filter: ImageFilter,
}

/// Decoded working pixels, always without alpha.
enum Pixels {
    Gray(GrayImage),
    Rgb(RgbImage),
}

impl Pixels {
    fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::Gray(img) => img.dimensions(),
            Self::Rgb(img) => img.dimensions(),
        }
    }

    fn grayscale(self) -> Self {
        match self {
            Self::Rgb(img) => Self::Gray(image::DynamicImage::ImageRgb8(img).to_luma8()),
            gray => gray,
        }
    }

    /// Shrink to fit `max_w` x `max_h`, keeping the aspect ratio. Never
    /// enlarges.
    fn fit_within(self, max_w: u32, max_h: u32) -> Self {
        let (w, h) = self.dimensions();
        if w <= max_w && h <= max_h {
            return self;
        }
        let ratio = (max_w as f64 / w as f64).min(max_h as f64 / h as f64);
        let new_w = ((w as f64 * ratio).round() as u32).max(1);
        let new_h = ((h as f64 * ratio).round() as u32).max(1);
        debug!(from_w = w, from_h = h, new_w, new_h, "Downscaling page image");
        match self {
            Self::Gray(img) => Self::Gray(image::imageops::resize(&img, new_w, new_h, FilterType::Lanczos3)),
            Self::Rgb(img) => Self::Rgb(image::imageops::resize(&img, new_w, new_h, FilterType::Lanczos3)),
        }
    }
}

/// Encodes page images for one quality preset.
#[derive(Debug, Clone, Copy)]
pub struct ImageEncoder {
    preset: QualityPreset,
}

impl ImageEncoder {
    pub fn new(preset: QualityPreset) -> Self {
        Self { preset }
    }

    /// Encode `page` for a placed size of `placed_w_pt` x `placed_h_pt`.
    ///
    /// `page_index` is only used in error reports.
    #[instrument(skip(self, page), fields(width = page.width, height = page.height, format = ?page.format))]
    pub fn encode(
        &self,
        page: &RasterPage,
        page_index: usize,
        placed_w_pt: f32,
        placed_h_pt: f32,
    ) -> Result<EncodedImage> {
        page.validate(page_index)?;

        if page.format == PixelFormat::BlackWhite {
            return Ok(pack_bilevel(page));
        }

        let mut pixels = to_pixels(page, page_index)?;
        if self.preset.force_grayscale() {
            pixels = pixels.grayscale();
        }
        let (max_w, max_h) = self.max_pixels(placed_w_pt, placed_h_pt);
        let pixels = pixels.fit_within(max_w, max_h);

        let quality = page.quality.unwrap_or(self.preset.jpeg_quality());
        if quality < LOSSLESS_QUALITY {
            encode_jpeg(&pixels, quality, page_index)
        } else {
            Ok(encode_raw(pixels))
        }
    }

    /// Pixel budget for the placed size at the preset density.
    fn max_pixels(&self, placed_w_pt: f32, placed_h_pt: f32) -> (u32, u32) {
        let dpi = self.preset.target_dpi() as f32;
        let to_px = |pt: f32| ((pt / 72.0 * dpi).ceil() as u32).max(1);
        (to_px(placed_w_pt), to_px(placed_h_pt))
    }
}

fn to_pixels(page: &RasterPage, page_index: usize) -> Result<Pixels> {
    let (w, h) = (page.width, page.height);
    let short_buffer = || DocumentError::UnreadableImage {
        page: page_index,
        reason: "pixel buffer does not match its dimensions".into(),
    };
    match page.format {
        PixelFormat::Gray8 | PixelFormat::BlackWhite => GrayImage::from_raw(w, h, page.pixels().to_vec())
            .map(Pixels::Gray)
            .ok_or_else(short_buffer),
        PixelFormat::Rgb8 => RgbImage::from_raw(w, h, page.pixels().to_vec())
            .map(Pixels::Rgb)
            .ok_or_else(short_buffer),
        PixelFormat::Rgba8 => {
            let flattened: Vec<u8> = page
                .pixels()
                .chunks_exact(4)
                .flat_map(|px| {
                    let alpha = px[3] as u32;
                    let over_white = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha)) / 255) as u8;
                    [over_white(px[0]), over_white(px[1]), over_white(px[2])]
                })
                .collect();
            RgbImage::from_raw(w, h, flattened)
                .map(Pixels::Rgb)
                .ok_or_else(short_buffer)
        }
    }
}

fn image_dictionary(width: u32, height: u32, color_space: &str, bits: i64) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => Object::Name(color_space.as_bytes().to_vec()),
        "BitsPerComponent" => bits,
    }
}

fn encode_jpeg(pixels: &Pixels, quality: u8, page_index: usize) -> Result<EncodedImage> {
    let (width, height) = pixels.dimensions();
    let (data, color, space) = match pixels {
        Pixels::Gray(img) => (img.as_raw(), ExtendedColorType::L8, "DeviceGray"),
        Pixels::Rgb(img) => (img.as_raw(), ExtendedColorType::Rgb8, "DeviceRGB"),
    };

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100))
        .encode(data, width, height, color)
        .map_err(|err| DocumentError::UnreadableImage {
            page: page_index,
            reason: format!("JPEG encoding failed: {err}"),
        })?;

    let mut dict = image_dictionary(width, height, space, 8);
    dict.set("Filter", "DCTDecode");
    debug!(width, height, quality, bytes = jpeg.len(), "Page image encoded as JPEG");
    Ok(EncodedImage {
        stream: Stream::new(dict, jpeg).with_compression(false),
        width,
        height,
        filter: ImageFilter::Dct,
    })
}

fn encode_raw(pixels: Pixels) -> EncodedImage {
    let (width, height) = pixels.dimensions();
    let (data, space) = match pixels {
        Pixels::Gray(img) => (img.into_raw(), "DeviceGray"),
        Pixels::Rgb(img) => (img.into_raw(), "DeviceRGB"),
    };
    EncodedImage {
        stream: Stream::new(image_dictionary(width, height, space, 8), data),
        width,
        height,
        filter: ImageFilter::Flate,
    }
}

/// One bit per pixel, rows padded to whole bytes; set bits are white.
fn pack_bilevel(page: &RasterPage) -> EncodedImage {
    let (width, height) = (page.width, page.height);
    let row_bytes = (width as usize).div_ceil(8);
    let mut packed = vec![0u8; row_bytes * height as usize];
    for (y, row) in page.pixels().chunks_exact(width as usize).enumerate() {
        for (x, value) in row.iter().enumerate() {
            if *value >= 128 {
                packed[y * row_bytes + x / 8] |= 0x80 >> (x % 8);
            }
        }
    }
    EncodedImage {
        stream: Stream::new(image_dictionary(width, height, "DeviceGray", 1), packed),
        width,
        height,
        filter: ImageFilter::Flate,
    }
}
