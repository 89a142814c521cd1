// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Font module — resolve a Unicode outline font for the invisible text layer,
// with the standard single-byte Helvetica as the fallback.

pub mod embed;
pub mod resolver;
pub mod standard;
pub mod subset;

use std::collections::HashMap;
use std::sync::Arc;

use unicode_normalization::UnicodeNormalization;

pub use resolver::{FontResolver, ResolvedFonts};

/// What kind of font program backs a [`FontHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontKind {
    /// TrueType outlines embedded as a Type0/CIDFontType2 font, two-byte glyph
    /// ids on the wire.
    Embedded,
    /// Standard Helvetica, WinAnsi single-byte codes, nothing embedded.
    Standard,
}

/// Vertical metrics in font units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
    pub ascent: f32,
    /// Negative below the baseline.
    pub descent: f32,
    pub units_per_em: f32,
}

impl FontMetrics {
    /// Share of the ascent-to-descent span that lies below the baseline.
    ///
    /// `None` when the font reports no usable vertical extent.
    pub fn descent_fraction(&self) -> Option<f32> {
        let below = self.descent.abs();
        let span = self.ascent + below;
        (self.ascent > 0.0 && span.is_finite() && span > 0.0).then(|| below / span)
    }
}

/// Font-program fields needed only when the font is embedded.
#[derive(Debug)]
pub(crate) struct FontProgram {
    pub data: Arc<[u8]>,
    pub bbox: [i16; 4],
    pub cap_height: i16,
    pub italic_angle: f32,
    pub fixed_pitch: bool,
}

#[derive(Debug)]
struct FontInner {
    name: String,
    kind: FontKind,
    metrics: FontMetrics,
    /// Character to on-the-wire code: glyph id or WinAnsi byte.
    codes: HashMap<char, u16>,
    /// Advance per code, in font units.
    advances: HashMap<u16, u16>,
    default_advance: u16,
    program: Option<FontProgram>,
}

/// A loaded font, cheap to clone and shared across the pages of one document.
#[derive(Debug, Clone)]
pub struct FontHandle(Arc<FontInner>);

impl FontHandle {
    /// Standard Helvetica with WinAnsi encoding.
    pub fn standard() -> Self {
        let mut codes = HashMap::new();
        let mut advances = HashMap::new();
        for byte in 0x20u8..=0xFF {
            if let Some(ch) = standard::decode_byte(byte) {
                codes.insert(ch, byte as u16);
                advances.insert(byte as u16, standard::width_of(byte));
            }
        }
        Self(Arc::new(FontInner {
            name: standard::BASE_FONT.to_string(),
            kind: FontKind::Standard,
            metrics: FontMetrics {
                ascent: standard::ASCENT as f32,
                descent: standard::DESCENT as f32,
                units_per_em: standard::UNITS_PER_EM as f32,
            },
            codes,
            advances,
            default_advance: standard::DEFAULT_WIDTH,
            program: None,
        }))
    }

    /// Parse a TrueType program. Returns a reason when the font cannot be
    /// embedded: unparsable, no `glyf` outlines, no Unicode cmap, or
    /// restricted embedding permissions.
    pub fn from_truetype(label: &str, data: Arc<[u8]>) -> Result<Self, String> {
        let face = ttf_parser::Face::parse(&data, 0)
            .map_err(|err| format!("{label}: not a font ({err})"))?;

        if face.tables().glyf.is_none() {
            return Err(format!("{label}: no TrueType outlines"));
        }
        if matches!(face.permissions(), Some(ttf_parser::Permissions::Restricted)) {
            return Err(format!("{label}: embedding is restricted"));
        }

        let mut codes = HashMap::new();
        if let Some(cmap) = face.tables().cmap {
            for subtable in cmap.subtables.into_iter().filter(|s| s.is_unicode()) {
                subtable.codepoints(|cp| {
                    let Some(ch) = char::from_u32(cp) else { return };
                    if let Some(gid) = subtable.glyph_index(cp) {
                        codes.entry(ch).or_insert(gid.0);
                    }
                });
            }
        }
        codes.retain(|_, gid| *gid != 0);
        if codes.is_empty() {
            return Err(format!("{label}: no Unicode character map"));
        }

        let advances = codes
            .values()
            .filter_map(|gid| {
                face.glyph_hor_advance(ttf_parser::GlyphId(*gid))
                    .map(|adv| (*gid, adv))
            })
            .collect();
        let default_advance = face
            .glyph_hor_advance(ttf_parser::GlyphId(0))
            .unwrap_or(face.units_per_em() / 2);

        let name = face
            .names()
            .into_iter()
            .filter(|n| n.name_id == ttf_parser::name_id::POST_SCRIPT_NAME)
            .find_map(|n| n.to_string())
            .unwrap_or_else(|| label.to_string());

        let bbox = face.global_bounding_box();
        let program = FontProgram {
            data: data.clone(),
            bbox: [bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max],
            cap_height: face.capital_height().unwrap_or(face.ascender()),
            italic_angle: face.italic_angle(),
            fixed_pitch: face.is_monospaced(),
        };

        Ok(Self(Arc::new(FontInner {
            name: sanitize_font_name(&name),
            kind: FontKind::Embedded,
            metrics: FontMetrics {
                ascent: face.ascender() as f32,
                descent: face.descender() as f32,
                units_per_em: face.units_per_em() as f32,
            },
            codes,
            advances,
            default_advance,
            program: Some(program),
        })))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn kind(&self) -> FontKind {
        self.0.kind
    }

    pub fn metrics(&self) -> FontMetrics {
        self.0.metrics
    }

    /// On-the-wire code for a character: glyph id for embedded fonts, WinAnsi
    /// byte for the standard font.
    pub fn glyph_id(&self, ch: char) -> Option<u16> {
        self.0.codes.get(&ch).copied()
    }

    /// Whether every character of the NFC form of `text` has a glyph.
    pub fn covers(&self, text: &str) -> bool {
        text.nfc().all(|ch| self.0.codes.contains_key(&ch))
    }

    /// Advance of one code, in font units.
    pub fn advance_width(&self, code: u16) -> u16 {
        self.0
            .advances
            .get(&code)
            .copied()
            .unwrap_or(self.0.default_advance)
    }

    /// Width of `text` in ems. Characters without a glyph are skipped.
    pub fn text_width(&self, text: &str) -> f32 {
        let units: u32 = text
            .chars()
            .filter_map(|ch| self.glyph_id(ch))
            .map(|code| self.advance_width(code) as u32)
            .sum();
        units as f32 / self.0.metrics.units_per_em
    }

    /// Same font, same shared data?
    #[cfg(test)]
    pub(crate) fn ptr_eq(&self, other: &FontHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn program(&self) -> Option<&FontProgram> {
        self.0.program.as_ref()
    }
}

/// Keep only characters allowed in a PDF name token.
fn sanitize_font_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+'))
        .collect();
    if cleaned.is_empty() {
        "EmbeddedFont".to_string()
    } else {
        cleaned
    }
}
