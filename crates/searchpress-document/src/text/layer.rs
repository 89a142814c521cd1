// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text layer compositor — turn a page's OCR words into invisible text
// operators aligned with the placed image.

use lopdf::content::Operation;
use lopdf::{Object, StringFormat};
use searchpress_core::{PageIssue, RecognizedWord, TextLayerConfig, TransformDescriptor};
use tracing::{debug, instrument, warn};
use unicode_normalization::UnicodeNormalization;

use super::geometry::{WordPlacement, place_word};
use crate::font::embed::GlyphUsage;
use crate::font::{FontHandle, FontKind, ResolvedFonts, standard};
use crate::layout::PagePlacement;

/// Page resource name of the embedded Unicode font.
pub const UNICODE_FONT_RESOURCE: &str = "F1";
/// Page resource name of the standard font.
pub const STANDARD_FONT_RESOURCE: &str = "F2";

/// Text render mode that neither fills nor strokes.
const RENDER_INVISIBLE: i64 = 3;
/// Bounds for the horizontal stretch that fits a run to its box.
const MIN_STRETCH: f32 = 0.1;
const MAX_STRETCH: f32 = 10.0;

/// Glyphs used so far in one document, per font.
#[derive(Debug, Clone, Default)]
pub struct DocumentGlyphs {
    pub unicode: GlyphUsage,
    pub standard: GlyphUsage,
}

/// Invisible text for one page.
#[derive(Debug, Clone, Default)]
pub struct TextLayer {
    pub operations: Vec<Operation>,
    pub words_placed: usize,
    pub issues: Vec<PageIssue>,
    pub uses_unicode_font: bool,
    pub uses_standard_font: bool,
}

impl TextLayer {
    fn dropped(reason: String) -> Self {
        Self {
            issues: vec![PageIssue::TextLayerDropped { reason }],
            ..Self::default()
        }
    }
}

/// Which font a run is set in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FontChoice {
    Unicode,
    Standard,
}

/// A word encoded for one font.
#[derive(Debug)]
struct EncodedRun {
    choice: FontChoice,
    codes: Vec<u16>,
    /// Characters the codes stand for, one per code.
    text: String,
    fell_back: bool,
}

/// Replace control characters with spaces and trim.
pub fn sanitize_text(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Places words for every page of one document, sharing its fonts.
pub struct Compositor<'a> {
    fonts: &'a ResolvedFonts,
    config: &'a TextLayerConfig,
}

impl<'a> Compositor<'a> {
    pub fn new(fonts: &'a ResolvedFonts, config: &'a TextLayerConfig) -> Self {
        Self { fonts, config }
    }

    /// Build the invisible text layer of one page.
    ///
    /// Words are emitted in input order. Bad words are dropped and reported;
    /// a descriptor that cannot be applied drops the whole layer.
    #[instrument(skip_all, fields(words = words.len(), image_w, image_h))]
    pub fn compose(
        &self,
        words: &[RecognizedWord],
        td: &TransformDescriptor,
        image_w: u32,
        image_h: u32,
        placement: &PagePlacement,
        glyphs: &mut DocumentGlyphs,
    ) -> TextLayer {
        if let Err(reason) = td.validate() {
            warn!(%reason, "Transform unusable, page will be image-only");
            return TextLayer::dropped(reason);
        }

        let mut layer = TextLayer::default();
        for (index, word) in words.iter().enumerate() {
            let text: String = sanitize_text(&word.text).nfc().collect();
            if text.is_empty() {
                continue;
            }
            if let Err(issue) = word.check(index) {
                warn!(%issue, "Malformed word");
                layer.issues.push(issue);
                continue;
            }

            let Some(run) = self.encode(&text) else {
                warn!(index, "No font can encode word");
                layer.issues.push(PageIssue::MissingGlyphs { index });
                continue;
            };
            let font = match run.choice {
                FontChoice::Unicode => self.fonts.unicode.as_ref(),
                FontChoice::Standard => self.fonts.standard.as_ref(),
            };
            let Some(font) = font else { continue };

            let descent_fraction = if self.config.prefer_font_metrics {
                font.metrics().descent_fraction()
            } else {
                None
            };
            let Some(placed) = place_word(
                &word.bbox,
                td,
                image_w as f32,
                image_h as f32,
                placement,
                descent_fraction,
            ) else {
                debug!(index, "Word outside placed image");
                layer.issues.push(PageIssue::WordOutsideImage { index });
                continue;
            };

            if run.fell_back {
                layer.issues.push(PageIssue::GlyphFallback { index });
            }
            self.emit(&mut layer, font, &run, &placed, placement.scale);
            record_usage(glyphs, &run);
            layer.words_placed += 1;
        }

        debug!(
            placed = layer.words_placed,
            issues = layer.issues.len(),
            "Text layer composed"
        );
        layer
    }

    /// Pick a font for `text`: the Unicode font when it has every glyph, the
    /// standard font when it can show at least one letter or digit, the
    /// Unicode font without its missing glyphs, or nothing.
    fn encode(&self, text: &str) -> Option<EncodedRun> {
        let unicode = self.fonts.unicode.as_ref();
        if let Some(font) = unicode
            && font.covers(text)
        {
            return Some(encode_with(font, FontChoice::Unicode, text, false));
        }

        if let Some(font) = self.fonts.standard.as_ref() {
            let shows_something = text
                .chars()
                .any(|c| c.is_alphanumeric() && font.glyph_id(c).is_some());
            if shows_something {
                let substituted: String = text
                    .chars()
                    .map(|c| if font.glyph_id(c).is_some() { c } else { '?' })
                    .collect();
                return Some(encode_with(
                    font,
                    FontChoice::Standard,
                    &substituted,
                    unicode.is_some(),
                ));
            }
        }

        let font = unicode?;
        let kept: String = text.chars().filter(|c| font.glyph_id(*c).is_some()).collect();
        if kept.trim().is_empty() {
            return None;
        }
        Some(encode_with(font, FontChoice::Unicode, &kept, true))
    }

    fn emit(
        &self,
        layer: &mut TextLayer,
        font: &FontHandle,
        run: &EncodedRun,
        placed: &WordPlacement,
        placement_scale: f32,
    ) {
        let stretch = if self.config.fit_width {
            let natural = font.text_width(&run.text) * placed.font_size;
            if natural > 0.0 {
                (placed.run_length / natural).clamp(MIN_STRETCH, MAX_STRETCH)
            } else {
                1.0
            }
        } else {
            1.0
        };

        let (resource, bytes) = match font.kind() {
            FontKind::Embedded => {
                layer.uses_unicode_font = true;
                let bytes = run.codes.iter().flat_map(|c| c.to_be_bytes()).collect();
                (UNICODE_FONT_RESOURCE, Object::String(bytes, StringFormat::Hexadecimal))
            }
            FontKind::Standard => {
                layer.uses_standard_font = true;
                let bytes = run.codes.iter().map(|c| *c as u8).collect();
                (STANDARD_FONT_RESOURCE, Object::String(bytes, StringFormat::Literal))
            }
        };

        let matrix = placed.text_matrix(placement_scale, stretch);
        layer.operations.extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(resource.as_bytes().to_vec()), placed.font_size.into()],
            ),
            Operation::new("Tr", vec![RENDER_INVISIBLE.into()]),
            Operation::new("Tm", matrix.iter().map(|v| Object::Real(*v)).collect()),
            Operation::new("Tj", vec![bytes]),
            Operation::new("ET", vec![]),
        ]);
    }
}

fn encode_with(font: &FontHandle, choice: FontChoice, text: &str, fell_back: bool) -> EncodedRun {
    let mut codes = Vec::with_capacity(text.len());
    let mut kept = String::with_capacity(text.len());
    for ch in text.chars() {
        if let Some(code) = font.glyph_id(ch) {
            codes.push(code);
            kept.push(ch);
        }
    }
    EncodedRun {
        choice,
        codes,
        text: kept,
        fell_back,
    }
}

fn record_usage(glyphs: &mut DocumentGlyphs, run: &EncodedRun) {
    let usage = match run.choice {
        FontChoice::Unicode => &mut glyphs.unicode,
        FontChoice::Standard => &mut glyphs.standard,
    };
    for (code, ch) in run.codes.iter().zip(run.text.chars()) {
        usage.entry(*code).or_insert_with(|| ch.to_string());
    }
}

/// Decode a standard-font string back to text, for diagnostics and tests.
pub fn decode_standard(bytes: &[u8]) -> String {
    bytes.iter().filter_map(|b| standard::decode_byte(*b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::plan_placement;
    use searchpress_core::Rect;

    fn standard_only() -> ResolvedFonts {
        ResolvedFonts {
            unicode: None,
            standard: Some(FontHandle::standard()),
        }
    }

    fn with_bundled() -> ResolvedFonts {
        let bytes = std::sync::Arc::from(crate::font::resolver::BUNDLED_FONT);
        ResolvedFonts {
            unicode: Some(FontHandle::from_truetype("bundled", bytes).unwrap()),
            standard: Some(FontHandle::standard()),
        }
    }

    fn word(text: &str, l: f32, t: f32, r: f32, b: f32) -> RecognizedWord {
        RecognizedWord::new(text, Rect::new(l, t, r, b), 0.9)
    }

    fn compose(words: &[RecognizedWord]) -> (TextLayer, DocumentGlyphs) {
        compose_with(&standard_only(), words)
    }

    fn compose_with(fonts: &ResolvedFonts, words: &[RecognizedWord]) -> (TextLayer, DocumentGlyphs) {
        let config = TextLayerConfig::default();
        let placement = plan_placement(800.0, 1200.0, 595.2756, 841.8898).unwrap();
        let td = TransformDescriptor::identity(800, 1200);
        let mut glyphs = DocumentGlyphs::default();
        let layer = Compositor::new(fonts, &config).compose(words, &td, 800, 1200, &placement, &mut glyphs);
        (layer, glyphs)
    }

    fn shown_strings(layer: &TextLayer) -> Vec<String> {
        layer
            .operations
            .iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| match op.operands.first() {
                Some(Object::String(bytes, _)) => Some(decode_standard(bytes)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn words_are_emitted_invisible_and_in_order() {
        let (layer, glyphs) = compose(&[
            word("Alpha", 100.0, 200.0, 220.0, 240.0),
            word("Beta", 240.0, 200.0, 330.0, 240.0),
        ]);
        assert_eq!(layer.words_placed, 2);
        assert_eq!(shown_strings(&layer), vec!["Alpha", "Beta"]);
        assert!(layer.uses_standard_font && !layer.uses_unicode_font);
        assert!(
            layer
                .operations
                .iter()
                .filter(|op| op.operator == "Tr")
                .all(|op| matches!(op.operands[..], [Object::Integer(3)]))
        );
        assert!(glyphs.standard.contains_key(&(b'A' as u16)));
    }

    #[test]
    fn empty_text_is_skipped_silently() {
        let (layer, _) = compose(&[word("  \u{7}\t ", 10.0, 10.0, 20.0, 20.0)]);
        assert_eq!(layer.words_placed, 0);
        assert!(layer.issues.is_empty());
        assert!(layer.operations.is_empty());
    }

    #[test]
    fn degenerate_box_is_dropped_not_fatal() {
        let (layer, _) = compose(&[
            word("flat", 10.0, 50.0, 40.0, 50.0),
            word("fine", 10.0, 60.0, 40.0, 80.0),
        ]);
        assert_eq!(layer.words_placed, 1);
        assert!(matches!(layer.issues[0], PageIssue::MalformedWord { index: 0, .. }));
    }

    #[test]
    fn word_outside_image_is_reported() {
        let (layer, _) = compose(&[word("far", 5000.0, 10.0, 5100.0, 40.0)]);
        assert_eq!(layer.issues, vec![PageIssue::WordOutsideImage { index: 0 }]);
    }

    #[test]
    fn unencodable_characters_become_question_marks() {
        let (layer, _) = compose(&[word("naïve Ω", 10.0, 10.0, 200.0, 40.0)]);
        assert_eq!(shown_strings(&layer), vec!["naïve ?"]);
    }

    #[test]
    fn word_with_no_encodable_letters_is_missing_glyphs() {
        let (layer, _) = compose(&[word("漢字", 10.0, 10.0, 200.0, 40.0)]);
        assert_eq!(layer.issues, vec![PageIssue::MissingGlyphs { index: 0 }]);
        assert_eq!(layer.words_placed, 0);
    }

    #[test]
    fn bad_rotation_drops_the_layer() {
        let fonts = standard_only();
        let config = TextLayerConfig::default();
        let placement = plan_placement(100.0, 100.0, 100.0, 100.0).unwrap();
        let mut td = TransformDescriptor::identity(100, 100);
        td.rotation_deg = 45.0;
        let layer = Compositor::new(&fonts, &config).compose(
            &[word("x", 1.0, 1.0, 5.0, 5.0)],
            &td,
            100,
            100,
            &placement,
            &mut DocumentGlyphs::default(),
        );
        assert!(matches!(layer.issues[..], [PageIssue::TextLayerDropped { .. }]));
        assert!(layer.operations.is_empty());
    }

    #[test]
    fn unicode_runs_are_two_byte_glyph_ids() {
        let fonts = with_bundled();
        let font = fonts.unicode.as_ref().unwrap();
        let (layer, glyphs) = compose_with(&fonts, &[word("Ωmega", 100.0, 200.0, 260.0, 240.0)]);
        assert!(layer.uses_unicode_font && !layer.uses_standard_font);
        assert!(layer.issues.is_empty());

        let tf = layer.operations.iter().find(|op| op.operator == "Tf").unwrap();
        assert_eq!(tf.operands[0].as_name().unwrap(), UNICODE_FONT_RESOURCE.as_bytes());
        let tj = layer.operations.iter().find(|op| op.operator == "Tj").unwrap();
        let expected: Vec<u8> = "Ωmega"
            .chars()
            .flat_map(|c| font.glyph_id(c).unwrap().to_be_bytes())
            .collect();
        assert!(matches!(&tj.operands[..], [Object::String(bytes, StringFormat::Hexadecimal)] if *bytes == expected));
        assert_eq!(glyphs.unicode.get(&font.glyph_id('Ω').unwrap()).map(String::as_str), Some("Ω"));
    }

    #[test]
    fn partly_covered_words_fall_back_and_are_reported() {
        let fonts = with_bundled();
        let (layer, glyphs) = compose_with(
            &fonts,
            &[
                word("Tokyo東京", 100.0, 200.0, 300.0, 240.0),
                word("Ω東", 100.0, 300.0, 200.0, 340.0),
                word("東京", 100.0, 400.0, 200.0, 440.0),
            ],
        );
        assert_eq!(layer.words_placed, 2);
        assert_eq!(
            layer.issues,
            vec![
                PageIssue::GlyphFallback { index: 0 },
                PageIssue::GlyphFallback { index: 1 },
                PageIssue::MissingGlyphs { index: 2 },
            ]
        );
        assert!(layer.uses_unicode_font && layer.uses_standard_font);
        assert_eq!(glyphs.standard.get(&(b'?' as u16)).map(String::as_str), Some("?"));
        assert_eq!(glyphs.unicode.len(), 1);
    }

    #[test]
    fn sanitize_replaces_controls() {
        assert_eq!(sanitize_text("\u{0}ab\ncd\u{1b} "), "ab cd");
    }

    #[test]
    fn font_size_operand_is_box_based() {
        let (layer, _) = compose(&[word("Alpha", 100.0, 200.0, 220.0, 240.0)]);
        let tf = layer.operations.iter().find(|op| op.operator == "Tf").unwrap();
        assert!(matches!(tf.operands[1], Object::Real(size) if size == 28.0));
    }
}
