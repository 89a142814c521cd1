// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Font embedding — PDF objects for the fonts a document actually used.
//
// An embedded font becomes Type0 → CIDFontType2 (Identity-H, CIDToGIDMap
// Identity) with a subset FontFile2 program, a /W array covering the used
// glyphs, and a ToUnicode CMap so extraction yields the original characters.
// The standard font is a bare Type1 dictionary.

use std::collections::BTreeMap;

use lopdf::{Dictionary, Object, ObjectId, Stream, dictionary};
use searchpress_core::error::{DocumentError, Result};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::subset::subset_glyphs;
use super::{FontHandle, FontKind};

/// ToUnicode entries per `beginbfchar` block (the format caps it at 100).
const BFCHAR_CHUNK: usize = 100;

/// Glyph codes a document used with one font, each with the text it stands for.
pub type GlyphUsage = BTreeMap<u16, String>;

/// Write the objects for `font` so that `font_id` holds its font dictionary.
pub(crate) fn write_font_objects(
    doc: &mut lopdf::Document,
    font_id: ObjectId,
    font: &FontHandle,
    used: &GlyphUsage,
) -> Result<()> {
    match font.kind() {
        FontKind::Standard => {
            doc.objects.insert(
                font_id,
                Object::Dictionary(dictionary! {
                    "Type" => "Font",
                    "Subtype" => "Type1",
                    "BaseFont" => Object::Name(font.name().as_bytes().to_vec()),
                    "Encoding" => "WinAnsiEncoding",
                }),
            );
            Ok(())
        }
        FontKind::Embedded => write_cid_font(doc, font_id, font, used),
    }
}

fn write_cid_font(
    doc: &mut lopdf::Document,
    font_id: ObjectId,
    font: &FontHandle,
    used: &GlyphUsage,
) -> Result<()> {
    let program = font.program().ok_or_else(|| {
        DocumentError::FontUnavailable(format!("{} has no font program to embed", font.name()))
    })?;
    let metrics = font.metrics();
    let scale = 1000.0 / metrics.units_per_em;
    let to_pdf_units = |v: f32| (v * scale).round() as i64;
    let base_font = Object::Name(format!("{}+{}", subset_tag(used), font.name()).into_bytes());

    let file = match subset_glyphs(&program.data, used.keys().copied()) {
        Ok(bytes) => {
            debug!(
                font = font.name(),
                glyphs = used.len(),
                full = program.data.len(),
                subset = bytes.len(),
                "Font program subset"
            );
            bytes
        }
        Err(reason) => {
            warn!(font = font.name(), %reason, "Subsetting failed, embedding the whole program");
            program.data.to_vec()
        }
    };
    let file_id = doc.add_object(Stream::new(
        dictionary! { "Length1" => file.len() as i64 },
        file,
    ));

    let flags: i64 = if program.fixed_pitch { 32 | 1 } else { 32 };
    let [x_min, y_min, x_max, y_max] = program.bbox;
    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => base_font.clone(),
        "Flags" => flags,
        "FontBBox" => vec![
            Object::Integer(to_pdf_units(x_min as f32)),
            Object::Integer(to_pdf_units(y_min as f32)),
            Object::Integer(to_pdf_units(x_max as f32)),
            Object::Integer(to_pdf_units(y_max as f32)),
        ],
        "ItalicAngle" => program.italic_angle,
        "Ascent" => to_pdf_units(metrics.ascent),
        "Descent" => to_pdf_units(metrics.descent),
        "CapHeight" => to_pdf_units(program.cap_height as f32),
        "StemV" => 80,
        "FontFile2" => file_id,
    });

    let mut widths = Vec::with_capacity(used.len() * 2);
    for gid in used.keys() {
        widths.push(Object::Integer(*gid as i64));
        widths.push(Object::Array(vec![Object::Integer(to_pdf_units(
            font.advance_width(*gid) as f32,
        ))]));
    }

    let cid_font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType2",
        "BaseFont" => base_font.clone(),
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::string_literal("Adobe"),
            "Ordering" => Object::string_literal("Identity"),
            "Supplement" => 0,
        },
        "FontDescriptor" => descriptor_id,
        "W" => widths,
        "CIDToGIDMap" => "Identity",
    });

    let to_unicode_id = doc.add_object(Stream::new(
        Dictionary::new(),
        to_unicode_cmap(used).into_bytes(),
    ));

    doc.objects.insert(
        font_id,
        Object::Dictionary(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => base_font,
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![Object::Reference(cid_font_id)],
            "ToUnicode" => to_unicode_id,
        }),
    );
    Ok(())
}

/// Six capital letters naming one glyph selection, the `ABCDEF+` prefix
/// readers expect on subset font names.
fn subset_tag(used: &GlyphUsage) -> String {
    let mut hasher = Sha256::new();
    for gid in used.keys() {
        hasher.update(gid.to_be_bytes());
    }
    hasher
        .finalize()
        .iter()
        .take(6)
        .map(|byte| char::from(b'A' + byte % 26))
        .collect()
}

/// ToUnicode CMap mapping each two-byte glyph code to UTF-16BE text.
pub fn to_unicode_cmap(used: &GlyphUsage) -> String {
    let entries: Vec<(&u16, &String)> = used.iter().collect();

    let mut out = String::new();
    out.push_str("/CIDInit /ProcSet findresource begin\n");
    out.push_str("12 dict begin\n");
    out.push_str("begincmap\n");
    out.push_str("/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
    out.push_str("/CMapName /Adobe-Identity-UCS def\n");
    out.push_str("/CMapType 2 def\n");
    out.push_str("1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n");

    for chunk in entries.chunks(BFCHAR_CHUNK) {
        out.push_str(&format!("{} beginbfchar\n", chunk.len()));
        for (gid, text) in chunk {
            let utf16: String = text
                .encode_utf16()
                .map(|unit| format!("{unit:04X}"))
                .collect();
            out.push_str(&format!("<{gid:04X}> <{utf16}>\n"));
        }
        out.push_str("endbfchar\n");
    }

    out.push_str("endcmap\n");
    out.push_str("CMapName currentdict /CMap defineresource pop\n");
    out.push_str("end\nend\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::resolver::BUNDLED_FONT;
    use std::sync::Arc;

    #[test]
    fn cmap_encodes_surrogate_pairs() {
        let mut used = GlyphUsage::new();
        used.insert(3, "A".into());
        used.insert(4, "\u{1F600}".into());
        let cmap = to_unicode_cmap(&used);
        assert!(cmap.contains("<0003> <0041>"));
        assert!(cmap.contains("<0004> <D83DDE00>"));
        assert!(cmap.contains("2 beginbfchar"));
    }

    #[test]
    fn cmap_splits_into_blocks_of_one_hundred() {
        let used: GlyphUsage = (1..=150u16).map(|g| (g, "x".to_string())).collect();
        let cmap = to_unicode_cmap(&used);
        assert!(cmap.contains("100 beginbfchar"));
        assert!(cmap.contains("50 beginbfchar"));
    }

    #[test]
    fn subset_tags_are_stable_capitals() {
        let used: GlyphUsage = [(36u16, "A".to_string()), (37, "B".to_string())].into();
        let tag = subset_tag(&used);
        assert_eq!(tag.len(), 6);
        assert!(tag.chars().all(|c| c.is_ascii_uppercase()));
        assert_eq!(tag, subset_tag(&used.clone()));
        assert_ne!(tag, subset_tag(&GlyphUsage::new()));
    }

    #[test]
    fn embedded_font_gets_a_subset_program_and_cid_objects() {
        let font = FontHandle::from_truetype("bundled", Arc::from(BUNDLED_FONT)).unwrap();
        let mut used = GlyphUsage::new();
        for ch in "Ωmega".chars() {
            used.insert(font.glyph_id(ch).unwrap(), ch.to_string());
        }

        let mut doc = lopdf::Document::with_version("1.5");
        let id = doc.new_object_id();
        write_font_objects(&mut doc, id, &font, &used).unwrap();

        let type0 = doc.get_dictionary(id).unwrap();
        assert_eq!(type0.get(b"Subtype").unwrap().as_name().unwrap(), b"Type0");
        assert_eq!(type0.get(b"Encoding").unwrap().as_name().unwrap(), b"Identity-H");
        let base = type0.get(b"BaseFont").unwrap().as_name().unwrap();
        assert_eq!(base[6], b'+');
        assert!(base.ends_with(font.name().as_bytes()));

        let descendants = type0.get(b"DescendantFonts").unwrap().as_array().unwrap();
        let cid = doc
            .get_dictionary(descendants[0].as_reference().unwrap())
            .unwrap();
        assert_eq!(cid.get(b"Subtype").unwrap().as_name().unwrap(), b"CIDFontType2");
        assert_eq!(cid.get(b"W").unwrap().as_array().unwrap().len(), used.len() * 2);

        let descriptor = doc
            .get_dictionary(cid.get(b"FontDescriptor").unwrap().as_reference().unwrap())
            .unwrap();
        let file = doc
            .get_object(descriptor.get(b"FontFile2").unwrap().as_reference().unwrap())
            .unwrap()
            .as_stream()
            .unwrap();
        assert!(file.content.len() * 5 < BUNDLED_FONT.len());
        assert_eq!(file.dict.get(b"Length1").unwrap().as_i64().unwrap(), file.content.len() as i64);
    }

    #[test]
    fn standard_font_is_a_type1_dictionary() {
        let mut doc = lopdf::Document::with_version("1.5");
        let id = doc.new_object_id();
        write_font_objects(&mut doc, id, &FontHandle::standard(), &GlyphUsage::new()).unwrap();
        let dict = doc.get_dictionary(id).unwrap();
        assert_eq!(dict.get(b"Subtype").unwrap().as_name().unwrap(), b"Type1");
        assert_eq!(dict.get(b"BaseFont").unwrap().as_name().unwrap(), b"Helvetica");
    }
}
