// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// TrueType subsetting — keep the outlines of the glyphs a document used.
//
// Glyph ids do not move: dropped glyphs become empty `glyf` entries, so the
// two-byte codes already in the content streams still select the right
// outlines through `CIDToGIDMap /Identity`.

use std::collections::BTreeSet;
use std::num::NonZeroU16;

use ttf_parser::{GlyphId, Tag, loca};

/// Tables a PDF TrueType program needs, in tag order.
const KEPT_TABLES: [&[u8; 4]; 9] = [
    b"cvt ", b"fpgm", b"glyf", b"head", b"hhea", b"hmtx", b"loca", b"maxp", b"prep",
];

const HEAD_CHECKSUM_ADJUSTMENT: usize = 8;
const HEAD_INDEX_TO_LOC_FORMAT: usize = 50;
const HHEA_NUMBER_OF_H_METRICS: usize = 34;
const CHECKSUM_MAGIC: u32 = 0xB1B0_AFBA;

// Composite glyph flags.
const ARG_1_AND_2_ARE_WORDS: u16 = 0x0001;
const WE_HAVE_A_SCALE: u16 = 0x0008;
const MORE_COMPONENTS: u16 = 0x0020;
const WE_HAVE_AN_X_AND_Y_SCALE: u16 = 0x0040;
const WE_HAVE_A_TWO_BY_TWO: u16 = 0x0080;

/// Rebuild `data` with outlines only for `used` glyphs, the glyphs their
/// composites refer to, and `.notdef`.
pub fn subset_glyphs(data: &[u8], used: impl IntoIterator<Item = u16>) -> Result<Vec<u8>, String> {
    let face = ttf_parser::Face::parse(data, 0).map_err(|err| format!("not a font ({err})"))?;
    let raw = face.raw_face();
    let table = |tag: &[u8; 4]| raw.table(Tag::from_bytes(tag));

    let num_glyphs = face.number_of_glyphs();
    let count = NonZeroU16::new(num_glyphs).ok_or("font has no glyphs")?;
    let glyf = table(b"glyf").ok_or("no glyf table")?;
    let loca = table(b"loca")
        .and_then(|bytes| loca::Table::parse(count, face.tables().head.index_to_location_format, bytes))
        .ok_or("no readable loca table")?;
    let outline = |gid: u16| loca.glyph_range(GlyphId(gid)).and_then(|range| glyf.get(range));

    let keep = glyph_closure(used, num_glyphs, &outline);

    let mut new_glyf = Vec::new();
    let mut new_loca = Vec::with_capacity((num_glyphs as usize + 1) * 4);
    for gid in 0..num_glyphs {
        new_loca.extend_from_slice(&(new_glyf.len() as u32).to_be_bytes());
        if keep.contains(&gid)
            && let Some(glyph) = outline(gid)
        {
            new_glyf.extend_from_slice(glyph);
            new_glyf.resize(new_glyf.len().next_multiple_of(4), 0);
        }
    }
    new_loca.extend_from_slice(&(new_glyf.len() as u32).to_be_bytes());

    let mut head = table(b"head").ok_or("no head table")?.to_vec();
    if head.len() < HEAD_INDEX_TO_LOC_FORMAT + 2 {
        return Err("head table too short".into());
    }
    head[HEAD_CHECKSUM_ADJUSTMENT..HEAD_CHECKSUM_ADJUSTMENT + 4].fill(0);
    // Offsets are always written long.
    head[HEAD_INDEX_TO_LOC_FORMAT..HEAD_INDEX_TO_LOC_FORMAT + 2].copy_from_slice(&1u16.to_be_bytes());

    let hmtx = table(b"hmtx")
        .zip(table(b"hhea"))
        .map(|(hmtx, hhea)| blank_unused_metrics(hmtx, hhea, &keep));

    let tables: Vec<([u8; 4], Vec<u8>)> = KEPT_TABLES
        .iter()
        .filter_map(|tag| {
            let bytes = match *tag {
                b"glyf" => Some(new_glyf.clone()),
                b"loca" => Some(new_loca.clone()),
                b"head" => Some(head.clone()),
                b"hmtx" => hmtx.clone(),
                other => table(other).map(<[u8]>::to_vec),
            }?;
            Some((**tag, bytes))
        })
        .collect();

    Ok(write_sfnt(&tables))
}

/// `used` plus `.notdef` and every composite component, transitively.
fn glyph_closure<'a>(
    used: impl IntoIterator<Item = u16>,
    num_glyphs: u16,
    outline: &impl Fn(u16) -> Option<&'a [u8]>,
) -> BTreeSet<u16> {
    let mut keep: BTreeSet<u16> = used.into_iter().filter(|gid| *gid < num_glyphs).collect();
    keep.insert(0);
    let mut pending: Vec<u16> = keep.iter().copied().collect();
    while let Some(gid) = pending.pop() {
        let Some(glyph) = outline(gid) else { continue };
        for component in composite_components(glyph) {
            if component < num_glyphs && keep.insert(component) {
                pending.push(component);
            }
        }
    }
    keep
}

/// Glyph ids a composite glyph is built from. Empty for simple glyphs.
fn composite_components(glyph: &[u8]) -> Vec<u16> {
    let mut components = Vec::new();
    if read_u16(glyph, 0).is_none_or(|contours| (contours as i16) >= 0) {
        return components;
    }

    let mut pos = 10;
    while let (Some(flags), Some(gid)) = (read_u16(glyph, pos), read_u16(glyph, pos + 2)) {
        components.push(gid);
        pos += 4;
        pos += if flags & ARG_1_AND_2_ARE_WORDS != 0 { 4 } else { 2 };
        pos += if flags & WE_HAVE_A_SCALE != 0 {
            2
        } else if flags & WE_HAVE_AN_X_AND_Y_SCALE != 0 {
            4
        } else if flags & WE_HAVE_A_TWO_BY_TWO != 0 {
            8
        } else {
            0
        };
        if flags & MORE_COMPONENTS == 0 {
            break;
        }
    }
    components
}

/// Zero the metrics of glyphs that are not kept. Widths reach readers
/// through `/W`, so only the kept entries matter.
fn blank_unused_metrics(hmtx: &[u8], hhea: &[u8], keep: &BTreeSet<u16>) -> Vec<u8> {
    let mut out = hmtx.to_vec();
    let long_metrics = read_u16(hhea, HHEA_NUMBER_OF_H_METRICS).unwrap_or(0) as usize;
    let mut gid = 0usize;
    let mut pos = 0usize;
    while pos < out.len() {
        let width = if gid < long_metrics { 4 } else { 2 };
        let end = (pos + width).min(out.len());
        if !keep.contains(&(gid as u16)) {
            out[pos..end].fill(0);
        }
        pos = end;
        gid += 1;
    }
    out
}

/// Serialise tables, already in tag order, as a TrueType font file.
fn write_sfnt(tables: &[([u8; 4], Vec<u8>)]) -> Vec<u8> {
    let count = tables.len() as u16;
    let entry_selector = if count == 0 { 0 } else { 15 - count.leading_zeros() as u16 };
    let search_range = (1u16 << entry_selector) * 16;
    let range_shift = count * 16 - search_range;

    let mut out = Vec::new();
    out.extend_from_slice(&0x0001_0000u32.to_be_bytes());
    for field in [count, search_range, entry_selector, range_shift] {
        out.extend_from_slice(&field.to_be_bytes());
    }

    let mut offset = 12 + 16 * tables.len();
    let mut head_offset = None;
    for (tag, bytes) in tables {
        if tag == b"head" {
            head_offset = Some(offset);
        }
        out.extend_from_slice(tag);
        out.extend_from_slice(&checksum(bytes).to_be_bytes());
        out.extend_from_slice(&(offset as u32).to_be_bytes());
        out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
        offset += bytes.len().next_multiple_of(4);
    }
    for (_, bytes) in tables {
        out.extend_from_slice(bytes);
        out.resize(out.len().next_multiple_of(4), 0);
    }

    if let Some(head) = head_offset {
        let adjustment = CHECKSUM_MAGIC.wrapping_sub(checksum(&out));
        let at = head + HEAD_CHECKSUM_ADJUSTMENT;
        out[at..at + 4].copy_from_slice(&adjustment.to_be_bytes());
    }
    out
}

/// Sum of big-endian words, the last one zero-padded.
fn checksum(bytes: &[u8]) -> u32 {
    bytes.chunks(4).fold(0u32, |sum, chunk| {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        sum.wrapping_add(u32::from_be_bytes(word))
    })
}

fn read_u16(bytes: &[u8], at: usize) -> Option<u16> {
    bytes
        .get(at..at + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::resolver::BUNDLED_FONT;

    struct PathCount(usize);

    impl ttf_parser::OutlineBuilder for PathCount {
        fn move_to(&mut self, _x: f32, _y: f32) {
            self.0 += 1;
        }
        fn line_to(&mut self, _x: f32, _y: f32) {
            self.0 += 1;
        }
        fn quad_to(&mut self, _x1: f32, _y1: f32, _x: f32, _y: f32) {
            self.0 += 1;
        }
        fn curve_to(&mut self, _x1: f32, _y1: f32, _x2: f32, _y2: f32, _x: f32, _y: f32) {
            self.0 += 1;
        }
        fn close(&mut self) {}
    }

    fn gid(face: &ttf_parser::Face<'_>, ch: char) -> u16 {
        face.glyph_index(ch).unwrap().0
    }

    fn has_outline(face: &ttf_parser::Face<'_>, gid: u16) -> bool {
        let mut count = PathCount(0);
        face.outline_glyph(GlyphId(gid), &mut count).is_some() && count.0 > 0
    }

    #[test]
    fn keeps_used_outlines_and_glyph_ids() {
        let original = ttf_parser::Face::parse(BUNDLED_FONT, 0).unwrap();
        let (a, omega, z) = (gid(&original, 'A'), gid(&original, 'Ω'), gid(&original, 'Z'));

        let subset = subset_glyphs(BUNDLED_FONT, [a, omega]).unwrap();
        assert!(subset.len() * 5 < BUNDLED_FONT.len(), "{} bytes", subset.len());

        let face = ttf_parser::Face::parse(&subset, 0).unwrap();
        assert_eq!(face.number_of_glyphs(), original.number_of_glyphs());
        assert!(has_outline(&face, a));
        assert!(has_outline(&face, omega));
        assert!(!has_outline(&face, z));
        assert_eq!(face.glyph_hor_advance(GlyphId(a)), original.glyph_hor_advance(GlyphId(a)));
    }

    #[test]
    fn whole_file_checksum_is_balanced() {
        let subset = subset_glyphs(BUNDLED_FONT, [36u16]).unwrap();
        assert_eq!(subset.len() % 4, 0);
        assert_eq!(checksum(&subset), CHECKSUM_MAGIC);
    }

    #[test]
    fn composite_components_are_followed() {
        // Two components, the first with word arguments and a scale.
        let mut glyph = vec![0xFF, 0xFF, 0, 0, 0, 0, 0, 0, 0, 0];
        let flags = ARG_1_AND_2_ARE_WORDS | WE_HAVE_A_SCALE | MORE_COMPONENTS;
        glyph.extend_from_slice(&flags.to_be_bytes());
        glyph.extend_from_slice(&7u16.to_be_bytes());
        glyph.extend_from_slice(&[0; 6]);
        glyph.extend_from_slice(&0u16.to_be_bytes());
        glyph.extend_from_slice(&9u16.to_be_bytes());
        glyph.extend_from_slice(&[0; 2]);
        assert_eq!(composite_components(&glyph), vec![7, 9]);

        let simple = [0u8, 1, 0, 0, 0, 0, 0, 0, 0, 0];
        assert!(composite_components(&simple).is_empty());
    }

    #[test]
    fn accented_composites_keep_their_parts() {
        let original = ttf_parser::Face::parse(BUNDLED_FONT, 0).unwrap();
        let e_acute = gid(&original, 'é');
        let subset = subset_glyphs(BUNDLED_FONT, [e_acute]).unwrap();
        let face = ttf_parser::Face::parse(&subset, 0).unwrap();
        assert!(has_outline(&face, e_acute));
    }

    #[test]
    fn garbage_is_refused() {
        assert!(subset_glyphs(b"definitely not a font", [1u16]).is_err());
    }
}
