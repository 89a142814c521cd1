// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF inspector — read a produced document back with `lopdf` and report its
// pages, boxes, and searchable text.

use std::collections::HashMap;
use std::path::Path;

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use searchpress_core::error::{DocumentError, Result};
use tracing::{debug, info, instrument};

use crate::font::standard;

/// Vertical distance (points) above which two runs are on different lines.
const LINE_TOLERANCE: f32 = 1.0;

/// Page boundary rectangles as `[x0, y0, x1, y1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBoxes {
    pub media: [f32; 4],
    pub crop: Option<[f32; 4]>,
    pub trim: Option<[f32; 4]>,
}

impl PageBoxes {
    /// Crop and trim boxes both present and equal to the media box.
    pub fn harmonized(&self) -> bool {
        self.crop == Some(self.media) && self.trim == Some(self.media)
    }
}

/// How to turn the bytes of a shown string into text.
enum FontDecoder {
    /// Two-byte codes through a ToUnicode map.
    Cid(HashMap<u16, String>),
    /// One-byte WinAnsi codes.
    WinAnsi,
}

impl FontDecoder {
    fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Self::Cid(map) => bytes
                .chunks_exact(2)
                .filter_map(|pair| map.get(&u16::from_be_bytes([pair[0], pair[1]])))
                .map(String::as_str)
                .collect(),
            Self::WinAnsi => bytes.iter().filter_map(|b| standard::decode_byte(*b)).collect(),
        }
    }
}

/// Read-only view of a PDF document.
pub struct PdfInspector {
    document: Document,
}

impl PdfInspector {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        info!("Opening PDF: {}", path_ref.display());
        let document = Document::load(path_ref).map_err(|err| {
            DocumentError::Inspection(format!("failed to open {}: {}", path_ref.display(), err))
        })?;
        debug!(pages = document.get_pages().len(), "PDF loaded");
        Ok(Self { document })
    }

    /// Parse a PDF already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            DocumentError::Inspection(format!("failed to load PDF from memory: {err}"))
        })?;
        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");
        Ok(Self { document })
    }

    // -- Inspection -----------------------------------------------------------

    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Boundary boxes of a page (1-indexed).
    pub fn page_boxes(&self, page_number: u32) -> Result<PageBoxes> {
        let page = self.page_dictionary(page_number)?;
        let media = self
            .rect(page, b"MediaBox")
            .ok_or_else(|| DocumentError::Inspection(format!("page {page_number} has no MediaBox")))?;
        Ok(PageBoxes {
            media,
            crop: self.rect(page, b"CropBox"),
            trim: self.rect(page, b"TrimBox"),
        })
    }

    /// `/Rotate` of a page (1-indexed), 0 when absent.
    pub fn page_rotation(&self, page_number: u32) -> Result<i64> {
        let page = self.page_dictionary(page_number)?;
        Ok(page
            .get(b"Rotate")
            .ok()
            .and_then(|r| self.resolve(r).as_i64().ok())
            .unwrap_or(0))
    }

    /// Text shown on a page (1-indexed), in content-stream order. Runs on one
    /// baseline are joined by spaces, baseline changes by newlines.
    #[instrument(skip(self))]
    pub fn page_text(&self, page_number: u32) -> Result<String> {
        let page_id = self.page_id(page_number)?;
        let fonts = self.page_fonts(page_id)?;
        let content = self.page_content(page_id)?;

        let mut text = String::new();
        let mut decoder: Option<&FontDecoder> = None;
        let mut line_y: Option<f32> = None;
        let mut cursor_y = 0.0f32;

        for op in &content.operations {
            match op.operator.as_str() {
                "BT" => cursor_y = 0.0,
                "Tf" => {
                    decoder = op
                        .operands
                        .first()
                        .and_then(|name| name.as_name().ok())
                        .and_then(|name| fonts.get(name));
                }
                "Tm" => {
                    if let Some(y) = op.operands.get(5).and_then(number) {
                        cursor_y = y;
                    }
                }
                "Td" | "TD" => {
                    if let Some(dy) = op.operands.get(1).and_then(number) {
                        cursor_y += dy;
                    }
                }
                "Tj" | "'" | "\"" | "TJ" => {
                    let Some(decoder) = decoder else { continue };
                    let shown = shown_strings(op.operator.as_str(), &op.operands)
                        .map(|bytes| decoder.decode(bytes))
                        .collect::<String>();
                    if shown.trim().is_empty() {
                        continue;
                    }
                    if let Some(previous) = line_y {
                        let separator = if (previous - cursor_y).abs() > LINE_TOLERANCE {
                            '\n'
                        } else {
                            ' '
                        };
                        text.push(separator);
                    }
                    text.push_str(&shown);
                    line_y = Some(cursor_y);
                }
                _ => {}
            }
        }
        Ok(text)
    }

    /// True when every text-showing operator on the page runs with render
    /// mode 3 (no fill, no stroke).
    pub fn invisible_text_only(&self, page_number: u32) -> Result<bool> {
        let content = self.page_content(self.page_id(page_number)?)?;
        let mut render_mode = 0i64;
        let mut saved = Vec::new();
        for op in &content.operations {
            match op.operator.as_str() {
                "q" => saved.push(render_mode),
                "Q" => render_mode = saved.pop().unwrap_or(0),
                "Tr" => {
                    render_mode = op.operands.first().and_then(|o| o.as_i64().ok()).unwrap_or(0);
                }
                "Tj" | "TJ" | "'" | "\"" if render_mode != 3 => return Ok(false),
                _ => {}
            }
        }
        Ok(true)
    }

    /// Number of image XObjects drawn on a page (1-indexed).
    pub fn page_image_count(&self, page_number: u32) -> Result<usize> {
        let content = self.page_content(self.page_id(page_number)?)?;
        Ok(content.operations.iter().filter(|op| op.operator == "Do").count())
    }

    // -- Helpers --------------------------------------------------------------

    fn page_id(&self, page_number: u32) -> Result<ObjectId> {
        let pages = self.document.get_pages();
        pages.get(&page_number).copied().ok_or_else(|| {
            DocumentError::Inspection(format!(
                "page {} out of range (document has {} pages)",
                page_number,
                pages.len()
            ))
        })
    }

    fn page_dictionary(&self, page_number: u32) -> Result<&Dictionary> {
        let id = self.page_id(page_number)?;
        self.document
            .get_dictionary(id)
            .map_err(|err| DocumentError::Inspection(format!("page {page_number}: {err}")))
    }

    fn page_content(&self, page_id: ObjectId) -> Result<Content> {
        let bytes = self
            .document
            .get_page_content(page_id)
            .map_err(|err| DocumentError::Inspection(format!("page content: {err}")))?;
        Content::decode(&bytes)
            .map_err(|err| DocumentError::Inspection(format!("page content: {err}")))
    }

    fn resolve<'a>(&'a self, object: &'a Object) -> &'a Object {
        match object {
            Object::Reference(id) => self.document.get_object(*id).unwrap_or(object),
            other => other,
        }
    }

    fn rect(&self, dict: &Dictionary, key: &[u8]) -> Option<[f32; 4]> {
        let values = self.resolve(dict.get(key).ok()?).as_array().ok()?;
        let numbers = values
            .iter()
            .map(|v| number(self.resolve(v)))
            .collect::<Option<Vec<f32>>>()?;
        match numbers.as_slice() {
            [x0, y0, x1, y1] => Some([*x0, *y0, *x1, *y1]),
            _ => None,
        }
    }

    fn page_fonts(&self, page_id: ObjectId) -> Result<HashMap<Vec<u8>, FontDecoder>> {
        let page = self
            .document
            .get_dictionary(page_id)
            .map_err(|err| DocumentError::Inspection(format!("page dictionary: {err}")))?;

        let mut decoders = HashMap::new();
        let Some(resources) = page
            .get(b"Resources")
            .ok()
            .and_then(|r| self.resolve(r).as_dict().ok())
        else {
            return Ok(decoders);
        };
        let Some(fonts) = resources
            .get(b"Font")
            .ok()
            .and_then(|f| self.resolve(f).as_dict().ok())
        else {
            return Ok(decoders);
        };

        for (name, font) in fonts.iter() {
            let Ok(font) = self.resolve(font).as_dict() else {
                continue;
            };
            let decoder = match font.get(b"ToUnicode").ok().map(|t| self.resolve(t)) {
                Some(Object::Stream(stream)) => {
                    let data = stream
                        .decompressed_content()
                        .unwrap_or_else(|_| stream.content.clone());
                    FontDecoder::Cid(parse_to_unicode(&String::from_utf8_lossy(&data)))
                }
                _ => FontDecoder::WinAnsi,
            };
            decoders.insert(name.clone(), decoder);
        }
        Ok(decoders)
    }
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Byte strings shown by one text operator.
fn shown_strings<'a>(operator: &str, operands: &'a [Object]) -> impl Iterator<Item = &'a [u8]> {
    let items: Vec<&'a Object> = match operator {
        "TJ" => operands
            .first()
            .and_then(|o| o.as_array().ok())
            .map(|items| items.iter().collect())
            .unwrap_or_default(),
        _ => operands.last().into_iter().collect(),
    };
    items.into_iter().filter_map(|o| match o {
        Object::String(bytes, _) => Some(bytes.as_slice()),
        _ => None,
    })
}

// -- ToUnicode CMap parsing ---------------------------------------------------

fn hex_tokens(section: &str) -> Vec<&str> {
    section
        .split('<')
        .skip(1)
        .filter_map(|chunk| chunk.split('>').next())
        .collect()
}

fn hex_code(hex: &str) -> Option<u16> {
    u16::from_str_radix(hex.trim(), 16).ok()
}

fn utf16_hex(hex: &str) -> Option<String> {
    let hex = hex.trim();
    let units = (0..hex.len())
        .step_by(4)
        .map(|i| hex.get(i..i + 4).and_then(|h| u16::from_str_radix(h, 16).ok()))
        .collect::<Option<Vec<u16>>>()?;
    String::from_utf16(&units).ok()
}

fn sections<'a>(text: &'a str, begin: &str, end: &str) -> Vec<&'a str> {
    let mut found = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find(begin) {
        let after = &rest[start + begin.len()..];
        let Some(stop) = after.find(end) else { break };
        found.push(&after[..stop]);
        rest = &after[stop + end.len()..];
    }
    found
}

/// `bfchar` and simple `bfrange` entries of a ToUnicode CMap.
fn parse_to_unicode(cmap: &str) -> HashMap<u16, String> {
    let mut map = HashMap::new();

    for section in sections(cmap, "beginbfchar", "endbfchar") {
        for pair in hex_tokens(section).chunks_exact(2) {
            if let (Some(code), Some(text)) = (hex_code(pair[0]), utf16_hex(pair[1])) {
                map.insert(code, text);
            }
        }
    }

    for section in sections(cmap, "beginbfrange", "endbfrange") {
        for triple in hex_tokens(section).chunks_exact(3) {
            let (Some(lo), Some(hi)) = (hex_code(triple[0]), hex_code(triple[1])) else {
                continue;
            };
            let Some(first) = utf16_hex(triple[2]).and_then(|s| s.chars().next()) else {
                continue;
            };
            for (offset, code) in (lo..=hi).enumerate() {
                if let Some(ch) = char::from_u32(first as u32 + offset as u32) {
                    map.insert(code, ch.to_string());
                }
            }
        }
    }
    map
}
