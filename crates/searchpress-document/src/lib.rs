// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// searchpress-document — Searchable PDF assembly for scanned pages.
//
// Places each page image on a fixed-size page, lays an invisible OCR text
// layer over it so the words can be searched and selected, embeds the fonts
// that layer needs, and streams the finished document to any byte sink.

pub mod compose;
pub mod font;
pub mod image;
pub mod layout;
pub mod pdf;
pub mod text;
pub mod words_json;

// Re-export the primary entry points so callers can use `searchpress_document::compose_document` etc.
pub use compose::{ComposeReport, PageInput, compose_document, compose_to_path};
pub use font::{FontResolver, ResolvedFonts};
pub use layout::{PagePlacement, plan_placement};
pub use pdf::{Document, DocumentState, PageReport, PdfInspector};
