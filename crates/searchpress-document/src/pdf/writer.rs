// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document writer — accumulate pages in order and stream the finished
// document to a byte sink.
//
// A `Document` moves Empty → Accumulating → Finalizing → Written, or to
// Failed from any non-terminal state. Both terminal states release every
// font and image the document held; a new `Document` is needed to retry.

use std::io::Write;

use chrono::Utc;
use lopdf::{Object, ObjectId, StringFormat, dictionary};
use searchpress_core::error::{DocumentError, PageIssue, Result};
use searchpress_core::{
    ComposeConfig, DocumentId, MetadataConfig, RasterPage, RecognizedWord, TextLayerConfig,
    TransformDescriptor,
};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, instrument, warn};

use super::page::{FontObjectIds, PageAssembler};
use crate::font::embed::write_font_objects;
use crate::font::{FontResolver, ResolvedFonts};
use crate::image::ImageEncoder;
use crate::layout::plan_placement;
use crate::text::{Compositor, DocumentGlyphs};

/// Lifecycle of a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    Empty,
    Accumulating,
    Finalizing,
    Written,
    Failed,
}

impl DocumentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Accumulating => "accumulating",
            Self::Finalizing => "finalizing",
            Self::Written => "written",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Written | Self::Failed)
    }
}

/// Outcome of one appended page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageReport {
    /// Zero-based position in the document.
    pub index: usize,
    pub words_placed: usize,
    pub issues: Vec<PageIssue>,
}

/// Outcome of a successful finalize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub bytes_written: u64,
    /// Hex SHA-256 of exactly the bytes handed to the sink.
    pub sha256: String,
}

/// Everything held while pages accumulate. Dropped on any terminal state.
struct Building {
    pdf: lopdf::Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
    fonts: Option<ResolvedFonts>,
    font_ids: FontObjectIds,
    glyphs: DocumentGlyphs,
    encoder: ImageEncoder,
    assembler: PageAssembler,
    page_size: (f32, f32),
    text_config: TextLayerConfig,
    metadata: MetadataConfig,
}

/// One output document under construction.
pub struct Document {
    id: DocumentId,
    state: DocumentState,
    building: Option<Building>,
    pages: usize,
}

impl Document {
    /// Open a document, resolving fonts from `config.fonts`.
    pub fn new(config: &ComposeConfig) -> Result<Self> {
        Self::with_resolver(config, &FontResolver::new(config.fonts.clone()))
    }

    /// Open a document with a caller-prepared font resolver.
    ///
    /// Fonts are resolved here, once per document, unless the text layer is
    /// disabled, in which case fonts are never touched.
    #[instrument(skip_all, fields(page_size = ?config.page_size, quality = ?config.quality))]
    pub fn with_resolver(config: &ComposeConfig, resolver: &FontResolver) -> Result<Self> {
        config.validate()?;
        let page_size = config.page_size.dimensions_pt();

        let fonts = if config.text_layer.enabled {
            Some(resolver.resolve()?)
        } else {
            debug!("Text layer disabled, skipping font resolution");
            None
        };

        let mut pdf = lopdf::Document::with_version("1.5");
        let pages_id = pdf.new_object_id();
        let font_ids = match &fonts {
            Some(fonts) => FontObjectIds {
                unicode: fonts.unicode.as_ref().map(|_| pdf.new_object_id()),
                standard: fonts.standard.as_ref().map(|_| pdf.new_object_id()),
            },
            None => FontObjectIds::default(),
        };

        let id = DocumentId::new();
        info!(%id, "Document opened");
        Ok(Self {
            id,
            state: DocumentState::Empty,
            building: Some(Building {
                pdf,
                pages_id,
                kids: Vec::new(),
                fonts,
                font_ids,
                glyphs: DocumentGlyphs::default(),
                encoder: ImageEncoder::new(config.quality),
                assembler: PageAssembler::new(page_size.0, page_size.1),
                page_size,
                text_config: config.text_layer.clone(),
                metadata: config.metadata.clone(),
            }),
            pages: 0,
        })
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn state(&self) -> DocumentState {
        self.state
    }

    /// Pages appended so far.
    pub fn page_count(&self) -> usize {
        self.pages
    }

    /// Append one page after all previous ones.
    ///
    /// `words` of `None` or empty gives an image-only page. Without a
    /// descriptor the words are taken to be in the raster's own pixel space.
    #[instrument(skip_all, fields(document = %self.id, index = self.pages))]
    pub fn append_page(
        &mut self,
        page: &RasterPage,
        words: Option<&[RecognizedWord]>,
        transform: Option<&TransformDescriptor>,
    ) -> Result<PageReport> {
        if !matches!(self.state, DocumentState::Empty | DocumentState::Accumulating) {
            return Err(self.invalid_state());
        }
        let index = self.pages;
        let building = self.building.as_mut().ok_or(DocumentError::InvalidState {
            state: DocumentState::Failed.as_str(),
        })?;

        match building.add_page(index, page, words, transform) {
            Ok(report) => {
                self.state = DocumentState::Accumulating;
                self.pages += 1;
                info!(
                    index,
                    words_placed = report.words_placed,
                    issues = report.issues.len(),
                    "Page appended"
                );
                Ok(report)
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Serialise every page to `sink`, in append order, and flush it.
    ///
    /// Consumes the accumulated pages: afterwards the document is Written or
    /// Failed and accepts no further calls.
    #[instrument(skip_all, fields(document = %self.id, pages = self.pages))]
    pub fn finalize<W: Write>(&mut self, sink: W) -> Result<WriteSummary> {
        if self.state != DocumentState::Accumulating {
            if self.state == DocumentState::Empty {
                let err = DocumentError::InvalidGeometry("document has no pages".into());
                self.fail(&err);
                return Err(err);
            }
            return Err(self.invalid_state());
        }
        let Some(building) = self.building.take() else {
            return Err(self.invalid_state());
        };

        self.state = DocumentState::Finalizing;
        match building.write_to(self.id, sink) {
            Ok(summary) => {
                self.state = DocumentState::Written;
                info!(
                    bytes = summary.bytes_written,
                    sha256 = %summary.sha256,
                    "Document written"
                );
                Ok(summary)
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    fn fail(&mut self, err: &DocumentError) {
        error!(%err, state = self.state.as_str(), "Document failed");
        self.building = None;
        self.state = DocumentState::Failed;
    }

    fn invalid_state(&self) -> DocumentError {
        warn!(state = self.state.as_str(), "Call on a finished document");
        DocumentError::InvalidState {
            state: self.state.as_str(),
        }
    }
}

impl Building {
    fn add_page(
        &mut self,
        index: usize,
        page: &RasterPage,
        words: Option<&[RecognizedWord]>,
        transform: Option<&TransformDescriptor>,
    ) -> Result<PageReport> {
        let (page_w, page_h) = self.page_size;
        let placement = plan_placement(page.width as f32, page.height as f32, page_w, page_h)?;
        let image = self
            .encoder
            .encode(page, index, placement.draw_w, placement.draw_h)?;
        debug!(
            scale = placement.scale,
            offset_x = placement.offset_x,
            offset_y = placement.offset_y,
            embedded_w = image.width,
            embedded_h = image.height,
            "Page placed"
        );

        let words = words.unwrap_or_default();
        let layer = match &self.fonts {
            Some(fonts) if !words.is_empty() => {
                let identity = TransformDescriptor::identity(page.width, page.height);
                let td = transform.unwrap_or(&identity);
                Some(Compositor::new(fonts, &self.text_config).compose(
                    words,
                    td,
                    page.width,
                    page.height,
                    &placement,
                    &mut self.glyphs,
                ))
            }
            _ => None,
        };

        let page_id = self.assembler.assemble(
            &mut self.pdf,
            self.pages_id,
            image,
            &placement,
            layer.as_ref(),
            self.font_ids,
        )?;
        self.kids.push(Object::Reference(page_id));

        Ok(match layer {
            Some(layer) => PageReport {
                index,
                words_placed: layer.words_placed,
                issues: layer.issues,
            },
            None => PageReport {
                index,
                words_placed: 0,
                issues: Vec::new(),
            },
        })
    }

    fn write_to<W: Write>(mut self, id: DocumentId, sink: W) -> Result<WriteSummary> {
        if let Some(fonts) = &self.fonts {
            if let (Some(font), Some(font_id)) = (&fonts.unicode, self.font_ids.unicode)
                && !self.glyphs.unicode.is_empty()
            {
                write_font_objects(&mut self.pdf, font_id, font, &self.glyphs.unicode)?;
            }
            if let (Some(font), Some(font_id)) = (&fonts.standard, self.font_ids.standard)
                && !self.glyphs.standard.is_empty()
            {
                write_font_objects(&mut self.pdf, font_id, font, &self.glyphs.standard)?;
            }
        }

        let count = self.kids.len() as i64;
        self.pdf.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => self.kids,
                "Count" => count,
            }),
        );
        let catalog_id = self.pdf.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        let info_id = self.pdf.add_object(info_dictionary(&self.metadata));

        let file_id = Object::String(id.as_bytes().to_vec(), StringFormat::Hexadecimal);
        self.pdf.trailer.set("Root", catalog_id);
        self.pdf.trailer.set("Info", info_id);
        self.pdf.trailer.set("ID", vec![file_id.clone(), file_id]);
        self.pdf.compress();

        let mut writer = HashingWriter::new(sink);
        self.pdf
            .save_to(&mut writer)
            .map_err(|err| DocumentError::EncodingFailure(err.to_string()))?;
        writer
            .flush()
            .map_err(|err| DocumentError::EncodingFailure(err.to_string()))?;
        Ok(writer.summary())
    }
}

fn info_dictionary(metadata: &MetadataConfig) -> lopdf::Dictionary {
    let mut info = dictionary! {
        "Creator" => text_string(&metadata.creator),
        "Producer" => text_string(&metadata.producer),
        "CreationDate" => Object::string_literal(
            Utc::now().format("D:%Y%m%d%H%M%SZ").to_string(),
        ),
    };
    if let Some(title) = &metadata.title {
        info.set("Title", text_string(title));
    }
    if let Some(author) = &metadata.author {
        info.set("Author", text_string(author));
    }
    info
}

/// PDF text string: plain bytes for ASCII, UTF-16BE with a byte-order mark
/// otherwise.
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }
    let mut bytes = vec![0xFE, 0xFF];
    bytes.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
    Object::String(bytes, StringFormat::Hexadecimal)
}

// -- Hashing sink -------------------------------------------------------------

/// Passes writes through while counting and hashing what the sink accepted.
struct HashingWriter<W> {
    inner: W,
    hasher: Sha256,
    written: u64,
}

impl<W: Write> HashingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            written: 0,
        }
    }

    fn summary(self) -> WriteSummary {
        WriteSummary {
            bytes_written: self.written,
            sha256: hex::encode(self.hasher.finalize()),
        }
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use searchpress_core::{PixelFormat, Rect};

    /// Sink that accepts a few bytes, then reports a full disk.
    struct FullDisk {
        remaining: usize,
    }

    impl Write for FullDisk {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.remaining == 0 {
                return Err(std::io::Error::other("No space left on device"));
            }
            let n = buf.len().min(self.remaining);
            self.remaining -= n;
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn offline_config() -> ComposeConfig {
        let mut config = ComposeConfig::default();
        config.fonts.search_system_fonts = false;
        config
    }

    fn blank(w: u32, h: u32) -> RasterPage {
        RasterPage::new(w, h, PixelFormat::Gray8, vec![255u8; (w * h) as usize])
    }

    #[test]
    fn states_advance_through_the_lifecycle() {
        let mut doc = Document::new(&offline_config()).unwrap();
        assert_eq!(doc.state(), DocumentState::Empty);

        let words = [RecognizedWord::new("Alpha", Rect::new(10.0, 10.0, 60.0, 30.0), 0.9)];
        let report = doc.append_page(&blank(100, 150), Some(&words), None).unwrap();
        assert_eq!(report.words_placed, 1);
        assert_eq!(doc.state(), DocumentState::Accumulating);

        let mut out = Vec::new();
        let summary = doc.finalize(&mut out).unwrap();
        assert_eq!(doc.state(), DocumentState::Written);
        assert_eq!(summary.bytes_written, out.len() as u64);
        assert_eq!(summary.sha256, hex::encode(Sha256::digest(&out)));
        assert!(out.starts_with(b"%PDF-1.5"));
    }

    #[test]
    fn written_document_rejects_further_calls() {
        let mut doc = Document::new(&offline_config()).unwrap();
        doc.append_page(&blank(10, 10), None, None).unwrap();
        doc.finalize(Vec::new()).unwrap();

        assert!(matches!(
            doc.append_page(&blank(10, 10), None, None),
            Err(DocumentError::InvalidState { state: "written" })
        ));
        assert!(matches!(
            doc.finalize(Vec::new()),
            Err(DocumentError::InvalidState { state: "written" })
        ));
    }

    #[test]
    fn failing_sink_leaves_document_failed() {
        let mut doc = Document::new(&offline_config()).unwrap();
        doc.append_page(&blank(50, 50), None, None).unwrap();

        let err = doc.finalize(FullDisk { remaining: 64 }).unwrap_err();
        assert!(matches!(err, DocumentError::EncodingFailure(_)));
        assert!(err.is_retryable());
        assert_eq!(doc.state(), DocumentState::Failed);
        assert!(matches!(
            doc.finalize(Vec::new()),
            Err(DocumentError::InvalidState { state: "failed" })
        ));
    }

    #[test]
    fn bad_page_fails_the_document() {
        let mut doc = Document::new(&offline_config()).unwrap();
        let short = RasterPage::new(10, 10, PixelFormat::Gray8, vec![0u8; 3]);
        assert!(doc.append_page(&short, None, None).is_err());
        assert_eq!(doc.state(), DocumentState::Failed);
    }

    #[test]
    fn finalize_without_pages_is_rejected() {
        let mut doc = Document::new(&offline_config()).unwrap();
        assert!(matches!(
            doc.finalize(Vec::new()),
            Err(DocumentError::InvalidGeometry(_))
        ));
        assert_eq!(doc.state(), DocumentState::Failed);
    }

    #[test]
    fn image_only_documents_never_resolve_fonts() {
        let mut config = offline_config().image_only();
        config.fonts.allow_standard_fallback = false;
        let mut doc = Document::new(&config).unwrap();
        let words = [RecognizedWord::new("ignored", Rect::new(1.0, 1.0, 5.0, 5.0), 1.0)];
        let report = doc.append_page(&blank(20, 20), Some(&words), None).unwrap();
        assert_eq!(report.words_placed, 0);
        doc.finalize(Vec::new()).unwrap();
    }

    #[test]
    fn text_strings_use_utf16_for_non_ascii() {
        assert!(matches!(text_string("Scan"), Object::String(ref b, _) if b == b"Scan"));
        match text_string("Straße") {
            Object::String(bytes, StringFormat::Hexadecimal) => assert_eq!(&bytes[..2], &[0xFE, 0xFF]),
            other => panic!("unexpected {other:?}"),
        }
    }
}
