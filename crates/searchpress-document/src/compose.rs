// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Compose — one call from page images and OCR words to a finished
// searchable document.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use searchpress_core::error::{DocumentError, Result};
use searchpress_core::{ComposeConfig, DocumentId, PageSize, RasterPage, RecognizedWord, TransformDescriptor};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::pdf::{Document, PageReport};

/// One page to compose: the image plus, optionally, what OCR found on it.
#[derive(Debug, Clone)]
pub struct PageInput {
    pub raster: RasterPage,
    /// `None` or empty gives an image-only page.
    pub words: Option<Vec<RecognizedWord>>,
    /// Maps word boxes into the raster's pixel space. `None` means the words
    /// already are in it.
    pub transform: Option<TransformDescriptor>,
}

impl PageInput {
    pub fn image_only(raster: RasterPage) -> Self {
        Self {
            raster,
            words: None,
            transform: None,
        }
    }

    pub fn with_words(raster: RasterPage, words: Vec<RecognizedWord>) -> Self {
        Self {
            raster,
            words: Some(words),
            transform: None,
        }
    }

    pub fn transformed(mut self, transform: TransformDescriptor) -> Self {
        self.transform = Some(transform);
        self
    }
}

/// What a successful compose produced.
#[derive(Debug, Clone, Serialize)]
pub struct ComposeReport {
    pub document_id: String,
    pub pages: usize,
    pub words_placed: usize,
    pub bytes_written: u64,
    pub sha256: String,
    /// Pages that had recovered problems, in page order.
    pub page_issues: Vec<PageReport>,
}

impl ComposeReport {
    /// True when every supplied word made it into the text layer.
    pub fn is_clean(&self) -> bool {
        self.page_issues.is_empty()
    }
}

/// Compose `pages` into one document of `page_size` pages and stream it to
/// `destination`.
///
/// `page_size` takes precedence over `config.page_size`. Every image is
/// checked before anything is written, so a bad page leaves the destination
/// untouched.
#[instrument(skip_all, fields(pages = pages.len(), page_size = ?page_size))]
pub fn compose_document<W: Write>(
    pages: &[PageInput],
    page_size: PageSize,
    destination: W,
    config: &ComposeConfig,
) -> Result<ComposeReport> {
    let config = ComposeConfig {
        page_size,
        ..config.clone()
    };
    validate_pages(pages)?;

    let mut document = Document::new(&config)?;
    let document_id = document.id();

    let mut words_placed = 0;
    let mut page_issues = Vec::new();
    for input in pages {
        let report = document.append_page(
            &input.raster,
            input.words.as_deref(),
            input.transform.as_ref(),
        )?;
        words_placed += report.words_placed;
        if !report.issues.is_empty() {
            for issue in &report.issues {
                warn!(page = report.index, %issue, "Page issue");
            }
            page_issues.push(report);
        }
    }

    let summary = document.finalize(destination)?;
    info!(
        %document_id,
        words_placed,
        bytes = summary.bytes_written,
        "Compose complete"
    );
    Ok(report_for(document_id, pages.len(), words_placed, summary, page_issues))
}

/// Compose into a file at `path`. A partly written file is removed when
/// composition fails.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn compose_to_path(
    pages: &[PageInput],
    page_size: PageSize,
    path: impl AsRef<Path>,
    config: &ComposeConfig,
) -> Result<ComposeReport> {
    let path = path.as_ref();
    validate_pages(pages)?;

    let file = File::create(path).map_err(|err| {
        DocumentError::EncodingFailure(format!("cannot create {}: {}", path.display(), err))
    })?;

    let result = compose_document(pages, page_size, BufWriter::new(file), config);
    if result.is_err()
        && let Err(err) = std::fs::remove_file(path)
    {
        warn!(%err, path = %path.display(), "Could not remove partial output");
    }
    result
}

fn validate_pages(pages: &[PageInput]) -> Result<()> {
    if pages.is_empty() {
        return Err(DocumentError::InvalidGeometry("no pages to compose".into()));
    }
    pages
        .iter()
        .enumerate()
        .try_for_each(|(index, input)| input.raster.validate(index))
}

fn report_for(
    id: DocumentId,
    pages: usize,
    words_placed: usize,
    summary: crate::pdf::WriteSummary,
    page_issues: Vec<PageReport>,
) -> ComposeReport {
    ComposeReport {
        document_id: id.to_string(),
        pages,
        words_placed,
        bytes_written: summary.bytes_written,
        sha256: summary.sha256,
        page_issues,
    }
}
