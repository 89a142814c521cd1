// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Error taxonomy for Searchpress.
//
// Two severities live in two types: `DocumentError` aborts the whole document,
// `PageIssue` is recovered in place and only reported.

use serde::Serialize;
use thiserror::Error;

/// Document-level failure. Any of these aborts the operation; no partial
/// document is ever reported as done.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Zero, negative, or non-finite page or image dimensions.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Neither the Unicode outline font nor the standard fallback is usable.
    #[error("no usable font: {0}")]
    FontUnavailable(String),

    /// The destination rejected a write, or the document could not be
    /// serialised into it.
    #[error("failed to write document: {0}")]
    EncodingFailure(String),

    /// The pixel buffer of a page cannot be interpreted or embedded.
    #[error("page {page}: unreadable image: {reason}")]
    UnreadableImage { page: usize, reason: String },

    /// An operation was attempted on a document in a terminal state.
    #[error("document is {state} and cannot accept this operation")]
    InvalidState { state: &'static str },

    /// Configuration values that cannot be honoured.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A produced document could not be parsed back for inspection.
    #[error("cannot inspect document: {0}")]
    Inspection(String),

    // -- Input files (configuration, OCR word dumps) --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DocumentError {
    /// Whether retrying with a fresh document and the same inputs may succeed.
    ///
    /// Only sink failures qualify; every other variant describes a defect in
    /// the inputs or the environment that a retry cannot fix.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::EncodingFailure(_))
    }
}

/// Page- or word-level anomaly. Recovered locally (word dropped, or the page
/// falls back to image-only) and surfaced in the compose report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageIssue {
    /// Degenerate or non-finite bounding box; the word was dropped.
    MalformedWord { index: usize, reason: String },

    /// The mapped box does not overlap the placed image; the word was dropped.
    WordOutsideImage { index: usize },

    /// No available font can represent the word; it was dropped.
    MissingGlyphs { index: usize },

    /// The Unicode font lacked glyphs, so the word used the standard font.
    GlyphFallback { index: usize },

    /// The whole text layer of the page was skipped; the page is image-only.
    TextLayerDropped { reason: String },
}

impl std::fmt::Display for PageIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedWord { index, reason } => {
                write!(f, "word {index} dropped: {reason}")
            }
            Self::WordOutsideImage { index } => {
                write!(f, "word {index} dropped: outside the placed image")
            }
            Self::MissingGlyphs { index } => {
                write!(f, "word {index} dropped: no font can encode it")
            }
            Self::GlyphFallback { index } => {
                write!(f, "word {index} written with the standard font")
            }
            Self::TextLayerDropped { reason } => {
                write!(f, "text layer skipped: {reason}")
            }
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocumentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_encoding_failures_are_retryable() {
        assert!(DocumentError::EncodingFailure("disk full".into()).is_retryable());
        assert!(!DocumentError::InvalidGeometry("0x0".into()).is_retryable());
        assert!(!DocumentError::FontUnavailable("none".into()).is_retryable());
        assert!(
            !DocumentError::InvalidState { state: "written" }.is_retryable()
        );
    }

    #[test]
    fn page_issue_display_names_the_word() {
        let issue = PageIssue::MalformedWord {
            index: 3,
            reason: "right <= left".into(),
        };
        assert_eq!(issue.to_string(), "word 3 dropped: right <= left");
    }

    #[test]
    fn page_issue_serializes_with_kind_tag() {
        let json = serde_json::to_string(&PageIssue::WordOutsideImage { index: 2 }).unwrap();
        assert_eq!(json, r#"{"kind":"word_outside_image","index":2}"#);
    }
}
