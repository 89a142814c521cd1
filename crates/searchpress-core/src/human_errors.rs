// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for people exporting scans.
//
// Every technical error is mapped to plain English with a clear suggestion.
// The severity drives how the calling app presents it.

use crate::error::DocumentError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Storage hiccup; exporting again may work.
    Transient,
    /// The user must change something (free space, pick another folder).
    ActionRequired,
    /// The input itself is unusable; retrying will not help.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether exporting again with the same pages may succeed.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `DocumentError` into a `HumanError`.
pub fn humanize_error(err: &DocumentError) -> HumanError {
    match err {
        DocumentError::InvalidGeometry(_) => HumanError {
            message: "One of the pages has no picture in it.".into(),
            suggestion: "Scan the empty page again, or remove it before exporting.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        DocumentError::FontUnavailable(_) => HumanError {
            message: "We couldn't prepare the searchable text.".into(),
            suggestion: "Export without searchable text, or reinstall the app to restore its fonts.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        DocumentError::EncodingFailure(detail) => humanize_write_failure(detail),

        DocumentError::UnreadableImage { page, .. } => HumanError {
            message: format!("Page {} couldn't be read.", page + 1),
            suggestion: "Scan that page again, then export.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        DocumentError::InvalidState { .. } => HumanError {
            message: "This export has already finished.".into(),
            suggestion: "Start a new export to try again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        DocumentError::Config(detail) => HumanError {
            message: "The export settings don't fit together.".into(),
            suggestion: format!("Check the export settings and try again. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        DocumentError::Inspection(_) => HumanError {
            message: "The saved document looks damaged.".into(),
            suggestion: "Export the pages again to replace it.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        DocumentError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "A file needed for the export couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Try scanning again.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading a file.".into(),
                    suggestion: "Try again. If this keeps happening, restart the app.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }

        DocumentError::Serialization(_) => HumanError {
            message: "The recognised text for a page is damaged.".into(),
            suggestion: "Run text recognition on the page again.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
    }
}

/// Sink failures carry the `io::Error` text; pick out the common causes.
fn humanize_write_failure(detail: &str) -> HumanError {
    let lower = detail.to_ascii_lowercase();

    if lower.contains("no space") || lower.contains("storage full") || lower.contains("quota") {
        HumanError {
            message: "Your device is out of storage.".into(),
            suggestion: "Free up some space, then export again.".into(),
            retriable: true,
            severity: Severity::ActionRequired,
        }
    } else if lower.contains("permission denied") || lower.contains("read-only") {
        HumanError {
            message: "We aren't allowed to save the document there.".into(),
            suggestion: "Choose a different folder and export again.".into(),
            retriable: true,
            severity: Severity::ActionRequired,
        }
    } else {
        HumanError {
            message: "The document couldn't be saved.".into(),
            suggestion: format!("Try exporting again. (Detail: {detail})"),
            retriable: true,
            severity: Severity::Transient,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_disk_is_action_required_and_retriable() {
        let err = DocumentError::EncodingFailure("No space left on device (os error 28)".into());
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(human.retriable);
    }

    #[test]
    fn permission_denied_suggests_another_folder() {
        let err = DocumentError::EncodingFailure("Permission denied (os error 13)".into());
        assert!(humanize_error(&err).suggestion.contains("different folder"));
    }

    #[test]
    fn unreadable_image_names_the_page_one_based() {
        let err = DocumentError::UnreadableImage {
            page: 2,
            reason: "short buffer".into(),
        };
        let human = humanize_error(&err);
        assert_eq!(human.message, "Page 3 couldn't be read.");
        assert_eq!(human.severity, Severity::Permanent);
    }

    #[test]
    fn retriable_matches_error_retryability_for_sink_failures() {
        let err = DocumentError::EncodingFailure("broken pipe".into());
        assert_eq!(humanize_error(&err).retriable, err.is_retryable());
    }

    #[test]
    fn geometry_is_permanent() {
        let human = humanize_error(&DocumentError::InvalidGeometry("0x0".into()));
        assert!(!human.retriable);
    }
}
