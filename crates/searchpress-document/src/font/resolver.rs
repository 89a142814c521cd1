// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Font resolver — walk the candidate chain and settle on the fonts one
// document will use.

use std::path::Path;
use std::sync::Arc;

use searchpress_core::FontConfig;
use searchpress_core::error::{DocumentError, Result};
use tracing::{debug, info, instrument, warn};

use super::{FontHandle, FontKind};

/// Well-known locations of Unicode sans-serif TrueType fonts.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/google-noto/NotoSans-Regular.ttf",
    "/system/fonts/NotoSans-Regular.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial Unicode.ttf",
    "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// DejaVu Sans, compiled into the crate.
pub static BUNDLED_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");
const BUNDLED_FONT_NAME: &str = "bundled DejaVu Sans";

/// Fonts available to one document.
#[derive(Debug, Clone)]
pub struct ResolvedFonts {
    /// Embeddable Unicode outline font, if any candidate loaded.
    pub unicode: Option<FontHandle>,
    /// Standard single-byte font, unless disabled by configuration.
    pub standard: Option<FontHandle>,
}

impl ResolvedFonts {
    /// Font tried first for every word.
    pub fn primary(&self) -> Option<&FontHandle> {
        self.unicode.as_ref().or(self.standard.as_ref())
    }
}

/// Resolves fonts for one document. Nothing is cached between resolvers.
#[derive(Debug, Clone, Default)]
pub struct FontResolver {
    config: FontConfig,
    caller_fonts: Vec<(String, Arc<[u8]>)>,
}

impl FontResolver {
    pub fn new(config: FontConfig) -> Self {
        Self {
            config,
            caller_fonts: Vec::new(),
        }
    }

    /// Offer an in-memory font program, tried before any file on disk.
    pub fn with_font_bytes(mut self, name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        self.caller_fonts.push((name.into(), bytes.into()));
        self
    }

    /// Load the first usable Unicode font and the standard fallback.
    ///
    /// Order: bytes given to [`with_font_bytes`](Self::with_font_bytes),
    /// configured paths, the font compiled into the crate, then system
    /// locations. Fails with `FontUnavailable` only when nothing is usable.
    #[instrument(skip(self), fields(caller_fonts = self.caller_fonts.len()))]
    pub fn resolve(&self) -> Result<ResolvedFonts> {
        let fonts = ResolvedFonts {
            unicode: self.resolve_unicode(),
            standard: self
                .config
                .allow_standard_fallback
                .then(FontHandle::standard),
        };

        match fonts.primary() {
            Some(font) if font.kind() == FontKind::Embedded => {
                info!(font = font.name(), "Using embedded Unicode font")
            }
            Some(_) => warn!("No Unicode font loaded; text layer limited to WinAnsi"),
            None => {
                return Err(DocumentError::FontUnavailable(
                    "no Unicode font could be loaded and the standard fallback is disabled"
                        .into(),
                ));
            }
        }
        Ok(fonts)
    }

    fn resolve_unicode(&self) -> Option<FontHandle> {
        for (name, bytes) in &self.caller_fonts {
            match FontHandle::from_truetype(name, bytes.clone()) {
                Ok(font) => return Some(font),
                Err(reason) => warn!(%reason, "Caller font rejected"),
            }
        }

        for path in &self.config.candidates {
            if let Some(font) = load_candidate(path) {
                return Some(font);
            }
        }

        if self.config.bundled_font {
            match FontHandle::from_truetype(BUNDLED_FONT_NAME, Arc::from(BUNDLED_FONT)) {
                Ok(font) => return Some(font),
                Err(reason) => warn!(%reason, "Bundled font rejected"),
            }
        }

        if self.config.search_system_fonts {
            return SYSTEM_FONT_CANDIDATES
                .iter()
                .find_map(|path| load_candidate(Path::new(path)));
        }
        None
    }
}

fn load_candidate(path: &Path) -> Option<FontHandle> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(err) => {
            debug!(path = %path.display(), %err, "Font candidate not readable");
            return None;
        }
    };
    match FontHandle::from_truetype(&path.display().to_string(), Arc::from(data)) {
        Ok(font) => {
            debug!(path = %path.display(), font = font.name(), "Font candidate accepted");
            Some(font)
        }
        Err(reason) => {
            warn!(%reason, "Font candidate rejected");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn no_system() -> FontConfig {
        FontConfig {
            candidates: Vec::new(),
            bundled_font: false,
            search_system_fonts: false,
            allow_standard_fallback: true,
        }
    }

    #[test]
    fn falls_back_to_standard_when_nothing_loads() {
        let fonts = FontResolver::new(no_system())
            .with_font_bytes("broken", vec![0u8; 64])
            .resolve()
            .unwrap();
        assert!(fonts.unicode.is_none());
        assert_eq!(fonts.primary().map(FontHandle::kind), Some(FontKind::Standard));
    }

    #[test]
    fn unavailable_when_fallback_disabled() {
        let config = FontConfig {
            allow_standard_fallback: false,
            ..no_system()
        };
        let err = FontResolver::new(config).resolve().unwrap_err();
        assert!(matches!(err, DocumentError::FontUnavailable(_)));
    }

    #[test]
    fn missing_configured_path_is_skipped() {
        let config = FontConfig {
            candidates: vec![PathBuf::from("/nonexistent/font.ttf")],
            ..no_system()
        };
        let fonts = FontResolver::new(config).resolve().unwrap();
        assert!(fonts.unicode.is_none());
        assert!(fonts.standard.is_some());
    }

    #[test]
    fn bundled_font_is_used_without_any_path() {
        let config = FontConfig {
            bundled_font: true,
            ..no_system()
        };
        let fonts = FontResolver::new(config).resolve().unwrap();
        let primary = fonts.primary().unwrap();
        assert_eq!(primary.kind(), FontKind::Embedded);
        assert!(primary.name().starts_with("DejaVuSans"));
        assert!(primary.covers("Ωmega"));
        assert!(fonts.standard.is_some());
    }

    #[test]
    fn configured_paths_and_caller_bytes_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("copy.ttf");
        std::fs::write(&path, BUNDLED_FONT).unwrap();
        let config = FontConfig {
            candidates: vec![PathBuf::from("/nonexistent/font.ttf"), path],
            bundled_font: true,
            ..no_system()
        };
        let fonts = FontResolver::new(config).resolve().unwrap();
        let unicode = fonts.unicode.unwrap();
        assert_eq!(unicode.kind(), FontKind::Embedded);

        let caller = FontResolver::new(no_system())
            .with_font_bytes("caller", BUNDLED_FONT.to_vec())
            .resolve()
            .unwrap();
        assert_eq!(caller.primary().map(FontHandle::kind), Some(FontKind::Embedded));
    }
}
