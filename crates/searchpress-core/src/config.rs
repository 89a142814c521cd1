// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Composition settings.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DocumentError, Result};
use crate::types::{PageSize, QualityPreset};

/// Settings for one document composition.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeConfig {
    /// Size of every page in the output.
    pub page_size: PageSize,
    /// Embedded image density and compression.
    pub quality: QualityPreset,
    pub text_layer: TextLayerConfig,
    pub fonts: FontConfig,
    pub metadata: MetadataConfig,
}

/// Invisible text layer behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextLayerConfig {
    /// `false` produces image-only pages and skips font resolution entirely.
    pub enabled: bool,
    /// Place baselines from the resolved font's ascent/descent instead of the
    /// fixed box-height heuristic.
    pub prefer_font_metrics: bool,
    /// Stretch each invisible run horizontally so it spans the word's box.
    pub fit_width: bool,
}

impl Default for TextLayerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            prefer_font_metrics: true,
            fit_width: true,
        }
    }
}

/// Where to look for the Unicode outline font.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    /// Font files tried in order before the bundled font.
    pub candidates: Vec<PathBuf>,
    /// Try the Unicode font compiled into the document crate.
    pub bundled_font: bool,
    /// Also try well-known system font locations.
    pub search_system_fonts: bool,
    /// Fall back to the standard single-byte font when no outline font loads.
    pub allow_standard_fallback: bool,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            candidates: Vec::new(),
            bundled_font: true,
            search_system_fonts: true,
            allow_standard_fallback: true,
        }
    }
}

/// Document information dictionary entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub title: Option<String>,
    pub author: Option<String>,
    pub creator: String,
    pub producer: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            title: None,
            author: None,
            creator: "Searchpress".into(),
            producer: concat!("searchpress ", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl ComposeConfig {
    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Same configuration with image-only output.
    pub fn image_only(mut self) -> Self {
        self.text_layer.enabled = false;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let (w, h) = self.page_size.dimensions_pt();
        if !(w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0) {
            return Err(DocumentError::InvalidGeometry(format!(
                "page size {w}x{h} pt"
            )));
        }
        if self.text_layer.enabled
            && !self.fonts.allow_standard_fallback
            && self.fonts.candidates.is_empty()
            && !self.fonts.bundled_font
            && !self.fonts.search_system_fonts
        {
            return Err(DocumentError::Config(
                "text layer enabled but every font source is disabled".into(),
            ));
        }
        Ok(())
    }
}
