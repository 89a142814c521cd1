// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Searchpress — core types, configuration, and error definitions shared by
// the document engine and its callers.

pub mod config;
pub mod error;
pub mod human_errors;
pub mod types;

pub use config::{ComposeConfig, FontConfig, MetadataConfig, TextLayerConfig};
pub use error::{DocumentError, PageIssue, Result};
pub use types::*;
