// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — assembling pages, writing documents, and reading them back.

pub mod page;
pub mod reader;
pub mod writer;

pub use page::{FontObjectIds, PageAssembler};
pub use reader::{PageBoxes, PdfInspector};
pub use writer::{Document, DocumentState, PageReport, WriteSummary};
