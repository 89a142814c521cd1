// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page assembler — one placed image plus an optional invisible text layer
// becomes one page object.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Object, ObjectId, Stream, dictionary};
use searchpress_core::error::{DocumentError, Result};
use tracing::debug;

use crate::image::EncodedImage;
use crate::layout::PagePlacement;
use crate::text::TextLayer;
use crate::text::layer::{STANDARD_FONT_RESOURCE, UNICODE_FONT_RESOURCE};

/// Resource name of the page image.
const IMAGE_RESOURCE: &str = "Im0";

/// Object ids reserved for the document's fonts.
#[derive(Debug, Clone, Copy, Default)]
pub struct FontObjectIds {
    pub unicode: Option<ObjectId>,
    pub standard: Option<ObjectId>,
}

/// Builds page objects of one fixed size.
#[derive(Debug, Clone, Copy)]
pub struct PageAssembler {
    page_w: f32,
    page_h: f32,
}

impl PageAssembler {
    pub fn new(page_w: f32, page_h: f32) -> Self {
        Self { page_w, page_h }
    }

    /// The page rectangle used for every page box.
    pub fn page_box(&self) -> Vec<Object> {
        vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(self.page_w),
            Object::Real(self.page_h),
        ]
    }

    /// Add the image, content stream, and page dictionary to `doc`. The
    /// page's `/Parent` is `pages_id`; the caller links it into `/Kids`.
    pub fn assemble(
        &self,
        doc: &mut lopdf::Document,
        pages_id: ObjectId,
        image: EncodedImage,
        placement: &PagePlacement,
        text: Option<&TextLayer>,
        fonts: FontObjectIds,
    ) -> Result<ObjectId> {
        let image_id = doc.add_object(image.stream);

        let mut operations = vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(placement.draw_w),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(placement.draw_h),
                    Object::Real(placement.offset_x),
                    Object::Real(placement.offset_y),
                ],
            ),
            Operation::new("Do", vec![Object::Name(IMAGE_RESOURCE.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ];

        let mut font_resources = Dictionary::new();
        if let Some(layer) = text.filter(|l| !l.operations.is_empty()) {
            if layer.uses_unicode_font {
                let id = fonts.unicode.ok_or_else(|| missing_font(UNICODE_FONT_RESOURCE))?;
                font_resources.set(UNICODE_FONT_RESOURCE, id);
            }
            if layer.uses_standard_font {
                let id = fonts.standard.ok_or_else(|| missing_font(STANDARD_FONT_RESOURCE))?;
                font_resources.set(STANDARD_FONT_RESOURCE, id);
            }
            operations.push(Operation::new("q", vec![]));
            operations.extend(layer.operations.iter().cloned());
            operations.push(Operation::new("Q", vec![]));
        }

        let content = Content { operations }
            .encode()
            .map_err(|err| DocumentError::EncodingFailure(format!("page content: {err}")))?;
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content));

        let mut resources = dictionary! {
            "XObject" => dictionary! { IMAGE_RESOURCE => image_id },
        };
        if !font_resources.is_empty() {
            resources.set("Font", font_resources);
        }

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => self.page_box(),
            "CropBox" => self.page_box(),
            "TrimBox" => self.page_box(),
            "Rotate" => 0,
            "Resources" => resources,
            "Contents" => content_id,
        });

        debug!(
            ?page_id,
            image_w = image.width,
            image_h = image.height,
            has_text = text.is_some_and(|l| l.words_placed > 0),
            "Page assembled"
        );
        Ok(page_id)
    }
}

fn missing_font(resource: &str) -> DocumentError {
    DocumentError::FontUnavailable(format!("text layer uses /{resource} but no font was reserved"))
}
