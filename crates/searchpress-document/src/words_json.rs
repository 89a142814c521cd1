// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR words JSON — read the recognizer's per-page word dump.
//
// The primary shape is an array of
// `{ "text", "left", "top", "right", "bottom", "confidence" }` objects, but
// dumps from different engines wrap and spell boxes differently. Parsing is
// best-effort: entries without a usable box are skipped and a document that
// isn't JSON at all yields no words.

use std::path::Path;

use searchpress_core::error::Result;
use searchpress_core::{Rect, RecognizedWord};
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

/// Keys under which a wrapping object may hold the word array.
const CONTAINER_KEYS: [&str; 5] = ["words", "data", "items", "list", "result"];

/// Parse a words dump from a string.
pub fn parse_str(json: &str) -> Vec<RecognizedWord> {
    match serde_json::from_str::<Value>(json) {
        Ok(root) => parse_value(&root),
        Err(err) => {
            warn!(%err, "Words JSON is not valid JSON, treating page as wordless");
            Vec::new()
        }
    }
}

/// Parse an already-decoded JSON value.
pub fn parse_value(root: &Value) -> Vec<RecognizedWord> {
    let Some(entries) = array_root(root) else {
        return Vec::new();
    };

    let words: Vec<RecognizedWord> = entries
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|entry| {
            let bbox = extract_rect(entry)?;
            let text = entry.get("text").and_then(Value::as_str).unwrap_or_default();
            let confidence = number(entry.get("confidence")).unwrap_or(0.0);
            Some(RecognizedWord::new(text, bbox, confidence))
        })
        .collect();

    if words.len() < entries.len() {
        debug!(
            kept = words.len(),
            skipped = entries.len() - words.len(),
            "Skipped words without a usable box"
        );
    }
    words
}

/// Read and parse a words dump from disk. Only the read can fail.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn parse_file(path: impl AsRef<Path>) -> Result<Vec<RecognizedWord>> {
    let text = std::fs::read_to_string(path.as_ref())?;
    Ok(parse_str(&text))
}

fn array_root(root: &Value) -> Option<&Vec<Value>> {
    match root {
        Value::Array(items) => Some(items),
        Value::Object(map) => CONTAINER_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array)),
        _ => None,
    }
}

/// A number, or a string holding one.
fn number(value: Option<&Value>) -> Option<f32> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64()? as f32,
        Value::String(s) => s.trim().parse::<f32>().ok()?,
        _ => return None,
    };
    parsed.is_finite().then_some(parsed)
}

fn field(map: &Map<String, Value>, keys: &[&str]) -> Option<f32> {
    keys.iter().find_map(|key| number(map.get(*key)))
}

fn ltrb(map: &Map<String, Value>, keys: [&[&str]; 4]) -> Option<Rect> {
    Some(Rect::new(
        field(map, keys[0])?,
        field(map, keys[1])?,
        field(map, keys[2])?,
        field(map, keys[3])?,
    ))
}

fn xywh(map: &Map<String, Value>) -> Option<Rect> {
    Some(Rect::from_xywh(
        field(map, &["x"])?,
        field(map, &["y"])?,
        field(map, &["w", "width"])?,
        field(map, &["h", "height"])?,
    ))
}

fn rect_from_array(items: &[Value]) -> Option<Rect> {
    let [a, b, c, d] = [
        number(items.first())?,
        number(items.get(1))?,
        number(items.get(2))?,
        number(items.get(3))?,
    ];
    if c > a && d > b {
        Some(Rect::new(a, b, c, d))
    } else {
        Some(Rect::from_xywh(a, b, c, d))
    }
}

fn extract_rect(entry: &Map<String, Value>) -> Option<Rect> {
    if let Some(rect) = ltrb(entry, [&["left"], &["top"], &["right"], &["bottom"]]) {
        return Some(rect);
    }

    match entry.get("bbox") {
        Some(Value::Object(bbox)) => {
            let nested = ltrb(
                bbox,
                [&["left", "l"], &["top", "t"], &["right", "r"], &["bottom", "b"]],
            )
            .or_else(|| xywh(bbox));
            if nested.is_some() {
                return nested;
            }
        }
        Some(Value::Array(items)) => {
            if let Some(rect) = rect_from_array(items) {
                return Some(rect);
            }
        }
        _ => {}
    }

    xywh(entry).or_else(|| ltrb(entry, [&["xmin"], &["ymin"], &["xmax"], &["ymax"]]))
}
