// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Tolerant extraction of detection JSON from model response text
//!
//! Vision-language models wrap their JSON payload inconsistently: a fenced
//! ```` ```json ```` block, a fence sharing a line with the payload, a bare
//! array, or prose with an embedded array. Extraction tries these shapes in
//! a fixed precedence order; decoding failures yield an empty detection
//! list rather than an error so malformed model output never takes the
//! caller down.

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::detection::{BoxGeometry, Detection, DetectionMode, OrientedBox};

/// Geometry key names accepted for 2D detections, in lookup order
const KEYS_2D: [&str; 3] = ["bbox_2d", "bbox", "bounding_box"];

/// Geometry key name for 3D detections
const KEY_3D: &str = "bbox_3d";

/// Parser for detection payloads embedded in model response text
pub struct ResponseParser {
    fence_exact: Regex,
    fence_inline: Regex,
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseParser {
    /// Create a parser with the fence patterns precompiled
    pub fn new() -> Self {
        Self {
            fence_exact: Regex::new(r"^```json$").unwrap(),
            fence_inline: Regex::new(r"^```.*json").unwrap(),
        }
    }

    /// Extract the JSON-shaped substring from response text
    ///
    /// Precedence, first match wins:
    /// 1. A line that is exactly ```` ```json ```` opens a fence; the
    ///    payload runs until the next fence marker.
    /// 2. A fence marker and `json` on one line: the line's trailing
    ///    segment plus subsequent lines, truncated at the next marker.
    /// 3. Text already delimited by `[...]` or `{...}`, used verbatim.
    /// 4. The outermost bracket-matched substring, array brackets first.
    /// 5. The empty string, signalling "no JSON found".
    pub fn extract_json(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let lines: Vec<&str> = text.lines().collect();
        for (i, line) in lines.iter().enumerate() {
            let trimmed = line.trim();

            if self.fence_exact.is_match(trimmed) {
                let rest = lines[i + 1..].join("\n");
                return truncate_at_fence(&rest).trim().to_string();
            }

            if self.fence_inline.is_match(trimmed) {
                let after = trimmed.splitn(2, "```").nth(1).unwrap_or("").trim_start();
                let head = after.strip_prefix("json").unwrap_or(after).trim();
                let rest = lines[i + 1..].join("\n");
                let combined = format!("{head}\n{rest}");
                return truncate_at_fence(&combined).trim().to_string();
            }
        }

        let trimmed = text.trim();
        if (trimmed.starts_with('[') && trimmed.ends_with(']'))
            || (trimmed.starts_with('{') && trimmed.ends_with('}'))
        {
            return trimmed.to_string();
        }

        if let Some(slice) = bracket_slice(trimmed, '[', ']') {
            return slice.to_string();
        }
        if let Some(slice) = bracket_slice(trimmed, '{', '}') {
            return slice.to_string();
        }

        debug!("No JSON payload found in response text");
        String::new()
    }

    /// Parse response text into canonical detection records
    ///
    /// # Arguments
    /// - `text`: Raw model response, fenced or bare
    /// - `mode`: Which geometry keys and arity to accept
    ///
    /// # Returns
    /// - `Vec<Detection>`: Zero or more records; extraction and decode
    ///   failures are logged and produce an empty list, never an error
    pub fn parse_detections(&self, text: &str, mode: DetectionMode) -> Vec<Detection> {
        let json_str = self.extract_json(text);
        if json_str.is_empty() {
            return Vec::new();
        }

        let value: Value = match serde_json::from_str(&json_str) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to decode detection JSON: {}", e);
                return Vec::new();
            }
        };

        // A single top-level object is one detection; anything that is
        // neither array nor object carries no geometry.
        let elements = match value {
            Value::Array(items) => items,
            object @ Value::Object(_) => vec![object],
            _ => {
                warn!("Top-level JSON value is neither array nor object");
                return Vec::new();
            }
        };

        let mut detections = Vec::with_capacity(elements.len());
        for element in &elements {
            if let Some(detection) = normalize_element(element, mode) {
                detections.push(detection);
            }
        }

        debug!(
            "Parsed {} detection(s) from {} element(s)",
            detections.len(),
            elements.len()
        );

        detections
    }
}

/// Everything before the next fence marker
fn truncate_at_fence(text: &str) -> &str {
    text.split("```").next().unwrap_or("")
}

/// Substring from the first `open` to the last `close`, if they nest
fn bracket_slice(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

/// Normalize one decoded element into a canonical record
fn normalize_element(element: &Value, mode: DetectionMode) -> Option<Detection> {
    match element {
        Value::Object(map) => {
            let (geometry_value, default_label) = match mode {
                DetectionMode::Bbox2d => {
                    (KEYS_2D.iter().find_map(|key| map.get(*key)), "unknown")
                }
                DetectionMode::Bbox3d => (map.get(KEY_3D), "object"),
            };

            let Some(geometry_value) = geometry_value else {
                warn!("Detection object carries no recognized geometry key");
                return None;
            };

            let geometry = geometry_from_value(geometry_value, mode)?;
            let label = map
                .get("label")
                .and_then(Value::as_str)
                .unwrap_or(default_label)
                .to_string();
            let score = map.get("score").and_then(Value::as_f64).unwrap_or(1.0) as f32;

            Some(Detection {
                geometry,
                label,
                score,
            })
        }
        // A bare array element is the geometry itself
        Value::Array(_) => {
            let geometry = geometry_from_value(element, mode)?;
            Some(Detection {
                geometry,
                label: "object".to_string(),
                score: 1.0,
            })
        }
        other => {
            warn!("Skipping non-object detection element: {}", other);
            None
        }
    }
}

/// Decode a geometry value with the arity the mode demands
fn geometry_from_value(value: &Value, mode: DetectionMode) -> Option<BoxGeometry> {
    let numbers = numeric_array(value)?;

    match mode {
        DetectionMode::Bbox2d => {
            if numbers.len() != 4 {
                warn!("Expected 4 bbox values, got {}", numbers.len());
                return None;
            }
            Some(BoxGeometry::Rect([
                numbers[0], numbers[1], numbers[2], numbers[3],
            ]))
        }
        DetectionMode::Bbox3d => {
            if numbers.len() != 9 {
                warn!("Expected 9 bbox_3d values, got {}", numbers.len());
                return None;
            }
            let mut values = [0.0; 9];
            values.copy_from_slice(&numbers);
            Some(BoxGeometry::Oriented(OrientedBox::from_array(&values)))
        }
    }
}

/// All-numeric JSON array as `f64`s, or `None`
fn numeric_array(value: &Value) -> Option<Vec<f64>> {
    let items = value.as_array()?;
    let mut numbers = Vec::with_capacity(items.len());
    for item in items {
        match item.as_f64() {
            Some(number) => numbers.push(number),
            None => {
                warn!("Geometry array holds a non-numeric value: {}", item);
                return None;
            }
        }
    }
    Some(numbers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parser() -> ResponseParser {
        ResponseParser::new()
    }

    // --- extract_json ---

    #[test]
    fn test_extract_fenced_block() {
        let text = "Here are the boxes:\n```json\n[{\"bbox_2d\": [1, 2, 3, 4]}]\n```\nDone.";
        assert_eq!(
            parser().extract_json(text),
            "[{\"bbox_2d\": [1, 2, 3, 4]}]"
        );
    }

    #[test]
    fn test_extract_first_fenced_block_wins() {
        let text = "```json\n[1]\n```\ntrailing\n```json\n[2]\n```";
        assert_eq!(parser().extract_json(text), "[1]");
    }

    #[test]
    fn test_extract_fence_without_closing_marker() {
        let text = "```json\n[1, 2, 3]";
        assert_eq!(parser().extract_json(text), "[1, 2, 3]");
    }

    #[test]
    fn test_extract_inline_fence() {
        let text = "```json [1, 2,\n3, 4]\n```";
        assert_eq!(parser().extract_json(text), "[1, 2,\n3, 4]");
    }

    #[test]
    fn test_extract_bare_array_verbatim() {
        let text = "  [{\"label\": \"cat\"}]  ";
        assert_eq!(parser().extract_json(text), "[{\"label\": \"cat\"}]");
    }

    #[test]
    fn test_extract_bare_object_verbatim() {
        let text = "{\"label\": \"cat\"}";
        assert_eq!(parser().extract_json(text), "{\"label\": \"cat\"}");
    }

    #[test]
    fn test_extract_embedded_array_from_prose() {
        let text = "Sure! The detections are [1, 2, 3] as requested.";
        assert_eq!(parser().extract_json(text), "[1, 2, 3]");
    }

    #[test]
    fn test_extract_prefers_array_over_object() {
        let text = "note {\"k\": [1, 2]} end";
        assert_eq!(parser().extract_json(text), "[1, 2]");
    }

    #[test]
    fn test_extract_embedded_object_from_prose() {
        let text = "The result is {\"label\": \"dog\"} hope that helps";
        assert_eq!(parser().extract_json(text), "{\"label\": \"dog\"}");
    }

    #[test]
    fn test_extract_no_json_yields_empty() {
        assert_eq!(parser().extract_json("no structured data here"), "");
        assert_eq!(parser().extract_json(""), "");
    }

    // --- parse_detections ---

    #[test]
    fn test_parse_empty_on_garbage() {
        let detections = parser().parse_detections("nothing here", DetectionMode::Bbox2d);
        assert!(detections.is_empty());
    }

    #[test]
    fn test_parse_empty_on_invalid_json() {
        let detections =
            parser().parse_detections("```json\n[{not json}]\n```", DetectionMode::Bbox2d);
        assert!(detections.is_empty());
    }

    #[test]
    fn test_parse_empty_on_scalar_top_level() {
        let detections = parser().parse_detections("```json\n42\n```", DetectionMode::Bbox2d);
        assert!(detections.is_empty());
    }

    #[test]
    fn test_parse_single_object_as_one_record() {
        let text = "{\"bbox_2d\": [10, 20, 30, 40], \"label\": \"cup\"}";
        let detections = parser().parse_detections(text, DetectionMode::Bbox2d);
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].label, "cup");
        assert_eq!(
            detections[0].geometry,
            BoxGeometry::Rect([10.0, 20.0, 30.0, 40.0])
        );
    }

    #[test]
    fn test_parse_accepts_alternate_2d_keys() {
        for key in ["bbox_2d", "bbox", "bounding_box"] {
            let text = format!("[{{\"{key}\": [1, 2, 3, 4], \"label\": \"box\"}}]");
            let detections = parser().parse_detections(&text, DetectionMode::Bbox2d);
            assert_eq!(detections.len(), 1, "key {key} not accepted");
        }
    }

    #[test]
    fn test_parse_defaults_label_and_score() {
        let text = "[{\"bbox_2d\": [1, 2, 3, 4]}]";
        let detections = parser().parse_detections(text, DetectionMode::Bbox2d);
        assert_eq!(detections[0].label, "unknown");
        assert_eq!(detections[0].score, 1.0);
    }

    #[test]
    fn test_parse_preserves_score() {
        let text = "[{\"bbox_2d\": [1, 2, 3, 4], \"label\": \"cat\", \"score\": 0.87}]";
        let detections = parser().parse_detections(text, DetectionMode::Bbox2d);
        assert!((detections[0].score - 0.87).abs() < 1e-6);
    }

    #[test]
    fn test_parse_bare_array_element_as_geometry() {
        let text = "[[100, 100, 900, 900]]";
        let detections = parser().parse_detections(text, DetectionMode::Bbox2d);
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].label, "object");
        assert_eq!(
            detections[0].geometry,
            BoxGeometry::Rect([100.0, 100.0, 900.0, 900.0])
        );
    }

    #[test]
    fn test_parse_skips_wrong_arity() {
        let text = "[{\"bbox_2d\": [1, 2, 3]}, {\"bbox_2d\": [1, 2, 3, 4]}]";
        let detections = parser().parse_detections(text, DetectionMode::Bbox2d);
        assert_eq!(detections.len(), 1);
    }

    #[test]
    fn test_parse_skips_non_numeric_geometry() {
        let text = "[{\"bbox_2d\": [1, \"two\", 3, 4]}]";
        let detections = parser().parse_detections(text, DetectionMode::Bbox2d);
        assert!(detections.is_empty());
    }

    #[test]
    fn test_parse_3d_object() {
        let text = "```json\n[{\"bbox_3d\": [0, 0, 10, 2, 2, 2, 0, 90, 0], \"label\": \"chair\"}]\n```";
        let detections = parser().parse_detections(text, DetectionMode::Bbox3d);
        assert_eq!(detections.len(), 1);
        match &detections[0].geometry {
            BoxGeometry::Oriented(bbox) => {
                assert_eq!(bbox.center, [0.0, 0.0, 10.0]);
                assert_eq!(bbox.size, [2.0, 2.0, 2.0]);
                assert_eq!(bbox.yaw_deg, 90.0);
            }
            other => panic!("expected oriented box, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_3d_bare_array() {
        let text = "[[1, 2, 3, 4, 5, 6, 7, 8, 9]]";
        let detections = parser().parse_detections(text, DetectionMode::Bbox3d);
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].label, "object");
    }

    #[test]
    fn test_parse_3d_skips_wrong_arity() {
        let text = "[{\"bbox_3d\": [1, 2, 3, 4, 5, 6, 7, 8]}]";
        let detections = parser().parse_detections(text, DetectionMode::Bbox3d);
        assert!(detections.is_empty());
    }

    #[test]
    fn test_round_trip_preserves_records() {
        let original = json!([
            {"bbox_2d": [100, 150, 300, 400], "label": "mug", "score": 0.95},
            {"bbox_2d": [10, 20, 30, 40], "label": "pen"},
            {"bbox_2d": [0, 0, 1000, 1000], "label": "table", "score": 0.5},
        ]);
        let text = format!("```json\n{original}\n```");

        let detections = parser().parse_detections(&text, DetectionMode::Bbox2d);
        assert_eq!(detections.len(), 3);
        assert_eq!(detections[0].label, "mug");
        assert_eq!(
            detections[0].geometry,
            BoxGeometry::Rect([100.0, 150.0, 300.0, 400.0])
        );
        assert_eq!(detections[1].label, "pen");
        assert_eq!(detections[1].score, 1.0);
        assert_eq!(detections[2].label, "table");
        assert!((detections[2].score - 0.5).abs() < 1e-6);
    }
}
