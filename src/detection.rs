// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Canonical detection records parsed from model responses
//!
//! The model reports geometry under several key names and in two shapes
//! (axis-aligned 2D rectangles and oriented 3D boxes). Normalization into
//! these types happens exactly once, at ingestion; the renderers never
//! re-inspect raw JSON shapes.

use serde::{Deserialize, Serialize};

/// Which geometry payload the producing prompt asked the model for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionMode {
    /// 2D rectangles on the 1000-scale virtual canvas (`bbox_2d` et al.)
    Bbox2d,
    /// Oriented 3D boxes in camera space (`bbox_3d`)
    Bbox3d,
}

/// An oriented 3D box: center, per-axis extents and Euler angles
///
/// Angles are kept in degrees as received from the model; conversion to
/// radians happens at projection time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrientedBox {
    /// Box center `(x, y, z)` in camera space
    pub center: [f64; 3],
    /// Full extents along each local axis
    pub size: [f64; 3],
    /// Rotation about the lateral (X) axis, degrees
    pub pitch_deg: f64,
    /// Rotation about the vertical (Y) axis, degrees
    pub yaw_deg: f64,
    /// Rotation about the depth (Z) axis, degrees
    pub roll_deg: f64,
}

impl OrientedBox {
    /// Build from the wire layout `[xc, yc, zc, sx, sy, sz, pitch, yaw, roll]`
    pub fn from_array(values: &[f64; 9]) -> Self {
        Self {
            center: [values[0], values[1], values[2]],
            size: [values[3], values[4], values[5]],
            pitch_deg: values[6],
            yaw_deg: values[7],
            roll_deg: values[8],
        }
    }
}

/// Geometry payload of one detection
#[derive(Debug, Clone, PartialEq)]
pub enum BoxGeometry {
    /// `(x1, y1, x2, y2)` on the 1000-scale virtual canvas
    Rect([f64; 4]),
    /// Center/extents/Euler-angle box in camera space
    Oriented(OrientedBox),
}

/// One detected object, immutable once parsed
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Normalized geometry payload
    pub geometry: BoxGeometry,
    /// Display label; `"unknown"` or `"object"` when the model omits one
    pub label: String,
    /// Confidence in `[0, 1]`; `1.0` when the model omits one
    pub score: f32,
}

impl Detection {
    /// A 2D rectangle detection
    pub fn rect(coords: [f64; 4], label: impl Into<String>, score: f32) -> Self {
        Self {
            geometry: BoxGeometry::Rect(coords),
            label: label.into(),
            score,
        }
    }

    /// An oriented 3D box detection
    pub fn oriented(bbox: OrientedBox, label: impl Into<String>, score: f32) -> Self {
        Self {
            geometry: BoxGeometry::Oriented(bbox),
            label: label.into(),
            score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oriented_box_from_array() {
        let bbox = OrientedBox::from_array(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 10.0, 20.0, 30.0]);
        assert_eq!(bbox.center, [1.0, 2.0, 3.0]);
        assert_eq!(bbox.size, [4.0, 5.0, 6.0]);
        assert_eq!(bbox.pitch_deg, 10.0);
        assert_eq!(bbox.yaw_deg, 20.0);
        assert_eq!(bbox.roll_deg, 30.0);
    }

    #[test]
    fn test_detection_constructors() {
        let rect = Detection::rect([0.0, 0.0, 10.0, 10.0], "cat", 0.9);
        assert_eq!(rect.label, "cat");
        assert!(matches!(rect.geometry, BoxGeometry::Rect(_)));

        let bbox = OrientedBox::from_array(&[0.0; 9]);
        let oriented = Detection::oriented(bbox, "chair", 1.0);
        assert!(matches!(oriented.geometry, BoxGeometry::Oriented(_)));
    }
}
