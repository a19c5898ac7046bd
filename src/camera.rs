// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Pinhole camera parameter sourcing
//!
//! Intrinsics come from a keyed JSON lookup when the caller has calibrated
//! values for an image, otherwise they are synthesized from the image
//! dimensions and a field-of-view angle. Synthesis never fails: any
//! internal error falls back to a fixed default so rendering can proceed.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// Default field of view in degrees when none is configured
pub const DEFAULT_FOV_DEG: f64 = 60.0;

/// Pinhole camera intrinsics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    /// Focal length along x, in pixels
    pub fx: f64,
    /// Focal length along y, in pixels
    pub fy: f64,
    /// Principal point x, in pixels
    pub cx: f64,
    /// Principal point y, in pixels
    pub cy: f64,
}

impl CameraIntrinsics {
    /// Fixed intrinsics used when both lookup and synthesis fail
    pub fn fallback() -> Self {
        Self {
            fx: 1000.0,
            fy: 1000.0,
            cx: 640.0,
            cy: 360.0,
        }
    }

    /// Focal lengths must be strictly positive
    pub fn is_valid(&self) -> bool {
        self.fx > 0.0 && self.fy > 0.0
    }

    /// Synthesize intrinsics from image dimensions and a field of view
    ///
    /// The focal length is shared between axes and derived from the mean
    /// of width and height; the principal point sits at the image center.
    /// Values are rounded to 2 decimals.
    pub fn from_image_size(width: u32, height: u32, fov_deg: f64) -> Self {
        let avg_dimension = (width as f64 + height as f64) / 2.0;
        let focal_length = round2(avg_dimension / (2.0 * (fov_deg.to_radians() / 2.0).tan()));

        Self {
            fx: focal_length,
            fy: focal_length,
            cx: round2(width as f64 / 2.0),
            cy: round2(height as f64 / 2.0),
        }
    }

    /// Synthesize intrinsics for the image at `path`
    ///
    /// Opens the image only to read its dimensions. Falls back to
    /// [`CameraIntrinsics::fallback`] when the image cannot be read, so
    /// the caller always gets usable parameters.
    pub fn for_image<P: AsRef<Path>>(path: P, fov_deg: f64) -> Self {
        match crate::image_utils::load_image(path.as_ref()) {
            Ok((_, info)) => Self::from_image_size(info.width, info.height, fov_deg),
            Err(e) => {
                warn!(
                    "Cannot synthesize camera parameters for {}: {}; using fallback",
                    path.as_ref().display(),
                    e
                );
                Self::fallback()
            }
        }
    }

    /// Override both focal lengths with calibrated values
    pub fn with_focal(mut self, fx: f64, fy: f64) -> Self {
        self.fx = fx;
        self.fy = fy;
        self
    }

    /// Override the principal point with calibrated values
    pub fn with_principal_point(mut self, cx: f64, cy: f64) -> Self {
        self.cx = cx;
        self.cy = cy;
        self
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Calibrated intrinsics keyed by image name, loaded from a JSON file
#[derive(Debug, Clone, Default)]
pub struct CameraStore {
    entries: HashMap<String, CameraIntrinsics>,
}

impl CameraStore {
    /// Load a camera-info file
    ///
    /// # Arguments
    /// - `path`: JSON file mapping image names to `{fx, fy, cx, cy}`
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is not a map of
    /// intrinsics
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .context(format!("Failed to read camera info file {}", path.display()))?;

        let entries: HashMap<String, CameraIntrinsics> = serde_json::from_str(&raw)
            .context(format!("Failed to parse camera info file {}", path.display()))?;

        debug!(
            "Loaded {} camera entr{} from {}",
            entries.len(),
            if entries.len() == 1 { "y" } else { "ies" },
            path.display()
        );

        Ok(Self { entries })
    }

    /// Calibrated intrinsics for `image_name`, if the store has them
    pub fn lookup(&self, image_name: &str) -> Option<CameraIntrinsics> {
        self.entries.get(image_name).copied()
    }

    /// Number of calibrated entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolve intrinsics for one render call
///
/// Precedence: calibrated store entry, then synthesis from the image on
/// disk, with the fixed fallback underneath synthesis. Never fails.
pub fn resolve_intrinsics(
    store: Option<&CameraStore>,
    image_name: &str,
    image_path: &Path,
    fov_deg: f64,
) -> CameraIntrinsics {
    if let Some(cam) = store.and_then(|s| s.lookup(image_name)) {
        debug!("Using calibrated camera parameters for {}", image_name);
        return cam;
    }
    CameraIntrinsics::for_image(image_path, fov_deg)
}
