// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Projected 3D wireframe overlay rendering

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use std::path::Path;
use tracing::{debug, warn};

use crate::camera::CameraIntrinsics;
use crate::detection::{BoxGeometry, Detection};
use crate::image_utils::{self, ImageError};
use crate::projection::{project_box, ProjectedBox};
use crate::render::color::seeded_color;
use crate::render::figure::Figure;
use crate::render::text::{draw_label, LabelFont};

/// Wireframe stroke width in pixels
const STROKE_WIDTH: i32 = 2;

/// Label anchor offset above corner 0, in pixels
const LABEL_RAISE: i32 = 10;

/// Renders oriented-box detections as projected wireframes
pub struct Renderer3d {
    font: Option<LabelFont>,
    color_seed: u64,
}

impl Default for Renderer3d {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer3d {
    /// Create a renderer, discovering a label font from the environment
    pub fn new() -> Self {
        Self {
            font: LabelFont::discover(),
            color_seed: 0,
        }
    }

    /// Use a caller-supplied label font
    pub fn with_font(mut self, font: LabelFont) -> Self {
        self.font = Some(font);
        self
    }

    /// Vary the deterministic wireframe color assignment
    pub fn with_color_seed(mut self, seed: u64) -> Self {
        self.color_seed = seed;
        self
    }

    /// Render projected wireframes onto the image at `path`
    ///
    /// # Errors
    /// Returns error only when the source image cannot be loaded. Boxes
    /// that fail projection are omitted from the output, not reported.
    pub fn render<P: AsRef<Path>>(
        &self,
        path: P,
        cam: &CameraIntrinsics,
        detections: &[Detection],
    ) -> Result<Figure, ImageError> {
        let path = path.as_ref();
        let (image, info) = image_utils::load_image(path)?;
        debug!(
            "Rendering {} oriented box(es) onto {}x{} image",
            detections.len(),
            info.width,
            info.height
        );
        Ok(self.render_image(&image_utils::flatten_alpha(&image), cam, detections))
    }

    /// Render projected wireframes onto an already-decoded image
    pub fn render_image(
        &self,
        image: &RgbImage,
        cam: &CameraIntrinsics,
        detections: &[Detection],
    ) -> Figure {
        let mut canvas = image.clone();

        for (index, detection) in detections.iter().enumerate() {
            let bbox = match &detection.geometry {
                BoxGeometry::Oriented(bbox) => bbox,
                BoxGeometry::Rect(_) => {
                    warn!(
                        "Skipping rectangle '{}' in 3D rendering",
                        detection.label
                    );
                    continue;
                }
            };

            // Angles arrive in degrees; projection expects radians
            let angles_rad = [
                bbox.pitch_deg.to_radians(),
                bbox.yaw_deg.to_radians(),
                bbox.roll_deg.to_radians(),
            ];

            let projected = ProjectedBox {
                corners: project_box(bbox.center, bbox.size, angles_rad, cam),
                label: detection.label.clone(),
                color: seeded_color(&detection.label, index, self.color_seed),
            };

            let mut drew_edge = false;
            for (start, end) in projected.drawable_edges() {
                draw_thick_line(&mut canvas, start, end, projected.color);
                drew_edge = true;
            }

            if !drew_edge {
                debug!(
                    "Box '{}' has no drawable edges ({} corner(s) visible); skipped",
                    projected.label,
                    projected.visible_corners()
                );
                continue;
            }

            if let (Some(font), Some(anchor)) = (&self.font, projected.corners[0]) {
                draw_label(
                    &mut canvas,
                    font,
                    anchor[0] as i32,
                    anchor[1] as i32 - LABEL_RAISE,
                    &projected.label,
                    projected.color,
                );
            }
        }

        Figure::new(canvas)
    }
}

/// Approximate a 2-pixel stroke by repeating the 1-pixel segment at unit
/// offsets along both axes
fn draw_thick_line(canvas: &mut RgbImage, start: [f64; 2], end: [f64; 2], color: Rgb<u8>) {
    let (x0, y0) = (start[0] as f32, start[1] as f32);
    let (x1, y1) = (end[0] as f32, end[1] as f32);

    for offset in 0..STROKE_WIDTH {
        let o = offset as f32;
        draw_line_segment_mut(canvas, (x0 + o, y0), (x1 + o, y1), color);
        draw_line_segment_mut(canvas, (x0, y0 + o), (x1, y1 + o), color);
    }
}
