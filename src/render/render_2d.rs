// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! 2D rectangle overlay rendering
//!
//! The model reports 2D coordinates on a fixed 1000x1000 virtual canvas
//! regardless of the actual image resolution; rescaling to pixels happens
//! here, per axis, together with repair of reversed corners.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::path::Path;
use tracing::{debug, warn};

use crate::detection::{BoxGeometry, Detection};
use crate::image_utils;
use crate::render::color::palette_color;
use crate::render::figure::Figure;
use crate::render::text::{draw_label, LabelFont};

/// Virtual canvas dimension the model's 2D coordinates are scaled to
pub const VIRTUAL_SCALE: f64 = 1000.0;

/// Rectangle stroke width in pixels
const STROKE_WIDTH: i32 = 2;

/// Label anchor offset from the rectangle's top-left corner
const LABEL_OFFSET: (i32, i32) = (8, 6);

/// Canvas size for the degraded error figure
const ERROR_FIGURE_SIZE: (u32, u32) = (960, 540);

/// Renders rectangle detections onto a copy of the source image
pub struct Renderer2d {
    font: Option<LabelFont>,
}

impl Default for Renderer2d {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer2d {
    /// Create a renderer, discovering a label font from the environment
    pub fn new() -> Self {
        Self {
            font: LabelFont::discover(),
        }
    }

    /// Use a caller-supplied label font
    pub fn with_font(mut self, font: LabelFont) -> Self {
        self.font = Some(font);
        self
    }

    /// Render detections onto the image at `path`
    ///
    /// Load failures degrade to a figure carrying the error message so the
    /// caller always has something to display; per-record geometry
    /// failures skip only that record.
    pub fn render<P: AsRef<Path>>(&self, path: P, detections: &[Detection]) -> Figure {
        let path = path.as_ref();
        match image_utils::load_image(path) {
            Ok((image, info)) => {
                debug!(
                    "Rendering {} detection(s) onto {}x{} image",
                    detections.len(),
                    info.width,
                    info.height
                );
                self.render_image(&image_utils::flatten_alpha(&image), detections)
            }
            Err(e) => {
                warn!("Cannot load {}: {}", path.display(), e);
                self.error_figure(&e.to_string())
            }
        }
    }

    /// Render detections onto an already-decoded image
    pub fn render_image(&self, image: &RgbImage, detections: &[Detection]) -> Figure {
        let mut canvas = image.clone();

        for (index, detection) in detections.iter().enumerate() {
            let raw = match &detection.geometry {
                BoxGeometry::Rect(values) => *values,
                BoxGeometry::Oriented(_) => {
                    warn!(
                        "Skipping oriented box '{}' in 2D rendering",
                        detection.label
                    );
                    continue;
                }
            };

            let (x1, y1, x2, y2) = scale_to_pixels(raw, canvas.width(), canvas.height());
            let color = palette_color(index);

            draw_rect_outline(&mut canvas, x1, y1, x2, y2, color);
            if let Some(font) = &self.font {
                draw_label(
                    &mut canvas,
                    font,
                    x1 + LABEL_OFFSET.0,
                    y1 + LABEL_OFFSET.1,
                    &label_text(detection),
                    color,
                );
            }
        }

        Figure::new(canvas)
    }

    /// A blank figure carrying the failure message
    fn error_figure(&self, message: &str) -> Figure {
        let (width, height) = ERROR_FIGURE_SIZE;
        let mut canvas = RgbImage::from_pixel(width, height, Rgb([245, 245, 245]));

        if let Some(font) = &self.font {
            draw_label(
                &mut canvas,
                font,
                40,
                (height / 2) as i32,
                &format!("Visualization error: {message}"),
                Rgb([120, 120, 120]),
            );
        }

        Figure::new(canvas)
    }
}

/// Map 1000-scale coordinates to pixels and repair reversed corners
pub(crate) fn scale_to_pixels(raw: [f64; 4], width: u32, height: u32) -> (i32, i32, i32, i32) {
    let mut x1 = (raw[0] / VIRTUAL_SCALE * width as f64) as i32;
    let mut y1 = (raw[1] / VIRTUAL_SCALE * height as f64) as i32;
    let mut x2 = (raw[2] / VIRTUAL_SCALE * width as f64) as i32;
    let mut y2 = (raw[3] / VIRTUAL_SCALE * height as f64) as i32;

    if x1 > x2 {
        std::mem::swap(&mut x1, &mut x2);
    }
    if y1 > y2 {
        std::mem::swap(&mut y1, &mut y2);
    }

    (x1, y1, x2, y2)
}

/// Label plus confidence, the latter only when the model reported one
fn label_text(detection: &Detection) -> String {
    if detection.score < 1.0 {
        format!("{}: {:.2}", detection.label, detection.score)
    } else {
        detection.label.clone()
    }
}

/// Hollow rectangle with the configured stroke width, via nested outlines
fn draw_rect_outline(canvas: &mut RgbImage, x1: i32, y1: i32, x2: i32, y2: i32, color: Rgb<u8>) {
    for inset in 0..STROKE_WIDTH {
        let width = (x2 - x1 - 2 * inset).max(1) as u32;
        let height = (y2 - y1 - 2 * inset).max(1) as u32;
        draw_hollow_rect_mut(
            canvas,
            Rect::at(x1 + inset, y1 + inset).of_size(width, height),
            color,
        );
    }
}
