// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Label text rasterization
//!
//! Rendering text onto a raster canvas needs a TrueType font, which the
//! crate does not bundle. A font is discovered from the `OVERLAY_FONT`
//! environment variable or well-known system locations; when none is
//! found, overlays still render their shapes and labels are skipped.

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use tracing::{debug, warn};

/// Environment variable consulted first when locating a label font
pub const FONT_ENV_VAR: &str = "OVERLAY_FONT";

/// Default label height in pixels
const DEFAULT_SCALE: f32 = 18.0;

/// Padding around the label text inside its background patch
const LABEL_PADDING: i32 = 3;

/// Well-known font locations probed after the environment variable
const FONT_SEARCH_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// A loaded label font plus its pixel scale
pub struct LabelFont {
    font: FontVec,
    scale: PxScale,
}

impl LabelFont {
    /// Probe the environment variable and well-known system locations
    ///
    /// Returns `None` when no candidate parses; the caller is expected to
    /// degrade to shapes-only overlays.
    pub fn discover() -> Option<Self> {
        let candidates = std::env::var(FONT_ENV_VAR)
            .ok()
            .into_iter()
            .chain(FONT_SEARCH_PATHS.iter().map(|p| p.to_string()));

        for candidate in candidates {
            let Ok(bytes) = std::fs::read(&candidate) else {
                continue;
            };
            match FontVec::try_from_vec(bytes) {
                Ok(font) => {
                    debug!("Label font loaded from {}", candidate);
                    return Some(Self {
                        font,
                        scale: PxScale::from(DEFAULT_SCALE),
                    });
                }
                Err(e) => debug!("Font candidate {} rejected: {}", candidate, e),
            }
        }

        warn!("No label font found; overlays will omit text labels");
        None
    }

    /// Use caller-supplied TrueType bytes
    pub fn from_bytes(bytes: Vec<u8>) -> Option<Self> {
        FontVec::try_from_vec(bytes).ok().map(|font| Self {
            font,
            scale: PxScale::from(DEFAULT_SCALE),
        })
    }

    /// Set the label height in pixels
    pub fn with_scale(mut self, pixels: f32) -> Self {
        self.scale = PxScale::from(pixels);
        self
    }
}

/// Draw `text` in white on a filled `background` patch anchored at `(x, y)`
///
/// Out-of-bounds portions are clipped by the drawing primitives, so labels
/// near image edges degrade instead of panicking.
pub fn draw_label(
    canvas: &mut RgbImage,
    font: &LabelFont,
    x: i32,
    y: i32,
    text: &str,
    background: Rgb<u8>,
) {
    if text.is_empty() {
        return;
    }

    let (text_width, text_height) = text_size(font.scale, &font.font, text);
    let patch_width = text_width + 2 * LABEL_PADDING as u32;
    let patch_height = text_height + 2 * LABEL_PADDING as u32;

    draw_filled_rect_mut(
        canvas,
        Rect::at(x - LABEL_PADDING, y - LABEL_PADDING).of_size(patch_width, patch_height),
        background,
    );
    draw_text_mut(
        canvas,
        Rgb([255, 255, 255]),
        x,
        y,
        font.scale,
        &font.font,
        text,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert!(LabelFont::from_bytes(vec![0, 1, 2, 3]).is_none());
        assert!(LabelFont::from_bytes(Vec::new()).is_none());
    }

    #[test]
    fn test_draw_label_without_font_is_callers_choice() {
        // Renderers hold Option<LabelFont>; an empty string is the only
        // no-op this function provides by itself
        let mut canvas = RgbImage::new(10, 10);
        if let Some(font) = LabelFont::discover() {
            draw_label(&mut canvas, &font, 2, 2, "", Rgb([255, 0, 0]));
            assert_eq!(canvas.get_pixel(2, 2), &Rgb([0, 0, 0]));
        }
    }

    #[test]
    fn test_draw_label_fills_background_patch() {
        let Some(font) = LabelFont::discover() else {
            // No system font in this environment; nothing to rasterize
            return;
        };

        let mut canvas = RgbImage::new(120, 40);
        draw_label(&mut canvas, &font, 10, 10, "cat", Rgb([200, 0, 0]));

        // The padding pixel left of the anchor belongs to the patch
        assert_eq!(canvas.get_pixel(8, 10), &Rgb([200, 0, 0]));
    }

    #[test]
    fn test_draw_label_clips_at_edges() {
        let Some(font) = LabelFont::discover() else {
            return;
        };

        let mut canvas = RgbImage::new(20, 20);
        // Anchors partially outside the canvas must not panic
        draw_label(&mut canvas, &font, -5, -5, "edge", Rgb([0, 200, 0]));
        draw_label(&mut canvas, &font, 18, 18, "edge", Rgb([0, 200, 0]));
    }
}
