// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Rendered figure wrapper

use image::{DynamicImage, ImageFormat, RgbImage};
use std::path::Path;
use tracing::debug;

use crate::image_utils::ImageError;

/// An annotated copy of the source image, ready for display or export
///
/// The source image is never mutated; every render call produces its own
/// figure.
pub struct Figure {
    image: RgbImage,
}

impl Figure {
    pub(crate) fn new(image: RgbImage) -> Self {
        Self { image }
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Borrow the annotated image
    pub fn as_image(&self) -> &RgbImage {
        &self.image
    }

    /// Take ownership of the annotated image
    pub fn into_image(self) -> RgbImage {
        self.image
    }

    /// Export as PNG at native resolution
    ///
    /// # Errors
    /// Returns error if encoding fails or the path is not writable
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<(), ImageError> {
        let path = path.as_ref();
        self.image
            .save_with_format(path, ImageFormat::Png)
            .map_err(|e| ImageError::SaveFailed(e.to_string()))?;

        debug!(
            "Saved {}x{} figure to {}",
            self.width(),
            self.height(),
            path.display()
        );
        Ok(())
    }

    /// A downscaled copy fitting within `max_width` x `max_height`,
    /// preserving aspect ratio; for display surfaces, not export
    pub fn thumbnail(&self, max_width: u32, max_height: u32) -> RgbImage {
        DynamicImage::ImageRgb8(self.image.clone())
            .thumbnail(max_width, max_height)
            .to_rgb8()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn figure(width: u32, height: u32) -> Figure {
        Figure::new(RgbImage::from_pixel(width, height, Rgb([9, 9, 9])))
    }

    #[test]
    fn test_dimensions() {
        let fig = figure(64, 32);
        assert_eq!(fig.width(), 64);
        assert_eq!(fig.height(), 32);
    }

    #[test]
    fn test_save_png_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");

        figure(8, 8).save_png(&path).unwrap();

        let (reloaded, info) = crate::image_utils::load_image(&path).unwrap();
        assert_eq!(info.format, ImageFormat::Png);
        assert_eq!(reloaded.width(), 8);
    }

    #[test]
    fn test_save_png_bad_path_errors() {
        let result = figure(8, 8).save_png("/nonexistent/dir/out.png");
        assert!(matches!(result, Err(ImageError::SaveFailed(_))));
    }

    #[test]
    fn test_thumbnail_fits_bounds() {
        let fig = figure(800, 600);
        let thumb = fig.thumbnail(200, 200);
        assert!(thumb.width() <= 200 && thumb.height() <= 200);
        // Aspect ratio preserved
        assert_eq!(thumb.width(), 200);
        assert_eq!(thumb.height(), 150);
    }

    #[test]
    fn test_thumbnail_does_not_upscale() {
        let fig = figure(50, 50);
        let thumb = fig.thumbnail(200, 200);
        assert_eq!((thumb.width(), thumb.height()), (50, 50));
    }
}
