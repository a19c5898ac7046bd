// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Overlay color assignment

use image::Rgb;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Fixed 2D palette, cycled by detection index
pub const PALETTE: [Rgb<u8>; 24] = [
    Rgb([0xFF, 0x00, 0x00]),
    Rgb([0x00, 0xFF, 0x00]),
    Rgb([0x00, 0x00, 0xFF]),
    Rgb([0xFF, 0xFF, 0x00]),
    Rgb([0xFF, 0x00, 0xFF]),
    Rgb([0x00, 0xFF, 0xFF]),
    Rgb([0xFF, 0xA5, 0x00]),
    Rgb([0x80, 0x00, 0x80]),
    Rgb([0x00, 0x80, 0x00]),
    Rgb([0xFF, 0xC0, 0xCB]),
    Rgb([0xFF, 0xD7, 0x00]),
    Rgb([0x4B, 0x00, 0x82]),
    Rgb([0x00, 0xFF, 0x7F]),
    Rgb([0xDC, 0x14, 0x3C]),
    Rgb([0x8A, 0x2B, 0xE2]),
    Rgb([0x7C, 0xFC, 0x00]),
    Rgb([0xFF, 0x45, 0x00]),
    Rgb([0xDA, 0x70, 0xD6]),
    Rgb([0x20, 0xB2, 0xAA]),
    Rgb([0xFF, 0x69, 0xB4]),
    Rgb([0x32, 0xCD, 0x32]),
    Rgb([0xBA, 0x55, 0xD3]),
    Rgb([0x93, 0x70, 0xDB]),
    Rgb([0x3C, 0xB3, 0x71]),
];

/// Palette color for the detection at `index`, wrapping past the end
pub fn palette_color(index: usize) -> Rgb<u8> {
    PALETTE[index % PALETTE.len()]
}

/// Deterministic wireframe color derived from label and index
///
/// Hashing keeps colors stable across runs for the same inputs while still
/// spreading distinct labels over the hue circle; saturation and value are
/// pinned high so wireframes stay readable on photographic backgrounds.
pub fn seeded_color(label: &str, index: usize, seed: u64) -> Rgb<u8> {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    label.hash(&mut hasher);
    index.hash(&mut hasher);

    let hue = (hasher.finish() % 360) as f32;
    hsv_to_rgb(hue, 0.85, 0.95)
}

/// Standard HSV to RGB conversion; `h` in degrees, `s`/`v` in `[0, 1]`
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Rgb<u8> {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = match h as u32 {
        0..=59 => (c, x, 0.0),
        60..=119 => (x, c, 0.0),
        120..=179 => (0.0, c, x),
        180..=239 => (0.0, x, c),
        240..=299 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    Rgb([
        ((r + m) * 255.0).round() as u8,
        ((g + m) * 255.0).round() as u8,
        ((b + m) * 255.0).round() as u8,
    ])
}
