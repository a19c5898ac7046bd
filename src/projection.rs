// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! 3D-to-2D projection of oriented boxes through a pinhole camera
//!
//! Corner order and the rotation sequence are a fixed convention shared
//! with the producer of the box parameters; changing either silently
//! scrambles the rendered wireframe.

use image::Rgb;

use crate::camera::CameraIntrinsics;

/// Number of box corners
pub const CORNER_COUNT: usize = 8;

/// The 12 wireframe edges of a box, as index pairs into the corner order
/// produced by [`local_corners`]
pub const BOX_EDGES: [[usize; 2]; 12] = [
    // edges along the depth (z) axis
    [0, 1],
    [2, 3],
    [4, 5],
    [6, 7],
    // edges along the vertical (y) axis
    [0, 2],
    [1, 3],
    [4, 6],
    [5, 7],
    // edges along the lateral (x) axis
    [0, 4],
    [1, 5],
    [2, 6],
    [3, 7],
];

/// Local-frame corners of a box with the given per-axis extents
///
/// Corner `i` takes the positive half-extent on an axis when the matching
/// bit of `i` is clear: bit 2 selects the x sign, bit 1 the y sign, bit 0
/// the z sign. [`BOX_EDGES`] indexes into this order.
pub fn local_corners(size: [f64; 3]) -> [[f64; 3]; CORNER_COUNT] {
    let (hx, hy, hz) = (size[0] / 2.0, size[1] / 2.0, size[2] / 2.0);

    let mut corners = [[0.0; 3]; CORNER_COUNT];
    for (i, corner) in corners.iter_mut().enumerate() {
        corner[0] = if i & 0b100 == 0 { hx } else { -hx };
        corner[1] = if i & 0b010 == 0 { hy } else { -hy };
        corner[2] = if i & 0b001 == 0 { hz } else { -hz };
    }
    corners
}

/// Rotate a point by intrinsic yaw, then pitch, then roll
///
/// Yaw turns about the vertical (Y) axis, pitch about the lateral (X)
/// axis, roll about the depth (Z) axis. Each step is a plain 2D rotation
/// applied to the evolving coordinate; the sequence is order-dependent and
/// must not be fused into a single matrix.
fn rotate_yaw_pitch_roll(point: [f64; 3], pitch: f64, yaw: f64, roll: f64) -> [f64; 3] {
    let [x0, y0, z0] = point;
    let (sin_yaw, cos_yaw) = yaw.sin_cos();
    let (sin_pitch, cos_pitch) = pitch.sin_cos();
    let (sin_roll, cos_roll) = roll.sin_cos();

    // yaw about Y
    let x1 = x0 * cos_yaw + z0 * sin_yaw;
    let y1 = y0;
    let z1 = -x0 * sin_yaw + z0 * cos_yaw;

    // pitch about X
    let x2 = x1;
    let y2 = y1 * cos_pitch - z1 * sin_pitch;
    let z2 = y1 * sin_pitch + z1 * cos_pitch;

    // roll about Z
    let x3 = x2 * cos_roll - y2 * sin_roll;
    let y3 = x2 * sin_roll + y2 * cos_roll;
    let z3 = z2;

    [x3, y3, z3]
}

/// Project one oriented box through `cam`
///
/// # Arguments
/// - `center`: Box center in camera space
/// - `size`: Full extents along the local axes
/// - `angles_rad`: `[pitch, yaw, roll]` in radians
/// - `cam`: Pinhole intrinsics
///
/// # Returns
/// One slot per corner; `None` when the corner's camera-space depth is not
/// strictly positive (`Z = 0` does not project). Corner identity is
/// preserved so [`BOX_EDGES`] stays valid when some corners fall behind
/// the camera.
pub fn project_box(
    center: [f64; 3],
    size: [f64; 3],
    angles_rad: [f64; 3],
    cam: &CameraIntrinsics,
) -> [Option<[f64; 2]>; CORNER_COUNT] {
    let [pitch, yaw, roll] = angles_rad;

    let mut projected = [None; CORNER_COUNT];
    for (slot, corner) in projected.iter_mut().zip(local_corners(size)) {
        let [rx, ry, rz] = rotate_yaw_pitch_roll(corner, pitch, yaw, roll);
        let (x, y, z) = (rx + center[0], ry + center[1], rz + center[2]);

        if z > 0.0 {
            *slot = Some([cam.fx * (x / z) + cam.cx, cam.fy * (y / z) + cam.cy]);
        }
    }
    projected
}

/// A box projected into image space, ready to draw
#[derive(Debug, Clone)]
pub struct ProjectedBox {
    /// Per-corner pixel coordinates; `None` for corners behind the camera
    pub corners: [Option<[f64; 2]>; CORNER_COUNT],
    /// Originating detection label
    pub label: String,
    /// Assigned display color
    pub color: Rgb<u8>,
}

impl ProjectedBox {
    /// Corners that survived the depth test
    pub fn visible_corners(&self) -> usize {
        self.corners.iter().flatten().count()
    }

    /// Edges whose both endpoints survived projection
    pub fn drawable_edges(&self) -> impl Iterator<Item = ([f64; 2], [f64; 2])> + '_ {
        BOX_EDGES
            .iter()
            .filter_map(move |&[a, b]| Some((self.corners[a]?, self.corners[b]?)))
    }
}
