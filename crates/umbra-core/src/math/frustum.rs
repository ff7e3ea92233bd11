// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! View-frustum planes and box visibility tests.
//!
//! Planes are extracted with the Gribb/Hartmann method: each plane is the
//! sum or difference of the fourth row of the view-projection matrix with one
//! of the first three rows. The clip volume is the OpenGL one (`-w <= z <= w`);
//! for zero-to-one depth projections the extracted near plane lies slightly
//! behind the real one.

use super::{Bounds, Mat4, Vec3, Vec4, EPSILON};
use bitflags::bitflags;
use std::fmt;

/// Identifies one of the six frustum planes.
///
/// The discriminant is the plane's index in [`Frustum::planes`] and its bit in
/// [`FrustumPlanes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrustumPlane {
    /// The near clipping plane.
    Near = 0,
    /// The far clipping plane.
    Far = 1,
    /// The left side plane.
    Left = 2,
    /// The right side plane.
    Right = 3,
    /// The top side plane.
    Top = 4,
    /// The bottom side plane.
    Bottom = 5,
}

impl FrustumPlane {
    /// All planes in index order.
    pub const ALL: [FrustumPlane; 6] = [
        FrustumPlane::Near,
        FrustumPlane::Far,
        FrustumPlane::Left,
        FrustumPlane::Right,
        FrustumPlane::Top,
        FrustumPlane::Bottom,
    ];

    /// Returns the bit of this plane in a [`FrustumPlanes`] mask.
    #[inline]
    pub const fn bit(self) -> FrustumPlanes {
        FrustumPlanes::from_bits_truncate(1 << self as u32)
    }
}

impl fmt::Display for FrustumPlane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrustumPlane::Near => write!(f, "near"),
            FrustumPlane::Far => write!(f, "far"),
            FrustumPlane::Left => write!(f, "left"),
            FrustumPlane::Right => write!(f, "right"),
            FrustumPlane::Top => write!(f, "top"),
            FrustumPlane::Bottom => write!(f, "bottom"),
        }
    }
}

bitflags! {
    /// A mask selecting which planes take part in a visibility test.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FrustumPlanes: u32 {
        /// The near plane.
        const NEAR = 1 << 0;
        /// The far plane.
        const FAR = 1 << 1;
        /// The left plane.
        const LEFT = 1 << 2;
        /// The right plane.
        const RIGHT = 1 << 3;
        /// The top plane.
        const TOP = 1 << 4;
        /// The bottom plane.
        const BOTTOM = 1 << 5;

        /// Every plane. Used by camera passes.
        const ALL = Self::NEAR.bits() | Self::FAR.bits() | Self::SIDES.bits();
        /// Left, right, top and bottom only. Used by shadow cascades whose
        /// near/far range is clipped elsewhere.
        const SIDES = Self::LEFT.bits() | Self::RIGHT.bits() | Self::TOP.bits() | Self::BOTTOM.bits();
    }
}

impl Default for FrustumPlanes {
    fn default() -> Self {
        FrustumPlanes::ALL
    }
}

/// An error produced when a view-projection matrix cannot describe a frustum.
#[derive(Debug, Clone, PartialEq)]
pub enum FrustumError {
    /// A plane extracted from the matrix has a (near) zero-length normal.
    DegenerateMatrix {
        /// The plane whose normal collapsed.
        plane: FrustumPlane,
    },
}

impl fmt::Display for FrustumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrustumError::DegenerateMatrix { plane } => {
                write!(
                    f,
                    "Degenerate view-projection matrix: {plane} plane has a zero-length normal"
                )
            }
        }
    }
}

impl std::error::Error for FrustumError {}

/// Six inward-facing, normalized planes describing a camera's visible volume.
///
/// Each plane is stored as `(a, b, c, d)` where `(a, b, c)` is the unit normal and
/// a point `p` is on the inner side when `dot(n, p) + d >= 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    planes: [Vec4; 6],
}

impl Frustum {
    /// Extracts the frustum planes from a view-projection matrix.
    ///
    /// # Errors
    ///
    /// Returns [`FrustumError::DegenerateMatrix`] if any plane normal is shorter than
    /// [`EPSILON`], which would otherwise produce NaN planes.
    pub fn new(view_projection: &Mat4) -> Result<Self, FrustumError> {
        let row0 = view_projection.row(0);
        let row1 = view_projection.row(1);
        let row2 = view_projection.row(2);
        let row3 = view_projection.row(3);

        let raw = [
            (FrustumPlane::Near, row3 + row2),
            (FrustumPlane::Far, row3 - row2),
            (FrustumPlane::Left, row3 + row0),
            (FrustumPlane::Right, row3 - row0),
            (FrustumPlane::Top, row3 - row1),
            (FrustumPlane::Bottom, row3 + row1),
        ];

        let mut planes = [Vec4::ZERO; 6];
        for (plane, coefficients) in raw {
            planes[plane as usize] = normalize_plane(plane, coefficients)?;
        }

        Ok(Self { planes })
    }

    /// Returns the six planes in [`FrustumPlane`] index order.
    #[inline]
    pub fn planes(&self) -> &[Vec4; 6] {
        &self.planes
    }

    /// Returns a single plane.
    #[inline]
    pub fn plane(&self, plane: FrustumPlane) -> Vec4 {
        self.planes[plane as usize]
    }

    /// Tests a box against the planes selected by `planes_bits`.
    ///
    /// For each enabled plane only the corner furthest along the plane normal
    /// (the "positive vertex") is tested. If that corner is behind the plane, the
    /// whole box is, and it is reported as not visible. Boxes that straddle a
    /// plane are visible.
    pub fn is_visible(&self, bounds: &Bounds, planes_bits: FrustumPlanes) -> bool {
        for plane_id in FrustumPlane::ALL {
            if !planes_bits.contains(plane_id.bit()) {
                continue;
            }

            let plane = self.planes[plane_id as usize];
            let positive_vertex = Vec3::new(
                if plane.x >= 0.0 { bounds.max.x } else { bounds.min.x },
                if plane.y >= 0.0 { bounds.max.y } else { bounds.min.y },
                if plane.z >= 0.0 { bounds.max.z } else { bounds.min.z },
            );

            if plane.truncate().dot(positive_vertex) + plane.w < 0.0 {
                return false;
            }
        }

        true
    }
}

fn normalize_plane(plane: FrustumPlane, coefficients: Vec4) -> Result<Vec4, FrustumError> {
    let length = coefficients.truncate().length();
    if !length.is_finite() || length < EPSILON {
        return Err(FrustumError::DegenerateMatrix { plane });
    }
    Ok(coefficients / length)
}
