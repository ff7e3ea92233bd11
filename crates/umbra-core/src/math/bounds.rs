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

//! Axis-aligned bounding boxes used for culling and draw-call sorting.

use super::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use std::ops::Mul;

/// An Axis-Aligned Bounding Box.
///
/// Defined by its minimum and maximum corner points. A bounds is valid when
/// `min <= max` on every axis; degenerate boxes (`min == max`) are valid.
///
/// Bounds are plain values: a renderable recomputes its world bounds whenever
/// its transform changes and nothing keeps a reference to an older one.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(C)]
pub struct Bounds {
    /// The corner of the box with the smallest coordinates on all axes.
    pub min: Vec3,
    /// The corner of the box with the largest coordinates on all axes.
    pub max: Vec3,
}

impl Bounds {
    /// A zero-sized bounds at the origin.
    pub const ZERO: Self = Self {
        min: Vec3::ZERO,
        max: Vec3::ZERO,
    };

    /// Creates a new `Bounds` from two corner points.
    ///
    /// The corners may be passed in any order; `min` and `max` are sorted per axis.
    #[inline]
    pub fn from_min_max(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Creates a new `Bounds` from a center point and its half-extents.
    #[inline]
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        let extents = extents.abs();
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Creates the `Bounds` enclosing every point of `points`.
    ///
    /// An empty slice yields [`Bounds::ZERO`]. That result carries no meaning,
    /// callers that may pass nothing must not rely on it.
    pub fn from_points(points: &[Vec3]) -> Self {
        let Some((first, rest)) = points.split_first() else {
            return Self::ZERO;
        };

        rest.iter().fold(
            Self {
                min: *first,
                max: *first,
            },
            |bounds, point| Self {
                min: bounds.min.min(*point),
                max: bounds.max.max(*point),
            },
        )
    }

    /// Returns the component-wise union of this bounds and `other`.
    #[inline]
    pub fn combine(&self, other: &Bounds) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Calculates the center point.
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Calculates the full size (width, height, depth).
    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Calculates the half-size on each axis.
    #[inline]
    pub fn extents(&self) -> Vec3 {
        self.size() * 0.5
    }

    /// Returns the eight corners in a fixed order.
    ///
    /// The order walks `z` fastest, then `y`, then `x`: `min` first, `max` last.
    pub fn corner_points(&self) -> [Vec3; 8] {
        let (min, max) = (self.min, self.max);
        [
            min,
            Vec3::new(min.x, min.y, max.z),
            Vec3::new(min.x, max.y, min.z),
            Vec3::new(min.x, max.y, max.z),
            Vec3::new(max.x, min.y, min.z),
            Vec3::new(max.x, min.y, max.z),
            Vec3::new(max.x, max.y, min.z),
            max,
        ]
    }

    /// Checks if `min <= max` on all axes.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.min.cmple(self.max).all()
    }

    /// Checks if a point lies inside or on the boundary.
    #[inline]
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Like [`contains_point`](Self::contains_point) with a tolerance on every face.
    #[inline]
    pub fn contains_point_eps(&self, point: Vec3, epsilon: f32) -> bool {
        let slack = Vec3::splat(epsilon);
        point.cmpge(self.min - slack).all() && point.cmple(self.max + slack).all()
    }

    /// Transforms the box by `matrix` and refits an axis-aligned box around it.
    ///
    /// All eight corners go through the matrix as points (`w = 1`). Under rotation the
    /// result is larger than the rotated box, never smaller.
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        let corners = self.corner_points().map(|corner| matrix.transform_point3(corner));
        Self::from_points(&corners)
    }
}

impl Mul<Bounds> for Mat4 {
    type Output = Bounds;

    #[inline]
    fn mul(self, rhs: Bounds) -> Bounds {
        rhs.transformed(&self)
    }
}

impl Mul<&Bounds> for &Mat4 {
    type Output = Bounds;

    #[inline]
    fn mul(self, rhs: &Bounds) -> Bounds {
        rhs.transformed(self)
    }
}
