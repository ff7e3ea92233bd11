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

//! Math primitives used by culling and sorting.
//!
//! Linear algebra comes from `glam` (column-major, `Mat4 * Vec4`). This module
//! adds the two geometric types the render queue is built on: [`Bounds`], an
//! axis-aligned box, and [`Frustum`], the six clip planes of a camera.

// --- Fundamental Constants ---

/// A small constant for floating-point comparisons.
pub const EPSILON: f32 = 1e-5;

// --- Declare Sub-Modules ---

pub mod bounds;
pub mod frustum;

// --- Re-export Principal Types ---

pub use self::bounds::Bounds;
pub use self::frustum::{Frustum, FrustumError, FrustumPlane, FrustumPlanes};
pub use glam::{Mat4, Quat, Vec3, Vec4};

// --- Utility Functions ---

/// Performs an approximate equality comparison between two floats with a custom tolerance.
///
/// # Examples
///
/// ```
/// use umbra_core::math::approx_eq_eps;
/// assert!(approx_eq_eps(0.001, 0.002, 1e-2));
/// assert!(!approx_eq_eps(0.001, 0.002, 1e-4));
/// ```
#[inline]
pub fn approx_eq_eps(a: f32, b: f32, epsilon: f32) -> bool {
    (a - b).abs() < epsilon
}

/// Performs an approximate equality comparison using the module's default [`EPSILON`].
#[inline]
pub fn approx_eq(a: f32, b: f32) -> bool {
    approx_eq_eps(a, b, EPSILON)
}

/// Returns the world-space forward direction of a camera given its view-projection matrix.
///
/// The direction is the inward normal of the near clip plane (`row3 + row2`),
/// which points along the depth axis for perspective and orthographic matrices
/// alike and does not depend on the matrix being well conditioned enough to
/// invert. Returns `Vec3::ZERO` when that normal is zero or not finite.
///
/// # Examples
///
/// ```
/// use umbra_core::math::{camera_forward, Mat4, Vec3};
/// let proj = Mat4::perspective_rh_gl(60f32.to_radians(), 1.0, 0.1, 100.0);
/// let forward = camera_forward(&proj);
/// assert!(forward.abs_diff_eq(Vec3::NEG_Z, 1e-4));
/// ```
pub fn camera_forward(view_projection: &Mat4) -> Vec3 {
    let near_plane = view_projection.row(3) + view_projection.row(2);
    near_plane.truncate().normalize_or_zero()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_forward_of_perspective_view() {
        let view = Mat4::look_at_rh(Vec3::new(3.0, 2.0, 1.0), Vec3::new(3.0, 2.0, 11.0), Vec3::Y);
        let proj = Mat4::perspective_rh_gl(1.0, 1.5, 0.1, 100.0);
        let forward = camera_forward(&(proj * view));
        assert_relative_eq!(forward.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(forward.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(forward.z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_forward_of_wide_orthographic_view() {
        // Determinant far below f32::EPSILON, yet a perfectly usable matrix.
        let view = Mat4::look_at_rh(Vec3::new(0.0, 100.0, 0.0), Vec3::ZERO, Vec3::Z);
        let proj = Mat4::orthographic_rh_gl(-500.0, 500.0, -500.0, 500.0, 0.1, 1000.0);
        let view_projection = proj * view;
        assert!(view_projection.determinant().abs() < f32::EPSILON);

        let forward = camera_forward(&view_projection);
        assert_relative_eq!(forward.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(forward.y, -1.0, epsilon = 1e-5);
        assert_relative_eq!(forward.z, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_forward_of_zero_matrix_is_zero() {
        assert_eq!(camera_forward(&Mat4::ZERO), Vec3::ZERO);
    }
}
