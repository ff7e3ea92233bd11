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

//! GPU-facing data layouts.
//!
//! Every struct here is `#[repr(C)]` and [`bytemuck::Pod`], so it can be uploaded
//! with `bytemuck::bytes_of` into the constant buffer of the same name. Field order
//! and padding follow std140 rules: a `Vec3` is always followed by a scalar.

use super::constants::{
    MAX_POINT_LIGHT_SOURCES, MAX_SHADOW_CASCADES, MAX_SPOT_LIGHT_SOURCES, POINT_LIGHT_SHADOW_FACES,
};
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Per-view camera constants.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CameraData {
    /// Combined view and projection matrix.
    pub view_projection: Mat4,
    /// World-space camera position.
    pub camera_position: Vec3,
    /// Near clip distance.
    pub near_clip_plane: f32,
    /// World-space forward direction.
    pub camera_direction: Vec3,
    /// Far clip distance.
    pub far_clip_plane: f32,
}

impl CameraData {
    /// Builds camera constants from view and projection matrices.
    pub fn new(view: Mat4, projection: Mat4, near: f32, far: f32) -> Self {
        let camera_to_world = view.inverse();
        Self {
            view_projection: projection * view,
            camera_position: camera_to_world.w_axis.truncate(),
            near_clip_plane: near,
            camera_direction: (-camera_to_world.z_axis.truncate()).normalize_or_zero(),
            far_clip_plane: far,
        }
    }
}

/// Model matrices of a non-instanced draw.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PerDrawData {
    /// Object to world.
    pub model: Mat4,
    /// Inverse-transpose of `model`, for normals.
    pub model_normal: Mat4,
}

impl PerDrawData {
    /// Computes the normal matrix from `model`.
    pub fn from_model(model: Mat4) -> Self {
        Self {
            model,
            model_normal: model.inverse().transpose(),
        }
    }
}

/// One entry of the instancing structured buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PerInstanceData {
    /// Object to world.
    pub model: Mat4,
    /// Inverse-transpose of `model`, for normals.
    pub model_normal: Mat4,
}

impl PerInstanceData {
    /// Computes the normal matrix from `model`.
    pub fn from_model(model: Mat4) -> Self {
        Self {
            model,
            model_normal: model.inverse().transpose(),
        }
    }
}

/// Shadow matrices of one point light.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PointLightShadowData {
    /// Biased view-projection of each cube face.
    pub view_proj_matrices: [Mat4; POINT_LIGHT_SHADOW_FACES],
    /// World-space light position.
    pub position: Vec3,
    /// Far plane of the face projections.
    pub far: f32,
}

/// Light-space matrices for every shadow-casting light of the frame.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ShadowsData {
    /// Biased view-projection of each directional cascade.
    pub directional_light_matrices: [Mat4; MAX_SHADOW_CASCADES],
    /// Far view distance of each cascade; unused cascades are zero.
    pub cascade_splits: [f32; MAX_SHADOW_CASCADES],
    /// Biased view-projections of the spot lights.
    pub spot_light_matrices: [Mat4; MAX_SPOT_LIGHT_SOURCES],
    /// Cube-face matrices of the point lights.
    pub point_lights: [PointLightShadowData; MAX_POINT_LIGHT_SOURCES],
}

impl Default for ShadowsData {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Directional light constants.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DirectionalLightData {
    /// Linear color multiplied by intensity.
    pub color: Vec3,
    /// Non-zero when the light casts shadows.
    pub shadows_enabled: u32,
    /// World-space direction the light travels along.
    pub direction: Vec3,
    /// Padding.
    pub _pad: f32,
}

/// Point light constants.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PointLightData {
    /// Linear color multiplied by intensity.
    pub color: Vec3,
    /// Non-zero when the light casts shadows.
    pub shadows_enabled: u32,
    /// World-space position.
    pub position: Vec3,
    /// Attenuation range.
    pub range: f32,
}

/// Spot light constants.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SpotLightData {
    /// Linear color multiplied by intensity.
    pub color: Vec3,
    /// Non-zero when the light casts shadows.
    pub shadows_enabled: u32,
    /// World-space position.
    pub position: Vec3,
    /// Attenuation range.
    pub range: f32,
    /// World-space direction.
    pub direction: Vec3,
    /// Cosine of the cone half angle.
    pub cos_cutoff: f32,
}

/// All lighting constants of a frame.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightingData {
    /// Ambient light color.
    pub ambient_light: Vec3,
    /// Number of active point lights.
    pub point_lights_count: u32,
    /// The directional light.
    pub directional_light: DirectionalLightData,
    /// Point lights; only the first `point_lights_count` are valid.
    pub point_lights: [PointLightData; MAX_POINT_LIGHT_SOURCES],
    /// Spot lights; only the first `spot_lights_count` are valid.
    pub spot_lights: [SpotLightData; MAX_SPOT_LIGHT_SOURCES],
    /// Number of active spot lights.
    pub spot_lights_count: u32,
    /// Padding.
    pub _pad: [u32; 3],
}

impl Default for LightingData {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Constants of the final blit to the back buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct BlitData {
    /// `1 / gamma`.
    pub one_over_gamma: f32,
    /// Linear exposure multiplier.
    pub exposure: f32,
    /// Tonemapping operator index.
    pub tonemapping_mode: u32,
    /// Padding.
    pub _pad: f32,
}

/// Constants of the selection outline composite.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct OutlineData {
    /// Outline color.
    pub color: [f32; 4],
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::mem::size_of;

    #[test]
    fn test_layouts_are_16_byte_multiples() {
        assert_eq!(size_of::<CameraData>() % 16, 0);
        assert_eq!(size_of::<PerDrawData>(), 128);
        assert_eq!(size_of::<PerInstanceData>(), 128);
        assert_eq!(size_of::<ShadowsData>() % 16, 0);
        assert_eq!(size_of::<LightingData>() % 16, 0);
        assert_eq!(size_of::<BlitData>(), 16);
    }

    #[test]
    fn test_camera_data_from_look_at() {
        let eye = Vec3::new(0.0, 2.0, 5.0);
        let view = Mat4::look_at_rh(eye, Vec3::new(0.0, 2.0, 0.0), Vec3::Y);
        let proj = Mat4::perspective_rh_gl(60f32.to_radians(), 1.0, 0.1, 100.0);
        let data = CameraData::new(view, proj, 0.1, 100.0);

        assert_relative_eq!(data.camera_position, eye, epsilon = 1e-4);
        assert_relative_eq!(data.camera_direction, Vec3::NEG_Z, epsilon = 1e-4);
        assert_relative_eq!(data.view_projection, proj * view);
    }

    #[test]
    fn test_normal_matrix_of_uniform_scale() {
        let data = PerDrawData::from_model(Mat4::from_scale(Vec3::splat(2.0)));
        assert_relative_eq!(data.model_normal, Mat4::from_scale(Vec3::splat(0.5)));
    }
}
