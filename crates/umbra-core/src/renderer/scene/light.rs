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

//! Defines light types for the rendering system.
//!
//! Lights are plain values gathered into a [`SceneLights`] each frame. The shadow
//! caster pass reads them to build light-space matrices and the forward pass
//! uploads them as [`LightingData`].

use crate::math::Vec3;
use crate::renderer::api::{
    DirectionalLightData, LightingData, PointLightData, SpotLightData, MAX_POINT_LIGHT_SOURCES,
    MAX_SPOT_LIGHT_SOURCES,
};

/// A light infinitely far away, casting parallel rays.
///
/// # Examples
///
/// ```
/// use umbra_core::renderer::scene::DirectionalLight;
/// use umbra_core::math::Vec3;
///
/// let sun = DirectionalLight {
///     direction: Vec3::new(-0.5, -1.0, -0.3).normalize(),
///     ..Default::default()
/// };
/// assert!(sun.cast_shadows);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// The direction the light travels along (normalized).
    pub direction: Vec3,
    /// Linear RGB color.
    pub color: Vec3,
    /// Intensity multiplier.
    pub intensity: f32,
    /// Whether the light renders a shadow map.
    pub cast_shadows: bool,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(0.0, -1.0, -0.5).normalize(),
            color: Vec3::ONE,
            intensity: 1.0,
            cast_shadows: true,
        }
    }
}

/// A light emitting in every direction from a point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    /// World-space position.
    pub position: Vec3,
    /// Linear RGB color.
    pub color: Vec3,
    /// Intensity multiplier.
    pub intensity: f32,
    /// Attenuation range, also the far plane of its shadow faces.
    pub range: f32,
    /// Whether the light renders a shadow cube.
    pub cast_shadows: bool,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            color: Vec3::ONE,
            intensity: 1.0,
            range: 10.0,
            cast_shadows: true,
        }
    }
}

/// A light emitting in a cone from a point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotLight {
    /// World-space position.
    pub position: Vec3,
    /// World-space direction of the cone axis (normalized).
    pub direction: Vec3,
    /// Linear RGB color.
    pub color: Vec3,
    /// Intensity multiplier.
    pub intensity: f32,
    /// Attenuation range.
    pub range: f32,
    /// Half angle of the cone, in radians.
    pub cutoff: f32,
    /// Whether the light renders a shadow map.
    pub cast_shadows: bool,
}

impl Default for SpotLight {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            direction: Vec3::NEG_Y,
            color: Vec3::ONE,
            intensity: 1.0,
            range: 20.0,
            cutoff: 30f32.to_radians(),
            cast_shadows: true,
        }
    }
}

/// Every light of a frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneLights {
    /// The main directional light.
    pub directional: Option<DirectionalLight>,
    /// Point lights; only the first [`MAX_POINT_LIGHT_SOURCES`] are used.
    pub point: Vec<PointLight>,
    /// Spot lights; only the first [`MAX_SPOT_LIGHT_SOURCES`] are used.
    pub spot: Vec<SpotLight>,
}

impl SceneLights {
    /// Packs the lights into shader constants, dropping lights past the limits.
    pub fn lighting_data(&self, ambient_light: Vec3) -> LightingData {
        let mut data = LightingData {
            ambient_light,
            ..Default::default()
        };

        if let Some(light) = &self.directional {
            data.directional_light = DirectionalLightData {
                color: light.color * light.intensity,
                shadows_enabled: light.cast_shadows as u32,
                direction: light.direction.normalize_or_zero(),
                _pad: 0.0,
            };
        }

        for (slot, light) in data
            .point_lights
            .iter_mut()
            .zip(self.point.iter().take(MAX_POINT_LIGHT_SOURCES))
        {
            *slot = PointLightData {
                color: light.color * light.intensity,
                shadows_enabled: light.cast_shadows as u32,
                position: light.position,
                range: light.range,
            };
        }
        data.point_lights_count = self.point.len().min(MAX_POINT_LIGHT_SOURCES) as u32;

        for (slot, light) in data
            .spot_lights
            .iter_mut()
            .zip(self.spot.iter().take(MAX_SPOT_LIGHT_SOURCES))
        {
            *slot = SpotLightData {
                color: light.color * light.intensity,
                shadows_enabled: light.cast_shadows as u32,
                position: light.position,
                range: light.range,
                direction: light.direction.normalize_or_zero(),
                cos_cutoff: light.cutoff.cos(),
            };
        }
        data.spot_lights_count = self.spot.len().min(MAX_SPOT_LIGHT_SOURCES) as u32;

        if self.point.len() > MAX_POINT_LIGHT_SOURCES || self.spot.len() > MAX_SPOT_LIGHT_SOURCES {
            log::trace!(
                "SceneLights: dropping lights past the limits ({} point, {} spot)",
                self.point.len(),
                self.spot.len()
            );
        }

        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use bytemuck::Zeroable;

    #[test]
    fn test_lighting_data_caps_light_counts() {
        let lights = SceneLights {
            directional: Some(DirectionalLight::default()),
            point: vec![PointLight::default(); 5],
            spot: vec![SpotLight::default(); 2],
        };
        let data = lights.lighting_data(Vec3::splat(0.1));

        assert_eq!(data.point_lights_count, 3);
        assert_eq!(data.spot_lights_count, 2);
        assert_eq!(data.directional_light.shadows_enabled, 1);
        assert_relative_eq!(data.ambient_light, Vec3::splat(0.1));
        assert_relative_eq!(data.spot_lights[0].cos_cutoff, 30f32.to_radians().cos());
        assert_eq!(data.spot_lights[2], SpotLightData::zeroed());
    }

    #[test]
    fn test_color_is_premultiplied_by_intensity() {
        let lights = SceneLights {
            point: vec![PointLight {
                color: Vec3::new(1.0, 0.5, 0.0),
                intensity: 4.0,
                ..Default::default()
            }],
            ..Default::default()
        };
        let data = lights.lighting_data(Vec3::ZERO);
        assert_relative_eq!(data.point_lights[0].color, Vec3::new(4.0, 2.0, 0.0));
    }
}
