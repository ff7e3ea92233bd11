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

//! User-facing quality and post-processing settings.

use crate::renderer::api::{BlitData, MAX_SHADOW_CASCADES};
use crate::renderer::resources::CullingSettings;
use serde::{Deserialize, Serialize};

/// Tonemapping operators applied by the final blit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TonemappingMode {
    /// Clamp only.
    None,
    /// `c / (1 + c)`.
    Reinhard,
    /// ACES filmic fit.
    #[default]
    Aces,
}

impl TonemappingMode {
    /// Index passed to shaders.
    pub fn as_index(self) -> u32 {
        match self {
            TonemappingMode::None => 0,
            TonemappingMode::Reinhard => 1,
            TonemappingMode::Aces => 2,
        }
    }
}

/// Rendering settings read every frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphicsSettings {
    /// Display gamma.
    pub gamma: f32,
    /// Linear exposure multiplier.
    pub exposure: f32,
    /// Tonemapping operator.
    pub tonemapping: TonemappingMode,
    /// Distance from the camera covered by directional shadows.
    pub shadow_distance: f32,
    /// Number of directional cascades, clamped to `1..=MAX_SHADOW_CASCADES`.
    pub shadow_cascade_count: usize,
    /// Cumulative fraction of `shadow_distance` at which each cascade ends.
    pub shadow_cascade_splits: Vec<f32>,
    /// Resolution of each shadow map side.
    pub shadow_map_size: u32,
    /// Frustum culling switches at startup.
    pub culling: CullingSettings,
    /// Overrides the backend's frames-in-flight count.
    pub max_frames_in_flight: Option<usize>,
}

impl Default for GraphicsSettings {
    fn default() -> Self {
        Self {
            gamma: 2.2,
            exposure: 1.0,
            tonemapping: TonemappingMode::default(),
            shadow_distance: 50.0,
            shadow_cascade_count: 1,
            shadow_cascade_splits: vec![0.1, 0.3, 0.6, 1.0],
            shadow_map_size: 2048,
            culling: CullingSettings::default(),
            max_frames_in_flight: None,
        }
    }
}

impl GraphicsSettings {
    /// The cascade count clamped to the supported range.
    pub fn cascade_count(&self) -> usize {
        self.shadow_cascade_count.clamp(1, MAX_SHADOW_CASCADES)
    }

    /// Far distance of every active cascade.
    ///
    /// Missing ratios are spread evenly up to `shadow_distance`; the last cascade
    /// always ends at `shadow_distance`.
    pub fn cascade_distances(&self) -> Vec<f32> {
        let count = self.cascade_count();
        (0..count)
            .map(|i| {
                let ratio = if i + 1 == count {
                    1.0
                } else {
                    self.shadow_cascade_splits
                        .get(i)
                        .copied()
                        .unwrap_or((i + 1) as f32 / count as f32)
                        .clamp(0.0, 1.0)
                };
                ratio * self.shadow_distance
            })
            .collect()
    }

    /// Constants of the final blit.
    pub fn blit_data(&self) -> BlitData {
        let gamma = if self.gamma > 0.0 { self.gamma } else { 2.2 };
        BlitData {
            one_over_gamma: 1.0 / gamma,
            exposure: self.exposure,
            tonemapping_mode: self.tonemapping.as_index(),
            _pad: 0.0,
        }
    }
}
