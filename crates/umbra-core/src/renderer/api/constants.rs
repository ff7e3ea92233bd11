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

//! Engine-wide rendering constants shared with shaders.

/// Name of the shadow matrices constant buffer.
pub const SHADOWS_BUFFER_NAME: &str = "Shadows";
/// Name of the lighting constant buffer.
pub const LIGHTING_BUFFER_NAME: &str = "Lighting";
/// Name of the camera constant buffer.
pub const CAMERA_DATA_BUFFER_NAME: &str = "CameraData";
/// Name of the per-draw constant buffer.
pub const PER_DRAW_DATA_BUFFER_NAME: &str = "PerDrawData";
/// Name of the per-instance structured buffer.
pub const PER_INSTANCE_DATA_BUFFER_NAME: &str = "PerInstanceData";
/// Name of the shared instancing matrices buffer.
pub const INSTANCE_MATRICES_BUFFER_NAME: &str = "InstanceMatricesBuffer";

/// Maximum number of instances collapsed into one draw call.
pub const MAX_INSTANCING_COUNT: usize = 256;
/// Maximum number of spot lights with shadows and lighting data.
pub const MAX_SPOT_LIGHT_SOURCES: usize = 3;
/// Maximum number of point lights with shadows and lighting data.
pub const MAX_POINT_LIGHT_SOURCES: usize = 3;
/// Faces of a point-light shadow cube map.
pub const POINT_LIGHT_SHADOW_FACES: usize = 6;
/// Maximum number of directional shadow cascades.
pub const MAX_SHADOW_CASCADES: usize = 4;

/// First material render queue drawn as transparent.
pub const TRANSPARENT_RENDER_QUEUE: i32 = 3000;
/// Default render queue for opaque materials.
pub const OPAQUE_RENDER_QUEUE: i32 = 2000;

/// Default number of frames the CPU may record ahead of the GPU.
pub const DEFAULT_MAX_FRAMES_IN_FLIGHT: usize = 3;
