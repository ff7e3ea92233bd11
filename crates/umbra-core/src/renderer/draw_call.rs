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

//! The record a render queue produces for each draw.

use crate::math::{Bounds, Mat4};
use crate::renderer::api::{GeometryId, MaterialId, RenderableId};

/// One draw call, possibly covering several instances of the same geometry and material.
///
/// The material's render queue and instancing flag are copied in when the record is
/// built so filters and comparers never go back to the material library.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCallInfo {
    /// The geometry to draw.
    pub geometry: GeometryId,
    /// The material to draw with (the override material when one is set).
    pub material: MaterialId,
    /// The renderable this draw came from; the first one for a batch.
    pub renderable: RenderableId,
    /// Object-to-world matrices, one per instance.
    pub matrices: Vec<Mat4>,
    /// World-space bounds of every instance combined.
    pub aabb: Bounds,
    /// Whether the source renderables cast shadows.
    pub cast_shadows: bool,
    /// Whether the draw reads its matrices from the instancing buffer.
    pub instanced: bool,
    /// Render queue of the material.
    pub render_queue: i32,
    /// Whether the material can be drawn instanced.
    pub supports_instancing: bool,
    /// Byte offset of the matrices in the instancing or per-draw ring buffer.
    pub buffer_offset: u64,
}

impl DrawCallInfo {
    /// A single, non-instanced draw.
    #[allow(clippy::too_many_arguments)]
    pub fn single(
        renderable: RenderableId,
        geometry: GeometryId,
        material: MaterialId,
        transform: Mat4,
        aabb: Bounds,
        cast_shadows: bool,
        render_queue: i32,
        supports_instancing: bool,
    ) -> Self {
        Self {
            geometry,
            material,
            renderable,
            matrices: vec![transform],
            aabb,
            cast_shadows,
            instanced: false,
            render_queue,
            supports_instancing,
            buffer_offset: 0,
        }
    }

    /// Number of instances drawn.
    pub fn instance_count(&self) -> usize {
        self.matrices.len()
    }

    /// The key draws are batched by.
    pub fn batch_key(&self) -> (GeometryId, MaterialId) {
        (self.geometry, self.material)
    }

    /// The first (or only) model matrix.
    pub fn transform(&self) -> Mat4 {
        self.matrices.first().copied().unwrap_or(Mat4::IDENTITY)
    }
}
