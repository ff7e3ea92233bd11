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

use crate::math::{Bounds, Mat4};
use crate::renderer::api::{GeometryId, MaterialId, RenderableId};

/// A drawable object extracted from the scene for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Renderable {
    /// Stable identifier.
    pub id: RenderableId,
    /// Object-to-world transform.
    pub transform: Mat4,
    /// Bounds of the geometry in object space.
    pub local_bounds: Bounds,
    /// Geometry to draw.
    pub geometry: GeometryId,
    /// Material to draw with.
    pub material: MaterialId,
    /// Whether the object is drawn into shadow maps.
    pub cast_shadows: bool,
}

impl Renderable {
    /// A shadow-casting renderable.
    pub fn new(
        id: RenderableId,
        transform: Mat4,
        local_bounds: Bounds,
        geometry: GeometryId,
        material: MaterialId,
    ) -> Self {
        Self {
            id,
            transform,
            local_bounds,
            geometry,
            material,
            cast_shadows: true,
        }
    }

    /// Sets the shadow-casting flag.
    pub fn with_cast_shadows(mut self, cast_shadows: bool) -> Self {
        self.cast_shadows = cast_shadows;
        self
    }

    /// Bounds in world space.
    pub fn world_bounds(&self) -> Bounds {
        self.transform * self.local_bounds
    }
}

/// Union of the world bounds of every renderable, or `None` for an empty slice.
pub fn combined_world_bounds(renderables: &[Renderable]) -> Option<Bounds> {
    renderables
        .iter()
        .map(Renderable::world_bounds)
        .reduce(|acc, bounds| acc.combine(&bounds))
}
