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

//! Material properties the render queue needs, and the table that owns them.
//!
//! Shaders and textures live with the backend; this side only knows how a
//! material sorts, whether it instances, and which shader-pass tags it carries.

use crate::renderer::api::{MaterialId, OPAQUE_RENDER_QUEUE};
use slotmap::SlotMap;
use std::collections::BTreeMap;

/// A material as seen by culling, batching and sorting.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Debug name.
    pub name: String,
    /// Draw order bucket; values of 3000 and above are transparent.
    pub render_queue: i32,
    /// Whether draws of this material may be merged into instanced batches.
    pub supports_instancing: bool,
    /// Shader-pass tags.
    pub tags: BTreeMap<String, String>,
}

impl Material {
    /// An opaque, non-instanced material.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            render_queue: OPAQUE_RENDER_QUEUE,
            supports_instancing: false,
            tags: BTreeMap::new(),
        }
    }

    /// Sets the render queue.
    pub fn with_render_queue(mut self, render_queue: i32) -> Self {
        self.render_queue = render_queue;
        self
    }

    /// Enables or disables instancing.
    pub fn with_instancing(mut self, supports_instancing: bool) -> Self {
        self.supports_instancing = supports_instancing;
        self
    }

    /// Adds a shader-pass tag.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

/// Owns every material; draw calls refer to them by [`MaterialId`].
#[derive(Debug, Default)]
pub struct MaterialLibrary {
    materials: SlotMap<MaterialId, Material>,
}

impl MaterialLibrary {
    /// Creates an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a material and returns its key.
    pub fn insert(&mut self, material: Material) -> MaterialId {
        log::debug!(
            "MaterialLibrary: registered '{}' (queue {})",
            material.name,
            material.render_queue
        );
        self.materials.insert(material)
    }

    /// Removes a material. Draw calls still holding its key become stale.
    pub fn remove(&mut self, id: MaterialId) -> Option<Material> {
        self.materials.remove(id)
    }

    /// Looks a material up.
    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id)
    }

    /// Looks a material up mutably.
    pub fn get_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id)
    }

    /// Number of materials.
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    /// Whether the library is empty.
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Iterates over every material.
    pub fn iter(&self) -> impl Iterator<Item = (MaterialId, &Material)> {
        self.materials.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get_remove() {
        let mut library = MaterialLibrary::new();
        let glass = library.insert(Material::new("Glass").with_render_queue(3000));
        let stone = library.insert(Material::new("Stone").with_instancing(true));

        assert_eq!(library.len(), 2);
        assert_eq!(library.get(glass).unwrap().render_queue, 3000);
        assert!(library.get(stone).unwrap().supports_instancing);

        library.remove(glass);
        assert!(library.get(glass).is_none());
        assert_eq!(library.len(), 1);
    }

    #[test]
    fn test_stale_key_after_reuse() {
        let mut library = MaterialLibrary::new();
        let first = library.insert(Material::new("A"));
        library.remove(first);
        let second = library.insert(Material::new("B"));
        assert_ne!(first, second);
        assert!(library.get(first).is_none());
    }
}
