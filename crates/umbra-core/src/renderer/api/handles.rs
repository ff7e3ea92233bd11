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

//! Integer handles into tables owned by the scene, mesh, and material systems.
//!
//! Draw calls carry these instead of references, so a renderer destroyed
//! mid-frame leaves a stale index, never a dangling pointer.

use slotmap::new_key_type;

new_key_type! {
    /// A key into the [`MaterialLibrary`](crate::renderer::scene::MaterialLibrary).
    pub struct MaterialId;
}

/// A handle to GPU geometry (vertex + index buffers) owned by the mesh system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryId(pub u32);

/// A stable identifier of a renderable in the scene graph.
///
/// Also used as the last sort key so equal draw calls keep a fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct RenderableId(pub u64);

/// A handle to a texture owned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub usize);
