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

//! Rendering lane - render queues and the passes that record them.

mod copy_depth_pass;
mod draw_renderers_pass;
mod final_blit_pass;
mod forward_pass;
mod render_queue;
mod shadow_caster_pass;
mod skybox_pass;

#[cfg(feature = "editor")]
pub mod editor;

pub use copy_depth_pass::*;
pub use draw_renderers_pass::*;
pub use final_blit_pass::*;
pub use forward_pass::*;
pub use render_queue::*;
pub use shadow_caster_pass::*;
pub use skybox_pass::*;

/// Default priorities of the built-in passes. Lower runs first.
pub mod priority {
    /// Light-space depth of every shadow-casting light.
    pub const SHADOW_CASTER: i32 = 100;
    /// Opaque, skybox and transparent scene geometry.
    pub const FORWARD: i32 = 200;
    /// Depth copy on the copy queue.
    pub const COPY_DEPTH: i32 = 300;
    /// Outline around selected renderables.
    pub const SELECTION_OUTLINE: i32 = 400;
    /// Gizmo handles.
    pub const GIZMOS: i32 = 410;
    /// Tonemapping blit to the back buffer.
    pub const FINAL_BLIT: i32 = 500;
    /// Shadow map overlay, drawn on the back buffer.
    pub const SHADOW_MAP_DEBUG: i32 = 600;
    /// UI quads, drawn last on the back buffer.
    pub const UI: i32 = 700;
}
