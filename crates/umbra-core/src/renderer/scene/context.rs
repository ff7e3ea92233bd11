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

//! The read-only view of a frame that every pass receives.

use super::{MaterialLibrary, Renderable, SceneLights};
use crate::math::{Mat4, Vec3};
use crate::renderer::api::{CameraData, GeometryId, MaterialId, RenderTargetDescriptor, RenderableId};
use crate::renderer::settings::GraphicsSettings;

/// The camera a frame is rendered from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    /// World-to-view matrix.
    pub view: Mat4,
    /// View-to-clip matrix.
    pub projection: Mat4,
    /// Near clip distance.
    pub near: f32,
    /// Far clip distance.
    pub far: f32,
    /// Vertical field of view in radians, used to slice shadow cascades.
    pub fov_y: f32,
    /// Width over height.
    pub aspect: f32,
}

impl CameraView {
    /// A right-handed perspective camera looking from `eye` at `target`.
    pub fn perspective(eye: Vec3, target: Vec3, fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            view: Mat4::look_at_rh(eye, target, Vec3::Y),
            projection: Mat4::perspective_rh_gl(fov_y, aspect, near, far),
            near,
            far,
            fov_y,
            aspect,
        }
    }

    /// `projection * view`.
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    /// Camera constants for shaders.
    pub fn camera_data(&self) -> CameraData {
        CameraData::new(self.view, self.projection, self.near, self.far)
    }
}

/// Geometry and material of the sky cube.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Skybox {
    /// The cube geometry.
    pub geometry: GeometryId,
    /// The skybox material.
    pub material: MaterialId,
}

/// An editor overlay primitive: gizmo handles or UI quads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayDraw {
    /// Geometry to draw.
    pub geometry: GeometryId,
    /// Object-to-world (gizmos) or object-to-screen (UI) transform.
    pub transform: Mat4,
    /// Sort depth; larger draws first for UI.
    pub depth: f32,
}

/// Materials of the built-in passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuiltinMaterials {
    /// Depth-only material used for shadow maps.
    pub shadow_caster: Option<MaterialId>,
    /// Full-screen tonemapping blit.
    pub final_blit: Option<MaterialId>,
    /// Flat color written into the outline mask.
    pub outline_mask: Option<MaterialId>,
    /// Composites the outline mask over the back buffer.
    pub outline_composite: Option<MaterialId>,
    /// Shadow map visualization.
    pub shadow_map_debug: Option<MaterialId>,
    /// Gizmo handles.
    pub gizmos: Option<MaterialId>,
    /// UI quads.
    pub ui: Option<MaterialId>,
}

/// Everything a pass may read about the frame being rendered.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// Objects to draw.
    pub renderables: &'a [Renderable],
    /// The material table.
    pub materials: &'a MaterialLibrary,
    /// Lights of the frame.
    pub lights: &'a SceneLights,
    /// Ambient light color.
    pub ambient_light: Vec3,
    /// The main camera.
    pub camera: CameraView,
    /// The sky cube, if any.
    pub skybox: Option<Skybox>,
    /// Global rendering settings.
    pub settings: &'a GraphicsSettings,
    /// Materials of the built-in passes.
    pub builtin: BuiltinMaterials,
    /// Viewport width in pixels.
    pub width: u32,
    /// Viewport height in pixels.
    pub height: u32,
    /// Color target of the scene passes.
    pub color_target: RenderTargetDescriptor,
    /// Depth target of the scene passes.
    pub depth_target: RenderTargetDescriptor,
    /// Renderables selected in the editor.
    pub selected: &'a [RenderableId],
    /// Gizmo primitives queued this frame.
    pub gizmos: &'a [OverlayDraw],
    /// UI quads queued this frame.
    pub ui: &'a [OverlayDraw],
}

impl<'a> RenderContext<'a> {
    /// A context drawing `renderables` from `camera` into the back buffer.
    pub fn new(
        renderables: &'a [Renderable],
        materials: &'a MaterialLibrary,
        lights: &'a SceneLights,
        settings: &'a GraphicsSettings,
        camera: CameraView,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            renderables,
            materials,
            lights,
            ambient_light: Vec3::splat(0.03),
            camera,
            skybox: None,
            settings,
            builtin: BuiltinMaterials::default(),
            width,
            height,
            color_target: RenderTargetDescriptor::color_backbuffer(),
            depth_target: RenderTargetDescriptor::depth_backbuffer(),
            selected: &[],
            gizmos: &[],
            ui: &[],
        }
    }

    /// Renderables whose id is in [`selected`](Self::selected).
    pub fn selected_renderables(&self) -> Vec<Renderable> {
        self.renderables
            .iter()
            .filter(|r| self.selected.contains(&r.id))
            .cloned()
            .collect()
    }
}
