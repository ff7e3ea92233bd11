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

//! Forward rendering of the scene: opaque, then skybox, then transparent.

use super::{priority, DrawRenderersPass, SkyboxPass};
use crate::error::PassError;
use std::borrow::Cow;
use std::mem::size_of;
use std::sync::Arc;
use umbra_core::renderer::api::{
    BufferUsage, CameraData, FenceType, GraphicsBackendFence, LightingData, Viewport,
    CAMERA_DATA_BUFFER_NAME, LIGHTING_BUFFER_NAME,
};
use umbra_core::renderer::scene::RenderContext;
use umbra_core::renderer::{
    DebugGroup, FrameResources, GraphicsBackend, GraphicsBuffer, PassKind, RenderError,
    RenderPass,
};

/// Name of the fence signaled once the forward pass is recorded.
pub const FORWARD_PASS_END_FENCE_NAME: &str = "After Forward Pass";

/// Draws the scene into the context's color and depth targets.
///
/// The three sub-passes share one backend render pass and always run in the
/// order opaque, skybox, transparent. Camera and lighting constants are uploaded
/// during `prepare` and bound before the first draw. Once everything is recorded
/// the pass signals a render-to-copy fence that the copy queue can wait on.
#[derive(Debug)]
pub struct ForwardRenderPass {
    backend: Arc<dyn GraphicsBackend>,
    opaque: DrawRenderersPass,
    skybox: SkyboxPass,
    transparent: DrawRenderersPass,
    camera_buffer: GraphicsBuffer,
    lighting_buffer: GraphicsBuffer,
    end_fence: GraphicsBackendFence,
}

impl ForwardRenderPass {
    /// Allocates the constant buffers and the end fence.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot create a buffer or the fence.
    pub fn new(backend: Arc<dyn GraphicsBackend>) -> Result<Self, PassError> {
        let camera_buffer = GraphicsBuffer::new(
            Arc::clone(&backend),
            size_of::<CameraData>() as u64,
            CAMERA_DATA_BUFFER_NAME,
            BufferUsage::CONSTANT,
            true,
        )?;
        let lighting_buffer = GraphicsBuffer::new(
            Arc::clone(&backend),
            size_of::<LightingData>() as u64,
            LIGHTING_BUFFER_NAME,
            BufferUsage::CONSTANT,
            true,
        )?;
        let end_fence = backend.create_fence(
            FenceType::RenderToCopy,
            Cow::Borrowed(FORWARD_PASS_END_FENCE_NAME),
        )?;

        Ok(Self {
            backend,
            opaque: DrawRenderersPass::opaque(1),
            skybox: SkyboxPass::new(),
            transparent: DrawRenderersPass::transparent(3),
            camera_buffer,
            lighting_buffer,
            end_fence,
        })
    }

    /// The fence signaled at the end of every `execute`.
    pub fn end_fence(&self) -> &GraphicsBackendFence {
        &self.end_fence
    }

    /// The opaque sub-pass.
    pub fn opaque(&self) -> &DrawRenderersPass {
        &self.opaque
    }

    /// The transparent sub-pass.
    pub fn transparent(&self) -> &DrawRenderersPass {
        &self.transparent
    }

    fn prepare_inner(
        &mut self,
        context: &RenderContext<'_>,
        frame: &mut FrameResources,
    ) -> Result<(), PassError> {
        let view_projection = context.camera.view_projection();
        self.opaque.prepare_view(&view_projection, context, frame)?;
        self.skybox.prepare(context, frame)?;
        self.transparent
            .prepare_view(&view_projection, context, frame)?;

        let camera = context.camera.camera_data();
        self.camera_buffer.set_data(bytemuck::bytes_of(&camera), 0)?;
        let lighting = context.lights.lighting_data(context.ambient_light);
        self.lighting_buffer
            .set_data(bytemuck::bytes_of(&lighting), 0)?;

        log::trace!(
            "ForwardRenderPass: {} opaque, {} transparent draw calls",
            self.opaque.queue().draw_calls().len(),
            self.transparent.queue().draw_calls().len()
        );
        Ok(())
    }

    fn execute_inner(
        &mut self,
        context: &RenderContext<'_>,
        frame: &mut FrameResources,
    ) -> Result<(), PassError> {
        let backend = Arc::clone(&self.backend);
        {
            let _group = DebugGroup::new(backend.as_ref(), "Forward Pass");

            backend.attach_render_target(&context.color_target)?;
            backend.attach_render_target(&context.depth_target)?;
            backend.begin_render_pass("Forward Pass")?;
            backend.set_viewport(Viewport::from_size(context.width, context.height))?;
            backend.bind_constant_buffer(
                CAMERA_DATA_BUFFER_NAME,
                self.camera_buffer.whole_binding(),
            )?;
            backend.bind_constant_buffer(
                LIGHTING_BUFFER_NAME,
                self.lighting_buffer.whole_binding(),
            )?;

            let recorded = self
                .opaque
                .record(frame)
                .and_then(|_| self.skybox.record(frame))
                .and_then(|_| self.transparent.record(frame));
            backend.end_render_pass()?;
            recorded?;
        }

        backend.signal_fence(&self.end_fence)?;
        Ok(())
    }
}

impl RenderPass for ForwardRenderPass {
    fn name(&self) -> &str {
        "Forward Pass"
    }

    fn priority(&self) -> i32 {
        priority::FORWARD
    }

    fn kind(&self) -> PassKind {
        PassKind::Scene
    }

    fn prepare(
        &mut self,
        context: &RenderContext<'_>,
        frame: &mut FrameResources,
    ) -> Result<(), RenderError> {
        Ok(self.prepare_inner(context, frame)?)
    }

    fn execute(
        &mut self,
        context: &RenderContext<'_>,
        frame: &mut FrameResources,
    ) -> Result<(), RenderError> {
        Ok(self.execute_inner(context, frame)?)
    }
}

impl Drop for ForwardRenderPass {
    fn drop(&mut self) {
        if let Err(err) = self.backend.delete_fence(&self.end_fence) {
            log::warn!(
                "ForwardRenderPass: failed to delete fence '{}': {}",
                self.end_fence.name,
                err
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_core::math::{Bounds, Mat4, Vec3};
    use umbra_core::renderer::api::{FenceState, GeometryId, RenderableId};
    use umbra_core::renderer::scene::{
        CameraView, Material, MaterialLibrary, Renderable, SceneLights, Skybox,
    };
    use umbra_core::renderer::{CullingSettings, GraphicsSettings};
    use umbra_infra::{BackendCommand, HeadlessBackend};

    fn cube(id: u64, z: f32, geometry: u32, material: umbra_core::renderer::api::MaterialId) -> Renderable {
        Renderable::new(
            RenderableId(id),
            Mat4::from_translation(Vec3::new(0.0, 0.0, z)),
            Bounds::from_center_extents(Vec3::ZERO, Vec3::splat(0.5)),
            GeometryId(geometry),
            material,
        )
    }

    #[test]
    fn test_sub_passes_run_opaque_skybox_transparent() {
        let backend = Arc::new(HeadlessBackend::new());
        let mut frame = FrameResources::new(backend.clone(), CullingSettings::default()).unwrap();
        let mut materials = MaterialLibrary::new();
        let stone = materials.insert(Material::new("Stone"));
        let glass = materials.insert(Material::new("Glass").with_render_queue(3000));
        let sky = materials.insert(Material::new("Sky"));
        let scene = vec![cube(1, -5.0, 10, glass), cube(2, -8.0, 20, stone)];
        let lights = SceneLights::default();
        let settings = GraphicsSettings::default();
        let camera = CameraView::perspective(Vec3::ZERO, Vec3::NEG_Z, 1.0, 1.0, 0.1, 100.0);
        let mut context =
            RenderContext::new(&scene, &materials, &lights, &settings, camera, 128, 128);
        context.skybox = Some(Skybox {
            geometry: GeometryId(30),
            material: sky,
        });

        let mut pass = ForwardRenderPass::new(backend.clone()).unwrap();
        frame.begin_frame().unwrap();
        pass.prepare(&context, &mut frame).unwrap();
        pass.execute(&context, &mut frame).unwrap();

        let geometries: Vec<u32> = backend
            .commands()
            .iter()
            .filter_map(|c| match c {
                BackendCommand::DrawElements { geometry, .. } => Some(geometry.0),
                _ => None,
            })
            .collect();
        assert_eq!(geometries, vec![20, 30, 10]);
        assert_eq!(
            backend.fence_state(pass.end_fence()).unwrap(),
            FenceState::Signaled
        );
        assert_eq!(frame.counters.draw_calls, 3);
    }

    #[test]
    fn test_fence_is_deleted_on_drop() {
        let backend = Arc::new(HeadlessBackend::new());
        let pass = ForwardRenderPass::new(backend.clone()).unwrap();
        assert_eq!(backend.live_fences(), 1);
        drop(pass);
        assert_eq!(backend.live_fences(), 0);
    }
}
