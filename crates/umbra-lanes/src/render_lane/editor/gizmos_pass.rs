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

//! Gizmo handles drawn over the scene.

use super::keep_contents;
use crate::error::PassError;
use crate::render_lane::priority;
use std::mem::size_of;
use std::sync::Arc;
use umbra_core::renderer::api::{
    BufferUsage, CameraData, DepthState, GeometryId, PerDrawData, Viewport,
    CAMERA_DATA_BUFFER_NAME,
};
use umbra_core::renderer::scene::RenderContext;
use umbra_core::renderer::{
    DebugGroup, FrameResources, GraphicsBackend, GraphicsBuffer, PassKind, RenderError,
    RenderPass,
};

/// Draws the context's gizmo primitives with the gizmos material, depth tested
/// against the scene.
#[derive(Debug)]
pub struct GizmosPass {
    backend: Arc<dyn GraphicsBackend>,
    camera_buffer: GraphicsBuffer,
    draws: Vec<(GeometryId, u64)>,
}

impl GizmosPass {
    /// Allocates the pass's camera constants.
    pub fn new(backend: Arc<dyn GraphicsBackend>) -> Result<Self, PassError> {
        let camera_buffer = GraphicsBuffer::new(
            Arc::clone(&backend),
            size_of::<CameraData>() as u64,
            "GizmosCameraData",
            BufferUsage::CONSTANT,
            true,
        )?;
        Ok(Self {
            backend,
            camera_buffer,
            draws: Vec::new(),
        })
    }

    /// Number of gizmo draws prepared for this frame.
    pub fn draw_count(&self) -> usize {
        self.draws.len()
    }

    fn prepare_inner(
        &mut self,
        context: &RenderContext<'_>,
        frame: &mut FrameResources,
    ) -> Result<(), PassError> {
        self.draws.clear();
        if context.gizmos.is_empty() {
            return Ok(());
        }
        let camera = context.camera.camera_data();
        self.camera_buffer.set_data(bytemuck::bytes_of(&camera), 0)?;
        for gizmo in context.gizmos {
            let data = PerDrawData::from_model(gizmo.transform);
            if let Some(offset) = frame.per_draw.try_set_data(bytemuck::bytes_of(&data))? {
                self.draws.push((gizmo.geometry, offset));
            }
        }
        Ok(())
    }

    fn execute_inner(
        &mut self,
        context: &RenderContext<'_>,
        frame: &mut FrameResources,
    ) -> Result<(), PassError> {
        if self.draws.is_empty() {
            return Ok(());
        }
        let material = context
            .builtin
            .gizmos
            .ok_or(PassError::MissingMaterial("gizmos"))?;

        let backend = Arc::clone(&self.backend);
        let _group = DebugGroup::new(backend.as_ref(), "Gizmos");
        backend.attach_render_target(&keep_contents(context.color_target))?;
        backend.attach_render_target(&keep_contents(context.depth_target))?;
        backend.begin_render_pass("Gizmos")?;

        let recorded = (|| -> Result<(), PassError> {
            backend.set_viewport(Viewport::from_size(context.width, context.height))?;
            backend.set_depth_state(DepthState::DEFAULT)?;
            backend.bind_constant_buffer(CAMERA_DATA_BUFFER_NAME, self.camera_buffer.whole_binding())?;
            for &(geometry, offset) in &self.draws {
                let binding = frame
                    .per_draw
                    .binding(offset, size_of::<PerDrawData>() as u64);
                backend.draw_elements(geometry, material, binding)?;
                frame.counters.draw_calls += 1;
                frame.counters.instances += 1;
            }
            Ok(())
        })();
        backend.end_render_pass()?;
        recorded
    }
}

impl RenderPass for GizmosPass {
    fn name(&self) -> &str {
        "Gizmos Pass"
    }

    fn priority(&self) -> i32 {
        priority::GIZMOS
    }

    fn kind(&self) -> PassKind {
        PassKind::Editor
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
