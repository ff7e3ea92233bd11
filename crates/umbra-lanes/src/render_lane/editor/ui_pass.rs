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

//! Screen-space UI quads.

use crate::error::PassError;
use crate::render_lane::priority;
use std::mem::size_of;
use std::sync::Arc;
use umbra_core::renderer::api::{
    DepthState, GeometryId, PerDrawData, RenderTargetDescriptor, Viewport,
};
use umbra_core::renderer::scene::{OverlayDraw, RenderContext};
use umbra_core::renderer::{
    DebugGroup, FrameResources, GraphicsBackend, PassKind, RenderError, RenderPass,
};

/// Draws the context's UI quads on the back buffer, back to front, without depth.
#[derive(Debug)]
pub struct UIRenderPass {
    backend: Arc<dyn GraphicsBackend>,
    draws: Vec<(GeometryId, u64)>,
}

impl UIRenderPass {
    /// Creates the pass.
    pub fn new(backend: Arc<dyn GraphicsBackend>) -> Self {
        Self {
            backend,
            draws: Vec::new(),
        }
    }

    /// Geometries in draw order, as prepared for this frame.
    pub fn draw_order(&self) -> Vec<GeometryId> {
        self.draws.iter().map(|(geometry, _)| *geometry).collect()
    }

    fn prepare_inner(
        &mut self,
        context: &RenderContext<'_>,
        frame: &mut FrameResources,
    ) -> Result<(), PassError> {
        self.draws.clear();
        let mut quads: Vec<&OverlayDraw> = context.ui.iter().collect();
        quads.sort_by(|a, b| b.depth.total_cmp(&a.depth));
        for quad in quads {
            let data = PerDrawData::from_model(quad.transform);
            if let Some(offset) = frame.per_draw.try_set_data(bytemuck::bytes_of(&data))? {
                self.draws.push((quad.geometry, offset));
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
        let material = context.builtin.ui.ok_or(PassError::MissingMaterial("ui"))?;

        let backend = Arc::clone(&self.backend);
        let _group = DebugGroup::new(backend.as_ref(), "UI");
        backend.attach_render_target(&RenderTargetDescriptor::color_backbuffer())?;
        backend.attach_render_target(&RenderTargetDescriptor::empty_depth())?;
        backend.begin_render_pass("UI")?;

        let recorded = (|| -> Result<(), PassError> {
            backend.set_viewport(Viewport::from_size(context.width, context.height))?;
            backend.set_depth_state(DepthState::DISABLED)?;
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

impl RenderPass for UIRenderPass {
    fn name(&self) -> &str {
        "UI Render Pass"
    }

    fn priority(&self) -> i32 {
        priority::UI
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
