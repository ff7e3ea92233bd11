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

//! Tonemapping blit of the scene color into the back buffer.

use super::priority;
use crate::error::PassError;
use std::mem::size_of;
use std::sync::Arc;
use umbra_core::renderer::api::{
    BlitData, BufferUsage, DepthState, RenderTargetDescriptor, ResourceState, TargetSurface,
    Viewport,
};
use umbra_core::renderer::scene::RenderContext;
use umbra_core::renderer::{
    DebugGroup, FrameResources, GraphicsBackend, GraphicsBuffer, PassKind, RenderError,
    RenderPass,
};

/// Name of the blit constant buffer.
pub const BLIT_DATA_BUFFER_NAME: &str = "BlitData";

/// Resolves the context's color target to the back buffer.
///
/// Does nothing when the scene already renders to the back buffer.
#[derive(Debug)]
pub struct FinalBlitPass {
    backend: Arc<dyn GraphicsBackend>,
    blit_buffer: GraphicsBuffer,
}

impl FinalBlitPass {
    /// Allocates the blit constant buffer.
    pub fn new(backend: Arc<dyn GraphicsBackend>) -> Result<Self, PassError> {
        let blit_buffer = GraphicsBuffer::new(
            Arc::clone(&backend),
            size_of::<BlitData>() as u64,
            BLIT_DATA_BUFFER_NAME,
            BufferUsage::CONSTANT,
            true,
        )?;
        Ok(Self {
            backend,
            blit_buffer,
        })
    }

    fn source(context: &RenderContext<'_>) -> Option<TargetSurface> {
        match context.color_target.surface {
            TargetSurface::Texture(texture) => Some(TargetSurface::Texture(texture)),
            _ => None,
        }
    }

    fn blit(&self, context: &RenderContext<'_>) -> Result<(), PassError> {
        let Some(source) = Self::source(context) else {
            return Ok(());
        };
        let material = context
            .builtin
            .final_blit
            .ok_or(PassError::MissingMaterial("final_blit"))?;

        let backend = self.backend.as_ref();
        let _group = DebugGroup::new(backend, "Final Blit");
        backend.transition_render_target(&context.color_target, ResourceState::ShaderResource)?;
        backend.attach_render_target(&RenderTargetDescriptor::color_backbuffer())?;
        backend.attach_render_target(&RenderTargetDescriptor::empty_depth())?;
        backend.begin_render_pass("Final Blit")?;
        let recorded = (|| -> Result<(), PassError> {
            backend.set_viewport(Viewport::from_size(context.width, context.height))?;
            backend.set_depth_state(DepthState::DISABLED)?;
            backend.bind_constant_buffer(BLIT_DATA_BUFFER_NAME, self.blit_buffer.whole_binding())?;
            backend.blit(source, material)?;
            Ok(())
        })();
        backend.end_render_pass()?;
        recorded?;
        backend.transition_render_target(&context.color_target, ResourceState::RenderTarget)?;
        Ok(())
    }
}

impl RenderPass for FinalBlitPass {
    fn name(&self) -> &str {
        "Final Blit Pass"
    }

    fn priority(&self) -> i32 {
        priority::FINAL_BLIT
    }

    fn kind(&self) -> PassKind {
        PassKind::PostProcess
    }

    fn prepare(
        &mut self,
        context: &RenderContext<'_>,
        _frame: &mut FrameResources,
    ) -> Result<(), RenderError> {
        let data = context.settings.blit_data();
        self.blit_buffer
            .set_data(bytemuck::bytes_of(&data), 0)?;
        Ok(())
    }

    fn execute(
        &mut self,
        context: &RenderContext<'_>,
        _frame: &mut FrameResources,
    ) -> Result<(), RenderError> {
        Ok(self.blit(context)?)
    }
}
