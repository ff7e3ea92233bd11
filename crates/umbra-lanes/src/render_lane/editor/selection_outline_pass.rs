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

//! Outline around the renderables selected in the editor.

use super::keep_contents;
use crate::error::PassError;
use crate::render_lane::{priority, RenderQueue};
use std::mem::size_of;
use std::sync::Arc;
use umbra_core::renderer::api::{
    BufferUsage, DepthState, OutlineData, RenderTargetDescriptor, ResourceState, TargetSurface,
    TextureDescriptor, TextureFormat, TextureId, Viewport,
};
use umbra_core::renderer::scene::RenderContext;
use umbra_core::renderer::{
    DebugGroup, FrameResources, GraphicsBackend, GraphicsBuffer, PassKind, RenderError,
    RenderPass, RenderSettings,
};

/// Default outline color.
pub const OUTLINE_COLOR: [f32; 4] = [1.0, 0.73, 0.0, 1.0];
/// Name of the outline constant buffer.
pub const OUTLINE_DATA_BUFFER_NAME: &str = "OutlineData";

#[derive(Debug, Clone, Copy)]
struct OutlineTargets {
    width: u32,
    height: u32,
    color: TextureId,
    depth: TextureId,
}

/// Draws the selection into an offscreen mask, then composites the mask's edges
/// over the scene color.
///
/// The mask draw reuses the camera constants bound by the forward pass.
#[derive(Debug)]
pub struct SelectionOutlinePass {
    backend: Arc<dyn GraphicsBackend>,
    outline_buffer: GraphicsBuffer,
    queue: RenderQueue,
    targets: Option<OutlineTargets>,
    color: [f32; 4],
}

impl SelectionOutlinePass {
    /// Allocates the outline constant buffer. Mask textures follow the viewport size.
    pub fn new(backend: Arc<dyn GraphicsBackend>) -> Result<Self, PassError> {
        let outline_buffer = GraphicsBuffer::new(
            Arc::clone(&backend),
            size_of::<OutlineData>() as u64,
            OUTLINE_DATA_BUFFER_NAME,
            BufferUsage::CONSTANT,
            true,
        )?;
        Ok(Self {
            backend,
            outline_buffer,
            queue: RenderQueue::new(),
            targets: None,
            color: OUTLINE_COLOR,
        })
    }

    /// Changes the outline color.
    pub fn set_color(&mut self, color: [f32; 4]) {
        self.color = color;
    }

    /// The selection draws of the last `prepare`.
    pub fn queue(&self) -> &RenderQueue {
        &self.queue
    }

    fn ensure_targets(&mut self, width: u32, height: u32) -> Result<OutlineTargets, PassError> {
        let (width, height) = (width.max(1), height.max(1));
        if let Some(targets) = self.targets {
            if targets.width == width && targets.height == height {
                return Ok(targets);
            }
            self.release_targets();
        }
        let color = self.backend.create_texture(&TextureDescriptor::new_2d(
            "Selection Outline Mask",
            width,
            height,
            TextureFormat::Rgba8Unorm,
        ))?;
        let depth = self.backend.create_texture(&TextureDescriptor::new_2d(
            "Selection Outline Depth",
            width,
            height,
            TextureFormat::Depth32Float,
        ))?;
        let targets = OutlineTargets {
            width,
            height,
            color,
            depth,
        };
        self.targets = Some(targets);
        Ok(targets)
    }

    fn release_targets(&mut self) {
        let Some(targets) = self.targets.take() else {
            return;
        };
        for texture in [targets.color, targets.depth] {
            if let Err(err) = self.backend.delete_texture(texture) {
                log::warn!("SelectionOutlinePass: failed to delete {texture:?}: {err}");
            }
        }
    }

    fn prepare_inner(
        &mut self,
        context: &RenderContext<'_>,
        frame: &mut FrameResources,
    ) -> Result<(), PassError> {
        let selected = context.selected_renderables();
        if selected.is_empty() {
            self.queue.clear();
            return Ok(());
        }
        let mask = context
            .builtin
            .outline_mask
            .ok_or(PassError::MissingMaterial("outline_mask"))?;
        self.ensure_targets(context.width, context.height)?;

        let settings = RenderSettings::default().with_override_material(mask);
        self.queue.prepare(
            &context.camera.view_projection(),
            &selected,
            context.materials,
            &settings,
            frame,
        )?;
        let data = OutlineData { color: self.color };
        self.outline_buffer
            .set_data(bytemuck::bytes_of(&data), 0)?;
        Ok(())
    }

    fn execute_inner(
        &mut self,
        context: &RenderContext<'_>,
        frame: &mut FrameResources,
    ) -> Result<(), PassError> {
        let Some(targets) = self.targets.filter(|_| !self.queue.is_empty()) else {
            return Ok(());
        };
        let composite = context
            .builtin
            .outline_composite
            .ok_or(PassError::MissingMaterial("outline_composite"))?;

        let backend = Arc::clone(&self.backend);
        let _group = DebugGroup::new(backend.as_ref(), "Selection Outline");
        let viewport = Viewport::from_size(context.width, context.height);
        let mask = RenderTargetDescriptor::color(targets.color);

        backend.transition_render_target(&mask, ResourceState::RenderTarget)?;
        backend.attach_render_target(&mask.cleared([0.0; 4]))?;
        backend.attach_render_target(&RenderTargetDescriptor::depth(targets.depth).cleared_depth(1.0))?;
        backend.begin_render_pass("Selection Outline Mask")?;
        let masked = backend
            .set_viewport(viewport)
            .and_then(|_| backend.set_depth_state(DepthState::DEFAULT))
            .and_then(|_| self.queue.submit(backend.as_ref(), frame).map(|_| ()));
        backend.end_render_pass()?;
        masked?;
        backend.transition_render_target(&mask, ResourceState::ShaderResource)?;

        backend.attach_render_target(&keep_contents(context.color_target))?;
        backend.attach_render_target(&RenderTargetDescriptor::empty_depth())?;
        backend.begin_render_pass("Selection Outline Composite")?;
        let composited = backend
            .set_viewport(viewport)
            .and_then(|_| backend.set_depth_state(DepthState::DISABLED))
            .and_then(|_| {
                backend.bind_constant_buffer(
                    OUTLINE_DATA_BUFFER_NAME,
                    self.outline_buffer.whole_binding(),
                )
            })
            .and_then(|_| backend.blit(TargetSurface::Texture(targets.color), composite));
        backend.end_render_pass()?;
        composited?;
        Ok(())
    }
}

impl RenderPass for SelectionOutlinePass {
    fn name(&self) -> &str {
        "Selection Outline Pass"
    }

    fn priority(&self) -> i32 {
        priority::SELECTION_OUTLINE
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

impl Drop for SelectionOutlinePass {
    fn drop(&mut self) {
        self.release_targets();
    }
}
