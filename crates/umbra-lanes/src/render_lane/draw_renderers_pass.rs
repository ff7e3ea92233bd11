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

//! A named draw of the scene with its own [`RenderSettings`].

use super::RenderQueue;
use crate::error::PassError;
use std::sync::Arc;
use umbra_core::math::Mat4;
use umbra_core::renderer::api::{DepthFunction, DepthState, Viewport};
use umbra_core::renderer::scene::RenderContext;
use umbra_core::renderer::{
    DebugGroup, DrawCallFilter, FrameResources, PassKind, RenderError, RenderPass, RenderSettings,
};

/// Draws every renderable accepted by its settings.
///
/// Used as a sub-pass by [`ForwardRenderPass`](super::ForwardRenderPass), which
/// shares one backend render pass between its sub-passes. Run on its own, it
/// opens a render pass on the context's color and depth targets and expects
/// camera constants to be bound already.
#[derive(Debug)]
pub struct DrawRenderersPass {
    name: String,
    priority: i32,
    settings: RenderSettings,
    queue: RenderQueue,
}

impl DrawRenderersPass {
    /// Creates a sub-pass.
    pub fn new(name: impl Into<String>, priority: i32, settings: RenderSettings) -> Self {
        Self {
            name: name.into(),
            priority,
            settings,
            queue: RenderQueue::new(),
        }
    }

    /// Front-to-back draw of opaque render queues.
    pub fn opaque(priority: i32) -> Self {
        Self::new("Opaque", priority, RenderSettings::opaque())
    }

    /// Back-to-front draw of transparent render queues.
    pub fn transparent(priority: i32) -> Self {
        Self::new("Transparent", priority, RenderSettings::transparent())
    }

    /// The settings the queue is built with.
    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Mutable access to the settings, applied on the next `prepare`.
    pub fn settings_mut(&mut self) -> &mut RenderSettings {
        &mut self.settings
    }

    /// The queue built by the last `prepare`.
    pub fn queue(&self) -> &RenderQueue {
        &self.queue
    }

    /// Builds the queue for `view_projection`.
    pub fn prepare_view(
        &mut self,
        view_projection: &Mat4,
        context: &RenderContext<'_>,
        frame: &mut FrameResources,
    ) -> Result<(), PassError> {
        self.queue.prepare(
            view_projection,
            context.renderables,
            context.materials,
            &self.settings,
            frame,
        )?;
        Ok(())
    }

    /// Issues the queue's draws into the render pass currently open.
    ///
    /// Transparent draws test depth without writing it.
    pub fn record(&self, frame: &mut FrameResources) -> Result<usize, PassError> {
        if self.queue.is_empty() {
            return Ok(0);
        }
        let backend = Arc::clone(frame.backend());
        let _group = DebugGroup::new(backend.as_ref(), &self.name);

        let depth = match self.settings.filter {
            DrawCallFilter::Transparent => DepthState {
                write_enabled: false,
                function: DepthFunction::LessEqual,
            },
            _ => DepthState::DEFAULT,
        };
        backend.set_depth_state(depth)?;
        Ok(self.queue.submit(backend.as_ref(), frame)?)
    }
}

impl RenderPass for DrawRenderersPass {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn kind(&self) -> PassKind {
        PassKind::Scene
    }

    fn prepare(
        &mut self,
        context: &RenderContext<'_>,
        frame: &mut FrameResources,
    ) -> Result<(), RenderError> {
        let view_projection = context.camera.view_projection();
        Ok(self.prepare_view(&view_projection, context, frame)?)
    }

    fn execute(
        &mut self,
        context: &RenderContext<'_>,
        frame: &mut FrameResources,
    ) -> Result<(), RenderError> {
        let backend = Arc::clone(frame.backend());
        backend.attach_render_target(&context.color_target)?;
        backend.attach_render_target(&context.depth_target)?;
        backend.begin_render_pass(&self.name)?;
        backend.set_viewport(Viewport::from_size(context.width, context.height))?;
        let recorded = self.record(frame);
        backend.end_render_pass()?;
        recorded?;
        Ok(())
    }
}
