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

//! Shadow map overlay.

use crate::error::PassError;
use crate::render_lane::priority;
use std::sync::Arc;
use umbra_core::renderer::api::{
    DepthState, RenderTargetDescriptor, TargetSurface, TextureId, Viewport,
};
use umbra_core::renderer::scene::RenderContext;
use umbra_core::renderer::{
    DebugGroup, FrameResources, GraphicsBackend, PassKind, RenderError, RenderPass,
};

/// Shows a shadow map in the bottom-left quarter of the back buffer.
///
/// Disabled until [`set_enabled`](Self::set_enabled) is called.
#[derive(Debug)]
pub struct ShadowMapDebugPass {
    backend: Arc<dyn GraphicsBackend>,
    shadow_map: Option<TextureId>,
    enabled: bool,
}

impl ShadowMapDebugPass {
    /// Creates a disabled pass.
    pub fn new(backend: Arc<dyn GraphicsBackend>) -> Self {
        Self {
            backend,
            shadow_map: None,
            enabled: false,
        }
    }

    /// Turns the overlay on or off.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether the overlay is drawn.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The texture shown, usually
    /// [`ShadowCasterPass::directional_shadow_map`](crate::render_lane::ShadowCasterPass::directional_shadow_map).
    pub fn set_shadow_map(&mut self, shadow_map: Option<TextureId>) {
        self.shadow_map = shadow_map;
    }

    fn draw(&self, context: &RenderContext<'_>) -> Result<(), PassError> {
        let Some(shadow_map) = self.shadow_map.filter(|_| self.enabled) else {
            return Ok(());
        };
        let material = context
            .builtin
            .shadow_map_debug
            .ok_or(PassError::MissingMaterial("shadow_map_debug"))?;

        let backend = self.backend.as_ref();
        let _group = DebugGroup::new(backend, "Shadow Map Debug");
        backend.attach_render_target(&RenderTargetDescriptor::color_backbuffer())?;
        backend.attach_render_target(&RenderTargetDescriptor::empty_depth())?;
        backend.begin_render_pass("Shadow Map Debug")?;

        let side = (context.width.min(context.height) / 4) as f32;
        let viewport = Viewport {
            x: 0.0,
            y: context.height as f32 - side,
            width: side,
            height: side,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        let recorded = backend
            .set_viewport(viewport)
            .and_then(|_| backend.set_depth_state(DepthState::DISABLED))
            .and_then(|_| backend.blit(TargetSurface::Texture(shadow_map), material));
        backend.end_render_pass()?;
        recorded?;
        Ok(())
    }
}

impl RenderPass for ShadowMapDebugPass {
    fn name(&self) -> &str {
        "Shadow Map Debug Pass"
    }

    fn priority(&self) -> i32 {
        priority::SHADOW_MAP_DEBUG
    }

    fn kind(&self) -> PassKind {
        PassKind::Editor
    }

    fn prepare(
        &mut self,
        _context: &RenderContext<'_>,
        _frame: &mut FrameResources,
    ) -> Result<(), RenderError> {
        Ok(())
    }

    fn execute(
        &mut self,
        context: &RenderContext<'_>,
        _frame: &mut FrameResources,
    ) -> Result<(), RenderError> {
        Ok(self.draw(context)?)
    }
}
