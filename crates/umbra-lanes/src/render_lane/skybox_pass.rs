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

//! Sky cube drawn behind the opaque geometry.

use crate::error::PassError;
use std::mem::size_of;
use std::sync::Arc;
use umbra_core::math::Mat4;
use umbra_core::renderer::api::{DepthFunction, DepthState, PerDrawData};
use umbra_core::renderer::scene::{RenderContext, Skybox};
use umbra_core::renderer::{DebugGroup, FrameResources};

/// Depth state of the sky cube: tested against the cleared far plane, never written.
pub const SKYBOX_DEPTH_STATE: DepthState = DepthState {
    write_enabled: false,
    function: DepthFunction::LessEqual,
};

/// Draws the context's skybox, if any.
///
/// The pass keeps no state between frames besides the ring buffer offset of the
/// identity model matrix written by the last `prepare`.
#[derive(Debug, Default)]
pub struct SkyboxPass {
    draw: Option<(Skybox, u64)>,
}

impl SkyboxPass {
    /// Creates the pass.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads the cube's model matrix when the context has a skybox.
    pub fn prepare(
        &mut self,
        context: &RenderContext<'_>,
        frame: &mut FrameResources,
    ) -> Result<(), PassError> {
        self.draw = None;
        if let Some(skybox) = context.skybox {
            let data = PerDrawData::from_model(Mat4::IDENTITY);
            let offset = frame.per_draw.try_set_data(bytemuck::bytes_of(&data))?;
            self.draw = offset.map(|offset| (skybox, offset));
        }
        Ok(())
    }

    /// Draws the cube into the render pass currently open.
    pub fn record(&self, frame: &mut FrameResources) -> Result<(), PassError> {
        let Some((skybox, offset)) = self.draw else {
            return Ok(());
        };
        let backend = Arc::clone(frame.backend());
        let _group = DebugGroup::new(backend.as_ref(), "Skybox");

        backend.set_depth_state(SKYBOX_DEPTH_STATE)?;
        let binding = frame
            .per_draw
            .binding(offset, size_of::<PerDrawData>() as u64);
        backend.draw_elements(skybox.geometry, skybox.material, binding)?;
        frame.counters.draw_calls += 1;
        frame.counters.instances += 1;
        Ok(())
    }
}
