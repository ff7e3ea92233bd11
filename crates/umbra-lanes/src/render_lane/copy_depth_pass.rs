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

//! Copies the scene depth on the copy queue.

use super::priority;
use crate::error::PassError;
use std::borrow::Cow;
use std::sync::Arc;
use umbra_core::renderer::api::{
    FenceType, GraphicsBackendFence, RenderTargetDescriptor, ResourceState,
};
use umbra_core::renderer::scene::RenderContext;
use umbra_core::renderer::{
    DebugGroup, FrameResources, GraphicsBackend, PassKind, RenderError, RenderPass,
};

/// Name of the fence signaled once the copy is recorded.
pub const COPY_DEPTH_END_FENCE_NAME: &str = "After Depth Copy";

/// Copies the context's depth target into a destination texture.
///
/// The copy queue first waits on `start_fence` (usually the forward pass end
/// fence), then copies, signals the pass's own copy-to-render fence and waits on
/// it right away so the render queue sees the copied depth. Executing twice in a
/// row with the same start fence is valid: waits on a signaled fence are no-ops.
#[derive(Debug)]
pub struct CopyDepthPass {
    backend: Arc<dyn GraphicsBackend>,
    start_fence: GraphicsBackendFence,
    end_fence: GraphicsBackendFence,
    destination: RenderTargetDescriptor,
}

impl CopyDepthPass {
    /// Creates the pass and its end fence.
    ///
    /// `start_fence` stays owned by whoever created it.
    pub fn new(
        backend: Arc<dyn GraphicsBackend>,
        start_fence: GraphicsBackendFence,
        destination: RenderTargetDescriptor,
    ) -> Result<Self, PassError> {
        let end_fence = backend.create_fence(
            FenceType::CopyToRender,
            Cow::Borrowed(COPY_DEPTH_END_FENCE_NAME),
        )?;
        Ok(Self {
            backend,
            start_fence,
            end_fence,
            destination,
        })
    }

    /// The fence signaled after every copy.
    pub fn end_fence(&self) -> &GraphicsBackendFence {
        &self.end_fence
    }

    /// The texture depth is copied into.
    pub fn destination(&self) -> &RenderTargetDescriptor {
        &self.destination
    }

    fn copy(&self, source: &RenderTargetDescriptor) -> Result<(), PassError> {
        let backend = self.backend.as_ref();
        let _group = DebugGroup::new(backend, "Copy Depth");

        backend.wait_for_fence(&self.start_fence)?;

        backend.transition_render_target(source, ResourceState::CopySource)?;
        backend.transition_render_target(&self.destination, ResourceState::CopyDestination)?;
        backend.begin_copy_pass("Copy Depth To Backbuffer")?;
        let copied = backend.copy_texture_to_texture(source, &self.destination);
        backend.end_copy_pass()?;
        copied?;
        backend.transition_render_target(source, ResourceState::RenderTarget)?;
        backend.transition_render_target(&self.destination, ResourceState::ShaderResource)?;

        backend.signal_fence(&self.end_fence)?;
        backend.wait_for_fence(&self.end_fence)?;
        Ok(())
    }
}

impl RenderPass for CopyDepthPass {
    fn name(&self) -> &str {
        "Copy Depth Pass"
    }

    fn priority(&self) -> i32 {
        priority::COPY_DEPTH
    }

    fn kind(&self) -> PassKind {
        PassKind::Copy
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
        Ok(self.copy(&context.depth_target)?)
    }
}

impl Drop for CopyDepthPass {
    fn drop(&mut self) {
        if let Err(err) = self.backend.delete_fence(&self.end_fence) {
            log::warn!(
                "CopyDepthPass: failed to delete fence '{}': {}",
                self.end_fence.name,
                err
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_core::renderer::api::{FenceState, TextureDescriptor, TextureFormat};
    use umbra_core::renderer::scene::{CameraView, MaterialLibrary, SceneLights};
    use umbra_core::renderer::{CullingSettings, FenceError, GraphicsSettings, ResourceError};
    use umbra_core::math::Vec3;
    use umbra_infra::{BackendCommand, HeadlessBackend};

    fn destination(backend: &HeadlessBackend) -> RenderTargetDescriptor {
        let texture = backend
            .create_texture(&TextureDescriptor::new_2d(
                "Depth Copy",
                64,
                64,
                TextureFormat::Depth32Float,
            ))
            .unwrap();
        RenderTargetDescriptor::depth(texture)
    }

    #[test]
    fn test_copy_waits_on_start_fence() {
        let backend = Arc::new(HeadlessBackend::new());
        let mut frame = FrameResources::new(backend.clone(), CullingSettings::default()).unwrap();
        let start = backend
            .create_fence(FenceType::RenderToCopy, "Start".into())
            .unwrap();
        let mut pass = CopyDepthPass::new(backend.clone(), start.clone(), destination(&backend)).unwrap();

        let materials = MaterialLibrary::new();
        let lights = SceneLights::default();
        let settings = GraphicsSettings::default();
        let camera = CameraView::perspective(Vec3::Z, Vec3::ZERO, 1.0, 1.0, 0.1, 10.0);
        let context = RenderContext::new(&[], &materials, &lights, &settings, camera, 64, 64);

        let err = pass.execute(&context, &mut frame).unwrap_err();
        assert!(matches!(
            err,
            RenderError::ResourceError(ResourceError::Fence(FenceError::WaitOnUnsignaled { .. }))
        ));

        backend.signal_fence(&start).unwrap();
        pass.execute(&context, &mut frame).unwrap();
        // The start fence stays signaled, so a second copy in a row succeeds.
        pass.execute(&context, &mut frame).unwrap();
        assert_eq!(
            backend.fence_state(pass.end_fence()).unwrap(),
            FenceState::Signaled
        );

        let commands = backend.commands();
        let begin = commands
            .iter()
            .position(|c| *c == BackendCommand::BeginCopyPass("Copy Depth To Backbuffer".into()))
            .unwrap();
        assert!(matches!(commands[begin + 1], BackendCommand::CopyTextureToTexture { .. }));
        assert_eq!(commands[begin + 2], BackendCommand::EndCopyPass);
    }

    #[test]
    fn test_end_fence_deleted_on_drop() {
        let backend = Arc::new(HeadlessBackend::new());
        let start = backend
            .create_fence(FenceType::RenderToCopy, "Start".into())
            .unwrap();
        let pass = CopyDepthPass::new(backend.clone(), start, destination(&backend)).unwrap();
        assert_eq!(backend.live_fences(), 2);
        drop(pass);
        assert_eq!(backend.live_fences(), 1);
    }
}
