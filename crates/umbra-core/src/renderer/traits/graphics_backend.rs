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

use crate::renderer::api::*;
use crate::renderer::error::{RenderError, ResourceError};
use std::borrow::Cow;
use std::fmt::{self, Debug};

/// The concrete implementation behind a [`GraphicsBackend`] trait object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendType {
    /// Records commands in memory without a GPU.
    Headless,
    /// Drives a GPU through `wgpu`.
    Wgpu,
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendType::Headless => write!(f, "Headless"),
            BackendType::Wgpu => write!(f, "Wgpu"),
        }
    }
}

/// The interface every graphics API implementation provides to render passes.
///
/// Methods take `&self`; implementations use interior mutability so that a single
/// `Arc<dyn GraphicsBackend>` can be shared by the frame resources and every pass.
/// Commands are recorded in call order. Pass-scoped commands (draws, state, target
/// attachment) are only valid between `begin_render_pass` and `end_render_pass`,
/// texture copies only between `begin_copy_pass` and `end_copy_pass`.
pub trait GraphicsBackend: Send + Sync + Debug + 'static {
    /// Returns which implementation this is.
    fn backend_type(&self) -> BackendType;

    /// Returns how many frames the CPU may record ahead of the GPU.
    fn max_frames_in_flight(&self) -> usize;

    /// Returns the frame-in-flight index being recorded, in `0..max_frames_in_flight()`.
    fn current_frame(&self) -> usize;

    /// Returns the required alignment of constant buffer binding offsets, in bytes.
    fn constant_buffer_offset_alignment(&self) -> u64;

    /// Starts recording a new frame and advances [`current_frame`](Self::current_frame).
    fn begin_frame(&self) -> Result<(), RenderError>;

    /// Submits the recorded frame.
    fn end_frame(&self) -> Result<(), RenderError>;

    // --- Fences ---

    /// Creates a fence in the [`FenceState::Unsignaled`] state.
    /// ## Arguments
    /// * `fence_type` - Which queue signals the fence and which queue waits on it.
    /// * `name` - A debug name.
    /// ## Errors
    /// * `ResourceError` - If the backend cannot allocate the fence.
    fn create_fence(
        &self,
        fence_type: FenceType,
        name: Cow<'static, str>,
    ) -> Result<GraphicsBackendFence, ResourceError>;

    /// Signals the fence from its producing queue.
    ///
    /// Signaling an already signaled fence keeps it signaled.
    fn signal_fence(&self, fence: &GraphicsBackendFence) -> Result<(), ResourceError>;

    /// Makes the consuming queue wait until the fence is signaled.
    ///
    /// Waiting on a signaled fence completes immediately and leaves it signaled,
    /// so waiting twice is a no-op.
    /// ## Errors
    /// * `ResourceError::Fence` - If the fence is unknown or was never signaled.
    fn wait_for_fence(&self, fence: &GraphicsBackendFence) -> Result<(), ResourceError>;

    /// Releases the backend resources of a fence.
    fn delete_fence(&self, fence: &GraphicsBackendFence) -> Result<(), ResourceError>;

    /// Returns the current state of a fence.
    fn fence_state(&self, fence: &GraphicsBackendFence) -> Result<FenceState, ResourceError>;

    // --- Buffers ---

    /// Creates a new GPU buffer.
    /// ## Arguments
    /// * `descriptor` - The buffer configuration.
    /// ## Returns
    /// The ID of the created buffer.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError>;

    /// Destroys a GPU buffer.
    fn delete_buffer(&self, id: BufferId) -> Result<(), ResourceError>;

    /// Writes `data` into a buffer at `offset`.
    /// ## Errors
    /// * `ResourceError::OutOfBounds` - If the range exceeds the buffer.
    fn set_buffer_data(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError>;

    /// Copies `size` bytes between two buffers. Valid only inside a copy pass.
    fn copy_buffer_sub_data(
        &self,
        source: BufferId,
        destination: BufferId,
        source_offset: u64,
        destination_offset: u64,
        size: u64,
    ) -> Result<(), ResourceError>;

    /// Binds a buffer range to the shader constant buffer named `name` for the next draws.
    fn bind_constant_buffer(&self, name: &str, binding: BufferBinding) -> Result<(), ResourceError>;

    // --- Textures and targets ---

    /// Creates a texture usable as a render target and as a shader resource.
    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError>;

    /// Destroys a texture.
    fn delete_texture(&self, id: TextureId) -> Result<(), ResourceError>;

    /// Binds an attachment for the render pass about to begin.
    fn attach_render_target(&self, target: &RenderTargetDescriptor) -> Result<(), ResourceError>;

    /// Moves a render target into `state`.
    fn transition_render_target(
        &self,
        target: &RenderTargetDescriptor,
        state: ResourceState,
    ) -> Result<(), ResourceError>;

    /// Copies a whole texture into another. Valid only inside a copy pass.
    fn copy_texture_to_texture(
        &self,
        source: &RenderTargetDescriptor,
        destination: &RenderTargetDescriptor,
    ) -> Result<(), ResourceError>;

    // --- Passes ---

    /// Opens a render pass on the render queue using the attached targets.
    fn begin_render_pass(&self, name: &str) -> Result<(), ResourceError>;

    /// Closes the current render pass.
    fn end_render_pass(&self) -> Result<(), ResourceError>;

    /// Opens a copy pass on the copy queue.
    fn begin_copy_pass(&self, name: &str) -> Result<(), ResourceError>;

    /// Closes the current copy pass.
    fn end_copy_pass(&self) -> Result<(), ResourceError>;

    // --- State ---

    /// Sets the viewport of the current render pass.
    fn set_viewport(&self, viewport: Viewport) -> Result<(), ResourceError>;

    /// Sets the scissor rectangle of the current render pass.
    fn set_scissor_rect(&self, rect: ScissorRect) -> Result<(), ResourceError>;

    /// Sets the depth test state for the next draws.
    fn set_depth_state(&self, state: DepthState) -> Result<(), ResourceError>;

    // --- Draws ---

    /// Draws one indexed geometry with `material`, reading model matrices from `per_draw`.
    fn draw_elements(
        &self,
        geometry: GeometryId,
        material: MaterialId,
        per_draw: BufferBinding,
    ) -> Result<(), ResourceError>;

    /// Draws `instance_count` copies of a geometry, reading model matrices from `instances`.
    fn draw_elements_instanced(
        &self,
        geometry: GeometryId,
        material: MaterialId,
        instances: BufferBinding,
        instance_count: u32,
    ) -> Result<(), ResourceError>;

    /// Draws a full-screen triangle sampling `source` with `material`.
    fn blit(&self, source: TargetSurface, material: MaterialId) -> Result<(), ResourceError>;

    // --- Debugging ---

    /// Opens a named debug group shown in GPU captures.
    fn push_debug_group(&self, name: &str);

    /// Closes the innermost debug group.
    fn pop_debug_group(&self);
}

/// Keeps a debug group open for as long as it lives.
///
/// ```ignore
/// let _group = DebugGroup::new(backend.as_ref(), "Forward Pass");
/// // commands recorded here appear under "Forward Pass"
/// ```
#[must_use = "the debug group closes as soon as the guard is dropped"]
pub struct DebugGroup<'a> {
    backend: &'a dyn GraphicsBackend,
}

impl<'a> DebugGroup<'a> {
    /// Pushes `name` on the backend's debug group stack.
    pub fn new(backend: &'a dyn GraphicsBackend, name: &str) -> Self {
        backend.push_debug_group(name);
        Self { backend }
    }
}

impl Drop for DebugGroup<'_> {
    fn drop(&mut self) {
        self.backend.pop_debug_group();
    }
}
