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

//! The command log kept by the headless backend.

use umbra_core::renderer::api::{
    BufferBinding, BufferId, DepthState, GeometryId, MaterialId, RenderTargetDescriptor,
    ResourceState, ScissorRect, TargetSurface, TextureId, Viewport,
};

/// One backend call, as recorded by [`HeadlessBackend`](super::HeadlessBackend).
///
/// Only calls that succeeded are recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCommand {
    /// `begin_frame`.
    BeginFrame,
    /// `end_frame`.
    EndFrame,
    /// `create_fence`.
    CreateFence(String),
    /// `signal_fence`.
    SignalFence(String),
    /// `wait_for_fence` on a signaled fence.
    WaitForFence(String),
    /// `delete_fence`.
    DeleteFence(String),
    /// `create_buffer`.
    CreateBuffer {
        /// The new buffer.
        id: BufferId,
        /// Its debug label.
        label: String,
        /// Its size in bytes.
        size: u64,
    },
    /// `delete_buffer`.
    DeleteBuffer(BufferId),
    /// `set_buffer_data`.
    SetBufferData {
        /// The written buffer.
        id: BufferId,
        /// Byte offset.
        offset: u64,
        /// Bytes written.
        size: u64,
    },
    /// `copy_buffer_sub_data`.
    CopyBufferSubData {
        /// Source buffer.
        source: BufferId,
        /// Destination buffer.
        destination: BufferId,
        /// Read offset.
        source_offset: u64,
        /// Write offset.
        destination_offset: u64,
        /// Bytes copied.
        size: u64,
    },
    /// `bind_constant_buffer`.
    BindConstantBuffer {
        /// Shader-side name.
        name: String,
        /// Bound range.
        binding: BufferBinding,
    },
    /// `create_texture`.
    CreateTexture {
        /// The new texture.
        id: TextureId,
        /// Its debug label.
        label: String,
    },
    /// `delete_texture`.
    DeleteTexture(TextureId),
    /// `attach_render_target`.
    AttachRenderTarget(RenderTargetDescriptor),
    /// `transition_render_target`.
    TransitionRenderTarget {
        /// The transitioned target.
        target: RenderTargetDescriptor,
        /// Its new state.
        state: ResourceState,
    },
    /// `copy_texture_to_texture`.
    CopyTextureToTexture {
        /// Copied from.
        source: RenderTargetDescriptor,
        /// Copied into.
        destination: RenderTargetDescriptor,
    },
    /// `begin_render_pass`.
    BeginRenderPass(String),
    /// `end_render_pass`.
    EndRenderPass,
    /// `begin_copy_pass`.
    BeginCopyPass(String),
    /// `end_copy_pass`.
    EndCopyPass,
    /// `set_viewport`.
    SetViewport(Viewport),
    /// `set_scissor_rect`.
    SetScissorRect(ScissorRect),
    /// `set_depth_state`.
    SetDepthState(DepthState),
    /// `draw_elements`.
    DrawElements {
        /// Drawn geometry.
        geometry: GeometryId,
        /// Material used.
        material: MaterialId,
        /// Per-draw matrices.
        binding: BufferBinding,
    },
    /// `draw_elements_instanced`.
    DrawElementsInstanced {
        /// Drawn geometry.
        geometry: GeometryId,
        /// Material used.
        material: MaterialId,
        /// Instance matrices.
        binding: BufferBinding,
        /// Number of instances.
        instance_count: u32,
    },
    /// `blit`.
    Blit {
        /// Sampled surface.
        source: TargetSurface,
        /// Blit material.
        material: MaterialId,
    },
    /// `push_debug_group`.
    PushDebugGroup(String),
    /// `pop_debug_group`.
    PopDebugGroup,
}

impl BackendCommand {
    /// Whether this command issues a draw or a blit.
    pub fn is_draw(&self) -> bool {
        matches!(
            self,
            BackendCommand::DrawElements { .. }
                | BackendCommand::DrawElementsInstanced { .. }
                | BackendCommand::Blit { .. }
        )
    }
}
