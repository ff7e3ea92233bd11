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

use super::command::BackendCommand;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use umbra_core::renderer::api::*;
use umbra_core::renderer::error::{FenceError, RenderError, ResourceError};
use umbra_core::renderer::{BackendType, GraphicsBackend};

/// Alignment used when none is given, matching common desktop GPUs.
pub const DEFAULT_CONSTANT_BUFFER_ALIGNMENT: u64 = 256;

const DEFAULT_FRAMES_IN_FLIGHT: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
enum OpenPass {
    Render(String),
    Copy(String),
}

#[derive(Debug)]
struct HeadlessFence {
    name: String,
    state: FenceState,
}

#[derive(Debug, Default)]
struct HeadlessState {
    commands: Vec<BackendCommand>,
    buffers: HashMap<BufferId, Vec<u8>>,
    textures: HashMap<TextureId, TextureDescriptor>,
    fences: HashMap<FenceId, HeadlessFence>,
    pass: Option<OpenPass>,
    debug_depth: usize,
    in_frame: bool,
}

impl HeadlessState {
    fn require_render_pass(&self, command: &str) -> Result<(), ResourceError> {
        match &self.pass {
            Some(OpenPass::Render(_)) => Ok(()),
            Some(OpenPass::Copy(name)) => Err(ResourceError::InvalidPassState(format!(
                "{command} recorded inside copy pass '{name}'"
            ))),
            None => Err(ResourceError::InvalidPassState(format!(
                "{command} recorded outside of a render pass"
            ))),
        }
    }

    fn require_copy_pass(&self, command: &str) -> Result<(), ResourceError> {
        match &self.pass {
            Some(OpenPass::Copy(_)) => Ok(()),
            Some(OpenPass::Render(name)) => Err(ResourceError::InvalidPassState(format!(
                "{command} recorded inside render pass '{name}'"
            ))),
            None => Err(ResourceError::InvalidPassState(format!(
                "{command} recorded outside of a copy pass"
            ))),
        }
    }

    fn require_no_pass(&self, command: &str) -> Result<(), ResourceError> {
        match &self.pass {
            None => Ok(()),
            Some(OpenPass::Render(name)) | Some(OpenPass::Copy(name)) => Err(
                ResourceError::InvalidPassState(format!("{command} recorded inside pass '{name}'")),
            ),
        }
    }

    fn check_surface(&self, target: &RenderTargetDescriptor) -> Result<(), ResourceError> {
        let TargetSurface::Texture(id) = target.surface else {
            return Ok(());
        };
        let texture = self.textures.get(&id).ok_or(ResourceError::NotFound)?;
        if target.layer >= texture.layers {
            return Err(ResourceError::OutOfBounds);
        }
        Ok(())
    }

    fn check_buffer_range(&self, binding: BufferBinding) -> Result<(), ResourceError> {
        let buffer = self
            .buffers
            .get(&binding.buffer)
            .ok_or(ResourceError::BufferNotFound(binding.buffer))?;
        if binding.offset + binding.size > buffer.len() as u64 {
            return Err(ResourceError::OutOfBounds);
        }
        Ok(())
    }

    fn fence_mut(&mut self, fence: &GraphicsBackendFence) -> Result<&mut HeadlessFence, FenceError> {
        self.fences
            .get_mut(&fence.id)
            .ok_or(FenceError::Unknown { id: fence.id })
    }
}

/// A [`GraphicsBackend`] that keeps every resource in memory and logs every call.
///
/// It enforces the same pass scoping rules a GPU API would, so a misordered
/// command stream fails here instead of on a device. Buffer contents are kept,
/// which lets tests read back what a pass uploaded.
#[derive(Debug)]
pub struct HeadlessBackend {
    state: Mutex<HeadlessState>,
    next_buffer_id: AtomicUsize,
    next_texture_id: AtomicUsize,
    next_fence_id: AtomicU64,
    frame_index: AtomicUsize,
    frames_started: AtomicU64,
    frames_in_flight: usize,
    alignment: u64,
}

impl HeadlessBackend {
    /// Three frames in flight and a 256-byte constant buffer alignment.
    pub fn new() -> Self {
        Self::with_config(DEFAULT_FRAMES_IN_FLIGHT, DEFAULT_CONSTANT_BUFFER_ALIGNMENT)
    }

    /// A backend with explicit frame count and alignment. Both are clamped to at least 1.
    pub fn with_config(frames_in_flight: usize, alignment: u64) -> Self {
        log::debug!(
            "HeadlessBackend: {} frames in flight, alignment {} bytes",
            frames_in_flight.max(1),
            alignment.max(1)
        );
        Self {
            state: Mutex::new(HeadlessState::default()),
            next_buffer_id: AtomicUsize::new(1),
            next_texture_id: AtomicUsize::new(1),
            next_fence_id: AtomicU64::new(1),
            frame_index: AtomicUsize::new(0),
            frames_started: AtomicU64::new(0),
            frames_in_flight: frames_in_flight.max(1),
            alignment: alignment.max(1),
        }
    }

    fn state(&self) -> MutexGuard<'_, HeadlessState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every command recorded so far, in call order.
    pub fn commands(&self) -> Vec<BackendCommand> {
        self.state().commands.clone()
    }

    /// Forgets the recorded commands. Resources are kept.
    pub fn clear_commands(&self) {
        self.state().commands.clear();
    }

    /// Number of recorded `draw_elements` and `draw_elements_instanced` calls.
    pub fn draw_count(&self) -> usize {
        self.state()
            .commands
            .iter()
            .filter(|command| {
                matches!(
                    command,
                    BackendCommand::DrawElements { .. } | BackendCommand::DrawElementsInstanced { .. }
                )
            })
            .count()
    }

    /// A copy of a buffer's contents, or `None` once deleted.
    pub fn buffer_data(&self, id: BufferId) -> Option<Vec<u8>> {
        self.state().buffers.get(&id).cloned()
    }

    /// Number of buffers not yet deleted.
    pub fn live_buffers(&self) -> usize {
        self.state().buffers.len()
    }

    /// Number of textures not yet deleted.
    pub fn live_textures(&self) -> usize {
        self.state().textures.len()
    }

    /// Number of fences not yet deleted.
    pub fn live_fences(&self) -> usize {
        self.state().fences.len()
    }

    /// How many times `begin_frame` succeeded.
    pub fn frames_started(&self) -> u64 {
        self.frames_started.load(Ordering::Relaxed)
    }

    /// The descriptor a texture was created with.
    pub fn texture_descriptor(&self, id: TextureId) -> Option<TextureDescriptor> {
        self.state().textures.get(&id).cloned()
    }

    /// Depth of the debug group stack.
    pub fn debug_group_depth(&self) -> usize {
        self.state().debug_depth
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsBackend for HeadlessBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::Headless
    }

    fn max_frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    fn current_frame(&self) -> usize {
        self.frame_index.load(Ordering::Relaxed) % self.frames_in_flight
    }

    fn constant_buffer_offset_alignment(&self) -> u64 {
        self.alignment
    }

    fn begin_frame(&self) -> Result<(), RenderError> {
        let mut state = self.state();
        if state.in_frame {
            return Err(RenderError::RenderingFailed(
                "begin_frame called twice without end_frame".to_string(),
            ));
        }
        if self.frames_started.fetch_add(1, Ordering::Relaxed) > 0 {
            self.frame_index.fetch_add(1, Ordering::Relaxed);
        }
        state.in_frame = true;
        state.commands.push(BackendCommand::BeginFrame);
        Ok(())
    }

    fn end_frame(&self) -> Result<(), RenderError> {
        let mut state = self.state();
        if let Some(pass) = &state.pass {
            return Err(RenderError::RenderingFailed(format!(
                "end_frame called with {pass:?} still open"
            )));
        }
        if state.debug_depth > 0 {
            log::warn!(
                "HeadlessBackend: frame ended with {} debug group(s) open",
                state.debug_depth
            );
        }
        state.in_frame = false;
        state.commands.push(BackendCommand::EndFrame);
        Ok(())
    }

    fn create_fence(
        &self,
        fence_type: FenceType,
        name: Cow<'static, str>,
    ) -> Result<GraphicsBackendFence, ResourceError> {
        let id = FenceId(self.next_fence_id.fetch_add(1, Ordering::Relaxed));
        let mut state = self.state();
        state.fences.insert(
            id,
            HeadlessFence {
                name: name.to_string(),
                state: FenceState::Unsignaled,
            },
        );
        state.commands.push(BackendCommand::CreateFence(name.to_string()));
        log::trace!("HeadlessBackend: Created fence '{name}' ({fence_type:?}) with ID: {id:?}");
        Ok(GraphicsBackendFence {
            id,
            fence_type,
            name,
        })
    }

    fn signal_fence(&self, fence: &GraphicsBackendFence) -> Result<(), ResourceError> {
        let mut state = self.state();
        let entry = state.fence_mut(fence)?;
        entry.state = FenceState::Signaled;
        let name = entry.name.clone();
        state.commands.push(BackendCommand::SignalFence(name));
        Ok(())
    }

    fn wait_for_fence(&self, fence: &GraphicsBackendFence) -> Result<(), ResourceError> {
        let mut state = self.state();
        let entry = state.fence_mut(fence)?;
        if entry.state == FenceState::Unsignaled {
            return Err(FenceError::WaitOnUnsignaled {
                name: entry.name.clone(),
            }
            .into());
        }
        let name = entry.name.clone();
        state.commands.push(BackendCommand::WaitForFence(name));
        Ok(())
    }

    fn delete_fence(&self, fence: &GraphicsBackendFence) -> Result<(), ResourceError> {
        let mut state = self.state();
        let entry = state
            .fences
            .remove(&fence.id)
            .ok_or(FenceError::Unknown { id: fence.id })?;
        state.commands.push(BackendCommand::DeleteFence(entry.name));
        Ok(())
    }

    fn fence_state(&self, fence: &GraphicsBackendFence) -> Result<FenceState, ResourceError> {
        let state = self.state();
        state
            .fences
            .get(&fence.id)
            .map(|entry| entry.state)
            .ok_or_else(|| FenceError::Unknown { id: fence.id }.into())
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        let id = BufferId(self.next_buffer_id.fetch_add(1, Ordering::Relaxed));
        let label = descriptor.label.as_deref().unwrap_or_default().to_string();
        let mut state = self.state();
        state.buffers.insert(id, vec![0; descriptor.size as usize]);
        state.commands.push(BackendCommand::CreateBuffer {
            id,
            label: label.clone(),
            size: descriptor.size,
        });
        log::trace!(
            "HeadlessBackend: Created buffer '{label}' with ID: {id:?}, size: {} bytes",
            descriptor.size
        );
        Ok(id)
    }

    fn delete_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        let mut state = self.state();
        state
            .buffers
            .remove(&id)
            .ok_or(ResourceError::BufferNotFound(id))?;
        state.commands.push(BackendCommand::DeleteBuffer(id));
        Ok(())
    }

    fn set_buffer_data(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        let mut state = self.state();
        let buffer = state
            .buffers
            .get_mut(&id)
            .ok_or(ResourceError::BufferNotFound(id))?;
        let start = offset as usize;
        let end = start + data.len();
        if end > buffer.len() {
            return Err(ResourceError::OutOfBounds);
        }
        buffer[start..end].copy_from_slice(data);
        state.commands.push(BackendCommand::SetBufferData {
            id,
            offset,
            size: data.len() as u64,
        });
        Ok(())
    }

    fn copy_buffer_sub_data(
        &self,
        source: BufferId,
        destination: BufferId,
        source_offset: u64,
        destination_offset: u64,
        size: u64,
    ) -> Result<(), ResourceError> {
        let mut state = self.state();
        state.require_copy_pass("copy_buffer_sub_data")?;
        state.check_buffer_range(BufferBinding {
            buffer: source,
            offset: source_offset,
            size,
        })?;
        state.check_buffer_range(BufferBinding {
            buffer: destination,
            offset: destination_offset,
            size,
        })?;

        let src_range = source_offset as usize..(source_offset + size) as usize;
        let bytes = state.buffers[&source][src_range].to_vec();
        let dst_start = destination_offset as usize;
        if let Some(dst) = state.buffers.get_mut(&destination) {
            dst[dst_start..dst_start + bytes.len()].copy_from_slice(&bytes);
        }
        state.commands.push(BackendCommand::CopyBufferSubData {
            source,
            destination,
            source_offset,
            destination_offset,
            size,
        });
        Ok(())
    }

    fn bind_constant_buffer(&self, name: &str, binding: BufferBinding) -> Result<(), ResourceError> {
        let mut state = self.state();
        state.check_buffer_range(binding)?;
        if binding.offset % self.alignment != 0 {
            return Err(ResourceError::BackendError(format!(
                "constant buffer '{name}' bound at offset {} not aligned to {}",
                binding.offset, self.alignment
            )));
        }
        state.commands.push(BackendCommand::BindConstantBuffer {
            name: name.to_string(),
            binding,
        });
        Ok(())
    }

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError> {
        if descriptor.width == 0 || descriptor.height == 0 || descriptor.layers == 0 {
            return Err(ResourceError::BackendError(format!(
                "texture '{}' has an empty extent {}x{}x{}",
                descriptor.label, descriptor.width, descriptor.height, descriptor.layers
            )));
        }
        let id = TextureId(self.next_texture_id.fetch_add(1, Ordering::Relaxed));
        let mut state = self.state();
        state.textures.insert(id, descriptor.clone());
        state.commands.push(BackendCommand::CreateTexture {
            id,
            label: descriptor.label.clone(),
        });
        log::trace!(
            "HeadlessBackend: Created texture '{}' with ID: {id:?}",
            descriptor.label
        );
        Ok(id)
    }

    fn delete_texture(&self, id: TextureId) -> Result<(), ResourceError> {
        let mut state = self.state();
        state.textures.remove(&id).ok_or(ResourceError::NotFound)?;
        state.commands.push(BackendCommand::DeleteTexture(id));
        Ok(())
    }

    fn attach_render_target(&self, target: &RenderTargetDescriptor) -> Result<(), ResourceError> {
        let mut state = self.state();
        state.require_no_pass("attach_render_target")?;
        state.check_surface(target)?;
        state.commands.push(BackendCommand::AttachRenderTarget(*target));
        Ok(())
    }

    fn transition_render_target(
        &self,
        target: &RenderTargetDescriptor,
        new_state: ResourceState,
    ) -> Result<(), ResourceError> {
        let mut state = self.state();
        state.require_no_pass("transition_render_target")?;
        state.check_surface(target)?;
        state.commands.push(BackendCommand::TransitionRenderTarget {
            target: *target,
            state: new_state,
        });
        Ok(())
    }

    fn copy_texture_to_texture(
        &self,
        source: &RenderTargetDescriptor,
        destination: &RenderTargetDescriptor,
    ) -> Result<(), ResourceError> {
        let mut state = self.state();
        state.require_copy_pass("copy_texture_to_texture")?;
        state.check_surface(source)?;
        state.check_surface(destination)?;
        state.commands.push(BackendCommand::CopyTextureToTexture {
            source: *source,
            destination: *destination,
        });
        Ok(())
    }

    fn begin_render_pass(&self, name: &str) -> Result<(), ResourceError> {
        let mut state = self.state();
        state.require_no_pass("begin_render_pass")?;
        state.pass = Some(OpenPass::Render(name.to_string()));
        state
            .commands
            .push(BackendCommand::BeginRenderPass(name.to_string()));
        Ok(())
    }

    fn end_render_pass(&self) -> Result<(), ResourceError> {
        let mut state = self.state();
        state.require_render_pass("end_render_pass")?;
        state.pass = None;
        state.commands.push(BackendCommand::EndRenderPass);
        Ok(())
    }

    fn begin_copy_pass(&self, name: &str) -> Result<(), ResourceError> {
        let mut state = self.state();
        state.require_no_pass("begin_copy_pass")?;
        state.pass = Some(OpenPass::Copy(name.to_string()));
        state
            .commands
            .push(BackendCommand::BeginCopyPass(name.to_string()));
        Ok(())
    }

    fn end_copy_pass(&self) -> Result<(), ResourceError> {
        let mut state = self.state();
        state.require_copy_pass("end_copy_pass")?;
        state.pass = None;
        state.commands.push(BackendCommand::EndCopyPass);
        Ok(())
    }

    fn set_viewport(&self, viewport: Viewport) -> Result<(), ResourceError> {
        let mut state = self.state();
        state.require_render_pass("set_viewport")?;
        state.commands.push(BackendCommand::SetViewport(viewport));
        Ok(())
    }

    fn set_scissor_rect(&self, rect: ScissorRect) -> Result<(), ResourceError> {
        let mut state = self.state();
        state.require_render_pass("set_scissor_rect")?;
        state.commands.push(BackendCommand::SetScissorRect(rect));
        Ok(())
    }

    fn set_depth_state(&self, depth: DepthState) -> Result<(), ResourceError> {
        let mut state = self.state();
        state.require_render_pass("set_depth_state")?;
        state.commands.push(BackendCommand::SetDepthState(depth));
        Ok(())
    }

    fn draw_elements(
        &self,
        geometry: GeometryId,
        material: MaterialId,
        per_draw: BufferBinding,
    ) -> Result<(), ResourceError> {
        let mut state = self.state();
        state.require_render_pass("draw_elements")?;
        state.check_buffer_range(per_draw)?;
        state.commands.push(BackendCommand::DrawElements {
            geometry,
            material,
            binding: per_draw,
        });
        Ok(())
    }

    fn draw_elements_instanced(
        &self,
        geometry: GeometryId,
        material: MaterialId,
        instances: BufferBinding,
        instance_count: u32,
    ) -> Result<(), ResourceError> {
        let mut state = self.state();
        state.require_render_pass("draw_elements_instanced")?;
        state.check_buffer_range(instances)?;
        if instance_count == 0 {
            return Err(ResourceError::BackendError(
                "draw_elements_instanced with zero instances".to_string(),
            ));
        }
        state.commands.push(BackendCommand::DrawElementsInstanced {
            geometry,
            material,
            binding: instances,
            instance_count,
        });
        Ok(())
    }

    fn blit(&self, source: TargetSurface, material: MaterialId) -> Result<(), ResourceError> {
        let mut state = self.state();
        state.require_render_pass("blit")?;
        if let TargetSurface::Texture(id) = source {
            if !state.textures.contains_key(&id) {
                return Err(ResourceError::NotFound);
            }
        }
        state.commands.push(BackendCommand::Blit { source, material });
        Ok(())
    }

    fn push_debug_group(&self, name: &str) {
        let mut state = self.state();
        state.debug_depth += 1;
        state
            .commands
            .push(BackendCommand::PushDebugGroup(name.to_string()));
    }

    fn pop_debug_group(&self) {
        let mut state = self.state();
        if state.debug_depth == 0 {
            log::warn!("HeadlessBackend: pop_debug_group without a matching push");
            return;
        }
        state.debug_depth -= 1;
        state.commands.push(BackendCommand::PopDebugGroup);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_core::renderer::DebugGroup;

    fn constant_buffer(backend: &HeadlessBackend, size: u64) -> BufferId {
        backend
            .create_buffer(&BufferDescriptor {
                label: Some("Test".into()),
                size,
                usage: BufferUsage::CONSTANT,
            })
            .unwrap()
    }

    #[test]
    fn test_draw_outside_render_pass_is_rejected() {
        let backend = HeadlessBackend::new();
        let buffer = constant_buffer(&backend, 64);
        let binding = BufferBinding {
            buffer,
            offset: 0,
            size: 64,
        };
        let material = MaterialId::default();

        let result = backend.draw_elements(GeometryId(1), material, binding);
        assert!(matches!(result, Err(ResourceError::InvalidPassState(_))));
        assert_eq!(backend.draw_count(), 0);

        backend.begin_render_pass("Pass").unwrap();
        backend
            .draw_elements(GeometryId(1), material, binding)
            .unwrap();
        backend.end_render_pass().unwrap();
        assert_eq!(backend.draw_count(), 1);
    }

    #[test]
    fn test_nested_and_unmatched_passes_are_rejected() {
        let backend = HeadlessBackend::new();
        assert!(backend.end_render_pass().is_err());
        assert!(backend.end_copy_pass().is_err());

        backend.begin_render_pass("Outer").unwrap();
        assert!(backend.begin_render_pass("Inner").is_err());
        assert!(backend.begin_copy_pass("Copy").is_err());
        assert!(backend.end_copy_pass().is_err());
        backend.end_render_pass().unwrap();
    }

    #[test]
    fn test_attachments_must_precede_the_pass() {
        let backend = HeadlessBackend::new();
        backend
            .attach_render_target(&RenderTargetDescriptor::color_backbuffer())
            .unwrap();
        backend.begin_render_pass("Pass").unwrap();
        let result = backend.attach_render_target(&RenderTargetDescriptor::depth_backbuffer());
        assert!(matches!(result, Err(ResourceError::InvalidPassState(_))));
        backend.end_render_pass().unwrap();
    }

    #[test]
    fn test_texture_copy_requires_a_copy_pass() {
        let backend = HeadlessBackend::new();
        let texture = backend
            .create_texture(&TextureDescriptor::new_2d(
                "Depth",
                4,
                4,
                TextureFormat::Depth32Float,
            ))
            .unwrap();
        let source = RenderTargetDescriptor::depth(texture);
        let destination = RenderTargetDescriptor::depth_backbuffer();

        assert!(backend.copy_texture_to_texture(&source, &destination).is_err());
        backend.begin_copy_pass("Copy").unwrap();
        backend
            .copy_texture_to_texture(&source, &destination)
            .unwrap();
        backend.end_copy_pass().unwrap();
    }

    #[test]
    fn test_target_layer_is_bounds_checked() {
        let backend = HeadlessBackend::new();
        let array = backend
            .create_texture(&TextureDescriptor::new_array(
                "Shadows",
                8,
                8,
                3,
                TextureFormat::Depth32Float,
            ))
            .unwrap();

        let last = RenderTargetDescriptor::depth(array).with_layer(2);
        backend.attach_render_target(&last).unwrap();
        let past_end = RenderTargetDescriptor::depth(array).with_layer(3);
        assert!(matches!(
            backend.attach_render_target(&past_end),
            Err(ResourceError::OutOfBounds)
        ));

        backend.delete_texture(array).unwrap();
        assert!(matches!(
            backend.attach_render_target(&last),
            Err(ResourceError::NotFound)
        ));
    }

    #[test]
    fn test_buffer_contents_and_bounds() {
        let backend = HeadlessBackend::new();
        let buffer = constant_buffer(&backend, 8);

        backend.set_buffer_data(buffer, 4, &[1, 2, 3, 4]).unwrap();
        assert_eq!(
            backend.buffer_data(buffer).unwrap(),
            vec![0, 0, 0, 0, 1, 2, 3, 4]
        );
        assert!(matches!(
            backend.set_buffer_data(buffer, 6, &[0; 4]),
            Err(ResourceError::OutOfBounds)
        ));

        backend.delete_buffer(buffer).unwrap();
        assert!(backend.buffer_data(buffer).is_none());
        assert!(matches!(
            backend.set_buffer_data(buffer, 0, &[0]),
            Err(ResourceError::BufferNotFound(_))
        ));
    }

    #[test]
    fn test_buffer_copy_moves_bytes() {
        let backend = HeadlessBackend::new();
        let source = constant_buffer(&backend, 4);
        let destination = constant_buffer(&backend, 8);
        backend.set_buffer_data(source, 0, &[9, 8, 7, 6]).unwrap();

        backend.begin_copy_pass("Upload").unwrap();
        backend
            .copy_buffer_sub_data(source, destination, 2, 4, 2)
            .unwrap();
        assert!(backend
            .copy_buffer_sub_data(source, destination, 0, 6, 4)
            .is_err());
        backend.end_copy_pass().unwrap();

        assert_eq!(
            backend.buffer_data(destination).unwrap(),
            vec![0, 0, 0, 0, 7, 6, 0, 0]
        );
    }

    #[test]
    fn test_constant_binding_offset_must_be_aligned() {
        let backend = HeadlessBackend::with_config(2, 64);
        let buffer = constant_buffer(&backend, 256);
        let aligned = BufferBinding {
            buffer,
            offset: 128,
            size: 64,
        };
        backend.bind_constant_buffer("CameraData", aligned).unwrap();

        let misaligned = BufferBinding { offset: 32, ..aligned };
        assert!(backend.bind_constant_buffer("CameraData", misaligned).is_err());
    }

    #[test]
    fn test_fence_state_machine() {
        let backend = HeadlessBackend::new();
        let fence = backend
            .create_fence(FenceType::RenderToCopy, "After Forward Pass".into())
            .unwrap();
        assert_eq!(backend.fence_state(&fence).unwrap(), FenceState::Unsignaled);

        let err = backend.wait_for_fence(&fence).unwrap_err();
        assert!(matches!(
            err,
            ResourceError::Fence(FenceError::WaitOnUnsignaled { ref name }) if name == "After Forward Pass"
        ));

        backend.signal_fence(&fence).unwrap();
        backend.signal_fence(&fence).unwrap();
        backend.wait_for_fence(&fence).unwrap();
        backend.wait_for_fence(&fence).unwrap();
        assert_eq!(backend.fence_state(&fence).unwrap(), FenceState::Signaled);

        backend.delete_fence(&fence).unwrap();
        assert_eq!(backend.live_fences(), 0);
        assert!(matches!(
            backend.signal_fence(&fence),
            Err(ResourceError::Fence(FenceError::Unknown { .. }))
        ));
    }

    #[test]
    fn test_frame_index_cycles_through_frames_in_flight() {
        let backend = HeadlessBackend::with_config(2, 256);
        let mut seen = Vec::new();
        for _ in 0..4 {
            backend.begin_frame().unwrap();
            seen.push(backend.current_frame());
            backend.end_frame().unwrap();
        }
        assert_eq!(seen, vec![0, 1, 0, 1]);
        assert_eq!(backend.frames_started(), 4);
    }

    #[test]
    fn test_end_frame_with_open_pass_fails() {
        let backend = HeadlessBackend::new();
        backend.begin_frame().unwrap();
        assert!(backend.begin_frame().is_err());
        backend.begin_render_pass("Unclosed").unwrap();
        assert!(backend.end_frame().is_err());
    }

    #[test]
    fn test_debug_group_guard_balances_the_stack() {
        let backend = HeadlessBackend::new();
        {
            let _outer = DebugGroup::new(&backend, "Outer");
            let _inner = DebugGroup::new(&backend, "Inner");
            assert_eq!(backend.debug_group_depth(), 2);
        }
        assert_eq!(backend.debug_group_depth(), 0);
        assert_eq!(
            backend.commands(),
            vec![
                BackendCommand::PushDebugGroup("Outer".into()),
                BackendCommand::PushDebugGroup("Inner".into()),
                BackendCommand::PopDebugGroup,
                BackendCommand::PopDebugGroup,
            ]
        );
    }
}
