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

//! A mock backend shared by the unit tests of this crate.

use crate::renderer::api::*;
use crate::renderer::error::{FenceError, RenderError, ResourceError};
use crate::renderer::traits::{BackendType, GraphicsBackend};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Keeps buffer contents in memory and logs every call as a string.
#[derive(Debug)]
pub struct MockBackend {
    next_id: AtomicUsize,
    next_fence: AtomicU64,
    frame: AtomicUsize,
    frames_in_flight: usize,
    alignment: u64,
    fail_copies: AtomicBool,
    pub calls: Mutex<Vec<String>>,
    pub buffers: Mutex<HashMap<BufferId, Vec<u8>>>,
    fences: Mutex<HashMap<FenceId, FenceState>>,
}

impl MockBackend {
    pub fn new(frames_in_flight: usize, alignment: u64) -> Self {
        Self {
            next_id: AtomicUsize::new(1),
            next_fence: AtomicU64::new(1),
            frame: AtomicUsize::new(0),
            frames_in_flight,
            alignment,
            fail_copies: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
            buffers: Mutex::new(HashMap::new()),
            fences: Mutex::new(HashMap::new()),
        }
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn buffer(&self, id: BufferId) -> Vec<u8> {
        self.buffers.lock().unwrap()[&id].clone()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.lock().unwrap().len()
    }

    /// Makes every following `copy_buffer_sub_data` fail.
    pub fn fail_copies(&self, fail: bool) {
        self.fail_copies.store(fail, Ordering::Relaxed);
    }
}

impl GraphicsBackend for MockBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::Headless
    }

    fn max_frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    fn current_frame(&self) -> usize {
        self.frame.load(Ordering::Relaxed) % self.frames_in_flight
    }

    fn constant_buffer_offset_alignment(&self) -> u64 {
        self.alignment
    }

    fn begin_frame(&self) -> Result<(), RenderError> {
        self.frame.fetch_add(1, Ordering::Relaxed);
        self.record("begin_frame".into());
        Ok(())
    }

    fn end_frame(&self) -> Result<(), RenderError> {
        self.record("end_frame".into());
        Ok(())
    }

    fn create_fence(
        &self,
        fence_type: FenceType,
        name: Cow<'static, str>,
    ) -> Result<GraphicsBackendFence, ResourceError> {
        let id = FenceId(self.next_fence.fetch_add(1, Ordering::Relaxed));
        self.fences.lock().unwrap().insert(id, FenceState::Unsignaled);
        Ok(GraphicsBackendFence {
            id,
            fence_type,
            name,
        })
    }

    fn signal_fence(&self, fence: &GraphicsBackendFence) -> Result<(), ResourceError> {
        let mut fences = self.fences.lock().unwrap();
        let state = fences
            .get_mut(&fence.id)
            .ok_or(FenceError::Unknown { id: fence.id })?;
        *state = FenceState::Signaled;
        self.record(format!("signal {}", fence.name));
        Ok(())
    }

    fn wait_for_fence(&self, fence: &GraphicsBackendFence) -> Result<(), ResourceError> {
        match self.fence_state(fence)? {
            FenceState::Signaled => {
                self.record(format!("wait {}", fence.name));
                Ok(())
            }
            FenceState::Unsignaled => Err(FenceError::WaitOnUnsignaled {
                name: fence.name.to_string(),
            }
            .into()),
        }
    }

    fn delete_fence(&self, fence: &GraphicsBackendFence) -> Result<(), ResourceError> {
        self.fences
            .lock()
            .unwrap()
            .remove(&fence.id)
            .map(|_| ())
            .ok_or(FenceError::Unknown { id: fence.id }.into())
    }

    fn fence_state(&self, fence: &GraphicsBackendFence) -> Result<FenceState, ResourceError> {
        self.fences
            .lock()
            .unwrap()
            .get(&fence.id)
            .copied()
            .ok_or(FenceError::Unknown { id: fence.id }.into())
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        let id = BufferId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.buffers
            .lock()
            .unwrap()
            .insert(id, vec![0; descriptor.size as usize]);
        self.record(format!(
            "create_buffer {} {}",
            descriptor.label.as_deref().unwrap_or(""),
            descriptor.size
        ));
        Ok(id)
    }

    fn delete_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        self.buffers
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or(ResourceError::BufferNotFound(id))
    }

    fn set_buffer_data(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        let mut buffers = self.buffers.lock().unwrap();
        let buffer = buffers.get_mut(&id).ok_or(ResourceError::BufferNotFound(id))?;
        let start = offset as usize;
        let end = start + data.len();
        if end > buffer.len() {
            return Err(ResourceError::OutOfBounds);
        }
        buffer[start..end].copy_from_slice(data);
        self.record(format!("set_buffer_data {} {} {}", id.0, offset, data.len()));
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
        if self.fail_copies.load(Ordering::Relaxed) {
            return Err(ResourceError::BackendError("copy failed".into()));
        }
        let mut buffers = self.buffers.lock().unwrap();
        let src = buffers
            .get(&source)
            .ok_or(ResourceError::BufferNotFound(source))?;
        let range = source_offset as usize..(source_offset + size) as usize;
        let bytes = src.get(range).ok_or(ResourceError::OutOfBounds)?.to_vec();
        let dst = buffers
            .get_mut(&destination)
            .ok_or(ResourceError::BufferNotFound(destination))?;
        let range = destination_offset as usize..(destination_offset + size) as usize;
        dst.get_mut(range)
            .ok_or(ResourceError::OutOfBounds)?
            .copy_from_slice(&bytes);
        self.record(format!("copy_buffer {} {} {}", source.0, destination.0, size));
        Ok(())
    }

    fn bind_constant_buffer(&self, name: &str, binding: BufferBinding) -> Result<(), ResourceError> {
        self.record(format!("bind {} {}", name, binding.offset));
        Ok(())
    }

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError> {
        self.record(format!("create_texture {}", descriptor.label));
        Ok(TextureId(self.next_id.fetch_add(1, Ordering::Relaxed)))
    }

    fn delete_texture(&self, id: TextureId) -> Result<(), ResourceError> {
        self.record(format!("delete_texture {}", id.0));
        Ok(())
    }

    fn attach_render_target(&self, target: &RenderTargetDescriptor) -> Result<(), ResourceError> {
        self.record(format!("attach {:?}", target.slot));
        Ok(())
    }

    fn transition_render_target(
        &self,
        _target: &RenderTargetDescriptor,
        state: ResourceState,
    ) -> Result<(), ResourceError> {
        self.record(format!("transition {state:?}"));
        Ok(())
    }

    fn copy_texture_to_texture(
        &self,
        _source: &RenderTargetDescriptor,
        _destination: &RenderTargetDescriptor,
    ) -> Result<(), ResourceError> {
        self.record("copy_texture".into());
        Ok(())
    }

    fn begin_render_pass(&self, name: &str) -> Result<(), ResourceError> {
        self.record(format!("begin_render_pass {name}"));
        Ok(())
    }

    fn end_render_pass(&self) -> Result<(), ResourceError> {
        self.record("end_render_pass".into());
        Ok(())
    }

    fn begin_copy_pass(&self, name: &str) -> Result<(), ResourceError> {
        self.record(format!("begin_copy_pass {name}"));
        Ok(())
    }

    fn end_copy_pass(&self) -> Result<(), ResourceError> {
        self.record("end_copy_pass".into());
        Ok(())
    }

    fn set_viewport(&self, _viewport: Viewport) -> Result<(), ResourceError> {
        Ok(())
    }

    fn set_scissor_rect(&self, _rect: ScissorRect) -> Result<(), ResourceError> {
        Ok(())
    }

    fn set_depth_state(&self, _state: DepthState) -> Result<(), ResourceError> {
        Ok(())
    }

    fn draw_elements(
        &self,
        geometry: GeometryId,
        _material: MaterialId,
        _per_draw: BufferBinding,
    ) -> Result<(), ResourceError> {
        self.record(format!("draw {}", geometry.0));
        Ok(())
    }

    fn draw_elements_instanced(
        &self,
        geometry: GeometryId,
        _material: MaterialId,
        _instances: BufferBinding,
        instance_count: u32,
    ) -> Result<(), ResourceError> {
        self.record(format!("draw_instanced {} {}", geometry.0, instance_count));
        Ok(())
    }

    fn blit(&self, _source: TargetSurface, _material: MaterialId) -> Result<(), ResourceError> {
        self.record("blit".into());
        Ok(())
    }

    fn push_debug_group(&self, name: &str) {
        self.record(format!("push {name}"));
    }

    fn pop_debug_group(&self) {
        self.record("pop".into());
    }
}
