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

//! The per-frame context shared by every render queue and pass.

use super::RingBuffer;
use crate::renderer::api::{
    BufferUsage, PerDrawData, PerInstanceData, INSTANCE_MATRICES_BUFFER_NAME,
    PER_DRAW_DATA_BUFFER_NAME,
};
use crate::renderer::error::{RenderError, ResourceError};
use crate::renderer::traits::GraphicsBackend;
use serde::{Deserialize, Serialize};
use std::mem::size_of;
use std::sync::Arc;

/// Number of per-draw elements available to one frame.
pub const PER_DRAW_RING_CAPACITY: u64 = 4096;
/// Number of per-instance elements available to one frame.
pub const INSTANCING_RING_CAPACITY: u64 = 8192;

/// Global frustum culling switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CullingSettings {
    /// When false every renderable passes culling.
    pub enabled: bool,
    /// When true render queues keep the frustum of the last unfrozen frame.
    pub frozen: bool,
}

impl Default for CullingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            frozen: false,
        }
    }
}

/// Counters filled by render queues and passes during a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameCounters {
    /// Draw calls issued, instanced or not.
    pub draw_calls: usize,
    /// Instanced draw calls issued.
    pub instanced_draw_calls: usize,
    /// Instances drawn across all draw calls.
    pub instances: usize,
    /// Renderables rejected by frustum culling.
    pub culled: usize,
    /// Passes executed.
    pub passes: usize,
}

/// Resources shared by every render queue of a frame.
#[derive(Debug)]
pub struct FrameResources {
    backend: Arc<dyn GraphicsBackend>,
    /// Model matrices of instanced batches.
    pub instancing: RingBuffer,
    /// Model matrices of single draws.
    pub per_draw: RingBuffer,
    /// Culling switches read by every `prepare`.
    pub culling: CullingSettings,
    /// Counters of the frame being recorded.
    pub counters: FrameCounters,
    frame_index: u64,
}

impl FrameResources {
    /// Allocates the shared ring buffers.
    pub fn new(
        backend: Arc<dyn GraphicsBackend>,
        culling: CullingSettings,
    ) -> Result<Self, ResourceError> {
        let instancing = RingBuffer::new(
            Arc::clone(&backend),
            size_of::<PerInstanceData>() as u64,
            INSTANCING_RING_CAPACITY,
            INSTANCE_MATRICES_BUFFER_NAME,
            BufferUsage::STRUCTURED,
        )?;
        let per_draw = RingBuffer::new(
            Arc::clone(&backend),
            size_of::<PerDrawData>() as u64,
            PER_DRAW_RING_CAPACITY,
            PER_DRAW_DATA_BUFFER_NAME,
            BufferUsage::CONSTANT,
        )?;

        log::info!(
            "FrameResources: ready on {} backend ({} frames in flight)",
            backend.backend_type(),
            backend.max_frames_in_flight()
        );

        Ok(Self {
            backend,
            instancing,
            per_draw,
            culling,
            counters: FrameCounters::default(),
            frame_index: 0,
        })
    }

    /// The backend every pass records into.
    pub fn backend(&self) -> &Arc<dyn GraphicsBackend> {
        &self.backend
    }

    /// Number of frames started so far.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Starts a frame on the backend and rewinds the ring buffers, growing any
    /// ring the previous frame overflowed.
    pub fn begin_frame(&mut self) -> Result<(), RenderError> {
        self.backend.begin_frame()?;
        self.instancing.begin_frame()?;
        self.per_draw.begin_frame()?;
        self.counters = FrameCounters::default();
        self.frame_index += 1;
        log::trace!("FrameResources: begin frame {}", self.frame_index);
        Ok(())
    }

    /// Submits the frame.
    pub fn end_frame(&mut self) -> Result<(), RenderError> {
        self.backend.end_frame()
    }
}
