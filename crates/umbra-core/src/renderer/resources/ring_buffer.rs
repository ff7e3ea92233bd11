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

//! Per-frame linear allocator over a [`GraphicsBuffer`].
//!
//! Every render queue of a frame writes its per-draw and instancing data into the
//! same two ring buffers. Each write reserves a fresh, non-overlapping range of
//! aligned elements; the cursor goes back to zero when the frame rolls over, and
//! the previous frame's data stays intact because the backing buffer is
//! double buffered.
//!
//! The cursor never wraps inside a frame. A reservation that does not fit in
//! what is left is refused, the frame's total demand is remembered, and the
//! ring grows to cover it at the next [`begin_frame`](RingBuffer::begin_frame).

use super::graphics_buffer::{align_up, GraphicsBuffer};
use crate::renderer::api::{BufferBinding, BufferUsage};
use crate::renderer::error::ResourceError;
use crate::renderer::traits::GraphicsBackend;
use std::sync::Arc;

/// A ring of fixed-size, alignment-padded elements in a double-buffered buffer.
#[derive(Debug)]
pub struct RingBuffer {
    buffer: GraphicsBuffer,
    element_size: u64,
    capacity: u64,
    cursor: u64,
    /// Elements requested this frame, refused ones included.
    demand: u64,
}

impl RingBuffer {
    /// Creates a ring holding `capacity` elements of at least `element_size` bytes.
    ///
    /// Each element is padded to the constant-buffer offset alignment, so every
    /// offset returned by [`set_data`](Self::set_data) is bindable.
    pub fn new(
        backend: Arc<dyn GraphicsBackend>,
        element_size: u64,
        capacity: u64,
        name: impl Into<String>,
        usage: BufferUsage,
    ) -> Result<Self, ResourceError> {
        let element_size = align_up(
            element_size.max(1),
            backend.constant_buffer_offset_alignment(),
        );
        let capacity = capacity.max(1);
        let buffer = GraphicsBuffer::new(
            backend,
            element_size * capacity,
            name,
            usage | BufferUsage::DYNAMIC,
            true,
        )?;
        Ok(Self {
            buffer,
            element_size,
            capacity,
            cursor: 0,
            demand: 0,
        })
    }

    /// Padded size of one element in bytes.
    pub fn element_size(&self) -> u64 {
        self.element_size
    }

    /// Number of elements.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Index of the next free element.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Whether a reservation was refused since the last `begin_frame`.
    pub fn overflowed(&self) -> bool {
        self.demand > self.capacity
    }

    /// The backing buffer.
    pub fn buffer(&self) -> &GraphicsBuffer {
        &self.buffer
    }

    /// Rewinds the cursor. Call once per frame, after the backend advanced its frame.
    ///
    /// When the previous frame asked for more elements than the ring holds, the
    /// backing buffer first grows to the next power of two above that demand.
    pub fn begin_frame(&mut self) -> Result<(), ResourceError> {
        if self.overflowed() {
            let capacity = self.demand.next_power_of_two();
            self.buffer.resize(capacity * self.element_size)?;
            log::info!(
                "RingBuffer: '{}' grown from {} to {} elements",
                self.buffer.name(),
                self.capacity,
                capacity
            );
            self.capacity = capacity;
        }
        self.cursor = 0;
        self.demand = 0;
        Ok(())
    }

    /// Reserves `count` contiguous elements and returns the byte offset of the
    /// first, or `None` when the rest of this frame's range is too short.
    pub fn try_reserve(&mut self, count: u64) -> Option<u64> {
        let count = count.max(1);
        let was_overflowed = self.overflowed();
        self.demand += count;
        if self.cursor + count > self.capacity {
            if !was_overflowed {
                log::warn!(
                    "RingBuffer: '{}' is full ({} elements), skipping writes until next frame",
                    self.buffer.name(),
                    self.capacity
                );
            }
            return None;
        }
        let offset = self.cursor * self.element_size;
        self.cursor += count;
        Some(offset)
    }

    /// Reserves `count` contiguous elements and returns the byte offset of the first.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::OutOfBounds`] when the range does not fit in
    /// what is left of this frame.
    pub fn reserve(&mut self, count: u64) -> Result<u64, ResourceError> {
        self.try_reserve(count).ok_or(ResourceError::OutOfBounds)
    }

    /// Writes `data` into a freshly reserved range and returns its byte offset.
    pub fn set_data(&mut self, data: &[u8]) -> Result<u64, ResourceError> {
        self.try_set_data(data)?.ok_or(ResourceError::OutOfBounds)
    }

    /// Like [`set_data`](Self::set_data), but a full ring yields `Ok(None)` and
    /// nothing is written.
    pub fn try_set_data(&mut self, data: &[u8]) -> Result<Option<u64>, ResourceError> {
        let count = (data.len() as u64).div_ceil(self.element_size);
        let Some(offset) = self.try_reserve(count) else {
            return Ok(None);
        };
        self.buffer.set_data(data, offset)?;
        Ok(Some(offset))
    }

    /// A binding of `size` bytes at `offset` in the current frame's buffer.
    pub fn binding(&self, offset: u64, size: u64) -> BufferBinding {
        self.buffer.binding(offset, size)
    }
}
