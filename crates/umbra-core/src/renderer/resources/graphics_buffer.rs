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

//! Backend buffers replicated per frame in flight.
//!
//! A double-buffered [`GraphicsBuffer`] owns one backend buffer per frame in
//! flight and always writes the one selected by the backend's current frame,
//! so the CPU never overwrites data a previous frame is still reading.
//!
//! ```text
//! frame 0 ─► buffers[0]   frame 1 ─► buffers[1]   frame 2 ─► buffers[2]   frame 3 ─► buffers[0]
//! ```

use crate::renderer::api::{BufferBinding, BufferDescriptor, BufferId, BufferUsage};
use crate::renderer::error::ResourceError;
use crate::renderer::traits::{DebugGroup, GraphicsBackend};
use std::borrow::Cow;
use std::sync::Arc;

/// Rounds `value` up to the next multiple of `alignment`.
#[inline]
pub fn align_up(value: u64, alignment: u64) -> u64 {
    if alignment <= 1 {
        return value;
    }
    value.div_ceil(alignment) * alignment
}

/// A logical buffer backed by one backend buffer, or one per frame in flight.
#[derive(Debug)]
pub struct GraphicsBuffer {
    backend: Arc<dyn GraphicsBackend>,
    name: String,
    usage: BufferUsage,
    double_buffered: bool,
    size: u64,
    physical_size: u64,
    buffers: Vec<BufferId>,
}

impl GraphicsBuffer {
    /// Allocates the backend buffers.
    ///
    /// The physical size is `size` rounded up to the constant-buffer offset
    /// alignment plus one extra alignment unit.
    pub fn new(
        backend: Arc<dyn GraphicsBackend>,
        size: u64,
        name: impl Into<String>,
        usage: BufferUsage,
        double_buffered: bool,
    ) -> Result<Self, ResourceError> {
        let name = name.into();
        let physical_size = Self::physical_size_for(backend.as_ref(), size);
        let count = Self::buffer_count_for(backend.as_ref(), double_buffered);
        let buffers = Self::allocate(backend.as_ref(), &name, usage, physical_size, count)?;

        log::debug!(
            "GraphicsBuffer: created '{}' ({} bytes, {} physical, {} copies)",
            name,
            size,
            physical_size,
            count
        );

        Ok(Self {
            backend,
            name,
            usage,
            double_buffered,
            size,
            physical_size,
            buffers,
        })
    }

    fn physical_size_for(backend: &dyn GraphicsBackend, size: u64) -> u64 {
        let alignment = backend.constant_buffer_offset_alignment();
        align_up(size, alignment) + alignment
    }

    fn buffer_count_for(backend: &dyn GraphicsBackend, double_buffered: bool) -> usize {
        if double_buffered {
            backend.max_frames_in_flight().max(1)
        } else {
            1
        }
    }

    fn allocate(
        backend: &dyn GraphicsBackend,
        name: &str,
        usage: BufferUsage,
        physical_size: u64,
        count: usize,
    ) -> Result<Vec<BufferId>, ResourceError> {
        let mut buffers = Vec::with_capacity(count);
        for index in 0..count {
            let descriptor = BufferDescriptor {
                label: Some(Cow::Owned(format!("{name} {index}"))),
                size: physical_size,
                usage: usage | BufferUsage::COPY_DST | BufferUsage::COPY_SRC,
            };
            match backend.create_buffer(&descriptor) {
                Ok(id) => buffers.push(id),
                Err(err) => {
                    for id in buffers {
                        let _ = backend.delete_buffer(id);
                    }
                    return Err(err);
                }
            }
        }
        Ok(buffers)
    }

    /// The debug name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The logical size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// The allocated size of each backend buffer in bytes.
    pub fn physical_size(&self) -> u64 {
        self.physical_size
    }

    /// Whether one backend buffer exists per frame in flight.
    pub fn is_double_buffered(&self) -> bool {
        self.double_buffered
    }

    /// How many backend buffers back this buffer.
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// The backend buffer used by the frame being recorded.
    pub fn current_buffer(&self) -> BufferId {
        self.buffers[self.backend.current_frame() % self.buffers.len()]
    }

    /// A binding of `size` bytes at `offset` in the current buffer.
    pub fn binding(&self, offset: u64, size: u64) -> BufferBinding {
        BufferBinding {
            buffer: self.current_buffer(),
            offset,
            size,
        }
    }

    /// A binding of the whole logical range of the current buffer.
    pub fn whole_binding(&self) -> BufferBinding {
        self.binding(0, self.size)
    }

    /// Writes `data` at `offset` into the current buffer.
    ///
    /// `offset` is clamped to `[0, size]` and the length to `size - offset`;
    /// anything past the logical size is silently dropped.
    pub fn set_data(&self, data: &[u8], offset: u64) -> Result<(), ResourceError> {
        let offset = offset.min(self.size);
        let len = (data.len() as u64).min(self.size - offset) as usize;
        if len == 0 {
            return Ok(());
        }
        self.backend
            .set_buffer_data(self.current_buffer(), offset, &data[..len])
    }

    /// Grows or shrinks the buffer, keeping the overlapping contents.
    ///
    /// Zero or unchanged sizes are ignored.
    pub fn resize(&mut self, new_size: u64) -> Result<(), ResourceError> {
        if new_size == 0 || new_size == self.size {
            return Ok(());
        }

        let backend = Arc::clone(&self.backend);
        let _group = DebugGroup::new(backend.as_ref(), "GraphicsBuffer Resize");
        backend.begin_copy_pass(&format!("{} Buffer Resize Copy", self.name))?;

        let physical_size = Self::physical_size_for(backend.as_ref(), new_size);
        let replacements = match Self::allocate(
            backend.as_ref(),
            &self.name,
            self.usage,
            physical_size,
            self.buffers.len(),
        ) {
            Ok(buffers) => buffers,
            Err(err) => {
                backend.end_copy_pass()?;
                return Err(err);
            }
        };

        let copy_size = self.size.min(new_size);
        let copied = self
            .buffers
            .iter()
            .zip(&replacements)
            .try_for_each(|(&old, &new)| backend.copy_buffer_sub_data(old, new, 0, 0, copy_size));
        if let Err(err) = copied {
            for id in replacements {
                if let Err(release) = backend.delete_buffer(id) {
                    log::warn!("GraphicsBuffer: failed to release '{}': {}", self.name, release);
                }
            }
            backend.end_copy_pass()?;
            return Err(err);
        }
        for old in std::mem::replace(&mut self.buffers, replacements) {
            if let Err(err) = backend.delete_buffer(old) {
                log::warn!("GraphicsBuffer: failed to release '{}': {}", self.name, err);
            }
        }
        backend.end_copy_pass()?;

        log::debug!(
            "GraphicsBuffer: resized '{}' from {} to {} bytes",
            self.name,
            self.size,
            new_size
        );
        self.size = new_size;
        self.physical_size = physical_size;
        Ok(())
    }
}

impl Drop for GraphicsBuffer {
    fn drop(&mut self) {
        for id in self.buffers.drain(..) {
            if let Err(err) = self.backend.delete_buffer(id) {
                log::warn!("GraphicsBuffer: failed to release '{}': {}", self.name, err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::test_support::MockBackend;

    fn mock(frames: usize) -> Arc<MockBackend> {
        Arc::new(MockBackend::new(frames, 256))
    }

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 256), 0);
        assert_eq!(align_up(1, 256), 256);
        assert_eq!(align_up(256, 256), 256);
        assert_eq!(align_up(257, 256), 512);
        assert_eq!(align_up(13, 1), 13);
    }

    #[test]
    fn test_double_buffered_allocates_one_per_frame_in_flight() {
        let backend = mock(3);
        let buffer =
            GraphicsBuffer::new(backend.clone(), 100, "Test", BufferUsage::CONSTANT, true).unwrap();
        assert_eq!(buffer.buffer_count(), 3);
        assert_eq!(buffer.physical_size(), 512);
        assert_eq!(backend.live_buffers(), 3);

        let single =
            GraphicsBuffer::new(backend.clone(), 256, "Single", BufferUsage::CONSTANT, false)
                .unwrap();
        assert_eq!(single.buffer_count(), 1);
        assert_eq!(single.physical_size(), 512);
    }

    #[test]
    fn test_current_buffer_follows_frame() {
        let backend = mock(2);
        let buffer =
            GraphicsBuffer::new(backend.clone(), 64, "Test", BufferUsage::CONSTANT, true).unwrap();
        let first = buffer.current_buffer();
        backend.begin_frame().unwrap();
        let second = buffer.current_buffer();
        backend.begin_frame().unwrap();
        assert_ne!(first, second);
        assert_eq!(buffer.current_buffer(), first);
    }

    #[test]
    fn test_set_data_clamps_length() {
        let backend = mock(1);
        let buffer =
            GraphicsBuffer::new(backend.clone(), 100, "Test", BufferUsage::CONSTANT, false)
                .unwrap();
        buffer.set_data(&[7u8; 50], 80).unwrap();

        let contents = backend.buffer(buffer.current_buffer());
        assert!(contents[80..100].iter().all(|&b| b == 7));
        assert!(contents[100..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_set_data_past_the_end_writes_nothing() {
        let backend = mock(1);
        let buffer =
            GraphicsBuffer::new(backend.clone(), 100, "Test", BufferUsage::CONSTANT, false)
                .unwrap();
        buffer.set_data(&[7u8; 50], 200).unwrap();

        assert!(backend.buffer(buffer.current_buffer()).iter().all(|&b| b == 0));
        assert!(!backend
            .calls()
            .iter()
            .any(|call| call.starts_with("set_buffer_data")));
    }

    #[test]
    fn test_resize_copies_contents_in_named_copy_pass() {
        let backend = mock(1);
        let mut buffer =
            GraphicsBuffer::new(backend.clone(), 16, "Lighting", BufferUsage::CONSTANT, false)
                .unwrap();
        buffer.set_data(&[1, 2, 3, 4], 0).unwrap();
        let old = buffer.current_buffer();

        buffer.resize(1024).unwrap();

        assert_ne!(buffer.current_buffer(), old);
        assert_eq!(buffer.size(), 1024);
        assert_eq!(&backend.buffer(buffer.current_buffer())[..4], &[1, 2, 3, 4]);
        assert_eq!(backend.live_buffers(), 1);
        assert!(backend
            .calls()
            .contains(&"begin_copy_pass Lighting Buffer Resize Copy".to_string()));
    }

    #[test]
    fn test_failed_resize_copy_closes_pass_and_keeps_buffer() {
        let backend = mock(2);
        let mut buffer =
            GraphicsBuffer::new(backend.clone(), 16, "Lighting", BufferUsage::CONSTANT, true)
                .unwrap();
        buffer.set_data(&[1, 2, 3, 4], 0).unwrap();
        let old = buffer.current_buffer();

        backend.fail_copies(true);
        assert!(matches!(
            buffer.resize(1024),
            Err(ResourceError::BackendError(_))
        ));

        let calls = backend.calls();
        let opened = calls.iter().filter(|c| c.starts_with("begin_copy_pass")).count();
        let closed = calls.iter().filter(|c| *c == "end_copy_pass").count();
        assert_eq!((opened, closed), (1, 1));
        assert_eq!(backend.live_buffers(), 2);
        assert_eq!(buffer.current_buffer(), old);
        assert_eq!(buffer.size(), 16);
        assert_eq!(&backend.buffer(old)[..4], &[1, 2, 3, 4]);

        backend.fail_copies(false);
        buffer.resize(1024).unwrap();
        assert_eq!(buffer.size(), 1024);
        assert_eq!(backend.live_buffers(), 2);
    }

    #[test]
    fn test_resize_to_zero_or_same_is_ignored() {
        let backend = mock(1);
        let mut buffer =
            GraphicsBuffer::new(backend.clone(), 16, "Test", BufferUsage::CONSTANT, false)
                .unwrap();
        let id = buffer.current_buffer();
        buffer.resize(0).unwrap();
        buffer.resize(16).unwrap();
        assert_eq!(buffer.current_buffer(), id);
    }

    #[test]
    fn test_drop_releases_buffers() {
        let backend = mock(3);
        {
            let _buffer =
                GraphicsBuffer::new(backend.clone(), 16, "Test", BufferUsage::CONSTANT, true)
                    .unwrap();
            assert_eq!(backend.live_buffers(), 3);
        }
        assert_eq!(backend.live_buffers(), 0);
    }
}
