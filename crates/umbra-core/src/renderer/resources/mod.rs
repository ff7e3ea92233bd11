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

//! GPU memory that outlives a single pass.

mod frame_resources;
mod graphics_buffer;
mod ring_buffer;

pub use self::frame_resources::{
    CullingSettings, FrameCounters, FrameResources, INSTANCING_RING_CAPACITY, PER_DRAW_RING_CAPACITY,
};
pub use self::graphics_buffer::{align_up, GraphicsBuffer};
pub use self::ring_buffer::RingBuffer;
