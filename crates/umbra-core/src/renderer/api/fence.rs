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

//! Cross-queue GPU synchronization handles.
//!
//! Work on the render queue and the copy queue is ordered only through fences:
//! the producing queue signals, the consuming queue waits.
//!
//! ```text
//! create_fence ──► Unsignaled ──signal_fence──► Signaled ──wait_for_fence──► Signaled
//!                                                  ▲                             │
//!                                                  └──────── (no-op) ────────────┘
//! ```

use std::borrow::Cow;
use std::fmt;

/// A logical GPU queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuQueue {
    /// The graphics queue running render passes.
    Render,
    /// The transfer queue running copy passes.
    Copy,
}

impl fmt::Display for GpuQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuQueue::Render => write!(f, "Render"),
            GpuQueue::Copy => write!(f, "Copy"),
        }
    }
}

/// The direction of a cross-queue dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FenceType {
    /// Signaled by the render queue, waited on by the copy queue.
    RenderToCopy,
    /// Signaled by the copy queue, waited on by the render queue.
    CopyToRender,
}

impl FenceType {
    /// The queue that signals fences of this type.
    pub fn signal_queue(self) -> GpuQueue {
        match self {
            FenceType::RenderToCopy => GpuQueue::Render,
            FenceType::CopyToRender => GpuQueue::Copy,
        }
    }

    /// The queue that waits on fences of this type.
    pub fn wait_queue(self) -> GpuQueue {
        match self {
            FenceType::RenderToCopy => GpuQueue::Copy,
            FenceType::CopyToRender => GpuQueue::Render,
        }
    }
}

/// The two states of the fence protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FenceState {
    /// Created but not yet signaled by its producing queue.
    Unsignaled,
    /// Signaled; waits complete immediately.
    Signaled,
}

/// An opaque identifier of a backend fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FenceId(pub u64);

/// A backend fence handle together with its dependency direction.
///
/// Passes hold these as plain values; the backend owns the underlying object and
/// releases it on [`delete_fence`](crate::renderer::GraphicsBackend::delete_fence).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GraphicsBackendFence {
    /// The backend handle.
    pub id: FenceId,
    /// Which queue signals and which queue waits.
    pub fence_type: FenceType,
    /// Debug name shown in captures and logs.
    pub name: Cow<'static, str>,
}
