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

//! Backend-agnostic rendering contracts.
//!
//! Everything a render pass needs to talk about lives here: the
//! [`GraphicsBackend`] trait and its resource handles, the per-frame buffers,
//! the [`DrawCallInfo`] records produced by culling, the settings that drive
//! filtering and sorting, and the scene data read each frame.

pub mod api;
pub mod draw_call;
pub mod error;
pub mod pass;
pub mod resources;
pub mod scene;
pub mod settings;
pub mod traits;

#[cfg(test)]
mod test_support;

pub use self::api::*;
pub use self::draw_call::DrawCallInfo;
pub use self::error::{FenceError, RenderError, ResourceError};
pub use self::pass::{PassKind, RenderPass, RenderPassList};
pub use self::resources::{
    CullingSettings, FrameCounters, FrameResources, GraphicsBuffer, RingBuffer,
};
pub use self::settings::{
    DrawCallComparer, DrawCallFilter, DrawCallSortMode, GraphicsSettings, RenderSettings,
    TonemappingMode,
};
pub use self::traits::{BackendType, DebugGroup, GraphicsBackend};
