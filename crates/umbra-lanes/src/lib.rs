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

//! Hot-path rendering for Umbra.
//!
//! This crate turns the scene described by a
//! [`RenderContext`](umbra_core::renderer::scene::RenderContext) into backend
//! commands: [`RenderQueue`](render_lane::RenderQueue) builds culled, batched and
//! sorted draw lists, and the passes of [`render_lane`] record them in a fixed
//! priority order.

#![warn(missing_docs)]

pub mod error;
pub mod render_lane;

pub use error::PassError;
pub use render_lane::*;
