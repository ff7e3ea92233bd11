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

//! Draw call ordering.
//!
//! Keys, most significant first:
//! 1. material render queue, ascending;
//! 2. depth along the camera forward axis (`dot(aabb.center, forward)`),
//!    ascending for front-to-back and descending for back-to-front;
//! 3. renderable id, ascending, so equal keys keep a fixed order across frames.

use crate::math::{camera_forward, Mat4, Vec3};
use crate::renderer::DrawCallInfo;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// How a render queue orders its draw calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DrawCallSortMode {
    /// Nearest first. Used for opaque geometry to maximize early depth rejection.
    #[default]
    FrontToBack,
    /// Farthest first. Used for blended geometry.
    BackToFront,
    /// Keep the batching order.
    NoSorting,
}

/// Compares draw calls for one camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCallComparer {
    mode: DrawCallSortMode,
    forward: Vec3,
}

impl DrawCallComparer {
    /// Builds a comparer from the camera's view-projection matrix.
    pub fn new(mode: DrawCallSortMode, view_projection: &Mat4) -> Self {
        Self::with_forward(mode, camera_forward(view_projection))
    }

    /// Builds a comparer from an explicit world-space forward direction.
    pub fn with_forward(mode: DrawCallSortMode, forward: Vec3) -> Self {
        Self { mode, forward }
    }

    /// The sort mode.
    pub fn mode(&self) -> DrawCallSortMode {
        self.mode
    }

    fn depth(&self, draw_call: &DrawCallInfo) -> f32 {
        draw_call.aabb.center().dot(self.forward)
    }

    /// Orders two draw calls.
    pub fn compare(&self, a: &DrawCallInfo, b: &DrawCallInfo) -> Ordering {
        let by_depth = || {
            let ordering = self.depth(a).total_cmp(&self.depth(b));
            match self.mode {
                DrawCallSortMode::BackToFront => ordering.reverse(),
                _ => ordering,
            }
        };

        a.render_queue
            .cmp(&b.render_queue)
            .then_with(by_depth)
            .then_with(|| a.renderable.cmp(&b.renderable))
    }

    /// Sorts `draw_calls` in place. Does nothing for [`DrawCallSortMode::NoSorting`].
    pub fn sort(&self, draw_calls: &mut [DrawCallInfo]) {
        if self.mode == DrawCallSortMode::NoSorting {
            return;
        }
        draw_calls.sort_by(|a, b| self.compare(a, b));
    }
}
