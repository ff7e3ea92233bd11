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

//! Draw call predicates.

use crate::renderer::api::TRANSPARENT_RENDER_QUEUE;
use crate::renderer::DrawCallInfo;
use serde::{Deserialize, Serialize};

/// Selects which draw calls a render queue keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DrawCallFilter {
    /// Keeps everything.
    #[default]
    All,
    /// Keeps render queues below [`TRANSPARENT_RENDER_QUEUE`].
    Opaque,
    /// Keeps render queues at or above [`TRANSPARENT_RENDER_QUEUE`].
    Transparent,
    /// Keeps draws flagged as shadow casters.
    ShadowCasters,
}

impl DrawCallFilter {
    /// Returns `true` if `draw_call` passes the filter.
    #[inline]
    pub fn matches(self, draw_call: &DrawCallInfo) -> bool {
        match self {
            DrawCallFilter::All => true,
            DrawCallFilter::Opaque => is_opaque(draw_call.render_queue),
            DrawCallFilter::Transparent => !is_opaque(draw_call.render_queue),
            DrawCallFilter::ShadowCasters => draw_call.cast_shadows,
        }
    }
}

/// Whether a render queue value belongs to the opaque range.
#[inline]
pub fn is_opaque(render_queue: i32) -> bool {
    render_queue < TRANSPARENT_RENDER_QUEUE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Bounds, Mat4};
    use crate::renderer::api::{GeometryId, MaterialId, RenderableId};

    fn draw(render_queue: i32, cast_shadows: bool) -> DrawCallInfo {
        DrawCallInfo::single(
            RenderableId(0),
            GeometryId(0),
            MaterialId::default(),
            Mat4::IDENTITY,
            Bounds::ZERO,
            cast_shadows,
            render_queue,
            false,
        )
    }

    #[test]
    fn test_transparent_threshold() {
        assert!(DrawCallFilter::Opaque.matches(&draw(2999, false)));
        assert!(!DrawCallFilter::Transparent.matches(&draw(2999, false)));
        assert!(DrawCallFilter::Transparent.matches(&draw(3000, false)));
        assert!(!DrawCallFilter::Opaque.matches(&draw(3000, false)));
    }

    #[test]
    fn test_opaque_and_transparent_partition() {
        for queue in [-100, 0, 1000, 2000, 2450, 2999, 3000, 3001, 4000, 5000] {
            let call = draw(queue, false);
            let opaque = DrawCallFilter::Opaque.matches(&call);
            let transparent = DrawCallFilter::Transparent.matches(&call);
            assert!(opaque ^ transparent, "queue {queue} must be in exactly one set");
        }
    }

    #[test]
    fn test_shadow_casters_and_all() {
        assert!(DrawCallFilter::ShadowCasters.matches(&draw(2000, true)));
        assert!(!DrawCallFilter::ShadowCasters.matches(&draw(2000, false)));
        assert!(DrawCallFilter::All.matches(&draw(4000, false)));
    }
}
