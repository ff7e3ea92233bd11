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

//! Editor-only overlays, compiled with the `editor` feature.

mod gizmos_pass;
mod selection_outline_pass;
mod shadow_map_debug_pass;
mod ui_pass;

pub use gizmos_pass::*;
pub use selection_outline_pass::*;
pub use shadow_map_debug_pass::*;
pub use ui_pass::*;

use umbra_core::renderer::api::{LoadAction, RenderTargetDescriptor};

/// `target` with its previous contents kept.
pub(crate) fn keep_contents(target: RenderTargetDescriptor) -> RenderTargetDescriptor {
    RenderTargetDescriptor {
        load: LoadAction::Load,
        ..target
    }
}
