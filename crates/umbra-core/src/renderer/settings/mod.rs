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

//! Settings that drive render queues and passes.
//!
//! [`RenderSettings`] belongs to one render queue; [`GraphicsSettings`] is global
//! and loaded from configuration.

mod comparer;
mod filter;
mod graphics_settings;
mod render_settings;

pub use self::comparer::{DrawCallComparer, DrawCallSortMode};
pub use self::filter::{is_opaque, DrawCallFilter};
pub use self::graphics_settings::{GraphicsSettings, TonemappingMode};
pub use self::render_settings::RenderSettings;
