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

use super::{DrawCallFilter, DrawCallSortMode};
use crate::math::FrustumPlanes;
use crate::renderer::api::MaterialId;
use std::collections::BTreeMap;

/// What a render queue keeps, how it orders it, and what it draws it with.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderSettings {
    /// Draw call ordering.
    pub sort_mode: DrawCallSortMode,
    /// Draw call predicate.
    pub filter: DrawCallFilter,
    /// When set, replaces the material of every renderable.
    pub override_material: Option<MaterialId>,
    /// Shader-pass tags a material pass must carry to be drawn.
    pub tags: BTreeMap<String, String>,
    /// Planes tested during culling.
    pub frustum_culling_planes: FrustumPlanes,
}

impl RenderSettings {
    /// Settings with the given sort mode and filter.
    pub fn new(sort_mode: DrawCallSortMode, filter: DrawCallFilter) -> Self {
        Self {
            sort_mode,
            filter,
            ..Default::default()
        }
    }

    /// Front-to-back, opaque only.
    pub fn opaque() -> Self {
        Self::new(DrawCallSortMode::FrontToBack, DrawCallFilter::Opaque)
    }

    /// Back-to-front, transparent only.
    pub fn transparent() -> Self {
        Self::new(DrawCallSortMode::BackToFront, DrawCallFilter::Transparent)
    }

    /// Shadow casters drawn with `material`.
    pub fn shadow_casters(material: MaterialId) -> Self {
        Self::new(DrawCallSortMode::FrontToBack, DrawCallFilter::ShadowCasters)
            .with_override_material(material)
    }

    /// Replaces the material of every draw.
    pub fn with_override_material(mut self, material: MaterialId) -> Self {
        self.override_material = Some(material);
        self
    }

    /// Restricts culling to `planes`.
    pub fn with_culling_planes(mut self, planes: FrustumPlanes) -> Self {
        self.frustum_culling_planes = planes;
        self
    }

    /// Adds a required shader-pass tag.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Returns `true` if every tag of these settings is present with the same value
    /// in `pass_tags`. Settings without tags match every pass.
    pub fn tags_match(&self, pass_tags: &BTreeMap<String, String>) -> bool {
        self.tags
            .iter()
            .all(|(key, value)| pass_tags.get(key) == Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_tags_match_everything() {
        let settings = RenderSettings::opaque();
        assert!(settings.tags_match(&tags(&[])));
        assert!(settings.tags_match(&tags(&[("LightMode", "Forward")])));
    }

    #[test]
    fn test_tags_require_same_value() {
        let settings = RenderSettings::opaque().with_tag("LightMode", "Forward");
        assert!(settings.tags_match(&tags(&[("LightMode", "Forward"), ("Queue", "Geometry")])));
        assert!(!settings.tags_match(&tags(&[("LightMode", "ShadowCaster")])));
        assert!(!settings.tags_match(&tags(&[])));
    }

    #[test]
    fn test_presets() {
        assert_eq!(RenderSettings::opaque().filter, DrawCallFilter::Opaque);
        assert_eq!(
            RenderSettings::transparent().sort_mode,
            DrawCallSortMode::BackToFront
        );
        assert_eq!(
            RenderSettings::opaque().frustum_culling_planes,
            FrustumPlanes::ALL
        );
    }
}
