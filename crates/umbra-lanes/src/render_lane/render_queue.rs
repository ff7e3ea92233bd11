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

//! Collects, culls, filters, batches and sorts renderables into draw calls.
//!
//! ```text
//! renderables ──cull──► candidates ──filter──► survivors ──batch──► draw calls ──sort──► list
//!                 │                                          │
//!              Frustum                          instancing / per-draw ring buffers
//! ```

use ahash::AHashMap;
use std::mem::size_of;
use umbra_core::math::{Bounds, Frustum, Mat4};
use umbra_core::renderer::api::{
    GeometryId, MaterialId, PerDrawData, PerInstanceData, MAX_INSTANCING_COUNT,
};
use umbra_core::renderer::scene::{MaterialLibrary, Renderable};
use umbra_core::renderer::{
    DrawCallComparer, DrawCallInfo, FrameResources, GraphicsBackend, RenderSettings, ResourceError,
};

/// An ordered list of draw calls for one view.
///
/// Rebuilt from scratch by every [`prepare`](Self::prepare).
#[derive(Debug, Default)]
pub struct RenderQueue {
    draw_calls: Vec<DrawCallInfo>,
    frustum: Option<Frustum>,
    culled: usize,
}

impl RenderQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes every draw call.
    pub fn clear(&mut self) {
        self.draw_calls.clear();
        self.culled = 0;
    }

    /// Whether no draw call survived the last `prepare`.
    pub fn is_empty(&self) -> bool {
        self.draw_calls.is_empty()
    }

    /// The draw calls in submission order.
    pub fn draw_calls(&self) -> &[DrawCallInfo] {
        &self.draw_calls
    }

    /// Renderables rejected by culling in the last `prepare`.
    pub fn culled_count(&self) -> usize {
        self.culled
    }

    /// The frustum used by the last `prepare`, if culling had one.
    pub fn frustum(&self) -> Option<&Frustum> {
        self.frustum.as_ref()
    }

    /// Rebuilds the draw call list for a view.
    ///
    /// Culls `renderables` against the frustum of `view_projection` (unless culling
    /// is disabled, or frozen in which case the previous frustum is reused), applies
    /// the override material and the settings filter, merges instancing-capable
    /// draws sharing geometry and material into batches of at most
    /// [`MAX_INSTANCING_COUNT`], uploads every model matrix to the frame's ring
    /// buffers and sorts the result.
    ///
    /// Draws whose matrices no longer fit in this frame's ring buffers are left
    /// out; the rings grow at the next frame.
    ///
    /// # Errors
    ///
    /// Only ring buffer uploads can fail; culling, batching and sorting never do.
    pub fn prepare(
        &mut self,
        view_projection: &Mat4,
        renderables: &[Renderable],
        materials: &MaterialLibrary,
        settings: &RenderSettings,
        frame: &mut FrameResources,
    ) -> Result<(), ResourceError> {
        self.clear();
        self.update_frustum(view_projection, frame.culling.frozen);

        let mut candidates = self.setup_and_cull(renderables, materials, settings, frame);
        candidates.retain(|call| settings.filter.matches(call));
        self.batch(candidates, frame)?;

        DrawCallComparer::new(settings.sort_mode, view_projection).sort(&mut self.draw_calls);

        frame.counters.culled += self.culled;
        log::trace!(
            "RenderQueue: {} draw calls, {} culled",
            self.draw_calls.len(),
            self.culled
        );
        Ok(())
    }

    fn update_frustum(&mut self, view_projection: &Mat4, frozen: bool) {
        if frozen && self.frustum.is_some() {
            return;
        }
        match Frustum::new(view_projection) {
            Ok(frustum) => self.frustum = Some(frustum),
            Err(err) => {
                log::warn!("RenderQueue: {err}, culling skipped for this view");
                self.frustum = None;
            }
        }
    }

    fn setup_and_cull(
        &mut self,
        renderables: &[Renderable],
        materials: &MaterialLibrary,
        settings: &RenderSettings,
        frame: &FrameResources,
    ) -> Vec<DrawCallInfo> {
        let frustum = self.frustum.filter(|_| frame.culling.enabled);
        let mut candidates = Vec::with_capacity(renderables.len());

        for renderable in renderables {
            let bounds = renderable.world_bounds();
            if let Some(frustum) = &frustum {
                if !frustum.is_visible(&bounds, settings.frustum_culling_planes) {
                    self.culled += 1;
                    continue;
                }
            }

            let material_id = settings.override_material.unwrap_or(renderable.material);
            let Some(material) = materials.get(material_id) else {
                log::warn!(
                    "RenderQueue: renderable {:?} references a missing material",
                    renderable.id
                );
                continue;
            };
            if !settings.tags_match(&material.tags) {
                continue;
            }

            candidates.push(DrawCallInfo::single(
                renderable.id,
                renderable.geometry,
                material_id,
                renderable.transform,
                bounds,
                renderable.cast_shadows,
                material.render_queue,
                material.supports_instancing,
            ));
        }
        candidates
    }

    fn batch(
        &mut self,
        candidates: Vec<DrawCallInfo>,
        frame: &mut FrameResources,
    ) -> Result<(), ResourceError> {
        // Groups in order of first appearance; non-instancing draws are groups of one.
        let mut groups: Vec<Vec<DrawCallInfo>> = Vec::new();
        let mut index: AHashMap<(GeometryId, MaterialId), usize> = AHashMap::new();
        for call in candidates {
            if call.supports_instancing {
                let slot = *index.entry(call.batch_key()).or_insert_with(|| {
                    groups.push(Vec::new());
                    groups.len() - 1
                });
                groups[slot].push(call);
            } else {
                groups.push(vec![call]);
            }
        }

        for mut group in groups {
            if group.len() == 1 {
                let Some(mut call) = group.pop() else {
                    continue;
                };
                let data = PerDrawData::from_model(call.transform());
                let Some(offset) = frame.per_draw.try_set_data(bytemuck::bytes_of(&data))? else {
                    continue;
                };
                call.buffer_offset = offset;
                self.draw_calls.push(call);
                continue;
            }

            for chunk in group.chunks(MAX_INSTANCING_COUNT) {
                let instances: Vec<PerInstanceData> = chunk
                    .iter()
                    .map(|call| PerInstanceData::from_model(call.transform()))
                    .collect();
                let Some(buffer_offset) = frame
                    .instancing
                    .try_set_data(bytemuck::cast_slice(&instances))?
                else {
                    continue;
                };

                let first = &chunk[0];
                let aabb = chunk
                    .iter()
                    .skip(1)
                    .fold(first.aabb, |acc: Bounds, call| acc.combine(&call.aabb));
                self.draw_calls.push(DrawCallInfo {
                    geometry: first.geometry,
                    material: first.material,
                    renderable: first.renderable,
                    matrices: chunk.iter().map(DrawCallInfo::transform).collect(),
                    aabb,
                    cast_shadows: chunk.iter().any(|call| call.cast_shadows),
                    instanced: true,
                    render_queue: first.render_queue,
                    supports_instancing: true,
                    buffer_offset,
                });
            }
        }
        Ok(())
    }

    /// Issues every draw call on `backend`, reading matrices from the frame's ring
    /// buffers. Returns the number of draw calls issued.
    pub fn submit(
        &self,
        backend: &dyn GraphicsBackend,
        frame: &mut FrameResources,
    ) -> Result<usize, ResourceError> {
        for call in &self.draw_calls {
            if call.instanced {
                let count = call.instance_count();
                let binding = frame.instancing.binding(
                    call.buffer_offset,
                    (count * size_of::<PerInstanceData>()) as u64,
                );
                backend.draw_elements_instanced(
                    call.geometry,
                    call.material,
                    binding,
                    count as u32,
                )?;
                frame.counters.instanced_draw_calls += 1;
                frame.counters.instances += count;
            } else {
                let binding = frame
                    .per_draw
                    .binding(call.buffer_offset, size_of::<PerDrawData>() as u64);
                backend.draw_elements(call.geometry, call.material, binding)?;
                frame.counters.instances += 1;
            }
            frame.counters.draw_calls += 1;
        }
        Ok(self.draw_calls.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use umbra_core::math::{FrustumPlanes, Vec3};
    use umbra_core::renderer::api::RenderableId;
    use umbra_core::renderer::scene::Material;
    use umbra_core::renderer::{CullingSettings, DrawCallFilter, DrawCallSortMode};
    use umbra_infra::HeadlessBackend;

    struct Fixture {
        materials: MaterialLibrary,
        instanced: MaterialId,
        plain: MaterialId,
        glass: MaterialId,
        frame: FrameResources,
        view_projection: Mat4,
    }

    fn fixture() -> Fixture {
        let mut materials = MaterialLibrary::new();
        let instanced = materials.insert(Material::new("Instanced").with_instancing(true));
        let plain = materials.insert(Material::new("Plain"));
        let glass = materials.insert(
            Material::new("Glass")
                .with_render_queue(3000)
                .with_instancing(true),
        );
        let backend = Arc::new(HeadlessBackend::new());
        let frame = FrameResources::new(backend, CullingSettings::default()).unwrap();
        let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        let proj = Mat4::perspective_rh_gl(60f32.to_radians(), 1.0, 0.1, 100.0);
        Fixture {
            materials,
            instanced,
            plain,
            glass,
            frame,
            view_projection: proj * view,
        }
    }

    fn renderable(id: u64, z: f32, geometry: u32, material: MaterialId) -> Renderable {
        Renderable::new(
            RenderableId(id),
            Mat4::from_translation(Vec3::new(0.0, 0.0, z)),
            Bounds::from_center_extents(Vec3::ZERO, Vec3::splat(0.5)),
            GeometryId(geometry),
            material,
        )
    }

    fn prepare(fx: &mut Fixture, renderables: &[Renderable], settings: &RenderSettings) -> RenderQueue {
        let mut queue = RenderQueue::new();
        queue
            .prepare(
                &fx.view_projection,
                renderables,
                &fx.materials,
                settings,
                &mut fx.frame,
            )
            .unwrap();
        queue
    }

    #[test]
    fn test_culls_objects_behind_the_camera() {
        let mut fx = fixture();
        let scene = vec![
            renderable(1, -5.0, 0, fx.plain),
            renderable(2, 5.0, 0, fx.plain),
        ];
        let queue = prepare(&mut fx, &scene, &RenderSettings::default());
        assert_eq!(queue.draw_calls().len(), 1);
        assert_eq!(queue.draw_calls()[0].renderable, RenderableId(1));
        assert_eq!(queue.culled_count(), 1);
        assert_eq!(fx.frame.counters.culled, 1);
    }

    #[test]
    fn test_disabled_culling_keeps_everything() {
        let mut fx = fixture();
        fx.frame.culling.enabled = false;
        let scene = vec![
            renderable(1, -5.0, 0, fx.plain),
            renderable(2, 5.0, 0, fx.plain),
        ];
        let queue = prepare(&mut fx, &scene, &RenderSettings::default());
        assert_eq!(queue.draw_calls().len(), 2);
    }

    #[test]
    fn test_frozen_culling_keeps_previous_frustum() {
        let mut fx = fixture();
        let scene = vec![renderable(1, -5.0, 0, fx.plain)];
        let mut queue = prepare(&mut fx, &scene, &RenderSettings::default());

        fx.frame.culling.frozen = true;
        let turned_around = Mat4::perspective_rh_gl(60f32.to_radians(), 1.0, 0.1, 100.0)
            * Mat4::look_at_rh(Vec3::ZERO, Vec3::Z, Vec3::Y);
        queue
            .prepare(
                &turned_around,
                &scene,
                &fx.materials,
                &RenderSettings::default(),
                &mut fx.frame,
            )
            .unwrap();
        assert_eq!(queue.draw_calls().len(), 1);
    }

    #[test]
    fn test_side_planes_only_ignore_far_plane() {
        let mut fx = fixture();
        let scene = vec![renderable(1, -500.0, 0, fx.plain)];
        let all = prepare(&mut fx, &scene, &RenderSettings::default());
        assert!(all.is_empty());

        let sides = RenderSettings::default().with_culling_planes(FrustumPlanes::SIDES);
        let queue = prepare(&mut fx, &scene, &sides);
        assert_eq!(queue.draw_calls().len(), 1);
    }

    #[test]
    fn test_single_instancing_renderable_is_not_instanced() {
        let mut fx = fixture();
        let scene = vec![renderable(1, -5.0, 7, fx.instanced)];
        let queue = prepare(&mut fx, &scene, &RenderSettings::default());
        assert_eq!(queue.draw_calls().len(), 1);
        assert!(!queue.draw_calls()[0].instanced);
    }

    #[test]
    fn test_instanced_batches_are_capped() {
        for n in [2usize, 255, 256, 257, 600] {
            let mut fx = fixture();
            fx.frame.culling.enabled = false;
            let scene: Vec<_> = (0..n)
                .map(|i| renderable(i as u64, -5.0 - i as f32 * 0.01, 3, fx.instanced))
                .collect();
            let queue = prepare(&mut fx, &scene, &RenderSettings::default());

            let expected = n.div_ceil(MAX_INSTANCING_COUNT);
            assert_eq!(queue.draw_calls().len(), expected, "n = {n}");
            assert!(queue.draw_calls().iter().all(|c| c.instanced));
            assert!(queue
                .draw_calls()
                .iter()
                .all(|c| c.instance_count() <= MAX_INSTANCING_COUNT));
            let total: usize = queue.draw_calls().iter().map(|c| c.instance_count()).sum();
            assert_eq!(total, n);
        }
    }

    #[test]
    fn test_batches_split_by_geometry_and_material() {
        let mut fx = fixture();
        let scene = vec![
            renderable(1, -5.0, 1, fx.instanced),
            renderable(2, -6.0, 1, fx.instanced),
            renderable(3, -7.0, 2, fx.instanced),
            renderable(4, -8.0, 1, fx.plain),
            renderable(5, -9.0, 1, fx.plain),
        ];
        let queue = prepare(&mut fx, &scene, &RenderSettings::default());
        let instanced: Vec<_> = queue.draw_calls().iter().filter(|c| c.instanced).collect();
        assert_eq!(instanced.len(), 1);
        assert_eq!(instanced[0].instance_count(), 2);
        assert_eq!(queue.draw_calls().len(), 4);
    }

    #[test]
    fn test_batch_offsets_do_not_overlap() {
        let mut fx = fixture();
        let scene = vec![
            renderable(1, -5.0, 1, fx.instanced),
            renderable(2, -6.0, 1, fx.instanced),
            renderable(3, -7.0, 2, fx.instanced),
            renderable(4, -8.0, 2, fx.instanced),
        ];
        let queue = prepare(&mut fx, &scene, &RenderSettings::default());
        let mut offsets: Vec<_> = queue.draw_calls().iter().map(|c| c.buffer_offset).collect();
        offsets.sort_unstable();
        offsets.dedup();
        assert_eq!(offsets.len(), 2);
    }

    #[test]
    fn test_queues_never_share_offsets_within_a_frame() {
        use umbra_core::renderer::resources::PER_DRAW_RING_CAPACITY;

        let mut fx = fixture();
        fx.frame.culling.enabled = false;
        let settings = RenderSettings::new(DrawCallSortMode::NoSorting, DrawCallFilter::All);
        let per_queue = 3000;
        let scene: Vec<_> = (0..per_queue)
            .map(|i| renderable(i, -5.0, i as u32, fx.plain))
            .collect();

        let first = prepare(&mut fx, &scene, &settings);
        let second = prepare(&mut fx, &scene, &settings);
        let offsets: Vec<u64> = first
            .draw_calls()
            .iter()
            .chain(second.draw_calls())
            .map(|c| c.buffer_offset)
            .collect();
        let distinct: std::collections::HashSet<_> = offsets.iter().collect();

        assert_eq!(offsets.len() as u64, PER_DRAW_RING_CAPACITY);
        assert_eq!(distinct.len(), offsets.len());
        assert_eq!(first.draw_calls().len(), per_queue as usize);
        assert!(fx.frame.per_draw.overflowed());

        fx.frame.begin_frame().unwrap();
        let first = prepare(&mut fx, &scene, &settings);
        let second = prepare(&mut fx, &scene, &settings);
        let distinct: std::collections::HashSet<_> = first
            .draw_calls()
            .iter()
            .chain(second.draw_calls())
            .map(|c| c.buffer_offset)
            .collect();
        assert_eq!(distinct.len(), 2 * per_queue as usize);
        assert!(!fx.frame.per_draw.overflowed());
    }

    #[test]
    fn test_filter_partitions_opaque_and_transparent() {
        let mut fx = fixture();
        let scene = vec![
            renderable(1, -5.0, 1, fx.plain),
            renderable(2, -6.0, 1, fx.glass),
            renderable(3, -7.0, 2, fx.glass),
            renderable(4, -8.0, 3, fx.instanced),
        ];
        let opaque = prepare(&mut fx, &scene, &RenderSettings::opaque());
        let transparent = prepare(&mut fx, &scene, &RenderSettings::transparent());
        let all = prepare(&mut fx, &scene, &RenderSettings::default());

        assert_eq!(opaque.draw_calls().len(), 2);
        assert_eq!(transparent.draw_calls().len(), 2);
        assert_eq!(
            opaque.draw_calls().len() + transparent.draw_calls().len(),
            all.draw_calls().len()
        );
        assert!(opaque.draw_calls().iter().all(|c| c.render_queue < 3000));
        assert!(transparent.draw_calls().iter().all(|c| c.render_queue >= 3000));
    }

    #[test]
    fn test_override_material_replaces_material() {
        let mut fx = fixture();
        let scene = vec![
            renderable(1, -5.0, 1, fx.plain),
            renderable(2, -6.0, 1, fx.instanced),
        ];
        let settings = RenderSettings::default().with_override_material(fx.glass);
        let queue = prepare(&mut fx, &scene, &settings);
        assert!(queue.draw_calls().iter().all(|c| c.material == fx.glass));
        // Both now share geometry and an instancing material.
        assert_eq!(queue.draw_calls().len(), 1);
        assert!(queue.draw_calls()[0].instanced);
    }

    #[test]
    fn test_shadow_caster_filter() {
        let mut fx = fixture();
        let scene = vec![
            renderable(1, -5.0, 1, fx.plain),
            renderable(2, -6.0, 1, fx.plain).with_cast_shadows(false),
        ];
        let settings = RenderSettings::new(DrawCallSortMode::FrontToBack, DrawCallFilter::ShadowCasters);
        let queue = prepare(&mut fx, &scene, &settings);
        assert_eq!(queue.draw_calls().len(), 1);
        assert_eq!(queue.draw_calls()[0].renderable, RenderableId(1));
    }

    #[test]
    fn test_sort_modes_reverse_depth_order() {
        let mut fx = fixture();
        let scene = vec![
            renderable(1, -20.0, 1, fx.plain),
            renderable(2, -5.0, 2, fx.plain),
            renderable(3, -10.0, 3, fx.plain),
        ];
        let ids = |q: &RenderQueue| -> Vec<u64> {
            q.draw_calls().iter().map(|c| c.renderable.0).collect()
        };
        let front = prepare(
            &mut fx,
            &scene,
            &RenderSettings::new(DrawCallSortMode::FrontToBack, DrawCallFilter::All),
        );
        let back = prepare(
            &mut fx,
            &scene,
            &RenderSettings::new(DrawCallSortMode::BackToFront, DrawCallFilter::All),
        );
        assert_eq!(ids(&front), vec![2, 3, 1]);
        let mut reversed = ids(&back);
        reversed.reverse();
        assert_eq!(ids(&front), reversed);
    }

    #[test]
    fn test_prepare_clears_previous_results() {
        let mut fx = fixture();
        let scene = vec![renderable(1, -5.0, 1, fx.plain)];
        let mut queue = prepare(&mut fx, &scene, &RenderSettings::default());
        assert!(!queue.is_empty());
        queue
            .prepare(
                &fx.view_projection,
                &[],
                &fx.materials,
                &RenderSettings::default(),
                &mut fx.frame,
            )
            .unwrap();
        assert!(queue.is_empty());
    }

    #[test]
    fn test_degenerate_matrix_skips_culling() {
        let mut fx = fixture();
        let scene = vec![renderable(1, 5.0, 1, fx.plain)];
        let mut queue = RenderQueue::new();
        queue
            .prepare(
                &Mat4::ZERO,
                &scene,
                &fx.materials,
                &RenderSettings::default(),
                &mut fx.frame,
            )
            .unwrap();
        assert!(queue.frustum().is_none());
        assert_eq!(queue.draw_calls().len(), 1);
    }
}
