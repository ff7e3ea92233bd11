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

//! Shadow map rendering for directional, spot and point lights.
//!
//! Every shadow view owns a [`RenderQueue`] filtered to shadow casters and drawn
//! with the built-in shadow caster material:
//!
//! - the directional light gets one view per cascade (or a single view fitted
//!   to the bounds of the whole scene when only one cascade is configured),
//! - each of the first [`MAX_SPOT_LIGHT_SOURCES`] shadowed spot lights gets one
//!   perspective view,
//! - each of the first [`MAX_POINT_LIGHT_SOURCES`] shadowed point lights gets six
//!   90 degree cube-face views.
//!
//! The biased light matrices are gathered in a [`ShadowsData`] constant buffer
//! bound under [`SHADOWS_BUFFER_NAME`] for the passes that sample the maps.

use super::{priority, RenderQueue};
use crate::error::PassError;
use std::mem::size_of;
use std::sync::Arc;
use umbra_core::math::{Bounds, FrustumPlanes, Mat4, Quat, Vec3, Vec4};
use umbra_core::renderer::api::{
    BufferUsage, CameraData, DepthState, RenderTargetDescriptor, ResourceState, ShadowsData,
    TextureDescriptor, TextureFormat, TextureId, Viewport, CAMERA_DATA_BUFFER_NAME,
    MAX_POINT_LIGHT_SOURCES, MAX_SHADOW_CASCADES, MAX_SPOT_LIGHT_SOURCES,
    POINT_LIGHT_SHADOW_FACES, SHADOWS_BUFFER_NAME,
};
use umbra_core::renderer::scene::{
    combined_world_bounds, CameraView, DirectionalLight, PointLight, RenderContext, SpotLight,
};
use umbra_core::renderer::{
    DebugGroup, FrameResources, GraphicsBackend, GraphicsBuffer, GraphicsSettings, PassKind,
    RenderError, RenderPass, RenderSettings, RingBuffer,
};

/// Upper bound on the shadow views of one frame.
pub const MAX_SHADOW_VIEWS: usize =
    MAX_SHADOW_CASCADES + MAX_SPOT_LIGHT_SOURCES + MAX_POINT_LIGHT_SOURCES * POINT_LIGHT_SHADOW_FACES;

/// Near plane of spot light projections.
pub const SPOT_SHADOW_NEAR: f32 = 0.5;
/// Far plane of spot light projections.
pub const SPOT_SHADOW_FAR: f32 = 100.0;
/// Near plane of point light cube faces.
pub const POINT_SHADOW_NEAR: f32 = 0.1;
/// Extra light-space depth kept in front of and behind each cascade, so casters
/// outside the camera slice still land in the map.
pub const CASCADE_Z_PADDING: f32 = 100.0;
/// Thinnest cascade slice, relative to its near distance.
const MIN_CASCADE_DEPTH: f32 = 1e-3;

/// Far distance of a cascade starting at `near`, pushed out when the configured
/// split would leave an empty or inverted slice.
fn cascade_far(near: f32, far: f32) -> f32 {
    let min_far = near + (near.abs() * MIN_CASCADE_DEPTH).max(MIN_CASCADE_DEPTH);
    if far < min_far {
        log::debug!("ShadowCasterPass: cascade [{near}, {far}] too thin, extended to {min_far}");
        return min_far;
    }
    far
}

/// Which light and slice a shadow view renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowViewKind {
    /// A directional cascade (index 0 when fitted to the scene).
    Cascade(usize),
    /// A spot light.
    Spot(usize),
    /// One face of a point light.
    PointFace {
        /// Index of the light.
        light: usize,
        /// Cube face, in `+X, -X, +Y, -Y, +Z, -Z` order.
        face: usize,
    },
}

/// One light-space camera and the map layer it renders into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowView {
    /// The light and slice.
    pub kind: ShadowViewKind,
    /// The depth layer written.
    pub target: RenderTargetDescriptor,
    /// World-to-light matrix.
    pub view: Mat4,
    /// Light projection.
    pub projection: Mat4,
    /// Near plane of the projection.
    pub near: f32,
    /// Far plane of the projection.
    pub far: f32,
    /// Planes tested when culling casters.
    pub planes: FrustumPlanes,
}

impl ShadowView {
    /// `projection * view`.
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }
}

/// Maps clip space `[-1, 1]` to texture space `[0, 1]` on every axis.
pub fn shadow_bias_matrix() -> Mat4 {
    Mat4::from_scale_rotation_translation(Vec3::splat(0.5), Quat::IDENTITY, Vec3::splat(0.5))
}

fn up_for(direction: Vec3) -> Vec3 {
    if direction.y.abs() > 0.99 {
        Vec3::Z
    } else {
        Vec3::Y
    }
}

/// Orthographic light camera enclosing `bounds`.
///
/// The eye sits the largest bounds dimension back from the center along the
/// light direction, so the whole box is in front of it.
pub fn fit_directional_to_bounds(direction: Vec3, bounds: &Bounds) -> (Mat4, Mat4, f32, f32) {
    let direction = direction.normalize();
    let center = bounds.center();
    let max_size = bounds.size().max_element().max(1.0);
    let eye = center - direction * max_size;
    let view = Mat4::look_at_rh(eye, center, up_for(direction));

    let light_space = bounds.transformed(&view);
    let near = -light_space.max.z;
    let far = -light_space.min.z;
    let projection = Mat4::orthographic_rh_gl(
        light_space.min.x,
        light_space.max.x,
        light_space.min.y,
        light_space.max.y,
        near,
        far,
    );
    (view, projection, near, far)
}

/// World-space corners of the camera frustum slice between `near` and `far`.
pub fn frustum_slice_corners(camera: &CameraView, near: f32, far: f32) -> [Vec3; 8] {
    let projection = Mat4::perspective_rh_gl(camera.fov_y, camera.aspect, near, far);
    let inverse = (projection * camera.view).inverse();
    let mut corners = [Vec3::ZERO; 8];
    let mut i = 0;
    for x in [-1.0, 1.0] {
        for y in [-1.0, 1.0] {
            for z in [-1.0, 1.0] {
                let point = inverse * Vec4::new(x, y, z, 1.0);
                corners[i] = point.truncate() / point.w;
                i += 1;
            }
        }
    }
    corners
}

/// Orthographic light camera enclosing one camera frustum slice.
pub fn fit_directional_to_slice(
    direction: Vec3,
    camera: &CameraView,
    near: f32,
    far: f32,
) -> (Mat4, Mat4, f32, f32) {
    let direction = direction.normalize();
    let corners = frustum_slice_corners(camera, near, far);
    let center = corners.iter().copied().sum::<Vec3>() / 8.0;
    let view = Mat4::look_at_rh(center, center + direction, up_for(direction));

    let light_space = Bounds::from_points(&corners.map(|p| view.transform_point3(p)));
    let z_near = -light_space.max.z - CASCADE_Z_PADDING;
    let z_far = -light_space.min.z + CASCADE_Z_PADDING;
    let projection = Mat4::orthographic_rh_gl(
        light_space.min.x,
        light_space.max.x,
        light_space.min.y,
        light_space.max.y,
        z_near,
        z_far,
    );
    (view, projection, z_near, z_far)
}

/// Perspective camera covering a spot light cone.
pub fn spot_view_projection(light: &SpotLight) -> (Mat4, Mat4) {
    let direction = light.direction.normalize();
    let view = Mat4::look_at_rh(light.position, light.position + direction, up_for(direction));
    let projection =
        Mat4::perspective_rh_gl(light.cutoff * 2.0, 1.0, SPOT_SHADOW_NEAR, SPOT_SHADOW_FAR);
    (view, projection)
}

/// The six cube-face cameras of a point light.
pub fn point_face_views(light: &PointLight) -> [(Mat4, Mat4); POINT_LIGHT_SHADOW_FACES] {
    const FACES: [(Vec3, Vec3); POINT_LIGHT_SHADOW_FACES] = [
        (Vec3::X, Vec3::NEG_Y),
        (Vec3::NEG_X, Vec3::NEG_Y),
        (Vec3::Y, Vec3::Z),
        (Vec3::NEG_Y, Vec3::NEG_Z),
        (Vec3::Z, Vec3::NEG_Y),
        (Vec3::NEG_Z, Vec3::NEG_Y),
    ];
    let far = light.range.max(POINT_SHADOW_NEAR * 2.0);
    let projection = Mat4::perspective_rh_gl(90f32.to_radians(), 1.0, POINT_SHADOW_NEAR, far);
    FACES.map(|(direction, up)| {
        (
            Mat4::look_at_rh(light.position, light.position + direction, up),
            projection,
        )
    })
}

#[derive(Debug, Clone, Copy)]
struct ShadowMaps {
    size: u32,
    cascades: u32,
    directional: TextureId,
    spot: TextureId,
    point: TextureId,
}

impl ShadowMaps {
    fn textures(&self) -> [TextureId; 3] {
        [self.directional, self.spot, self.point]
    }
}

/// Renders every shadow map of the frame.
#[derive(Debug)]
pub struct ShadowCasterPass {
    backend: Arc<dyn GraphicsBackend>,
    shadows_buffer: GraphicsBuffer,
    view_constants: RingBuffer,
    maps: Option<ShadowMaps>,
    views: Vec<ShadowView>,
    view_offsets: Vec<u64>,
    queues: Vec<RenderQueue>,
    data: ShadowsData,
}

impl ShadowCasterPass {
    /// Allocates the shadow constant buffers. Shadow maps are created on the
    /// first `prepare`, sized from the frame's graphics settings.
    pub fn new(backend: Arc<dyn GraphicsBackend>) -> Result<Self, PassError> {
        let shadows_buffer = GraphicsBuffer::new(
            Arc::clone(&backend),
            size_of::<ShadowsData>() as u64,
            SHADOWS_BUFFER_NAME,
            BufferUsage::CONSTANT,
            true,
        )?;
        let view_constants = RingBuffer::new(
            Arc::clone(&backend),
            size_of::<CameraData>() as u64,
            MAX_SHADOW_VIEWS as u64,
            "ShadowViews",
            BufferUsage::CONSTANT,
        )?;
        Ok(Self {
            backend,
            shadows_buffer,
            view_constants,
            maps: None,
            views: Vec::with_capacity(MAX_SHADOW_VIEWS),
            view_offsets: Vec::with_capacity(MAX_SHADOW_VIEWS),
            queues: Vec::new(),
            data: ShadowsData::default(),
        })
    }

    /// The views built by the last `prepare`.
    pub fn views(&self) -> &[ShadowView] {
        &self.views
    }

    /// One queue per view, in view order.
    pub fn queues(&self) -> &[RenderQueue] {
        &self.queues[..self.views.len()]
    }

    /// The light matrices uploaded by the last `prepare`.
    pub fn shadows_data(&self) -> &ShadowsData {
        &self.data
    }

    /// The directional shadow map array, once allocated.
    pub fn directional_shadow_map(&self) -> Option<TextureId> {
        self.maps.map(|maps| maps.directional)
    }

    fn ensure_maps(&mut self, settings: &GraphicsSettings) -> Result<ShadowMaps, PassError> {
        let size = settings.shadow_map_size.max(1);
        let cascades = settings.cascade_count() as u32;
        if let Some(maps) = self.maps {
            if maps.size == size && maps.cascades == cascades {
                return Ok(maps);
            }
            self.release_maps();
        }

        let directional = self.backend.create_texture(&TextureDescriptor::new_array(
            "Directional Shadow Map",
            size,
            size,
            cascades,
            TextureFormat::Depth32Float,
        ))?;
        let spot = self.backend.create_texture(&TextureDescriptor::new_array(
            "Spot Shadow Maps",
            size,
            size,
            MAX_SPOT_LIGHT_SOURCES as u32,
            TextureFormat::Depth32Float,
        ))?;
        let point = self.backend.create_texture(&TextureDescriptor::new_array(
            "Point Shadow Maps",
            size,
            size,
            (MAX_POINT_LIGHT_SOURCES * POINT_LIGHT_SHADOW_FACES) as u32,
            TextureFormat::Depth32Float,
        ))?;
        log::debug!("ShadowCasterPass: allocated {size}x{size} shadow maps ({cascades} cascades)");

        let maps = ShadowMaps {
            size,
            cascades,
            directional,
            spot,
            point,
        };
        self.maps = Some(maps);
        Ok(maps)
    }

    fn release_maps(&mut self) {
        let Some(maps) = self.maps.take() else {
            return;
        };
        for texture in maps.textures() {
            if let Err(err) = self.backend.delete_texture(texture) {
                log::warn!("ShadowCasterPass: failed to delete shadow map {texture:?}: {err}");
            }
        }
    }

    fn push_directional_views(
        &mut self,
        light: &DirectionalLight,
        context: &RenderContext<'_>,
        maps: &ShadowMaps,
    ) {
        let bias = shadow_bias_matrix();
        let settings = context.settings;

        if settings.cascade_count() == 1 {
            let Some(bounds) = combined_world_bounds(context.renderables) else {
                return;
            };
            let (view, projection, near, far) = fit_directional_to_bounds(light.direction, &bounds);
            self.data.directional_light_matrices[0] = bias * projection * view;
            self.data.cascade_splits[0] = settings.shadow_distance;
            self.views.push(ShadowView {
                kind: ShadowViewKind::Cascade(0),
                target: RenderTargetDescriptor::depth(maps.directional).cleared_depth(1.0),
                view,
                projection,
                near,
                far,
                planes: FrustumPlanes::ALL,
            });
            return;
        }

        let mut slice_near = context.camera.near;
        for (cascade, slice_far) in settings.cascade_distances().into_iter().enumerate() {
            let slice_far = cascade_far(slice_near, slice_far);
            let (view, projection, near, far) =
                fit_directional_to_slice(light.direction, &context.camera, slice_near, slice_far);
            self.data.directional_light_matrices[cascade] = bias * projection * view;
            self.data.cascade_splits[cascade] = slice_far;
            self.views.push(ShadowView {
                kind: ShadowViewKind::Cascade(cascade),
                target: RenderTargetDescriptor::depth(maps.directional)
                    .with_layer(cascade as u32)
                    .cleared_depth(1.0),
                view,
                projection,
                near,
                far,
                planes: FrustumPlanes::SIDES,
            });
            slice_near = slice_far;
        }
    }

    fn build_views(&mut self, context: &RenderContext<'_>, maps: &ShadowMaps) {
        self.views.clear();
        self.data = ShadowsData::default();
        let bias = shadow_bias_matrix();

        if let Some(light) = context.lights.directional.filter(|l| l.cast_shadows) {
            if light.direction.length_squared() > f32::EPSILON {
                self.push_directional_views(&light, context, maps);
            } else {
                log::warn!("ShadowCasterPass: directional light has no direction, skipped");
            }
        }

        let spots = context.lights.spot.iter().filter(|l| l.cast_shadows);
        for (index, light) in spots.take(MAX_SPOT_LIGHT_SOURCES).enumerate() {
            let (view, projection) = spot_view_projection(light);
            self.data.spot_light_matrices[index] = bias * projection * view;
            self.views.push(ShadowView {
                kind: ShadowViewKind::Spot(index),
                target: RenderTargetDescriptor::depth(maps.spot)
                    .with_layer(index as u32)
                    .cleared_depth(1.0),
                view,
                projection,
                near: SPOT_SHADOW_NEAR,
                far: SPOT_SHADOW_FAR,
                planes: FrustumPlanes::ALL,
            });
        }

        let points = context.lights.point.iter().filter(|l| l.cast_shadows);
        for (index, light) in points.take(MAX_POINT_LIGHT_SOURCES).enumerate() {
            let faces = point_face_views(light);
            let far = light.range.max(POINT_SHADOW_NEAR * 2.0);
            let shadow = &mut self.data.point_lights[index];
            shadow.position = light.position;
            shadow.far = far;
            for (face, (view, projection)) in faces.into_iter().enumerate() {
                shadow.view_proj_matrices[face] = bias * projection * view;
                let layer = (index * POINT_LIGHT_SHADOW_FACES + face) as u32;
                self.views.push(ShadowView {
                    kind: ShadowViewKind::PointFace { light: index, face },
                    target: RenderTargetDescriptor::depth(maps.point)
                        .with_layer(layer)
                        .cleared_depth(1.0),
                    view,
                    projection,
                    near: POINT_SHADOW_NEAR,
                    far,
                    planes: FrustumPlanes::ALL,
                });
            }
        }
    }

    fn prepare_inner(
        &mut self,
        context: &RenderContext<'_>,
        frame: &mut FrameResources,
    ) -> Result<(), PassError> {
        let material = context
            .builtin
            .shadow_caster
            .ok_or(PassError::MissingMaterial("shadow_caster"))?;
        let maps = self.ensure_maps(context.settings)?;
        self.build_views(context, &maps);

        if self.queues.len() < self.views.len() {
            self.queues.resize_with(self.views.len(), RenderQueue::new);
        }

        self.view_constants.begin_frame()?;
        self.view_offsets.clear();
        for (view, queue) in self.views.iter().zip(self.queues.iter_mut()) {
            let settings = RenderSettings::shadow_casters(material).with_culling_planes(view.planes);
            queue.prepare(
                &view.view_projection(),
                context.renderables,
                context.materials,
                &settings,
                frame,
            )?;
            let constants = CameraData::new(view.view, view.projection, view.near, view.far);
            let offset = self.view_constants.set_data(bytemuck::bytes_of(&constants))?;
            self.view_offsets.push(offset);
        }

        self.shadows_buffer
            .set_data(bytemuck::bytes_of(&self.data), 0)?;
        log::trace!("ShadowCasterPass: {} shadow views", self.views.len());
        Ok(())
    }

    fn execute_inner(&mut self, frame: &mut FrameResources) -> Result<(), PassError> {
        let Some(maps) = self.maps else {
            return Ok(());
        };
        let backend = Arc::clone(&self.backend);
        let _group = DebugGroup::new(backend.as_ref(), "Shadow Caster Pass");

        for texture in maps.textures() {
            backend.transition_render_target(
                &RenderTargetDescriptor::depth(texture),
                ResourceState::RenderTarget,
            )?;
        }

        let queues = self.queues.iter();
        for ((view, queue), offset) in self.views.iter().zip(queues).zip(&self.view_offsets) {
            backend.attach_render_target(&view.target)?;
            backend.begin_render_pass("Shadow Caster Pass")?;
            backend.set_viewport(Viewport::from_size(maps.size, maps.size))?;
            backend.set_depth_state(DepthState::DEFAULT)?;
            backend.bind_constant_buffer(
                CAMERA_DATA_BUFFER_NAME,
                self.view_constants
                    .binding(*offset, size_of::<CameraData>() as u64),
            )?;
            let submitted = queue.submit(backend.as_ref(), frame);
            backend.end_render_pass()?;
            submitted?;
        }

        for texture in maps.textures() {
            backend.transition_render_target(
                &RenderTargetDescriptor::depth(texture),
                ResourceState::ShaderResource,
            )?;
        }
        backend.bind_constant_buffer(SHADOWS_BUFFER_NAME, self.shadows_buffer.whole_binding())?;
        Ok(())
    }
}

impl RenderPass for ShadowCasterPass {
    fn name(&self) -> &str {
        "Shadow Caster Pass"
    }

    fn priority(&self) -> i32 {
        priority::SHADOW_CASTER
    }

    fn kind(&self) -> PassKind {
        PassKind::Shadow
    }

    fn prepare(
        &mut self,
        context: &RenderContext<'_>,
        frame: &mut FrameResources,
    ) -> Result<(), RenderError> {
        Ok(self.prepare_inner(context, frame)?)
    }

    fn execute(
        &mut self,
        _context: &RenderContext<'_>,
        frame: &mut FrameResources,
    ) -> Result<(), RenderError> {
        Ok(self.execute_inner(frame)?)
    }
}

impl Drop for ShadowCasterPass {
    fn drop(&mut self) {
        self.release_maps();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use umbra_core::renderer::api::{GeometryId, MaterialId, RenderableId};
    use umbra_core::renderer::scene::{Material, MaterialLibrary, Renderable, SceneLights};
    use umbra_core::renderer::CullingSettings;
    use umbra_infra::{BackendCommand, HeadlessBackend};

    struct Scene {
        materials: MaterialLibrary,
        renderables: Vec<Renderable>,
        settings: GraphicsSettings,
        lights: SceneLights,
        caster: MaterialId,
    }

    fn scene() -> Scene {
        let mut materials = MaterialLibrary::new();
        let caster = materials.insert(Material::new("ShadowCaster"));
        let stone = materials.insert(Material::new("Stone"));
        let renderables = vec![
            Renderable::new(
                RenderableId(1),
                Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0)),
                Bounds::from_center_extents(Vec3::ZERO, Vec3::splat(0.5)),
                GeometryId(1),
                stone,
            ),
            Renderable::new(
                RenderableId(2),
                Mat4::from_translation(Vec3::new(3.0, -1.0, -10.0)),
                Bounds::from_center_extents(Vec3::ZERO, Vec3::new(4.0, 0.1, 4.0)),
                GeometryId(2),
                stone,
            ),
        ];
        let lights = SceneLights {
            directional: Some(DirectionalLight {
                direction: Vec3::new(-0.3, -1.0, -0.2),
                ..Default::default()
            }),
            ..Default::default()
        };
        Scene {
            materials,
            renderables,
            settings: GraphicsSettings {
                shadow_map_size: 256,
                ..Default::default()
            },
            lights,
            caster,
        }
    }

    fn context<'a>(scene: &'a Scene) -> RenderContext<'a> {
        let camera = CameraView::perspective(Vec3::new(0.0, 2.0, 5.0), Vec3::ZERO, 1.0, 1.5, 0.1, 100.0);
        let mut context = RenderContext::new(
            &scene.renderables,
            &scene.materials,
            &scene.lights,
            &scene.settings,
            camera,
            640,
            480,
        );
        context.builtin.shadow_caster = Some(scene.caster);
        context
    }

    fn setup() -> (Arc<HeadlessBackend>, FrameResources, ShadowCasterPass) {
        let backend = Arc::new(HeadlessBackend::new());
        let frame = FrameResources::new(backend.clone(), CullingSettings::default()).unwrap();
        let pass = ShadowCasterPass::new(backend.clone()).unwrap();
        (backend, frame, pass)
    }

    #[test]
    fn test_bias_matrix_maps_clip_to_texture_space() {
        let bias = shadow_bias_matrix();
        assert_abs_diff_eq!(bias.transform_point3(Vec3::splat(-1.0)), Vec3::ZERO, epsilon = 1e-6);
        assert_abs_diff_eq!(bias.transform_point3(Vec3::ONE), Vec3::ONE, epsilon = 1e-6);
        assert_abs_diff_eq!(bias.transform_point3(Vec3::ZERO), Vec3::splat(0.5), epsilon = 1e-6);
    }

    #[test]
    fn test_directional_fit_encloses_bounds() {
        let bounds = Bounds::from_min_max(Vec3::new(-5.0, 0.0, -3.0), Vec3::new(4.0, 2.0, 6.0));
        let (view, projection, near, far) =
            fit_directional_to_bounds(Vec3::new(0.4, -1.0, 0.3), &bounds);
        assert!(near > 0.0 && far > near);
        let matrix = shadow_bias_matrix() * projection * view;
        for corner in bounds.corner_points() {
            let p = matrix.project_point3(corner);
            for value in p.to_array() {
                assert!((-1e-4..=1.0 + 1e-4).contains(&value), "{corner} -> {p}");
            }
        }
    }

    #[test]
    fn test_cascade_slice_encloses_camera_slice() {
        let camera = CameraView::perspective(Vec3::ZERO, Vec3::NEG_Z, 1.0, 1.0, 0.1, 100.0);
        let (view, projection, _, _) = fit_directional_to_slice(Vec3::NEG_Y, &camera, 1.0, 10.0);
        let matrix = projection * view;
        for corner in frustum_slice_corners(&camera, 1.0, 10.0) {
            let p = matrix.project_point3(corner);
            assert!(p.x.abs() <= 1.0 + 1e-4 && p.y.abs() <= 1.0 + 1e-4);
        }
    }

    #[test]
    fn test_spot_projection_is_centered_on_the_cone_axis() {
        let light = SpotLight {
            position: Vec3::new(1.0, 5.0, 0.0),
            direction: Vec3::NEG_Y,
            ..Default::default()
        };
        let (view, projection) = spot_view_projection(&light);
        let p = (shadow_bias_matrix() * projection * view).project_point3(Vec3::new(1.0, -5.0, 0.0));
        assert_abs_diff_eq!(p.x, 0.5, epsilon = 1e-4);
        assert_abs_diff_eq!(p.y, 0.5, epsilon = 1e-4);
    }

    #[test]
    fn test_point_faces_look_along_each_axis() {
        let light = PointLight {
            position: Vec3::new(0.0, 1.0, 0.0),
            range: 10.0,
            ..Default::default()
        };
        let faces = point_face_views(&light);
        let axes = [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z];
        for ((view, projection), axis) in faces.iter().zip(axes) {
            let p = (*projection * *view).project_point3(light.position + axis * 5.0);
            assert_abs_diff_eq!(p.x, 0.0, epsilon = 1e-4);
            assert_abs_diff_eq!(p.y, 0.0, epsilon = 1e-4);
            assert!(p.z > -1.0 && p.z < 1.0);
        }
    }

    #[test]
    fn test_view_count_is_bounded() {
        let mut scene = scene();
        scene.lights.spot = vec![SpotLight::default(); 5];
        scene.lights.point = vec![PointLight::default(); 5];
        let (_, mut frame, mut pass) = setup();
        pass.prepare(&context(&scene), &mut frame).unwrap();

        assert_eq!(pass.views().len(), 1 + 3 + 18);
        assert_eq!(pass.queues().len(), pass.views().len());
        assert!(pass.views().len() <= MAX_SHADOW_VIEWS);
    }

    #[test]
    fn test_cascades_use_side_planes_and_record_splits() {
        let mut scene = scene();
        scene.settings.shadow_cascade_count = 4;
        let (_, mut frame, mut pass) = setup();
        pass.prepare(&context(&scene), &mut frame).unwrap();

        let cascades: Vec<_> = pass
            .views()
            .iter()
            .filter(|v| matches!(v.kind, ShadowViewKind::Cascade(_)))
            .collect();
        assert_eq!(cascades.len(), 4);
        assert!(cascades.iter().all(|v| v.planes == FrustumPlanes::SIDES));
        let distances = scene.settings.cascade_distances();
        for (i, distance) in distances.iter().enumerate() {
            assert_abs_diff_eq!(pass.shadows_data().cascade_splits[i], *distance);
            assert_eq!(cascades[i].target.layer, i as u32);
        }
    }

    #[test]
    fn test_shadow_distance_inside_near_plane_keeps_cascades_finite() {
        let mut scene = scene();
        scene.settings.shadow_cascade_count = 4;
        scene.settings.shadow_distance = 0.05;
        let (_, mut frame, mut pass) = setup();
        pass.prepare(&context(&scene), &mut frame).unwrap();

        let splits = &pass.shadows_data().cascade_splits;
        assert!(splits[0] > 0.1);
        assert!(splits.windows(2).all(|pair| pair[1] > pair[0]));
        for view in pass.views() {
            assert!(view.view_projection().is_finite(), "{:?}", view.kind);
            assert!(view.far > view.near);
        }
        for matrix in &pass.shadows_data().directional_light_matrices {
            assert!(matrix.is_finite());
        }
    }

    #[test]
    fn test_cascade_far_is_pushed_past_near() {
        assert_eq!(cascade_far(1.0, 10.0), 10.0);
        assert!(cascade_far(100.0, 100.0) > 100.0);
        assert!(cascade_far(0.1, 0.05) > 0.1);
        assert!(cascade_far(0.0, 0.0) > 0.0);
    }

    #[test]
    fn test_non_casting_lights_are_skipped() {
        let mut scene = scene();
        scene.lights.directional = scene.lights.directional.map(|l| DirectionalLight {
            cast_shadows: false,
            ..l
        });
        scene.lights.spot = vec![SpotLight {
            cast_shadows: false,
            ..Default::default()
        }];
        let (_, mut frame, mut pass) = setup();
        pass.prepare(&context(&scene), &mut frame).unwrap();
        assert!(pass.views().is_empty());
        assert_eq!(*pass.shadows_data(), ShadowsData::default());
    }

    #[test]
    fn test_missing_caster_material_is_an_error() {
        let scene = scene();
        let (_, mut frame, mut pass) = setup();
        let mut context = context(&scene);
        context.builtin.shadow_caster = None;
        assert!(pass.prepare(&context, &mut frame).is_err());
    }

    #[test]
    fn test_execute_renders_every_view_and_binds_shadows() {
        let mut scene = scene();
        scene.lights.spot = vec![SpotLight {
            position: Vec3::new(0.0, 5.0, -5.0),
            ..Default::default()
        }];
        let (backend, mut frame, mut pass) = setup();
        let context = context(&scene);
        frame.begin_frame().unwrap();
        pass.prepare(&context, &mut frame).unwrap();
        pass.execute(&context, &mut frame).unwrap();

        let commands = backend.commands();
        let passes = commands
            .iter()
            .filter(|c| matches!(c, BackendCommand::BeginRenderPass(name) if name == "Shadow Caster Pass"))
            .count();
        assert_eq!(passes, 2);
        assert!(commands.iter().any(
            |c| matches!(c, BackendCommand::BindConstantBuffer { name, .. } if name == SHADOWS_BUFFER_NAME)
        ));
        assert!(frame.counters.draw_calls > 0);
    }

    #[test]
    fn test_maps_are_reallocated_on_size_change() {
        let mut scene = scene();
        let (backend, mut frame, mut pass) = setup();
        pass.prepare(&context(&scene), &mut frame).unwrap();
        let first = pass.directional_shadow_map();
        assert_eq!(backend.live_textures(), 3);

        scene.settings.shadow_map_size = 512;
        pass.prepare(&context(&scene), &mut frame).unwrap();
        assert_ne!(pass.directional_shadow_map(), first);
        assert_eq!(backend.live_textures(), 3);

        drop(pass);
        assert_eq!(backend.live_textures(), 0);
    }
}
