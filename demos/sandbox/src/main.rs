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

// Umbra Sandbox
// Renders a small scene through the built-in passes and logs frame statistics.
//
// Usage: umbra-sandbox [config.json]

use std::sync::Arc;

use anyhow::{Context, Result};
use umbra_core::math::{Bounds, Mat4, Quat, Vec3};
use umbra_core::renderer::api::{
    GeometryId, RenderTargetDescriptor, RenderableId, TextureDescriptor, TextureFormat, TextureId,
};
use umbra_core::renderer::scene::{
    BuiltinMaterials, CameraView, DirectionalLight, Material, MaterialLibrary, PointLight,
    RenderContext, Renderable, SceneLights, Skybox, SpotLight,
};
use umbra_core::renderer::{FrameResources, GraphicsBackend, RenderPassList};
use umbra_core::EngineConfig;
use umbra_infra::select_backend;
use umbra_lanes::{CopyDepthPass, FinalBlitPass, ForwardRenderPass, ShadowCasterPass};
use umbra_telemetry::{init_logging, FrameStats, FrameTelemetry, Stopwatch};

const FRAMES: u64 = 240;
const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;

const CUBE: GeometryId = GeometryId(1);
const PLANE: GeometryId = GeometryId(2);
const SKY_CUBE: GeometryId = GeometryId(3);

struct SandboxScene {
    materials: MaterialLibrary,
    builtin: BuiltinMaterials,
    skybox: Skybox,
    renderables: Vec<Renderable>,
    lights: SceneLights,
}

fn build_scene() -> SandboxScene {
    let mut materials = MaterialLibrary::new();
    let builtin = BuiltinMaterials {
        shadow_caster: Some(materials.insert(Material::new("Builtin/ShadowCaster"))),
        final_blit: Some(materials.insert(Material::new("Builtin/Tonemap"))),
        outline_mask: Some(materials.insert(Material::new("Builtin/OutlineMask"))),
        outline_composite: Some(materials.insert(Material::new("Builtin/OutlineComposite"))),
        shadow_map_debug: Some(materials.insert(Material::new("Builtin/ShadowMapDebug"))),
        gizmos: Some(materials.insert(Material::new("Builtin/Gizmos"))),
        ui: Some(materials.insert(Material::new("Builtin/UI"))),
    };
    let skybox = Skybox {
        geometry: SKY_CUBE,
        material: materials.insert(Material::new("Skybox")),
    };
    let lit = materials.insert(Material::new("Lit").with_instancing(true));
    let ground = materials.insert(Material::new("Ground"));
    let glass = materials.insert(Material::new("Glass").with_render_queue(3000));

    let unit = Bounds::from_center_extents(Vec3::ZERO, Vec3::splat(0.5));
    let mut renderables = vec![Renderable::new(
        RenderableId(0),
        Mat4::IDENTITY,
        Bounds::from_center_extents(Vec3::ZERO, Vec3::new(20.0, 0.05, 20.0)),
        PLANE,
        ground,
    )
    .with_cast_shadows(false)];

    let mut next_id = 1;
    for x in -4..=4 {
        for z in -4..=4 {
            let material = if (x + z) % 3 == 0 { glass } else { lit };
            renderables.push(Renderable::new(
                RenderableId(next_id),
                Mat4::from_translation(Vec3::new(x as f32 * 2.0, 0.5, z as f32 * 2.0)),
                unit,
                CUBE,
                material,
            ));
            next_id += 1;
        }
    }

    let lights = SceneLights {
        directional: Some(DirectionalLight {
            direction: Vec3::new(-0.4, -1.0, -0.3).normalize(),
            intensity: 2.0,
            ..Default::default()
        }),
        point: vec![PointLight {
            position: Vec3::new(0.0, 3.0, 0.0),
            color: Vec3::new(1.0, 0.6, 0.3),
            ..Default::default()
        }],
        spot: vec![SpotLight {
            position: Vec3::new(4.0, 6.0, 4.0),
            direction: Vec3::new(-0.5, -1.0, -0.5).normalize(),
            ..Default::default()
        }],
    };

    SandboxScene {
        materials,
        builtin,
        skybox,
        renderables,
        lights,
    }
}

struct Targets {
    color: TextureId,
    depth: TextureId,
    depth_copy: TextureId,
}

fn create_targets(backend: &dyn GraphicsBackend) -> Result<Targets> {
    let texture = |label: &str, format| {
        backend
            .create_texture(&TextureDescriptor::new_2d(label, WIDTH, HEIGHT, format))
            .with_context(|| format!("Failed to create the {label} target"))
    };
    Ok(Targets {
        color: texture("Scene Color", TextureFormat::Rgba16Float)?,
        depth: texture("Scene Depth", TextureFormat::Depth32Float)?,
        depth_copy: texture("Depth Copy", TextureFormat::Depth32Float)?,
    })
}

fn build_passes(backend: &Arc<dyn GraphicsBackend>, targets: &Targets) -> Result<RenderPassList> {
    let forward = ForwardRenderPass::new(Arc::clone(backend))?;
    let copy_depth = CopyDepthPass::new(
        Arc::clone(backend),
        forward.end_fence().clone(),
        RenderTargetDescriptor::depth(targets.depth_copy),
    )?;

    let mut passes = RenderPassList::new();
    passes.add(Box::new(ShadowCasterPass::new(Arc::clone(backend))?));
    passes.add(Box::new(forward));
    passes.add(Box::new(copy_depth));
    passes.add(Box::new(FinalBlitPass::new(Arc::clone(backend))?));

    #[cfg(feature = "editor")]
    {
        use umbra_lanes::editor::{GizmosPass, SelectionOutlinePass, UIRenderPass};
        passes.add(Box::new(SelectionOutlinePass::new(Arc::clone(backend))?));
        passes.add(Box::new(GizmosPass::new(Arc::clone(backend))?));
        passes.add(Box::new(UIRenderPass::new(Arc::clone(backend))));
    }

    log::info!("Sandbox: passes {:?}", passes.names());
    Ok(passes)
}

fn camera_at(frame: u64) -> CameraView {
    let angle = frame as f32 * 0.01;
    let eye = Quat::from_rotation_y(angle) * Vec3::new(0.0, 6.0, 14.0);
    CameraView::perspective(
        eye,
        Vec3::ZERO,
        60f32.to_radians(),
        WIDTH as f32 / HEIGHT as f32,
        0.1,
        100.0,
    )
}

fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    init_logging(&config.logging);
    log::info!("Sandbox: starting with {:?} backend preference", config.backend);

    let backend = select_backend(config.backend, &config.graphics)?;
    let scene = build_scene();
    let targets = create_targets(backend.as_ref())?;
    let mut passes = build_passes(&backend, &targets)?;
    let mut frame = FrameResources::new(Arc::clone(&backend), config.graphics.culling)?;
    let mut telemetry = FrameTelemetry::default();

    #[cfg(feature = "editor")]
    let selected = [RenderableId(1), RenderableId(5)];
    #[cfg(feature = "editor")]
    let gizmos = [umbra_core::renderer::scene::OverlayDraw {
        geometry: CUBE,
        transform: Mat4::from_scale(Vec3::splat(0.25)),
        depth: 0.0,
    }];

    for _ in 0..FRAMES {
        let mut context = RenderContext::new(
            &scene.renderables,
            &scene.materials,
            &scene.lights,
            &config.graphics,
            camera_at(frame.frame_index()),
            WIDTH,
            HEIGHT,
        );
        context.builtin = scene.builtin;
        context.skybox = Some(scene.skybox);
        context.color_target =
            RenderTargetDescriptor::color(targets.color).cleared([0.02, 0.02, 0.03, 1.0]);
        context.depth_target = RenderTargetDescriptor::depth(targets.depth).cleared_depth(1.0);
        #[cfg(feature = "editor")]
        {
            context.selected = &selected;
            context.gizmos = &gizmos;
        }

        frame.begin_frame()?;
        let mut watch = Stopwatch::new();
        passes.prepare_all(&context, &mut frame)?;
        let prepare = watch.lap();
        passes.execute_all(&context, &mut frame)?;
        let execute = watch.lap();
        frame.end_frame()?;

        telemetry.record(FrameStats::from_counters(
            frame.frame_index(),
            &frame.counters,
            prepare,
            execute,
        ));
    }

    telemetry.log_summary();
    if log::log_enabled!(log::Level::Debug) {
        log::debug!("Sandbox: frame statistics\n{}", telemetry.to_json()?);
    }

    // Passes release their backend resources before the backend goes away.
    drop(passes);
    for texture in [targets.color, targets.depth, targets.depth_copy] {
        backend.delete_texture(texture)?;
    }
    log::info!("Sandbox: done");
    Ok(())
}
