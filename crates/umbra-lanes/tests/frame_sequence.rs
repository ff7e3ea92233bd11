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

//! Integration tests running the built-in passes as one frame on the headless
//! backend.

use std::sync::Arc;
use umbra_core::math::{Bounds, Mat4, Vec3};
use umbra_core::renderer::api::{
    GeometryId, MaterialId, RenderTargetDescriptor, RenderableId, TextureDescriptor,
    TextureFormat, TextureId,
};
use umbra_core::renderer::scene::{
    CameraView, DirectionalLight, Material, MaterialLibrary, RenderContext, Renderable,
    SceneLights,
};
use umbra_core::renderer::{
    CullingSettings, FrameResources, GraphicsBackend, GraphicsSettings, RenderPassList,
};
use umbra_infra::{BackendCommand, HeadlessBackend};
use umbra_lanes::{
    CopyDepthPass, FinalBlitPass, ForwardRenderPass, ShadowCasterPass,
    FORWARD_PASS_END_FENCE_NAME,
};

const WIDTH: u32 = 320;
const HEIGHT: u32 = 240;

struct Scene {
    materials: MaterialLibrary,
    renderables: Vec<Renderable>,
    lights: SceneLights,
    settings: GraphicsSettings,
    caster: MaterialId,
    blit: MaterialId,
}

fn scene() -> Scene {
    let mut materials = MaterialLibrary::new();
    let caster = materials.insert(Material::new("ShadowCaster"));
    let blit = materials.insert(Material::new("Tonemap"));
    let stone = materials.insert(Material::new("Stone"));
    let glass = materials.insert(Material::new("Glass").with_render_queue(3000));

    let unit = Bounds::from_center_extents(Vec3::ZERO, Vec3::splat(0.5));
    let renderables = vec![
        Renderable::new(
            RenderableId(1),
            Mat4::from_translation(Vec3::new(0.0, 0.0, -4.0)),
            unit,
            GeometryId(1),
            stone,
        ),
        Renderable::new(
            RenderableId(2),
            Mat4::from_translation(Vec3::new(1.5, 0.0, -6.0)),
            unit,
            GeometryId(1),
            glass,
        ),
        Renderable::new(
            RenderableId(3),
            Mat4::from_translation(Vec3::new(0.0, -1.0, -5.0)),
            Bounds::from_center_extents(Vec3::ZERO, Vec3::new(5.0, 0.1, 5.0)),
            GeometryId(2),
            stone,
        ),
    ];
    let lights = SceneLights {
        directional: Some(DirectionalLight {
            direction: Vec3::new(-0.2, -1.0, -0.4),
            ..Default::default()
        }),
        ..Default::default()
    };

    Scene {
        materials,
        renderables,
        lights,
        settings: GraphicsSettings {
            shadow_map_size: 128,
            ..Default::default()
        },
        caster,
        blit,
    }
}

struct Targets {
    color: TextureId,
    depth: TextureId,
    depth_copy: TextureId,
}

fn targets(backend: &HeadlessBackend) -> Targets {
    let texture = |label: &str, format| {
        backend
            .create_texture(&TextureDescriptor::new_2d(label, WIDTH, HEIGHT, format))
            .unwrap()
    };
    Targets {
        color: texture("Scene Color", TextureFormat::Rgba16Float),
        depth: texture("Scene Depth", TextureFormat::Depth32Float),
        depth_copy: texture("Depth Copy", TextureFormat::Depth32Float),
    }
}

fn context<'a>(scene: &'a Scene, targets: &Targets) -> RenderContext<'a> {
    let camera = CameraView::perspective(
        Vec3::new(0.0, 1.0, 2.0),
        Vec3::new(0.0, 0.0, -5.0),
        1.0,
        WIDTH as f32 / HEIGHT as f32,
        0.1,
        50.0,
    );
    let mut context = RenderContext::new(
        &scene.renderables,
        &scene.materials,
        &scene.lights,
        &scene.settings,
        camera,
        WIDTH,
        HEIGHT,
    );
    context.builtin.shadow_caster = Some(scene.caster);
    context.builtin.final_blit = Some(scene.blit);
    context.color_target = RenderTargetDescriptor::color(targets.color).cleared([0.0, 0.0, 0.0, 1.0]);
    context.depth_target = RenderTargetDescriptor::depth(targets.depth).cleared_depth(1.0);
    context
}

fn pass_list(backend: &Arc<HeadlessBackend>, targets: &Targets) -> RenderPassList {
    let forward = ForwardRenderPass::new(backend.clone()).unwrap();
    let start_fence = forward.end_fence().clone();
    let copy_depth = CopyDepthPass::new(
        backend.clone(),
        start_fence,
        RenderTargetDescriptor::depth(targets.depth_copy),
    )
    .unwrap();

    let mut passes = RenderPassList::new();
    // Added out of order on purpose: the list sorts by priority.
    passes.add(Box::new(FinalBlitPass::new(backend.clone()).unwrap()));
    passes.add(Box::new(copy_depth));
    passes.add(Box::new(forward));
    passes.add(Box::new(ShadowCasterPass::new(backend.clone()).unwrap()));
    passes
}

fn pass_labels(commands: &[BackendCommand]) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for command in commands {
        let label = match command {
            BackendCommand::BeginRenderPass(name) | BackendCommand::BeginCopyPass(name) => name,
            _ => continue,
        };
        if labels.last() != Some(label) {
            labels.push(label.clone());
        }
    }
    labels
}

#[test]
fn test_passes_run_in_priority_order() {
    let backend = Arc::new(HeadlessBackend::new());
    let targets = targets(&backend);
    let scene = scene();
    let context = context(&scene, &targets);
    let mut frame = FrameResources::new(backend.clone(), CullingSettings::default()).unwrap();
    let mut passes = pass_list(&backend, &targets);

    assert_eq!(
        passes.names(),
        vec![
            "Shadow Caster Pass",
            "Forward Pass",
            "Copy Depth Pass",
            "Final Blit Pass"
        ]
    );

    frame.begin_frame().unwrap();
    let executed = passes.run(&context, &mut frame).unwrap();
    frame.end_frame().unwrap();

    assert_eq!(executed, 4);
    assert_eq!(frame.counters.passes, 4);
    assert!(frame.counters.draw_calls > 0);
    assert_eq!(
        pass_labels(&backend.commands()),
        vec![
            "Shadow Caster Pass",
            "Forward Pass",
            "Copy Depth To Backbuffer",
            "Final Blit"
        ]
    );
    assert_eq!(backend.debug_group_depth(), 0);
}

#[test]
fn test_depth_copy_follows_forward_fence() {
    let backend = Arc::new(HeadlessBackend::new());
    let targets = targets(&backend);
    let scene = scene();
    let context = context(&scene, &targets);
    let mut frame = FrameResources::new(backend.clone(), CullingSettings::default()).unwrap();
    let mut passes = pass_list(&backend, &targets);

    frame.begin_frame().unwrap();
    passes.run(&context, &mut frame).unwrap();
    frame.end_frame().unwrap();

    let commands = backend.commands();
    let position = |wanted: &BackendCommand| {
        commands
            .iter()
            .position(|command| command == wanted)
            .unwrap_or_else(|| panic!("missing {wanted:?}"))
    };
    let begin_forward = position(&BackendCommand::BeginRenderPass("Forward Pass".into()));
    let end_forward = begin_forward
        + commands[begin_forward..]
            .iter()
            .position(|command| *command == BackendCommand::EndRenderPass)
            .unwrap();
    let signal = position(&BackendCommand::SignalFence(FORWARD_PASS_END_FENCE_NAME.into()));
    let wait = position(&BackendCommand::WaitForFence(FORWARD_PASS_END_FENCE_NAME.into()));
    let copy = position(&BackendCommand::BeginCopyPass("Copy Depth To Backbuffer".into()));

    assert!(end_forward < signal);
    assert!(signal < wait);
    assert!(wait < copy);
    assert!(commands.iter().any(|command| matches!(
        command,
        BackendCommand::CopyTextureToTexture { source, destination }
            if source.surface == RenderTargetDescriptor::depth(targets.depth).surface
                && destination.surface == RenderTargetDescriptor::depth(targets.depth_copy).surface
    )));
}

#[test]
fn test_several_frames_reuse_passes() {
    let backend = Arc::new(HeadlessBackend::with_config(2, 256));
    let targets = targets(&backend);
    let scene = scene();
    let context = context(&scene, &targets);
    let mut frame = FrameResources::new(backend.clone(), CullingSettings::default()).unwrap();
    let mut passes = pass_list(&backend, &targets);

    let mut draw_calls = Vec::new();
    for _ in 0..4 {
        frame.begin_frame().unwrap();
        passes.run(&context, &mut frame).unwrap();
        frame.end_frame().unwrap();
        draw_calls.push(frame.counters.draw_calls);
    }

    assert_eq!(frame.frame_index(), 4);
    assert_eq!(backend.frames_started(), 4);
    assert!(draw_calls.windows(2).all(|pair| pair[0] == pair[1]));

    let live_textures = backend.live_textures();
    drop(passes);
    assert!(backend.live_textures() < live_textures);
    assert_eq!(backend.live_textures(), 3);
}

#[test]
fn test_removed_pass_no_longer_runs() {
    let backend = Arc::new(HeadlessBackend::new());
    let targets = targets(&backend);
    let scene = scene();
    let context = context(&scene, &targets);
    let mut frame = FrameResources::new(backend.clone(), CullingSettings::default()).unwrap();
    let mut passes = pass_list(&backend, &targets);

    assert!(passes.remove("Shadow Caster Pass").is_some());
    assert!(passes.remove("Shadow Caster Pass").is_none());

    frame.begin_frame().unwrap();
    assert_eq!(passes.run(&context, &mut frame).unwrap(), 3);
    frame.end_frame().unwrap();

    let labels = pass_labels(&backend.commands());
    assert_eq!(labels.first().map(String::as_str), Some("Forward Pass"));
}
