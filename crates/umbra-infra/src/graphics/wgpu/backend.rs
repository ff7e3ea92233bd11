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

//! An offscreen [`GraphicsBackend`] on top of `wgpu`.
//!
//! Render pass commands are recorded between `begin_render_pass` and
//! `end_render_pass` and replayed into a `wgpu::RenderPass` when the pass ends,
//! since the abstraction opens and closes passes through separate calls.
//! Copy pass commands go straight to the frame's command encoder.

use super::conversions::{clamp_viewport, color_load_op, depth_load_op, IntoWgpu};
use anyhow::{anyhow, Result};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use umbra_core::renderer::api::*;
use umbra_core::renderer::error::{FenceError, RenderError, ResourceError};
use umbra_core::renderer::{BackendType, GraphicsBackend, GraphicsSettings};

/// Size of the offscreen back buffer until [`WgpuBackend::set_backbuffer_size`] is called.
pub const DEFAULT_BACKBUFFER_SIZE: (u32, u32) = (1280, 720);

const BACKBUFFER_COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const BACKBUFFER_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

fn texture_usages() -> wgpu::TextureUsages {
    wgpu::TextureUsages::RENDER_ATTACHMENT
        | wgpu::TextureUsages::TEXTURE_BINDING
        | wgpu::TextureUsages::COPY_SRC
        | wgpu::TextureUsages::COPY_DST
}

/// The depth-stencil state a material pipeline must be built with to honor `state`.
pub fn depth_stencil_state(state: DepthState) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: BACKBUFFER_DEPTH_FORMAT,
        depth_write_enabled: state.write_enabled,
        depth_compare: state.function.into_wgpu(),
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

/// Vertex and index data of a registered geometry.
#[derive(Debug, Clone)]
pub struct WgpuGeometry {
    /// Bound to vertex slot 0.
    pub vertex_buffer: wgpu::Buffer,
    /// Index data.
    pub index_buffer: wgpu::Buffer,
    /// Index element type.
    pub index_format: wgpu::IndexFormat,
    /// Number of indices drawn.
    pub index_count: u32,
}

/// The pipelines and bind group layout of a registered material.
///
/// Per-draw and per-instance matrices are bound to vertex slot 1. Group 0 holds
/// the named constant buffers in `constants` order, followed by the sampled
/// texture and a linear sampler when the material is used for blits.
#[derive(Debug, Clone)]
pub struct WgpuMaterial {
    /// Pipeline used when no variant matches the current depth state.
    pub pipeline: wgpu::RenderPipeline,
    /// Pipelines built with [`depth_stencil_state`] for specific depth states.
    pub depth_variants: HashMap<DepthState, wgpu::RenderPipeline>,
    /// Layout of bind group 0.
    pub bind_group_layout: Option<wgpu::BindGroupLayout>,
    /// Constant buffer names, one binding each.
    pub constants: Vec<String>,
    /// Whether the layout ends with a texture and a sampler for the blit source.
    pub samples_source: bool,
}

impl WgpuMaterial {
    /// A material with a single pipeline and no bindings.
    pub fn new(pipeline: wgpu::RenderPipeline) -> Self {
        Self {
            pipeline,
            depth_variants: HashMap::new(),
            bind_group_layout: None,
            constants: Vec::new(),
            samples_source: false,
        }
    }

    /// Adds a pipeline used while `state` is the current depth state.
    pub fn with_depth_variant(mut self, state: DepthState, pipeline: wgpu::RenderPipeline) -> Self {
        self.depth_variants.insert(state, pipeline);
        self
    }

    /// Sets bind group 0.
    pub fn with_bindings(
        mut self,
        layout: wgpu::BindGroupLayout,
        constants: impl IntoIterator<Item = impl Into<String>>,
        samples_source: bool,
    ) -> Self {
        self.bind_group_layout = Some(layout);
        self.constants = constants.into_iter().map(Into::into).collect();
        self.samples_source = samples_source;
        self
    }

    fn pipeline_for(&self, depth: DepthState) -> &wgpu::RenderPipeline {
        self.depth_variants.get(&depth).unwrap_or(&self.pipeline)
    }
}

#[derive(Debug)]
struct WgpuTextureEntry {
    texture: wgpu::Texture,
    descriptor: TextureDescriptor,
}

#[derive(Debug)]
struct Backbuffer {
    color: wgpu::Texture,
    depth: wgpu::Texture,
}

#[derive(Debug)]
enum PassOp {
    Viewport(Viewport),
    Scissor(ScissorRect),
    PushDebugGroup(String),
    PopDebugGroup,
    Draw {
        pipeline: wgpu::RenderPipeline,
        bind_group: Option<wgpu::BindGroup>,
        geometry: Option<WgpuGeometry>,
        instances: Option<(wgpu::Buffer, u64, u64)>,
        instance_count: u32,
    },
}

#[derive(Debug)]
struct RecordingPass {
    name: String,
    color: Option<RenderTargetDescriptor>,
    depth: Option<RenderTargetDescriptor>,
    ops: Vec<PassOp>,
    depth_state: DepthState,
}

#[derive(Debug)]
enum OpenPass {
    Render(RecordingPass),
    Copy(String),
}

#[derive(Debug, Default)]
struct WgpuState {
    encoder: Option<wgpu::CommandEncoder>,
    buffers: HashMap<BufferId, wgpu::Buffer>,
    textures: HashMap<TextureId, WgpuTextureEntry>,
    fences: HashMap<FenceId, (String, FenceState)>,
    geometries: HashMap<GeometryId, WgpuGeometry>,
    materials: HashMap<MaterialId, WgpuMaterial>,
    constants: HashMap<String, BufferBinding>,
    attachments: Vec<RenderTargetDescriptor>,
    pass: Option<OpenPass>,
    backbuffer: Option<Backbuffer>,
}

/// Renders on a `wgpu` adapter into offscreen back buffer textures.
///
/// Geometry and materials are owned by the application and registered with
/// [`register_geometry`](Self::register_geometry) and
/// [`register_material`](Self::register_material). Draws that reference
/// unregistered ids are skipped.
#[derive(Debug)]
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    sampler: wgpu::Sampler,
    adapter_name: String,
    alignment: u64,
    frames_in_flight: usize,
    frame_index: AtomicUsize,
    next_buffer_id: AtomicUsize,
    next_texture_id: AtomicUsize,
    next_fence_id: AtomicU64,
    backbuffer_size: Mutex<(u32, u32)>,
    state: Mutex<WgpuState>,
}

impl WgpuBackend {
    /// Requests a high-performance adapter and creates the device and back buffer.
    pub fn new(settings: &GraphicsSettings) -> Result<Self> {
        log::info!("Initializing WGPU backend...");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| anyhow!("Failed to find a suitable adapter: {e}"))?;

        let adapter_info = adapter.get_info();
        log::info!(
            "Using graphics adapter: \"{}\" (Backend: {:?})",
            adapter_info.name,
            adapter_info.backend
        );

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Umbra Logical Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::default(),
            ..Default::default()
        }))
        .map_err(|e| anyhow!("Failed to create logical device: {e}"))?;
        log::info!("Logical device and command queue created.");

        device.on_uncaptured_error(Box::new(|e| {
            log::error!("WGPU Uncaptured Error: {e:?}");
        }));

        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Umbra Blit Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let backend = Self {
            device,
            queue,
            sampler,
            adapter_name: adapter_info.name,
            alignment,
            frames_in_flight: settings
                .max_frames_in_flight
                .unwrap_or(DEFAULT_MAX_FRAMES_IN_FLIGHT)
                .max(1),
            frame_index: AtomicUsize::new(0),
            next_buffer_id: AtomicUsize::new(1),
            next_texture_id: AtomicUsize::new(1),
            next_fence_id: AtomicU64::new(1),
            backbuffer_size: Mutex::new(DEFAULT_BACKBUFFER_SIZE),
            state: Mutex::new(WgpuState::default()),
        };
        let (width, height) = DEFAULT_BACKBUFFER_SIZE;
        backend.set_backbuffer_size(width, height);
        Ok(backend)
    }

    fn state(&self) -> MutexGuard<'_, WgpuState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Name of the adapter in use.
    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    /// The underlying device, for building pipelines and geometry buffers.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Current size of the offscreen back buffer.
    pub fn backbuffer_size(&self) -> (u32, u32) {
        *self
            .backbuffer_size
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Recreates the offscreen back buffer. Zero sizes are ignored.
    pub fn set_backbuffer_size(&self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::warn!("WgpuBackend: Ignoring back buffer resize to {width}x{height}");
            return;
        }
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let create = |label: &str, format| {
            self.device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: texture_usages(),
                view_formats: &[],
            })
        };
        let backbuffer = Backbuffer {
            color: create("Backbuffer Color", BACKBUFFER_COLOR_FORMAT),
            depth: create("Backbuffer Depth", BACKBUFFER_DEPTH_FORMAT),
        };
        self.state().backbuffer = Some(backbuffer);
        *self
            .backbuffer_size
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = (width, height);
        log::info!("WgpuBackend: Back buffer resized to {width}x{height}");
    }

    /// Makes `geometry` drawable.
    pub fn register_geometry(&self, id: GeometryId, geometry: WgpuGeometry) {
        self.state().geometries.insert(id, geometry);
    }

    /// Makes `material` usable for draws and blits.
    pub fn register_material(&self, id: MaterialId, material: WgpuMaterial) {
        self.state().materials.insert(id, material);
    }

    fn with_encoder<R>(&self, state: &mut WgpuState, f: impl FnOnce(&mut wgpu::CommandEncoder) -> R) -> R {
        let encoder = state.encoder.get_or_insert_with(|| {
            self.device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Umbra Frame Encoder"),
                })
        });
        f(encoder)
    }

    fn flush(&self, state: &mut WgpuState) {
        if let Some(encoder) = state.encoder.take() {
            self.queue.submit(std::iter::once(encoder.finish()));
        }
    }

    fn texture_for<'a>(
        state: &'a WgpuState,
        surface: TargetSurface,
    ) -> Result<Option<&'a wgpu::Texture>, ResourceError> {
        match surface {
            TargetSurface::Texture(id) => state
                .textures
                .get(&id)
                .map(|entry| Some(&entry.texture))
                .ok_or(ResourceError::NotFound),
            TargetSurface::ColorBackbuffer => Ok(state.backbuffer.as_ref().map(|b| &b.color)),
            TargetSurface::DepthBackbuffer => Ok(state.backbuffer.as_ref().map(|b| &b.depth)),
            TargetSurface::None => Ok(None),
        }
    }

    fn layer_view(
        state: &WgpuState,
        target: &RenderTargetDescriptor,
    ) -> Result<Option<(wgpu::TextureView, u32, u32)>, ResourceError> {
        let Some(texture) = Self::texture_for(state, target.surface)? else {
            return Ok(None);
        };
        if target.layer >= texture.depth_or_array_layers() {
            return Err(ResourceError::OutOfBounds);
        }
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: None,
            dimension: Some(wgpu::TextureViewDimension::D2),
            base_mip_level: target.mip_level,
            mip_level_count: Some(1),
            base_array_layer: target.layer,
            array_layer_count: Some(1),
            ..Default::default()
        });
        Ok(Some((view, texture.width(), texture.height())))
    }

    fn require_render_pass<'a>(
        state: &'a mut WgpuState,
        command: &str,
    ) -> Result<&'a mut RecordingPass, ResourceError> {
        match state.pass.as_mut() {
            Some(OpenPass::Render(pass)) => Ok(pass),
            _ => Err(ResourceError::InvalidPassState(format!(
                "{command} recorded outside of a render pass"
            ))),
        }
    }

    fn require_copy_pass(state: &WgpuState, command: &str) -> Result<(), ResourceError> {
        match state.pass {
            Some(OpenPass::Copy(_)) => Ok(()),
            _ => Err(ResourceError::InvalidPassState(format!(
                "{command} recorded outside of a copy pass"
            ))),
        }
    }

    fn require_no_pass(state: &WgpuState, command: &str) -> Result<(), ResourceError> {
        match state.pass {
            None => Ok(()),
            Some(_) => Err(ResourceError::InvalidPassState(format!(
                "{command} recorded inside a pass"
            ))),
        }
    }

    /// Builds bind group 0 of `material` from the constant buffers bound so far.
    fn bind_group(
        &self,
        state: &WgpuState,
        material: &WgpuMaterial,
        source: Option<&wgpu::TextureView>,
    ) -> Option<wgpu::BindGroup> {
        let layout = material.bind_group_layout.as_ref()?;
        let mut buffers = Vec::with_capacity(material.constants.len());
        for name in &material.constants {
            let Some(binding) = state.constants.get(name) else {
                log::trace!("WgpuBackend: constant buffer '{name}' not bound, skipping draw");
                return None;
            };
            let buffer = state.buffers.get(&binding.buffer)?;
            buffers.push((buffer, binding.offset, binding.size));
        }
        let mut entries: Vec<wgpu::BindGroupEntry> = buffers
            .iter()
            .enumerate()
            .map(|(index, (buffer, offset, size))| wgpu::BindGroupEntry {
                binding: index as u32,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer,
                    offset: *offset,
                    size: wgpu::BufferSize::new(*size),
                }),
            })
            .collect();
        if material.samples_source {
            let view = source?;
            let base = entries.len() as u32;
            entries.push(wgpu::BindGroupEntry {
                binding: base,
                resource: wgpu::BindingResource::TextureView(view),
            });
            entries.push(wgpu::BindGroupEntry {
                binding: base + 1,
                resource: wgpu::BindingResource::Sampler(&self.sampler),
            });
        }
        Some(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: None,
            layout,
            entries: &entries,
        }))
    }

    fn record_draw(
        &self,
        geometry: Option<GeometryId>,
        material: MaterialId,
        instances: Option<BufferBinding>,
        instance_count: u32,
        source: Option<TargetSurface>,
        command: &str,
    ) -> Result<(), ResourceError> {
        let mut state = self.state();
        let depth_state = Self::require_render_pass(&mut state, command)?.depth_state;
        let instances = match instances {
            Some(binding) => {
                let buffer = state
                    .buffers
                    .get(&binding.buffer)
                    .cloned()
                    .ok_or(ResourceError::BufferNotFound(binding.buffer))?;
                if binding.offset + binding.size > buffer.size() {
                    return Err(ResourceError::OutOfBounds);
                }
                Some((buffer, binding.offset, binding.size))
            }
            None => None,
        };

        let Some(material_entry) = state.materials.get(&material).cloned() else {
            log::trace!("WgpuBackend: material {material:?} not registered, skipping {command}");
            return Ok(());
        };
        let geometry = match geometry {
            Some(id) => match state.geometries.get(&id).cloned() {
                Some(geometry) => Some(geometry),
                None => {
                    log::trace!("WgpuBackend: geometry {id:?} not registered, skipping {command}");
                    return Ok(());
                }
            },
            None => None,
        };
        let source_view = match source {
            Some(surface) => Self::texture_for(&state, surface)?
                .map(|texture| texture.create_view(&wgpu::TextureViewDescriptor::default())),
            None => None,
        };
        let bind_group = self.bind_group(&state, &material_entry, source_view.as_ref());
        if material_entry.bind_group_layout.is_some() && bind_group.is_none() {
            return Ok(());
        }

        let pass = Self::require_render_pass(&mut state, command)?;
        pass.ops.push(PassOp::Draw {
            pipeline: material_entry.pipeline_for(depth_state).clone(),
            bind_group,
            geometry,
            instances,
            instance_count,
        });
        Ok(())
    }

    fn replay(&self, state: &mut WgpuState, recording: RecordingPass) -> Result<(), ResourceError> {
        let color = match &recording.color {
            Some(target) => Self::layer_view(state, target)?.map(|view| (view, *target)),
            None => None,
        };
        let depth = match &recording.depth {
            Some(target) => Self::layer_view(state, target)?.map(|view| (view, *target)),
            None => None,
        };
        let (width, height) = color
            .as_ref()
            .or(depth.as_ref())
            .map(|((_, w, h), _)| (*w, *h))
            .unwrap_or(DEFAULT_BACKBUFFER_SIZE);

        self.with_encoder(state, |encoder| {
            let color_attachments = [color.as_ref().map(|((view, _, _), target)| {
                wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: color_load_op(target),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                }
            })];
            let depth_stencil_attachment =
                depth
                    .as_ref()
                    .map(|((view, _, _), target)| wgpu::RenderPassDepthStencilAttachment {
                        view,
                        depth_ops: Some(wgpu::Operations {
                            load: depth_load_op(target),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    });
            let color_slots: &[Option<wgpu::RenderPassColorAttachment>] = if color.is_some() {
                &color_attachments
            } else {
                &[]
            };

            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(recording.name.as_str()),
                color_attachments: color_slots,
                depth_stencil_attachment,
                ..Default::default()
            });
            for op in &recording.ops {
                match op {
                    PassOp::Viewport(viewport) => {
                        let v = clamp_viewport(*viewport, width, height);
                        pass.set_viewport(v.x, v.y, v.width, v.height, v.min_depth, v.max_depth);
                    }
                    PassOp::Scissor(rect) => {
                        let x = rect.x.min(width);
                        let y = rect.y.min(height);
                        pass.set_scissor_rect(
                            x,
                            y,
                            rect.width.min(width - x),
                            rect.height.min(height - y),
                        );
                    }
                    PassOp::PushDebugGroup(name) => pass.push_debug_group(name),
                    PassOp::PopDebugGroup => pass.pop_debug_group(),
                    PassOp::Draw {
                        pipeline,
                        bind_group,
                        geometry,
                        instances,
                        instance_count,
                    } => {
                        pass.set_pipeline(pipeline);
                        if let Some(bind_group) = bind_group {
                            pass.set_bind_group(0, bind_group, &[]);
                        }
                        if let Some((buffer, offset, size)) = instances {
                            pass.set_vertex_buffer(1, buffer.slice(*offset..*offset + *size));
                        }
                        match geometry {
                            Some(geometry) => {
                                pass.set_vertex_buffer(0, geometry.vertex_buffer.slice(..));
                                pass.set_index_buffer(
                                    geometry.index_buffer.slice(..),
                                    geometry.index_format,
                                );
                                pass.draw_indexed(0..geometry.index_count, 0, 0..*instance_count);
                            }
                            // Full-screen triangle.
                            None => pass.draw(0..3, 0..1),
                        }
                    }
                }
            }
        });
        log::trace!(
            "WgpuBackend: Replayed render pass '{}' ({} commands)",
            recording.name,
            recording.ops.len()
        );
        Ok(())
    }
}

impl GraphicsBackend for WgpuBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::Wgpu
    }

    fn max_frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    fn current_frame(&self) -> usize {
        self.frame_index.load(Ordering::Relaxed) % self.frames_in_flight
    }

    fn constant_buffer_offset_alignment(&self) -> u64 {
        self.alignment
    }

    fn begin_frame(&self) -> Result<(), RenderError> {
        self.frame_index.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state();
        if state.pass.is_some() {
            return Err(RenderError::RenderingFailed(
                "begin_frame called with a pass still open".to_string(),
            ));
        }
        state.attachments.clear();
        state.constants.clear();
        self.with_encoder(&mut state, |_| ());
        Ok(())
    }

    fn end_frame(&self) -> Result<(), RenderError> {
        let mut state = self.state();
        if state.pass.is_some() {
            return Err(RenderError::RenderingFailed(
                "end_frame called with a pass still open".to_string(),
            ));
        }
        self.flush(&mut state);
        drop(state);
        if let Err(e) = self.device.poll(wgpu::PollType::Poll) {
            log::warn!("Failed to poll device (non-blocking): {e:?}");
        }
        Ok(())
    }

    fn create_fence(
        &self,
        fence_type: FenceType,
        name: Cow<'static, str>,
    ) -> Result<GraphicsBackendFence, ResourceError> {
        let id = FenceId(self.next_fence_id.fetch_add(1, Ordering::Relaxed));
        self.state()
            .fences
            .insert(id, (name.to_string(), FenceState::Unsignaled));
        log::debug!("WgpuBackend: Created fence '{name}' ({fence_type:?}) with ID: {id:?}");
        Ok(GraphicsBackendFence {
            id,
            fence_type,
            name,
        })
    }

    // A single wgpu queue executes submissions in order, so submitting the
    // commands recorded so far is enough to order them before later waits.
    fn signal_fence(&self, fence: &GraphicsBackendFence) -> Result<(), ResourceError> {
        let mut state = self.state();
        if !state.fences.contains_key(&fence.id) {
            return Err(FenceError::Unknown { id: fence.id }.into());
        }
        self.flush(&mut state);
        if let Some(entry) = state.fences.get_mut(&fence.id) {
            entry.1 = FenceState::Signaled;
        }
        Ok(())
    }

    fn wait_for_fence(&self, fence: &GraphicsBackendFence) -> Result<(), ResourceError> {
        match self.fence_state(fence)? {
            FenceState::Signaled => Ok(()),
            FenceState::Unsignaled => Err(FenceError::WaitOnUnsignaled {
                name: fence.name.to_string(),
            }
            .into()),
        }
    }

    fn delete_fence(&self, fence: &GraphicsBackendFence) -> Result<(), ResourceError> {
        self.state()
            .fences
            .remove(&fence.id)
            .map(|_| ())
            .ok_or_else(|| FenceError::Unknown { id: fence.id }.into())
    }

    fn fence_state(&self, fence: &GraphicsBackendFence) -> Result<FenceState, ResourceError> {
        self.state()
            .fences
            .get(&fence.id)
            .map(|(_, state)| *state)
            .ok_or_else(|| FenceError::Unknown { id: fence.id }.into())
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: descriptor.label.as_deref(),
            size: descriptor.size,
            usage: descriptor.usage.into_wgpu() | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let id = BufferId(self.next_buffer_id.fetch_add(1, Ordering::Relaxed));
        self.state().buffers.insert(id, buffer);
        log::info!(
            "WgpuBackend: Created buffer '{}' with ID: {:?}, size: {} bytes",
            descriptor.label.as_deref().unwrap_or_default(),
            id,
            descriptor.size
        );
        Ok(id)
    }

    fn delete_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        let buffer = self
            .state()
            .buffers
            .remove(&id)
            .ok_or(ResourceError::BufferNotFound(id))?;
        buffer.destroy();
        log::debug!("WgpuBackend: Destroyed buffer with ID: {id:?}");
        Ok(())
    }

    fn set_buffer_data(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        let state = self.state();
        let buffer = state
            .buffers
            .get(&id)
            .ok_or(ResourceError::BufferNotFound(id))?;
        if offset + data.len() as u64 > buffer.size() {
            return Err(ResourceError::OutOfBounds);
        }
        self.queue.write_buffer(buffer, offset, data);
        Ok(())
    }

    fn copy_buffer_sub_data(
        &self,
        source: BufferId,
        destination: BufferId,
        source_offset: u64,
        destination_offset: u64,
        size: u64,
    ) -> Result<(), ResourceError> {
        let mut state = self.state();
        Self::require_copy_pass(&state, "copy_buffer_sub_data")?;
        let src = state
            .buffers
            .get(&source)
            .cloned()
            .ok_or(ResourceError::BufferNotFound(source))?;
        let dst = state
            .buffers
            .get(&destination)
            .cloned()
            .ok_or(ResourceError::BufferNotFound(destination))?;
        if source_offset + size > src.size() || destination_offset + size > dst.size() {
            return Err(ResourceError::OutOfBounds);
        }
        self.with_encoder(&mut state, |encoder| {
            encoder.copy_buffer_to_buffer(&src, source_offset, &dst, destination_offset, size);
        });
        Ok(())
    }

    fn bind_constant_buffer(&self, name: &str, binding: BufferBinding) -> Result<(), ResourceError> {
        if binding.offset % self.alignment != 0 {
            return Err(ResourceError::BackendError(format!(
                "constant buffer '{name}' bound at offset {} not aligned to {}",
                binding.offset, self.alignment
            )));
        }
        let mut state = self.state();
        if !state.buffers.contains_key(&binding.buffer) {
            return Err(ResourceError::BufferNotFound(binding.buffer));
        }
        state.constants.insert(name.to_string(), binding);
        Ok(())
    }

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError> {
        if descriptor.width == 0 || descriptor.height == 0 || descriptor.layers == 0 {
            return Err(ResourceError::BackendError(format!(
                "texture '{}' has an empty extent",
                descriptor.label
            )));
        }
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&descriptor.label),
            size: wgpu::Extent3d {
                width: descriptor.width,
                height: descriptor.height,
                depth_or_array_layers: descriptor.layers,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: descriptor.format.into_wgpu(),
            usage: texture_usages(),
            view_formats: &[],
        });
        let id = TextureId(self.next_texture_id.fetch_add(1, Ordering::Relaxed));
        self.state().textures.insert(
            id,
            WgpuTextureEntry {
                texture,
                descriptor: descriptor.clone(),
            },
        );
        log::info!(
            "WgpuBackend: Created texture '{}' with ID: {:?}, {}x{}x{}",
            descriptor.label,
            id,
            descriptor.width,
            descriptor.height,
            descriptor.layers
        );
        Ok(id)
    }

    fn delete_texture(&self, id: TextureId) -> Result<(), ResourceError> {
        let entry = self
            .state()
            .textures
            .remove(&id)
            .ok_or(ResourceError::NotFound)?;
        entry.texture.destroy();
        log::debug!(
            "WgpuBackend: Destroyed texture '{}' with ID: {id:?}",
            entry.descriptor.label
        );
        Ok(())
    }

    fn attach_render_target(&self, target: &RenderTargetDescriptor) -> Result<(), ResourceError> {
        let mut state = self.state();
        Self::require_no_pass(&state, "attach_render_target")?;
        Self::texture_for(&state, target.surface)?;
        state
            .attachments
            .retain(|attached| attached.slot != target.slot);
        state.attachments.push(*target);
        Ok(())
    }

    // wgpu tracks resource states itself; transitions only validate the target.
    fn transition_render_target(
        &self,
        target: &RenderTargetDescriptor,
        new_state: ResourceState,
    ) -> Result<(), ResourceError> {
        let state = self.state();
        Self::require_no_pass(&state, "transition_render_target")?;
        Self::texture_for(&state, target.surface)?;
        log::trace!("WgpuBackend: {:?} -> {new_state:?}", target.surface);
        Ok(())
    }

    fn copy_texture_to_texture(
        &self,
        source: &RenderTargetDescriptor,
        destination: &RenderTargetDescriptor,
    ) -> Result<(), ResourceError> {
        let mut state = self.state();
        Self::require_copy_pass(&state, "copy_texture_to_texture")?;
        let (Some(src), Some(dst)) = (
            Self::texture_for(&state, source.surface)?.cloned(),
            Self::texture_for(&state, destination.surface)?.cloned(),
        ) else {
            return Err(ResourceError::InvalidHandle);
        };
        let extent = wgpu::Extent3d {
            width: src.width().min(dst.width()),
            height: src.height().min(dst.height()),
            depth_or_array_layers: 1,
        };
        self.with_encoder(&mut state, |encoder| {
            encoder.copy_texture_to_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &src,
                    mip_level: source.mip_level,
                    origin: wgpu::Origin3d {
                        x: 0,
                        y: 0,
                        z: source.layer,
                    },
                    aspect: wgpu::TextureAspect::All,
                },
                wgpu::TexelCopyTextureInfo {
                    texture: &dst,
                    mip_level: destination.mip_level,
                    origin: wgpu::Origin3d {
                        x: 0,
                        y: 0,
                        z: destination.layer,
                    },
                    aspect: wgpu::TextureAspect::All,
                },
                extent,
            );
        });
        Ok(())
    }

    fn begin_render_pass(&self, name: &str) -> Result<(), ResourceError> {
        let mut state = self.state();
        Self::require_no_pass(&state, "begin_render_pass")?;
        let attachments = std::mem::take(&mut state.attachments);
        let color = attachments
            .iter()
            .find(|target| matches!(target.slot, AttachmentSlot::Color(0)))
            .copied();
        let depth = attachments
            .iter()
            .find(|target| target.slot == AttachmentSlot::Depth)
            .copied();
        state.pass = Some(OpenPass::Render(RecordingPass {
            name: name.to_string(),
            color,
            depth,
            ops: Vec::new(),
            depth_state: DepthState::DEFAULT,
        }));
        Ok(())
    }

    fn end_render_pass(&self) -> Result<(), ResourceError> {
        let mut state = self.state();
        let recording = match state.pass.take() {
            Some(OpenPass::Render(recording)) => recording,
            other => {
                state.pass = other;
                return Err(ResourceError::InvalidPassState(
                    "end_render_pass without a matching begin_render_pass".to_string(),
                ));
            }
        };
        self.replay(&mut state, recording)
    }

    fn begin_copy_pass(&self, name: &str) -> Result<(), ResourceError> {
        let mut state = self.state();
        Self::require_no_pass(&state, "begin_copy_pass")?;
        state.pass = Some(OpenPass::Copy(name.to_string()));
        self.with_encoder(&mut state, |encoder| encoder.push_debug_group(name));
        Ok(())
    }

    fn end_copy_pass(&self) -> Result<(), ResourceError> {
        let mut state = self.state();
        Self::require_copy_pass(&state, "end_copy_pass")?;
        state.pass = None;
        self.with_encoder(&mut state, |encoder| encoder.pop_debug_group());
        Ok(())
    }

    fn set_viewport(&self, viewport: Viewport) -> Result<(), ResourceError> {
        let mut state = self.state();
        Self::require_render_pass(&mut state, "set_viewport")?
            .ops
            .push(PassOp::Viewport(viewport));
        Ok(())
    }

    fn set_scissor_rect(&self, rect: ScissorRect) -> Result<(), ResourceError> {
        let mut state = self.state();
        Self::require_render_pass(&mut state, "set_scissor_rect")?
            .ops
            .push(PassOp::Scissor(rect));
        Ok(())
    }

    fn set_depth_state(&self, depth: DepthState) -> Result<(), ResourceError> {
        let mut state = self.state();
        Self::require_render_pass(&mut state, "set_depth_state")?.depth_state = depth;
        Ok(())
    }

    fn draw_elements(
        &self,
        geometry: GeometryId,
        material: MaterialId,
        per_draw: BufferBinding,
    ) -> Result<(), ResourceError> {
        self.record_draw(Some(geometry), material, Some(per_draw), 1, None, "draw_elements")
    }

    fn draw_elements_instanced(
        &self,
        geometry: GeometryId,
        material: MaterialId,
        instances: BufferBinding,
        instance_count: u32,
    ) -> Result<(), ResourceError> {
        self.record_draw(
            Some(geometry),
            material,
            Some(instances),
            instance_count,
            None,
            "draw_elements_instanced",
        )
    }

    fn blit(&self, source: TargetSurface, material: MaterialId) -> Result<(), ResourceError> {
        self.record_draw(None, material, None, 1, Some(source), "blit")
    }

    fn push_debug_group(&self, name: &str) {
        let mut state = self.state();
        if let Some(OpenPass::Render(pass)) = state.pass.as_mut() {
            pass.ops.push(PassOp::PushDebugGroup(name.to_string()));
            return;
        }
        self.with_encoder(&mut state, |encoder| encoder.push_debug_group(name));
    }

    fn pop_debug_group(&self) {
        let mut state = self.state();
        if let Some(OpenPass::Render(pass)) = state.pass.as_mut() {
            pass.ops.push(PassOp::PopDebugGroup);
            return;
        }
        self.with_encoder(&mut state, |encoder| encoder.pop_debug_group());
    }
}

impl Drop for WgpuBackend {
    fn drop(&mut self) {
        let mut state = self.state();
        self.flush(&mut state);
        drop(state);
        if let Err(e) = self.device.poll(wgpu::PollType::Wait) {
            log::warn!("Failed to poll device during shutdown: {e:?}");
        }
    }
}
