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

//! Render target, viewport, and fixed-function state descriptors.

use super::TextureId;

/// The surface a render target descriptor points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetSurface {
    /// A backend texture (optionally one slice of an array or cube map).
    Texture(TextureId),
    /// The swapchain color image.
    ColorBackbuffer,
    /// The swapchain depth image.
    DepthBackbuffer,
    /// No attachment; used to detach depth for full-screen passes.
    None,
}

/// Which attachment slot a target binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentSlot {
    /// A color attachment at the given index.
    Color(u8),
    /// The depth (and stencil) attachment.
    Depth,
}

/// What happens to the previous contents of an attachment when a pass begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LoadAction {
    /// Keep the previous contents.
    #[default]
    Load,
    /// Clear to the descriptor's clear value.
    Clear,
    /// Contents are undefined.
    DontCare,
}

/// Describes one attachment bound by [`attach_render_target`](crate::renderer::GraphicsBackend::attach_render_target).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderTargetDescriptor {
    /// The surface to render into.
    pub surface: TargetSurface,
    /// The attachment slot.
    pub slot: AttachmentSlot,
    /// Array layer (texture arrays) or cube face.
    pub layer: u32,
    /// Mip level.
    pub mip_level: u32,
    /// Load behavior at pass start.
    pub load: LoadAction,
    /// Clear color used when `load` is [`LoadAction::Clear`] on a color slot.
    pub clear_color: [f32; 4],
    /// Clear depth used when `load` is [`LoadAction::Clear`] on the depth slot.
    pub clear_depth: f32,
}

impl RenderTargetDescriptor {
    /// A color attachment on slot 0 of `texture`, keeping its contents.
    pub fn color(texture: TextureId) -> Self {
        Self {
            surface: TargetSurface::Texture(texture),
            slot: AttachmentSlot::Color(0),
            layer: 0,
            mip_level: 0,
            load: LoadAction::Load,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            clear_depth: 1.0,
        }
    }

    /// A depth attachment on `texture`, keeping its contents.
    pub fn depth(texture: TextureId) -> Self {
        Self {
            slot: AttachmentSlot::Depth,
            ..Self::color(texture)
        }
    }

    /// The swapchain color image.
    pub fn color_backbuffer() -> Self {
        Self {
            surface: TargetSurface::ColorBackbuffer,
            ..Self::color(TextureId(0))
        }
    }

    /// The swapchain depth image.
    pub fn depth_backbuffer() -> Self {
        Self {
            surface: TargetSurface::DepthBackbuffer,
            ..Self::depth(TextureId(0))
        }
    }

    /// Detaches depth.
    pub fn empty_depth() -> Self {
        Self {
            surface: TargetSurface::None,
            load: LoadAction::DontCare,
            ..Self::depth(TextureId(0))
        }
    }

    /// Returns a copy targeting another array layer or cube face.
    pub fn with_layer(mut self, layer: u32) -> Self {
        self.layer = layer;
        self
    }

    /// Returns a copy cleared to `color` at pass start.
    pub fn cleared(mut self, color: [f32; 4]) -> Self {
        self.load = LoadAction::Clear;
        self.clear_color = color;
        self
    }

    /// Returns a copy whose depth is cleared to `depth` at pass start.
    pub fn cleared_depth(mut self, depth: f32) -> Self {
        self.load = LoadAction::Clear;
        self.clear_depth = depth;
        self
    }
}

/// Resource states used by render target transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
    /// Writable as a color or depth attachment.
    RenderTarget,
    /// Readable from shaders.
    ShaderResource,
    /// Source of a copy.
    CopySource,
    /// Destination of a copy.
    CopyDestination,
    /// Ready to be presented.
    Present,
}

/// A viewport rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
    /// Minimum depth.
    pub min_depth: f32,
    /// Maximum depth.
    pub max_depth: f32,
}

impl Viewport {
    /// A full viewport of the given size with the `[0, 1]` depth range.
    pub fn from_size(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// A scissor rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScissorRect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

/// Depth comparison functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DepthFunction {
    /// Never passes.
    Never,
    /// Passes when the incoming depth is less.
    Less,
    /// Passes when equal.
    Equal,
    /// Passes when less or equal.
    #[default]
    LessEqual,
    /// Passes when greater.
    Greater,
    /// Passes when greater or equal.
    GreaterEqual,
    /// Always passes.
    Always,
}

/// Depth test state for the next draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthState {
    /// Whether draws write depth.
    pub write_enabled: bool,
    /// The comparison function.
    pub function: DepthFunction,
}

impl DepthState {
    /// Depth test and write with `LessEqual`.
    pub const DEFAULT: Self = Self {
        write_enabled: true,
        function: DepthFunction::LessEqual,
    };

    /// No test, no write.
    pub const DISABLED: Self = Self {
        write_enabled: false,
        function: DepthFunction::Always,
    };
}

impl Default for DepthState {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Pixel formats of textures created by passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// 8-bit normalized RGBA.
    Rgba8Unorm,
    /// 16-bit float RGBA, used for HDR color targets.
    Rgba16Float,
    /// 32-bit float depth.
    Depth32Float,
}

impl TextureFormat {
    /// Whether this is a depth format.
    pub fn is_depth(self) -> bool {
        matches!(self, TextureFormat::Depth32Float)
    }
}

/// A descriptor used to create a texture usable as a render target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDescriptor {
    /// Debug label.
    pub label: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Number of array layers (6 for a cube map).
    pub layers: u32,
    /// Pixel format.
    pub format: TextureFormat,
}

impl TextureDescriptor {
    /// A single-layer 2D texture.
    pub fn new_2d(label: impl Into<String>, width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            label: label.into(),
            width,
            height,
            layers: 1,
            format,
        }
    }

    /// A 2D texture array with `layers` slices.
    pub fn new_array(
        label: impl Into<String>,
        width: u32,
        height: u32,
        layers: u32,
        format: TextureFormat,
    ) -> Self {
        Self {
            layers,
            ..Self::new_2d(label, width, height, format)
        }
    }
}
