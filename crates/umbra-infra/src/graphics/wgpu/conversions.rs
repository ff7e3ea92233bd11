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

use umbra_core::renderer::api::{
    BufferUsage, DepthFunction, LoadAction, RenderTargetDescriptor, TextureFormat, Viewport,
};

/// Conversion of Umbra API values into their `wgpu` equivalents.
///
/// Both sides are foreign to this crate for `From`, hence a local trait.
pub trait IntoWgpu<T> {
    /// The `wgpu` value.
    fn into_wgpu(self) -> T;
}

impl IntoWgpu<wgpu::TextureFormat> for TextureFormat {
    fn into_wgpu(self) -> wgpu::TextureFormat {
        match self {
            TextureFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
            TextureFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
            TextureFormat::Depth32Float => wgpu::TextureFormat::Depth32Float,
        }
    }
}

impl IntoWgpu<wgpu::CompareFunction> for DepthFunction {
    fn into_wgpu(self) -> wgpu::CompareFunction {
        match self {
            DepthFunction::Never => wgpu::CompareFunction::Never,
            DepthFunction::Less => wgpu::CompareFunction::Less,
            DepthFunction::Equal => wgpu::CompareFunction::Equal,
            DepthFunction::LessEqual => wgpu::CompareFunction::LessEqual,
            DepthFunction::Greater => wgpu::CompareFunction::Greater,
            DepthFunction::GreaterEqual => wgpu::CompareFunction::GreaterEqual,
            DepthFunction::Always => wgpu::CompareFunction::Always,
        }
    }
}

// The flag layouts differ, so bits are mapped one by one.
impl IntoWgpu<wgpu::BufferUsages> for BufferUsage {
    fn into_wgpu(self) -> wgpu::BufferUsages {
        let mut usages = wgpu::BufferUsages::empty();
        if self.contains(BufferUsage::COPY_SRC) {
            usages |= wgpu::BufferUsages::COPY_SRC;
        }
        if self.intersects(BufferUsage::COPY_DST | BufferUsage::DYNAMIC) {
            usages |= wgpu::BufferUsages::COPY_DST;
        }
        if self.contains(BufferUsage::CONSTANT) {
            usages |= wgpu::BufferUsages::UNIFORM;
        }
        if self.contains(BufferUsage::STRUCTURED) {
            // Instance matrices are read as per-instance vertex attributes.
            usages |= wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::VERTEX;
        }
        usages
    }
}

/// Load operation of a color attachment.
pub fn color_load_op(target: &RenderTargetDescriptor) -> wgpu::LoadOp<wgpu::Color> {
    match target.load {
        LoadAction::Load => wgpu::LoadOp::Load,
        LoadAction::Clear | LoadAction::DontCare => {
            let [r, g, b, a] = target.clear_color;
            wgpu::LoadOp::Clear(wgpu::Color {
                r: r as f64,
                g: g as f64,
                b: b as f64,
                a: a as f64,
            })
        }
    }
}

/// Load operation of a depth attachment.
pub fn depth_load_op(target: &RenderTargetDescriptor) -> wgpu::LoadOp<f32> {
    match target.load {
        LoadAction::Load => wgpu::LoadOp::Load,
        LoadAction::Clear | LoadAction::DontCare => wgpu::LoadOp::Clear(target.clear_depth),
    }
}

/// Clamps a viewport to the attachment size, as wgpu rejects viewports that overflow it.
pub fn clamp_viewport(viewport: Viewport, width: u32, height: u32) -> Viewport {
    let x = viewport.x.clamp(0.0, width as f32);
    let y = viewport.y.clamp(0.0, height as f32);
    Viewport {
        x,
        y,
        width: viewport.width.clamp(0.0, width as f32 - x),
        height: viewport.height.clamp(0.0, height as f32 - y),
        min_depth: viewport.min_depth.clamp(0.0, 1.0),
        max_depth: viewport.max_depth.clamp(0.0, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_core::renderer::api::TextureId;

    #[test]
    fn test_buffer_usage_mapping() {
        let usages: wgpu::BufferUsages = (BufferUsage::CONSTANT | BufferUsage::DYNAMIC).into_wgpu();
        assert!(usages.contains(wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST));
        assert!(!usages.contains(wgpu::BufferUsages::VERTEX));

        let usages: wgpu::BufferUsages = BufferUsage::STRUCTURED.into_wgpu();
        assert!(usages.contains(wgpu::BufferUsages::VERTEX));
    }

    #[test]
    fn test_load_ops_follow_the_descriptor() {
        let kept = RenderTargetDescriptor::color(TextureId(1));
        assert_eq!(color_load_op(&kept), wgpu::LoadOp::Load);

        let cleared = RenderTargetDescriptor::depth(TextureId(1)).cleared_depth(0.5);
        assert_eq!(depth_load_op(&cleared), wgpu::LoadOp::Clear(0.5));
    }

    #[test]
    fn test_viewport_is_clamped_to_the_attachment() {
        let viewport = Viewport {
            x: 600.0,
            y: -10.0,
            width: 400.0,
            height: 100.0,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        let clamped = clamp_viewport(viewport, 800, 600);
        assert_eq!(clamped.x, 600.0);
        assert_eq!(clamped.y, 0.0);
        assert_eq!(clamped.width, 200.0);
        assert_eq!(clamped.height, 100.0);
    }
}
