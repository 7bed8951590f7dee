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

//! Conversions from the engine's descriptor types into wgpu types.

use umbra_core::math::{Extent3D, LinearRgba};
use umbra_core::renderer::api::{
    AddressMode, BindingType, BlendComponent, BlendFactor, BlendOperation, BlendState,
    BufferUsage, ColorTargetState, ColorWrites, CompareFunction, CullMode, DepthBiasState,
    FilterMode, FrontFace, GraphicsBackendType, IndexFormat, LoadOp, Operations,
    PrimitiveTopology, SamplerBindingType, ShaderStageFlags, StencilFaceState, StencilOperation,
    StencilState, StoreOp, TextureAspect, TextureFormat, TextureSampleType, TextureUsage,
    TextureViewDimension, VertexFormat, VertexStepMode,
};

/// A local extension trait to convert the engine's types into wgpu types.
/// This sidesteps the orphan rule while keeping an `.into_wgpu()` call syntax.
pub trait IntoWgpu<T> {
    /// Consumes self and converts it into a wgpu type.
    fn into_wgpu(self) -> T;
}

// --- Dimensions ---

impl IntoWgpu<wgpu::Extent3d> for Extent3D {
    fn into_wgpu(self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: self.depth_or_array_layers,
        }
    }
}

// --- Textures and samplers ---

impl IntoWgpu<wgpu::TextureFormat> for TextureFormat {
    fn into_wgpu(self) -> wgpu::TextureFormat {
        match self {
            TextureFormat::R8Unorm => wgpu::TextureFormat::R8Unorm,
            TextureFormat::Rg8Unorm => wgpu::TextureFormat::Rg8Unorm,
            TextureFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
            TextureFormat::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            TextureFormat::Bgra8Unorm => wgpu::TextureFormat::Bgra8Unorm,
            TextureFormat::Bgra8UnormSrgb => wgpu::TextureFormat::Bgra8UnormSrgb,
            TextureFormat::R16Float => wgpu::TextureFormat::R16Float,
            TextureFormat::Rg16Float => wgpu::TextureFormat::Rg16Float,
            TextureFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
            TextureFormat::R32Float => wgpu::TextureFormat::R32Float,
            TextureFormat::Rg32Float => wgpu::TextureFormat::Rg32Float,
            TextureFormat::Rgba32Float => wgpu::TextureFormat::Rgba32Float,
            TextureFormat::Depth32Float => wgpu::TextureFormat::Depth32Float,
            TextureFormat::Depth24PlusStencil8 => wgpu::TextureFormat::Depth24PlusStencil8,
        }
    }
}

/// Converts a wgpu texture format back into the engine's format.
///
/// Returns `None` for formats the engine never creates.
pub fn from_wgpu_texture_format(format: wgpu::TextureFormat) -> Option<TextureFormat> {
    Some(match format {
        wgpu::TextureFormat::R8Unorm => TextureFormat::R8Unorm,
        wgpu::TextureFormat::Rg8Unorm => TextureFormat::Rg8Unorm,
        wgpu::TextureFormat::Rgba8Unorm => TextureFormat::Rgba8Unorm,
        wgpu::TextureFormat::Rgba8UnormSrgb => TextureFormat::Rgba8UnormSrgb,
        wgpu::TextureFormat::Bgra8Unorm => TextureFormat::Bgra8Unorm,
        wgpu::TextureFormat::Bgra8UnormSrgb => TextureFormat::Bgra8UnormSrgb,
        wgpu::TextureFormat::R16Float => TextureFormat::R16Float,
        wgpu::TextureFormat::Rg16Float => TextureFormat::Rg16Float,
        wgpu::TextureFormat::Rgba16Float => TextureFormat::Rgba16Float,
        wgpu::TextureFormat::R32Float => TextureFormat::R32Float,
        wgpu::TextureFormat::Rg32Float => TextureFormat::Rg32Float,
        wgpu::TextureFormat::Rgba32Float => TextureFormat::Rgba32Float,
        wgpu::TextureFormat::Depth32Float => TextureFormat::Depth32Float,
        wgpu::TextureFormat::Depth24PlusStencil8 => TextureFormat::Depth24PlusStencil8,
        _ => return None,
    })
}

impl IntoWgpu<wgpu::TextureUsages> for TextureUsage {
    fn into_wgpu(self) -> wgpu::TextureUsages {
        let mut usages = wgpu::TextureUsages::empty();
        if self.contains(TextureUsage::COPY_SRC) {
            usages |= wgpu::TextureUsages::COPY_SRC;
        }
        if self.contains(TextureUsage::COPY_DST) {
            usages |= wgpu::TextureUsages::COPY_DST;
        }
        if self.contains(TextureUsage::TEXTURE_BINDING) {
            usages |= wgpu::TextureUsages::TEXTURE_BINDING;
        }
        if self.contains(TextureUsage::RENDER_ATTACHMENT) {
            usages |= wgpu::TextureUsages::RENDER_ATTACHMENT;
        }
        usages
    }
}

impl IntoWgpu<wgpu::TextureViewDimension> for TextureViewDimension {
    fn into_wgpu(self) -> wgpu::TextureViewDimension {
        match self {
            TextureViewDimension::D2 => wgpu::TextureViewDimension::D2,
            TextureViewDimension::D2Array => wgpu::TextureViewDimension::D2Array,
            TextureViewDimension::Cube => wgpu::TextureViewDimension::Cube,
        }
    }
}

impl IntoWgpu<wgpu::TextureAspect> for TextureAspect {
    fn into_wgpu(self) -> wgpu::TextureAspect {
        match self {
            TextureAspect::All => wgpu::TextureAspect::All,
            TextureAspect::DepthOnly => wgpu::TextureAspect::DepthOnly,
            TextureAspect::StencilOnly => wgpu::TextureAspect::StencilOnly,
        }
    }
}

impl IntoWgpu<wgpu::AddressMode> for AddressMode {
    fn into_wgpu(self) -> wgpu::AddressMode {
        match self {
            AddressMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
            AddressMode::Repeat => wgpu::AddressMode::Repeat,
            AddressMode::MirrorRepeat => wgpu::AddressMode::MirrorRepeat,
        }
    }
}

impl IntoWgpu<wgpu::FilterMode> for FilterMode {
    fn into_wgpu(self) -> wgpu::FilterMode {
        match self {
            FilterMode::Nearest => wgpu::FilterMode::Nearest,
            FilterMode::Linear => wgpu::FilterMode::Linear,
        }
    }
}

impl IntoWgpu<wgpu::MipmapFilterMode> for FilterMode {
    fn into_wgpu(self) -> wgpu::MipmapFilterMode {
        match self {
            FilterMode::Nearest => wgpu::MipmapFilterMode::Nearest,
            FilterMode::Linear => wgpu::MipmapFilterMode::Linear,
        }
    }
}

impl IntoWgpu<wgpu::CompareFunction> for CompareFunction {
    fn into_wgpu(self) -> wgpu::CompareFunction {
        match self {
            CompareFunction::Never => wgpu::CompareFunction::Never,
            CompareFunction::Less => wgpu::CompareFunction::Less,
            CompareFunction::Equal => wgpu::CompareFunction::Equal,
            CompareFunction::LessEqual => wgpu::CompareFunction::LessEqual,
            CompareFunction::Greater => wgpu::CompareFunction::Greater,
            CompareFunction::NotEqual => wgpu::CompareFunction::NotEqual,
            CompareFunction::GreaterEqual => wgpu::CompareFunction::GreaterEqual,
            CompareFunction::Always => wgpu::CompareFunction::Always,
        }
    }
}

// --- Bind groups ---

impl IntoWgpu<wgpu::ShaderStages> for ShaderStageFlags {
    fn into_wgpu(self) -> wgpu::ShaderStages {
        let mut stages = wgpu::ShaderStages::NONE;
        if self.contains(ShaderStageFlags::VERTEX) {
            stages |= wgpu::ShaderStages::VERTEX;
        }
        if self.contains(ShaderStageFlags::FRAGMENT) {
            stages |= wgpu::ShaderStages::FRAGMENT;
        }
        stages
    }
}

impl IntoWgpu<wgpu::TextureSampleType> for TextureSampleType {
    fn into_wgpu(self) -> wgpu::TextureSampleType {
        match self {
            TextureSampleType::Float { filterable } => {
                wgpu::TextureSampleType::Float { filterable }
            }
            TextureSampleType::Depth => wgpu::TextureSampleType::Depth,
        }
    }
}

impl IntoWgpu<wgpu::SamplerBindingType> for SamplerBindingType {
    fn into_wgpu(self) -> wgpu::SamplerBindingType {
        match self {
            SamplerBindingType::Filtering => wgpu::SamplerBindingType::Filtering,
            SamplerBindingType::NonFiltering => wgpu::SamplerBindingType::NonFiltering,
            SamplerBindingType::Comparison => wgpu::SamplerBindingType::Comparison,
        }
    }
}

impl IntoWgpu<wgpu::BindingType> for BindingType {
    fn into_wgpu(self) -> wgpu::BindingType {
        match self {
            BindingType::UniformBuffer {
                has_dynamic_offset,
                min_binding_size,
            } => wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset,
                min_binding_size,
            },
            BindingType::Texture {
                sample_type,
                view_dimension,
            } => wgpu::BindingType::Texture {
                sample_type: sample_type.into_wgpu(),
                view_dimension: view_dimension.into_wgpu(),
                multisampled: false,
            },
            BindingType::Sampler(kind) => wgpu::BindingType::Sampler(kind.into_wgpu()),
        }
    }
}

// --- Buffers ---

impl IntoWgpu<wgpu::BufferUsages> for BufferUsage {
    fn into_wgpu(self) -> wgpu::BufferUsages {
        let mut usages = wgpu::BufferUsages::empty();
        if self.contains(BufferUsage::COPY_SRC) {
            usages |= wgpu::BufferUsages::COPY_SRC;
        }
        if self.contains(BufferUsage::COPY_DST) {
            usages |= wgpu::BufferUsages::COPY_DST;
        }
        if self.contains(BufferUsage::INDEX) {
            usages |= wgpu::BufferUsages::INDEX;
        }
        if self.contains(BufferUsage::VERTEX) {
            usages |= wgpu::BufferUsages::VERTEX;
        }
        if self.contains(BufferUsage::UNIFORM) {
            usages |= wgpu::BufferUsages::UNIFORM;
        }
        usages
    }
}

impl IntoWgpu<wgpu::IndexFormat> for IndexFormat {
    fn into_wgpu(self) -> wgpu::IndexFormat {
        match self {
            IndexFormat::Uint16 => wgpu::IndexFormat::Uint16,
            IndexFormat::Uint32 => wgpu::IndexFormat::Uint32,
        }
    }
}

// --- Pipeline state ---

impl IntoWgpu<wgpu::VertexFormat> for VertexFormat {
    fn into_wgpu(self) -> wgpu::VertexFormat {
        match self {
            VertexFormat::Float32 => wgpu::VertexFormat::Float32,
            VertexFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
            VertexFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
            VertexFormat::Float32x4 => wgpu::VertexFormat::Float32x4,
        }
    }
}

impl IntoWgpu<wgpu::VertexStepMode> for VertexStepMode {
    fn into_wgpu(self) -> wgpu::VertexStepMode {
        match self {
            VertexStepMode::Vertex => wgpu::VertexStepMode::Vertex,
            VertexStepMode::Instance => wgpu::VertexStepMode::Instance,
        }
    }
}

impl IntoWgpu<wgpu::PrimitiveTopology> for PrimitiveTopology {
    fn into_wgpu(self) -> wgpu::PrimitiveTopology {
        match self {
            PrimitiveTopology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
            PrimitiveTopology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
            PrimitiveTopology::LineList => wgpu::PrimitiveTopology::LineList,
        }
    }
}

impl IntoWgpu<wgpu::FrontFace> for FrontFace {
    fn into_wgpu(self) -> wgpu::FrontFace {
        match self {
            FrontFace::Ccw => wgpu::FrontFace::Ccw,
            FrontFace::Cw => wgpu::FrontFace::Cw,
        }
    }
}

impl IntoWgpu<Option<wgpu::Face>> for CullMode {
    fn into_wgpu(self) -> Option<wgpu::Face> {
        match self {
            CullMode::None => None,
            CullMode::Front => Some(wgpu::Face::Front),
            CullMode::Back => Some(wgpu::Face::Back),
        }
    }
}

impl IntoWgpu<wgpu::StencilOperation> for StencilOperation {
    fn into_wgpu(self) -> wgpu::StencilOperation {
        match self {
            StencilOperation::Keep => wgpu::StencilOperation::Keep,
            StencilOperation::Zero => wgpu::StencilOperation::Zero,
            StencilOperation::Replace => wgpu::StencilOperation::Replace,
            StencilOperation::Invert => wgpu::StencilOperation::Invert,
            StencilOperation::IncrementClamp => wgpu::StencilOperation::IncrementClamp,
            StencilOperation::DecrementClamp => wgpu::StencilOperation::DecrementClamp,
            StencilOperation::IncrementWrap => wgpu::StencilOperation::IncrementWrap,
            StencilOperation::DecrementWrap => wgpu::StencilOperation::DecrementWrap,
        }
    }
}

impl IntoWgpu<wgpu::StencilFaceState> for StencilFaceState {
    fn into_wgpu(self) -> wgpu::StencilFaceState {
        wgpu::StencilFaceState {
            compare: self.compare.into_wgpu(),
            fail_op: self.fail_op.into_wgpu(),
            depth_fail_op: self.depth_fail_op.into_wgpu(),
            pass_op: self.pass_op.into_wgpu(),
        }
    }
}

impl IntoWgpu<wgpu::StencilState> for StencilState {
    fn into_wgpu(self) -> wgpu::StencilState {
        wgpu::StencilState {
            front: self.front.into_wgpu(),
            back: self.back.into_wgpu(),
            read_mask: self.read_mask,
            write_mask: self.write_mask,
        }
    }
}

impl IntoWgpu<wgpu::DepthBiasState> for DepthBiasState {
    fn into_wgpu(self) -> wgpu::DepthBiasState {
        wgpu::DepthBiasState {
            constant: self.constant,
            slope_scale: self.slope_scale,
            clamp: self.clamp,
        }
    }
}

impl IntoWgpu<wgpu::BlendFactor> for BlendFactor {
    fn into_wgpu(self) -> wgpu::BlendFactor {
        match self {
            BlendFactor::Zero => wgpu::BlendFactor::Zero,
            BlendFactor::One => wgpu::BlendFactor::One,
            BlendFactor::Src => wgpu::BlendFactor::Src,
            BlendFactor::OneMinusSrc => wgpu::BlendFactor::OneMinusSrc,
            BlendFactor::SrcAlpha => wgpu::BlendFactor::SrcAlpha,
            BlendFactor::OneMinusSrcAlpha => wgpu::BlendFactor::OneMinusSrcAlpha,
            BlendFactor::Dst => wgpu::BlendFactor::Dst,
            BlendFactor::DstAlpha => wgpu::BlendFactor::DstAlpha,
        }
    }
}

impl IntoWgpu<wgpu::BlendOperation> for BlendOperation {
    fn into_wgpu(self) -> wgpu::BlendOperation {
        match self {
            BlendOperation::Add => wgpu::BlendOperation::Add,
            BlendOperation::Subtract => wgpu::BlendOperation::Subtract,
            BlendOperation::ReverseSubtract => wgpu::BlendOperation::ReverseSubtract,
            BlendOperation::Min => wgpu::BlendOperation::Min,
            BlendOperation::Max => wgpu::BlendOperation::Max,
        }
    }
}

impl IntoWgpu<wgpu::BlendComponent> for BlendComponent {
    fn into_wgpu(self) -> wgpu::BlendComponent {
        wgpu::BlendComponent {
            src_factor: self.src_factor.into_wgpu(),
            dst_factor: self.dst_factor.into_wgpu(),
            operation: self.operation.into_wgpu(),
        }
    }
}

impl IntoWgpu<wgpu::BlendState> for BlendState {
    fn into_wgpu(self) -> wgpu::BlendState {
        wgpu::BlendState {
            color: self.color.into_wgpu(),
            alpha: self.alpha.into_wgpu(),
        }
    }
}

impl IntoWgpu<wgpu::ColorWrites> for ColorWrites {
    fn into_wgpu(self) -> wgpu::ColorWrites {
        // Same bit layout: red, green, blue, alpha.
        wgpu::ColorWrites::from_bits_truncate(self.bits())
    }
}

impl IntoWgpu<wgpu::ColorTargetState> for ColorTargetState {
    fn into_wgpu(self) -> wgpu::ColorTargetState {
        wgpu::ColorTargetState {
            format: self.format.into_wgpu(),
            blend: self.blend.map(IntoWgpu::into_wgpu),
            write_mask: self.write_mask.into_wgpu(),
        }
    }
}

// --- Render passes ---

impl IntoWgpu<wgpu::StoreOp> for StoreOp {
    fn into_wgpu(self) -> wgpu::StoreOp {
        match self {
            StoreOp::Store => wgpu::StoreOp::Store,
            StoreOp::Discard => wgpu::StoreOp::Discard,
        }
    }
}

impl IntoWgpu<wgpu::LoadOp<wgpu::Color>> for LoadOp<LinearRgba> {
    fn into_wgpu(self) -> wgpu::LoadOp<wgpu::Color> {
        match self {
            LoadOp::Load => wgpu::LoadOp::Load,
            LoadOp::Clear(color) => wgpu::LoadOp::Clear(wgpu::Color {
                r: color.r as f64,
                g: color.g as f64,
                b: color.b as f64,
                a: color.a as f64,
            }),
        }
    }
}

impl IntoWgpu<wgpu::LoadOp<f32>> for LoadOp<f32> {
    fn into_wgpu(self) -> wgpu::LoadOp<f32> {
        match self {
            LoadOp::Load => wgpu::LoadOp::Load,
            LoadOp::Clear(depth) => wgpu::LoadOp::Clear(depth),
        }
    }
}

impl IntoWgpu<wgpu::LoadOp<u32>> for LoadOp<u32> {
    fn into_wgpu(self) -> wgpu::LoadOp<u32> {
        match self {
            LoadOp::Load => wgpu::LoadOp::Load,
            LoadOp::Clear(stencil) => wgpu::LoadOp::Clear(stencil),
        }
    }
}

impl<V, W> IntoWgpu<wgpu::Operations<W>> for Operations<V>
where
    LoadOp<V>: IntoWgpu<wgpu::LoadOp<W>>,
{
    fn into_wgpu(self) -> wgpu::Operations<W> {
        wgpu::Operations {
            load: self.load.into_wgpu(),
            store: self.store.into_wgpu(),
        }
    }
}

// --- Adapter ---

/// Maps a wgpu backend onto the engine's backend type.
pub fn backend_type(backend: wgpu::Backend) -> GraphicsBackendType {
    match backend {
        wgpu::Backend::Vulkan => GraphicsBackendType::Vulkan,
        wgpu::Backend::Metal => GraphicsBackendType::Metal,
        wgpu::Backend::Dx12 => GraphicsBackendType::Dx12,
        wgpu::Backend::Gl => GraphicsBackendType::OpenGl,
        wgpu::Backend::BrowserWebGpu => GraphicsBackendType::WebGpu,
        _ => GraphicsBackendType::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_core::renderer::api::PrimitiveState;

    #[test]
    fn test_extent3d_to_wgpu_extent3d() {
        let extent = Extent3D {
            width: 1,
            height: 2,
            depth_or_array_layers: 6,
        };
        let w: wgpu::Extent3d = extent.into_wgpu();
        assert_eq!(w.width, 1);
        assert_eq!(w.height, 2);
        assert_eq!(w.depth_or_array_layers, 6);
    }

    #[test]
    fn test_texture_format_round_trip() {
        for format in [
            TextureFormat::R8Unorm,
            TextureFormat::Rgba8UnormSrgb,
            TextureFormat::Bgra8UnormSrgb,
            TextureFormat::Rgba16Float,
            TextureFormat::Rg32Float,
            TextureFormat::Depth24PlusStencil8,
        ] {
            let wgpu_format: wgpu::TextureFormat = format.into_wgpu();
            assert_eq!(from_wgpu_texture_format(wgpu_format), Some(format));
        }
        assert_eq!(from_wgpu_texture_format(wgpu::TextureFormat::Rgb10a2Unorm), None);
    }

    #[test]
    fn test_texture_usage_bits_are_remapped() {
        let usage: wgpu::TextureUsages =
            (TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING).into_wgpu();
        assert_eq!(
            usage,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING
        );
        assert!(!usage.contains(wgpu::TextureUsages::STORAGE_BINDING));
    }

    #[test]
    fn test_buffer_usage_conversion() {
        let usage: wgpu::BufferUsages = (BufferUsage::UNIFORM | BufferUsage::COPY_DST).into_wgpu();
        assert_eq!(
            usage,
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST
        );
    }

    #[test]
    fn test_shader_stage_conversion() {
        assert_eq!(
            wgpu::ShaderStages::VERTEX_FRAGMENT,
            ShaderStageFlags::VERTEX_FRAGMENT.into_wgpu()
        );
        assert_eq!(
            wgpu::ShaderStages::FRAGMENT,
            ShaderStageFlags::FRAGMENT.into_wgpu()
        );
    }

    #[test]
    fn test_cull_mode_conversion() {
        assert_eq!(None, CullMode::None.into_wgpu());
        assert_eq!(Some(wgpu::Face::Front), CullMode::Front.into_wgpu());
        assert_eq!(
            Some(wgpu::Face::Back),
            PrimitiveState::culled(CullMode::Back).cull_mode.into_wgpu()
        );
    }

    #[test]
    fn test_stencil_face_conversion() {
        let face = StencilFaceState {
            compare: CompareFunction::Always,
            fail_op: StencilOperation::Keep,
            depth_fail_op: StencilOperation::DecrementWrap,
            pass_op: StencilOperation::Keep,
        };
        let w: wgpu::StencilFaceState = face.into_wgpu();
        assert_eq!(w.compare, wgpu::CompareFunction::Always);
        assert_eq!(w.depth_fail_op, wgpu::StencilOperation::DecrementWrap);
    }

    #[test]
    fn test_additive_color_target() {
        let target: wgpu::ColorTargetState =
            ColorTargetState::additive(TextureFormat::Rgba16Float).into_wgpu();
        assert_eq!(target.format, wgpu::TextureFormat::Rgba16Float);
        assert_eq!(
            target.blend,
            Some(wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
            })
        );
        let masked: wgpu::ColorTargetState =
            ColorTargetState::masked(TextureFormat::Rgba16Float).into_wgpu();
        assert_eq!(masked.write_mask, wgpu::ColorWrites::empty());
    }

    #[test]
    fn test_clear_color_conversion() {
        let ops: wgpu::Operations<wgpu::Color> =
            Operations::clear(LinearRgba::new(0.25, 0.5, 1.0, 1.0)).into_wgpu();
        assert_eq!(
            ops.load,
            wgpu::LoadOp::Clear(wgpu::Color {
                r: 0.25,
                g: 0.5,
                b: 1.0,
                a: 1.0
            })
        );
        assert_eq!(ops.store, wgpu::StoreOp::Store);

        let depth: wgpu::Operations<f32> = Operations::<f32>::load().into_wgpu();
        assert_eq!(depth.load, wgpu::LoadOp::Load);
    }

    #[test]
    fn test_binding_type_conversion() {
        let depth = BindingType::Texture {
            sample_type: TextureSampleType::Depth,
            view_dimension: TextureViewDimension::D2,
        };
        assert_eq!(
            wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Depth,
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            depth.into_wgpu()
        );
        assert_eq!(
            wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
            BindingType::Sampler(SamplerBindingType::Comparison).into_wgpu()
        );
    }

    #[test]
    fn test_backend_type_mapping() {
        assert_eq!(backend_type(wgpu::Backend::Vulkan), GraphicsBackendType::Vulkan);
        assert_eq!(backend_type(wgpu::Backend::Gl), GraphicsBackendType::OpenGl);
        assert_eq!(backend_type(wgpu::Backend::Noop), GraphicsBackendType::Unknown);
    }
}
