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

//! Enumerations shared across the graphics device contract.

/// Pixel formats used by the renderer's textures and render targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// One 8-bit unorm channel.
    R8Unorm,
    /// Two 8-bit unorm channels.
    Rg8Unorm,
    /// Four 8-bit unorm channels.
    Rgba8Unorm,
    /// Four 8-bit unorm channels, sRGB encoded.
    Rgba8UnormSrgb,
    /// BGRA 8-bit unorm, the usual swapchain format.
    Bgra8Unorm,
    /// BGRA 8-bit unorm, sRGB encoded.
    Bgra8UnormSrgb,
    /// One 16-bit float channel.
    R16Float,
    /// Two 16-bit float channels.
    Rg16Float,
    /// Four 16-bit float channels.
    Rgba16Float,
    /// One 32-bit float channel.
    R32Float,
    /// Two 32-bit float channels.
    Rg32Float,
    /// Four 32-bit float channels.
    Rgba32Float,
    /// 32-bit float depth.
    Depth32Float,
    /// 24-bit depth plus 8-bit stencil.
    Depth24PlusStencil8,
}

impl TextureFormat {
    /// Size of one texel in bytes, as used for uploads.
    pub const fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::R8Unorm => 1,
            TextureFormat::Rg8Unorm | TextureFormat::R16Float => 2,
            TextureFormat::Rgba8Unorm
            | TextureFormat::Rgba8UnormSrgb
            | TextureFormat::Bgra8Unorm
            | TextureFormat::Bgra8UnormSrgb
            | TextureFormat::Rg16Float
            | TextureFormat::R32Float
            | TextureFormat::Depth32Float
            | TextureFormat::Depth24PlusStencil8 => 4,
            TextureFormat::Rgba16Float | TextureFormat::Rg32Float => 8,
            TextureFormat::Rgba32Float => 16,
        }
    }

    /// Number of color channels; zero for depth formats.
    pub const fn channel_count(&self) -> u32 {
        match self {
            TextureFormat::R8Unorm | TextureFormat::R16Float | TextureFormat::R32Float => 1,
            TextureFormat::Rg8Unorm | TextureFormat::Rg16Float | TextureFormat::Rg32Float => 2,
            TextureFormat::Depth32Float | TextureFormat::Depth24PlusStencil8 => 0,
            _ => 4,
        }
    }

    /// `true` for formats with a depth aspect.
    pub const fn is_depth(&self) -> bool {
        matches!(
            self,
            TextureFormat::Depth32Float | TextureFormat::Depth24PlusStencil8
        )
    }

    /// `true` for formats with a stencil aspect.
    pub const fn has_stencil(&self) -> bool {
        matches!(self, TextureFormat::Depth24PlusStencil8)
    }

    /// `true` for sRGB-encoded color formats.
    pub const fn is_srgb(&self) -> bool {
        matches!(
            self,
            TextureFormat::Rgba8UnormSrgb | TextureFormat::Bgra8UnormSrgb
        )
    }

    /// `true` for 32-bit float color formats, which are not filterable everywhere.
    pub const fn is_float32(&self) -> bool {
        matches!(
            self,
            TextureFormat::R32Float | TextureFormat::Rg32Float | TextureFormat::Rgba32Float
        )
    }
}

/// Width of the indices in an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexFormat {
    /// 16-bit indices.
    Uint16,
    /// 32-bit indices.
    #[default]
    Uint32,
}

impl IndexFormat {
    /// Size of one index in bytes.
    pub const fn size(&self) -> u64 {
        match self {
            IndexFormat::Uint16 => 2,
            IndexFormat::Uint32 => 4,
        }
    }
}

/// Comparison used by depth tests, stencil tests and comparison samplers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompareFunction {
    /// Never passes.
    Never,
    /// Passes if the new value is less than the stored one.
    #[default]
    Less,
    /// Passes if the values are equal.
    Equal,
    /// Passes if the new value is less than or equal to the stored one.
    LessEqual,
    /// Passes if the new value is greater than the stored one.
    Greater,
    /// Passes if the values differ.
    NotEqual,
    /// Passes if the new value is greater than or equal to the stored one.
    GreaterEqual,
    /// Always passes.
    Always,
}

/// The shader stage a module or binding belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex stage.
    Vertex,
    /// Fragment stage.
    Fragment,
}

/// Optional device capabilities the renderer queries at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceFeature {
    /// Depth clamping instead of near/far clipping (`unclipped_depth`).
    DepthClipControl,
    /// Linear filtering of 32-bit float textures.
    Float32Filterable,
}

/// The native API behind a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GraphicsBackendType {
    /// Vulkan.
    Vulkan,
    /// Metal.
    Metal,
    /// Direct3D 12.
    Dx12,
    /// OpenGL / OpenGL ES.
    OpenGl,
    /// WebGPU in a browser.
    WebGpu,
    /// No real backend (tests, headless recording).
    #[default]
    Unknown,
}

/// Basic information about the adapter a device runs on.
#[derive(Debug, Clone, Default)]
pub struct GraphicsAdapterInfo {
    /// Human readable adapter name.
    pub name: String,
    /// Native API in use.
    pub backend_type: GraphicsBackendType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_properties() {
        assert_eq!(TextureFormat::Rg32Float.bytes_per_pixel(), 8);
        assert_eq!(TextureFormat::Rg32Float.channel_count(), 2);
        assert!(TextureFormat::Depth24PlusStencil8.is_depth());
        assert!(TextureFormat::Depth24PlusStencil8.has_stencil());
        assert!(!TextureFormat::Depth32Float.has_stencil());
        assert!(TextureFormat::Rgba8UnormSrgb.is_srgb());
        assert!(TextureFormat::Rg32Float.is_float32());
    }

    #[test]
    fn test_index_format_size() {
        assert_eq!(IndexFormat::Uint16.size(), 2);
        assert_eq!(IndexFormat::default().size(), 4);
    }
}
