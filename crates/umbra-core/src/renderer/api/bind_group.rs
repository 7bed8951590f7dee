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

//! Bind group layouts, bind groups and the resources they reference.

use super::buffer::BufferId;
use super::texture::{SamplerId, TextureAspect, TextureId, TextureViewDimension};
use super::util::ShaderStageFlags;
use std::num::NonZeroU64;

/// Opaque handle to a bind group layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindGroupLayoutId(pub usize);

/// Opaque handle to a bind group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindGroupId(pub usize);

/// How a shader samples a texture binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSampleType {
    /// Float texture, optionally filterable.
    Float {
        /// Whether linear filtering is allowed.
        filterable: bool,
    },
    /// Depth texture (comparison or raw depth reads).
    Depth,
}

/// Kind of sampler a binding expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerBindingType {
    /// Linear-filtering sampler.
    Filtering,
    /// Nearest-only sampler.
    NonFiltering,
    /// Depth comparison sampler.
    Comparison,
}

/// The type of resource a layout entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingType {
    /// A uniform buffer.
    UniformBuffer {
        /// Whether the offset is supplied at bind time.
        has_dynamic_offset: bool,
        /// Smallest valid binding size.
        min_binding_size: Option<NonZeroU64>,
    },
    /// A sampled texture.
    Texture {
        /// Sample type.
        sample_type: TextureSampleType,
        /// View dimension.
        view_dimension: TextureViewDimension,
    },
    /// A sampler.
    Sampler(SamplerBindingType),
}

/// One entry of a bind group layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindGroupLayoutEntry {
    /// Binding index in the shader.
    pub binding: u32,
    /// Stages that see the binding.
    pub visibility: ShaderStageFlags,
    /// Resource type.
    pub ty: BindingType,
}

/// Describes a bind group layout.
#[derive(Debug, Clone)]
pub struct BindGroupLayoutDescriptor<'a> {
    /// Debug label.
    pub label: Option<&'a str>,
    /// Entries, one per binding.
    pub entries: &'a [BindGroupLayoutEntry],
}

/// A range of a buffer bound as a uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferBinding {
    /// The buffer.
    pub buffer: BufferId,
    /// Byte offset.
    pub offset: u64,
    /// Byte size, or the rest of the buffer.
    pub size: Option<NonZeroU64>,
}

/// A texture bound for sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureBinding {
    /// The texture.
    pub texture: TextureId,
    /// View dimension.
    pub dimension: TextureViewDimension,
    /// Aspect, for depth/stencil textures.
    pub aspect: TextureAspect,
}

impl TextureBinding {
    /// A plain 2D color texture binding.
    pub const fn d2(texture: TextureId) -> Self {
        Self {
            texture,
            dimension: TextureViewDimension::D2,
            aspect: TextureAspect::All,
        }
    }

    /// The depth aspect of a depth or depth-stencil texture.
    pub const fn depth(texture: TextureId) -> Self {
        Self {
            texture,
            dimension: TextureViewDimension::D2,
            aspect: TextureAspect::DepthOnly,
        }
    }

    /// A cube map binding.
    pub const fn cube(texture: TextureId) -> Self {
        Self {
            texture,
            dimension: TextureViewDimension::Cube,
            aspect: TextureAspect::All,
        }
    }
}

/// A resource bound in a bind group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingResource {
    /// A uniform buffer range.
    Buffer(BufferBinding),
    /// A texture.
    Texture(TextureBinding),
    /// A sampler.
    Sampler(SamplerId),
}

/// One entry of a bind group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindGroupEntry {
    /// Binding index in the shader.
    pub binding: u32,
    /// The bound resource.
    pub resource: BindingResource,
}

/// Describes a bind group.
#[derive(Debug, Clone)]
pub struct BindGroupDescriptor<'a> {
    /// Debug label.
    pub label: Option<&'a str>,
    /// Layout the group conforms to.
    pub layout: BindGroupLayoutId,
    /// Bound resources.
    pub entries: &'a [BindGroupEntry],
}
