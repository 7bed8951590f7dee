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

//! Texture and sampler handles and descriptors.

use super::util::{CompareFunction, TextureFormat, TextureUsage};
use crate::math::{Extent2D, Extent3D};
use std::borrow::Cow;

/// Opaque handle to a texture name. A name may exist without storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub usize);

/// Opaque handle to a sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerId(pub usize);

/// Shape of a texture's storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureKind {
    /// A single 2D image (with mips).
    #[default]
    D2,
    /// An array of 2D layers.
    D2Array,
    /// Six square layers forming a cube.
    Cube,
}

/// How a texture is interpreted when bound to a shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureViewDimension {
    /// A 2D texture.
    #[default]
    D2,
    /// A 2D array texture.
    D2Array,
    /// A cube map.
    Cube,
}

/// Aspect of a depth/stencil texture to expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureAspect {
    /// Every aspect.
    #[default]
    All,
    /// Only the depth aspect.
    DepthOnly,
    /// Only the stencil aspect.
    StencilOnly,
}

/// Describes the storage allocated for a texture name.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDescriptor<'a> {
    /// Debug label.
    pub label: Option<Cow<'a, str>>,
    /// Size; `depth_or_array_layers` is 6 for cubes.
    pub size: Extent3D,
    /// Number of mip levels (at least 1).
    pub mip_level_count: u32,
    /// Pixel format.
    pub format: TextureFormat,
    /// Allowed usages.
    pub usage: TextureUsage,
    /// Storage shape.
    pub kind: TextureKind,
}

/// A region of a texture written by [`GraphicsDevice::write_texture`].
///
/// [`GraphicsDevice::write_texture`]: crate::renderer::traits::GraphicsDevice::write_texture
#[derive(Debug, Clone, Copy)]
pub struct TextureWrite<'a> {
    /// Destination texture.
    pub texture: TextureId,
    /// Destination mip level.
    pub mip_level: u32,
    /// Destination array layer (cube face for cubes).
    pub layer: u32,
    /// Size of the written region.
    pub size: Extent2D,
    /// Bytes between two rows in `data`.
    pub bytes_per_row: u32,
    /// Tightly packed texel data.
    pub data: &'a [u8],
}

/// Addressing outside the `0..1` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    /// Clamp to the edge texel.
    #[default]
    ClampToEdge,
    /// Wrap around.
    Repeat,
    /// Wrap around, mirroring every other repetition.
    MirrorRepeat,
}

/// Texel filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    /// Nearest texel.
    #[default]
    Nearest,
    /// Bilinear interpolation.
    Linear,
}

/// Describes a sampler.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerDescriptor<'a> {
    /// Debug label.
    pub label: Option<Cow<'a, str>>,
    /// Addressing along U.
    pub address_mode_u: AddressMode,
    /// Addressing along V.
    pub address_mode_v: AddressMode,
    /// Addressing along W.
    pub address_mode_w: AddressMode,
    /// Magnification filter.
    pub mag_filter: FilterMode,
    /// Minification filter.
    pub min_filter: FilterMode,
    /// Filter between mip levels.
    pub mipmap_filter: FilterMode,
    /// Enables hardware depth comparison when set.
    pub compare: Option<CompareFunction>,
}

impl Default for SamplerDescriptor<'_> {
    fn default() -> Self {
        Self {
            label: None,
            address_mode_u: AddressMode::ClampToEdge,
            address_mode_v: AddressMode::ClampToEdge,
            address_mode_w: AddressMode::ClampToEdge,
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            mipmap_filter: FilterMode::Linear,
            compare: None,
        }
    }
}
