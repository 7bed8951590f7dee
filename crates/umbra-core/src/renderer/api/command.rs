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

//! Render pass attachments, load/store operations and blit regions.

use super::texture::TextureId;
use crate::math::LinearRgba;

/// Opaque handle to a finished command buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandBufferId(pub u64);

/// What happens to an attachment at the start of a pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadOp<V> {
    /// Keep the previous contents.
    Load,
    /// Clear to the given value.
    Clear(V),
}

/// What happens to an attachment at the end of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreOp {
    /// Keep the results.
    #[default]
    Store,
    /// Results may be thrown away.
    Discard,
}

/// Load and store operations for one attachment aspect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Operations<V> {
    /// Load operation.
    pub load: LoadOp<V>,
    /// Store operation.
    pub store: StoreOp,
}

impl<V> Operations<V> {
    /// Clears to `value` and stores.
    pub const fn clear(value: V) -> Self {
        Self {
            load: LoadOp::Clear(value),
            store: StoreOp::Store,
        }
    }

    /// Loads and stores.
    pub const fn load() -> Self {
        Self {
            load: LoadOp::Load,
            store: StoreOp::Store,
        }
    }

    /// `true` if the pass starts with a clear.
    pub fn is_clear(&self) -> bool {
        matches!(self.load, LoadOp::Clear(_))
    }
}

/// A render target: one mip level and layer of a texture, or the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentView {
    /// A level and layer of a texture with storage.
    Texture {
        /// Texture.
        texture: TextureId,
        /// Mip level.
        mip_level: u32,
        /// Array layer or cube face.
        layer: u32,
    },
    /// The presentation surface (default framebuffer).
    Surface,
}

impl AttachmentView {
    /// Level 0, layer 0 of `texture`.
    pub const fn texture(texture: TextureId) -> Self {
        AttachmentView::Texture {
            texture,
            mip_level: 0,
            layer: 0,
        }
    }

    /// The texture behind this view, if it is not the surface.
    pub const fn texture_id(&self) -> Option<TextureId> {
        match self {
            AttachmentView::Texture { texture, .. } => Some(*texture),
            AttachmentView::Surface => None,
        }
    }
}

/// A color attachment of a render pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderPassColorAttachment {
    /// Target.
    pub view: AttachmentView,
    /// Load/store operations.
    pub ops: Operations<LinearRgba>,
}

/// The depth/stencil attachment of a render pass.
///
/// Leaving `depth_ops` empty makes the depth aspect read-only for the pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderPassDepthStencilAttachment {
    /// Target.
    pub view: AttachmentView,
    /// Depth operations, `None` for read-only depth.
    pub depth_ops: Option<Operations<f32>>,
    /// Stencil operations, `None` for read-only or absent stencil.
    pub stencil_ops: Option<Operations<u32>>,
}

/// Describes a render pass.
#[derive(Debug, Clone)]
pub struct RenderPassDescriptor<'a> {
    /// Debug label.
    pub label: Option<&'a str>,
    /// Color attachments in location order.
    pub color_attachments: &'a [RenderPassColorAttachment],
    /// Optional depth/stencil attachment.
    pub depth_stencil_attachment: Option<RenderPassDepthStencilAttachment>,
}

/// A texture level used as blit source or destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureRegion {
    /// Texture.
    pub texture: TextureId,
    /// Mip level.
    pub mip_level: u32,
    /// Array layer.
    pub layer: u32,
}

impl TextureRegion {
    /// Level 0, layer 0 of `texture`.
    pub const fn whole(texture: TextureId) -> Self {
        Self {
            texture,
            mip_level: 0,
            layer: 0,
        }
    }
}

/// A viewport rectangle in pixels with a depth range.
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
    /// Full-depth viewport covering `width` x `height` pixels.
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
