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

//! Texture wrappers: pooled 2D textures, cube maps and depth render buffers.

use super::image::Image;
use crate::math::{Extent2D, Extent3D};
use crate::renderer::api::{
    AttachmentView, TextureDescriptor, TextureFormat, TextureId, TextureKind, TextureUsage,
    TextureWrite,
};
use crate::renderer::context::RenderContext;
use crate::renderer::error::ResourceError;
use crate::renderer::traits::GraphicsDevice;
use std::borrow::Cow;

/// Usage flags of every texture the renderer allocates: sampled, rendered to,
/// uploaded to and blitted from.
pub const DEFAULT_TEXTURE_USAGE: TextureUsage = TextureUsage::from_bits_truncate(
    TextureUsage::TEXTURE_BINDING.bits()
        | TextureUsage::RENDER_ATTACHMENT.bits()
        | TextureUsage::COPY_SRC.bits()
        | TextureUsage::COPY_DST.bits(),
);

/// Upload options for [`Texture2d::set_image_data`].
#[derive(Debug, Clone, Default)]
pub struct TextureOptions {
    /// Allocate a full mip chain and regenerate it after the upload.
    pub generate_mipmaps: bool,
    /// Debug label of the storage.
    pub label: Option<String>,
}

/// A free list of texture names, refilled in batches.
///
/// Names handed out by the pool have no storage until the texture is given
/// data. The pool is owned by the [`RenderContext`] and is single-threaded.
#[derive(Debug)]
pub struct Texture2dPool {
    free: Vec<TextureId>,
    batch_size: u32,
    batches: u32,
}

impl Texture2dPool {
    /// Creates an empty pool refilling `batch_size` names at a time.
    pub fn new(batch_size: u32) -> Self {
        Self {
            free: Vec::new(),
            batch_size: batch_size.max(1),
            batches: 0,
        }
    }

    /// Takes one name, generating a new batch when the free list is empty.
    pub fn take(&mut self, device: &dyn GraphicsDevice) -> Result<TextureId, ResourceError> {
        if self.free.is_empty() {
            let mut names = device.generate_textures(self.batch_size)?;
            // Hand out names in generation order.
            names.reverse();
            self.free = names;
            self.batches += 1;
            log::trace!(
                "Texture pool refilled with {} names (batch #{})",
                self.batch_size,
                self.batches
            );
        }
        self.free.pop().ok_or(ResourceError::NotFound)
    }

    /// Names currently waiting in the free list.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// How many batches were generated so far.
    pub fn batches_generated(&self) -> u32 {
        self.batches
    }

    /// Destroys every name still in the free list.
    pub fn dispose(self, device: &dyn GraphicsDevice) {
        for id in self.free {
            if let Err(e) = device.destroy_texture(id) {
                log::warn!("Texture2dPool: failed to destroy unused name {id:?}: {e}");
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Storage {
    format: TextureFormat,
    size: Extent2D,
    mip_levels: u32,
}

/// A 2D texture taken from the context's pool.
///
/// Starts in the "created" state (a name without storage); storage is
/// allocated by [`Texture2d::set_storage`] or [`Texture2d::set_image_data`].
#[derive(Debug)]
pub struct Texture2d {
    id: TextureId,
    storage: Option<Storage>,
}

impl Texture2d {
    /// Takes a texture name from the pool of `ctx`.
    pub fn from_pool(ctx: &mut RenderContext) -> Result<Self, ResourceError> {
        let id = ctx.take_texture_name()?;
        Ok(Self { id, storage: None })
    }

    /// Allocates a texture with storage in one step.
    pub fn with_storage(
        ctx: &mut RenderContext,
        label: &str,
        format: TextureFormat,
        size: Extent2D,
        mip_levels: u32,
    ) -> Result<Self, ResourceError> {
        let mut texture = Self::from_pool(ctx)?;
        if let Err(e) = texture.set_storage(ctx, label, format, size, mip_levels) {
            if let Err(destroy) = texture.dispose(ctx) {
                log::warn!("Texture2d: failed to release '{label}' after allocation error: {destroy}");
            }
            return Err(e);
        }
        Ok(texture)
    }

    /// The device name of this texture.
    pub fn id(&self) -> TextureId {
        self.id
    }

    /// `true` once storage has been allocated.
    pub fn is_allocated(&self) -> bool {
        self.storage.is_some()
    }

    /// Format of the storage, if allocated.
    pub fn format(&self) -> Option<TextureFormat> {
        self.storage.map(|s| s.format)
    }

    /// Size of mip level 0, if allocated.
    pub fn size(&self) -> Option<Extent2D> {
        self.storage.map(|s| s.size)
    }

    /// Number of mip levels, if allocated.
    pub fn mip_levels(&self) -> Option<u32> {
        self.storage.map(|s| s.mip_levels)
    }

    /// Level 0 as a render target.
    pub fn view(&self) -> AttachmentView {
        AttachmentView::texture(self.id)
    }

    /// Allocates storage without data, replacing any previous storage.
    pub fn set_storage(
        &mut self,
        ctx: &mut RenderContext,
        label: &str,
        format: TextureFormat,
        size: Extent2D,
        mip_levels: u32,
    ) -> Result<(), ResourceError> {
        let mip_levels = mip_levels.clamp(1, size.with_layers(1).max_mip_levels());
        ctx.device().allocate_texture_storage(
            self.id,
            &TextureDescriptor {
                label: Some(Cow::Borrowed(label)),
                size: size.with_layers(1),
                mip_level_count: mip_levels,
                format,
                usage: DEFAULT_TEXTURE_USAGE,
                kind: TextureKind::D2,
            },
        )?;
        self.storage = Some(Storage {
            format,
            size,
            mip_levels,
        });
        ctx.bump_texture_revision(self.id);
        Ok(())
    }

    /// Uploads a decoded image, deriving the GPU format from its channel layout.
    ///
    /// Fails with [`ResourceError::UnsupportedFormat`] when the combination of
    /// channel count, color space and component type has no GPU format.
    pub fn set_image_data(
        &mut self,
        ctx: &mut RenderContext,
        image: &Image,
        options: &TextureOptions,
    ) -> Result<(), ResourceError> {
        let format = image.gpu_format()?;
        let size = Extent2D::new(image.width, image.height);
        if size.is_empty() {
            return Err(ResourceError::UnsupportedFormat(
                "image has a zero dimension".to_string(),
            ));
        }
        let data = image.upload_data(0)?;
        let mip_levels = if options.generate_mipmaps {
            size.with_layers(1).max_mip_levels()
        } else {
            1
        };
        let label = options.label.as_deref().unwrap_or("texture2d");
        self.set_storage(ctx, label, format, size, mip_levels)?;

        ctx.device().write_texture(&TextureWrite {
            texture: self.id,
            mip_level: 0,
            layer: 0,
            size,
            bytes_per_row: size.width * format.bytes_per_pixel(),
            data: &data,
        })?;

        if mip_levels > 1 {
            let mut encoder = ctx.device().create_command_encoder(Some("texture2d mipmaps"));
            encoder.generate_mipmaps(self.id);
            ctx.device().submit_command_buffer(encoder.finish());
        }
        Ok(())
    }

    /// Destroys the texture.
    pub fn dispose(self, ctx: &mut RenderContext) -> Result<(), ResourceError> {
        ctx.forget_texture_revision(self.id);
        ctx.device().destroy_texture(self.id)
    }
}

/// A cube map: six square layers sharing format and mip chain.
#[derive(Debug)]
pub struct TextureCube {
    id: TextureId,
    format: TextureFormat,
    size: u32,
    mip_levels: u32,
}

impl TextureCube {
    /// Number of faces.
    pub const FACES: u32 = 6;

    /// Allocates a cube map with `size` x `size` faces.
    pub fn new(
        ctx: &mut RenderContext,
        label: &str,
        format: TextureFormat,
        size: u32,
        with_mipmaps: bool,
    ) -> Result<Self, ResourceError> {
        let extent = Extent3D {
            width: size,
            height: size,
            depth_or_array_layers: Self::FACES,
        };
        let mip_levels = if with_mipmaps {
            extent.max_mip_levels()
        } else {
            1
        };
        let id = ctx.device().create_texture(&TextureDescriptor {
            label: Some(Cow::Borrowed(label)),
            size: extent,
            mip_level_count: mip_levels,
            format,
            usage: DEFAULT_TEXTURE_USAGE,
            kind: TextureKind::Cube,
        })?;
        ctx.bump_texture_revision(id);
        Ok(Self {
            id,
            format,
            size,
            mip_levels,
        })
    }

    /// Creates a cube map from a six-layer image (+X, -X, +Y, -Y, +Z, -Z).
    pub fn from_image(
        ctx: &mut RenderContext,
        label: &str,
        image: &Image,
        with_mipmaps: bool,
    ) -> Result<Self, ResourceError> {
        if image.layers.len() != Self::FACES as usize || image.width != image.height {
            return Err(ResourceError::UnsupportedFormat(format!(
                "cube map '{label}' needs six square layers, got {} of {}x{}",
                image.layers.len(),
                image.width,
                image.height
            )));
        }
        let format = image.gpu_format()?;
        let cube = Self::new(ctx, label, format, image.width, with_mipmaps)?;
        for face in 0..Self::FACES {
            let data = image.upload_data(face as usize)?;
            ctx.device().write_texture(&TextureWrite {
                texture: cube.id,
                mip_level: 0,
                layer: face,
                size: Extent2D::new(image.width, image.height),
                bytes_per_row: image.width * format.bytes_per_pixel(),
                data: &data,
            })?;
        }
        if cube.mip_levels > 1 {
            let mut encoder = ctx.device().create_command_encoder(Some("cube mipmaps"));
            encoder.generate_mipmaps(cube.id);
            ctx.device().submit_command_buffer(encoder.finish());
        }
        Ok(cube)
    }

    /// The device name of this cube map.
    pub fn id(&self) -> TextureId {
        self.id
    }

    /// Pixel format of the faces.
    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// Edge length of a face at mip level 0.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Length of the mip chain.
    pub fn mip_levels(&self) -> u32 {
        self.mip_levels
    }

    /// One face at one mip level as a render target.
    pub fn face_view(&self, face: u32, mip_level: u32) -> AttachmentView {
        AttachmentView::Texture {
            texture: self.id,
            mip_level,
            layer: face,
        }
    }

    /// Destroys the cube map.
    pub fn dispose(self, ctx: &mut RenderContext) -> Result<(), ResourceError> {
        ctx.forget_texture_revision(self.id);
        ctx.device().destroy_texture(self.id)
    }
}

/// An attachment-only depth or depth-stencil buffer.
#[derive(Debug)]
pub struct RenderBuffer {
    id: TextureId,
    format: TextureFormat,
    size: Extent2D,
}

impl RenderBuffer {
    /// Allocates a depth buffer. `format` must be a depth format.
    pub fn new(
        ctx: &mut RenderContext,
        label: &str,
        format: TextureFormat,
        size: Extent2D,
    ) -> Result<Self, ResourceError> {
        if !format.is_depth() {
            return Err(ResourceError::UnsupportedFormat(format!(
                "render buffer '{label}' needs a depth format, got {format:?}"
            )));
        }
        let id = ctx.device().create_texture(&TextureDescriptor {
            label: Some(Cow::Borrowed(label)),
            size: size.with_layers(1),
            mip_level_count: 1,
            format,
            usage: TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
            kind: TextureKind::D2,
        })?;
        Ok(Self { id, format, size })
    }

    /// The device name of this buffer.
    pub fn id(&self) -> TextureId {
        self.id
    }

    /// Depth format.
    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// Size in pixels.
    pub fn size(&self) -> Extent2D {
        self.size
    }

    /// The buffer as a render target.
    pub fn view(&self) -> AttachmentView {
        AttachmentView::texture(self.id)
    }

    /// Destroys the buffer.
    pub fn dispose(self, ctx: &mut RenderContext) -> Result<(), ResourceError> {
        ctx.device().destroy_texture(self.id)
    }
}
