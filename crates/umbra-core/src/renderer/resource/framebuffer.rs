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

//! Framebuffers: a fixed set of color attachments plus an optional depth or
//! depth-stencil attachment, checked for completeness once at build time.

use super::texture::{RenderBuffer, Texture2d};
use crate::math::{Extent2D, LinearRgba};
use crate::renderer::api::{
    AttachmentView, LoadOp, Operations, RenderPassColorAttachment,
    RenderPassDepthStencilAttachment, RenderPassDescriptor, StoreOp, TextureFormat, TextureId,
    TextureUsage, Viewport,
};
use crate::renderer::context::RenderContext;
use crate::renderer::error::{FramebufferError, RenderError, ResourceError};
use crate::renderer::traits::{CommandEncoder, RenderPass};

/// Completeness-check counters kept by the [`RenderContext`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FramebufferStats {
    /// Number of completeness checks performed.
    pub checks: u64,
    /// Number of checks that failed.
    pub failures: u64,
    /// Message of the most recent failure.
    pub last_failure: Option<String>,
}

/// A color attachment requested from a [`FramebufferBuilder`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColorTarget {
    /// A texture allocated for and owned by the framebuffer.
    Owned {
        /// Pixel format.
        format: TextureFormat,
        /// Mip levels of the texture; only level 0 is attached.
        mip_levels: u32,
    },
    /// A level and layer of a texture owned elsewhere, or the surface.
    External(AttachmentView),
}

impl ColorTarget {
    /// An owned single-level texture.
    pub const fn owned(format: TextureFormat) -> Self {
        ColorTarget::Owned {
            format,
            mip_levels: 1,
        }
    }
}

/// A depth attachment requested from a [`FramebufferBuilder`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DepthTarget {
    /// A render buffer allocated for and owned by the framebuffer.
    Owned(TextureFormat),
    /// A depth texture owned elsewhere (shared depth-stencil).
    External(AttachmentView),
}

/// Load operations of one pass over a framebuffer.
///
/// `None` for depth or stencil makes that aspect read-only for the pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassOps {
    /// Load operation of every color attachment.
    pub color: LoadOp<LinearRgba>,
    /// Depth load operation, or read-only depth.
    pub depth: Option<LoadOp<f32>>,
    /// Stencil load operation, or read-only stencil.
    pub stencil: Option<LoadOp<u32>>,
}

impl PassOps {
    /// Clears color to `color`, depth to 1 and stencil to 0.
    pub const fn clear(color: LinearRgba) -> Self {
        Self {
            color: LoadOp::Clear(color),
            depth: Some(LoadOp::Clear(1.0)),
            stencil: Some(LoadOp::Clear(0)),
        }
    }

    /// Keeps every attachment's contents.
    pub const fn load() -> Self {
        Self {
            color: LoadOp::Load,
            depth: Some(LoadOp::Load),
            stencil: Some(LoadOp::Load),
        }
    }

    /// Keeps color, reads depth without writing, clears stencil to 0.
    pub const fn stencil_volume() -> Self {
        Self {
            color: LoadOp::Load,
            depth: None,
            stencil: Some(LoadOp::Clear(0)),
        }
    }

    /// Keeps color and reads depth and stencil without writing them.
    pub const fn read_only_depth() -> Self {
        Self {
            color: LoadOp::Load,
            depth: None,
            stencil: None,
        }
    }
}

#[derive(Debug)]
struct ColorSlot {
    view: AttachmentView,
    format: TextureFormat,
    owned: Option<Texture2d>,
}

#[derive(Debug)]
struct DepthSlot {
    view: AttachmentView,
    format: TextureFormat,
    owned: Option<RenderBuffer>,
}

/// Collects attachments and builds a checked [`Framebuffer`].
#[derive(Debug, Clone)]
pub struct FramebufferBuilder {
    label: String,
    size: Extent2D,
    colors: Vec<ColorTarget>,
    depth: Option<DepthTarget>,
}

impl FramebufferBuilder {
    /// Starts a framebuffer of `size` pixels.
    pub fn new(label: impl Into<String>, size: Extent2D) -> Self {
        Self {
            label: label.into(),
            size,
            colors: Vec::new(),
            depth: None,
        }
    }

    /// Appends a color attachment.
    pub fn color(mut self, target: ColorTarget) -> Self {
        self.colors.push(target);
        self
    }

    /// Sets the depth attachment.
    pub fn depth(mut self, target: DepthTarget) -> Self {
        self.depth = Some(target);
        self
    }

    /// Allocates the owned attachments and runs the completeness check.
    ///
    /// An incomplete framebuffer is a fatal configuration error: the owned
    /// attachments are released and the error is returned.
    pub fn build(self, ctx: &mut RenderContext) -> Result<Framebuffer, RenderError> {
        let mut framebuffer = Framebuffer {
            label: self.label,
            size: self.size,
            colors: Vec::with_capacity(self.colors.len()),
            depth: None,
        };

        let allocated = framebuffer.allocate(ctx, &self.colors, self.depth);
        let checked = allocated.and_then(|()| {
            let result = framebuffer.check_completeness(ctx);
            ctx.record_framebuffer_check(result.as_ref().err());
            result.map_err(RenderError::from)
        });

        match checked {
            Ok(()) => Ok(framebuffer),
            Err(e) => {
                log::error!("Framebuffer '{}' rejected: {e}", framebuffer.label);
                framebuffer.dispose(ctx);
                Err(e)
            }
        }
    }
}

/// A set of render targets drawn to together.
#[derive(Debug)]
pub struct Framebuffer {
    label: String,
    size: Extent2D,
    colors: Vec<ColorSlot>,
    depth: Option<DepthSlot>,
}

impl Framebuffer {
    /// Starts building a framebuffer.
    pub fn builder(label: impl Into<String>, size: Extent2D) -> FramebufferBuilder {
        FramebufferBuilder::new(label, size)
    }

    fn allocate(
        &mut self,
        ctx: &mut RenderContext,
        colors: &[ColorTarget],
        depth: Option<DepthTarget>,
    ) -> Result<(), RenderError> {
        for (index, target) in colors.iter().enumerate() {
            let slot = match *target {
                ColorTarget::Owned { format, mip_levels } => {
                    let label = format!("{} color {index}", self.label);
                    let texture = Texture2d::with_storage(ctx, &label, format, self.size, mip_levels)?;
                    ColorSlot {
                        view: texture.view(),
                        format,
                        owned: Some(texture),
                    }
                }
                ColorTarget::External(view) => {
                    let format = match view {
                        AttachmentView::Surface => ctx
                            .device()
                            .surface_format()
                            .ok_or(ResourceError::NotFound)?,
                        AttachmentView::Texture { texture, .. } => ctx
                            .device()
                            .texture_info(texture)
                            .map(|info| info.format)
                            .ok_or(FramebufferError::MissingStorage {
                                label: self.label.clone(),
                                attachment: index,
                            })?,
                    };
                    ColorSlot {
                        view,
                        format,
                        owned: None,
                    }
                }
            };
            self.colors.push(slot);
        }

        self.depth = match depth {
            None => None,
            Some(DepthTarget::Owned(format)) => {
                let label = format!("{} depth", self.label);
                let buffer = RenderBuffer::new(ctx, &label, format, self.size)?;
                Some(DepthSlot {
                    view: buffer.view(),
                    format,
                    owned: Some(buffer),
                })
            }
            Some(DepthTarget::External(view)) => {
                let format = view
                    .texture_id()
                    .and_then(|id| ctx.device().texture_info(id))
                    .map(|info| info.format)
                    .ok_or(FramebufferError::MissingStorage {
                        label: self.label.clone(),
                        attachment: colors.len(),
                    })?;
                Some(DepthSlot {
                    view,
                    format,
                    owned: None,
                })
            }
        };
        Ok(())
    }

    fn check_completeness(&self, ctx: &RenderContext) -> Result<(), FramebufferError> {
        let label = || self.label.clone();
        if self.colors.is_empty() && self.depth.is_none() {
            return Err(FramebufferError::NoAttachments { label: label() });
        }
        if self.size.is_empty() {
            return Err(FramebufferError::ZeroSized { label: label() });
        }

        let device = ctx.device();
        let views = self
            .colors
            .iter()
            .map(|slot| (slot.view, false))
            .chain(self.depth.iter().map(|slot| (slot.view, true)));

        for (attachment, (view, is_depth)) in views.enumerate() {
            let AttachmentView::Texture {
                texture,
                mip_level,
                layer,
            } = view
            else {
                if is_depth {
                    return Err(FramebufferError::InvalidFormat {
                        label: label(),
                        attachment,
                    });
                }
                continue;
            };

            let info = device
                .texture_info(texture)
                .ok_or(FramebufferError::MissingStorage {
                    label: label(),
                    attachment,
                })?;
            if info.format.is_depth() != is_depth
                || !info.usage.contains(TextureUsage::RENDER_ATTACHMENT)
            {
                return Err(FramebufferError::InvalidFormat {
                    label: label(),
                    attachment,
                });
            }
            if mip_level >= info.mip_level_count || layer >= info.size.depth_or_array_layers {
                return Err(FramebufferError::Incomplete {
                    label: label(),
                    reason: format!(
                        "attachment {attachment} addresses mip {mip_level} layer {layer} outside its texture"
                    ),
                });
            }
            if info.size.mip_level_size(mip_level) != self.size {
                return Err(FramebufferError::SizeMismatch {
                    label: label(),
                    attachment,
                });
            }
        }
        Ok(())
    }

    /// Debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Size of every attachment.
    pub fn size(&self) -> Extent2D {
        self.size
    }

    /// Viewport covering the whole framebuffer.
    pub fn viewport(&self) -> Viewport {
        Viewport::from_size(self.size.width, self.size.height)
    }

    /// Number of color attachments.
    pub fn color_count(&self) -> usize {
        self.colors.len()
    }

    /// Texture behind color attachment `index`, if it is not the surface.
    pub fn color_texture(&self, index: usize) -> Option<TextureId> {
        self.colors.get(index).and_then(|slot| slot.view.texture_id())
    }

    /// View of color attachment `index`.
    pub fn color_view(&self, index: usize) -> Option<AttachmentView> {
        self.colors.get(index).map(|slot| slot.view)
    }

    /// Formats of the color attachments, in order.
    pub fn color_formats(&self) -> Vec<TextureFormat> {
        self.colors.iter().map(|slot| slot.format).collect()
    }

    /// Texture behind the depth attachment.
    pub fn depth_texture(&self) -> Option<TextureId> {
        self.depth.as_ref().and_then(|slot| slot.view.texture_id())
    }

    /// Format of the depth attachment.
    pub fn depth_format(&self) -> Option<TextureFormat> {
        self.depth.as_ref().map(|slot| slot.format)
    }

    /// Begins a render pass over every attachment and sets the viewport to the
    /// framebuffer's size.
    pub fn begin_pass<'e>(
        &self,
        ctx: &mut RenderContext,
        encoder: &'e mut dyn CommandEncoder,
        ops: &PassOps,
    ) -> Box<dyn RenderPass<'e> + 'e> {
        let color_attachments: Vec<RenderPassColorAttachment> = self
            .colors
            .iter()
            .map(|slot| RenderPassColorAttachment {
                view: slot.view,
                ops: Operations {
                    load: ops.color,
                    store: StoreOp::Store,
                },
            })
            .collect();

        let depth_stencil_attachment = self.depth.as_ref().map(|slot| {
            RenderPassDepthStencilAttachment {
                view: slot.view,
                depth_ops: ops.depth.map(|load| Operations {
                    load,
                    store: StoreOp::Store,
                }),
                stencil_ops: if slot.format.has_stencil() {
                    ops.stencil.map(|load| Operations {
                        load,
                        store: StoreOp::Store,
                    })
                } else {
                    None
                },
            }
        });

        let viewport = self.viewport();
        ctx.set_current_viewport(viewport);
        let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some(self.label.as_str()),
            color_attachments: &color_attachments,
            depth_stencil_attachment,
        });
        pass.set_viewport(&viewport);
        pass
    }

    /// Releases the attachments owned by this framebuffer.
    ///
    /// External attachments are left to their owners.
    pub fn dispose(self, ctx: &mut RenderContext) {
        for slot in self.colors {
            if let Some(texture) = slot.owned {
                if let Err(e) = texture.dispose(ctx) {
                    log::warn!("Framebuffer '{}': failed to destroy color texture: {e}", self.label);
                }
            }
        }
        if let Some(buffer) = self.depth.and_then(|slot| slot.owned) {
            if let Err(e) = buffer.dispose(ctx) {
                log::warn!("Framebuffer '{}': failed to destroy depth buffer: {e}", self.label);
            }
        }
    }
}
