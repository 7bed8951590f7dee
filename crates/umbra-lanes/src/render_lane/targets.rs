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

//! The intermediate render targets of one frame.
//!
//! Everything except the output is allocated at the internal resolution,
//! `output × render_scale`. Several framebuffers share the same textures
//! (the G-buffer depth-stencil, the HDR accumulation buffer); each pass gets
//! its own framebuffer so its attachments and label match what it does.
//!
//! The light volume passes write stencil into the G-buffer depth-stencil
//! texture, so they cannot sample it. The ambient pass copies scene depth
//! into a float target that later lighting reads instead.

use umbra_core::math::Extent2D;
use umbra_core::renderer::resource::{ColorTarget, DepthTarget, Framebuffer, Texture2d};
use umbra_core::renderer::{AttachmentView, RenderError, TextureFormat, TextureId};
use umbra_core::RenderContext;

/// Format of the normal + roughness attachment.
pub const GBUFFER_NORMAL_FORMAT: TextureFormat = TextureFormat::Rgba16Float;
/// Format of the albedo + metalness attachment.
pub const GBUFFER_ALBEDO_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;
/// Format of the emissive + shininess attachment.
pub const GBUFFER_EMISSIVE_FORMAT: TextureFormat = TextureFormat::Rgba16Float;
/// Format of the shared depth-stencil buffer.
pub const GBUFFER_DEPTH_FORMAT: TextureFormat = TextureFormat::Depth24PlusStencil8;
/// Format of the HDR accumulation buffer.
pub const HDR_FORMAT: TextureFormat = TextureFormat::Rgba16Float;
/// Format of the tone-mapped buffer.
pub const LDR_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;
/// Format of the ambient occlusion buffer.
pub const SSAO_FORMAT: TextureFormat = TextureFormat::R8Unorm;
/// Format of the scene depth copied out by the ambient pass.
pub const SCENE_DEPTH_FORMAT: TextureFormat = TextureFormat::R32Float;
/// Format of the headless output texture.
pub const HEADLESS_OUTPUT_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;

/// The G-buffer color formats in attachment order.
pub const GBUFFER_FORMATS: [TextureFormat; 3] = [
    GBUFFER_NORMAL_FORMAT,
    GBUFFER_ALBEDO_FORMAT,
    GBUFFER_EMISSIVE_FORMAT,
];

/// Every size-dependent target of the frame renderer.
#[derive(Debug)]
pub struct FrameTargets {
    output_size: Extent2D,
    internal_size: Extent2D,
    output_format: TextureFormat,
    hdr: Option<Texture2d>,
    /// Geometry pass: three color attachments and the depth-stencil buffer.
    pub gbuffer: Framebuffer,
    /// Foliage pass: the G-buffer attachments, loaded.
    pub foliage: Framebuffer,
    /// Ambient occlusion.
    pub ssao: Framebuffer,
    /// Ambient pass into the HDR buffer and the scene depth copy.
    pub ambient: Framebuffer,
    /// Light volumes: HDR buffer plus the G-buffer depth-stencil.
    pub light_volume: Framebuffer,
    /// Directional lights into the HDR buffer.
    pub light_directional: Framebuffer,
    /// Sky box: HDR buffer plus the G-buffer depth-stencil.
    pub skybox: Framebuffer,
    /// Bloom combine into the HDR buffer.
    pub bloom_combine: Framebuffer,
    /// Tone-mapped image.
    pub ldr: Framebuffer,
    /// Final image at output resolution.
    pub output: Framebuffer,
}

impl FrameTargets {
    /// Allocates every target for an `output_size` output.
    pub fn new(ctx: &mut RenderContext, output_size: Extent2D) -> Result<Self, RenderError> {
        let scale = ctx.settings().clamped_render_scale();
        let internal_size = output_size.scaled(scale);
        let output_format = ctx
            .device()
            .surface_format()
            .unwrap_or(HEADLESS_OUTPUT_FORMAT);

        let mut built: Vec<Framebuffer> = Vec::new();
        let mut hdr: Option<Texture2d> = None;
        let result = Self::build_all(ctx, output_size, internal_size, &mut built, &mut hdr);
        if let Err(e) = result {
            for framebuffer in built {
                framebuffer.dispose(ctx);
            }
            if let Some(texture) = hdr {
                if let Err(destroy) = texture.dispose(ctx) {
                    log::warn!("FrameTargets: failed to release HDR buffer: {destroy}");
                }
            }
            return Err(e);
        }

        // Built in field order by `build_all`.
        let mut built = built.into_iter();
        let mut next = || {
            built
                .next()
                .ok_or_else(|| RenderError::Internal("FrameTargets: missing target".into()))
        };
        let targets = Self {
            output_size,
            internal_size,
            output_format,
            gbuffer: next()?,
            foliage: next()?,
            ssao: next()?,
            ambient: next()?,
            light_volume: next()?,
            light_directional: next()?,
            skybox: next()?,
            bloom_combine: next()?,
            ldr: next()?,
            output: next()?,
            hdr,
        };
        log::debug!(
            "FrameTargets: allocated at {}x{} (output {}x{})",
            internal_size.width,
            internal_size.height,
            output_size.width,
            output_size.height
        );
        Ok(targets)
    }

    fn build_all(
        ctx: &mut RenderContext,
        output_size: Extent2D,
        size: Extent2D,
        built: &mut Vec<Framebuffer>,
        hdr_slot: &mut Option<Texture2d>,
    ) -> Result<(), RenderError> {
        let mut gbuffer = Framebuffer::builder("gbuffer", size);
        for format in GBUFFER_FORMATS {
            gbuffer = gbuffer.color(ColorTarget::owned(format));
        }
        let gbuffer = gbuffer
            .depth(DepthTarget::Owned(GBUFFER_DEPTH_FORMAT))
            .build(ctx)?;
        let depth = gbuffer
            .depth_texture()
            .map(AttachmentView::texture)
            .ok_or_else(|| RenderError::Internal("gbuffer has no depth".into()))?;
        let mut foliage = Framebuffer::builder("foliage", size);
        for index in 0..gbuffer.color_count() {
            if let Some(view) = gbuffer.color_view(index) {
                foliage = foliage.color(ColorTarget::External(view));
            }
        }
        built.push(gbuffer);
        built.push(foliage.depth(DepthTarget::External(depth)).build(ctx)?);

        built.push(
            Framebuffer::builder("ssao", size)
                .color(ColorTarget::owned(SSAO_FORMAT))
                .build(ctx)?,
        );

        let hdr = hdr_slot.insert(Texture2d::with_storage(ctx, "hdr", HDR_FORMAT, size, 1)?);
        let hdr_view = hdr.view();
        let over_hdr = |label: &str, with_depth: bool| {
            let builder = Framebuffer::builder(label, size).color(ColorTarget::External(hdr_view));
            if with_depth {
                builder.depth(DepthTarget::External(depth))
            } else {
                builder
            }
        };
        built.push(
            over_hdr("light ambient", false)
                .color(ColorTarget::owned(SCENE_DEPTH_FORMAT))
                .build(ctx)?,
        );
        built.push(over_hdr("light volume", true).build(ctx)?);
        built.push(over_hdr("light directional", false).build(ctx)?);
        built.push(over_hdr("skybox", true).build(ctx)?);
        built.push(over_hdr("bloom combine", false).build(ctx)?);

        built.push(
            Framebuffer::builder("tonemap", size)
                .color(ColorTarget::owned(LDR_FORMAT))
                .build(ctx)?,
        );

        let output = match ctx.device().surface_format() {
            Some(_) => ColorTarget::External(AttachmentView::Surface),
            None => ColorTarget::owned(HEADLESS_OUTPUT_FORMAT),
        };
        built.push(Framebuffer::builder("fxaa", output_size).color(output).build(ctx)?);
        Ok(())
    }

    /// Size of the final image.
    pub fn output_size(&self) -> Extent2D {
        self.output_size
    }

    /// Size of every intermediate target.
    pub fn internal_size(&self) -> Extent2D {
        self.internal_size
    }

    /// Format of the final image.
    pub fn output_format(&self) -> TextureFormat {
        self.output_format
    }

    /// The HDR accumulation texture.
    pub fn hdr_texture(&self) -> Option<TextureId> {
        self.hdr.as_ref().map(Texture2d::id)
    }

    /// Scene depth written by the ambient pass.
    pub fn scene_depth_texture(&self) -> Option<TextureId> {
        self.ambient.color_texture(1)
    }

    /// The G-buffer depth-stencil texture.
    pub fn depth_texture(&self) -> Option<TextureId> {
        self.gbuffer.depth_texture()
    }

    /// The owned output texture when rendering without a surface.
    pub fn headless_output(&self) -> Option<TextureId> {
        self.output.color_texture(0)
    }

    /// Releases every target.
    pub fn dispose(self, ctx: &mut RenderContext) {
        for framebuffer in [
            self.gbuffer,
            self.foliage,
            self.ssao,
            self.ambient,
            self.light_volume,
            self.light_directional,
            self.skybox,
            self.bloom_combine,
            self.ldr,
            self.output,
        ] {
            framebuffer.dispose(ctx);
        }
        if let Some(hdr) = self.hdr {
            if let Err(e) = hdr.dispose(ctx) {
                log::warn!("FrameTargets: failed to release HDR buffer: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use umbra_core::testing::{MemoryContent, RecordingDevice, ResourceKind};
    use umbra_core::RendererSettings;

    fn context(device: &RecordingDevice, settings: RendererSettings) -> RenderContext {
        RenderContext::new(Arc::new(device.clone()), Arc::new(MemoryContent::new()), settings)
            .unwrap()
    }

    #[test]
    fn test_targets_use_internal_resolution() {
        let device = RecordingDevice::new();
        let settings = RendererSettings {
            render_scale: 0.5,
            ..Default::default()
        };
        let mut ctx = context(&device, settings);
        let targets = FrameTargets::new(&mut ctx, Extent2D::new(800, 600)).unwrap();

        assert_eq!(targets.internal_size(), Extent2D::new(400, 300));
        assert_eq!(targets.gbuffer.size(), Extent2D::new(400, 300));
        assert_eq!(targets.gbuffer.color_formats(), GBUFFER_FORMATS.to_vec());
        assert_eq!(targets.gbuffer.depth_format(), Some(GBUFFER_DEPTH_FORMAT));
        assert_eq!(targets.output.size(), Extent2D::new(800, 600));
        assert_eq!(targets.output.color_view(0), Some(AttachmentView::Surface));
        assert_eq!(
            targets.ambient.color_formats(),
            vec![HDR_FORMAT, SCENE_DEPTH_FORMAT]
        );
        assert_eq!(ctx.framebuffer_stats().failures, 0);
    }

    #[test]
    fn test_headless_output_is_owned() {
        let device = RecordingDevice::headless();
        let mut ctx = context(&device, RendererSettings::default());
        let targets = FrameTargets::new(&mut ctx, Extent2D::new(64, 32)).unwrap();
        assert!(targets.headless_output().is_some());
        assert_eq!(targets.output_format(), HEADLESS_OUTPUT_FORMAT);
    }

    #[test]
    fn test_dispose_releases_every_texture() {
        let device = RecordingDevice::new();
        let mut ctx = context(&device, RendererSettings::default());
        let before = device.live_count(ResourceKind::Texture);
        let targets = FrameTargets::new(&mut ctx, Extent2D::new(64, 64)).unwrap();
        assert!(device.live_count(ResourceKind::Texture) > before);
        targets.dispose(&mut ctx);
        // Unused pool names stay alive, so look for the attachments by label.
        assert!(device.live_labels(ResourceKind::Texture, "gbuffer").is_empty());
        assert!(device.live_labels(ResourceKind::Texture, "hdr").is_empty());
    }
}
