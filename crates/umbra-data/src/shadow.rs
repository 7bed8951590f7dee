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

//! Shadow map resources owned by lights.

use umbra_core::math::{Extent2D, LinearRgba};
use umbra_core::renderer::api::{RenderPipelineId, TextureFormat, TextureId};
use umbra_core::renderer::resource::{ColorTarget, DepthTarget, Framebuffer, PassOps};
use umbra_core::renderer::{CommandEncoder, RenderError, RenderPass};
use umbra_core::RenderContext;

/// Format of the (depth, depth²) moments.
pub const MOMENTS_FORMAT: TextureFormat = TextureFormat::Rg32Float;

/// Format of depth-only shadow maps.
pub const SHADOW_DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

/// How a lighting shader reads a light's shadow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowBinding {
    /// Blurred moments texture, sampled with a filtering sampler.
    Variance(TextureId),
    /// Depth texture, sampled with a comparison sampler.
    Depth(TextureId),
}

impl ShadowBinding {
    /// The texture to bind.
    pub fn texture(&self) -> TextureId {
        match *self {
            ShadowBinding::Variance(texture) | ShadowBinding::Depth(texture) => texture,
        }
    }
}

/// A variance shadow map: a moments target with its own depth buffer, plus
/// the two color-only targets of the separable blur.
#[derive(Debug)]
pub struct VarianceShadowMap {
    size: u32,
    primary: Framebuffer,
    blur: Framebuffer,
    temp: Framebuffer,
}

impl VarianceShadowMap {
    /// Allocates a `size`×`size` map.
    pub fn new(ctx: &mut RenderContext, size: u32) -> Result<Self, RenderError> {
        let extent = Extent2D::new(size, size);
        let primary = Framebuffer::builder("vsm", extent)
            .color(ColorTarget::owned(MOMENTS_FORMAT))
            .depth(DepthTarget::Owned(SHADOW_DEPTH_FORMAT))
            .build(ctx)?;
        // The vertical blur writes the moments back without the depth buffer.
        let blur = primary
            .color_view(0)
            .map(|view| {
                Framebuffer::builder("vsm blur", extent)
                    .color(ColorTarget::External(view))
                    .build(ctx)
            })
            .unwrap_or_else(|| Err(RenderError::Internal("vsm has no moments target".into())));
        let blur = match blur {
            Ok(blur) => blur,
            Err(e) => {
                primary.dispose(ctx);
                return Err(e);
            }
        };
        let temp = match Framebuffer::builder("vsm blur temp", extent)
            .color(ColorTarget::owned(MOMENTS_FORMAT))
            .build(ctx)
        {
            Ok(temp) => temp,
            Err(e) => {
                blur.dispose(ctx);
                primary.dispose(ctx);
                return Err(e);
            }
        };
        log::debug!("Allocated {size}x{size} variance shadow map");
        Ok(Self {
            size,
            primary,
            blur,
            temp,
        })
    }

    /// Side length in texels.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Target holding the moments.
    pub fn primary(&self) -> &Framebuffer {
        &self.primary
    }

    /// The moments without depth: destination of the vertical blur.
    pub fn blur_target(&self) -> &Framebuffer {
        &self.blur
    }

    /// Intermediate target of the horizontal blur.
    pub fn temp(&self) -> &Framebuffer {
        &self.temp
    }

    /// Clears the moments to the far plane, sets the viewport to the map and
    /// binds `pipeline`.
    pub fn bind_for_writing<'e>(
        &self,
        ctx: &mut RenderContext,
        encoder: &'e mut dyn CommandEncoder,
        pipeline: RenderPipelineId,
    ) -> Box<dyn RenderPass<'e> + 'e> {
        let mut pass = self
            .primary
            .begin_pass(ctx, encoder, &PassOps::clear(LinearRgba::WHITE));
        pass.set_pipeline(pipeline);
        pass
    }

    /// The blurred moments, for lighting.
    pub fn bind_for_reading(&self) -> Option<ShadowBinding> {
        self.primary.color_texture(0).map(ShadowBinding::Variance)
    }

    /// Releases every target.
    pub fn dispose(self, ctx: &mut RenderContext) {
        self.blur.dispose(ctx);
        self.primary.dispose(ctx);
        self.temp.dispose(ctx);
    }
}

/// A depth-only shadow map read with hardware comparison.
#[derive(Debug)]
pub struct ShadowMap {
    size: u32,
    target: Framebuffer,
}

impl ShadowMap {
    /// Allocates a `size`×`size` depth map.
    pub fn new(ctx: &mut RenderContext, size: u32) -> Result<Self, RenderError> {
        let target = Framebuffer::builder("shadow map", Extent2D::new(size, size))
            .depth(DepthTarget::Owned(SHADOW_DEPTH_FORMAT))
            .build(ctx)?;
        log::debug!("Allocated {size}x{size} shadow map");
        Ok(Self { size, target })
    }

    /// Side length in texels.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// The depth target.
    pub fn target(&self) -> &Framebuffer {
        &self.target
    }

    /// Clears depth, sets the viewport to the map and binds `pipeline`.
    pub fn bind_for_writing<'e>(
        &self,
        ctx: &mut RenderContext,
        encoder: &'e mut dyn CommandEncoder,
        pipeline: RenderPipelineId,
    ) -> Box<dyn RenderPass<'e> + 'e> {
        let mut pass = self
            .target
            .begin_pass(ctx, encoder, &PassOps::clear(LinearRgba::BLACK));
        pass.set_pipeline(pipeline);
        pass
    }

    /// The depth texture, for comparison sampling.
    pub fn bind_for_reading(&self) -> Option<ShadowBinding> {
        self.target.depth_texture().map(ShadowBinding::Depth)
    }

    /// Releases the depth target.
    pub fn dispose(self, ctx: &mut RenderContext) {
        self.target.dispose(ctx);
    }
}

/// The shadow resource of a light, chosen by light kind.
#[derive(Debug)]
pub enum ShadowResource {
    /// Directional lights.
    Variance(VarianceShadowMap),
    /// Spot and point lights.
    Depth(ShadowMap),
}

impl ShadowResource {
    /// Side length in texels.
    pub fn size(&self) -> u32 {
        match self {
            ShadowResource::Variance(map) => map.size(),
            ShadowResource::Depth(map) => map.size(),
        }
    }

    /// How lighting reads this resource.
    pub fn bind_for_reading(&self) -> Option<ShadowBinding> {
        match self {
            ShadowResource::Variance(map) => map.bind_for_reading(),
            ShadowResource::Depth(map) => map.bind_for_reading(),
        }
    }

    /// Releases the resource.
    pub fn dispose(self, ctx: &mut RenderContext) {
        match self {
            ShadowResource::Variance(map) => map.dispose(ctx),
            ShadowResource::Depth(map) => map.dispose(ctx),
        }
    }
}
