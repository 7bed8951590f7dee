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

//! Multi-resolution bloom over the HDR buffer.

use super::bindings::{create_layout, BindGroupCache, Bound, Slot};
use super::blur::{BlurTargets, SeparableBlur};
use super::pipeline::{LanePipeline, PipelineSpec};
use super::targets::{FrameTargets, HDR_FORMAT};
use super::uniforms::{bind_uniforms, PostUniforms};
use super::{draw_fullscreen, Lane, LaneContext, LaneKind};
use umbra_core::math::{Extent2D, LinearRgba};
use umbra_core::renderer::resource::{ColorTarget, Framebuffer, PassOps, SentinelKind};
use umbra_core::renderer::{
    BindGroupLayoutId, ColorTargetState, CullMode, FilterMode, LoadOp, PrimitiveState,
    RenderError, SamplerBindingType, TextureBinding, TextureId, TextureRegion,
};
use umbra_core::RenderContext;

/// Most levels the combine pass can sample.
pub const MAX_BLOOM_LEVELS: usize = 8;

/// Size of bloom level `level` for an internal resolution of `size`.
///
/// Level `i` is `size / 2^(i+1)`, rounded down and never below one texel.
pub fn bloom_level_size(size: Extent2D, level: u32) -> Extent2D {
    let divider = 1u32.checked_shl(level + 1).unwrap_or(u32::MAX);
    let divided = size.divided(divider);
    Extent2D::new(divided.width.max(1), divided.height.max(1))
}

/// Blur iterations of bloom level `level`: `log2` of its downsample factor.
pub const fn bloom_blur_iterations(level: u32) -> u32 {
    level + 1
}

/// One resolution of the bloom chain.
#[derive(Debug)]
struct BloomLevel {
    primary: Framebuffer,
    temp: Framebuffer,
}

impl BloomLevel {
    fn dispose(self, ctx: &mut RenderContext) {
        self.primary.dispose(ctx);
        self.temp.dispose(ctx);
    }

    fn texture(&self) -> Result<TextureId, RenderError> {
        self.primary
            .color_texture(0)
            .ok_or_else(|| RenderError::Internal(format!("{} has no color", self.primary.label())))
    }
}

fn allocate_level(ctx: &mut RenderContext, size: Extent2D, level: u32) -> Result<BloomLevel, RenderError> {
    let level_size = bloom_level_size(size, level);
    let primary = Framebuffer::builder(format!("bloom {level}"), level_size)
        .color(ColorTarget::owned(HDR_FORMAT))
        .build(ctx)?;
    match Framebuffer::builder(format!("bloom temp {level}"), level_size)
        .color(ColorTarget::owned(HDR_FORMAT))
        .build(ctx)
    {
        Ok(temp) => Ok(BloomLevel { primary, temp }),
        Err(e) => {
            primary.dispose(ctx);
            Err(e.into())
        }
    }
}

/// A level chain built by [`BloomLane::build_chain`] and not yet installed.
#[derive(Debug)]
#[must_use = "an uninstalled chain must be disposed"]
pub struct BloomChain {
    levels: Vec<BloomLevel>,
}

impl BloomChain {
    /// Releases every level of the chain.
    pub fn dispose(self, ctx: &mut RenderContext) {
        for level in self.levels {
            level.dispose(ctx);
        }
    }
}

/// Bright-pass filter, per-level blur and additive combine.
#[derive(Debug)]
pub struct BloomLane {
    source_layout: BindGroupLayoutId,
    combine_layout: BindGroupLayoutId,
    filter: Option<LanePipeline>,
    combine: Option<LanePipeline>,
    blur: Option<SeparableBlur>,
    levels: Vec<BloomLevel>,
    groups: BindGroupCache,
}

impl BloomLane {
    /// Builds the pipelines and the level chain for an internal resolution
    /// of `size`.
    pub fn new(ctx: &mut RenderContext, size: Extent2D) -> Result<Self, RenderError> {
        let filtered = Slot::Texture2d { filterable: true };
        let sampler = Slot::Sampler(SamplerBindingType::Filtering);
        let source_layout = create_layout(ctx, "bloom source", &[filtered, sampler])?;
        let mut combine_slots = vec![filtered; MAX_BLOOM_LEVELS];
        combine_slots.push(sampler);
        let combine_layout = match create_layout(ctx, "bloom levels", &combine_slots) {
            Ok(layout) => layout,
            Err(e) => {
                if let Err(destroy) = ctx.device().destroy_bind_group_layout(source_layout) {
                    log::warn!("BloomLane: failed to release layout: {destroy}");
                }
                return Err(e.into());
            }
        };

        let mut lane = Self {
            source_layout,
            combine_layout,
            filter: None,
            combine: None,
            blur: None,
            levels: Vec::new(),
            groups: BindGroupCache::default(),
        };
        if let Err(e) = lane.build(ctx, size) {
            lane.on_shutdown(ctx);
            return Err(e);
        }
        Ok(lane)
    }

    fn build(&mut self, ctx: &mut RenderContext, size: Extent2D) -> Result<(), RenderError> {
        let uniforms = ctx.layouts().uniforms;
        self.filter = Some(LanePipeline::build(
            ctx,
            &PipelineSpec {
                label: "bloom_filter",
                program: "bloom_filter",
                bind_group_layouts: &[uniforms, self.source_layout],
                vertex_buffers: &[],
                color_targets: &[ColorTargetState::replace(HDR_FORMAT)],
                primitive: PrimitiveState::culled(CullMode::None),
                depth_stencil: None,
            },
        )?);
        self.combine = Some(LanePipeline::build(
            ctx,
            &PipelineSpec {
                label: "bloom_combine",
                program: "bloom_combine",
                bind_group_layouts: &[uniforms, self.combine_layout],
                vertex_buffers: &[],
                color_targets: &[ColorTargetState::additive(HDR_FORMAT)],
                primitive: PrimitiveState::culled(CullMode::None),
                depth_stencil: None,
            },
        )?);
        self.blur = Some(SeparableBlur::new(ctx, HDR_FORMAT)?);
        let chain = self.build_chain(ctx, size)?;
        self.levels = chain.levels;
        Ok(())
    }

    /// Allocates a level chain for an internal resolution of `size`.
    ///
    /// Nothing already owned by the lane is touched; on failure the
    /// levels built so far are released.
    pub fn build_chain(&self, ctx: &mut RenderContext, size: Extent2D) -> Result<BloomChain, RenderError> {
        let requested = ctx.settings().bloom_levels as usize;
        let count = if requested > MAX_BLOOM_LEVELS {
            log::warn!(
                "BloomLane: {requested} levels requested, limited to {MAX_BLOOM_LEVELS}"
            );
            MAX_BLOOM_LEVELS
        } else {
            requested
        };

        let mut chain = BloomChain { levels: Vec::with_capacity(count) };
        for level in 0..count as u32 {
            match allocate_level(ctx, size, level) {
                Ok(built) => chain.levels.push(built),
                Err(e) => {
                    chain.dispose(ctx);
                    return Err(e);
                }
            }
        }
        log::debug!(
            "BloomLane: {} levels from {}x{}",
            chain.levels.len(),
            size.width,
            size.height
        );
        Ok(chain)
    }

    /// Installs `chain` and releases the levels it replaces.
    pub fn replace_chain(&mut self, ctx: &mut RenderContext, chain: BloomChain) {
        self.groups.clear(ctx);
        if let Some(blur) = self.blur.as_mut() {
            blur.invalidate(ctx);
        }
        let previous = BloomChain {
            levels: std::mem::replace(&mut self.levels, chain.levels),
        };
        previous.dispose(ctx);
    }

    fn release_levels(&mut self, ctx: &mut RenderContext) {
        for level in self.levels.drain(..) {
            level.dispose(ctx);
        }
    }

    /// Number of allocated levels.
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Sizes of the allocated levels, finest first.
    pub fn level_sizes(&self) -> Vec<Extent2D> {
        self.levels.iter().map(|level| level.primary.size()).collect()
    }

    /// Records the filter, downsample, blur and combine steps.
    pub fn record(
        &mut self,
        frame: &mut LaneContext<'_>,
        targets: &FrameTargets,
    ) -> Result<(), RenderError> {
        let (Some(filter), Some(combine), Some(blur)) = (self.filter, self.combine, self.blur.as_mut())
        else {
            return Err(RenderError::Internal("BloomLane used after shutdown".into()));
        };
        let Some(first) = self.levels.first() else {
            return Ok(());
        };
        let hdr = targets
            .hdr_texture()
            .ok_or_else(|| RenderError::Internal("BloomLane: no HDR buffer".into()))?;
        let settings = frame.ctx.settings();
        let (threshold, intensity, falloff) = (
            settings.bloom_threshold,
            settings.bloom_intensity,
            settings.bloom_falloff,
        );
        let sampler = frame.ctx.samplers().linear_clamp;
        let overwrite = PassOps {
            color: LoadOp::Clear(LinearRgba::TRANSPARENT),
            depth: None,
            stencil: None,
        };

        // 1. Bright pixels into level 0.
        let source = self.groups.get(
            frame.ctx,
            "bloom source",
            self.source_layout,
            &[Bound::Texture(TextureBinding::d2(hdr)), Bound::Sampler(sampler)],
        )?;
        let internal = targets.internal_size();
        let params = frame.rings.push_draw(
            frame.ctx,
            &PostUniforms {
                params: [threshold, 0.0, 0.0, 0.0],
                texel: [
                    1.0 / internal.width as f32,
                    1.0 / internal.height as f32,
                    0.0,
                    0.0,
                ],
                ..Default::default()
            },
        )?;
        let mut pass = first.primary.begin_pass(frame.ctx, frame.encoder, &overwrite);
        pass.set_pipeline(filter.id);
        bind_uniforms(pass.as_mut(), 0, params);
        pass.set_bind_group(1, source, &[]);
        draw_fullscreen(pass.as_mut());
        drop(pass);
        frame.stats.record_pass();
        frame.stats.record_draws(LaneKind::Bloom, 1);

        // 2. Each level is a bilinear downsample of the previous one.
        for pair in self.levels.windows(2) {
            frame.encoder.blit_texture(
                TextureRegion::whole(pair[0].texture()?),
                TextureRegion::whole(pair[1].texture()?),
                FilterMode::Linear,
            );
        }

        // 3. Coarser levels get more iterations.
        for (index, level) in self.levels.iter().enumerate() {
            let targets = BlurTargets {
                source: level.texture()?,
                temp: &level.temp,
                destination: &level.primary,
            };
            blur.blur(frame, targets, bloom_blur_iterations(index as u32), LaneKind::Bloom)?;
        }

        // 4. Weighted sum back onto the HDR buffer.
        let black = frame.ctx.sentinel(SentinelKind::Black);
        let mut resources = Vec::with_capacity(MAX_BLOOM_LEVELS + 1);
        let mut weights = [[0.0f32; 4]; 2];
        let mut weight = intensity;
        for slot in 0..MAX_BLOOM_LEVELS {
            let texture = match self.levels.get(slot) {
                Some(level) => {
                    weights[slot / 4][slot % 4] = weight;
                    weight *= falloff;
                    level.texture()?
                }
                None => black,
            };
            resources.push(Bound::Texture(TextureBinding::d2(texture)));
        }
        resources.push(Bound::Sampler(sampler));
        let levels = self
            .groups
            .get(frame.ctx, "bloom levels", self.combine_layout, &resources)?;
        let params = frame.rings.push_draw(
            frame.ctx,
            &PostUniforms {
                params: [self.levels.len() as f32, 0.0, 0.0, 0.0],
                weights,
                ..Default::default()
            },
        )?;
        let blend = PassOps {
            color: LoadOp::Load,
            depth: None,
            stencil: None,
        };
        let mut pass = targets
            .bloom_combine
            .begin_pass(frame.ctx, frame.encoder, &blend);
        pass.set_pipeline(combine.id);
        bind_uniforms(pass.as_mut(), 0, params);
        pass.set_bind_group(1, levels, &[]);
        draw_fullscreen(pass.as_mut());
        drop(pass);
        frame.stats.record_pass();
        frame.stats.record_draws(LaneKind::Bloom, 1);
        Ok(())
    }
}

impl Lane for BloomLane {
    fn strategy_name(&self) -> &'static str {
        "BloomLane"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Bloom
    }

    fn on_shutdown(&mut self, ctx: &mut RenderContext) {
        self.groups.clear(ctx);
        self.release_levels(ctx);
        if let Some(blur) = self.blur.take() {
            blur.dispose(ctx);
        }
        for pipeline in [self.filter.take(), self.combine.take()].into_iter().flatten() {
            pipeline.dispose(ctx);
        }
        for layout in [self.source_layout, self.combine_layout] {
            if let Err(e) = ctx.device().destroy_bind_group_layout(layout) {
                log::warn!("BloomLane: failed to destroy layout: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_sizes_halve() {
        let size = Extent2D::new(1280, 720);
        assert_eq!(bloom_level_size(size, 0), Extent2D::new(640, 360));
        assert_eq!(bloom_level_size(size, 5), Extent2D::new(20, 11));
    }

    #[test]
    fn test_level_size_never_reaches_zero() {
        assert_eq!(bloom_level_size(Extent2D::new(64, 8), 5), Extent2D::new(1, 1));
        assert_eq!(bloom_level_size(Extent2D::new(64, 64), 40), Extent2D::new(1, 1));
    }

    #[test]
    fn test_iterations_follow_divider() {
        assert_eq!(bloom_blur_iterations(0), 1);
        assert_eq!(bloom_blur_iterations(5), 6);
    }
}
