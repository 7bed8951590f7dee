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

//! The separable Gaussian blur shared by the shadow and bloom lanes.
//!
//! One iteration is two full-screen passes: horizontal from the source into
//! the temporary target, then vertical from the temporary target into the
//! destination. The source and destination are normally the same texture.

use super::bindings::{create_layout, BindGroupCache, Bound, Slot};
use super::pipeline::{LanePipeline, PipelineSpec};
use super::uniforms::{bind_uniforms, PostUniforms};
use super::{draw_fullscreen, LaneContext, LaneKind};
use umbra_core::renderer::resource::{Framebuffer, PassOps};
use umbra_core::renderer::{
    BindGroupLayoutId, ColorTargetState, CullMode, LoadOp, PrimitiveState, RenderError,
    SamplerBindingType, SamplerId, TextureBinding, TextureFormat, TextureId,
};
use umbra_core::RenderContext;

/// Where one blur reads and writes.
#[derive(Debug, Clone, Copy)]
pub struct BlurTargets<'t> {
    /// Texture blurred horizontally.
    pub source: TextureId,
    /// Holds the horizontal result.
    pub temp: &'t Framebuffer,
    /// Receives the vertical result.
    pub destination: &'t Framebuffer,
}

/// A two-pass separable blur over one color format.
#[derive(Debug)]
pub struct SeparableBlur {
    format: TextureFormat,
    layout: BindGroupLayoutId,
    sampler: SamplerId,
    pipeline: LanePipeline,
    groups: BindGroupCache,
}

impl SeparableBlur {
    /// Builds the blur pipeline for targets of `format`.
    ///
    /// 32-bit float targets are read with a nearest sampler; the kernel only
    /// samples whole-texel offsets, so filtering is never needed.
    pub fn new(ctx: &mut RenderContext, format: TextureFormat) -> Result<Self, RenderError> {
        let (filterable, sampler_type, sampler) = if format.is_float32() {
            (false, SamplerBindingType::NonFiltering, ctx.samplers().nearest_clamp)
        } else {
            (true, SamplerBindingType::Filtering, ctx.samplers().linear_clamp)
        };
        let layout = create_layout(
            ctx,
            "blur source",
            &[Slot::Texture2d { filterable }, Slot::Sampler(sampler_type)],
        )?;
        let uniforms = ctx.layouts().uniforms;
        let pipeline = LanePipeline::build(
            ctx,
            &PipelineSpec {
                label: &format!("blur {format:?}"),
                program: "blur",
                bind_group_layouts: &[uniforms, layout],
                vertex_buffers: &[],
                color_targets: &[ColorTargetState::replace(format)],
                primitive: PrimitiveState::culled(CullMode::None),
                depth_stencil: None,
            },
        );
        let pipeline = match pipeline {
            Ok(pipeline) => pipeline,
            Err(e) => {
                if let Err(destroy) = ctx.device().destroy_bind_group_layout(layout) {
                    log::warn!("SeparableBlur: failed to release layout: {destroy}");
                }
                return Err(e);
            }
        };
        Ok(Self {
            format,
            layout,
            sampler,
            pipeline,
            groups: BindGroupCache::default(),
        })
    }

    /// Format of the targets this blur writes.
    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// Runs `iterations` horizontal + vertical pass pairs, counting the draws
    /// against `lane`.
    pub fn blur(
        &mut self,
        frame: &mut LaneContext<'_>,
        targets: BlurTargets<'_>,
        iterations: u32,
        lane: LaneKind,
    ) -> Result<(), RenderError> {
        let temp = targets
            .temp
            .color_texture(0)
            .ok_or_else(|| RenderError::Internal("blur temp target has no color".into()))?;
        let size = targets.destination.size();
        let texel = [1.0 / size.width.max(1) as f32, 1.0 / size.height.max(1) as f32];

        for _ in 0..iterations {
            self.pass(frame, targets.source, targets.temp, [texel[0], texel[1], 1.0, 0.0], lane)?;
            self.pass(frame, temp, targets.destination, [texel[0], texel[1], 0.0, 1.0], lane)?;
        }
        Ok(())
    }

    fn pass(
        &mut self,
        frame: &mut LaneContext<'_>,
        source: TextureId,
        target: &Framebuffer,
        texel: [f32; 4],
        lane: LaneKind,
    ) -> Result<(), RenderError> {
        let group = self.groups.get(
            frame.ctx,
            "blur source",
            self.layout,
            &[
                Bound::Texture(TextureBinding::d2(source)),
                Bound::Sampler(self.sampler),
            ],
        )?;
        let uniforms = frame.rings.push_draw(
            frame.ctx,
            &PostUniforms {
                texel,
                ..Default::default()
            },
        )?;

        let ops = PassOps {
            color: LoadOp::Load,
            depth: None,
            stencil: None,
        };
        let mut pass = target.begin_pass(frame.ctx, frame.encoder, &ops);
        pass.set_pipeline(self.pipeline.id);
        bind_uniforms(pass.as_mut(), 0, uniforms);
        pass.set_bind_group(1, group, &[]);
        draw_fullscreen(pass.as_mut());
        drop(pass);

        frame.stats.record_pass();
        frame.stats.record_draws(lane, 1);
        Ok(())
    }

    /// Drops cached bind groups; call when the blurred targets are rebuilt.
    pub fn invalidate(&mut self, ctx: &RenderContext) {
        self.groups.clear(ctx);
    }

    /// Releases the pipeline, layout and bind groups.
    pub fn dispose(mut self, ctx: &RenderContext) {
        self.groups.clear(ctx);
        self.pipeline.dispose(ctx);
        if let Err(e) = ctx.device().destroy_bind_group_layout(self.layout) {
            log::warn!("SeparableBlur: failed to destroy layout: {e}");
        }
    }
}
