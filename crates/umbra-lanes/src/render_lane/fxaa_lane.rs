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

//! FXAA from the LDR target into the output at its true resolution.

use super::bindings::{create_layout, BindGroupCache, Bound, Slot};
use super::pipeline::{LanePipeline, PipelineSpec};
use super::targets::FrameTargets;
use super::uniforms::{bind_uniforms, PostUniforms};
use super::{draw_fullscreen, Lane, LaneContext, LaneKind};
use umbra_core::math::LinearRgba;
use umbra_core::renderer::resource::PassOps;
use umbra_core::renderer::{
    BindGroupLayoutId, ColorTargetState, CullMode, PrimitiveState, RenderError,
    SamplerBindingType, TextureBinding, TextureFormat,
};
use umbra_core::RenderContext;

/// The last pass of the frame.
#[derive(Debug)]
pub struct FxaaLane {
    layout: BindGroupLayoutId,
    pipeline: Option<LanePipeline>,
    groups: BindGroupCache,
}

impl FxaaLane {
    /// Builds the pipeline for an output of `output_format`.
    pub fn new(ctx: &mut RenderContext, output_format: TextureFormat) -> Result<Self, RenderError> {
        let layout = create_layout(
            ctx,
            "fxaa source",
            &[
                Slot::Texture2d { filterable: true },
                Slot::Sampler(SamplerBindingType::Filtering),
            ],
        )?;
        let uniforms = ctx.layouts().uniforms;
        let mut lane = Self {
            layout,
            pipeline: None,
            groups: BindGroupCache::default(),
        };
        let pipeline = LanePipeline::build(
            ctx,
            &PipelineSpec {
                label: "fxaa",
                program: "fxaa",
                bind_group_layouts: &[uniforms, layout],
                vertex_buffers: &[],
                color_targets: &[ColorTargetState::replace(output_format)],
                primitive: PrimitiveState::culled(CullMode::None),
                depth_stencil: None,
            },
        );
        match pipeline {
            Ok(pipeline) => {
                lane.pipeline = Some(pipeline);
                Ok(lane)
            }
            Err(e) => {
                lane.on_shutdown(ctx);
                Err(e)
            }
        }
    }

    /// Records the anti-aliasing pass into the output target.
    pub fn record(&mut self, frame: &mut LaneContext<'_>, targets: &FrameTargets) -> Result<(), RenderError> {
        let Some(pipeline) = self.pipeline else {
            return Err(RenderError::Internal("FxaaLane used after shutdown".into()));
        };
        let ldr = targets
            .ldr
            .color_texture(0)
            .ok_or_else(|| RenderError::Internal("FxaaLane: no LDR buffer".into()))?;
        let sampler = frame.ctx.samplers().linear_clamp;
        let source = self.groups.get(
            frame.ctx,
            "fxaa source",
            self.layout,
            &[Bound::Texture(TextureBinding::d2(ldr)), Bound::Sampler(sampler)],
        )?;
        // The filter samples the LDR buffer in its own texel space.
        let internal = targets.internal_size();
        let params = frame.rings.push_draw(
            frame.ctx,
            &PostUniforms {
                texel: [
                    1.0 / internal.width.max(1) as f32,
                    1.0 / internal.height.max(1) as f32,
                    0.0,
                    0.0,
                ],
                ..Default::default()
            },
        )?;

        let mut pass = targets
            .output
            .begin_pass(frame.ctx, frame.encoder, &PassOps::clear(LinearRgba::BLACK));
        pass.set_pipeline(pipeline.id);
        bind_uniforms(pass.as_mut(), 0, params);
        pass.set_bind_group(1, source, &[]);
        draw_fullscreen(pass.as_mut());
        drop(pass);

        frame.stats.record_pass();
        frame.stats.record_draws(LaneKind::Fxaa, 1);
        Ok(())
    }

    /// Drops bind groups referencing the previous targets.
    pub fn on_resize(&mut self, ctx: &RenderContext) {
        self.groups.clear(ctx);
    }
}

impl Lane for FxaaLane {
    fn strategy_name(&self) -> &'static str {
        "FxaaLane"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Fxaa
    }

    fn on_shutdown(&mut self, ctx: &mut RenderContext) {
        self.groups.clear(ctx);
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.dispose(ctx);
        }
        if let Err(e) = ctx.device().destroy_bind_group_layout(self.layout) {
            log::warn!("FxaaLane: failed to destroy layout: {e}");
        }
    }
}
