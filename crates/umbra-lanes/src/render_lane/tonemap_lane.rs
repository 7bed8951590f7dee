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

//! Exposure tone mapping from the HDR buffer into the LDR target.

use super::bindings::{create_layout, BindGroupCache, Bound, Slot};
use super::pipeline::{LanePipeline, PipelineSpec};
use super::targets::{FrameTargets, LDR_FORMAT};
use super::uniforms::bind_uniforms;
use super::{draw_fullscreen, Lane, LaneContext, LaneKind};
use umbra_core::math::LinearRgba;
use umbra_core::renderer::resource::{PassOps, UniformSlice};
use umbra_core::renderer::{
    BindGroupLayoutId, ColorTargetState, CullMode, PrimitiveState, RenderError,
    SamplerBindingType, TextureBinding,
};
use umbra_core::RenderContext;

/// Maps HDR radiance to display range using the camera's exposure.
#[derive(Debug)]
pub struct TonemapLane {
    layout: BindGroupLayoutId,
    pipeline: Option<LanePipeline>,
    groups: BindGroupCache,
}

impl TonemapLane {
    /// Builds the tone mapping pipeline.
    pub fn new(ctx: &mut RenderContext) -> Result<Self, RenderError> {
        let layout = create_layout(
            ctx,
            "tonemap source",
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
                label: "tonemap",
                program: "tonemap",
                bind_group_layouts: &[uniforms, layout],
                vertex_buffers: &[],
                color_targets: &[ColorTargetState::replace(LDR_FORMAT)],
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

    /// Records the tone mapping pass. `view` carries the exposure.
    pub fn record(
        &mut self,
        frame: &mut LaneContext<'_>,
        targets: &FrameTargets,
        view: UniformSlice,
    ) -> Result<(), RenderError> {
        let Some(pipeline) = self.pipeline else {
            return Err(RenderError::Internal("TonemapLane used after shutdown".into()));
        };
        let hdr = targets
            .hdr_texture()
            .ok_or_else(|| RenderError::Internal("TonemapLane: no HDR buffer".into()))?;
        let sampler = frame.ctx.samplers().linear_clamp;
        let source = self.groups.get(
            frame.ctx,
            "tonemap source",
            self.layout,
            &[Bound::Texture(TextureBinding::d2(hdr)), Bound::Sampler(sampler)],
        )?;

        let mut pass = targets
            .ldr
            .begin_pass(frame.ctx, frame.encoder, &PassOps::clear(LinearRgba::BLACK));
        pass.set_pipeline(pipeline.id);
        bind_uniforms(pass.as_mut(), 0, view);
        pass.set_bind_group(1, source, &[]);
        draw_fullscreen(pass.as_mut());
        drop(pass);

        frame.stats.record_pass();
        frame.stats.record_draws(LaneKind::Tonemap, 1);
        Ok(())
    }

    /// Drops bind groups referencing the previous targets.
    pub fn on_resize(&mut self, ctx: &RenderContext) {
        self.groups.clear(ctx);
    }
}

impl Lane for TonemapLane {
    fn strategy_name(&self) -> &'static str {
        "TonemapLane"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Tonemap
    }

    fn on_shutdown(&mut self, ctx: &mut RenderContext) {
        self.groups.clear(ctx);
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.dispose(ctx);
        }
        if let Err(e) = ctx.device().destroy_bind_group_layout(self.layout) {
            log::warn!("TonemapLane: failed to destroy layout: {e}");
        }
    }
}
