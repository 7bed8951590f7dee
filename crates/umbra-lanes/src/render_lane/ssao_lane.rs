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

//! Screen-space ambient occlusion from the G-buffer normals and depth.

use super::bindings::{create_layout, BindGroupCache, Bound, Slot};
use super::pipeline::{LanePipeline, PipelineSpec};
use super::targets::{FrameTargets, SSAO_FORMAT};
use super::uniforms::{bind_uniforms, PostUniforms};
use super::{draw_fullscreen, Lane, LaneContext, LaneKind};
use umbra_core::math::LinearRgba;
use umbra_core::renderer::resource::{PassOps, UniformSlice};
use umbra_core::renderer::{
    BindGroupLayoutId, ColorTargetState, CullMode, PrimitiveState, RenderError, TextureBinding,
    TextureId,
};
use umbra_core::RenderContext;

/// Writes an R8 occlusion factor per pixel; 1 means unoccluded.
#[derive(Debug)]
pub struct SsaoLane {
    layout: BindGroupLayoutId,
    pipeline: Option<LanePipeline>,
    groups: BindGroupCache,
}

impl SsaoLane {
    /// Builds the occlusion pipeline.
    pub fn new(ctx: &mut RenderContext) -> Result<Self, RenderError> {
        let layout = create_layout(
            ctx,
            "ssao inputs",
            &[Slot::Texture2d { filterable: false }, Slot::Depth],
        )?;
        let uniforms = ctx.layouts().uniforms;
        let pipeline = LanePipeline::build(
            ctx,
            &PipelineSpec {
                label: "ssao",
                program: "ssao",
                bind_group_layouts: &[uniforms, uniforms, layout],
                vertex_buffers: &[],
                color_targets: &[ColorTargetState::replace(SSAO_FORMAT)],
                primitive: PrimitiveState::culled(CullMode::None),
                depth_stencil: None,
            },
        );
        let mut lane = Self {
            layout,
            pipeline: None,
            groups: BindGroupCache::default(),
        };
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

    /// Records the occlusion pass and returns the texture to sample, or
    /// `None` when SSAO is disabled.
    pub fn record(
        &mut self,
        frame: &mut LaneContext<'_>,
        targets: &FrameTargets,
        view: UniformSlice,
    ) -> Result<Option<TextureId>, RenderError> {
        if !frame.ctx.settings().ssao_enabled {
            return Ok(None);
        }
        let Some(pipeline) = self.pipeline else {
            return Err(RenderError::Internal("SsaoLane used after shutdown".into()));
        };
        let (Some(normal), Some(depth), Some(output)) = (
            targets.gbuffer.color_texture(0),
            targets.depth_texture(),
            targets.ssao.color_texture(0),
        ) else {
            return Err(RenderError::Internal("SsaoLane: missing G-buffer target".into()));
        };

        let inputs = self.groups.get(
            frame.ctx,
            "ssao inputs",
            self.layout,
            &[
                Bound::Texture(TextureBinding::d2(normal)),
                Bound::Texture(TextureBinding::depth(depth)),
            ],
        )?;
        let radius = frame.ctx.settings().ssao_radius;
        let params = frame
            .rings
            .push_draw(frame.ctx, &PostUniforms::with_params([radius, 1.0, 0.025, 0.0]))?;

        let mut pass = targets
            .ssao
            .begin_pass(frame.ctx, frame.encoder, &PassOps::clear(LinearRgba::WHITE));
        pass.set_pipeline(pipeline.id);
        bind_uniforms(pass.as_mut(), 0, view);
        bind_uniforms(pass.as_mut(), 1, params);
        pass.set_bind_group(2, inputs, &[]);
        draw_fullscreen(pass.as_mut());
        drop(pass);

        frame.stats.record_pass();
        frame.stats.record_draws(LaneKind::Ssao, 1);
        Ok(Some(output))
    }

    /// Drops bind groups referencing the previous targets.
    pub fn on_resize(&mut self, ctx: &RenderContext) {
        self.groups.clear(ctx);
    }
}

impl Lane for SsaoLane {
    fn strategy_name(&self) -> &'static str {
        "SsaoLane"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Ssao
    }

    fn on_shutdown(&mut self, ctx: &mut RenderContext) {
        self.groups.clear(ctx);
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.dispose(ctx);
        }
        if let Err(e) = ctx.device().destroy_bind_group_layout(self.layout) {
            log::warn!("SsaoLane: failed to destroy layout: {e}");
        }
    }
}
