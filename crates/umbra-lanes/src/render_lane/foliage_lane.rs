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

//! Instanced foliage, drawn into the G-buffer after the scene objects.

use super::geometry_lane::group;
use super::pipeline::{LanePipeline, PipelineSpec};
use super::targets::{FrameTargets, GBUFFER_DEPTH_FORMAT, GBUFFER_FORMATS};
use super::uniforms::{bind_uniforms, DrawUniforms};
use super::{Lane, LaneContext, LaneKind};
use umbra_core::math::Mat4;
use umbra_core::renderer::mesh::VertexLayout;
use umbra_core::renderer::resource::{PassOps, UniformSlice};
use umbra_core::renderer::{
    ColorTargetState, CullMode, DepthStencilState, PrimitiveState, RenderError, VertexStepMode,
};
use umbra_core::RenderContext;
use umbra_data::foliage::instance_buffer_layout;
use umbra_data::Scene;

/// One instanced draw per foliage batch.
#[derive(Debug)]
pub struct FoliageLane {
    pipeline: Option<LanePipeline>,
}

impl FoliageLane {
    /// Builds the instanced G-buffer pipeline.
    pub fn new(ctx: &mut RenderContext) -> Result<Self, RenderError> {
        let layouts = *ctx.layouts();
        let vertex_buffers = [
            VertexLayout::standard().buffer_layout(VertexStepMode::Vertex, 0),
            instance_buffer_layout(),
        ];
        let pipeline = LanePipeline::build(
            ctx,
            &PipelineSpec {
                label: "foliage",
                program: "foliage",
                bind_group_layouts: &[layouts.uniforms, layouts.uniforms, layouts.material],
                vertex_buffers: &vertex_buffers,
                color_targets: &GBUFFER_FORMATS.map(ColorTargetState::replace),
                // Leaves are seen from both sides.
                primitive: PrimitiveState::culled(CullMode::None),
                depth_stencil: Some(DepthStencilState::test_and_write(GBUFFER_DEPTH_FORMAT)),
            },
        )?;
        Ok(Self {
            pipeline: Some(pipeline),
        })
    }

    /// Re-uploads changed instance buffers, then draws every non-empty batch.
    ///
    /// Returns the number of uploads. Nothing is recorded without batches.
    pub fn record(
        &mut self,
        frame: &mut LaneContext<'_>,
        targets: &FrameTargets,
        scene: &mut Scene,
        view: UniformSlice,
    ) -> Result<u32, RenderError> {
        let Some(pipeline) = self.pipeline else {
            return Err(RenderError::Internal("FoliageLane used after shutdown".into()));
        };
        if scene.foliage().is_empty() {
            return Ok(0);
        }

        // 1. Uploads happen before the pass begins.
        let mut uploads = 0;
        for batch in scene.foliage_mut() {
            if batch.sync(frame.ctx)? {
                uploads += 1;
            }
        }

        // 2. One instanced draw per batch.
        let mut pass = targets
            .foliage
            .begin_pass(frame.ctx, frame.encoder, &PassOps::load());
        pass.set_pipeline(pipeline.id);
        bind_uniforms(pass.as_mut(), group::VIEW, view);

        let mut draws = 0;
        for index in 0..scene.foliage().len() {
            let Some((batch, mesh, material)) = scene.foliage_draw(index) else {
                continue;
            };
            let Some(instances) = batch.buffer().filter(|_| batch.instance_count() > 0) else {
                continue;
            };
            let uniforms = frame
                .rings
                .push_draw(frame.ctx, &DrawUniforms::new(Mat4::IDENTITY, material.factors()))?;
            bind_uniforms(pass.as_mut(), group::DRAW, uniforms);
            material.set_uniforms(frame.ctx, pass.as_mut(), group::MATERIAL)?;
            mesh.draw_indexed_instanced(pass.as_mut(), instances, batch.instance_count());
            draws += 1;
        }
        drop(pass);

        frame.stats.record_pass();
        frame.stats.record_draws(LaneKind::Foliage, draws);
        Ok(uploads)
    }
}

impl Lane for FoliageLane {
    fn strategy_name(&self) -> &'static str {
        "FoliageLane"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Foliage
    }

    fn on_shutdown(&mut self, ctx: &mut RenderContext) {
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.dispose(ctx);
        }
    }
}
