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

//! G-buffer fill.

use super::pipeline::{LanePipeline, PipelineSpec};
use super::targets::{FrameTargets, GBUFFER_DEPTH_FORMAT, GBUFFER_FORMATS};
use super::uniforms::{bind_uniforms, DrawUniforms};
use super::world::RenderWorld;
use super::{Lane, LaneContext, LaneKind};
use umbra_core::math::LinearRgba;
use umbra_core::renderer::mesh::VertexLayout;
use umbra_core::renderer::resource::{PassOps, UniformSlice};
use umbra_core::renderer::{
    ColorTargetState, CullMode, DepthStencilState, PrimitiveState, RenderError, VertexStepMode,
};
use umbra_core::RenderContext;
use umbra_data::Scene;

/// Bind group indices of the geometry and foliage pipelines.
pub(super) mod group {
    pub const VIEW: u32 = 0;
    pub const DRAW: u32 = 1;
    pub const MATERIAL: u32 = 2;
}

/// Draws every visible object into the G-buffer, back to front.
///
/// Culled and double-sided objects use two pipelines that differ only in
/// cull mode; the pipeline is switched only when consecutive objects differ.
#[derive(Debug)]
pub struct GeometryLane {
    culled: Option<LanePipeline>,
    double_sided: Option<LanePipeline>,
}

impl GeometryLane {
    /// Builds both G-buffer pipelines.
    pub fn new(ctx: &mut RenderContext) -> Result<Self, RenderError> {
        let culled = Self::build(ctx, "gbuffer", CullMode::Back)?;
        match Self::build(ctx, "gbuffer double-sided", CullMode::None) {
            Ok(double_sided) => Ok(Self {
                culled: Some(culled),
                double_sided: Some(double_sided),
            }),
            Err(e) => {
                culled.dispose(ctx);
                Err(e)
            }
        }
    }

    fn build(ctx: &mut RenderContext, label: &str, cull_mode: CullMode) -> Result<LanePipeline, RenderError> {
        let layouts = *ctx.layouts();
        let vertex = VertexLayout::standard().buffer_layout(VertexStepMode::Vertex, 0);
        LanePipeline::build(
            ctx,
            &PipelineSpec {
                label,
                program: "gbuffer",
                bind_group_layouts: &[layouts.uniforms, layouts.uniforms, layouts.material],
                vertex_buffers: std::slice::from_ref(&vertex),
                color_targets: &GBUFFER_FORMATS.map(ColorTargetState::replace),
                primitive: PrimitiveState::culled(cull_mode),
                depth_stencil: Some(DepthStencilState::test_and_write(GBUFFER_DEPTH_FORMAT)),
            },
        )
    }

    /// Clears the G-buffer and draws the visible objects.
    pub fn record(
        &mut self,
        frame: &mut LaneContext<'_>,
        targets: &FrameTargets,
        scene: &mut Scene,
        world: &RenderWorld,
        view: UniformSlice,
    ) -> Result<(), RenderError> {
        let (Some(culled), Some(double_sided)) = (self.culled, self.double_sided) else {
            return Err(RenderError::Internal("GeometryLane used after shutdown".into()));
        };

        let mut pass = targets
            .gbuffer
            .begin_pass(frame.ctx, frame.encoder, &PassOps::clear(LinearRgba::TRANSPARENT));
        bind_uniforms(pass.as_mut(), group::VIEW, view);

        let mut current: Option<bool> = None;
        let mut draws = 0;
        for object in &world.objects {
            let Some((mesh, material)) = scene.draw_resources(object.mesh, object.material) else {
                log::debug!("GeometryLane: object {:?} lost its mesh or material", object.handle);
                continue;
            };

            if current != Some(object.backface_culling) {
                if current.is_some() {
                    frame.stats.cull_mode_switches += 1;
                }
                let pipeline = if object.backface_culling { culled } else { double_sided };
                pass.set_pipeline(pipeline.id);
                current = Some(object.backface_culling);
            }

            let uniforms = frame
                .rings
                .push_draw(frame.ctx, &DrawUniforms::new(object.model, material.factors()))?;
            bind_uniforms(pass.as_mut(), group::DRAW, uniforms);
            material.set_uniforms(frame.ctx, pass.as_mut(), group::MATERIAL)?;
            mesh.draw_indexed(pass.as_mut());
            draws += 1;
        }
        drop(pass);

        frame.stats.record_pass();
        frame.stats.record_draws(LaneKind::Geometry, draws);
        Ok(())
    }
}

impl Lane for GeometryLane {
    fn strategy_name(&self) -> &'static str {
        "GeometryLane"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Geometry
    }

    fn on_shutdown(&mut self, ctx: &mut RenderContext) {
        for pipeline in [self.culled.take(), self.double_sided.take()].into_iter().flatten() {
            pipeline.dispose(ctx);
        }
    }
}
