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

//! The sky cube map, drawn last into the HDR buffer at the far plane.

use super::bindings::{create_layout, BindGroupCache, Bound, Slot};
use super::pipeline::{LanePipeline, PipelineSpec};
use super::proxy::ProxyMeshes;
use super::targets::{FrameTargets, GBUFFER_DEPTH_FORMAT, HDR_FORMAT};
use super::uniforms::{bind_uniforms, FrameUniforms};
use super::{Lane, LaneContext, LaneKind};
use umbra_core::math::{Extent2D, Mat3, Mat4, Vec3};
use umbra_core::renderer::mesh::VertexLayout;
use umbra_core::renderer::resource::PassOps;
use umbra_core::renderer::{
    BindGroupId, BindGroupLayoutId, ColorTargetState, CompareFunction, CullMode,
    DepthStencilState, PrimitiveState, RenderError, SamplerBindingType, StencilState,
    TextureBinding, TextureFormat, TextureId, VertexStepMode,
};
use umbra_core::RenderContext;
use umbra_data::Camera;

/// Sky pipeline state shared with probe capture: drawn from inside the cube,
/// at the far plane, without writing depth.
#[derive(Debug)]
pub(super) struct SkyPipelines {
    pub layout: BindGroupLayoutId,
    groups: BindGroupCache,
}

impl SkyPipelines {
    pub fn new(ctx: &RenderContext) -> Result<Self, RenderError> {
        let layout = create_layout(
            ctx,
            "sky",
            &[Slot::Cube, Slot::Sampler(SamplerBindingType::Filtering)],
        )?;
        Ok(Self {
            layout,
            groups: BindGroupCache::default(),
        })
    }

    pub fn build(
        &self,
        ctx: &mut RenderContext,
        label: &str,
        color: TextureFormat,
        depth: TextureFormat,
    ) -> Result<LanePipeline, RenderError> {
        let uniforms = ctx.layouts().uniforms;
        let vertex = VertexLayout::position_only().buffer_layout(VertexStepMode::Vertex, 0);
        LanePipeline::build(
            ctx,
            &PipelineSpec {
                label,
                program: "sky",
                bind_group_layouts: &[uniforms, self.layout],
                vertex_buffers: std::slice::from_ref(&vertex),
                color_targets: &[ColorTargetState::replace(color)],
                primitive: PrimitiveState::culled(CullMode::Front),
                depth_stencil: Some(DepthStencilState {
                    format: depth,
                    depth_write_enabled: false,
                    depth_compare: CompareFunction::LessEqual,
                    stencil: StencilState::default(),
                    bias: Default::default(),
                }),
            },
        )
    }

    /// Bind group sampling the `sky` cube map.
    pub fn bind_group(&mut self, ctx: &RenderContext, sky: TextureId) -> Result<BindGroupId, RenderError> {
        Ok(self.groups.get(
            ctx,
            "sky",
            self.layout,
            &[
                Bound::Texture(TextureBinding::cube(sky)),
                Bound::Sampler(ctx.samplers().linear_clamp),
            ],
        )?)
    }

    pub fn dispose(mut self, ctx: &RenderContext) {
        self.groups.clear(ctx);
        if let Err(e) = ctx.device().destroy_bind_group_layout(self.layout) {
            log::warn!("SkyPipelines: failed to destroy layout: {e}");
        }
    }
}

/// Frame uniforms of a sky view: the view's rotation only, so the cube stays
/// centered on the eye.
pub(super) fn sky_view(view: Mat4, projection: Mat4, target: Extent2D) -> FrameUniforms {
    let rotation = Mat4::from_mat3(Mat3::from_mat4(view));
    FrameUniforms::new(rotation, projection, Vec3::ZERO, target, 0.0, 1.0)
}

/// Draws the scene's sky cube map behind everything else.
#[derive(Debug)]
pub struct SkyboxLane {
    sky: Option<SkyPipelines>,
    pipeline: Option<LanePipeline>,
}

impl SkyboxLane {
    /// Builds the sky pipeline over the HDR buffer and G-buffer depth.
    pub fn new(ctx: &mut RenderContext) -> Result<Self, RenderError> {
        let sky = SkyPipelines::new(ctx)?;
        match sky.build(ctx, "sky", HDR_FORMAT, GBUFFER_DEPTH_FORMAT) {
            Ok(pipeline) => Ok(Self {
                sky: Some(sky),
                pipeline: Some(pipeline),
            }),
            Err(e) => {
                sky.dispose(ctx);
                Err(e)
            }
        }
    }

    /// Records the sky pass; does nothing without a sky cube map.
    pub fn record(
        &mut self,
        frame: &mut LaneContext<'_>,
        targets: &FrameTargets,
        proxies: &ProxyMeshes,
        camera: &Camera,
        sky: Option<TextureId>,
    ) -> Result<(), RenderError> {
        let Some(sky) = sky else {
            return Ok(());
        };
        let (Some(sky_pipelines), Some(pipeline)) = (self.sky.as_mut(), self.pipeline) else {
            return Err(RenderError::Internal("SkyboxLane used after shutdown".into()));
        };

        let group = sky_pipelines.bind_group(frame.ctx, sky)?;
        let view = sky_view(camera.view(), camera.projection(), targets.internal_size());
        let view = frame.rings.push_frame(frame.ctx, &view)?;

        let mut pass = targets
            .skybox
            .begin_pass(frame.ctx, frame.encoder, &PassOps::read_only_depth());
        pass.set_pipeline(pipeline.id);
        bind_uniforms(pass.as_mut(), 0, view);
        pass.set_bind_group(1, group, &[]);
        proxies.cube.draw_indexed(pass.as_mut());
        drop(pass);

        frame.stats.record_pass();
        frame.stats.record_draws(LaneKind::Skybox, 1);
        Ok(())
    }
}

impl Lane for SkyboxLane {
    fn strategy_name(&self) -> &'static str {
        "SkyboxLane"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Skybox
    }

    fn on_shutdown(&mut self, ctx: &mut RenderContext) {
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.dispose(ctx);
        }
        if let Some(sky) = self.sky.take() {
            sky.dispose(ctx);
        }
    }
}
