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

//! Shadow map generation.

use super::blur::{BlurTargets, SeparableBlur};
use super::pipeline::{LanePipeline, PipelineSpec};
use super::uniforms::{bind_uniforms, DrawUniforms, FrameRings, FrameUniforms};
use super::world::RenderWorld;
use super::{Lane, LaneContext, LaneKind};
use umbra_core::math::Extent2D;
use umbra_core::renderer::material::MaterialFactors;
use umbra_core::renderer::mesh::VertexLayout;
use umbra_core::renderer::{
    ColorTargetState, CompareFunction, CullMode, DepthBiasState, DepthStencilState,
    DeviceFeature, PrimitiveState, RenderError, RenderPass, StencilState, VertexStepMode,
};
use umbra_core::RenderContext;
use umbra_data::shadow::{MOMENTS_FORMAT, SHADOW_DEPTH_FORMAT};
use umbra_data::{Light, Scene, ShadowMap, ShadowResource};

/// Renders every shadow-casting directional light into its variance shadow
/// map, blurs it, then renders shadow-casting spot lights into their depth
/// maps.
///
/// Point lights own a depth map but are not rendered: there is no
/// omnidirectional shadow pass.
#[derive(Debug)]
pub struct ShadowPassLane {
    variance: Option<LanePipeline>,
    depth: Option<LanePipeline>,
    blur: Option<SeparableBlur>,
}

impl ShadowPassLane {
    /// Builds the moment, depth and blur pipelines.
    pub fn new(ctx: &mut RenderContext) -> Result<Self, RenderError> {
        let mut lane = Self {
            variance: None,
            depth: None,
            blur: None,
        };
        if let Err(e) = lane.build(ctx) {
            lane.on_shutdown(ctx);
            return Err(e);
        }
        Ok(lane)
    }

    fn build(&mut self, ctx: &mut RenderContext) -> Result<(), RenderError> {
        let uniforms = ctx.layouts().uniforms;
        let vertex = VertexLayout::standard().buffer_layout(VertexStepMode::Vertex, 0);

        // Depth clamping keeps casters behind the near plane of the
        // orthographic box.
        let unclipped_depth = ctx.device().supports_feature(DeviceFeature::DepthClipControl);
        self.variance = Some(LanePipeline::build(
            ctx,
            &PipelineSpec {
                label: "shadow_vsm",
                program: "shadow_vsm",
                bind_group_layouts: &[uniforms, uniforms],
                vertex_buffers: std::slice::from_ref(&vertex),
                color_targets: &[ColorTargetState::replace(MOMENTS_FORMAT)],
                primitive: PrimitiveState {
                    unclipped_depth,
                    ..PrimitiveState::culled(CullMode::None)
                },
                depth_stencil: Some(DepthStencilState::test_and_write(SHADOW_DEPTH_FORMAT)),
            },
        )?);

        self.depth = Some(LanePipeline::build(
            ctx,
            &PipelineSpec {
                label: "shadow_depth",
                program: "shadow_depth",
                bind_group_layouts: &[uniforms, uniforms],
                vertex_buffers: std::slice::from_ref(&vertex),
                color_targets: &[],
                primitive: PrimitiveState::culled(CullMode::Back),
                depth_stencil: Some(DepthStencilState {
                    format: SHADOW_DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: CompareFunction::LessEqual,
                    stencil: StencilState::default(),
                    bias: DepthBiasState {
                        constant: 2,
                        slope_scale: 2.0,
                        clamp: 0.0,
                    },
                }),
            },
        )?);

        self.blur = Some(SeparableBlur::new(ctx, MOMENTS_FORMAT)?);
        Ok(())
    }

    /// Records the shadow passes of every shadowed light.
    pub fn record(
        &mut self,
        frame: &mut LaneContext<'_>,
        scene: &Scene,
        world: &RenderWorld,
    ) -> Result<(), RenderError> {
        let (Some(variance), Some(depth), Some(blur)) =
            (self.variance, self.depth, self.blur.as_mut())
        else {
            return Err(RenderError::Internal("ShadowPassLane used after shutdown".into()));
        };
        let settings = frame.ctx.settings();
        let (extent, threshold) = (
            settings.directional_shadow_extent,
            settings.light_intensity_threshold,
        );

        // 1. Directional lights: moments, then one blur iteration.
        for &handle in &world.directional_lights {
            let Some(light) = scene.light(handle) else {
                continue;
            };
            let Some(ShadowResource::Variance(map)) = light.shadow() else {
                continue;
            };
            let view = FrameUniforms::for_light_space(
                light.light_space_matrix(extent, threshold),
                Extent2D::new(map.size(), map.size()),
            );
            let view = frame.rings.push_frame(frame.ctx, &view)?;

            let mut pass = map.bind_for_writing(frame.ctx, frame.encoder, variance.id);
            bind_uniforms(pass.as_mut(), 0, view);
            let draws = Self::draw_casters(frame.ctx, frame.rings, pass.as_mut(), scene, world)?;
            drop(pass);
            frame.stats.record_pass();
            frame.stats.record_draws(LaneKind::Shadow, draws);

            let source = map
                .primary()
                .color_texture(0)
                .ok_or_else(|| RenderError::Internal("vsm has no moments target".into()))?;
            let targets = BlurTargets {
                source,
                temp: map.temp(),
                destination: map.blur_target(),
            };
            blur.blur(frame, targets, 1, LaneKind::Shadow)?;
        }

        // 2. Spot lights in range: depth only, no blur.
        for visible in &world.spot_lights {
            let Some(light) = scene.light(visible.handle) else {
                continue;
            };
            let Some(ShadowResource::Depth(map)) = light.shadow() else {
                continue;
            };
            self.record_depth(frame, scene, world, light, map, depth)?;
        }
        Ok(())
    }

    fn record_depth(
        &self,
        frame: &mut LaneContext<'_>,
        scene: &Scene,
        world: &RenderWorld,
        light: &Light,
        map: &ShadowMap,
        pipeline: LanePipeline,
    ) -> Result<(), RenderError> {
        let settings = frame.ctx.settings();
        let light_space = light.light_space_matrix(
            settings.directional_shadow_extent,
            settings.light_intensity_threshold,
        );
        let view = FrameUniforms::for_light_space(light_space, Extent2D::new(map.size(), map.size()));
        let view = frame.rings.push_frame(frame.ctx, &view)?;

        let mut pass = map.bind_for_writing(frame.ctx, frame.encoder, pipeline.id);
        bind_uniforms(pass.as_mut(), 0, view);
        let draws = Self::draw_casters(frame.ctx, frame.rings, pass.as_mut(), scene, world)?;
        drop(pass);
        frame.stats.record_pass();
        frame.stats.record_draws(LaneKind::Shadow, draws);
        Ok(())
    }

    fn draw_casters(
        ctx: &RenderContext,
        rings: &mut FrameRings,
        pass: &mut dyn RenderPass<'_>,
        scene: &Scene,
        world: &RenderWorld,
    ) -> Result<u32, RenderError> {
        let mut draws = 0;
        for caster in &world.shadow_casters {
            let Some(mesh) = scene.mesh(caster.mesh) else {
                continue;
            };
            let uniforms =
                rings.push_draw(ctx, &DrawUniforms::new(caster.model, MaterialFactors::default()))?;
            bind_uniforms(pass, 1, uniforms);
            mesh.draw_indexed(pass);
            draws += 1;
        }
        Ok(draws)
    }
}

impl Lane for ShadowPassLane {
    fn strategy_name(&self) -> &'static str {
        "ShadowPassLane"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Shadow
    }

    fn on_shutdown(&mut self, ctx: &mut RenderContext) {
        if let Some(pipeline) = self.variance.take() {
            pipeline.dispose(ctx);
        }
        if let Some(pipeline) = self.depth.take() {
            pipeline.dispose(ctx);
        }
        if let Some(blur) = self.blur.take() {
            blur.dispose(ctx);
        }
    }
}
