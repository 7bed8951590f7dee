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

//! Light accumulation into the HDR buffer.
//!
//! The ambient pass resolves the G-buffer with SSAO and the reflection probe
//! and copies depth into a sampleable target. Point and spot lights then
//! render their proxy volume twice: once to mark covered pixels in the
//! stencil buffer, once to shade the marked pixels. Directional lights are
//! shaded with one full-screen draw each.

use super::bindings::{create_layout, BindGroupCache, Bound, Slot};
use super::pipeline::{LanePipeline, PipelineSpec};
use super::proxy::ProxyMeshes;
use super::targets::{FrameTargets, GBUFFER_DEPTH_FORMAT, HDR_FORMAT, SCENE_DEPTH_FORMAT};
use super::uniforms::{bind_uniforms, light_kind, LightUniforms, PostUniforms};
use super::world::RenderWorld;
use super::{draw_fullscreen, Lane, LaneContext, LaneKind};
use umbra_core::math::{Extent2D, LinearRgba, Mat4, Quat, Vec3};
use umbra_core::renderer::mesh::VertexLayout;
use umbra_core::renderer::resource::{PassOps, RenderBuffer, SentinelKind, TextureCube, UniformSlice};
use umbra_core::renderer::{
    BindGroupId, BindGroupLayoutId, ColorTargetState, CompareFunction, CullMode, DepthBiasState,
    DepthStencilState, LoadOp, PrimitiveState, RenderError, SamplerBindingType, StencilFaceState,
    StencilOperation, StencilState, TextureBinding, TextureId, VertexStepMode,
};
use umbra_core::RenderContext;
use umbra_data::probe::PROBE_FORMAT;
use umbra_data::shadow::SHADOW_DEPTH_FORMAT;
use umbra_data::{Light, LightKind, Scene, ShadowResource};

/// Bind group indices of the light pipelines.
mod group {
    pub const VIEW: u32 = 0;
    pub const LIGHT: u32 = 1;
    pub const GBUFFER: u32 = 2;
    pub const SHADOW: u32 = 3;
}

/// Depth bias applied when comparing against spot shadow maps.
const SPOT_SHADOW_BIAS: f32 = 0.0005;

/// Stencil value of pixels outside every light volume.
const STENCIL_OUTSIDE: u32 = 0;

#[derive(Debug, Clone, Copy)]
struct LightLayouts {
    ambient: BindGroupLayoutId,
    gbuffer: BindGroupLayoutId,
    variance: BindGroupLayoutId,
    depth: BindGroupLayoutId,
}

#[derive(Debug, Clone, Copy)]
struct LightPipelines {
    ambient: LanePipeline,
    stencil: LanePipeline,
    point: LanePipeline,
    spot: LanePipeline,
    directional: LanePipeline,
}

/// Inputs sampled by every light pipeline.
#[derive(Debug, Clone, Copy)]
struct GBufferInputs {
    normal: TextureId,
    albedo: TextureId,
    emissive: TextureId,
    depth: TextureId,
    scene_depth: TextureId,
}

impl GBufferInputs {
    fn from_targets(targets: &FrameTargets) -> Result<Self, RenderError> {
        let missing = || RenderError::Internal("LightAccumulationLane: missing G-buffer target".into());
        Ok(Self {
            normal: targets.gbuffer.color_texture(0).ok_or_else(missing)?,
            albedo: targets.gbuffer.color_texture(1).ok_or_else(missing)?,
            emissive: targets.gbuffer.color_texture(2).ok_or_else(missing)?,
            depth: targets.depth_texture().ok_or_else(missing)?,
            scene_depth: targets.scene_depth_texture().ok_or_else(missing)?,
        })
    }
}

/// Accumulates ambient, local and directional lighting.
#[derive(Debug)]
pub struct LightAccumulationLane {
    layouts: Vec<BindGroupLayoutId>,
    built: Vec<LanePipeline>,
    resolved: Option<(LightLayouts, LightPipelines)>,
    fallback_probe: Option<TextureCube>,
    fallback_shadow: Option<RenderBuffer>,
    groups: BindGroupCache,
}

impl LightAccumulationLane {
    /// Builds the ambient, stencil and shading pipelines and the fallback
    /// textures bound when a light has no shadow or the scene no probe.
    pub fn new(ctx: &mut RenderContext) -> Result<Self, RenderError> {
        let mut lane = Self {
            layouts: Vec::new(),
            built: Vec::new(),
            resolved: None,
            fallback_probe: None,
            fallback_shadow: None,
            groups: BindGroupCache::default(),
        };
        if let Err(e) = lane.build(ctx) {
            lane.on_shutdown(ctx);
            return Err(e);
        }
        Ok(lane)
    }

    fn layout(&mut self, ctx: &RenderContext, label: &str, slots: &[Slot]) -> Result<BindGroupLayoutId, RenderError> {
        let layout = create_layout(ctx, label, slots)?;
        self.layouts.push(layout);
        Ok(layout)
    }

    fn pipeline(&mut self, ctx: &mut RenderContext, spec: &PipelineSpec<'_>) -> Result<LanePipeline, RenderError> {
        let pipeline = LanePipeline::build(ctx, spec)?;
        self.built.push(pipeline);
        Ok(pipeline)
    }

    fn build(&mut self, ctx: &mut RenderContext) -> Result<(), RenderError> {
        let unfiltered = Slot::Texture2d { filterable: false };

        // 1. Layouts.
        let layouts = LightLayouts {
            ambient: self.layout(
                ctx,
                "ambient inputs",
                &[
                    unfiltered,
                    unfiltered,
                    unfiltered,
                    Slot::Depth,
                    Slot::Texture2d { filterable: true },
                    Slot::Cube,
                    Slot::Sampler(SamplerBindingType::Filtering),
                ],
            )?,
            gbuffer: self.layout(
                ctx,
                "light gbuffer",
                &[unfiltered, unfiltered, unfiltered, unfiltered],
            )?,
            variance: self.layout(
                ctx,
                "light variance shadow",
                &[unfiltered, Slot::Sampler(SamplerBindingType::NonFiltering)],
            )?,
            depth: self.layout(
                ctx,
                "light depth shadow",
                &[Slot::Depth, Slot::Sampler(SamplerBindingType::Comparison)],
            )?,
        };
        let uniforms = ctx.layouts().uniforms;
        let volume_vertices = [VertexLayout::position_only().buffer_layout(VertexStepMode::Vertex, 0)];
        let light_layouts = [uniforms, uniforms, layouts.gbuffer, layouts.depth];

        // 2. Ambient resolve, writing HDR and the depth copy.
        let ambient = self.pipeline(
            ctx,
            &PipelineSpec {
                label: "ambient",
                program: "ambient",
                bind_group_layouts: &[uniforms, layouts.ambient, uniforms],
                vertex_buffers: &[],
                color_targets: &[
                    ColorTargetState::replace(HDR_FORMAT),
                    ColorTargetState::replace(SCENE_DEPTH_FORMAT),
                ],
                primitive: PrimitiveState::culled(CullMode::None),
                depth_stencil: None,
            },
        )?;

        // 3. Volume marking: back faces behind geometry increment, front
        //    faces behind geometry decrement.
        let stencil = self.pipeline(
            ctx,
            &PipelineSpec {
                label: "light_stencil",
                program: "light_stencil",
                bind_group_layouts: &[uniforms, uniforms],
                vertex_buffers: &volume_vertices,
                color_targets: &[ColorTargetState::masked(HDR_FORMAT)],
                primitive: PrimitiveState::culled(CullMode::None),
                depth_stencil: Some(DepthStencilState {
                    format: GBUFFER_DEPTH_FORMAT,
                    depth_write_enabled: false,
                    depth_compare: CompareFunction::Less,
                    stencil: StencilState {
                        front: StencilFaceState {
                            depth_fail_op: StencilOperation::DecrementWrap,
                            ..StencilFaceState::IGNORE
                        },
                        back: StencilFaceState {
                            depth_fail_op: StencilOperation::IncrementWrap,
                            ..StencilFaceState::IGNORE
                        },
                        read_mask: 0xFF,
                        write_mask: 0xFF,
                    },
                    bias: DepthBiasState::default(),
                }),
            },
        )?;

        // 4. Shading of marked pixels, from the volume's back faces so the
        //    camera may stand inside it.
        let marked = StencilFaceState {
            compare: CompareFunction::NotEqual,
            ..StencilFaceState::IGNORE
        };
        let shade_marked = DepthStencilState {
            format: GBUFFER_DEPTH_FORMAT,
            depth_write_enabled: false,
            depth_compare: CompareFunction::Always,
            stencil: StencilState {
                front: marked,
                back: marked,
                read_mask: 0xFF,
                write_mask: 0,
            },
            bias: DepthBiasState::default(),
        };
        let additive = [ColorTargetState::additive(HDR_FORMAT)];
        let volume_spec = |label: &'static str| PipelineSpec {
            label,
            program: label,
            bind_group_layouts: &light_layouts,
            vertex_buffers: &volume_vertices,
            color_targets: &additive,
            primitive: PrimitiveState::culled(CullMode::Front),
            depth_stencil: Some(shade_marked),
        };
        let point = self.pipeline(ctx, &volume_spec("light_point"))?;
        let spot = self.pipeline(ctx, &volume_spec("light_spot"))?;

        // 5. Directional lights over the whole screen.
        let directional = self.pipeline(
            ctx,
            &PipelineSpec {
                label: "light_directional",
                program: "light_directional",
                bind_group_layouts: &[uniforms, uniforms, layouts.gbuffer, layouts.variance],
                vertex_buffers: &[],
                color_targets: &[ColorTargetState::additive(HDR_FORMAT)],
                primitive: PrimitiveState::culled(CullMode::None),
                depth_stencil: None,
            },
        )?;

        // 6. Fallbacks.
        self.fallback_probe = Some(TextureCube::new(ctx, "fallback probe", PROBE_FORMAT, 1, false)?);
        self.fallback_shadow = Some(RenderBuffer::new(
            ctx,
            "fallback shadow",
            SHADOW_DEPTH_FORMAT,
            Extent2D::new(1, 1),
        )?);

        self.resolved = Some((
            layouts,
            LightPipelines {
                ambient,
                stencil,
                point,
                spot,
                directional,
            },
        ));
        Ok(())
    }

    /// Records every lighting pass of the frame.
    ///
    /// `ssao` is the occlusion texture of this frame, or `None` when SSAO
    /// is disabled.
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        &mut self,
        frame: &mut LaneContext<'_>,
        targets: &FrameTargets,
        proxies: &ProxyMeshes,
        scene: &Scene,
        world: &RenderWorld,
        view: UniformSlice,
        ssao: Option<TextureId>,
    ) -> Result<(), RenderError> {
        let (Some((layouts, pipelines)), Some(fallback_shadow)) =
            (self.resolved, self.fallback_shadow.as_ref().map(RenderBuffer::id))
        else {
            return Err(RenderError::Internal("LightAccumulationLane used after shutdown".into()));
        };
        let inputs = GBufferInputs::from_targets(targets)?;

        self.record_ambient(frame, targets, scene, view, ssao, layouts, pipelines, inputs)?;

        let gbuffer = self.groups.get(
            frame.ctx,
            "light gbuffer",
            layouts.gbuffer,
            &[
                Bound::Texture(TextureBinding::d2(inputs.normal)),
                Bound::Texture(TextureBinding::d2(inputs.albedo)),
                Bound::Texture(TextureBinding::d2(inputs.emissive)),
                Bound::Texture(TextureBinding::d2(inputs.scene_depth)),
            ],
        )?;

        let settings = frame.ctx.settings();
        let (extent, threshold) = (
            settings.directional_shadow_extent,
            settings.light_intensity_threshold,
        );

        // Local lights, one stencil-cleared pass each.
        for visible in world.local_lights() {
            let Some(light) = scene.light(visible.handle) else {
                continue;
            };
            let (pipeline, mesh) = match light.kind() {
                LightKind::Point { .. } => (pipelines.point, &proxies.sphere),
                LightKind::Spot { .. } => (pipelines.spot, &proxies.cone),
                LightKind::Directional { .. } => continue,
            };
            let volume = volume_transform(light, visible.range);

            let (shadow_texture, shadowed, light_space) = match (light.kind(), light.shadow()) {
                (LightKind::Spot { .. }, Some(resource @ ShadowResource::Depth(_))) => {
                    match resource.bind_for_reading() {
                        Some(binding) => (
                            binding.texture(),
                            true,
                            light.light_space_matrix(extent, threshold),
                        ),
                        None => (fallback_shadow, false, Mat4::IDENTITY),
                    }
                }
                (LightKind::Point { .. }, Some(_)) => {
                    light.warn_unshadowed_once();
                    (fallback_shadow, false, Mat4::IDENTITY)
                }
                _ => (fallback_shadow, false, Mat4::IDENTITY),
            };
            let shadow_size = light.shadow().map(ShadowResource::size).unwrap_or(1);
            let uniforms = light_uniforms(
                light,
                visible.range,
                volume,
                light_space,
                [
                    f32::from(u8::from(shadowed)),
                    0.0,
                    shadow_size as f32,
                    SPOT_SHADOW_BIAS,
                ],
            );
            let uniforms = frame.rings.push_draw(frame.ctx, &uniforms)?;
            let comparison = frame.ctx.samplers().shadow_comparison;
            let shadow = self.groups.get(
                frame.ctx,
                "light depth shadow",
                layouts.depth,
                &[
                    Bound::Texture(TextureBinding::depth(shadow_texture)),
                    Bound::Sampler(comparison),
                ],
            )?;

            let mut pass = targets
                .light_volume
                .begin_pass(frame.ctx, frame.encoder, &PassOps::stencil_volume());

            // 1. Mark the pixels inside the volume.
            pass.set_pipeline(pipelines.stencil.id);
            bind_uniforms(pass.as_mut(), group::VIEW, view);
            bind_uniforms(pass.as_mut(), group::LIGHT, uniforms);
            mesh.draw_indexed(pass.as_mut());

            // 2. Shade them.
            pass.set_pipeline(pipeline.id);
            pass.set_stencil_reference(STENCIL_OUTSIDE);
            bind_uniforms(pass.as_mut(), group::VIEW, view);
            bind_uniforms(pass.as_mut(), group::LIGHT, uniforms);
            pass.set_bind_group(group::GBUFFER, gbuffer, &[]);
            pass.set_bind_group(group::SHADOW, shadow, &[]);
            mesh.draw_indexed(pass.as_mut());
            drop(pass);

            frame.stats.record_pass();
            frame.stats.light_stencil_draws += 1;
            frame.stats.light_additive_draws += 1;
            frame.stats.record_draws(LaneKind::Light, 2);
        }

        self.record_directional(frame, targets, scene, world, view, layouts, pipelines, gbuffer)
    }

    #[allow(clippy::too_many_arguments)]
    fn record_ambient(
        &mut self,
        frame: &mut LaneContext<'_>,
        targets: &FrameTargets,
        scene: &Scene,
        view: UniformSlice,
        ssao: Option<TextureId>,
        layouts: LightLayouts,
        pipelines: LightPipelines,
        inputs: GBufferInputs,
    ) -> Result<(), RenderError> {
        let probe = scene
            .probe()
            .map(|probe| probe.cube().id())
            .or_else(|| self.fallback_probe.as_ref().map(TextureCube::id))
            .ok_or_else(|| RenderError::Internal("LightAccumulationLane: no fallback probe".into()))?;
        let occlusion = ssao.unwrap_or_else(|| frame.ctx.sentinel(SentinelKind::White));
        let sampler = frame.ctx.samplers().linear_clamp;
        let group = self.groups.get(
            frame.ctx,
            "ambient inputs",
            layouts.ambient,
            &[
                Bound::Texture(TextureBinding::d2(inputs.normal)),
                Bound::Texture(TextureBinding::d2(inputs.albedo)),
                Bound::Texture(TextureBinding::d2(inputs.emissive)),
                Bound::Texture(TextureBinding::depth(inputs.depth)),
                Bound::Texture(TextureBinding::d2(occlusion)),
                Bound::Texture(TextureBinding::cube(probe)),
                Bound::Sampler(sampler),
            ],
        )?;

        let ambient = scene.ambient();
        let reflections = if scene.probe().is_some() { 1.0 } else { 0.0 };
        let params = frame.rings.push_draw(
            frame.ctx,
            &PostUniforms::with_params([ambient.r, ambient.g, ambient.b, reflections]),
        )?;

        let mut pass = targets
            .ambient
            .begin_pass(frame.ctx, frame.encoder, &PassOps::clear(LinearRgba::TRANSPARENT));
        pass.set_pipeline(pipelines.ambient.id);
        bind_uniforms(pass.as_mut(), 0, view);
        pass.set_bind_group(1, group, &[]);
        bind_uniforms(pass.as_mut(), 2, params);
        draw_fullscreen(pass.as_mut());
        drop(pass);

        frame.stats.record_pass();
        frame.stats.ambient_passes += 1;
        frame.stats.record_draws(LaneKind::Light, 1);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn record_directional(
        &mut self,
        frame: &mut LaneContext<'_>,
        targets: &FrameTargets,
        scene: &Scene,
        world: &RenderWorld,
        view: UniformSlice,
        layouts: LightLayouts,
        pipelines: LightPipelines,
        gbuffer: BindGroupId,
    ) -> Result<(), RenderError> {
        if world.directional_lights.is_empty() {
            return Ok(());
        }
        let settings = frame.ctx.settings();
        let (extent, threshold) = (
            settings.directional_shadow_extent,
            settings.light_intensity_threshold,
        );
        let sampler = frame.ctx.samplers().nearest_clamp;

        // Groups and uniforms are resolved before the pass opens.
        let mut draws = Vec::with_capacity(world.directional_lights.len());
        for &handle in &world.directional_lights {
            let Some(light) = scene.light(handle) else {
                continue;
            };
            let binding = light.shadow().and_then(ShadowResource::bind_for_reading);
            let (moments, shadowed) = match binding {
                Some(binding) => (binding.texture(), true),
                None => (frame.ctx.sentinel(SentinelKind::White), false),
            };
            let size = light.shadow().map(ShadowResource::size).unwrap_or(1);
            let uniforms = light_uniforms(
                light,
                f32::INFINITY,
                Mat4::IDENTITY,
                light.light_space_matrix(extent, threshold),
                [f32::from(u8::from(shadowed)), 0.0, size as f32, 0.0],
            );
            let uniforms = frame.rings.push_draw(frame.ctx, &uniforms)?;
            let shadow = self.groups.get(
                frame.ctx,
                "light variance shadow",
                layouts.variance,
                &[
                    Bound::Texture(TextureBinding::d2(moments)),
                    Bound::Sampler(sampler),
                ],
            )?;
            draws.push((uniforms, shadow));
        }

        let ops = PassOps {
            color: LoadOp::Load,
            depth: None,
            stencil: None,
        };
        let mut pass = targets
            .light_directional
            .begin_pass(frame.ctx, frame.encoder, &ops);
        pass.set_pipeline(pipelines.directional.id);
        bind_uniforms(pass.as_mut(), group::VIEW, view);
        pass.set_bind_group(group::GBUFFER, gbuffer, &[]);
        for &(uniforms, shadow) in &draws {
            bind_uniforms(pass.as_mut(), group::LIGHT, uniforms);
            pass.set_bind_group(group::SHADOW, shadow, &[]);
            draw_fullscreen(pass.as_mut());
        }
        drop(pass);

        frame.stats.record_pass();
        frame.stats.light_additive_draws += draws.len() as u32;
        frame.stats.record_draws(LaneKind::Light, draws.len() as u32);
        Ok(())
    }

    /// Drops bind groups referencing the previous targets.
    pub fn on_resize(&mut self, ctx: &RenderContext) {
        self.groups.clear(ctx);
    }
}

impl Lane for LightAccumulationLane {
    fn strategy_name(&self) -> &'static str {
        "LightAccumulationLane"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Light
    }

    fn on_shutdown(&mut self, ctx: &mut RenderContext) {
        self.groups.clear(ctx);
        self.resolved = None;
        for pipeline in self.built.drain(..) {
            pipeline.dispose(ctx);
        }
        for layout in self.layouts.drain(..) {
            if let Err(e) = ctx.device().destroy_bind_group_layout(layout) {
                log::warn!("LightAccumulationLane: failed to destroy layout: {e}");
            }
        }
        if let Some(cube) = self.fallback_probe.take() {
            if let Err(e) = cube.dispose(ctx) {
                log::warn!("LightAccumulationLane: failed to release fallback probe: {e}");
            }
        }
        if let Some(buffer) = self.fallback_shadow.take() {
            if let Err(e) = buffer.dispose(ctx) {
                log::warn!("LightAccumulationLane: failed to release fallback shadow: {e}");
            }
        }
    }
}

/// Model matrix of the proxy volume covering `light` up to `range`.
///
/// Point lights scale the unit sphere; spot lights orient the unit cone
/// along their axis and widen its base to the outer cutoff.
pub fn volume_transform(light: &Light, range: f32) -> Mat4 {
    match *light.kind() {
        LightKind::Point { position, .. } => {
            Mat4::from_scale_rotation_translation(Vec3::splat(range), Quat::IDENTITY, position)
        }
        LightKind::Spot {
            position,
            direction,
            outer_cutoff,
            ..
        } => {
            let radius = range * outer_cutoff.tan();
            Mat4::from_scale_rotation_translation(
                Vec3::new(radius, radius, range),
                Quat::from_rotation_arc(Vec3::NEG_Z, direction.normalize()),
                position,
            )
        }
        LightKind::Directional { .. } => Mat4::IDENTITY,
    }
}

fn light_uniforms(light: &Light, range: f32, volume: Mat4, light_space: Mat4, shadow: [f32; 4]) -> LightUniforms {
    let color = light.color().to_vec3() * light.intensity();
    let (kind, position, direction, inner, outer, attenuation) = match *light.kind() {
        LightKind::Directional { direction } => {
            (light_kind::DIRECTIONAL, Vec3::ZERO, direction, 1.0, 1.0, [1.0, 0.0, 0.0])
        }
        LightKind::Point {
            position,
            attenuation,
        } => (
            light_kind::POINT,
            position,
            Vec3::ZERO,
            -1.0,
            -1.0,
            [attenuation.constant, attenuation.linear, attenuation.quadratic],
        ),
        LightKind::Spot {
            position,
            direction,
            inner_cutoff,
            outer_cutoff,
            attenuation,
        } => (
            light_kind::SPOT,
            position,
            direction,
            inner_cutoff.cos(),
            outer_cutoff.cos(),
            [attenuation.constant, attenuation.linear, attenuation.quadratic],
        ),
    };
    let range = if range.is_finite() { range } else { 0.0 };
    LightUniforms {
        volume: volume.to_cols_array_2d(),
        light_space: light_space.to_cols_array_2d(),
        color: [color.x, color.y, color.z, 1.0],
        position_range: [position.x, position.y, position.z, range],
        direction_inner: [direction.x, direction.y, direction.z, inner],
        attenuation_outer: [attenuation[0], attenuation[1], attenuation[2], outer],
        shadow: [shadow[0], kind, shadow[2], shadow[3]],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use umbra_core::math::Vec4;
    use umbra_data::Attenuation;

    const ATTENUATION: Attenuation = Attenuation {
        constant: 1.0,
        linear: 0.09,
        quadratic: 0.032,
    };

    #[test]
    fn test_point_volume_scales_sphere_by_range() {
        let light = Light::point(Vec3::new(1.0, 2.0, 3.0), ATTENUATION, LinearRgba::WHITE, 1.0);
        let volume = volume_transform(&light, 4.0);
        let surface = volume * Vec4::new(1.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(surface.x, 5.0, epsilon = 1e-5);
        assert_relative_eq!(surface.y, 2.0, epsilon = 1e-5);
    }

    #[test]
    fn test_spot_volume_points_along_axis() {
        let direction = Vec3::new(1.0, 0.0, 0.0);
        let light = Light::spot(
            Vec3::ZERO,
            direction,
            0.2,
            0.4,
            ATTENUATION,
            LinearRgba::WHITE,
            1.0,
        );
        let volume = volume_transform(&light, 10.0);
        let apex = volume * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let base_center = volume * Vec4::new(0.0, 0.0, -1.0, 1.0);
        assert_relative_eq!(apex.truncate().length(), 0.0, epsilon = 1e-5);
        assert_relative_eq!(base_center.x, 10.0, epsilon = 1e-4);
        let rim = volume * Vec4::new(1.0, 0.0, -1.0, 1.0);
        let radius = (rim.truncate() - base_center.truncate()).length();
        assert_relative_eq!(radius, 10.0 * 0.4f32.tan(), epsilon = 1e-4);
    }

    #[test]
    fn test_uniforms_carry_kind_and_premultiplied_color() {
        let light = Light::point(Vec3::ZERO, ATTENUATION, LinearRgba::rgb(1.0, 0.5, 0.0), 2.0);
        let uniforms = light_uniforms(&light, 3.0, Mat4::IDENTITY, Mat4::IDENTITY, [0.0; 4]);
        assert_eq!(uniforms.shadow[1], light_kind::POINT);
        assert_eq!(uniforms.color, [2.0, 1.0, 0.0, 1.0]);
        assert_eq!(uniforms.position_range[3], 3.0);
        assert_eq!(uniforms.attenuation_outer[1], 0.09);
    }

    #[test]
    fn test_directional_uniforms_have_no_range() {
        let light = Light::directional(Vec3::NEG_Y, LinearRgba::WHITE, 1.0);
        let uniforms = light_uniforms(&light, f32::INFINITY, Mat4::IDENTITY, Mat4::IDENTITY, [0.0; 4]);
        assert_eq!(uniforms.position_range[3], 0.0);
        assert_eq!(uniforms.direction_inner[1], -1.0);
    }
}
