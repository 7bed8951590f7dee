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

//! Uniform blocks shared by the lanes and the rings they are pushed into.
//!
//! Every lane binds per-view data ([`FrameUniforms`]) at group 0 and per-draw
//! data at group 1, both through dynamic offsets into a [`UniformRing`].

use bytemuck::{Pod, Zeroable};
use umbra_core::math::{Extent2D, Mat4, Vec3};
use umbra_core::renderer::material::MaterialFactors;
use umbra_core::renderer::resource::{UniformRing, UniformSlice};
use umbra_core::renderer::{RenderPass, ResourceError};
use umbra_core::RenderContext;
use umbra_data::Camera;

/// Bytes reserved per view in the frame ring.
pub const FRAME_ELEMENT_SIZE: u32 = 512;

/// Bytes reserved per draw in the draw ring.
pub const DRAW_ELEMENT_SIZE: u32 = 256;

const INITIAL_FRAME_ELEMENTS: u32 = 64;
const INITIAL_DRAW_ELEMENTS: u32 = 1024;

/// Per-view data: one per camera, shadow-casting light and probe face.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    /// World to view.
    pub view: [[f32; 4]; 4],
    /// View to clip.
    pub projection: [[f32; 4]; 4],
    /// World to clip.
    pub view_projection: [[f32; 4]; 4],
    /// Clip to world, used to rebuild positions from depth.
    pub inverse_view_projection: [[f32; 4]; 4],
    /// Eye position in `xyz`.
    pub camera_position: [f32; 4],
    /// Target width, height and their reciprocals.
    pub viewport: [f32; 4],
    /// Exposure, near plane, far plane, unused.
    pub params: [f32; 4],
}

impl FrameUniforms {
    /// Data of an arbitrary view.
    pub fn new(view: Mat4, projection: Mat4, eye: Vec3, target: Extent2D, near: f32, far: f32) -> Self {
        let view_projection = projection * view;
        let (width, height) = (target.width.max(1) as f32, target.height.max(1) as f32);
        Self {
            view: view.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
            view_projection: view_projection.to_cols_array_2d(),
            inverse_view_projection: view_projection.inverse().to_cols_array_2d(),
            camera_position: eye.extend(1.0).to_array(),
            viewport: [width, height, 1.0 / width, 1.0 / height],
            params: [1.0, near, far, 0.0],
        }
    }

    /// Data of the main camera rendering into a `target`-sized buffer.
    pub fn for_camera(camera: &Camera, target: Extent2D) -> Self {
        let mut uniforms = Self::new(
            camera.view(),
            camera.projection(),
            camera.position(),
            target,
            camera.near(),
            camera.far(),
        );
        uniforms.params[0] = camera.exposure();
        uniforms
    }

    /// Data of a light's view, where only the combined matrix is known.
    pub fn for_light_space(light_space: Mat4, target: Extent2D) -> Self {
        Self::new(Mat4::IDENTITY, light_space, Vec3::ZERO, target, 0.0, 1.0)
    }
}

/// Per-object data of the geometry and shadow lanes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DrawUniforms {
    /// Object to world.
    pub model: [[f32; 4]; 4],
    /// Inverse transpose of `model`, for normals.
    pub normal_matrix: [[f32; 4]; 4],
    /// Material factors of the draw.
    pub factors: MaterialFactors,
}

impl DrawUniforms {
    /// Uniforms of an object drawn with `model` and `factors`.
    pub fn new(model: Mat4, factors: MaterialFactors) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: model.inverse().transpose().to_cols_array_2d(),
            factors,
        }
    }
}

/// Light kinds as seen by the lighting shaders.
pub mod light_kind {
    /// Directional light.
    pub const DIRECTIONAL: f32 = 0.0;
    /// Point light.
    pub const POINT: f32 = 1.0;
    /// Spot light.
    pub const SPOT: f32 = 2.0;
}

/// Per-light data of the light accumulation lane.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightUniforms {
    /// Model matrix of the light volume proxy.
    pub volume: [[f32; 4]; 4],
    /// World to shadow clip space.
    pub light_space: [[f32; 4]; 4],
    /// Color premultiplied by intensity.
    pub color: [f32; 4],
    /// Position in `xyz`, range in `w`.
    pub position_range: [f32; 4],
    /// Direction in `xyz`, cosine of the inner cutoff in `w`.
    pub direction_inner: [f32; 4],
    /// Constant, linear and quadratic attenuation, cosine of the outer cutoff.
    pub attenuation_outer: [f32; 4],
    /// Shadow present (0 or 1), light kind, shadow map size, depth bias.
    pub shadow: [f32; 4],
}

/// Parameters of the full-screen post-processing passes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct PostUniforms {
    /// Pass-specific scalars.
    pub params: [f32; 4],
    /// Up to eight per-level weights.
    pub weights: [[f32; 4]; 2],
    /// Source texel size in `xy`, blur direction in `zw`.
    pub texel: [f32; 4],
}

impl PostUniforms {
    /// Uniforms carrying only `params`.
    pub fn with_params(params: [f32; 4]) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }
}

/// Binds a pushed uniform at `group` with its dynamic offset.
pub fn bind_uniforms(pass: &mut dyn RenderPass<'_>, group: u32, slice: UniformSlice) {
    pass.set_bind_group(group, slice.bind_group, &[slice.offset]);
}

/// The two uniform rings of the renderer.
#[derive(Debug)]
pub struct FrameRings {
    frame: UniformRing,
    draw: UniformRing,
}

impl FrameRings {
    /// Creates both rings on the standard uniform layout.
    pub fn new(ctx: &RenderContext) -> Result<Self, ResourceError> {
        let layout = ctx.layouts().uniforms;
        let frame = UniformRing::new(
            ctx.device(),
            layout,
            0,
            FRAME_ELEMENT_SIZE,
            INITIAL_FRAME_ELEMENTS,
            "frame uniforms",
        )?;
        let draw = match UniformRing::new(
            ctx.device(),
            layout,
            0,
            DRAW_ELEMENT_SIZE,
            INITIAL_DRAW_ELEMENTS,
            "draw uniforms",
        ) {
            Ok(draw) => draw,
            Err(e) => {
                frame.destroy(ctx.device());
                return Err(e);
            }
        };
        Ok(Self { frame, draw })
    }

    /// Moves both rings to the next frame slot.
    pub fn advance(&mut self) {
        self.frame.advance();
        self.draw.advance();
    }

    /// Pushes one view's data.
    pub fn push_frame(
        &mut self,
        ctx: &RenderContext,
        uniforms: &FrameUniforms,
    ) -> Result<UniformSlice, ResourceError> {
        self.frame.push_pod(ctx.device(), uniforms)
    }

    /// Pushes one draw's data.
    pub fn push_draw<T: Pod>(
        &mut self,
        ctx: &RenderContext,
        uniforms: &T,
    ) -> Result<UniformSlice, ResourceError> {
        self.draw.push_pod(ctx.device(), uniforms)
    }

    /// Destroys both rings.
    pub fn destroy(&self, ctx: &RenderContext) {
        self.frame.destroy(ctx.device());
        self.draw.destroy(ctx.device());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_uniform_blocks_fit_their_ring() {
        assert!(std::mem::size_of::<FrameUniforms>() <= FRAME_ELEMENT_SIZE as usize);
        assert!(std::mem::size_of::<DrawUniforms>() <= DRAW_ELEMENT_SIZE as usize);
        assert!(std::mem::size_of::<LightUniforms>() <= DRAW_ELEMENT_SIZE as usize);
        assert!(std::mem::size_of::<PostUniforms>() <= DRAW_ELEMENT_SIZE as usize);
    }

    #[test]
    fn test_camera_uniforms_carry_exposure_and_viewport() {
        let mut camera = Camera::new(Vec3::new(0.0, 2.0, 5.0), Vec3::NEG_Z, Vec3::Y);
        camera.set_exposure(1.5);
        let uniforms = FrameUniforms::for_camera(&camera, Extent2D::new(200, 100));
        assert_relative_eq!(uniforms.params[0], 1.5);
        assert_relative_eq!(uniforms.viewport[0], 200.0);
        assert_relative_eq!(uniforms.viewport[3], 0.01);
        assert_relative_eq!(uniforms.camera_position[1], 2.0);
    }

    #[test]
    fn test_inverse_view_projection_round_trips() {
        let camera = Camera::new(Vec3::new(1.0, 1.0, 1.0), Vec3::NEG_Z, Vec3::Y);
        let uniforms = FrameUniforms::for_camera(&camera, Extent2D::new(64, 64));
        let vp = Mat4::from_cols_array_2d(&uniforms.view_projection);
        let inverse = Mat4::from_cols_array_2d(&uniforms.inverse_view_projection);
        let identity = vp * inverse;
        for (a, b) in identity.to_cols_array().iter().zip(Mat4::IDENTITY.to_cols_array()) {
            assert_relative_eq!(*a, b, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_normal_matrix_of_uniform_scale() {
        let model = Mat4::from_scale(Vec3::splat(2.0));
        let draw = DrawUniforms::new(model, MaterialFactors::default());
        assert_relative_eq!(draw.normal_matrix[0][0], 0.5);
    }
}
