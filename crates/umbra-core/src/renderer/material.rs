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

//! The material capability consumed by the geometry lanes.

use crate::renderer::context::RenderContext;
use crate::renderer::error::ResourceError;
use crate::renderer::traits::RenderPass;
use bytemuck::{Pod, Zeroable};
use std::fmt::Debug;

/// Fixed texture slots of the material bind group.
///
/// The discriminant is the binding index; the sampler follows the last slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerUnit {
    /// Base color.
    Albedo = 0,
    /// Perceptual roughness.
    Roughness = 1,
    /// Metalness.
    Metal = 2,
    /// Tangent-space normal map.
    Normal = 3,
    /// Ambient occlusion.
    AmbientOcclusion = 4,
    /// Height map.
    Height = 5,
    /// Emitted light.
    Emissive = 6,
}

impl SamplerUnit {
    /// Number of texture slots.
    pub const COUNT: usize = 7;

    /// Binding of the material sampler.
    pub const SAMPLER_BINDING: u32 = Self::COUNT as u32;

    /// Every slot, in binding order.
    pub const ALL: [SamplerUnit; Self::COUNT] = [
        SamplerUnit::Albedo,
        SamplerUnit::Roughness,
        SamplerUnit::Metal,
        SamplerUnit::Normal,
        SamplerUnit::AmbientOcclusion,
        SamplerUnit::Height,
        SamplerUnit::Emissive,
    ];

    /// Binding index inside the material bind group.
    pub const fn binding(self) -> u32 {
        self as u32
    }
}

/// Scalar material parameters, laid out for a uniform buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MaterialFactors {
    /// Albedo tint, multiplied with the albedo map.
    pub albedo: [f32; 4],
    /// Emissive color in `rgb`, intensity in `a`.
    pub emissive: [f32; 4],
    /// Roughness multiplier.
    pub roughness: f32,
    /// Metalness multiplier.
    pub metalness: f32,
    /// Specular shininess stored next to emission in the G-buffer.
    pub shininess: f32,
    /// Height map displacement scale.
    pub height_scale: f32,
}

impl Default for MaterialFactors {
    fn default() -> Self {
        Self {
            albedo: [1.0; 4],
            emissive: [0.0; 4],
            roughness: 1.0,
            metalness: 1.0,
            shininess: 0.0,
            height_scale: 0.0,
        }
    }
}

/// Something that can configure a pass to draw with its surface properties.
///
/// Implementations bind their textures to the [`SamplerUnit`] slots of the
/// material bind group, substituting sentinel textures for missing maps.
pub trait Material: Send + Sync + Debug {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Scalar factors written to the per-draw uniforms.
    fn factors(&self) -> MaterialFactors;

    /// Binds the material's textures at bind group index `group`.
    fn set_uniforms<'p>(
        &mut self,
        ctx: &mut RenderContext,
        pass: &mut dyn RenderPass<'p>,
        group: u32,
    ) -> Result<(), ResourceError>;

    /// Releases GPU resources owned by the material.
    fn dispose(self: Box<Self>, _ctx: &mut RenderContext) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampler_units_follow_binding_convention() {
        let bindings: Vec<u32> = SamplerUnit::ALL.iter().map(|u| u.binding()).collect();
        assert_eq!(bindings, vec![0, 1, 2, 3, 4, 5, 6]);
        assert_eq!(SamplerUnit::SAMPLER_BINDING, 7);
    }

    #[test]
    fn test_factors_are_uniform_sized() {
        assert_eq!(std::mem::size_of::<MaterialFactors>(), 48);
    }
}
