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

//! Fixed-function state of a render pipeline.

use super::enums::{
    BlendFactor, BlendOperation, CullMode, FrontFace, PrimitiveTopology, StencilOperation,
};
use crate::renderer::api::util::{ColorWrites, CompareFunction, TextureFormat};

/// Primitive assembly and rasterization state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PrimitiveState {
    /// Primitive topology.
    pub topology: PrimitiveTopology,
    /// Front face winding.
    pub front_face: FrontFace,
    /// Face culling.
    pub cull_mode: CullMode,
    /// Clamp depth instead of clipping against the near and far planes.
    pub unclipped_depth: bool,
}

impl PrimitiveState {
    /// Triangle list with the given culling.
    pub const fn culled(cull_mode: CullMode) -> Self {
        Self {
            topology: PrimitiveTopology::TriangleList,
            front_face: FrontFace::Ccw,
            cull_mode,
            unclipped_depth: false,
        }
    }
}

/// Stencil state of one face orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StencilFaceState {
    /// Stencil comparison.
    pub compare: CompareFunction,
    /// Operation when the stencil test fails.
    pub fail_op: StencilOperation,
    /// Operation when the stencil test passes but the depth test fails.
    pub depth_fail_op: StencilOperation,
    /// Operation when both tests pass.
    pub pass_op: StencilOperation,
}

impl StencilFaceState {
    /// Always passes and never writes.
    pub const IGNORE: Self = Self {
        compare: CompareFunction::Always,
        fail_op: StencilOperation::Keep,
        depth_fail_op: StencilOperation::Keep,
        pass_op: StencilOperation::Keep,
    };
}

impl Default for StencilFaceState {
    fn default() -> Self {
        Self::IGNORE
    }
}

/// Front and back stencil state plus masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StencilState {
    /// State for front faces.
    pub front: StencilFaceState,
    /// State for back faces.
    pub back: StencilFaceState,
    /// Mask applied before comparison.
    pub read_mask: u32,
    /// Mask applied when writing.
    pub write_mask: u32,
}

impl StencilState {
    /// `true` if the stencil buffer is neither read nor written.
    pub fn is_disabled(&self) -> bool {
        self.front == StencilFaceState::IGNORE
            && self.back == StencilFaceState::IGNORE
            && self.write_mask == 0
    }
}

/// Constant and slope-scaled depth bias.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DepthBiasState {
    /// Constant bias.
    pub constant: i32,
    /// Slope-scaled bias.
    pub slope_scale: f32,
    /// Maximum bias.
    pub clamp: f32,
}

/// Depth and stencil test configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthStencilState {
    /// Format of the depth attachment the pipeline renders to.
    pub format: TextureFormat,
    /// Whether passing fragments write depth.
    pub depth_write_enabled: bool,
    /// Depth comparison; `Always` disables the test.
    pub depth_compare: CompareFunction,
    /// Stencil configuration.
    pub stencil: StencilState,
    /// Depth bias.
    pub bias: DepthBiasState,
}

impl DepthStencilState {
    /// Standard depth test and write, no stencil.
    pub fn test_and_write(format: TextureFormat) -> Self {
        Self {
            format,
            depth_write_enabled: true,
            depth_compare: CompareFunction::Less,
            stencil: StencilState::default(),
            bias: DepthBiasState::default(),
        }
    }
}

/// One blend equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendComponent {
    /// Source factor.
    pub src_factor: BlendFactor,
    /// Destination factor.
    pub dst_factor: BlendFactor,
    /// Combining operation.
    pub operation: BlendOperation,
}

impl BlendComponent {
    /// Writes the source unchanged.
    pub const REPLACE: Self = Self {
        src_factor: BlendFactor::One,
        dst_factor: BlendFactor::Zero,
        operation: BlendOperation::Add,
    };

    /// Adds the source onto the destination.
    pub const ADDITIVE: Self = Self {
        src_factor: BlendFactor::One,
        dst_factor: BlendFactor::One,
        operation: BlendOperation::Add,
    };
}

/// Color and alpha blend equations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendState {
    /// Color equation.
    pub color: BlendComponent,
    /// Alpha equation.
    pub alpha: BlendComponent,
}

impl BlendState {
    /// `dst = src + dst` on every channel.
    pub const ADDITIVE: Self = Self {
        color: BlendComponent::ADDITIVE,
        alpha: BlendComponent::ADDITIVE,
    };
}

/// State of one color target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorTargetState {
    /// Target format.
    pub format: TextureFormat,
    /// Blending; `None` disables it.
    pub blend: Option<BlendState>,
    /// Channels written.
    pub write_mask: ColorWrites,
}

impl ColorTargetState {
    /// Opaque target writing every channel.
    pub const fn replace(format: TextureFormat) -> Self {
        Self {
            format,
            blend: None,
            write_mask: ColorWrites::ALL,
        }
    }

    /// Additive target writing every channel.
    pub const fn additive(format: TextureFormat) -> Self {
        Self {
            format,
            blend: Some(BlendState::ADDITIVE),
            write_mask: ColorWrites::ALL,
        }
    }

    /// Target whose color writes are masked off.
    pub const fn masked(format: TextureFormat) -> Self {
        Self {
            format,
            blend: None,
            write_mask: ColorWrites::EMPTY,
        }
    }
}
