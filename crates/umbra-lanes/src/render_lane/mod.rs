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

//! Rendering lanes - one per GPU pass of the deferred frame.

use umbra_core::renderer::{CommandEncoder, RenderPass};
use umbra_core::RenderContext;

mod bindings;
mod bloom_lane;
mod blur;
mod extract_lane;
mod foliage_lane;
mod frame_renderer;
mod fxaa_lane;
mod geometry_lane;
mod light_accumulation_lane;
mod pipeline;
mod probe_capture_lane;
mod proxy;
mod shadow_pass_lane;
mod skybox_lane;
mod ssao_lane;
mod stats;
mod targets;
mod tonemap_lane;
mod uniforms;
mod world;

pub mod shaders;

pub use bloom_lane::*;
pub use blur::*;
pub use extract_lane::*;
pub use foliage_lane::*;
pub use frame_renderer::*;
pub use fxaa_lane::*;
pub use geometry_lane::*;
pub use light_accumulation_lane::*;
pub use probe_capture_lane::*;
pub use proxy::*;
pub use shaders::EmbeddedShaders;
pub use shadow_pass_lane::*;
pub use skybox_lane::*;
pub use ssao_lane::*;
pub use stats::*;
pub use targets::*;
pub use tonemap_lane::*;
pub use uniforms::*;
pub use world::*;

/// Classification of the lanes of a frame, in recording order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LaneKind {
    /// Shadow map generation.
    Shadow,
    /// Reflection probe capture.
    Probe,
    /// G-buffer fill.
    Geometry,
    /// Instanced foliage into the G-buffer.
    Foliage,
    /// Screen-space ambient occlusion.
    Ssao,
    /// Ambient, local and directional light accumulation.
    Light,
    /// Sky cube map at the far plane.
    Skybox,
    /// Bloom filter, blur and combine.
    Bloom,
    /// HDR to LDR tone mapping.
    Tonemap,
    /// Anti-aliasing into the output target.
    Fxaa,
}

impl LaneKind {
    /// Number of lane kinds.
    pub const COUNT: usize = 10;

    /// Every kind, in recording order.
    pub const ALL: [LaneKind; Self::COUNT] = [
        LaneKind::Shadow,
        LaneKind::Probe,
        LaneKind::Geometry,
        LaneKind::Foliage,
        LaneKind::Ssao,
        LaneKind::Light,
        LaneKind::Skybox,
        LaneKind::Bloom,
        LaneKind::Tonemap,
        LaneKind::Fxaa,
    ];

    /// Position in recording order.
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for LaneKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LaneKind::Shadow => "Shadow",
            LaneKind::Probe => "Probe",
            LaneKind::Geometry => "Geometry",
            LaneKind::Foliage => "Foliage",
            LaneKind::Ssao => "SSAO",
            LaneKind::Light => "Light",
            LaneKind::Skybox => "Skybox",
            LaneKind::Bloom => "Bloom",
            LaneKind::Tonemap => "Tonemap",
            LaneKind::Fxaa => "FXAA",
        };
        write!(f, "{name}")
    }
}

/// Behavior shared by every lane of the frame renderer.
///
/// Each lane builds its pipelines at construction and records one pass (or a
/// fixed group of passes) per frame. The recording entry points differ per
/// lane because they consume different parts of the frame; this trait covers
/// identity and teardown, which the [`FrameRenderer`] drives uniformly.
pub trait Lane {
    /// A human-readable identifier, used in logs.
    fn strategy_name(&self) -> &'static str;

    /// The pass this lane implements.
    fn lane_kind(&self) -> LaneKind;

    /// Releases every GPU object the lane created.
    fn on_shutdown(&mut self, ctx: &mut RenderContext);
}

/// What a lane records into: the context, the frame's encoder, the uniform
/// rings and the statistics being gathered.
///
/// Fields are public so a lane can hold a pass on `encoder` while pushing
/// uniforms and counting draws.
pub struct LaneContext<'a> {
    /// The render context.
    pub ctx: &'a mut RenderContext,
    /// The frame's command encoder.
    pub encoder: &'a mut dyn CommandEncoder,
    /// Per-view and per-draw uniform rings.
    pub rings: &'a mut FrameRings,
    /// Statistics of the frame being recorded.
    pub stats: &'a mut FrameStats,
}

/// Vertices of the full-screen triangle generated by `fullscreen.wgsl`.
pub const FULLSCREEN_VERTICES: u32 = 3;

/// Draws the full-screen triangle.
pub fn draw_fullscreen(pass: &mut dyn RenderPass<'_>) {
    pass.draw(0..FULLSCREEN_VERTICES, 0..1);
}
