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

//! Reflection probe capture: a sky-only render of each requested cube face.

use super::pipeline::LanePipeline;
use super::proxy::ProxyMeshes;
use super::skybox_lane::{sky_view, SkyPipelines};
use super::uniforms::bind_uniforms;
use super::{Lane, LaneContext, LaneKind};
use umbra_core::math::Extent2D;
use umbra_core::renderer::resource::PassOps;
use umbra_core::renderer::{RenderError, TextureFormat};
use umbra_core::RenderContext;
use umbra_data::probe::PROBE_FORMAT;
use umbra_data::Scene;

const PROBE_DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

/// Re-renders the probe faces selected by the refresh policy and regenerates
/// the cube map's mip chain afterwards.
#[derive(Debug)]
pub struct ProbeCaptureLane {
    sky: Option<SkyPipelines>,
    pipeline: Option<LanePipeline>,
}

impl ProbeCaptureLane {
    /// Builds the capture pipeline.
    pub fn new(ctx: &mut RenderContext) -> Result<Self, RenderError> {
        let sky = SkyPipelines::new(ctx)?;
        match sky.build(ctx, "probe sky", PROBE_FORMAT, PROBE_DEPTH_FORMAT) {
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

    /// Captures the faces due this frame. Without a sky, faces are cleared to
    /// the scene's ambient color.
    ///
    /// Returns the number of faces rendered.
    pub fn record(
        &mut self,
        frame: &mut LaneContext<'_>,
        scene: &mut Scene,
        proxies: &ProxyMeshes,
    ) -> Result<u32, RenderError> {
        let (Some(sky_pipelines), Some(pipeline)) = (self.sky.as_mut(), self.pipeline) else {
            return Err(RenderError::Internal("ProbeCaptureLane used after shutdown".into()));
        };
        let sky = scene.sky().map(|cube| cube.id());
        let ambient = scene.ambient();
        let policy = frame.ctx.settings().probe_refresh;
        let Some(probe) = scene.probe_mut() else {
            return Ok(0);
        };

        let faces = probe.faces_to_capture(policy);
        if faces.is_empty() {
            return Ok(0);
        }
        let group = match sky {
            Some(sky) => Some(sky_pipelines.bind_group(frame.ctx, sky)?),
            None => None,
        };
        let views = probe.view_matrices();
        let projection = probe.projection();
        let size = probe.cube().size();

        for &face in &faces {
            let Some(target) = probe.face(face) else {
                continue;
            };
            let mut pass = target.begin_pass(frame.ctx, frame.encoder, &PassOps::clear(ambient));
            if let Some(group) = group {
                let view = sky_view(views[face as usize], projection, Extent2D::new(size, size));
                let view = frame.rings.push_frame(frame.ctx, &view)?;
                pass.set_pipeline(pipeline.id);
                bind_uniforms(pass.as_mut(), 0, view);
                pass.set_bind_group(1, group, &[]);
                proxies.cube.draw_indexed(pass.as_mut());
                frame.stats.record_draws(LaneKind::Probe, 1);
            }
            drop(pass);
            frame.stats.record_pass();
        }

        frame.encoder.generate_mipmaps(probe.cube().id());
        log::trace!("ProbeCaptureLane: captured faces {faces:?}");
        Ok(faces.len() as u32)
    }
}

impl Lane for ProbeCaptureLane {
    fn strategy_name(&self) -> &'static str {
        "ProbeCaptureLane"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Probe
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
