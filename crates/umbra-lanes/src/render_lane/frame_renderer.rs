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

//! The per-frame orchestrator.
//!
//! [`FrameRenderer`] owns every intermediate target and lane and records
//! the passes of one frame in a fixed order into a single command buffer:
//! shadow, probe, geometry, foliage, SSAO, light accumulation, skybox,
//! bloom, tonemap and FXAA.

use super::bloom_lane::BloomLane;
use super::extract_lane::ExtractLane;
use super::foliage_lane::FoliageLane;
use super::fxaa_lane::FxaaLane;
use super::geometry_lane::GeometryLane;
use super::light_accumulation_lane::LightAccumulationLane;
use super::probe_capture_lane::ProbeCaptureLane;
use super::proxy::ProxyMeshes;
use super::shadow_pass_lane::ShadowPassLane;
use super::skybox_lane::SkyboxLane;
use super::ssao_lane::SsaoLane;
use super::stats::FrameStats;
use super::targets::FrameTargets;
use super::tonemap_lane::TonemapLane;
use super::uniforms::{FrameRings, FrameUniforms};
use super::{Lane, LaneContext};
use std::time::{Duration, Instant};
use umbra_core::math::Extent2D;
use umbra_core::renderer::RenderError;
use umbra_core::RenderContext;
use umbra_data::{Camera, Scene};

/// Every lane of the frame, in recording order.
#[derive(Debug)]
struct Lanes {
    shadow: ShadowPassLane,
    probe: ProbeCaptureLane,
    geometry: GeometryLane,
    foliage: FoliageLane,
    ssao: SsaoLane,
    light: LightAccumulationLane,
    skybox: SkyboxLane,
    bloom: BloomLane,
    tonemap: TonemapLane,
    fxaa: FxaaLane,
}

/// Builds a lane, releasing the lanes built before it on failure.
macro_rules! build_lane {
    ($ctx:expr, $build:expr $(, $built:ident)*) => {
        match $build {
            Ok(lane) => lane,
            Err(e) => {
                $( $built.on_shutdown($ctx); )*
                return Err(e);
            }
        }
    };
}

impl Lanes {
    fn new(ctx: &mut RenderContext, targets: &FrameTargets) -> Result<Self, RenderError> {
        let mut shadow = ShadowPassLane::new(ctx)?;
        let mut probe = build_lane!(ctx, ProbeCaptureLane::new(ctx), shadow);
        let mut geometry = build_lane!(ctx, GeometryLane::new(ctx), shadow, probe);
        let mut foliage = build_lane!(ctx, FoliageLane::new(ctx), shadow, probe, geometry);
        let mut ssao = build_lane!(ctx, SsaoLane::new(ctx), shadow, probe, geometry, foliage);
        let mut light = build_lane!(
            ctx,
            LightAccumulationLane::new(ctx),
            shadow,
            probe,
            geometry,
            foliage,
            ssao
        );
        let mut skybox = build_lane!(
            ctx,
            SkyboxLane::new(ctx),
            shadow,
            probe,
            geometry,
            foliage,
            ssao,
            light
        );
        let mut bloom = build_lane!(
            ctx,
            BloomLane::new(ctx, targets.internal_size()),
            shadow,
            probe,
            geometry,
            foliage,
            ssao,
            light,
            skybox
        );
        let mut tonemap = build_lane!(
            ctx,
            TonemapLane::new(ctx),
            shadow,
            probe,
            geometry,
            foliage,
            ssao,
            light,
            skybox,
            bloom
        );
        let fxaa = build_lane!(
            ctx,
            FxaaLane::new(ctx, targets.output_format()),
            shadow,
            probe,
            geometry,
            foliage,
            ssao,
            light,
            skybox,
            bloom,
            tonemap
        );
        Ok(Self {
            shadow,
            probe,
            geometry,
            foliage,
            ssao,
            light,
            skybox,
            bloom,
            tonemap,
            fxaa,
        })
    }

    fn all_mut(&mut self) -> [&mut dyn Lane; 10] {
        [
            &mut self.shadow,
            &mut self.probe,
            &mut self.geometry,
            &mut self.foliage,
            &mut self.ssao,
            &mut self.light,
            &mut self.skybox,
            &mut self.bloom,
            &mut self.tonemap,
            &mut self.fxaa,
        ]
    }
}

/// Renders a [`Scene`] through the deferred pipeline.
#[derive(Debug)]
pub struct FrameRenderer {
    rings: FrameRings,
    proxies: ProxyMeshes,
    targets: FrameTargets,
    extract: ExtractLane,
    lanes: Lanes,
    frame_count: u64,
    last_frame_time: Duration,
}

impl FrameRenderer {
    /// Builds every target and lane for an `output_size` output.
    ///
    /// Settings are read from `ctx`. An incomplete framebuffer or a shader
    /// that fails to load or compile is fatal; whatever was built before
    /// the failure is released.
    pub fn new(ctx: &mut RenderContext, output_size: Extent2D) -> Result<Self, RenderError> {
        let rings = FrameRings::new(ctx)?;
        let proxies = match ProxyMeshes::new(ctx.device()) {
            Ok(proxies) => proxies,
            Err(e) => {
                rings.destroy(ctx);
                return Err(e.into());
            }
        };
        let targets = match FrameTargets::new(ctx, output_size) {
            Ok(targets) => targets,
            Err(e) => {
                proxies.dispose(ctx.device());
                rings.destroy(ctx);
                return Err(e);
            }
        };
        let lanes = match Lanes::new(ctx, &targets) {
            Ok(lanes) => lanes,
            Err(e) => {
                log::error!("FrameRenderer: initialization failed: {e}");
                targets.dispose(ctx);
                proxies.dispose(ctx.device());
                rings.destroy(ctx);
                return Err(e);
            }
        };

        let extract = ExtractLane::new(ctx.settings().light_intensity_threshold);
        log::info!(
            "FrameRenderer: ready at {}x{} (internal {}x{}, {:?} output)",
            output_size.width,
            output_size.height,
            targets.internal_size().width,
            targets.internal_size().height,
            targets.output_format()
        );
        Ok(Self {
            rings,
            proxies,
            targets,
            extract,
            lanes,
            frame_count: 0,
            last_frame_time: Duration::ZERO,
        })
    }

    /// Size of the final image.
    pub fn output_size(&self) -> Extent2D {
        self.targets.output_size()
    }

    /// Resolution of every intermediate target.
    pub fn internal_size(&self) -> Extent2D {
        self.targets.internal_size()
    }

    /// The intermediate targets of the frame.
    pub fn targets(&self) -> &FrameTargets {
        &self.targets
    }

    /// Sizes of the bloom levels, finest first.
    pub fn bloom_level_sizes(&self) -> Vec<Extent2D> {
        self.lanes.bloom.level_sizes()
    }

    /// Frames rendered so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// CPU time spent recording the last frame.
    pub fn last_frame_time(&self) -> Duration {
        self.last_frame_time
    }

    /// Rebuilds the size-dependent targets for a new output size.
    ///
    /// The new targets and bloom chain are both built before anything old
    /// is released, so a failure leaves the renderer at its previous size.
    pub fn resize(&mut self, ctx: &mut RenderContext, output_size: Extent2D) -> Result<(), RenderError> {
        if output_size == self.targets.output_size() {
            return Ok(());
        }
        let targets = FrameTargets::new(ctx, output_size)?;
        let chain = match self.lanes.bloom.build_chain(ctx, targets.internal_size()) {
            Ok(chain) => chain,
            Err(e) => {
                targets.dispose(ctx);
                return Err(e);
            }
        };
        let previous = std::mem::replace(&mut self.targets, targets);
        previous.dispose(ctx);
        self.lanes.bloom.replace_chain(ctx, chain);

        self.lanes.ssao.on_resize(ctx);
        self.lanes.light.on_resize(ctx);
        self.lanes.tonemap.on_resize(ctx);
        self.lanes.fxaa.on_resize(ctx);
        log::info!(
            "FrameRenderer: resized to {}x{}",
            output_size.width,
            output_size.height
        );
        Ok(())
    }

    /// Records and submits one frame.
    ///
    /// Queued GPU tasks run first; their failures are reported in the
    /// returned stats and never abort the frame.
    pub fn render_frame(
        &mut self,
        ctx: &mut RenderContext,
        scene: &mut Scene,
        camera: &Camera,
    ) -> Result<FrameStats, RenderError> {
        let frame_start = Instant::now();
        let mut stats = FrameStats::default();

        // Step 1: Run the work other threads queued since the last frame.
        let report = ctx.drain_tasks();
        stats.tasks_run = report.executed;
        stats.tasks_failed = report.failed;

        // Step 2: Recycle the uniform slots of the previous frame.
        self.rings.advance();

        // Step 3: Extract what this camera sees.
        let world = self.extract.extract(scene, camera);
        stats.culled_objects = world.culled_objects;
        stats.culled_lights = world.culled_lights;

        // Step 4: Record every pass into one encoder.
        let mut encoder = ctx.device().create_command_encoder(Some("frame"));
        let view = FrameUniforms::for_camera(camera, self.targets.internal_size());
        let view = self.rings.push_frame(ctx, &view)?;
        let lanes = &mut self.lanes;
        let targets = &self.targets;
        let proxies = &self.proxies;
        {
            let mut frame = LaneContext {
                ctx: &mut *ctx,
                encoder: encoder.as_mut(),
                rings: &mut self.rings,
                stats: &mut stats,
            };

            lanes.shadow.record(&mut frame, scene, &world)?;
            let faces = lanes.probe.record(&mut frame, scene, proxies)?;
            frame.stats.probe_faces_captured = faces;
            lanes.geometry.record(&mut frame, targets, scene, &world, view)?;
            let uploads = lanes.foliage.record(&mut frame, targets, scene, view)?;
            frame.stats.foliage_uploads = uploads;
            let ssao = lanes.ssao.record(&mut frame, targets, view)?;
            lanes
                .light
                .record(&mut frame, targets, proxies, scene, &world, view, ssao)?;
            let sky = scene.sky().map(|cube| cube.id());
            lanes.skybox.record(&mut frame, targets, proxies, camera, sky)?;
            lanes.bloom.record(&mut frame, targets)?;
            lanes.tonemap.record(&mut frame, targets, view)?;
            lanes.fxaa.record(&mut frame, targets)?;
        }

        // Step 5: Submit once.
        let command_buffer = encoder.finish();
        ctx.device().submit_command_buffer(command_buffer);

        self.frame_count += 1;
        self.last_frame_time = frame_start.elapsed();
        log::trace!("FrameRenderer: frame {} {stats}", self.frame_count);
        Ok(stats)
    }

    /// Releases every target, lane and buffer the renderer owns.
    pub fn dispose(mut self, ctx: &mut RenderContext) {
        for lane in self.lanes.all_mut() {
            log::debug!("FrameRenderer: shutting down {}", lane.strategy_name());
            lane.on_shutdown(ctx);
        }
        self.targets.dispose(ctx);
        self.proxies.dispose(ctx.device());
        self.rings.destroy(ctx);
    }
}
