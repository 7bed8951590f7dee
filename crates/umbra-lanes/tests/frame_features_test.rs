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

mod common;

use std::thread;

use common::{camera, renderer, SceneBuilder};
use umbra_core::math::{Extent2D, LinearRgba, Mat4, Vec3};
use umbra_core::renderer::settings::ProbeRefreshPolicy;
use umbra_core::task::TaskError;
use umbra_core::testing::{RecordingDevice, ResourceKind};
use umbra_core::{RenderContext, RendererSettings};
use umbra_data::{FoliageBatch, FoliageInstance, ReflectionProbe, Scene};
use umbra_lanes::LaneKind;

fn bloom_settings(levels: u32) -> RendererSettings {
    RendererSettings {
        bloom_levels: levels,
        ..Default::default()
    }
}

#[test]
fn test_bloom_allocates_one_pair_per_level() {
    let device = RecordingDevice::new();
    let (_ctx, renderer) = renderer(&device, bloom_settings(3));

    assert_eq!(
        renderer.bloom_level_sizes(),
        vec![
            Extent2D::new(160, 120),
            Extent2D::new(80, 60),
            Extent2D::new(40, 30)
        ]
    );
    assert_eq!(device.live_labels(ResourceKind::Texture, "bloom").len(), 6);
    assert_eq!(device.live_labels(ResourceKind::Texture, "bloom temp").len(), 3);
}

#[test]
fn test_bloom_levels_are_capped() {
    let device = RecordingDevice::new();
    let (_ctx, renderer) = renderer(&device, bloom_settings(12));

    let sizes = renderer.bloom_level_sizes();
    assert_eq!(sizes.len(), 8);
    assert_eq!(sizes[7], Extent2D::new(1, 1));
}

#[test]
fn test_bloom_frame_downsamples_then_blurs_each_level() {
    let device = RecordingDevice::new();
    let (mut ctx, mut renderer) = renderer(&device, bloom_settings(3));
    let mut scene = SceneBuilder::new(&ctx).object(Vec3::ZERO).build();
    device.clear_submissions();

    let stats = renderer.render_frame(&mut ctx, &mut scene, &camera()).unwrap();

    assert_eq!(device.blits().len(), 2);
    // Filter, (1 + 2 + 3) blur iterations of two passes, combine.
    assert_eq!(device.passes_labelled("bloom").len(), 14);
    assert_eq!(stats.draws(LaneKind::Bloom), 14);
    let combine = device.passes_labelled("bloom combine");
    assert_eq!(combine.len(), 1);
    assert!(!combine[0].clears());
}

fn gbuffer_pipelines(device: &RecordingDevice) -> Vec<String> {
    let pass = device
        .passes()
        .into_iter()
        .find(|pass| pass.label == "gbuffer")
        .unwrap();
    pass.pipelines
        .iter()
        .map(|id| device.pipeline_label(*id))
        .collect()
}

#[test]
fn test_cull_mode_switches_follow_draw_order() {
    let device = RecordingDevice::new();
    let (mut ctx, mut renderer) = renderer(&device, RendererSettings::default());
    // Drawn back to front: -4, -2, 0.
    let mut scene = SceneBuilder::new(&ctx)
        .object(Vec3::ZERO)
        .double_sided_object(Vec3::new(0.0, 0.0, -2.0))
        .object(Vec3::new(0.0, 0.0, -4.0))
        .build();
    device.clear_submissions();

    let stats = renderer.render_frame(&mut ctx, &mut scene, &camera()).unwrap();

    assert_eq!(stats.draws(LaneKind::Geometry), 3);
    assert_eq!(stats.cull_mode_switches, 2);
    assert_eq!(
        gbuffer_pipelines(&device),
        vec!["gbuffer", "gbuffer double-sided", "gbuffer"]
    );
}

#[test]
fn test_uniform_cull_mode_binds_one_pipeline() {
    let device = RecordingDevice::new();
    let (mut ctx, mut renderer) = renderer(&device, RendererSettings::default());
    let mut scene = SceneBuilder::new(&ctx)
        .object(Vec3::ZERO)
        .object(Vec3::new(2.0, 0.0, 0.0))
        .build();
    device.clear_submissions();

    let stats = renderer.render_frame(&mut ctx, &mut scene, &camera()).unwrap();

    assert_eq!(stats.cull_mode_switches, 0);
    assert_eq!(gbuffer_pipelines(&device), vec!["gbuffer"]);
}

fn foliage_scene(ctx: &RenderContext) -> Scene {
    let built = SceneBuilder::new(ctx);
    let mut grass = FoliageBatch::new(built.mesh, built.material);
    grass.push_instance(FoliageInstance::new(Mat4::IDENTITY, LinearRgba::WHITE));
    let mut scene = built.build();
    scene.add_foliage(grass);
    scene
}

#[test]
fn test_foliage_uploads_only_when_instances_change() {
    let device = RecordingDevice::new();
    let (mut ctx, mut renderer) = renderer(&device, RendererSettings::default());
    let mut scene = foliage_scene(&ctx);

    let first = renderer.render_frame(&mut ctx, &mut scene, &camera()).unwrap();
    let second = renderer.render_frame(&mut ctx, &mut scene, &camera()).unwrap();
    assert_eq!(first.foliage_uploads, 1);
    assert_eq!(second.foliage_uploads, 0);
    assert_eq!(second.draws(LaneKind::Foliage), 1);

    scene.foliage_mut()[0].push_instance(FoliageInstance::new(
        Mat4::from_translation(Vec3::X),
        LinearRgba::WHITE,
    ));
    device.clear_submissions();
    let third = renderer.render_frame(&mut ctx, &mut scene, &camera()).unwrap();

    assert_eq!(third.foliage_uploads, 1);
    assert_eq!(scene.foliage()[0].upload_count(), 2);
    let pass = &device.passes_labelled("foliage")[0];
    assert_eq!(pass.draws.len(), 1);
    assert_eq!(pass.draws[0].instances, 2);
}

fn probe_faces(policy: ProbeRefreshPolicy, frames: usize) -> Vec<u32> {
    let device = RecordingDevice::new();
    let settings = RendererSettings {
        probe_refresh: policy,
        probe_resolution: 32,
        ..Default::default()
    };
    let (mut ctx, mut renderer) = renderer(&device, settings);
    let mut scene = SceneBuilder::new(&ctx).object(Vec3::ZERO).build();
    let probe = ReflectionProbe::new(&mut ctx, Vec3::Y).unwrap();
    scene.set_probe(&mut ctx, Some(probe));

    (0..frames)
        .map(|_| {
            renderer
                .render_frame(&mut ctx, &mut scene, &camera())
                .unwrap()
                .probe_faces_captured
        })
        .collect()
}

#[test]
fn test_probe_on_change_captures_once() {
    assert_eq!(probe_faces(ProbeRefreshPolicy::OnChange, 3), vec![6, 0, 0]);
}

#[test]
fn test_probe_on_change_recaptures_after_move() {
    let device = RecordingDevice::new();
    let (mut ctx, mut renderer) = renderer(&device, RendererSettings::default());
    let mut scene = SceneBuilder::new(&ctx).build();
    let probe = ReflectionProbe::new(&mut ctx, Vec3::ZERO).unwrap();
    let cube = probe.cube().id();
    scene.set_probe(&mut ctx, Some(probe));

    renderer.render_frame(&mut ctx, &mut scene, &camera()).unwrap();
    scene.probe_mut().unwrap().set_position(Vec3::new(1.0, 0.0, 0.0));
    device.clear_submissions();
    let stats = renderer.render_frame(&mut ctx, &mut scene, &camera()).unwrap();

    assert_eq!(stats.probe_faces_captured, 6);
    assert_eq!(device.passes_labelled("probe face").len(), 6);
    assert_eq!(device.mipmap_generations(), vec![cube]);
}

#[test]
fn test_probe_round_robin_cycles_faces() {
    let device = RecordingDevice::new();
    let settings = RendererSettings {
        probe_refresh: ProbeRefreshPolicy::RoundRobin,
        ..Default::default()
    };
    let (mut ctx, mut renderer) = renderer(&device, settings);
    let mut scene = SceneBuilder::new(&ctx).build();
    let probe = ReflectionProbe::new(&mut ctx, Vec3::ZERO).unwrap();
    scene.set_probe(&mut ctx, Some(probe));

    for _ in 0..7 {
        renderer.render_frame(&mut ctx, &mut scene, &camera()).unwrap();
    }
    let labels: Vec<String> = device
        .passes_labelled("probe face")
        .into_iter()
        .map(|pass| pass.label)
        .collect();
    let expected: Vec<String> = [0, 1, 2, 3, 4, 5, 0]
        .iter()
        .map(|face| format!("probe face {face}"))
        .collect();
    assert_eq!(labels, expected);
}

#[test]
fn test_probe_every_frame_captures_all_faces() {
    assert_eq!(probe_faces(ProbeRefreshPolicy::EveryFrame, 2), vec![6, 6]);
}

#[test]
fn test_queued_tasks_run_before_recording() {
    let device = RecordingDevice::new();
    let (mut ctx, mut renderer) = renderer(&device, bloom_settings(4));
    let mut scene = SceneBuilder::new(&ctx).build();

    let sender = ctx.task_sender();
    let levels = sender
        .submit("read settings", |ctx| Ok(ctx.settings().bloom_levels))
        .unwrap();
    let broken = sender
        .submit("broken upload", |_ctx| {
            Err::<(), _>(TaskError::Failed("no pixels".into()))
        })
        .unwrap();
    let worker = {
        let sender = sender.clone();
        thread::spawn(move || sender.submit("from worker", |_ctx| Ok(7u8)).unwrap())
    };
    let from_worker = worker.join().unwrap();

    assert!(levels.try_result().is_none());
    let stats = renderer.render_frame(&mut ctx, &mut scene, &camera()).unwrap();

    assert_eq!(stats.tasks_run, 3);
    assert_eq!(stats.tasks_failed, 1);
    assert!(matches!(levels.try_result(), Some(Ok(4))));
    assert!(matches!(broken.try_result(), Some(Err(TaskError::Failed(_)))));
    assert!(matches!(from_worker.wait(), Ok(7)));

    // The queue is empty afterwards.
    let stats = renderer.render_frame(&mut ctx, &mut scene, &camera()).unwrap();
    assert_eq!(stats.tasks_run, 0);
}
