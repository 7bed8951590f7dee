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

use common::{add_sun, camera, point_light, renderer, SceneBuilder};
use umbra_core::math::{LinearRgba, Mat4, Vec3};
use umbra_core::renderer::resource::TextureCube;
use umbra_core::renderer::TextureFormat;
use umbra_core::testing::{RecordedPass, RecordingDevice, ResourceKind};
use umbra_core::RendererSettings;
use umbra_data::{FoliageBatch, FoliageInstance, ReflectionProbe};
use umbra_lanes::{FrameRenderer, LaneKind};

fn stage(label: &str) -> usize {
    const STAGES: [&str; 10] = [
        "vsm", "probe face", "gbuffer", "foliage", "ssao", "light", "skybox", "bloom", "tonemap",
        "fxaa",
    ];
    STAGES
        .iter()
        .position(|prefix| label.starts_with(prefix))
        .or_else(|| label.starts_with("shadow map").then_some(0))
        .unwrap_or_else(|| panic!("unexpected pass '{label}'"))
}

fn labels(passes: &[RecordedPass]) -> Vec<&str> {
    passes.iter().map(|pass| pass.label.as_str()).collect()
}

#[test]
fn test_directional_shadow_scenario() {
    let device = RecordingDevice::new();
    let (mut ctx, mut renderer) = renderer(&device, RendererSettings::default());
    let mut scene = SceneBuilder::new(&ctx).object(Vec3::ZERO).build();
    add_sun(&mut ctx, &mut scene, true);
    device.clear_submissions();

    let stats = renderer.render_frame(&mut ctx, &mut scene, &camera()).unwrap();

    // (a) one clear and one caster batch into the moments, then two blur passes.
    let moments: Vec<_> = device
        .passes()
        .into_iter()
        .filter(|pass| pass.label == "vsm")
        .collect();
    assert_eq!(moments.len(), 1);
    assert!(moments[0].clears());
    assert_eq!(moments[0].draw_count(), 1);
    assert_eq!(
        labels(&device.passes_labelled("vsm blur")),
        vec!["vsm blur temp", "vsm blur"]
    );
    assert_eq!(stats.draws(LaneKind::Shadow), 3);

    // (b) every G-buffer attachment is written by exactly one pass.
    let passes = device.passes();
    for attachment in 0..3 {
        let texture = renderer.targets().gbuffer.color_texture(attachment).unwrap();
        let writers = passes.iter().filter(|pass| pass.writes_texture(texture)).count();
        assert_eq!(writers, 1, "G-buffer attachment {attachment}");
    }

    // (c) the surface is written once, by FXAA.
    let surface: Vec<_> = passes.iter().filter(|pass| pass.targets_surface()).collect();
    assert_eq!(surface.len(), 1);
    assert_eq!(surface[0].label, "fxaa");
    assert_eq!(surface[0].draw_count(), 1);

    // (d) no framebuffer failed its completeness check.
    assert_eq!(ctx.framebuffer_stats().failures, 0);
    assert_eq!(device.submission_count(), 1);
    assert_eq!(stats.passes as usize, passes.len());
}

#[test]
fn test_lights_out_of_range_issue_no_volume_draws() {
    let device = RecordingDevice::new();
    let (mut ctx, mut renderer) = renderer(&device, RendererSettings::default());
    let mut scene = SceneBuilder::new(&ctx).object(Vec3::ZERO).build();
    // Both behind the camera, far beyond their own range.
    scene.add_light(point_light(Vec3::new(0.0, 0.0, 40.0)));
    scene.add_light(point_light(Vec3::new(5.0, 0.0, 60.0)));
    device.clear_submissions();

    let stats = renderer.render_frame(&mut ctx, &mut scene, &camera()).unwrap();

    assert_eq!(stats.culled_lights, 2);
    assert_eq!(stats.light_stencil_draws, 0);
    assert_eq!(stats.light_additive_draws, 0);
    assert_eq!(stats.ambient_passes, 1);
    assert!(device.passes_labelled("light volume").is_empty());
    assert!(device.passes_labelled("light directional").is_empty());

    let ambient = device.passes_labelled("light ambient");
    assert_eq!(ambient.len(), 1);
    assert!(ambient[0].clears());
    assert_eq!(ambient[0].draw_count(), 1);
}

#[test]
fn test_visible_point_light_marks_stencil_then_shades() {
    let device = RecordingDevice::new();
    let (mut ctx, mut renderer) = renderer(&device, RendererSettings::default());
    let mut scene = SceneBuilder::new(&ctx).object(Vec3::ZERO).build();
    scene.add_light(point_light(Vec3::new(0.0, 1.0, 0.0)));
    device.clear_submissions();

    let stats = renderer.render_frame(&mut ctx, &mut scene, &camera()).unwrap();
    assert_eq!(stats.light_stencil_draws, 1);
    assert_eq!(stats.light_additive_draws, 1);

    let volumes = device.passes_labelled("light volume");
    assert_eq!(volumes.len(), 1);
    let volume = &volumes[0];
    assert_eq!(volume.depth_load, None);
    assert!(matches!(
        volume.stencil_load,
        Some(umbra_core::renderer::LoadOp::Clear(0))
    ));
    let pipelines: Vec<String> = volume
        .draws
        .iter()
        .map(|draw| device.pipeline_label(draw.pipeline.unwrap()))
        .collect();
    assert_eq!(pipelines, vec!["light_stencil", "light_point"]);
    assert!(volume.draws.iter().all(|draw| draw.indexed));
}

#[test]
fn test_passes_follow_the_fixed_order() {
    let device = RecordingDevice::new();
    let (mut ctx, mut renderer) = renderer(&device, RendererSettings::default());
    let built = SceneBuilder::new(&ctx).object(Vec3::ZERO);
    let (mesh, material) = (built.mesh, built.material);
    let mut scene = built.build();
    add_sun(&mut ctx, &mut scene, true);
    scene.add_light(point_light(Vec3::new(0.0, 1.0, 0.0)));
    let probe = ReflectionProbe::new(&mut ctx, Vec3::new(0.0, 2.0, 0.0)).unwrap();
    scene.set_probe(&mut ctx, Some(probe));
    let sky = TextureCube::new(&mut ctx, "sky", TextureFormat::Rgba16Float, 16, false).unwrap();
    scene.set_sky(&mut ctx, Some(sky));
    let mut grass = FoliageBatch::new(mesh, material);
    grass.push_instance(FoliageInstance::new(Mat4::IDENTITY, LinearRgba::WHITE));
    scene.add_foliage(grass);
    device.clear_submissions();

    let stats = renderer.render_frame(&mut ctx, &mut scene, &camera()).unwrap();

    let passes = device.passes();
    let stages: Vec<usize> = passes.iter().map(|pass| stage(&pass.label)).collect();
    assert!(
        stages.windows(2).all(|pair| pair[0] <= pair[1]),
        "out of order: {:?}",
        labels(&passes)
    );
    // Every stage ran.
    for expected in 0..10 {
        assert!(stages.contains(&expected), "stage {expected} missing");
    }
    for lane in LaneKind::ALL {
        assert!(stats.draws(lane) > 0, "{lane} drew nothing");
    }
    assert_eq!(stats.probe_faces_captured, 6);
    assert_eq!(stats.foliage_uploads, 1);
}

#[test]
fn test_optional_lanes_are_skipped() {
    let device = RecordingDevice::new();
    let (mut ctx, mut renderer) = renderer(&device, RendererSettings::default());
    let mut scene = SceneBuilder::new(&ctx).object(Vec3::ZERO).build();
    device.clear_submissions();

    let stats = renderer.render_frame(&mut ctx, &mut scene, &camera()).unwrap();

    for prefix in ["vsm", "shadow map", "probe face", "foliage", "skybox", "light volume"] {
        assert!(device.passes_labelled(prefix).is_empty(), "{prefix} ran");
    }
    assert_eq!(stats.draws(LaneKind::Skybox), 0);
    assert_eq!(stats.draws(LaneKind::Probe), 0);
    assert_eq!(stats.draws(LaneKind::Foliage), 0);
    assert_eq!(stats.draws(LaneKind::Geometry), 1);
}

#[test]
fn test_disabled_ssao_binds_white() {
    let device = RecordingDevice::new();
    let settings = RendererSettings {
        ssao_enabled: false,
        ..Default::default()
    };
    let (mut ctx, mut renderer) = renderer(&device, settings);
    let mut scene = SceneBuilder::new(&ctx).object(Vec3::ZERO).build();
    device.clear_submissions();

    let stats = renderer.render_frame(&mut ctx, &mut scene, &camera()).unwrap();

    assert!(device.passes_labelled("ssao").is_empty());
    assert_eq!(stats.draws(LaneKind::Ssao), 0);
    let white = ctx.sentinel(umbra_core::renderer::resource::SentinelKind::White);
    let ambient = &device.passes_labelled("light ambient")[0];
    let binds_white = ambient.bind_groups.iter().any(|(_, group)| {
        device
            .bind_group_textures(*group)
            .iter()
            .any(|(_, texture)| *texture == white)
    });
    assert!(binds_white);
}

#[test]
fn test_headless_output_is_an_owned_texture() {
    let device = RecordingDevice::headless();
    let (mut ctx, mut renderer) = renderer(&device, RendererSettings::default());
    let mut scene = SceneBuilder::new(&ctx).object(Vec3::ZERO).build();
    device.clear_submissions();

    renderer.render_frame(&mut ctx, &mut scene, &camera()).unwrap();

    let output = renderer.targets().headless_output().unwrap();
    let passes = device.passes();
    assert!(passes.iter().all(|pass| !pass.targets_surface()));
    let writers: Vec<_> = passes.iter().filter(|pass| pass.writes_texture(output)).collect();
    assert_eq!(writers.len(), 1);
    assert_eq!(writers[0].label, "fxaa");
}

#[test]
fn test_shader_failure_is_fatal_and_unwinds() {
    let device = RecordingDevice::new();
    device.fail_shader_containing("exp(-color * exposure)");
    let mut ctx = common::context(&device, RendererSettings::default());
    let pipelines_before = device.live_count(ResourceKind::RenderPipeline);

    let result = FrameRenderer::new(&mut ctx, common::OUTPUT);

    assert!(result.is_err());
    assert_eq!(device.live_count(ResourceKind::RenderPipeline), pipelines_before);
}

#[test]
fn test_incomplete_target_is_fatal() {
    let device = RecordingDevice::new();
    device.fail_storage_for("gbuffer color");
    let mut ctx = common::context(&device, RendererSettings::default());

    assert!(FrameRenderer::new(&mut ctx, common::OUTPUT).is_err());
    assert!(ctx.framebuffer_stats().failures > 0);
}

#[test]
fn test_resize_rebuilds_targets() {
    let device = RecordingDevice::new();
    let settings = RendererSettings {
        render_scale: 0.5,
        ..Default::default()
    };
    let (mut ctx, mut renderer) = renderer(&device, settings);
    let old_hdr = renderer.targets().hdr_texture().unwrap();

    renderer
        .resize(&mut ctx, umbra_core::math::Extent2D::new(640, 480))
        .unwrap();

    assert_eq!(renderer.internal_size(), umbra_core::math::Extent2D::new(320, 240));
    assert_ne!(renderer.targets().hdr_texture(), Some(old_hdr));
    assert_eq!(device.live_labels(ResourceKind::Texture, "hdr").len(), 1);
    assert_eq!(
        renderer.bloom_level_sizes()[0],
        umbra_core::math::Extent2D::new(160, 120)
    );

    let mut scene = SceneBuilder::new(&ctx).object(Vec3::ZERO).build();
    renderer.render_frame(&mut ctx, &mut scene, &camera()).unwrap();
    assert_eq!(renderer.frame_count(), 1);
}

#[test]
fn test_failed_resize_keeps_previous_size() {
    let device = RecordingDevice::new();
    let (mut ctx, mut renderer) = renderer(&device, RendererSettings::default());
    let old_hdr = renderer.targets().hdr_texture();
    let levels = renderer.bloom_level_sizes();
    let in_use = |ctx: &umbra_core::RenderContext| {
        device.live_texture_count() - ctx.texture_pool().available()
    };
    let textures = in_use(&ctx);
    device.fail_storage_for("bloom temp 3");

    assert!(renderer
        .resize(&mut ctx, umbra_core::math::Extent2D::new(640, 480))
        .is_err());

    assert_eq!(renderer.output_size(), common::OUTPUT);
    assert_eq!(renderer.targets().hdr_texture(), old_hdr);
    assert_eq!(renderer.bloom_level_sizes(), levels);
    assert_eq!(device.live_labels(ResourceKind::Texture, "hdr").len(), 1);
    assert_eq!(in_use(&ctx), textures);

    let mut scene = SceneBuilder::new(&ctx).object(Vec3::ZERO).build();
    renderer.render_frame(&mut ctx, &mut scene, &camera()).unwrap();
    assert_eq!(renderer.frame_count(), 1);
}
