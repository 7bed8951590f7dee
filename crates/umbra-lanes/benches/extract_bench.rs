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

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use std::sync::Arc;
use umbra_core::math::{LinearRgba, Vec3};
use umbra_core::renderer::mesh::{MeshBuilder, VertexLayout};
use umbra_core::testing::{MemoryContent, RecordingDevice};
use umbra_core::{RenderContext, RendererSettings};
use umbra_data::{Attenuation, Camera, Light, Scene, StandardMaterial, Transform, WorldObject};
use umbra_lanes::render_lane::{cube_geometry, ExtractLane};

fn populated_scene(ctx: &RenderContext) -> Scene {
    let mut scene = Scene::new();
    let geometry = cube_geometry();
    let mesh = MeshBuilder::from_geometry(VertexLayout::standard(), &geometry)
        .build(ctx.device(), "cube")
        .expect("mesh");
    let mesh = scene.add_mesh(mesh);
    let material = scene.add_material(StandardMaterial::new("plain"));

    // A 50x50 grid of objects, half of it behind the camera.
    for x in 0..50 {
        for z in 0..50 {
            let position = Vec3::new(x as f32 * 3.0 - 75.0, 0.0, z as f32 * 3.0 - 75.0);
            scene.add_object(
                WorldObject::new(format!("cube {x} {z}"), mesh, material)
                    .with_transform(Transform::from_position(position)),
            );
        }
    }
    let attenuation = Attenuation {
        constant: 1.0,
        linear: 0.14,
        quadratic: 0.07,
    };
    for i in 0..200 {
        let position = Vec3::new((i % 20) as f32 * 7.0 - 70.0, 2.0, (i / 20) as f32 * 14.0 - 70.0);
        scene.add_light(Light::point(position, attenuation, LinearRgba::WHITE, 1.0));
    }
    scene.add_light(Light::directional(Vec3::NEG_Y, LinearRgba::WHITE, 1.0));
    scene
}

fn bench_extract(c: &mut Criterion) {
    let ctx = RenderContext::new(
        Arc::new(RecordingDevice::new()),
        Arc::new(MemoryContent::new()),
        RendererSettings::default(),
    )
    .expect("context");
    let scene = populated_scene(&ctx);
    let camera = Camera::new(Vec3::new(0.0, 5.0, 0.0), Vec3::NEG_Z, Vec3::Y);
    let lane = ExtractLane::new(ctx.settings().light_intensity_threshold);

    let mut group = c.benchmark_group("Frame Extraction");

    group.bench_function("Cull and sort 2500 objects, 200 lights", |b| {
        b.iter(|| {
            let world = lane.extract(black_box(&scene), black_box(&camera));
            black_box(world.objects.len());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_extract);
criterion_main!(benches);
