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

//! Renders a small scene on a real adapter and reads the headless output back.
//!
//! Machines without a usable adapter skip the test.

use std::sync::Arc;

use umbra_core::math::{Extent2D, LinearRgba, Vec3};
use umbra_core::renderer::mesh::{MeshBuilder, VertexLayout};
use umbra_core::{GraphicsDevice, RenderContext, RendererSettings};
use umbra_data::{Camera, Light, Scene, StandardMaterial, Transform, WorldObject};
use umbra_infra::{
    init_logging, FileSystemContent, WgpuContextOptions, WgpuDevice, WgpuGraphicsContext,
};
use umbra_lanes::render_lane::cube_geometry;
use umbra_lanes::{EmbeddedShaders, FrameRenderer, LaneKind};

const OUTPUT: Extent2D = Extent2D {
    width: 64,
    height: 48,
};

fn headless_device() -> Option<WgpuDevice> {
    init_logging("warn");
    match pollster::block_on(WgpuGraphicsContext::headless(WgpuContextOptions::default())) {
        Ok(context) => Some(WgpuDevice::new(Arc::new(std::sync::Mutex::new(context)))),
        Err(e) => {
            log::warn!("Skipping GPU test: {e}");
            None
        }
    }
}

#[test]
fn headless_frame_reads_back_the_output() {
    let Some(device) = headless_device() else {
        return;
    };
    assert_eq!(device.surface_format(), None);

    let shaders = tempfile::tempdir().unwrap();
    let content = EmbeddedShaders::new(Arc::new(FileSystemContent::new([shaders.path()])));
    let settings = RendererSettings {
        directional_shadow_size: 256,
        probe_resolution: 16,
        ..RendererSettings::default()
    };
    let mut ctx = RenderContext::new(Arc::new(device.clone()), Arc::new(content), settings).unwrap();
    let mut renderer = FrameRenderer::new(&mut ctx, OUTPUT).unwrap();

    let mut scene = Scene::new();
    let mesh = MeshBuilder::from_geometry(VertexLayout::standard(), &cube_geometry())
        .build(ctx.device(), "cube")
        .unwrap();
    let mesh = scene.add_mesh(mesh);
    let material = scene.add_material(StandardMaterial::new("plain"));
    scene.add_object(WorldObject::new("cube", mesh, material).with_transform(Transform::from_position(Vec3::ZERO)));
    let mut sun = Light::directional(Vec3::new(-0.3, -1.0, -0.2), LinearRgba::WHITE, 2.0);
    sun.set_casting_shadows(&mut ctx, true).unwrap();
    scene.add_light(sun);

    let camera = Camera::new(Vec3::new(0.0, 1.0, 4.0), Vec3::NEG_Z, Vec3::Y).with_projection(
        60f32.to_radians(),
        OUTPUT.aspect_ratio(),
        0.1,
        50.0,
    );

    let stats = renderer.render_frame(&mut ctx, &mut scene, &camera).unwrap();
    assert_eq!(stats.draws(LaneKind::Geometry), 1);

    let output = renderer.targets().headless_output().unwrap();
    let pixels = device.read_texture(output).unwrap();
    assert_eq!(pixels.len(), (OUTPUT.width * OUTPUT.height * 4) as usize);
    assert!(pixels.iter().any(|&byte| byte != 0));
}

#[test]
fn compile_errors_point_at_the_failing_line() {
    use umbra_core::renderer::api::{ShaderModuleDescriptor, ShaderSourceData};
    use umbra_core::renderer::error::{ResourceError, ShaderError};

    let Some(device) = headless_device() else {
        return;
    };
    let source = "@vertex\nfn vs_main() -> @builtin(position) vec4<f32> {\n    return undefined_value;\n}\n";
    let result = device.create_shader_module(&ShaderModuleDescriptor {
        label: Some("broken.wgsl"),
        source: ShaderSourceData::Wgsl(source.into()),
    });

    match result {
        Err(ResourceError::Shader(ShaderError::CompilationError { location, .. })) => {
            let location = location.unwrap();
            assert_eq!(location.file, "broken.wgsl");
            assert_eq!(location.line, 3);
        }
        other => panic!("expected a compilation error, got {other:?}"),
    }
}
