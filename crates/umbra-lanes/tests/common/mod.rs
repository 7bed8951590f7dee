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

//! Shared fixtures of the frame renderer integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use umbra_core::math::{Extent2D, LinearRgba, Vec3};
use umbra_core::renderer::mesh::{Mesh, MeshBuilder, VertexLayout};
use umbra_core::testing::{MemoryContent, RecordingDevice};
use umbra_core::{RenderContext, RendererSettings};
use umbra_data::{
    Attenuation, Camera, Light, LightHandle, MaterialHandle, MeshHandle, Scene, StandardMaterial,
    Transform, WorldObject,
};
use umbra_lanes::render_lane::cube_geometry;
use umbra_lanes::{EmbeddedShaders, FrameRenderer};

/// Output size used by most tests.
pub const OUTPUT: Extent2D = Extent2D {
    width: 320,
    height: 240,
};

/// A context over `device` serving the embedded shaders.
pub fn context(device: &RecordingDevice, settings: RendererSettings) -> RenderContext {
    let content = EmbeddedShaders::new(Arc::new(MemoryContent::new()));
    RenderContext::new(Arc::new(device.clone()), Arc::new(content), settings).unwrap()
}

/// A context plus a renderer at [`OUTPUT`].
pub fn renderer(device: &RecordingDevice, settings: RendererSettings) -> (RenderContext, FrameRenderer) {
    let mut ctx = context(device, settings);
    let renderer = FrameRenderer::new(&mut ctx, OUTPUT).unwrap();
    (ctx, renderer)
}

/// Camera at `+10 z` looking down `-z`.
pub fn camera() -> Camera {
    Camera::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z, Vec3::Y).with_projection(
        60f32.to_radians(),
        OUTPUT.aspect_ratio(),
        0.1,
        100.0,
    )
}

/// Unit cube in the standard vertex layout.
pub fn cube_mesh(ctx: &RenderContext) -> Mesh {
    let geometry = cube_geometry();
    MeshBuilder::from_geometry(VertexLayout::standard(), &geometry)
        .build(ctx.device(), "test cube")
        .unwrap()
}

/// A scene holding one cube mesh and one plain material.
pub struct SceneBuilder {
    pub scene: Scene,
    pub mesh: MeshHandle,
    pub material: MaterialHandle,
}

impl SceneBuilder {
    pub fn new(ctx: &RenderContext) -> Self {
        let mut scene = Scene::new();
        let mesh = scene.add_mesh(cube_mesh(ctx));
        let material = scene.add_material(StandardMaterial::new("plain"));
        Self {
            scene,
            mesh,
            material,
        }
    }

    /// Adds a cube at `position`.
    pub fn object(mut self, position: Vec3) -> Self {
        let name = format!("cube {}", self.scene.object_count());
        self.scene.add_object(
            WorldObject::new(name, self.mesh, self.material)
                .with_transform(Transform::from_position(position)),
        );
        self
    }

    /// Adds a cube drawn without backface culling.
    pub fn double_sided_object(mut self, position: Vec3) -> Self {
        let name = format!("leaf {}", self.scene.object_count());
        self.scene.add_object(
            WorldObject::new(name, self.mesh, self.material)
                .with_transform(Transform::from_position(position))
                .with_backface_culling(false),
        );
        self
    }

    pub fn build(self) -> Scene {
        self.scene
    }
}

/// A white point light of short range.
pub fn point_light(position: Vec3) -> Light {
    Light::point(position, short_attenuation(), LinearRgba::WHITE, 1.0)
}

/// Attenuation that fades out within a few units.
pub fn short_attenuation() -> Attenuation {
    Attenuation {
        constant: 1.0,
        linear: 0.7,
        quadratic: 1.8,
    }
}

/// Adds a directional light, optionally with its shadow map.
pub fn add_sun(ctx: &mut RenderContext, scene: &mut Scene, shadows: bool) -> LightHandle {
    let mut sun = Light::directional(Vec3::new(-0.3, -1.0, -0.2), LinearRgba::WHITE, 2.0);
    sun.set_casting_shadows(ctx, shadows).unwrap();
    scene.add_light(sun)
}
