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

//! Visibility extraction: turns the scene and camera into a [`RenderWorld`].

use super::world::{RenderWorld, ShadowCaster, VisibleLight, VisibleObject};
use std::cmp::Ordering;
use umbra_data::{Camera, LightKind, Scene};

/// Builds the frame's [`RenderWorld`].
#[derive(Debug, Clone, Copy)]
pub struct ExtractLane {
    threshold: f32,
}

impl ExtractLane {
    /// An extractor deriving light ranges with the minimum visible intensity
    /// `threshold`.
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// A human-readable identifier, used in logs.
    pub fn strategy_name(&self) -> &'static str {
        "ExtractLane"
    }

    /// Culls and sorts the scene as seen by `camera`.
    pub fn extract(&self, scene: &Scene, camera: &Camera) -> RenderWorld {
        let frustum = camera.frustum();
        let eye = camera.position();
        let mut world = RenderWorld {
            eye,
            ..Default::default()
        };

        // 1. Objects: shadow casters regardless of visibility, then the
        //    frustum test on the transformed bounds.
        for (handle, object) in scene.objects() {
            let Some(mesh) = scene.mesh(object.mesh) else {
                log::debug!("ExtractLane: object '{}' has no mesh, skipped", object.name);
                continue;
            };
            let model = object.transform.matrix();
            if object.casting_shadows {
                world.shadow_casters.push(ShadowCaster {
                    model,
                    mesh: object.mesh,
                });
            }
            let bounds = mesh.bounds().transformed(&model);
            if !frustum.intersects_sphere(bounds.center, bounds.radius) {
                world.culled_objects += 1;
                continue;
            }
            world.objects.push(VisibleObject {
                handle,
                model,
                mesh: object.mesh,
                material: object.material,
                backface_culling: object.backface_culling,
                distance: bounds.center.distance(eye),
            });
        }
        world.objects.sort_by(|a, b| far_to_near(a.distance, b.distance));

        // 2. Lights: partitioned by kind, local lights culled by range.
        for (handle, light) in scene.lights() {
            let position = match *light.kind() {
                LightKind::Directional { .. } => {
                    world.directional_lights.push(handle);
                    continue;
                }
                LightKind::Point { position, .. } | LightKind::Spot { position, .. } => position,
            };
            let range = light.range(self.threshold);
            if !frustum.intersects_sphere(position, range) {
                world.culled_lights += 1;
                continue;
            }
            let visible = VisibleLight {
                handle,
                range,
                distance: position.distance(eye),
            };
            match light.kind() {
                LightKind::Point { .. } => world.point_lights.push(visible),
                _ => world.spot_lights.push(visible),
            }
        }
        world.point_lights.sort_by(|a, b| far_to_near(a.distance, b.distance));
        world.spot_lights.sort_by(|a, b| far_to_near(a.distance, b.distance));

        log::trace!(
            "ExtractLane: {} objects ({} culled), {} local lights ({} culled)",
            world.objects.len(),
            world.culled_objects,
            world.local_light_count(),
            world.culled_lights
        );
        world
    }
}

fn far_to_near(a: f32, b: f32) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use umbra_core::math::{LinearRgba, Vec3};
    use umbra_core::renderer::mesh::{Geometry, Mesh, MeshBuilder, VertexLayout};
    use umbra_core::testing::{MemoryContent, RecordingDevice};
    use umbra_core::{RenderContext, RendererSettings};
    use umbra_data::{Attenuation, Light, StandardMaterial, Transform, WorldObject};

    const THRESHOLD: f32 = 5.0 / 256.0;

    fn context() -> RenderContext {
        RenderContext::new(
            Arc::new(RecordingDevice::new()),
            Arc::new(MemoryContent::new()),
            RendererSettings::default(),
        )
        .unwrap()
    }

    fn unit_mesh(ctx: &RenderContext) -> Mesh {
        let geometry = Geometry {
            positions: vec![[-1.0, -1.0, 0.0], [1.0, -1.0, 0.0], [0.0, 1.0, 0.0]],
            ..Default::default()
        };
        MeshBuilder::from_geometry(VertexLayout::position_only(), &geometry)
            .build(ctx.device(), "triangle")
            .unwrap()
    }

    fn camera() -> Camera {
        Camera::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z, Vec3::Y)
    }

    fn scene_with_objects(ctx: &RenderContext, positions: &[Vec3]) -> Scene {
        let mut scene = Scene::new();
        let mesh = scene.add_mesh(unit_mesh(ctx));
        let material = scene.add_material(StandardMaterial::new("plain"));
        for (i, position) in positions.iter().enumerate() {
            scene.add_object(
                WorldObject::new(format!("object {i}"), mesh, material)
                    .with_transform(Transform::from_position(*position)),
            );
        }
        scene
    }

    #[test]
    fn test_objects_are_sorted_back_to_front() {
        let ctx = context();
        let scene = scene_with_objects(
            &ctx,
            &[Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -20.0), Vec3::ZERO],
        );
        let world = ExtractLane::new(THRESHOLD).extract(&scene, &camera());

        let distances: Vec<f32> = world.objects.iter().map(|o| o.distance).collect();
        assert_eq!(distances.len(), 3);
        assert!(distances.windows(2).all(|pair| pair[0] >= pair[1]));
    }

    #[test]
    fn test_objects_behind_camera_are_culled_but_cast_shadows() {
        let ctx = context();
        let scene = scene_with_objects(&ctx, &[Vec3::ZERO, Vec3::new(0.0, 0.0, 50.0)]);
        let world = ExtractLane::new(THRESHOLD).extract(&scene, &camera());

        assert_eq!(world.objects.len(), 1);
        assert_eq!(world.culled_objects, 1);
        assert_eq!(world.shadow_casters.len(), 2);
    }

    #[test]
    fn test_lights_partitioned_and_culled_by_range() {
        let ctx = context();
        let mut scene = scene_with_objects(&ctx, &[]);
        let attenuation = Attenuation {
            constant: 1.0,
            linear: 0.7,
            quadratic: 1.8,
        };
        scene.add_light(Light::directional(Vec3::NEG_Y, LinearRgba::WHITE, 1.0));
        scene.add_light(Light::point(Vec3::ZERO, attenuation, LinearRgba::WHITE, 1.0));
        scene.add_light(Light::point(Vec3::new(0.0, 0.0, -5.0), attenuation, LinearRgba::WHITE, 1.0));
        // Far behind the camera, well outside its own range.
        scene.add_light(Light::point(Vec3::new(0.0, 0.0, 100.0), attenuation, LinearRgba::WHITE, 1.0));

        let world = ExtractLane::new(THRESHOLD).extract(&scene, &camera());
        assert_eq!(world.directional_lights.len(), 1);
        assert_eq!(world.point_lights.len(), 2);
        assert_eq!(world.culled_lights, 1);
        assert!(world.point_lights[0].distance > world.point_lights[1].distance);
    }
}
