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

//! The scene: every object, light and environment resource the frame
//! renderer draws.

use crate::arena::{Arena, Handle};
use crate::foliage::FoliageBatch;
use crate::light::Light;
use crate::object::WorldObject;
use crate::probe::ReflectionProbe;
use umbra_core::math::LinearRgba;
use umbra_core::renderer::material::Material;
use umbra_core::renderer::mesh::Mesh;
use umbra_core::renderer::resource::TextureCube;
use umbra_core::RenderContext;

/// Handle to a mesh owned by a [`Scene`].
pub type MeshHandle = Handle<Mesh>;
/// Handle to a material owned by a [`Scene`].
pub type MaterialHandle = Handle<Box<dyn Material>>;
/// Handle to a world object owned by a [`Scene`].
pub type ObjectHandle = Handle<WorldObject>;
/// Handle to a light owned by a [`Scene`].
pub type LightHandle = Handle<Light>;

/// Owner of the scene's GPU resources.
///
/// Meshes and materials are shared through handles; world objects and
/// foliage batches reference them. [`Scene::dispose`] releases everything
/// exactly once.
#[derive(Debug)]
pub struct Scene {
    meshes: Arena<Mesh>,
    materials: Arena<Box<dyn Material>>,
    objects: Arena<WorldObject>,
    lights: Arena<Light>,
    foliage: Vec<FoliageBatch>,
    probe: Option<ReflectionProbe>,
    sky: Option<TextureCube>,
    ambient: LinearRgba,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            meshes: Arena::new(),
            materials: Arena::new(),
            objects: Arena::new(),
            lights: Arena::new(),
            foliage: Vec::new(),
            probe: None,
            sky: None,
            ambient: LinearRgba::rgb(0.03, 0.03, 0.03),
        }
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshHandle {
        self.meshes.insert(mesh)
    }

    pub fn add_material(&mut self, material: impl Material + 'static) -> MaterialHandle {
        self.materials.insert(Box::new(material))
    }

    pub fn add_object(&mut self, object: WorldObject) -> ObjectHandle {
        self.objects.insert(object)
    }

    pub fn add_light(&mut self, light: Light) -> LightHandle {
        self.lights.insert(light)
    }

    pub fn add_foliage(&mut self, batch: FoliageBatch) -> usize {
        self.foliage.push(batch);
        self.foliage.len() - 1
    }

    pub fn mesh(&self, handle: MeshHandle) -> Option<&Mesh> {
        self.meshes.get(handle)
    }

    pub fn material(&self, handle: MaterialHandle) -> Option<&dyn Material> {
        self.materials.get(handle).map(|m| m.as_ref())
    }

    pub fn material_mut(&mut self, handle: MaterialHandle) -> Option<&mut (dyn Material + 'static)> {
        self.materials.get_mut(handle).map(|m| m.as_mut())
    }

    pub fn object(&self, handle: ObjectHandle) -> Option<&WorldObject> {
        self.objects.get(handle)
    }

    pub fn object_mut(&mut self, handle: ObjectHandle) -> Option<&mut WorldObject> {
        self.objects.get_mut(handle)
    }

    /// Removes an object; its mesh and material stay in the scene.
    pub fn remove_object(&mut self, handle: ObjectHandle) -> Option<WorldObject> {
        self.objects.remove(handle)
    }

    pub fn objects(&self) -> impl Iterator<Item = (ObjectHandle, &WorldObject)> {
        self.objects.iter()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn light(&self, handle: LightHandle) -> Option<&Light> {
        self.lights.get(handle)
    }

    pub fn light_mut(&mut self, handle: LightHandle) -> Option<&mut Light> {
        self.lights.get_mut(handle)
    }

    pub fn lights(&self) -> impl Iterator<Item = (LightHandle, &Light)> {
        self.lights.iter()
    }

    /// Removes a light and releases its shadow resource.
    pub fn remove_light(&mut self, ctx: &mut RenderContext, handle: LightHandle) -> bool {
        match self.lights.remove(handle) {
            Some(light) => {
                light.dispose(ctx);
                true
            }
            None => false,
        }
    }

    pub fn foliage(&self) -> &[FoliageBatch] {
        &self.foliage
    }

    pub fn foliage_mut(&mut self) -> &mut [FoliageBatch] {
        &mut self.foliage
    }

    pub fn probe(&self) -> Option<&ReflectionProbe> {
        self.probe.as_ref()
    }

    pub fn probe_mut(&mut self) -> Option<&mut ReflectionProbe> {
        self.probe.as_mut()
    }

    /// Installs the reflection probe, releasing the previous one.
    pub fn set_probe(&mut self, ctx: &mut RenderContext, probe: Option<ReflectionProbe>) {
        if let Some(previous) = std::mem::replace(&mut self.probe, probe) {
            previous.dispose(ctx);
        }
    }

    pub fn sky(&self) -> Option<&TextureCube> {
        self.sky.as_ref()
    }

    /// Installs the sky cube map, releasing the previous one.
    pub fn set_sky(&mut self, ctx: &mut RenderContext, sky: Option<TextureCube>) {
        if let Some(previous) = std::mem::replace(&mut self.sky, sky) {
            if let Err(e) = previous.dispose(ctx) {
                log::warn!("Failed to release sky cube map: {e}");
            }
        }
    }

    /// Ambient light added where no probe is present.
    pub fn ambient(&self) -> LinearRgba {
        self.ambient
    }

    pub fn set_ambient(&mut self, ambient: LinearRgba) {
        self.ambient = ambient;
    }

    /// The mesh and material of one draw, borrowed together.
    pub fn draw_resources(
        &mut self,
        mesh: MeshHandle,
        material: MaterialHandle,
    ) -> Option<(&Mesh, &mut (dyn Material + 'static))> {
        let mesh = self.meshes.get(mesh)?;
        let material = self.materials.get_mut(material)?;
        Some((mesh, material.as_mut()))
    }

    /// A foliage batch with its mesh and material, borrowed together.
    pub fn foliage_draw(
        &mut self,
        index: usize,
    ) -> Option<(&FoliageBatch, &Mesh, &mut (dyn Material + 'static))> {
        let batch = self.foliage.get(index)?;
        let mesh = self.meshes.get(batch.mesh())?;
        let material = self.materials.get_mut(batch.material())?;
        Some((batch, mesh, material.as_mut()))
    }

    /// Releases every GPU resource of the scene.
    pub fn dispose(mut self, ctx: &mut RenderContext) {
        for batch in self.foliage.drain(..) {
            batch.dispose(ctx);
        }
        for light in self.lights.drain() {
            light.dispose(ctx);
        }
        for material in self.materials.drain() {
            material.dispose(ctx);
        }
        for mesh in self.meshes.drain() {
            let label = mesh.label().to_string();
            if let Err(e) = mesh.dispose(ctx.device()) {
                log::warn!("Failed to release mesh '{label}': {e}");
            }
        }
        self.set_probe(ctx, None);
        self.set_sky(ctx, None);
        log::debug!("Scene disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::Attenuation;
    use crate::material::StandardMaterial;
    use std::sync::Arc;
    use umbra_core::math::Vec3;
    use umbra_core::renderer::mesh::{Geometry, MeshBuilder, VertexLayout};
    use umbra_core::testing::{MemoryContent, RecordingDevice, ResourceKind};
    use umbra_core::RendererSettings;

    fn context(device: &RecordingDevice) -> RenderContext {
        let settings = RendererSettings {
            directional_shadow_size: 64,
            spot_shadow_size: 64,
            point_shadow_size: 32,
            probe_resolution: 16,
            ..RendererSettings::default()
        };
        RenderContext::new(Arc::new(device.clone()), Arc::new(MemoryContent::new()), settings).unwrap()
    }

    fn triangle(ctx: &RenderContext) -> Mesh {
        let geometry = Geometry {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            ..Geometry::default()
        };
        MeshBuilder::from_geometry(VertexLayout::standard(), &geometry)
            .build(ctx.device(), "triangle")
            .unwrap()
    }

    #[test]
    fn test_stale_handles_resolve_to_none() {
        let device = RecordingDevice::new();
        let ctx = context(&device);
        let mut scene = Scene::new();
        let mesh = scene.add_mesh(triangle(&ctx));
        let material = scene.add_material(StandardMaterial::new("plain"));
        let object = scene.add_object(WorldObject::new("a", mesh, material));
        assert!(scene.remove_object(object).is_some());
        assert!(scene.object(object).is_none());
        let again = scene.add_object(WorldObject::new("b", mesh, material));
        assert_ne!(again, object);
        assert!(scene.draw_resources(mesh, material).is_some());
    }

    #[test]
    fn test_dispose_releases_everything_once() {
        let device = RecordingDevice::new();
        let mut ctx = context(&device);
        let textures_before = device.live_count(ResourceKind::Texture);
        let buffers_before = device.live_buffer_count();

        let mut scene = Scene::new();
        let mesh = scene.add_mesh(triangle(&ctx));
        let material = scene.add_material(StandardMaterial::new("plain"));
        scene.add_object(WorldObject::new("tri", mesh, material));

        let mut sun = Light::directional(Vec3::NEG_Y, LinearRgba::WHITE, 1.0);
        sun.set_casting_shadows(&mut ctx, true).unwrap();
        scene.add_light(sun);
        let mut spot = Light::spot(Vec3::Y, Vec3::NEG_Y, 0.2, 0.3, Attenuation::default(), LinearRgba::WHITE, 1.0);
        spot.set_casting_shadows(&mut ctx, true).unwrap();
        scene.add_light(spot);

        let probe = ReflectionProbe::new(&mut ctx, Vec3::ZERO).unwrap();
        scene.set_probe(&mut ctx, Some(probe));

        scene.dispose(&mut ctx);
        assert_eq!(device.live_buffer_count(), buffers_before);
        // Pooled names of disposed textures are destroyed as well, so only
        // names still waiting in the pool can remain above the baseline.
        assert!(device.live_count(ResourceKind::Texture) <= textures_before + ctx.texture_pool().available());
        assert!(device.live_labels(ResourceKind::Texture, "vsm").is_empty());
        assert!(device.live_labels(ResourceKind::Texture, "probe").is_empty());
        assert!(device.live_labels(ResourceKind::Texture, "shadow map").is_empty());
    }
}
