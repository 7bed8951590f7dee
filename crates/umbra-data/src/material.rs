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

//! The standard textured material.

use umbra_core::renderer::api::{
    BindGroupDescriptor, BindGroupEntry, BindGroupId, BindingResource, TextureBinding, TextureId,
};
use umbra_core::renderer::material::{Material, MaterialFactors, SamplerUnit};
use umbra_core::renderer::resource::{ColorSpace, ImageDecoder, SentinelKind, Texture2d, TextureOptions};
use umbra_core::renderer::{RenderPass, ResourceError};
use umbra_core::{ContentError, RenderContext};

#[derive(Debug, Default)]
enum MapSlot {
    #[default]
    Empty,
    Loaded(Texture2d),
    Failed {
        path: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BoundTexture {
    texture: TextureId,
    revision: u64,
}

#[derive(Debug)]
struct CachedBindGroup {
    id: BindGroupId,
    bound: [BoundTexture; SamplerUnit::COUNT],
}

/// Sentinel used when `unit` has no map.
pub fn fallback_sentinel(unit: SamplerUnit) -> SentinelKind {
    match unit {
        SamplerUnit::Normal => SentinelKind::FlatNormal,
        SamplerUnit::Albedo
        | SamplerUnit::Roughness
        | SamplerUnit::Metal
        | SamplerUnit::AmbientOcclusion => SentinelKind::White,
        SamplerUnit::Height | SamplerUnit::Emissive => SentinelKind::Black,
    }
}

fn color_space_of(unit: SamplerUnit) -> ColorSpace {
    match unit {
        SamplerUnit::Albedo | SamplerUnit::Emissive => ColorSpace::Srgb,
        _ => ColorSpace::Linear,
    }
}

/// A material with one optional texture per [`SamplerUnit`] and scalar
/// factors.
///
/// Missing maps are replaced by sentinel textures when bound. An albedo map
/// that was named but failed to load shows the checkerboard.
#[derive(Debug)]
pub struct StandardMaterial {
    name: String,
    factors: MaterialFactors,
    maps: [MapSlot; SamplerUnit::COUNT],
    warned: [bool; SamplerUnit::COUNT],
    bind_group: Option<CachedBindGroup>,
    bind_group_builds: u64,
}

impl StandardMaterial {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            factors: MaterialFactors::default(),
            maps: Default::default(),
            warned: [false; SamplerUnit::COUNT],
            bind_group: None,
            bind_group_builds: 0,
        }
    }

    pub fn with_factors(mut self, factors: MaterialFactors) -> Self {
        self.factors = factors;
        self
    }

    pub fn set_factors(&mut self, factors: MaterialFactors) {
        self.factors = factors;
    }

    /// Installs `texture` in `unit`, releasing the texture it replaces.
    pub fn set_map(&mut self, ctx: &mut RenderContext, unit: SamplerUnit, texture: Texture2d) {
        let previous = std::mem::replace(&mut self.maps[unit as usize], MapSlot::Loaded(texture));
        self.warned[unit as usize] = false;
        release(ctx, previous);
    }

    /// Reads `path` through the context's content resolver, decodes it and
    /// uploads it with mipmaps into `unit`.
    ///
    /// A failure leaves the slot marked as failed and returns the error; the
    /// material stays usable with a sentinel in that slot.
    pub fn load_map(
        &mut self,
        ctx: &mut RenderContext,
        unit: SamplerUnit,
        path: &str,
        decoder: &dyn ImageDecoder,
    ) -> Result<(), ResourceError> {
        match self.load_texture(ctx, unit, path, decoder) {
            Ok(texture) => {
                self.set_map(ctx, unit, texture);
                Ok(())
            }
            Err(e) => {
                log::warn!("Material '{}': failed to load {unit:?} map '{path}': {e}", self.name);
                let previous = std::mem::replace(
                    &mut self.maps[unit as usize],
                    MapSlot::Failed {
                        path: path.to_string(),
                    },
                );
                self.warned[unit as usize] = false;
                release(ctx, previous);
                Err(e)
            }
        }
    }

    fn load_texture(
        &self,
        ctx: &mut RenderContext,
        unit: SamplerUnit,
        path: &str,
        decoder: &dyn ImageDecoder,
    ) -> Result<Texture2d, ResourceError> {
        let bytes = ctx.content().read_bytes(path).map_err(|e| match e {
            ContentError::NotFound(_) => ResourceError::NotFound,
            other => ResourceError::BackendError(other.to_string()),
        })?;
        let image = decoder
            .decode(path, &bytes, color_space_of(unit))
            .map_err(|e| ResourceError::BackendError(e.to_string()))?;

        let mut texture = Texture2d::from_pool(ctx)?;
        let options = TextureOptions {
            generate_mipmaps: true,
            label: Some(format!("{} {unit:?}", self.name)),
        };
        if let Err(e) = texture.set_image_data(ctx, &image, &options) {
            if let Err(destroy) = texture.dispose(ctx) {
                log::warn!("Failed to release texture of '{path}': {destroy}");
            }
            return Err(e);
        }
        Ok(texture)
    }

    /// `true` when `unit` holds a loaded texture.
    pub fn has_map(&self, unit: SamplerUnit) -> bool {
        matches!(self.maps[unit as usize], MapSlot::Loaded(_))
    }

    /// Path of the map that failed to load in `unit`, if any.
    pub fn failed_path(&self, unit: SamplerUnit) -> Option<&str> {
        match &self.maps[unit as usize] {
            MapSlot::Failed { path } => Some(path),
            _ => None,
        }
    }

    /// The texture bound for `unit`: the loaded map or its sentinel.
    pub fn resolve_texture(&self, ctx: &RenderContext, unit: SamplerUnit) -> TextureId {
        match &self.maps[unit as usize] {
            MapSlot::Loaded(texture) => texture.id(),
            MapSlot::Failed { .. } if unit == SamplerUnit::Albedo => {
                ctx.sentinel(SentinelKind::Checkerboard)
            }
            MapSlot::Failed { .. } | MapSlot::Empty => ctx.sentinel(fallback_sentinel(unit)),
        }
    }

    /// How many times the bind group was (re)built.
    pub fn bind_group_builds(&self) -> u64 {
        self.bind_group_builds
    }

    fn warn_substitutions(&mut self) {
        for unit in SamplerUnit::ALL {
            let index = unit as usize;
            if self.warned[index] {
                continue;
            }
            if let MapSlot::Failed { path } = &self.maps[index] {
                let kind = if unit == SamplerUnit::Albedo {
                    SentinelKind::Checkerboard
                } else {
                    fallback_sentinel(unit)
                };
                log::warn!(
                    "Material '{}': {unit:?} map '{path}' is missing, using {kind:?}",
                    self.name
                );
                self.warned[index] = true;
            }
        }
    }

    fn ensure_bind_group(&mut self, ctx: &RenderContext) -> Result<BindGroupId, ResourceError> {
        let bound = SamplerUnit::ALL.map(|unit| {
            let texture = self.resolve_texture(ctx, unit);
            BoundTexture {
                texture,
                revision: ctx.texture_revision(texture),
            }
        });
        if let Some(cached) = &self.bind_group {
            if cached.bound == bound {
                return Ok(cached.id);
            }
        }

        let mut entries: Vec<BindGroupEntry> = SamplerUnit::ALL
            .iter()
            .zip(bound.iter())
            .map(|(unit, slot)| BindGroupEntry {
                binding: unit.binding(),
                resource: BindingResource::Texture(TextureBinding::d2(slot.texture)),
            })
            .collect();
        entries.push(BindGroupEntry {
            binding: SamplerUnit::SAMPLER_BINDING,
            resource: BindingResource::Sampler(ctx.samplers().linear_repeat),
        });
        let label = format!("material {}", self.name);
        let id = ctx.device().create_bind_group(&BindGroupDescriptor {
            label: Some(&label),
            layout: ctx.layouts().material,
            entries: &entries,
        })?;

        if let Some(stale) = self.bind_group.replace(CachedBindGroup { id, bound }) {
            if let Err(e) = ctx.device().destroy_bind_group(stale.id) {
                log::warn!("Material '{}': failed to release bind group: {e}", self.name);
            }
        }
        self.bind_group_builds += 1;
        Ok(id)
    }
}

fn release(ctx: &mut RenderContext, slot: MapSlot) {
    if let MapSlot::Loaded(texture) = slot {
        if let Err(e) = texture.dispose(ctx) {
            log::warn!("Failed to release material texture: {e}");
        }
    }
}

impl Material for StandardMaterial {
    fn name(&self) -> &str {
        &self.name
    }

    fn factors(&self) -> MaterialFactors {
        self.factors
    }

    fn set_uniforms<'p>(
        &mut self,
        ctx: &mut RenderContext,
        pass: &mut dyn RenderPass<'p>,
        group: u32,
    ) -> Result<(), ResourceError> {
        self.warn_substitutions();
        let bind_group = self.ensure_bind_group(ctx)?;
        pass.set_bind_group(group, bind_group, &[]);
        Ok(())
    }

    fn dispose(self: Box<Self>, ctx: &mut RenderContext) {
        let this = *self;
        if let Some(cached) = this.bind_group {
            if let Err(e) = ctx.device().destroy_bind_group(cached.id) {
                log::warn!("Material '{}': failed to release bind group: {e}", this.name);
            }
        }
        for slot in this.maps {
            release(ctx, slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use umbra_core::math::{Extent2D, LinearRgba};
    use umbra_core::renderer::api::TextureFormat;
    use umbra_core::renderer::resource::{ColorTarget, Framebuffer, PassOps};
    use umbra_core::testing::{MemoryContent, RecordingDevice, ResourceKind, SolidImageDecoder};
    use umbra_core::RendererSettings;

    fn context(device: &RecordingDevice, content: MemoryContent) -> RenderContext {
        RenderContext::new(Arc::new(device.clone()), Arc::new(content), RendererSettings::default()).unwrap()
    }

    fn bind(material: &mut StandardMaterial, ctx: &mut RenderContext) -> BindGroupId {
        let target = Framebuffer::builder("target", Extent2D::new(4, 4))
            .color(ColorTarget::owned(TextureFormat::Rgba8Unorm))
            .build(ctx)
            .unwrap();
        let mut encoder = ctx.device().create_command_encoder(Some("material test"));
        {
            let mut pass = target.begin_pass(ctx, encoder.as_mut(), &PassOps::load());
            material.set_uniforms(ctx, pass.as_mut(), 2).unwrap();
        }
        let commands = encoder.finish();
        ctx.device().submit_command_buffer(commands);
        target.dispose(ctx);
        material.bind_group.as_ref().unwrap().id
    }

    #[test]
    fn test_missing_maps_fall_back_to_sentinels() {
        let device = RecordingDevice::new();
        let mut ctx = context(&device, MemoryContent::new());
        let mut material = StandardMaterial::new("bare");
        let group = bind(&mut material, &mut ctx);

        let bound = device.bind_group_textures(group);
        let expect = |unit: SamplerUnit, kind: SentinelKind| {
            assert!(
                bound.contains(&(unit.binding(), ctx.sentinel(kind))),
                "{unit:?} should bind {kind:?}"
            );
        };
        expect(SamplerUnit::Albedo, SentinelKind::White);
        expect(SamplerUnit::Roughness, SentinelKind::White);
        expect(SamplerUnit::Metal, SentinelKind::White);
        expect(SamplerUnit::Normal, SentinelKind::FlatNormal);
        expect(SamplerUnit::AmbientOcclusion, SentinelKind::White);
        expect(SamplerUnit::Height, SentinelKind::Black);
        expect(SamplerUnit::Emissive, SentinelKind::Black);
    }

    #[test]
    fn test_failed_albedo_shows_checkerboard() {
        let device = RecordingDevice::new();
        let mut ctx = context(&device, MemoryContent::new());
        let mut material = StandardMaterial::new("broken");
        assert!(material
            .load_map(&mut ctx, SamplerUnit::Albedo, "textures/missing.png", &SolidImageDecoder)
            .is_err());
        assert_eq!(material.failed_path(SamplerUnit::Albedo), Some("textures/missing.png"));

        let group = bind(&mut material, &mut ctx);
        let bound = device.bind_group_textures(group);
        assert!(bound.contains(&(0, ctx.sentinel(SentinelKind::Checkerboard))));
    }

    #[test]
    fn test_bind_group_rebuilds_only_on_revision_change() {
        let device = RecordingDevice::new();
        let content = MemoryContent::new()
            .with_bytes("textures/rock.png", &[200, 180, 160, 255])
            .with_bytes("textures/moss.png", &[20, 160, 40, 255]);
        let mut ctx = context(&device, content);
        let mut material = StandardMaterial::new("rock");
        material
            .load_map(&mut ctx, SamplerUnit::Albedo, "textures/rock.png", &SolidImageDecoder)
            .unwrap();
        assert!(material.has_map(SamplerUnit::Albedo));

        let first = bind(&mut material, &mut ctx);
        bind(&mut material, &mut ctx);
        assert_eq!(material.bind_group_builds(), 1);

        material
            .load_map(&mut ctx, SamplerUnit::Albedo, "textures/moss.png", &SolidImageDecoder)
            .unwrap();
        let second = bind(&mut material, &mut ctx);
        assert_eq!(material.bind_group_builds(), 2);
        assert_ne!(first, second);
        assert_eq!(device.live_labels(ResourceKind::BindGroup, "material rock").len(), 1);
    }

    #[test]
    fn test_dispose_releases_textures_and_bind_group() {
        let device = RecordingDevice::new();
        let content = MemoryContent::new().with_bytes("n.png", &[128, 128, 255, 255]);
        let mut ctx = context(&device, content);
        let mut material = StandardMaterial::new("normal only").with_factors(MaterialFactors {
            albedo: LinearRgba::WHITE.to_vec4().to_array(),
            ..MaterialFactors::default()
        });
        material
            .load_map(&mut ctx, SamplerUnit::Normal, "n.png", &SolidImageDecoder)
            .unwrap();
        bind(&mut material, &mut ctx);

        let textures = device.live_count(ResourceKind::Texture);
        let boxed: Box<dyn Material> = Box::new(material);
        boxed.dispose(&mut ctx);
        assert_eq!(device.live_count(ResourceKind::Texture), textures - 1);
        assert!(device.live_labels(ResourceKind::BindGroup, "material").is_empty());
    }
}
