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

//! Texture bind groups of the full-screen lanes.
//!
//! Layouts are described as an ordered list of [`Slot`]s, binding `i` being
//! slot `i`. Bind groups are cached by the resources they reference and the
//! storage revision of every texture, so a reallocated texture never stays
//! bound through a stale view.

use ahash::AHashMap;
use umbra_core::renderer::{
    BindGroupDescriptor, BindGroupEntry, BindGroupId, BindGroupLayoutDescriptor,
    BindGroupLayoutEntry, BindGroupLayoutId, BindingResource, BindingType, ResourceError,
    SamplerBindingType, SamplerId, ShaderStageFlags, TextureBinding, TextureSampleType,
    TextureViewDimension,
};
use umbra_core::RenderContext;

/// Shape of one binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// A 2D float texture.
    Texture2d {
        /// Whether the texture may be linearly filtered.
        filterable: bool,
    },
    /// The depth aspect of a depth texture.
    Depth,
    /// A float cube map.
    Cube,
    /// A sampler.
    Sampler(SamplerBindingType),
}

impl Slot {
    fn binding_type(self) -> BindingType {
        let texture = |sample_type, view_dimension| BindingType::Texture {
            sample_type,
            view_dimension,
        };
        match self {
            Slot::Texture2d { filterable } => texture(
                TextureSampleType::Float { filterable },
                TextureViewDimension::D2,
            ),
            Slot::Depth => texture(TextureSampleType::Depth, TextureViewDimension::D2),
            Slot::Cube => texture(
                TextureSampleType::Float { filterable: true },
                TextureViewDimension::Cube,
            ),
            Slot::Sampler(kind) => BindingType::Sampler(kind),
        }
    }
}

/// Creates a fragment-visible layout whose binding `i` is `slots[i]`.
pub fn create_layout(
    ctx: &RenderContext,
    label: &str,
    slots: &[Slot],
) -> Result<BindGroupLayoutId, ResourceError> {
    let entries: Vec<BindGroupLayoutEntry> = slots
        .iter()
        .enumerate()
        .map(|(binding, slot)| BindGroupLayoutEntry {
            binding: binding as u32,
            visibility: ShaderStageFlags::FRAGMENT,
            ty: slot.binding_type(),
        })
        .collect();
    ctx.device().create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &entries,
    })
}

/// One bound resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bound {
    /// A texture view.
    Texture(TextureBinding),
    /// A sampler.
    Sampler(SamplerId),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    layout: BindGroupLayoutId,
    resources: Vec<Bound>,
    revisions: Vec<u64>,
}

/// Bind groups keyed by their layout, resources and texture revisions.
#[derive(Debug, Default)]
pub struct BindGroupCache {
    groups: AHashMap<CacheKey, BindGroupId>,
    created: u64,
}

impl BindGroupCache {
    /// Returns the bind group binding `resources` in order, creating it once.
    pub fn get(
        &mut self,
        ctx: &RenderContext,
        label: &str,
        layout: BindGroupLayoutId,
        resources: &[Bound],
    ) -> Result<BindGroupId, ResourceError> {
        let revisions = resources
            .iter()
            .map(|bound| match bound {
                Bound::Texture(binding) => ctx.texture_revision(binding.texture),
                Bound::Sampler(_) => 0,
            })
            .collect();
        let key = CacheKey {
            layout,
            resources: resources.to_vec(),
            revisions,
        };
        if let Some(&group) = self.groups.get(&key) {
            return Ok(group);
        }

        let entries: Vec<BindGroupEntry> = resources
            .iter()
            .enumerate()
            .map(|(binding, bound)| BindGroupEntry {
                binding: binding as u32,
                resource: match *bound {
                    Bound::Texture(texture) => BindingResource::Texture(texture),
                    Bound::Sampler(sampler) => BindingResource::Sampler(sampler),
                },
            })
            .collect();
        let group = ctx.device().create_bind_group(&BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &entries,
        })?;
        self.groups.insert(key, group);
        self.created += 1;
        Ok(group)
    }

    /// Number of bind groups created over the cache's lifetime.
    pub fn created(&self) -> u64 {
        self.created
    }

    /// Number of bind groups currently alive.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// `true` if no bind group is cached.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Destroys every cached bind group.
    pub fn clear(&mut self, ctx: &RenderContext) {
        for (_, group) in self.groups.drain() {
            if let Err(e) = ctx.device().destroy_bind_group(group) {
                log::warn!("BindGroupCache: failed to destroy bind group: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use umbra_core::renderer::TextureId;
    use umbra_core::testing::{MemoryContent, RecordingDevice, ResourceKind};
    use umbra_core::RendererSettings;

    fn context() -> (Arc<RecordingDevice>, RenderContext) {
        let device = Arc::new(RecordingDevice::new());
        let ctx = RenderContext::new(
            device.clone(),
            Arc::new(MemoryContent::new()),
            RendererSettings::default(),
        )
        .unwrap();
        (device, ctx)
    }

    #[test]
    fn test_identical_resources_share_a_group() {
        let (device, ctx) = context();
        let layout = create_layout(&ctx, "test", &[Slot::Texture2d { filterable: true }]).unwrap();
        let mut cache = BindGroupCache::default();
        let bound = [Bound::Texture(TextureBinding::d2(TextureId(7)))];

        let before = device.live_count(ResourceKind::BindGroup);
        let a = cache.get(&ctx, "test", layout, &bound).unwrap();
        let b = cache.get(&ctx, "test", layout, &bound).unwrap();
        assert_eq!(a, b);
        assert_eq!(cache.created(), 1);
        assert_eq!(device.live_count(ResourceKind::BindGroup), before + 1);
    }

    #[test]
    fn test_revision_bump_rebuilds_group() {
        let (_device, mut ctx) = context();
        let layout = create_layout(&ctx, "test", &[Slot::Texture2d { filterable: true }]).unwrap();
        let mut cache = BindGroupCache::default();
        let bound = [Bound::Texture(TextureBinding::d2(TextureId(7)))];

        let a = cache.get(&ctx, "test", layout, &bound).unwrap();
        ctx.bump_texture_revision(TextureId(7));
        let b = cache.get(&ctx, "test", layout, &bound).unwrap();
        assert_ne!(a, b);
        assert_eq!(cache.created(), 2);
    }

    #[test]
    fn test_clear_destroys_groups() {
        let (device, ctx) = context();
        let layout = create_layout(&ctx, "test", &[Slot::Cube]).unwrap();
        let mut cache = BindGroupCache::default();
        let before = device.live_count(ResourceKind::BindGroup);
        cache
            .get(&ctx, "test", layout, &[Bound::Texture(TextureBinding::cube(TextureId(3)))])
            .unwrap();
        cache.clear(&ctx);
        assert!(cache.is_empty());
        assert_eq!(device.live_count(ResourceKind::BindGroup), before);
    }
}
