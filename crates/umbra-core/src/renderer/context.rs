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

//! The explicit render context passed to every pass and resource.
//!
//! It owns what the renderer shares between lanes: the device, the texture
//! pool, the program cache, the standard layouts and samplers, the sentinel
//! textures, the GPU task queue and the current-viewport state.

use crate::content::ContentResolver;
use crate::renderer::api::{
    AddressMode, BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindGroupLayoutId, BindingType,
    CompareFunction, FilterMode, SamplerBindingType, SamplerDescriptor, SamplerId,
    ShaderStageFlags, TextureId, TextureSampleType, TextureViewDimension, Viewport,
};
use crate::renderer::error::{FramebufferError, RenderError, ResourceError, ShaderError};
use crate::renderer::material::SamplerUnit;
use crate::renderer::resource::{
    FramebufferStats, Program, ProgramCache, SentinelKind, Sentinels, Texture2dPool,
};
use crate::renderer::settings::RendererSettings;
use crate::renderer::traits::GraphicsDevice;
use crate::task::{DrainReport, GpuTaskQueue, GpuTaskSender};
use ahash::AHashMap;
use std::borrow::Cow;
use std::sync::Arc;

/// Directory programs are loaded from.
pub const SHADER_ROOT: &str = "shaders";

/// Bind group layouts shared by every lane.
#[derive(Debug, Clone, Copy)]
pub struct StandardLayouts {
    /// One dynamic-offset uniform buffer at binding 0.
    pub uniforms: BindGroupLayoutId,
    /// The seven material textures plus a filtering sampler.
    pub material: BindGroupLayoutId,
}

/// Samplers shared by every lane.
#[derive(Debug, Clone, Copy)]
pub struct StandardSamplers {
    /// Bilinear, clamped.
    pub linear_clamp: SamplerId,
    /// Trilinear, repeating; used for material textures.
    pub linear_repeat: SamplerId,
    /// Nearest, clamped; used for G-buffer reads.
    pub nearest_clamp: SamplerId,
    /// Depth comparison sampler for shadow maps.
    pub shadow_comparison: SamplerId,
}

/// State shared by all passes of the renderer, owned by the render thread.
#[derive(Debug)]
pub struct RenderContext {
    device: Arc<dyn GraphicsDevice>,
    content: Arc<dyn ContentResolver>,
    settings: RendererSettings,
    texture_pool: Texture2dPool,
    programs: ProgramCache,
    layouts: StandardLayouts,
    samplers: StandardSamplers,
    sentinels: Sentinels,
    texture_revisions: AHashMap<TextureId, u64>,
    framebuffer_stats: FramebufferStats,
    current_viewport: Option<Viewport>,
    tasks: GpuTaskQueue,
    task_sender: GpuTaskSender,
}

impl RenderContext {
    /// Creates the context and the resources every lane relies on.
    ///
    /// ## Errors
    /// [`RenderError::InitializationFailed`] when a standard layout, sampler
    /// or sentinel texture cannot be created.
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        content: Arc<dyn ContentResolver>,
        settings: RendererSettings,
    ) -> Result<Self, RenderError> {
        let init = |e: ResourceError| RenderError::InitializationFailed(e.to_string());

        let layouts = create_layouts(device.as_ref()).map_err(init)?;
        let samplers = create_samplers(device.as_ref()).map_err(init)?;
        let sentinels = Sentinels::new(device.as_ref()).map_err(init)?;
        let (tasks, task_sender) =
            GpuTaskQueue::bounded(settings.task_queue_capacity, settings.task_soft_budget());

        log::info!(
            "Render context created on {} ({:?})",
            device.adapter_info().name,
            device.adapter_info().backend_type
        );

        Ok(Self {
            texture_pool: Texture2dPool::new(settings.texture_pool_batch),
            programs: ProgramCache::new(SHADER_ROOT),
            device,
            content,
            settings,
            layouts,
            samplers,
            sentinels,
            texture_revisions: AHashMap::new(),
            framebuffer_stats: FramebufferStats::default(),
            current_viewport: None,
            tasks,
            task_sender,
        })
    }

    /// The graphics device.
    pub fn device(&self) -> &dyn GraphicsDevice {
        self.device.as_ref()
    }

    /// A shared handle to the graphics device.
    pub fn device_arc(&self) -> Arc<dyn GraphicsDevice> {
        Arc::clone(&self.device)
    }

    /// The content resolver.
    pub fn content(&self) -> &dyn ContentResolver {
        self.content.as_ref()
    }

    /// The renderer settings.
    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    /// Standard bind group layouts.
    pub fn layouts(&self) -> &StandardLayouts {
        &self.layouts
    }

    /// Standard samplers.
    pub fn samplers(&self) -> &StandardSamplers {
        &self.samplers
    }

    /// The sentinel textures.
    pub fn sentinels(&self) -> &Sentinels {
        &self.sentinels
    }

    /// Shorthand for one sentinel texture.
    pub fn sentinel(&self, kind: SentinelKind) -> TextureId {
        self.sentinels.get(kind)
    }

    /// Takes a texture name from the pool.
    pub fn take_texture_name(&mut self) -> Result<TextureId, ResourceError> {
        self.texture_pool.take(self.device.as_ref())
    }

    /// The texture pool.
    pub fn texture_pool(&self) -> &Texture2dPool {
        &self.texture_pool
    }

    /// Returns the program `name`, compiling it on first use.
    pub fn program(&mut self, name: &str) -> Result<Arc<Program>, ShaderError> {
        self.programs
            .get(self.device.as_ref(), self.content.as_ref(), name)
    }

    /// The program cache.
    pub fn programs(&self) -> &ProgramCache {
        &self.programs
    }

    /// Records that the storage or contents of `id` changed.
    pub fn bump_texture_revision(&mut self, id: TextureId) {
        *self.texture_revisions.entry(id).or_insert(0) += 1;
    }

    /// Forgets a destroyed texture.
    pub fn forget_texture_revision(&mut self, id: TextureId) {
        self.texture_revisions.remove(&id);
    }

    /// Revision of `id`; 0 for textures never modified through the context.
    pub fn texture_revision(&self, id: TextureId) -> u64 {
        self.texture_revisions.get(&id).copied().unwrap_or(0)
    }

    /// Counts one framebuffer completeness check.
    pub fn record_framebuffer_check(&mut self, failure: Option<&FramebufferError>) {
        self.framebuffer_stats.checks += 1;
        if let Some(error) = failure {
            self.framebuffer_stats.failures += 1;
            self.framebuffer_stats.last_failure = Some(error.to_string());
        }
    }

    /// Completeness-check counters.
    pub fn framebuffer_stats(&self) -> &FramebufferStats {
        &self.framebuffer_stats
    }

    /// Remembers the viewport of the pass being recorded.
    pub fn set_current_viewport(&mut self, viewport: Viewport) {
        self.current_viewport = Some(viewport);
    }

    /// Viewport of the last pass begun.
    pub fn current_viewport(&self) -> Option<Viewport> {
        self.current_viewport
    }

    /// A sender for queuing GPU work from any thread.
    pub fn task_sender(&self) -> GpuTaskSender {
        self.task_sender.clone()
    }

    /// Runs every queued GPU task.
    pub fn drain_tasks(&mut self) -> DrainReport {
        let queue = self.tasks.clone();
        queue.drain(self)
    }

    /// Destroys everything the context owns.
    pub fn dispose(self) {
        let device = self.device.as_ref();
        self.texture_pool.dispose(device);
        self.programs.dispose(device);
        self.sentinels.dispose(device);

        let StandardSamplers {
            linear_clamp,
            linear_repeat,
            nearest_clamp,
            shadow_comparison,
        } = self.samplers;
        for sampler in [linear_clamp, linear_repeat, nearest_clamp, shadow_comparison] {
            if let Err(e) = device.destroy_sampler(sampler) {
                log::warn!("RenderContext: failed to destroy sampler {sampler:?}: {e}");
            }
        }
        for layout in [self.layouts.uniforms, self.layouts.material] {
            if let Err(e) = device.destroy_bind_group_layout(layout) {
                log::warn!("RenderContext: failed to destroy layout {layout:?}: {e}");
            }
        }
        log::debug!("Render context disposed");
    }
}

fn create_layouts(device: &dyn GraphicsDevice) -> Result<StandardLayouts, ResourceError> {
    let uniforms = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("uniforms"),
        entries: &[BindGroupLayoutEntry {
            binding: 0,
            visibility: ShaderStageFlags::VERTEX_FRAGMENT,
            ty: BindingType::UniformBuffer {
                has_dynamic_offset: true,
                min_binding_size: None,
            },
        }],
    })?;

    let mut entries: Vec<BindGroupLayoutEntry> = SamplerUnit::ALL
        .iter()
        .map(|unit| BindGroupLayoutEntry {
            binding: unit.binding(),
            visibility: ShaderStageFlags::FRAGMENT,
            ty: BindingType::Texture {
                sample_type: TextureSampleType::Float { filterable: true },
                view_dimension: TextureViewDimension::D2,
            },
        })
        .collect();
    entries.push(BindGroupLayoutEntry {
        binding: SamplerUnit::SAMPLER_BINDING,
        visibility: ShaderStageFlags::FRAGMENT,
        ty: BindingType::Sampler(SamplerBindingType::Filtering),
    });
    let material = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("material"),
        entries: &entries,
    })?;

    Ok(StandardLayouts { uniforms, material })
}

fn create_samplers(device: &dyn GraphicsDevice) -> Result<StandardSamplers, ResourceError> {
    let linear_clamp = device.create_sampler(&SamplerDescriptor {
        label: Some(Cow::Borrowed("linear clamp")),
        ..Default::default()
    })?;
    let linear_repeat = device.create_sampler(&SamplerDescriptor {
        label: Some(Cow::Borrowed("linear repeat")),
        address_mode_u: AddressMode::Repeat,
        address_mode_v: AddressMode::Repeat,
        address_mode_w: AddressMode::Repeat,
        ..Default::default()
    })?;
    let nearest_clamp = device.create_sampler(&SamplerDescriptor {
        label: Some(Cow::Borrowed("nearest clamp")),
        mag_filter: FilterMode::Nearest,
        min_filter: FilterMode::Nearest,
        mipmap_filter: FilterMode::Nearest,
        ..Default::default()
    })?;
    let shadow_comparison = device.create_sampler(&SamplerDescriptor {
        label: Some(Cow::Borrowed("shadow comparison")),
        mipmap_filter: FilterMode::Nearest,
        compare: Some(CompareFunction::LessEqual),
        ..Default::default()
    })?;
    Ok(StandardSamplers {
        linear_clamp,
        linear_repeat,
        nearest_clamp,
        shadow_comparison,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Extent2D;
    use crate::renderer::api::TextureFormat;
    use crate::renderer::resource::{ColorTarget, DepthTarget, Framebuffer, Texture2d};
    use crate::testing::{MemoryContent, RecordingDevice};

    fn context_with(settings: RendererSettings) -> (Arc<RecordingDevice>, RenderContext) {
        let device = Arc::new(RecordingDevice::new());
        let ctx = RenderContext::new(device.clone(), Arc::new(MemoryContent::new()), settings)
            .expect("context");
        (device, ctx)
    }

    #[test]
    fn test_pool_refills_in_batches() {
        let (device, mut ctx) = context_with(RendererSettings {
            texture_pool_batch: 4,
            ..Default::default()
        });
        let first: Vec<_> = (0..4).map(|_| ctx.take_texture_name().unwrap()).collect();
        assert_eq!(ctx.texture_pool().batches_generated(), 1);
        assert_eq!(ctx.texture_pool().available(), 0);
        // Names come out in generation order.
        assert!(first.windows(2).all(|w| w[0].0 < w[1].0));

        ctx.take_texture_name().unwrap();
        assert_eq!(ctx.texture_pool().batches_generated(), 2);
        assert_eq!(ctx.texture_pool().available(), 3);
        assert_eq!(device.texture_batches(), vec![4, 4]);
    }

    #[test]
    fn test_failed_allocation_releases_the_pooled_name() {
        let (device, mut ctx) = context_with(RendererSettings::default());
        device.fail_allocation_for("oversized");
        let in_use = |ctx: &RenderContext| device.live_texture_count() - ctx.texture_pool().available();
        let before = in_use(&ctx);

        let result = Texture2d::with_storage(
            &mut ctx,
            "oversized target",
            TextureFormat::Rgba16Float,
            Extent2D::new(8, 4),
            1,
        );

        assert!(matches!(result, Err(ResourceError::BackendError(_))));
        assert_eq!(in_use(&ctx), before);
    }

    #[test]
    fn test_pooled_texture_has_no_storage_until_set() {
        let (device, mut ctx) = context_with(RendererSettings::default());
        let mut texture = Texture2d::from_pool(&mut ctx).unwrap();
        assert!(!texture.is_allocated());
        assert!(device.texture_info(texture.id()).is_none());

        texture
            .set_storage(&mut ctx, "target", TextureFormat::Rgba16Float, Extent2D::new(8, 4), 1)
            .unwrap();
        assert_eq!(ctx.texture_revision(texture.id()), 1);
        let info = device.texture_info(texture.id()).unwrap();
        assert_eq!(info.format, TextureFormat::Rgba16Float);
        texture.dispose(&mut ctx).unwrap();
    }

    #[test]
    fn test_framebuffer_checks_are_counted() {
        let (_device, mut ctx) = context_with(RendererSettings::default());
        let size = Extent2D::new(64, 32);
        let framebuffer = Framebuffer::builder("gbuffer", size)
            .color(ColorTarget::owned(TextureFormat::Rgba16Float))
            .color(ColorTarget::owned(TextureFormat::Rgba8Unorm))
            .depth(DepthTarget::Owned(TextureFormat::Depth24PlusStencil8))
            .build(&mut ctx)
            .unwrap();
        assert_eq!(framebuffer.color_count(), 2);
        assert_eq!(ctx.framebuffer_stats().checks, 1);
        assert_eq!(ctx.framebuffer_stats().failures, 0);
        framebuffer.dispose(&mut ctx);
    }

    #[test]
    fn test_empty_framebuffer_is_fatal() {
        let (_device, mut ctx) = context_with(RendererSettings::default());
        let err = Framebuffer::builder("empty", Extent2D::new(4, 4))
            .build(&mut ctx)
            .unwrap_err();
        assert!(matches!(
            err,
            RenderError::Framebuffer(FramebufferError::NoAttachments { .. })
        ));
        assert_eq!(ctx.framebuffer_stats().failures, 1);
    }

    #[test]
    fn test_mismatched_external_attachment_is_fatal() {
        let (_device, mut ctx) = context_with(RendererSettings::default());
        let small = Texture2d::with_storage(
            &mut ctx,
            "small",
            TextureFormat::Rgba8Unorm,
            Extent2D::new(16, 16),
            1,
        )
        .unwrap();
        let err = Framebuffer::builder("mismatch", Extent2D::new(32, 32))
            .color(ColorTarget::External(small.view()))
            .build(&mut ctx)
            .unwrap_err();
        assert!(matches!(
            err,
            RenderError::Framebuffer(FramebufferError::SizeMismatch { .. })
        ));
        assert!(ctx.framebuffer_stats().last_failure.is_some());
        small.dispose(&mut ctx).unwrap();
    }

    #[test]
    fn test_missing_storage_is_fatal() {
        let (device, mut ctx) = context_with(RendererSettings::default());
        device.fail_storage_for("broken");
        let err = Framebuffer::builder("broken target", Extent2D::new(8, 8))
            .color(ColorTarget::owned(TextureFormat::Rgba8Unorm))
            .build(&mut ctx)
            .unwrap_err();
        assert!(matches!(
            err,
            RenderError::Framebuffer(FramebufferError::MissingStorage { .. })
        ));
    }

    #[test]
    fn test_tasks_run_against_the_context() {
        let (device, mut ctx) = context_with(RendererSettings::default());
        let sender = ctx.task_sender();
        let handle = sender
            .submit("reload", |ctx: &mut RenderContext| {
                let texture = Texture2d::with_storage(
                    ctx,
                    "reloaded",
                    TextureFormat::Rgba8Unorm,
                    Extent2D::new(2, 2),
                    1,
                )?;
                Ok(texture.id())
            })
            .unwrap();
        let report = ctx.drain_tasks();
        assert_eq!(report.executed, 1);
        let id = handle.wait().unwrap();
        assert!(device.texture_info(id).is_some());
    }

    #[test]
    fn test_dispose_releases_everything() {
        let (device, ctx) = context_with(RendererSettings::default());
        ctx.dispose();
        assert_eq!(device.live_texture_count(), 0);
        assert_eq!(device.live_sampler_count(), 0);
    }
}
