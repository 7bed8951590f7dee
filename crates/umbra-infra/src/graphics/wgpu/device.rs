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

//! The wgpu implementation of [`GraphicsDevice`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use wgpu::util::DeviceExt;

use umbra_core::math::Extent2D;
use umbra_core::renderer::api::{
    AttachmentView, BindGroupDescriptor, BindGroupId, BindGroupLayoutDescriptor,
    BindGroupLayoutId, BindingResource, BufferDescriptor, BufferId, CommandBufferId,
    DeviceFeature, FilterMode, GraphicsAdapterInfo, PipelineLayoutDescriptor, PipelineLayoutId,
    RenderPipelineDescriptor, RenderPipelineId, SamplerDescriptor, SamplerId,
    ShaderModuleDescriptor, ShaderModuleId, ShaderSourceData, TextureAspect, TextureDescriptor,
    TextureFormat, TextureId, TextureKind, TextureRegion, TextureViewDimension, TextureWrite,
    FRAGMENT_ENTRY_POINT, VERTEX_ENTRY_POINT,
};
use umbra_core::renderer::error::{
    PipelineError, RenderError, ResourceError, ShaderError, SourceLocation,
};
use umbra_core::renderer::traits::{CommandEncoder, GraphicsDevice, TextureInfo};

use super::command::WgpuCommandEncoder;
use super::context::WgpuGraphicsContext;
use super::conversions::{backend_type, from_wgpu_texture_format, IntoWgpu};

const BLIT_SHADER: &str = include_str!("shaders/blit.wgsl");

#[derive(Debug)]
pub(crate) struct WgpuBufferEntry {
    pub(crate) wgpu_buffer: Arc<wgpu::Buffer>,
    pub(crate) size: u64, // To track VRAM accurately on destruction
}

#[derive(Debug)]
pub(crate) struct WgpuTextureEntry {
    pub(crate) wgpu_texture: Arc<wgpu::Texture>,
    pub(crate) info: TextureInfo,
    pub(crate) size: u64, // To track VRAM accurately on destruction
}

/// The shapes of view the device creates for a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ViewKey {
    /// One mip level of one layer, as a 2D view. Render attachments and blit sources.
    Level {
        texture: TextureId,
        mip_level: u32,
        layer: u32,
    },
    /// Every mip level, in the shape a bind group asks for.
    Binding {
        texture: TextureId,
        dimension: TextureViewDimension,
        aspect: TextureAspect,
    },
}

impl ViewKey {
    fn texture(&self) -> TextureId {
        match *self {
            ViewKey::Level { texture, .. } | ViewKey::Binding { texture, .. } => texture,
        }
    }
}

/// A full-screen copy pipeline for one destination format.
#[derive(Debug)]
pub(crate) struct BlitPipeline {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
}

/// The internal, non-clonable state of the WgpuDevice.
#[derive(Debug)]
pub struct WgpuDeviceInternal {
    context: Arc<Mutex<WgpuGraphicsContext>>,
    shader_modules: Mutex<HashMap<ShaderModuleId, Arc<wgpu::ShaderModule>>>,
    bind_group_layouts: Mutex<HashMap<BindGroupLayoutId, Arc<wgpu::BindGroupLayout>>>,
    bind_groups: Mutex<HashMap<BindGroupId, Arc<wgpu::BindGroup>>>,
    pipeline_layouts: Mutex<HashMap<PipelineLayoutId, Arc<wgpu::PipelineLayout>>>,
    pipelines: Mutex<HashMap<RenderPipelineId, Arc<wgpu::RenderPipeline>>>,
    buffers: Mutex<HashMap<BufferId, WgpuBufferEntry>>,
    /// Texture names; `None` until storage is allocated.
    textures: Mutex<HashMap<TextureId, Option<WgpuTextureEntry>>>,
    views: Mutex<HashMap<ViewKey, wgpu::TextureView>>,
    samplers: Mutex<HashMap<SamplerId, Arc<wgpu::Sampler>>>,
    blit_pipelines: Mutex<HashMap<(wgpu::TextureFormat, bool), Arc<BlitPipeline>>>,
    /// View of the surface texture acquired for the current frame.
    surface_view: Mutex<Option<wgpu::TextureView>>,

    next_shader_id: AtomicUsize,
    next_bind_group_layout_id: AtomicUsize,
    next_bind_group_id: AtomicUsize,
    next_pipeline_layout_id: AtomicUsize,
    next_pipeline_id: AtomicUsize,
    next_buffer_id: AtomicUsize,
    next_texture_id: AtomicUsize,
    next_sampler_id: AtomicUsize,

    // VRAM Tracking
    vram_allocated_bytes: AtomicU64,
    vram_peak_bytes: AtomicU64,

    /// Command buffers that have been finished but not yet submitted.
    pending_command_buffers: Mutex<HashMap<CommandBufferId, wgpu::CommandBuffer>>,
    command_buffer_id_counter: AtomicU64,
}

/// A surface texture acquired for one frame. Hand it back to
/// [`WgpuDevice::present`] once the frame is submitted.
#[derive(Debug)]
pub struct SurfaceFrame {
    texture: wgpu::SurfaceTexture,
}

/// A clonable, thread-safe handle to the wgpu graphics device.
///
/// It wraps the device state in an `Arc`, so command encoders and the
/// render context can share it.
#[derive(Clone, Debug)]
pub struct WgpuDevice {
    internal: Arc<WgpuDeviceInternal>,
}

impl WgpuDevice {
    /// Wraps an initialized graphics context.
    pub fn new(context: Arc<Mutex<WgpuGraphicsContext>>) -> Self {
        Self {
            internal: Arc::new(WgpuDeviceInternal {
                context,
                shader_modules: Mutex::new(HashMap::new()),
                bind_group_layouts: Mutex::new(HashMap::new()),
                bind_groups: Mutex::new(HashMap::new()),
                pipeline_layouts: Mutex::new(HashMap::new()),
                pipelines: Mutex::new(HashMap::new()),
                buffers: Mutex::new(HashMap::new()),
                textures: Mutex::new(HashMap::new()),
                views: Mutex::new(HashMap::new()),
                samplers: Mutex::new(HashMap::new()),
                blit_pipelines: Mutex::new(HashMap::new()),
                surface_view: Mutex::new(None),
                next_shader_id: AtomicUsize::new(0),
                next_bind_group_layout_id: AtomicUsize::new(0),
                next_bind_group_id: AtomicUsize::new(0),
                next_pipeline_layout_id: AtomicUsize::new(0),
                next_pipeline_id: AtomicUsize::new(0),
                next_buffer_id: AtomicUsize::new(0),
                next_texture_id: AtomicUsize::new(0),
                next_sampler_id: AtomicUsize::new(0),
                vram_allocated_bytes: AtomicU64::new(0),
                vram_peak_bytes: AtomicU64::new(0),
                pending_command_buffers: Mutex::new(HashMap::new()),
                command_buffer_id_counter: AtomicU64::new(0),
            }),
        }
    }

    /// The shared graphics context.
    pub fn context(&self) -> &Arc<Mutex<WgpuGraphicsContext>> {
        &self.internal.context
    }

    /// Helper function to execute an operation with the wgpu::Device locked.
    fn with_wgpu_device<F, R>(&self, operation: F) -> Result<R, ResourceError>
    where
        F: FnOnce(&wgpu::Device) -> Result<R, ResourceError>,
    {
        let context_guard = self.internal.context.lock().map_err(|e| {
            ResourceError::BackendError(format!("Failed to lock WgpuGraphicsContext: {e}"))
        })?;
        operation(&context_guard.device)
    }

    fn next_id(counter: &AtomicUsize) -> usize {
        counter.fetch_add(1, Ordering::Relaxed)
    }

    fn track_allocation(&self, bytes: u64) {
        let current = self
            .internal
            .vram_allocated_bytes
            .fetch_add(bytes, Ordering::Relaxed)
            + bytes;
        self.internal
            .vram_peak_bytes
            .fetch_max(current, Ordering::Relaxed);
    }

    fn track_release(&self, bytes: u64) {
        self.internal
            .vram_allocated_bytes
            .fetch_sub(bytes, Ordering::Relaxed);
    }

    /// Estimated bytes of GPU memory held by buffers and textures: current and peak.
    pub fn vram_usage(&self) -> (u64, u64) {
        (
            self.internal.vram_allocated_bytes.load(Ordering::Relaxed),
            self.internal.vram_peak_bytes.load(Ordering::Relaxed),
        )
    }

    /// Texture size in bytes, every mip level and layer included.
    fn texture_size_in_bytes(descriptor: &TextureDescriptor) -> u64 {
        let bytes_per_pixel = descriptor.format.bytes_per_pixel() as u64;
        let layers = descriptor.size.depth_or_array_layers as u64;
        (0..descriptor.mip_level_count)
            .map(|mip| {
                let width = (descriptor.size.width >> mip).max(1) as u64;
                let height = (descriptor.size.height >> mip).max(1) as u64;
                width * height * layers * bytes_per_pixel
            })
            .sum()
    }

    pub(crate) fn get_wgpu_render_pipeline(
        &self,
        id: RenderPipelineId,
    ) -> Option<Arc<wgpu::RenderPipeline>> {
        self.internal.pipelines.lock().unwrap().get(&id).cloned()
    }

    pub(crate) fn get_wgpu_bind_group(&self, id: BindGroupId) -> Option<Arc<wgpu::BindGroup>> {
        self.internal.bind_groups.lock().unwrap().get(&id).cloned()
    }

    pub(crate) fn get_wgpu_buffer(&self, id: BufferId) -> Option<Arc<wgpu::Buffer>> {
        let buffers = self.internal.buffers.lock().unwrap();
        buffers.get(&id).map(|entry| Arc::clone(&entry.wgpu_buffer))
    }

    /// The texture and its storage information, if it has storage.
    pub(crate) fn get_wgpu_texture(
        &self,
        id: TextureId,
    ) -> Result<(Arc<wgpu::Texture>, TextureInfo), ResourceError> {
        let textures = self.internal.textures.lock().unwrap();
        match textures.get(&id) {
            Some(Some(entry)) => Ok((Arc::clone(&entry.wgpu_texture), entry.info)),
            Some(None) => Err(ResourceError::MissingStorage(id)),
            None => Err(ResourceError::InvalidHandle),
        }
    }

    /// Returns the cached view for `key`, creating it on first use.
    fn texture_view(&self, key: ViewKey) -> Result<wgpu::TextureView, ResourceError> {
        let mut views = self.internal.views.lock().unwrap();
        if let Some(view) = views.get(&key) {
            return Ok(view.clone());
        }

        let (texture, info) = self.get_wgpu_texture(key.texture())?;
        let descriptor = match key {
            ViewKey::Level {
                mip_level, layer, ..
            } => {
                if mip_level >= info.mip_level_count || layer >= info.size.depth_or_array_layers
                {
                    return Err(ResourceError::OutOfBounds);
                }
                wgpu::TextureViewDescriptor {
                    label: Some("umbra level view"),
                    dimension: Some(wgpu::TextureViewDimension::D2),
                    base_mip_level: mip_level,
                    mip_level_count: Some(1),
                    base_array_layer: layer,
                    array_layer_count: Some(1),
                    ..Default::default()
                }
            }
            ViewKey::Binding {
                dimension, aspect, ..
            } => {
                let layers = match dimension {
                    TextureViewDimension::D2 => Some(1),
                    TextureViewDimension::Cube => Some(6),
                    TextureViewDimension::D2Array => None,
                };
                if info.kind != TextureKind::Cube && dimension == TextureViewDimension::Cube {
                    return Err(ResourceError::UnsupportedFormat(format!(
                        "texture {:?} is not a cube and cannot be bound as one",
                        key.texture()
                    )));
                }
                wgpu::TextureViewDescriptor {
                    label: Some("umbra binding view"),
                    dimension: Some(dimension.into_wgpu()),
                    aspect: aspect.into_wgpu(),
                    array_layer_count: layers,
                    ..Default::default()
                }
            }
        };

        let view = texture.create_view(&descriptor);
        views.insert(key, view.clone());
        Ok(view)
    }

    /// Resolves a render pass attachment to a view.
    pub(crate) fn attachment_view(
        &self,
        view: AttachmentView,
    ) -> Result<wgpu::TextureView, ResourceError> {
        match view {
            AttachmentView::Texture {
                texture,
                mip_level,
                layer,
            } => self.texture_view(ViewKey::Level {
                texture,
                mip_level,
                layer,
            }),
            AttachmentView::Surface => self
                .internal
                .surface_view
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| {
                    ResourceError::BackendError(
                        "no surface texture has been acquired for this frame".to_string(),
                    )
                }),
        }
    }

    fn forget_views(&self, texture: TextureId) {
        self.internal
            .views
            .lock()
            .unwrap()
            .retain(|key, _| key.texture() != texture);
    }

    fn float32_filterable(&self) -> bool {
        self.supports_feature(DeviceFeature::Float32Filterable)
    }

    /// The copy pipeline rendering into `format`, created on first use.
    fn blit_pipeline(
        &self,
        format: wgpu::TextureFormat,
        filterable: bool,
    ) -> Result<Arc<BlitPipeline>, ResourceError> {
        let mut pipelines = self.internal.blit_pipelines.lock().unwrap();
        if let Some(pipeline) = pipelines.get(&(format, filterable)) {
            return Ok(Arc::clone(pipeline));
        }

        let blit = self.with_wgpu_device(|device| {
            let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("umbra blit"),
                source: wgpu::ShaderSource::Wgsl(BLIT_SHADER.into()),
            });
            let (sample_type, sampler_type, filter) = if filterable {
                (
                    wgpu::TextureSampleType::Float { filterable: true },
                    wgpu::SamplerBindingType::Filtering,
                    wgpu::FilterMode::Linear,
                )
            } else {
                (
                    wgpu::TextureSampleType::Float { filterable: false },
                    wgpu::SamplerBindingType::NonFiltering,
                    wgpu::FilterMode::Nearest,
                )
            };
            let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("umbra blit layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type,
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(sampler_type),
                        count: None,
                    },
                ],
            });
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("umbra blit pipeline layout"),
                bind_group_layouts: &[Some(&layout)],
                immediate_size: 0,
            });
            let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("umbra blit"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &module,
                    entry_point: Some(VERTEX_ENTRY_POINT),
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &module,
                    entry_point: Some(FRAGMENT_ENTRY_POINT),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            });
            let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("umbra blit sampler"),
                mag_filter: filter,
                min_filter: filter,
                ..Default::default()
            });
            Ok(BlitPipeline {
                pipeline,
                layout,
                sampler,
            })
        })?;

        log::debug!("WgpuDevice: Created blit pipeline for {format:?} (filterable: {filterable})");
        let blit = Arc::new(blit);
        pipelines.insert((format, filterable), Arc::clone(&blit));
        Ok(blit)
    }

    /// Records a copy of `source` into `destination`.
    ///
    /// Same-sized regions of the same format are copied directly. Anything
    /// else goes through a full-screen pass, which rescales with `filter`.
    pub(crate) fn record_blit(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        source: TextureRegion,
        destination: TextureRegion,
        filter: FilterMode,
    ) -> Result<(), ResourceError> {
        let (source_texture, source_info) = self.get_wgpu_texture(source.texture)?;
        let (destination_texture, destination_info) = self.get_wgpu_texture(destination.texture)?;
        let source_size = source_info.size.mip_level_size(source.mip_level);
        let destination_size = destination_info
            .size
            .mip_level_size(destination.mip_level);

        if source_info.format == destination_info.format && source_size == destination_size {
            encoder.copy_texture_to_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &source_texture,
                    mip_level: source.mip_level,
                    origin: wgpu::Origin3d {
                        x: 0,
                        y: 0,
                        z: source.layer,
                    },
                    aspect: wgpu::TextureAspect::All,
                },
                wgpu::TexelCopyTextureInfo {
                    texture: &destination_texture,
                    mip_level: destination.mip_level,
                    origin: wgpu::Origin3d {
                        x: 0,
                        y: 0,
                        z: destination.layer,
                    },
                    aspect: wgpu::TextureAspect::All,
                },
                wgpu::Extent3d {
                    width: source_size.width,
                    height: source_size.height,
                    depth_or_array_layers: 1,
                },
            );
            return Ok(());
        }

        if source_info.format.is_depth() || destination_info.format.is_depth() {
            return Err(ResourceError::UnsupportedFormat(format!(
                "cannot rescale depth textures ({:?} -> {:?})",
                source_info.format, destination_info.format
            )));
        }

        let filterable = filter == FilterMode::Linear
            && (!source_info.format.is_float32() || self.float32_filterable());
        let blit = self.blit_pipeline(destination_info.format.into_wgpu(), filterable)?;
        let source_view = self.texture_view(ViewKey::Level {
            texture: source.texture,
            mip_level: source.mip_level,
            layer: source.layer,
        })?;
        let destination_view = self.texture_view(ViewKey::Level {
            texture: destination.texture,
            mip_level: destination.mip_level,
            layer: destination.layer,
        })?;
        let bind_group = self.with_wgpu_device(|device| {
            Ok(device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("umbra blit source"),
                layout: &blit.layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&source_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&blit.sampler),
                    },
                ],
            }))
        })?;

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("umbra blit"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &destination_view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        pass.set_pipeline(&blit.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.draw(0..3, 0..1);
        Ok(())
    }

    /// (crate-internal) Registers a finished wgpu::CommandBuffer, storing it
    /// in a map and returning an abstract ID for it.
    pub(crate) fn register_command_buffer(&self, buffer: wgpu::CommandBuffer) -> CommandBufferId {
        let id = CommandBufferId(
            self.internal
                .command_buffer_id_counter
                .fetch_add(1, Ordering::SeqCst),
        );
        self.internal
            .pending_command_buffers
            .lock()
            .unwrap()
            .insert(id, buffer);
        id
    }

    /// Acquires the next surface texture. Attachments naming
    /// [`AttachmentView::Surface`] render into it until [`WgpuDevice::present`].
    ///
    /// ## Errors
    /// [`RenderError::SurfaceAcquisitionFailed`] when the context is headless
    /// or the surface cannot provide a texture.
    pub fn acquire_surface_frame(&self) -> Result<SurfaceFrame, RenderError> {
        let texture = self
            .internal
            .context
            .lock()
            .unwrap()
            .acquire_surface_texture()?;
        let view = texture.texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("umbra surface view"),
            ..Default::default()
        });
        *self.internal.surface_view.lock().unwrap() = Some(view);
        Ok(SurfaceFrame { texture })
    }

    /// Presents a frame acquired with [`WgpuDevice::acquire_surface_frame`].
    pub fn present(&self, frame: SurfaceFrame) {
        self.internal.surface_view.lock().unwrap().take();
        frame.texture.present();
    }

    /// Reconfigures the surface after a window resize.
    pub fn resize_surface(&self, size: Extent2D) {
        self.internal
            .context
            .lock()
            .unwrap()
            .resize(size.width, size.height);
    }

    /// Polls the device until every submitted command buffer has executed.
    pub fn poll_device_blocking(&self) {
        if let Ok(context_guard) = self.internal.context.lock() {
            if let Err(e) = context_guard.device.poll(wgpu::PollType::wait_indefinitely()) {
                log::warn!("Failed to poll device: {e:?}");
            }
        } else {
            log::error!("WgpuDevice context mutex was poisoned during poll.");
        }
    }

    /// Reads mip level 0, layer 0 of a color texture back to the CPU, tightly packed.
    ///
    /// Blocks until the GPU has finished every submitted command buffer. Used
    /// to retrieve headless output.
    pub fn read_texture(&self, id: TextureId) -> Result<Vec<u8>, ResourceError> {
        let (texture, info) = self.get_wgpu_texture(id)?;
        if info.format.is_depth() {
            return Err(ResourceError::UnsupportedFormat(format!(
                "cannot read back depth texture {id:?}"
            )));
        }
        let row_bytes = info.size.width * info.format.bytes_per_pixel();
        let padded_row_bytes = row_bytes.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let height = info.size.height;

        let readback = {
            let context = self.internal.context.lock().unwrap();
            let buffer = context.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("umbra readback"),
                size: padded_row_bytes as u64 * height as u64,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                mapped_at_creation: false,
            });
            let mut encoder = context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("umbra readback"),
                });
            encoder.copy_texture_to_buffer(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                wgpu::TexelCopyBufferInfo {
                    buffer: &buffer,
                    layout: wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(padded_row_bytes),
                        rows_per_image: Some(height),
                    },
                },
                wgpu::Extent3d {
                    width: info.size.width,
                    height,
                    depth_or_array_layers: 1,
                },
            );
            context.queue.submit(std::iter::once(encoder.finish()));
            buffer
        };

        let mapped: Arc<Mutex<Option<Result<(), wgpu::BufferAsyncError>>>> =
            Arc::new(Mutex::new(None));
        let mapped_for_callback = Arc::clone(&mapped);
        readback
            .slice(..)
            .map_async(wgpu::MapMode::Read, move |result| {
                *mapped_for_callback.lock().unwrap() = Some(result);
            });
        self.poll_device_blocking();

        match mapped.lock().unwrap().take() {
            Some(Ok(())) => {}
            Some(Err(e)) => {
                return Err(ResourceError::BackendError(format!(
                    "Failed to map readback buffer: {e:?}"
                )))
            }
            None => {
                return Err(ResourceError::BackendError(
                    "Readback buffer was not mapped after polling".to_string(),
                ))
            }
        }

        let data = {
            let padded = readback.slice(..).get_mapped_range();
            padded
                .chunks(padded_row_bytes as usize)
                .flat_map(|row| &row[..row_bytes as usize])
                .copied()
                .collect()
        };
        readback.unmap();
        Ok(data)
    }
}

impl GraphicsDevice for WgpuDevice {
    // --- Shader Module Operations ---

    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError> {
        let label = descriptor.label.unwrap_or("unnamed shader");
        let wgpu_source = match &descriptor.source {
            ShaderSourceData::Wgsl(source) => wgpu::ShaderSource::Wgsl(source.clone()),
        };

        let module = self.with_wgpu_device(|device| {
            log::debug!("WgpuDevice: Creating wgpu::ShaderModule with label: {label:?}");
            Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu_source,
            }))
        })?;

        // Line numbers refer to the source as submitted; the caller maps them back.
        let info = pollster::block_on(module.get_compilation_info());
        for message in &info.messages {
            if message.message_type == wgpu::CompilationMessageType::Warning {
                log::warn!("WgpuDevice: Shader '{label}': {}", message.message);
            }
        }
        if let Some(error) = info
            .messages
            .iter()
            .find(|m| m.message_type == wgpu::CompilationMessageType::Error)
        {
            log::debug!("WgpuDevice: Shader '{label}' rejected: {}", error.message);
            return Err(ShaderError::CompilationError {
                label: label.to_string(),
                details: error.message.clone(),
                location: error.location.map(|location| SourceLocation {
                    file: label.to_string(),
                    line: location.line_number,
                }),
            }
            .into());
        }

        let id = ShaderModuleId(Self::next_id(&self.internal.next_shader_id));
        self.internal
            .shader_modules
            .lock()
            .unwrap()
            .insert(id, Arc::new(module));
        log::info!("WgpuDevice: Created shader module '{label}' with ID: {id:?}");
        Ok(id)
    }

    fn destroy_shader_module(&self, id: ShaderModuleId) -> Result<(), ResourceError> {
        if self.internal.shader_modules.lock().unwrap().remove(&id).is_some() {
            log::debug!("WgpuDevice: Destroyed shader module with ID: {id:?}");
            Ok(())
        } else {
            Err(ShaderError::NotFound { id }.into())
        }
    }

    // --- Bind Group Operations ---

    fn create_bind_group_layout(
        &self,
        descriptor: &BindGroupLayoutDescriptor,
    ) -> Result<BindGroupLayoutId, ResourceError> {
        let entries: Vec<wgpu::BindGroupLayoutEntry> = descriptor
            .entries
            .iter()
            .map(|entry| wgpu::BindGroupLayoutEntry {
                binding: entry.binding,
                visibility: entry.visibility.into_wgpu(),
                ty: entry.ty.into_wgpu(),
                count: None,
            })
            .collect();

        let layout = self.with_wgpu_device(|device| {
            Ok(device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: descriptor.label,
                entries: &entries,
            }))
        })?;

        let id = BindGroupLayoutId(Self::next_id(&self.internal.next_bind_group_layout_id));
        self.internal
            .bind_group_layouts
            .lock()
            .unwrap()
            .insert(id, Arc::new(layout));
        log::debug!(
            "WgpuDevice: Created bind group layout '{}' with ID: {id:?}",
            descriptor.label.unwrap_or_default()
        );
        Ok(id)
    }

    fn destroy_bind_group_layout(&self, id: BindGroupLayoutId) -> Result<(), ResourceError> {
        match self.internal.bind_group_layouts.lock().unwrap().remove(&id) {
            Some(_) => Ok(()),
            None => Err(ResourceError::NotFound),
        }
    }

    fn create_bind_group(
        &self,
        descriptor: &BindGroupDescriptor,
    ) -> Result<BindGroupId, ResourceError> {
        enum Held {
            Buffer(Arc<wgpu::Buffer>),
            View(wgpu::TextureView),
            Sampler(Arc<wgpu::Sampler>),
        }

        let layout = self
            .internal
            .bind_group_layouts
            .lock()
            .unwrap()
            .get(&descriptor.layout)
            .cloned()
            .ok_or(ResourceError::InvalidHandle)?;

        // Resolve every resource before building the borrowed wgpu entries.
        let held = descriptor
            .entries
            .iter()
            .map(|entry| match entry.resource {
                BindingResource::Buffer(binding) => self
                    .get_wgpu_buffer(binding.buffer)
                    .map(Held::Buffer)
                    .ok_or(ResourceError::InvalidHandle),
                BindingResource::Texture(binding) => self
                    .texture_view(ViewKey::Binding {
                        texture: binding.texture,
                        dimension: binding.dimension,
                        aspect: binding.aspect,
                    })
                    .map(Held::View),
                BindingResource::Sampler(id) => self
                    .internal
                    .samplers
                    .lock()
                    .unwrap()
                    .get(&id)
                    .cloned()
                    .map(Held::Sampler)
                    .ok_or(ResourceError::InvalidHandle),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let entries: Vec<wgpu::BindGroupEntry> = descriptor
            .entries
            .iter()
            .zip(&held)
            .map(|(entry, held)| wgpu::BindGroupEntry {
                binding: entry.binding,
                resource: match (held, entry.resource) {
                    (Held::Buffer(buffer), BindingResource::Buffer(binding)) => {
                        wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                            buffer,
                            offset: binding.offset,
                            size: binding.size,
                        })
                    }
                    (Held::View(view), _) => wgpu::BindingResource::TextureView(view),
                    (Held::Sampler(sampler), _) => wgpu::BindingResource::Sampler(sampler),
                    (Held::Buffer(buffer), _) => buffer.as_entire_binding(),
                },
            })
            .collect();

        let bind_group = self.with_wgpu_device(|device| {
            Ok(device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: descriptor.label,
                layout: &layout,
                entries: &entries,
            }))
        })?;

        let id = BindGroupId(Self::next_id(&self.internal.next_bind_group_id));
        self.internal
            .bind_groups
            .lock()
            .unwrap()
            .insert(id, Arc::new(bind_group));
        log::trace!(
            "WgpuDevice: Created bind group '{}' with ID: {id:?}",
            descriptor.label.unwrap_or_default()
        );
        Ok(id)
    }

    fn destroy_bind_group(&self, id: BindGroupId) -> Result<(), ResourceError> {
        match self.internal.bind_groups.lock().unwrap().remove(&id) {
            Some(_) => Ok(()),
            None => Err(ResourceError::NotFound),
        }
    }

    fn create_pipeline_layout(
        &self,
        descriptor: &PipelineLayoutDescriptor,
    ) -> Result<PipelineLayoutId, ResourceError> {
        let layouts = {
            let map = self.internal.bind_group_layouts.lock().unwrap();
            descriptor
                .bind_group_layouts
                .iter()
                .map(|id| {
                    map.get(id).cloned().ok_or_else(|| {
                        PipelineError::LayoutCreationFailed(format!(
                            "bind group layout {id:?} does not exist"
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?
        };
        let layout_refs: Vec<Option<&wgpu::BindGroupLayout>> =
            layouts.iter().map(|l| Some(l.as_ref())).collect();

        let layout = self.with_wgpu_device(|device| {
            Ok(device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: descriptor.label,
                bind_group_layouts: &layout_refs,
                immediate_size: 0,
            }))
        })?;

        let id = PipelineLayoutId(Self::next_id(&self.internal.next_pipeline_layout_id));
        self.internal
            .pipeline_layouts
            .lock()
            .unwrap()
            .insert(id, Arc::new(layout));
        log::debug!(
            "WgpuDevice: Created pipeline layout '{}' with ID: {id:?}",
            descriptor.label.unwrap_or_default()
        );
        Ok(id)
    }

    fn destroy_pipeline_layout(&self, id: PipelineLayoutId) -> Result<(), ResourceError> {
        match self.internal.pipeline_layouts.lock().unwrap().remove(&id) {
            Some(_) => Ok(()),
            None => Err(ResourceError::NotFound),
        }
    }

    // --- Render Pipeline Operations ---

    fn create_render_pipeline(
        &self,
        descriptor: &RenderPipelineDescriptor,
    ) -> Result<RenderPipelineId, ResourceError> {
        let label = descriptor.label.as_deref().unwrap_or("unnamed pipeline");
        log::debug!("WgpuDevice: Creating render pipeline with label: {label:?}");

        // 1. Resolve the shader modules and the layout.
        let (vertex_module, fragment_module) = {
            let modules = self.internal.shader_modules.lock().unwrap();
            let vertex = modules
                .get(&descriptor.vertex_module)
                .cloned()
                .ok_or(ShaderError::NotFound {
                    id: descriptor.vertex_module,
                })?;
            let fragment = match descriptor.fragment_module {
                Some(id) => Some(
                    modules
                        .get(&id)
                        .cloned()
                        .ok_or(ShaderError::NotFound { id })?,
                ),
                None => None,
            };
            (vertex, fragment)
        };
        let layout = self
            .internal
            .pipeline_layouts
            .lock()
            .unwrap()
            .get(&descriptor.layout)
            .cloned()
            .ok_or_else(|| {
                PipelineError::LayoutCreationFailed(format!(
                    "pipeline layout {:?} does not exist",
                    descriptor.layout
                ))
            })?;

        // 2. Convert vertex buffers layout
        let attributes: Vec<Vec<wgpu::VertexAttribute>> = descriptor
            .vertex_buffers
            .iter()
            .map(|buffer| {
                buffer
                    .attributes
                    .iter()
                    .map(|attribute| wgpu::VertexAttribute {
                        format: attribute.format.into_wgpu(),
                        offset: attribute.offset,
                        shader_location: attribute.shader_location,
                    })
                    .collect()
            })
            .collect();
        let vertex_buffers: Vec<wgpu::VertexBufferLayout> = descriptor
            .vertex_buffers
            .iter()
            .zip(&attributes)
            .map(|(buffer, attributes)| wgpu::VertexBufferLayout {
                array_stride: buffer.array_stride,
                step_mode: buffer.step_mode.into_wgpu(),
                attributes,
            })
            .collect();

        // 3. Color targets and depth/stencil
        let color_targets: Vec<Option<wgpu::ColorTargetState>> = descriptor
            .color_targets
            .iter()
            .map(|target| Some(target.into_wgpu()))
            .collect();
        let depth_stencil = descriptor
            .depth_stencil
            .map(|state| wgpu::DepthStencilState {
                format: state.format.into_wgpu(),
                depth_write_enabled: Some(state.depth_write_enabled),
                depth_compare: Some(state.depth_compare.into_wgpu()),
                stencil: state.stencil.into_wgpu(),
                bias: state.bias.into_wgpu(),
            });

        // 4. Create the pipeline
        let pipeline = self.with_wgpu_device(|device| {
            let mut unclipped_depth = descriptor.primitive.unclipped_depth;
            if unclipped_depth && !device.features().contains(wgpu::Features::DEPTH_CLIP_CONTROL)
            {
                log::warn!(
                    "WgpuDevice: DEPTH_CLIP_CONTROL unavailable, pipeline '{label}' keeps depth clipping"
                );
                unclipped_depth = false;
            }

            Ok(device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &vertex_module,
                    entry_point: Some(VERTEX_ENTRY_POINT),
                    buffers: &vertex_buffers,
                    compilation_options: Default::default(),
                },
                fragment: fragment_module.as_ref().map(|module| wgpu::FragmentState {
                    module,
                    entry_point: Some(FRAGMENT_ENTRY_POINT),
                    targets: &color_targets,
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: descriptor.primitive.topology.into_wgpu(),
                    strip_index_format: None,
                    front_face: descriptor.primitive.front_face.into_wgpu(),
                    cull_mode: descriptor.primitive.cull_mode.into_wgpu(),
                    unclipped_depth,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    conservative: false,
                },
                depth_stencil,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            }))
        })?;

        let id = RenderPipelineId(Self::next_id(&self.internal.next_pipeline_id));
        self.internal
            .pipelines
            .lock()
            .unwrap()
            .insert(id, Arc::new(pipeline));
        log::info!("WgpuDevice: Created render pipeline '{label}' with ID: {id:?}");
        Ok(id)
    }

    fn destroy_render_pipeline(&self, id: RenderPipelineId) -> Result<(), ResourceError> {
        if self.internal.pipelines.lock().unwrap().remove(&id).is_some() {
            log::debug!("WgpuDevice: Destroyed render pipeline with ID: {id:?}");
            Ok(())
        } else {
            Err(PipelineError::InvalidRenderPipeline { id }.into())
        }
    }

    // --- Buffer Operations ---

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        let wgpu_buffer = self.with_wgpu_device(|device| {
            Ok(device.create_buffer(&wgpu::BufferDescriptor {
                label: descriptor.label.as_deref(),
                size: descriptor.size,
                usage: descriptor.usage.into_wgpu(),
                mapped_at_creation: false,
            }))
        })?;

        let id = BufferId(Self::next_id(&self.internal.next_buffer_id));
        self.track_allocation(descriptor.size);
        self.internal.buffers.lock().unwrap().insert(
            id,
            WgpuBufferEntry {
                wgpu_buffer: Arc::new(wgpu_buffer),
                size: descriptor.size,
            },
        );

        log::debug!(
            "WgpuDevice: Created buffer '{}' with ID: {:?}, size: {} bytes",
            descriptor.label.as_deref().unwrap_or_default(),
            id,
            descriptor.size
        );
        Ok(id)
    }

    fn create_buffer_with_data(
        &self,
        descriptor: &BufferDescriptor,
        data: &[u8],
    ) -> Result<BufferId, ResourceError> {
        let wgpu_buffer = self.with_wgpu_device(|device| {
            Ok(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: descriptor.label.as_deref(),
                contents: data,
                usage: descriptor.usage.into_wgpu(),
            }))
        })?;

        let id = BufferId(Self::next_id(&self.internal.next_buffer_id));
        let buffer_size = wgpu_buffer.size();
        self.track_allocation(buffer_size);
        self.internal.buffers.lock().unwrap().insert(
            id,
            WgpuBufferEntry {
                wgpu_buffer: Arc::new(wgpu_buffer),
                size: buffer_size,
            },
        );

        log::debug!(
            "WgpuDevice: Created buffer '{}' with initial data. ID: {:?}, size: {} bytes",
            descriptor.label.as_deref().unwrap_or_default(),
            id,
            buffer_size
        );
        Ok(id)
    }

    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        let buffer = self.get_wgpu_buffer(id).ok_or(ResourceError::NotFound)?;
        if offset + data.len() as u64 > buffer.size() {
            return Err(ResourceError::OutOfBounds);
        }

        let context = self.internal.context.lock().unwrap();
        context.queue.write_buffer(&buffer, offset, data);
        log::trace!(
            "WgpuDevice: Wrote {} bytes to buffer ID: {id:?} at offset {offset}",
            data.len()
        );
        Ok(())
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        let entry = self.internal.buffers.lock().unwrap().remove(&id);
        match entry {
            Some(entry) => {
                self.track_release(entry.size);
                entry.wgpu_buffer.destroy();
                log::debug!("WgpuDevice: Destroyed buffer with ID: {id:?}");
                Ok(())
            }
            None => Err(ResourceError::NotFound),
        }
    }

    // --- Texture Operations ---

    fn generate_textures(&self, count: u32) -> Result<Vec<TextureId>, ResourceError> {
        let ids: Vec<TextureId> = (0..count)
            .map(|_| TextureId(Self::next_id(&self.internal.next_texture_id)))
            .collect();
        let mut textures = self.internal.textures.lock().unwrap();
        textures.extend(ids.iter().map(|&id| (id, None)));
        log::trace!("WgpuDevice: Generated {count} texture names");
        Ok(ids)
    }

    fn allocate_texture_storage(
        &self,
        id: TextureId,
        descriptor: &TextureDescriptor,
    ) -> Result<(), ResourceError> {
        if !self.internal.textures.lock().unwrap().contains_key(&id) {
            return Err(ResourceError::InvalidHandle);
        }
        let size = descriptor.size;
        if size.width == 0 || size.height == 0 || descriptor.mip_level_count == 0 {
            return Err(ResourceError::UnsupportedFormat(format!(
                "texture {id:?} has a zero dimension or no mip level"
            )));
        }
        if descriptor.kind == TextureKind::Cube
            && (size.depth_or_array_layers != 6 || size.width != size.height)
        {
            return Err(ResourceError::UnsupportedFormat(format!(
                "cube texture {id:?} must have six square layers"
            )));
        }

        let wgpu_texture = self.with_wgpu_device(|device| {
            Ok(device.create_texture(&wgpu::TextureDescriptor {
                label: descriptor.label.as_deref(),
                size: size.into_wgpu(),
                mip_level_count: descriptor.mip_level_count,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: descriptor.format.into_wgpu(),
                usage: descriptor.usage.into_wgpu(),
                view_formats: &[],
            }))
        })?;
        let size_in_bytes = Self::texture_size_in_bytes(descriptor);
        let entry = WgpuTextureEntry {
            wgpu_texture: Arc::new(wgpu_texture),
            info: TextureInfo {
                size,
                format: descriptor.format,
                mip_level_count: descriptor.mip_level_count,
                usage: descriptor.usage,
                kind: descriptor.kind,
            },
            size: size_in_bytes,
        };

        let previous = self.internal.textures.lock().unwrap().insert(id, Some(entry));
        if let Some(Some(previous)) = previous {
            self.track_release(previous.size);
        }
        self.track_allocation(size_in_bytes);
        self.forget_views(id);

        log::debug!(
            "WgpuDevice: Allocated texture '{}' ({id:?}): {}x{}x{} {:?}, {} mip(s), {size_in_bytes} bytes",
            descriptor.label.as_deref().unwrap_or_default(),
            size.width,
            size.height,
            size.depth_or_array_layers,
            descriptor.format,
            descriptor.mip_level_count
        );
        Ok(())
    }

    fn texture_info(&self, id: TextureId) -> Option<TextureInfo> {
        let textures = self.internal.textures.lock().unwrap();
        textures.get(&id)?.as_ref().map(|entry| entry.info)
    }

    fn write_texture(&self, write: &TextureWrite) -> Result<(), ResourceError> {
        let (texture, info) = self.get_wgpu_texture(write.texture)?;
        let level = info.size.mip_level_size(write.mip_level);
        if write.mip_level >= info.mip_level_count
            || write.layer >= info.size.depth_or_array_layers
            || write.size.width > level.width
            || write.size.height > level.height
        {
            return Err(ResourceError::OutOfBounds);
        }
        let min_row = write.size.width * info.format.bytes_per_pixel();
        if write.bytes_per_row < min_row
            || (write.data.len() as u64) < write.bytes_per_row as u64 * write.size.height as u64
        {
            return Err(ResourceError::OutOfBounds);
        }

        let context = self.internal.context.lock().unwrap();
        context.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: write.mip_level,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: 0,
                    z: write.layer,
                },
                aspect: wgpu::TextureAspect::All,
            },
            write.data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(write.bytes_per_row),
                rows_per_image: Some(write.size.height),
            },
            wgpu::Extent3d {
                width: write.size.width,
                height: write.size.height,
                depth_or_array_layers: 1,
            },
        );
        log::trace!(
            "WgpuDevice: Wrote {} bytes to texture {:?} (mip {}, layer {})",
            write.data.len(),
            write.texture,
            write.mip_level,
            write.layer
        );
        Ok(())
    }

    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError> {
        let removed = self.internal.textures.lock().unwrap().remove(&id);
        match removed {
            Some(storage) => {
                self.forget_views(id);
                if let Some(entry) = storage {
                    self.track_release(entry.size);
                    entry.wgpu_texture.destroy();
                }
                log::debug!("WgpuDevice: Destroyed texture with ID: {id:?}");
                Ok(())
            }
            None => Err(ResourceError::NotFound),
        }
    }

    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<SamplerId, ResourceError> {
        let sampler = self.with_wgpu_device(|device| {
            Ok(device.create_sampler(&wgpu::SamplerDescriptor {
                label: descriptor.label.as_deref(),
                address_mode_u: descriptor.address_mode_u.into_wgpu(),
                address_mode_v: descriptor.address_mode_v.into_wgpu(),
                address_mode_w: descriptor.address_mode_w.into_wgpu(),
                mag_filter: descriptor.mag_filter.into_wgpu(),
                min_filter: descriptor.min_filter.into_wgpu(),
                mipmap_filter: descriptor.mipmap_filter.into_wgpu(),
                compare: descriptor.compare.map(IntoWgpu::into_wgpu),
                ..Default::default()
            }))
        })?;

        let id = SamplerId(Self::next_id(&self.internal.next_sampler_id));
        self.internal
            .samplers
            .lock()
            .unwrap()
            .insert(id, Arc::new(sampler));
        log::debug!(
            "WgpuDevice: Created sampler '{}' with ID: {id:?}",
            descriptor.label.as_deref().unwrap_or_default()
        );
        Ok(id)
    }

    fn destroy_sampler(&self, id: SamplerId) -> Result<(), ResourceError> {
        if self.internal.samplers.lock().unwrap().remove(&id).is_some() {
            log::debug!("WgpuDevice: Destroyed sampler with ID: {id:?}");
            Ok(())
        } else {
            Err(ResourceError::NotFound)
        }
    }

    // --- Commands ---

    fn create_command_encoder(&self, label: Option<&str>) -> Box<dyn CommandEncoder> {
        let context_guard = self.internal.context.lock().unwrap();
        let encoder = context_guard
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label });

        Box::new(WgpuCommandEncoder {
            encoder,
            device: self.clone(),
        })
    }

    fn submit_command_buffer(&self, command_buffer: CommandBufferId) {
        let buffer = self
            .internal
            .pending_command_buffers
            .lock()
            .unwrap()
            .remove(&command_buffer);

        match buffer {
            Some(buffer) => {
                let context_guard = self.internal.context.lock().unwrap();
                context_guard.queue.submit(std::iter::once(buffer));
            }
            None => log::error!(
                "Attempted to submit a CommandBufferId ({command_buffer:?}) that does not exist."
            ),
        }
    }

    // --- Queries ---

    fn surface_format(&self) -> Option<TextureFormat> {
        let context = self.internal.context.lock().ok()?;
        context.surface_format().and_then(from_wgpu_texture_format)
    }

    fn adapter_info(&self) -> GraphicsAdapterInfo {
        let context = self.internal.context.lock().unwrap();
        GraphicsAdapterInfo {
            name: context.adapter_name.clone(),
            backend_type: backend_type(context.adapter_backend),
        }
    }

    fn supports_feature(&self, feature: DeviceFeature) -> bool {
        let context = self.internal.context.lock().unwrap();
        let required = match feature {
            DeviceFeature::DepthClipControl => wgpu::Features::DEPTH_CLIP_CONTROL,
            DeviceFeature::Float32Filterable => wgpu::Features::FLOAT32_FILTERABLE,
        };
        context.active_device_features.contains(required)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_core::math::Extent3D;
    use umbra_core::renderer::api::TextureUsage;

    fn descriptor(width: u32, height: u32, layers: u32, mips: u32) -> TextureDescriptor<'static> {
        TextureDescriptor {
            label: None,
            size: Extent3D {
                width,
                height,
                depth_or_array_layers: layers,
            },
            mip_level_count: mips,
            format: TextureFormat::Rgba16Float,
            usage: TextureUsage::TEXTURE_BINDING,
            kind: if layers == 6 {
                TextureKind::Cube
            } else {
                TextureKind::D2
            },
        }
    }

    #[test]
    fn texture_size_counts_every_mip() {
        // 4x4 + 2x2 + 1x1 texels of 8 bytes.
        assert_eq!(
            WgpuDevice::texture_size_in_bytes(&descriptor(4, 4, 1, 3)),
            (16 + 4 + 1) * 8
        );
    }

    #[test]
    fn texture_size_counts_every_layer() {
        assert_eq!(
            WgpuDevice::texture_size_in_bytes(&descriptor(8, 8, 6, 1)),
            8 * 8 * 6 * 8
        );
    }

    #[test]
    fn view_keys_know_their_texture() {
        let level = ViewKey::Level {
            texture: TextureId(3),
            mip_level: 2,
            layer: 5,
        };
        let binding = ViewKey::Binding {
            texture: TextureId(3),
            dimension: TextureViewDimension::Cube,
            aspect: TextureAspect::All,
        };
        assert_eq!(level.texture(), TextureId(3));
        assert_eq!(binding.texture(), level.texture());
        assert_ne!(level, binding);
    }
}
