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

//! Test doubles: a recording [`GraphicsDevice`] and an in-memory
//! [`ContentResolver`].
//!
//! Enabled for this crate's tests and, through the `testing` feature, for
//! the tests of downstream crates.

use crate::content::{ContentError, ContentResolver};
use crate::math::LinearRgba;
use crate::renderer::api::*;
use crate::renderer::error::{ResourceError, ShaderError, SourceLocation};
use crate::renderer::resource::{ColorSpace, Image, ImageDecoder};
use crate::renderer::traits::{CommandEncoder, GraphicsDevice, RenderPass, TextureInfo};
use ahash::AHashMap;
use std::any::Any;
use std::io::{Cursor, Read, Write};
use std::ops::Range;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Kinds of device object tracked by the [`RecordingDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Shader module.
    ShaderModule,
    /// Bind group layout.
    BindGroupLayout,
    /// Bind group.
    BindGroup,
    /// Pipeline layout.
    PipelineLayout,
    /// Render pipeline.
    RenderPipeline,
    /// Buffer.
    Buffer,
    /// Texture name, with or without storage.
    Texture,
    /// Sampler.
    Sampler,
}

/// The state a render pipeline was created with.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPipeline {
    /// Debug label.
    pub label: String,
    /// Rasterizer state.
    pub primitive: PrimitiveState,
    /// Depth and stencil state.
    pub depth_stencil: Option<DepthStencilState>,
    /// Color targets.
    pub color_targets: Vec<ColorTargetState>,
}

/// One draw call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDraw {
    /// Pipeline bound at the time of the draw.
    pub pipeline: Option<RenderPipelineId>,
    /// `true` for `draw_indexed`.
    pub indexed: bool,
    /// Vertex or index count.
    pub elements: u32,
    /// Instance count.
    pub instances: u32,
    /// Stencil reference at the time of the draw.
    pub stencil_reference: u32,
}

/// One render pass and everything recorded inside it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordedPass {
    /// Pass label.
    pub label: String,
    /// Color attachments with their load operation.
    pub colors: Vec<(AttachmentView, LoadOp<LinearRgba>)>,
    /// Depth attachment.
    pub depth: Option<AttachmentView>,
    /// Depth load operation; `None` when depth is read-only.
    pub depth_load: Option<LoadOp<f32>>,
    /// Stencil load operation; `None` when stencil is read-only or absent.
    pub stencil_load: Option<LoadOp<u32>>,
    /// Pipelines set, in order.
    pub pipelines: Vec<RenderPipelineId>,
    /// Bind groups set, as `(group index, bind group)`, in order.
    pub bind_groups: Vec<(u32, BindGroupId)>,
    /// Draws, in order.
    pub draws: Vec<RecordedDraw>,
    /// Last viewport set.
    pub viewport: Option<Viewport>,
}

impl RecordedPass {
    /// Number of draw calls.
    pub fn draw_count(&self) -> usize {
        self.draws.len()
    }

    /// `true` when the first color attachment (or depth, for depth-only
    /// passes) is cleared.
    pub fn clears(&self) -> bool {
        match self.colors.first() {
            Some((_, load)) => matches!(load, LoadOp::Clear(_)),
            None => matches!(self.depth_load, Some(LoadOp::Clear(_))),
        }
    }

    /// `true` when the pass renders to the surface.
    pub fn targets_surface(&self) -> bool {
        self.colors
            .iter()
            .any(|(view, _)| *view == AttachmentView::Surface)
    }

    /// `true` when any color attachment is a level or layer of `texture`.
    pub fn writes_texture(&self, texture: TextureId) -> bool {
        self.colors
            .iter()
            .any(|(view, _)| view.texture_id() == Some(texture))
    }
}

/// A command recorded outside render passes, or a pass.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    /// A render pass.
    Pass(RecordedPass),
    /// A texture blit.
    Blit {
        /// Source region.
        source: TextureRegion,
        /// Destination region.
        destination: TextureRegion,
        /// Filter used for rescaling.
        filter: FilterMode,
    },
    /// A mip chain regeneration.
    GenerateMipmaps(TextureId),
}

/// The commands of one finished encoder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordedCommandBuffer {
    /// Encoder label.
    pub label: String,
    /// Commands in recording order.
    pub commands: Vec<RecordedCommand>,
}

#[derive(Debug)]
struct TextureRecord {
    label: String,
    info: Option<TextureInfo>,
}

#[derive(Debug, Default)]
struct DeviceState {
    next_id: usize,
    next_command_buffer: u64,
    live: AHashMap<(ResourceKind, usize), String>,
    created: AHashMap<ResourceKind, usize>,
    textures: AHashMap<usize, TextureRecord>,
    texture_batches: Vec<u32>,
    texture_writes: usize,
    buffer_writes: usize,
    pipelines: AHashMap<usize, RecordedPipeline>,
    bind_group_textures: AHashMap<usize, Vec<(u32, TextureId)>>,
    finished: AHashMap<u64, RecordedCommandBuffer>,
    submitted: Vec<RecordedCommandBuffer>,
    shader_failures: Vec<String>,
    storage_failures: Vec<String>,
    allocation_failures: Vec<String>,
}

impl DeviceState {
    fn create(&mut self, kind: ResourceKind, label: Option<&str>) -> usize {
        self.next_id += 1;
        let id = self.next_id;
        self.live
            .insert((kind, id), label.unwrap_or_default().to_string());
        *self.created.entry(kind).or_insert(0) += 1;
        id
    }

    fn destroy(&mut self, kind: ResourceKind, id: usize) -> Result<(), ResourceError> {
        self.live
            .remove(&(kind, id))
            .map(|_| ())
            .ok_or(ResourceError::InvalidHandle)
    }
}

/// A [`GraphicsDevice`] that records every call instead of rendering.
///
/// IDs are sequential across all object kinds. Destroying an object that is
/// not alive fails with [`ResourceError::InvalidHandle`], which makes double
/// disposal visible in tests.
#[derive(Debug, Clone)]
pub struct RecordingDevice {
    state: Arc<Mutex<DeviceState>>,
    surface_format: Option<TextureFormat>,
}

impl Default for RecordingDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingDevice {
    /// A device with a `Bgra8UnormSrgb` surface.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(DeviceState::default())),
            surface_format: Some(TextureFormat::Bgra8UnormSrgb),
        }
    }

    /// A device without presentation surface.
    pub fn headless() -> Self {
        Self {
            surface_format: None,
            ..Self::new()
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap()
    }

    /// Makes shader compilation fail for sources containing `marker`.
    pub fn fail_shader_containing(&self, marker: &str) {
        self.state().shader_failures.push(marker.to_string());
    }

    /// Makes textures whose label contains `marker` report no storage, so
    /// framebuffers attaching them fail their completeness check.
    pub fn fail_storage_for(&self, marker: &str) {
        self.state().storage_failures.push(marker.to_string());
    }

    /// Makes storage allocation itself return an error for textures whose
    /// label contains `marker`.
    pub fn fail_allocation_for(&self, marker: &str) {
        self.state().allocation_failures.push(marker.to_string());
    }

    /// Live objects of `kind`.
    pub fn live_count(&self, kind: ResourceKind) -> usize {
        self.state().live.keys().filter(|(k, _)| *k == kind).count()
    }

    /// Objects of `kind` created so far.
    pub fn created_count(&self, kind: ResourceKind) -> usize {
        self.state().created.get(&kind).copied().unwrap_or(0)
    }

    /// Live buffers.
    pub fn live_buffer_count(&self) -> usize {
        self.live_count(ResourceKind::Buffer)
    }

    /// Live texture names.
    pub fn live_texture_count(&self) -> usize {
        self.live_count(ResourceKind::Texture)
    }

    /// Live samplers.
    pub fn live_sampler_count(&self) -> usize {
        self.live_count(ResourceKind::Sampler)
    }

    /// Labels of live objects of `kind` containing `pattern`.
    pub fn live_labels(&self, kind: ResourceKind, pattern: &str) -> Vec<String> {
        let mut labels: Vec<String> = self
            .state()
            .live
            .iter()
            .filter(|((k, _), label)| *k == kind && label.contains(pattern))
            .map(|(_, label)| label.clone())
            .collect();
        labels.sort();
        labels
    }

    /// Sizes of the texture name batches generated so far.
    pub fn texture_batches(&self) -> Vec<u32> {
        self.state().texture_batches.clone()
    }

    /// Label given to a texture's storage.
    pub fn texture_label(&self, id: TextureId) -> Option<String> {
        self.state().textures.get(&id.0).map(|t| t.label.clone())
    }

    /// Number of `write_texture` calls.
    pub fn texture_write_count(&self) -> usize {
        self.state().texture_writes
    }

    /// Number of buffer uploads (`create_buffer_with_data` and `write_buffer`).
    pub fn buffer_write_count(&self) -> usize {
        self.state().buffer_writes
    }

    /// State a pipeline was created with.
    pub fn pipeline(&self, id: RenderPipelineId) -> Option<RecordedPipeline> {
        self.state().pipelines.get(&id.0).cloned()
    }

    /// Label of a pipeline, or an empty string.
    pub fn pipeline_label(&self, id: RenderPipelineId) -> String {
        self.pipeline(id).map(|p| p.label).unwrap_or_default()
    }

    /// Submitted command buffers, in submission order.
    pub fn submissions(&self) -> Vec<RecordedCommandBuffer> {
        self.state().submitted.clone()
    }

    /// Number of submitted command buffers.
    pub fn submission_count(&self) -> usize {
        self.state().submitted.len()
    }

    /// Every submitted command, flattened in submission order.
    pub fn commands(&self) -> Vec<RecordedCommand> {
        self.state()
            .submitted
            .iter()
            .flat_map(|buffer| buffer.commands.iter().cloned())
            .collect()
    }

    /// Every submitted render pass, in order.
    pub fn passes(&self) -> Vec<RecordedPass> {
        self.commands()
            .into_iter()
            .filter_map(|command| match command {
                RecordedCommand::Pass(pass) => Some(pass),
                _ => None,
            })
            .collect()
    }

    /// Submitted render passes whose label starts with `prefix`.
    pub fn passes_labelled(&self, prefix: &str) -> Vec<RecordedPass> {
        self.passes()
            .into_iter()
            .filter(|pass| pass.label.starts_with(prefix))
            .collect()
    }

    /// Submitted blits as `(source, destination)` pairs.
    pub fn blits(&self) -> Vec<(TextureRegion, TextureRegion)> {
        self.commands()
            .into_iter()
            .filter_map(|command| match command {
                RecordedCommand::Blit {
                    source,
                    destination,
                    ..
                } => Some((source, destination)),
                _ => None,
            })
            .collect()
    }

    /// Textures whose mip chain was regenerated, in order.
    pub fn mipmap_generations(&self) -> Vec<TextureId> {
        self.commands()
            .into_iter()
            .filter_map(|command| match command {
                RecordedCommand::GenerateMipmaps(texture) => Some(texture),
                _ => None,
            })
            .collect()
    }

    /// Textures referenced by a bind group, as `(binding, texture)` pairs.
    pub fn bind_group_textures(&self, id: BindGroupId) -> Vec<(u32, TextureId)> {
        self.state()
            .bind_group_textures
            .get(&id.0)
            .cloned()
            .unwrap_or_default()
    }

    /// Forgets submitted command buffers, keeping resources.
    pub fn clear_submissions(&self) {
        self.state().submitted.clear();
    }
}

fn failing_line(source: &str, marker: &str) -> Option<u32> {
    source
        .lines()
        .position(|line| line.contains(marker))
        .map(|index| index as u32 + 1)
}

impl GraphicsDevice for RecordingDevice {
    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError> {
        let ShaderSourceData::Wgsl(source) = &descriptor.source;
        let mut state = self.state();
        let label = descriptor.label.unwrap_or("shader").to_string();
        let failure = state
            .shader_failures
            .iter()
            .find_map(|marker| failing_line(source, marker).map(|line| (marker.clone(), line)));
        if let Some((marker, line)) = failure {
            return Err(ResourceError::Shader(ShaderError::CompilationError {
                label: label.clone(),
                details: format!("rejected source containing `{marker}`"),
                location: Some(SourceLocation { file: label, line }),
            }));
        }
        Ok(ShaderModuleId(
            state.create(ResourceKind::ShaderModule, descriptor.label),
        ))
    }

    fn destroy_shader_module(&self, id: ShaderModuleId) -> Result<(), ResourceError> {
        self.state().destroy(ResourceKind::ShaderModule, id.0)
    }

    fn create_bind_group_layout(
        &self,
        descriptor: &BindGroupLayoutDescriptor,
    ) -> Result<BindGroupLayoutId, ResourceError> {
        Ok(BindGroupLayoutId(
            self.state()
                .create(ResourceKind::BindGroupLayout, descriptor.label),
        ))
    }

    fn destroy_bind_group_layout(&self, id: BindGroupLayoutId) -> Result<(), ResourceError> {
        self.state().destroy(ResourceKind::BindGroupLayout, id.0)
    }

    fn create_bind_group(
        &self,
        descriptor: &BindGroupDescriptor,
    ) -> Result<BindGroupId, ResourceError> {
        let mut state = self.state();
        for entry in descriptor.entries {
            if let BindingResource::Texture(binding) = entry.resource {
                if !state
                    .live
                    .contains_key(&(ResourceKind::Texture, binding.texture.0))
                {
                    return Err(ResourceError::Disposed("texture"));
                }
            }
        }
        let id = state.create(ResourceKind::BindGroup, descriptor.label);
        let textures = descriptor
            .entries
            .iter()
            .filter_map(|entry| match entry.resource {
                BindingResource::Texture(binding) => Some((entry.binding, binding.texture)),
                _ => None,
            })
            .collect();
        state.bind_group_textures.insert(id, textures);
        Ok(BindGroupId(id))
    }

    fn destroy_bind_group(&self, id: BindGroupId) -> Result<(), ResourceError> {
        self.state().destroy(ResourceKind::BindGroup, id.0)
    }

    fn create_pipeline_layout(
        &self,
        descriptor: &PipelineLayoutDescriptor,
    ) -> Result<PipelineLayoutId, ResourceError> {
        Ok(PipelineLayoutId(
            self.state()
                .create(ResourceKind::PipelineLayout, descriptor.label),
        ))
    }

    fn destroy_pipeline_layout(&self, id: PipelineLayoutId) -> Result<(), ResourceError> {
        self.state().destroy(ResourceKind::PipelineLayout, id.0)
    }

    fn create_render_pipeline(
        &self,
        descriptor: &RenderPipelineDescriptor,
    ) -> Result<RenderPipelineId, ResourceError> {
        let mut state = self.state();
        let label = descriptor.label.as_deref();
        let id = state.create(ResourceKind::RenderPipeline, label);
        state.pipelines.insert(
            id,
            RecordedPipeline {
                label: label.unwrap_or_default().to_string(),
                primitive: descriptor.primitive,
                depth_stencil: descriptor.depth_stencil,
                color_targets: descriptor.color_targets.to_vec(),
            },
        );
        Ok(RenderPipelineId(id))
    }

    fn destroy_render_pipeline(&self, id: RenderPipelineId) -> Result<(), ResourceError> {
        self.state().destroy(ResourceKind::RenderPipeline, id.0)
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        Ok(BufferId(
            self.state()
                .create(ResourceKind::Buffer, descriptor.label.as_deref()),
        ))
    }

    fn create_buffer_with_data(
        &self,
        descriptor: &BufferDescriptor,
        _data: &[u8],
    ) -> Result<BufferId, ResourceError> {
        let mut state = self.state();
        state.buffer_writes += 1;
        Ok(BufferId(
            state.create(ResourceKind::Buffer, descriptor.label.as_deref()),
        ))
    }

    fn write_buffer(&self, id: BufferId, _offset: u64, _data: &[u8]) -> Result<(), ResourceError> {
        let mut state = self.state();
        if !state.live.contains_key(&(ResourceKind::Buffer, id.0)) {
            return Err(ResourceError::Disposed("buffer"));
        }
        state.buffer_writes += 1;
        Ok(())
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        self.state().destroy(ResourceKind::Buffer, id.0)
    }

    fn generate_textures(&self, count: u32) -> Result<Vec<TextureId>, ResourceError> {
        let mut state = self.state();
        state.texture_batches.push(count);
        Ok((0..count)
            .map(|_| TextureId(state.create(ResourceKind::Texture, None)))
            .collect())
    }

    fn allocate_texture_storage(
        &self,
        id: TextureId,
        descriptor: &TextureDescriptor,
    ) -> Result<(), ResourceError> {
        let mut state = self.state();
        let label = descriptor.label.as_deref().unwrap_or_default().to_string();
        if state
            .allocation_failures
            .iter()
            .any(|marker| label.contains(marker.as_str()))
        {
            return Err(ResourceError::BackendError(format!("out of memory for {label}")));
        }
        match state.live.get_mut(&(ResourceKind::Texture, id.0)) {
            Some(live_label) => *live_label = label.clone(),
            None => return Err(ResourceError::Disposed("texture")),
        }
        let failed = state
            .storage_failures
            .iter()
            .any(|marker| label.contains(marker.as_str()));
        let info = (!failed).then(|| TextureInfo {
            size: descriptor.size,
            format: descriptor.format,
            mip_level_count: descriptor.mip_level_count,
            usage: descriptor.usage,
            kind: descriptor.kind,
        });
        state.textures.insert(id.0, TextureRecord { label, info });
        Ok(())
    }

    fn texture_info(&self, id: TextureId) -> Option<TextureInfo> {
        self.state().textures.get(&id.0).and_then(|t| t.info)
    }

    fn write_texture(&self, write: &TextureWrite) -> Result<(), ResourceError> {
        let mut state = self.state();
        let info = state
            .textures
            .get(&write.texture.0)
            .and_then(|t| t.info)
            .ok_or(ResourceError::MissingStorage(write.texture))?;
        if write.mip_level >= info.mip_level_count
            || write.layer >= info.size.depth_or_array_layers
        {
            return Err(ResourceError::OutOfBounds);
        }
        state.texture_writes += 1;
        Ok(())
    }

    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError> {
        let mut state = self.state();
        state.destroy(ResourceKind::Texture, id.0)?;
        state.textures.remove(&id.0);
        Ok(())
    }

    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<SamplerId, ResourceError> {
        Ok(SamplerId(
            self.state()
                .create(ResourceKind::Sampler, descriptor.label.as_deref()),
        ))
    }

    fn destroy_sampler(&self, id: SamplerId) -> Result<(), ResourceError> {
        self.state().destroy(ResourceKind::Sampler, id.0)
    }

    fn create_command_encoder(&self, label: Option<&str>) -> Box<dyn CommandEncoder> {
        Box::new(RecordingEncoder {
            state: Arc::clone(&self.state),
            buffer: RecordedCommandBuffer {
                label: label.unwrap_or_default().to_string(),
                commands: Vec::new(),
            },
        })
    }

    fn submit_command_buffer(&self, command_buffer: CommandBufferId) {
        let mut state = self.state();
        if let Some(buffer) = state.finished.remove(&command_buffer.0) {
            state.submitted.push(buffer);
        }
    }

    fn surface_format(&self) -> Option<TextureFormat> {
        self.surface_format
    }

    fn adapter_info(&self) -> GraphicsAdapterInfo {
        GraphicsAdapterInfo {
            name: "Recording device".to_string(),
            backend_type: GraphicsBackendType::Unknown,
        }
    }

    fn supports_feature(&self, _feature: DeviceFeature) -> bool {
        true
    }
}

struct RecordingEncoder {
    state: Arc<Mutex<DeviceState>>,
    buffer: RecordedCommandBuffer,
}

struct RecordingPass<'e> {
    pass: RecordedPass,
    current_pipeline: Option<RenderPipelineId>,
    stencil_reference: u32,
    sink: &'e mut Vec<RecordedCommand>,
}

impl Drop for RecordingPass<'_> {
    fn drop(&mut self) {
        self.sink
            .push(RecordedCommand::Pass(std::mem::take(&mut self.pass)));
    }
}

impl<'e> RenderPass<'e> for RecordingPass<'e> {
    fn set_pipeline(&mut self, pipeline: RenderPipelineId) {
        self.current_pipeline = Some(pipeline);
        self.pass.pipelines.push(pipeline);
    }

    fn set_bind_group(&mut self, index: u32, bind_group: BindGroupId, _offsets: &[u32]) {
        self.pass.bind_groups.push((index, bind_group));
    }

    fn set_vertex_buffer(&mut self, _slot: u32, _buffer: BufferId, _offset: u64) {}

    fn set_index_buffer(&mut self, _buffer: BufferId, _offset: u64, _index_format: IndexFormat) {}

    fn set_viewport(&mut self, viewport: &Viewport) {
        self.pass.viewport = Some(*viewport);
    }

    fn set_stencil_reference(&mut self, reference: u32) {
        self.stencil_reference = reference;
    }

    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        self.pass.draws.push(RecordedDraw {
            pipeline: self.current_pipeline,
            indexed: false,
            elements: vertices.len() as u32,
            instances: instances.len() as u32,
            stencil_reference: self.stencil_reference,
        });
    }

    fn draw_indexed(&mut self, indices: Range<u32>, _base_vertex: i32, instances: Range<u32>) {
        self.pass.draws.push(RecordedDraw {
            pipeline: self.current_pipeline,
            indexed: true,
            elements: indices.len() as u32,
            instances: instances.len() as u32,
            stencil_reference: self.stencil_reference,
        });
    }
}

impl CommandEncoder for RecordingEncoder {
    fn begin_render_pass<'encoder>(
        &'encoder mut self,
        descriptor: &RenderPassDescriptor<'_>,
    ) -> Box<dyn RenderPass<'encoder> + 'encoder> {
        let depth = descriptor.depth_stencil_attachment;
        Box::new(RecordingPass {
            pass: RecordedPass {
                label: descriptor.label.unwrap_or_default().to_string(),
                colors: descriptor
                    .color_attachments
                    .iter()
                    .map(|a| (a.view, a.ops.load))
                    .collect(),
                depth: depth.map(|d| d.view),
                depth_load: depth.and_then(|d| d.depth_ops).map(|ops| ops.load),
                stencil_load: depth.and_then(|d| d.stencil_ops).map(|ops| ops.load),
                ..Default::default()
            },
            current_pipeline: None,
            stencil_reference: 0,
            sink: &mut self.buffer.commands,
        })
    }

    fn blit_texture(
        &mut self,
        source: TextureRegion,
        destination: TextureRegion,
        filter: FilterMode,
    ) {
        self.buffer.commands.push(RecordedCommand::Blit {
            source,
            destination,
            filter,
        });
    }

    fn generate_mipmaps(&mut self, texture: TextureId) {
        self.buffer
            .commands
            .push(RecordedCommand::GenerateMipmaps(texture));
    }

    fn finish(self: Box<Self>) -> CommandBufferId {
        let mut state = self.state.lock().unwrap();
        state.next_command_buffer += 1;
        let id = state.next_command_buffer;
        state.finished.insert(id, self.buffer);
        CommandBufferId(id)
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// An in-memory [`ContentResolver`] for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryContent {
    files: Arc<Mutex<AHashMap<String, Vec<u8>>>>,
}

impl MemoryContent {
    /// An empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a text file.
    pub fn with_text(self, path: &str, text: &str) -> Self {
        self.with_bytes(path, text.as_bytes())
    }

    /// Adds a binary file.
    pub fn with_bytes(self, path: &str, bytes: &[u8]) -> Self {
        self.insert(path, bytes);
        self
    }

    /// Adds or replaces a file.
    pub fn insert(&self, path: &str, bytes: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), bytes.to_vec());
    }
}

struct MemoryWriter {
    path: String,
    data: Vec<u8>,
    files: Arc<Mutex<AHashMap<String, Vec<u8>>>>,
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.data.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.files
            .lock()
            .unwrap()
            .insert(self.path.clone(), self.data.clone());
        Ok(())
    }
}

impl Drop for MemoryWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

impl ContentResolver for MemoryContent {
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        self.files
            .lock()
            .unwrap()
            .contains_key(path)
            .then(|| PathBuf::from(path))
    }

    fn open_read(&self, path: &str) -> Result<Box<dyn Read + Send>, ContentError> {
        let bytes = self
            .files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| ContentError::NotFound(path.to_string()))?;
        Ok(Box::new(Cursor::new(bytes)))
    }

    fn open_write(&self, path: &str) -> Result<Box<dyn Write + Send>, ContentError> {
        Ok(Box::new(MemoryWriter {
            path: path.to_string(),
            data: Vec::new(),
            files: Arc::clone(&self.files),
        }))
    }
}

/// An [`ImageDecoder`] producing a 2x2 image filled with the first four
/// bytes of the input; inputs shorter than four bytes fail to decode.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolidImageDecoder;

impl ImageDecoder for SolidImageDecoder {
    fn decode(&self, path: &str, bytes: &[u8], color_space: ColorSpace) -> Result<Image, ContentError> {
        let texel = bytes.get(..4).ok_or_else(|| ContentError::Parse {
            path: path.to_string(),
            message: format!("{} bytes is too short for a texel", bytes.len()),
        })?;
        Ok(Image::from_rgba8(2, 2, color_space, texel.repeat(4)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_destroy_is_reported() {
        let device = RecordingDevice::new();
        let id = device
            .create_buffer(&BufferDescriptor {
                label: None,
                size: 16,
                usage: BufferUsage::UNIFORM,
            })
            .unwrap();
        assert!(device.destroy_buffer(id).is_ok());
        assert!(matches!(
            device.destroy_buffer(id),
            Err(ResourceError::InvalidHandle)
        ));
    }

    #[test]
    fn test_passes_are_recorded_on_submit() {
        let device = RecordingDevice::new();
        let mut encoder = device.create_command_encoder(Some("frame"));
        {
            let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("present"),
                color_attachments: &[RenderPassColorAttachment {
                    view: AttachmentView::Surface,
                    ops: Operations::clear(LinearRgba::BLACK),
                }],
                depth_stencil_attachment: None,
            });
            pass.set_pipeline(RenderPipelineId(3));
            pass.draw(0..3, 0..1);
        }
        let buffer = encoder.finish();
        assert!(device.passes().is_empty());

        device.submit_command_buffer(buffer);
        let passes = device.passes();
        assert_eq!(passes.len(), 1);
        assert!(passes[0].targets_surface());
        assert!(passes[0].clears());
        assert_eq!(passes[0].draws[0].pipeline, Some(RenderPipelineId(3)));
    }

    #[test]
    fn test_memory_content_round_trip() {
        let content = MemoryContent::new().with_text("a.txt", "one\ntwo");
        assert!(content.exists("a.txt"));
        assert_eq!(content.read_lines("a.txt").unwrap(), vec!["one", "two"]);
        {
            let mut writer = content.open_write("b.txt").unwrap();
            writer.write_all(b"written").unwrap();
        }
        assert_eq!(content.read_text("b.txt").unwrap(), "written");
    }
}
