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

use crate::math::Extent3D;
use crate::renderer::api::*;
use crate::renderer::error::ResourceError;
use crate::renderer::traits::CommandEncoder;
use std::fmt::Debug;

/// Storage information of a texture, as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureInfo {
    /// Size of mip level 0.
    pub size: Extent3D,
    /// Pixel format.
    pub format: TextureFormat,
    /// Mip level count.
    pub mip_level_count: u32,
    /// Allowed usages.
    pub usage: TextureUsage,
    /// Storage shape.
    pub kind: TextureKind,
}

/// The main interface for creating and managing GPU resources.
///
/// All methods take `&self`; implementations use interior mutability. Only the
/// render thread issues calls; the `Send + Sync` bound lets the device be shared
/// through an `Arc` with the context that owns it.
pub trait GraphicsDevice: Send + Sync + Debug + 'static {
    /// Compiles a shader module.
    ///
    /// ## Errors
    /// [`ResourceError::Shader`] carrying the compiler's messages on failure.
    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError>;

    /// Destroys a shader module.
    fn destroy_shader_module(&self, id: ShaderModuleId) -> Result<(), ResourceError>;

    /// Creates a bind group layout.
    fn create_bind_group_layout(
        &self,
        descriptor: &BindGroupLayoutDescriptor,
    ) -> Result<BindGroupLayoutId, ResourceError>;

    /// Destroys a bind group layout.
    fn destroy_bind_group_layout(&self, id: BindGroupLayoutId) -> Result<(), ResourceError>;

    /// Creates a bind group.
    fn create_bind_group(
        &self,
        descriptor: &BindGroupDescriptor,
    ) -> Result<BindGroupId, ResourceError>;

    /// Destroys a bind group.
    fn destroy_bind_group(&self, id: BindGroupId) -> Result<(), ResourceError>;

    /// Creates a pipeline layout.
    fn create_pipeline_layout(
        &self,
        descriptor: &PipelineLayoutDescriptor,
    ) -> Result<PipelineLayoutId, ResourceError>;

    /// Destroys a pipeline layout.
    fn destroy_pipeline_layout(&self, id: PipelineLayoutId) -> Result<(), ResourceError>;

    /// Creates a render pipeline.
    fn create_render_pipeline(
        &self,
        descriptor: &RenderPipelineDescriptor,
    ) -> Result<RenderPipelineId, ResourceError>;

    /// Destroys a render pipeline.
    fn destroy_render_pipeline(&self, id: RenderPipelineId) -> Result<(), ResourceError>;

    /// Creates an uninitialized buffer.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError>;

    /// Creates a buffer initialized with `data`.
    fn create_buffer_with_data(
        &self,
        descriptor: &BufferDescriptor,
        data: &[u8],
    ) -> Result<BufferId, ResourceError>;

    /// Writes `data` into a buffer at `offset`.
    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError>;

    /// Destroys a buffer.
    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError>;

    /// Generates `count` texture names without storage.
    fn generate_textures(&self, count: u32) -> Result<Vec<TextureId>, ResourceError>;

    /// Allocates (or reallocates) the storage behind a texture name.
    fn allocate_texture_storage(
        &self,
        id: TextureId,
        descriptor: &TextureDescriptor,
    ) -> Result<(), ResourceError>;

    /// Storage information of a texture, `None` while it has no storage.
    fn texture_info(&self, id: TextureId) -> Option<TextureInfo>;

    /// Uploads texel data into a region of a texture.
    fn write_texture(&self, write: &TextureWrite) -> Result<(), ResourceError>;

    /// Destroys a texture name and its storage.
    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError>;

    /// Generates a name and allocates storage in one call.
    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError> {
        let id = self
            .generate_textures(1)?
            .pop()
            .ok_or(ResourceError::NotFound)?;
        self.allocate_texture_storage(id, descriptor)?;
        Ok(id)
    }

    /// Creates a sampler.
    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<SamplerId, ResourceError>;

    /// Destroys a sampler.
    fn destroy_sampler(&self, id: SamplerId) -> Result<(), ResourceError>;

    /// Creates a command encoder.
    fn create_command_encoder(&self, label: Option<&str>) -> Box<dyn CommandEncoder>;

    /// Submits a finished command buffer for execution.
    fn submit_command_buffer(&self, command_buffer: CommandBufferId);

    /// Format of the presentation surface, if any.
    fn surface_format(&self) -> Option<TextureFormat>;

    /// Information about the adapter.
    fn adapter_info(&self) -> GraphicsAdapterInfo;

    /// Whether an optional capability is available.
    fn supports_feature(&self, feature: DeviceFeature) -> bool;
}
