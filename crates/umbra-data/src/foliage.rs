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

//! GPU-instanced foliage batches.

use crate::scene::{MaterialHandle, MeshHandle};
use bytemuck::{Pod, Zeroable};
use umbra_core::math::{LinearRgba, Mat4};
use umbra_core::renderer::api::{BufferUsage, VertexFormat, VertexStepMode};
use umbra_core::renderer::mesh::VertexLayout;
use umbra_core::renderer::resource::BufferObject;
use umbra_core::renderer::{ResourceError, VertexBufferLayout};
use umbra_core::RenderContext;

/// First shader location of the instance attributes; locations below it
/// belong to the standard vertex layout.
pub const INSTANCE_FIRST_LOCATION: u32 = 4;

/// Per-instance data of a foliage batch.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FoliageInstance {
    /// Model matrix, column-major.
    pub transform: [[f32; 4]; 4],
    /// Tint multiplied into the albedo.
    pub color: [f32; 4],
}

impl FoliageInstance {
    pub fn new(transform: Mat4, color: LinearRgba) -> Self {
        Self {
            transform: transform.to_cols_array_2d(),
            color: color.to_vec4().to_array(),
        }
    }
}

/// Vertex layout of [`FoliageInstance`]: four matrix columns then the color.
pub fn instance_layout() -> VertexLayout {
    VertexLayout::new()
        .with("instance_model_0", VertexFormat::Float32x4)
        .with("instance_model_1", VertexFormat::Float32x4)
        .with("instance_model_2", VertexFormat::Float32x4)
        .with("instance_model_3", VertexFormat::Float32x4)
        .with("instance_color", VertexFormat::Float32x4)
}

/// Instance-rate buffer layout bound at slot 1 by the foliage pass.
pub fn instance_buffer_layout() -> VertexBufferLayout<'static> {
    instance_layout().buffer_layout(VertexStepMode::Instance, INSTANCE_FIRST_LOCATION)
}

/// Many copies of one mesh drawn with a single instanced call.
///
/// The instance buffer is re-uploaded only after the instance list changed.
#[derive(Debug)]
pub struct FoliageBatch {
    mesh: MeshHandle,
    material: MaterialHandle,
    instances: Vec<FoliageInstance>,
    buffer: Option<BufferObject>,
    dirty: bool,
    uploads: u64,
}

impl FoliageBatch {
    pub fn new(mesh: MeshHandle, material: MaterialHandle) -> Self {
        Self {
            mesh,
            material,
            instances: Vec::new(),
            buffer: None,
            dirty: false,
            uploads: 0,
        }
    }

    pub fn mesh(&self) -> MeshHandle {
        self.mesh
    }

    pub fn material(&self) -> MaterialHandle {
        self.material
    }

    pub fn instances(&self) -> &[FoliageInstance] {
        &self.instances
    }

    pub fn instance_count(&self) -> u32 {
        self.instances.len() as u32
    }

    /// Replaces every instance.
    pub fn set_instances(&mut self, instances: Vec<FoliageInstance>) {
        self.instances = instances;
        self.dirty = true;
    }

    /// Appends one instance.
    pub fn push_instance(&mut self, instance: FoliageInstance) {
        self.instances.push(instance);
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The uploaded instance buffer, once [`FoliageBatch::sync`] ran.
    pub fn buffer(&self) -> Option<&BufferObject> {
        self.buffer.as_ref()
    }

    /// Uploads the instances if they changed since the last upload.
    ///
    /// Returns `true` when an upload happened.
    pub fn sync(&mut self, ctx: &RenderContext) -> Result<bool, ResourceError> {
        if !self.dirty {
            return Ok(false);
        }
        self.dirty = false;
        if self.instances.is_empty() {
            return Ok(false);
        }

        let bytes: &[u8] = bytemuck::cast_slice(&self.instances);
        match self.buffer.as_mut() {
            Some(buffer) => buffer.update(ctx.device(), bytes)?,
            None => {
                self.buffer = Some(BufferObject::upload(
                    ctx.device(),
                    "foliage instances",
                    BufferUsage::VERTEX,
                    bytes,
                )?);
            }
        }
        self.uploads += 1;
        log::trace!("Uploaded {} foliage instances", self.instances.len());
        Ok(true)
    }

    /// How many times the instance buffer was uploaded.
    pub fn upload_count(&self) -> u64 {
        self.uploads
    }

    /// Releases the instance buffer.
    pub fn dispose(self, ctx: &RenderContext) {
        if let Some(buffer) = self.buffer {
            if let Err(e) = buffer.dispose(ctx.device()) {
                log::warn!("Failed to release foliage instance buffer: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Handle;
    use std::sync::Arc;
    use umbra_core::math::Vec3;
    use umbra_core::testing::{MemoryContent, RecordingDevice};
    use umbra_core::RendererSettings;

    fn batch() -> FoliageBatch {
        FoliageBatch::new(Handle::dangling(0), Handle::dangling(0))
    }

    fn context(device: &RecordingDevice) -> RenderContext {
        RenderContext::new(Arc::new(device.clone()), Arc::new(MemoryContent::new()), RendererSettings::default())
            .unwrap()
    }

    #[test]
    fn test_instance_is_eighty_bytes() {
        assert_eq!(std::mem::size_of::<FoliageInstance>(), 80);
        assert_eq!(instance_layout().stride(), 80);
        let layout = instance_buffer_layout();
        assert_eq!(layout.attributes.first().map(|a| a.shader_location), Some(4));
    }

    #[test]
    fn test_sync_uploads_only_when_dirty() {
        let device = RecordingDevice::new();
        let ctx = context(&device);
        let mut foliage = batch();
        for i in 0..10 {
            foliage.push_instance(FoliageInstance::new(
                Mat4::from_translation(Vec3::new(i as f32, 0.0, 0.0)),
                LinearRgba::WHITE,
            ));
        }

        assert!(foliage.sync(&ctx).unwrap());
        assert!(!foliage.sync(&ctx).unwrap());
        assert!(!foliage.sync(&ctx).unwrap());
        assert_eq!(foliage.upload_count(), 1);

        foliage.push_instance(FoliageInstance::new(Mat4::IDENTITY, LinearRgba::BLACK));
        assert!(foliage.sync(&ctx).unwrap());
        assert_eq!(foliage.upload_count(), 2);
        assert_eq!(foliage.buffer().unwrap().len(), 11 * 80);

        let before = device.live_buffer_count();
        foliage.dispose(&ctx);
        assert_eq!(device.live_buffer_count(), before - 1);
    }

    #[test]
    fn test_empty_batch_never_uploads() {
        let device = RecordingDevice::new();
        let ctx = context(&device);
        let mut foliage = batch();
        foliage.set_instances(Vec::new());
        assert!(!foliage.sync(&ctx).unwrap());
        assert!(foliage.buffer().is_none());
    }
}
