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

//! GPU buffer wrapper for vertex, index, instance and uniform data.

use crate::renderer::api::{BufferDescriptor, BufferId, BufferUsage};
use crate::renderer::error::ResourceError;
use crate::renderer::traits::GraphicsDevice;
use std::borrow::Cow;

/// Owns one GPU buffer and remembers its capacity.
#[derive(Debug)]
pub struct BufferObject {
    id: BufferId,
    label: String,
    usage: BufferUsage,
    capacity: u64,
    len: u64,
}

impl BufferObject {
    /// Creates a buffer holding `data`.
    pub fn upload(
        device: &dyn GraphicsDevice,
        label: &str,
        usage: BufferUsage,
        data: &[u8],
    ) -> Result<Self, ResourceError> {
        let usage = usage | BufferUsage::COPY_DST;
        let id = device.create_buffer_with_data(
            &BufferDescriptor {
                label: Some(Cow::Borrowed(label)),
                size: data.len() as u64,
                usage,
            },
            data,
        )?;
        Ok(Self {
            id,
            label: label.to_string(),
            usage,
            capacity: data.len() as u64,
            len: data.len() as u64,
        })
    }

    /// Creates an empty buffer of `capacity` bytes.
    pub fn with_capacity(
        device: &dyn GraphicsDevice,
        label: &str,
        usage: BufferUsage,
        capacity: u64,
    ) -> Result<Self, ResourceError> {
        let usage = usage | BufferUsage::COPY_DST;
        let id = device.create_buffer(&BufferDescriptor {
            label: Some(Cow::Borrowed(label)),
            size: capacity,
            usage,
        })?;
        Ok(Self {
            id,
            label: label.to_string(),
            usage,
            capacity,
            len: 0,
        })
    }

    /// Replaces the contents with `data`, growing the buffer when needed.
    ///
    /// Growing reallocates, so the buffer ID may change.
    pub fn update(&mut self, device: &dyn GraphicsDevice, data: &[u8]) -> Result<(), ResourceError> {
        let needed = data.len() as u64;
        if needed > self.capacity {
            let capacity = needed.next_power_of_two();
            let id = device.create_buffer(&BufferDescriptor {
                label: Some(Cow::Borrowed(&self.label)),
                size: capacity,
                usage: self.usage,
            })?;
            if let Err(e) = device.destroy_buffer(self.id) {
                log::warn!("BufferObject({}): failed to destroy old buffer: {e}", self.label);
            }
            self.id = id;
            self.capacity = capacity;
        }
        if !data.is_empty() {
            device.write_buffer(self.id, 0, data)?;
        }
        self.len = needed;
        Ok(())
    }

    /// The device buffer.
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Bytes of valid data.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// `true` when the buffer holds no data.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Allocated size in bytes.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Destroys the buffer.
    pub fn dispose(self, device: &dyn GraphicsDevice) -> Result<(), ResourceError> {
        device.destroy_buffer(self.id)
    }
}
