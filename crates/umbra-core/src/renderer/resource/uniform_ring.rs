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

//! Persistent dynamic ring buffer for per-draw or per-pass uniform data.

use crate::renderer::api::{
    BindGroupDescriptor, BindGroupEntry, BindGroupId, BindGroupLayoutId, BindingResource,
    BufferBinding, BufferDescriptor, BufferId, BufferUsage,
};
use crate::renderer::error::ResourceError;
use crate::renderer::traits::GraphicsDevice;
use std::borrow::Cow;

/// Frames that may be recorded before the GPU finishes the oldest one.
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Minimum dynamic-offset alignment required by the supported backends.
pub const MIN_UNIFORM_ALIGNMENT: u32 = 256;

/// Default number of elements of the first chunk.
pub const DEFAULT_MAX_ELEMENTS: u32 = 256;

/// Where a pushed element lives: the bind group to set and its dynamic offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformSlice {
    /// Bind group covering the chunk the element was written to.
    pub bind_group: BindGroupId,
    /// Dynamic offset of the element inside the chunk.
    pub offset: u32,
}

#[derive(Debug)]
struct Chunk {
    buffer: BufferId,
    bind_group: BindGroupId,
    capacity: u32,
    cursor: u32,
}

#[derive(Debug, Default)]
struct Slot {
    chunks: Vec<Chunk>,
    active: usize,
}

/// A ring of per-frame uniform buffers bound with dynamic offsets.
///
/// Each frame in flight owns a slot; a slot grows by appending chunks when it
/// runs out of space and is rewound when the ring advances back to it.
#[derive(Debug)]
pub struct UniformRing {
    slots: Vec<Slot>,
    current: usize,
    element_size: u32,
    layout: BindGroupLayoutId,
    binding: u32,
    label: &'static str,
}

impl UniformRing {
    /// Creates a ring whose elements are at most `element_size` bytes.
    pub fn new(
        device: &dyn GraphicsDevice,
        layout: BindGroupLayoutId,
        binding: u32,
        element_size: u32,
        max_elements: u32,
        label: &'static str,
    ) -> Result<Self, ResourceError> {
        let mut ring = Self {
            slots: (0..MAX_FRAMES_IN_FLIGHT).map(|_| Slot::default()).collect(),
            current: 0,
            element_size,
            layout,
            binding,
            label,
        };
        let capacity = ring.aligned(element_size) * max_elements.max(1);
        for slot in 0..MAX_FRAMES_IN_FLIGHT {
            let chunk = ring.create_chunk(device, slot, capacity)?;
            ring.slots[slot].chunks.push(chunk);
        }
        Ok(ring)
    }

    fn aligned(&self, size: u32) -> u32 {
        (size + MIN_UNIFORM_ALIGNMENT - 1) & !(MIN_UNIFORM_ALIGNMENT - 1)
    }

    fn create_chunk(
        &self,
        device: &dyn GraphicsDevice,
        slot: usize,
        capacity: u32,
    ) -> Result<Chunk, ResourceError> {
        let chunk_index = self.slots[slot].chunks.len();
        let buffer = device.create_buffer(&BufferDescriptor {
            label: Some(Cow::Owned(format!(
                "{} [slot {slot} chunk {chunk_index}]",
                self.label
            ))),
            size: capacity as u64,
            usage: BufferUsage::UNIFORM | BufferUsage::COPY_DST,
        })?;
        let bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some(self.label),
            layout: self.layout,
            entries: &[BindGroupEntry {
                binding: self.binding,
                resource: BindingResource::Buffer(BufferBinding {
                    buffer,
                    offset: 0,
                    size: std::num::NonZeroU64::new(self.element_size as u64),
                }),
            }],
        })?;
        Ok(Chunk {
            buffer,
            bind_group,
            capacity,
            cursor: 0,
        })
    }

    /// Moves to the next frame's slot and rewinds it.
    pub fn advance(&mut self) {
        self.current = (self.current + 1) % self.slots.len();
        let slot = &mut self.slots[self.current];
        for chunk in &mut slot.chunks {
            chunk.cursor = 0;
        }
        slot.active = 0;
    }

    /// Writes `data` into the current slot and returns where it landed.
    pub fn push(
        &mut self,
        device: &dyn GraphicsDevice,
        data: &[u8],
    ) -> Result<UniformSlice, ResourceError> {
        if data.len() as u32 > self.element_size {
            return Err(ResourceError::OutOfBounds);
        }
        let size = self.aligned(data.len() as u32);
        let current = self.current;

        let fits = |chunk: &Chunk| chunk.cursor + size <= chunk.capacity;
        if !fits(&self.slots[current].chunks[self.slots[current].active]) {
            let next = self.slots[current].active + 1;
            if next < self.slots[current].chunks.len() {
                self.slots[current].active = next;
            } else {
                let previous = self.slots[current].chunks[self.slots[current].active].capacity;
                let chunk = self.create_chunk(device, current, (previous * 2).max(size))?;
                self.slots[current].chunks.push(chunk);
                self.slots[current].active = next;
                log::debug!(
                    "UniformRing({}): grew slot {current} to {} chunks",
                    self.label,
                    next + 1
                );
            }
        }

        let slot = &mut self.slots[current];
        let chunk = &mut slot.chunks[slot.active];
        let offset = chunk.cursor;
        device.write_buffer(chunk.buffer, offset as u64, data)?;
        chunk.cursor += size;
        Ok(UniformSlice {
            bind_group: chunk.bind_group,
            offset,
        })
    }

    /// Pushes a plain-old-data value.
    pub fn push_pod<T: bytemuck::Pod>(
        &mut self,
        device: &dyn GraphicsDevice,
        value: &T,
    ) -> Result<UniformSlice, ResourceError> {
        self.push(device, bytemuck::bytes_of(value))
    }

    /// Index of the slot currently written.
    pub fn current_slot_index(&self) -> usize {
        self.current
    }

    /// Destroys every chunk.
    pub fn destroy(&self, device: &dyn GraphicsDevice) {
        for chunk in self.slots.iter().flat_map(|slot| &slot.chunks) {
            if let Err(e) = device.destroy_bind_group(chunk.bind_group) {
                log::warn!("UniformRing({}): failed to destroy bind group: {e}", self.label);
            }
            if let Err(e) = device.destroy_buffer(chunk.buffer) {
                log::warn!("UniformRing({}): failed to destroy buffer: {e}", self.label);
            }
        }
    }
}
