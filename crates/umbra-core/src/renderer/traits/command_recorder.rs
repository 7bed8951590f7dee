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

use crate::renderer::api::{
    BindGroupId, BufferId, CommandBufferId, FilterMode, IndexFormat, RenderPassDescriptor,
    RenderPipelineId, TextureId, TextureRegion, Viewport,
};
use std::any::Any;
use std::ops::Range;

/// A trait representing an active render pass, used for recording drawing commands.
///
/// A `RenderPass` object is obtained from a [`CommandEncoder`] and ends when it is
/// dropped. The `'pass` lifetime ties it to the encoder that created it.
pub trait RenderPass<'pass> {
    /// Sets the active render pipeline for subsequent draw calls.
    fn set_pipeline(&mut self, pipeline: RenderPipelineId);

    /// Binds a bind group at `index`, with one dynamic offset per dynamic binding.
    fn set_bind_group(&mut self, index: u32, bind_group: BindGroupId, offsets: &[u32]);

    /// Binds a vertex buffer to a specific slot.
    fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferId, offset: u64);

    /// Binds an index buffer for indexed drawing.
    fn set_index_buffer(&mut self, buffer: BufferId, offset: u64, index_format: IndexFormat);

    /// Restricts rasterization to `viewport`.
    fn set_viewport(&mut self, viewport: &Viewport);

    /// Sets the reference value used by stencil comparisons.
    fn set_stencil_reference(&mut self, reference: u32);

    /// Records a non-indexed draw call.
    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>);

    /// Records an indexed draw call.
    fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>);
}

/// A trait for an object that records a sequence of GPU commands.
///
/// Passes are recorded one at a time: the returned [`RenderPass`] borrows the
/// encoder mutably until it is dropped.
pub trait CommandEncoder {
    /// Begins a new render pass.
    fn begin_render_pass<'encoder>(
        &'encoder mut self,
        descriptor: &RenderPassDescriptor<'_>,
    ) -> Box<dyn RenderPass<'encoder> + 'encoder>;

    /// Copies `source` into `destination`, rescaling with `filter`.
    fn blit_texture(
        &mut self,
        source: TextureRegion,
        destination: TextureRegion,
        filter: FilterMode,
    );

    /// Regenerates every mip level of every layer from level 0.
    fn generate_mipmaps(&mut self, texture: TextureId);

    /// Finalizes the recording.
    fn finish(self: Box<Self>) -> CommandBufferId;

    /// Allows downcasting to the concrete encoder type.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
