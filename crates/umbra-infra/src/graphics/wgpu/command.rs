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

use std::any::Any;
use std::ops::Range;

use umbra_core::renderer::api::{
    BindGroupId, BufferId, CommandBufferId, FilterMode, IndexFormat, RenderPassDescriptor,
    RenderPipelineId, TextureId, TextureRegion, Viewport,
};
use umbra_core::renderer::traits::{CommandEncoder, GraphicsDevice, RenderPass};

use super::conversions::IntoWgpu;
use super::device::WgpuDevice;

/// A render pass recording into a `wgpu::RenderPass`.
pub struct WgpuRenderPass<'a> {
    pub(crate) pass: wgpu::RenderPass<'a>,
    pub(crate) device: &'a WgpuDevice,
}

impl<'pass> RenderPass<'pass> for WgpuRenderPass<'pass> {
    fn set_pipeline(&mut self, pipeline_id: RenderPipelineId) {
        if let Some(pipeline) = self.device.get_wgpu_render_pipeline(pipeline_id) {
            self.pass.set_pipeline(&pipeline);
        } else {
            log::warn!("WgpuRenderPass: RenderPipelineId {pipeline_id:?} not found.");
        }
    }

    fn set_bind_group(&mut self, index: u32, bind_group_id: BindGroupId, offsets: &[u32]) {
        if let Some(bind_group) = self.device.get_wgpu_bind_group(bind_group_id) {
            self.pass.set_bind_group(index, bind_group.as_ref(), offsets);
        } else {
            log::warn!("WgpuRenderPass: BindGroupId {bind_group_id:?} not found.");
        }
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer_id: BufferId, offset: u64) {
        if let Some(buffer) = self.device.get_wgpu_buffer(buffer_id) {
            self.pass.set_vertex_buffer(slot, buffer.slice(offset..));
        } else {
            log::warn!("WgpuRenderPass: Vertex BufferId {buffer_id:?} not found.");
        }
    }

    fn set_index_buffer(&mut self, buffer_id: BufferId, offset: u64, index_format: IndexFormat) {
        if let Some(buffer) = self.device.get_wgpu_buffer(buffer_id) {
            self.pass
                .set_index_buffer(buffer.slice(offset..), index_format.into_wgpu());
        } else {
            log::warn!("WgpuRenderPass: Index BufferId {buffer_id:?} not found.");
        }
    }

    fn set_viewport(&mut self, viewport: &Viewport) {
        self.pass.set_viewport(
            viewport.x,
            viewport.y,
            viewport.width,
            viewport.height,
            viewport.min_depth,
            viewport.max_depth,
        );
    }

    fn set_stencil_reference(&mut self, reference: u32) {
        self.pass.set_stencil_reference(reference);
    }

    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        self.pass.draw(vertices, instances);
    }

    fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>) {
        self.pass.draw_indexed(indices, base_vertex, instances);
    }
}

/// Stands in for a pass whose attachments could not be resolved. Records nothing.
struct SkippedRenderPass;

impl<'pass> RenderPass<'pass> for SkippedRenderPass {
    fn set_pipeline(&mut self, _pipeline: RenderPipelineId) {}
    fn set_bind_group(&mut self, _index: u32, _bind_group: BindGroupId, _offsets: &[u32]) {}
    fn set_vertex_buffer(&mut self, _slot: u32, _buffer: BufferId, _offset: u64) {}
    fn set_index_buffer(&mut self, _buffer: BufferId, _offset: u64, _format: IndexFormat) {}
    fn set_viewport(&mut self, _viewport: &Viewport) {}
    fn set_stencil_reference(&mut self, _reference: u32) {}
    fn draw(&mut self, _vertices: Range<u32>, _instances: Range<u32>) {}
    fn draw_indexed(&mut self, _indices: Range<u32>, _base_vertex: i32, _instances: Range<u32>) {}
}

/// Records GPU commands into a `wgpu::CommandEncoder`.
pub struct WgpuCommandEncoder {
    pub(crate) encoder: wgpu::CommandEncoder,
    pub(crate) device: WgpuDevice,
}

impl WgpuCommandEncoder {
    /// Provides mutable access to the underlying `wgpu::CommandEncoder`.
    /// This is an "escape hatch" for backend-specific operations that are
    /// not abstracted.
    pub fn wgpu_encoder_mut(&mut self) -> &mut wgpu::CommandEncoder {
        &mut self.encoder
    }
}

impl CommandEncoder for WgpuCommandEncoder {
    fn begin_render_pass<'encoder>(
        &'encoder mut self,
        descriptor: &RenderPassDescriptor<'_>,
    ) -> Box<dyn RenderPass<'encoder> + 'encoder> {
        let label = descriptor.label.unwrap_or("unnamed pass");

        // Resolve every view first so the wgpu attachments can borrow them.
        let color_views = match descriptor
            .color_attachments
            .iter()
            .map(|attachment| self.device.attachment_view(attachment.view))
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(views) => views,
            Err(e) => {
                log::error!("WgpuCommandEncoder: Skipping pass '{label}': color attachment: {e}");
                return Box::new(SkippedRenderPass);
            }
        };
        let depth_view = match descriptor
            .depth_stencil_attachment
            .map(|attachment| self.device.attachment_view(attachment.view))
            .transpose()
        {
            Ok(view) => view,
            Err(e) => {
                log::error!("WgpuCommandEncoder: Skipping pass '{label}': depth attachment: {e}");
                return Box::new(SkippedRenderPass);
            }
        };

        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = descriptor
            .color_attachments
            .iter()
            .zip(&color_views)
            .map(|(attachment, view)| {
                Some(wgpu::RenderPassColorAttachment {
                    view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: attachment.ops.into_wgpu(),
                })
            })
            .collect();

        let depth_stencil_attachment = match (&descriptor.depth_stencil_attachment, &depth_view) {
            (Some(attachment), Some(view)) => Some(wgpu::RenderPassDepthStencilAttachment {
                view,
                depth_ops: attachment.depth_ops.map(IntoWgpu::into_wgpu),
                stencil_ops: attachment.stencil_ops.map(IntoWgpu::into_wgpu),
            }),
            _ => None,
        };

        let pass = self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: descriptor.label,
            color_attachments: &color_attachments,
            depth_stencil_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        Box::new(WgpuRenderPass {
            pass,
            device: &self.device,
        })
    }

    fn blit_texture(
        &mut self,
        source: TextureRegion,
        destination: TextureRegion,
        filter: FilterMode,
    ) {
        if let Err(e) = self
            .device
            .record_blit(&mut self.encoder, source, destination, filter)
        {
            log::error!(
                "WgpuCommandEncoder: Blit {:?} -> {:?} failed: {e}",
                source.texture,
                destination.texture
            );
        }
    }

    fn generate_mipmaps(&mut self, texture: TextureId) {
        let Some(info) = self.device.texture_info(texture) else {
            log::warn!("WgpuCommandEncoder: Cannot generate mipmaps for {texture:?} without storage.");
            return;
        };
        for layer in 0..info.size.depth_or_array_layers {
            for mip_level in 1..info.mip_level_count {
                let source = TextureRegion {
                    texture,
                    mip_level: mip_level - 1,
                    layer,
                };
                let destination = TextureRegion {
                    texture,
                    mip_level,
                    layer,
                };
                self.blit_texture(source, destination, FilterMode::Linear);
            }
        }
    }

    fn finish(self: Box<Self>) -> CommandBufferId {
        let WgpuCommandEncoder { encoder, device } = *self;
        device.register_command_buffer(encoder.finish())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
