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

use std::borrow::Cow;
use umbra_core::renderer::{
    BindGroupLayoutId, ColorTargetState, DepthStencilState, PipelineLayoutDescriptor,
    PipelineLayoutId, PrimitiveState, RenderPipelineDescriptor, RenderPipelineId, RenderError,
    VertexBufferLayout,
};
use umbra_core::RenderContext;

/// Everything needed to build one lane pipeline from a named program.
#[derive(Debug, Clone)]
pub struct PipelineSpec<'a> {
    /// Pipeline label, also the name it is found under in command streams.
    pub label: &'a str,
    /// Logical program name, resolved through the program cache.
    pub program: &'a str,
    /// Bind group layouts in group order.
    pub bind_group_layouts: &'a [BindGroupLayoutId],
    /// Vertex buffers of the vertex stage.
    pub vertex_buffers: &'a [VertexBufferLayout<'a>],
    /// Color targets in attachment order.
    pub color_targets: &'a [ColorTargetState],
    /// Primitive state.
    pub primitive: PrimitiveState,
    /// Depth/stencil state.
    pub depth_stencil: Option<DepthStencilState>,
}

/// A render pipeline together with the layout it owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanePipeline {
    /// The pipeline.
    pub id: RenderPipelineId,
    layout: PipelineLayoutId,
}

impl LanePipeline {
    /// Compiles the program of `spec` and creates its pipeline.
    ///
    /// Shader errors are returned as-is; they abort renderer construction.
    pub fn build(ctx: &mut RenderContext, spec: &PipelineSpec<'_>) -> Result<Self, RenderError> {
        let program = ctx.program(spec.program)?;
        let device = ctx.device();

        let layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some(spec.label),
            bind_group_layouts: spec.bind_group_layouts,
        })?;

        let created = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some(Cow::Borrowed(spec.label)),
            layout,
            vertex_module: program.vertex(),
            fragment_module: program.fragment(),
            vertex_buffers: spec.vertex_buffers,
            color_targets: spec.color_targets,
            primitive: spec.primitive,
            depth_stencil: spec.depth_stencil,
        });
        match created {
            Ok(id) => {
                log::trace!("LanePipeline: created '{}'", spec.label);
                Ok(Self { id, layout })
            }
            Err(e) => {
                if let Err(destroy) = device.destroy_pipeline_layout(layout) {
                    log::warn!("LanePipeline: failed to release layout of '{}': {destroy}", spec.label);
                }
                Err(e.into())
            }
        }
    }

    /// Releases the pipeline and its layout.
    pub fn dispose(self, ctx: &RenderContext) {
        let device = ctx.device();
        if let Err(e) = device.destroy_render_pipeline(self.id) {
            log::warn!("LanePipeline: failed to destroy pipeline: {e}");
        }
        if let Err(e) = device.destroy_pipeline_layout(self.layout) {
            log::warn!("LanePipeline: failed to destroy pipeline layout: {e}");
        }
    }
}
