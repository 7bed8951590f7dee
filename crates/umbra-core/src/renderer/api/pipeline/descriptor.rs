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

//! Pipeline layout and render pipeline descriptors.

use super::enums::{VertexFormat, VertexStepMode};
use super::state::{ColorTargetState, DepthStencilState, PrimitiveState};
use crate::renderer::api::bind_group::BindGroupLayoutId;
use crate::renderer::api::shader::ShaderModuleId;
use std::borrow::Cow;

/// Opaque handle to a pipeline layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineLayoutId(pub usize);

/// Opaque handle to a render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderPipelineId(pub usize);

/// Describes a pipeline layout: the bind group layouts in set order.
#[derive(Debug, Clone)]
pub struct PipelineLayoutDescriptor<'a> {
    /// Debug label.
    pub label: Option<&'a str>,
    /// Bind group layouts, indexed by group.
    pub bind_group_layouts: &'a [BindGroupLayoutId],
}

/// One attribute inside a vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// Attribute format.
    pub format: VertexFormat,
    /// Byte offset inside one element.
    pub offset: u64,
    /// Shader input location.
    pub shader_location: u32,
}

/// Memory layout of one vertex buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexBufferLayout<'a> {
    /// Byte stride between elements.
    pub array_stride: u64,
    /// Per-vertex or per-instance stepping.
    pub step_mode: VertexStepMode,
    /// Attributes of one element.
    pub attributes: Cow<'a, [VertexAttribute]>,
}

/// Describes a render pipeline.
#[derive(Debug, Clone)]
pub struct RenderPipelineDescriptor<'a> {
    /// Debug label; also used to identify pipelines in recorded command streams.
    pub label: Option<Cow<'a, str>>,
    /// Pipeline layout.
    pub layout: PipelineLayoutId,
    /// Vertex shader module (entry point `vs_main`).
    pub vertex_module: ShaderModuleId,
    /// Fragment shader module (entry point `fs_main`), if any.
    pub fragment_module: Option<ShaderModuleId>,
    /// Vertex buffers consumed by the vertex stage.
    pub vertex_buffers: &'a [VertexBufferLayout<'a>],
    /// Color targets, in attachment order.
    pub color_targets: &'a [ColorTargetState],
    /// Primitive state.
    pub primitive: PrimitiveState,
    /// Depth/stencil state, if the pass has such an attachment.
    pub depth_stencil: Option<DepthStencilState>,
}
