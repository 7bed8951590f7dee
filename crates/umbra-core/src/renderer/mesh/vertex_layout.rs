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

//! Named vertex attributes and the interleaved layout they form.

use crate::renderer::api::{VertexAttribute, VertexBufferLayout, VertexFormat, VertexStepMode};
use std::borrow::Cow;

/// Attribute name of vertex positions.
pub const POSITION: &str = "position";
/// Attribute name of vertex normals.
pub const NORMAL: &str = "normal";
/// Attribute name of texture coordinates.
pub const TEXCOORD: &str = "texcoord";
/// Attribute name of tangents.
pub const TANGENT: &str = "tangent";
/// Attribute name of bitangents.
pub const BITANGENT: &str = "bitangent";

/// One named attribute of a layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutAttribute {
    /// Name the mesh builder binds a data source to.
    pub name: Cow<'static, str>,
    /// Component format.
    pub format: VertexFormat,
    /// Shader input location.
    pub location: u32,
}

/// An ordered list of attributes interleaved in a single vertex buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    attributes: Vec<LayoutAttribute>,
}

impl VertexLayout {
    /// An empty layout.
    pub fn new() -> Self {
        Self {
            attributes: Vec::new(),
        }
    }

    /// Appends an attribute at the next free location.
    pub fn with(mut self, name: impl Into<Cow<'static, str>>, format: VertexFormat) -> Self {
        let location = self.attributes.len() as u32;
        self.attributes.push(LayoutAttribute {
            name: name.into(),
            format,
            location,
        });
        self
    }

    /// Positions only; used by light volumes, the sky cube and shadow casters.
    pub fn position_only() -> Self {
        Self::new().with(POSITION, VertexFormat::Float32x3)
    }

    /// Position, normal, texcoord and tangent: the layout of scene meshes.
    pub fn standard() -> Self {
        Self::new()
            .with(POSITION, VertexFormat::Float32x3)
            .with(NORMAL, VertexFormat::Float32x3)
            .with(TEXCOORD, VertexFormat::Float32x2)
            .with(TANGENT, VertexFormat::Float32x3)
    }

    /// Attributes in location order.
    pub fn attributes(&self) -> &[LayoutAttribute] {
        &self.attributes
    }

    /// Bytes per vertex.
    pub fn stride(&self) -> u64 {
        self.attributes.iter().map(|a| a.format.size()).sum()
    }

    /// Floats per vertex.
    pub fn floats_per_vertex(&self) -> usize {
        self.attributes.iter().map(|a| a.format.components()).sum()
    }

    /// Byte offset of the attribute `name`.
    pub fn offset_of(&self, name: &str) -> Option<u64> {
        let mut offset = 0;
        for attribute in &self.attributes {
            if attribute.name == name {
                return Some(offset);
            }
            offset += attribute.format.size();
        }
        None
    }

    /// Pipeline-facing description of this layout, starting at `first_location`.
    pub fn buffer_layout(&self, step_mode: VertexStepMode, first_location: u32) -> VertexBufferLayout<'static> {
        let mut offset = 0;
        let attributes = self
            .attributes
            .iter()
            .map(|a| {
                let attribute = VertexAttribute {
                    format: a.format,
                    offset,
                    shader_location: first_location + a.location,
                };
                offset += a.format.size();
                attribute
            })
            .collect::<Vec<_>>();
        VertexBufferLayout {
            array_stride: self.stride(),
            step_mode,
            attributes: Cow::Owned(attributes),
        }
    }
}

impl Default for VertexLayout {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_layout_offsets() {
        let layout = VertexLayout::standard();
        assert_eq!(layout.stride(), 44);
        assert_eq!(layout.floats_per_vertex(), 11);
        assert_eq!(layout.offset_of(NORMAL), Some(12));
        assert_eq!(layout.offset_of(TEXCOORD), Some(24));
        assert_eq!(layout.offset_of(TANGENT), Some(32));
        assert_eq!(layout.offset_of(BITANGENT), None);
    }

    #[test]
    fn test_buffer_layout_locations() {
        let layout = VertexLayout::position_only().buffer_layout(VertexStepMode::Instance, 4);
        assert_eq!(layout.array_stride, 12);
        assert_eq!(layout.attributes[0].shader_location, 4);
    }
}
