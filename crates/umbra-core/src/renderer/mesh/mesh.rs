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

//! Interleaved mesh building and indexed drawing.

use super::geometry::{BoundingSphere, Geometry};
use super::vertex_layout::{self, VertexLayout};
use crate::renderer::api::{BufferUsage, IndexFormat};
use crate::renderer::error::ResourceError;
use crate::renderer::resource::BufferObject;
use crate::renderer::traits::{GraphicsDevice, RenderPass};
use ahash::AHashMap;
use std::borrow::Cow;

/// Produces the components of one attribute for a vertex index.
///
/// Only as many components as the attribute's format holds are used.
pub type DataSource<'a> = Box<dyn Fn(usize) -> [f32; 4] + 'a>;

/// Assembles interleaved vertex data from named data sources.
pub struct MeshBuilder<'a> {
    layout: VertexLayout,
    vertex_count: usize,
    sources: AHashMap<Cow<'static, str>, DataSource<'a>>,
    indices: Vec<u32>,
    bounds: Option<BoundingSphere>,
}

impl<'a> MeshBuilder<'a> {
    /// Starts a mesh of `vertex_count` vertices laid out as `layout`.
    pub fn new(layout: VertexLayout, vertex_count: usize) -> Self {
        Self {
            layout,
            vertex_count,
            sources: AHashMap::new(),
            indices: Vec::new(),
            bounds: None,
        }
    }

    /// Binds every attribute of the standard names that `geometry` provides.
    pub fn from_geometry(layout: VertexLayout, geometry: &'a Geometry) -> Self {
        let mut builder = Self::new(layout, geometry.vertex_count())
            .indices(geometry.indices.clone())
            .bounds(geometry.bounds())
            .source(vertex_layout::POSITION, move |i| {
                let [x, y, z] = geometry.positions[i];
                [x, y, z, 0.0]
            });
        if geometry.has_normals() {
            builder = builder.source(vertex_layout::NORMAL, move |i| {
                let [x, y, z] = geometry.normals[i];
                [x, y, z, 0.0]
            });
        }
        if geometry.has_texcoords() {
            builder = builder.source(vertex_layout::TEXCOORD, move |i| {
                let [u, v] = geometry.texcoords[i];
                [u, v, 0.0, 0.0]
            });
        }
        if geometry.has_tangents() {
            builder = builder.source(vertex_layout::TANGENT, move |i| {
                let [x, y, z] = geometry.tangents[i];
                [x, y, z, 0.0]
            });
        }
        if geometry.has_bitangents() {
            builder = builder.source(vertex_layout::BITANGENT, move |i| {
                let [x, y, z] = geometry.bitangents[i];
                [x, y, z, 0.0]
            });
        }
        builder
    }

    /// Binds a data source to the attribute `name`.
    pub fn source(
        mut self,
        name: impl Into<Cow<'static, str>>,
        source: impl Fn(usize) -> [f32; 4] + 'a,
    ) -> Self {
        self.sources.insert(name.into(), Box::new(source));
        self
    }

    /// Sets the triangle indices.
    pub fn indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = indices;
        self
    }

    /// Overrides the bounding sphere used for culling.
    pub fn bounds(mut self, bounds: BoundingSphere) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Interleaves every attribute; attributes without a source are zero.
    pub fn interleave(&self) -> Vec<f32> {
        let mut data = Vec::with_capacity(self.vertex_count * self.layout.floats_per_vertex());
        for attribute in self.layout.attributes() {
            if !self.sources.contains_key(&attribute.name) {
                log::debug!("Mesh attribute '{}' has no data source; zero-filled", attribute.name);
            }
        }
        for vertex in 0..self.vertex_count {
            for attribute in self.layout.attributes() {
                let components = attribute.format.components();
                match self.sources.get(&attribute.name) {
                    Some(source) => data.extend_from_slice(&source(vertex)[..components]),
                    None => data.extend(std::iter::repeat(0.0).take(components)),
                }
            }
        }
        data
    }

    /// Uploads the vertex and index data and returns the drawable mesh.
    pub fn build(self, device: &dyn GraphicsDevice, label: &str) -> Result<Mesh, ResourceError> {
        let vertices = self.interleave();
        let vertex_buffer = BufferObject::upload(
            device,
            &format!("{label} vertices"),
            BufferUsage::VERTEX,
            bytemuck::cast_slice(&vertices),
        )?;
        let indices = if self.indices.is_empty() {
            (0..self.vertex_count as u32).collect()
        } else {
            self.indices
        };
        let index_buffer = match BufferObject::upload(
            device,
            &format!("{label} indices"),
            BufferUsage::INDEX,
            bytemuck::cast_slice(&indices),
        ) {
            Ok(buffer) => buffer,
            Err(e) => {
                if let Err(destroy) = vertex_buffer.dispose(device) {
                    log::warn!("Mesh '{label}': failed to release vertex buffer: {destroy}");
                }
                return Err(e);
            }
        };

        Ok(Mesh {
            label: label.to_string(),
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
            vertex_count: self.vertex_count as u32,
            bounds: self.bounds.unwrap_or_default(),
        })
    }
}

/// A drawable mesh: one interleaved vertex buffer and one 32-bit index buffer.
#[derive(Debug)]
pub struct Mesh {
    label: String,
    vertex_buffer: BufferObject,
    index_buffer: BufferObject,
    index_count: u32,
    vertex_count: u32,
    bounds: BoundingSphere,
}

impl Mesh {
    /// Debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of indices drawn.
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Local-space bounding sphere.
    pub fn bounds(&self) -> BoundingSphere {
        self.bounds
    }

    /// Binds the vertex buffer to slot 0 and the index buffer.
    pub fn bind(&self, pass: &mut dyn RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.id(), 0);
        pass.set_index_buffer(self.index_buffer.id(), 0, IndexFormat::Uint32);
    }

    /// Binds the mesh and draws it once.
    pub fn draw_indexed(&self, pass: &mut dyn RenderPass<'_>) {
        self.bind(pass);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }

    /// Binds the mesh, binds `instances` to slot 1 and draws `count` instances.
    pub fn draw_indexed_instanced(
        &self,
        pass: &mut dyn RenderPass<'_>,
        instances: &BufferObject,
        count: u32,
    ) {
        self.bind(pass);
        pass.set_vertex_buffer(1, instances.id(), 0);
        pass.draw_indexed(0..self.index_count, 0, 0..count);
    }

    /// Destroys both buffers.
    pub fn dispose(self, device: &dyn GraphicsDevice) -> Result<(), ResourceError> {
        let vertices = self.vertex_buffer.dispose(device);
        let indices = self.index_buffer.dispose(device);
        vertices.and(indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingDevice;

    fn triangle() -> Geometry {
        Geometry {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            normals: vec![[0.0, 0.0, 1.0]; 3],
            texcoords: vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
            indices: vec![0, 1, 2],
            ..Default::default()
        }
    }

    #[test]
    fn test_interleave_follows_layout_order() {
        let geometry = triangle();
        let builder = MeshBuilder::from_geometry(VertexLayout::standard(), &geometry);
        let data = builder.interleave();
        assert_eq!(data.len(), 3 * 11);
        // Second vertex: position, normal, texcoord, zero tangent.
        assert_eq!(
            &data[11..22],
            &[1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_custom_source() {
        let layout = VertexLayout::new().with("weight", crate::renderer::api::VertexFormat::Float32);
        let builder = MeshBuilder::new(layout, 4).source("weight", |i| [i as f32 * 0.5, 0.0, 0.0, 0.0]);
        assert_eq!(builder.interleave(), vec![0.0, 0.5, 1.0, 1.5]);
    }

    #[test]
    fn test_build_uploads_two_buffers() {
        let device = RecordingDevice::new();
        let geometry = triangle();
        let mesh = MeshBuilder::from_geometry(VertexLayout::standard(), &geometry)
            .build(&device, "triangle")
            .unwrap();
        assert_eq!(mesh.index_count(), 3);
        assert_eq!(device.live_buffer_count(), 2);
        mesh.dispose(&device).unwrap();
        assert_eq!(device.live_buffer_count(), 0);
    }
}
