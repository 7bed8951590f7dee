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

//! CPU-side geometry as produced by mesh loaders and procedural generators.

use crate::math::{Mat4, Vec3};

/// A sphere enclosing a mesh, in the mesh's local space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingSphere {
    /// Center of the sphere.
    pub center: Vec3,
    /// Radius of the sphere.
    pub radius: f32,
}

impl BoundingSphere {
    /// Centroid-based bound of `points`.
    pub fn from_points(points: &[[f32; 3]]) -> Self {
        if points.is_empty() {
            return Self::default();
        }
        let sum = points
            .iter()
            .fold(Vec3::ZERO, |acc, p| acc + Vec3::from_array(*p));
        let center = sum / points.len() as f32;
        let radius = points
            .iter()
            .map(|p| Vec3::from_array(*p).distance(center))
            .fold(0.0, f32::max);
        Self { center, radius }
    }

    /// The bound after applying `transform`, assuming the largest axis scale.
    pub fn transformed(&self, transform: &Mat4) -> Self {
        let center = transform.transform_point3(self.center);
        let scale = transform
            .x_axis
            .truncate()
            .length()
            .max(transform.y_axis.truncate().length())
            .max(transform.z_axis.truncate().length());
        Self {
            center,
            radius: self.radius * scale,
        }
    }
}

/// Vertex attribute arrays plus triangle indices.
///
/// Every non-empty attribute array has one entry per position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    /// Vertex positions.
    pub positions: Vec<[f32; 3]>,
    /// Vertex normals.
    pub normals: Vec<[f32; 3]>,
    /// Texture coordinates.
    pub texcoords: Vec<[f32; 2]>,
    /// Tangents.
    pub tangents: Vec<[f32; 3]>,
    /// Bitangents.
    pub bitangents: Vec<[f32; 3]>,
    /// Triangle list indices.
    pub indices: Vec<u32>,
}

impl Geometry {
    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// `true` when normals are present.
    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty()
    }

    /// `true` when texture coordinates are present.
    pub fn has_texcoords(&self) -> bool {
        !self.texcoords.is_empty()
    }

    /// `true` when tangents are present.
    pub fn has_tangents(&self) -> bool {
        !self.tangents.is_empty()
    }

    /// `true` when bitangents are present.
    pub fn has_bitangents(&self) -> bool {
        !self.bitangents.is_empty()
    }

    /// Bounding sphere of the positions.
    pub fn bounds(&self) -> BoundingSphere {
        BoundingSphere::from_points(&self.positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_bounds_of_symmetric_points() {
        let bounds = BoundingSphere::from_points(&[[-1.0, 0.0, 0.0], [1.0, 0.0, 0.0]]);
        assert_eq!(bounds.center, Vec3::ZERO);
        assert_relative_eq!(bounds.radius, 1.0);
    }

    #[test]
    fn test_transformed_bounds_use_largest_scale() {
        let bounds = BoundingSphere {
            center: Vec3::ZERO,
            radius: 1.0,
        };
        let transform = Mat4::from_translation(Vec3::new(0.0, 5.0, 0.0))
            * Mat4::from_scale(Vec3::new(1.0, 3.0, 2.0));
        let moved = bounds.transformed(&transform);
        assert_relative_eq!(moved.center.y, 5.0);
        assert_relative_eq!(moved.radius, 3.0);
    }
}
