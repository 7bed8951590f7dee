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

//! Proxy geometry: light volumes and the sky cube.
//!
//! Every proxy is a position-only mesh wound counter-clockwise seen from
//! outside. The sphere and cone are circumscribed, so a unit-scaled proxy
//! fully encloses the unit volume it stands for.

use std::f32::consts::{PI, TAU};
use umbra_core::renderer::mesh::{BoundingSphere, Geometry, Mesh, MeshBuilder, VertexLayout};
use umbra_core::renderer::ResourceError;
use umbra_core::GraphicsDevice;

const SPHERE_STACKS: u32 = 12;
const SPHERE_SLICES: u32 = 16;
const CONE_SEGMENTS: u32 = 24;

/// Unit sphere centered at the origin.
pub fn sphere_geometry() -> Geometry {
    // Scale so the flat faces stay outside the unit sphere.
    let inflate = 1.0 / ((PI / SPHERE_STACKS as f32).cos() * (PI / SPHERE_SLICES as f32).cos());

    let mut positions = Vec::with_capacity(((SPHERE_STACKS + 1) * SPHERE_SLICES) as usize);
    for stack in 0..=SPHERE_STACKS {
        let phi = PI * stack as f32 / SPHERE_STACKS as f32;
        for slice in 0..SPHERE_SLICES {
            let theta = TAU * slice as f32 / SPHERE_SLICES as f32;
            positions.push([
                phi.sin() * theta.cos() * inflate,
                phi.cos() * inflate,
                phi.sin() * theta.sin() * inflate,
            ]);
        }
    }

    let index = |stack: u32, slice: u32| stack * SPHERE_SLICES + slice % SPHERE_SLICES;
    let mut indices = Vec::with_capacity((SPHERE_STACKS * SPHERE_SLICES * 6) as usize);
    for stack in 0..SPHERE_STACKS {
        for slice in 0..SPHERE_SLICES {
            let a = index(stack, slice);
            let b = index(stack + 1, slice);
            let c = index(stack + 1, slice + 1);
            let d = index(stack, slice + 1);
            indices.extend_from_slice(&[a, c, b, a, d, c]);
        }
    }

    Geometry {
        positions,
        indices,
        ..Default::default()
    }
}

/// Cone with its apex at the origin and a unit-radius base at `z = -1`.
pub fn cone_geometry() -> Geometry {
    let inflate = 1.0 / (PI / CONE_SEGMENTS as f32).cos();

    // 0: apex, 1: base center, 2..: base ring.
    let mut positions = vec![[0.0, 0.0, 0.0], [0.0, 0.0, -1.0]];
    for segment in 0..CONE_SEGMENTS {
        let theta = TAU * segment as f32 / CONE_SEGMENTS as f32;
        positions.push([theta.cos() * inflate, theta.sin() * inflate, -1.0]);
    }

    let ring = |segment: u32| 2 + segment % CONE_SEGMENTS;
    let mut indices = Vec::with_capacity((CONE_SEGMENTS * 6) as usize);
    for segment in 0..CONE_SEGMENTS {
        indices.extend_from_slice(&[0, ring(segment), ring(segment + 1)]);
        indices.extend_from_slice(&[1, ring(segment + 1), ring(segment)]);
    }

    Geometry {
        positions,
        indices,
        ..Default::default()
    }
}

/// Cube spanning `-1..=1` on every axis.
pub fn cube_geometry() -> Geometry {
    let positions = (0..8)
        .map(|corner: u32| {
            let axis = |bit: u32| if corner & bit != 0 { 1.0 } else { -1.0 };
            [axis(1), axis(2), axis(4)]
        })
        .collect();
    #[rustfmt::skip]
    let indices = vec![
        4, 5, 7, 4, 7, 6, // +z
        0, 2, 3, 0, 3, 1, // -z
        5, 1, 3, 5, 3, 7, // +x
        0, 4, 6, 0, 6, 2, // -x
        6, 7, 3, 6, 3, 2, // +y
        0, 1, 5, 0, 5, 4, // -y
    ];
    Geometry {
        positions,
        indices,
        ..Default::default()
    }
}

/// The proxy meshes used by the light and sky lanes.
#[derive(Debug)]
pub struct ProxyMeshes {
    /// Point light volume.
    pub sphere: Mesh,
    /// Spot light volume.
    pub cone: Mesh,
    /// Sky box.
    pub cube: Mesh,
}

impl ProxyMeshes {
    /// Uploads the three proxies.
    pub fn new(device: &dyn GraphicsDevice) -> Result<Self, ResourceError> {
        let build = |geometry: Geometry, label: &str| {
            MeshBuilder::from_geometry(VertexLayout::position_only(), &geometry)
                .bounds(BoundingSphere::from_points(&geometry.positions))
                .build(device, label)
        };
        let sphere = build(sphere_geometry(), "proxy sphere")?;
        let cone = match build(cone_geometry(), "proxy cone") {
            Ok(cone) => cone,
            Err(e) => {
                Self::release(device, sphere);
                return Err(e);
            }
        };
        let cube = match build(cube_geometry(), "proxy cube") {
            Ok(cube) => cube,
            Err(e) => {
                Self::release(device, sphere);
                Self::release(device, cone);
                return Err(e);
            }
        };
        Ok(Self { sphere, cone, cube })
    }

    fn release(device: &dyn GraphicsDevice, mesh: Mesh) {
        let label = mesh.label().to_string();
        if let Err(e) = mesh.dispose(device) {
            log::warn!("ProxyMeshes: failed to release '{label}': {e}");
        }
    }

    /// Releases every proxy.
    pub fn dispose(self, device: &dyn GraphicsDevice) {
        Self::release(device, self.sphere);
        Self::release(device, self.cone);
        Self::release(device, self.cube);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_core::math::Vec3;

    fn vertex(geometry: &Geometry, index: u32) -> Vec3 {
        Vec3::from_array(geometry.positions[index as usize])
    }

    /// Every triangle's normal must point away from `inside`.
    fn assert_outward(geometry: &Geometry, inside: Vec3) {
        for triangle in geometry.indices.chunks(3) {
            let (a, b, c) = (
                vertex(geometry, triangle[0]),
                vertex(geometry, triangle[1]),
                vertex(geometry, triangle[2]),
            );
            let normal = (b - a).cross(c - a);
            if normal.length_squared() < 1e-8 {
                continue; // degenerate pole triangle
            }
            let centroid = (a + b + c) / 3.0;
            assert!(normal.dot(centroid - inside) > 0.0, "inward face {triangle:?}");
        }
    }

    #[test]
    fn test_sphere_faces_point_outward() {
        assert_outward(&sphere_geometry(), Vec3::ZERO);
    }

    #[test]
    fn test_cone_faces_point_outward() {
        assert_outward(&cone_geometry(), Vec3::new(0.0, 0.0, -0.5));
    }

    #[test]
    fn test_cube_faces_point_outward() {
        let cube = cube_geometry();
        assert_eq!(cube.indices.len(), 36);
        assert_outward(&cube, Vec3::ZERO);
    }

    #[test]
    fn test_sphere_encloses_unit_sphere() {
        let sphere = sphere_geometry();
        // The nearest point of every face plane stays outside the unit sphere.
        for triangle in sphere.indices.chunks(3) {
            let (a, b, c) = (
                vertex(&sphere, triangle[0]),
                vertex(&sphere, triangle[1]),
                vertex(&sphere, triangle[2]),
            );
            let normal = (b - a).cross(c - a);
            if normal.length_squared() < 1e-8 {
                continue;
            }
            let distance = normal.normalize().dot(a);
            assert!(distance >= 0.999, "face at distance {distance}");
        }
    }
}
