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

//! Six-plane view frustum used for object and light culling.

use glam::{Mat4, Vec3, Vec4};

/// Result of testing a bounding volume against a frustum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intersection {
    /// Completely inside all six half-spaces.
    Inside,
    /// Crossing at least one plane.
    Intersect,
    /// Completely outside at least one plane.
    Outside,
}

/// A plane `normal . p + distance = 0`; the positive side faces into the frustum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal of the plane.
    pub normal: Vec3,
    /// Signed offset from the origin.
    pub distance: f32,
}

impl Plane {
    fn from_row(row: Vec4) -> Self {
        let normal = row.truncate();
        let length = normal.length();
        if length <= f32::EPSILON {
            return Self {
                normal: Vec3::ZERO,
                distance: row.w,
            };
        }
        Self {
            normal: normal / length,
            distance: row.w / length,
        }
    }

    /// Signed distance from `point` to the plane.
    #[inline]
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }
}

/// A view frustum described by its left, right, bottom, top, near and far planes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    planes: [Plane; 6],
}

impl Frustum {
    /// Extracts the planes from a view-projection matrix with a `0..1` depth range.
    pub fn from_view_projection(view_projection: &Mat4) -> Self {
        let r0 = view_projection.row(0);
        let r1 = view_projection.row(1);
        let r2 = view_projection.row(2);
        let r3 = view_projection.row(3);
        Self {
            planes: [
                Plane::from_row(r3 + r0),
                Plane::from_row(r3 - r0),
                Plane::from_row(r3 + r1),
                Plane::from_row(r3 - r1),
                Plane::from_row(r2),
                Plane::from_row(r3 - r2),
            ],
        }
    }

    /// The six planes, in left, right, bottom, top, near, far order.
    pub fn planes(&self) -> &[Plane; 6] {
        &self.planes
    }

    /// Classifies a bounding sphere against the frustum.
    pub fn classify_sphere(&self, center: Vec3, radius: f32) -> Intersection {
        let mut result = Intersection::Inside;
        for plane in &self.planes {
            let distance = plane.signed_distance(center);
            if distance < -radius {
                return Intersection::Outside;
            }
            if distance < radius {
                result = Intersection::Intersect;
            }
        }
        result
    }

    /// `true` unless the sphere is completely outside.
    #[inline]
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.classify_sphere(center, radius) != Intersection::Outside
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAR: f32 = 100.0;

    fn looking_down_negative_z() -> Frustum {
        let projection = Mat4::perspective_rh(60f32.to_radians(), 16.0 / 9.0, 0.1, FAR);
        let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        Frustum::from_view_projection(&(projection * view))
    }

    #[test]
    fn test_sphere_beyond_far_plane_is_outside() {
        let frustum = looking_down_negative_z();
        let radius = 5.0;
        let center = Vec3::new(0.0, 0.0, -(FAR + radius + 1.0));
        assert_eq!(frustum.classify_sphere(center, radius), Intersection::Outside);
    }

    #[test]
    fn test_sphere_straddling_far_plane_intersects() {
        let frustum = looking_down_negative_z();
        let center = Vec3::new(0.0, 0.0, -FAR);
        assert_eq!(frustum.classify_sphere(center, 5.0), Intersection::Intersect);
    }

    #[test]
    fn test_sphere_within_all_planes_is_inside() {
        let frustum = looking_down_negative_z();
        let center = Vec3::new(0.0, 0.0, -50.0);
        assert_eq!(frustum.classify_sphere(center, 1.0), Intersection::Inside);
    }

    #[test]
    fn test_sphere_behind_camera_is_outside() {
        let frustum = looking_down_negative_z();
        assert!(!frustum.intersects_sphere(Vec3::new(0.0, 0.0, 10.0), 2.0));
    }

    #[test]
    fn test_planes_are_normalized() {
        let frustum = looking_down_negative_z();
        for plane in frustum.planes() {
            approx::assert_relative_eq!(plane.normal.length(), 1.0, epsilon = 1e-4);
        }
    }
}
