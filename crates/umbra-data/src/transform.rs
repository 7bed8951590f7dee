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

//! Object placement with a cached model matrix.

use std::cell::Cell;
use umbra_core::math::{EulerRot, Mat4, Quat, Vec3};

/// Position, Euler rotation and scale with a lazily computed model matrix.
///
/// Every setter marks the matrix dirty; [`Transform::matrix`] recomputes
/// `translate * rotate * scale` at most once per batch of mutations.
#[derive(Debug, Clone)]
pub struct Transform {
    position: Vec3,
    rotation: Vec3,
    scale: Vec3,
    cached: Cell<Option<Mat4>>,
    recomputes: Cell<u64>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::ZERO, Vec3::ONE)
    }
}

impl Transform {
    /// Creates a transform; `rotation` holds XYZ Euler angles in radians.
    pub fn new(position: Vec3, rotation: Vec3, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
            cached: Cell::new(None),
            recomputes: Cell::new(0),
        }
    }

    /// A transform at `position` with no rotation and unit scale.
    pub fn from_position(position: Vec3) -> Self {
        Self::new(position, Vec3::ZERO, Vec3::ONE)
    }

    /// World position.
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// XYZ Euler angles in radians.
    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    /// Per-axis scale.
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    /// Moves the transform.
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.cached.set(None);
    }

    /// Rotates the transform.
    pub fn set_rotation(&mut self, rotation: Vec3) {
        self.rotation = rotation;
        self.cached.set(None);
    }

    /// Scales the transform.
    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.cached.set(None);
    }

    /// `true` when the next [`Transform::matrix`] call will recompute.
    pub fn is_dirty(&self) -> bool {
        self.cached.get().is_none()
    }

    /// The model matrix.
    pub fn matrix(&self) -> Mat4 {
        if let Some(matrix) = self.cached.get() {
            return matrix;
        }
        let rotation = Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z);
        let matrix = Mat4::from_scale_rotation_translation(self.scale, rotation, self.position);
        self.cached.set(Some(matrix));
        self.recomputes.set(self.recomputes.get() + 1);
        matrix
    }

    /// How many times the matrix was recomputed.
    pub fn recompute_count(&self) -> u64 {
        self.recomputes.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_matrix_is_translate_rotate_scale() {
        let mut transform = Transform::default();
        transform.set_position(Vec3::new(1.0, 2.0, 3.0));
        transform.set_rotation(Vec3::new(0.0, std::f32::consts::FRAC_PI_2, 0.0));
        transform.set_scale(Vec3::splat(2.0));

        let expected = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0))
            * Mat4::from_rotation_y(std::f32::consts::FRAC_PI_2)
            * Mat4::from_scale(Vec3::splat(2.0));
        let actual = transform.matrix();
        for (a, e) in actual.to_cols_array().iter().zip(expected.to_cols_array()) {
            assert_relative_eq!(*a, e, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_matrix_is_computed_once_per_mutation_batch() {
        let mut transform = Transform::default();
        transform.set_position(Vec3::X);
        transform.set_scale(Vec3::splat(3.0));
        let first = transform.matrix();
        let second = transform.matrix();
        assert_eq!(first, second);
        assert_eq!(transform.recompute_count(), 1);

        transform.set_rotation(Vec3::new(0.3, 0.0, 0.0));
        assert!(transform.is_dirty());
        transform.matrix();
        transform.matrix();
        assert_eq!(transform.recompute_count(), 2);
    }

    #[test]
    fn test_mutation_order_does_not_matter() {
        let mut a = Transform::default();
        a.set_position(Vec3::new(4.0, 0.0, 0.0));
        a.set_scale(Vec3::splat(0.5));

        let mut b = Transform::default();
        b.set_scale(Vec3::splat(0.5));
        b.set_position(Vec3::new(4.0, 0.0, 0.0));

        assert_eq!(a.matrix(), b.matrix());
    }
}
