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

//! Perspective camera with cached matrices and frustum.

use std::cell::Cell;
use umbra_core::math::{Frustum, Mat4, Vec3, FRAC_PI_4};

#[derive(Debug, Clone, Copy)]
struct CameraMatrices {
    view: Mat4,
    projection: Mat4,
    view_projection: Mat4,
    frustum: Frustum,
}

/// A right-handed perspective camera.
///
/// `forward` and `up` are re-normalized on every set. The derived matrices
/// and the frustum are recomputed together, at most once after any change.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    forward: Vec3,
    up: Vec3,
    fov_y: f32,
    aspect: f32,
    near: f32,
    far: f32,
    exposure: f32,
    cached: Cell<Option<CameraMatrices>>,
    recomputes: Cell<u64>,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y)
    }
}

impl Camera {
    /// A camera at `position` looking along `forward`, with a 45° vertical
    /// field of view, a square aspect and a `0.1..1000` depth range.
    pub fn new(position: Vec3, forward: Vec3, up: Vec3) -> Self {
        Self {
            position,
            forward: forward.normalize_or_zero(),
            up: up.normalize_or_zero(),
            fov_y: FRAC_PI_4,
            aspect: 1.0,
            near: 0.1,
            far: 1000.0,
            exposure: 1.0,
            cached: Cell::new(None),
            recomputes: Cell::new(0),
        }
    }

    /// Sets the projection parameters in one step.
    pub fn with_projection(mut self, fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        self.set_projection(fov_y, aspect, near, far);
        self
    }

    /// World-space eye position.
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Unit viewing direction.
    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    /// Unit up vector.
    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// Vertical field of view in radians.
    pub fn fov_y(&self) -> f32 {
        self.fov_y
    }

    /// Width over height.
    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Near clip distance.
    pub fn near(&self) -> f32 {
        self.near
    }

    /// Far clip distance.
    pub fn far(&self) -> f32 {
        self.far
    }

    /// Exposure used by the tone-mapping pass.
    pub fn exposure(&self) -> f32 {
        self.exposure
    }

    /// Moves the camera.
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.cached.set(None);
    }

    /// Sets the viewing direction; zero stays zero.
    pub fn set_forward(&mut self, forward: Vec3) {
        self.forward = forward.normalize_or_zero();
        self.cached.set(None);
    }

    /// Sets the up vector; zero stays zero.
    pub fn set_up(&mut self, up: Vec3) {
        self.up = up.normalize_or_zero();
        self.cached.set(None);
    }

    /// Points the camera at `target`.
    pub fn look_at(&mut self, target: Vec3) {
        self.set_forward(target - self.position);
    }

    /// Sets the field of view, aspect and clip range.
    pub fn set_projection(&mut self, fov_y: f32, aspect: f32, near: f32, far: f32) {
        self.fov_y = fov_y;
        self.aspect = aspect;
        self.near = near;
        self.far = far;
        self.cached.set(None);
    }

    /// Changes the aspect ratio, typically after a resize.
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
        self.cached.set(None);
    }

    /// Sets the exposure. The cached matrices are kept.
    pub fn set_exposure(&mut self, exposure: f32) {
        self.exposure = exposure;
    }

    fn matrices(&self) -> CameraMatrices {
        if let Some(matrices) = self.cached.get() {
            return matrices;
        }
        let view = Mat4::look_to_rh(self.position, self.forward, self.up);
        let projection = Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far);
        let view_projection = projection * view;
        let matrices = CameraMatrices {
            view,
            projection,
            view_projection,
            frustum: Frustum::from_view_projection(&view_projection),
        };
        self.cached.set(Some(matrices));
        self.recomputes.set(self.recomputes.get() + 1);
        matrices
    }

    /// World-to-view matrix.
    pub fn view(&self) -> Mat4 {
        self.matrices().view
    }

    /// View-to-clip matrix.
    pub fn projection(&self) -> Mat4 {
        self.matrices().projection
    }

    /// `projection * view`.
    pub fn view_projection(&self) -> Mat4 {
        self.matrices().view_projection
    }

    /// Culling frustum of the current view-projection.
    pub fn frustum(&self) -> Frustum {
        self.matrices().frustum
    }

    /// How many times the matrices were recomputed.
    pub fn recompute_count(&self) -> u64 {
        self.recomputes.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use umbra_core::math::Intersection;

    #[test]
    fn test_direction_vectors_are_normalized() {
        let mut camera = Camera::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -5.0), Vec3::new(0.0, 3.0, 0.0));
        assert_relative_eq!(camera.forward().length(), 1.0);
        assert_relative_eq!(camera.up().length(), 1.0);
        camera.set_forward(Vec3::new(2.0, 0.0, 0.0));
        assert_relative_eq!(camera.forward().x, 1.0);
    }

    #[test]
    fn test_matrices_are_cached_until_moved() {
        let mut camera = Camera::default();
        let _ = camera.view();
        let _ = camera.projection();
        let _ = camera.frustum();
        assert_eq!(camera.recompute_count(), 1);

        camera.set_position(Vec3::new(0.0, 1.0, 0.0));
        camera.set_exposure(2.0);
        let _ = camera.view_projection();
        assert_eq!(camera.recompute_count(), 2);
    }

    #[test]
    fn test_projection_setters_update_getters_and_matrices() {
        let mut camera = Camera::default();
        let _ = camera.projection();
        camera.set_projection(FRAC_PI_4 * 2.0, 2.0, 0.5, 50.0);
        assert_relative_eq!(camera.fov_y(), FRAC_PI_4 * 2.0);
        assert_relative_eq!(camera.aspect(), 2.0);
        assert_relative_eq!(camera.near(), 0.5);
        assert_relative_eq!(camera.far(), 50.0);

        camera.set_aspect(1.5);
        let expected = Mat4::perspective_rh(FRAC_PI_4 * 2.0, 1.5, 0.5, 50.0);
        assert_eq!(camera.projection(), expected);
        assert_eq!(camera.recompute_count(), 2);
    }

    #[test]
    fn test_frustum_follows_the_camera() {
        let camera = Camera::new(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y).with_projection(FRAC_PI_4, 16.0 / 9.0, 0.1, 100.0);
        let frustum = camera.frustum();
        assert_eq!(frustum.classify_sphere(Vec3::new(0.0, 0.0, -10.0), 1.0), Intersection::Inside);
        assert_eq!(frustum.classify_sphere(Vec3::new(0.0, 0.0, 10.0), 1.0), Intersection::Outside);
    }

    #[test]
    fn test_look_at_targets_the_point() {
        let mut camera = Camera::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z, Vec3::Y);
        camera.look_at(Vec3::new(5.0, 0.0, 5.0));
        let projected = camera.view().transform_point3(Vec3::new(5.0, 0.0, 5.0));
        assert_relative_eq!(projected.x, 0.0, epsilon = 1e-5);
        assert!(projected.z < 0.0);
    }
}
