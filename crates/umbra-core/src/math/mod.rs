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

//! Math value types used throughout the renderer.
//!
//! Linear algebra (vectors, matrices, quaternions) is provided by `glam`; this
//! module re-exports the types the renderer uses and adds the few value types
//! that are specific to rendering: pixel extents, linear colors and the view
//! frustum.

/// A small constant for floating-point comparisons.
pub const EPSILON: f32 = 1e-5;

pub use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

pub mod color;
pub mod dimension;
pub mod frustum;

pub use glam::{EulerRot, Mat3, Mat4, Quat, Vec2, Vec3, Vec4};

pub use self::color::LinearRgba;
pub use self::dimension::{Extent2D, Extent3D, Origin3D};
pub use self::frustum::{Frustum, Intersection, Plane};

/// Compares two floats with the crate-wide [`EPSILON`] tolerance.
#[inline]
pub fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}
