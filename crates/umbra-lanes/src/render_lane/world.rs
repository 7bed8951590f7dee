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

//! The per-frame view of the scene that the lanes record from.

use umbra_core::math::{Mat4, Vec3};
use umbra_data::{LightHandle, MaterialHandle, MeshHandle, ObjectHandle};

/// An object that passed the frustum test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleObject {
    /// The scene object.
    pub handle: ObjectHandle,
    /// Model matrix, read once per frame.
    pub model: Mat4,
    /// Mesh to draw.
    pub mesh: MeshHandle,
    /// Material to draw with.
    pub material: MaterialHandle,
    /// Whether back faces are culled.
    pub backface_culling: bool,
    /// Distance from the camera to the object's bounding sphere center.
    pub distance: f32,
}

/// An object drawn into shadow maps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowCaster {
    /// Model matrix.
    pub model: Mat4,
    /// Mesh to draw.
    pub mesh: MeshHandle,
}

/// A point or spot light whose range reaches the view frustum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleLight {
    /// The scene light.
    pub handle: LightHandle,
    /// Influence range.
    pub range: f32,
    /// Distance from the camera to the light.
    pub distance: f32,
}

/// Transient frame state: recomputed every frame, never kept across frames.
#[derive(Debug, Clone, Default)]
pub struct RenderWorld {
    /// Camera position.
    pub eye: Vec3,
    /// Visible objects, sorted back to front.
    pub objects: Vec<VisibleObject>,
    /// Shadow-casting objects, visible or not.
    pub shadow_casters: Vec<ShadowCaster>,
    /// Directional lights, in scene order.
    pub directional_lights: Vec<LightHandle>,
    /// Point lights in range, sorted far to near.
    pub point_lights: Vec<VisibleLight>,
    /// Spot lights in range, sorted far to near.
    pub spot_lights: Vec<VisibleLight>,
    /// Objects rejected by the frustum test.
    pub culled_objects: u32,
    /// Point and spot lights rejected by the range test.
    pub culled_lights: u32,
}

impl RenderWorld {
    /// Point then spot lights, the order their volumes are drawn in.
    pub fn local_lights(&self) -> impl Iterator<Item = &VisibleLight> {
        self.point_lights.iter().chain(&self.spot_lights)
    }

    /// Number of lights that draw a volume.
    pub fn local_light_count(&self) -> usize {
        self.point_lights.len() + self.spot_lights.len()
    }
}
