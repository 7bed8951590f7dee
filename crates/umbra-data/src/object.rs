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

//! Renderable world objects.

use crate::scene::{MaterialHandle, MeshHandle};
use crate::transform::Transform;

/// A mesh placed in the world with a material.
#[derive(Debug, Clone)]
pub struct WorldObject {
    /// Display name.
    pub name: String,
    /// Placement in the world.
    pub transform: Transform,
    /// Geometry to draw.
    pub mesh: MeshHandle,
    /// Surface shading.
    pub material: MaterialHandle,
    /// Rendered into shadow maps.
    pub casting_shadows: bool,
    /// Back faces are culled in the geometry pass.
    pub backface_culling: bool,
}

impl WorldObject {
    /// An object at the origin that casts shadows and culls back faces.
    pub fn new(name: impl Into<String>, mesh: MeshHandle, material: MaterialHandle) -> Self {
        Self {
            name: name.into(),
            transform: Transform::default(),
            mesh,
            material,
            casting_shadows: true,
            backface_culling: true,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_casting_shadows(mut self, casting_shadows: bool) -> Self {
        self.casting_shadows = casting_shadows;
        self
    }

    pub fn with_backface_culling(mut self, backface_culling: bool) -> Self {
        self.backface_culling = backface_culling;
        self
    }
}
