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

//! # Umbra Data
//!
//! The scene graph drawn by the frame renderer: transforms, world objects,
//! lights with their shadow resources, the camera, the reflection probe,
//! instanced foliage and the standard material, all owned by a [`Scene`].

#![warn(missing_docs)]

pub mod arena;
pub mod camera;
pub mod foliage;
pub mod light;
pub mod material;
pub mod object;
pub mod probe;
pub mod scene;
pub mod shadow;
pub mod transform;

pub use arena::{Arena, Handle};
pub use camera::Camera;
pub use foliage::{FoliageBatch, FoliageInstance};
pub use light::{Attenuation, Light, LightKind};
pub use material::StandardMaterial;
pub use object::WorldObject;
pub use probe::ReflectionProbe;
pub use scene::{LightHandle, MaterialHandle, MeshHandle, ObjectHandle, Scene};
pub use shadow::{ShadowBinding, ShadowMap, ShadowResource, VarianceShadowMap};
pub use transform::Transform;
