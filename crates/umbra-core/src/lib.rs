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

//! # Umbra Core
//!
//! Foundational crate of the umbra deferred renderer: math value types, the
//! abstract graphics device contract, the GPU resource layer, the mesh
//! builder, and the frame-level services (context, task queue, settings).

#![warn(missing_docs)]

pub mod content;
pub mod math;
pub mod renderer;
pub mod task;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use content::{ContentError, ContentResolver};
pub use renderer::context::RenderContext;
pub use renderer::settings::RendererSettings;
pub use renderer::traits::{CommandEncoder, GraphicsDevice, RenderPass};
