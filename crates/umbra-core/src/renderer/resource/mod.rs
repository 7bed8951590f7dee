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

//! The GPU resource layer.
//!
//! Thin ownership wrappers over device handles. Each wrapper owns exactly one
//! native object (or a fixed set of them) and releases it in a consuming
//! `dispose`, so a wrapper can never be disposed twice.

pub mod buffer;
pub mod framebuffer;
pub mod image;
pub mod preprocessor;
pub mod program;
pub mod sentinel;
pub mod texture;
pub mod uniform_ring;

pub use self::buffer::BufferObject;
pub use self::framebuffer::{
    ColorTarget, DepthTarget, Framebuffer, FramebufferBuilder, FramebufferStats, PassOps,
};
pub use self::image::{ColorSpace, ComponentType, Image, ImageDecoder, Layer};
pub use self::program::{Program, ProgramCache};
pub use self::sentinel::{SentinelKind, Sentinels};
pub use self::texture::{RenderBuffer, Texture2d, Texture2dPool, TextureCube, TextureOptions};
pub use self::uniform_ring::{UniformRing, UniformSlice};
