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

//! # Umbra Infra
//!
//! Concrete implementations of the contracts declared in `umbra-core`:
//!
//! - [`graphics::wgpu`]: a [`GraphicsDevice`](umbra_core::GraphicsDevice) on top of wgpu,
//!   with headless and windowed contexts.
//! - [`content::FileSystemContent`]: a content resolver over ordered directory roots.
//! - [`image_decoder::ImageFileDecoder`]: decoding of common image file formats.
//! - [`logging::init_logging`]: `env_logger` installation.

#![warn(missing_docs)]

pub mod content;
pub mod graphics;
pub mod image_decoder;
pub mod logging;

pub use content::FileSystemContent;
pub use graphics::wgpu::{WgpuContextOptions, WgpuDevice, WgpuGraphicsContext};
pub use image_decoder::ImageFileDecoder;
pub use logging::init_logging;
