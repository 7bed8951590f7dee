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

//! Bit sets describing usages, shader visibility and color write masks.

crate::umbra_bitflags! {
    /// Shader stages that can see a resource binding.
    pub struct ShaderStageFlags: u32 {
        /// Vertex stage.
        const VERTEX = 1 << 0;
        /// Fragment stage.
        const FRAGMENT = 1 << 1;
        /// Vertex and fragment stages.
        const VERTEX_FRAGMENT = (1 << 0) | (1 << 1);
    }
}

crate::umbra_bitflags! {
    /// How a buffer will be used.
    pub struct BufferUsage: u32 {
        /// Source of copy operations.
        const COPY_SRC = 1 << 0;
        /// Destination of copies and `write_buffer`.
        const COPY_DST = 1 << 1;
        /// Index buffer.
        const INDEX = 1 << 2;
        /// Vertex or instance buffer.
        const VERTEX = 1 << 3;
        /// Uniform buffer.
        const UNIFORM = 1 << 4;
    }
}

crate::umbra_bitflags! {
    /// How a texture will be used.
    pub struct TextureUsage: u32 {
        /// Source of copy and blit operations.
        const COPY_SRC = 1 << 0;
        /// Destination of uploads.
        const COPY_DST = 1 << 1;
        /// Sampled in shaders.
        const TEXTURE_BINDING = 1 << 2;
        /// Render target.
        const RENDER_ATTACHMENT = 1 << 3;
    }
}

crate::umbra_bitflags! {
    /// Which color channels a color target writes.
    pub struct ColorWrites: u32 {
        /// Red channel.
        const RED = 1 << 0;
        /// Green channel.
        const GREEN = 1 << 1;
        /// Blue channel.
        const BLUE = 1 << 2;
        /// Alpha channel.
        const ALPHA = 1 << 3;
        /// All channels.
        const ALL = 0b1111;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_writes_all() {
        assert!(ColorWrites::ALL.contains(ColorWrites::RED | ColorWrites::ALPHA));
        assert!(ColorWrites::EMPTY.is_empty());
    }

    #[test]
    fn test_stage_union() {
        let stages = ShaderStageFlags::VERTEX | ShaderStageFlags::FRAGMENT;
        assert_eq!(stages, ShaderStageFlags::VERTEX_FRAGMENT);
    }
}
