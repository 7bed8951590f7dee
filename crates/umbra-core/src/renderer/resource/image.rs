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

//! Decoded image data and GPU internal-format derivation.

use crate::content::ContentError;
use crate::renderer::api::TextureFormat;
use crate::renderer::error::ResourceError;

/// How color values of an image are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorSpace {
    /// Linear values (data maps, HDR images).
    #[default]
    Linear,
    /// sRGB-encoded color.
    Srgb,
}

/// The type of one channel value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ComponentType {
    /// 8-bit unsigned normalized.
    #[default]
    U8,
    /// 32-bit float.
    F32,
}

impl ComponentType {
    /// Size of one channel value in bytes.
    pub const fn size(&self) -> usize {
        match self {
            ComponentType::U8 => 1,
            ComponentType::F32 => 4,
        }
    }
}

/// One array layer (or cube face) of an image, tightly packed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Layer {
    /// Raw channel data, row-major, no padding.
    pub data: Vec<u8>,
}

/// A decoded image as produced by the asset loaders.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Channels per pixel (1 to 4).
    pub channels: u32,
    /// Color encoding.
    pub color_space: ColorSpace,
    /// Channel value type.
    pub component: ComponentType,
    /// Layers; one for plain 2D images, six for cube maps.
    pub layers: Vec<Layer>,
}

impl Image {
    /// A single-layer 8-bit image.
    pub fn from_rgba8(width: u32, height: u32, color_space: ColorSpace, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            channels: 4,
            color_space,
            component: ComponentType::U8,
            layers: vec![Layer { data }],
        }
    }

    /// Expected size in bytes of one layer.
    pub fn layer_size(&self) -> usize {
        self.width as usize * self.height as usize * self.channels as usize * self.component.size()
    }

    /// Derives the GPU format this image uploads to.
    pub fn gpu_format(&self) -> Result<TextureFormat, ResourceError> {
        derive_internal_format(self.channels, self.color_space, self.component)
    }

    /// Returns the texel data of `layer` in the layout of [`Image::gpu_format`].
    ///
    /// Three-channel images are widened to four channels because no GPU format
    /// stores packed RGB.
    pub fn upload_data(&self, layer: usize) -> Result<Vec<u8>, ResourceError> {
        let source = self.layers.get(layer).ok_or(ResourceError::OutOfBounds)?;
        if source.data.len() != self.layer_size() {
            return Err(ResourceError::UnsupportedFormat(format!(
                "layer {layer} holds {} bytes, expected {}",
                source.data.len(),
                self.layer_size()
            )));
        }
        if self.channels != 3 {
            return Ok(source.data.clone());
        }

        let texel = self.component.size() * 3;
        let alpha: &[u8] = match self.component {
            ComponentType::U8 => &[u8::MAX],
            ComponentType::F32 => bytemuck::bytes_of(&1.0f32),
        };
        let mut widened = Vec::with_capacity(source.data.len() / 3 * 4);
        for rgb in source.data.chunks_exact(texel) {
            widened.extend_from_slice(rgb);
            widened.extend_from_slice(alpha);
        }
        Ok(widened)
    }
}

/// Turns encoded image files into [`Image`]s.
///
/// Decoding lives outside the core; the infrastructure crate provides an
/// implementation for the common file formats.
pub trait ImageDecoder: Send + Sync + std::fmt::Debug {
    /// Decodes `bytes` read from `path`, tagging the result with `color_space`.
    fn decode(&self, path: &str, bytes: &[u8], color_space: ColorSpace) -> Result<Image, ContentError>;
}

/// Maps channel count, color space and component type to a GPU format.
///
/// sRGB encoding only exists for 8-bit color with three or four channels; every
/// other sRGB combination is rejected, as is any channel count outside `1..=4`.
pub fn derive_internal_format(
    channels: u32,
    color_space: ColorSpace,
    component: ComponentType,
) -> Result<TextureFormat, ResourceError> {
    use ColorSpace::*;
    use ComponentType::*;

    let format = match (component, color_space, channels) {
        (U8, Linear, 1) => TextureFormat::R8Unorm,
        (U8, Linear, 2) => TextureFormat::Rg8Unorm,
        (U8, Linear, 3 | 4) => TextureFormat::Rgba8Unorm,
        (U8, Srgb, 3 | 4) => TextureFormat::Rgba8UnormSrgb,
        (F32, Linear, 1) => TextureFormat::R32Float,
        (F32, Linear, 2) => TextureFormat::Rg32Float,
        (F32, Linear, 3 | 4) => TextureFormat::Rgba32Float,
        _ => {
            return Err(ResourceError::UnsupportedFormat(format!(
                "{channels} channel(s) of {component:?} in {color_space:?} color space"
            )))
        }
    };
    Ok(format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_formats() {
        assert_eq!(
            derive_internal_format(1, ColorSpace::Linear, ComponentType::U8).unwrap(),
            TextureFormat::R8Unorm
        );
        assert_eq!(
            derive_internal_format(2, ColorSpace::Linear, ComponentType::F32).unwrap(),
            TextureFormat::Rg32Float
        );
        assert_eq!(
            derive_internal_format(3, ColorSpace::Linear, ComponentType::U8).unwrap(),
            TextureFormat::Rgba8Unorm
        );
    }

    #[test]
    fn test_srgb_requires_color_channels() {
        assert_eq!(
            derive_internal_format(4, ColorSpace::Srgb, ComponentType::U8).unwrap(),
            TextureFormat::Rgba8UnormSrgb
        );
        assert!(matches!(
            derive_internal_format(1, ColorSpace::Srgb, ComponentType::U8),
            Err(ResourceError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            derive_internal_format(2, ColorSpace::Srgb, ComponentType::U8),
            Err(ResourceError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            derive_internal_format(4, ColorSpace::Srgb, ComponentType::F32),
            Err(ResourceError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_invalid_channel_counts() {
        assert!(derive_internal_format(0, ColorSpace::Linear, ComponentType::U8).is_err());
        assert!(derive_internal_format(5, ColorSpace::Linear, ComponentType::U8).is_err());
    }

    #[test]
    fn test_rgb_is_widened_to_rgba() {
        let image = Image {
            width: 2,
            height: 1,
            channels: 3,
            color_space: ColorSpace::Srgb,
            component: ComponentType::U8,
            layers: vec![Layer {
                data: vec![10, 20, 30, 40, 50, 60],
            }],
        };
        assert_eq!(
            image.upload_data(0).unwrap(),
            vec![10, 20, 30, 255, 40, 50, 60, 255]
        );
    }

    #[test]
    fn test_short_layer_is_rejected() {
        let image = Image::from_rgba8(2, 2, ColorSpace::Linear, vec![0; 4]);
        assert!(image.upload_data(0).is_err());
        assert!(matches!(image.upload_data(1), Err(ResourceError::OutOfBounds)));
    }
}
