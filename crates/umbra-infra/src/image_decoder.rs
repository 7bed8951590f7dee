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

//! Image file decoding through the `image` crate.

use anyhow::Context;
use image::DynamicImage;
use umbra_core::content::ContentError;
use umbra_core::renderer::resource::{ColorSpace, ComponentType, Image, ImageDecoder, Layer};

/// Decodes PNG, JPEG, HDR and the other formats enabled in the `image` crate.
///
/// 8-bit images keep their channel count. Float images stay float. Other
/// sample types are converted to RGBA: 8-bit for sRGB content, 32-bit float
/// for linear content.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageFileDecoder;

impl ImageFileDecoder {
    fn decode_inner(
        &self,
        path: &str,
        bytes: &[u8],
        color_space: ColorSpace,
    ) -> anyhow::Result<Image> {
        let decoded = image::load_from_memory(bytes)
            .with_context(|| format!("failed to decode image '{path}'"))?;
        let (width, height) = (decoded.width(), decoded.height());

        let (channels, component, data) = match decoded {
            DynamicImage::ImageLuma8(buffer) => (1, ComponentType::U8, buffer.into_raw()),
            DynamicImage::ImageLumaA8(buffer) => (2, ComponentType::U8, buffer.into_raw()),
            DynamicImage::ImageRgb8(buffer) => (3, ComponentType::U8, buffer.into_raw()),
            DynamicImage::ImageRgba8(buffer) => (4, ComponentType::U8, buffer.into_raw()),
            DynamicImage::ImageRgb32F(buffer) => (
                3,
                ComponentType::F32,
                bytemuck::cast_slice(buffer.as_raw()).to_vec(),
            ),
            DynamicImage::ImageRgba32F(buffer) => (
                4,
                ComponentType::F32,
                bytemuck::cast_slice(buffer.as_raw()).to_vec(),
            ),
            other if color_space == ColorSpace::Srgb => {
                (4, ComponentType::U8, other.to_rgba8().into_raw())
            }
            other => (
                4,
                ComponentType::F32,
                bytemuck::cast_slice(other.to_rgba32f().as_raw()).to_vec(),
            ),
        };

        log::debug!(
            "Decoded '{path}': {width}x{height}, {channels} channel(s) of {component:?}"
        );
        Ok(Image {
            width,
            height,
            channels,
            color_space,
            component,
            layers: vec![Layer { data }],
        })
    }
}

impl ImageDecoder for ImageFileDecoder {
    fn decode(
        &self,
        path: &str,
        bytes: &[u8],
        color_space: ColorSpace,
    ) -> Result<Image, ContentError> {
        self.decode_inner(path, bytes, color_space)
            .map_err(|e| ContentError::Parse {
                path: path.to_string(),
                message: format!("{e:#}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, ImageFormat, Luma, Rgb, Rgba};
    use std::io::Cursor;
    use umbra_core::renderer::api::TextureFormat;

    fn encode_png(image: DynamicImage) -> Vec<u8> {
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    #[test]
    fn rgb_png_keeps_three_channels() {
        let source = ImageBuffer::from_fn(3, 2, |x, y| Rgb([x as u8 * 10, y as u8 * 20, 7]));
        let bytes = encode_png(DynamicImage::ImageRgb8(source));

        let image = ImageFileDecoder
            .decode("textures/albedo.png", &bytes, ColorSpace::Srgb)
            .unwrap();

        assert_eq!((image.width, image.height, image.channels), (3, 2, 3));
        assert_eq!(image.component, ComponentType::U8);
        assert_eq!(image.layers[0].data.len(), image.layer_size());
        assert_eq!(&image.layers[0].data[3..6], &[10, 0, 7]);
        assert_eq!(image.gpu_format().unwrap(), TextureFormat::Rgba8UnormSrgb);
        assert_eq!(image.upload_data(0).unwrap().len(), 3 * 2 * 4);
    }

    #[test]
    fn rgba_png_is_passed_through() {
        let source = ImageBuffer::from_pixel(2, 2, Rgba([1, 2, 3, 4]));
        let bytes = encode_png(DynamicImage::ImageRgba8(source));

        let image = ImageFileDecoder
            .decode("textures/mask.png", &bytes, ColorSpace::Linear)
            .unwrap();

        assert_eq!(image.channels, 4);
        assert_eq!(image.layers[0].data, [1, 2, 3, 4].repeat(4));
        assert_eq!(image.gpu_format().unwrap(), TextureFormat::Rgba8Unorm);
    }

    #[test]
    fn grayscale_png_has_one_channel() {
        let source = ImageBuffer::from_pixel(4, 4, Luma([128u8]));
        let bytes = encode_png(DynamicImage::ImageLuma8(source));

        let image = ImageFileDecoder
            .decode("textures/roughness.png", &bytes, ColorSpace::Linear)
            .unwrap();

        assert_eq!(image.channels, 1);
        assert_eq!(image.gpu_format().unwrap(), TextureFormat::R8Unorm);
    }

    #[test]
    fn sixteen_bit_linear_becomes_float() {
        let source = ImageBuffer::from_pixel(1, 1, Rgb([u16::MAX, 0, u16::MAX]));
        let bytes = encode_png(DynamicImage::ImageRgb16(source));

        let image = ImageFileDecoder
            .decode("textures/height.png", &bytes, ColorSpace::Linear)
            .unwrap();

        assert_eq!(image.channels, 4);
        assert_eq!(image.component, ComponentType::F32);
        let texel: &[f32] = bytemuck::cast_slice(&image.layers[0].data);
        assert_eq!(texel, &[1.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let err = ImageFileDecoder
            .decode("textures/broken.png", b"definitely not an image", ColorSpace::Srgb)
            .unwrap_err();

        match err {
            ContentError::Parse { path, message } => {
                assert_eq!(path, "textures/broken.png");
                assert!(message.starts_with("failed to decode image 'textures/broken.png'"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
