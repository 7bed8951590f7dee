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

//! Placeholder textures substituted for missing material maps.

use super::texture::DEFAULT_TEXTURE_USAGE;
use crate::math::{Extent2D, LinearRgba};
use crate::renderer::api::{TextureDescriptor, TextureFormat, TextureId, TextureKind, TextureWrite};
use crate::renderer::error::ResourceError;
use crate::renderer::traits::GraphicsDevice;
use std::borrow::Cow;

const CHECKER_SIZE: u32 = 4;

/// The placeholder textures every context provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SentinelKind {
    /// Tangent-space normal pointing straight out of the surface.
    FlatNormal,
    /// Opaque black.
    Black,
    /// Opaque white.
    White,
    /// Magenta and black checkerboard marking a map that failed to load.
    Checkerboard,
}

impl SentinelKind {
    /// Every kind, in storage order.
    pub const ALL: [SentinelKind; 4] = [
        SentinelKind::FlatNormal,
        SentinelKind::Black,
        SentinelKind::White,
        SentinelKind::Checkerboard,
    ];

    fn index(self) -> usize {
        self as usize
    }

    fn pixels(self) -> (u32, Vec<u8>) {
        match self {
            SentinelKind::FlatNormal => (1, vec![128, 128, 255, 255]),
            SentinelKind::Black => (1, LinearRgba::BLACK.to_rgba8().to_vec()),
            SentinelKind::White => (1, LinearRgba::WHITE.to_rgba8().to_vec()),
            SentinelKind::Checkerboard => {
                let mut data = Vec::with_capacity((CHECKER_SIZE * CHECKER_SIZE * 4) as usize);
                for y in 0..CHECKER_SIZE {
                    for x in 0..CHECKER_SIZE {
                        let color = if (x + y) % 2 == 0 {
                            LinearRgba::MAGENTA
                        } else {
                            LinearRgba::BLACK
                        };
                        data.extend_from_slice(&color.to_rgba8());
                    }
                }
                (CHECKER_SIZE, data)
            }
        }
    }
}

/// The sentinel textures of one context.
#[derive(Debug)]
pub struct Sentinels {
    textures: [TextureId; 4],
}

impl Sentinels {
    /// Creates and uploads every sentinel texture.
    pub fn new(device: &dyn GraphicsDevice) -> Result<Self, ResourceError> {
        let mut textures = [TextureId(0); 4];
        for kind in SentinelKind::ALL {
            let (side, data) = kind.pixels();
            let size = Extent2D::new(side, side);
            let id = device.create_texture(&TextureDescriptor {
                label: Some(Cow::Owned(format!("sentinel {kind:?}"))),
                size: size.with_layers(1),
                mip_level_count: 1,
                format: TextureFormat::Rgba8Unorm,
                usage: DEFAULT_TEXTURE_USAGE,
                kind: TextureKind::D2,
            })?;
            device.write_texture(&TextureWrite {
                texture: id,
                mip_level: 0,
                layer: 0,
                size,
                bytes_per_row: side * 4,
                data: &data,
            })?;
            textures[kind.index()] = id;
        }
        Ok(Self { textures })
    }

    /// The texture standing in for `kind`.
    pub fn get(&self, kind: SentinelKind) -> TextureId {
        self.textures[kind.index()]
    }

    /// Destroys every sentinel texture.
    pub fn dispose(self, device: &dyn GraphicsDevice) {
        for id in self.textures {
            if let Err(e) = device.destroy_texture(id) {
                log::warn!("Sentinels: failed to destroy {id:?}: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingDevice;

    #[test]
    fn test_every_sentinel_is_distinct() {
        let device = RecordingDevice::new();
        let sentinels = Sentinels::new(&device).unwrap();
        let mut ids: Vec<_> = SentinelKind::ALL.iter().map(|k| sentinels.get(*k)).collect();
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn test_checkerboard_pixels() {
        let (side, data) = SentinelKind::Checkerboard.pixels();
        assert_eq!(side, 4);
        assert_eq!(&data[0..4], &[255, 0, 255, 255]);
        assert_eq!(&data[4..8], &[0, 0, 0, 255]);
    }
}
