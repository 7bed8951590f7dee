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

//! Integer extents and origins for textures, framebuffers and viewports.

/// A two-dimensional extent in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub struct Extent2D {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Extent2D {
    /// Creates a new extent.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// `true` when either side is zero.
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Divides both sides by `divider`, rounding down.
    pub const fn divided(&self, divider: u32) -> Self {
        Self {
            width: self.width / divider,
            height: self.height / divider,
        }
    }

    /// Scales both sides by `factor`, rounding down and never returning zero.
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            width: ((self.width as f32 * factor).floor() as u32).max(1),
            height: ((self.height as f32 * factor).floor() as u32).max(1),
        }
    }

    /// Width divided by height.
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    /// Promotes this extent to a 3D extent with the given layer count.
    pub const fn with_layers(&self, layers: u32) -> Extent3D {
        Extent3D {
            width: self.width,
            height: self.height,
            depth_or_array_layers: layers,
        }
    }
}

/// A three-dimensional extent: width, height and depth or array layer count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent3D {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Depth in pixels or number of array layers.
    pub depth_or_array_layers: u32,
}

impl Extent3D {
    /// Drops the third dimension.
    pub const fn to_2d(&self) -> Extent2D {
        Extent2D {
            width: self.width,
            height: self.height,
        }
    }

    /// Size of mip level `level`, clamped to one pixel.
    pub fn mip_level_size(&self, level: u32) -> Extent2D {
        Extent2D {
            width: (self.width >> level).max(1),
            height: (self.height >> level).max(1),
        }
    }

    /// Full mip chain length for this extent.
    pub fn max_mip_levels(&self) -> u32 {
        let largest = self.width.max(self.height).max(1);
        32 - largest.leading_zeros()
    }
}

/// A three-dimensional offset into a texture: x, y and array layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Origin3D {
    /// X offset in pixels.
    pub x: u32,
    /// Y offset in pixels.
    pub y: u32,
    /// Z offset or array layer.
    pub z: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_divided_rounds_down() {
        let size = Extent2D::new(1279, 721);
        assert_eq!(size.divided(2), Extent2D::new(639, 360));
        assert_eq!(size.divided(64), Extent2D::new(19, 11));
    }

    #[test]
    fn test_scaled_never_zero() {
        assert_eq!(Extent2D::new(3, 3).scaled(0.1), Extent2D::new(1, 1));
        assert_eq!(Extent2D::new(1920, 1080).scaled(0.5), Extent2D::new(960, 540));
    }

    #[test]
    fn test_mip_levels() {
        let size = Extent2D::new(256, 64).with_layers(1);
        assert_eq!(size.max_mip_levels(), 9);
        assert_eq!(size.mip_level_size(7), Extent2D::new(2, 1));
        assert_eq!(size.mip_level_size(8), Extent2D::new(1, 1));
    }
}
