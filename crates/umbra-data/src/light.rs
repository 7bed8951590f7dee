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

//! Lights: a sum type over directional, point and spot lights sharing color,
//! intensity, lazily allocated shadows and a cached light-space matrix.

use crate::shadow::{ShadowMap, ShadowResource, VarianceShadowMap};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use umbra_core::math::{LinearRgba, Mat4, Vec3};
use umbra_core::renderer::RenderError;
use umbra_core::RenderContext;

/// Far plane used for spot light shadows whose range is unbounded.
pub const MAX_SHADOW_DISTANCE: f32 = 1000.0;

const SHADOW_NEAR: f32 = 0.1;

/// Distance attenuation `1 / (constant + linear·d + quadratic·d²)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attenuation {
    /// Constant term.
    pub constant: f32,
    /// Linear term.
    pub linear: f32,
    /// Quadratic term.
    pub quadratic: f32,
}

impl Default for Attenuation {
    fn default() -> Self {
        Self {
            constant: 1.0,
            linear: 0.09,
            quadratic: 0.032,
        }
    }
}

impl Attenuation {
    /// Denominator of the attenuation at `distance`.
    pub fn evaluate(&self, distance: f32) -> f32 {
        self.constant + self.linear * distance + self.quadratic * distance * distance
    }

    /// Distance at which `peak / attenuation` falls to `threshold`.
    ///
    /// Solves `quadratic·r² + linear·r + constant = peak / threshold` for its
    /// positive root, falling back to the linear solution when `quadratic`
    /// is zero. Unbounded attenuation yields `f32::INFINITY`.
    pub fn range(&self, peak: f32, threshold: f32) -> f32 {
        if threshold <= 0.0 {
            return f32::INFINITY;
        }
        let target = peak / threshold;
        let (a, b, c) = (self.quadratic, self.linear, self.constant - target);
        if a == 0.0 {
            if b == 0.0 {
                return f32::INFINITY;
            }
            return (-c / b).max(0.0);
        }
        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return 0.0;
        }
        ((-b + discriminant.sqrt()) / (2.0 * a)).max(0.0)
    }
}

/// Kind-specific light parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LightKind {
    /// Infinitely distant light.
    Directional {
        /// Direction the light travels in, normalized.
        direction: Vec3,
    },
    /// Omnidirectional light.
    Point {
        /// World position.
        position: Vec3,
        /// Distance attenuation.
        attenuation: Attenuation,
    },
    /// Cone-shaped light.
    Spot {
        /// World position.
        position: Vec3,
        /// Axis of the cone, normalized.
        direction: Vec3,
        /// Half-angle of full intensity, in radians.
        inner_cutoff: f32,
        /// Half-angle where the light fades out, in radians.
        outer_cutoff: f32,
        /// Distance attenuation.
        attenuation: Attenuation,
    },
}

impl LightKind {
    /// Short name used in logs and labels.
    pub fn name(&self) -> &'static str {
        match self {
            LightKind::Directional { .. } => "directional",
            LightKind::Point { .. } => "point",
            LightKind::Spot { .. } => "spot",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct LightSpaceKey {
    extent: f32,
    threshold: f32,
}

/// A light source.
#[derive(Debug)]
pub struct Light {
    kind: LightKind,
    color: LinearRgba,
    intensity: f32,
    shadow: Option<ShadowResource>,
    light_space: Cell<Option<(LightSpaceKey, Mat4)>>,
    light_space_recomputes: Cell<u64>,
    unshadowed_warning: Cell<bool>,
}

fn orthogonal_up(direction: Vec3) -> Vec3 {
    if direction.normalize_or_zero().dot(Vec3::Y).abs() > 0.99 {
        Vec3::Z
    } else {
        Vec3::Y
    }
}

impl Light {
    fn with_kind(kind: LightKind, color: LinearRgba, intensity: f32) -> Self {
        Self {
            kind,
            color,
            intensity,
            shadow: None,
            light_space: Cell::new(None),
            light_space_recomputes: Cell::new(0),
            unshadowed_warning: Cell::new(false),
        }
    }

    /// A directional light travelling along `direction`.
    pub fn directional(direction: Vec3, color: LinearRgba, intensity: f32) -> Self {
        Self::with_kind(
            LightKind::Directional {
                direction: direction.normalize_or_zero(),
            },
            color,
            intensity,
        )
    }

    /// A point light at `position`.
    pub fn point(position: Vec3, attenuation: Attenuation, color: LinearRgba, intensity: f32) -> Self {
        Self::with_kind(
            LightKind::Point {
                position,
                attenuation,
            },
            color,
            intensity,
        )
    }

    /// A spot light at `position` pointing along `direction`; cutoffs are
    /// half-angles in radians.
    pub fn spot(
        position: Vec3,
        direction: Vec3,
        inner_cutoff: f32,
        outer_cutoff: f32,
        attenuation: Attenuation,
        color: LinearRgba,
        intensity: f32,
    ) -> Self {
        Self::with_kind(
            LightKind::Spot {
                position,
                direction: direction.normalize_or_zero(),
                inner_cutoff: inner_cutoff.min(outer_cutoff),
                outer_cutoff,
                attenuation,
            },
            color,
            intensity,
        )
    }

    /// Kind-specific parameters.
    pub fn kind(&self) -> &LightKind {
        &self.kind
    }

    /// Linear color.
    pub fn color(&self) -> LinearRgba {
        self.color
    }

    /// Intensity multiplier.
    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    /// Changes the color.
    pub fn set_color(&mut self, color: LinearRgba) {
        self.color = color;
        self.light_space.set(None);
    }

    /// Changes the intensity.
    pub fn set_intensity(&mut self, intensity: f32) {
        self.intensity = intensity;
        self.light_space.set(None);
    }

    /// World position; `None` for directional lights.
    pub fn position(&self) -> Option<Vec3> {
        match self.kind {
            LightKind::Directional { .. } => None,
            LightKind::Point { position, .. } | LightKind::Spot { position, .. } => Some(position),
        }
    }

    /// Direction of travel; `None` for point lights.
    pub fn direction(&self) -> Option<Vec3> {
        match self.kind {
            LightKind::Directional { direction } | LightKind::Spot { direction, .. } => {
                Some(direction)
            }
            LightKind::Point { .. } => None,
        }
    }

    /// Moves a point or spot light; ignored for directional lights.
    pub fn set_position(&mut self, new_position: Vec3) {
        match &mut self.kind {
            LightKind::Point { position, .. } | LightKind::Spot { position, .. } => {
                *position = new_position;
                self.light_space.set(None);
            }
            LightKind::Directional { .. } => {
                log::debug!("Ignoring set_position on a directional light");
            }
        }
    }

    /// Re-aims a directional or spot light; ignored for point lights.
    pub fn set_direction(&mut self, new_direction: Vec3) {
        match &mut self.kind {
            LightKind::Directional { direction } | LightKind::Spot { direction, .. } => {
                *direction = new_direction.normalize_or_zero();
                self.light_space.set(None);
            }
            LightKind::Point { .. } => {
                log::debug!("Ignoring set_direction on a point light");
            }
        }
    }

    /// Changes the cone of a spot light; ignored for other kinds.
    pub fn set_cutoff(&mut self, inner: f32, outer: f32) {
        if let LightKind::Spot {
            inner_cutoff,
            outer_cutoff,
            ..
        } = &mut self.kind
        {
            *inner_cutoff = inner.min(outer);
            *outer_cutoff = outer;
            self.light_space.set(None);
        }
    }

    /// Changes the attenuation of a point or spot light.
    pub fn set_attenuation(&mut self, new_attenuation: Attenuation) {
        match &mut self.kind {
            LightKind::Point { attenuation, .. } | LightKind::Spot { attenuation, .. } => {
                *attenuation = new_attenuation;
                self.light_space.set(None);
            }
            LightKind::Directional { .. } => {}
        }
    }

    /// Distance beyond which the light is below `threshold`; infinite for
    /// directional lights.
    pub fn range(&self, threshold: f32) -> f32 {
        match self.kind {
            LightKind::Directional { .. } => f32::INFINITY,
            LightKind::Point { attenuation, .. } | LightKind::Spot { attenuation, .. } => {
                attenuation.range(self.intensity * self.color.max_channel(), threshold)
            }
        }
    }

    /// `true` while the light owns a shadow resource.
    pub fn casts_shadows(&self) -> bool {
        self.shadow.is_some()
    }

    /// The shadow resource, if shadows are enabled.
    pub fn shadow(&self) -> Option<&ShadowResource> {
        self.shadow.as_ref()
    }

    /// Shadow resolution for this light's kind.
    pub fn shadow_size(&self, ctx: &RenderContext) -> u32 {
        let settings = ctx.settings();
        match self.kind {
            LightKind::Directional { .. } => settings.directional_shadow_size,
            LightKind::Spot { .. } => settings.spot_shadow_size,
            LightKind::Point { .. } => settings.point_shadow_size,
        }
    }

    /// Enables or disables shadows.
    ///
    /// Enabling allocates the resource on first use only; disabling releases
    /// it, and a later enable allocates a fresh one.
    pub fn set_casting_shadows(&mut self, ctx: &mut RenderContext, enabled: bool) -> Result<(), RenderError> {
        match (enabled, self.shadow.is_some()) {
            (true, false) => {
                let size = self.shadow_size(ctx);
                let resource = match self.kind {
                    LightKind::Directional { .. } => {
                        ShadowResource::Variance(VarianceShadowMap::new(ctx, size)?)
                    }
                    LightKind::Point { .. } | LightKind::Spot { .. } => {
                        ShadowResource::Depth(ShadowMap::new(ctx, size)?)
                    }
                };
                log::debug!("Enabled shadows for {} light ({size}px)", self.kind.name());
                self.shadow = Some(resource);
            }
            (false, true) => {
                if let Some(resource) = self.shadow.take() {
                    resource.dispose(ctx);
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Logs, once per light, that a point light's shadow is not rendered.
    ///
    /// Returns `true` the first time.
    pub fn warn_unshadowed_once(&self) -> bool {
        if self.unshadowed_warning.replace(true) {
            return false;
        }
        log::warn!("Point light shadows are not rendered; the light is treated as unshadowed");
        true
    }

    /// View-projection from the light's point of view.
    ///
    /// Directional lights use an orthographic box of half-size `extent`
    /// centered on the origin; spot lights a perspective cone of
    /// `2·outer_cutoff` reaching to the light's range. Point lights have no
    /// single light space and return the identity.
    pub fn light_space_matrix(&self, extent: f32, threshold: f32) -> Mat4 {
        let key = LightSpaceKey { extent, threshold };
        if let Some((cached_key, matrix)) = self.light_space.get() {
            if cached_key == key {
                return matrix;
            }
        }

        let matrix = match self.kind {
            LightKind::Directional { direction } => {
                let eye = -direction * extent * 2.0;
                let view = Mat4::look_at_rh(eye, Vec3::ZERO, orthogonal_up(direction));
                let projection =
                    Mat4::orthographic_rh(-extent, extent, -extent, extent, 0.0, extent * 4.0);
                projection * view
            }
            LightKind::Spot {
                position,
                direction,
                outer_cutoff,
                ..
            } => {
                let far = self.range(threshold).clamp(SHADOW_NEAR * 2.0, MAX_SHADOW_DISTANCE);
                let view = Mat4::look_to_rh(position, direction, orthogonal_up(direction));
                let projection = Mat4::perspective_rh(2.0 * outer_cutoff, 1.0, SHADOW_NEAR, far);
                projection * view
            }
            LightKind::Point { .. } => Mat4::IDENTITY,
        };

        self.light_space.set(Some((key, matrix)));
        self.light_space_recomputes
            .set(self.light_space_recomputes.get() + 1);
        matrix
    }

    /// How many times the light-space matrix was recomputed.
    pub fn light_space_recompute_count(&self) -> u64 {
        self.light_space_recomputes.get()
    }

    /// Releases the shadow resource.
    pub fn dispose(mut self, ctx: &mut RenderContext) {
        if let Some(resource) = self.shadow.take() {
            resource.dispose(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::sync::Arc;
    use umbra_core::testing::{MemoryContent, RecordingDevice, ResourceKind};
    use umbra_core::RendererSettings;

    fn context() -> (Arc<RecordingDevice>, RenderContext) {
        let device = Arc::new(RecordingDevice::new());
        let ctx = RenderContext::new(
            device.clone(),
            Arc::new(MemoryContent::new()),
            RendererSettings::default(),
        )
        .unwrap();
        (device, ctx)
    }

    #[test]
    fn test_range_round_trips_through_attenuation() {
        let threshold = 5.0 / 256.0;
        let light = Light::point(
            Vec3::ZERO,
            Attenuation {
                constant: 1.0,
                linear: 0.7,
                quadratic: 1.8,
            },
            LinearRgba::rgb(1.0, 0.5, 0.25),
            3.0,
        );
        let range = light.range(threshold);
        let LightKind::Point { attenuation, .. } = *light.kind() else {
            unreachable!()
        };
        let intensity_at_range = 3.0 * 1.0 / attenuation.evaluate(range);
        assert_relative_eq!(intensity_at_range, threshold, max_relative = 1e-4);
    }

    #[test]
    fn test_linear_and_unbounded_attenuation() {
        let linear = Attenuation {
            constant: 1.0,
            linear: 0.5,
            quadratic: 0.0,
        };
        assert_relative_eq!(linear.range(1.0, 0.1), 18.0);
        let unbounded = Attenuation {
            constant: 1.0,
            linear: 0.0,
            quadratic: 0.0,
        };
        assert!(unbounded.range(1.0, 0.1).is_infinite());
    }

    #[test]
    fn test_shadow_is_allocated_once() {
        let (device, mut ctx) = context();
        let mut light = Light::directional(Vec3::NEG_Y, LinearRgba::WHITE, 1.0);
        assert!(!light.casts_shadows());
        let before = device.live_count(ResourceKind::Texture);

        light.set_casting_shadows(&mut ctx, true).unwrap();
        let after_first = device.live_count(ResourceKind::Texture);
        light.set_casting_shadows(&mut ctx, true).unwrap();
        assert_eq!(device.live_count(ResourceKind::Texture), after_first);
        assert!(after_first > before);

        match light.shadow() {
            Some(ShadowResource::Variance(map)) => assert_eq!(map.size(), 4096),
            other => panic!("expected a variance shadow map, got {other:?}"),
        }
    }

    #[test]
    fn test_shadow_size_depends_on_kind() {
        let (_device, mut ctx) = context();
        let mut spot = Light::spot(
            Vec3::Y,
            Vec3::NEG_Y,
            0.3,
            0.5,
            Attenuation::default(),
            LinearRgba::WHITE,
            1.0,
        );
        let mut point = Light::point(Vec3::Y, Attenuation::default(), LinearRgba::WHITE, 1.0);
        spot.set_casting_shadows(&mut ctx, true).unwrap();
        point.set_casting_shadows(&mut ctx, true).unwrap();
        assert!(matches!(spot.shadow(), Some(ShadowResource::Depth(m)) if m.size() == 4096));
        assert!(matches!(point.shadow(), Some(ShadowResource::Depth(m)) if m.size() == 2048));
    }

    #[test]
    fn test_disabling_releases_the_resource() {
        let (device, mut ctx) = context();
        let mut light = Light::directional(Vec3::NEG_Y, LinearRgba::WHITE, 1.0);
        let baseline = device.live_count(ResourceKind::Texture);
        light.set_casting_shadows(&mut ctx, true).unwrap();
        light.set_casting_shadows(&mut ctx, false).unwrap();
        assert!(light.shadow().is_none());
        // Pool names return to the device only when the pool is disposed;
        // the storage-bearing depth buffer is gone.
        assert!(device.live_labels(ResourceKind::Texture, "vsm depth").is_empty());
        assert!(device.live_count(ResourceKind::Texture) >= baseline);
    }

    #[test]
    fn test_light_space_matrix_is_cached_until_moved() {
        let mut light = Light::spot(
            Vec3::new(0.0, 5.0, 0.0),
            Vec3::NEG_Y,
            0.2,
            0.4,
            Attenuation::default(),
            LinearRgba::WHITE,
            2.0,
        );
        let first = light.light_space_matrix(50.0, 0.02);
        assert_eq!(light.light_space_matrix(50.0, 0.02), first);
        assert_eq!(light.light_space_recompute_count(), 1);

        light.set_position(Vec3::new(1.0, 5.0, 0.0));
        assert_ne!(light.light_space_matrix(50.0, 0.02), first);
        assert_eq!(light.light_space_recompute_count(), 2);
    }

    #[test]
    fn test_directional_light_space_maps_origin_inside_box() {
        let light = Light::directional(Vec3::new(-0.3, -1.0, -0.2), LinearRgba::WHITE, 1.0);
        let clip = light.light_space_matrix(50.0, 0.02).project_point3(Vec3::ZERO);
        assert!(clip.x.abs() < 1e-4 && clip.y.abs() < 1e-4);
        assert!((0.0..=1.0).contains(&clip.z));
    }
}
