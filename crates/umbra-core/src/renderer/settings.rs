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

//! Renderer configuration, loadable from RON.

use crate::content::{ContentError, ContentResolver};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// When reflection probes re-render their faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProbeRefreshPolicy {
    /// All six faces every frame.
    EveryFrame,
    /// One face per frame, cycling through the six.
    RoundRobin,
    /// All six faces, only in frames where the probe moved.
    #[default]
    OnChange,
}

/// Tunables of the frame renderer.
///
/// Missing fields in a RON document take their default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererSettings {
    /// Internal resolution as a fraction of the output size.
    pub render_scale: f32,
    /// Resolution of directional variance shadow maps.
    pub directional_shadow_size: u32,
    /// Resolution of spot light shadow maps.
    pub spot_shadow_size: u32,
    /// Resolution of point light shadow maps.
    pub point_shadow_size: u32,
    /// Half-size of the orthographic box of directional lights.
    pub directional_shadow_extent: f32,
    /// Minimum visible intensity, used to derive light ranges.
    pub light_intensity_threshold: f32,
    /// Number of bloom levels.
    pub bloom_levels: u32,
    /// Luminance above which pixels bloom.
    pub bloom_threshold: f32,
    /// Combine weight of the first bloom level.
    pub bloom_intensity: f32,
    /// Weight multiplier from one bloom level to the next.
    pub bloom_falloff: f32,
    /// Whether the SSAO lane runs.
    pub ssao_enabled: bool,
    /// SSAO sample radius in world units.
    pub ssao_radius: f32,
    /// Reflection probe refresh policy.
    pub probe_refresh: ProbeRefreshPolicy,
    /// Face size of reflection probes.
    pub probe_resolution: u32,
    /// Capacity of the GPU task queue.
    pub task_queue_capacity: usize,
    /// Soft budget of one GPU task, in milliseconds.
    pub task_soft_budget_ms: u64,
    /// Texture names generated per pool refill.
    pub texture_pool_batch: u32,
    /// Whether presentation waits for vertical sync.
    pub vsync: bool,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            render_scale: 1.0,
            directional_shadow_size: 4096,
            spot_shadow_size: 4096,
            point_shadow_size: 2048,
            directional_shadow_extent: 50.0,
            light_intensity_threshold: 5.0 / 256.0,
            bloom_levels: 6,
            bloom_threshold: 1.0,
            bloom_intensity: 0.6,
            bloom_falloff: 0.75,
            ssao_enabled: true,
            ssao_radius: 0.5,
            probe_refresh: ProbeRefreshPolicy::OnChange,
            probe_resolution: 256,
            task_queue_capacity: 256,
            task_soft_budget_ms: 4,
            texture_pool_batch: 32,
            vsync: true,
        }
    }
}

impl RendererSettings {
    /// Parses settings from a RON document.
    pub fn from_ron_str(source: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(source)
    }

    /// Reads and parses the RON document at `path`.
    pub fn load(resolver: &dyn ContentResolver, path: &str) -> Result<Self, ContentError> {
        let text = resolver.read_text(path)?;
        let settings = Self::from_ron_str(&text).map_err(|e| ContentError::Parse {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        log::info!("Renderer settings loaded from '{path}'");
        Ok(settings)
    }

    /// Render scale limited to the supported range.
    pub fn clamped_render_scale(&self) -> f32 {
        if self.render_scale.is_finite() {
            self.render_scale.clamp(0.25, 2.0)
        } else {
            1.0
        }
    }

    /// Soft budget of one GPU task.
    pub fn task_soft_budget(&self) -> Duration {
        Duration::from_millis(self.task_soft_budget_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryContent;
    use approx::assert_relative_eq;

    #[test]
    fn test_partial_document_keeps_defaults() {
        let settings =
            RendererSettings::from_ron_str("(bloom_levels: 4, probe_refresh: RoundRobin)").unwrap();
        assert_eq!(settings.bloom_levels, 4);
        assert_eq!(settings.probe_refresh, ProbeRefreshPolicy::RoundRobin);
        assert_eq!(settings.directional_shadow_size, 4096);
        assert_eq!(settings.point_shadow_size, 2048);
    }

    #[test]
    fn test_render_scale_is_clamped() {
        let settings = RendererSettings {
            render_scale: 8.0,
            ..Default::default()
        };
        assert_relative_eq!(settings.clamped_render_scale(), 2.0);
    }

    #[test]
    fn test_load_through_resolver() {
        let content = MemoryContent::new().with_text("renderer.ron", "(ssao_enabled: false)");
        let settings = RendererSettings::load(&content, "renderer.ron").unwrap();
        assert!(!settings.ssao_enabled);
        assert!(matches!(
            RendererSettings::load(&content, "missing.ron"),
            Err(ContentError::NotFound(_))
        ));
    }

    #[test]
    fn test_invalid_document_is_a_parse_error() {
        let content = MemoryContent::new().with_text("renderer.ron", "(bloom_levels: \"six\")");
        assert!(matches!(
            RendererSettings::load(&content, "renderer.ron"),
            Err(ContentError::Parse { .. })
        ));
    }
}
