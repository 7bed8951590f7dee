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

use super::LaneKind;
use std::fmt;

/// What one call to `render_frame` recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Render passes begun.
    pub passes: u32,
    /// Draw calls, indexed by [`LaneKind::index`].
    pub draws: [u32; LaneKind::COUNT],
    /// Stencil mark draws of light volumes.
    pub light_stencil_draws: u32,
    /// Additive draws of light volumes.
    pub light_additive_draws: u32,
    /// Ambient full-screen passes.
    pub ambient_passes: u32,
    /// Point and spot lights rejected by the range test.
    pub culled_lights: u32,
    /// Objects rejected by the frustum test.
    pub culled_objects: u32,
    /// Face-culling changes between consecutive geometry draws.
    pub cull_mode_switches: u32,
    /// Reflection probe faces rendered.
    pub probe_faces_captured: u32,
    /// Foliage instance buffers uploaded.
    pub foliage_uploads: u32,
    /// Queued GPU tasks run before recording.
    pub tasks_run: u32,
    /// Queued GPU tasks that failed.
    pub tasks_failed: u32,
}

impl FrameStats {
    /// Draw calls recorded by `lane`.
    pub fn draws(&self, lane: LaneKind) -> u32 {
        self.draws[lane.index()]
    }

    /// Draw calls of every lane.
    pub fn total_draws(&self) -> u32 {
        self.draws.iter().sum()
    }

    /// Counts `count` draw calls for `lane`.
    pub fn record_draws(&mut self, lane: LaneKind, count: u32) {
        self.draws[lane.index()] += count;
    }

    /// Counts one render pass.
    pub fn record_pass(&mut self) {
        self.passes += 1;
    }
}

impl fmt::Display for FrameStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} passes, {} draws", self.passes, self.total_draws())?;
        for lane in LaneKind::ALL {
            let draws = self.draws(lane);
            if draws > 0 {
                write!(f, ", {lane}: {draws}")?;
            }
        }
        write!(
            f,
            ", lights {}+{} (culled {})",
            self.light_stencil_draws, self.light_additive_draws, self.culled_lights
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draws_are_counted_per_lane() {
        let mut stats = FrameStats::default();
        stats.record_draws(LaneKind::Geometry, 3);
        stats.record_draws(LaneKind::Fxaa, 1);
        stats.record_draws(LaneKind::Geometry, 2);
        assert_eq!(stats.draws(LaneKind::Geometry), 5);
        assert_eq!(stats.draws(LaneKind::Shadow), 0);
        assert_eq!(stats.total_draws(), 6);
    }

    #[test]
    fn test_display_lists_only_active_lanes() {
        let mut stats = FrameStats::default();
        stats.record_pass();
        stats.record_draws(LaneKind::Ssao, 1);
        let text = stats.to_string();
        assert!(text.starts_with("1 passes, 1 draws"));
        assert!(text.contains("SSAO: 1"));
        assert!(!text.contains("Bloom"));
    }
}
