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

//! Dynamic reflection probe: a six-face HDR cube map captured from a point.

use std::cell::Cell;
use umbra_core::math::{Extent2D, Mat4, Vec3, FRAC_PI_2};
use umbra_core::renderer::api::TextureFormat;
use umbra_core::renderer::resource::{ColorTarget, DepthTarget, Framebuffer, TextureCube};
use umbra_core::renderer::settings::ProbeRefreshPolicy;
use umbra_core::renderer::RenderError;
use umbra_core::RenderContext;

/// Format of the captured radiance.
pub const PROBE_FORMAT: TextureFormat = TextureFormat::Rgba16Float;

const PROBE_NEAR: f32 = 0.1;
const PROBE_FAR: f32 = 1000.0;

/// Viewing direction and up vector of each face, in +X, -X, +Y, -Y, +Z, -Z
/// layer order.
const FACE_BASES: [(Vec3, Vec3); 6] = [
    (Vec3::X, Vec3::NEG_Y),
    (Vec3::NEG_X, Vec3::NEG_Y),
    (Vec3::Y, Vec3::Z),
    (Vec3::NEG_Y, Vec3::NEG_Z),
    (Vec3::Z, Vec3::NEG_Y),
    (Vec3::NEG_Z, Vec3::NEG_Y),
];

/// A reflection probe.
#[derive(Debug)]
pub struct ReflectionProbe {
    position: Vec3,
    cube: TextureCube,
    faces: Vec<Framebuffer>,
    views: Cell<Option<[Mat4; 6]>>,
    view_recomputes: Cell<u64>,
    cursor: u32,
    pending: bool,
}

impl ReflectionProbe {
    /// Allocates the cube map and the six face targets, sized by
    /// `probe_resolution`. The first frame captures every face.
    pub fn new(ctx: &mut RenderContext, position: Vec3) -> Result<Self, RenderError> {
        let size = ctx.settings().probe_resolution.max(1);
        let cube = TextureCube::new(ctx, "reflection probe", PROBE_FORMAT, size, true)?;

        let mut faces = Vec::with_capacity(TextureCube::FACES as usize);
        for face in 0..TextureCube::FACES {
            let built = Framebuffer::builder(format!("probe face {face}"), Extent2D::new(size, size))
                .color(ColorTarget::External(cube.face_view(face, 0)))
                .depth(DepthTarget::Owned(TextureFormat::Depth32Float))
                .build(ctx);
            match built {
                Ok(framebuffer) => faces.push(framebuffer),
                Err(e) => {
                    for framebuffer in faces {
                        framebuffer.dispose(ctx);
                    }
                    if let Err(destroy) = cube.dispose(ctx) {
                        log::warn!("Failed to release probe cube map: {destroy}");
                    }
                    return Err(e);
                }
            }
        }

        Ok(Self {
            position,
            cube,
            faces,
            views: Cell::new(None),
            view_recomputes: Cell::new(0),
            cursor: 0,
            pending: true,
        })
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Moves the probe; its views are recomputed and it is captured again.
    pub fn set_position(&mut self, position: Vec3) {
        if position == self.position {
            return;
        }
        self.position = position;
        self.views.set(None);
        self.pending = true;
    }

    /// Requests a full capture on the next frame.
    pub fn invalidate(&mut self) {
        self.pending = true;
    }

    /// `true` while a capture requested by a move is outstanding.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// The captured radiance.
    pub fn cube(&self) -> &TextureCube {
        &self.cube
    }

    /// Render target of one face.
    pub fn face(&self, face: u32) -> Option<&Framebuffer> {
        self.faces.get(face as usize)
    }

    /// 90° square projection shared by every face.
    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(FRAC_PI_2, 1.0, PROBE_NEAR, PROBE_FAR)
    }

    /// View matrices of the six faces.
    pub fn view_matrices(&self) -> [Mat4; 6] {
        if let Some(views) = self.views.get() {
            return views;
        }
        let views = FACE_BASES.map(|(direction, up)| Mat4::look_to_rh(self.position, direction, up));
        self.views.set(Some(views));
        self.view_recomputes.set(self.view_recomputes.get() + 1);
        views
    }

    /// Projection times view of one face.
    pub fn face_view_projection(&self, face: u32) -> Mat4 {
        self.projection() * self.view_matrices()[face as usize % FACE_BASES.len()]
    }

    /// How many times the face views were recomputed.
    pub fn view_recompute_count(&self) -> u64 {
        self.view_recomputes.get()
    }

    /// Picks the faces to render this frame and consumes the pending flag.
    ///
    /// `EveryFrame` renders all six faces, `OnChange` all six only when the
    /// probe is pending, and `RoundRobin` one face per frame in layer order.
    pub fn faces_to_capture(&mut self, policy: ProbeRefreshPolicy) -> Vec<u32> {
        let faces = match policy {
            ProbeRefreshPolicy::EveryFrame => (0..TextureCube::FACES).collect(),
            ProbeRefreshPolicy::OnChange if self.pending => (0..TextureCube::FACES).collect(),
            ProbeRefreshPolicy::OnChange => Vec::new(),
            ProbeRefreshPolicy::RoundRobin => {
                let face = self.cursor;
                self.cursor = (self.cursor + 1) % TextureCube::FACES;
                vec![face]
            }
        };
        self.pending = false;
        faces
    }

    /// Releases the cube map and the face targets.
    pub fn dispose(self, ctx: &mut RenderContext) {
        for framebuffer in self.faces {
            framebuffer.dispose(ctx);
        }
        if let Err(e) = self.cube.dispose(ctx) {
            log::warn!("Failed to release probe cube map: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::sync::Arc;
    use umbra_core::testing::{MemoryContent, RecordingDevice};
    use umbra_core::RendererSettings;

    fn context() -> (RecordingDevice, RenderContext) {
        let device = RecordingDevice::new();
        let settings = RendererSettings {
            probe_resolution: 64,
            ..RendererSettings::default()
        };
        let ctx = RenderContext::new(Arc::new(device.clone()), Arc::new(MemoryContent::new()), settings).unwrap();
        (device, ctx)
    }

    #[test]
    fn test_on_change_captures_once_per_move() {
        let (_device, mut ctx) = context();
        let mut probe = ReflectionProbe::new(&mut ctx, Vec3::ZERO).unwrap();
        assert_eq!(probe.faces_to_capture(ProbeRefreshPolicy::OnChange).len(), 6);
        assert!(probe.faces_to_capture(ProbeRefreshPolicy::OnChange).is_empty());

        probe.set_position(Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(probe.faces_to_capture(ProbeRefreshPolicy::OnChange), vec![0, 1, 2, 3, 4, 5]);
        probe.dispose(&mut ctx);
    }

    #[test]
    fn test_round_robin_cycles_through_faces() {
        let (_device, mut ctx) = context();
        let mut probe = ReflectionProbe::new(&mut ctx, Vec3::ZERO).unwrap();
        let captured: Vec<u32> = (0..8)
            .flat_map(|_| probe.faces_to_capture(ProbeRefreshPolicy::RoundRobin))
            .collect();
        assert_eq!(captured, vec![0, 1, 2, 3, 4, 5, 0, 1]);
        probe.dispose(&mut ctx);
    }

    #[test]
    fn test_views_recompute_only_after_a_move() {
        let (_device, mut ctx) = context();
        let mut probe = ReflectionProbe::new(&mut ctx, Vec3::ZERO).unwrap();
        let _ = probe.view_matrices();
        let _ = probe.face_view_projection(3);
        assert_eq!(probe.view_recompute_count(), 1);

        probe.set_position(Vec3::new(0.0, 2.0, 0.0));
        let views = probe.view_matrices();
        assert_eq!(probe.view_recompute_count(), 2);

        // +X face looks down +X.
        let ahead = views[0].transform_point3(Vec3::new(5.0, 2.0, 0.0));
        assert_relative_eq!(ahead.z, -5.0, epsilon = 1e-5);
        probe.dispose(&mut ctx);
    }

    #[test]
    fn test_faces_attach_the_cube_layers() {
        let (device, mut ctx) = context();
        let probe = ReflectionProbe::new(&mut ctx, Vec3::ZERO).unwrap();
        assert_eq!(probe.cube().size(), 64);
        assert_eq!(probe.cube().mip_levels(), 7);
        for face in 0..6 {
            let framebuffer = probe.face(face).unwrap();
            assert_eq!(framebuffer.color_view(0), Some(probe.cube().face_view(face, 0)));
        }
        assert_eq!(device.live_labels(umbra_core::testing::ResourceKind::Texture, "probe face").len(), 6);
        probe.dispose(&mut ctx);
        assert!(device.live_labels(umbra_core::testing::ResourceKind::Texture, "probe").is_empty());
    }
}
