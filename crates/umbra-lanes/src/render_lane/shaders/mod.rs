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

//! WGSL sources of every lane, compiled into the binary.
//!
//! [`EmbeddedShaders`] serves them under `shaders/` on top of another
//! resolver. Files found through the inner resolver take precedence, so a
//! shader can be replaced on disk without rebuilding.

use std::io::{Cursor, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use umbra_core::content::{ContentError, ContentResolver};

/// Directory the program cache loads shaders from.
pub const SHADER_ROOT: &str = "shaders";

macro_rules! embed {
    ($($file:literal),* $(,)?) => {
        &[$(($file, include_str!($file))),*]
    };
}

/// Every embedded file, by name relative to [`SHADER_ROOT`].
pub const SOURCES: &[(&str, &str)] = embed![
    "common.wgsl",
    "fullscreen.wgsl",
    "lighting.wgsl",
    "surface.wgsl",
    "volume.wgsl",
    "gbuffer.vert.wgsl",
    "gbuffer.frag.wgsl",
    "foliage.vert.wgsl",
    "foliage.frag.wgsl",
    "shadow_vsm.vert.wgsl",
    "shadow_vsm.frag.wgsl",
    "shadow_depth.vert.wgsl",
    "blur.vert.wgsl",
    "blur.frag.wgsl",
    "ssao.vert.wgsl",
    "ssao.frag.wgsl",
    "ambient.vert.wgsl",
    "ambient.frag.wgsl",
    "light_stencil.vert.wgsl",
    "light_stencil.frag.wgsl",
    "light_point.vert.wgsl",
    "light_point.frag.wgsl",
    "light_spot.vert.wgsl",
    "light_spot.frag.wgsl",
    "light_directional.vert.wgsl",
    "light_directional.frag.wgsl",
    "sky.vert.wgsl",
    "sky.frag.wgsl",
    "bloom_filter.vert.wgsl",
    "bloom_filter.frag.wgsl",
    "bloom_combine.vert.wgsl",
    "bloom_combine.frag.wgsl",
    "tonemap.vert.wgsl",
    "tonemap.frag.wgsl",
    "fxaa.vert.wgsl",
    "fxaa.frag.wgsl",
];

/// Programs the lanes request from the program cache.
pub const PROGRAMS: &[&str] = &[
    "gbuffer",
    "foliage",
    "shadow_vsm",
    "shadow_depth",
    "blur",
    "ssao",
    "ambient",
    "light_stencil",
    "light_point",
    "light_spot",
    "light_directional",
    "sky",
    "bloom_filter",
    "bloom_combine",
    "tonemap",
    "fxaa",
];

/// Source of the embedded file at `path` (e.g. `shaders/sky.vert.wgsl`).
pub fn embedded_source(path: &str) -> Option<&'static str> {
    let name = path.strip_prefix(SHADER_ROOT)?.strip_prefix('/')?;
    SOURCES
        .iter()
        .find(|(file, _)| *file == name)
        .map(|(_, source)| *source)
}

/// A [`ContentResolver`] adding the embedded shaders to `inner`.
#[derive(Debug, Clone)]
pub struct EmbeddedShaders {
    inner: Arc<dyn ContentResolver>,
}

impl EmbeddedShaders {
    /// Wraps `inner`.
    pub fn new(inner: Arc<dyn ContentResolver>) -> Self {
        Self { inner }
    }
}

impl ContentResolver for EmbeddedShaders {
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        self.inner
            .resolve(path)
            .or_else(|| embedded_source(path).map(|_| PathBuf::from(path)))
    }

    fn open_read(&self, path: &str) -> Result<Box<dyn Read + Send>, ContentError> {
        if self.inner.exists(path) {
            return self.inner.open_read(path);
        }
        match embedded_source(path) {
            Some(source) => Ok(Box::new(Cursor::new(source.as_bytes()))),
            None => Err(ContentError::NotFound(path.to_string())),
        }
    }

    fn open_write(&self, path: &str) -> Result<Box<dyn Write + Send>, ContentError> {
        self.inner.open_write(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_core::renderer::resource::preprocessor::preprocess;
    use umbra_core::renderer::resource::ProgramCache;
    use umbra_core::testing::{MemoryContent, RecordingDevice, ResourceKind};

    fn shaders() -> EmbeddedShaders {
        EmbeddedShaders::new(Arc::new(MemoryContent::new()))
    }

    #[test]
    fn test_every_program_compiles_through_the_cache() {
        let device = RecordingDevice::new();
        let content = shaders();
        let mut cache = ProgramCache::new(SHADER_ROOT);
        for name in PROGRAMS {
            let program = cache.get(&device, &content, name).unwrap();
            assert_eq!(program.fragment().is_some(), *name != "shadow_depth", "{name}");
        }
        assert_eq!(cache.len(), PROGRAMS.len());
        assert!(device.live_count(ResourceKind::ShaderModule) >= PROGRAMS.len());
    }

    #[test]
    fn test_includes_are_expanded() {
        let content = shaders();
        let spot = preprocess(&content, "shaders/light_spot.frag.wgsl").unwrap();
        assert!(spot.source.contains("struct Light"));
        assert!(spot.source.contains("fn load_surface"));
        assert!(!spot.source.contains("#include"));
        assert_eq!(
            spot.files(),
            [
                "shaders/light_spot.frag.wgsl",
                "shaders/lighting.wgsl",
                "shaders/common.wgsl"
            ]
        );
    }

    #[test]
    fn test_files_on_disk_take_precedence() {
        let inner = MemoryContent::new().with_text("shaders/sky.frag.wgsl", "// replaced\n");
        let content = EmbeddedShaders::new(Arc::new(inner));
        assert_eq!(content.read_text("shaders/sky.frag.wgsl").unwrap(), "// replaced\n");
        assert!(content
            .read_text("shaders/sky.vert.wgsl")
            .unwrap()
            .contains("fn vs_main"));
    }

    #[test]
    fn test_unknown_paths_are_not_found() {
        let content = shaders();
        assert!(!content.exists("shaders/missing.vert.wgsl"));
        assert!(!content.exists("sky.vert.wgsl"));
        assert!(matches!(
            content.read_bytes("shaders/missing.vert.wgsl"),
            Err(ContentError::NotFound(_))
        ));
    }
}
