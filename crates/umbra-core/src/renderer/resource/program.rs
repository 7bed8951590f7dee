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

//! Programs (vertex + fragment modules) and the cache that loads them by name.

use super::preprocessor::{preprocess, Preprocessed};
use crate::content::ContentResolver;
use crate::renderer::api::{
    ShaderModuleDescriptor, ShaderModuleId, ShaderSourceData, FRAGMENT_ENTRY_POINT,
    VERTEX_ENTRY_POINT,
};
use crate::renderer::error::{ResourceError, ShaderError};
use crate::renderer::traits::GraphicsDevice;
use ahash::AHashMap;
use std::borrow::Cow;
use std::sync::Arc;

/// Stages the backend cannot run; a program providing one is rejected.
const UNSUPPORTED_STAGES: [&str; 2] = ["tcs", "tes"];

/// A compiled program: a vertex module and an optional fragment module.
#[derive(Debug)]
pub struct Program {
    name: String,
    vertex: ShaderModuleId,
    fragment: Option<ShaderModuleId>,
}

impl Program {
    /// Logical name the program was loaded under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Vertex module; its entry point is `vs_main`.
    pub fn vertex(&self) -> ShaderModuleId {
        self.vertex
    }

    /// Fragment module, if the program has one; its entry point is `fs_main`.
    pub fn fragment(&self) -> Option<ShaderModuleId> {
        self.fragment
    }

    /// Entry point names, vertex then fragment.
    pub fn entry_points(&self) -> (&'static str, &'static str) {
        (VERTEX_ENTRY_POINT, FRAGMENT_ENTRY_POINT)
    }
}

/// Loads, preprocesses and compiles programs once, by logical name.
///
/// A program `name` is read from `<root>/<name>.vert.wgsl` and, when present,
/// `<root>/<name>.frag.wgsl`.
#[derive(Debug)]
pub struct ProgramCache {
    root: String,
    programs: AHashMap<String, Arc<Program>>,
    compiled_modules: u64,
}

impl ProgramCache {
    /// Creates an empty cache reading sources below `root`.
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            programs: AHashMap::new(),
            compiled_modules: 0,
        }
    }

    fn stage_path(&self, name: &str, stage: &str) -> String {
        format!("{}/{name}.{stage}.wgsl", self.root)
    }

    /// Returns the program `name`, compiling it on first use.
    ///
    /// ## Errors
    /// Every error is fatal: a missing vertex stage, an unsupported stage,
    /// a preprocessor failure or a compile failure with its mapped location.
    pub fn get(
        &mut self,
        device: &dyn GraphicsDevice,
        content: &dyn ContentResolver,
        name: &str,
    ) -> Result<Arc<Program>, ShaderError> {
        if let Some(program) = self.programs.get(name) {
            return Ok(Arc::clone(program));
        }

        for stage in UNSUPPORTED_STAGES {
            if content.exists(&self.stage_path(name, stage)) {
                return Err(ShaderError::UnsupportedStage {
                    program: name.to_string(),
                    stage: stage.to_string(),
                });
            }
        }

        let vertex_path = self.stage_path(name, "vert");
        let vertex = self.compile(device, content, name, &vertex_path)?;

        let fragment_path = self.stage_path(name, "frag");
        let fragment = if content.exists(&fragment_path) {
            match self.compile(device, content, name, &fragment_path) {
                Ok(module) => Some(module),
                Err(e) => {
                    if let Err(destroy) = device.destroy_shader_module(vertex) {
                        log::warn!("Program '{name}': failed to release vertex module: {destroy}");
                    }
                    return Err(e);
                }
            }
        } else {
            None
        };

        log::debug!(
            "Program '{name}' compiled ({} stage(s))",
            1 + fragment.is_some() as u32
        );
        let program = Arc::new(Program {
            name: name.to_string(),
            vertex,
            fragment,
        });
        self.programs.insert(name.to_string(), Arc::clone(&program));
        Ok(program)
    }

    fn compile(
        &mut self,
        device: &dyn GraphicsDevice,
        content: &dyn ContentResolver,
        name: &str,
        path: &str,
    ) -> Result<ShaderModuleId, ShaderError> {
        let preprocessed = preprocess(content, path)?;
        let result = device.create_shader_module(&ShaderModuleDescriptor {
            label: Some(path),
            source: ShaderSourceData::Wgsl(Cow::Borrowed(&preprocessed.source)),
        });
        self.compiled_modules += 1;
        result.map_err(|e| {
            let error = map_compile_error(e, path, &preprocessed);
            log::error!("Program '{name}': {error}");
            error
        })
    }

    /// Number of programs in the cache.
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    /// `true` when nothing was compiled yet.
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Shader modules compiled since the cache was created.
    pub fn compiled_modules(&self) -> u64 {
        self.compiled_modules
    }

    /// Destroys every cached module.
    pub fn dispose(self, device: &dyn GraphicsDevice) {
        for (name, program) in self.programs {
            let modules = std::iter::once(program.vertex).chain(program.fragment);
            for module in modules {
                if let Err(e) = device.destroy_shader_module(module) {
                    log::warn!("Program '{name}': failed to destroy module: {e}");
                }
            }
        }
    }
}

/// Rewrites the location reported by the compiler (a line of the expanded
/// source) into the file and line it came from.
fn map_compile_error(error: ResourceError, path: &str, preprocessed: &Preprocessed) -> ShaderError {
    match error {
        ResourceError::Shader(ShaderError::CompilationError {
            details, location, ..
        }) => ShaderError::CompilationError {
            label: path.to_string(),
            details,
            location: location.and_then(|l| preprocessed.map_line(l.line)),
        },
        ResourceError::Shader(other) => other,
        other => ShaderError::CompilationError {
            label: path.to_string(),
            details: other.to_string(),
            location: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryContent, RecordingDevice};

    fn content() -> MemoryContent {
        MemoryContent::new()
            .with_text("shaders/blur.vert.wgsl", "#include \"common.wgsl\"\nfn vs_main() {}\n")
            .with_text("shaders/blur.frag.wgsl", "fn fs_main() {}\n")
            .with_text("shaders/common.wgsl", "struct Common {}\nfn broken(\n")
            .with_text("shaders/depth.vert.wgsl", "fn vs_main() {}\n")
    }

    #[test]
    fn test_program_is_compiled_once() {
        let device = RecordingDevice::new();
        let content = content();
        let mut cache = ProgramCache::new("shaders");

        let first = cache.get(&device, &content, "blur").unwrap();
        let second = cache.get(&device, &content, "blur").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.compiled_modules(), 2);
        assert!(first.fragment().is_some());
    }

    #[test]
    fn test_fragment_stage_is_optional() {
        let device = RecordingDevice::new();
        let mut cache = ProgramCache::new("shaders");
        let program = cache.get(&device, &content(), "depth").unwrap();
        assert!(program.fragment().is_none());
    }

    #[test]
    fn test_missing_program_is_fatal() {
        let device = RecordingDevice::new();
        let mut cache = ProgramCache::new("shaders");
        let err = cache.get(&device, &content(), "missing").unwrap_err();
        assert!(matches!(err, ShaderError::LoadError { .. }));
    }

    #[test]
    fn test_tessellation_stage_is_rejected() {
        let device = RecordingDevice::new();
        let content = content().with_text("shaders/blur.tcs.wgsl", "");
        let mut cache = ProgramCache::new("shaders");
        let err = cache.get(&device, &content, "blur").unwrap_err();
        assert!(matches!(err, ShaderError::UnsupportedStage { stage, .. } if stage == "tcs"));
    }

    #[test]
    fn test_compile_error_is_mapped_to_included_file() {
        let device = RecordingDevice::new();
        // The recording device reports an error on the line containing this marker.
        device.fail_shader_containing("fn broken(");
        let mut cache = ProgramCache::new("shaders");

        let err = cache.get(&device, &content(), "blur").unwrap_err();
        match err {
            ShaderError::CompilationError {
                label, location, ..
            } => {
                assert_eq!(label, "shaders/blur.vert.wgsl");
                let location = location.expect("location should be mapped");
                assert_eq!(location.file, "shaders/common.wgsl");
                assert_eq!(location.line, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
