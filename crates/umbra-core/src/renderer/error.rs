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

//! Defines the hierarchy of error types for the rendering subsystem.
//!
//! Every variant here is fatal for the operation that produced it: the frame
//! renderer never retries a failed shader compile or an incomplete framebuffer.

use crate::renderer::api::{RenderPipelineId, ShaderModuleId, TextureId};
use std::fmt;

/// A `file:line` position inside shader source, after include expansion is undone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// The file the line belongs to.
    pub file: String,
    /// One-based line number inside `file`.
    pub line: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// An error related to the loading, preprocessing or compilation of a shader.
#[derive(Debug)]
pub enum ShaderError {
    /// The shader source could not be read.
    LoadError {
        /// The path of the file that failed to load.
        path: String,
        /// The underlying I/O or resolver error.
        source_error: String,
    },
    /// The preprocessor rejected the source (missing include, include cycle).
    PreprocessError {
        /// The file being preprocessed.
        path: String,
        /// What went wrong.
        details: String,
    },
    /// The shader source failed to compile into a backend-specific module.
    CompilationError {
        /// A descriptive label for the shader.
        label: String,
        /// Detailed error messages from the shader compiler.
        details: String,
        /// Best-effort location of the first error in the original sources.
        location: Option<SourceLocation>,
    },
    /// The program provides a stage the backend cannot run.
    UnsupportedStage {
        /// The logical program name.
        program: String,
        /// The stage file extension (`tcs`, `tes`).
        stage: String,
    },
    /// The requested shader module could not be found.
    NotFound {
        /// The ID of the shader module that was not found.
        id: ShaderModuleId,
    },
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::LoadError { path, source_error } => {
                write!(
                    f,
                    "Failed to load shader source from '{path}': {source_error}"
                )
            }
            ShaderError::PreprocessError { path, details } => {
                write!(f, "Failed to preprocess shader '{path}': {details}")
            }
            ShaderError::CompilationError {
                label,
                details,
                location,
            } => match location {
                Some(location) => write!(
                    f,
                    "Shader compilation failed for '{label}' at {location}: {details}"
                ),
                None => write!(f, "Shader compilation failed for '{label}': {details}"),
            },
            ShaderError::UnsupportedStage { program, stage } => {
                write!(
                    f,
                    "Program '{program}' has a '{stage}' stage that the backend cannot run"
                )
            }
            ShaderError::NotFound { id } => {
                write!(f, "Shader module not found for ID: {id:?}")
            }
        }
    }
}

impl std::error::Error for ShaderError {}

/// An error related to the creation of a graphics pipeline.
#[derive(Debug)]
pub enum PipelineError {
    /// Failed to create a pipeline layout.
    LayoutCreationFailed(String),
    /// The backend failed to build the pipeline state object.
    CompilationFailed {
        /// A descriptive label for the pipeline, if available.
        label: Option<String>,
        /// Detailed error messages from the backend.
        details: String,
    },
    /// The specified render pipeline ID is not valid.
    InvalidRenderPipeline {
        /// The ID of the invalid render pipeline.
        id: RenderPipelineId,
    },
    /// A required graphics feature is not supported by the device.
    FeatureNotSupported(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::LayoutCreationFailed(msg) => {
                write!(f, "Pipeline layout creation failed: {msg}")
            }
            PipelineError::CompilationFailed { label, details } => {
                write!(
                    f,
                    "Pipeline compilation failed for '{}': {}",
                    label.as_deref().unwrap_or("Unknown"),
                    details
                )
            }
            PipelineError::InvalidRenderPipeline { id } => {
                write!(f, "Invalid render pipeline ID: {id:?}")
            }
            PipelineError::FeatureNotSupported(msg) => {
                write!(f, "Feature not supported: {msg}")
            }
        }
    }
}

impl std::error::Error for PipelineError {}

/// An error related to the creation or use of a GPU resource.
#[derive(Debug)]
pub enum ResourceError {
    /// A shader-specific error occurred.
    Shader(ShaderError),
    /// A pipeline-specific error occurred.
    Pipeline(PipelineError),
    /// A generic resource could not be found.
    NotFound,
    /// The handle or ID used to reference a resource is invalid.
    InvalidHandle,
    /// The resource was already disposed.
    Disposed(&'static str),
    /// A texture was used before storage was allocated for it.
    MissingStorage(TextureId),
    /// The channel count, color space and component type do not map to a GPU format.
    UnsupportedFormat(String),
    /// An error originating from the specific graphics backend implementation.
    BackendError(String),
    /// An attempt was made to access a resource out of its bounds.
    OutOfBounds,
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::Shader(err) => write!(f, "Shader resource error: {err}"),
            ResourceError::Pipeline(err) => write!(f, "Pipeline resource error: {err}"),
            ResourceError::NotFound => write!(f, "Resource not found with ID."),
            ResourceError::InvalidHandle => write!(f, "Invalid resource handle or ID."),
            ResourceError::Disposed(kind) => write!(f, "Use of a disposed {kind}."),
            ResourceError::MissingStorage(id) => {
                write!(f, "Texture {id:?} has no storage allocated.")
            }
            ResourceError::UnsupportedFormat(msg) => {
                write!(f, "Unsupported texture format: {msg}")
            }
            ResourceError::BackendError(msg) => {
                write!(f, "Backend-specific resource error: {msg}")
            }
            ResourceError::OutOfBounds => write!(f, "Resource access out of bounds."),
        }
    }
}

impl std::error::Error for ResourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResourceError::Shader(err) => Some(err),
            ResourceError::Pipeline(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ShaderError> for ResourceError {
    fn from(err: ShaderError) -> Self {
        ResourceError::Shader(err)
    }
}

impl From<PipelineError> for ResourceError {
    fn from(err: PipelineError) -> Self {
        ResourceError::Pipeline(err)
    }
}

/// A framebuffer failed its completeness check.
#[derive(Debug)]
pub enum FramebufferError {
    /// The framebuffer has no attachment at all.
    NoAttachments {
        /// Label of the framebuffer.
        label: String,
    },
    /// The framebuffer or one of its attachments has a zero dimension.
    ZeroSized {
        /// Label of the framebuffer.
        label: String,
    },
    /// An attachment differs in size from the framebuffer.
    SizeMismatch {
        /// Label of the framebuffer.
        label: String,
        /// Index of the offending attachment (depth is reported last).
        attachment: usize,
    },
    /// An attachment has a format that cannot be rendered to at its slot.
    InvalidFormat {
        /// Label of the framebuffer.
        label: String,
        /// Index of the offending attachment.
        attachment: usize,
    },
    /// An attachment was never given storage.
    MissingStorage {
        /// Label of the framebuffer.
        label: String,
        /// Index of the offending attachment.
        attachment: usize,
    },
    /// The device reported the framebuffer incomplete.
    Incomplete {
        /// Label of the framebuffer.
        label: String,
        /// Device-specific reason.
        reason: String,
    },
}

impl fmt::Display for FramebufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FramebufferError::NoAttachments { label } => {
                write!(f, "Framebuffer '{label}' is incomplete: no attachments")
            }
            FramebufferError::ZeroSized { label } => {
                write!(f, "Framebuffer '{label}' is incomplete: zero-sized")
            }
            FramebufferError::SizeMismatch { label, attachment } => write!(
                f,
                "Framebuffer '{label}' is incomplete: attachment {attachment} has a different size"
            ),
            FramebufferError::InvalidFormat { label, attachment } => write!(
                f,
                "Framebuffer '{label}' is incomplete: attachment {attachment} has an invalid format"
            ),
            FramebufferError::MissingStorage { label, attachment } => write!(
                f,
                "Framebuffer '{label}' is incomplete: attachment {attachment} has no storage"
            ),
            FramebufferError::Incomplete { label, reason } => {
                write!(f, "Framebuffer '{label}' is incomplete: {reason}")
            }
        }
    }
}

impl std::error::Error for FramebufferError {}

/// A high-level error of the rendering system.
#[derive(Debug)]
pub enum RenderError {
    /// A failure occurred during the initialization of the graphics backend.
    InitializationFailed(String),
    /// Failed to acquire the next frame from the surface.
    SurfaceAcquisitionFailed(String),
    /// An error occurred while managing a GPU resource.
    ResourceError(ResourceError),
    /// A framebuffer failed its completeness check.
    Framebuffer(FramebufferError),
    /// An unexpected or internal error occurred.
    Internal(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::InitializationFailed(msg) => {
                write!(f, "Failed to initialize graphics backend: {msg}")
            }
            RenderError::SurfaceAcquisitionFailed(msg) => {
                write!(f, "Failed to acquire surface for rendering: {msg}")
            }
            RenderError::ResourceError(err) => {
                write!(f, "Graphics resource operation failed: {err}")
            }
            RenderError::Framebuffer(err) => write!(f, "{err}"),
            RenderError::Internal(msg) => {
                write!(f, "An internal or unexpected error occurred: {msg}")
            }
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::ResourceError(err) => Some(err),
            RenderError::Framebuffer(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceError> for RenderError {
    fn from(err: ResourceError) -> Self {
        RenderError::ResourceError(err)
    }
}

impl From<ShaderError> for RenderError {
    fn from(err: ShaderError) -> Self {
        RenderError::ResourceError(ResourceError::Shader(err))
    }
}

impl From<FramebufferError> for RenderError {
    fn from(err: FramebufferError) -> Self {
        RenderError::Framebuffer(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn shader_error_display_with_location() {
        let err = ShaderError::CompilationError {
            label: "geometry.frag".to_string(),
            details: "unknown identifier `albedo`".to_string(),
            location: Some(SourceLocation {
                file: "shaders/common/material.wgsl".to_string(),
                line: 12,
            }),
        };
        assert_eq!(
            format!("{err}"),
            "Shader compilation failed for 'geometry.frag' at shaders/common/material.wgsl:12: unknown identifier `albedo`"
        );
    }

    #[test]
    fn render_error_wraps_shader_error() {
        let render_err: RenderError = ShaderError::NotFound {
            id: ShaderModuleId(7),
        }
        .into();
        assert_eq!(
            format!("{render_err}"),
            "Graphics resource operation failed: Shader resource error: Shader module not found for ID: ShaderModuleId(7)"
        );
        assert!(render_err.source().is_some());
        assert!(render_err.source().unwrap().source().is_some());
    }

    #[test]
    fn framebuffer_error_display() {
        let err: RenderError = FramebufferError::SizeMismatch {
            label: "gbuffer".to_string(),
            attachment: 2,
        }
        .into();
        assert_eq!(
            format!("{err}"),
            "Framebuffer 'gbuffer' is incomplete: attachment 2 has a different size"
        );
    }
}
