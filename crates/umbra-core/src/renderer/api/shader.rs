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

//! Shader module handles and descriptors.

use std::borrow::Cow;

/// Entry point expected in vertex modules.
pub const VERTEX_ENTRY_POINT: &str = "vs_main";
/// Entry point expected in fragment modules.
pub const FRAGMENT_ENTRY_POINT: &str = "fs_main";

/// Opaque handle to a compiled shader module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderModuleId(pub usize);

/// Source code of a shader module.
#[derive(Debug, Clone, PartialEq)]
pub enum ShaderSourceData<'a> {
    /// WGSL source text.
    Wgsl(Cow<'a, str>),
}

/// Describes a shader module to compile.
#[derive(Debug, Clone)]
pub struct ShaderModuleDescriptor<'a> {
    /// Debug label, usually the logical program name and stage.
    pub label: Option<&'a str>,
    /// Source code.
    pub source: ShaderSourceData<'a>,
}
