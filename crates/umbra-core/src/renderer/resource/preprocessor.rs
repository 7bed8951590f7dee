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

//! Textual shader preprocessor: `#include "path"` expansion with a line map.

use crate::content::ContentResolver;
use crate::renderer::error::{ShaderError, SourceLocation};

const INCLUDE_DIRECTIVE: &str = "#include";

/// Preprocessed source plus the origin of every output line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preprocessed {
    /// Expanded source text.
    pub source: String,
    origins: Vec<(usize, u32)>,
    files: Vec<String>,
}

impl Preprocessed {
    /// Maps a one-based line of the expanded source back to its file and line.
    pub fn map_line(&self, line: u32) -> Option<SourceLocation> {
        let index = (line as usize).checked_sub(1)?;
        let &(file, original) = self.origins.get(index)?;
        Some(SourceLocation {
            file: self.files[file].clone(),
            line: original,
        })
    }

    /// Every file that contributed to the output, the root file first.
    pub fn files(&self) -> &[String] {
        &self.files
    }
}

/// Expands `#include` directives of `path`, recursively.
///
/// Each file is included at most once per program. An include that refers
/// back to a file currently being expanded is a cycle and is rejected.
pub fn preprocess(resolver: &dyn ContentResolver, path: &str) -> Result<Preprocessed, ShaderError> {
    let mut output = Preprocessed {
        source: String::new(),
        origins: Vec::new(),
        files: Vec::new(),
    };
    let mut stack = Vec::new();
    expand(resolver, path, &mut stack, &mut output)?;
    Ok(output)
}

fn expand(
    resolver: &dyn ContentResolver,
    path: &str,
    stack: &mut Vec<String>,
    output: &mut Preprocessed,
) -> Result<(), ShaderError> {
    if stack.iter().any(|p| p == path) {
        return Err(ShaderError::PreprocessError {
            path: path.to_string(),
            details: format!("include cycle: {} -> {path}", stack.join(" -> ")),
        });
    }
    if output.files.iter().any(|p| p == path) {
        return Ok(());
    }

    let text = resolver
        .read_text(path)
        .map_err(|e| ShaderError::LoadError {
            path: path.to_string(),
            source_error: e.to_string(),
        })?;
    let file_index = output.files.len();
    output.files.push(path.to_string());
    stack.push(path.to_string());

    for (line_index, line) in text.lines().enumerate() {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix(INCLUDE_DIRECTIVE) {
            let target = parse_include_target(rest).ok_or_else(|| ShaderError::PreprocessError {
                path: path.to_string(),
                details: format!("malformed include on line {}", line_index + 1),
            })?;
            let resolved = join_relative(path, target);
            expand(resolver, &resolved, stack, output)?;
            continue;
        }
        output.source.push_str(line);
        output.source.push('\n');
        output.origins.push((file_index, line_index as u32 + 1));
    }

    stack.pop();
    Ok(())
}

fn parse_include_target(rest: &str) -> Option<&str> {
    let rest = rest.trim();
    let inner = rest.strip_prefix('"')?.strip_suffix('"')?;
    (!inner.is_empty()).then_some(inner)
}

/// Resolves `target` relative to the directory of `including`.
fn join_relative(including: &str, target: &str) -> String {
    match including.rfind('/') {
        Some(slash) => format!("{}/{target}", &including[..slash]),
        None => target.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryContent;

    #[test]
    fn test_include_expansion_and_line_map() {
        let content = MemoryContent::new()
            .with_text("shaders/main.wgsl", "line one\n#include \"lib/common.wgsl\"\nline three\n")
            .with_text("shaders/lib/common.wgsl", "common a\ncommon b\n");

        let result = preprocess(&content, "shaders/main.wgsl").unwrap();
        assert_eq!(result.source, "line one\ncommon a\ncommon b\nline three\n");

        let mapped = result.map_line(3).unwrap();
        assert_eq!(mapped.file, "shaders/lib/common.wgsl");
        assert_eq!(mapped.line, 2);

        let mapped = result.map_line(4).unwrap();
        assert_eq!(mapped.file, "shaders/main.wgsl");
        assert_eq!(mapped.line, 3);
        assert!(result.map_line(0).is_none());
    }

    #[test]
    fn test_file_included_once() {
        let content = MemoryContent::new()
            .with_text("a.wgsl", "#include \"b.wgsl\"\n#include \"b.wgsl\"\nend\n")
            .with_text("b.wgsl", "b\n");
        let result = preprocess(&content, "a.wgsl").unwrap();
        assert_eq!(result.source, "b\nend\n");
        assert_eq!(result.files(), &["a.wgsl".to_string(), "b.wgsl".to_string()]);
    }

    #[test]
    fn test_include_cycle_is_rejected() {
        let content = MemoryContent::new()
            .with_text("a.wgsl", "#include \"b.wgsl\"\n")
            .with_text("b.wgsl", "#include \"a.wgsl\"\n");
        let err = preprocess(&content, "a.wgsl").unwrap_err();
        assert!(matches!(err, ShaderError::PreprocessError { .. }));
    }

    #[test]
    fn test_missing_include_is_a_load_error() {
        let content = MemoryContent::new().with_text("a.wgsl", "#include \"missing.wgsl\"\n");
        let err = preprocess(&content, "a.wgsl").unwrap_err();
        assert!(matches!(err, ShaderError::LoadError { path, .. } if path == "missing.wgsl"));
    }
}
