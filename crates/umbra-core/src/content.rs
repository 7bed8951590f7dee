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

//! Content resolution: mapping logical asset paths onto readable sources.

use std::io::{Read, Write};
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while resolving or reading content.
#[derive(Debug, Error)]
pub enum ContentError {
    /// No root contains the requested path.
    #[error("content not found: {0}")]
    NotFound(String),
    /// The content exists but could not be read or written.
    #[error("I/O error on '{path}': {source}")]
    Io {
        /// The logical path.
        path: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The content is not valid UTF-8 text.
    #[error("content '{0}' is not valid UTF-8")]
    InvalidText(String),
    /// The content could not be parsed.
    #[error("failed to parse '{path}': {message}")]
    Parse {
        /// The logical path.
        path: String,
        /// Parser message.
        message: String,
    },
}

/// Resolves logical paths against an ordered list of sources.
///
/// Only `resolve`, `open_read` and `open_write` are required; the remaining
/// methods are derived from them.
pub trait ContentResolver: Send + Sync + std::fmt::Debug {
    /// Location of `path`, or `None` when no source has it.
    fn resolve(&self, path: &str) -> Option<PathBuf>;

    /// Opens `path` for reading.
    fn open_read(&self, path: &str) -> Result<Box<dyn Read + Send>, ContentError>;

    /// Opens `path` for writing, creating it if needed.
    fn open_write(&self, path: &str) -> Result<Box<dyn Write + Send>, ContentError>;

    /// `true` when `path` resolves.
    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_some()
    }

    /// Reads the whole content of `path`.
    fn read_bytes(&self, path: &str) -> Result<Vec<u8>, ContentError> {
        let mut reader = self.open_read(path)?;
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|source| ContentError::Io {
                path: path.to_string(),
                source,
            })?;
        Ok(bytes)
    }

    /// Reads `path` as UTF-8 text.
    fn read_text(&self, path: &str) -> Result<String, ContentError> {
        String::from_utf8(self.read_bytes(path)?)
            .map_err(|_| ContentError::InvalidText(path.to_string()))
    }

    /// Reads `path` as UTF-8 text split into lines.
    fn read_lines(&self, path: &str) -> Result<Vec<String>, ContentError> {
        Ok(self.read_text(path)?.lines().map(str::to_string).collect())
    }
}
