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

//! Filesystem content resolution over an ordered list of roots.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Component, Path, PathBuf};
use umbra_core::content::{ContentError, ContentResolver};

/// Resolves logical paths against directory roots, first match wins.
///
/// Writes always go under the first root, so a project directory placed
/// before the engine's own data directory can override any asset.
#[derive(Debug, Clone, Default)]
pub struct FileSystemContent {
    roots: Vec<PathBuf>,
}

impl FileSystemContent {
    /// A resolver over `roots`, searched in order.
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
        }
    }

    /// Appends a root searched after the existing ones.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.roots.push(root.into());
        self
    }

    /// The roots, in search order.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Location of `path` under `root`, if `path` stays inside it.
    fn join(root: &Path, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path.trim_start_matches(['/', '\\']));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return None;
        }
        Some(root.join(relative))
    }

    fn io_error(path: &str, source: std::io::Error) -> ContentError {
        ContentError::Io {
            path: path.to_string(),
            source,
        }
    }
}

impl ContentResolver for FileSystemContent {
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        self.roots
            .iter()
            .filter_map(|root| Self::join(root, path))
            .find(|candidate| candidate.is_file())
    }

    fn open_read(&self, path: &str) -> Result<Box<dyn Read + Send>, ContentError> {
        let location = self
            .resolve(path)
            .ok_or_else(|| ContentError::NotFound(path.to_string()))?;
        log::trace!("Reading '{path}' from {}", location.display());
        let file = File::open(&location).map_err(|e| Self::io_error(path, e))?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn open_write(&self, path: &str) -> Result<Box<dyn Write + Send>, ContentError> {
        let location = self
            .roots
            .first()
            .and_then(|root| Self::join(root, path))
            .ok_or_else(|| ContentError::NotFound(path.to_string()))?;
        if let Some(parent) = location.parent() {
            fs::create_dir_all(parent).map_err(|e| Self::io_error(path, e))?;
        }
        log::debug!("Writing '{path}' to {}", location.display());
        let file = File::create(&location).map_err(|e| Self::io_error(path, e))?;
        Ok(Box::new(BufWriter::new(file)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn first_root_wins() {
        let project = tempdir().unwrap();
        let engine = tempdir().unwrap();
        fs::create_dir_all(project.path().join("shaders")).unwrap();
        fs::create_dir_all(engine.path().join("shaders")).unwrap();
        fs::write(project.path().join("shaders/common.wgsl"), "project").unwrap();
        fs::write(engine.path().join("shaders/common.wgsl"), "engine").unwrap();
        fs::write(engine.path().join("shaders/sky.wgsl"), "sky").unwrap();

        let content = FileSystemContent::new([project.path(), engine.path()]);

        assert_eq!(content.read_text("shaders/common.wgsl").unwrap(), "project");
        assert_eq!(content.read_text("shaders/sky.wgsl").unwrap(), "sky");
        assert_eq!(
            content.resolve("shaders/sky.wgsl").unwrap(),
            engine.path().join("shaders/sky.wgsl")
        );
    }

    #[test]
    fn missing_content_is_not_found() {
        let root = tempdir().unwrap();
        let content = FileSystemContent::new([root.path()]);

        assert!(!content.exists("nothing.txt"));
        assert!(matches!(
            content.read_bytes("nothing.txt"),
            Err(ContentError::NotFound(path)) if path == "nothing.txt"
        ));
    }

    #[test]
    fn directories_do_not_resolve() {
        let root = tempdir().unwrap();
        fs::create_dir_all(root.path().join("textures")).unwrap();
        let content = FileSystemContent::new([root.path()]);

        assert!(content.resolve("textures").is_none());
    }

    #[test]
    fn parent_components_are_rejected() {
        let outer = tempdir().unwrap();
        let root = outer.path().join("root");
        fs::create_dir_all(&root).unwrap();
        fs::write(outer.path().join("secret.txt"), "outside").unwrap();
        let content = FileSystemContent::new([&root]);

        assert!(content.resolve("../secret.txt").is_none());
        assert!(content.open_write("../secret.txt").is_err());
    }

    #[test]
    fn writes_go_under_first_root() {
        let project = tempdir().unwrap();
        let engine = tempdir().unwrap();
        let content = FileSystemContent::new([project.path()]).with_root(engine.path());

        {
            let mut writer = content.open_write("config/renderer.ron").unwrap();
            writer.write_all(b"(render_scale: 0.5)\n(vsync: false)").unwrap();
        }

        assert!(project.path().join("config/renderer.ron").is_file());
        assert!(!engine.path().join("config/renderer.ron").exists());
        assert_eq!(
            content.read_lines("config/renderer.ron").unwrap(),
            vec!["(render_scale: 0.5)", "(vsync: false)"]
        );
    }

    #[test]
    fn invalid_utf8_is_reported() {
        let root = tempdir().unwrap();
        fs::write(root.path().join("blob.bin"), [0xff, 0xfe, 0x00]).unwrap();
        let content = FileSystemContent::new([root.path()]);

        assert_eq!(content.read_bytes("blob.bin").unwrap().len(), 3);
        assert!(matches!(
            content.read_text("blob.bin"),
            Err(ContentError::InvalidText(_))
        ));
    }

    #[test]
    fn write_without_roots_fails() {
        let content = FileSystemContent::default();
        assert!(matches!(
            content.open_write("out.txt"),
            Err(ContentError::NotFound(_))
        ));
    }
}
