//! Catalog provider backed by local directories.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::BackendError;
use crate::io::decode::SUPPORTED_EXTENSIONS;
use crate::io::{CatalogProvider, ImageRef};
use crate::selector::SourceRef;

pub const DEFAULT_AUDIO_EXTENSIONS: &[&str] = &SUPPORTED_EXTENSIONS;
pub const DEFAULT_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

/// Lists files by extension, sorted by path.
#[derive(Clone, Debug)]
pub struct DirectoryCatalog {
    audio_dir: PathBuf,
    image_dir: PathBuf,
    audio_extensions: Vec<String>,
    image_extensions: Vec<String>,
}

impl DirectoryCatalog {
    pub fn new(audio_dir: impl Into<PathBuf>, image_dir: impl Into<PathBuf>) -> Self {
        Self {
            audio_dir: audio_dir.into(),
            image_dir: image_dir.into(),
            audio_extensions: to_owned(DEFAULT_AUDIO_EXTENSIONS),
            image_extensions: to_owned(DEFAULT_IMAGE_EXTENSIONS),
        }
    }

    pub fn with_audio_extensions(mut self, extensions: &[String]) -> Self {
        self.audio_extensions = extensions.iter().map(|e| e.to_ascii_lowercase()).collect();
        self
    }

    pub fn with_image_extensions(mut self, extensions: &[String]) -> Self {
        self.image_extensions = extensions.iter().map(|e| e.to_ascii_lowercase()).collect();
        self
    }

    pub fn audio_dir(&self) -> &Path {
        &self.audio_dir
    }
}

fn to_owned(extensions: &[&str]) -> Vec<String> {
    extensions.iter().map(|e| e.to_string()).collect()
}

fn list(dir: &Path, extensions: &[String]) -> Result<Vec<SourceRef>, BackendError> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)));
        if matches {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths
        .into_iter()
        .map(|p| SourceRef::new(p.to_string_lossy()))
        .collect())
}

impl CatalogProvider for DirectoryCatalog {
    fn list_audio_sources(&self) -> Result<Vec<SourceRef>, BackendError> {
        list(&self.audio_dir, &self.audio_extensions)
    }

    fn list_background_images(&self) -> Result<Vec<ImageRef>, BackendError> {
        list(&self.image_dir, &self.image_extensions)
    }
}
