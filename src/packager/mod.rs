//! Extension packaging
//!
//! Walks the extension source tree and produces a versioned zip archive in
//! the dist directory, named after the manifest's declared version. This is
//! the build task, independent of the recording pipeline.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Packaging-related errors
#[derive(Error, Debug)]
pub enum PackagingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Result type for packaging operations
pub type PackagingResult<T> = Result<T, PackagingError>;

/// Archive file name for a manifest version
fn dist_file_name(version: &str) -> String {
    format!("ux-recorder-{version}.zip")
}

/// Zips an extension source tree into a versioned archive
pub struct Packager {
    src: PathBuf,
    dist: PathBuf,
}

impl Packager {
    pub fn new(src: impl Into<PathBuf>, dist: impl Into<PathBuf>) -> Self {
        Self {
            src: src.into(),
            dist: dist.into(),
        }
    }

    /// The version declared by the extension manifest
    pub fn manifest_version(&self) -> PackagingResult<String> {
        let path = self.src.join("manifest.json");
        if !path.exists() {
            return Err(PackagingError::Manifest(format!(
                "Manifest not found: {:?}",
                path
            )));
        }
        let content = fs::read_to_string(&path)?;
        let manifest: serde_json::Value = serde_json::from_str(&content)?;
        manifest
            .get("version")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| PackagingError::Manifest("Manifest declares no version".to_string()))
    }

    /// Path the archive will be written to
    pub fn dist_file(&self) -> PackagingResult<PathBuf> {
        Ok(self.dist.join(dist_file_name(&self.manifest_version()?)))
    }

    /// Ensure the dist directory exists and zip the source tree into it
    pub fn pack(&self) -> PackagingResult<PathBuf> {
        let dest = self.dist_file()?;
        fs::create_dir_all(&self.dist)?;
        self.zip(&dest)?;
        tracing::info!("Extension packed into {:?}", dest);
        Ok(dest)
    }

    fn zip(&self, dest: &Path) -> PackagingResult<()> {
        let file = fs::File::create(dest)?;
        let mut writer = ZipWriter::new(file);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        for entry in WalkDir::new(&self.src) {
            let entry = entry?;
            let Ok(rel) = entry.path().strip_prefix(&self.src) else {
                continue;
            };
            if rel.as_os_str().is_empty() {
                continue;
            }
            let name = rel.to_string_lossy().replace('\\', "/");
            if entry.file_type().is_dir() {
                writer.add_directory(name, options)?;
            } else {
                writer.start_file(name, options)?;
                writer.write_all(&fs::read(entry.path())?)?;
            }
        }

        writer.finish()?;
        Ok(())
    }
}
