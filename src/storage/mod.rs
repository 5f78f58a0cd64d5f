use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use thiserror::Error;

use crate::history::Snapshot;

const DOWNLOAD_PREFIX: &str = "edited-";
const DEFAULT_STEM: &str = "image";
const DOWNLOAD_SUBDIR: &str = "Downloads";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("missing HOME environment variable")]
    MissingHomeDirectory,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Destination for "download": receives the snapshot's bytes unchanged.
pub trait SnapshotExporter {
    fn export_snapshot(&self, snapshot: &Snapshot) -> StorageResult<PathBuf>;
}

#[derive(Debug, Clone)]
pub struct ExportService {
    export_dir: PathBuf,
}

impl ExportService {
    pub const fn with_dir(export_dir: PathBuf) -> Self {
        Self { export_dir }
    }

    /// Uses `configured` when set, otherwise `~/Downloads`.
    pub fn with_default_dir(configured: Option<&Path>) -> StorageResult<Self> {
        if let Some(dir) = configured {
            return Ok(Self::with_dir(dir.to_path_buf()));
        }
        let home = std::env::var("HOME").map_err(|_| StorageError::MissingHomeDirectory)?;
        let mut export_dir = PathBuf::from(home);
        export_dir.push(DOWNLOAD_SUBDIR);
        Ok(Self::with_dir(export_dir))
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    pub fn allocate_target_path(&self, snapshot: &Snapshot) -> PathBuf {
        self.export_dir.join(download_file_name(snapshot))
    }
}

impl SnapshotExporter for ExportService {
    fn export_snapshot(&self, snapshot: &Snapshot) -> StorageResult<PathBuf> {
        fs::create_dir_all(&self.export_dir)?;
        let target = self.allocate_target_path(snapshot);
        fs::write(&target, snapshot.bytes())?;
        tracing::info!(path = %target.display(), bytes = snapshot.len(), "snapshot exported");
        Ok(target)
    }
}

/// `edited-<name>`, with an extension derived from the MIME type when the
/// name has none. Path separators in the name are dropped.
pub fn download_file_name(snapshot: &Snapshot) -> String {
    let base = Path::new(snapshot.name())
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_STEM);

    if Path::new(base).extension().is_some() {
        return format!("{DOWNLOAD_PREFIX}{base}");
    }
    match extension_for_mime(snapshot.mime_type()) {
        Some(extension) => format!("{DOWNLOAD_PREFIX}{base}.{extension}"),
        None => format!("{DOWNLOAD_PREFIX}{base}"),
    }
}

fn extension_for_mime(mime_type: &str) -> Option<&'static str> {
    ImageFormat::from_mime_type(mime_type)
        .and_then(|format| format.extensions_str().first().copied())
}
