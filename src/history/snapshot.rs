use std::fmt;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{DynamicImage, ImageFormat};
use thiserror::Error;

use crate::geometry::Size;

const DEFAULT_MIME_TYPE: &str = "image/png";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read image file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unsupported image type for {path}")]
    UnsupportedType { path: PathBuf },
    #[error("snapshot {name} is empty")]
    Empty { name: String },
    #[error("failed to decode snapshot {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to encode snapshot {name}: {source}")]
    Encode {
        name: String,
        #[source]
        source: image::ImageError,
    },
}

pub type SnapshotResult<T> = std::result::Result<T, SnapshotError>;

/// One immutable image state: encoded bytes plus MIME type and display name.
///
/// Cloning shares the byte buffer.
#[derive(Clone)]
pub struct Snapshot {
    bytes: Arc<[u8]>,
    mime_type: String,
    name: String,
}

impl Snapshot {
    pub fn new(
        bytes: impl Into<Arc<[u8]>>,
        mime_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
            name: name.into(),
        }
    }

    /// Reads an image file from disk, taking the MIME type from its extension.
    pub fn from_path(path: &Path) -> SnapshotResult<Self> {
        let format =
            ImageFormat::from_path(path).map_err(|_| SnapshotError::UnsupportedType {
                path: path.to_path_buf(),
            })?;
        let bytes = std::fs::read(path).map_err(|source| SnapshotError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        if bytes.is_empty() {
            return Err(SnapshotError::Empty { name });
        }
        Ok(Self::new(bytes, format.to_mime_type(), name))
    }

    /// Encodes a decoded image as PNG.
    pub fn from_image(image: &DynamicImage, name: impl Into<String>) -> SnapshotResult<Self> {
        let name = name.into();
        let mut buffer = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .map_err(|source| SnapshotError::Encode {
                name: name.clone(),
                source,
            })?;
        Ok(Self::new(buffer, DEFAULT_MIME_TYPE, name))
    }

    pub fn decode(&self) -> SnapshotResult<DynamicImage> {
        if self.bytes.is_empty() {
            return Err(SnapshotError::Empty {
                name: self.name.clone(),
            });
        }
        image::load_from_memory(&self.bytes).map_err(|source| SnapshotError::Decode {
            name: self.name.clone(),
            source,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// True when both handles point at the same stored artifact.
    pub fn same_as(&self, other: &Snapshot) -> bool {
        Arc::ptr_eq(&self.bytes, &other.bytes)
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Decoded pixel size of a snapshot.
pub(crate) fn image_size(image: &DynamicImage) -> Size {
    Size::new(image.width(), image.height())
}

#[cfg(test)]
pub(crate) fn test_png(width: u32, height: u32, name: &str) -> Snapshot {
    let image = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
        width,
        height,
        image::Rgba([40, 90, 200, 255]),
    ));
    Snapshot::from_image(&image, name).expect("png encoding should succeed")
}
